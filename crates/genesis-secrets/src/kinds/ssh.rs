//! SSH key pair secrets.

use genesis_core::util::process;
use genesis_types::{bail, GenesisError, Result};
use std::collections::BTreeMap;
use std::io::Write;

use crate::report::Check;

/// Declared bounds for key sizes.
pub const MIN_BITS: u32 = 1024;
/// Upper bound for key sizes.
pub const MAX_BITS: u32 = 16384;

/// An SSH key pair request: `ssh <bits> [fixed]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshPlan {
    /// Key size in bits
    pub size: u32,
    /// Never overwritten by `recreate`
    pub fixed: bool,
}

impl SshPlan {
    /// Parse the tokens following the `ssh` keyword.
    pub fn parse(tokens: &[&str]) -> Result<Self> {
        let (size, fixed) = super::rsa::parse_bits_and_fixed("ssh", tokens)?;
        Ok(Self { size, fixed })
    }

    /// Sanity-check the plan itself (pre-validation).
    pub fn check_plan(&self) -> Result<()> {
        if !(MIN_BITS..=MAX_BITS).contains(&self.size) {
            bail!(
                BadRequest,
                "Invalid ssh key size {}: must be between {} and {}",
                self.size,
                MIN_BITS,
                MAX_BITS
            );
        }
        Ok(())
    }

    /// Short human description.
    pub fn describe(&self) -> String {
        format!("{} bit SSH keypair{}", self.size, if self.fixed { " (fixed)" } else { "" })
    }

    /// The cred-line this plan re-emits as.
    pub fn to_spec(&self) -> String {
        format!("ssh {}{}", self.size, if self.fixed { " fixed" } else { "" })
    }

    /// Filter attribute lookup.
    pub fn attr(&self, key: &str) -> Option<String> {
        match key {
            "size" => Some(self.size.to_string()),
            "fixed" => Some(self.fixed.to_string()),
            _ => None,
        }
    }

    /// Validate stored key material against this plan.
    ///
    /// The private key must re-derive the stored public key and the public
    /// key's fingerprint must report the declared bit size; both checks go
    /// through `ssh-keygen` on ephemeral files.
    pub async fn validate(&self, entry: Option<&BTreeMap<String, String>>) -> Vec<Check> {
        let mut checks = Vec::new();
        let entry = match entry {
            Some(e) => e,
            None => return vec![Check::missing("secret")],
        };

        for key in ["private", "public", "fingerprint"] {
            if !entry.contains_key(key) {
                checks.push(Check::missing(key));
            }
        }
        if !checks.is_empty() {
            return checks;
        }

        let private = &entry["private"];
        let public = &entry["public"];

        match derive_public(private).await {
            Ok(derived) => match (pubkey_core(&derived), pubkey_core(public)) {
                (Some(a), Some(b)) if a == b => checks.push(Check::ok("public derives from private")),
                (Some(_), Some(_)) => checks.push(Check::error(
                    "public derives from private",
                    "stored public key does not match the private key",
                )),
                _ => checks.push(Check::error("public key", "unparseable public key")),
            },
            Err(e) => checks.push(Check::error("private key", e.to_string())),
        }

        match fingerprint_bits(public).await {
            Ok(bits) if bits == self.size => {
                checks.push(Check::ok_with("size", format!("{} bits", bits)))
            }
            Ok(bits) => checks.push(Check::error(
                "size",
                format!("{} bits, expected {}", bits, self.size),
            )),
            Err(e) => checks.push(Check::error("fingerprint", e.to_string())),
        }

        checks
    }
}

/// The comparable core of an OpenSSH public key line: algorithm and blob,
/// ignoring the comment.
pub(crate) fn pubkey_core(line: &str) -> Option<(String, String)> {
    let mut fields = line.split_whitespace();
    Some((fields.next()?.to_string(), fields.next()?.to_string()))
}

/// Parse the leading bit count out of `ssh-keygen -l` output.
pub(crate) fn parse_fingerprint_bits(line: &str) -> Option<u32> {
    line.split_whitespace().next()?.parse().ok()
}

async fn derive_public(private_pem: &str) -> Result<String> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(private_pem.as_bytes())?;
    file.flush()?;
    let path = file.path().to_string_lossy().to_string();

    let (stdout, rc, stderr) =
        process::run("ssh-keygen", &["-y", "-f", &path]).await?;
    if rc != 0 {
        return Err(GenesisError::Validation(format!(
            "ssh-keygen could not read the private key: {}",
            stderr.trim()
        )));
    }
    Ok(stdout)
}

async fn fingerprint_bits(public_line: &str) -> Result<u32> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(public_line.as_bytes())?;
    file.write_all(b"\n")?;
    file.flush()?;
    let path = file.path().to_string_lossy().to_string();

    let (stdout, rc, stderr) = process::run("ssh-keygen", &["-l", "-f", &path]).await?;
    if rc != 0 {
        return Err(GenesisError::Validation(format!(
            "ssh-keygen could not fingerprint the public key: {}",
            stderr.trim()
        )));
    }
    parse_fingerprint_bits(&stdout).ok_or_else(|| {
        GenesisError::Validation(format!("unexpected fingerprint output: {}", stdout.trim()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bits_and_fixed() {
        assert_eq!(SshPlan::parse(&["2048"]).unwrap(), SshPlan { size: 2048, fixed: false });
        assert_eq!(SshPlan::parse(&["4096", "fixed"]).unwrap(), SshPlan { size: 4096, fixed: true });
        assert!(SshPlan::parse(&[]).is_err());
        assert!(SshPlan::parse(&["many"]).is_err());
        assert!(SshPlan::parse(&["2048", "what"]).is_err());
    }

    #[test]
    fn plan_checks_size_bounds() {
        assert!(SshPlan { size: 1024, fixed: false }.check_plan().is_ok());
        assert!(SshPlan { size: 512, fixed: false }.check_plan().is_err());
        assert!(SshPlan { size: 32768, fixed: false }.check_plan().is_err());
    }

    #[test]
    fn pubkey_comparison_ignores_comments() {
        let a = pubkey_core("ssh-rsa AAAAB3Nza... operator@host").unwrap();
        let b = pubkey_core("ssh-rsa AAAAB3Nza...").unwrap();
        assert_eq!(a, b);
        assert!(pubkey_core("garbage").is_none());
    }

    #[test]
    fn fingerprint_bits_come_from_the_leading_field() {
        let line = "2048 SHA256:gBKx1uGBZLha2QgkmbYfQ3jHjgm9AOkefhegPKFTTsI none (RSA)";
        assert_eq!(parse_fingerprint_bits(line), Some(2048));
        assert_eq!(parse_fingerprint_bits("weird output"), None);
    }

    #[test]
    fn spec_round_trip() {
        let plan = SshPlan { size: 2048, fixed: true };
        let spec = plan.to_spec();
        let tokens: Vec<&str> = spec.split_whitespace().skip(1).collect();
        assert_eq!(SshPlan::parse(&tokens).unwrap(), plan);
    }
}
