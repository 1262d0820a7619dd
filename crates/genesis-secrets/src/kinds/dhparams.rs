//! Diffie-Hellman parameter secrets.

use genesis_core::util::process::{self, EnvSpec};
use genesis_types::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use crate::report::Check;

static DH_BITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"DH Parameters:\s*\((\d+)\s*bit\)").unwrap());

/// A DH parameters request: `dhparam[s] <bits> [fixed]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhParamsPlan {
    /// Parameter size in bits
    pub size: u32,
    /// Never overwritten by `recreate`
    pub fixed: bool,
}

impl DhParamsPlan {
    /// Parse the tokens following the `dhparam`/`dhparams` keyword.
    pub fn parse(tokens: &[&str]) -> Result<Self> {
        let (size, fixed) = super::rsa::parse_bits_and_fixed("dhparam", tokens)?;
        Ok(Self { size, fixed })
    }

    /// Short human description.
    pub fn describe(&self) -> String {
        format!("{} bit DH parameters{}", self.size, if self.fixed { " (fixed)" } else { "" })
    }

    /// The cred-line this plan re-emits as.
    pub fn to_spec(&self) -> String {
        format!("dhparams {}{}", self.size, if self.fixed { " fixed" } else { "" })
    }

    /// Filter attribute lookup.
    pub fn attr(&self, key: &str) -> Option<String> {
        match key {
            "size" => Some(self.size.to_string()),
            "fixed" => Some(self.fixed.to_string()),
            _ => None,
        }
    }

    /// Validate stored parameters: `openssl dhparam -check` accepts them
    /// (fed over stdin, never via a shell) and the bit size matches.
    pub async fn validate(&self, entry: Option<&BTreeMap<String, String>>) -> Vec<Check> {
        let entry = match entry {
            Some(e) => e,
            None => return vec![Check::missing("secret")],
        };
        let pem = match entry.get("dhparam-pem") {
            Some(p) => p,
            None => return vec![Check::missing("dhparam-pem")],
        };

        let output = process::run_with_stdin(
            "openssl",
            &["dhparam", "-check", "-text", "-noout"],
            &EnvSpec::default(),
            pem.as_bytes(),
        )
        .await;

        let (stdout, rc, stderr) = match output {
            Ok(o) => o,
            Err(e) => return vec![Check::error("dhparam check", e.to_string())],
        };
        if rc != 0 {
            return vec![Check::error(
                "dhparam check",
                format!("openssl rejected the parameters: {}", stderr.trim()),
            )];
        }

        let mut checks = vec![Check::ok("dhparam check")];
        match parse_bit_size(&stdout) {
            Some(bits) if bits == self.size => {
                checks.push(Check::ok_with("size", format!("{} bits", bits)))
            }
            Some(bits) => checks.push(Check::error(
                "size",
                format!("{} bits, expected {}", bits, self.size),
            )),
            None => checks.push(Check::error("size", "could not determine parameter size")),
        }
        checks
    }
}

/// Extract the bit size from `openssl dhparam -text` output.
pub(crate) fn parse_bit_size(output: &str) -> Option<u32> {
    DH_BITS.captures(output)?.get(1)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_spec() {
        assert_eq!(
            DhParamsPlan::parse(&["2048"]).unwrap(),
            DhParamsPlan { size: 2048, fixed: false }
        );
        assert_eq!(
            DhParamsPlan::parse(&["1024", "fixed"]).unwrap(),
            DhParamsPlan { size: 1024, fixed: true }
        );
        assert!(DhParamsPlan::parse(&["soon"]).is_err());
    }

    #[test]
    fn bit_size_comes_from_openssl_text_output() {
        let output = "    DH Parameters: (2048 bit)\n        prime:\n            00:f4:...\n";
        assert_eq!(parse_bit_size(output), Some(2048));
        assert_eq!(parse_bit_size("nothing useful"), None);
    }

    #[test]
    fn spec_round_trip() {
        let plan = DhParamsPlan { size: 2048, fixed: false };
        let spec = plan.to_spec();
        let tokens: Vec<&str> = spec.split_whitespace().skip(1).collect();
        assert_eq!(DhParamsPlan::parse(&tokens).unwrap(), plan);
    }
}
