//! RSA key pair secrets.

use genesis_types::{bail, GenesisError, Result};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::collections::BTreeMap;

use crate::report::Check;

/// An RSA key pair request: `rsa <bits> [fixed]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPlan {
    /// Key size in bits
    pub size: u32,
    /// Never overwritten by `recreate`
    pub fixed: bool,
}

impl RsaPlan {
    /// Parse the tokens following the `rsa` keyword.
    pub fn parse(tokens: &[&str]) -> Result<Self> {
        let (size, fixed) = parse_bits_and_fixed("rsa", tokens)?;
        Ok(Self { size, fixed })
    }

    /// Sanity-check the plan itself (pre-validation).
    pub fn check_plan(&self) -> Result<()> {
        if !(super::ssh::MIN_BITS..=super::ssh::MAX_BITS).contains(&self.size) {
            bail!(
                BadRequest,
                "Invalid rsa key size {}: must be between {} and {}",
                self.size,
                super::ssh::MIN_BITS,
                super::ssh::MAX_BITS
            );
        }
        Ok(())
    }

    /// Short human description.
    pub fn describe(&self) -> String {
        format!("{} bit RSA keypair{}", self.size, if self.fixed { " (fixed)" } else { "" })
    }

    /// The cred-line this plan re-emits as.
    pub fn to_spec(&self) -> String {
        format!("rsa {}{}", self.size, if self.fixed { " fixed" } else { "" })
    }

    /// Filter attribute lookup.
    pub fn attr(&self, key: &str) -> Option<String> {
        match key {
            "size" => Some(self.size.to_string()),
            "fixed" => Some(self.fixed.to_string()),
            _ => None,
        }
    }

    /// Validate stored key material against this plan: both halves parse,
    /// their moduli agree, and the modulus has the declared bit size.
    pub fn validate(&self, entry: Option<&BTreeMap<String, String>>) -> Vec<Check> {
        let mut checks = Vec::new();
        let entry = match entry {
            Some(e) => e,
            None => return vec![Check::missing("secret")],
        };

        for key in ["private", "public"] {
            if !entry.contains_key(key) {
                checks.push(Check::missing(key));
            }
        }
        if !checks.is_empty() {
            return checks;
        }

        let private = match parse_private(&entry["private"]) {
            Ok(k) => {
                checks.push(Check::ok("private key parses"));
                Some(k)
            }
            Err(e) => {
                checks.push(Check::error("private key parses", e.to_string()));
                None
            }
        };
        let public = match parse_public(&entry["public"]) {
            Ok(k) => {
                checks.push(Check::ok("public key parses"));
                Some(k)
            }
            Err(e) => {
                checks.push(Check::error("public key parses", e.to_string()));
                None
            }
        };

        if let (Some(private), Some(public)) = (private, public) {
            if private.n() == public.n() {
                checks.push(Check::ok("modulus agreement"));
            } else {
                checks.push(Check::error(
                    "modulus agreement",
                    "public key does not belong to the private key",
                ));
            }

            let bits = public.n().bits() as u32;
            if bits == self.size {
                checks.push(Check::ok_with("size", format!("{} bits", bits)));
            } else {
                checks.push(Check::error(
                    "size",
                    format!("{} bits, expected {}", bits, self.size),
                ));
            }
        }

        checks
    }
}

/// Parse an RSA private key from PKCS#1 or PKCS#8 PEM.
pub(crate) fn parse_private(pem: &str) -> Result<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs1_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
        .map_err(|e| GenesisError::Validation(format!("unparseable RSA private key: {}", e)))
}

/// Parse an RSA public key from PKCS#1 or SPKI PEM.
pub(crate) fn parse_public(pem: &str) -> Result<RsaPublicKey> {
    RsaPublicKey::from_pkcs1_pem(pem)
        .or_else(|_| RsaPublicKey::from_public_key_pem(pem))
        .map_err(|e| GenesisError::Validation(format!("unparseable RSA public key: {}", e)))
}

/// Shared `<bits> [fixed]` tail parser for the keypair-shaped cred lines.
pub(crate) fn parse_bits_and_fixed(what: &str, tokens: &[&str]) -> Result<(u32, bool)> {
    let mut iter = tokens.iter();
    let size = iter
        .next()
        .ok_or_else(|| GenesisError::BadRequest(format!("{} requires a bit size", what)))?
        .parse::<u32>()
        .map_err(|_| {
            GenesisError::BadRequest(format!(
                "{} bit size must be a positive integer, got '{}'",
                what, tokens[0]
            ))
        })?;

    let fixed = match iter.next() {
        None => false,
        Some(&"fixed") => true,
        Some(other) => bail!(BadRequest, "Unexpected token '{}' in {} spec", other, what),
    };
    if iter.next().is_some() {
        bail!(BadRequest, "Trailing garbage in {} spec", what);
    }

    Ok((size, fixed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use genesis_types::CheckStatus;

    #[test]
    fn parses_bits_and_fixed() {
        assert_eq!(RsaPlan::parse(&["2048"]).unwrap(), RsaPlan { size: 2048, fixed: false });
        assert_eq!(
            RsaPlan::parse(&["2048", "fixed"]).unwrap(),
            RsaPlan { size: 2048, fixed: true }
        );
        assert!(RsaPlan::parse(&["2048", "fixed", "more"]).is_err());
    }

    #[test]
    fn missing_material_reports_missing() {
        let plan = RsaPlan { size: 2048, fixed: false };
        let checks = plan.validate(None);
        assert_eq!(checks[0].status, CheckStatus::Missing);

        let partial: BTreeMap<String, String> =
            [("private".to_string(), "pem".to_string())].into_iter().collect();
        let checks = plan.validate(Some(&partial));
        assert!(checks.iter().any(|c| c.label == "public" && c.status == CheckStatus::Missing));
    }

    #[test]
    fn garbage_material_reports_errors() {
        let plan = RsaPlan { size: 2048, fixed: false };
        let entry: BTreeMap<String, String> = [
            ("private".to_string(), "not a key".to_string()),
            ("public".to_string(), "also not a key".to_string()),
        ]
        .into_iter()
        .collect();
        let checks = plan.validate(Some(&entry));
        assert!(checks.iter().any(|c| c.status == CheckStatus::Error));
    }

    #[test]
    fn spec_round_trip() {
        let plan = RsaPlan { size: 4096, fixed: false };
        let spec = plan.to_spec();
        let tokens: Vec<&str> = spec.split_whitespace().skip(1).collect();
        assert_eq!(RsaPlan::parse(&tokens).unwrap(), plan);
    }
}
