//! Common enumerations used throughout Genesis.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::errors::{GenesisError, Result};

/// Secret kind enumeration for the different kinds of secrets a kit can
/// declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretType {
    /// X.509 certificates (CA, signed, self-signed)
    X509,
    /// SSH key pairs
    Ssh,
    /// RSA key pairs
    Rsa,
    /// Diffie-Hellman parameters
    DhParams,
    /// Random strings
    Random,
    /// UUIDs (v1, v3, v4, v5)
    Uuid,
    /// Operator-provided secret
    Provided,
    /// A parse failure carried through the pipeline
    Error,
}

impl fmt::Display for SecretType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretType::X509 => write!(f, "x509"),
            SecretType::Ssh => write!(f, "ssh"),
            SecretType::Rsa => write!(f, "rsa"),
            SecretType::DhParams => write!(f, "dhparams"),
            SecretType::Random => write!(f, "random"),
            SecretType::Uuid => write!(f, "uuid"),
            SecretType::Provided => write!(f, "provided"),
            SecretType::Error => write!(f, "error"),
        }
    }
}

/// Lifecycle actions the executor can drive against a plan set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Generate anything missing; existing values are never touched
    Add,
    /// Regenerate, overwriting existing values unless the plan is fixed
    Recreate,
    /// Renew certificate lifetimes (x509 plans only)
    Renew,
    /// Delete the plan's paths from the store
    Remove,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Add => write!(f, "add"),
            Action::Recreate => write!(f, "recreate"),
            Action::Renew => write!(f, "renew"),
            Action::Remove => write!(f, "remove"),
        }
    }
}

impl Action {
    /// Whether this action destroys or replaces existing secret values and
    /// therefore needs operator confirmation.
    pub fn is_destructive(&self) -> bool {
        matches!(self, Action::Recreate | Action::Remove)
    }
}

/// Outcome of a single validation check.
///
/// Variants are ordered least to most severe so that plan-level results can
/// be computed as the worst of their checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    /// The check passed
    Ok,
    /// The check passed with a caveat (e.g. expiring soon)
    Warn,
    /// The checked material does not exist
    Missing,
    /// The check failed
    Error,
}

impl CheckStatus {
    /// The more severe of two outcomes.
    pub fn worst(self, other: CheckStatus) -> CheckStatus {
        self.max(other)
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStatus::Ok => write!(f, "ok"),
            CheckStatus::Warn => write!(f, "warn"),
            CheckStatus::Missing => write!(f, "missing"),
            CheckStatus::Error => write!(f, "error"),
        }
    }
}

/// X.509 key usage and extended key usage tokens a kit may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyUsage {
    /// digitalSignature
    DigitalSignature,
    /// nonRepudiation (pre-RFC5280 name for contentCommitment)
    NonRepudiation,
    /// contentCommitment
    ContentCommitment,
    /// keyEncipherment
    KeyEncipherment,
    /// dataEncipherment
    DataEncipherment,
    /// keyAgreement
    KeyAgreement,
    /// keyCertSign
    KeyCertSign,
    /// cRLSign
    CrlSign,
    /// encipherOnly
    EncipherOnly,
    /// decipherOnly
    DecipherOnly,
    /// TLS client authentication (extended usage)
    ClientAuth,
    /// TLS server authentication (extended usage)
    ServerAuth,
    /// Code signing (extended usage)
    CodeSigning,
    /// Email protection (extended usage)
    EmailProtection,
    /// Timestamping (extended usage)
    Timestamping,
}

impl KeyUsage {
    /// The token this one is interchangeable with, if any.
    ///
    /// `non_repudiation` and `content_commitment` are two names for the
    /// same key usage bit; either satisfies a request for the other.
    pub fn synonym(&self) -> Option<KeyUsage> {
        match self {
            KeyUsage::NonRepudiation => Some(KeyUsage::ContentCommitment),
            KeyUsage::ContentCommitment => Some(KeyUsage::NonRepudiation),
            _ => None,
        }
    }

    /// Whether this usage satisfies a request for `wanted`.
    pub fn satisfies(&self, wanted: KeyUsage) -> bool {
        *self == wanted || self.synonym() == Some(wanted)
    }
}

impl FromStr for KeyUsage {
    type Err = GenesisError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "digital_signature" => Ok(KeyUsage::DigitalSignature),
            "non_repudiation" => Ok(KeyUsage::NonRepudiation),
            "content_commitment" => Ok(KeyUsage::ContentCommitment),
            "key_encipherment" => Ok(KeyUsage::KeyEncipherment),
            "data_encipherment" => Ok(KeyUsage::DataEncipherment),
            "key_agreement" => Ok(KeyUsage::KeyAgreement),
            "key_cert_sign" => Ok(KeyUsage::KeyCertSign),
            "crl_sign" => Ok(KeyUsage::CrlSign),
            "encipher_only" => Ok(KeyUsage::EncipherOnly),
            "decipher_only" => Ok(KeyUsage::DecipherOnly),
            "client_auth" => Ok(KeyUsage::ClientAuth),
            "server_auth" => Ok(KeyUsage::ServerAuth),
            "code_signing" => Ok(KeyUsage::CodeSigning),
            "email_protection" => Ok(KeyUsage::EmailProtection),
            "timestamping" => Ok(KeyUsage::Timestamping),
            _ => Err(GenesisError::BadRequest(format!("Unknown key usage: {}", s))),
        }
    }
}

impl fmt::Display for KeyUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            KeyUsage::DigitalSignature => "digital_signature",
            KeyUsage::NonRepudiation => "non_repudiation",
            KeyUsage::ContentCommitment => "content_commitment",
            KeyUsage::KeyEncipherment => "key_encipherment",
            KeyUsage::DataEncipherment => "data_encipherment",
            KeyUsage::KeyAgreement => "key_agreement",
            KeyUsage::KeyCertSign => "key_cert_sign",
            KeyUsage::CrlSign => "crl_sign",
            KeyUsage::EncipherOnly => "encipher_only",
            KeyUsage::DecipherOnly => "decipher_only",
            KeyUsage::ClientAuth => "client_auth",
            KeyUsage::ServerAuth => "server_auth",
            KeyUsage::CodeSigning => "code_signing",
            KeyUsage::EmailProtection => "email_protection",
            KeyUsage::Timestamping => "timestamping",
        };
        write!(f, "{}", token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_status_aggregates_to_worst() {
        assert_eq!(CheckStatus::Ok.worst(CheckStatus::Warn), CheckStatus::Warn);
        assert_eq!(CheckStatus::Warn.worst(CheckStatus::Missing), CheckStatus::Missing);
        assert_eq!(CheckStatus::Missing.worst(CheckStatus::Error), CheckStatus::Error);
        assert_eq!(CheckStatus::Ok.worst(CheckStatus::Ok), CheckStatus::Ok);
    }

    #[test]
    fn key_usage_round_trips_through_strings() {
        for token in [
            "digital_signature", "non_repudiation", "content_commitment",
            "key_encipherment", "data_encipherment", "key_agreement",
            "key_cert_sign", "crl_sign", "encipher_only", "decipher_only",
            "client_auth", "server_auth", "code_signing", "email_protection",
            "timestamping",
        ] {
            let usage: KeyUsage = token.parse().unwrap();
            assert_eq!(usage.to_string(), token);
        }
        assert!("signing".parse::<KeyUsage>().is_err());
    }

    #[test]
    fn non_repudiation_and_content_commitment_are_interchangeable() {
        assert!(KeyUsage::NonRepudiation.satisfies(KeyUsage::ContentCommitment));
        assert!(KeyUsage::ContentCommitment.satisfies(KeyUsage::NonRepudiation));
        assert!(!KeyUsage::ServerAuth.satisfies(KeyUsage::ClientAuth));
    }
}
