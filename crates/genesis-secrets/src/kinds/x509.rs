//! X.509 certificate secrets.
//!
//! Plans are declared per leaf under a base path; the resolver assigns
//! signers and ordering. Validation parses stored PEM natively and checks
//! the certificate against everything the plan declares.

use chrono::{DateTime, TimeZone, Utc};
use genesis_types::traits::SecretStore;
use genesis_types::{bail, GenesisError, KeyUsage, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use x509_parser::extensions::{GeneralName, ParsedExtension};
use x509_parser::public_key::PublicKey;

use crate::report::Check;

/// Legacy signer literal still emitted by proof-of-concept kits; rewritten
/// for compatibility.
const LEGACY_SIGNED_BY: &str = "base.application/certs.ca";
const LEGACY_SIGNED_BY_REWRITE: &str = "application/certs/ca";

/// Certificates within this many days of expiry validate as warnings.
const TTL_WARN_DAYS: i64 = 30;

static VALID_FOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)([ymdh])$").unwrap());

/// A validity period in store syntax: `<posint>[ymdh]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidFor {
    /// The count
    pub amount: u64,
    /// One of `y`, `m`, `d`, `h`
    pub unit: char,
}

impl ValidFor {
    /// Parse a `2y` / `90d` style period.
    pub fn parse(s: &str) -> Result<Self> {
        let caps = VALID_FOR.captures(s.trim()).ok_or_else(|| {
            GenesisError::BadRequest(format!(
                "Invalid validity period '{}': expected <number>[ymdh]",
                s
            ))
        })?;
        Ok(Self {
            amount: caps[1].parse().unwrap(),
            unit: caps[2].chars().next().unwrap(),
        })
    }
}

impl fmt::Display for ValidFor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit)
    }
}

/// An X.509 certificate request.
#[derive(Debug, Clone, PartialEq)]
pub struct X509Plan {
    /// The YAML key grouping this leaf with its CA
    pub base_path: String,
    /// This certificate is a certificate authority
    pub is_ca: bool,
    /// 0 = signed, 1 = unsigned leaf treated as self-signed,
    /// 2 = explicitly self-signed (signer == signee)
    pub self_signed: u8,
    /// Path of the signing CA, once declared or resolved
    pub signed_by: Option<String>,
    /// The signer path is absolute in the store rather than relative to the
    /// environment
    pub signed_by_abs_path: bool,
    /// Subject names; the first is the CN, all are SANs
    pub names: Vec<String>,
    /// Declared key usage; kind defaults apply when absent
    pub usage: Option<Vec<KeyUsage>>,
    /// Declared validity period
    pub valid_for: Option<ValidFor>,
}

impl X509Plan {
    /// Parse one leaf's x509 spec map.
    pub fn from_spec(base_path: &str, spec: &Value) -> Result<Self> {
        let map = spec.as_mapping().ok_or_else(|| {
            GenesisError::BadRequest("certificate spec must be a map".to_string())
        })?;

        let is_ca = map
            .get(Value::from("is_ca"))
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let signed_by = match map.get(Value::from("signed_by")) {
            None => None,
            Some(v) => {
                let s = v.as_str().ok_or_else(|| {
                    GenesisError::BadRequest("signed_by must be a string".to_string())
                })?;
                Some(rewrite_legacy_signer(s))
            }
        };

        let names = match map.get(Value::from("names")) {
            None => Vec::new(),
            Some(v) => v
                .as_sequence()
                .ok_or_else(|| GenesisError::BadRequest("names must be a list".to_string()))?
                .iter()
                .map(|n| {
                    n.as_str().map(str::to_string).ok_or_else(|| {
                        GenesisError::BadRequest("names must be strings".to_string())
                    })
                })
                .collect::<Result<Vec<_>>>()?,
        };

        let usage = match map.get(Value::from("usage")) {
            None => None,
            Some(v) => {
                let tokens = v
                    .as_sequence()
                    .ok_or_else(|| GenesisError::BadRequest("usage must be a list".to_string()))?;
                let mut usage = Vec::new();
                for token in tokens {
                    let token = token.as_str().ok_or_else(|| {
                        GenesisError::BadRequest("usage entries must be strings".to_string())
                    })?;
                    usage.push(token.parse::<KeyUsage>()?);
                }
                Some(usage)
            }
        };

        let valid_for = match map.get(Value::from("valid_for")) {
            None => None,
            Some(v) => {
                let s = match v {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    _ => bail!(BadRequest, "valid_for must be a string"),
                };
                Some(ValidFor::parse(&s)?)
            }
        };

        Ok(Self {
            base_path: base_path.to_string(),
            is_ca,
            self_signed: 0,
            signed_by,
            signed_by_abs_path: false,
            names,
            usage,
            valid_for,
        })
    }

    /// The key usage to assert and validate: the declared set, or the kind
    /// defaults (`server_auth, client_auth` for leaves, plus
    /// `crl_sign, key_cert_sign` for CAs).
    pub fn effective_usage(&self) -> Vec<KeyUsage> {
        self.usage.clone().unwrap_or_else(|| default_usage(self.is_ca))
    }

    /// The store keys this plan populates.
    pub fn expected_keys(&self) -> Vec<String> {
        let mut keys = vec!["certificate".to_string(), "combined".to_string(), "key".to_string()];
        if self.is_ca {
            keys.push("crl".to_string());
            keys.push("serial".to_string());
        }
        keys
    }

    /// Short human description.
    pub fn describe(&self) -> String {
        let role = match (self.is_ca, self.self_signed) {
            (true, 0) => "intermediate CA certificate",
            (true, _) => "self-signed CA certificate",
            (false, 0) => "certificate",
            (false, _) => "self-signed certificate",
        };
        match self.names.first() {
            Some(cn) => format!("{} for {}", role, cn),
            None => role.to_string(),
        }
    }

    /// Re-emit the spec map this plan parses from.
    pub fn to_spec(&self) -> Value {
        let mut map = serde_yaml::Mapping::new();
        if self.is_ca {
            map.insert(Value::from("is_ca"), Value::from(true));
        }
        if let Some(ref signer) = self.signed_by {
            map.insert(Value::from("signed_by"), Value::from(signer.as_str()));
        }
        if !self.names.is_empty() {
            map.insert(
                Value::from("names"),
                Value::Sequence(self.names.iter().map(|n| Value::from(n.as_str())).collect()),
            );
        }
        if let Some(ref usage) = self.usage {
            map.insert(
                Value::from("usage"),
                Value::Sequence(usage.iter().map(|u| Value::from(u.to_string())).collect()),
            );
        }
        if let Some(ref valid_for) = self.valid_for {
            map.insert(Value::from("valid_for"), Value::from(valid_for.to_string()));
        }
        Value::Mapping(map)
    }

    /// Filter attribute lookup.
    pub fn attr(&self, key: &str) -> Option<String> {
        match key {
            "base_path" => Some(self.base_path.clone()),
            "is_ca" => Some(self.is_ca.to_string()),
            "self_signed" => Some(self.self_signed.to_string()),
            "signed_by" => self.signed_by.clone(),
            "signed_by_abs_path" => Some(self.signed_by_abs_path.to_string()),
            "valid_for" => self.valid_for.as_ref().map(|v| v.to_string()),
            _ => None,
        }
    }

    /// Validate stored certificate material against this plan.
    ///
    /// `signer_pem` is the signing CA's certificate when the snapshot holds
    /// it; `store` and `signer_full_path` back the last-resort chain check.
    pub async fn validate<S: SecretStore + ?Sized>(
        &self,
        full_path: &str,
        entry: Option<&BTreeMap<String, String>>,
        signer_pem: Option<&str>,
        signer_full_path: Option<&str>,
        store: &S,
    ) -> Vec<Check> {
        let entry = match entry {
            Some(e) => e,
            None => return vec![Check::missing("secret")],
        };

        let mut checks = Vec::new();
        for key in self.expected_keys() {
            if !entry.contains_key(&key) {
                checks.push(Check::missing(key));
            }
        }

        let cert_pem = match entry.get("certificate") {
            Some(p) => p,
            None => return checks,
        };
        let info = match parse_cert_pem(cert_pem) {
            Ok(info) => info,
            Err(e) => {
                checks.push(Check::error("certificate parses", e.to_string()));
                return checks;
            }
        };

        checks.extend(self.static_checks(&info, entry.get("key").map(String::as_str)));

        // Signage: declared self-signed certs check their own key ids;
        // everything else checks against the signer, preferring key-id
        // match, then native chain verification, then the store's opinion.
        if self.self_signed > 0 {
            checks.push(self_signed_check(&info));
        } else if self.signed_by.is_some() {
            checks.push(match signer_pem {
                Some(signer_pem) => signage_check(cert_pem, signer_pem, &info),
                None => match signer_full_path {
                    Some(signer_path) => {
                        match store.check_x509_chain(full_path, signer_path).await {
                            Ok(true) => Check::ok("signed by"),
                            Ok(false) => Check::error(
                                "signed by",
                                format!("store does not consider {} the signer", signer_path),
                            ),
                            Err(e) => Check::error("signed by", e.to_string()),
                        }
                    }
                    None => Check::error("signed by", "signing CA is not in the store"),
                },
            });
        }

        checks
    }

    /// The checks that need nothing but the parsed certificate and key.
    pub(crate) fn static_checks(&self, info: &CertInfo, key_pem: Option<&str>) -> Vec<Check> {
        let mut checks = Vec::new();

        if let Some(cn) = self.names.first() {
            match &info.cn {
                Some(actual) if actual == cn => {
                    checks.push(Check::ok_with("subject", format!("CN = {}", cn)))
                }
                Some(actual) => checks.push(Check::error(
                    "subject",
                    format!("CN is '{}', expected '{}'", actual, cn),
                )),
                None => checks.push(Check::error("subject", format!("no CN, expected '{}'", cn))),
            }

            checks.push(san_check(&self.names, &info.sans));
        }

        if info.is_ca == self.is_ca {
            checks.push(Check::ok(if self.is_ca { "is a CA" } else { "is not a CA" }));
        } else {
            checks.push(Check::error(
                "basic constraints",
                format!("CA flag is {}, expected {}", info.is_ca, self.is_ca),
            ));
        }

        checks.push(ttl_check(info.not_before, info.not_after, Utc::now()));
        checks.push(usage_check(&self.effective_usage(), &info.usage));

        if let (Some(cert_modulus), Some(key_pem)) = (&info.modulus, key_pem) {
            checks.push(match super::rsa::parse_private(key_pem) {
                Ok(key) => {
                    use rsa::traits::PublicKeyParts;
                    if key.n().to_bytes_be() == *cert_modulus {
                        Check::ok("modulus agreement")
                    } else {
                        Check::error(
                            "modulus agreement",
                            "private key does not belong to the certificate",
                        )
                    }
                }
                Err(e) => Check::error("private key parses", e.to_string()),
            });
        }

        checks
    }
}

/// The default usage set for freshly declared certificates.
pub fn default_usage(is_ca: bool) -> Vec<KeyUsage> {
    if is_ca {
        vec![
            KeyUsage::ServerAuth,
            KeyUsage::ClientAuth,
            KeyUsage::CrlSign,
            KeyUsage::KeyCertSign,
        ]
    } else {
        vec![KeyUsage::ServerAuth, KeyUsage::ClientAuth]
    }
}

/// Rewrite the one legacy signer literal older kits still carry.
pub(crate) fn rewrite_legacy_signer(signed_by: &str) -> String {
    if signed_by == LEGACY_SIGNED_BY {
        LEGACY_SIGNED_BY_REWRITE.to_string()
    } else {
        signed_by.to_string()
    }
}

/// Everything validation needs out of a parsed certificate, owned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertInfo {
    /// Subject CN
    pub cn: Option<String>,
    /// Subject alternative names
    pub sans: Vec<String>,
    /// Subject DN, rendered
    pub subject: String,
    /// Issuer DN, rendered
    pub issuer: String,
    /// Validity start
    pub not_before: DateTime<Utc>,
    /// Validity end
    pub not_after: DateTime<Utc>,
    /// Basic-constraints CA flag
    pub is_ca: bool,
    /// Subject key identifier, hex
    pub subject_key_id: Option<String>,
    /// Authority key identifier, hex
    pub authority_key_id: Option<String>,
    /// Key usage and extended key usage tokens we recognize
    pub usage: Vec<KeyUsage>,
    /// RSA modulus bytes (big-endian, no leading zero)
    pub modulus: Option<Vec<u8>>,
}

/// Parse a PEM certificate into an owned [`CertInfo`].
pub fn parse_cert_pem(pem: &str) -> Result<CertInfo> {
    let (_, parsed) = x509_parser::pem::parse_x509_pem(pem.as_bytes())
        .map_err(|e| GenesisError::Validation(format!("invalid certificate PEM: {}", e)))?;
    let cert = parsed
        .parse_x509()
        .map_err(|e| GenesisError::Validation(format!("invalid certificate DER: {}", e)))?;

    let cn = cert
        .subject()
        .iter_common_name()
        .next()
        .and_then(|attr| attr.as_str().ok())
        .map(str::to_string);

    let mut sans = Vec::new();
    let mut is_ca = false;
    let mut subject_key_id = None;
    let mut authority_key_id = None;
    let mut usage = Vec::new();

    for ext in cert.extensions() {
        match ext.parsed_extension() {
            ParsedExtension::BasicConstraints(bc) => is_ca = bc.ca,
            ParsedExtension::SubjectAlternativeName(san) => {
                for name in &san.general_names {
                    match name {
                        GeneralName::DNSName(dns) => sans.push(dns.to_string()),
                        GeneralName::RFC822Name(mail) => sans.push(mail.to_string()),
                        GeneralName::IPAddress(octets) => {
                            if octets.len() == 4 {
                                sans.push(format!(
                                    "{}.{}.{}.{}",
                                    octets[0], octets[1], octets[2], octets[3]
                                ));
                            }
                        }
                        _ => {}
                    }
                }
            }
            ParsedExtension::SubjectKeyIdentifier(ski) => {
                subject_key_id = Some(hex::encode(ski.0));
            }
            ParsedExtension::AuthorityKeyIdentifier(aki) => {
                authority_key_id = aki.key_identifier.as_ref().map(|k| hex::encode(k.0));
            }
            ParsedExtension::KeyUsage(ku) => {
                if ku.digital_signature() {
                    usage.push(KeyUsage::DigitalSignature);
                }
                if ku.non_repudiation() {
                    usage.push(KeyUsage::NonRepudiation);
                }
                if ku.key_encipherment() {
                    usage.push(KeyUsage::KeyEncipherment);
                }
                if ku.data_encipherment() {
                    usage.push(KeyUsage::DataEncipherment);
                }
                if ku.key_agreement() {
                    usage.push(KeyUsage::KeyAgreement);
                }
                if ku.key_cert_sign() {
                    usage.push(KeyUsage::KeyCertSign);
                }
                if ku.crl_sign() {
                    usage.push(KeyUsage::CrlSign);
                }
                if ku.encipher_only() {
                    usage.push(KeyUsage::EncipherOnly);
                }
                if ku.decipher_only() {
                    usage.push(KeyUsage::DecipherOnly);
                }
            }
            ParsedExtension::ExtendedKeyUsage(eku) => {
                if eku.server_auth {
                    usage.push(KeyUsage::ServerAuth);
                }
                if eku.client_auth {
                    usage.push(KeyUsage::ClientAuth);
                }
                if eku.code_signing {
                    usage.push(KeyUsage::CodeSigning);
                }
                if eku.email_protection {
                    usage.push(KeyUsage::EmailProtection);
                }
                if eku.time_stamping {
                    usage.push(KeyUsage::Timestamping);
                }
            }
            _ => {}
        }
    }

    let modulus = match cert.public_key().parsed() {
        Ok(PublicKey::RSA(rsa)) => {
            let stripped: Vec<u8> =
                rsa.modulus.iter().copied().skip_while(|&b| b == 0).collect();
            Some(stripped)
        }
        _ => None,
    };

    let not_before = Utc
        .timestamp_opt(cert.validity().not_before.timestamp(), 0)
        .single()
        .ok_or_else(|| GenesisError::Validation("unrepresentable notBefore".to_string()))?;
    let not_after = Utc
        .timestamp_opt(cert.validity().not_after.timestamp(), 0)
        .single()
        .ok_or_else(|| GenesisError::Validation("unrepresentable notAfter".to_string()))?;

    Ok(CertInfo {
        cn,
        sans,
        subject: cert.subject().to_string(),
        issuer: cert.issuer().to_string(),
        not_before,
        not_after,
        is_ca,
        subject_key_id,
        authority_key_id,
        usage,
        modulus,
    })
}

/// Native chain verification: is `cert_pem` signed by `signer_pem`'s key?
pub fn verify_signed_by(cert_pem: &str, signer_pem: &str) -> Result<bool> {
    let (_, cert_parsed) = x509_parser::pem::parse_x509_pem(cert_pem.as_bytes())
        .map_err(|e| GenesisError::Validation(format!("invalid certificate PEM: {}", e)))?;
    let (_, signer_parsed) = x509_parser::pem::parse_x509_pem(signer_pem.as_bytes())
        .map_err(|e| GenesisError::Validation(format!("invalid signer PEM: {}", e)))?;
    let cert = cert_parsed
        .parse_x509()
        .map_err(|e| GenesisError::Validation(format!("invalid certificate DER: {}", e)))?;
    let signer = signer_parsed
        .parse_x509()
        .map_err(|e| GenesisError::Validation(format!("invalid signer DER: {}", e)))?;

    Ok(cert.verify_signature(Some(signer.public_key())).is_ok())
}

fn self_signed_check(info: &CertInfo) -> Check {
    match (&info.subject_key_id, &info.authority_key_id) {
        (Some(ski), Some(aki)) => {
            if ski == aki {
                Check::ok("self-signed")
            } else {
                Check::error("self-signed", "authority key id names a different key")
            }
        }
        _ => {
            if info.subject == info.issuer {
                Check::ok("self-signed")
            } else {
                Check::error(
                    "self-signed",
                    format!("issued by '{}', not itself", info.issuer),
                )
            }
        }
    }
}

fn signage_check(cert_pem: &str, signer_pem: &str, info: &CertInfo) -> Check {
    if let (Some(aki), Ok(signer_info)) = (&info.authority_key_id, parse_cert_pem(signer_pem)) {
        if let Some(ski) = &signer_info.subject_key_id {
            return if aki == ski {
                Check::ok("signed by")
            } else {
                Check::error("signed by", "authority key id does not match the signing CA")
            };
        }
    }
    match verify_signed_by(cert_pem, signer_pem) {
        Ok(true) => Check::ok("signed by"),
        Ok(false) => Check::error("signed by", "signature does not verify against the signing CA"),
        Err(e) => Check::error("signed by", e.to_string()),
    }
}

/// Compare the declared SAN set with the certificate's.
pub(crate) fn san_check(expected: &[String], actual: &[String]) -> Check {
    let want: BTreeSet<&str> = expected.iter().map(String::as_str).collect();
    let have: BTreeSet<&str> = actual.iter().map(String::as_str).collect();

    let missing: Vec<&str> = want.difference(&have).copied().collect();
    let extra: Vec<&str> = have.difference(&want).copied().collect();

    if missing.is_empty() && extra.is_empty() {
        Check::ok("subject alt names")
    } else {
        let mut notes = Vec::new();
        if !missing.is_empty() {
            notes.push(format!("missing: {}", missing.join(", ")));
        }
        if !extra.is_empty() {
            notes.push(format!("extra: {}", extra.join(", ")));
        }
        Check::error("subject alt names", notes.join("; "))
    }
}

/// Classify the certificate's remaining lifetime.
pub(crate) fn ttl_check(
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Check {
    if now < not_before {
        return Check::error("ttl", format!("not valid until {}", not_before));
    }
    if now > not_after {
        return Check::error("ttl", format!("expired {}", not_after));
    }
    let days_left = (not_after - now).num_days();
    if days_left <= TTL_WARN_DAYS {
        Check::warn("ttl", format!("expires in {} days", days_left))
    } else {
        Check::ok_with("ttl", format!("expires in {} days", days_left))
    }
}

/// Compare declared and actual usage sets, honoring the
/// `non_repudiation`/`content_commitment` synonymy.
pub(crate) fn usage_check(declared: &[KeyUsage], actual: &[KeyUsage]) -> Check {
    fn canon(u: KeyUsage) -> KeyUsage {
        if u == KeyUsage::ContentCommitment {
            KeyUsage::NonRepudiation
        } else {
            u
        }
    }
    let want: BTreeSet<String> = declared.iter().map(|u| canon(*u).to_string()).collect();
    let have: BTreeSet<String> = actual.iter().map(|u| canon(*u).to_string()).collect();

    if want == have {
        return Check::ok("key usage");
    }
    let missing: Vec<String> = want.difference(&have).cloned().collect();
    let extra: Vec<String> = have.difference(&want).cloned().collect();
    let mut notes = Vec::new();
    if !missing.is_empty() {
        notes.push(format!("missing: {}", missing.join(", ")));
    }
    if !extra.is_empty() {
        notes.push(format!("extra: {}", extra.join(", ")));
    }
    Check::error("key usage", notes.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use genesis_types::CheckStatus;

    fn spec(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn parses_a_full_spec() {
        let plan = X509Plan::from_spec(
            "my-cert",
            &spec(
                r#"
is_ca: true
signed_by: upstream/ca
names: [srv.example, 10.0.0.1]
usage: [server_auth, crl_sign]
valid_for: 2y
"#,
            ),
        )
        .unwrap();
        assert!(plan.is_ca);
        assert_eq!(plan.signed_by.as_deref(), Some("upstream/ca"));
        assert_eq!(plan.names, vec!["srv.example", "10.0.0.1"]);
        assert_eq!(plan.usage.as_ref().unwrap().len(), 2);
        assert_eq!(plan.valid_for.as_ref().unwrap().to_string(), "2y");
    }

    #[test]
    fn bad_specs_are_rejected() {
        assert!(X509Plan::from_spec("b", &spec("just a string")).is_err());
        assert!(X509Plan::from_spec("b", &spec("usage: [signing]")).is_err());
        assert!(X509Plan::from_spec("b", &spec("valid_for: soon")).is_err());
        assert!(X509Plan::from_spec("b", &spec("names: nope")).is_err());
    }

    #[test]
    fn legacy_signer_literal_is_rewritten() {
        let plan =
            X509Plan::from_spec("b", &spec("signed_by: base.application/certs.ca")).unwrap();
        assert_eq!(plan.signed_by.as_deref(), Some("application/certs/ca"));

        // only the exact literal is rewritten
        let other = X509Plan::from_spec("b", &spec("signed_by: base.other/certs.ca")).unwrap();
        assert_eq!(other.signed_by.as_deref(), Some("base.other/certs.ca"));
    }

    #[test]
    fn valid_for_grammar() {
        assert_eq!(ValidFor::parse("90d").unwrap().to_string(), "90d");
        assert_eq!(ValidFor::parse("2y").unwrap().unit, 'y');
        assert!(ValidFor::parse("2w").is_err());
        assert!(ValidFor::parse("y2").is_err());
    }

    #[test]
    fn default_usage_sets() {
        assert_eq!(default_usage(false), vec![KeyUsage::ServerAuth, KeyUsage::ClientAuth]);
        assert_eq!(default_usage(true).len(), 4);
    }

    #[test]
    fn usage_comparison_honors_the_synonym() {
        let declared = vec![KeyUsage::DigitalSignature, KeyUsage::NonRepudiation];
        let actual = vec![KeyUsage::ContentCommitment, KeyUsage::DigitalSignature];
        assert_eq!(usage_check(&declared, &actual).status, CheckStatus::Ok);

        let wrong = vec![KeyUsage::DigitalSignature];
        let check = usage_check(&declared, &wrong);
        assert_eq!(check.status, CheckStatus::Error);
        assert!(check.note.unwrap().contains("non_repudiation"));
    }

    #[test]
    fn san_differences_report_both_directions() {
        let check = san_check(
            &["a.example".to_string(), "b.example".to_string()],
            &["b.example".to_string(), "c.example".to_string()],
        );
        assert_eq!(check.status, CheckStatus::Error);
        let note = check.note.unwrap();
        assert!(note.contains("missing: a.example"));
        assert!(note.contains("extra: c.example"));
    }

    #[test]
    fn ttl_boundaries() {
        let now = Utc::now();
        let fresh = ttl_check(now - Duration::days(1), now + Duration::days(365), now);
        assert_eq!(fresh.status, CheckStatus::Ok);

        let soon = ttl_check(now - Duration::days(1), now + Duration::days(10), now);
        assert_eq!(soon.status, CheckStatus::Warn);

        let expired = ttl_check(now - Duration::days(30), now - Duration::days(1), now);
        assert_eq!(expired.status, CheckStatus::Error);

        let not_yet = ttl_check(now + Duration::days(1), now + Duration::days(30), now);
        assert_eq!(not_yet.status, CheckStatus::Error);
    }

    #[test]
    fn spec_round_trip() {
        let plan = X509Plan::from_spec(
            "b",
            &spec("{is_ca: true, names: [x.example], usage: [server_auth], valid_for: 1y}"),
        )
        .unwrap();
        let reparsed = X509Plan::from_spec("b", &plan.to_spec()).unwrap();
        assert_eq!(plan, reparsed);
    }
}
