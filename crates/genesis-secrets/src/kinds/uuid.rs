//! UUID secrets.

use genesis_types::{bail, GenesisError, Result};
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::report::Check;

/// UUID version selector: `v1|time`, `v3|md5`, `v4|random`, `v5|sha1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UuidVersion {
    /// Time-based
    V1,
    /// MD5 name-based
    V3,
    /// Random
    V4,
    /// SHA1 name-based
    V5,
}

impl UuidVersion {
    /// Parse a version token.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "v1" | "time" => Some(UuidVersion::V1),
            "v3" | "md5" => Some(UuidVersion::V3),
            "v4" | "random" => Some(UuidVersion::V4),
            "v5" | "sha1" => Some(UuidVersion::V5),
            _ => None,
        }
    }

    /// Whether this version derives its value from namespace + name.
    pub fn is_name_based(&self) -> bool {
        matches!(self, UuidVersion::V3 | UuidVersion::V5)
    }
}

impl fmt::Display for UuidVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UuidVersion::V1 => write!(f, "v1"),
            UuidVersion::V3 => write!(f, "v3"),
            UuidVersion::V4 => write!(f, "v4"),
            UuidVersion::V5 => write!(f, "v5"),
        }
    }
}

/// Namespace for name-based UUIDs: a well-known alias or a literal UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UuidNamespace {
    /// RFC 4122 DNS namespace
    Dns,
    /// RFC 4122 URL namespace
    Url,
    /// RFC 4122 OID namespace
    Oid,
    /// RFC 4122 X.500 namespace
    X500,
    /// A custom namespace UUID
    Custom(Uuid),
}

impl UuidNamespace {
    /// Parse a namespace token.
    pub fn parse(token: &str) -> Result<Self> {
        match token {
            "dns" => Ok(UuidNamespace::Dns),
            "url" => Ok(UuidNamespace::Url),
            "oid" => Ok(UuidNamespace::Oid),
            "x500" => Ok(UuidNamespace::X500),
            other => Uuid::parse_str(other).map(UuidNamespace::Custom).map_err(|_| {
                GenesisError::BadRequest(format!(
                    "Invalid uuid namespace '{}': expected dns, url, oid, x500, or a UUID",
                    other
                ))
            }),
        }
    }

    /// The namespace UUID itself.
    pub fn uuid(&self) -> Uuid {
        match self {
            UuidNamespace::Dns => Uuid::NAMESPACE_DNS,
            UuidNamespace::Url => Uuid::NAMESPACE_URL,
            UuidNamespace::Oid => Uuid::NAMESPACE_OID,
            UuidNamespace::X500 => Uuid::NAMESPACE_X500,
            UuidNamespace::Custom(u) => *u,
        }
    }
}

impl fmt::Display for UuidNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UuidNamespace::Dns => write!(f, "dns"),
            UuidNamespace::Url => write!(f, "url"),
            UuidNamespace::Oid => write!(f, "oid"),
            UuidNamespace::X500 => write!(f, "x500"),
            UuidNamespace::Custom(u) => write!(f, "{}", u),
        }
    }
}

/// A UUID request at `path:key`:
/// `uuid [v1|time|v3|md5|v4|random|v5|sha1] [namespace <ns>] [name <n>] [fixed]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UuidPlan {
    /// The key under the vault path this UUID lives at
    pub key: String,
    /// UUID version; defaults to v4
    pub version: UuidVersion,
    /// Namespace for name-based versions; defaults to the DNS namespace
    pub namespace: Option<UuidNamespace>,
    /// Name for name-based versions; defaults to the plan path
    pub name: Option<String>,
    /// Never overwritten by `recreate`
    pub fixed: bool,
}

impl UuidPlan {
    /// Parse the tokens following the `uuid` keyword.
    pub fn parse(key: &str, tokens: &[&str]) -> Result<Self> {
        let mut plan = Self {
            key: key.to_string(),
            version: UuidVersion::V4,
            namespace: None,
            name: None,
            fixed: false,
        };

        let mut iter = tokens.iter().peekable();
        if let Some(tok) = iter.peek() {
            if let Some(version) = UuidVersion::parse(tok) {
                plan.version = version;
                iter.next();
            }
        }

        while let Some(tok) = iter.next() {
            match *tok {
                "namespace" => {
                    let ns = iter.next().ok_or_else(|| {
                        GenesisError::BadRequest("namespace requires a value".to_string())
                    })?;
                    plan.namespace = Some(UuidNamespace::parse(ns)?);
                }
                "name" => {
                    let name = iter.next().ok_or_else(|| {
                        GenesisError::BadRequest("name requires a value".to_string())
                    })?;
                    plan.name = Some(name.to_string());
                }
                "fixed" => plan.fixed = true,
                other => bail!(BadRequest, "Unexpected token '{}' in uuid spec", other),
            }
        }

        Ok(plan)
    }

    /// Sanity-check the plan itself (pre-validation): name-based versions
    /// need a name.
    pub fn check_plan(&self) -> Result<()> {
        if self.version.is_name_based() && self.name.is_none() {
            bail!(BadRequest, "uuid {} requires a name", self.version);
        }
        Ok(())
    }

    /// The name fed into name-based derivation; the plan path when none was
    /// declared.
    pub fn effective_name(&self, plan_path: &str) -> String {
        self.name.clone().unwrap_or_else(|| plan_path.to_string())
    }

    /// Compute the UUID this plan declares.
    ///
    /// v3/v5 are fully deterministic; v1 embeds a node id derived from the
    /// plan path so repeated generation stays stable per plan.
    pub fn generate(&self, plan_path: &str) -> Uuid {
        match self.version {
            UuidVersion::V1 => Uuid::now_v1(&node_id(plan_path)),
            UuidVersion::V3 => Uuid::new_v3(
                &self.namespace.unwrap_or(UuidNamespace::Dns).uuid(),
                self.effective_name(plan_path).as_bytes(),
            ),
            UuidVersion::V4 => Uuid::new_v4(),
            UuidVersion::V5 => Uuid::new_v5(
                &self.namespace.unwrap_or(UuidNamespace::Dns).uuid(),
                self.effective_name(plan_path).as_bytes(),
            ),
        }
    }

    /// Short human description.
    pub fn describe(&self) -> String {
        format!("{} UUID{}", self.version, if self.fixed { " (fixed)" } else { "" })
    }

    /// The cred-line this plan re-emits as.
    pub fn to_spec(&self) -> String {
        let mut spec = format!("uuid {}", self.version);
        if let Some(ref ns) = self.namespace {
            spec.push_str(&format!(" namespace {}", ns));
        }
        if let Some(ref name) = self.name {
            spec.push_str(&format!(" name {}", name));
        }
        if self.fixed {
            spec.push_str(" fixed");
        }
        spec
    }

    /// Filter attribute lookup.
    pub fn attr(&self, key: &str) -> Option<String> {
        match key {
            "version" => Some(self.version.to_string()),
            "namespace" => self.namespace.map(|ns| ns.to_string()),
            "name" => self.name.clone(),
            "fixed" => Some(self.fixed.to_string()),
            _ => None,
        }
    }

    /// Validate a stored UUID: it parses, and for name-based versions the
    /// hash of the declared namespace + name reproduces it exactly.
    pub fn validate(
        &self,
        plan_path: &str,
        entry: Option<&BTreeMap<String, String>>,
    ) -> Vec<Check> {
        let entry = match entry {
            Some(e) => e,
            None => return vec![Check::missing("secret")],
        };
        let stored = match entry.get(&self.key) {
            Some(v) => v,
            None => return vec![Check::missing(self.key.clone())],
        };

        let parsed = match Uuid::parse_str(stored) {
            Ok(u) => u,
            Err(e) => return vec![Check::error("uuid", format!("unparseable UUID: {}", e))],
        };
        let mut checks = vec![Check::ok_with("uuid", format!("{} parses", parsed))];

        if self.version.is_name_based() {
            let expected = self.generate(plan_path);
            if expected == parsed {
                checks.push(Check::ok("hash"));
            } else {
                checks.push(Check::error(
                    "hash",
                    format!(
                        "stored value {} does not match the derivation ({})",
                        parsed, expected
                    ),
                ));
            }
        }

        checks
    }
}

/// A stable 6-byte node id for v1 UUIDs, derived from the plan path. The
/// multicast bit is set, as RFC 4122 requires for non-MAC node ids.
fn node_id(plan_path: &str) -> [u8; 6] {
    let digest = Sha1::digest(plan_path.as_bytes());
    let mut node = [0u8; 6];
    node.copy_from_slice(&digest[..6]);
    node[0] |= 0x01;
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use genesis_types::CheckStatus;

    #[test]
    fn version_tokens_and_aliases() {
        assert_eq!(UuidVersion::parse("v1"), Some(UuidVersion::V1));
        assert_eq!(UuidVersion::parse("time"), Some(UuidVersion::V1));
        assert_eq!(UuidVersion::parse("md5"), Some(UuidVersion::V3));
        assert_eq!(UuidVersion::parse("random"), Some(UuidVersion::V4));
        assert_eq!(UuidVersion::parse("sha1"), Some(UuidVersion::V5));
        assert_eq!(UuidVersion::parse("v6"), None);
    }

    #[test]
    fn defaults_to_v4() {
        let plan = UuidPlan::parse("id", &[]).unwrap();
        assert_eq!(plan.version, UuidVersion::V4);
        assert!(!plan.fixed);
    }

    #[test]
    fn parses_namespace_and_name() {
        let plan = UuidPlan::parse("id", &["v5", "namespace", "dns", "name", "foo.example"]).unwrap();
        assert_eq!(plan.version, UuidVersion::V5);
        assert_eq!(plan.namespace, Some(UuidNamespace::Dns));
        assert_eq!(plan.name.as_deref(), Some("foo.example"));

        let custom = UuidPlan::parse(
            "id",
            &["v3", "namespace", "6ba7b810-9dad-11d1-80b4-00c04fd430c8", "name", "x"],
        )
        .unwrap();
        assert!(matches!(custom.namespace, Some(UuidNamespace::Custom(_))));

        assert!(UuidPlan::parse("id", &["v5", "namespace", "bogus"]).is_err());
        assert!(UuidPlan::parse("id", &["whatever"]).is_err());
    }

    #[test]
    fn name_based_versions_require_a_name() {
        assert!(UuidPlan::parse("id", &["v5"]).unwrap().check_plan().is_err());
        assert!(UuidPlan::parse("id", &["v5", "name", "x"]).unwrap().check_plan().is_ok());
        assert!(UuidPlan::parse("id", &["v4"]).unwrap().check_plan().is_ok());
    }

    #[test]
    fn v5_derivation_is_deterministic_and_matches_rfc() {
        let plan = UuidPlan::parse("id", &["v5", "namespace", "dns", "name", "foo.example"]).unwrap();
        let a = plan.generate("p:id");
        let b = plan.generate("p:id");
        assert_eq!(a, b);
        assert_eq!(a, Uuid::new_v5(&Uuid::NAMESPACE_DNS, b"foo.example"));
    }

    #[test]
    fn tampered_v5_fails_the_hash_check() {
        let plan = UuidPlan::parse("id", &["v5", "namespace", "dns", "name", "foo.example"]).unwrap();
        let good = plan.generate("p:id").to_string();

        let mut entry = BTreeMap::new();
        entry.insert("id".to_string(), good.clone());
        assert!(plan.validate("p:id", Some(&entry)).iter().all(|c| c.status == CheckStatus::Ok));

        entry.insert("id".to_string(), Uuid::new_v4().to_string());
        let checks = plan.validate("p:id", Some(&entry));
        assert!(checks.iter().any(|c| c.label == "hash" && c.status == CheckStatus::Error));
    }

    #[test]
    fn spec_round_trip() {
        for spec in [
            "uuid v4",
            "uuid v4 fixed",
            "uuid v5 namespace dns name foo.example",
            "uuid v1 fixed",
        ] {
            let tokens: Vec<&str> = spec.split_whitespace().skip(1).collect();
            let plan = UuidPlan::parse("k", &tokens).unwrap();
            assert_eq!(plan.to_spec(), spec);
        }
    }
}
