//! Kit metadata parsing and validation.

use genesis_types::{bail, GenesisError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Kit metadata from kit.yml, reduced to what the secret lifecycle needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KitMetadata {
    /// Kit name
    pub name: String,

    /// Kit version
    pub version: String,

    /// Kit description
    #[serde(default)]
    pub description: String,

    /// Available features
    #[serde(default)]
    pub features: HashMap<String, FeatureMetadata>,

    /// Certificate declarations, keyed by feature
    #[serde(default)]
    pub certificates: serde_yaml::Value,

    /// Credential declarations, keyed by feature
    #[serde(default)]
    pub credentials: serde_yaml::Value,

    /// Operator-provided secret declarations, keyed by feature
    #[serde(default)]
    pub provided: serde_yaml::Value,
}

/// Feature metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureMetadata {
    /// Feature description
    #[serde(default)]
    pub description: String,

    /// Features this feature depends on
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Features incompatible with this one
    #[serde(default)]
    pub conflicts_with: Vec<String>,
}

impl KitMetadata {
    /// Load metadata from a kit.yml file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GenesisError::Kit(format!("Failed to read kit.yml: {}", e)))?;
        Self::parse(&content)
    }

    /// Parse metadata from kit.yml content.
    pub fn parse(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| GenesisError::Kit(format!("Failed to parse kit.yml: {}", e)))
    }

    /// Check if a feature exists.
    ///
    /// `base` is always active and need not be declared; a feature is also
    /// recognized when any secret grouping mentions it, since many kits
    /// declare secret groups without a matching features entry.
    pub fn has_feature(&self, feature: &str) -> bool {
        if feature == "base" || self.features.contains_key(feature) {
            return true;
        }
        [&self.certificates, &self.credentials, &self.provided]
            .iter()
            .any(|section| {
                section
                    .as_mapping()
                    .map(|m| m.contains_key(serde_yaml::Value::from(feature)))
                    .unwrap_or(false)
            })
    }

    /// Validate a requested feature list against the declarations.
    pub fn validate_features(&self, features: &[String]) -> Result<()> {
        for feature in features {
            if !self.has_feature(feature) {
                bail!(BadRequest, "Unknown feature: {}", feature);
            }

            if let Some(meta) = self.features.get(feature) {
                for dep in &meta.depends_on {
                    if dep != "base" && !features.contains(dep) {
                        bail!(BadRequest, "Feature '{}' requires feature '{}'", feature, dep);
                    }
                }

                for conflict in &meta.conflicts_with {
                    if features.contains(conflict) {
                        bail!(
                            BadRequest,
                            "Feature '{}' conflicts with feature '{}'",
                            feature,
                            conflict
                        );
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KIT_YML: &str = r#"
name: shield
version: 2.1.0
features:
  ha:
    description: high availability
    depends_on: [tls]
  tls: {}
  solo:
    conflicts_with: [ha]
certificates:
  tls:
    shield/tls:
      ca: { is_ca: true }
credentials:
  base:
    shield/daemon:
      token: random 32
"#;

    #[test]
    fn parses_kit_yml() {
        let kit = KitMetadata::parse(KIT_YML).unwrap();
        assert_eq!(kit.name, "shield");
        assert_eq!(kit.version, "2.1.0");
        assert!(kit.certificates.is_mapping());
    }

    #[test]
    fn loads_from_a_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(KIT_YML.as_bytes()).unwrap();
        file.flush().unwrap();
        let kit = KitMetadata::load(file.path()).unwrap();
        assert_eq!(kit.name, "shield");
        assert!(KitMetadata::load("/definitely/not/there/kit.yml").is_err());
    }

    #[test]
    fn base_is_always_a_feature() {
        let kit = KitMetadata::parse(KIT_YML).unwrap();
        assert!(kit.has_feature("base"));
        assert!(kit.has_feature("ha"));
        assert!(!kit.has_feature("ipv6"));
    }

    #[test]
    fn feature_dependencies_are_enforced() {
        let kit = KitMetadata::parse(KIT_YML).unwrap();
        assert!(kit.validate_features(&["tls".into(), "ha".into()]).is_ok());
        assert!(kit.validate_features(&["ha".into()]).is_err());
        assert!(kit
            .validate_features(&["ha".into(), "tls".into(), "solo".into()])
            .is_err());
        assert!(kit.validate_features(&["ipv6".into()]).is_err());
    }
}
