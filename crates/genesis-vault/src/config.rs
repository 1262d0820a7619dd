//! Store configuration.

use genesis_core::env::resolve_refs;
use genesis_types::Result;
use serde::{Deserialize, Serialize};

/// Configuration for one secret store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Store URL
    pub url: String,
    /// Store alias
    pub name: String,
    /// Skip TLS verification
    #[serde(default)]
    pub verify: bool,
    /// Vault namespace (Enterprise)
    #[serde(default)]
    pub namespace: Option<String>,
    /// Uses the strongbox sidecar
    #[serde(default = "default_true")]
    pub strongbox: bool,
}

fn default_true() -> bool {
    true
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            url: "https://127.0.0.1:8200".to_string(),
            name: "default".to_string(),
            verify: true,
            namespace: None,
            strongbox: true,
        }
    }
}

impl VaultConfig {
    /// Build a config from possibly `${VAR}`-referencing metadata values.
    ///
    /// References are dereferenced once, here; an unset variable is a
    /// `BadRequest`, never a silently empty string.
    pub fn from_metadata(name: &str, url: &str) -> Result<Self> {
        Ok(Self {
            url: resolve_refs(url)?,
            name: resolve_refs(name)?,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_refs_are_resolved_at_load() {
        std::env::set_var("GENESIS_TEST_VAULT_ADDR", "https://v.example:8200");
        let config = VaultConfig::from_metadata("ops", "${GENESIS_TEST_VAULT_ADDR}").unwrap();
        assert_eq!(config.url, "https://v.example:8200");
        std::env::remove_var("GENESIS_TEST_VAULT_ADDR");
    }

    #[test]
    fn unset_refs_fail_loudly() {
        assert!(VaultConfig::from_metadata("ops", "${GENESIS_TEST_VAULT_UNSET}").is_err());
    }
}
