//! Registry of known secret stores.
//!
//! Passed explicitly through the executor and validator; tests construct
//! fresh registries instead of clearing process-global state.

use genesis_types::{GenesisError, Result};
use std::collections::BTreeMap;

use crate::client::SafeClient;
use crate::config::VaultConfig;

/// An explicit collection of configured stores, keyed by alias.
#[derive(Debug, Default, Clone)]
pub struct StoreRegistry {
    stores: BTreeMap<String, VaultConfig>,
    default: Option<String>,
}

impl StoreRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a store. The first registered store becomes the default.
    pub fn register(&mut self, config: VaultConfig) {
        if self.default.is_none() {
            self.default = Some(config.name.clone());
        }
        self.stores.insert(config.name.clone(), config);
    }

    /// Make a registered store the default target.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.stores.contains_key(name) {
            return Err(GenesisError::BadRequest(format!(
                "Unknown secret store '{}'",
                name
            )));
        }
        self.default = Some(name.to_string());
        Ok(())
    }

    /// Look up a store by alias or URL.
    pub fn find(&self, name_or_url: &str) -> Option<&VaultConfig> {
        self.stores
            .get(name_or_url)
            .or_else(|| self.stores.values().find(|c| c.url == name_or_url))
    }

    /// The default store, if any was registered.
    pub fn default_store(&self) -> Option<&VaultConfig> {
        self.default.as_deref().and_then(|n| self.stores.get(n))
    }

    /// Build a client for a registered store.
    pub fn client(&self, name_or_url: &str) -> Result<SafeClient> {
        let config = self.find(name_or_url).ok_or_else(|| {
            GenesisError::BadRequest(format!("Unknown secret store '{}'", name_or_url))
        })?;
        Ok(SafeClient::new(config.clone()))
    }

    /// Registered store aliases, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.stores.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(name: &str, url: &str) -> VaultConfig {
        VaultConfig {
            name: name.to_string(),
            url: url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn first_registration_becomes_default() {
        let mut reg = StoreRegistry::new();
        reg.register(config("ops", "https://ops.example:8200"));
        reg.register(config("lab", "https://lab.example:8200"));
        assert_eq!(reg.default_store().unwrap().name, "ops");

        reg.set_default("lab").unwrap();
        assert_eq!(reg.default_store().unwrap().name, "lab");
        assert!(reg.set_default("nope").is_err());
    }

    #[test]
    fn lookup_by_alias_or_url() {
        let mut reg = StoreRegistry::new();
        reg.register(config("ops", "https://ops.example:8200"));
        assert!(reg.find("ops").is_some());
        assert!(reg.find("https://ops.example:8200").is_some());
        assert!(reg.find("lab").is_none());
    }
}
