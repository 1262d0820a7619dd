//! Read-once image of the store contents for a validation run.

use genesis_types::traits::ExportData;
use std::collections::BTreeMap;

/// One `export` worth of secrets: vault path to key to value.
///
/// Populated once per validation run (plus the root-CA path when one is in
/// play) so every plan is checked against the same store image.
#[derive(Debug, Clone, Default)]
pub struct SecretSnapshot {
    data: ExportData,
}

impl SecretSnapshot {
    /// Wrap raw export data.
    pub fn new(data: ExportData) -> Self {
        Self { data }
    }

    /// All keys under a vault path.
    pub fn entry(&self, path: &str) -> Option<&BTreeMap<String, String>> {
        self.data.get(path.trim_start_matches('/'))
    }

    /// One value under a vault path.
    pub fn value(&self, path: &str, key: &str) -> Option<&str> {
        self.entry(path).and_then(|m| m.get(key)).map(String::as_str)
    }

    /// Whether anything at all was exported.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_ignore_leading_slashes() {
        let mut data = ExportData::new();
        data.entry("secret/env/x".to_string())
            .or_default()
            .insert("k".to_string(), "v".to_string());
        let snap = SecretSnapshot::new(data);
        assert_eq!(snap.value("/secret/env/x", "k"), Some("v"));
        assert_eq!(snap.value("secret/env/x", "k"), Some("v"));
        assert!(snap.value("secret/env/y", "k").is_none());
    }
}
