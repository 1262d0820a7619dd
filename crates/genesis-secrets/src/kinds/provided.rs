//! Operator-provided secrets.

use genesis_types::{bail, GenesisError, Result};
use indexmap::IndexMap;
use serde_yaml::Value;
use std::collections::BTreeMap;

use crate::report::Check;

/// One key an operator must supply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvidedKey {
    /// Declared key type, when the kit refines it
    pub key_type: Option<String>,
    /// Hidden input; defaults to true
    pub sensitive: bool,
    /// Captured as multi-line input
    pub multiline: bool,
    /// Prompt text shown to the operator
    pub prompt: Option<String>,
    /// Never overwritten by `recreate`
    pub fixed: bool,
}

impl Default for ProvidedKey {
    fn default() -> Self {
        Self {
            key_type: None,
            sensitive: true,
            multiline: false,
            prompt: None,
            fixed: false,
        }
    }
}

/// A secret the operator supplies interactively: a `generic` path with a
/// map of keys to collect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvidedPlan {
    /// Provided subtype; only `generic` is recognized
    pub subtype: String,
    /// Keys to collect, in declaration order
    pub keys: IndexMap<String, ProvidedKey>,
}

impl ProvidedPlan {
    /// Parse a `provided` path spec.
    pub fn from_spec(spec: &Value) -> Result<Self> {
        let map = spec.as_mapping().ok_or_else(|| {
            GenesisError::BadRequest("provided secret must be a map".to_string())
        })?;

        let subtype = match map.get(Value::from("type")) {
            None => "generic".to_string(),
            Some(v) => v
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| GenesisError::BadRequest("provided type must be a string".to_string()))?,
        };
        if subtype != "generic" {
            bail!(BadRequest, "Unknown provided secret type '{}'", subtype);
        }

        let keys_value = map.get(Value::from("keys")).ok_or_else(|| {
            GenesisError::BadRequest("provided secret requires a keys map".to_string())
        })?;
        let keys_map = keys_value.as_mapping().ok_or_else(|| {
            GenesisError::BadRequest("provided keys must be a map".to_string())
        })?;

        let mut keys = IndexMap::new();
        for (key, attrs) in keys_map {
            let key = key
                .as_str()
                .ok_or_else(|| GenesisError::BadRequest("provided key names must be strings".to_string()))?;
            if key.contains(':') {
                bail!(BadRequest, "Invalid provided key '{}': keys cannot contain ':'", key);
            }

            let mut parsed = ProvidedKey::default();
            if let Some(attrs) = attrs.as_mapping() {
                if let Some(t) = attrs.get(Value::from("type")).and_then(Value::as_str) {
                    parsed.key_type = Some(t.to_string());
                }
                if let Some(s) = attrs.get(Value::from("sensitive")).and_then(Value::as_bool) {
                    parsed.sensitive = s;
                }
                if let Some(m) = attrs.get(Value::from("multiline")).and_then(Value::as_bool) {
                    parsed.multiline = m;
                }
                if let Some(p) = attrs.get(Value::from("prompt")).and_then(Value::as_str) {
                    parsed.prompt = Some(p.to_string());
                }
                if let Some(f) = attrs.get(Value::from("fixed")).and_then(Value::as_bool) {
                    parsed.fixed = f;
                }
            } else if !attrs.is_null() {
                bail!(BadRequest, "Attributes for provided key '{}' must be a map", key);
            }

            keys.insert(key.to_string(), parsed);
        }

        if keys.is_empty() {
            bail!(BadRequest, "provided secret declares no keys");
        }

        Ok(Self { subtype, keys })
    }

    /// The prompt for one key, with a serviceable default.
    pub fn prompt_for(&self, path: &str, key: &str) -> String {
        self.keys
            .get(key)
            .and_then(|k| k.prompt.clone())
            .unwrap_or_else(|| format!("Value for {}:{}", path, key))
    }

    /// Short human description.
    pub fn describe(&self) -> String {
        format!("operator-provided secret ({} keys)", self.keys.len())
    }

    /// Filter attribute lookup.
    pub fn attr(&self, key: &str) -> Option<String> {
        match key {
            "subtype" => Some(self.subtype.clone()),
            "fixed" => Some(self.keys.values().all(|k| k.fixed).to_string()),
            _ => None,
        }
    }

    /// Validate stored material: every declared key is present.
    pub fn validate(&self, entry: Option<&BTreeMap<String, String>>) -> Vec<Check> {
        let entry = match entry {
            Some(e) => e,
            None => return vec![Check::missing("secret")],
        };
        self.keys
            .keys()
            .map(|key| {
                if entry.contains_key(key) {
                    Check::ok(key.clone())
                } else {
                    Check::missing(key.clone())
                }
            })
            .collect()
    }
}
