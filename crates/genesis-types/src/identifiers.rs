//! Type-safe identifiers and secret path helpers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::bail;
use crate::errors::{GenesisError, Result};

/// A validated Genesis environment name.
///
/// Environment names must:
/// - Start with a lowercase letter or digit
/// - Contain only lowercase letters, digits, and hyphens
/// - Not start with a hyphen
///
/// # Example
///
/// ```
/// use genesis_types::EnvName;
///
/// let env = EnvName::new("us-west-prod").unwrap();
/// assert_eq!(env.as_str(), "us-west-prod");
/// assert_eq!(env.secrets_slug(), "us/west/prod");
///
/// // Invalid names are rejected
/// assert!(EnvName::new("Invalid-Name").is_err());
/// assert!(EnvName::new("-invalid").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvName(String);

impl EnvName {
    /// Create a new validated environment name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name doesn't meet validation requirements.
    pub fn new(name: impl AsRef<str>) -> Result<Self> {
        let name = name.as_ref();
        if !Self::is_valid(name) {
            bail!(
                Validation,
                "Invalid environment name '{}': must contain only lowercase letters, digits, and hyphens, \
                and must start with a letter or digit",
                name
            );
        }
        Ok(Self(name.to_string()))
    }

    /// Check if a name is valid without allocating.
    pub fn is_valid(name: &str) -> bool {
        if name.is_empty() {
            return false;
        }

        let mut chars = name.chars();
        let first = chars.next().unwrap();

        if !(first.is_ascii_lowercase() || first.is_ascii_digit()) {
            return false;
        }

        chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The vault path fragment for this environment.
    ///
    /// Hyphen-separated name segments become path segments, so the
    /// environment `us-west-prod` keeps its secrets under `us/west/prod`
    /// beneath the secrets mount.
    pub fn secrets_slug(&self) -> String {
        self.0.split('-').collect::<Vec<_>>().join("/")
    }
}

impl fmt::Display for EnvName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EnvName {
    type Err = GenesisError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// Split a plan path into its vault path and optional key.
///
/// Plans for `random` and `uuid` secrets address a single key inside a
/// vault path using the `path:key` form; every other kind owns the whole
/// path.
///
/// # Example
///
/// ```
/// use genesis_types::split_path_key;
///
/// assert_eq!(split_path_key("crazy/thing:id"), ("crazy/thing", Some("id")));
/// assert_eq!(split_path_key("work/signing_key"), ("work/signing_key", None));
/// ```
pub fn split_path_key(path: &str) -> (&str, Option<&str>) {
    match path.split_once(':') {
        Some((p, k)) => (p, Some(k)),
        None => (path, None),
    }
}

/// Validate the colon rules for a plan path.
///
/// Paths contain no `:` except the single separator of the `path:key` form,
/// and keys contain no `:` at all.
pub fn validate_secret_path(path: &str, key_expected: bool) -> Result<()> {
    let colons = path.matches(':').count();
    match (key_expected, colons) {
        (false, 0) => Ok(()),
        (true, 1) => {
            let (p, k) = path.split_once(':').unwrap();
            if p.is_empty() || k.is_empty() {
                bail!(BadRequest, "Invalid secret path '{}': empty path or key", path);
            }
            Ok(())
        }
        (true, 0) => {
            bail!(BadRequest, "Invalid secret path '{}': expected a path:key form", path)
        }
        _ => bail!(
            BadRequest,
            "Invalid secret path '{}': ':' is only allowed as the path:key separator",
            path
        ),
    }
}
