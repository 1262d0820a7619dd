//! Environment variable handling.
//!
//! Kit metadata and store configuration may reference environment
//! variables as `${VAR}` tokens; these are dereferenced once at load time
//! with explicit errors for unset variables, never lazily at use time.

use genesis_types::{GenesisError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static VAR_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

/// Resolve every `${VAR}` reference in `input` against the process
/// environment.
///
/// # Errors
///
/// Returns `BadRequest` naming the first unset variable encountered.
///
/// # Example
///
/// ```
/// std::env::set_var("GENESIS_DOC_EXAMPLE", "10.0.0.1");
/// let out = genesis_core::env::resolve_refs("https://${GENESIS_DOC_EXAMPLE}:8200").unwrap();
/// assert_eq!(out, "https://10.0.0.1:8200");
/// ```
pub fn resolve_refs(input: &str) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut last = 0;

    for caps in VAR_REF.captures_iter(input) {
        let m = caps.get(0).unwrap();
        let name = &caps[1];
        let value = std::env::var(name).map_err(|_| {
            GenesisError::BadRequest(format!(
                "Reference to unset environment variable ${{{}}}",
                name
            ))
        })?;
        out.push_str(&input[last..m.start()]);
        out.push_str(&value);
        last = m.end();
    }
    out.push_str(&input[last..]);

    Ok(out)
}

/// The vault mount all environment secrets live under.
///
/// Taken from `GENESIS_SECRETS_MOUNT`, defaulting to `/secret/`; always
/// normalized to carry both a leading and a trailing slash.
pub fn secrets_mount() -> String {
    let raw = std::env::var("GENESIS_SECRETS_MOUNT").unwrap_or_default();
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/secret/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}

/// Subject CN to re-assert during certificate renewal, if requested via
/// `GENESIS_RENEW_SUBJECT`.
pub fn renew_subject_requested() -> bool {
    std::env::var("GENESIS_RENEW_SUBJECT")
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false)
}

/// Whether reports should suppress better-than-worst notes on problematic
/// secrets (`GENESIS_HIDE_PROBLEMATIC_SECRETS`).
pub fn hide_problematic_secrets() -> bool {
    std::env::var("GENESIS_HIDE_PROBLEMATIC_SECRETS")
        .map(|v| {
            let v = v.trim().to_ascii_lowercase();
            !(v.is_empty() || v == "0" || v == "no" || v == "false")
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_set_variables() {
        std::env::set_var("GENESIS_TEST_RESOLVE", "vault.example");
        let out = resolve_refs("https://${GENESIS_TEST_RESOLVE}:8200/x").unwrap();
        assert_eq!(out, "https://vault.example:8200/x");
    }

    #[test]
    fn unset_variables_are_an_error() {
        let err = resolve_refs("${GENESIS_TEST_DEFINITELY_UNSET_VAR}").unwrap_err();
        assert!(err.to_string().contains("GENESIS_TEST_DEFINITELY_UNSET_VAR"));
    }

    #[test]
    fn plain_strings_pass_through() {
        assert_eq!(resolve_refs("no refs here").unwrap(), "no refs here");
    }

    #[test]
    fn mount_is_normalized() {
        std::env::remove_var("GENESIS_SECRETS_MOUNT");
        assert_eq!(secrets_mount(), "/secret/");
        std::env::set_var("GENESIS_SECRETS_MOUNT", "kv");
        assert_eq!(secrets_mount(), "/kv/");
        std::env::set_var("GENESIS_SECRETS_MOUNT", "/deep/mount/");
        assert_eq!(secrets_mount(), "/deep/mount/");
        std::env::remove_var("GENESIS_SECRETS_MOUNT");
    }
}
