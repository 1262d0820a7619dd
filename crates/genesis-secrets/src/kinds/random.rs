//! Random string secrets.

use genesis_types::{bail, GenesisError, Result};
use std::collections::BTreeMap;

use crate::report::Check;

/// A random string request at `path:key`:
/// `random <N> [fmt <F> [at <K>]] [allowed-chars <S>] [fixed]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomPlan {
    /// The key under the vault path this string lives at
    pub key: String,
    /// Declared length
    pub size: usize,
    /// Derived-sibling format (e.g. `base64`, `crypt-sha512`)
    pub format: Option<String>,
    /// Key the formatted sibling lands at; defaults to `<key>-<format>`
    pub destination: Option<String>,
    /// Characters the string may be drawn from
    pub valid_chars: Option<String>,
    /// Never overwritten by `recreate`
    pub fixed: bool,
}

impl RandomPlan {
    /// Parse the tokens following the `random` keyword.
    pub fn parse(key: &str, tokens: &[&str]) -> Result<Self> {
        let mut iter = tokens.iter().peekable();

        let size_tok = iter.next().ok_or_else(|| {
            GenesisError::BadRequest("random requires a length".to_string())
        })?;
        let size: usize = size_tok.parse().map_err(|_| {
            GenesisError::BadRequest(format!(
                "random length must be a positive integer, got '{}'",
                size_tok
            ))
        })?;
        if size == 0 {
            bail!(BadRequest, "random length must be a positive integer, got '0'");
        }

        let mut plan = Self {
            key: key.to_string(),
            size,
            format: None,
            destination: None,
            valid_chars: None,
            fixed: false,
        };

        while let Some(tok) = iter.next() {
            match *tok {
                "fmt" => {
                    let fmt = iter.next().ok_or_else(|| {
                        GenesisError::BadRequest("fmt requires a format name".to_string())
                    })?;
                    plan.format = Some(fmt.to_string());
                    if iter.peek() == Some(&&"at") {
                        iter.next();
                        let dest = iter.next().ok_or_else(|| {
                            GenesisError::BadRequest("at requires a destination key".to_string())
                        })?;
                        plan.destination = Some(dest.to_string());
                    }
                }
                "allowed-chars" => {
                    let chars = iter.next().ok_or_else(|| {
                        GenesisError::BadRequest(
                            "allowed-chars requires a character set".to_string(),
                        )
                    })?;
                    plan.valid_chars = Some(chars.to_string());
                }
                "fixed" => plan.fixed = true,
                other => bail!(BadRequest, "Unexpected token '{}' in random spec", other),
            }
        }

        Ok(plan)
    }

    /// The key the formatted sibling lands at, when a format is declared.
    pub fn format_destination(&self) -> Option<String> {
        self.format.as_ref().map(|fmt| {
            self.destination
                .clone()
                .unwrap_or_else(|| format!("{}-{}", self.key, fmt))
        })
    }

    /// The store keys this plan populates.
    pub fn expected_keys(&self) -> Vec<String> {
        let mut keys = vec![self.key.clone()];
        if let Some(dest) = self.format_destination() {
            keys.push(dest);
        }
        keys
    }

    /// Short human description.
    pub fn describe(&self) -> String {
        format!(
            "{} character random string{}",
            self.size,
            if self.fixed { " (fixed)" } else { "" }
        )
    }

    /// The cred-line this plan re-emits as.
    pub fn to_spec(&self) -> String {
        let mut spec = format!("random {}", self.size);
        if let Some(ref fmt) = self.format {
            spec.push_str(&format!(" fmt {}", fmt));
            if let Some(ref dest) = self.destination {
                spec.push_str(&format!(" at {}", dest));
            }
        }
        if let Some(ref chars) = self.valid_chars {
            spec.push_str(&format!(" allowed-chars {}", chars));
        }
        if self.fixed {
            spec.push_str(" fixed");
        }
        spec
    }

    /// Filter attribute lookup.
    pub fn attr(&self, key: &str) -> Option<String> {
        match key {
            "size" => Some(self.size.to_string()),
            "fixed" => Some(self.fixed.to_string()),
            "format" => self.format.clone(),
            "destination" => self.destination.clone(),
            "valid_chars" => self.valid_chars.clone(),
            _ => None,
        }
    }

    /// Validate a stored string: declared length, declared alphabet, and
    /// the formatted sibling's existence when a format is declared.
    pub fn validate(&self, entry: Option<&BTreeMap<String, String>>) -> Vec<Check> {
        let entry = match entry {
            Some(e) => e,
            None => return vec![Check::missing("secret")],
        };
        let value = match entry.get(&self.key) {
            Some(v) => v,
            None => return vec![Check::missing(self.key.clone())],
        };

        let mut checks = Vec::new();

        let length = value.chars().count();
        if length == self.size {
            checks.push(Check::ok_with("length", format!("{} characters", length)));
        } else {
            checks.push(Check::error(
                "length",
                format!("{} characters, expected {}", length, self.size),
            ));
        }

        if let Some(ref spec) = self.valid_chars {
            let pool = expand_charset(spec);
            let strays: Vec<char> = value.chars().filter(|c| !pool.contains(c)).collect();
            if strays.is_empty() {
                checks.push(Check::ok("allowed characters"));
            } else {
                checks.push(Check::error(
                    "allowed characters",
                    format!("characters outside '{}': {:?}", spec, strays),
                ));
            }
        }

        if let Some(dest) = self.format_destination() {
            if entry.contains_key(&dest) {
                checks.push(Check::ok_with("formatted value", dest));
            } else {
                checks.push(Check::missing(format!("formatted value at {}", dest)));
            }
        }

        checks
    }
}

/// Expand a `a-zA-Z0-9!@`-style character set description.
pub(crate) fn expand_charset(spec: &str) -> Vec<char> {
    let chars: Vec<char> = spec.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if i + 2 < chars.len() && chars[i + 1] == '-' {
            let (lo, hi) = (chars[i], chars[i + 2]);
            for c in lo..=hi {
                out.push(c);
            }
            i += 3;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}
