//! Plan parsing from kit metadata.
//!
//! Scans the three feature-keyed groupings (`certificates`, `credentials`,
//! `provided`) for the enabled feature set and produces one plan per
//! declared secret. Parse failures never abort the scan; they become plans
//! of kind `error` so the whole report renders in one pass.

use serde_yaml::Value;

use crate::kinds::dhparams::DhParamsPlan;
use crate::kinds::provided::ProvidedPlan;
use crate::kinds::random::RandomPlan;
use crate::kinds::rsa::RsaPlan;
use crate::kinds::ssh::SshPlan;
use crate::kinds::uuid::UuidPlan;
use crate::kinds::x509::X509Plan;
use crate::plan::{ParsedPlans, Plan, SecretKind};

/// The secret groupings of a kit's merged metadata.
#[derive(Debug, Clone, Default)]
pub struct KitSecrets {
    /// `certificates: { feature: { base-path: { leaf: spec } } }`
    pub certificates: Value,
    /// `credentials: { feature: { path: spec } }`
    pub credentials: Value,
    /// `provided: { feature: { path: spec } }`
    pub provided: Value,
}

impl KitSecrets {
    /// Pull the three groupings out of a full merged metadata document.
    pub fn from_metadata(doc: &Value) -> Self {
        let section = |name: &str| {
            doc.as_mapping()
                .and_then(|m| m.get(Value::from(name)))
                .cloned()
                .unwrap_or(Value::Null)
        };
        Self {
            certificates: section("certificates"),
            credentials: section("credentials"),
            provided: section("provided"),
        }
    }
}

/// Parse every secret declared for the enabled features.
///
/// `base` is always scanned first; the given features follow in order.
pub fn parse_plans(secrets: &KitSecrets, features: &[String]) -> ParsedPlans {
    let mut plans = ParsedPlans::new();

    let mut active: Vec<&str> = vec!["base"];
    for feature in features {
        if !active.contains(&feature.as_str()) {
            active.push(feature);
        }
    }

    for feature in active {
        parse_certificates(&secrets.certificates, feature, &mut plans);
        parse_credentials(&secrets.credentials, feature, &mut plans);
        parse_provided(&secrets.provided, feature, &mut plans);
    }

    plans
}

fn feature_section<'a>(grouping: &'a Value, feature: &str) -> Option<&'a Value> {
    grouping.as_mapping()?.get(Value::from(feature))
}

fn insert(plans: &mut ParsedPlans, plan: Plan) {
    plans.insert(plan.path.clone(), plan);
}

fn parse_certificates(grouping: &Value, feature: &str, plans: &mut ParsedPlans) {
    let section = match feature_section(grouping, feature) {
        Some(s) => s,
        None => return,
    };
    let section = match section.as_mapping() {
        Some(m) => m,
        None => {
            insert(
                plans,
                Plan::error(feature, "certificates for a feature must be a map of base paths"),
            );
            return;
        }
    };

    for (base_path, leaves) in section {
        let base_path = match base_path.as_str() {
            Some(p) => p,
            None => continue,
        };
        if base_path.contains(':') {
            insert(
                plans,
                Plan::error(base_path, "Invalid certificate path: ':' is not allowed"),
            );
            continue;
        }

        let leaves = match leaves.as_mapping() {
            Some(m) => m,
            None => {
                insert(
                    plans,
                    Plan::error(
                        base_path,
                        format!(
                            "Certificate declarations under '{}' must be a map of leaf names to specs",
                            base_path
                        ),
                    ),
                );
                continue;
            }
        };

        for (leaf, spec) in leaves {
            let leaf = match leaf.as_str() {
                Some(l) => l,
                None => continue,
            };
            let path = format!("{}/{}", base_path, leaf);
            if leaf.contains(':') {
                insert(plans, Plan::error(&path, "Invalid leaf name: ':' is not allowed"));
                continue;
            }
            match X509Plan::from_spec(base_path, spec) {
                Ok(x509) => insert(plans, Plan::new(&path, SecretKind::X509(x509))),
                Err(e) => insert(plans, Plan::error(&path, e.to_string())),
            }
        }
    }
}

fn parse_credentials(grouping: &Value, feature: &str, plans: &mut ParsedPlans) {
    let section = match feature_section(grouping, feature) {
        Some(s) => s,
        None => return,
    };
    let section = match section.as_mapping() {
        Some(m) => m,
        None => {
            insert(
                plans,
                Plan::error(feature, "credentials for a feature must be a map of paths"),
            );
            return;
        }
    };

    for (path, spec) in section {
        let path = match path.as_str() {
            Some(p) => p,
            None => continue,
        };
        if path.contains(':') {
            insert(
                plans,
                Plan::error(path, "Invalid credential path: ':' is not allowed"),
            );
            continue;
        }

        match spec {
            Value::String(line) => parse_path_spec(path, line, plans),
            Value::Mapping(keys) => {
                for (key, line) in keys {
                    let key = match key.as_str() {
                        Some(k) => k,
                        None => continue,
                    };
                    let plan_path = format!("{}:{}", path, key);
                    if key.contains(':') {
                        insert(
                            plans,
                            Plan::error(&plan_path, "Invalid credential key: ':' is not allowed"),
                        );
                        continue;
                    }
                    match line.as_str() {
                        Some(line) => parse_cred_line(path, key, line, plans),
                        None => insert(
                            plans,
                            Plan::error(&plan_path, "Credential specs must be strings"),
                        ),
                    }
                }
            }
            _ => insert(
                plans,
                Plan::error(
                    path,
                    format!("Credential declaration at '{}' must be a string or a map of keys", path),
                ),
            ),
        }
    }
}

/// Path-level string specs: `ssh <bits>`, `rsa <bits>`, `dhparam[s] <bits>`.
fn parse_path_spec(path: &str, line: &str, plans: &mut ParsedPlans) {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let plan = match tokens.split_first() {
        Some((&"ssh", rest)) => SshPlan::parse(rest).map(SecretKind::Ssh),
        Some((&"rsa", rest)) => RsaPlan::parse(rest).map(SecretKind::Rsa),
        Some((&"dhparam", rest)) | Some((&"dhparams", rest)) => {
            DhParamsPlan::parse(rest).map(SecretKind::DhParams)
        }
        // A bare cred-line at path level is always wrong, but it deserves a
        // pointed diagnostic rather than "unrecognized type".
        Some((what @ &"random", _)) | Some((what @ &"uuid", _)) => {
            Err(genesis_types::GenesisError::BadRequest(format!(
                "'{}' secrets must be specified per key, not at the path level; \
                 declare '{}' as a map of keys to cred-lines",
                what, path
            )))
        }
        Some((other, _)) => Err(genesis_types::GenesisError::BadRequest(format!(
            "Unrecognized credential type '{}' at '{}'",
            other, path
        ))),
        None => Err(genesis_types::GenesisError::BadRequest(format!(
            "Empty credential spec at '{}'",
            path
        ))),
    };

    match plan {
        Ok(kind) => insert(plans, Plan::new(path, kind)),
        Err(e) => insert(plans, Plan::error(path, e.to_string())),
    }
}

/// Per-key cred-lines: `random …` or `uuid …`.
fn parse_cred_line(path: &str, key: &str, line: &str, plans: &mut ParsedPlans) {
    let plan_path = format!("{}:{}", path, key);
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let kind = match tokens.split_first() {
        Some((&"random", rest)) => RandomPlan::parse(key, rest).map(SecretKind::Random),
        Some((&"uuid", rest)) => UuidPlan::parse(key, rest).map(SecretKind::Uuid),
        Some((other, _)) => Err(genesis_types::GenesisError::BadRequest(format!(
            "Unrecognized credential type '{}' at '{}'; keys take random or uuid",
            other, plan_path
        ))),
        None => Err(genesis_types::GenesisError::BadRequest(format!(
            "Empty credential spec at '{}'",
            plan_path
        ))),
    };

    match kind {
        Ok(kind) => insert(plans, Plan::new(&plan_path, kind)),
        Err(e) => insert(plans, Plan::error(&plan_path, e.to_string())),
    }
}

fn parse_provided(grouping: &Value, feature: &str, plans: &mut ParsedPlans) {
    let section = match feature_section(grouping, feature) {
        Some(s) => s,
        None => return,
    };
    let section = match section.as_mapping() {
        Some(m) => m,
        None => {
            insert(
                plans,
                Plan::error(feature, "provided secrets for a feature must be a map of paths"),
            );
            return;
        }
    };

    for (path, spec) in section {
        let path = match path.as_str() {
            Some(p) => p,
            None => continue,
        };
        if path.contains(':') {
            insert(plans, Plan::error(path, "Invalid provided path: ':' is not allowed"));
            continue;
        }
        match ProvidedPlan::from_spec(spec) {
            Ok(provided) => insert(plans, Plan::new(path, SecretKind::Provided(provided))),
            Err(e) => insert(plans, Plan::error(path, e.to_string())),
        }
    }
}
