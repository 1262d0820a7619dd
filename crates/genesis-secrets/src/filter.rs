//! Path filtering over resolved plan sets.
//!
//! A filter list is an implicit conjunction. Each element is either a
//! literal plan path (an explicit inclusion) or one or more `||`-joined
//! atoms: `key=value`, `key!=value`, or `[!]/regex/[i]` over the plan
//! path. The selection is the intersection of the non-literal elements,
//! unioned with the literal inclusions.

use genesis_types::{GenesisError, Result};
use regex::Regex;
use std::collections::HashSet;

use crate::plan::{Plan, PlanSet};

/// Apply a filter list to a plan set, preserving build order.
pub fn apply_filters(plans: &PlanSet, filters: &[String]) -> Result<PlanSet> {
    if filters.is_empty() {
        return Ok(plans.clone());
    }

    let mut literals: HashSet<String> = HashSet::new();
    let mut selected: Option<HashSet<String>> = None;

    for element in filters {
        if plans.get(element).is_some() {
            literals.insert(element.clone());
            continue;
        }

        let mut matched: HashSet<String> = HashSet::new();
        for atom_src in element.split("||") {
            let atom = Atom::parse(atom_src.trim())?;
            for plan in plans.iter() {
                if atom.matches(plan) {
                    matched.insert(plan.path.clone());
                }
            }
        }

        selected = Some(match selected {
            None => matched,
            Some(previous) => previous.intersection(&matched).cloned().collect(),
        });
    }

    let keep = |plan: &Plan| -> bool {
        literals.contains(&plan.path)
            || selected.as_ref().map(|s| s.contains(&plan.path)).unwrap_or(false)
    };

    Ok(plans.filtered(keep))
}

/// One filter atom.
enum Atom {
    AttrEq { key: String, value: String },
    AttrNe { key: String, value: String },
    PathRegex { regex: Regex, negated: bool },
}

impl Atom {
    fn parse(atom: &str) -> Result<Atom> {
        if atom.is_empty() {
            return Err(GenesisError::BadFilter("empty filter atom".to_string()));
        }

        let (regex_src, negated) = match atom.strip_prefix('!') {
            Some(rest) if rest.starts_with('/') => (rest, true),
            _ => (atom, false),
        };
        if regex_src.starts_with('/') {
            let (body, insensitive) = match regex_src.strip_suffix("/i") {
                Some(body) => (body, true),
                None => match regex_src.strip_suffix('/') {
                    Some(body) => (body, false),
                    None => {
                        return Err(GenesisError::BadFilter(format!(
                            "unterminated regex filter '{}'",
                            atom
                        )))
                    }
                },
            };
            let body = &body[1..];
            let pattern = if insensitive { format!("(?i){}", body) } else { body.to_string() };
            let regex = Regex::new(&pattern).map_err(|e| {
                GenesisError::BadFilter(format!("invalid regex '{}': {}", atom, e))
            })?;
            return Ok(Atom::PathRegex { regex, negated });
        }

        if let Some((key, value)) = atom.split_once("!=") {
            if key.is_empty() {
                return Err(GenesisError::BadFilter(format!("missing key in '{}'", atom)));
            }
            return Ok(Atom::AttrNe { key: key.to_string(), value: value.to_string() });
        }
        if let Some((key, value)) = atom.split_once('=') {
            if key.is_empty() {
                return Err(GenesisError::BadFilter(format!("missing key in '{}'", atom)));
            }
            return Ok(Atom::AttrEq { key: key.to_string(), value: value.to_string() });
        }

        Err(GenesisError::BadFilter(format!(
            "unrecognized filter '{}': expected a plan path, key=value, key!=value, or /regex/",
            atom
        )))
    }

    fn matches(&self, plan: &Plan) -> bool {
        match self {
            Atom::AttrEq { key, value } => plan.attr(key).as_deref() == Some(value.as_str()),
            Atom::AttrNe { key, value } => plan.attr(key).as_deref() != Some(value.as_str()),
            Atom::PathRegex { regex, negated } => regex.is_match(&plan.path) != *negated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_plans, KitSecrets};
    use crate::resolver::{resolve, ResolveOptions};

    fn fixture() -> PlanSet {
        let secrets = KitSecrets::from_metadata(
            &serde_yaml::from_str(
                r#"
certificates:
  base:
    pki:
      ca: { is_ca: true }
      server: { names: [srv.example] }
credentials:
  base:
    work/signing_key: rsa 2048 fixed
    crazy/thing:
      id: random 32 fixed
      token: random 16
"#,
            )
            .unwrap(),
        );
        resolve(parse_plans(&secrets, &[]), &ResolveOptions::default())
    }

    fn names(set: &PlanSet) -> Vec<&str> {
        set.paths()
    }

    #[test]
    fn no_filters_selects_everything() {
        let plans = fixture();
        let out = apply_filters(&plans, &[]).unwrap();
        assert_eq!(out.len(), plans.len());
    }

    #[test]
    fn literal_paths_are_explicit_inclusions() {
        let plans = fixture();
        let out = apply_filters(&plans, &["pki/server".to_string()]).unwrap();
        assert_eq!(names(&out), vec!["pki/server"]);
    }

    #[test]
    fn attribute_equality_and_inequality() {
        let plans = fixture();
        let out = apply_filters(&plans, &["type=random".to_string()]).unwrap();
        assert_eq!(names(&out), vec!["crazy/thing:id", "crazy/thing:token"]);

        let out = apply_filters(&plans, &["type!=x509".to_string()]).unwrap();
        assert_eq!(out.len(), 3);
        assert!(out.get("pki/ca").is_none());
    }

    #[test]
    fn regex_atoms_match_paths() {
        let plans = fixture();
        let out = apply_filters(&plans, &["/^pki//".to_string()]).unwrap();
        assert_eq!(names(&out), vec!["pki/ca", "pki/server"]);

        let out = apply_filters(&plans, &["/^PKI//i".to_string()]).unwrap();
        assert_eq!(out.len(), 2);

        let out = apply_filters(&plans, &["!/^pki//".to_string()]).unwrap();
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn disjunction_unions_atoms() {
        let plans = fixture();
        let out = apply_filters(&plans, &["type=rsa||is_ca=true".to_string()]).unwrap();
        assert_eq!(names(&out), vec!["pki/ca", "work/signing_key"]);
    }

    #[test]
    fn elements_conjoin_and_literals_union_in() {
        let plans = fixture();
        let out = apply_filters(
            &plans,
            &["type=random".to_string(), "fixed=true".to_string()],
        )
        .unwrap();
        assert_eq!(names(&out), vec!["crazy/thing:id"]);

        let out = apply_filters(
            &plans,
            &["type=random".to_string(), "fixed=true".to_string(), "pki/ca".to_string()],
        )
        .unwrap();
        assert_eq!(names(&out), vec!["pki/ca", "crazy/thing:id"]);
    }

    #[test]
    fn filter_algebra_matches_set_operations() {
        let plans = fixture();
        // F1 AND (F2 OR F3) as two elements
        let filtered = apply_filters(
            &plans,
            &["type=random".to_string(), "fixed=true||size=16".to_string()],
        )
        .unwrap();

        let f1: HashSet<String> = plans
            .iter()
            .filter(|p| p.attr("type").as_deref() == Some("random"))
            .map(|p| p.path.clone())
            .collect();
        let f2: HashSet<String> = plans
            .iter()
            .filter(|p| p.attr("fixed").as_deref() == Some("true"))
            .map(|p| p.path.clone())
            .collect();
        let f3: HashSet<String> = plans
            .iter()
            .filter(|p| p.attr("size").as_deref() == Some("16"))
            .map(|p| p.path.clone())
            .collect();
        let expected: HashSet<String> =
            f1.intersection(&f2.union(&f3).cloned().collect()).cloned().collect();

        let got: HashSet<String> = filtered.paths().iter().map(|s| s.to_string()).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn invalid_atoms_are_bad_filters() {
        let plans = fixture();
        for bad in ["/unterminated", "=value", "just-words", ""] {
            let err = apply_filters(&plans, &[bad.to_string()]).unwrap_err();
            assert!(matches!(err, GenesisError::BadFilter(_)), "{}", bad);
        }
    }
}
