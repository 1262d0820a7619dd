//! Certificate dependency resolution and build ordering.
//!
//! Turns the parser's flat plan map into a sequence where every signing CA
//! precedes its signees. Ambiguous CAs, signer cycles, and unreachable
//! signers all surface as error plans so one report covers everything.

use std::collections::{HashMap, HashSet};

use crate::plan::{ParsedPlans, Plan, PlanSet, SecretKind};

/// Options for a resolution pass.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Absolute store path of an external root CA; truly-unsigned top-level
    /// certificates are bound to it when present
    pub root_ca_path: Option<String>,
    /// Run per-kind plan sanity checks and convert failures to error plans
    pub prevalidate: bool,
}

/// Resolve a parsed plan map into the ordered plan set.
pub fn resolve(mut plans: ParsedPlans, opts: &ResolveOptions) -> PlanSet {
    if opts.prevalidate {
        prevalidate(&mut plans);
    }

    normalize_explicit_self_signed(&mut plans);
    let base_cas = infer_base_cas(&mut plans);
    assign_default_signers(&mut plans, &base_cas, opts.root_ca_path.as_deref());
    let ordered_x509 = emit_in_signing_order(&mut plans);

    let mut ordered = Vec::with_capacity(plans.len());
    for path in &ordered_x509 {
        if let Some(plan) = plans.shift_remove(path) {
            ordered.push(plan);
        }
    }

    // Everything else (non-x509 kinds and every error plan) follows in
    // lexicographic path order.
    let mut rest: Vec<Plan> = plans.into_iter().map(|(_, p)| p).collect();
    rest.sort_by(|a, b| a.path.cmp(&b.path));
    ordered.extend(rest);

    PlanSet::from_ordered(ordered)
}

/// Per-kind sanity checks requested ahead of execution or validation.
fn prevalidate(plans: &mut ParsedPlans) {
    let failures: Vec<(String, String)> = plans
        .iter()
        .filter_map(|(path, plan)| {
            let result = match &plan.kind {
                SecretKind::Ssh(p) => p.check_plan(),
                SecretKind::Rsa(p) => p.check_plan(),
                SecretKind::Uuid(p) => p.check_plan(),
                _ => Ok(()),
            };
            result.err().map(|e| (path.clone(), e.to_string()))
        })
        .collect();

    for (path, message) in failures {
        plans[&path] = Plan::error(&path, message);
    }
}

/// A signer that names its own path is explicitly self-signed: it signs
/// itself, is necessarily a CA, and roots its own group.
fn normalize_explicit_self_signed(plans: &mut ParsedPlans) {
    for (path, plan) in plans.iter_mut() {
        if let SecretKind::X509(x509) = &mut plan.kind {
            if x509.signed_by.as_deref() == Some(path.as_str()) {
                x509.self_signed = 2;
                x509.is_ca = true;
                x509.signed_by = None;
            }
        }
    }
}

/// Infer the signing CA for each base-path group.
///
/// A leaf named `ca`, or any leaf with `is_ca` set, is a candidate. One
/// candidate wins outright; with several, the literal `<base>/ca` wins;
/// otherwise the group is ambiguous and every unsigned leaf in it becomes
/// an error plan.
fn infer_base_cas(plans: &mut ParsedPlans) -> HashMap<String, String> {
    let mut groups: HashMap<String, Vec<String>> = HashMap::new();
    for (path, plan) in plans.iter() {
        if let SecretKind::X509(x509) = &plan.kind {
            groups.entry(x509.base_path.clone()).or_default().push(path.clone());
        }
    }

    let mut base_cas = HashMap::new();
    let mut ambiguous: Vec<String> = Vec::new();

    for (base, members) in &groups {
        let candidates: Vec<&String> = members
            .iter()
            .filter(|path| {
                let leaf_is_ca = path.as_str() == format!("{}/ca", base);
                let declared_ca = matches!(
                    &plans[path.as_str()].kind,
                    SecretKind::X509(x) if x.is_ca
                );
                leaf_is_ca || declared_ca
            })
            .collect();

        match candidates.len() {
            0 => {}
            1 => {
                base_cas.insert(base.clone(), candidates[0].clone());
            }
            _ => {
                let default = format!("{}/ca", base);
                if candidates.iter().any(|c| **c == default) {
                    base_cas.insert(base.clone(), default);
                } else {
                    ambiguous.extend(members.iter().filter(|path| {
                        matches!(
                            &plans[path.as_str()].kind,
                            SecretKind::X509(x) if x.signed_by.is_none() && x.self_signed == 0
                        )
                    }).cloned());
                }
            }
        }
    }

    for path in ambiguous {
        plans[&path] = Plan::error(&path, "Ambiguous or missing signing CA");
    }

    base_cas
}

/// Give every still-unsigned certificate a signer: its group's base CA,
/// the external root CA when one was supplied, or self-signed status.
fn assign_default_signers(
    plans: &mut ParsedPlans,
    base_cas: &HashMap<String, String>,
    root_ca_path: Option<&str>,
) {
    for (path, plan) in plans.iter_mut() {
        let x509 = match &mut plan.kind {
            SecretKind::X509(x) => x,
            _ => continue,
        };
        if x509.signed_by.is_some() || x509.self_signed != 0 {
            continue;
        }

        match base_cas.get(&x509.base_path) {
            Some(ca_path) if ca_path != path => {
                x509.signed_by = Some(ca_path.clone());
            }
            _ => match root_ca_path {
                Some(root) => {
                    x509.signed_by = Some(root.to_string());
                    x509.signed_by_abs_path = true;
                }
                None => x509.self_signed = 1,
            },
        }
    }
}

/// Emit x509 plans so every signer strictly precedes its signees.
///
/// Plans signed by `""` (self-signed or bound to an external root) start
/// the order; each emitted plan then pulls in the plans it signs. Whatever
/// is never reached gets a cycle or orphan diagnostic.
fn emit_in_signing_order(plans: &mut ParsedPlans) -> Vec<String> {
    let mut groups: HashMap<String, Vec<String>> = HashMap::new();
    for (path, plan) in plans.iter() {
        if let SecretKind::X509(x509) = &plan.kind {
            let signer = match (&x509.signed_by, x509.signed_by_abs_path) {
                (Some(signer), false) => signer.clone(),
                _ => String::new(),
            };
            groups.entry(signer).or_default().push(path.clone());
        }
    }

    let mut ordered = Vec::new();
    let mut emitted = HashSet::new();
    let mut cycle_hits = Vec::new();
    walk("", &mut groups, &mut ordered, &mut emitted, &mut cycle_hits);

    for path in cycle_hits {
        plans[&path] = Plan::error(&path, "Cyclical CA signage detected");
        ordered.retain(|p| *p != path);
    }

    // Anything left in a group was never reached from a root.
    let unreached: Vec<String> = groups.into_values().flatten().collect();
    for path in unreached {
        let message = if signer_chain_loops(plans, &path) {
            "Cyclical CA signage detected"
        } else {
            "Could not find associated signing CA"
        };
        plans[&path] = Plan::error(&path, message);
    }

    ordered
}

fn walk(
    signer: &str,
    groups: &mut HashMap<String, Vec<String>>,
    ordered: &mut Vec<String>,
    emitted: &mut HashSet<String>,
    cycle_hits: &mut Vec<String>,
) {
    let members = match groups.remove(signer) {
        Some(m) => m,
        None => return,
    };
    for path in members {
        if !emitted.insert(path.clone()) {
            cycle_hits.push(path);
            continue;
        }
        ordered.push(path.clone());
        walk(&path, groups, ordered, emitted, cycle_hits);
    }
}

/// Does this plan's signer chain loop back on itself?
fn signer_chain_loops(plans: &ParsedPlans, start: &str) -> bool {
    let mut seen = HashSet::new();
    let mut current = start.to_string();
    loop {
        if !seen.insert(current.clone()) {
            return true;
        }
        let next = match plans.get(&current) {
            Some(plan) => match &plan.kind {
                SecretKind::X509(x) if !x.signed_by_abs_path => match &x.signed_by {
                    Some(signer) => signer.clone(),
                    None => return false,
                },
                _ => return false,
            },
            None => return false,
        };
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_plans, KitSecrets};
    use genesis_types::SecretType;

    fn parsed(yaml: &str) -> ParsedPlans {
        let secrets = KitSecrets::from_metadata(&serde_yaml::from_str(yaml).unwrap());
        parse_plans(&secrets, &[])
    }

    fn x509<'a>(set: &'a PlanSet, path: &str) -> &'a crate::kinds::x509::X509Plan {
        match &set.get(path).expect(path).kind {
            SecretKind::X509(x) => x,
            other => panic!("{} is not x509: {:?}", path, other),
        }
    }

    #[test]
    fn lone_ca_self_signs_and_precedes_its_leaves() {
        let set = resolve(
            parsed(
                r#"
certificates:
  base:
    my-cert:
      ca: { is_ca: true }
      server: { names: [srv.example] }
"#,
            ),
            &ResolveOptions::default(),
        );

        assert_eq!(set.paths(), vec!["my-cert/ca", "my-cert/server"]);
        assert_eq!(x509(&set, "my-cert/ca").self_signed, 1);
        assert_eq!(x509(&set, "my-cert/server").signed_by.as_deref(), Some("my-cert/ca"));
    }

    #[test]
    fn ambiguous_cas_error_every_unsigned_leaf() {
        let set = resolve(
            parsed(
                r#"
certificates:
  base:
    x:
      a: { is_ca: true }
      b: { is_ca: true }
      server: { names: [s.example] }
"#,
            ),
            &ResolveOptions::default(),
        );

        for path in ["x/a", "x/b", "x/server"] {
            let plan = set.get(path).unwrap();
            assert_eq!(plan.secret_type(), SecretType::Error, "{}", path);
            assert!(plan.describe().contains("Ambiguous or missing signing CA"));
        }
    }

    #[test]
    fn literal_ca_leaf_wins_among_multiple_candidates() {
        let set = resolve(
            parsed(
                r#"
certificates:
  base:
    x:
      ca: { is_ca: true }
      backup: { is_ca: true }
      server: {}
"#,
            ),
            &ResolveOptions::default(),
        );

        assert_eq!(x509(&set, "x/server").signed_by.as_deref(), Some("x/ca"));
        // the losing candidate still resolves, signed by the winner
        assert_eq!(x509(&set, "x/backup").signed_by.as_deref(), Some("x/ca"));
    }

    #[test]
    fn root_ca_path_binds_top_level_certs_absolutely() {
        let set = resolve(
            parsed(
                r#"
certificates:
  base:
    my-cert:
      ca: { is_ca: true }
      server: {}
"#,
            ),
            &ResolveOptions {
                root_ca_path: Some("secret/global/ca".to_string()),
                prevalidate: false,
            },
        );

        let ca = x509(&set, "my-cert/ca");
        assert_eq!(ca.signed_by.as_deref(), Some("secret/global/ca"));
        assert!(ca.signed_by_abs_path);
        assert_eq!(ca.self_signed, 0);

        let server = x509(&set, "my-cert/server");
        assert_eq!(server.signed_by.as_deref(), Some("my-cert/ca"));
        assert!(!server.signed_by_abs_path);
    }

    #[test]
    fn explicit_self_reference_is_level_two() {
        let set = resolve(
            parsed(
                r#"
certificates:
  base:
    pki:
      ca: { signed_by: pki/ca }
      server: {}
"#,
            ),
            &ResolveOptions::default(),
        );

        let ca = x509(&set, "pki/ca");
        assert_eq!(ca.self_signed, 2);
        assert!(ca.is_ca);
        assert!(ca.signed_by.is_none());
        assert_eq!(set.paths()[0], "pki/ca");
    }

    #[test]
    fn chains_order_signers_first() {
        let set = resolve(
            parsed(
                r#"
certificates:
  base:
    pki:
      ca: { is_ca: true }
      intermediate: { is_ca: true, signed_by: pki/ca }
      server: { signed_by: pki/intermediate }
      client: { signed_by: pki/intermediate }
"#,
            ),
            &ResolveOptions::default(),
        );

        let paths = set.paths();
        let index = |p: &str| paths.iter().position(|x| *x == p).unwrap();
        assert!(index("pki/ca") < index("pki/intermediate"));
        assert!(index("pki/intermediate") < index("pki/server"));
        assert!(index("pki/intermediate") < index("pki/client"));
        assert_eq!(paths.len(), 4);
    }

    #[test]
    fn missing_signers_orphan_their_leaves() {
        let set = resolve(
            parsed("certificates: { base: { app: { web: { signed_by: ghost/ca } } } }"),
            &ResolveOptions::default(),
        );
        let plan = set.get("app/web").unwrap();
        assert_eq!(plan.secret_type(), SecretType::Error);
        assert!(plan.describe().contains("Could not find associated signing CA"));
    }

    #[test]
    fn signer_cycles_are_called_out() {
        let set = resolve(
            parsed(
                r#"
certificates:
  base:
    loop:
      a: { signed_by: loop/b }
      b: { signed_by: loop/a }
"#,
            ),
            &ResolveOptions::default(),
        );
        for path in ["loop/a", "loop/b"] {
            let plan = set.get(path).unwrap();
            assert_eq!(plan.secret_type(), SecretType::Error);
            assert!(plan.describe().contains("Cyclical CA signage detected"), "{}", path);
        }
    }

    #[test]
    fn non_x509_plans_follow_in_path_order() {
        let secrets = KitSecrets::from_metadata(
            &serde_yaml::from_str(
                r#"
certificates:
  base:
    my-cert: { ca: { is_ca: true } }
credentials:
  base:
    zz/thing: { token: random 8 }
    aa/thing: { token: random 8 }
"#,
            )
            .unwrap(),
        );
        let set = resolve(parse_plans(&secrets, &[]), &ResolveOptions::default());
        assert_eq!(set.paths(), vec!["my-cert/ca", "aa/thing:token", "zz/thing:token"]);
    }

    #[test]
    fn prevalidation_converts_unsound_plans() {
        let secrets = KitSecrets::from_metadata(
            &serde_yaml::from_str(
                r#"
credentials:
  base:
    tiny/key: ssh 512
    ids/thing: { id: uuid v5 }
    good/key: rsa 2048
"#,
            )
            .unwrap(),
        );
        let set = resolve(
            parse_plans(&secrets, &[]),
            &ResolveOptions { root_ca_path: None, prevalidate: true },
        );
        assert_eq!(set.get("tiny/key").unwrap().secret_type(), SecretType::Error);
        assert_eq!(set.get("ids/thing:id").unwrap().secret_type(), SecretType::Error);
        assert_eq!(set.get("good/key").unwrap().secret_type(), SecretType::Rsa);
    }

    #[test]
    fn every_signer_precedes_its_signees() {
        let set = resolve(
            parsed(
                r#"
certificates:
  base:
    a:
      ca: { is_ca: true }
      one: {}
      two: {}
    b:
      ca: { is_ca: true }
      leaf: { signed_by: a/ca }
"#,
            ),
            &ResolveOptions::default(),
        );

        let paths = set.paths();
        for plan in set.iter() {
            if let SecretKind::X509(x) = &plan.kind {
                if let (Some(signer), false) = (&x.signed_by, x.signed_by_abs_path) {
                    let signer_idx = paths.iter().position(|p| p == signer).unwrap();
                    let own_idx = paths.iter().position(|p| *p == plan.path).unwrap();
                    assert!(signer_idx < own_idx, "{} before {}", signer, plan.path);
                }
            }
        }
    }
}
