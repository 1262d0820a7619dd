//! The plan model: one declarative secret request per plan, collected into
//! an ordered set.

use genesis_types::SecretType;
use indexmap::IndexMap;

use crate::kinds::dhparams::DhParamsPlan;
use crate::kinds::error::ErrorPlan;
use crate::kinds::provided::ProvidedPlan;
use crate::kinds::random::RandomPlan;
use crate::kinds::rsa::RsaPlan;
use crate::kinds::ssh::SshPlan;
use crate::kinds::uuid::UuidPlan;
use crate::kinds::x509::X509Plan;

/// The kind-specific payload of a plan, keyed on the declared `type`.
#[derive(Debug, Clone, PartialEq)]
pub enum SecretKind {
    /// X.509 certificate
    X509(X509Plan),
    /// SSH key pair
    Ssh(SshPlan),
    /// RSA key pair
    Rsa(RsaPlan),
    /// Diffie-Hellman parameters
    DhParams(DhParamsPlan),
    /// Random string at `path:key`
    Random(RandomPlan),
    /// UUID at `path:key`
    Uuid(UuidPlan),
    /// Operator-provided values
    Provided(ProvidedPlan),
    /// A parse or resolution failure carried through the pipeline
    Error(ErrorPlan),
}

/// A single declarative secret request.
///
/// Plans are immutable once parsing and resolution complete; the validator
/// reads them, the executor realizes them, and failures travel as plans of
/// kind [`SecretKind::Error`] so they surface in reports instead of
/// aborting the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// Unique plan path. `random` and `uuid` plans use the `path:key` form;
    /// no other kind carries a colon.
    pub path: String,
    /// Kind-specific payload
    pub kind: SecretKind,
}

impl Plan {
    /// Construct a plan.
    pub fn new(path: impl Into<String>, kind: SecretKind) -> Self {
        Self { path: path.into(), kind }
    }

    /// Construct an error plan carrying a diagnostic.
    pub fn error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(path, SecretKind::Error(ErrorPlan { error: message.into() }))
    }

    /// The declared secret type.
    pub fn secret_type(&self) -> SecretType {
        match &self.kind {
            SecretKind::X509(_) => SecretType::X509,
            SecretKind::Ssh(_) => SecretType::Ssh,
            SecretKind::Rsa(_) => SecretType::Rsa,
            SecretKind::DhParams(_) => SecretType::DhParams,
            SecretKind::Random(_) => SecretType::Random,
            SecretKind::Uuid(_) => SecretType::Uuid,
            SecretKind::Provided(_) => SecretType::Provided,
            SecretKind::Error(_) => SecretType::Error,
        }
    }

    /// Short human description, used in progress reporting.
    pub fn describe(&self) -> String {
        match &self.kind {
            SecretKind::X509(p) => p.describe(),
            SecretKind::Ssh(p) => p.describe(),
            SecretKind::Rsa(p) => p.describe(),
            SecretKind::DhParams(p) => p.describe(),
            SecretKind::Random(p) => p.describe(),
            SecretKind::Uuid(p) => p.describe(),
            SecretKind::Provided(p) => p.describe(),
            SecretKind::Error(p) => format!("error: {}", p.error),
        }
    }

    /// The store keys this plan is expected to populate.
    pub fn expected_keys(&self) -> Vec<String> {
        match &self.kind {
            SecretKind::X509(p) => p.expected_keys(),
            SecretKind::Ssh(_) => vec!["private".into(), "public".into(), "fingerprint".into()],
            SecretKind::Rsa(_) => vec!["private".into(), "public".into()],
            SecretKind::DhParams(_) => vec!["dhparam-pem".into()],
            SecretKind::Random(p) => p.expected_keys(),
            SecretKind::Uuid(p) => vec![p.key.clone()],
            SecretKind::Provided(p) => p.keys.keys().cloned().collect(),
            SecretKind::Error(_) => Vec::new(),
        }
    }

    /// Whether `recreate` must leave this plan's existing value untouched.
    pub fn is_fixed(&self) -> bool {
        match &self.kind {
            SecretKind::Ssh(p) => p.fixed,
            SecretKind::Rsa(p) => p.fixed,
            SecretKind::DhParams(p) => p.fixed,
            SecretKind::Random(p) => p.fixed,
            SecretKind::Uuid(p) => p.fixed,
            SecretKind::Provided(p) => p.keys.values().all(|k| k.fixed),
            SecretKind::X509(_) | SecretKind::Error(_) => false,
        }
    }

    /// Attribute lookup for the path-filter engine.
    ///
    /// Every plan exposes `type` and `path`; the rest depends on the kind.
    pub fn attr(&self, key: &str) -> Option<String> {
        if key == "type" {
            return Some(self.secret_type().to_string());
        }
        if key == "path" {
            return Some(self.path.clone());
        }
        match &self.kind {
            SecretKind::X509(p) => p.attr(key),
            SecretKind::Ssh(p) => p.attr(key),
            SecretKind::Rsa(p) => p.attr(key),
            SecretKind::DhParams(p) => p.attr(key),
            SecretKind::Random(p) => p.attr(key),
            SecretKind::Uuid(p) => p.attr(key),
            SecretKind::Provided(p) => p.attr(key),
            SecretKind::Error(p) => match key {
                "error" => Some(p.error.clone()),
                _ => None,
            },
        }
    }
}

/// Map of parsed plans before resolution, keyed by path in declaration
/// order.
pub type ParsedPlans = IndexMap<String, Plan>;

/// The ordered, resolved collection of plans for an environment.
///
/// Produced by the resolver; the order is the build order, with every
/// signing CA strictly before its signees.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanSet {
    plans: Vec<Plan>,
}

impl PlanSet {
    /// Build a plan set from an already ordered sequence.
    pub fn from_ordered(plans: Vec<Plan>) -> Self {
        Self { plans }
    }

    /// Iterate the plans in build order.
    pub fn iter(&self) -> impl Iterator<Item = &Plan> {
        self.plans.iter()
    }

    /// Number of plans.
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    /// Look a plan up by path.
    pub fn get(&self, path: &str) -> Option<&Plan> {
        self.plans.iter().find(|p| p.path == path)
    }

    /// All plan paths, in build order.
    pub fn paths(&self) -> Vec<&str> {
        self.plans.iter().map(|p| p.path.as_str()).collect()
    }

    /// A new set containing only the plans the predicate keeps, preserving
    /// order.
    pub fn filtered(&self, mut keep: impl FnMut(&Plan) -> bool) -> PlanSet {
        PlanSet {
            plans: self.plans.iter().filter(|p| keep(p)).cloned().collect(),
        }
    }
}

impl IntoIterator for PlanSet {
    type Item = Plan;
    type IntoIter = std::vec::IntoIter<Plan>;

    fn into_iter(self) -> Self::IntoIter {
        self.plans.into_iter()
    }
}

impl<'a> IntoIterator for &'a PlanSet {
    type Item = &'a Plan;
    type IntoIter = std::slice::Iter<'a, Plan>;

    fn into_iter(self) -> Self::IntoIter {
        self.plans.iter()
    }
}
