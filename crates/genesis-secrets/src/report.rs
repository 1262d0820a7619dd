//! Validation report types.

use genesis_types::{CheckStatus, SecretType};

/// Outcome of one validation check against one plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    /// Short label, e.g. `size`, `modulus agreement`, `signed by`
    pub label: String,
    /// The outcome
    pub status: CheckStatus,
    /// Extra detail for the operator
    pub note: Option<String>,
}

impl Check {
    /// A passing check.
    pub fn ok(label: impl Into<String>) -> Self {
        Self { label: label.into(), status: CheckStatus::Ok, note: None }
    }

    /// A passing check with detail.
    pub fn ok_with(label: impl Into<String>, note: impl Into<String>) -> Self {
        Self { label: label.into(), status: CheckStatus::Ok, note: Some(note.into()) }
    }

    /// A warning.
    pub fn warn(label: impl Into<String>, note: impl Into<String>) -> Self {
        Self { label: label.into(), status: CheckStatus::Warn, note: Some(note.into()) }
    }

    /// A failure.
    pub fn error(label: impl Into<String>, note: impl Into<String>) -> Self {
        Self { label: label.into(), status: CheckStatus::Error, note: Some(note.into()) }
    }

    /// Missing material.
    pub fn missing(label: impl Into<String>) -> Self {
        Self { label: label.into(), status: CheckStatus::Missing, note: None }
    }
}

/// All check outcomes for one plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanReport {
    /// The plan path
    pub path: String,
    /// The plan's secret type
    pub kind: SecretType,
    /// Per-check outcomes, in check order
    pub checks: Vec<Check>,
}

impl PlanReport {
    /// The plan-level result: the worst of its checks (`Ok` when there are
    /// none).
    pub fn status(&self) -> CheckStatus {
        self.checks
            .iter()
            .map(|c| c.status)
            .fold(CheckStatus::Ok, CheckStatus::worst)
    }

    /// The checks to render.
    ///
    /// When `hide_problematic` is set and the plan has problems, notes that
    /// are better than the worst outcome are suppressed so the report leads
    /// with what is wrong.
    pub fn visible_checks(&self, hide_problematic: bool) -> Vec<&Check> {
        let worst = self.status();
        self.checks
            .iter()
            .filter(|c| !hide_problematic || worst == CheckStatus::Ok || c.status == worst)
            .collect()
    }
}

/// The full validation report for a plan set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretsReport {
    /// Per-plan reports, in build order
    pub plans: Vec<PlanReport>,
}

impl SecretsReport {
    /// The overall result: the worst plan-level result.
    pub fn status(&self) -> CheckStatus {
        self.plans
            .iter()
            .map(|p| p.status())
            .fold(CheckStatus::Ok, CheckStatus::worst)
    }

    /// Counts of (ok, warn, missing, error) plans.
    pub fn counts(&self) -> (usize, usize, usize, usize) {
        let mut counts = (0, 0, 0, 0);
        for plan in &self.plans {
            match plan.status() {
                CheckStatus::Ok => counts.0 += 1,
                CheckStatus::Warn => counts.1 += 1,
                CheckStatus::Missing => counts.2 += 1,
                CheckStatus::Error => counts.3 += 1,
            }
        }
        counts
    }
}
