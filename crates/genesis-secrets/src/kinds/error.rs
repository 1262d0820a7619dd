//! The error kind: a parse or resolution failure carried as a plan.

/// A diagnostic travelling through the pipeline in place of a usable plan,
/// so it surfaces in reports instead of being dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPlan {
    /// Human-readable diagnostic
    pub error: String,
}
