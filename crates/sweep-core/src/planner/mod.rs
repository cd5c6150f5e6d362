//! Priority planning
//!
//! Merges the violations of one Analyzing phase into a single strictly
//! ordered queue. Tiers are evaluated in order and a tier is only
//! considered once every earlier tier is empty project-wide:
//!
//! 1. Lint, by descending violation count
//! 2. BuildError, by descending compiler error count
//! 3. LowCoverage, by ascending coverage
//! 4. HighComplexity / SATD, by descending max complexity then SATD count
//!
//! Inside a tier ties fall through the configured tie breakers (TDG and
//! churn by default) and finally the path, so the order is total.

pub mod plan;
pub mod planner;
pub mod tier;
pub mod work;

pub use plan::{CompletionReason, Plan, PlanExclusions};
pub use planner::PriorityPlanner;
pub use tier::Tier;
pub use work::{Batch, BatchId, PriorityKey, WorkItem, WorkItemState};
