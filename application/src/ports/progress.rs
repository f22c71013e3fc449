//! Progress notification port
//!
//! Defines the interface for reporting per-expert progress during gate
//! computation.

use moegate_domain::Expert;

/// Callback for progress updates while experts are embedded
///
/// Implementations live in the presentation layer.
pub trait GateProgressNotifier: Send + Sync {
    /// Called once before the first expert is processed
    fn on_experts_start(&self, total: usize);

    /// Called after an expert's gate vectors are computed
    fn on_expert_complete(&self, index: usize, expert: &Expert);

    /// Called after the last expert
    fn on_experts_complete(&self) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl GateProgressNotifier for NoProgress {
    fn on_experts_start(&self, _total: usize) {}
    fn on_expert_complete(&self, _index: usize, _expert: &Expert) {}
}
