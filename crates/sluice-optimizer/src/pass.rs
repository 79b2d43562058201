use sluice_common::error::Result;
use sluice_ir::LogicalPlan;

/// A rewrite over a whole logical plan, applied in place.
pub trait OptimizationPass: Send + Sync {
    fn name(&self) -> &'static str;

    /// Names of passes that must run before this one.
    fn dependencies(&self) -> &'static [&'static str] {
        &[]
    }

    fn apply_logical(&self, plan: &mut LogicalPlan) -> Result<()>;
}
