//! Top-level run over a list of test plans.

use anyhow::Result;
use tracing::{info, instrument};

use crate::core::result::RunResult;
use crate::driver::DriverRegistry;
use crate::execute::run_plan;
use crate::model::TestPlan;
use crate::registry::callbacks::{CallbackRegistry, Event};
use crate::registry::directives::DirectiveRegistry;
use crate::registry::tasks::TaskRegistry;

/// Everything a run reads: built once, then shared read-only.
#[derive(Default)]
pub struct Context {
    pub directives: DirectiveRegistry,
    pub callbacks: CallbackRegistry,
    pub tasks: TaskRegistry,
    pub drivers: DriverRegistry,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Runs plans one after another, firing the `all` callbacks around them.
pub struct Runner<'a> {
    ctx: &'a Context,
}

impl<'a> Runner<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Run `plans` in order and return one result per plan.
    #[instrument(skip_all, fields(plans = plans.len()))]
    pub fn run(&self, plans: &[TestPlan]) -> Result<Vec<RunResult>> {
        self.ctx.callbacks.fire_before(&Event::Run { results: None })?;

        let mut results = Vec::with_capacity(plans.len());
        for plan in plans {
            info!(plan = %plan.name, environment = %plan.environment, "running test plan");
            results.push(run_plan(self.ctx, plan)?);
        }

        self.ctx.callbacks.fire_after(&Event::Run {
            results: Some(&results),
        })?;
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::EventLog;

    #[test]
    fn empty_run_still_fires_run_callbacks() {
        let mut ctx = Context::new();
        let log = EventLog::attach(&mut ctx.callbacks);

        let results = Runner::new(&ctx).run(&[]).expect("run");

        assert!(results.is_empty());
        assert_eq!(
            log.entries(),
            vec![
                "Before All all",
                "BeforeOutput All all",
                "After All all",
                "AfterOutput All all"
            ]
        );
    }
}
