//! Run protocol for plans, tasks, steps and directives.
//!
//! Every level fires its `before` callbacks, runs its children (or, for a
//! directive, the dispatched handler), fires its `after` callbacks and
//! returns its [`RunResult`]. Failures of test content are recorded in the
//! result tree and never stop sibling work. Only callback errors propagate,
//! and they abort the whole run; driver sessions and scope frames are still
//! released on that path.

use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::core::resolver::dependency_order;
use crate::core::result::RunResult;
use crate::core::scope::NestedScope;
use crate::driver::Driver;
use crate::error::Failure;
use crate::model::{Directive, Step, Task, TestPlan};
use crate::registry::callbacks::Event;
use crate::runner::Context;

/// Run every task of `plan` in dependency order.
///
/// Each task gets a fresh driver session and a fresh scope stack seeded with
/// the plan's variables. A task whose session cannot be started (unknown
/// environment included) is recorded as failed and the plan moves on.
#[instrument(skip_all, fields(plan = %plan.name))]
pub fn run_plan(ctx: &Context, plan: &TestPlan) -> Result<RunResult> {
    ctx.callbacks.fire_before(&Event::TestPlan { plan, result: None })?;

    if !ctx.drivers.contains(&plan.environment) {
        warn!(environment = %plan.environment, "plan environment has no driver");
    }

    let mut result = RunResult::new(&plan.name);
    let order = dependency_order(&plan.tasks, |name| ctx.tasks.setup_tasks_of(name));
    info!(tasks = ?order, "resolved task order");
    for name in &order {
        run_task_session(ctx, plan, name, &mut result)?;
    }

    ctx.callbacks.fire_after(&Event::TestPlan {
        plan,
        result: Some(&result),
    })?;
    Ok(result)
}

fn run_task_session(ctx: &Context, plan: &TestPlan, name: &str, out: &mut RunResult) -> Result<()> {
    let Some(task) = ctx.tasks.get(name) else {
        warn!(task = name, "plan references an unknown task");
        out.push(RunResult::failed(
            name,
            Failure::UnknownTask {
                name: name.to_string(),
            },
        ));
        return Ok(());
    };

    let mut session = match ctx.drivers.launch(&plan.environment) {
        Ok(session) => session,
        Err(failure) => {
            warn!(task = name, error = %failure, "could not start driver session");
            out.push(RunResult::failed(name, failure));
            return Ok(());
        }
    };
    let mut scope = NestedScope::new(plan.variables.clone());
    run_task(ctx, task, session.driver(), &mut scope, out)
}

/// Run `task` on `driver`, pushing its results into `out`.
///
/// The task's variables are pushed onto `scope` before anything else runs,
/// so its execute-prerequisites (depth-first, each in a frame of its own)
/// can read them. Prerequisite results land in `out` under their own names,
/// ahead of the task's node.
pub fn run_task(
    ctx: &Context,
    task: &Task,
    driver: &mut dyn Driver,
    scope: &mut NestedScope,
    out: &mut RunResult,
) -> Result<()> {
    let mut active = Vec::new();
    run_nested_task(ctx, task, driver, scope, &mut active, out)
}

#[instrument(skip_all, fields(task = %task.name))]
fn run_nested_task(
    ctx: &Context,
    task: &Task,
    driver: &mut dyn Driver,
    scope: &mut NestedScope,
    active: &mut Vec<String>,
    out: &mut RunResult,
) -> Result<()> {
    ctx.callbacks.fire_before(&Event::Task { task, result: None })?;
    info!("running task");

    active.push(task.name.clone());
    let ran = run_task_body(ctx, task, driver, scope, active, out);
    active.pop();
    let result = ran?;

    ctx.callbacks.fire_after(&Event::Task {
        task,
        result: Some(&result),
    })?;
    out.push(result);
    Ok(())
}

/// Prerequisites then steps, inside the task's variable frame.
fn run_task_body(
    ctx: &Context,
    task: &Task,
    driver: &mut dyn Driver,
    scope: &mut NestedScope,
    active: &mut Vec<String>,
    out: &mut RunResult,
) -> Result<RunResult> {
    let mut frame = scope.enter(task.variables.clone());
    run_prerequisites(ctx, task, driver, &mut frame, active, out)?;

    let mut result = RunResult::new(&task.name);
    for step in &task.steps {
        result.push(run_step(ctx, step, driver, &frame)?);
    }
    Ok(result)
}

/// Run `task`'s execute-prerequisites into `out`.
///
/// A prerequisite already in progress further up the chain is recorded as a
/// cycle instead of being run again.
fn run_prerequisites(
    ctx: &Context,
    task: &Task,
    driver: &mut dyn Driver,
    scope: &mut NestedScope,
    active: &mut Vec<String>,
    out: &mut RunResult,
) -> Result<()> {
    for name in &task.execute_prerequisites {
        if active.contains(name) {
            warn!(task = %task.name, prerequisite = %name, "prerequisite cycle");
            out.push(RunResult::failed(
                name,
                Failure::PrerequisiteCycle { name: name.clone() },
            ));
            continue;
        }
        let Some(prerequisite) = ctx.tasks.get(name) else {
            out.push(RunResult::failed(
                name,
                Failure::UnknownTask { name: name.clone() },
            ));
            continue;
        };
        run_nested_task(ctx, prerequisite, driver, scope, active, out)?;
    }
    Ok(())
}

/// Run every directive of `step`.
///
/// A failing directive does not stop the step, except for configuration
/// failures (no handler, reserved capture, undefined variable), which abort
/// the remaining directives and mark the step itself as failed.
pub fn run_step(
    ctx: &Context,
    step: &Step,
    driver: &mut dyn Driver,
    scope: &NestedScope,
) -> Result<RunResult> {
    ctx.callbacks.fire_before(&Event::Step { step, result: None })?;

    let mut result = RunResult::new(&step.name);
    for directive in &step.directives {
        let outcome = run_directive(ctx, directive, driver, scope)?;
        let aborted = outcome
            .error
            .as_ref()
            .filter(|failure| failure.is_configuration())
            .map(|failure| Failure::StepAborted {
                directive: directive.text.clone(),
                cause: failure.to_string(),
            });
        result.push(outcome);
        if let Some(failure) = aborted {
            warn!(step = %step.name, error = %failure, "aborting step");
            result.error = Some(failure);
            break;
        }
    }

    ctx.callbacks.fire_after(&Event::Step {
        step,
        result: Some(&result),
    })?;
    Ok(result)
}

pub fn run_directive(
    ctx: &Context,
    directive: &Directive,
    driver: &mut dyn Driver,
    scope: &NestedScope,
) -> Result<RunResult> {
    ctx.callbacks.fire_before(&Event::Directive {
        directive,
        result: None,
    })?;
    let result = ctx.directives.dispatch(&directive.text, scope, driver);
    ctx.callbacks.fire_after(&Event::Directive {
        directive,
        result: Some(&result),
    })?;
    Ok(result)
}
