//! Test-only helpers for building suites, contexts and recorders.

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use tempfile::TempDir;

use crate::core::variables::Variables;
use crate::driver::memory::{self, MemoryDriverFactory};
use crate::library::register_builtin;
use crate::model::{Step, Task, TestPlan};
use crate::registry::callbacks::{CallbackRegistry, Entity, Phase};
use crate::registry::directives::{Args, DirectiveRegistry};
use crate::runner::Context;

/// Poll interval used by test contexts.
pub const TEST_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub fn step(name: &str, directives: &[&str]) -> Step {
    Step::new(name, directives.iter().copied())
}

pub fn task(name: &str, steps: Vec<Step>) -> Task {
    Task {
        steps,
        ..Task::new(name)
    }
}

/// Task with run-once setup tasks.
pub fn task_with_setup(name: &str, setup: &[&str], steps: Vec<Step>) -> Task {
    let mut task = task(name, steps);
    task.setup_tasks = setup.iter().map(|s| s.to_string()).collect();
    task
}

/// Task with run-every-time prerequisites.
pub fn task_with_prerequisites(name: &str, prerequisites: &[&str], steps: Vec<Step>) -> Task {
    let mut task = task(name, steps);
    task.execute_prerequisites = prerequisites.iter().map(|s| s.to_string()).collect();
    task
}

pub fn plan(name: &str, environment: &str, tasks: &[&str]) -> TestPlan {
    let mut plan = TestPlan::new(name, environment);
    plan.tasks = tasks.iter().map(|s| s.to_string()).collect();
    plan
}

/// Mutable bindings from `pairs`.
pub fn variables(pairs: &[(&str, &str)]) -> Variables {
    let mut vars = Variables::new();
    for (key, value) in pairs {
        // Fresh scope: nothing is immutable yet.
        let _ = vars.set(*key, *value);
    }
    vars
}

/// Context with the built-in library and `site` as the `memory` environment.
pub fn memory_context(site: MemoryDriverFactory) -> Result<Context> {
    let mut ctx = Context::new();
    register_builtin(&mut ctx.directives, TEST_POLL_INTERVAL)?;
    ctx.drivers.register(memory::ENVIRONMENT, site);
    Ok(ctx)
}

/// Register a handler for `pattern` that records its arguments and passes.
pub fn recording_directive(
    registry: &mut DirectiveRegistry,
    pattern: &str,
) -> Result<Rc<RefCell<Vec<Args>>>> {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&calls);
    registry.register(pattern, move |args, _driver| {
        sink.borrow_mut().push(args.clone());
        Ok(None)
    })?;
    Ok(calls)
}

/// Every callback fired, as `"<Phase> <Entity> <name>"`.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Rc<RefCell<Vec<String>>>);

impl EventLog {
    /// Register a recorder on every entity and phase of `callbacks`.
    pub fn attach(callbacks: &mut CallbackRegistry) -> Self {
        let log = Self::default();
        for entity in [
            Entity::All,
            Entity::TestPlan,
            Entity::Task,
            Entity::Step,
            Entity::Directive,
        ] {
            for phase in [Phase::Before, Phase::BeforeOutput, Phase::After, Phase::AfterOutput] {
                let sink = Rc::clone(&log.0);
                callbacks.register(entity, phase, move |event| {
                    sink.borrow_mut()
                        .push(format!("{phase:?} {entity:?} {}", event.name()));
                    Ok(())
                });
            }
        }
        log
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    /// Entries for a single phase.
    pub fn phase(&self, phase: Phase) -> Vec<String> {
        let prefix = format!("{phase:?} ");
        self.0
            .borrow()
            .iter()
            .filter_map(|entry| entry.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }
}

/// Suite directory in a temp dir: plan files at the root, tasks in `testcases/`.
pub struct SuiteDir {
    temp: TempDir,
}

impl SuiteDir {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("create temp dir")?;
        fs::create_dir(temp.path().join("testcases")).context("create testcases dir")?;
        Ok(Self { temp })
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn write_plan(&self, file: &str, yaml: &str) -> Result<()> {
        let path = self.temp.path().join(file);
        fs::write(&path, yaml).with_context(|| format!("write {}", path.display()))
    }

    pub fn write_task(&self, file: &str, yaml: &str) -> Result<()> {
        let path = self.temp.path().join("testcases").join(file);
        fs::write(&path, yaml).with_context(|| format!("write {}", path.display()))
    }
}
