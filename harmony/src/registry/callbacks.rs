//! Lifecycle callbacks keyed by entity and phase.
//!
//! Each level of the run (the whole run, a plan, a task, a step, a directive)
//! fires `before` then `before_output` ahead of its work, and `after` then
//! `after_output` once its result is known. Domain hooks use the plain
//! phases; reporters use the `_output` ones.

use std::collections::HashMap;

use anyhow::{Context, Result};

use crate::core::result::RunResult;
use crate::model::{Directive, Step, Task, TestPlan};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    All,
    TestPlan,
    Task,
    Step,
    Directive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Before,
    BeforeOutput,
    After,
    AfterOutput,
}

impl Phase {
    pub fn is_before(self) -> bool {
        matches!(self, Phase::Before | Phase::BeforeOutput)
    }
}

/// What a callback observes. `result` is `None` in the before phases.
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    Run {
        results: Option<&'a [RunResult]>,
    },
    TestPlan {
        plan: &'a TestPlan,
        result: Option<&'a RunResult>,
    },
    Task {
        task: &'a Task,
        result: Option<&'a RunResult>,
    },
    Step {
        step: &'a Step,
        result: Option<&'a RunResult>,
    },
    Directive {
        directive: &'a Directive,
        result: Option<&'a RunResult>,
    },
}

impl Event<'_> {
    pub fn entity(&self) -> Entity {
        match self {
            Event::Run { .. } => Entity::All,
            Event::TestPlan { .. } => Entity::TestPlan,
            Event::Task { .. } => Entity::Task,
            Event::Step { .. } => Entity::Step,
            Event::Directive { .. } => Entity::Directive,
        }
    }

    /// Name of the entity the event is about.
    pub fn name(&self) -> &str {
        match self {
            Event::Run { .. } => "all",
            Event::TestPlan { plan, .. } => &plan.name,
            Event::Task { task, .. } => &task.name,
            Event::Step { step, .. } => &step.name,
            Event::Directive { directive, .. } => &directive.text,
        }
    }
}

pub type Callback = Box<dyn Fn(&Event<'_>) -> Result<()>>;

#[derive(Default)]
pub struct CallbackRegistry {
    callbacks: HashMap<(Entity, Phase), Vec<Callback>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `callback` for `(entity, phase)`; callbacks run in registration order.
    pub fn register<F>(&mut self, entity: Entity, phase: Phase, callback: F)
    where
        F: Fn(&Event<'_>) -> Result<()> + 'static,
    {
        self.callbacks
            .entry((entity, phase))
            .or_default()
            .push(Box::new(callback));
    }

    pub fn before<F>(&mut self, entity: Entity, callback: F)
    where
        F: Fn(&Event<'_>) -> Result<()> + 'static,
    {
        self.register(entity, Phase::Before, callback);
    }

    pub fn after<F>(&mut self, entity: Entity, callback: F)
    where
        F: Fn(&Event<'_>) -> Result<()> + 'static,
    {
        self.register(entity, Phase::After, callback);
    }

    /// Run every callback for the event's entity and `phase`.
    ///
    /// The first failing callback aborts the run.
    pub fn run_all(&self, phase: Phase, event: &Event<'_>) -> Result<()> {
        let entity = event.entity();
        let Some(callbacks) = self.callbacks.get(&(entity, phase)) else {
            return Ok(());
        };
        for callback in callbacks {
            callback(event)
                .with_context(|| format!("{entity:?} {phase:?} callback for '{}'", event.name()))?;
        }
        Ok(())
    }

    /// `before` then `before_output`.
    pub fn fire_before(&self, event: &Event<'_>) -> Result<()> {
        self.run_all(Phase::Before, event)?;
        self.run_all(Phase::BeforeOutput, event)
    }

    /// `after` then `after_output`.
    pub fn fire_after(&self, event: &Event<'_>) -> Result<()> {
        self.run_all(Phase::After, event)?;
        self.run_all(Phase::AfterOutput, event)
    }
}
