//! Plain console progress output and the end-of-run summary.
//!
//! Progress lines are printed from the `_output` callback phases:
//!
//! ```text
//! Running Test Plans
//! Test Plan: smoke
//! 	Test Case: login
//! 	* Sign in
//! 		- click #submit
//! 		- expect exists #welcome ... FAIL
//! ```

use std::cell::RefCell;
use std::fmt::Write as _;
use std::io::{self, Write};
use std::rc::Rc;

use anyhow::{Context, Result};

use crate::core::summary::{ErrorEntry, Summary};
use crate::registry::callbacks::{CallbackRegistry, Entity, Event, Phase};

/// Progress line for `event` in `phase`, if the console prints one.
pub fn render(phase: Phase, event: &Event<'_>) -> Option<String> {
    match (phase, event) {
        (Phase::BeforeOutput, Event::Run { .. }) => Some("Running Test Plans".to_string()),
        (Phase::BeforeOutput, Event::TestPlan { plan, .. }) => {
            Some(format!("Test Plan: {}", plan.name))
        }
        (Phase::BeforeOutput, Event::Task { task, .. }) => {
            Some(format!("\tTest Case: {}", task.name))
        }
        (Phase::BeforeOutput, Event::Step { step, .. }) => Some(format!("\t* {}", step.name)),
        (
            Phase::AfterOutput,
            Event::Directive {
                directive,
                result: Some(result),
            },
        ) => {
            let marker = if result.is_failed() { " ... FAIL" } else { "" };
            Some(format!("\t\t- {}{marker}", directive.text))
        }
        _ => None,
    }
}

/// Print progress to stdout.
pub fn register(callbacks: &mut CallbackRegistry) {
    register_to(callbacks, Rc::new(RefCell::new(io::stdout())));
}

/// Print progress to `sink`.
pub fn register_to<W: Write + 'static>(callbacks: &mut CallbackRegistry, sink: Rc<RefCell<W>>) {
    let hooks = [
        (Entity::All, Phase::BeforeOutput),
        (Entity::TestPlan, Phase::BeforeOutput),
        (Entity::Task, Phase::BeforeOutput),
        (Entity::Step, Phase::BeforeOutput),
        (Entity::Directive, Phase::AfterOutput),
    ];
    for (entity, phase) in hooks {
        let sink = Rc::clone(&sink);
        callbacks.register(entity, phase, move |event| {
            let Some(line) = render(phase, event) else {
                return Ok(());
            };
            writeln!(sink.borrow_mut(), "{line}").context("write console output")
        });
    }
}

pub fn render_summary(summary: &Summary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Ran {} test plan(s), {} in error.",
        summary.plan_count, summary.in_error
    );
    if summary.errors.is_empty() {
        return out;
    }

    out.push_str("Errors:\n");
    for entry in &summary.errors {
        match entry {
            ErrorEntry::Single { location, reason } => {
                let _ = writeln!(out, "  {location}: {reason}");
            }
            ErrorEntry::Grouped {
                location,
                directives,
            } => {
                let _ = writeln!(out, "  {location}:");
                for failure in directives {
                    let _ = writeln!(out, "    - {}: {}", failure.directive, failure.reason);
                }
            }
        }
    }
    out
}
