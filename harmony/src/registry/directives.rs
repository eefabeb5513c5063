//! Directive registry and dispatcher.
//!
//! Patterns are case-insensitive regular expressions searched (not
//! full-matched) against the directive string. The first registered pattern
//! that matches wins, so registration order is dispatch priority.

use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};
use regex::{Captures, Regex, RegexBuilder};
use tracing::{debug, instrument};

use crate::core::result::RunResult;
use crate::core::scope::NestedScope;
use crate::core::substitution::{CaptureValue, parse_capture};
use crate::driver::Driver;
use crate::error::{Failure, FailureKind};

/// Capture name injected by the dispatcher for the driver handle.
pub const RESERVED_CAPTURE: &str = "driver";

/// Named capture values after substitution.
pub type Args = BTreeMap<String, String>;

/// `Ok(Some(false))` fails the directive; `Ok(None)` and `Ok(Some(true))` pass.
pub type HandlerResult = Result<Option<bool>, Failure>;

pub type Handler = Box<dyn Fn(&Args, &mut dyn Driver) -> HandlerResult>;

pub struct DirectiveEntry {
    pattern: Regex,
    handler: Handler,
    expected: Option<FailureKind>,
}

impl DirectiveEntry {
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Failure kind the handler must raise to pass, if any.
    pub fn expected(&self) -> Option<FailureKind> {
        self.expected
    }
}

/// A directive string matched against a registry entry.
pub struct Resolved<'r, 'd> {
    pub entry: &'r DirectiveEntry,
    pub captures: Captures<'d>,
}

#[derive(Default)]
pub struct DirectiveRegistry {
    entries: Vec<DirectiveEntry>,
}

impl DirectiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `pattern`.
    pub fn register<F>(&mut self, pattern: &str, handler: F) -> Result<()>
    where
        F: Fn(&Args, &mut dyn Driver) -> HandlerResult + 'static,
    {
        self.push(pattern, None, Box::new(handler))
    }

    /// Register a handler that passes only by raising `expected`.
    pub fn register_expecting<F>(
        &mut self,
        pattern: &str,
        expected: FailureKind,
        handler: F,
    ) -> Result<()>
    where
        F: Fn(&Args, &mut dyn Driver) -> HandlerResult + 'static,
    {
        self.push(pattern, Some(expected), Box::new(handler))
    }

    fn push(&mut self, pattern: &str, expected: Option<FailureKind>, handler: Handler) -> Result<()> {
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .with_context(|| format!("compile directive pattern '{pattern}'"))?;
        if pattern.capture_names().flatten().any(|name| name == RESERVED_CAPTURE) {
            bail!(
                "directive pattern '{}' uses the reserved capture name '{RESERVED_CAPTURE}'",
                pattern.as_str()
            );
        }
        self.entries.push(DirectiveEntry {
            pattern,
            handler,
            expected,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(DirectiveEntry::pattern)
    }

    /// First entry whose pattern matches anywhere in `directive`.
    pub fn resolve<'r, 'd>(&'r self, directive: &'d str) -> Option<Resolved<'r, 'd>> {
        self.entries.iter().find_map(|entry| {
            entry
                .pattern
                .captures(directive)
                .map(|captures| Resolved { entry, captures })
        })
    }

    /// Resolve, substitute and invoke `directive`, recording the outcome.
    #[instrument(skip_all, fields(directive = %directive))]
    pub fn dispatch(&self, directive: &str, scope: &NestedScope, driver: &mut dyn Driver) -> RunResult {
        match self.try_dispatch(directive, scope, driver) {
            Ok(()) => RunResult::new(directive),
            Err(failure) => {
                debug!(error = %failure, "directive failed");
                RunResult::failed(directive, failure)
            }
        }
    }

    fn try_dispatch(
        &self,
        directive: &str,
        scope: &NestedScope,
        driver: &mut dyn Driver,
    ) -> Result<(), Failure> {
        let resolved = self.resolve(directive).ok_or_else(|| Failure::NoHandler {
            directive: directive.to_string(),
        })?;
        debug!(pattern = resolved.entry.pattern(), "matched directive pattern");

        let args = substitute(&resolved, scope)?;
        let outcome = (resolved.entry.handler)(&args, driver);
        judge(outcome, resolved.entry.expected)
    }
}

/// Collect named captures, dereferencing `[name]` markers and stripping quotes.
fn substitute(resolved: &Resolved<'_, '_>, scope: &NestedScope) -> Result<Args, Failure> {
    let mut args = Args::new();
    for name in resolved.entry.pattern.capture_names().flatten() {
        if name == RESERVED_CAPTURE {
            return Err(Failure::ReservedCapture {
                name: name.to_string(),
            });
        }
        // Optional groups that did not participate are left out.
        let Some(raw) = resolved.captures.name(name) else {
            continue;
        };
        let value = match parse_capture(raw.as_str()) {
            CaptureValue::Variable(variable) => scope
                .get(variable)
                .ok_or_else(|| Failure::UndefinedVariable {
                    name: variable.to_string(),
                })?
                .to_string(),
            CaptureValue::Literal(literal) => literal.to_string(),
        };
        args.insert(name.to_string(), value);
    }
    Ok(args)
}

/// Turn a handler outcome into the directive's failure, if any.
fn judge(outcome: HandlerResult, expected: Option<FailureKind>) -> Result<(), Failure> {
    match (expected, outcome) {
        (None, Err(failure)) => Err(failure),
        (None, Ok(Some(false))) => Err(Failure::ReturnedFalse),
        (None, Ok(_)) => Ok(()),
        (Some(kind), Err(failure)) if failure.kind() == kind => Ok(()),
        (Some(kind), Err(failure)) => Err(Failure::ExpectedErrorNotRaised {
            expected: kind,
            received: Some(failure.to_string()),
        }),
        (Some(kind), Ok(_)) => Err(Failure::ExpectedErrorNotRaised {
            expected: kind,
            received: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::core::variables::Variables;
    use crate::driver::DriverFactory;
    use crate::driver::memory::MemoryDriverFactory;

    fn driver() -> Box<dyn Driver> {
        MemoryDriverFactory::default().launch().expect("launch")
    }

    fn scope(pairs: &[(&str, &str)]) -> NestedScope {
        let mut vars = Variables::new();
        for (key, value) in pairs {
            vars.set(*key, *value).expect("set");
        }
        NestedScope::new(vars)
    }

    /// Registers a handler that records the args it was called with.
    fn recording(registry: &mut DirectiveRegistry, pattern: &str) -> Rc<RefCell<Vec<Args>>> {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&calls);
        registry
            .register(pattern, move |args, _driver| {
                sink.borrow_mut().push(args.clone());
                Ok(None)
            })
            .expect("register");
        calls
    }

    #[test]
    fn first_registered_match_wins() {
        let mut registry = DirectiveRegistry::new();
        let first = recording(&mut registry, r"click (?P<elem>.+)");
        let second = recording(&mut registry, r"click (?P<target>#.+)");

        let result = registry.dispatch("click #submit", &scope(&[]), driver().as_mut());
        assert!(!result.is_failed());
        assert_eq!(first.borrow().len(), 1);
        assert!(second.borrow().is_empty());
    }

    #[test]
    fn patterns_are_case_insensitive_searches() {
        let mut registry = DirectiveRegistry::new();
        let calls = recording(&mut registry, r"Wait (?P<seconds>\d+(\.\d+)?) seconds");
        let result = registry.dispatch("then wait 2.5 seconds please", &scope(&[]), driver().as_mut());
        assert!(!result.is_failed());
        assert_eq!(calls.borrow()[0]["seconds"], "2.5");
    }

    #[test]
    fn quoted_literals_are_unquoted() {
        let mut registry = DirectiveRegistry::new();
        let calls = recording(&mut registry, r#"type (?P<keys>".+") into (?P<elem>.+)"#);
        registry.dispatch(r##"type "x" into "#f""##, &scope(&[]), driver().as_mut());
        let calls = calls.borrow();
        assert_eq!(calls[0]["keys"], "x");
        assert_eq!(calls[0]["elem"], "#f");
    }

    #[test]
    fn bracketed_values_read_current_scope() {
        let mut registry = DirectiveRegistry::new();
        let calls = recording(&mut registry, r"login as (?P<user>.+)");
        let mut scope = scope(&[("username", "alice")]);
        registry.dispatch("login as [username]", &scope, driver().as_mut());
        scope.set("username", "bob").expect("set");
        registry.dispatch("login as [username]", &scope, driver().as_mut());

        let users: Vec<String> = calls.borrow().iter().map(|a| a["user"].clone()).collect();
        assert_eq!(users, vec!["alice", "bob"]);
    }

    #[test]
    fn undefined_variable_is_recorded() {
        let mut registry = DirectiveRegistry::new();
        recording(&mut registry, r"login as (?P<user>.+)");
        let result = registry.dispatch("login as [nobody]", &scope(&[]), driver().as_mut());
        assert_eq!(
            result.error,
            Some(Failure::UndefinedVariable {
                name: "nobody".to_string()
            })
        );
    }

    #[test]
    fn reserved_capture_name_fails_registration() {
        let mut registry = DirectiveRegistry::new();
        let err = registry
            .register(r"use (?P<driver>.+)", |_, _| Ok(None))
            .expect_err("reserved capture");
        assert!(err.to_string().contains("reserved capture name 'driver'"));
        assert!(registry.is_empty());
    }

    #[test]
    fn reserved_capture_is_still_rejected_at_dispatch() {
        let mut registry = DirectiveRegistry::new();
        let called = Rc::new(RefCell::new(false));
        let sink = Rc::clone(&called);
        registry.entries.push(DirectiveEntry {
            pattern: RegexBuilder::new(r"use (?P<driver>.+)")
                .case_insensitive(true)
                .build()
                .expect("pattern"),
            handler: Box::new(move |_, _| {
                *sink.borrow_mut() = true;
                Ok(None)
            }),
            expected: None,
        });

        let result = registry.dispatch("use chrome", &scope(&[]), driver().as_mut());
        assert_eq!(
            result.error,
            Some(Failure::ReservedCapture {
                name: "driver".to_string()
            })
        );
        assert!(!*called.borrow());
    }

    #[test]
    fn unmatched_directive_has_no_handler() {
        let registry = DirectiveRegistry::new();
        let result = registry.dispatch("dance", &scope(&[]), driver().as_mut());
        assert_eq!(result.name, "dance");
        assert_eq!(
            result.error,
            Some(Failure::NoHandler {
                directive: "dance".to_string()
            })
        );
    }

    #[test]
    fn false_return_and_raised_failures_are_recorded() {
        let mut registry = DirectiveRegistry::new();
        registry
            .register("falsy", |_, _| Ok(Some(false)))
            .expect("register");
        registry
            .register("truthy", |_, _| Ok(Some(true)))
            .expect("register");
        registry
            .register("boom", |_, _| Err(Failure::assertion("boom")))
            .expect("register");

        let scope = scope(&[]);
        let mut driver = driver();
        assert_eq!(
            registry.dispatch("falsy", &scope, driver.as_mut()).error,
            Some(Failure::ReturnedFalse)
        );
        assert!(!registry.dispatch("truthy", &scope, driver.as_mut()).is_failed());
        assert_eq!(
            registry.dispatch("boom", &scope, driver.as_mut()).error,
            Some(Failure::assertion("boom"))
        );
    }

    #[test]
    fn expected_failure_mode_inverts_outcome() {
        let mut registry = DirectiveRegistry::new();
        registry
            .register_expecting("raises", FailureKind::ElementNotFound, |_, _| {
                Err(Failure::element_not_found("#gone"))
            })
            .expect("register");
        registry
            .register_expecting("passes", FailureKind::ElementNotFound, |_, _| Ok(None))
            .expect("register");
        registry
            .register_expecting("wrong", FailureKind::ElementNotFound, |_, _| {
                Err(Failure::assertion("other"))
            })
            .expect("register");

        let scope = scope(&[]);
        let mut driver = driver();
        assert!(!registry.dispatch("raises", &scope, driver.as_mut()).is_failed());
        assert_eq!(
            registry.dispatch("passes", &scope, driver.as_mut()).error,
            Some(Failure::ExpectedErrorNotRaised {
                expected: FailureKind::ElementNotFound,
                received: None,
            })
        );
        assert!(matches!(
            registry.dispatch("wrong", &scope, driver.as_mut()).error,
            Some(Failure::ExpectedErrorNotRaised {
                received: Some(_),
                ..
            })
        ));
    }

    #[test]
    fn invalid_pattern_fails_registration() {
        let mut registry = DirectiveRegistry::new();
        let err = registry
            .register("broken (", |_, _| Ok(None))
            .expect_err("invalid regex");
        assert!(err.to_string().contains("compile directive pattern"));
        assert!(registry.is_empty());
    }
}
