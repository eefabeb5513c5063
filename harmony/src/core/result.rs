//! Result tree mirroring plan, task, step and directive.

use serde::{Deserialize, Serialize};

use crate::error::Failure;

/// One node of the result tree.
///
/// Children keep execution order. A directive string repeated within a step,
/// or a prerequisite that runs several times, produces one node per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Failure>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RunResult>,
}

impl RunResult {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            error: None,
            children: Vec::new(),
        }
    }

    pub fn failed(name: impl Into<String>, error: Failure) -> Self {
        Self {
            error: Some(error),
            ..Self::new(name)
        }
    }

    pub fn push(&mut self, child: RunResult) {
        self.children.push(child);
    }

    /// Most recent child named `name`.
    pub fn child(&self, name: &str) -> Option<&RunResult> {
        self.children.iter().rev().find(|child| child.name == name)
    }

    /// True if this node carries an error.
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// True if this node or any descendant carries an error.
    pub fn has_failure(&self) -> bool {
        self.is_failed() || self.children.iter().any(RunResult::has_failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_propagates_through_descendants() {
        let mut step = RunResult::new("step");
        step.push(RunResult::new("ok"));
        step.push(RunResult::failed("bad", Failure::ReturnedFalse));
        let mut task = RunResult::new("task");
        task.push(step);

        assert!(!task.is_failed());
        assert!(task.has_failure());
        assert!(!RunResult::new("clean").has_failure());
    }

    #[test]
    fn child_returns_latest_duplicate() {
        let mut step = RunResult::new("step");
        step.push(RunResult::new("wait 1 seconds"));
        step.push(RunResult::failed("wait 1 seconds", Failure::ReturnedFalse));
        assert_eq!(step.children.len(), 2);
        assert!(step.child("wait 1 seconds").expect("child").is_failed());
        assert!(step.child("missing").is_none());
    }
}
