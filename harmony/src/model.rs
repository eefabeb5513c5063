//! Test plan, task, step and directive definitions.
//!
//! These are the parsed, immutable shapes of the YAML files. Running them is
//! the job of [`crate::execute`].

use crate::core::variables::Variables;

/// A single instruction string, matched against the directive registry at
/// dispatch time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub text: String,
}

impl Directive {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: String,
    pub directives: Vec<Directive>,
}

impl Step {
    pub fn new<I, S>(name: impl Into<String>, directives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            directives: directives.into_iter().map(Directive::new).collect(),
        }
    }
}

/// A named sequence of steps: the unit of dependency ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Unique name, also the dependency-graph key.
    pub name: String,
    pub description: Option<String>,
    /// Tasks run once, before the first task that needs them.
    pub setup_tasks: Vec<String>,
    /// Tasks run every time, immediately before this one.
    pub execute_prerequisites: Vec<String>,
    pub variables: Variables,
    pub steps: Vec<Step>,
}

impl Task {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            setup_tasks: Vec::new(),
            execute_prerequisites: Vec::new(),
            variables: Variables::new(),
            steps: Vec::new(),
        }
    }
}

/// A named list of task references run against one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestPlan {
    pub name: String,
    pub tasks: Vec<String>,
    /// Selects the driver factory, matched case-insensitively.
    pub environment: String,
    /// Global scope for every task of the plan.
    pub variables: Variables,
}

impl TestPlan {
    pub fn new(name: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tasks: Vec::new(),
            environment: environment.into(),
            variables: Variables::new(),
        }
    }
}
