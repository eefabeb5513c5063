//! Failure taxonomy recorded in the result tree.
//!
//! Every node of a [`RunResult`](crate::core::result::RunResult) may carry a
//! [`Failure`]. Directive handlers signal unmet expectations and driver
//! problems by returning one; the engine itself records configuration
//! failures (unknown directive, reserved capture name, ...) the same way so
//! that a run never stops at the first broken directive.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error raised when writing to or redefining an immutable variable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("variable '{key}' is immutable")]
pub struct ImmutableAccessError {
    pub key: String,
}

/// A failure captured at some level of the plan/task/step/directive tree.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Failure {
    #[error("no element found for '{selector}'")]
    ElementNotFound { selector: String },

    #[error("stale element reference: {message}")]
    StaleElement { message: String },

    #[error("no such window: {message}")]
    NoSuchWindow { message: String },

    #[error("no alert present")]
    NoAlertPresent,

    #[error("{message}")]
    Assertion { message: String },

    #[error("directive returned false")]
    ReturnedFalse,

    #[error("expected {expected} to be raised, got {}", .received.as_deref().unwrap_or("no error"))]
    ExpectedErrorNotRaised {
        expected: FailureKind,
        received: Option<String>,
    },

    #[error("no handler found for directive '{directive}'")]
    NoHandler { directive: String },

    #[error("capture group '{name}' is reserved for the driver handle")]
    ReservedCapture { name: String },

    #[error("variable '{name}' is not defined in any scope")]
    UndefinedVariable { name: String },

    #[error("variable '{key}' is immutable")]
    ImmutableAccess { key: String },

    #[error("task '{name}' is not registered")]
    UnknownTask { name: String },

    #[error("no driver registered for environment '{environment}'")]
    UnknownEnvironment { environment: String },

    #[error("execute prerequisite '{name}' is already running")]
    PrerequisiteCycle { name: String },

    #[error("step aborted at '{directive}': {cause}")]
    StepAborted { directive: String, cause: String },

    #[error("driver error: {message}")]
    Driver { message: String },

    #[error("{error_type}: {message}")]
    Other { error_type: String, message: String },
}

/// Stable discriminant of [`Failure`], used to declare expected failures and
/// to classify caught failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ElementNotFound,
    StaleElement,
    NoSuchWindow,
    NoAlertPresent,
    Assertion,
    ReturnedFalse,
    ExpectedErrorNotRaised,
    NoHandler,
    ReservedCapture,
    UndefinedVariable,
    ImmutableAccess,
    UnknownTask,
    UnknownEnvironment,
    PrerequisiteCycle,
    StepAborted,
    Driver,
    Other,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FailureKind::ElementNotFound => "ElementNotFound",
            FailureKind::StaleElement => "StaleElement",
            FailureKind::NoSuchWindow => "NoSuchWindow",
            FailureKind::NoAlertPresent => "NoAlertPresent",
            FailureKind::Assertion => "Assertion",
            FailureKind::ReturnedFalse => "ReturnedFalse",
            FailureKind::ExpectedErrorNotRaised => "ExpectedErrorNotRaised",
            FailureKind::NoHandler => "NoHandler",
            FailureKind::ReservedCapture => "ReservedCapture",
            FailureKind::UndefinedVariable => "UndefinedVariable",
            FailureKind::ImmutableAccess => "ImmutableAccess",
            FailureKind::UnknownTask => "UnknownTask",
            FailureKind::UnknownEnvironment => "UnknownEnvironment",
            FailureKind::PrerequisiteCycle => "PrerequisiteCycle",
            FailureKind::StepAborted => "StepAborted",
            FailureKind::Driver => "Driver",
            FailureKind::Other => "Other",
        };
        f.write_str(name)
    }
}

impl Failure {
    /// Shorthand for an assertion failure.
    pub fn assertion(message: impl Into<String>) -> Self {
        Failure::Assertion {
            message: message.into(),
        }
    }

    pub fn element_not_found(selector: impl Into<String>) -> Self {
        Failure::ElementNotFound {
            selector: selector.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Failure::ElementNotFound { .. } => FailureKind::ElementNotFound,
            Failure::StaleElement { .. } => FailureKind::StaleElement,
            Failure::NoSuchWindow { .. } => FailureKind::NoSuchWindow,
            Failure::NoAlertPresent => FailureKind::NoAlertPresent,
            Failure::Assertion { .. } => FailureKind::Assertion,
            Failure::ReturnedFalse => FailureKind::ReturnedFalse,
            Failure::ExpectedErrorNotRaised { .. } => FailureKind::ExpectedErrorNotRaised,
            Failure::NoHandler { .. } => FailureKind::NoHandler,
            Failure::ReservedCapture { .. } => FailureKind::ReservedCapture,
            Failure::UndefinedVariable { .. } => FailureKind::UndefinedVariable,
            Failure::ImmutableAccess { .. } => FailureKind::ImmutableAccess,
            Failure::UnknownTask { .. } => FailureKind::UnknownTask,
            Failure::UnknownEnvironment { .. } => FailureKind::UnknownEnvironment,
            Failure::PrerequisiteCycle { .. } => FailureKind::PrerequisiteCycle,
            Failure::StepAborted { .. } => FailureKind::StepAborted,
            Failure::Driver { .. } => FailureKind::Driver,
            Failure::Other { .. } => FailureKind::Other,
        }
    }

    /// Configuration failures abort the enclosing step instead of letting
    /// the remaining directives run.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self.kind(),
            FailureKind::NoHandler
                | FailureKind::ReservedCapture
                | FailureKind::UndefinedVariable
                | FailureKind::ImmutableAccess
        )
    }
}

impl From<ImmutableAccessError> for Failure {
    fn from(err: ImmutableAccessError) -> Self {
        Failure::ImmutableAccess { key: err.key }
    }
}

impl From<anyhow::Error> for Failure {
    fn from(err: anyhow::Error) -> Self {
        Failure::Other {
            error_type: "Error".to_string(),
            message: format!("{err:#}"),
        }
    }
}
