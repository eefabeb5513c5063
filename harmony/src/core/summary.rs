//! Post-run aggregation of result trees into a failure summary.

use serde::Serialize;

use crate::core::result::RunResult;
use crate::error::Failure;

/// Aggregate outcome of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Number of plans run.
    pub plan_count: usize,
    /// Number of plans with a failure anywhere in their tree.
    pub in_error: usize,
    pub errors: Vec<ErrorEntry>,
}

/// One itemised failure location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ErrorEntry {
    /// A plan, task or step that failed on its own.
    Single { location: String, reason: String },
    /// Failing directives of one step, kept together.
    Grouped {
        location: String,
        directives: Vec<DirectiveFailure>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectiveFailure {
    pub directive: String,
    pub reason: String,
}

impl ErrorEntry {
    pub fn location(&self) -> &str {
        match self {
            ErrorEntry::Single { location, .. } | ErrorEntry::Grouped { location, .. } => {
                location
            }
        }
    }
}

impl Summary {
    pub fn is_clean(&self) -> bool {
        self.in_error == 0
    }
}

/// Summarize plan results (one [`RunResult`] per plan).
pub fn summarize(plans: &[RunResult]) -> Summary {
    let mut summary = Summary {
        plan_count: plans.len(),
        ..Summary::default()
    };

    for plan in plans {
        if plan.has_failure() {
            summary.in_error += 1;
        }
        collect_plan_errors(plan, &mut summary.errors);
    }

    summary
}

fn collect_plan_errors(plan: &RunResult, errors: &mut Vec<ErrorEntry>) {
    if let Some(failure) = &plan.error {
        errors.push(single(plan.name.clone(), failure));
    }

    for task in &plan.children {
        let task_location = format!("{} - {}", plan.name, task.name);
        if let Some(failure) = &task.error {
            errors.push(single(task_location.clone(), failure));
        }

        for step in &task.children {
            let location = format!("{}({})", task_location, step.name);
            if let Some(failure) = &step.error {
                errors.push(single(location.clone(), failure));
            }

            let directives: Vec<DirectiveFailure> = step
                .children
                .iter()
                .filter_map(|directive| {
                    directive.error.as_ref().map(|failure| DirectiveFailure {
                        directive: directive.name.clone(),
                        reason: classify(failure),
                    })
                })
                .collect();
            if !directives.is_empty() {
                errors.push(ErrorEntry::Grouped {
                    location,
                    directives,
                });
            }
        }
    }
}

fn single(location: String, failure: &Failure) -> ErrorEntry {
    ErrorEntry::Single {
        location,
        reason: classify(failure),
    }
}

/// Human-readable reason for a caught failure.
pub fn classify(failure: &Failure) -> String {
    match failure {
        Failure::ElementNotFound { .. } => {
            format!("Element to check was not found. ({failure})")
        }
        Failure::Assertion { message } => format!("Expectation not met. ({message})"),
        Failure::ExpectedErrorNotRaised { .. } => {
            "Expected an error, but didn't receive one.".to_string()
        }
        other => format!("Exception caught. ({}: {})", other.kind(), other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    fn tree(directives: Vec<RunResult>) -> RunResult {
        let mut step = RunResult::new("Login");
        for directive in directives {
            step.push(directive);
        }
        let mut task = RunResult::new("sign in");
        task.push(step);
        let mut plan = RunResult::new("smoke");
        plan.push(task);
        plan
    }

    #[test]
    fn single_failing_directive_is_grouped_under_its_step() {
        let plan = tree(vec![
            RunResult::new("load http://example.com"),
            RunResult::failed("expect exists #title", Failure::element_not_found("#title")),
        ]);

        let summary = summarize(&[plan]);
        assert_eq!(summary.plan_count, 1);
        assert_eq!(summary.in_error, 1);
        assert_eq!(
            summary.errors,
            vec![ErrorEntry::Grouped {
                location: "smoke - sign in(Login)".to_string(),
                directives: vec![DirectiveFailure {
                    directive: "expect exists #title".to_string(),
                    reason: "Element to check was not found. (no element found for '#title')"
                        .to_string(),
                }],
            }]
        );
    }

    #[test]
    fn multiple_failures_in_one_step_share_an_entry() {
        let plan = tree(vec![
            RunResult::failed("a", Failure::assertion("first")),
            RunResult::new("b"),
            RunResult::failed("c", Failure::ReturnedFalse),
        ]);
        let summary = summarize(&[plan]);
        assert_eq!(summary.errors.len(), 1);
        match &summary.errors[0] {
            ErrorEntry::Grouped { directives, .. } => {
                let names: Vec<&str> = directives.iter().map(|d| d.directive.as_str()).collect();
                assert_eq!(names, vec!["a", "c"]);
            }
            other => panic!("unexpected entry {other:?}"),
        }
    }

    #[test]
    fn clean_plans_are_not_in_error() {
        let summary = summarize(&[tree(vec![RunResult::new("ok")]), RunResult::new("empty")]);
        assert_eq!(summary.plan_count, 2);
        assert_eq!(summary.in_error, 0);
        assert!(summary.is_clean());
        assert!(summary.errors.is_empty());
    }

    #[test]
    fn task_level_failure_uses_task_location() {
        let mut plan = RunResult::new("smoke");
        plan.push(RunResult::failed(
            "checkout",
            Failure::UnknownEnvironment {
                environment: "netscape".to_string(),
            },
        ));
        let summary = summarize(&[plan]);
        assert_eq!(summary.in_error, 1);
        assert_eq!(summary.errors[0].location(), "smoke - checkout");
    }

    #[test]
    fn classify_reasons() {
        assert_eq!(
            classify(&Failure::assertion("Title was 'Home'")),
            "Expectation not met. (Title was 'Home')"
        );
        assert_eq!(
            classify(&Failure::ExpectedErrorNotRaised {
                expected: FailureKind::ElementNotFound,
                received: None,
            }),
            "Expected an error, but didn't receive one."
        );
        assert_eq!(
            classify(&Failure::ReturnedFalse),
            "Exception caught. (ReturnedFalse: directive returned false)"
        );
    }
}
