//! Built-in directive library.
//!
//! Registration order is dispatch priority, so [`register_builtin`] adds the
//! `... within N seconds` forms ahead of their plain counterparts and the
//! expectations ahead of the interactions. Every pattern is anchored at the
//! start of the directive.

pub mod wait;
pub mod webdriver;

use std::time::Duration;

use anyhow::Result;
use tracing::debug;

use crate::driver::{Driver, ElementRef, Locator};
use crate::error::{Failure, FailureKind};
use crate::registry::directives::{Args, DirectiveRegistry, HandlerResult};

use self::wait::{wait_for_result, wait_handler};
use self::webdriver as wd;

/// Trailing `within N seconds` clause shared by the polling forms.
const WITHIN: &str = r" within (?P<seconds>\d+(?:\.\d+)?) seconds?";

/// Register the whole library into `registry`.
pub fn register_builtin(registry: &mut DirectiveRegistry, poll_interval: Duration) -> Result<()> {
    let before = registry.len();

    // Polling forms.
    let within: [(&str, fn(&Args, &mut dyn Driver) -> HandlerResult); 13] = [
        (r#"^Expect Page Title is "(?P<title>.+)""#, wd::expect_page_title),
        (r#"^Expect url to be "(?P<url>.+)""#, wd::expect_url_to_be),
        (r#"^Expect url to contain "(?P<url>.+)""#, wd::expect_url_to_contain),
        (r#"^Expect an alert with text "(?P<text>.+)""#, wd::expect_alert_text),
        (r"^expect to see content (?P<content>.+?)", wd::expect_content),
        (r"^expect exists (?P<elem>.+?)", wd::expect_exists),
        (r"^Expect (?P<elem>.+?) to not exist", wd::expect_absent),
        (r#"^Expect (?P<elem>.+?) to have a value equal to "(?P<value>.*)""#, wd::expect_value_equal),
        (r#"^Expect (?P<elem>.+?) to contain a value of "(?P<regexp>.+)""#, wd::expect_value_matches),
        (r#"^Expect (?P<elem>.+?) does not contain "(?P<regexp>.+)""#, wd::expect_not_matches),
        (r#"^Expect (?P<elem>.+?) contains "(?P<regexp>.+)""#, wd::expect_matches),
        (r"^Expect (?P<elem>.+?) is not selected", wd::expect_not_selected),
        (r"^Expect (?P<elem>.+?) is selected", wd::expect_selected),
    ];
    for (pattern, check) in within {
        register_within(registry, pattern, poll_interval, check)?;
    }

    // Plain expectations.
    registry.register(r#"^Expect Page Title is "(?P<title>.+)""#, wd::expect_page_title)?;
    registry.register(r#"^Expect url to be "(?P<url>.+)""#, wd::expect_url_to_be)?;
    registry.register(r#"^Expect url to contain "(?P<url>.+)""#, wd::expect_url_to_contain)?;
    registry.register(r#"^Expect an alert with text "(?P<text>.+)""#, wd::expect_alert_text)?;
    registry.register(r"^Expect no alert displayed", wd::expect_no_alert)?;
    registry.register(
        r#"^Expect link with url "(?P<url>.+?)" that contains text "(?P<text>.+)""#,
        wd::expect_link_with_text,
    )?;
    registry.register(r#"^Expect link with url "(?P<url>.+)""#, wd::expect_link)?;
    registry.register_expecting(
        r#"^Expect option "(?P<value>.+?)" not in selector (?P<elem>.+)"#,
        FailureKind::ElementNotFound,
        wd::expect_option_present,
    )?;
    registry.register(
        r#"^Expect option "(?P<value>.+?)" in selector (?P<elem>.+)"#,
        wd::expect_option_present,
    )?;
    registry.register(
        r#"^Expect "(?P<value>.+?)" radio should not be selected"#,
        wd::expect_radio_not_selected,
    )?;
    registry.register(r#"^Expect "(?P<value>.+?)" radio should be selected"#, wd::expect_radio_selected)?;
    registry.register(
        r#"^expect "(?P<value>.*?)" from (?P<elem>.+) should be selected"#,
        wd::expect_option_selected,
    )?;
    registry.register(
        r"^expect \[(?P<list>.+)\] from (?P<elem>.+) should be selected",
        wd::expect_options_selected,
    )?;
    registry.register(r"^expect to see content (?P<content>.+)", wd::expect_content)?;
    registry.register(r"^expect exists (?P<elem>.+)", wd::expect_exists)?;
    registry.register_expecting(
        r"^Expect (?P<elem>.+) to not exist",
        FailureKind::ElementNotFound,
        wd::expect_exists,
    )?;
    registry.register(
        r#"^Expect (?P<elem>.+) to have a value equal to "(?P<value>.*)""#,
        wd::expect_value_equal,
    )?;
    registry.register(
        r#"^Expect (?P<elem>.+) to contain a value of "(?P<regexp>.+)""#,
        wd::expect_value_matches,
    )?;
    registry.register(
        r#"^Expect (?P<elem>.+) does not contain "(?P<regexp>.+)""#,
        wd::expect_not_matches,
    )?;
    registry.register(r#"^Expect (?P<elem>.+) contains "(?P<regexp>.+)""#, wd::expect_matches)?;
    registry.register(r"^Expect (?P<elem>.+) is not selected", wd::expect_not_selected)?;
    registry.register(r"^Expect (?P<elem>.+) is selected", wd::expect_selected)?;

    // Alerts.
    registry.register(r"^Accept the alert", wd::accept_alert)?;
    registry.register(r"^Dismiss the alert", wd::dismiss_alert)?;

    // Interactions.
    registry.register(r"^load (?P<url>.+)", wd::load_url)?;
    registry.register(r#"^type (?P<keys>".*"|'.*'|\[.+?\]|\S+) into (?P<elem>.+)"#, wd::type_into)?;
    registry.register(r"^Follow link (?P<elem>.+)", wd::follow_link)?;
    registry.register(r"^Select \[(?P<list>.+)\] from (?P<elem>.+)", wd::select_many)?;
    registry.register(r#"^Select "(?P<value>.*?)" from (?P<elem>.+)"#, wd::select_one)?;
    registry.register(r#"^Choose radio with value "(?P<value>.+)""#, wd::choose_radio)?;
    registry.register(r"^Uncheck (?P<elem>.+)", wd::uncheck)?;
    registry.register(r"^Check (?P<elem>.+)", wd::check)?;
    registry.register(r"^(?:click|press) (?P<elem>.+)", wd::click)?;
    registry.register(r"^Wait (?P<seconds>\d+(?:\.\d+)?) seconds?", wait_handler(poll_interval))?;

    debug!(directives = registry.len() - before, "registered built-in directives");
    Ok(())
}

/// Register `check` under `pattern` + [`WITHIN`], retried until it passes.
fn register_within(
    registry: &mut DirectiveRegistry,
    pattern: &str,
    poll_interval: Duration,
    check: fn(&Args, &mut dyn Driver) -> HandlerResult,
) -> Result<()> {
    registry.register(&format!("{pattern}{WITHIN}$"), move |args, driver| {
        let timeout = seconds_arg(args)?;
        wait_for_result(timeout, poll_interval, || check(args, driver).and_then(truthy))
    })
}

/// A `false` outcome counts as a failed attempt while polling.
fn truthy(outcome: Option<bool>) -> HandlerResult {
    match outcome {
        Some(false) => Err(Failure::ReturnedFalse),
        other => Ok(other),
    }
}

/// Named capture `name`; its absence means the pattern and handler disagree.
pub(crate) fn arg<'a>(args: &'a Args, name: &str) -> Result<&'a str, Failure> {
    args.get(name).map(String::as_str).ok_or_else(|| Failure::Other {
        error_type: "MissingArgument".to_string(),
        message: format!("directive pattern has no '{name}' capture"),
    })
}

pub(crate) fn seconds_arg(args: &Args) -> Result<Duration, Failure> {
    let raw = arg(args, "seconds")?;
    raw.parse::<f64>()
        .ok()
        .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())
        .ok_or_else(|| Failure::Other {
            error_type: "InvalidArgument".to_string(),
            message: format!("'{raw}' is not a number of seconds"),
        })
}

/// Locate the element named by the `elem` capture.
pub(crate) fn element(args: &Args, driver: &dyn Driver) -> Result<ElementRef, Failure> {
    driver.find_element(&Locator::parse(arg(args, "elem")?))
}
