//! Navigation, interaction and expectation handlers.
//!
//! Every handler has the registry's handler signature so it can be
//! registered directly or wrapped in a polling form.

use regex::Regex;

use crate::driver::{Driver, Locator, SelectOption};
use crate::error::Failure;
use crate::library::{arg, element};
use crate::registry::directives::{Args, HandlerResult};

pub fn load_url(args: &Args, driver: &mut dyn Driver) -> HandlerResult {
    driver.navigate(arg(args, "url")?)?;
    Ok(None)
}

pub fn type_into(args: &Args, driver: &mut dyn Driver) -> HandlerResult {
    let target = element(args, driver)?;
    driver.send_keys(&target, arg(args, "keys")?)?;
    Ok(None)
}

pub fn click(args: &Args, driver: &mut dyn Driver) -> HandlerResult {
    let target = element(args, driver)?;
    driver.click(&target)?;
    Ok(None)
}

pub fn follow_link(args: &Args, driver: &mut dyn Driver) -> HandlerResult {
    let link = element(args, driver)?;
    let href = driver
        .attribute(&link, "href")?
        .ok_or_else(|| Failure::assertion(format!("'{}' has no href", arg_or_blank(args))))?;
    driver.navigate(&href)?;
    Ok(None)
}

pub fn check(args: &Args, driver: &mut dyn Driver) -> HandlerResult {
    set_selected(args, driver, true)
}

pub fn uncheck(args: &Args, driver: &mut dyn Driver) -> HandlerResult {
    set_selected(args, driver, false)
}

fn set_selected(args: &Args, driver: &mut dyn Driver, selected: bool) -> HandlerResult {
    let target = element(args, driver)?;
    if driver.is_selected(&target)? != selected {
        driver.click(&target)?;
    }
    Ok(None)
}

/// `Select [a, "b"] from e`: clear the selection, then select each item by
/// value, falling back to visible text.
pub fn select_many(args: &Args, driver: &mut dyn Driver) -> HandlerResult {
    let wanted = list_arg(args)?;
    let select = element(args, driver)?;
    let options = driver.options(&select)?;
    for option in options.iter().filter(|option| option.selected) {
        driver.set_option(&select, &option.value, false)?;
    }
    for item in wanted {
        let option = find_option(&options, item).ok_or_else(|| missing_option(args, item))?;
        driver.set_option(&select, &option.value, true)?;
    }
    Ok(None)
}

pub fn select_one(args: &Args, driver: &mut dyn Driver) -> HandlerResult {
    let select = element(args, driver)?;
    driver.set_option(&select, arg(args, "value")?, true)?;
    Ok(None)
}

pub fn choose_radio(args: &Args, driver: &mut dyn Driver) -> HandlerResult {
    let radio = driver.find_element(&Locator::radio(arg(args, "value")?))?;
    driver.click(&radio)?;
    Ok(None)
}

pub fn accept_alert(_args: &Args, driver: &mut dyn Driver) -> HandlerResult {
    ignore_missing_alert(driver.accept_alert())
}

pub fn dismiss_alert(_args: &Args, driver: &mut dyn Driver) -> HandlerResult {
    ignore_missing_alert(driver.dismiss_alert())
}

/// Closing an alert that is not there is not an error.
fn ignore_missing_alert(outcome: Result<(), Failure>) -> HandlerResult {
    match outcome {
        Ok(()) | Err(Failure::NoAlertPresent) => Ok(None),
        Err(failure) => Err(failure),
    }
}

pub fn expect_content(args: &Args, driver: &mut dyn Driver) -> HandlerResult {
    let content = arg(args, "content")?;
    if driver.contains_content(content)? {
        Ok(None)
    } else {
        Err(Failure::assertion(format!("Could not find content '{content}'.")))
    }
}

pub fn expect_exists(args: &Args, driver: &mut dyn Driver) -> HandlerResult {
    element(args, driver)?;
    Ok(None)
}

/// Passes once the element can no longer be found.
pub fn expect_absent(args: &Args, driver: &mut dyn Driver) -> HandlerResult {
    match element(args, driver) {
        Err(Failure::ElementNotFound { .. }) => Ok(None),
        Ok(_) => Err(Failure::assertion(format!(
            "'{}' still exists",
            arg_or_blank(args)
        ))),
        Err(failure) => Err(failure),
    }
}

pub fn expect_page_title(args: &Args, driver: &mut dyn Driver) -> HandlerResult {
    let expected = arg(args, "title")?;
    let title = driver.title()?;
    if title == expected {
        Ok(None)
    } else {
        Err(Failure::assertion(format!(
            "Page title was '{title}', expected '{expected}'."
        )))
    }
}

pub fn expect_url_to_be(args: &Args, driver: &mut dyn Driver) -> HandlerResult {
    let expected = arg(args, "url")?;
    let url = driver.current_url()?;
    if url == expected {
        Ok(None)
    } else {
        Err(Failure::assertion(format!("Url was '{url}', expected '{expected}'.")))
    }
}

pub fn expect_url_to_contain(args: &Args, driver: &mut dyn Driver) -> HandlerResult {
    let expected = arg(args, "url")?;
    let url = driver.current_url()?;
    if url.contains(expected) {
        Ok(None)
    } else {
        Err(Failure::assertion(format!(
            "Url '{url}' does not contain '{expected}'."
        )))
    }
}

pub fn expect_matches(args: &Args, driver: &mut dyn Driver) -> HandlerResult {
    let (text, pattern) = text_and_pattern(args, driver)?;
    if pattern.is_match(&text) {
        Ok(None)
    } else {
        Err(Failure::assertion(format!(
            "'{text}' does not match '{}'.",
            pattern.as_str()
        )))
    }
}

pub fn expect_not_matches(args: &Args, driver: &mut dyn Driver) -> HandlerResult {
    let (text, pattern) = text_and_pattern(args, driver)?;
    if pattern.is_match(&text) {
        Err(Failure::assertion(format!(
            "'{text}' matches '{}'.",
            pattern.as_str()
        )))
    } else {
        Ok(None)
    }
}

fn text_and_pattern(args: &Args, driver: &mut dyn Driver) -> Result<(String, Regex), Failure> {
    let pattern = regexp_arg(args)?;
    let target = element(args, driver)?;
    Ok((driver.text(&target)?, pattern))
}

fn regexp_arg(args: &Args) -> Result<Regex, Failure> {
    let raw = arg(args, "regexp")?;
    Regex::new(raw).map_err(|err| Failure::Other {
        error_type: "InvalidPattern".to_string(),
        message: format!("'{raw}': {err}"),
    })
}

/// The element's value must match the `regexp` capture somewhere.
pub fn expect_value_matches(args: &Args, driver: &mut dyn Driver) -> HandlerResult {
    let pattern = regexp_arg(args)?;
    let target = element(args, driver)?;
    let value = driver.attribute(&target, "value")?.unwrap_or_default();
    if pattern.is_match(&value) {
        Ok(None)
    } else {
        Err(Failure::assertion(format!(
            "Value was '{value}', expected a match for '{}'.",
            pattern.as_str()
        )))
    }
}

pub fn expect_value_equal(args: &Args, driver: &mut dyn Driver) -> HandlerResult {
    let expected = arg(args, "value")?;
    let target = element(args, driver)?;
    let value = driver.attribute(&target, "value")?.unwrap_or_default();
    if value == expected {
        Ok(None)
    } else {
        Err(Failure::assertion(format!(
            "Value was '{value}', expected '{expected}'."
        )))
    }
}

pub fn expect_selected(args: &Args, driver: &mut dyn Driver) -> HandlerResult {
    expect_selection(args, driver, true)
}

pub fn expect_not_selected(args: &Args, driver: &mut dyn Driver) -> HandlerResult {
    expect_selection(args, driver, false)
}

fn expect_selection(args: &Args, driver: &mut dyn Driver, selected: bool) -> HandlerResult {
    let target = element(args, driver)?;
    if driver.is_selected(&target)? == selected {
        return Ok(None);
    }
    let state = if selected { "selected" } else { "not selected" };
    Err(Failure::assertion(format!(
        "'{}' is expected to be {state}.",
        arg_or_blank(args)
    )))
}

pub fn expect_radio_selected(args: &Args, driver: &mut dyn Driver) -> HandlerResult {
    expect_radio(args, driver, true)
}

pub fn expect_radio_not_selected(args: &Args, driver: &mut dyn Driver) -> HandlerResult {
    expect_radio(args, driver, false)
}

fn expect_radio(args: &Args, driver: &mut dyn Driver, selected: bool) -> HandlerResult {
    let value = arg(args, "value")?;
    let radio = driver.find_element(&Locator::radio(value))?;
    if driver.is_selected(&radio)? == selected {
        return Ok(None);
    }
    let state = if selected { "selected" } else { "not selected" };
    Err(Failure::assertion(format!(
        "Radio '{value}' is expected to be {state}."
    )))
}

/// Passes if the select named by `elem` has an option with this value.
pub fn expect_option_present(args: &Args, driver: &mut dyn Driver) -> HandlerResult {
    let value = arg(args, "value")?;
    let select = element(args, driver)?;
    if driver.options(&select)?.iter().any(|option| option.value == value) {
        Ok(None)
    } else {
        Err(missing_option(args, value))
    }
}

pub fn expect_option_selected(args: &Args, driver: &mut dyn Driver) -> HandlerResult {
    let value = arg(args, "value")?;
    let select = element(args, driver)?;
    let options = driver.options(&select)?;
    let option = options
        .iter()
        .find(|option| option.value == value)
        .ok_or_else(|| missing_option(args, value))?;
    if option.selected {
        Ok(None)
    } else {
        Err(Failure::assertion(format!("Option '{value}' is not selected.")))
    }
}

/// Exactly the listed options (by value or text) are selected.
pub fn expect_options_selected(args: &Args, driver: &mut dyn Driver) -> HandlerResult {
    let wanted = list_arg(args)?;
    let select = element(args, driver)?;
    for option in driver.options(&select)? {
        let listed = wanted
            .iter()
            .any(|item| option.value == *item || option.text == *item);
        if listed && !option.selected {
            return Err(Failure::assertion(format!(
                "Option '{}' was not selected.",
                option.value
            )));
        }
        if !listed && option.selected {
            return Err(Failure::assertion(format!(
                "Option '{}' was selected.",
                option.value
            )));
        }
    }
    Ok(None)
}

pub fn expect_link(args: &Args, driver: &mut dyn Driver) -> HandlerResult {
    driver.find_element(&Locator::link_to(arg(args, "url")?))?;
    Ok(None)
}

pub fn expect_link_with_text(args: &Args, driver: &mut dyn Driver) -> HandlerResult {
    let url = arg(args, "url")?;
    let expected = arg(args, "text")?;
    let link = driver.find_element(&Locator::link_to(url))?;
    let text = driver.text(&link)?;
    if text.contains(expected) {
        Ok(None)
    } else {
        Err(Failure::assertion(format!(
            "Link to '{url}' reads '{text}', expected it to contain '{expected}'."
        )))
    }
}

pub fn expect_alert_text(args: &Args, driver: &mut dyn Driver) -> HandlerResult {
    let expected = arg(args, "text")?;
    let text = driver.alert_text()?;
    if text == expected {
        Ok(None)
    } else {
        Err(Failure::assertion(format!(
            "Alert text was '{text}', expected '{expected}'."
        )))
    }
}

pub fn expect_no_alert(_args: &Args, driver: &mut dyn Driver) -> HandlerResult {
    match driver.alert_text() {
        Err(Failure::NoAlertPresent) => Ok(None),
        Ok(text) => Err(Failure::assertion(format!("Alert '{text}' is displayed."))),
        Err(failure) => Err(failure),
    }
}

/// Comma-separated `list` capture, each item trimmed and unquoted.
///
/// Quotes are trimmed per side: the dispatcher has already removed the outer
/// pair of a list like `"a", "b"`.
fn list_arg(args: &Args) -> Result<Vec<&str>, Failure> {
    Ok(arg(args, "list")?
        .split(',')
        .map(|item| item.trim().trim_matches(|c: char| c == '"' || c == '\''))
        .collect())
}

/// Match by value first, then by visible text.
fn find_option<'o>(options: &'o [SelectOption], item: &str) -> Option<&'o SelectOption> {
    options
        .iter()
        .find(|option| option.value == item)
        .or_else(|| options.iter().find(|option| option.text == item))
}

fn missing_option(args: &Args, value: &str) -> Failure {
    Failure::element_not_found(format!("option '{value}' in {}", arg_or_blank(args)))
}

fn arg_or_blank(args: &Args) -> &str {
    args.get("elem").map(String::as_str).unwrap_or_default()
}
