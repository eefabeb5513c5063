//! Browser driver abstraction.
//!
//! The [`Driver`] trait decouples directive handlers from the actual browser
//! backend. Each task execution launches its own session through a
//! [`DriverFactory`] and the [`DriverSession`] guard closes it when the task
//! ends, including on early exit.

pub mod memory;

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, warn};

use crate::error::Failure;

/// How an element is located.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Locator {
    Css(String),
    Id(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    /// Parse a directive argument: `id=...`, `xpath=...`, otherwise CSS.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(id) = raw.strip_prefix("id=") {
            Locator::Id(id.to_string())
        } else if let Some(path) = raw.strip_prefix("xpath=") {
            Locator::XPath(path.to_string())
        } else {
            Locator::css(raw)
        }
    }

    /// Radio input carrying `value`.
    pub fn radio(value: &str) -> Self {
        Locator::Css(format!(r#"input[type="radio"][value="{value}"]"#))
    }

    /// Anchor whose `href` is exactly `url`.
    pub fn link_to(url: &str) -> Self {
        Locator::XPath(format!(r#"//a[@href="{url}"]"#))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(value) => f.write_str(value),
            Locator::Id(value) => write!(f, "id={value}"),
            Locator::XPath(value) => write!(f, "xpath={value}"),
        }
    }
}

/// Opaque handle to an element returned by [`Driver::find_element`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(pub String);

/// One `<option>` of a select element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    /// Visible text.
    pub text: String,
    pub selected: bool,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            text: text.into(),
            selected: false,
        }
    }

    pub fn selected(mut self) -> Self {
        self.selected = true;
        self
    }
}

/// Browser control used by directive handlers.
///
/// Failures use the driver kinds of [`Failure`]: `ElementNotFound`,
/// `StaleElement`, `NoSuchWindow`, `NoAlertPresent` or `Driver`.
pub trait Driver {
    fn navigate(&mut self, url: &str) -> Result<(), Failure>;
    fn current_url(&self) -> Result<String, Failure>;
    fn title(&self) -> Result<String, Failure>;

    fn find_element(&self, locator: &Locator) -> Result<ElementRef, Failure>;
    fn click(&mut self, element: &ElementRef) -> Result<(), Failure>;
    fn send_keys(&mut self, element: &ElementRef, keys: &str) -> Result<(), Failure>;
    fn text(&self, element: &ElementRef) -> Result<String, Failure>;
    fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>, Failure>;
    fn is_selected(&self, element: &ElementRef) -> Result<bool, Failure>;
    fn is_displayed(&self, element: &ElementRef) -> Result<bool, Failure>;

    /// Options of a select element, in document order.
    fn options(&self, select: &ElementRef) -> Result<Vec<SelectOption>, Failure>;
    /// Select or deselect the option whose value is `value`.
    ///
    /// Selecting in a single-choice select deselects the others. A missing
    /// option is `ElementNotFound`.
    fn set_option(
        &mut self,
        select: &ElementRef,
        value: &str,
        selected: bool,
    ) -> Result<(), Failure>;

    /// True if a displayed element's text contains `content`.
    fn contains_content(&self, content: &str) -> Result<bool, Failure>;

    fn alert_text(&self) -> Result<String, Failure>;
    fn accept_alert(&mut self) -> Result<(), Failure>;
    fn dismiss_alert(&mut self) -> Result<(), Failure>;

    fn close(&mut self) -> Result<(), Failure>;
}

/// Launches fresh driver sessions for one environment.
pub trait DriverFactory {
    fn launch(&self) -> Result<Box<dyn Driver>, Failure>;
}

/// Environment name to driver factory.
#[derive(Default)]
pub struct DriverRegistry {
    factories: BTreeMap<String, Box<dyn DriverFactory>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `environment` (case-insensitive).
    pub fn register<F: DriverFactory + 'static>(&mut self, environment: &str, factory: F) {
        self.factories
            .insert(environment.to_lowercase(), Box::new(factory));
    }

    pub fn contains(&self, environment: &str) -> bool {
        self.factories.contains_key(&environment.to_lowercase())
    }

    pub fn environments(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Start a new session for `environment`.
    pub fn launch(&self, environment: &str) -> Result<DriverSession, Failure> {
        let factory = self
            .factories
            .get(&environment.to_lowercase())
            .ok_or_else(|| Failure::UnknownEnvironment {
                environment: environment.to_string(),
            })?;
        let driver = factory.launch()?;
        debug!(environment, "driver session started");
        Ok(DriverSession {
            environment: environment.to_string(),
            driver,
        })
    }
}

/// A live driver session, closed on drop.
pub struct DriverSession {
    environment: String,
    driver: Box<dyn Driver>,
}

impl DriverSession {
    pub fn driver(&mut self) -> &mut dyn Driver {
        self.driver.as_mut()
    }
}

impl Drop for DriverSession {
    fn drop(&mut self) {
        match self.driver.close() {
            Ok(()) => debug!(environment = %self.environment, "driver session closed"),
            Err(err) => {
                warn!(environment = %self.environment, error = %err, "failed to close driver session");
            }
        }
    }
}
