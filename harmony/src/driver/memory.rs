//! In-memory driver over a scripted set of pages.
//!
//! Used as the built-in `memory` environment (dry runs) and as the driver in
//! tests. Pages are keyed by URL; navigating to an unknown URL yields an
//! empty page.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::driver::{Driver, DriverFactory, ElementRef, Locator, SelectOption};
use crate::error::Failure;

/// Environment name the CLI registers [`MemoryDriverFactory`] under.
pub const ENVIRONMENT: &str = "memory";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub text: String,
    pub value: String,
    pub displayed: bool,
    pub checkable: bool,
    pub selected: bool,
    pub attributes: BTreeMap<String, String>,
    /// Options, for select elements.
    pub options: Vec<SelectOption>,
    /// Select element allowing several selected options.
    pub multiple: bool,
}

impl Element {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            value: String::new(),
            displayed: true,
            checkable: false,
            selected: false,
            attributes: BTreeMap::new(),
            options: Vec::new(),
            multiple: false,
        }
    }

    /// A link: clicking it navigates to `href`.
    pub fn link(text: impl Into<String>, href: impl Into<String>) -> Self {
        Self::new(text).with_attribute("href", href)
    }

    pub fn checkbox(selected: bool) -> Self {
        Self {
            checkable: true,
            selected,
            ..Self::new("")
        }
    }

    /// A radio input in group `name`.
    pub fn radio(name: impl Into<String>, value: impl Into<String>, selected: bool) -> Self {
        Self {
            selected,
            ..Self::new("")
                .with_attribute("type", "radio")
                .with_attribute("name", name)
                .with_value(value)
        }
    }

    /// A single-choice select.
    pub fn select(options: Vec<SelectOption>) -> Self {
        Self {
            options,
            ..Self::new("")
        }
    }

    pub fn multi_select(options: Vec<SelectOption>) -> Self {
        Self {
            multiple: true,
            ..Self::select(options)
        }
    }

    /// Group name if this is a radio input.
    fn radio_group(&self) -> Option<&str> {
        if self.attributes.get("type").map(String::as_str) != Some("radio") {
            return None;
        }
        Some(self.attributes.get("name").map(String::as_str).unwrap_or_default())
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub title: String,
    /// Elements keyed by CSS selector (`#id` for id lookups).
    pub elements: BTreeMap<String, Element>,
    pub alert: Option<String>,
}

impl Page {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_element(mut self, selector: impl Into<String>, element: Element) -> Self {
        self.elements.insert(selector.into(), element);
        self
    }

    /// Radio input reachable through [`Locator::radio`].
    pub fn with_radio(self, name: &str, value: &str, selected: bool) -> Self {
        self.with_element(key(&Locator::radio(value)), Element::radio(name, value, selected))
    }

    /// Link reachable through [`Locator::link_to`].
    pub fn with_link_to(self, url: &str, text: &str) -> Self {
        self.with_element(key(&Locator::link_to(url)), Element::link(text, url))
    }

    pub fn with_alert(mut self, text: impl Into<String>) -> Self {
        self.alert = Some(text.into());
        self
    }
}

/// Element key a locator resolves to.
fn key(locator: &Locator) -> String {
    match locator {
        Locator::Css(selector) => selector.clone(),
        Locator::Id(id) => format!("#{id}"),
        Locator::XPath(path) => path.clone(),
    }
}

/// Shared record of driver activity across sessions.
#[derive(Debug, Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDriverFactory {
    site: BTreeMap<String, Page>,
    journal: Journal,
}

impl MemoryDriverFactory {
    pub fn with_page(mut self, url: impl Into<String>, page: Page) -> Self {
        self.site.insert(url.into(), page);
        self
    }

    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }
}

impl DriverFactory for MemoryDriverFactory {
    fn launch(&self) -> Result<Box<dyn Driver>, Failure> {
        self.journal.record("launch");
        Ok(Box::new(MemoryDriver {
            site: self.site.clone(),
            url: String::new(),
            page: Page::default(),
            journal: self.journal.clone(),
            closed: false,
        }))
    }
}

pub struct MemoryDriver {
    site: BTreeMap<String, Page>,
    url: String,
    page: Page,
    journal: Journal,
    closed: bool,
}

impl MemoryDriver {
    fn ensure_open(&self) -> Result<(), Failure> {
        if self.closed {
            return Err(Failure::NoSuchWindow {
                message: "session closed".to_string(),
            });
        }
        Ok(())
    }

    fn element(&self, element: &ElementRef) -> Result<&Element, Failure> {
        self.ensure_open()?;
        self.page
            .elements
            .get(&element.0)
            .ok_or_else(|| Failure::StaleElement {
                message: format!("'{}' is no longer attached to the page", element.0),
            })
    }

    /// Select the radio at `chosen` and clear the rest of its group.
    fn choose_radio(&mut self, chosen: &str, group: &str) {
        for (key, element) in self.page.elements.iter_mut() {
            if element.radio_group() == Some(group) {
                element.selected = key == chosen;
            }
        }
    }

    fn element_mut(&mut self, element: &ElementRef) -> Result<&mut Element, Failure> {
        self.ensure_open()?;
        self.page
            .elements
            .get_mut(&element.0)
            .ok_or_else(|| Failure::StaleElement {
                message: format!("'{}' is no longer attached to the page", element.0),
            })
    }
}

impl Driver for MemoryDriver {
    fn navigate(&mut self, url: &str) -> Result<(), Failure> {
        self.ensure_open()?;
        self.journal.record(format!("navigate {url}"));
        self.page = self.site.get(url).cloned().unwrap_or_default();
        self.url = url.to_string();
        Ok(())
    }

    fn current_url(&self) -> Result<String, Failure> {
        self.ensure_open()?;
        Ok(self.url.clone())
    }

    fn title(&self) -> Result<String, Failure> {
        self.ensure_open()?;
        Ok(self.page.title.clone())
    }

    fn find_element(&self, locator: &Locator) -> Result<ElementRef, Failure> {
        self.ensure_open()?;
        let key = key(locator);
        if self.page.elements.contains_key(&key) {
            Ok(ElementRef(key))
        } else {
            Err(Failure::element_not_found(locator.to_string()))
        }
    }

    fn click(&mut self, element: &ElementRef) -> Result<(), Failure> {
        self.journal.record(format!("click {}", element.0));
        let target = self.element_mut(element)?;
        if let Some(href) = target.attributes.get("href").cloned() {
            return self.navigate(&href);
        }
        if target.checkable {
            target.selected = !target.selected;
        }
        if let Some(group) = target.radio_group().map(str::to_string) {
            self.choose_radio(&element.0, &group);
        }
        Ok(())
    }

    fn send_keys(&mut self, element: &ElementRef, keys: &str) -> Result<(), Failure> {
        self.journal.record(format!("type {} {keys}", element.0));
        self.element_mut(element)?.value.push_str(keys);
        Ok(())
    }

    fn text(&self, element: &ElementRef) -> Result<String, Failure> {
        Ok(self.element(element)?.text.clone())
    }

    fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>, Failure> {
        let target = self.element(element)?;
        if name == "value" {
            return Ok(Some(target.value.clone()));
        }
        Ok(target.attributes.get(name).cloned())
    }

    fn is_selected(&self, element: &ElementRef) -> Result<bool, Failure> {
        Ok(self.element(element)?.selected)
    }

    fn is_displayed(&self, element: &ElementRef) -> Result<bool, Failure> {
        Ok(self.element(element)?.displayed)
    }

    fn options(&self, select: &ElementRef) -> Result<Vec<SelectOption>, Failure> {
        Ok(self.element(select)?.options.clone())
    }

    fn set_option(
        &mut self,
        select: &ElementRef,
        value: &str,
        selected: bool,
    ) -> Result<(), Failure> {
        if selected {
            self.journal.record(format!("select {} {value}", select.0));
        }
        let target = self.element_mut(select)?;
        let index = target
            .options
            .iter()
            .position(|option| option.value == value)
            .ok_or_else(|| {
                Failure::element_not_found(format!("{} > option[value='{value}']", select.0))
            })?;
        if selected && !target.multiple {
            for option in &mut target.options {
                option.selected = false;
            }
        }
        target.options[index].selected = selected;
        Ok(())
    }

    fn contains_content(&self, content: &str) -> Result<bool, Failure> {
        self.ensure_open()?;
        Ok(self
            .page
            .elements
            .values()
            .any(|element| element.displayed && element.text.contains(content)))
    }

    fn alert_text(&self) -> Result<String, Failure> {
        self.ensure_open()?;
        self.page.alert.clone().ok_or(Failure::NoAlertPresent)
    }

    fn accept_alert(&mut self) -> Result<(), Failure> {
        self.ensure_open()?;
        self.page.alert.take().map(|_| ()).ok_or(Failure::NoAlertPresent)
    }

    fn dismiss_alert(&mut self) -> Result<(), Failure> {
        self.accept_alert()
    }

    fn close(&mut self) -> Result<(), Failure> {
        if !self.closed {
            self.closed = true;
            self.journal.record("close");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver() -> Box<dyn Driver> {
        MemoryDriverFactory::default()
            .with_page(
                "http://example.com",
                Page::new("Example")
                    .with_element("#title", Element::new("Welcome home"))
                    .with_element("#hidden", Element::new("secret").hidden())
                    .with_element("#agree", Element::checkbox(false))
                    .with_element("#next", Element::link("Next", "http://example.com/next")),
            )
            .with_page("http://example.com/next", Page::new("Next"))
            .launch()
            .expect("launch")
    }

    #[test]
    fn finds_elements_on_current_page() {
        let mut driver = driver();
        driver.navigate("http://example.com").expect("navigate");
        assert_eq!(driver.title().expect("title"), "Example");
        let title = driver.find_element(&Locator::Id("title".to_string())).expect("find");
        assert_eq!(driver.text(&title).expect("text"), "Welcome home");
        let err = driver
            .find_element(&Locator::css("#missing"))
            .expect_err("missing");
        assert_eq!(err, Failure::element_not_found("#missing"));
    }

    #[test]
    fn click_follows_links_and_toggles_checkboxes() {
        let mut driver = driver();
        driver.navigate("http://example.com").expect("navigate");
        let agree = driver.find_element(&Locator::css("#agree")).expect("find");
        driver.click(&agree).expect("click");
        assert!(driver.is_selected(&agree).expect("selected"));

        let next = driver.find_element(&Locator::css("#next")).expect("find");
        driver.click(&next).expect("click");
        assert_eq!(driver.current_url().expect("url"), "http://example.com/next");
        assert!(matches!(
            driver.text(&agree),
            Err(Failure::StaleElement { .. })
        ));
    }

    #[test]
    fn radios_in_a_group_are_exclusive() {
        let mut driver = MemoryDriverFactory::default()
            .with_page(
                "http://example.com",
                Page::new("Example")
                    .with_radio("color", "red", true)
                    .with_radio("color", "blue", false)
                    .with_radio("size", "small", true),
            )
            .launch()
            .expect("launch");
        driver.navigate("http://example.com").expect("navigate");
        let red = driver.find_element(&Locator::radio("red")).expect("red");
        let blue = driver.find_element(&Locator::radio("blue")).expect("blue");
        let small = driver.find_element(&Locator::radio("small")).expect("small");

        driver.click(&blue).expect("click");
        assert!(driver.is_selected(&blue).expect("selected"));
        assert!(!driver.is_selected(&red).expect("selected"));
        assert!(driver.is_selected(&small).expect("selected"));
    }

    #[test]
    fn single_select_keeps_one_option() {
        let mut driver = MemoryDriverFactory::default()
            .with_page(
                "http://example.com",
                Page::new("Example").with_element(
                    "#size",
                    Element::select(vec![
                        SelectOption::new("s", "Small").selected(),
                        SelectOption::new("m", "Medium"),
                    ]),
                ),
            )
            .launch()
            .expect("launch");
        driver.navigate("http://example.com").expect("navigate");
        let size = driver.find_element(&Locator::css("#size")).expect("find");

        driver.set_option(&size, "m", true).expect("select");
        let selected: Vec<String> = driver
            .options(&size)
            .expect("options")
            .into_iter()
            .filter(|option| option.selected)
            .map(|option| option.value)
            .collect();
        assert_eq!(selected, vec!["m"]);
        assert_eq!(
            driver.set_option(&size, "xl", true),
            Err(Failure::element_not_found("#size > option[value='xl']"))
        );
    }

    #[test]
    fn content_ignores_hidden_elements() {
        let mut driver = driver();
        driver.navigate("http://example.com").expect("navigate");
        assert!(driver.contains_content("Welcome").expect("content"));
        assert!(!driver.contains_content("secret").expect("content"));
    }

    #[test]
    fn closed_session_rejects_calls() {
        let mut driver = driver();
        driver.close().expect("close");
        assert!(matches!(
            driver.navigate("http://example.com"),
            Err(Failure::NoSuchWindow { .. })
        ));
    }
}
