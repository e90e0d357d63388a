//! StateQuery: the shared read path of the waiter and the assertion reporter.
//!
//! Every call produces a fresh [`Match`]. Nothing is cached between calls.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::driver::{ElementSnapshot, UiDriver};
use crate::result::SettleResult;
use crate::selector::Selector;

/// Result of resolving a selector at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// Selector that produced this match
    pub selector: Selector,
    /// Matched elements in document order
    pub elements: Vec<ElementSnapshot>,
}

impl Match {
    /// Create a match
    #[must_use]
    pub const fn new(selector: Selector, elements: Vec<ElementSnapshot>) -> Self {
        Self { selector, elements }
    }

    /// A match with no elements
    #[must_use]
    pub const fn empty(selector: Selector) -> Self {
        Self::new(selector, Vec::new())
    }

    /// Number of matched elements
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether nothing matched
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// First matched element
    #[must_use]
    pub fn first(&self) -> Option<&ElementSnapshot> {
        self.elements.first()
    }

    /// Iterate over matched elements
    pub fn iter(&self) -> std::slice::Iter<'_, ElementSnapshot> {
        self.elements.iter()
    }

    /// Text content of every element
    #[must_use]
    pub fn texts(&self) -> Vec<&str> {
        self.elements.iter().map(|e| e.text.as_str()).collect()
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noun = if self.len() == 1 { "match" } else { "matches" };
        write!(f, "{} {noun} for {}", self.len(), self.selector)?;
        if let Some(first) = self.first() {
            write!(f, ", first <{}> {:?}", first.tag, first.text)?;
        }
        Ok(())
    }
}

/// Derived value read from a match
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Property {
    /// Text content
    #[default]
    Text,
    /// Attribute value (empty string when absent)
    Attribute(String),
}

impl Property {
    /// Read this property from a snapshot
    #[must_use]
    pub fn extract(&self, element: &ElementSnapshot) -> String {
        match self {
            Self::Text => element.text.clone(),
            Self::Attribute(name) => element.attribute(name).unwrap_or_default().to_string(),
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Attribute(name) => write!(f, "attribute {name}"),
        }
    }
}

/// Read-only queries against a driver
#[derive(Debug)]
pub struct StateQuery<'a, D: ?Sized> {
    driver: &'a D,
}

impl<'a, D: UiDriver + ?Sized> StateQuery<'a, D> {
    /// Create a query over `driver`
    #[must_use]
    pub const fn new(driver: &'a D) -> Self {
        Self { driver }
    }

    /// Resolve `selector` against the current UI state
    pub async fn resolve(&self, selector: &Selector) -> SettleResult<Match> {
        selector.validate()?;
        let elements = self.driver.resolve_selector(selector).await?;
        debug!(selector = %selector, count = elements.len(), "resolved");
        Ok(Match::new(selector.clone(), elements))
    }

    /// Number of elements `selector` currently resolves to
    pub async fn count(&self, selector: &Selector) -> SettleResult<usize> {
        Ok(self.resolve(selector).await?.len())
    }

    /// Live text of an element through the driver
    pub async fn read_text(&self, element: &ElementSnapshot) -> SettleResult<String> {
        self.driver.read_text(element).await
    }

    /// Derived value of the first match; `None` when nothing matches
    pub async fn derive(
        &self,
        selector: &Selector,
        property: &Property,
    ) -> SettleResult<Option<String>> {
        let found = self.resolve(selector).await?;
        self.derive_first(&found, property).await
    }

    /// Derived value of the first element of an existing match.
    ///
    /// Text always comes from the driver's live read, never from the
    /// snapshot, so every caller sees the same value.
    pub async fn derive_first(
        &self,
        found: &Match,
        property: &Property,
    ) -> SettleResult<Option<String>> {
        let Some(first) = found.first() else {
            return Ok(None);
        };
        match property {
            Property::Text => self.read_text(first).await.map(Some),
            Property::Attribute(_) => Ok(Some(property.extract(first))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::mock::{El, MockUi};

    fn ui() -> MockUi {
        MockUi::new(
            El::new("div").class("editor").children([
                El::new("p").class("block").text("Hello world!"),
                El::new("p").class("block").attr("data-align", "wide").text("Second"),
            ]),
        )
    }

    #[tokio::test]
    async fn test_resolve_returns_document_order() {
        let ui = ui();
        let query = StateQuery::new(&ui);
        let found = query.resolve(&Selector::css(".block")).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found.texts(), vec!["Hello world!", "Second"]);
        assert_eq!(found.elements[1].index, 1);
    }

    #[tokio::test]
    async fn test_empty_match_is_not_an_error() {
        let ui = ui();
        let query = StateQuery::new(&ui);
        assert_eq!(query.count(&Selector::css("textarea")).await.unwrap(), 0);
        assert_eq!(
            query
                .derive(&Selector::css("textarea"), &Property::Text)
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_derive_attribute_and_text() {
        let ui = ui();
        let query = StateQuery::new(&ui);
        let sel = Selector::css("[data-align]");
        assert_eq!(
            query
                .derive(&sel, &Property::Attribute("data-align".into()))
                .await
                .unwrap()
                .as_deref(),
            Some("wide")
        );
        assert_eq!(
            query.derive(&sel, &Property::Text).await.unwrap().as_deref(),
            Some("Second")
        );
    }

    #[tokio::test]
    async fn test_closed_surface_is_distinct_from_empty() {
        let ui = ui();
        ui.close();
        let err = StateQuery::new(&ui)
            .resolve(&Selector::css("textarea"))
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_invalid_selector_rejected_before_driver() {
        let ui = ui();
        let err = StateQuery::new(&ui)
            .resolve(&Selector::css(""))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::result::SettleError::InvalidSelector { .. }
        ));
        assert!(ui.history().is_empty());
    }

    #[test]
    fn test_match_display() {
        let m = Match::empty(Selector::css("p"));
        assert_eq!(m.to_string(), "0 matches for css(p)");
    }
}
