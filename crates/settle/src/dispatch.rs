//! ActionDispatcher: fire one input action, never wait for its effect.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::driver::{Point, UiDriver};
use crate::query::StateQuery;
use crate::result::{SettleError, SettleResult};
use crate::selector::Selector;

/// A single input action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Move the pointer through each point in order
    PointerPath(Vec<Point>),
    /// Click the first element the selector resolves to
    Click(Selector),
    /// Type literal text at the current focus
    TypeText(String),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PointerPath(points) => write!(f, "pointer path of {} point(s)", points.len()),
            Self::Click(selector) => write!(f, "click {selector}"),
            Self::TypeText(text) => write!(f, "type {text:?}"),
        }
    }
}

/// Dispatches actions through a driver
#[derive(Debug)]
pub struct ActionDispatcher<'a, D: ?Sized> {
    driver: &'a D,
}

impl<'a, D: UiDriver + ?Sized> ActionDispatcher<'a, D> {
    /// Create a dispatcher over `driver`
    #[must_use]
    pub const fn new(driver: &'a D) -> Self {
        Self { driver }
    }

    /// Issue `action`. Returns as soon as the driver accepted the input.
    pub async fn dispatch(&self, action: &Action) -> SettleResult<()> {
        debug!(action = %action, "dispatch");
        match action {
            Action::PointerPath(points) => {
                if points.is_empty() {
                    return Err(SettleError::InputError {
                        message: "pointer path has no points".to_string(),
                    });
                }
                self.driver.dispatch_pointer(points).await
            }
            Action::Click(selector) => {
                let found = StateQuery::new(self.driver).resolve(selector).await?;
                let target = found.first().ok_or_else(|| SettleError::ElementNotFound {
                    selector: selector.to_string(),
                })?;
                self.driver.dispatch_click(target).await
            }
            Action::TypeText(text) => self.driver.dispatch_keyboard_text(text).await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::mock::{El, MockUi};
    use std::time::Duration;

    fn ui() -> MockUi {
        MockUi::new(El::new("body").children([
            El::new("button").class("first").text("One"),
            El::new("button").class("second").text("Two"),
        ]))
    }

    #[tokio::test]
    async fn test_empty_pointer_path_is_input_error() {
        let ui = ui();
        let err = ActionDispatcher::new(&ui)
            .dispatch(&Action::PointerPath(vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, SettleError::InputError { .. }));
        assert!(ui.history().is_empty());
    }

    #[tokio::test]
    async fn test_click_targets_first_match() {
        let ui = ui();
        ActionDispatcher::new(&ui)
            .dispatch(&Action::Click(Selector::css("button")))
            .await
            .unwrap();
        let first = ui.resolve_selector(&Selector::css(".first")).await.unwrap();
        assert_eq!(ui.history(), vec![format!("click:{}", first[0].handle)]);
    }

    #[tokio::test]
    async fn test_click_without_match_fails_immediately() {
        let ui = ui();
        let err = ActionDispatcher::new(&ui)
            .dispatch(&Action::Click(Selector::css(".missing")))
            .await
            .unwrap_err();
        match err {
            SettleError::ElementNotFound { selector } => assert_eq!(selector, "css(.missing)"),
            other => panic!("unexpected error {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_returns_before_effect() {
        let ui = ui();
        ui.on_click(".first", Duration::from_millis(50), |doc, _| {
            let root = doc.root();
            doc.append(root, El::new("div").class("done"));
        })
        .unwrap();
        ActionDispatcher::new(&ui)
            .dispatch(&Action::Click(Selector::css(".first")))
            .await
            .unwrap();
        assert!(ui.resolve_selector(&Selector::css(".done")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_type_and_pointer_reach_driver() {
        let ui = ui();
        let dispatcher = ActionDispatcher::new(&ui);
        dispatcher
            .dispatch(&Action::PointerPath(vec![Point::new(0.0, 0.0), Point::new(10.0, 10.0)]))
            .await
            .unwrap();
        dispatcher
            .dispatch(&Action::TypeText("Hello world!".into()))
            .await
            .unwrap();
        assert_eq!(
            ui.history(),
            vec!["pointer:(0,0)->(10,10)".to_string(), "type:Hello world!".to_string()]
        );
    }

    #[test]
    fn test_action_display() {
        assert_eq!(Action::Click(Selector::css("p")).to_string(), "click css(p)");
        assert_eq!(Action::TypeText("hi".into()).to_string(), "type \"hi\"");
    }
}
