//! UiDriver - the seam between the harness and a live UI.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  UiDriver (async trait)                                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────────┐        ┌──────────────────────┐    │
//! │  │  ChromiumDriver      │        │  MockUi              │    │
//! │  │  (feature "browser") │        │  (in-memory tree)    │    │
//! │  │  CDP via chromiumoxide│       │  delayed reactions   │    │
//! │  └──────────────────────┘        └──────────────────────┘    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Drivers report a torn-down session as [`SettleError::SurfaceUnavailable`]
//! and an empty result as an empty `Vec`, never the other way round.
//!
//! [`SettleError::SurfaceUnavailable`]: crate::result::SettleError::SurfaceUnavailable

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::result::SettleResult;
use crate::selector::Selector;

/// A point in viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Point {
    /// Create a new point
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Bounding box for an element
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// X position
    pub x: f64,
    /// Y position
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl BoundingBox {
    /// Create a new bounding box
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// One element as observed at a single instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    /// Position within the match, in document order
    pub index: usize,
    /// Opaque driver handle
    pub handle: String,
    /// Lower-case tag name
    pub tag: String,
    /// Raw text content
    pub text: String,
    /// Attributes
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Disabled via `disabled` or `aria-disabled="true"`
    #[serde(default)]
    pub disabled: bool,
    /// Layout box, `None` when not rendered
    #[serde(default)]
    pub bounds: Option<BoundingBox>,
}

impl ElementSnapshot {
    /// Attribute value, if present
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Whether the element has layout
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.bounds.is_some()
    }
}

/// Abstract UI driver.
///
/// Every method is a single round trip to the UI. None of them wait for the
/// UI to react.
#[async_trait]
pub trait UiDriver: Send + Sync {
    /// Resolve a selector against the current UI state
    async fn resolve_selector(&self, selector: &Selector) -> SettleResult<Vec<ElementSnapshot>>;

    /// Move the pointer through each point in order
    async fn dispatch_pointer(&self, points: &[Point]) -> SettleResult<()>;

    /// Click a previously resolved element
    async fn dispatch_click(&self, target: &ElementSnapshot) -> SettleResult<()>;

    /// Type literal text at the current focus
    async fn dispatch_keyboard_text(&self, text: &str) -> SettleResult<()>;

    /// Read the current text content of a previously resolved element
    async fn read_text(&self, target: &ElementSnapshot) -> SettleResult<String>;
}
