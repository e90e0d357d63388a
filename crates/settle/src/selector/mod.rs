//! Selectors: lookup keys into UI state.
//!
//! A selector never owns UI state. It is re-evaluated against the live UI on
//! every query, so the same value can be resolved many times while the UI
//! settles.
//!
//! Two families are supported:
//!
//! - **Structural**: CSS selectors and XPath expressions
//! - **Text**: match elements by visible text, optionally scoped to a CSS
//!   selector (`text("Edit as HTML" in button)`)

pub mod css;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::result::{SettleError, SettleResult};

/// How a text selector compares visible text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMatch {
    /// Trimmed text equals the literal
    #[default]
    Exact,
    /// Trimmed text contains the literal
    Contains,
    /// Trimmed text matches the literal as a regular expression
    Regex,
}

/// Text predicate selector
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextQuery {
    /// CSS selector restricting the candidate elements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub within: Option<String>,
    /// Literal (or pattern) to match
    pub text: String,
    /// Comparison mode
    #[serde(default)]
    pub matching: TextMatch,
}

impl TextQuery {
    /// Compile the comparison once for a whole resolution pass
    pub fn matcher(&self) -> SettleResult<TextMatcher> {
        Ok(match self.matching {
            TextMatch::Exact => TextMatcher::Exact(self.text.clone()),
            TextMatch::Contains => TextMatcher::Contains(self.text.clone()),
            TextMatch::Regex => TextMatcher::Regex(Regex::new(&self.text).map_err(|e| {
                SettleError::invalid_selector(self.text.clone(), e.to_string())
            })?),
        })
    }
}

/// Compiled text comparison
#[derive(Debug, Clone)]
pub enum TextMatcher {
    /// Exact comparison
    Exact(String),
    /// Substring comparison
    Contains(String),
    /// Regex comparison
    Regex(Regex),
}

impl TextMatcher {
    /// Compare a candidate's visible text (leading/trailing whitespace ignored)
    #[must_use]
    pub fn is_match(&self, candidate: &str) -> bool {
        let candidate = candidate.trim();
        match self {
            Self::Exact(text) => candidate == text,
            Self::Contains(text) => candidate.contains(text.as_str()),
            Self::Regex(re) => re.is_match(candidate),
        }
    }
}

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
    /// CSS selector (e.g. `.block-editor-block-list__block.rich-text`)
    Css(String),
    /// XPath expression
    #[serde(rename = "xpath")]
    XPath(String),
    /// Visible text predicate
    Text(TextQuery),
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create an XPath selector
    #[must_use]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    /// Elements whose visible text equals `text`
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextQuery {
            within: None,
            text: text.into(),
            matching: TextMatch::Exact,
        })
    }

    /// Elements whose visible text contains `text`
    #[must_use]
    pub fn text_contains(text: impl Into<String>) -> Self {
        Self::Text(TextQuery {
            within: None,
            text: text.into(),
            matching: TextMatch::Contains,
        })
    }

    /// Elements matching `scope` whose visible text equals `text`
    ///
    /// `Selector::text_within("button", "Edit as HTML")`
    #[must_use]
    pub fn text_within(scope: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Text(TextQuery {
            within: Some(scope.into()),
            text: text.into(),
            matching: TextMatch::Exact,
        })
    }

    /// Elements whose visible text matches a regular expression
    #[must_use]
    pub fn text_regex(pattern: impl Into<String>) -> Self {
        Self::Text(TextQuery {
            within: None,
            text: pattern.into(),
            matching: TextMatch::Regex,
        })
    }

    /// Restrict a text selector to elements matching `scope`.
    ///
    /// Structural selectors are returned unchanged.
    #[must_use]
    pub fn within(self, scope: impl Into<String>) -> Self {
        match self {
            Self::Text(mut query) => {
                query.within = Some(scope.into());
                Self::Text(query)
            }
            other => other,
        }
    }

    /// Reject selectors no driver could ever resolve
    pub fn validate(&self) -> SettleResult<()> {
        match self {
            Self::Css(s) | Self::XPath(s) if s.trim().is_empty() => {
                Err(SettleError::invalid_selector(s.clone(), "selector is empty"))
            }
            Self::Css(_) | Self::XPath(_) => Ok(()),
            Self::Text(query) => {
                if query.text.is_empty() {
                    return Err(SettleError::invalid_selector(
                        self.to_string(),
                        "text literal is empty",
                    ));
                }
                if query.within.as_deref().is_some_and(|w| w.trim().is_empty()) {
                    return Err(SettleError::invalid_selector(
                        self.to_string(),
                        "scope selector is empty",
                    ));
                }
                query.matcher().map(|_| ())
            }
        }
    }

    /// JavaScript function body returning the matched elements in document order
    fn collect_js(&self) -> String {
        match self {
            Self::Css(s) => format!("return Array.from(document.querySelectorAll({}));", js_str(s)),
            Self::XPath(s) => format!(
                "const r = document.evaluate({}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); \
                 const out = []; \
                 for (let i = 0; i < r.snapshotLength; i++) {{ const n = r.snapshotItem(i); if (n instanceof Element) out.push(n); }} \
                 return out;",
                js_str(s)
            ),
            Self::Text(query) => {
                let literal = js_str(&query.text);
                let test = match query.matching {
                    TextMatch::Exact => format!("t => t === {literal}"),
                    TextMatch::Contains => format!("t => t.includes({literal})"),
                    TextMatch::Regex => format!("t => new RegExp({literal}).test(t)"),
                };
                let scope = query
                    .within
                    .as_deref()
                    .map_or_else(|| "null".to_string(), js_str);
                format!(
                    "const test = {test}; const scope = {scope}; \
                     const hits = Array.from(document.querySelectorAll(scope ?? '*')).filter(el => test((el.textContent ?? '').trim())); \
                     return scope ? hits : hits.filter(el => !hits.some(o => o !== el && el.contains(o)));"
                )
            }
        }
    }

    /// JavaScript expression resolving this selector into element snapshots.
    ///
    /// Handles come from a page-global registry, so the same element keeps its
    /// handle across resolutions.
    #[must_use]
    pub fn to_resolver_script(&self) -> String {
        format!(
            "(() => {{ {HANDLE_REGISTRY_JS} {TEXT_OF_JS} const collect = () => {{ {} }}; \
             return collect().map((el, index) => {{ \
               const rect = el.getBoundingClientRect(); \
               const shown = rect.width > 0 || rect.height > 0; \
               return {{ \
                 index, handle: handleOf(el), tag: el.tagName.toLowerCase(), \
                 text: textOf(el), \
                 attributes: Object.fromEntries(Array.from(el.attributes, a => [a.name, a.value])), \
                 disabled: el.disabled === true || el.getAttribute('aria-disabled') === 'true', \
                 bounds: shown ? {{ x: rect.x, y: rect.y, width: rect.width, height: rect.height }} : null \
               }}; \
             }}); }})()",
            self.collect_js()
        )
    }
}

/// `textOf(el)`: the text an element shows. Form controls report `value`,
/// which diverges from `textContent` once edited.
pub const TEXT_OF_JS: &str = "const textOf = el => el instanceof HTMLTextAreaElement || el instanceof HTMLInputElement \
     ? el.value : (el.textContent ?? '');";

/// Page-global element registry: `handleOf(el)` returns a stable string id,
/// `window.__settle.refs` maps ids back to weakly held elements.
pub const HANDLE_REGISTRY_JS: &str = "const reg = (window.__settle ??= { next: 0, ids: new WeakMap(), refs: new Map() }); \
     const handleOf = el => { let id = reg.ids.get(el); \
       if (id === undefined) { id = String(reg.next++); reg.ids.set(el, id); reg.refs.set(id, new WeakRef(el)); } \
       return id; };";

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(s) => write!(f, "css({s})"),
            Self::XPath(s) => write!(f, "xpath({s})"),
            Self::Text(query) => {
                let op = match query.matching {
                    TextMatch::Exact => "text",
                    TextMatch::Contains => "text~",
                    TextMatch::Regex => "text/re",
                };
                match &query.within {
                    Some(scope) => write!(f, "{op}({:?} in {scope})", query.text),
                    None => write!(f, "{op}({:?})", query.text),
                }
            }
        }
    }
}

/// Encode a string as a JavaScript string literal
fn js_str(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}
