//! In-memory UI for exercising the harness without a browser.
//!
//! [`MockUi`] owns a [`Document`] and a list of reactions. Dispatches only
//! record the input; any reaction it triggers mutates the document later, on
//! a spawned task, after its configured delay. That makes the UI
//! eventually consistent in the same way a real page is.
//!
//! ## Example
//!
//! ```rust,ignore
//! let ui = MockUi::new(El::new("body").child(El::new("button").text("Edit as HTML")));
//! ui.on_click("button", Duration::from_millis(120), |doc, _| {
//!     let root = doc.root();
//!     doc.append(root, El::new("textarea").text("<p>Hello world!</p>"));
//! })?;
//! ```

mod document;

pub use document::{handle_for, node_for, Document, El, NodeId};

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;

use crate::driver::{ElementSnapshot, Point, UiDriver};
use crate::result::{SettleError, SettleResult};
use crate::selector::css::SelectorList;
use crate::selector::Selector;

/// Input that triggered a reaction
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// A click landed on an enabled node
    Click {
        /// Clicked node
        target: NodeId,
    },
    /// The pointer moved along a path
    Pointer {
        /// Path
        points: Vec<Point>,
    },
    /// Text was typed
    Typed {
        /// Literal text
        text: String,
        /// Focused node at the time, if any
        target: Option<NodeId>,
    },
}

type Effect = Arc<dyn Fn(&mut Document, &UiEvent) + Send + Sync>;

enum Trigger {
    Click(SelectorList),
    PointerPath { min_points: usize },
    Typed,
}

impl Trigger {
    fn fires(&self, doc: &Document, event: &UiEvent) -> bool {
        match (self, event) {
            (Self::Click(selector), UiEvent::Click { target }) => {
                doc.query(selector).contains(target)
            }
            (Self::PointerPath { min_points }, UiEvent::Pointer { points }) => {
                points.len() >= *min_points
            }
            (Self::Typed, UiEvent::Typed { .. }) => true,
            _ => false,
        }
    }
}

struct Reaction {
    trigger: Trigger,
    delay: Duration,
    effect: Effect,
}

struct Shared {
    doc: Document,
    reactions: Vec<Arc<Reaction>>,
    history: Vec<String>,
}

/// Asynchronously mutating in-memory UI
#[derive(Clone)]
pub struct MockUi {
    shared: Arc<Mutex<Shared>>,
}

impl fmt::Debug for MockUi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockUi").finish_non_exhaustive()
    }
}

impl MockUi {
    /// Create a UI whose document root is `root`
    #[must_use]
    pub fn new(root: El) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                doc: Document::new(root),
                reactions: Vec::new(),
                history: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> SettleResult<MutexGuard<'_, Shared>> {
        self.shared.lock().map_err(|_| SettleError::Driver {
            message: "in-memory UI state poisoned".to_string(),
        })
    }

    fn open(&self) -> SettleResult<MutexGuard<'_, Shared>> {
        let guard = self.lock()?;
        if guard.doc.is_closed() {
            return Err(SettleError::surface_unavailable("in-memory UI was closed"));
        }
        Ok(guard)
    }

    fn register(&self, trigger: Trigger, delay: Duration, effect: Effect) -> SettleResult<()> {
        self.lock()?.reactions.push(Arc::new(Reaction {
            trigger,
            delay,
            effect,
        }));
        Ok(())
    }

    /// React to clicks on nodes matching `css`
    pub fn on_click<F>(&self, css: &str, delay: Duration, effect: F) -> SettleResult<()>
    where
        F: Fn(&mut Document, &UiEvent) + Send + Sync + 'static,
    {
        let selector = SelectorList::parse(css)?;
        self.register(Trigger::Click(selector), delay, Arc::new(effect))
    }

    /// React to pointer paths of at least `min_points` points
    pub fn on_pointer_path<F>(&self, min_points: usize, delay: Duration, effect: F) -> SettleResult<()>
    where
        F: Fn(&mut Document, &UiEvent) + Send + Sync + 'static,
    {
        self.register(Trigger::PointerPath { min_points }, delay, Arc::new(effect))
    }

    /// React to typed text
    pub fn on_typed<F>(&self, delay: Duration, effect: F) -> SettleResult<()>
    where
        F: Fn(&mut Document, &UiEvent) + Send + Sync + 'static,
    {
        self.register(Trigger::Typed, delay, Arc::new(effect))
    }

    /// Mutate the document directly, outside any reaction
    pub fn update<R>(&self, f: impl FnOnce(&mut Document) -> R) -> SettleResult<R> {
        Ok(f(&mut self.lock()?.doc))
    }

    /// Tear the surface down
    pub fn close(&self) {
        if let Ok(mut shared) = self.lock() {
            shared.doc.close();
        }
    }

    /// Dispatch log, oldest first
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.lock().map(|s| s.history.clone()).unwrap_or_default()
    }

    /// Whether any logged dispatch starts with `prefix`
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.history().iter().any(|h| h.starts_with(prefix))
    }

    /// Schedule every reaction the event fires. Called with the lock held.
    fn schedule(&self, shared: &Shared, event: &UiEvent) {
        for reaction in shared
            .reactions
            .iter()
            .filter(|r| r.trigger.fires(&shared.doc, event))
        {
            let reaction = Arc::clone(reaction);
            let state = Arc::clone(&self.shared);
            let event = event.clone();
            tokio::spawn(async move {
                if !reaction.delay.is_zero() {
                    tokio::time::sleep(reaction.delay).await;
                }
                if let Ok(mut shared) = state.lock() {
                    if !shared.doc.is_closed() {
                        (reaction.effect)(&mut shared.doc, &event);
                    }
                }
            });
        }
    }

    fn resolve(doc: &Document, selector: &Selector) -> SettleResult<Vec<NodeId>> {
        match selector {
            Selector::Css(css) => Ok(doc.query(&SelectorList::parse(css)?)),
            Selector::XPath(expr) => Err(SettleError::invalid_selector(
                expr.clone(),
                "xpath is not supported by the in-memory UI",
            )),
            Selector::Text(query) => {
                let matcher = query.matcher()?;
                let pool = match &query.within {
                    Some(scope) => doc.query(&SelectorList::parse(scope)?),
                    None => doc.preorder(),
                };
                let hits: Vec<NodeId> = pool
                    .into_iter()
                    .filter(|id| matcher.is_match(&doc.text_content(*id)))
                    .collect();
                if query.within.is_some() {
                    return Ok(hits);
                }
                Ok(hits
                    .iter()
                    .copied()
                    .filter(|id| !hits.iter().any(|other| doc.is_ancestor(*id, *other)))
                    .collect())
            }
        }
    }
}

#[async_trait]
impl UiDriver for MockUi {
    async fn resolve_selector(&self, selector: &Selector) -> SettleResult<Vec<ElementSnapshot>> {
        let shared = self.open()?;
        let ids = Self::resolve(&shared.doc, selector)?;
        Ok(ids
            .into_iter()
            .enumerate()
            .filter_map(|(index, id)| shared.doc.snapshot(id, index))
            .collect())
    }

    async fn dispatch_pointer(&self, points: &[Point]) -> SettleResult<()> {
        let mut shared = self.open()?;
        let path: Vec<String> = points.iter().map(|p| format!("({},{})", p.x, p.y)).collect();
        shared.history.push(format!("pointer:{}", path.join("->")));
        self.schedule(
            &shared,
            &UiEvent::Pointer {
                points: points.to_vec(),
            },
        );
        Ok(())
    }

    async fn dispatch_click(&self, target: &ElementSnapshot) -> SettleResult<()> {
        let mut shared = self.open()?;
        let id = node_for(&target.handle)
            .filter(|id| shared.doc.contains(*id))
            .ok_or_else(|| SettleError::ElementNotFound {
                selector: target.handle.clone(),
            })?;
        shared.history.push(format!("click:{}", target.handle));
        if shared.doc.is_disabled(id) {
            trace!(handle = %target.handle, "click on disabled element ignored");
            return Ok(());
        }
        shared.doc.focus(id);
        self.schedule(&shared, &UiEvent::Click { target: id });
        Ok(())
    }

    async fn dispatch_keyboard_text(&self, text: &str) -> SettleResult<()> {
        let mut shared = self.open()?;
        shared.history.push(format!("type:{text}"));
        let target = shared.doc.focused();
        if let Some(id) = target {
            shared.doc.push_text(id, text);
        }
        self.schedule(
            &shared,
            &UiEvent::Typed {
                text: text.to_string(),
                target,
            },
        );
        Ok(())
    }

    async fn read_text(&self, target: &ElementSnapshot) -> SettleResult<String> {
        let shared = self.open()?;
        node_for(&target.handle)
            .filter(|id| shared.doc.contains(*id))
            .map(|id| shared.doc.text_content(id))
            .ok_or_else(|| SettleError::ElementNotFound {
                selector: target.handle.clone(),
            })
    }
}
