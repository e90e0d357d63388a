//! Chromium driver over the DevTools protocol.
//!
//! ```text
//! ┌──────────────┐  evaluate / Input.*   ┌──────────────┐
//! │ ChromiumDriver│ ───────────────────► │   Chromium   │
//! │  (UiDriver)  │ ◄─────────────────── │   (CDP ws)   │
//! └──────────────┘   snapshots (JSON)    └──────────────┘
//! ```
//!
//! Selectors resolve in the page through [`Selector::to_resolver_script`].
//! Element handles come from a page-global registry, so clicks and text
//! reads always address the live element, never a stale snapshot.

#![allow(clippy::missing_errors_doc)]

use std::fmt::Display;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams,
    DispatchMouseEventType, MouseButton,
};
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::BrowserConfig;
use crate::driver::{ElementSnapshot, Point, UiDriver};
use crate::result::{SettleError, SettleResult};
use crate::selector::{Selector, TEXT_OF_JS};

/// Error messages that mean the page or its connection is gone
const LOST_SURFACE_MARKERS: &[&str] = &[
    "target closed",
    "session closed",
    "no target",
    "websocket",
    "connection closed",
    "channel",
    "browser closed",
];

/// Live Chromium session implementing [`UiDriver`]
#[derive(Debug)]
pub struct ChromiumDriver {
    browser: Mutex<CdpBrowser>,
    page: CdpPage,
    handler: tokio::task::JoinHandle<()>,
}

impl ChromiumDriver {
    /// Launch Chromium and open a blank page
    pub async fn launch(config: &BrowserConfig) -> SettleResult<Self> {
        config.validate()?;

        let mut builder = CdpConfig::builder()
            .window_size(config.viewport_width, config.viewport_height);
        if !config.headless {
            builder = builder.with_head();
        }
        if !config.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = config.chromium_path {
            builder = builder.chrome_executable(path);
        }

        let cdp_config = builder
            .build()
            .map_err(|e| SettleError::BrowserLaunchError { message: e })?;

        let (browser, mut handler) = CdpBrowser::launch(cdp_config).await.map_err(|e| {
            SettleError::BrowserLaunchError {
                message: e.to_string(),
            }
        })?;

        let handler = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| SettleError::BrowserLaunchError {
                message: e.to_string(),
            })?;

        info!(headless = config.headless, "chromium launched");
        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler,
        })
    }

    /// Navigate the page and wait for the load to finish
    pub async fn navigate(&self, url: &str) -> SettleResult<()> {
        debug!(url, "navigate");
        self.page.goto(url).await.map_err(classify)?;
        Ok(())
    }

    /// Close the browser and stop the protocol handler
    pub async fn close(self) -> SettleResult<()> {
        let mut browser = self.browser.lock().await;
        let closed = browser.close().await.map_err(classify);
        if let Err(e) = browser.wait().await {
            warn!(error = %e, "waiting for chromium to exit failed");
        }
        self.handler.abort();
        closed.map(|_| ())
    }

    async fn eval<T: DeserializeOwned>(&self, script: String) -> SettleResult<T> {
        self.page
            .evaluate(script)
            .await
            .map_err(classify)?
            .into_value()
            .map_err(|e| SettleError::Driver {
                message: format!("unexpected script result: {e}"),
            })
    }

    async fn mouse(&self, kind: DispatchMouseEventType, at: Point) -> SettleResult<()> {
        let pressing = !matches!(kind, DispatchMouseEventType::MouseMoved);
        let mut builder = DispatchMouseEventParams::builder().r#type(kind).x(at.x).y(at.y);
        if pressing {
            builder = builder.button(MouseButton::Left).click_count(1);
        }
        let params = builder
            .build()
            .map_err(|message| SettleError::InputError { message })?;
        self.page.execute(params).await.map_err(classify)?;
        Ok(())
    }

    async fn key(&self, kind: DispatchKeyEventType, ch: char) -> SettleResult<()> {
        let down = matches!(kind, DispatchKeyEventType::KeyDown);
        let mut builder = DispatchKeyEventParams::builder()
            .r#type(kind)
            .key(ch.to_string());
        if down {
            builder = builder.text(ch.to_string());
        }
        let params = builder
            .build()
            .map_err(|message| SettleError::InputError { message })?;
        self.page.execute(params).await.map_err(classify)?;
        Ok(())
    }
}

#[async_trait]
impl UiDriver for ChromiumDriver {
    async fn resolve_selector(&self, selector: &Selector) -> SettleResult<Vec<ElementSnapshot>> {
        self.eval(selector.to_resolver_script()).await
    }

    async fn dispatch_pointer(&self, path: &[Point]) -> SettleResult<()> {
        for point in path {
            self.mouse(DispatchMouseEventType::MouseMoved, *point).await?;
        }
        Ok(())
    }

    async fn dispatch_click(&self, target: &ElementSnapshot) -> SettleResult<()> {
        let centers: Vec<Point> = self.eval(center_script(&target.handle)).await?;
        let Some(center) = centers.first().copied() else {
            return Err(SettleError::ElementNotFound {
                selector: format!("<{}> handle {}", target.tag, target.handle),
            });
        };
        self.mouse(DispatchMouseEventType::MouseMoved, center).await?;
        self.mouse(DispatchMouseEventType::MousePressed, center).await?;
        self.mouse(DispatchMouseEventType::MouseReleased, center).await
    }

    async fn dispatch_keyboard_text(&self, text: &str) -> SettleResult<()> {
        for ch in text.chars() {
            self.key(DispatchKeyEventType::KeyDown, ch).await?;
            self.key(DispatchKeyEventType::KeyUp, ch).await?;
        }
        Ok(())
    }

    async fn read_text(&self, target: &ElementSnapshot) -> SettleResult<String> {
        let texts: Vec<String> = self.eval(text_script(&target.handle)).await?;
        texts
            .into_iter()
            .next()
            .ok_or_else(|| SettleError::ElementNotFound {
                selector: format!("<{}> handle {}", target.tag, target.handle),
            })
    }
}

/// Map a protocol error to a lost surface or a plain driver error
fn classify(error: impl Display) -> SettleError {
    let message = error.to_string();
    let lower = message.to_lowercase();
    if LOST_SURFACE_MARKERS.iter().any(|m| lower.contains(m)) {
        SettleError::SurfaceUnavailable { message }
    } else {
        SettleError::Driver { message }
    }
}

/// Wrap `body` so it runs with `el` bound to the live element behind `handle`.
/// Yields `[]` when the element is gone.
fn element_script(handle: &str, body: &str) -> String {
    format!(
        "(() => {{ const el = window.__settle?.refs.get({})?.deref(); \
         if (!el || !el.isConnected) return []; {body} }})()",
        serde_json::Value::String(handle.to_string())
    )
}

fn text_script(handle: &str) -> String {
    element_script(handle, &format!("{TEXT_OF_JS} return [textOf(el)];"))
}

fn center_script(handle: &str) -> String {
    element_script(
        handle,
        "el.scrollIntoView({ block: 'center', inline: 'center' }); \
         const r = el.getBoundingClientRect(); \
         return [{ x: r.x + r.width / 2, y: r.y + r.height / 2 }];",
    )
}
