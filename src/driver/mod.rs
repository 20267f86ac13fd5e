// src/driver/mod.rs
//! The page-automation capability the scraper is written against.
//!
//! Everything above this module talks to a browser only through
//! [`PageDriver`], so the grid assembler, the overlay stabilizer and the panel
//! orchestrator run unchanged against a live WebDriver session or an in-memory
//! fake page in tests.

pub mod webdriver;

use crate::error::{Result, ScrapeError};
use serde_json::Value;
use std::{future::Future, time::Duration};
use tokio::time::{sleep, Instant};

pub use webdriver::WebDriverSession;

/// How to find an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(s: impl Into<String>) -> Self {
        Self::Css(s.into())
    }

    pub fn xpath(s: impl Into<String>) -> Self {
        Self::XPath(s.into())
    }

    /// Element id, expressed as an attribute CSS selector so ids with odd
    /// characters need no escaping.
    pub fn id(id: &str) -> Self {
        Self::Css(format!("[id='{}']", id))
    }

    /// (W3C strategy name, selector) pair.
    pub fn strategy(&self) -> (&'static str, &str) {
        match self {
            Self::Css(s) => ("css selector", s),
            Self::XPath(s) => ("xpath", s),
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Css(s) => write!(f, "css `{}`", s),
            Self::XPath(s) => write!(f, "xpath `{}`", s),
        }
    }
}

/// Opaque reference to an element inside the current session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub String);

impl ElementHandle {
    pub fn id(&self) -> &str {
        &self.0
    }
}

/// Narrow page-automation capability set.
///
/// Calls are issued strictly one at a time; implementations are not expected
/// to handle concurrent commands against the same session.
#[allow(async_fn_in_trait)]
pub trait PageDriver {
    async fn find_all(&self, locator: &Locator) -> Result<Vec<ElementHandle>>;

    async fn find_all_in(
        &self,
        parent: &ElementHandle,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>>;

    async fn click(&self, el: &ElementHandle) -> Result<()>;

    async fn clear(&self, el: &ElementHandle) -> Result<()>;

    async fn send_keys(&self, el: &ElementHandle, text: &str) -> Result<()>;

    async fn is_displayed(&self, el: &ElementHandle) -> Result<bool>;

    async fn attribute(&self, el: &ElementHandle, name: &str) -> Result<Option<String>>;

    /// Rendered text of the element.
    async fn text(&self, el: &ElementHandle) -> Result<String>;

    /// Top-left corner of the element in page coordinates.
    async fn location(&self, el: &ElementHandle) -> Result<(f64, f64)>;

    /// Press on `el`, move the pointer by `(dx, dy)`, release.
    async fn drag_by(&self, el: &ElementHandle, dx: i64, dy: i64) -> Result<()>;

    /// Run `code` as a function body; `args` are available as `arguments[i]`.
    async fn execute_script(&self, code: &str, args: Vec<Value>) -> Result<Value>;

    /// Wraps an element so it can be passed through `execute_script` args.
    fn element_arg(&self, el: &ElementHandle) -> Value;

    /// First match, or [`ScrapeError::ElementNotFound`].
    async fn find(&self, locator: &Locator) -> Result<ElementHandle> {
        self.find_all(locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ScrapeError::ElementNotFound(locator.to_string()))
    }

    async fn find_in(&self, parent: &ElementHandle, locator: &Locator) -> Result<ElementHandle> {
        self.find_all_in(parent, locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ScrapeError::ElementNotFound(locator.to_string()))
    }
}

/// Poll `probe` until it yields `Some`, or fail with [`ScrapeError::Timeout`].
///
/// The probe always runs at least once, so a zero timeout is a single check.
/// Probe errors count as "not yet".
pub async fn wait_for<T, F, Fut>(
    what: &str,
    timeout: Duration,
    poll: Duration,
    mut probe: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Ok(Some(found)) = probe().await {
            return Ok(found);
        }
        if Instant::now() >= deadline {
            return Err(ScrapeError::timeout(what, timeout));
        }
        sleep(poll.max(Duration::from_millis(1))).await;
    }
}

/// Wait until `locator` matches at least one element and return the first.
pub async fn wait_for_element<D: PageDriver>(
    driver: &D,
    locator: &Locator,
    timeout: Duration,
    poll: Duration,
) -> Result<ElementHandle> {
    wait_for(&locator.to_string(), timeout, poll, || async move {
        Ok(driver.find_all(locator).await?.into_iter().next())
    })
    .await
}

/// Like [`wait_for_element`] but also requires the element to be displayed.
pub async fn wait_for_visible<D: PageDriver>(
    driver: &D,
    locator: &Locator,
    timeout: Duration,
    poll: Duration,
) -> Result<ElementHandle> {
    wait_for(&locator.to_string(), timeout, poll, || async move {
        for el in driver.find_all(locator).await? {
            if driver.is_displayed(&el).await? {
                return Ok(Some(el));
            }
        }
        Ok(None)
    })
    .await
}
