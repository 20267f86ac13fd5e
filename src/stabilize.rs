// src/stabilize.rs
//! Overlay interference: ads, consent dialogs and gray backdrops that
//! intermittently cover the page and swallow clicks.

use crate::config::{Selectors, Timing};
use crate::driver::{wait_for, Locator, PageDriver};
use crate::error::Result;
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

const REMOVE_OVERLAYS_JS: &str = r#"
document.querySelectorAll(arguments[0]).forEach(function (el) { el.remove(); });
document.documentElement.style.overflow = 'auto';
if (document.body) { document.body.style.overflow = 'auto'; }
return true;
"#;

/// One way of getting rid of overlays, tried in list order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mitigation {
    /// Click the overlay's own close affordance.
    ClickClose,
    /// Delete every overlay-like element and restore page scrolling.
    ForceRemove,
}

pub const DEFAULT_MITIGATIONS: &[Mitigation] = &[Mitigation::ClickClose, Mitigation::ForceRemove];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    Cleared,
    /// Overlays were still present when the wait ran out. Callers carry on.
    Persistent { remaining: usize },
}

pub struct PageStabilizer<'a, D> {
    driver: &'a D,
    overlay: Locator,
    residue: Locator,
    close_by_text: Locator,
    close_by_class: Locator,
    poll: Duration,
    settle: Duration,
    mitigations: Vec<Mitigation>,
}

impl<'a, D: PageDriver> PageStabilizer<'a, D> {
    pub fn new(driver: &'a D, selectors: &Selectors, timing: &Timing) -> Self {
        Self {
            driver,
            overlay: Locator::css(&selectors.overlay),
            residue: Locator::css(&selectors.overlay_residue),
            close_by_text: Locator::xpath(&selectors.close_button_xpath),
            close_by_class: Locator::css(&selectors.close_button),
            poll: timing.poll_interval(),
            settle: timing.settle(),
            mitigations: DEFAULT_MITIGATIONS.to_vec(),
        }
    }

    pub fn with_mitigations(mut self, mitigations: Vec<Mitigation>) -> Self {
        self.mitigations = mitigations;
        self
    }

    /// Best effort: never fails. Each mitigation after the first runs only if
    /// the previous one did not succeed or overlays remain.
    pub async fn clear(&self, timeout: Duration) -> ClearOutcome {
        let mut previous_ok: Option<bool> = None;
        for &m in &self.mitigations {
            if previous_ok == Some(true) && self.count(&self.overlay).await == Some(0) {
                break;
            }
            let ok = match self.apply(m).await {
                Ok(ok) => ok,
                Err(e) => {
                    debug!(mitigation = ?m, error = %e, "overlay mitigation failed");
                    false
                }
            };
            previous_ok = Some(ok);
        }

        let residue = &self.residue;
        let gone = wait_for("overlays to disappear", timeout, self.poll, || async move {
            let n = self.driver.find_all(residue).await?.len();
            Ok((n == 0).then_some(()))
        })
        .await;

        match gone {
            Ok(()) => ClearOutcome::Cleared,
            Err(_) => {
                let remaining = self.count(&self.residue).await.unwrap_or(0);
                warn!(remaining, "overlays did not disappear in time; continuing");
                ClearOutcome::Persistent { remaining }
            }
        }
    }

    async fn apply(&self, m: Mitigation) -> Result<bool> {
        match m {
            Mitigation::ClickClose => self.click_close().await,
            Mitigation::ForceRemove => self.force_remove().await,
        }
    }

    async fn click_close(&self) -> Result<bool> {
        for overlay in self.driver.find_all(&self.overlay).await? {
            if !self.driver.is_displayed(&overlay).await.unwrap_or(false) {
                continue;
            }
            for (how, locator) in [("text", &self.close_by_text), ("class", &self.close_by_class)] {
                let Ok(button) = self.driver.find_in(&overlay, locator).await else {
                    continue;
                };
                if self.driver.click(&button).await.is_ok() {
                    info!(matched_by = how, "overlay closed");
                    self.pause().await;
                    return Ok(true);
                }
            }
            debug!("no clickable close button in overlay");
        }
        Ok(false)
    }

    async fn force_remove(&self) -> Result<bool> {
        let selector = match &self.overlay {
            Locator::Css(s) => s.clone(),
            Locator::XPath(_) => return Ok(false),
        };
        self.driver
            .execute_script(REMOVE_OVERLAYS_JS, vec![Value::String(selector)])
            .await?;
        debug!("overlays removed by script");
        self.pause().await;
        Ok(true)
    }

    async fn count(&self, locator: &Locator) -> Option<usize> {
        self.driver.find_all(locator).await.ok().map(|v| v.len())
    }

    async fn pause(&self) {
        if !self.settle.is_zero() {
            sleep(self.settle).await;
        }
    }
}
