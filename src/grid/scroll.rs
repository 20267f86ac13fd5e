// src/grid/scroll.rs

use crate::driver::{Locator, PageDriver};
use crate::error::ScrapeError;
use tracing::{debug, warn};

/// Moves the grid's horizontal window.
#[allow(async_fn_in_trait)]
pub trait ScrollDriver {
    /// Current thumb offset, or `None` when there is no scrollbar to move.
    async fn position(&self) -> Option<i64>;

    /// Try to move the thumb by `amount`. `true` means the gesture ran without
    /// an automation error, not that the thumb actually moved.
    async fn advance(&self, amount: i64) -> bool;
}

/// Drags the scrollbar thumb with a press-move-release gesture.
pub struct ThumbScrollDriver<'a, D> {
    driver: &'a D,
    thumb: Locator,
}

impl<'a, D: PageDriver> ThumbScrollDriver<'a, D> {
    pub fn new(driver: &'a D, thumb: Locator) -> Self {
        Self { driver, thumb }
    }
}

impl<D: PageDriver> ScrollDriver for ThumbScrollDriver<'_, D> {
    async fn position(&self) -> Option<i64> {
        let thumb = match self.driver.find(&self.thumb).await {
            Ok(t) => t,
            Err(ScrapeError::ElementNotFound(_)) => return None,
            Err(e) => {
                warn!(error = %e, "scroll thumb lookup failed; treating as no scrollbar");
                return None;
            }
        };
        match self.driver.location(&thumb).await {
            Ok((x, _)) => Some(x.round() as i64),
            Err(e) => {
                debug!(error = %e, "could not read thumb location");
                None
            }
        }
    }

    async fn advance(&self, amount: i64) -> bool {
        let thumb = match self.driver.find(&self.thumb).await {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "scroll thumb not found");
                return false;
            }
        };
        match self.driver.drag_by(&thumb, amount, 0).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "scroll drag failed");
                false
            }
        }
    }
}
