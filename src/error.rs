// src/error.rs

use std::time::Duration;
use thiserror::Error;

/// Failures raised by the automation layer and the components built on it.
///
/// Assembly termination (no scrollbar, stalled thumb, no new dates) is not an
/// error and is reported through [`crate::grid::StopReason`]; persistent
/// overlays are reported through [`crate::stabilize::ClearOutcome`].
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("timed out after {waited:?} waiting for {what}")]
    Timeout { what: String, waited: Duration },

    #[error("webdriver error `{error}`: {message}")]
    WebDriver { error: String, message: String },

    #[error("unexpected webdriver response: {0}")]
    UnexpectedResponse(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),
}

impl ScrapeError {
    pub fn timeout(what: impl Into<String>, waited: Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            waited,
        }
    }

    /// True for the "control did not show up" family that is fatal to one panel only.
    pub fn is_missing_control(&self) -> bool {
        matches!(self, Self::ElementNotFound(_) | Self::Timeout { .. })
    }
}

pub type Result<T, E = ScrapeError> = std::result::Result<T, E>;
