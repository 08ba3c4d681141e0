//! Error types for E2E testing

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Playwright not found. Install with: npm install -g playwright")]
    PlaywrightNotFound,

    #[error("Browser install failed: {0}")]
    BrowserInstall(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Preflight request to {url} failed: {reason}")]
    Preflight { url: String, reason: String },

    #[error("Timeout after {:.1}s waiting for: {what}", .waited.as_secs_f64())]
    Timeout { what: String, waited: Duration },

    #[error("Element is no longer attached to the page")]
    StaleElement,

    #[error("Could not parse {what} from {input:?}")]
    Parse { what: &'static str, input: String },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Unknown check: {0}")]
    UnknownCheck(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    /// Whether a bounded wait may keep polling after this error
    pub fn is_retryable(&self) -> bool {
        matches!(self, E2eError::StaleElement)
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
