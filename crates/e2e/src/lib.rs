//! Review page E2E checks
//!
//! Drives a real browser against a live shop review page and asserts on the
//! rendered DOM: title, grade value, the grade explanation modal, 2-star
//! filtered reviews and the rating distribution.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── prepare()  playwright check, browser install,        │
//! │    │              HTTP preflight                            │
//! │    └── run_check(check) per ReviewCheck:                    │
//! │          BrowserSession::launch → goto → check.run → close  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ReviewCheck ── uses ──> wait::{wait_visible, …}            │
//! │                              │                              │
//! │                           Page trait                        │
//! │                              │                              │
//! │  BrowserSession ── JSON lines ──> node bridge (Playwright)  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod checks;
pub mod driver;
pub mod error;
pub mod locator;
pub mod page;
pub mod preflight;
pub mod runner;
pub mod session;
pub mod wait;

#[cfg(test)]
mod fake;

pub use checks::{CheckOutcome, ReviewCheck};
pub use error::{E2eError, E2eResult};
pub use locator::Locator;
pub use page::{ElementId, Page};
pub use runner::TestRunner;
pub use session::{BrowserKind, BrowserSession, SessionConfig};
