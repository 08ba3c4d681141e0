//! Bounded polling on top of [`Page`]

use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::page::{ElementId, Page};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Timeout and polling cadence for a bounded wait
#[derive(Debug, Clone, Copy)]
pub struct WaitConfig {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl WaitConfig {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Default::default()
        }
    }
}

/// Wait until the first element matching `locator` is displayed.
pub async fn wait_visible<P>(page: &P, locator: &Locator, config: &WaitConfig) -> E2eResult<ElementId>
where
    P: Page + ?Sized,
{
    let start = Instant::now();
    loop {
        match first_visible(page, locator).await {
            Ok(Some(element)) => return Ok(element),
            Ok(None) => {}
            Err(e) if e.is_retryable() => debug!("Retrying {} after: {}", locator, e),
            Err(e) => return Err(e),
        }
        check_deadline(start, config, || format!("{} to be visible", locator))?;
        sleep(config.poll_interval).await;
    }
}

/// Wait until at least one element matches `locator` and every match is displayed.
pub async fn wait_all_visible<P>(page: &P, locator: &Locator, config: &WaitConfig) -> E2eResult<Vec<ElementId>>
where
    P: Page + ?Sized,
{
    let start = Instant::now();
    loop {
        match all_visible(page, locator).await {
            Ok(Some(elements)) => return Ok(elements),
            Ok(None) => {}
            Err(e) if e.is_retryable() => debug!("Retrying {} after: {}", locator, e),
            Err(e) => return Err(e),
        }
        check_deadline(start, config, || format!("all of {} to be visible", locator))?;
        sleep(config.poll_interval).await;
    }
}

/// Wait until at least one element matches `locator`.
///
/// Returns an empty list when nothing shows up before the timeout; callers
/// that require a match should use [`require_present`].
pub async fn wait_present<P>(page: &P, locator: &Locator, config: &WaitConfig) -> E2eResult<Vec<ElementId>>
where
    P: Page + ?Sized,
{
    let start = Instant::now();
    loop {
        match page.find_all(locator).await {
            Ok(elements) if !elements.is_empty() => return Ok(elements),
            Ok(_) => {}
            Err(e) if e.is_retryable() => debug!("Retrying {} after: {}", locator, e),
            Err(e) => return Err(e),
        }
        if start.elapsed() >= config.timeout {
            return Ok(Vec::new());
        }
        sleep(config.poll_interval).await;
    }
}

/// Like [`wait_present`], but an empty result is a timeout.
pub async fn require_present<P>(page: &P, locator: &Locator, config: &WaitConfig) -> E2eResult<Vec<ElementId>>
where
    P: Page + ?Sized,
{
    let elements = wait_present(page, locator, config).await?;
    if elements.is_empty() {
        return Err(E2eError::Timeout {
            what: format!("{} to be present", locator),
            waited: config.timeout,
        });
    }
    Ok(elements)
}

async fn first_visible<P>(page: &P, locator: &Locator) -> E2eResult<Option<ElementId>>
where
    P: Page + ?Sized,
{
    let Some(&element) = page.find_all(locator).await?.first() else {
        return Ok(None);
    };
    Ok(page.is_displayed(element).await?.then_some(element))
}

async fn all_visible<P>(page: &P, locator: &Locator) -> E2eResult<Option<Vec<ElementId>>>
where
    P: Page + ?Sized,
{
    let elements = page.find_all(locator).await?;
    if elements.is_empty() {
        return Ok(None);
    }
    for &element in &elements {
        if !page.is_displayed(element).await? {
            return Ok(None);
        }
    }
    Ok(Some(elements))
}

fn check_deadline(start: Instant, config: &WaitConfig, what: impl FnOnce() -> String) -> E2eResult<()> {
    if start.elapsed() >= config.timeout {
        return Err(E2eError::Timeout {
            what: what(),
            waited: config.timeout,
        });
    }
    Ok(())
}
