//! Reachability check of the target page before any browser is launched

use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// GET `url` until it answers with a success status or `budget` runs out
pub async fn check_reachable(url: &str, budget: Duration) -> E2eResult<()> {
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()?;

    let start = Instant::now();
    let mut last_error;

    loop {
        match client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!("Target page reachable ({})", resp.status());
                return Ok(());
            }
            Ok(resp) => {
                warn!("Preflight returned {}", resp.status());
                last_error = format!("HTTP {}", resp.status());
            }
            Err(e) => {
                warn!("Preflight error: {}", e);
                last_error = e.to_string();
            }
        }

        if start.elapsed() >= budget {
            return Err(E2eError::Preflight {
                url: url.to_string(),
                reason: last_error,
            });
        }
        sleep(RETRY_DELAY).await;
    }
}
