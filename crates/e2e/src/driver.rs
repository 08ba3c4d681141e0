//! Playwright installation: the browser driver the bridge runs on

use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{E2eError, E2eResult};
use crate::session::BrowserKind;

/// Check that the Playwright CLI is reachable through `npx`
pub async fn ensure_playwright() -> E2eResult<String> {
    let output = Command::new("npx")
        .args(["--no-install", "playwright", "--version"])
        .stdin(Stdio::null())
        .output()
        .await;

    match output {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
            debug!("Found {}", version);
            Ok(version)
        }
        _ => Err(E2eError::PlaywrightNotFound),
    }
}

/// Download the browser build Playwright expects; a no-op when already present
pub async fn install_browser(browser: BrowserKind) -> E2eResult<()> {
    info!("Installing {} for Playwright (skipped if present)", browser.as_str());

    let output = Command::new("npx")
        .args(install_args(browser))
        .stdin(Stdio::null())
        .output()
        .await?;

    if !output.status.success() {
        return Err(E2eError::BrowserInstall(format!(
            "npx playwright install {} exited with {}:\n{}",
            browser.as_str(),
            output.status,
            String::from_utf8_lossy(&output.stderr)
        )));
    }
    Ok(())
}

fn install_args(browser: BrowserKind) -> [&'static str; 4] {
    ["--no-install", "playwright", "install", browser.as_str()]
}
