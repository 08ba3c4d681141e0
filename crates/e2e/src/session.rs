//! Browser session backed by a Playwright bridge process
//!
//! The bridge is a small node program (`bridge/session.js`) that owns one
//! browser. Requests and responses are single JSON lines on its stdin/stdout.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::page::{ElementId, Page};

const BRIDGE_SCRIPT: &str = include_str!("../bridge/session.js");

/// Extra time granted to the bridge beyond its own command timeout
const REPLY_GRACE: Duration = Duration::from_secs(5);
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Browser engine driven by Playwright
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum BrowserKind {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }
}

/// Configuration for one browser session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub browser: BrowserKind,
    pub headless: bool,

    /// Viewport dimensions
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Node executable used to run the bridge
    pub node_binary: PathBuf,

    /// Extra module directory holding `playwright` (sets `NODE_PATH`)
    pub node_path: Option<PathBuf>,

    pub launch_timeout: Duration,
    pub navigation_timeout: Duration,
    pub action_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            browser: BrowserKind::Chromium,
            headless: true,
            viewport_width: 1920,
            viewport_height: 1080,
            node_binary: PathBuf::from("node"),
            node_path: None,
            launch_timeout: Duration::from_secs(30),
            navigation_timeout: Duration::from_secs(30),
            action_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Serialize)]
struct LaunchConfig<'a> {
    browser: &'a str,
    headless: bool,
    viewport_width: u32,
    viewport_height: u32,
}

impl<'a> From<&'a SessionConfig> for LaunchConfig<'a> {
    fn from(config: &'a SessionConfig) -> Self {
        Self {
            browser: config.browser.as_str(),
            headless: config.headless,
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
        }
    }
}

/// A command understood by the bridge
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
enum BridgeCommand {
    Goto { url: String, timeout_ms: u64 },
    Title,
    Query { selector: String, scope: Option<ElementId> },
    Text { element: ElementId },
    Visible { element: ElementId },
    Click { element: ElementId, timeout_ms: u64 },
    Screenshot { path: PathBuf },
    Close,
}

impl BridgeCommand {
    fn name(&self) -> &'static str {
        match self {
            BridgeCommand::Goto { .. } => "goto",
            BridgeCommand::Title => "title",
            BridgeCommand::Query { .. } => "query",
            BridgeCommand::Text { .. } => "text",
            BridgeCommand::Visible { .. } => "visible",
            BridgeCommand::Click { .. } => "click",
            BridgeCommand::Screenshot { .. } => "screenshot",
            BridgeCommand::Close => "close",
        }
    }
}

#[derive(Debug, Deserialize)]
struct Ready {
    ready: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BridgeResponse {
    id: u64,
    ok: bool,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn encode_request(id: u64, command: &BridgeCommand) -> E2eResult<String> {
    let mut value = serde_json::to_value(command)?;
    if let Value::Object(fields) = &mut value {
        fields.insert("id".to_string(), Value::from(id));
    }
    Ok(serde_json::to_string(&value)?)
}

/// Decode one reply line. `Ok(None)` is a late reply to an earlier request
/// that already gave up waiting; the caller keeps reading.
fn decode_response(line: &str, expected_id: u64, command_timeout: Duration) -> E2eResult<Option<Value>> {
    let response: BridgeResponse = serde_json::from_str(line)?;
    if response.id < expected_id {
        return Ok(None);
    }
    if response.id > expected_id {
        return Err(E2eError::Driver(format!(
            "Reply for request {} while waiting for {}",
            response.id, expected_id
        )));
    }
    if response.ok {
        return Ok(Some(response.value));
    }

    let message = response.error.unwrap_or_else(|| "unknown bridge error".to_string());
    match response.kind.as_deref() {
        Some("stale") => Err(E2eError::StaleElement),
        Some("timeout") => Err(E2eError::Timeout {
            what: message,
            waited: command_timeout,
        }),
        _ => Err(E2eError::Driver(message)),
    }
}

fn decode_value<T: DeserializeOwned>(value: Value) -> E2eResult<T> {
    Ok(serde_json::from_value(value)?)
}

struct BridgeIo {
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
}

/// One browser, one page, one bridge process
pub struct BrowserSession {
    child: Child,
    io: Mutex<BridgeIo>,
    action_timeout: Duration,
    navigation_timeout: Duration,
    // Holds the bridge script until the session ends
    _script_dir: tempfile::TempDir,
}

impl BrowserSession {
    /// Start the bridge and wait for its browser to come up
    pub async fn launch(config: &SessionConfig) -> E2eResult<Self> {
        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("session.js");
        std::fs::write(&script_path, BRIDGE_SCRIPT)?;

        let launch = serde_json::to_string(&LaunchConfig::from(config))?;
        debug!("Launching bridge: {} {}", script_path.display(), launch);

        let mut cmd = Command::new(&config.node_binary);
        cmd.arg(&script_path)
            .arg(&launch)
            .current_dir(script_dir.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(node_path) = &config.node_path {
            cmd.env("NODE_PATH", node_path);
        }

        let mut child = cmd.spawn().map_err(|e| {
            E2eError::Driver(format!(
                "Failed to spawn {}: {}",
                config.node_binary.display(),
                e
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Driver("Bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Driver("Bridge stdout unavailable".to_string()))?;
        let mut stdout = BufReader::new(stdout).lines();

        let line = match timeout(config.launch_timeout, stdout.next_line()).await {
            Ok(Ok(Some(line))) => line,
            Ok(Ok(None)) => {
                return Err(E2eError::Driver("Bridge exited before the browser was ready".to_string()))
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                return Err(E2eError::Timeout {
                    what: format!("{} to launch", config.browser.as_str()),
                    waited: config.launch_timeout,
                })
            }
        };

        let ready: Ready = serde_json::from_str(&line)?;
        if !ready.ready {
            return Err(E2eError::Driver(format!(
                "Browser launch failed: {}",
                ready.error.unwrap_or_default()
            )));
        }

        info!("Browser session started ({})", config.browser.as_str());
        Ok(Self {
            child,
            io: Mutex::new(BridgeIo {
                stdin,
                stdout,
                next_id: 0,
            }),
            action_timeout: config.action_timeout,
            navigation_timeout: config.navigation_timeout,
            _script_dir: script_dir,
        })
    }

    async fn request(&self, command: BridgeCommand) -> E2eResult<Value> {
        let command_timeout = match command {
            BridgeCommand::Goto { .. } => self.navigation_timeout,
            _ => self.action_timeout,
        };

        let mut io = self.io.lock().await;
        io.next_id += 1;
        let id = io.next_id;

        let mut line = encode_request(id, &command)?;
        line.push('\n');
        io.stdin.write_all(line.as_bytes()).await?;
        io.stdin.flush().await?;

        let deadline = Instant::now() + command_timeout + REPLY_GRACE;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let reply = timeout(remaining, io.stdout.next_line())
                .await
                .map_err(|_| E2eError::Driver(format!("No reply to {} from bridge", command.name())))??
                .ok_or_else(|| E2eError::Driver("Bridge closed its output".to_string()))?;

            match decode_response(&reply, id, command_timeout)? {
                Some(value) => return Ok(value),
                None => debug!("Discarding late bridge reply while waiting for {}", id),
            }
        }
    }

    /// Navigate and wait for the load event
    pub async fn goto(&self, url: &str) -> E2eResult<()> {
        debug!("Navigating to {}", url);
        self.request(BridgeCommand::Goto {
            url: url.to_string(),
            timeout_ms: self.navigation_timeout.as_millis() as u64,
        })
        .await?;
        Ok(())
    }

    /// Full-page screenshot to `path`
    pub async fn screenshot(&self, path: &Path) -> E2eResult<()> {
        self.request(BridgeCommand::Screenshot {
            path: path.to_path_buf(),
        })
        .await?;
        Ok(())
    }

    /// Close the browser and reap the bridge process
    pub async fn close(mut self) -> E2eResult<()> {
        let closed = self.request(BridgeCommand::Close).await.map(|_| ());
        if let Err(e) = &closed {
            warn!("Bridge did not close cleanly: {}", e);
        }

        match timeout(CLOSE_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => debug!("Bridge exited with {}", status),
            _ => self.terminate().await,
        }
        closed
    }

    async fn terminate(&mut self) {
        warn!("Terminating bridge process");

        // Try graceful shutdown first
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = self.child.id() {
                if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
                    && timeout(Duration::from_millis(500), self.child.wait()).await.is_ok()
                {
                    return;
                }
            }
        }

        let _ = self.child.kill().await;
    }
}

#[async_trait]
impl Page for BrowserSession {
    async fn title(&self) -> E2eResult<String> {
        decode_value(self.request(BridgeCommand::Title).await?)
    }

    async fn find_all(&self, locator: &Locator) -> E2eResult<Vec<ElementId>> {
        let value = self
            .request(BridgeCommand::Query {
                selector: locator.to_selector(),
                scope: None,
            })
            .await?;
        decode_value(value)
    }

    async fn find_all_in(&self, scope: ElementId, locator: &Locator) -> E2eResult<Vec<ElementId>> {
        let value = self
            .request(BridgeCommand::Query {
                selector: locator.to_selector(),
                scope: Some(scope),
            })
            .await?;
        decode_value(value)
    }

    async fn text(&self, element: ElementId) -> E2eResult<String> {
        decode_value(self.request(BridgeCommand::Text { element }).await?)
    }

    async fn is_displayed(&self, element: ElementId) -> E2eResult<bool> {
        decode_value(self.request(BridgeCommand::Visible { element }).await?)
    }

    async fn click(&self, element: ElementId) -> E2eResult<()> {
        self.request(BridgeCommand::Click {
            element,
            timeout_ms: self.action_timeout.as_millis() as u64,
        })
        .await?;
        Ok(())
    }
}
