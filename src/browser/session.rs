//! Browser session lifecycle over the Chrome DevTools Protocol.
//!
//! A [`Session`] either launches a managed Chromium process or attaches to
//! an already-running browser through its debugging endpoint. Everything
//! higher up (login detection, prompt submission, extraction) talks to the
//! page through this one handle.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::network::{
    Cookie, CookieParam, CookieSameSite, TimeSinceEpoch,
};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Handler, Page};
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::auth::{CookieRecord, normalized_expiry};
use crate::poll::DEFAULT_NAVIGATION_TIMEOUT;

/// Errors from browser lifecycle and page commands.
#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    /// Browser launch configuration was rejected.
    #[error("failed to configure browser: {0}")]
    Config(String),

    /// The managed browser process failed to start.
    #[error("failed to launch browser: {0}")]
    Launch(chromiumoxide::error::CdpError),

    /// Attaching to an external browser failed.
    #[error("cannot connect to browser at {endpoint}: {reason}")]
    Connect {
        /// The endpoint that was contacted.
        endpoint: String,
        /// What went wrong.
        reason: String,
    },

    /// The DevTools version endpoint answered without a WebSocket URL.
    #[error("DevTools endpoint {url} did not report a webSocketDebuggerUrl")]
    MissingWebSocketUrl {
        /// The version URL that was queried.
        url: String,
    },

    /// The `--connect` argument was neither a port nor a ws:// URL.
    #[error("invalid connect target '{0}': use a debugging port or a ws:// URL")]
    InvalidConnectTarget(String),

    /// A navigation did not settle in time.
    #[error("{what} timed out after {}s", .timeout.as_secs())]
    NavigationTimeout {
        /// Description of the navigation that timed out.
        what: String,
        /// The deadline that was exceeded.
        timeout: Duration,
    },

    /// A CDP command failed.
    #[error("browser command failed: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    /// A script result could not be converted to the expected type.
    #[error("unexpected script result: {0}")]
    Evaluate(#[source] serde_json::Error),

    /// A synthesized input event could not be built.
    #[error("failed to build input event: {0}")]
    InputEvent(String),

    /// An operation needed a page but none is open.
    #[error("no page is open")]
    NoPage,

    /// Writing a diagnostic artifact failed.
    #[error("failed to write {}: {source}", .path.display())]
    Artifact {
        /// Destination path of the artifact.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Where to find the browser for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectTarget {
    /// A local DevTools debugging port; the WebSocket URL is discovered
    /// through `http://127.0.0.1:<port>/json/version`.
    Port(u16),
    /// A full WebSocket debugger URL, used as-is.
    WebSocket(String),
}

impl ConnectTarget {
    /// Parses a `--connect` argument: a port number or a `ws://`/`wss://` URL.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::InvalidConnectTarget`] for anything else.
    pub fn parse(raw: &str) -> Result<Self, BrowserError> {
        let trimmed = raw.trim();
        if trimmed.starts_with("ws://") || trimmed.starts_with("wss://") {
            return Ok(Self::WebSocket(trimmed.to_string()));
        }
        if let Ok(port) = trimmed.parse::<u16>()
            && port > 0
        {
            return Ok(Self::Port(port));
        }
        Err(BrowserError::InvalidConnectTarget(raw.to_string()))
    }

    /// Resolves the target to a WebSocket debugger URL.
    async fn websocket_url(&self) -> Result<String, BrowserError> {
        match self {
            Self::WebSocket(url) => Ok(url.clone()),
            Self::Port(port) => discover_websocket_url(&format!("http://127.0.0.1:{port}")).await,
        }
    }
}

/// Options controlling how a [`Session`] is established.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Show the browser window instead of running headless.
    pub headful: bool,
    /// Attach to an existing browser instead of launching one.
    pub connect: Option<ConnectTarget>,
    /// Deadline for individual page navigations.
    pub navigation_timeout: Duration,
    /// Persistent browser profile directory, when one should be reused.
    pub user_data_dir: Option<PathBuf>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            headful: false,
            connect: None,
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            user_data_dir: None,
        }
    }
}

/// An active browser session with at most one page.
pub struct Session {
    browser: Browser,
    page: Option<Page>,
    handler_task: JoinHandle<()>,
    navigation_timeout: Duration,
    launched: bool,
}

impl Session {
    /// Starts a session per the options: attach when a connect target is
    /// set, otherwise launch a managed browser.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError`] when the browser cannot be launched or the
    /// connect target cannot be reached.
    pub async fn start(options: &SessionOptions) -> Result<Self, BrowserError> {
        match &options.connect {
            Some(target) => Self::connect(target, options).await,
            None => Self::launch(options).await,
        }
    }

    #[instrument(level = "debug", skip(options))]
    async fn launch(options: &SessionOptions) -> Result<Self, BrowserError> {
        let mut builder = BrowserConfig::builder().viewport(None);
        if options.headful {
            builder = builder.with_head();
        }
        if let Some(dir) = &options.user_data_dir {
            builder = builder.user_data_dir(dir);
        }
        let config = builder.build().map_err(BrowserError::Config)?;

        let (browser, handler) = Browser::launch(config).await.map_err(BrowserError::Launch)?;
        info!(headful = options.headful, "launched browser");

        Ok(Self {
            browser,
            page: None,
            handler_task: spawn_handler(handler),
            navigation_timeout: options.navigation_timeout,
            launched: true,
        })
    }

    #[instrument(level = "debug", skip(options))]
    async fn connect(target: &ConnectTarget, options: &SessionOptions) -> Result<Self, BrowserError> {
        let ws_url = target.websocket_url().await?;
        let (browser, handler) =
            Browser::connect(ws_url.clone())
                .await
                .map_err(|error| BrowserError::Connect {
                    endpoint: ws_url.clone(),
                    reason: error.to_string(),
                })?;
        info!(endpoint = %ws_url, "attached to existing browser");

        Ok(Self {
            browser,
            page: None,
            handler_task: spawn_handler(handler),
            navigation_timeout: options.navigation_timeout,
            launched: false,
        })
    }

    /// The session's page.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::NoPage`] before the first [`Session::open`].
    pub fn page(&self) -> Result<&Page, BrowserError> {
        self.page.as_ref().ok_or(BrowserError::NoPage)
    }

    /// Opens `url` in the session's page, creating the page on first use,
    /// and waits for the navigation to settle.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::NavigationTimeout`] when the load does not
    /// finish within the configured navigation timeout.
    #[instrument(level = "debug", skip(self))]
    pub async fn open(&mut self, url: &str) -> Result<(), BrowserError> {
        let deadline = self.navigation_timeout;
        let navigate = async {
            if let Some(page) = &self.page {
                page.goto(url).await?;
                page.wait_for_navigation().await?;
            } else {
                let page = self.browser.new_page(url).await?;
                page.wait_for_navigation().await?;
                self.page = Some(page);
            }
            Ok::<(), BrowserError>(())
        };

        match tokio::time::timeout(deadline, navigate).await {
            Ok(result) => result,
            Err(_elapsed) => Err(BrowserError::NavigationTimeout {
                what: format!("navigation to {url}"),
                timeout: deadline,
            }),
        }
    }

    /// Reloads the current page, e.g. to pick up freshly applied cookies.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError`] when no page is open or the reload times
    /// out.
    pub async fn reload(&self) -> Result<(), BrowserError> {
        let deadline = self.navigation_timeout;
        let page = self.page()?;
        let reload = async {
            page.reload().await?;
            Ok::<(), BrowserError>(())
        };

        match tokio::time::timeout(deadline, reload).await {
            Ok(result) => result,
            Err(_elapsed) => Err(BrowserError::NavigationTimeout {
                what: "page reload".to_string(),
                timeout: deadline,
            }),
        }
    }

    /// Pushes jar cookies into the browser's cookie store.
    ///
    /// Records the browser rejects are skipped with a warning; returns how
    /// many were applied.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError`] when no page is open or the CDP call fails.
    #[instrument(level = "debug", skip(self, records), fields(count = records.len()))]
    pub async fn apply_cookies(&self, records: &[CookieRecord]) -> Result<usize, BrowserError> {
        let page = self.page()?;

        let mut params = Vec::with_capacity(records.len());
        for record in records {
            match cookie_param_from_record(record) {
                Ok(param) => params.push(param),
                Err(reason) => {
                    warn!(name = %record.name, domain = %record.domain, %reason, "skipping cookie");
                }
            }
        }

        if params.is_empty() {
            return Ok(0);
        }

        let applied = params.len();
        page.set_cookies(params).await?;
        debug!(applied, "cookies applied");
        Ok(applied)
    }

    /// Reads the browser's current cookies back as jar records.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError`] when no page is open or the CDP call fails.
    pub async fn collect_cookies(&self) -> Result<Vec<CookieRecord>, BrowserError> {
        let page = self.page()?;
        let cookies = page.get_cookies().await?;
        Ok(cookies.into_iter().map(record_from_cookie).collect())
    }

    /// Captures a full-page PNG screenshot to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Artifact`] when the file cannot be written.
    pub async fn screenshot(&self, path: &Path) -> Result<(), BrowserError> {
        let page = self.page()?;
        let bytes = page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(true)
                    .build(),
            )
            .await?;
        tokio::fs::write(path, &bytes)
            .await
            .map_err(|source| BrowserError::Artifact {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Writes the page's current HTML to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Artifact`] when the file cannot be written.
    pub async fn dump_html(&self, path: &Path) -> Result<(), BrowserError> {
        let page = self.page()?;
        let html = page.content().await?;
        tokio::fs::write(path, html)
            .await
            .map_err(|source| BrowserError::Artifact {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Closes the page and tears the session down.
    ///
    /// Launched browsers exit with the dropped connection; an attached
    /// browser keeps running, only our page is closed.
    pub async fn close(mut self) {
        if let Some(page) = self.page.take() {
            if let Err(error) = page.close().await {
                debug!(%error, "failed to close page");
            }
        }
        self.handler_task.abort();
        if self.launched {
            debug!("shutting down launched browser");
        } else {
            debug!("detaching from external browser");
        }
        drop(self.browser);
    }
}

/// Drains CDP events; the connection stalls without a running handler.
fn spawn_handler(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(_event) = handler.next().await {}
    })
}

/// Asks a DevTools HTTP endpoint for its browser WebSocket URL.
///
/// # Errors
///
/// Returns [`BrowserError::Connect`] when the endpoint is unreachable or
/// answers garbage, and [`BrowserError::MissingWebSocketUrl`] when the
/// version payload lacks the URL.
#[instrument(level = "debug")]
pub async fn discover_websocket_url(base_url: &str) -> Result<String, BrowserError> {
    let version_url = format!("{}/json/version", base_url.trim_end_matches('/'));

    let client = reqwest::Client::builder()
        .no_proxy()
        .build()
        .map_err(|error| BrowserError::Connect {
            endpoint: version_url.clone(),
            reason: error.to_string(),
        })?;

    let response = client
        .get(&version_url)
        .send()
        .await
        .map_err(|error| BrowserError::Connect {
            endpoint: version_url.clone(),
            reason: format!(
                "cannot reach DevTools endpoint (is the browser running with \
                 --remote-debugging-port?): {error}"
            ),
        })?;

    let version_info: serde_json::Value =
        response.json().await.map_err(|error| BrowserError::Connect {
            endpoint: version_url.clone(),
            reason: format!("invalid response from DevTools endpoint: {error}"),
        })?;

    version_info
        .get("webSocketDebuggerUrl")
        .and_then(|value| value.as_str())
        .map(ToString::to_string)
        .ok_or(BrowserError::MissingWebSocketUrl { url: version_url })
}

/// Converts a jar record into a CDP cookie parameter.
#[allow(clippy::cast_precision_loss)]
fn cookie_param_from_record(record: &CookieRecord) -> Result<CookieParam, String> {
    let mut builder = CookieParam::builder()
        .name(record.name.clone())
        .value(record.value().to_string())
        .domain(record.domain.clone())
        .path(record.path.clone())
        .secure(record.secure)
        .http_only(record.http_only);

    if record.expires > 0 {
        builder = builder.expires(TimeSinceEpoch::new(record.expires as f64));
    }
    if let Some(label) = record.same_site.as_deref()
        && let Some(same_site) = same_site_from_label(label)
    {
        builder = builder.same_site(same_site);
    }

    builder.build()
}

/// Converts a CDP cookie into a jar record.
fn record_from_cookie(cookie: Cookie) -> CookieRecord {
    let expires = cookie_expiry(cookie.session, cookie.expires);
    let same_site = cookie
        .same_site
        .as_ref()
        .map(|value| same_site_label(value).to_string());

    CookieRecord::new(
        cookie.name,
        cookie.value,
        cookie.domain,
        cookie.path,
        expires,
        cookie.secure,
        cookie.http_only,
        same_site,
    )
}

fn cookie_expiry(session_cookie: bool, raw_expires: f64) -> u64 {
    if session_cookie {
        0
    } else {
        normalized_expiry(raw_expires)
    }
}

fn same_site_from_label(label: &str) -> Option<CookieSameSite> {
    match label {
        "strict" => Some(CookieSameSite::Strict),
        "lax" => Some(CookieSameSite::Lax),
        "none" => Some(CookieSameSite::None),
        _ => None,
    }
}

fn same_site_label(same_site: &CookieSameSite) -> &'static str {
    match same_site {
        CookieSameSite::Strict => "strict",
        CookieSameSite::Lax => "lax",
        CookieSameSite::None => "none",
    }
}
