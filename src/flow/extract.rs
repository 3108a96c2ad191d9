//! Generated-code extraction strategies.
//!
//! Three strategies run in order, each with a bounded number of attempts:
//! hook clipboard writes and click the copy button, read the clipboard
//! directly after clicking, then scrape the largest code block out of the
//! DOM. The first non-empty capture wins. The DOM scrape at the end keeps
//! extraction working when the page never gets clipboard permission.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use crate::browser::{Session, actions};
use crate::poll::{DEFAULT_STRATEGY_ATTEMPTS, DEFAULT_STRATEGY_DELAY};

use super::FlowError;

/// Code captured from the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedCode {
    /// The generated code, fences stripped.
    pub code: String,
    /// Language tag from the opening fence, when the capture carried one.
    pub language: Option<String>,
    /// Name of the strategy that captured the code.
    pub strategy: &'static str,
}

impl ExtractedCode {
    fn from_capture(raw: &str, strategy: &'static str) -> Self {
        let (code, language) = crate::output::strip_code_fences(raw);
        Self {
            code,
            language,
            strategy,
        }
    }
}

/// A way of getting the generated code out of the page.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    /// Short name for logs and the final report.
    fn name(&self) -> &'static str;

    /// One capture attempt. `Ok(None)` means nothing yet, try again.
    async fn attempt(&self) -> Result<Option<String>, FlowError>;
}

/// Pause between triggering a copy and reading what it produced.
const CAPTURE_SETTLE: Duration = Duration::from_millis(500);

const COPY_BUTTON_SELECTORS: &[&str] = &[
    "button[aria-label*='copy' i]",
    "[data-testid*='copy' i]",
];

const COPY_TEXT_PATTERNS: &[&str] = &["copy code", "copy"];

/// Replaces `navigator.clipboard.writeText` and listens for `copy` events,
/// stashing whatever the page tries to put on the clipboard. Idempotent so
/// repeated attempts do not stack wrappers.
const INSTALL_CLIPBOARD_HOOK_SCRIPT: &str = r#"(() => {
  if (window.__v0CaptureInstalled) return true;
  window.__v0Captured = null;
  const stash = (text) => {
    if (text && String(text).trim()) window.__v0Captured = String(text);
  };
  if (navigator.clipboard && navigator.clipboard.writeText) {
    const original = navigator.clipboard.writeText.bind(navigator.clipboard);
    navigator.clipboard.writeText = (text) => {
      stash(text);
      return original(text).catch(() => {});
    };
  }
  document.addEventListener('copy', (event) => {
    try {
      const data = event.clipboardData && event.clipboardData.getData('text/plain');
      stash(data || (window.getSelection ? String(window.getSelection()) : ''));
    } catch (err) {}
  }, true);
  window.__v0CaptureInstalled = true;
  return true;
})()"#;

const READ_HOOK_STASH_SCRIPT: &str = r#"(() => {
  const captured = window.__v0Captured;
  window.__v0Captured = null;
  return captured || null;
})()"#;

/// Clipboard reads are promise-based; the promise resolves into a window
/// global that a later evaluation picks up.
const KICK_CLIPBOARD_READ_SCRIPT: &str = r#"(() => {
  window.__v0ClipboardText = null;
  if (!navigator.clipboard || !navigator.clipboard.readText) return false;
  navigator.clipboard.readText()
    .then((text) => { window.__v0ClipboardText = text || ''; })
    .catch(() => { window.__v0ClipboardText = ''; });
  return true;
})()"#;

const READ_CLIPBOARD_STASH_SCRIPT: &str = r#"(() => {
  const text = window.__v0ClipboardText;
  return text && text.trim() ? text : null;
})()"#;

const SCRAPE_CODE_BLOCK_SCRIPT: &str = r#"(() => {
  const blocks = Array.from(document.querySelectorAll('pre code, pre'));
  let best = '';
  for (const block of blocks) {
    const text = block.innerText || block.textContent || '';
    if (text.length > best.length) best = text;
  }
  return best.trim() ? best : null;
})()"#;

struct CopyButtonStrategy<'a> {
    session: &'a Session,
}

#[async_trait]
impl ExtractionStrategy for CopyButtonStrategy<'_> {
    fn name(&self) -> &'static str {
        "copy-hook"
    }

    async fn attempt(&self) -> Result<Option<String>, FlowError> {
        let page = self.session.page()?;
        actions::eval_bool(page, INSTALL_CLIPBOARD_HOOK_SCRIPT).await?;
        if !click_copy_button(self.session).await? {
            debug!("no copy button to click");
            return Ok(None);
        }
        sleep(CAPTURE_SETTLE).await;
        Ok(actions::eval_optional_string(page, READ_HOOK_STASH_SCRIPT).await?)
    }
}

struct ClipboardReadStrategy<'a> {
    session: &'a Session,
}

#[async_trait]
impl ExtractionStrategy for ClipboardReadStrategy<'_> {
    fn name(&self) -> &'static str {
        "clipboard-read"
    }

    async fn attempt(&self) -> Result<Option<String>, FlowError> {
        let page = self.session.page()?;
        click_copy_button(self.session).await?;
        if !actions::eval_bool(page, KICK_CLIPBOARD_READ_SCRIPT).await? {
            debug!("clipboard read API unavailable");
            return Ok(None);
        }
        sleep(CAPTURE_SETTLE).await;
        Ok(actions::eval_optional_string(page, READ_CLIPBOARD_STASH_SCRIPT).await?)
    }
}

struct CodeBlockStrategy<'a> {
    session: &'a Session,
}

#[async_trait]
impl ExtractionStrategy for CodeBlockStrategy<'_> {
    fn name(&self) -> &'static str {
        "code-block"
    }

    async fn attempt(&self) -> Result<Option<String>, FlowError> {
        let page = self.session.page()?;
        Ok(actions::eval_optional_string(page, SCRAPE_CODE_BLOCK_SCRIPT).await?)
    }
}

async fn click_copy_button(session: &Session) -> Result<bool, FlowError> {
    let page = session.page()?;
    for &selector in COPY_BUTTON_SELECTORS {
        if actions::click_selector(page, selector).await? {
            return Ok(true);
        }
    }
    Ok(actions::click_by_text(page, "button", COPY_TEXT_PATTERNS)
        .await?
        .is_some())
}

/// The built-in strategy order for a session.
#[must_use]
pub fn default_strategies(session: &Session) -> Vec<Box<dyn ExtractionStrategy + '_>> {
    vec![
        Box::new(CopyButtonStrategy { session }),
        Box::new(ClipboardReadStrategy { session }),
        Box::new(CodeBlockStrategy { session }),
    ]
}

/// Runs the default strategy chain against the session's page.
///
/// # Errors
///
/// Returns [`FlowError::ExtractionFailed`] when every strategy comes back
/// empty.
pub async fn extract_generated_code(session: &Session) -> Result<ExtractedCode, FlowError> {
    let strategies = default_strategies(session);
    run_strategy_chain(&strategies, DEFAULT_STRATEGY_ATTEMPTS, DEFAULT_STRATEGY_DELAY).await
}

/// Runs `strategies` in order, giving each up to `attempts` tries with
/// `delay` between tries. The first non-empty capture wins; a strategy
/// error moves on to the next attempt instead of aborting the chain.
///
/// # Errors
///
/// Returns [`FlowError::ExtractionFailed`] when nothing was captured.
#[instrument(level = "debug", skip(strategies))]
pub async fn run_strategy_chain<'a>(
    strategies: &[Box<dyn ExtractionStrategy + 'a>],
    attempts: u32,
    delay: Duration,
) -> Result<ExtractedCode, FlowError> {
    let mut total_attempts = 0;

    for strategy in strategies {
        for attempt in 1..=attempts {
            total_attempts += 1;
            match strategy.attempt().await {
                Ok(Some(raw)) if !raw.trim().is_empty() => {
                    debug!(strategy = strategy.name(), attempt, "captured code");
                    return Ok(ExtractedCode::from_capture(&raw, strategy.name()));
                }
                Ok(_) => {
                    debug!(strategy = strategy.name(), attempt, "nothing captured");
                }
                Err(error) => {
                    warn!(
                        strategy = strategy.name(),
                        attempt,
                        %error,
                        "extraction attempt failed"
                    );
                }
            }
            if attempt < attempts {
                sleep(delay).await;
            }
        }
    }

    Err(FlowError::ExtractionFailed {
        attempts: total_attempts,
    })
}
