//! Prompt submission and generation polling.

use std::time::Duration;

use chromiumoxide::Page;
use tokio::time::sleep;
use tracing::{debug, info, instrument};

use crate::browser::Session;
use crate::browser::actions::{self, js_string};
use crate::poll::{PollOutcome, PollPolicy, poll_until};

use super::FlowError;

/// What the generation probe saw on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationProbe {
    /// No sign of generation yet.
    Pending,
    /// The page shows an in-progress marker.
    Generating,
    /// A result surface (code block or copy control) is present.
    Complete,
}

/// Composer candidates, most specific first. The bare `textarea` fallback
/// keeps the flow alive when v0.dev reshuffles its attributes.
const COMPOSER_SELECTORS: &[&str] = &[
    "textarea[placeholder*='describe' i]",
    "[data-testid='prompt-input'] textarea",
    "form textarea",
    "[contenteditable='true'][role='textbox']",
    "textarea",
];

const SUBMIT_TEXT_PATTERNS: &[&str] = &["send", "submit", "generate"];

/// Pause after a submit action before checking whether it took.
const SUBMIT_SETTLE: Duration = Duration::from_secs(1);

/// An in-progress marker beats any result marker: v0.dev streams code into
/// `pre code` blocks while still generating.
const GENERATION_PROBE_SCRIPT: &str = r#"(() => {
  const stopButton = document.querySelector(
    "button[aria-label*='stop' i], [data-testid*='stop' i]");
  const stopText = Array.from(document.querySelectorAll('button')).some((el) =>
    (el.innerText || '').trim().toLowerCase().includes('stop generating'));
  if (stopButton || stopText) return 'generating';
  const codeBlock = document.querySelector('pre code');
  const copyButton = document.querySelector(
    "button[aria-label*='copy' i], [data-testid*='copy' i]");
  if (codeBlock || copyButton) return 'complete';
  return 'pending';
})()"#;

/// Types the prompt into the composer and submits it.
///
/// Enter is tried first; when the composer neither clears nor a busy
/// marker appears, a submit button is clicked as fallback.
///
/// # Errors
///
/// Returns [`FlowError::SubmitFailed`] when no composer can be found or
/// the page never acknowledges the submission.
#[instrument(level = "debug", skip(session, prompt), fields(chars = prompt.len()))]
pub async fn submit_prompt(session: &Session, prompt: &str) -> Result<(), FlowError> {
    let page = session.page()?;

    let mut composer = None;
    for &selector in COMPOSER_SELECTORS {
        if actions::type_into(page, selector, prompt).await? {
            composer = Some(selector);
            break;
        }
    }
    let Some(selector) = composer else {
        return Err(FlowError::SubmitFailed(
            "could not find the prompt composer on the page".to_string(),
        ));
    };
    debug!(selector, "prompt typed");

    actions::press_enter(page).await?;
    sleep(SUBMIT_SETTLE).await;
    if submission_accepted(page, selector).await? {
        info!("prompt submitted");
        return Ok(());
    }

    // Enter alone does not always submit in the composer.
    let clicked = actions::click_selector(page, "button[type='submit']").await?
        || actions::click_by_text(page, "button", SUBMIT_TEXT_PATTERNS)
            .await?
            .is_some();
    if clicked {
        sleep(SUBMIT_SETTLE).await;
        if submission_accepted(page, selector).await? {
            info!("prompt submitted via submit button");
            return Ok(());
        }
    }

    Err(FlowError::SubmitFailed(
        "composer did not clear and no generation marker appeared".to_string(),
    ))
}

/// Waits until the page reports a finished generation.
///
/// # Errors
///
/// Returns [`FlowError::GenerationTimeout`] when the deadline passes
/// first.
#[instrument(level = "debug", skip(session))]
pub async fn await_generation(session: &Session, policy: PollPolicy) -> Result<(), FlowError> {
    let outcome = poll_until(policy, || async {
        match probe_generation(session).await {
            Ok(GenerationProbe::Complete) => Some(()),
            Ok(state) => {
                debug!(?state, "generation in progress");
                None
            }
            Err(error) => {
                debug!(%error, "generation probe failed");
                None
            }
        }
    })
    .await;

    match outcome {
        PollOutcome::Completed { attempts, .. } => {
            debug!(attempts, "generation complete");
            Ok(())
        }
        PollOutcome::TimedOut { attempts, waited } => {
            Err(FlowError::GenerationTimeout { waited, attempts })
        }
    }
}

async fn probe_generation(session: &Session) -> Result<GenerationProbe, FlowError> {
    let page = session.page()?;
    let raw = actions::eval_string(page, GENERATION_PROBE_SCRIPT).await?;
    Ok(parse_generation_probe(&raw))
}

/// Whether the page acknowledged the submission: the composer cleared, a
/// busy marker appeared, or the page navigated away from the composer.
async fn submission_accepted(page: &Page, selector: &str) -> Result<bool, FlowError> {
    let script = submission_probe_script(selector);
    match actions::eval_bool(page, &script).await {
        Ok(accepted) => Ok(accepted),
        Err(error) => {
            // Submission usually navigates to the generation view, which
            // tears down the evaluation context mid-probe.
            debug!(%error, "submission probe lost the page; treating as submitted");
            Ok(true)
        }
    }
}

fn submission_probe_script(selector: &str) -> String {
    let selector_json = js_string(selector);
    format!(
        r#"(() => {{
  const busy = !!document.querySelector(
    "button[aria-label*='stop' i], [data-testid*='stop' i]");
  if (busy) return true;
  const composer = document.querySelector({selector_json});
  if (!composer) return true;
  const content = composer.value !== undefined ? composer.value : (composer.innerText || '');
  return content.trim() === '';
}})()"#
    )
}

fn parse_generation_probe(raw: &str) -> GenerationProbe {
    match raw {
        "generating" => GenerationProbe::Generating,
        "complete" => GenerationProbe::Complete,
        _ => GenerationProbe::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generation_probe_known_markers() {
        assert_eq!(parse_generation_probe("generating"), GenerationProbe::Generating);
        assert_eq!(parse_generation_probe("complete"), GenerationProbe::Complete);
        assert_eq!(parse_generation_probe("pending"), GenerationProbe::Pending);
    }

    #[test]
    fn test_parse_generation_probe_anything_else_is_pending() {
        assert_eq!(parse_generation_probe(""), GenerationProbe::Pending);
        assert_eq!(parse_generation_probe("COMPLETE"), GenerationProbe::Pending);
    }

    #[test]
    fn test_generation_probe_checks_busy_before_result() {
        let generating = GENERATION_PROBE_SCRIPT
            .find("'generating'")
            .unwrap_or(usize::MAX);
        let complete = GENERATION_PROBE_SCRIPT.find("'complete'").unwrap_or(0);
        assert!(
            generating < complete,
            "streamed partial code must not read as a finished generation"
        );
    }

    #[test]
    fn test_composer_selectors_end_with_generic_fallback() {
        assert_eq!(COMPOSER_SELECTORS.last(), Some(&"textarea"));
        assert!(COMPOSER_SELECTORS.len() > 1);
    }

    #[test]
    fn test_submission_probe_script_embeds_selector() {
        let script = submission_probe_script("form textarea");
        assert!(script.contains("\"form textarea\""));
        assert!(script.contains("return true"));
    }
}
