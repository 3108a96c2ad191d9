//! Login-state detection and the interactive GitHub sign-in flow.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::auth::Jar;
use crate::browser::{Session, actions};
use crate::poll::{PollOutcome, PollPolicy, poll_until};

use super::FlowError;

/// Authentication state read off the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    /// The page shows a signed-in surface.
    SignedIn,
    /// The page offers a sign-in entrypoint.
    NeedsLogin,
    /// Neither marker was found.
    Unknown,
}

/// Probe order matters: v0.dev renders a composer for anonymous visitors
/// too, so a visible sign-in entrypoint wins over any composer sighting.
const LOGIN_PROBE_SCRIPT: &str = r#"(() => {
  const controls = Array.from(document.querySelectorAll('a[href], button'));
  const hasSignInText = controls.some((el) => {
    const text = (el.innerText || '').trim().toLowerCase();
    return text === 'sign in' || text === 'log in' || text === 'sign up';
  });
  const hasLoginLink = controls.some((el) =>
    (el.getAttribute('href') || '').includes('/login'));
  if (hasSignInText || hasLoginLink) return 'needs-login';
  const hasAccountMenu = !!document.querySelector(
    "[data-testid='user-menu'], [aria-label*='account' i], img[alt*='avatar' i]");
  const hasComposer = !!document.querySelector("textarea, [contenteditable='true']");
  if (hasAccountMenu || hasComposer) return 'signed-in';
  return 'unknown';
})()"#;

const SIGN_IN_SELECTORS: &[&str] = &[
    "a[href^='/login']",
    "a[href*='/login']",
    "[data-testid='sign-in']",
];

const SIGN_IN_TEXT_PATTERNS: &[&str] = &["sign in", "log in"];

const GITHUB_TEXT_PATTERNS: &[&str] = &[
    "continue with github",
    "sign in with github",
    "login with github",
];

/// Extra probes granted to a page that reports neither marker. v0.dev
/// renders client-side, so the first probe after navigation often lands
/// before either surface exists.
const UNKNOWN_GRACE_PROBES: u32 = 3;

/// Reads the login state off the session's current page.
///
/// # Errors
///
/// Returns [`FlowError`] when the probe script cannot be evaluated.
pub async fn detect_login_state(session: &Session) -> Result<LoginState, FlowError> {
    let page = session.page()?;
    let raw = actions::eval_string(page, LOGIN_PROBE_SCRIPT).await?;
    let state = parse_login_state(&raw);
    debug!(?state, "login probe");
    Ok(state)
}

/// Makes sure the session is signed in, driving the GitHub sign-in flow
/// when it is not.
///
/// After a confirmed sign-in the browser's cookies overwrite the jar so
/// the next run can skip this step.
///
/// # Errors
///
/// Returns [`FlowError::AuthRequired`] when sign-in is needed but the
/// browser is headless, and [`FlowError::AuthTimeout`] when the
/// interactive sign-in does not finish before the deadline.
#[instrument(level = "debug", skip(session, jar))]
pub async fn ensure_signed_in(
    session: &Session,
    jar: &mut Jar,
    headful: bool,
    policy: PollPolicy,
) -> Result<(), FlowError> {
    let mut state = detect_login_state(session).await?;
    let mut grace = UNKNOWN_GRACE_PROBES;
    while state == LoginState::Unknown && grace > 0 {
        sleep(policy.interval).await;
        state = detect_login_state(session).await?;
        grace -= 1;
    }

    if state == LoginState::SignedIn {
        debug!("already signed in");
        refresh_jar(session, jar).await?;
        return Ok(());
    }

    if !headful {
        return Err(FlowError::AuthRequired);
    }

    open_github_login(session, policy.interval).await?;
    info!("complete the sign-in in the browser window");

    let outcome = poll_until(policy, || async {
        match detect_login_state(session).await {
            Ok(LoginState::SignedIn) => Some(()),
            Ok(state) => {
                debug!(?state, "still waiting for sign-in");
                None
            }
            Err(error) => {
                // Expected mid-flow: OAuth redirects tear down the page
                // context while a probe is in flight.
                debug!(%error, "login probe failed during sign-in");
                None
            }
        }
    })
    .await;

    match outcome {
        PollOutcome::Completed { .. } => {
            info!("signed in");
            refresh_jar(session, jar).await?;
            Ok(())
        }
        PollOutcome::TimedOut { waited, .. } => Err(FlowError::AuthTimeout { waited }),
    }
}

/// Clicks through to the GitHub OAuth entrypoint. Every step is
/// best-effort; pages that already sit on the login screen skip ahead.
async fn open_github_login(session: &Session, settle: Duration) -> Result<(), FlowError> {
    let page = session.page()?;

    let mut entered = false;
    for &selector in SIGN_IN_SELECTORS {
        if actions::click_selector(page, selector).await? {
            entered = true;
            break;
        }
    }
    if !entered
        && let Some(label) =
            actions::click_by_text(page, "a, button", SIGN_IN_TEXT_PATTERNS).await?
    {
        debug!(%label, "clicked sign-in entrypoint");
        entered = true;
    }
    if !entered {
        debug!("no sign-in entrypoint found; page may already show the login form");
    }
    sleep(settle).await;

    if let Some(label) = actions::click_by_text(page, "a, button", GITHUB_TEXT_PATTERNS).await? {
        info!(%label, "opened GitHub sign-in");
    } else {
        warn!("could not find the GitHub sign-in button; continue manually in the window");
    }
    sleep(settle).await;

    Ok(())
}

/// Overwrites the jar with the browser's current cookies.
///
/// Called after a confirmed sign-in and again at the end of a successful
/// run, so rotated session cookies survive to the next invocation.
///
/// # Errors
///
/// Returns [`FlowError::Jar`] when the jar file cannot be written.
pub async fn refresh_jar(session: &Session, jar: &mut Jar) -> Result<(), FlowError> {
    let records = session.collect_cookies().await?;
    if records.is_empty() {
        debug!("browser returned no cookies; keeping jar as-is");
        return Ok(());
    }

    let count = records.len();
    jar.overwrite(records)?;
    info!(cookies = count, path = %jar.path.display(), "cookie jar updated");
    Ok(())
}

fn parse_login_state(raw: &str) -> LoginState {
    match raw {
        "signed-in" => LoginState::SignedIn,
        "needs-login" => LoginState::NeedsLogin,
        _ => LoginState::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_login_state_known_markers() {
        assert_eq!(parse_login_state("signed-in"), LoginState::SignedIn);
        assert_eq!(parse_login_state("needs-login"), LoginState::NeedsLogin);
    }

    #[test]
    fn test_parse_login_state_anything_else_is_unknown() {
        assert_eq!(parse_login_state(""), LoginState::Unknown);
        assert_eq!(parse_login_state("unknown"), LoginState::Unknown);
        assert_eq!(parse_login_state("SIGNED-IN"), LoginState::Unknown);
    }

    #[test]
    fn test_login_probe_checks_sign_in_before_composer() {
        let needs_login = LOGIN_PROBE_SCRIPT
            .find("'needs-login'")
            .unwrap_or(usize::MAX);
        let signed_in = LOGIN_PROBE_SCRIPT.find("'signed-in'").unwrap_or(0);
        assert!(
            needs_login < signed_in,
            "an anonymous page with a composer must not read as signed in"
        );
    }

    #[test]
    fn test_github_patterns_are_lowercase() {
        for pattern in GITHUB_TEXT_PATTERNS {
            assert_eq!(*pattern, pattern.to_ascii_lowercase());
            assert!(pattern.contains("github"));
        }
    }
}
