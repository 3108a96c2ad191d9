//! Progress UI (spinner) and terminal capability helpers.
//!
//! The spinner draws to stderr so stdout stays clean for the generated
//! code. Phases are pushed by the orchestrator; the steady tick keeps the
//! spinner moving through the long generation wait.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Spinner wrapper that turns into a no-op when progress UI is disabled.
pub struct ProgressReporter {
    spinner: Option<ProgressBar>,
}

impl ProgressReporter {
    /// Creates the reporter. When `enabled` is false every call is a no-op.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        if !enabled {
            return Self { spinner: None };
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));
        Self {
            spinner: Some(spinner),
        }
    }

    /// Updates the phase message shown next to the spinner.
    pub fn set_phase(&self, message: &str) {
        if let Some(spinner) = &self.spinner {
            spinner.set_message(message.to_string());
        }
    }

    /// Stops and clears the spinner.
    pub fn finish(&self) {
        if let Some(spinner) = &self.spinner {
            spinner.finish_and_clear();
        }
    }
}

/// Whether the spinner should run at all.
#[must_use]
pub fn should_use_spinner(stderr_is_terminal: bool, quiet: bool, dumb_terminal: bool) -> bool {
    stderr_is_terminal && !quiet && !dumb_terminal
}

#[must_use]
pub fn is_dumb_terminal() -> bool {
    std::env::var("TERM")
        .map(|value| value.eq_ignore_ascii_case("dumb"))
        .unwrap_or(false)
}

#[must_use]
pub fn no_color_env_requested() -> bool {
    std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty())
}

/// Whether ANSI color output should be disabled.
#[must_use]
pub fn should_disable_color(no_color_env: bool, dumb_terminal: bool) -> bool {
    no_color_env || dumb_terminal
}
