//! The v0.dev drive: login detection, prompt submission, generation
//! polling, and code extraction.

mod extract;
mod generate;
mod login;

use std::time::Duration;

use crate::auth::JarError;
use crate::browser::BrowserError;

pub use extract::{
    ExtractedCode, ExtractionStrategy, default_strategies, extract_generated_code,
    run_strategy_chain,
};
pub use generate::{GenerationProbe, await_generation, submit_prompt};
pub use login::{LoginState, detect_login_state, ensure_signed_in, refresh_jar};

/// Where a generation run starts when no other target is configured.
pub const DEFAULT_TARGET_URL: &str = "https://v0.dev/";

/// Errors from the end-to-end generation flow.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// Not signed in and no way to become signed in this run.
    #[error(
        "not signed in to v0.dev; run with --headful to sign in interactively, \
         or import browser cookies with `v0gen auth import`"
    )]
    AuthRequired,

    /// Interactive sign-in did not finish before the deadline.
    #[error("sign-in did not complete within {}s", .waited.as_secs())]
    AuthTimeout {
        /// How long the flow waited.
        waited: Duration,
    },

    /// The prompt could not be handed to the page.
    #[error("failed to submit prompt: {0}")]
    SubmitFailed(String),

    /// Generation never reached the completed state.
    #[error(
        "generation did not complete within {}s ({attempts} checks)",
        .waited.as_secs()
    )]
    GenerationTimeout {
        /// How long the flow waited.
        waited: Duration,
        /// Number of probes performed.
        attempts: u32,
    },

    /// Every extraction strategy came back empty.
    #[error("no generated code could be extracted after {attempts} attempts")]
    ExtractionFailed {
        /// Total attempts across all strategies.
        attempts: u32,
    },

    /// A browser operation failed underneath the flow.
    #[error(transparent)]
    Browser(#[from] BrowserError),

    /// The cookie jar could not be updated.
    #[error("failed to update cookie jar: {0}")]
    Jar(#[from] JarError),
}
