//! v0gen Core Library
//!
//! This library provides the core functionality for the v0gen tool, which
//! drives a real browser to v0.dev, signs in through GitHub when needed,
//! submits a themed prompt, waits for the AI-generated UI code, and pulls
//! that code off the clipboard.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`auth`] - Cookie jar persistence and browser cookie-export import
//! - [`browser`] - CDP session management and DOM action helpers
//! - [`flow`] - Login detection, prompt submission, generation wait, extraction
//! - [`poll`] - Fixed-interval polling with hard deadlines
//! - [`prompt`] - Theme presets and prompt assembly
//! - [`config`] - File configuration and CLI precedence
//! - [`output`] - Code fence stripping and result writing
//! - [`progress`] - Spinner UI and terminal capability helpers
//! - [`failure`] - Failure classification for CLI reporting

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod browser;
pub mod config;
pub mod failure;
pub mod flow;
pub mod output;
pub mod poll;
pub mod progress;
pub mod prompt;

// Re-export commonly used types
pub use auth::{
    CapturedCookieFormat, CookieRecord, Jar, JarError, default_jar_path, expiry_label,
    parse_captured_cookies, unique_domain_count,
};
pub use browser::{BrowserError, ConnectTarget, Session, SessionOptions};
pub use flow::{
    DEFAULT_TARGET_URL, ExtractedCode, FlowError, GenerationProbe, LoginState, await_generation,
    detect_login_state, ensure_signed_in, extract_generated_code, refresh_jar, submit_prompt,
};
pub use poll::{PollOutcome, PollPolicy};
pub use prompt::{Theme, build_prompt, theme_by_name, themes};
