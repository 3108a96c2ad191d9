//! Failure classification and user-facing descriptors for run errors.
//!
//! Typed errors map directly to a descriptor; anything that reaches the
//! top as an opaque message goes through string classification instead.

use crate::auth::{CaptureError, JarError};
use crate::browser::BrowserError;
use crate::flow::FlowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FailureCategory {
    Auth,
    Browser,
    Generation,
    Extraction,
    Input,
    Other,
}

impl FailureCategory {
    #[must_use]
    pub fn icon(self) -> &'static str {
        match self {
            Self::Auth => "🔐",
            Self::Browser => "🌐",
            Self::Generation => "⏳",
            Self::Extraction => "📋",
            Self::Input => "❌",
            Self::Other => "⚠️",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Auth => "Authentication",
            Self::Browser => "Browser",
            Self::Generation => "Generation",
            Self::Extraction => "Extraction",
            Self::Input => "Input",
            Self::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureDescriptor {
    pub category: FailureCategory,
    pub what: &'static str,
    pub why: &'static str,
    pub fix: &'static str,
}

/// Process exit code for a failure category.
///
/// Input problems exit 2 (matching the argument parser's usage errors);
/// everything operational exits 1.
#[must_use]
pub fn exit_code_for(category: FailureCategory) -> i32 {
    match category {
        FailureCategory::Input => 2,
        _ => 1,
    }
}

/// Returns a descriptor for a top-level error, preferring typed
/// classification over message matching.
#[must_use]
pub fn describe_error(error: &anyhow::Error) -> FailureDescriptor {
    if let Some(flow_error) = error.downcast_ref::<FlowError>() {
        return descriptor_for_flow_error(flow_error);
    }
    if let Some(browser_error) = error.downcast_ref::<BrowserError>() {
        return descriptor_for_browser_error(browser_error);
    }
    if error.downcast_ref::<JarError>().is_some() {
        return jar_descriptor();
    }
    if error.downcast_ref::<CaptureError>().is_some() {
        return FailureDescriptor {
            category: FailureCategory::Input,
            what: "Cookie import could not be parsed",
            why: "The input was neither a valid Netscape cookie file nor a JSON cookie export.",
            fix: "Export cookies again from your browser extension and retry the import.",
        };
    }
    classify_failure(&format!("{error:#}"))
}

/// Maps a flow error onto a descriptor.
#[must_use]
pub fn descriptor_for_flow_error(error: &FlowError) -> FailureDescriptor {
    match error {
        FlowError::AuthRequired => FailureDescriptor {
            category: FailureCategory::Auth,
            what: "Sign-in required",
            why: "v0.dev needs a signed-in session and the cookie jar held nothing usable.",
            fix: "Run with --headful to sign in once, or import cookies with `v0gen auth import <file>`.",
        },
        FlowError::AuthTimeout { .. } => FailureDescriptor {
            category: FailureCategory::Auth,
            what: "Sign-in timed out",
            why: "The interactive GitHub sign-in did not finish before the deadline.",
            fix: "Rerun with --headful and complete the login promptly, or raise --auth-timeout.",
        },
        FlowError::SubmitFailed(_) => FailureDescriptor {
            category: FailureCategory::Generation,
            what: "Prompt submission failed",
            why: "The prompt composer could not be found or never acknowledged the prompt.",
            fix: "Rerun with -v and --dump-dir to capture the page state for inspection.",
        },
        FlowError::GenerationTimeout { .. } => FailureDescriptor {
            category: FailureCategory::Generation,
            what: "Generation timed out",
            why: "v0.dev did not report a finished generation before the deadline.",
            fix: "Raise --generation-timeout, or retry with a simpler prompt.",
        },
        FlowError::ExtractionFailed { .. } => FailureDescriptor {
            category: FailureCategory::Extraction,
            what: "No code captured",
            why: "Every extraction strategy (copy hook, clipboard read, DOM scrape) came back empty.",
            fix: "Rerun with --dump-dir to save the page HTML, then copy the code out manually.",
        },
        FlowError::Browser(browser_error) => descriptor_for_browser_error(browser_error),
        FlowError::Jar(_) => jar_descriptor(),
    }
}

fn descriptor_for_browser_error(error: &BrowserError) -> FailureDescriptor {
    match error {
        BrowserError::InvalidConnectTarget(_) => FailureDescriptor {
            category: FailureCategory::Input,
            what: "Unusable --connect value",
            why: "The value is neither a debugging port nor a ws:// URL.",
            fix: "Pass a port number (1-65535) or the full webSocketDebuggerUrl.",
        },
        BrowserError::Connect { .. } | BrowserError::MissingWebSocketUrl { .. } => {
            FailureDescriptor {
                category: FailureCategory::Browser,
                what: "Cannot attach to the browser",
                why: "The DevTools endpoint was unreachable or answered without a debugger URL.",
                fix: "Start the browser with --remote-debugging-port=<port>, or drop --connect to launch a managed one.",
            }
        }
        BrowserError::Config(_) | BrowserError::Launch(_) => FailureDescriptor {
            category: FailureCategory::Browser,
            what: "Browser launch failed",
            why: "No usable Chromium/Chrome could be started on this machine.",
            fix: "Install Chrome or Chromium, or attach to a running browser with --connect.",
        },
        BrowserError::NavigationTimeout { .. } => FailureDescriptor {
            category: FailureCategory::Browser,
            what: "Page load timed out",
            why: "v0.dev did not finish loading within the navigation timeout.",
            fix: "Check connectivity and retry; slow links may need a patient rerun.",
        },
        _ => FailureDescriptor {
            category: FailureCategory::Browser,
            what: "Browser command failed",
            why: "A DevTools command failed mid-run; the page or connection may have gone away.",
            fix: "Retry; if it persists, rerun with -vv to see which command fails.",
        },
    }
}

fn jar_descriptor() -> FailureDescriptor {
    FailureDescriptor {
        category: FailureCategory::Input,
        what: "Cookie jar unavailable",
        why: "The jar file could not be read or written.",
        fix: "Check permissions on the jar path (default: ~/.config/v0gen/cookies.json) or pass --cookie-file.",
    }
}

/// Classifies an error message string into a category and descriptor.
#[must_use]
pub fn classify_failure(error: &str) -> FailureDescriptor {
    let lowered = error.to_ascii_lowercase();

    if lowered.contains("sign-in") || lowered.contains("not signed in") {
        FailureDescriptor {
            category: FailureCategory::Auth,
            what: "Sign-in required",
            why: "v0.dev needs a signed-in session and the cookie jar held nothing usable.",
            fix: "Run with --headful to sign in once, or import cookies with `v0gen auth import <file>`.",
        }
    } else if lowered.contains("connect to browser")
        || lowered.contains("devtools")
        || lowered.contains("launch browser")
    {
        FailureDescriptor {
            category: FailureCategory::Browser,
            what: "Browser unavailable",
            why: "The browser could not be launched or attached to.",
            fix: "Install Chrome/Chromium, or start one with --remote-debugging-port and use --connect.",
        }
    } else if lowered.contains("generation did not complete") {
        FailureDescriptor {
            category: FailureCategory::Generation,
            what: "Generation timed out",
            why: "v0.dev did not report a finished generation before the deadline.",
            fix: "Raise --generation-timeout, or retry with a simpler prompt.",
        }
    } else if lowered.contains("extracted") || lowered.contains("clipboard") {
        FailureDescriptor {
            category: FailureCategory::Extraction,
            what: "No code captured",
            why: "The generated code never made it off the page.",
            fix: "Rerun with --dump-dir to save the page HTML, then copy the code out manually.",
        }
    } else if lowered.contains("cookie")
        || lowered.contains("invalid")
        || lowered.contains("config")
    {
        FailureDescriptor {
            category: FailureCategory::Input,
            what: "Input could not be used",
            why: "A file, flag, or config value could not be parsed or applied.",
            fix: "Check the reported value and rerun; `v0gen --help` lists accepted forms.",
        }
    } else {
        FailureDescriptor {
            category: FailureCategory::Other,
            what: "Unhandled failure",
            why: "The error did not match a known category and needs closer inspection.",
            fix: "Rerun with -vv for full logs; add --dump-dir to capture browser state.",
        }
    }
}

/// Renders a descriptor as indented report lines.
#[must_use]
pub fn render_failure_lines(descriptor: &FailureDescriptor, width: usize) -> Vec<String> {
    use crate::output::truncate_to_width;

    vec![
        truncate_to_width(
            &format!(
                "{} {}: {}",
                descriptor.category.icon(),
                descriptor.category.label(),
                descriptor.what
            ),
            width,
        ),
        truncate_to_width(&format!("  Why: {}", descriptor.why), width),
        truncate_to_width(&format!("  Fix: {}", descriptor.fix), width),
    ]
}
