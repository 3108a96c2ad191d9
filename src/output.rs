//! Output shaping: fence stripping, result delivery, display helpers.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::info;

/// Message when no prompt was provided at all.
pub const NO_PROMPT_GUIDANCE: &str =
    "No prompt provided. Pass a prompt argument or pipe one via stdin.";

/// Example for passing the prompt as an argument.
pub const PROMPT_ARG_EXAMPLE: &str = "Example: v0gen \"a pricing page with three tiers\"";

/// Example for piping the prompt.
pub const PROMPT_PIPE_EXAMPLE: &str = "Example: echo 'a login form' | v0gen --theme dark";

/// Matches a capture that is one whole fenced code block, with an optional
/// language tag on the opening fence.
#[allow(clippy::expect_used)]
static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\A```([A-Za-z0-9][A-Za-z0-9+#._-]*)?[ \t]*\r?\n(.*?)\r?\n?[ \t]*```\z")
        .expect("code fence regex is valid") // Static pattern, safe to panic
});

/// Strips an enclosing Markdown code fence from a capture.
///
/// Returns the body plus the opening fence's language tag when one was
/// present. Captures that are not a single fenced block pass through
/// trimmed; fences inside the body stay untouched.
#[must_use]
pub fn strip_code_fences(raw: &str) -> (String, Option<String>) {
    let trimmed = raw.trim();
    if let Some(captures) = FENCED_BLOCK.captures(trimmed) {
        let language = captures
            .get(1)
            .map(|tag| tag.as_str().to_ascii_lowercase())
            .filter(|tag| !tag.is_empty());
        let body = captures.get(2).map_or("", |body| body.as_str());
        return (body.to_string(), language);
    }
    (trimmed.to_string(), None)
}

/// Delivers the generated code: to `destination` when given, otherwise to
/// stdout.
///
/// # Errors
///
/// Returns an error when the destination file cannot be written.
pub fn write_output(code: &str, destination: Option<&Path>) -> Result<()> {
    match destination {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            let mut body = code.to_string();
            if !body.ends_with('\n') {
                body.push('\n');
            }
            std::fs::write(path, body)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "generated code written");
        }
        None => {
            println!("{code}");
        }
    }
    Ok(())
}

/// Prints quick-start guidance to stderr when no prompt was provided.
/// stdout stays reserved for generated code.
pub fn print_prompt_guidance() {
    let width = terminal_width().min(80);
    for line in [NO_PROMPT_GUIDANCE, PROMPT_ARG_EXAMPLE, PROMPT_PIPE_EXAMPLE] {
        eprintln!("{}", truncate_to_width(line, width));
    }
}

/// Returns terminal width from COLUMNS, or 80 if unset/invalid.
#[must_use]
pub fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|width| *width >= 20)
        .unwrap_or(80)
}

/// Truncates text to at most `width` chars, appending ellipsis if truncated.
#[must_use]
pub fn truncate_to_width(text: &str, width: usize) -> String {
    let text_len = text.chars().count();
    if text_len <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    if width == 1 {
        return "…".to_string();
    }

    let mut output: String = text.chars().take(width - 1).collect();
    output.push('…');
    output
}
