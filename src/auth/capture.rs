//! Browser cookie-export parsing and validation.
//!
//! Seeds the jar from the common export formats so a login done in a
//! regular browser can be reused here without an interactive sign-in:
//! - Netscape HTTP Cookie File format (`cookies.txt` extensions)
//! - JSON cookie exports (array or `{ "cookies": [...] }`)

use std::collections::HashSet;
use std::io::BufRead;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{CookieRecord, normalized_expiry};

/// Cookie payload format detected during import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturedCookieFormat {
    /// Netscape HTTP Cookie File format.
    Netscape,
    /// JSON export format.
    Json,
}

/// Parsed and validated cookies captured from user input.
#[derive(Debug)]
pub struct CapturedCookies {
    /// Valid cookies after format parsing and validation.
    pub cookies: Vec<CookieRecord>,
    /// Non-fatal warnings encountered while parsing/validating.
    pub warnings: Vec<String>,
    /// Input format that was parsed.
    pub format: CapturedCookieFormat,
}

/// Errors that can occur while parsing a Netscape cookie file.
#[derive(Debug, thiserror::Error)]
pub enum CookieError {
    /// A line in the cookie file has an invalid format.
    #[error("line {line_number}: {reason} (got: {content})")]
    InvalidLine {
        /// 1-based line number in the cookie file.
        line_number: usize,
        /// The offending line content (truncated, with value redacted).
        content: String,
        /// Description of what was wrong.
        reason: String,
    },

    /// I/O error reading the cookie input.
    #[error("failed to read cookie input: {0}")]
    Io(#[from] std::io::Error),

    /// No valid cookies found in a non-empty input.
    #[error("no valid cookies found ({malformed_count} lines failed to parse)")]
    NoCookiesFound {
        /// Number of malformed lines encountered.
        malformed_count: usize,
    },
}

/// Errors that can occur while parsing cookie import input.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// Input was empty.
    #[error("cookie input is empty")]
    EmptyInput,
    /// Netscape-format parser failed.
    #[error(transparent)]
    Netscape(#[from] CookieError),
    /// JSON parser failed.
    #[error("invalid cookie JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// No valid cookies remained after validation.
    #[error("no valid cookies found after validation")]
    NoValidCookies,
}

/// Parse and validate cookie import input from either Netscape or JSON format.
///
/// # Errors
///
/// Returns [`CaptureError`] when input is empty, parsing fails, or all cookies
/// are invalid/expired.
#[instrument(level = "debug", skip(input))]
pub fn parse_captured_cookies(input: &str) -> Result<CapturedCookies, CaptureError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CaptureError::EmptyInput);
    }

    let (cookies, mut warnings, format) = if looks_like_json(trimmed) {
        let (cookies, warnings) = parse_json_cookies(trimmed)?;
        (cookies, warnings, CapturedCookieFormat::Json)
    } else {
        let result = parse_netscape_cookies(trimmed.as_bytes())?;
        let warnings = result
            .warnings
            .iter()
            .map(|(line, reason)| format!("line {line}: {reason}"))
            .collect::<Vec<_>>();
        (result.cookies, warnings, CapturedCookieFormat::Netscape)
    };

    let (valid_cookies, validation_warnings) = validate_cookies(cookies, unix_now());
    warnings.extend(validation_warnings);

    if valid_cookies.is_empty() {
        return Err(CaptureError::NoValidCookies);
    }

    Ok(CapturedCookies {
        cookies: valid_cookies,
        warnings,
        format,
    })
}

/// Counts unique cookie domains in the provided cookie list.
#[must_use]
pub fn unique_domain_count(cookies: &[CookieRecord]) -> usize {
    cookies
        .iter()
        .map(|cookie| cookie.domain.trim_start_matches('.').to_string())
        .collect::<HashSet<_>>()
        .len()
}

fn looks_like_json(input: &str) -> bool {
    input.starts_with('[') || input.starts_with('{')
}

fn validate_cookies(cookies: Vec<CookieRecord>, now: u64) -> (Vec<CookieRecord>, Vec<String>) {
    let mut valid = Vec::new();
    let mut warnings = Vec::new();

    for mut cookie in cookies {
        if cookie.domain.trim().is_empty() {
            warnings.push("skipped cookie with empty domain".to_string());
            continue;
        }
        if cookie.name.trim().is_empty() {
            warnings.push("skipped cookie with empty name".to_string());
            continue;
        }
        if cookie.value().is_empty() {
            warnings.push(format!(
                "skipped cookie '{}' for domain '{}' because value is empty",
                cookie.name, cookie.domain
            ));
            continue;
        }
        if cookie.path.trim().is_empty() {
            cookie.path = "/".to_string();
        }
        if cookie.is_expired(now) {
            warnings.push(format!(
                "skipped expired cookie '{}' for domain '{}'",
                cookie.name, cookie.domain
            ));
            continue;
        }

        valid.push(cookie);
    }

    (valid, warnings)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs())
}

/// Result of parsing a Netscape cookie file, including successfully parsed
/// cookies and any warnings about malformed lines.
#[derive(Debug)]
pub struct NetscapeParseResult {
    /// Successfully parsed cookies.
    pub cookies: Vec<CookieRecord>,
    /// Warnings for malformed lines (line number and reason).
    pub warnings: Vec<(usize, String)>,
}

/// Parses a Netscape-format cookie file from a buffered reader.
///
/// Each non-comment, non-blank line must contain exactly 7 TAB-separated
/// fields: `domain`, `tailmatch`, `path`, `secure`, `expires`, `name`,
/// `value`. Lines starting with `#` are comments, with one exception:
/// exports mark HttpOnly cookies by prefixing the domain with
/// `#HttpOnly_`, and those lines are real cookies. (GitHub session cookies
/// are HttpOnly, so dropping them would break the one import that matters.)
///
/// # Errors
///
/// Returns [`CookieError::Io`] on read failure, or
/// [`CookieError::NoCookiesFound`] when a non-empty input yields zero valid
/// cookies. Individual malformed lines are collected as warnings.
#[instrument(level = "debug", skip(reader))]
pub fn parse_netscape_cookies(reader: impl BufRead) -> Result<NetscapeParseResult, CookieError> {
    let mut cookies = Vec::new();
    let mut warnings = Vec::new();
    let mut non_blank_lines = 0;

    for (idx, line_result) in reader.lines().enumerate() {
        let line_number = idx + 1;
        let line = line_result?;
        // Handle CRLF: strip trailing \r
        let line = line.trim_end();

        if line.is_empty() {
            continue;
        }

        // HttpOnly cookies hide behind a comment-looking prefix.
        let (line, http_only) = match line.strip_prefix("#HttpOnly_") {
            Some(rest) => (rest, true),
            None => (line, false),
        };

        // Skip comment lines (including the optional Netscape header)
        if line.starts_with('#') {
            continue;
        }

        non_blank_lines += 1;

        match parse_cookie_line(line, line_number, http_only) {
            Ok(cookie) => {
                debug!(
                    line = line_number,
                    domain = %cookie.domain,
                    name = %cookie.name,
                    "parsed cookie"
                );
                cookies.push(cookie);
            }
            Err(e) => {
                warn!(line = line_number, reason = %e, "skipping malformed cookie line");
                warnings.push((line_number, e.to_string()));
            }
        }
    }

    if cookies.is_empty() && non_blank_lines > 0 {
        return Err(CookieError::NoCookiesFound {
            malformed_count: warnings.len(),
        });
    }

    Ok(NetscapeParseResult { cookies, warnings })
}

/// Parses a single cookie line into a `CookieRecord`.
fn parse_cookie_line(
    line: &str,
    line_number: usize,
    http_only: bool,
) -> Result<CookieRecord, CookieError> {
    let fields: Vec<&str> = line.split('\t').collect();

    if fields.len() != 7 {
        return Err(CookieError::InvalidLine {
            line_number,
            content: redact_line_for_error(line),
            reason: format!("expected 7 TAB-separated fields, found {}", fields.len()),
        });
    }

    let domain = fields[0].to_string();
    let tailmatch = parse_bool_field(fields[1], "tailmatch", line_number, line)?;
    let path = fields[2].to_string();
    let secure = parse_bool_field(fields[3], "secure", line_number, line)?;

    let expires = fields[4]
        .parse::<u64>()
        .map_err(|_| CookieError::InvalidLine {
            line_number,
            content: redact_line_for_error(line),
            reason: format!(
                "expires field must be a non-negative integer, got '{}'",
                fields[4]
            ),
        })?;

    let name = fields[5].to_string();
    let value = fields[6].to_string();

    if domain.is_empty() {
        return Err(CookieError::InvalidLine {
            line_number,
            content: redact_line_for_error(line),
            reason: "domain field is empty".to_string(),
        });
    }

    if name.is_empty() {
        return Err(CookieError::InvalidLine {
            line_number,
            content: redact_line_for_error(line),
            reason: "cookie name field is empty".to_string(),
        });
    }

    Ok(CookieRecord::new(
        name,
        value,
        normalize_domain(domain, tailmatch),
        path,
        expires,
        secure,
        http_only,
        None,
    ))
}

/// Normalizes a domain against the subdomain-match flag: tail-matching
/// domains carry a leading dot, host-only domains do not.
fn normalize_domain(domain: String, tailmatch: bool) -> String {
    if tailmatch {
        if domain.starts_with('.') {
            domain
        } else {
            format!(".{domain}")
        }
    } else {
        domain.trim_start_matches('.').to_string()
    }
}

/// Parses a `TRUE`/`FALSE` string field.
fn parse_bool_field(
    value: &str,
    field_name: &str,
    line_number: usize,
    line: &str,
) -> Result<bool, CookieError> {
    match value {
        "TRUE" => Ok(true),
        "FALSE" => Ok(false),
        _ => Err(CookieError::InvalidLine {
            line_number,
            content: redact_line_for_error(line),
            reason: format!("{field_name} field must be TRUE or FALSE, got '{value}'"),
        }),
    }
}

/// Redacts cookie value (7th field) from a line for safe error messages.
fn redact_line_for_error(line: &str) -> String {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() >= 7 {
        let mut redacted = fields[..6].join("\t");
        redacted.push_str("\t[REDACTED]");
        redacted
    } else {
        // Not enough fields to identify value — show as-is (no value present)
        line.to_string()
    }
}

fn parse_json_cookies(input: &str) -> Result<(Vec<CookieRecord>, Vec<String>), CaptureError> {
    let payload: JsonCookiePayload = serde_json::from_str(input)?;
    let entries = match payload {
        JsonCookiePayload::Array(entries) => entries,
        JsonCookiePayload::Wrapped { cookies } => cookies,
    };

    let mut cookies = Vec::new();
    let mut warnings = Vec::new();

    for (index, entry) in entries.into_iter().enumerate() {
        match convert_json_cookie(entry) {
            Ok(cookie) => cookies.push(cookie),
            Err(reason) => warnings.push(format!("entry {}: {}", index + 1, reason)),
        }
    }

    Ok((cookies, warnings))
}

fn convert_json_cookie(entry: JsonCookieEntry) -> Result<CookieRecord, String> {
    let mut domain = entry
        .domain
        .or(entry.host)
        .unwrap_or_default()
        .trim()
        .to_string();

    if domain.is_empty() {
        return Err("missing required field: domain".to_string());
    }

    if let Some(stripped) = domain.strip_prefix("http://") {
        domain = stripped.to_string();
    } else if let Some(stripped) = domain.strip_prefix("https://") {
        domain = stripped.to_string();
    }
    if let Some((host, _rest)) = domain.split_once('/') {
        domain = host.to_string();
    }

    let tailmatch = if let Some(host_only) = entry.host_only {
        !host_only
    } else {
        domain.starts_with('.')
    };
    let domain = normalize_domain(domain, tailmatch);

    let mut path = entry.path.unwrap_or_else(|| "/".to_string());
    if path.trim().is_empty() {
        path = "/".to_string();
    } else if !path.starts_with('/') {
        path = format!("/{path}");
    }

    let name = entry.name.unwrap_or_default().trim().to_string();
    if name.is_empty() {
        return Err("missing required field: name".to_string());
    }

    let value = entry.value.unwrap_or_default();
    if value.is_empty() {
        return Err(format!(
            "cookie '{name}' for domain '{domain}' has empty value"
        ));
    }

    let expires = entry
        .expiration_date
        .or(entry.expires)
        .map_or(0, normalized_expiry);

    Ok(CookieRecord::new(
        name,
        value,
        domain,
        path,
        expires,
        entry.secure.unwrap_or(false),
        entry.http_only.unwrap_or(false),
        normalized_same_site(entry.same_site),
    ))
}

/// Maps extension SameSite labels onto the browser's vocabulary.
fn normalized_same_site(raw: Option<String>) -> Option<String> {
    let raw = raw?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "strict" => Some("strict".to_string()),
        "lax" => Some("lax".to_string()),
        "none" | "no_restriction" => Some("none".to_string()),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonCookiePayload {
    Array(Vec<JsonCookieEntry>),
    Wrapped { cookies: Vec<JsonCookieEntry> },
}

#[derive(Debug, Deserialize)]
struct JsonCookieEntry {
    domain: Option<String>,
    host: Option<String>,
    #[serde(rename = "hostOnly")]
    host_only: Option<bool>,
    path: Option<String>,
    secure: Option<bool>,
    #[serde(rename = "httpOnly")]
    http_only: Option<bool>,
    #[serde(rename = "sameSite")]
    same_site: Option<String>,
    name: Option<String>,
    value: Option<String>,
    #[serde(rename = "expirationDate")]
    expiration_date: Option<f64>,
    expires: Option<f64>,
}
