//! Integration tests for cookie import parsing and jar persistence.

use std::io::Cursor;

use tempfile::TempDir;

use v0gen_core::auth::{CaptureError, parse_netscape_cookies, read_jar_file};
use v0gen_core::{
    CapturedCookieFormat, CookieRecord, Jar, parse_captured_cookies, unique_domain_count,
};

fn sample_record(name: &str, domain: &str) -> CookieRecord {
    CookieRecord::new(
        name.to_string(),
        format!("{name}-value"),
        domain.to_string(),
        "/".to_string(),
        4_102_444_800, // 2100-01-01, effectively permanent for tests
        true,
        true,
        Some("lax".to_string()),
    )
}

// ---- Integration test: jar round-trip through the filesystem ----

#[test]
fn test_jar_round_trip_preserves_records() {
    let temp_dir = TempDir::new().unwrap();
    let jar_path = temp_dir.path().join("nested").join("cookies.json");

    let mut jar = Jar::open(&jar_path);
    assert!(jar.is_empty(), "fresh jar should start empty");

    jar.overwrite(vec![
        sample_record("user_session", ".github.com"),
        sample_record("_vercel_session", ".v0.dev"),
    ])
    .expect("overwrite should create parent directories and write");

    let reopened = Jar::open(&jar_path);
    assert_eq!(reopened.len(), 2);
    assert_eq!(reopened.records[0].name, "user_session");
    assert_eq!(reopened.records[0].domain, ".github.com");
    assert_eq!(reopened.records[0].value(), "user_session-value");
    assert_eq!(reopened.records[0].expires, 4_102_444_800);
    assert!(reopened.records[0].secure);
    assert!(reopened.records[0].http_only);
    assert_eq!(reopened.records[0].same_site.as_deref(), Some("lax"));
}

#[test]
fn test_jar_open_tolerates_garbage_file() {
    let temp_dir = TempDir::new().unwrap();
    let jar_path = temp_dir.path().join("cookies.json");
    std::fs::write(&jar_path, "definitely not json").unwrap();

    let jar = Jar::open(&jar_path);
    assert!(jar.is_empty(), "unreadable jar should open empty, not fail");

    // Strict reads must still surface the problem.
    assert!(read_jar_file(&jar_path).is_err());
}

#[test]
fn test_jar_clear_reports_whether_a_file_was_removed() {
    let temp_dir = TempDir::new().unwrap();
    let jar_path = temp_dir.path().join("cookies.json");

    let mut jar = Jar::open(&jar_path);
    jar.overwrite(vec![sample_record("sid", "v0.dev")]).unwrap();

    assert!(jar.clear().unwrap(), "first clear removes the file");
    assert!(!jar.clear().unwrap(), "second clear finds nothing");
    assert!(!jar_path.exists());
}

// ---- Integration test: Netscape export through the public entry point ----

#[test]
fn test_import_netscape_export_end_to_end() {
    let input = "\
# Netscape HTTP Cookie File\r\n\
.github.com\tTRUE\t/\tTRUE\t4102444800\tuser_session\tgh-session-token\r\n\
#HttpOnly_.github.com\tTRUE\t/\tTRUE\t4102444800\t__Secure-next-auth\tnext-token\r\n\
v0.dev\tFALSE\t/\tTRUE\t0\tsidebar\topen\r\n";

    let parsed = parse_captured_cookies(input).expect("well-formed export should parse");
    assert_eq!(parsed.format, CapturedCookieFormat::Netscape);
    assert_eq!(parsed.cookies.len(), 3);
    assert_eq!(unique_domain_count(&parsed.cookies), 2);

    let http_only = parsed
        .cookies
        .iter()
        .find(|cookie| cookie.name == "__Secure-next-auth")
        .expect("#HttpOnly_ line must import as a cookie, not a comment");
    assert!(http_only.http_only);
    assert_eq!(http_only.domain, ".github.com");

    let session_cookie = parsed
        .cookies
        .iter()
        .find(|cookie| cookie.name == "sidebar")
        .unwrap();
    assert_eq!(session_cookie.expires, 0, "0 means session cookie");
    assert_eq!(session_cookie.domain, "v0.dev", "host-only stays undotted");
}

// ---- Integration test: JSON export (extension format) ----

#[test]
fn test_import_json_export_end_to_end() {
    let input = r#"{
  "cookies": [
    {
      "domain": "github.com",
      "hostOnly": false,
      "httpOnly": true,
      "name": "user_session",
      "path": "/",
      "sameSite": "no_restriction",
      "secure": true,
      "expirationDate": 4102444800.5,
      "value": "gh-json-token"
    }
  ]
}"#;

    let parsed = parse_captured_cookies(input).expect("extension JSON should parse");
    assert_eq!(parsed.format, CapturedCookieFormat::Json);
    assert_eq!(parsed.cookies.len(), 1);

    let cookie = &parsed.cookies[0];
    assert_eq!(cookie.domain, ".github.com", "tailmatch adds the dot");
    assert_eq!(cookie.expires, 4_102_444_800, "fractional expiry floors");
    assert_eq!(cookie.same_site.as_deref(), Some("none"));
    assert!(cookie.http_only);
}

// ---- Integration test: expired cookies are filtered with warnings ----

#[test]
fn test_expired_cookies_are_skipped_with_warning() {
    let input = "\
.github.com\tTRUE\t/\tTRUE\t1\texpired_session\tstale\n\
.github.com\tTRUE\t/\tTRUE\t4102444800\tuser_session\tfresh\n";

    let parsed = parse_captured_cookies(input).unwrap();
    assert_eq!(parsed.cookies.len(), 1);
    assert_eq!(parsed.cookies[0].name, "user_session");
    assert!(
        parsed
            .warnings
            .iter()
            .any(|warning| warning.contains("skipped expired cookie 'expired_session'")),
        "warnings: {:?}",
        parsed.warnings
    );
}

#[test]
fn test_import_with_only_expired_cookies_is_an_error() {
    let input = ".github.com\tTRUE\t/\tTRUE\t1\tuser_session\tstale\n";
    let err = parse_captured_cookies(input).unwrap_err();
    assert!(matches!(err, CaptureError::NoValidCookies));
}

// ---- Integration test: malformed lines carry line numbers ----

#[test]
fn test_malformed_netscape_lines_report_line_numbers() {
    let input = "\
# Netscape HTTP Cookie File
.good.com\tTRUE\t/\tFALSE\t4102444800\tname\tvalue
this line is totally wrong
.good2.com\tTRUE\t/\tFALSE\t4102444800\tother\tval
also broken
";
    let result = parse_netscape_cookies(Cursor::new(input.as_bytes())).unwrap();

    assert_eq!(result.cookies.len(), 2, "should have 2 valid cookies");
    assert_eq!(result.warnings.len(), 2, "should have 2 warnings");
    assert_eq!(result.warnings[0].0, 3, "first warning on line 3");
    assert_eq!(result.warnings[1].0, 5, "second warning on line 5");
    assert!(
        result.warnings[0].1.contains("7 TAB-separated fields"),
        "should mention field count: {}",
        result.warnings[0].1
    );
}

#[test]
fn test_all_malformed_netscape_input_is_an_error() {
    let result = parse_netscape_cookies(Cursor::new(b"bad line one\nanother bad line\n"));
    let msg = result.unwrap_err().to_string();
    assert!(
        msg.contains("no valid cookies found"),
        "error should mention no valid cookies: {msg}"
    );
}

// ---- Security test: cookie values never in debug output ----

#[test]
fn test_cookie_record_debug_never_contains_value() {
    let input = ".github.com\tTRUE\t/\tTRUE\t4102444800\tuser_session\tmy_super_secret_value\n";
    let parsed = parse_captured_cookies(input).unwrap();

    for cookie in &parsed.cookies {
        let debug_output = format!("{cookie:?}");
        assert!(
            !debug_output.contains("my_super_secret_value"),
            "Debug output must NOT contain cookie value: {debug_output}"
        );
        assert!(
            debug_output.contains("[REDACTED]"),
            "Debug output should show [REDACTED]: {debug_output}"
        );
    }
}

// ---- Error display sanity for the CLI surface ----

#[test]
fn test_capture_error_messages_read_well() {
    let err = parse_captured_cookies("   ").unwrap_err();
    assert_eq!(err.to_string(), "cookie input is empty");

    let err = parse_captured_cookies("{ not json").unwrap_err();
    assert!(err.to_string().contains("invalid cookie JSON"));
}
