//! Authentication state: the cookie jar and cookie-export import.
//!
//! The jar is the only thing that survives between runs. Importing a
//! browser export (Netscape or JSON) seeds it; a successful in-browser
//! sign-in refreshes it.

mod capture;
mod jar;

pub use capture::{
    CaptureError, CapturedCookieFormat, CapturedCookies, CookieError, NetscapeParseResult,
    parse_captured_cookies, parse_netscape_cookies, unique_domain_count,
};
pub use jar::{
    CookieRecord, JAR_FILE_NAME, Jar, JarError, default_jar_path, expiry_label, read_jar_file,
};

pub(crate) use jar::normalized_expiry;
