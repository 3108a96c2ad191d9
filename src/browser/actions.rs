//! Page-level DOM actions shared by the login and generation flows.
//!
//! Selector-based actions report `Ok(false)` when the element is absent so
//! callers can walk candidate lists; real CDP failures still propagate.

use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType,
};
use tracing::debug;

use super::BrowserError;

/// Evaluates a script and converts the result to a bool.
///
/// # Errors
///
/// Returns [`BrowserError::Evaluate`] when the script result is not a
/// boolean.
pub async fn eval_bool(page: &Page, script: &str) -> Result<bool, BrowserError> {
    page.evaluate(script)
        .await?
        .into_value::<bool>()
        .map_err(BrowserError::Evaluate)
}

/// Evaluates a script and converts the result to a string.
///
/// # Errors
///
/// Returns [`BrowserError::Evaluate`] when the script result is not a
/// string.
pub async fn eval_string(page: &Page, script: &str) -> Result<String, BrowserError> {
    page.evaluate(script)
        .await?
        .into_value::<String>()
        .map_err(BrowserError::Evaluate)
}

/// Evaluates a script that yields a string or `null`.
///
/// # Errors
///
/// Returns [`BrowserError::Evaluate`] when the script result is neither.
pub async fn eval_optional_string(
    page: &Page,
    script: &str,
) -> Result<Option<String>, BrowserError> {
    page.evaluate(script)
        .await?
        .into_value::<Option<String>>()
        .map_err(BrowserError::Evaluate)
}

/// Whether the document currently has a node matching `selector`.
///
/// # Errors
///
/// Returns [`BrowserError`] when the query cannot be evaluated.
pub async fn element_exists(page: &Page, selector: &str) -> Result<bool, BrowserError> {
    let script = format!("!!document.querySelector({})", js_string(selector));
    eval_bool(page, &script).await
}

/// Clicks the first element matching `selector`.
///
/// Returns `Ok(false)` when no such element exists.
///
/// # Errors
///
/// Returns [`BrowserError`] when the element exists but cannot be clicked.
pub async fn click_selector(page: &Page, selector: &str) -> Result<bool, BrowserError> {
    if !element_exists(page, selector).await? {
        return Ok(false);
    }
    let element = page.find_element(selector).await?;
    element.click().await?;
    debug!(selector, "clicked");
    Ok(true)
}

/// Focuses the first element matching `selector` and types `text` into it.
///
/// Returns `Ok(false)` when no such element exists.
///
/// # Errors
///
/// Returns [`BrowserError`] when the element exists but typing fails.
pub async fn type_into(page: &Page, selector: &str, text: &str) -> Result<bool, BrowserError> {
    if !element_exists(page, selector).await? {
        return Ok(false);
    }
    let element = page.find_element(selector).await?;
    element.click().await?;
    element.type_str(text).await?;
    debug!(selector, chars = text.len(), "typed text");
    Ok(true)
}

/// Clicks the first element whose visible text contains one of `patterns`
/// (case-insensitive). `tags` is the candidate selector, e.g. `"a, button"`.
///
/// Returns the clicked element's text, or `None` when nothing matched.
///
/// # Errors
///
/// Returns [`BrowserError`] when the matcher script cannot be evaluated.
pub async fn click_by_text(
    page: &Page,
    tags: &str,
    patterns: &[&str],
) -> Result<Option<String>, BrowserError> {
    let script = click_by_text_script(tags, patterns);
    let clicked = eval_optional_string(page, &script).await?;
    if let Some(label) = &clicked {
        debug!(label = %label, "clicked by text");
    }
    Ok(clicked)
}

/// Dispatches an Enter keypress (down then up) to the focused element.
///
/// # Errors
///
/// Returns [`BrowserError`] when the key events cannot be built or sent.
pub async fn press_enter(page: &Page) -> Result<(), BrowserError> {
    let key_down = DispatchKeyEventParams::builder()
        .key("Enter")
        .code("Enter")
        .text("\r")
        .windows_virtual_key_code(13)
        .r#type(DispatchKeyEventType::KeyDown)
        .build()
        .map_err(BrowserError::InputEvent)?;
    page.execute(key_down).await?;

    let key_up = DispatchKeyEventParams::builder()
        .key("Enter")
        .code("Enter")
        .windows_virtual_key_code(13)
        .r#type(DispatchKeyEventType::KeyUp)
        .build()
        .map_err(BrowserError::InputEvent)?;
    page.execute(key_up).await?;

    Ok(())
}

/// Serializes a string as a JavaScript string literal.
pub(crate) fn js_string(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

fn click_by_text_script(tags: &str, patterns: &[&str]) -> String {
    let patterns_json = serde_json::Value::from(
        patterns
            .iter()
            .map(|pattern| pattern.to_ascii_lowercase())
            .collect::<Vec<_>>(),
    )
    .to_string();
    let tags_json = js_string(tags);

    format!(
        r"(() => {{
  const patterns = {patterns_json};
  const nodes = Array.from(document.querySelectorAll({tags_json}));
  for (const node of nodes) {{
    const text = (node.innerText || node.textContent || '').trim().toLowerCase();
    if (!text) continue;
    if (patterns.some((pattern) => text.includes(pattern))) {{
      node.click();
      return text.slice(0, 80);
    }}
  }}
  return null;
}})()"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_string_escapes_quotes_and_backslashes() {
        assert_eq!(js_string("plain"), "\"plain\"");
        assert_eq!(js_string("a\"b"), "\"a\\\"b\"");
        assert_eq!(js_string("a\\b"), "\"a\\\\b\"");
        assert_eq!(js_string("line\nbreak"), "\"line\\nbreak\"");
    }

    #[test]
    fn test_click_by_text_script_embeds_lowercased_patterns() {
        let script = click_by_text_script("a, button", &["Continue with GitHub", "Sign in"]);
        assert!(script.contains("\"continue with github\""));
        assert!(script.contains("\"sign in\""));
        assert!(script.contains("\"a, button\""));
        assert!(script.contains("return null"));
    }

    #[test]
    fn test_click_by_text_script_is_quote_safe() {
        let script = click_by_text_script("button[aria-label=\"Send\"]", &["go"]);
        assert!(script.contains("querySelectorAll(\"button[aria-label=\\\"Send\\\"]\")"));
    }
}
