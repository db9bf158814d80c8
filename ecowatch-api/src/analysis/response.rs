//! Model response cleanup and parsing

use serde::de::DeserializeOwned;

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Remove wrapping Markdown code fences from a model response
///
/// A leading "```json" (or bare "```") and a trailing "```" are each removed
/// when present, independently of one another, and the remainder trimmed.
/// This repeats until neither end carries a fence, so the result never starts
/// or ends with one and a second application returns it unchanged. Text with
/// no fence at either end is returned as given, untrimmed.
pub fn strip_code_fences(response: &str) -> &str {
    let mut text = response.trim();
    let mut stripped = false;

    loop {
        let inner = text
            .strip_prefix(JSON_FENCE)
            .or_else(|| text.strip_prefix(FENCE))
            .unwrap_or(text);
        let inner = inner.strip_suffix(FENCE).unwrap_or(inner).trim();

        if inner.len() == text.len() {
            break;
        }
        text = inner;
        stripped = true;
    }

    if stripped {
        text
    } else {
        response
    }
}

/// Strip fences and deserialize the remaining JSON
pub fn parse_model_json<T: DeserializeOwned>(response: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(strip_code_fences(response))
}
