//! Response parsing: pull the JSON object out of a free-form model reply.
//!
//! Models often wrap the payload in prose ("Here is the result: …") or a
//! code fence. The parser takes the span from the first `{` to the last `}`
//! and parses that. It does not balance braces; a well-formed reply has
//! exactly one top-level object, so the outermost span is the object.

use crate::error::DocumentError;
use serde_json::{Map, Value};

/// Extract the first-to-last-brace span of `raw` as a JSON object.
///
/// # Errors
/// [`DocumentError::MalformedResponse`] when there is no `{`…`}` pair, the
/// first `{` comes after the last `}`, or the span is not valid JSON. The
/// error carries the raw reply for logging.
pub fn extract_json(raw: &str) -> Result<Map<String, Value>, DocumentError> {
    let malformed = |reason: String| DocumentError::MalformedResponse {
        reason,
        raw: raw.to_string(),
    };

    let (start, end) = match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => return Err(malformed("no JSON object found".to_string())),
    };

    match serde_json::from_str::<Value>(&raw[start..=end]) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(malformed("payload is not a JSON object".to_string())),
        Err(e) => Err(malformed(format!("invalid JSON: {e}"))),
    }
}
