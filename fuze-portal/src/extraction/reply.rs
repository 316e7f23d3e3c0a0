//! Parsing of collaborator replies
//!
//! Replies are untrusted text. The model is asked for bare JSON but may wrap
//! it in code fences or surround it with prose, so the first balanced
//! `{...}` span is taken as the payload.

use fuze_common::SubmissionFields;
use serde_json::Value;
use thiserror::Error;

const FENCE: &str = "```";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplyError {
    #[error("No JSON object found in reply")]
    NoObject,

    #[error("Malformed JSON in reply: {0}")]
    Invalid(String),

    #[error("Reply JSON is not an object")]
    NotAnObject,
}

/// Remove fence markers and a language tag directly after one
pub fn strip_fences(reply: &str) -> String {
    let mut out = String::with_capacity(reply.len());
    let mut rest = reply;

    while let Some(pos) = rest.find(FENCE) {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + FENCE.len()..];

        let tag_len = rest
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(rest.len());
        if tag_len > 0 && rest[tag_len..].starts_with(char::is_whitespace) {
            rest = &rest[tag_len..];
        }
    }
    out.push_str(rest);

    out.trim().to_string()
}

/// First balanced `{...}` span, ignoring braces inside strings
///
/// `Ok(None)` when there is no `{` at all; `Err` when an object starts but
/// never closes.
pub fn find_object(text: &str) -> Result<Option<&str>, ReplyError> {
    let Some(start) = text.find('{') else {
        return Ok(None);
    };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(Some(&text[start..start + offset + 1]));
                }
            }
            _ => {}
        }
    }

    Err(ReplyError::Invalid("Unterminated JSON object".to_string()))
}

/// Parse a reply into the fields to write back
///
/// Provenance fields in the reply are dropped; keys that are not submission
/// columns (`id`, `timestamp`, `created_at`, ...) are ignored.
pub fn parse_reply(reply: &str) -> Result<SubmissionFields, ReplyError> {
    let text = strip_fences(reply);

    // A bare reply parses whole; anything else needs the span search
    let value = match serde_json::from_str::<Value>(&text) {
        Ok(value) => value,
        Err(_) => {
            let span = find_object(&text)?.ok_or(ReplyError::NoObject)?;
            serde_json::from_str(span).map_err(|e| ReplyError::Invalid(e.to_string()))?
        }
    };

    if !value.is_object() {
        return Err(ReplyError::NotAnObject);
    }

    let fields: SubmissionFields =
        serde_json::from_value(value).map_err(|e| ReplyError::Invalid(e.to_string()))?;
    Ok(fields.without_provenance())
}
