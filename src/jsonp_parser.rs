use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static CALLBACK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("Failed to compile callback regex")
});

/// Upper bound on the response excerpt carried in parse errors.
const PREVIEW_LIMIT: usize = 200;

#[derive(Debug)]
pub enum ParseError {
    MalformedWrapper(String),
    Json(serde_json::Error),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::MalformedWrapper(preview) => {
                write!(f, "unexpected response (not a JSONP wrapper): {}", preview)
            }
            ParseError::Json(e) => write!(f, "invalid JSON inside JSONP wrapper: {}", e),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::MalformedWrapper(_) => None,
            ParseError::Json(e) => Some(e),
        }
    }
}

fn preview(text: &str) -> String {
    let mut end = PREVIEW_LIMIT.min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

/// Extracts the JSON payload from a `callbackName(<json>)` response body.
///
/// The payload is taken between the first `(` and the last `)`, so literal
/// parentheses inside JSON string values do not truncate the scan the way a
/// non-greedy pattern would.
pub fn unwrap_jsonp(text: &str) -> Result<Value, ParseError> {
    let trimmed = text.trim();

    let open = match trimmed.find('(') {
        Some(idx) if idx > 0 => idx,
        _ => return Err(ParseError::MalformedWrapper(preview(trimmed))),
    };
    if !trimmed.ends_with(')') || !CALLBACK_RE.is_match(&trimmed[..open]) {
        return Err(ParseError::MalformedWrapper(preview(trimmed)));
    }

    let inner = &trimmed[open + 1..trimmed.len() - 1];
    serde_json::from_str(inner).map_err(ParseError::Json)
}
