//! Update parsing.

use maxo_core::Update;
use serde_json::Value;
use tracing::warn;

use crate::error::{ParseError, ParseResult};

/// Turns one decoded webhook body into exactly one typed [`Update`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateParser;

impl UpdateParser {
    /// Creates a parser.
    pub fn new() -> Self {
        Self
    }

    /// Parses a JSON object into an update.
    pub fn parse(&self, raw: Value) -> ParseResult<Update> {
        if !raw.is_object() {
            return Err(ParseError::NotAnObject(json_kind(&raw)));
        }

        serde_json::from_value(raw).map_err(|e| {
            warn!(error = %e, "Invalid webhook update payload");
            ParseError::InvalidPayload(e.to_string())
        })
    }
}

/// Returns a short name for the JSON value's kind.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
