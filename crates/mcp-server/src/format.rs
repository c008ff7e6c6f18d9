//! Text rendering of tool results.
//!
//! The MCP boundary only carries strings, so callers tell failure from success by prefix:
//! [`format_error`] output always starts with [`ERROR_PREFIX`] and [`format_success`] output
//! never does.

use crate::error::ToolError;
use serde::Serialize;

pub const ERROR_PREFIX: &str = "Error: ";
const RAW_OUTPUT_PREFIX: &str = "Output:\n";

/// A successful tool result, before rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Code Health score, 10.0 (best) to 1.0 (worst).
    Score(f64),
    /// Pre-rendered JSON document.
    Json(String),
    /// Raw CLI output, passed through.
    Text(String),
}

impl Payload {
    /// Pretty JSON in struct field order.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, ToolError> {
        serde_json::to_string_pretty(value)
            .map(Self::Json)
            .map_err(|err| ToolError::Internal(format!("failed to serialize result: {err}")))
    }
}

pub fn format_success(payload: Payload) -> String {
    match payload {
        Payload::Score(score) => format!("Code Health score: {score:.2}"),
        Payload::Json(json) => json,
        Payload::Text(text) if text.starts_with(ERROR_PREFIX) => {
            format!("{RAW_OUTPUT_PREFIX}{text}")
        }
        Payload::Text(text) => text,
    }
}

pub fn format_error(context: &str, error: &ToolError) -> String {
    log::warn!("{context} failed ({}): {error}", error.kind());
    let description = error.to_string();
    let description = description.trim();
    if description.is_empty() {
        format!("{ERROR_PREFIX}{context} failed")
    } else {
        format!("{ERROR_PREFIX}{description}")
    }
}
