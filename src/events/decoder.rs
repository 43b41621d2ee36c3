//! Event file decoder
//!
//! Reads one provider file (a bare event array, or the array under a
//! `"result"` key) into ordered [`RawEvent`]s. Syntax errors go through
//! [`repair`] until the text parses or no fix applies.

use serde_json::Value;
use std::fs;
use std::path::Path;

use super::repair::{Repair, repair};
use super::types::{GameMeta, RawEvent, WireEvent};
use crate::constants::{MAX_REPAIR_PASSES, RESULT_WRAPPER_KEY};
use crate::error::DecodeError;

/// Decoded events of one file, in file order
#[derive(Debug, Clone, Default)]
pub struct DecodedFile {
    pub events: Vec<RawEvent>,
    /// Fixes applied before the file parsed, in order
    pub repairs: Vec<Repair>,
}

impl DecodedFile {
    /// Game metadata of the first event
    pub fn game(&self) -> Option<&GameMeta> {
        self.events.first().and_then(|e| e.game.as_ref())
    }

    pub fn was_repaired(&self) -> bool {
        !self.repairs.is_empty()
    }
}

/// Decode an event file from disk
pub fn decode_file<P: AsRef<Path>>(path: P) -> Result<DecodedFile, DecodeError> {
    let bytes = fs::read(path.as_ref())?;
    decode_bytes(&bytes)
}

/// Decode event file content (for testing or in-memory parsing)
pub fn decode_bytes(bytes: &[u8]) -> Result<DecodedFile, DecodeError> {
    let content = String::from_utf8_lossy(bytes);
    let (value, repairs) = parse_with_repair(&content)?;

    let events = extract_event_list(value)?
        .into_iter()
        .map(|v| serde_json::from_value::<WireEvent>(v).map(RawEvent::from))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| DecodeError::Shape(e.to_string()))?;

    if events.is_empty() {
        return Err(DecodeError::Empty);
    }

    Ok(DecodedFile { events, repairs })
}

fn parse_with_repair(content: &str) -> Result<(Value, Vec<Repair>), DecodeError> {
    let mut text = content.to_string();
    let mut repairs = Vec::new();

    for _ in 0..MAX_REPAIR_PASSES {
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => return Ok((value, repairs)),
            Err(e) => match repair(&text, &e) {
                Some((fixed, applied)) => {
                    tracing::debug!(
                        "JSON repair {} at byte {} for: {}",
                        applied.kind.label(),
                        applied.offset,
                        e
                    );
                    repairs.push(applied);
                    text = fixed;
                }
                None => return Err(DecodeError::Syntax(e)),
            },
        }
    }

    serde_json::from_str::<Value>(&text)
        .map(|value| (value, repairs))
        .map_err(DecodeError::Syntax)
}

fn extract_event_list(value: Value) -> Result<Vec<Value>, DecodeError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove(RESULT_WRAPPER_KEY) {
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err(DecodeError::Shape(format!(
                "\"{}\" is not a list",
                RESULT_WRAPPER_KEY
            ))),
            None => Err(DecodeError::Shape(format!(
                "object has no \"{}\" list",
                RESULT_WRAPPER_KEY
            ))),
        },
        _ => Err(DecodeError::Shape("expected a list or an object".to_string())),
    }
}
