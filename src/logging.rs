//! Structured logging (spec §4.4).
//!
//! Two sinks exist side by side, same split the teacher draws between
//! `log::info!`/`log::warn!` call sites (human-facing, `env_logger`-backed)
//! and a durable record a later process can replay: [`JsonlLogger`] appends
//! one redacted JSON object per line to an append-only file, independent of
//! whatever log level the process was started with.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{json, Value};

/// Field names that must never reach the audit log in the clear.
const REDACTED_FIELDS: &[&str] = &["auth_token", "password", "secret", "api_key"];

/// Substrings that mark a field name as sensitive even when it isn't an
/// exact match in [`REDACTED_FIELDS`] (e.g. `session_token`, `client_secret`).
const REDACTED_SUBSTRINGS: &[&str] = &["token", "secret"];

fn is_redacted_field(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    REDACTED_FIELDS.contains(&lower.as_str()) || REDACTED_SUBSTRINGS.iter().any(|s| lower.contains(s))
}

/// Appends one JSON object per line to a file, redacting sensitive fields.
///
/// Locking is coarse (a single [`Mutex`] around the open file) — audit
/// volume is one line per protocol message, nowhere near enough to make
/// that a bottleneck.
pub struct JsonlLogger {
    path: PathBuf,
    file: Mutex<std::fs::File>,
}

impl JsonlLogger {
    pub fn open(dir: impl AsRef<Path>, league_id: &str) -> std::io::Result<Self> {
        std::fs::create_dir_all(dir.as_ref())?;
        let path = dir.as_ref().join(format!("{league_id}.jsonl"));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(JsonlLogger {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one audit record. `fields` is merged into a record carrying
    /// its own `timestamp` and `event` keys; any key matching
    /// [`REDACTED_FIELDS`] or [`REDACTED_SUBSTRINGS`] is replaced with
    /// `"***"` before it is written.
    pub fn record(&self, event: &str, mut fields: Value) -> std::io::Result<()> {
        redact(&mut fields);
        let mut record = json!({
            "timestamp": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "event": event,
        });
        if let (Value::Object(record_map), Value::Object(field_map)) = (&mut record, fields) {
            record_map.extend(field_map);
        }
        let line = serde_json::to_string(&record).unwrap_or_default();
        let mut file = self.file.lock().expect("jsonl logger mutex poisoned");
        writeln!(file, "{line}")
    }
}

fn redact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, v) in map.iter_mut() {
                if is_redacted_field(key) {
                    *v = Value::String("***".to_string());
                }
            }
            for v in map.values_mut() {
                redact(v);
            }
        }
        Value::Array(items) => {
            for item in items {
                redact(item);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_redacts_auth_token() {
        let dir = tempfile::tempdir().unwrap();
        let logger = JsonlLogger::open(dir.path(), "league-1").unwrap();
        logger
            .record("MESSAGE_RECEIVED", json!({"auth_token": "secret-value", "sender": "player:p1"}))
            .unwrap();
        let contents = std::fs::read_to_string(logger.path()).unwrap();
        assert!(!contents.contains("secret-value"));
        assert!(contents.contains("\"auth_token\":\"***\""));
        assert!(contents.contains("player:p1"));
    }

    #[test]
    fn record_redacts_wildcard_token_and_secret_fields() {
        let dir = tempfile::tempdir().unwrap();
        let logger = JsonlLogger::open(dir.path(), "league-1").unwrap();
        logger
            .record(
                "MESSAGE_RECEIVED",
                json!({"session_token": "abc123", "client_secret": "xyz789", "sender": "player:p1"}),
            )
            .unwrap();
        let contents = std::fs::read_to_string(logger.path()).unwrap();
        assert!(!contents.contains("abc123"));
        assert!(!contents.contains("xyz789"));
        assert!(contents.contains("player:p1"));
    }

    #[test]
    fn record_appends_multiple_lines() {
        let dir = tempfile::tempdir().unwrap();
        let logger = JsonlLogger::open(dir.path(), "league-1").unwrap();
        logger.record("A", json!({})).unwrap();
        logger.record("B", json!({})).unwrap();
        let contents = std::fs::read_to_string(logger.path()).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
