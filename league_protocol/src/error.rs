//! Error taxonomy for the `league.v2` protocol.
//!
//! Two distinct error surfaces exist, mirroring the distinction the teacher
//! draws between `ToolError` (a Rust-level `Result` error) and wire-level
//! status fields: [`ErrorCode`] is the stable, wire-serialized string carried
//! in `LEAGUE_ERROR`/`GAME_ERROR` payloads; [`ProtocolError`] is the
//! envelope/schema decode failure a receiver raises before a payload is
//! even trusted enough to inspect.

use std::fmt;

/// Stable error code strings, see spec §6/§7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    TimeoutError,
    InvalidChoice,
    MissingRequiredField,
    ConnectionError,
    AuthTokenMissing,
    AuthTokenInvalid,
    PlayerNotFound,
    LeagueNotFound,
    PlayerNotRegistered,
}

impl ErrorCode {
    /// The exact wire string for this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::TimeoutError => "TIMEOUT_ERROR",
            ErrorCode::InvalidChoice => "INVALID_CHOICE",
            ErrorCode::MissingRequiredField => "MISSING_REQUIRED_FIELD",
            ErrorCode::ConnectionError => "CONNECTION_ERROR",
            ErrorCode::AuthTokenMissing => "AUTH_TOKEN_MISSING",
            ErrorCode::AuthTokenInvalid => "AUTH_TOKEN_INVALID",
            ErrorCode::PlayerNotFound => "PLAYER_NOT_FOUND",
            ErrorCode::LeagueNotFound => "LEAGUE_NOT_FOUND",
            ErrorCode::PlayerNotRegistered => "PLAYER_NOT_REGISTERED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for ErrorCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for ErrorCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        match raw.as_str() {
            "TIMEOUT_ERROR" => Ok(ErrorCode::TimeoutError),
            "INVALID_CHOICE" => Ok(ErrorCode::InvalidChoice),
            "MISSING_REQUIRED_FIELD" => Ok(ErrorCode::MissingRequiredField),
            "CONNECTION_ERROR" => Ok(ErrorCode::ConnectionError),
            "AUTH_TOKEN_MISSING" => Ok(ErrorCode::AuthTokenMissing),
            "AUTH_TOKEN_INVALID" => Ok(ErrorCode::AuthTokenInvalid),
            "PLAYER_NOT_FOUND" => Ok(ErrorCode::PlayerNotFound),
            "LEAGUE_NOT_FOUND" => Ok(ErrorCode::LeagueNotFound),
            "PLAYER_NOT_REGISTERED" => Ok(ErrorCode::PlayerNotRegistered),
            other => Err(serde::de::Error::custom(format!(
                "unknown error_code: {other}"
            ))),
        }
    }
}

/// Envelope or payload schema violation raised by [`crate::envelope::Envelope::validate`]
/// or by a payload's `decode` routine. No state change has occurred when this
/// is returned — see spec §7.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// `protocol` field was not `"league.v2"`.
    UnknownProtocol(String),
    /// `timestamp` was not a valid UTC instant carrying the `Z` suffix.
    InvalidTimestamp(String),
    /// `sender` did not match `<role>:<agent_id>` for a known role.
    InvalidSender(String),
    /// `message_type` did not match any of the 16 known types.
    UnknownMessageType(String),
    /// The payload failed to satisfy the schema for its declared `message_type`.
    SchemaViolation { message_type: String, reason: String },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::UnknownProtocol(p) => {
                write!(f, "unknown protocol: {p}")
            }
            ProtocolError::InvalidTimestamp(ts) => {
                write!(f, "invalid timestamp: {ts}")
            }
            ProtocolError::InvalidSender(s) => write!(f, "invalid sender: {s}"),
            ProtocolError::UnknownMessageType(mt) => {
                write!(f, "unknown message_type: {mt}")
            }
            ProtocolError::SchemaViolation {
                message_type,
                reason,
            } => write!(f, "schema violation for {message_type}: {reason}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_round_trips_through_json() {
        for code in [
            ErrorCode::TimeoutError,
            ErrorCode::InvalidChoice,
            ErrorCode::MissingRequiredField,
            ErrorCode::ConnectionError,
            ErrorCode::AuthTokenMissing,
            ErrorCode::AuthTokenInvalid,
            ErrorCode::PlayerNotFound,
            ErrorCode::LeagueNotFound,
            ErrorCode::PlayerNotRegistered,
        ] {
            let json = serde_json::to_string(&code).unwrap();
            let back: ErrorCode = serde_json::from_str(&json).unwrap();
            assert_eq!(back.as_str(), code.as_str());
        }
    }

    #[test]
    fn unknown_error_code_rejected() {
        let err = serde_json::from_str::<ErrorCode>("\"NOT_A_CODE\"");
        assert!(err.is_err());
    }
}
