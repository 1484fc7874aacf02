//! `league_protocol` — envelope, payload schema, and auth token types shared
//! by the league manager, referees, and players.
//!
//! This crate carries no I/O: it is the wire-format and validation layer
//! that `evenodd_league`'s transport and handler code build on, the same
//! role the teacher's `tool_protocol` crate plays for tool metadata.

pub mod auth;
pub mod envelope;
pub mod error;
pub mod match_record;
pub mod payload;
pub mod standings;

pub use auth::{AuthError, AuthTokenService, Claims};
pub use envelope::{Envelope, Role, PROTOCOL_NAME};
pub use error::{ErrorCode, ProtocolError};
pub use match_record::{LifecycleEntry, MatchPlayers, MatchRecord, MatchState, TranscriptEntry};
pub use payload::Payload;
pub use standings::{ScoringWeights, Standings};

/// Decode a raw JSON-RPC `params` object into a validated envelope and its
/// matching payload (spec §4.1).
///
/// Returns a [`ProtocolError`] rather than panicking or falling back to a
/// partial parse — a malformed message must never mutate any state.
pub fn decode(value: &serde_json::Value) -> Result<(Envelope, Payload), ProtocolError> {
    let envelope: Envelope = serde_json::from_value(value.clone()).map_err(|e| {
        ProtocolError::SchemaViolation {
            message_type: value
                .get("message_type")
                .and_then(|v| v.as_str())
                .unwrap_or("<missing>")
                .to_string(),
            reason: e.to_string(),
        }
    })?;
    envelope.validate()?;

    let payload: Payload =
        serde_json::from_value(value.clone()).map_err(|e| ProtocolError::SchemaViolation {
            message_type: envelope.message_type.clone(),
            reason: e.to_string(),
        })?;

    if payload.message_type() != envelope.message_type {
        return Err(ProtocolError::SchemaViolation {
            message_type: envelope.message_type.clone(),
            reason: format!(
                "payload tag {} does not match envelope message_type {}",
                payload.message_type(),
                envelope.message_type
            ),
        });
    }

    Ok((envelope, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{ChooseParityResponse, Parity};

    #[test]
    fn decode_valid_message() {
        let envelope = Envelope::new(
            "CHOOSE_PARITY_RESPONSE",
            Role::Player,
            "p1",
            "conv-1",
            "tok",
        );
        let mut value = serde_json::to_value(&envelope).unwrap();
        let payload = Payload::ChooseParityResponse(ChooseParityResponse {
            match_id: "m1".into(),
            parity_choice: Parity::Odd,
        });
        let payload_value = serde_json::to_value(&payload).unwrap();
        value
            .as_object_mut()
            .unwrap()
            .extend(payload_value.as_object().unwrap().clone());

        let (decoded_envelope, decoded_payload) = decode(&value).expect("should decode");
        assert_eq!(decoded_envelope.message_type, "CHOOSE_PARITY_RESPONSE");
        match decoded_payload {
            Payload::ChooseParityResponse(r) => {
                assert_eq!(r.match_id, "m1");
                assert_eq!(r.parity_choice, Parity::Odd);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn decode_rejects_mismatched_message_type() {
        let value = serde_json::json!({
            "protocol": "league.v2",
            "message_type": "GAME_OVER",
            "sender": "referee:r1",
            "timestamp": "2024-01-01T00:00:00Z",
            "conversation_id": "c1",
            "auth_token": "t",
            "match_id": "m1",
            "parity_choice": "even"
        });
        let result = decode(&value);
        assert!(result.is_err());
    }
}
