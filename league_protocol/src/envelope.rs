//! The `league.v2` message envelope (spec §4.1).
//!
//! Every request and response on the wire is a JSON-RPC 2.0 call whose
//! `params` object embeds one of these envelopes. Validation is a pure
//! function: given the raw fields, decide whether this is a well-formed
//! `league.v2` message before any payload-specific schema is even consulted.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

pub const PROTOCOL_NAME: &str = "league.v2";

/// The three agent roles that can appear in a `sender` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Player,
    Referee,
    LeagueManager,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Player => "player",
            Role::Referee => "referee",
            Role::LeagueManager => "league_manager",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "player" => Some(Role::Player),
            "referee" => Some(Role::Referee),
            "league_manager" => Some(Role::LeagueManager),
            _ => None,
        }
    }
}

/// Envelope fields common to every `league.v2` message.
///
/// `timestamp` is kept as the raw wire string rather than a parsed
/// `chrono::DateTime<Utc>` so that [`Envelope::validate`] can reject a
/// timestamp missing the required UTC designator instead of silently
/// accepting whatever `chrono` happens to parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub protocol: String,
    pub message_type: String,
    pub sender: String,
    pub timestamp: String,
    pub conversation_id: String,
    #[serde(default)]
    pub auth_token: String,
}

/// The known `message_type` strings, one per payload variant.
pub const KNOWN_MESSAGE_TYPES: &[&str] = &[
    "REFEREE_REGISTER_REQUEST",
    "REFEREE_REGISTER_RESPONSE",
    "LEAGUE_REGISTER_REQUEST",
    "LEAGUE_REGISTER_RESPONSE",
    "ROUND_ANNOUNCEMENT",
    "ROUND_COMPLETED",
    "GAME_INVITATION",
    "GAME_JOIN_ACK",
    "CHOOSE_PARITY_CALL",
    "CHOOSE_PARITY_RESPONSE",
    "GAME_OVER",
    "MATCH_RESULT_REPORT",
    "LEAGUE_STANDINGS_UPDATE",
    "LEAGUE_COMPLETED",
    "LEAGUE_ERROR",
    "GAME_ERROR",
];

impl Envelope {
    pub fn new(
        message_type: impl Into<String>,
        sender_role: Role,
        sender_id: &str,
        conversation_id: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Self {
        Envelope {
            protocol: PROTOCOL_NAME.to_string(),
            message_type: message_type.into(),
            sender: qualify_sender(sender_role, sender_id),
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            conversation_id: conversation_id.into(),
            auth_token: auth_token.into(),
        }
    }

    /// Validate the envelope fields, returning the parsed `(role, agent_id)`
    /// of the sender on success.
    ///
    /// The `league_manager` role is accepted both bare (`"league_manager"`)
    /// and qualified (`"league_manager:<id>"`) on ingress — the manager is a
    /// singleton in most deployments and earlier protocol drafts omitted the
    /// id. Outbound envelopes always emit the qualified form.
    pub fn validate(&self) -> Result<(Role, String), ProtocolError> {
        if self.protocol != PROTOCOL_NAME {
            return Err(ProtocolError::UnknownProtocol(self.protocol.clone()));
        }
        if !KNOWN_MESSAGE_TYPES.contains(&self.message_type.as_str()) {
            return Err(ProtocolError::UnknownMessageType(self.message_type.clone()));
        }
        if !is_valid_utc_z_timestamp(&self.timestamp) {
            return Err(ProtocolError::InvalidTimestamp(self.timestamp.clone()));
        }
        parse_sender(&self.sender).ok_or_else(|| ProtocolError::InvalidSender(self.sender.clone()))
    }
}

fn qualify_sender(role: Role, agent_id: &str) -> String {
    format!("{}:{}", role.as_str(), agent_id)
}

fn parse_sender(sender: &str) -> Option<(Role, String)> {
    match sender.split_once(':') {
        Some((role_str, id)) if !id.is_empty() => {
            Role::parse(role_str).map(|role| (role, id.to_string()))
        }
        None if sender == Role::LeagueManager.as_str() => {
            Some((Role::LeagueManager, String::new()))
        }
        _ => None,
    }
}

fn is_valid_utc_z_timestamp(ts: &str) -> bool {
    if !(ts.ends_with('Z') || ts.ends_with("+00:00")) {
        return false;
    }
    chrono::DateTime::parse_from_rfc3339(ts).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_envelope_validates() {
        let env = Envelope::new(
            "LEAGUE_REGISTER_REQUEST",
            Role::Player,
            "p1",
            "conv-1",
            "tok",
        );
        let (role, id) = env.validate().expect("should validate");
        assert_eq!(role, Role::Player);
        assert_eq!(id, "p1");
    }

    #[test]
    fn rejects_wrong_protocol() {
        let mut env = Envelope::new("LEAGUE_REGISTER_REQUEST", Role::Player, "p1", "c", "t");
        env.protocol = "league.v1".to_string();
        assert!(matches!(
            env.validate(),
            Err(ProtocolError::UnknownProtocol(_))
        ));
    }

    #[test]
    fn rejects_missing_z_suffix() {
        let mut env = Envelope::new("LEAGUE_REGISTER_REQUEST", Role::Player, "p1", "c", "t");
        env.timestamp = "2024-01-01 00:00:00".to_string();
        assert!(matches!(
            env.validate(),
            Err(ProtocolError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn rejects_unknown_message_type() {
        let mut env = Envelope::new("LEAGUE_REGISTER_REQUEST", Role::Player, "p1", "c", "t");
        env.message_type = "NOT_A_TYPE".to_string();
        assert!(matches!(
            env.validate(),
            Err(ProtocolError::UnknownMessageType(_))
        ));
    }

    #[test]
    fn accepts_bare_league_manager_sender() {
        let mut env = Envelope::new("LEAGUE_ERROR", Role::LeagueManager, "mgr-1", "c", "t");
        env.sender = "league_manager".to_string();
        let (role, id) = env.validate().unwrap();
        assert_eq!(role, Role::LeagueManager);
        assert_eq!(id, "");
    }

    #[test]
    fn rejects_malformed_sender() {
        let mut env = Envelope::new("LEAGUE_ERROR", Role::Referee, "r1", "c", "t");
        env.sender = "referee-r1".to_string();
        assert!(matches!(
            env.validate(),
            Err(ProtocolError::InvalidSender(_))
        ));
    }
}
