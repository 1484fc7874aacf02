//! The 16 `league.v2` payload schemas (spec §6), modeled as one
//! `#[serde(tag = "message_type")]` sum type per DESIGN NOTES §9: a
//! compiler-checked exhaustive match replaces the teacher's string-keyed
//! `HashMap<String, Arc<dyn ToolProtocol>>` dispatch for this layer.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;

/// Outcome of a registration request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Accepted,
    Rejected,
}

/// The two sides of a match, by seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoleInMatch {
    #[serde(rename = "PLAYER_A")]
    PlayerA,
    #[serde(rename = "PLAYER_B")]
    PlayerB,
}

/// A player's parity call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    Even,
    Odd,
}

impl Parity {
    pub fn of(n: i64) -> Parity {
        if n.rem_euclid(2) == 0 {
            Parity::Even
        } else {
            Parity::Odd
        }
    }
}

/// Terminal status of a completed match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Win,
    Draw,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefereeMeta {
    pub display_name: String,
    pub version: String,
    pub game_types: Vec<String>,
    pub contact_endpoint: String,
    pub max_concurrent_matches: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerMeta {
    pub display_name: String,
    pub version: String,
    pub game_types: Vec<String>,
    pub contact_endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledMatch {
    pub match_id: String,
    pub game_type: String,
    pub player_a_id: String,
    pub player_b_id: String,
    pub referee_endpoint: String,
    /// Contact endpoint for `player_a_id`, so the assigned referee can
    /// reach a player it has no other directory lookup for.
    pub player_a_endpoint: String,
    pub player_b_endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedMatchSummary {
    pub match_id: String,
    pub status: MatchStatus,
    pub winner_player_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChooseParityContext {
    pub opponent_id: String,
    pub round_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameResult {
    pub drawn_number: i64,
    pub number_parity: Parity,
    pub status: MatchStatus,
    pub winner_player_id: Option<String>,
    pub choices: HashMap<String, Parity>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResultPayload {
    pub status: MatchStatus,
    pub winner_player_id: Option<String>,
    pub drawn_number: i64,
    pub number_parity: Parity,
    pub choices: HashMap<String, Parity>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandingsEntry {
    pub rank: u32,
    pub player_id: String,
    pub played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub points: i64,
}

/// `REFEREE_REGISTER_REQUEST`: referee -> manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefereeRegisterRequest {
    pub referee_meta: RefereeMeta,
}

/// `REFEREE_REGISTER_RESPONSE`: manager -> referee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefereeRegisterResponse {
    pub status: RegistrationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub league_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

/// `LEAGUE_REGISTER_REQUEST`: player -> manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeagueRegisterRequest {
    pub player_meta: PlayerMeta,
}

/// `LEAGUE_REGISTER_RESPONSE`: manager -> player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeagueRegisterResponse {
    pub status: RegistrationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub league_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

/// `ROUND_ANNOUNCEMENT`: manager -> players.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundAnnouncement {
    pub round_id: String,
    pub league_id: String,
    pub matches: Vec<ScheduledMatch>,
}

/// `ROUND_COMPLETED`: manager -> players.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundCompleted {
    pub round_id: String,
    pub league_id: String,
    pub completed_matches: Vec<CompletedMatchSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_round_id: Option<String>,
}

/// `GAME_INVITATION`: referee -> player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameInvitation {
    pub match_id: String,
    pub game_type: String,
    pub role_in_match: RoleInMatch,
    pub opponent_id: String,
}

/// `GAME_JOIN_ACK`: player -> referee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameJoinAck {
    pub match_id: String,
    pub accept: bool,
    pub arrival_timestamp: String,
}

/// `CHOOSE_PARITY_CALL`: referee -> player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChooseParityCall {
    pub match_id: String,
    pub game_type: String,
    pub deadline: String,
    pub context: ChooseParityContext,
}

/// `CHOOSE_PARITY_RESPONSE`: player -> referee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChooseParityResponse {
    pub match_id: String,
    pub parity_choice: Parity,
}

/// `GAME_OVER`: referee -> both players.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameOver {
    pub match_id: String,
    pub game_result: GameResult,
}

/// `MATCH_RESULT_REPORT`: referee -> manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResultReport {
    pub match_id: String,
    pub round_id: String,
    pub league_id: String,
    pub result: MatchResultPayload,
}

/// `LEAGUE_STANDINGS_UPDATE`: manager -> players.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeagueStandingsUpdate {
    pub league_id: String,
    pub round_id: String,
    pub standings: Vec<StandingsEntry>,
}

/// `LEAGUE_COMPLETED`: manager -> players.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeagueCompleted {
    pub league_id: String,
    pub total_rounds: u32,
    pub total_matches: u32,
    pub champion: String,
    pub final_standings: Vec<StandingsEntry>,
}

/// `LEAGUE_ERROR`: manager -> any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeagueError {
    pub error_code: ErrorCode,
    pub error_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

/// `GAME_ERROR`: referee -> player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameError {
    pub match_id: String,
    pub error_code: ErrorCode,
    pub error_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected_player: Option<String>,
    pub action_required: String,
    pub retry_count: u32,
    pub max_retries: u32,
    pub consequence: String,
}

/// Every payload type the protocol carries, keyed by wire `message_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "message_type")]
pub enum Payload {
    #[serde(rename = "REFEREE_REGISTER_REQUEST")]
    RefereeRegisterRequest(RefereeRegisterRequest),
    #[serde(rename = "REFEREE_REGISTER_RESPONSE")]
    RefereeRegisterResponse(RefereeRegisterResponse),
    #[serde(rename = "LEAGUE_REGISTER_REQUEST")]
    LeagueRegisterRequest(LeagueRegisterRequest),
    #[serde(rename = "LEAGUE_REGISTER_RESPONSE")]
    LeagueRegisterResponse(LeagueRegisterResponse),
    #[serde(rename = "ROUND_ANNOUNCEMENT")]
    RoundAnnouncement(RoundAnnouncement),
    #[serde(rename = "ROUND_COMPLETED")]
    RoundCompleted(RoundCompleted),
    #[serde(rename = "GAME_INVITATION")]
    GameInvitation(GameInvitation),
    #[serde(rename = "GAME_JOIN_ACK")]
    GameJoinAck(GameJoinAck),
    #[serde(rename = "CHOOSE_PARITY_CALL")]
    ChooseParityCall(ChooseParityCall),
    #[serde(rename = "CHOOSE_PARITY_RESPONSE")]
    ChooseParityResponse(ChooseParityResponse),
    #[serde(rename = "GAME_OVER")]
    GameOver(GameOver),
    #[serde(rename = "MATCH_RESULT_REPORT")]
    MatchResultReport(MatchResultReport),
    #[serde(rename = "LEAGUE_STANDINGS_UPDATE")]
    LeagueStandingsUpdate(LeagueStandingsUpdate),
    #[serde(rename = "LEAGUE_COMPLETED")]
    LeagueCompleted(LeagueCompleted),
    #[serde(rename = "LEAGUE_ERROR")]
    LeagueError(LeagueError),
    #[serde(rename = "GAME_ERROR")]
    GameError(GameError),
}

impl Payload {
    /// The wire `message_type` string for this payload, for cross-checking
    /// against the envelope's own `message_type` field at decode time.
    pub fn message_type(&self) -> &'static str {
        match self {
            Payload::RefereeRegisterRequest(_) => "REFEREE_REGISTER_REQUEST",
            Payload::RefereeRegisterResponse(_) => "REFEREE_REGISTER_RESPONSE",
            Payload::LeagueRegisterRequest(_) => "LEAGUE_REGISTER_REQUEST",
            Payload::LeagueRegisterResponse(_) => "LEAGUE_REGISTER_RESPONSE",
            Payload::RoundAnnouncement(_) => "ROUND_ANNOUNCEMENT",
            Payload::RoundCompleted(_) => "ROUND_COMPLETED",
            Payload::GameInvitation(_) => "GAME_INVITATION",
            Payload::GameJoinAck(_) => "GAME_JOIN_ACK",
            Payload::ChooseParityCall(_) => "CHOOSE_PARITY_CALL",
            Payload::ChooseParityResponse(_) => "CHOOSE_PARITY_RESPONSE",
            Payload::GameOver(_) => "GAME_OVER",
            Payload::MatchResultReport(_) => "MATCH_RESULT_REPORT",
            Payload::LeagueStandingsUpdate(_) => "LEAGUE_STANDINGS_UPDATE",
            Payload::LeagueCompleted(_) => "LEAGUE_COMPLETED",
            Payload::LeagueError(_) => "LEAGUE_ERROR",
            Payload::GameError(_) => "GAME_ERROR",
        }
    }
}
