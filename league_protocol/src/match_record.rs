//! The per-match persisted record (spec §4.8, §6 persisted state layout):
//! state-machine position, lifecycle history, message transcript, and the
//! final result once the match finishes.

use serde::{Deserialize, Serialize};

use crate::payload::MatchResultPayload;

/// Referee-side match state machine positions (spec §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchState {
    Created,
    WaitingForPlayers,
    CollectingChoices,
    DrawingNumber,
    Finished,
    Cancelled,
}

impl MatchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchState::Finished | MatchState::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEntry {
    pub state: MatchState,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub seq: u64,
    pub timestamp: String,
    pub from: String,
    pub to: String,
    pub message_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchPlayers {
    pub player_a: String,
    pub player_b: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub match_id: String,
    pub round_id: String,
    pub league_id: String,
    pub game_type: String,
    pub referee_id: String,
    pub players: MatchPlayers,
    pub lifecycle: Vec<LifecycleEntry>,
    pub transcript: Vec<TranscriptEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<MatchResultPayload>,
}

impl MatchRecord {
    pub fn new(
        match_id: impl Into<String>,
        round_id: impl Into<String>,
        league_id: impl Into<String>,
        game_type: impl Into<String>,
        referee_id: impl Into<String>,
        player_a: impl Into<String>,
        player_b: impl Into<String>,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        MatchRecord {
            match_id: match_id.into(),
            round_id: round_id.into(),
            league_id: league_id.into(),
            game_type: game_type.into(),
            referee_id: referee_id.into(),
            players: MatchPlayers {
                player_a: player_a.into(),
                player_b: player_b.into(),
            },
            lifecycle: vec![LifecycleEntry {
                state: MatchState::Created,
                timestamp: now,
            }],
            transcript: Vec::new(),
            result: None,
        }
    }

    pub fn current_state(&self) -> MatchState {
        self.lifecycle
            .last()
            .map(|e| e.state)
            .unwrap_or(MatchState::Created)
    }

    pub fn push_state(&mut self, state: MatchState) {
        self.lifecycle.push(LifecycleEntry {
            state,
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        });
    }

    pub fn push_transcript(&mut self, from: impl Into<String>, to: impl Into<String>, message_type: impl Into<String>) {
        let seq = self.transcript.len() as u64;
        self.transcript.push(TranscriptEntry {
            seq,
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            from: from.into(),
            to: to.into(),
            message_type: message_type.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_match_starts_created() {
        let m = MatchRecord::new("m1", "r1", "l1", "even_odd", "ref1", "pa", "pb");
        assert_eq!(m.current_state(), MatchState::Created);
        assert!(!m.current_state().is_terminal());
    }

    #[test]
    fn push_state_advances_lifecycle_in_order() {
        let mut m = MatchRecord::new("m1", "r1", "l1", "even_odd", "ref1", "pa", "pb");
        m.push_state(MatchState::WaitingForPlayers);
        m.push_state(MatchState::CollectingChoices);
        assert_eq!(m.lifecycle.len(), 3);
        assert_eq!(m.current_state(), MatchState::CollectingChoices);
    }

    #[test]
    fn transcript_sequence_numbers_increase() {
        let mut m = MatchRecord::new("m1", "r1", "l1", "even_odd", "ref1", "pa", "pb");
        m.push_transcript("referee:ref1", "player:pa", "GAME_INVITATION");
        m.push_transcript("player:pa", "referee:ref1", "GAME_JOIN_ACK");
        assert_eq!(m.transcript[0].seq, 0);
        assert_eq!(m.transcript[1].seq, 1);
    }
}
