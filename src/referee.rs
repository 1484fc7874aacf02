//! Referee match engine (spec §4.8): owns one match's state machine from
//! `CREATED` through `FINISHED`/`CANCELLED`, driving both players through
//! invitation, parity collection, and the number draw.
//!
//! Per DESIGN NOTES §9 ("give each in-flight match its own owning task
//! rather than a shared mutable table"), a referee spawns one
//! [`RefereeEngine::run_match`] per assigned match; the engine owns its
//! [`MatchRecord`] for the engine's whole lifetime, persisting each lifecycle
//! transition and transcript entry through its own [`MatchRepository`] as
//! the match progresses, and hands the finished record back to its caller
//! only for reporting.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use league_protocol::envelope::{Envelope, Role};
use league_protocol::error::ErrorCode;
use league_protocol::payload::{
    ChooseParityCall, ChooseParityContext, ChooseParityResponse, GameError, GameInvitation,
    GameOver, MatchStatus, Parity, Payload, RoleInMatch,
};
use league_protocol::{MatchRecord, MatchState};
use league_store::MatchRepository;
use uuid::Uuid;

use crate::config::LeagueConfig;
use crate::game_rule;
use crate::transport::{self, TransportError};

pub(crate) const FORFEIT_REASON: &str = "technical loss";

pub struct RefereeEngine {
    pub referee_id: String,
    pub config: Arc<LeagueConfig>,
    match_repo: MatchRepository,
}

/// Outcome of the join phase: which players accepted in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub accepted: Vec<String>,
    pub missing: Vec<String>,
}

/// Decide the join-phase outcome purely from each player's response, so it
/// can be unit tested without a network call.
pub fn decide_join_outcome(
    player_a: &str,
    player_b: &str,
    a_joined: bool,
    b_joined: bool,
) -> JoinOutcome {
    let mut accepted = Vec::new();
    let mut missing = Vec::new();
    if a_joined {
        accepted.push(player_a.to_string());
    } else {
        missing.push(player_a.to_string());
    }
    if b_joined {
        accepted.push(player_b.to_string());
    } else {
        missing.push(player_b.to_string());
    }
    JoinOutcome { accepted, missing }
}

/// Decide the match status/winner once the choice-collection phase closes,
/// given which players actually answered before the deadline.
///
/// - Both answered: resolved by [`crate::game_rule::resolve`] against the
///   drawn number.
/// - Exactly one answered: the silent player takes a technical loss, the
///   responder wins.
/// - Neither answered: the match is cancelled with no winner.
///
/// The fourth element is the forfeit reason reported alongside the result
/// (spec §4.7/S4): `Some("technical loss")` when exactly one player answered,
/// `None` otherwise.
pub fn decide_match_outcome(
    drawn_number: i64,
    player_a: &str,
    player_b: &str,
    choice_a: Option<Parity>,
    choice_b: Option<Parity>,
) -> (MatchStatus, Option<String>, HashMap<String, Parity>, Option<String>) {
    let mut choices = HashMap::new();
    if let Some(c) = choice_a {
        choices.insert(player_a.to_string(), c);
    }
    if let Some(c) = choice_b {
        choices.insert(player_b.to_string(), c);
    }

    match (choice_a, choice_b) {
        (Some(_), Some(_)) => {
            let (status, winner) = game_rule::resolve(drawn_number, &choices);
            (status, winner, choices, None)
        }
        (Some(_), None) => (MatchStatus::Win, Some(player_a.to_string()), choices, Some(FORFEIT_REASON.to_string())),
        (None, Some(_)) => (MatchStatus::Win, Some(player_b.to_string()), choices, Some(FORFEIT_REASON.to_string())),
        (None, None) => (MatchStatus::Cancelled, None, choices, None),
    }
}

impl RefereeEngine {
    pub fn new(referee_id: impl Into<String>, config: Arc<LeagueConfig>, match_repo: MatchRepository) -> Self {
        RefereeEngine {
            referee_id: referee_id.into(),
            config,
            match_repo,
        }
    }

    /// Drive a single match to completion, returning the finished record.
    /// Every outbound message is best-effort past the choice-collection
    /// phase: once a winner is decided the match result is reported
    /// regardless of whether `GAME_OVER` delivery to a player succeeds.
    pub async fn run_match(
        &self,
        mut record: MatchRecord,
        player_a_endpoint: &str,
        player_b_endpoint: &str,
        auth_token: &str,
    ) -> MatchRecord {
        self.persist_create(&record);
        self.persist_transition(&mut record, MatchState::WaitingForPlayers);

        let a_joined = self
            .invite(&record, &record.players.player_b.clone(), player_a_endpoint, RoleInMatch::PlayerA, auth_token)
            .await;
        let b_joined = self
            .invite(&record, &record.players.player_a.clone(), player_b_endpoint, RoleInMatch::PlayerB, auth_token)
            .await;
        let join_outcome = decide_join_outcome(&record.players.player_a, &record.players.player_b, a_joined, b_joined);

        if join_outcome.accepted.len() < 2 {
            self.persist_transition(&mut record, MatchState::Cancelled);
            return record;
        }

        self.persist_transition(&mut record, MatchState::CollectingChoices);
        let deadline = chrono::Utc::now() + chrono::Duration::from_std(self.config.choice_deadline).unwrap();
        let deadline_str = deadline.to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        let choice_a = self
            .collect_choice(
                &record,
                &record.players.player_a.clone(),
                player_a_endpoint,
                &deadline_str,
                &record.players.player_b.clone(),
                auth_token,
            )
            .await;
        let choice_b = self
            .collect_choice(
                &record,
                &record.players.player_b.clone(),
                player_b_endpoint,
                &deadline_str,
                &record.players.player_a.clone(),
                auth_token,
            )
            .await;

        self.persist_transition(&mut record, MatchState::DrawingNumber);
        let drawn_number = game_rule::draw_number(self.config.number_range_min, self.config.number_range_max);

        let (status, winner, choices, reason) = decide_match_outcome(
            drawn_number,
            &record.players.player_a,
            &record.players.player_b,
            choice_a,
            choice_b,
        );

        let game_result = league_protocol::payload::GameResult {
            drawn_number,
            number_parity: Parity::of(drawn_number),
            status,
            winner_player_id: winner.clone(),
            choices: choices.clone(),
            reason: reason.clone(),
        };

        for (endpoint, player_id) in [
            (player_a_endpoint, record.players.player_a.clone()),
            (player_b_endpoint, record.players.player_b.clone()),
        ] {
            let envelope = Envelope::new(
                "GAME_OVER",
                Role::Referee,
                &self.referee_id,
                Uuid::new_v4().to_string(),
                auth_token,
            );
            let payload = Payload::GameOver(GameOver {
                match_id: record.match_id.clone(),
                game_result: game_result.clone(),
            });
            let _ = self.send(endpoint, envelope, payload).await;
            self.persist_transcript(&mut record, format!("referee:{}", self.referee_id), format!("player:{player_id}"), "GAME_OVER");
        }

        self.persist_result(
            &mut record,
            league_protocol::payload::MatchResultPayload {
                status,
                winner_player_id: winner,
                drawn_number,
                number_parity: Parity::of(drawn_number),
                choices,
                reason,
            },
        );
        self.persist_transition(&mut record, MatchState::Finished);
        record
    }

    fn persist_create(&self, record: &MatchRecord) {
        if let Err(e) = self.match_repo.create(record) {
            if log::log_enabled!(log::Level::Error) {
                log::error!("failed to persist new match record {}: {e}", record.match_id);
            }
        }
    }

    fn persist_transition(&self, record: &mut MatchRecord, state: MatchState) {
        if let Err(e) = self.match_repo.append_transition(record, state) {
            if log::log_enabled!(log::Level::Error) {
                log::error!("failed to persist transition to {state:?} for match {}: {e}", record.match_id);
            }
        }
    }

    fn persist_transcript(&self, record: &mut MatchRecord, from: String, to: String, message_type: &str) {
        if let Err(e) = self.match_repo.append_transcript(record, from, to, message_type) {
            if log::log_enabled!(log::Level::Error) {
                log::error!("failed to persist transcript entry for match {}: {e}", record.match_id);
            }
        }
    }

    fn persist_result(&self, record: &mut MatchRecord, result: league_protocol::payload::MatchResultPayload) {
        if let Err(e) = self.match_repo.save_result(record, result) {
            if log::log_enabled!(log::Level::Error) {
                log::error!("failed to persist result for match {}: {e}", record.match_id);
            }
        }
    }

    async fn invite(
        &self,
        record: &MatchRecord,
        opponent_of_recipient: &str,
        endpoint: &str,
        role_in_match: RoleInMatch,
        auth_token: &str,
    ) -> bool {
        let envelope = Envelope::new(
            "GAME_INVITATION",
            Role::Referee,
            &self.referee_id,
            Uuid::new_v4().to_string(),
            auth_token,
        );
        let payload = Payload::GameInvitation(GameInvitation {
            match_id: record.match_id.clone(),
            game_type: record.game_type.clone(),
            role_in_match,
            opponent_id: opponent_of_recipient.to_string(),
        });
        let call = self.send(endpoint, envelope, payload);
        match tokio::time::timeout(self.config.join_ack_deadline, call).await {
            Ok(Ok(result)) => result.get("accept").and_then(|v| v.as_bool()).unwrap_or(false),
            _ => false,
        }
    }

    /// Collect one player's parity call, resending `CHOOSE_PARITY_CALL` on
    /// each timeout/invalid-response up to `config.choice_max_retries`
    /// times with exponential backoff (1s, 2s, 4s), per spec §4.8/S4.
    /// Emits a `GAME_ERROR` to the non-responder once retries are
    /// exhausted, just before the caller decides a technical loss.
    async fn collect_choice(
        &self,
        record: &MatchRecord,
        player_id: &str,
        endpoint: &str,
        deadline: &str,
        opponent_id: &str,
        auth_token: &str,
    ) -> Option<Parity> {
        const RETRY_BACKOFF_MS: [u64; 3] = [1000, 2000, 4000];
        let max_retries = self.config.choice_max_retries;

        for attempt in 0..=max_retries {
            let envelope = Envelope::new(
                "CHOOSE_PARITY_CALL",
                Role::Referee,
                &self.referee_id,
                Uuid::new_v4().to_string(),
                auth_token,
            );
            let payload = Payload::ChooseParityCall(ChooseParityCall {
                match_id: record.match_id.clone(),
                game_type: record.game_type.clone(),
                deadline: deadline.to_string(),
                context: ChooseParityContext {
                    opponent_id: opponent_id.to_string(),
                    round_id: record.round_id.clone(),
                },
            });
            let call = self.send(endpoint, envelope, payload);
            let answer = match tokio::time::timeout(self.config.choice_deadline, call).await {
                Ok(Ok(result)) => serde_json::from_value::<ChooseParityResponse>(result)
                    .ok()
                    .map(|r| r.parity_choice),
                _ => None,
            };
            if answer.is_some() {
                return answer;
            }

            if attempt < max_retries {
                if log::log_enabled!(log::Level::Warn) {
                    log::warn!(
                        "match {} player {player_id} missed parity call, retry {}/{max_retries}",
                        record.match_id,
                        attempt + 1
                    );
                }
                tokio::time::sleep(Duration::from_millis(RETRY_BACKOFF_MS[attempt as usize % RETRY_BACKOFF_MS.len()])).await;
            } else {
                let error_envelope = Envelope::new(
                    "GAME_ERROR",
                    Role::Referee,
                    &self.referee_id,
                    Uuid::new_v4().to_string(),
                    auth_token,
                );
                let error_payload = Payload::GameError(GameError {
                    match_id: record.match_id.clone(),
                    error_code: ErrorCode::TimeoutError,
                    error_description: format!("player {player_id} did not answer CHOOSE_PARITY_CALL after {max_retries} retries"),
                    affected_player: Some(player_id.to_string()),
                    action_required: "none".to_string(),
                    retry_count: max_retries,
                    max_retries,
                    consequence: "technical loss".to_string(),
                });
                let _ = self.send(endpoint, error_envelope, error_payload).await;
            }
        }
        None
    }

    async fn send(
        &self,
        endpoint: &str,
        envelope: Envelope,
        payload: Payload,
    ) -> Result<serde_json::Value, TransportError> {
        let mut params = serde_json::to_value(&envelope).unwrap_or_default();
        let payload_value = serde_json::to_value(&payload).unwrap_or_default();
        if let (Some(params_obj), Some(payload_obj)) = (params.as_object_mut(), payload_value.as_object()) {
            params_obj.extend(payload_obj.clone());
        }
        transport::send_rpc(endpoint, payload.message_type(), params, self.config.rpc_timeout, self.config.max_retries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_join_are_accepted() {
        let outcome = decide_join_outcome("a", "b", true, true);
        assert_eq!(outcome.accepted, vec!["a".to_string(), "b".to_string()]);
        assert!(outcome.missing.is_empty());
    }

    #[test]
    fn one_missing_join_is_recorded() {
        let outcome = decide_join_outcome("a", "b", true, false);
        assert_eq!(outcome.accepted, vec!["a".to_string()]);
        assert_eq!(outcome.missing, vec!["b".to_string()]);
    }

    #[test]
    fn both_answer_resolves_via_game_rule() {
        let (status, winner, choices, reason) =
            decide_match_outcome(4, "a", "b", Some(Parity::Even), Some(Parity::Odd));
        assert_eq!(status, MatchStatus::Win);
        assert_eq!(winner, Some("a".to_string()));
        assert_eq!(choices.len(), 2);
        assert_eq!(reason, None);
    }

    #[test]
    fn silent_player_takes_technical_loss() {
        let (status, winner, choices, reason) = decide_match_outcome(4, "a", "b", Some(Parity::Even), None);
        assert_eq!(status, MatchStatus::Win);
        assert_eq!(winner, Some("a".to_string()));
        assert_eq!(choices.len(), 1);
        assert_eq!(reason, Some("technical loss".to_string()));
    }

    #[test]
    fn both_silent_cancels_match() {
        let (status, winner, _, reason) = decide_match_outcome(4, "a", "b", None, None);
        assert_eq!(status, MatchStatus::Cancelled);
        assert!(winner.is_none());
        assert_eq!(reason, None);
    }
}
