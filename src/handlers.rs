//! Per-role [`RpcHandler`](crate::rpc_server::RpcHandler) implementations:
//! the thin layer that turns a decoded envelope+payload into a call against
//! [`LeagueManager`], [`RefereeEngine`], or [`PlayerAgent`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use league_protocol::payload::{
    GameJoinAck, MatchResultReport, Payload, RoleInMatch,
};
use league_protocol::{Envelope, MatchRecord, MatchState};
use league_store::MatchRepository;
use uuid::Uuid;

use crate::config::LeagueConfig;
use crate::logging::JsonlLogger;
use crate::manager::LeagueManager;
use crate::referee::RefereeEngine;
use crate::rpc_server::{HandlerResult, RpcHandler};
use crate::transport;
use crate::player::PlayerAgent;

fn value_of<T: serde::Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

pub struct ManagerHandler {
    pub manager: Arc<LeagueManager>,
    pub audit_log: Option<Arc<JsonlLogger>>,
}

#[async_trait]
impl RpcHandler for ManagerHandler {
    async fn handle(&self, envelope: Envelope, payload: Payload) -> HandlerResult {
        if let Some(log) = &self.audit_log {
            let _ = log.record("MESSAGE_RECEIVED", value_of(&envelope));
        }
        match payload {
            Payload::RefereeRegisterRequest(req) => {
                let response = self.manager.register_referee(req.referee_meta);
                Ok(value_of(&response))
            }
            Payload::LeagueRegisterRequest(req) => {
                let response = self.manager.register_player(req.player_meta);
                Ok(value_of(&response))
            }
            Payload::MatchResultReport(report) => {
                self.manager
                    .report_match_result(report)
                    .await
                    .map_err(|e| (-32000, e.to_string()))?;
                Ok(serde_json::json!({"acknowledged": true}))
            }
            other => Err((-32601, format!("manager does not accept {}", other.message_type()))),
        }
    }
}

/// Tracks which referee-owned matches are currently running, so the
/// handler doesn't spawn the same match twice if a retrying manager
/// re-delivers a round announcement.
pub struct RefereeHandler {
    pub referee_id: String,
    pub league_id: String,
    pub config: Arc<LeagueConfig>,
    pub manager_endpoint: String,
    pub own_endpoint: String,
    pub auth_token: Mutex<String>,
    in_flight: Mutex<HashMap<String, ()>>,
}

impl RefereeHandler {
    pub fn new(
        referee_id: impl Into<String>,
        league_id: impl Into<String>,
        config: Arc<LeagueConfig>,
        manager_endpoint: impl Into<String>,
        own_endpoint: impl Into<String>,
    ) -> Self {
        RefereeHandler {
            referee_id: referee_id.into(),
            league_id: league_id.into(),
            config,
            manager_endpoint: manager_endpoint.into(),
            own_endpoint: own_endpoint.into(),
            auth_token: Mutex::new(String::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_auth_token(&self, token: String) {
        *self.auth_token.lock().unwrap() = token;
    }
}

#[async_trait]
impl RpcHandler for RefereeHandler {
    async fn handle(&self, _envelope: Envelope, payload: Payload) -> HandlerResult {
        match payload {
            Payload::RoundAnnouncement(announcement) => {
                let my_matches: Vec<_> = announcement
                    .matches
                    .iter()
                    .filter(|m| m.referee_endpoint == self.own_endpoint)
                    .cloned()
                    .collect();

                for scheduled in my_matches {
                    let already_running = {
                        let mut flight = self.in_flight.lock().unwrap();
                        if flight.contains_key(&scheduled.match_id) {
                            true
                        } else {
                            flight.insert(scheduled.match_id.clone(), ());
                            false
                        }
                    };
                    if already_running {
                        continue;
                    }

                    let match_repo = MatchRepository::new(self.config.league_dir(&self.league_id));
                    let engine = RefereeEngine::new(self.referee_id.clone(), self.config.clone(), match_repo);
                    let manager_endpoint = self.manager_endpoint.clone();
                    let auth_token = self.auth_token.lock().unwrap().clone();
                    let round_id = announcement.round_id.clone();
                    let league_id = announcement.league_id.clone();

                    tokio::spawn(async move {
                        let record = MatchRecord::new(
                            &scheduled.match_id,
                            &round_id,
                            &league_id,
                            &scheduled.game_type,
                            &engine.referee_id,
                            &scheduled.player_a_id,
                            &scheduled.player_b_id,
                        );
                        let finished = engine
                            .run_match(record, &scheduled.player_a_endpoint, &scheduled.player_b_endpoint, &auth_token)
                            .await;

                        if let Some(result) = finished.result.clone() {
                            let report = MatchResultReport {
                                match_id: finished.match_id.clone(),
                                round_id: finished.round_id.clone(),
                                league_id: finished.league_id.clone(),
                                result,
                            };
                            let envelope = Envelope::new(
                                "MATCH_RESULT_REPORT",
                                league_protocol::Role::Referee,
                                &engine.referee_id,
                                Uuid::new_v4().to_string(),
                                auth_token.clone(),
                            );
                            let mut params = value_of(&envelope);
                            let payload_value = value_of(&Payload::MatchResultReport(report));
                            if let (Some(p), Some(v)) = (params.as_object_mut(), payload_value.as_object()) {
                                p.extend(v.clone());
                            }
                            if let Err(e) = transport::send_rpc(
                                &manager_endpoint,
                                "MATCH_RESULT_REPORT",
                                params,
                                engine.config.rpc_timeout,
                                engine.config.max_retries,
                            )
                            .await
                            {
                                if log::log_enabled!(log::Level::Error) {
                                    log::error!("failed to report match result for {}: {e}", finished.match_id);
                                }
                            }
                        } else if log::log_enabled!(log::Level::Warn) {
                            log::warn!("match {} finished in state {:?} with no result", finished.match_id, finished.current_state());
                        }
                        debug_assert!(finished.current_state() == MatchState::Finished || finished.current_state() == MatchState::Cancelled);
                    });
                }

                Ok(serde_json::json!({"acknowledged": true}))
            }
            other => Err((-32601, format!("referee does not accept {}", other.message_type()))),
        }
    }
}

pub struct PlayerHandler {
    pub agent: Arc<PlayerAgent>,
}

#[async_trait]
impl RpcHandler for PlayerHandler {
    async fn handle(&self, _envelope: Envelope, payload: Payload) -> HandlerResult {
        match payload {
            Payload::GameInvitation(invitation) => {
                let role_label = match invitation.role_in_match {
                    RoleInMatch::PlayerA => "PLAYER_A",
                    RoleInMatch::PlayerB => "PLAYER_B",
                };
                if log::log_enabled!(log::Level::Info) {
                    log::info!("invited to match {} as {role_label}", invitation.match_id);
                }
                Ok(value_of(&GameJoinAck {
                    match_id: invitation.match_id,
                    accept: true,
                    arrival_timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                }))
            }
            Payload::ChooseParityCall(call) => {
                let choice = self.agent.strategy.choose_parity(&call.match_id, &call.context).await;
                Ok(value_of(&league_protocol::payload::ChooseParityResponse {
                    match_id: call.match_id,
                    parity_choice: choice,
                }))
            }
            Payload::GameOver(game_over) => {
                if log::log_enabled!(log::Level::Info) {
                    log::info!("match {} finished: {:?}", game_over.match_id, game_over.game_result.status);
                }
                Ok(serde_json::json!({"acknowledged": true}))
            }
            Payload::RoundAnnouncement(_)
            | Payload::RoundCompleted(_)
            | Payload::LeagueStandingsUpdate(_)
            | Payload::LeagueCompleted(_) => Ok(serde_json::json!({"acknowledged": true})),
            Payload::LeagueError(err) => {
                if log::log_enabled!(log::Level::Warn) {
                    log::warn!("league error {}: {}", err.error_code, err.error_description);
                }
                Ok(serde_json::json!({"acknowledged": true}))
            }
            Payload::GameError(err) => {
                if log::log_enabled!(log::Level::Warn) {
                    log::warn!("game error on {}: {} ({})", err.match_id, err.error_description, err.error_code);
                }
                Ok(serde_json::json!({"acknowledged": true}))
            }
            other => Err((-32601, format!("player does not accept {}", other.message_type()))),
        }
    }
}
