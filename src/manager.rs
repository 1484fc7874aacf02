//! League manager orchestrator (spec §4.9): registration, scheduling,
//! round announcements, result collection, standings, and league
//! completion.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use league_protocol::envelope::{Envelope, Role};
use league_protocol::payload::{
    CompletedMatchSummary, LeagueRegisterRequest, LeagueRegisterResponse, MatchResultReport,
    MatchStatus, Payload, PlayerMeta, RefereeMeta, RefereeRegisterRequest,
    RefereeRegisterResponse, RegistrationStatus, RoundAnnouncement, RoundCompleted,
    ScheduledMatch,
};
use league_protocol::standings::ScoringWeights;
use league_protocol::{AuthTokenService, MatchRecord, MatchState, Standings};
use league_store::{MatchRepository, PlayerHistoryEntry, PlayerHistoryRepository, RoundEvent, RoundJournalEntry, RoundsJournalRepository, StandingsRepository};
use uuid::Uuid;

use crate::config::LeagueConfig;
use crate::scheduler::{round_robin_schedule, ScheduledRound};
use crate::standings;
use crate::transport;

struct RefereeRecord {
    meta: RefereeMeta,
}

struct PlayerRecord {
    meta: PlayerMeta,
}

pub struct LeagueManager {
    pub league_id: String,
    config: Arc<LeagueConfig>,
    auth: Arc<AuthTokenService>,
    referees: Mutex<HashMap<String, RefereeRecord>>,
    players: Mutex<HashMap<String, PlayerRecord>>,
    referee_cursor: AtomicUsize,
    schedule: Mutex<Vec<ScheduledRound>>,
    current_round: AtomicUsize,
    pending_matches: Mutex<HashMap<String, HashSet<String>>>,
    weights: ScoringWeights,
    standings_repo: StandingsRepository,
    match_repo: MatchRepository,
    rounds_journal: RoundsJournalRepository,
    player_history: PlayerHistoryRepository,
}

pub const GAME_TYPE: &str = "even_odd";

impl LeagueManager {
    pub fn new(league_id: impl Into<String>, config: Arc<LeagueConfig>) -> Self {
        let league_id = league_id.into();
        let league_dir = config.league_dir(&league_id);
        let auth = Arc::new(AuthTokenService::new(&config.auth_secret, config.auth_token_ttl.as_secs() as i64));
        let weights = ScoringWeights {
            win: config.win_points,
            draw: config.draw_points,
            loss: config.loss_points,
            technical_loss: config.technical_loss_points,
        };
        LeagueManager {
            standings_repo: StandingsRepository::new(&league_dir),
            match_repo: MatchRepository::new(&league_dir),
            rounds_journal: RoundsJournalRepository::new(&league_dir),
            player_history: PlayerHistoryRepository::new(&league_dir),
            league_id,
            config,
            auth,
            referees: Mutex::new(HashMap::new()),
            players: Mutex::new(HashMap::new()),
            referee_cursor: AtomicUsize::new(0),
            schedule: Mutex::new(Vec::new()),
            current_round: AtomicUsize::new(0),
            pending_matches: Mutex::new(HashMap::new()),
            weights,
        }
    }

    /// The token service validating every message this manager receives,
    /// shared with [`crate::rpc_server::AuthContext`] so the dispatch layer
    /// can reject forged senders before a handler ever sees them.
    pub fn auth_service(&self) -> Arc<AuthTokenService> {
        self.auth.clone()
    }

    pub fn register_referee(&self, meta: RefereeMeta) -> RefereeRegisterResponse {
        let referee_id = format!("ref-{}", Uuid::new_v4());
        let token = match self.auth.issue(&referee_id, &self.league_id, Role::Referee) {
            Ok(t) => t,
            Err(e) => {
                return RefereeRegisterResponse {
                    status: RegistrationStatus::Rejected,
                    referee_id: None,
                    auth_token: None,
                    league_id: None,
                    rejection_reason: Some(e.to_string()),
                }
            }
        };
        self.referees
            .lock()
            .unwrap()
            .insert(referee_id.clone(), RefereeRecord { meta });
        RefereeRegisterResponse {
            status: RegistrationStatus::Accepted,
            referee_id: Some(referee_id),
            auth_token: Some(token),
            league_id: Some(self.league_id.clone()),
            rejection_reason: None,
        }
    }

    pub fn register_player(&self, meta: PlayerMeta) -> LeagueRegisterResponse {
        if self.players.lock().unwrap().len() >= self.config.max_players {
            return LeagueRegisterResponse {
                status: RegistrationStatus::Rejected,
                player_id: None,
                auth_token: None,
                league_id: None,
                rejection_reason: Some(format!(
                    "league already has the maximum {} players",
                    self.config.max_players
                )),
            };
        }
        let player_id = format!("player-{}", Uuid::new_v4());
        let token = match self.auth.issue(&player_id, &self.league_id, Role::Player) {
            Ok(t) => t,
            Err(e) => {
                return LeagueRegisterResponse {
                    status: RegistrationStatus::Rejected,
                    player_id: None,
                    auth_token: None,
                    league_id: None,
                    rejection_reason: Some(e.to_string()),
                }
            }
        };
        self.players
            .lock()
            .unwrap()
            .insert(player_id.clone(), PlayerRecord { meta });
        LeagueRegisterResponse {
            status: RegistrationStatus::Accepted,
            player_id: Some(player_id),
            auth_token: Some(token),
            league_id: Some(self.league_id.clone()),
            rejection_reason: None,
        }
    }

    /// Close registration, build the round-robin schedule over every
    /// registered player, and persist an empty standings snapshot.
    pub fn start_league(&self) -> Result<usize, ManagerError> {
        let mut player_ids: Vec<String> = self.players.lock().unwrap().keys().cloned().collect();
        if player_ids.len() < self.config.min_players {
            return Err(ManagerError::NotEnoughPlayers {
                have: player_ids.len(),
                need: self.config.min_players,
            });
        }
        player_ids.sort();
        let rounds = round_robin_schedule(&player_ids);
        let num_rounds = rounds.len();
        *self.schedule.lock().unwrap() = rounds;
        self.current_round.store(0, Ordering::SeqCst);
        self.standings_repo
            .save(&Standings::empty(&self.league_id, &player_ids))
            .map_err(ManagerError::Store)?;
        Ok(num_rounds)
    }

    fn next_referee_endpoint(&self) -> Option<(String, String)> {
        let referees = self.referees.lock().unwrap();
        if referees.is_empty() {
            return None;
        }
        let mut ids: Vec<&String> = referees.keys().collect();
        ids.sort();
        let index = self.referee_cursor.fetch_add(1, Ordering::SeqCst) % ids.len();
        let referee_id = ids[index].clone();
        let endpoint = referees[&referee_id].meta.contact_endpoint.clone();
        Some((referee_id, endpoint))
    }

    /// Announce the round at `round_index`, assigning each match to a
    /// referee round-robin and persisting a `Created` match record for
    /// each. Broadcasts `ROUND_ANNOUNCEMENT` to every player and to every
    /// referee that owns at least one match this round.
    pub async fn announce_round(&self, round_index: usize) -> Result<(String, Vec<ScheduledMatch>), ManagerError> {
        let round = {
            let schedule = self.schedule.lock().unwrap();
            schedule.get(round_index).cloned().ok_or(ManagerError::NoSuchRound)?
        };
        let round_id = format!("round-{round_index}");

        let player_endpoints: HashMap<String, String> = self
            .players
            .lock()
            .unwrap()
            .iter()
            .map(|(id, rec)| (id.clone(), rec.meta.contact_endpoint.clone()))
            .collect();

        let mut scheduled_matches = Vec::new();
        let mut match_ids = HashSet::new();
        let mut referee_endpoints_used: HashMap<String, String> = HashMap::new();

        for (player_a, player_b) in &round.pairs {
            let (referee_id, referee_endpoint) = self
                .next_referee_endpoint()
                .ok_or(ManagerError::NoRefereesAvailable)?;
            let match_id = format!("match-{}", Uuid::new_v4());

            let record = MatchRecord::new(
                &match_id,
                &round_id,
                &self.league_id,
                GAME_TYPE,
                &referee_id,
                player_a,
                player_b,
            );
            self.match_repo.save(&record).map_err(ManagerError::Store)?;

            scheduled_matches.push(ScheduledMatch {
                match_id: match_id.clone(),
                game_type: GAME_TYPE.to_string(),
                player_a_id: player_a.clone(),
                player_b_id: player_b.clone(),
                referee_endpoint: referee_endpoint.clone(),
                player_a_endpoint: player_endpoints.get(player_a).cloned().unwrap_or_default(),
                player_b_endpoint: player_endpoints.get(player_b).cloned().unwrap_or_default(),
            });
            match_ids.insert(match_id);
            referee_endpoints_used.insert(referee_id, referee_endpoint);
        }

        self.pending_matches
            .lock()
            .unwrap()
            .insert(round_id.clone(), match_ids.clone());

        self.rounds_journal
            .append(RoundJournalEntry {
                round_id: round_id.clone(),
                league_id: self.league_id.clone(),
                event: RoundEvent::Announced,
                timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                match_ids: match_ids.into_iter().collect(),
            })
            .map_err(ManagerError::Store)?;

        let announcement = RoundAnnouncement {
            round_id: round_id.clone(),
            league_id: self.league_id.clone(),
            matches: scheduled_matches.clone(),
        };

        for endpoint in player_endpoints.values() {
            self.broadcast(endpoint, "ROUND_ANNOUNCEMENT", Payload::RoundAnnouncement(announcement.clone())).await;
        }
        for endpoint in referee_endpoints_used.values() {
            self.broadcast(endpoint, "ROUND_ANNOUNCEMENT", Payload::RoundAnnouncement(announcement.clone())).await;
        }

        Ok((round_id, scheduled_matches))
    }

    /// Record a referee's reported result, update standings and player
    /// history, and — if every match in the round has now reported —
    /// announce `ROUND_COMPLETED` (or `LEAGUE_COMPLETED` for the last
    /// round).
    pub async fn report_match_result(&self, report: MatchResultReport) -> Result<(), ManagerError> {
        let mut record = self.match_repo.load(&report.match_id).map_err(ManagerError::Store)?;
        if record.result.is_some() {
            if log::log_enabled!(log::Level::Warn) {
                log::warn!(
                    "ignoring duplicate result report for match {}",
                    report.match_id
                );
            }
            return Ok(());
        }
        record.result = Some(report.result.clone());
        record.push_state(if report.result.status == MatchStatus::Cancelled {
            MatchState::Cancelled
        } else {
            MatchState::Finished
        });
        self.match_repo.save(&record).map_err(ManagerError::Store)?;

        let mut standings = self.standings_repo.load().map_err(ManagerError::Store)?;
        let forfeit = report.result.reason.as_deref() == Some(crate::referee::FORFEIT_REASON);
        standings::apply_match_result(
            &mut standings,
            &self.weights,
            &record.players.player_a,
            &record.players.player_b,
            report.result.status,
            report.result.winner_player_id.as_deref(),
            forfeit,
        );
        standings.rounds_completed = standings.rounds_completed.max(0);
        self.standings_repo.save(&standings).map_err(ManagerError::Store)?;

        for (player_id, opponent_id) in [
            (&record.players.player_a, &record.players.player_b),
            (&record.players.player_b, &record.players.player_a),
        ] {
            self.player_history
                .append(
                    player_id,
                    PlayerHistoryEntry {
                        match_id: report.match_id.clone(),
                        round_id: report.round_id.clone(),
                        opponent_id: opponent_id.clone(),
                        result: format!("{:?}", report.result.status).to_uppercase(),
                        timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                    },
                )
                .map_err(ManagerError::Store)?;
        }

        let round_done = {
            let mut pending = self.pending_matches.lock().unwrap();
            if let Some(set) = pending.get_mut(&report.round_id) {
                set.remove(&report.match_id);
                set.is_empty()
            } else {
                false
            }
        };

        if round_done {
            self.complete_round(&report.round_id).await?;
        }

        Ok(())
    }

    async fn complete_round(&self, round_id: &str) -> Result<(), ManagerError> {
        let matches = self.match_repo.load_for_round(round_id).map_err(ManagerError::Store)?;
        let completed_matches: Vec<CompletedMatchSummary> = matches
            .iter()
            .filter_map(|m| {
                m.result.as_ref().map(|r| CompletedMatchSummary {
                    match_id: m.match_id.clone(),
                    status: r.status,
                    winner_player_id: r.winner_player_id.clone(),
                })
            })
            .collect();

        let mut standings = self.standings_repo.load().map_err(ManagerError::Store)?;
        standings.rounds_completed += 1;
        self.standings_repo.save(&standings).map_err(ManagerError::Store)?;

        self.rounds_journal
            .append(RoundJournalEntry {
                round_id: round_id.to_string(),
                league_id: self.league_id.clone(),
                event: RoundEvent::Completed,
                timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                match_ids: completed_matches.iter().map(|m| m.match_id.clone()).collect(),
            })
            .map_err(ManagerError::Store)?;

        let current = self.current_round.fetch_add(1, Ordering::SeqCst);
        let total_rounds = self.schedule.lock().unwrap().len();
        let next_round_id = if current + 1 < total_rounds {
            Some(format!("round-{}", current + 1))
        } else {
            None
        };

        let player_endpoints: Vec<String> = self
            .players
            .lock()
            .unwrap()
            .values()
            .map(|rec| rec.meta.contact_endpoint.clone())
            .collect();

        let round_completed = RoundCompleted {
            round_id: round_id.to_string(),
            league_id: self.league_id.clone(),
            completed_matches,
            next_round_id: next_round_id.clone(),
        };
        for endpoint in &player_endpoints {
            self.broadcast(endpoint, "ROUND_COMPLETED", Payload::RoundCompleted(round_completed.clone())).await;
        }

        if next_round_id.is_none() {
            self.complete_league(&player_endpoints).await?;
        }

        Ok(())
    }

    async fn complete_league(&self, player_endpoints: &[String]) -> Result<(), ManagerError> {
        let standings = self.standings_repo.load().map_err(ManagerError::Store)?;
        let champion = standings::champion(&standings)
            .map(|e| e.player_id.clone())
            .unwrap_or_default();
        let total_rounds = self.schedule.lock().unwrap().len() as u32;
        let total_matches = self.rounds_journal.all().map_err(ManagerError::Store)?
            .iter()
            .filter(|e| e.event == RoundEvent::Completed)
            .map(|e| e.match_ids.len())
            .sum::<usize>() as u32;

        let completed = league_protocol::payload::LeagueCompleted {
            league_id: self.league_id.clone(),
            total_rounds,
            total_matches,
            champion,
            final_standings: standings.standings.clone(),
        };
        for endpoint in player_endpoints {
            self.broadcast(endpoint, "LEAGUE_COMPLETED", Payload::LeagueCompleted(completed.clone())).await;
        }
        Ok(())
    }

    async fn broadcast(&self, endpoint: &str, method: &str, payload: Payload) {
        let token = self
            .auth
            .issue("manager", &self.league_id, Role::LeagueManager)
            .unwrap_or_default();
        let envelope = Envelope::new(method, Role::LeagueManager, "manager", Uuid::new_v4().to_string(), token);
        let mut params = serde_json::to_value(&envelope).unwrap_or_default();
        let payload_value = serde_json::to_value(&payload).unwrap_or_default();
        if let (Some(p), Some(v)) = (params.as_object_mut(), payload_value.as_object()) {
            p.extend(v.clone());
        }
        if let Err(e) = transport::send_rpc(endpoint, method, params, self.config.rpc_timeout, self.config.max_retries).await {
            if log::log_enabled!(log::Level::Warn) {
                log::warn!("broadcast {method} to {endpoint} failed: {e}");
            }
        }
    }
}

#[derive(Debug)]
pub enum ManagerError {
    NoSuchRound,
    NoRefereesAvailable,
    NotEnoughPlayers { have: usize, need: usize },
    Store(league_store::StoreError),
}

impl std::fmt::Display for ManagerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManagerError::NoSuchRound => write!(f, "no such round"),
            ManagerError::NoRefereesAvailable => write!(f, "no referees registered"),
            ManagerError::NotEnoughPlayers { have, need } => {
                write!(f, "league needs at least {need} players to start, has {have}")
            }
            ManagerError::Store(e) => write!(f, "storage error: {e}"),
        }
    }
}

impl std::error::Error for ManagerError {}
