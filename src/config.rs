//! Configuration for the Even/Odd league system.
//!
//! Provides [`LeagueConfig`] for the process-wide settings every component
//! needs. Users construct this manually — no TOML, YAML, or other
//! config-file parsing dependencies are introduced; callers that want
//! file-based config can fold a file into these fields themselves.
//!
//! # Example
//!
//! ```rust
//! use evenodd_league::config::LeagueConfig;
//! use std::path::PathBuf;
//!
//! let config = LeagueConfig {
//!     data_dir: PathBuf::from("/var/data/evenodd_league"),
//!     ..LeagueConfig::default()
//! };
//! ```

use std::path::PathBuf;
use std::time::Duration;

/// Global configuration shared by the manager, referee, and player binaries.
pub struct LeagueConfig {
    /// Directory where per-league JSON state (standings, match records,
    /// rounds journal, player history) is persisted.
    pub data_dir: PathBuf,
    /// Symmetric secret used to sign and verify auth tokens. In production
    /// this should come from a secrets manager, not a literal default.
    pub auth_secret: Vec<u8>,
    /// Auth token lifetime.
    pub auth_token_ttl: Duration,
    /// Per-request RPC timeout before a retry/backoff cycle kicks in.
    pub rpc_timeout: Duration,
    /// Maximum RPC retry attempts before the circuit breaker for an
    /// endpoint opens.
    pub max_retries: u32,
    /// Deadline a player is given to accept a `GAME_INVITATION` before the
    /// referee treats it as a non-join.
    pub join_ack_deadline: Duration,
    /// Deadline a player is given to respond to `CHOOSE_PARITY_CALL` (per
    /// attempt) before the referee retries or declares a technical loss.
    pub choice_deadline: Duration,
    /// Number of `CHOOSE_PARITY_CALL` retries a referee makes, beyond the
    /// first attempt, before declaring a technical loss.
    pub choice_max_retries: u32,
    /// Lower bound (inclusive) of the number draw range.
    pub number_range_min: i64,
    /// Upper bound (inclusive) of the number draw range.
    pub number_range_max: i64,
    /// Fewest registered players a league may start with.
    pub min_players: usize,
    /// Most players a league will accept registrations from.
    pub max_players: usize,
    /// Directory the JSONL audit log is appended to.
    pub log_dir: PathBuf,
    /// Standings points awarded to the winner of a match.
    pub win_points: i64,
    /// Standings points awarded to each side of a draw.
    pub draw_points: i64,
    /// Standings points awarded to the loser of an ordinary match.
    pub loss_points: i64,
    /// Standings points awarded to the loser of a forfeited or cancelled
    /// match (spec §4.7), distinct from `loss_points`.
    pub technical_loss_points: i64,
}

impl Default for LeagueConfig {
    /// A config suitable for local development: state under `./league_data`,
    /// logs under `./league_logs`, a one-hour token lifetime, a 5-second RPC
    /// timeout, 3 retries, a 5-second join-ack deadline, a 30-second choice
    /// deadline with 3 attempts, the default `[0, 99]` draw range from
    /// spec §9's resolved open question, and scoring of 3/1/0/0 points for
    /// win/draw/loss/technical-loss.
    fn default() -> Self {
        LeagueConfig {
            data_dir: PathBuf::from("league_data"),
            auth_secret: b"dev-only-secret-change-in-production".to_vec(),
            auth_token_ttl: Duration::from_secs(3600),
            rpc_timeout: Duration::from_secs(5),
            max_retries: 3,
            join_ack_deadline: Duration::from_secs(5),
            choice_deadline: Duration::from_secs(30),
            choice_max_retries: 3,
            number_range_min: 0,
            number_range_max: 99,
            min_players: 2,
            max_players: 64,
            log_dir: PathBuf::from("league_logs"),
            win_points: 3,
            draw_points: 1,
            loss_points: 0,
            technical_loss_points: 0,
        }
    }
}

impl LeagueConfig {
    pub fn league_dir(&self, league_id: &str) -> PathBuf {
        self.data_dir.join(league_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_draw_range() {
        let config = LeagueConfig::default();
        assert!(config.number_range_min < config.number_range_max);
    }

    #[test]
    fn league_dir_nests_under_data_dir() {
        let config = LeagueConfig::default();
        let dir = config.league_dir("league-1");
        assert_eq!(dir, PathBuf::from("league_data/league-1"));
    }
}
