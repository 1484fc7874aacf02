//! `league_store` — atomic JSON file repositories for league persisted
//! state (spec §4.5, §6 persisted state layout).
//!
//! Every repository follows the teacher's synchronous, `Result`-returning
//! style; writes go through [`atomic::write_atomic`] so a reader never
//! observes a half-written file.

pub mod atomic;
pub mod error;
pub mod match_repository;
pub mod player_history_repository;
pub mod rounds_journal_repository;
pub mod standings_repository;

pub use error::StoreError;
pub use match_repository::MatchRepository;
pub use player_history_repository::{PlayerHistoryEntry, PlayerHistoryRepository};
pub use rounds_journal_repository::{RoundEvent, RoundJournalEntry, RoundsJournalRepository};
pub use standings_repository::StandingsRepository;
