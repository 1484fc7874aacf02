//! Append-only journal of round lifecycle events, persisted as a single
//! JSON array file per league: `<league_dir>/rounds_journal.json`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::atomic::{read_json, write_json};
use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundEvent {
    Announced,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundJournalEntry {
    pub round_id: String,
    pub league_id: String,
    pub event: RoundEvent,
    pub timestamp: String,
    pub match_ids: Vec<String>,
}

pub struct RoundsJournalRepository {
    path: PathBuf,
}

impl RoundsJournalRepository {
    pub fn new(league_dir: impl Into<PathBuf>) -> Self {
        RoundsJournalRepository {
            path: league_dir.into().join("rounds_journal.json"),
        }
    }

    fn load_all(&self) -> Result<Vec<RoundJournalEntry>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        read_json(&self.path)
    }

    pub fn append(&self, entry: RoundJournalEntry) -> Result<(), StoreError> {
        let mut entries = self.load_all()?;
        entries.push(entry);
        write_json(&self.path, &entries)
    }

    pub fn entries_for_round(&self, round_id: &str) -> Result<Vec<RoundJournalEntry>, StoreError> {
        Ok(self
            .load_all()?
            .into_iter()
            .filter(|e| e.round_id == round_id)
            .collect())
    }

    pub fn all(&self) -> Result<Vec<RoundJournalEntry>, StoreError> {
        self.load_all()
    }
}
