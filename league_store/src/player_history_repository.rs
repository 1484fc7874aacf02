//! Per-player match history, one JSON array file per player under
//! `<league_dir>/players/<player_id>.json`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::atomic::{read_json, write_json};
use crate::error::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerHistoryEntry {
    pub match_id: String,
    pub round_id: String,
    pub opponent_id: String,
    pub result: String,
    pub timestamp: String,
}

pub struct PlayerHistoryRepository {
    dir: PathBuf,
}

impl PlayerHistoryRepository {
    pub fn new(league_dir: impl Into<PathBuf>) -> Self {
        PlayerHistoryRepository {
            dir: league_dir.into().join("players"),
        }
    }

    fn path_for(&self, player_id: &str) -> PathBuf {
        self.dir.join(format!("{player_id}.json"))
    }

    pub fn history_for(&self, player_id: &str) -> Result<Vec<PlayerHistoryEntry>, StoreError> {
        let path = self.path_for(player_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        read_json(&path)
    }

    pub fn append(&self, player_id: &str, entry: PlayerHistoryEntry) -> Result<(), StoreError> {
        let mut history = self.history_for(player_id)?;
        history.push(entry);
        write_json(&self.path_for(player_id), &history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(match_id: &str) -> PlayerHistoryEntry {
        PlayerHistoryEntry {
            match_id: match_id.to_string(),
            round_id: "r1".to_string(),
            opponent_id: "p2".to_string(),
            result: "WIN".to_string(),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn append_builds_history_per_player() {
        let dir = tempfile::tempdir().unwrap();
        let repo = PlayerHistoryRepository::new(dir.path());
        repo.append("p1", entry("m1")).unwrap();
        repo.append("p1", entry("m2")).unwrap();
        let history = repo.history_for("p1").unwrap();
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn unknown_player_has_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let repo = PlayerHistoryRepository::new(dir.path());
        assert!(repo.history_for("ghost").unwrap().is_empty());
    }
}
