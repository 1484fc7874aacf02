//! Repository for the single versioned standings snapshot per league.

use std::path::PathBuf;

use league_protocol::Standings;

use crate::atomic::{read_json, write_json};
use crate::error::StoreError;

pub struct StandingsRepository {
    path: PathBuf,
}

impl StandingsRepository {
    pub fn new(league_dir: impl Into<PathBuf>) -> Self {
        StandingsRepository {
            path: league_dir.into().join("standings.json"),
        }
    }

    pub fn load(&self) -> Result<Standings, StoreError> {
        read_json(&self.path)
    }

    pub fn save(&self, standings: &Standings) -> Result<(), StoreError> {
        write_json(&self.path, standings)
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let repo = StandingsRepository::new(dir.path());
        let standings = Standings::empty("league-1", &["p1".to_string(), "p2".to_string()]);
        repo.save(&standings).unwrap();
        let loaded = repo.load().unwrap();
        assert_eq!(loaded.league_id, "league-1");
        assert_eq!(loaded.standings.len(), 2);
    }

    #[test]
    fn missing_standings_does_not_exist() {
        let dir = tempfile::tempdir().unwrap();
        let repo = StandingsRepository::new(dir.path());
        assert!(!repo.exists());
    }
}
