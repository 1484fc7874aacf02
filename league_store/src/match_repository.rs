//! Repository for per-match records, one JSON file per match under
//! `<league_dir>/matches/<match_id>.json`.

use std::path::PathBuf;

use league_protocol::payload::MatchResultPayload;
use league_protocol::{MatchRecord, MatchState};

use crate::atomic::{read_json, write_json};
use crate::error::StoreError;

pub struct MatchRepository {
    dir: PathBuf,
}

impl MatchRepository {
    pub fn new(league_dir: impl Into<PathBuf>) -> Self {
        MatchRepository {
            dir: league_dir.into().join("matches"),
        }
    }

    fn path_for(&self, match_id: &str) -> PathBuf {
        self.dir.join(format!("{match_id}.json"))
    }

    pub fn load(&self, match_id: &str) -> Result<MatchRecord, StoreError> {
        let path = self.path_for(match_id);
        if !path.exists() {
            return Err(StoreError::NotFound(format!("match {match_id}")));
        }
        read_json(&path)
    }

    pub fn save(&self, record: &MatchRecord) -> Result<(), StoreError> {
        write_json(&self.path_for(&record.match_id), record)
    }

    pub fn exists(&self, match_id: &str) -> bool {
        self.path_for(match_id).exists()
    }

    /// Persist a freshly-created record. Equivalent to [`Self::save`], kept
    /// as a distinct name for the referee-ownership write path: a match's
    /// first write is a create, everything after it is an append.
    pub fn create(&self, record: &MatchRecord) -> Result<(), StoreError> {
        self.save(record)
    }

    /// Append one lifecycle transition and persist the record.
    pub fn append_transition(&self, record: &mut MatchRecord, state: MatchState) -> Result<(), StoreError> {
        record.push_state(state);
        self.save(record)
    }

    /// Append one transcript entry and persist the record.
    pub fn append_transcript(
        &self,
        record: &mut MatchRecord,
        from: impl Into<String>,
        to: impl Into<String>,
        message_type: impl Into<String>,
    ) -> Result<(), StoreError> {
        record.push_transcript(from, to, message_type);
        self.save(record)
    }

    /// Attach the final result and persist the record.
    pub fn save_result(&self, record: &mut MatchRecord, result: MatchResultPayload) -> Result<(), StoreError> {
        record.result = Some(result);
        self.save(record)
    }

    /// Load every match record for a round, skipping any file that fails to
    /// parse rather than aborting the whole scan — a corrupt single match
    /// record should not make the rest of a round unreadable.
    pub fn load_for_round(&self, round_id: &str) -> Result<Vec<MatchRecord>, StoreError> {
        let mut out = Vec::new();
        if !self.dir.exists() {
            return Ok(out);
        }
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.path().extension().map(|e| e == "json").unwrap_or(false) {
                continue;
            }
            if let Ok(record) = read_json::<MatchRecord>(&entry.path()) {
                if record.round_id == round_id {
                    out.push(record);
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MatchRecord {
        MatchRecord::new("m1", "r1", "l1", "even_odd", "ref1", "pa", "pb")
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let repo = MatchRepository::new(dir.path());
        repo.save(&sample()).unwrap();
        let loaded = repo.load("m1").unwrap();
        assert_eq!(loaded.match_id, "m1");
    }

    #[test]
    fn load_missing_match_errors_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let repo = MatchRepository::new(dir.path());
        assert!(matches!(repo.load("ghost"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn append_transition_persists_incrementally() {
        let dir = tempfile::tempdir().unwrap();
        let repo = MatchRepository::new(dir.path());
        let mut record = sample();
        repo.create(&record).unwrap();
        repo.append_transition(&mut record, MatchState::WaitingForPlayers).unwrap();
        let reloaded = repo.load("m1").unwrap();
        assert_eq!(reloaded.current_state(), MatchState::WaitingForPlayers);
    }

    #[test]
    fn append_transcript_persists_incrementally() {
        let dir = tempfile::tempdir().unwrap();
        let repo = MatchRepository::new(dir.path());
        let mut record = sample();
        repo.create(&record).unwrap();
        repo.append_transcript(&mut record, "referee:ref1", "player:pa", "GAME_INVITATION").unwrap();
        let reloaded = repo.load("m1").unwrap();
        assert_eq!(reloaded.transcript.len(), 1);
    }

    #[test]
    fn load_for_round_filters_by_round_id() {
        let dir = tempfile::tempdir().unwrap();
        let repo = MatchRepository::new(dir.path());
        repo.save(&MatchRecord::new("m1", "r1", "l1", "even_odd", "ref1", "pa", "pb"))
            .unwrap();
        repo.save(&MatchRecord::new("m2", "r2", "l1", "even_odd", "ref1", "pa", "pc"))
            .unwrap();
        let round1 = repo.load_for_round("r1").unwrap();
        assert_eq!(round1.len(), 1);
        assert_eq!(round1[0].match_id, "m1");
    }
}
