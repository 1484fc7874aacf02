//! The persisted standings snapshot (spec §6 persisted state layout, §4.7).

use serde::{Deserialize, Serialize};

use crate::payload::StandingsEntry;

/// Point weights applied by the standings engine on each match result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub win: i64,
    pub draw: i64,
    pub loss: i64,
    pub technical_loss: i64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        ScoringWeights {
            win: 3,
            draw: 1,
            loss: 0,
            technical_loss: 0,
        }
    }
}

/// A versioned, persisted snapshot of league standings.
///
/// `version` increments on every write so a concurrent reader (§5's
/// single-writer/many-reader model) can detect a torn read against the
/// atomically-replaced file and retry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Standings {
    pub league_id: String,
    pub version: u64,
    pub last_updated: String,
    pub rounds_completed: u32,
    pub standings: Vec<StandingsEntry>,
}

impl Standings {
    pub fn empty(league_id: impl Into<String>, player_ids: &[String]) -> Self {
        let standings = player_ids
            .iter()
            .map(|id| StandingsEntry {
                rank: 1,
                player_id: id.clone(),
                played: 0,
                wins: 0,
                draws: 0,
                losses: 0,
                points: 0,
            })
            .collect();
        Standings {
            league_id: league_id.into(),
            version: 0,
            last_updated: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            rounds_completed: 0,
            standings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_standings_has_zeroed_entries() {
        let s = Standings::empty("L1", &["p1".to_string(), "p2".to_string()]);
        assert_eq!(s.version, 0);
        assert_eq!(s.standings.len(), 2);
        assert!(s.standings.iter().all(|e| e.points == 0));
    }
}
