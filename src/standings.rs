//! Standings engine (spec §4.7): applies match results to the persisted
//! snapshot, re-ranks, and bumps the monotonic `version` so a concurrent
//! reader of the standings file can detect it changed out from under them.

use league_protocol::payload::{MatchStatus, StandingsEntry};
use league_protocol::standings::ScoringWeights;
use league_protocol::Standings;

/// Apply one completed match's result to the two involved entries.
///
/// Decision (open question, recorded in DESIGN.md): a `Cancelled` match
/// with a declared `winner_player_id` charges the loser the
/// `technical_loss` weight rather than the ordinary `loss` weight — this is
/// how a forfeit from a missed deadline or a repeated invalid choice is
/// distinguished from a normal loss on the scoreboard. A `Cancelled` match
/// with no winner (both sides at fault) charges both players the
/// `technical_loss` weight. A `Win` decided by a single non-responder
/// (`forfeit`) charges the loser the same `technical_loss` weight rather
/// than an ordinary loss, for the same reason.
pub fn apply_match_result(
    standings: &mut Standings,
    weights: &ScoringWeights,
    player_a: &str,
    player_b: &str,
    status: MatchStatus,
    winner_player_id: Option<&str>,
    forfeit: bool,
) {
    let win_loss_points = if forfeit { weights.technical_loss } else { weights.loss };
    let (a_points, b_points) = match status {
        MatchStatus::Draw => (weights.draw, weights.draw),
        MatchStatus::Win => match winner_player_id {
            Some(winner) if winner == player_a => (weights.win, win_loss_points),
            Some(winner) if winner == player_b => (win_loss_points, weights.win),
            _ => (weights.draw, weights.draw),
        },
        MatchStatus::Cancelled => match winner_player_id {
            Some(winner) if winner == player_a => (weights.win, weights.technical_loss),
            Some(winner) if winner == player_b => (weights.technical_loss, weights.win),
            _ => (weights.technical_loss, weights.technical_loss),
        },
    };

    record_outcome(standings, player_a, status, winner_player_id == Some(player_a), a_points);
    record_outcome(standings, player_b, status, winner_player_id == Some(player_b), b_points);

    rerank(standings);
    standings.version += 1;
    standings.last_updated = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
}

fn record_outcome(standings: &mut Standings, player_id: &str, status: MatchStatus, won: bool, points: i64) {
    if let Some(entry) = standings.standings.iter_mut().find(|e| e.player_id == player_id) {
        entry.played += 1;
        entry.points += points;
        match status {
            MatchStatus::Draw => entry.draws += 1,
            _ if won => entry.wins += 1,
            _ => entry.losses += 1,
        }
    }
}

/// Re-rank entries by points desc, wins desc, player_id asc for a stable
/// tie-break, using standard competition ranking (ties share a rank; the
/// next distinct score resumes at the count of entries ahead of it).
fn rerank(standings: &mut Standings) {
    standings.standings.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then(b.wins.cmp(&a.wins))
            .then(a.player_id.cmp(&b.player_id))
    });

    let mut rank = 0u32;
    let mut previous: Option<(i64, u32)> = None;
    for (index, entry) in standings.standings.iter_mut().enumerate() {
        let key = (entry.points, entry.wins);
        if previous != Some(key) {
            rank = index as u32 + 1;
            previous = Some(key);
        }
        entry.rank = rank;
    }
}

/// The player in first place once the league is complete. Ties resolve to
/// the lexicographically smallest player id, matching `rerank`'s tie-break.
pub fn champion(standings: &Standings) -> Option<&StandingsEntry> {
    standings.standings.iter().find(|e| e.rank == 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Standings {
        Standings::empty("l1", &["a".to_string(), "b".to_string(), "c".to_string()])
    }

    #[test]
    fn win_awards_winner_and_charges_loser() {
        let mut standings = fresh();
        let weights = ScoringWeights::default();
        apply_match_result(&mut standings, &weights, "a", "b", MatchStatus::Win, Some("a"), false);
        let a = standings.standings.iter().find(|e| e.player_id == "a").unwrap();
        let b = standings.standings.iter().find(|e| e.player_id == "b").unwrap();
        assert_eq!(a.points, weights.win);
        assert_eq!(a.wins, 1);
        assert_eq!(b.points, weights.loss);
        assert_eq!(b.losses, 1);
    }

    #[test]
    fn forfeited_win_charges_technical_loss_not_ordinary_loss() {
        let mut standings = fresh();
        let weights = ScoringWeights { win: 3, draw: 1, loss: 0, technical_loss: -1 };
        apply_match_result(&mut standings, &weights, "a", "b", MatchStatus::Win, Some("a"), true);
        let a = standings.standings.iter().find(|e| e.player_id == "a").unwrap();
        let b = standings.standings.iter().find(|e| e.player_id == "b").unwrap();
        assert_eq!(a.points, weights.win);
        assert_eq!(b.points, weights.technical_loss);
        assert_eq!(b.losses, 1);
    }

    #[test]
    fn draw_awards_both_sides() {
        let mut standings = fresh();
        let weights = ScoringWeights::default();
        apply_match_result(&mut standings, &weights, "a", "b", MatchStatus::Draw, None, false);
        assert_eq!(standings.standings.iter().find(|e| e.player_id == "a").unwrap().draws, 1);
        assert_eq!(standings.standings.iter().find(|e| e.player_id == "b").unwrap().draws, 1);
    }

    #[test]
    fn cancelled_with_winner_charges_technical_loss() {
        let mut standings = fresh();
        let weights = ScoringWeights::default();
        apply_match_result(&mut standings, &weights, "a", "b", MatchStatus::Cancelled, Some("a"), false);
        let b = standings.standings.iter().find(|e| e.player_id == "b").unwrap();
        assert_eq!(b.points, weights.technical_loss);
    }

    #[test]
    fn version_increments_on_every_update() {
        let mut standings = fresh();
        let weights = ScoringWeights::default();
        let before = standings.version;
        apply_match_result(&mut standings, &weights, "a", "b", MatchStatus::Draw, None, false);
        assert_eq!(standings.version, before + 1);
    }

    #[test]
    fn rerank_breaks_ties_by_player_id() {
        let mut standings = fresh();
        rerank(&mut standings);
        let ranks: Vec<_> = standings.standings.iter().map(|e| (e.player_id.clone(), e.rank)).collect();
        assert_eq!(ranks, vec![("a".to_string(), 1), ("b".to_string(), 1), ("c".to_string(), 1)]);
    }

    #[test]
    fn champion_is_sole_rank_one_leader() {
        let mut standings = fresh();
        let weights = ScoringWeights::default();
        apply_match_result(&mut standings, &weights, "a", "b", MatchStatus::Win, Some("a"), false);
        apply_match_result(&mut standings, &weights, "a", "c", MatchStatus::Win, Some("a"), false);
        let champ = champion(&standings).unwrap();
        assert_eq!(champ.player_id, "a");
    }
}
