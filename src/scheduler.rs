//! Round-robin scheduling (spec §4.6): the circle method, with a bye for an
//! odd number of players.

/// One round of the schedule: player pairs to play, plus whoever drew the
/// bye this round (`None` when the player count is even).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledRound {
    pub pairs: Vec<(String, String)>,
    pub bye: Option<String>,
}

const BYE_SENTINEL: &str = "__BYE__";

/// Build a full round-robin schedule over `player_ids` using the circle
/// method: player 0 stays fixed, the rest rotate one position each round.
/// An odd player count is padded with a bye sentinel that is stripped back
/// out of the result, leaving one real player idle per round.
///
/// Returns `player_ids.len() - 1` rounds for an even count, or
/// `player_ids.len()` rounds for an odd count (every player sits out
/// exactly once).
pub fn round_robin_schedule(player_ids: &[String]) -> Vec<ScheduledRound> {
    if player_ids.len() < 2 {
        return Vec::new();
    }

    let mut roster: Vec<String> = player_ids.to_vec();
    let padded = roster.len() % 2 != 0;
    if padded {
        roster.push(BYE_SENTINEL.to_string());
    }

    let n = roster.len();
    let num_rounds = n - 1;
    let mut rounds = Vec::with_capacity(num_rounds);

    for round in 0..num_rounds {
        let mut pairs = Vec::new();
        let mut bye = None;
        for i in 0..n / 2 {
            let a = &roster[i];
            let b = &roster[n - 1 - i];
            if a == BYE_SENTINEL {
                bye = Some(b.clone());
            } else if b == BYE_SENTINEL {
                bye = Some(a.clone());
            } else {
                pairs.push((a.clone(), b.clone()));
            }
        }
        rounds.push(ScheduledRound { pairs, bye });

        // Rotate: keep roster[0] fixed, rotate the rest one step.
        let last = roster.pop().unwrap();
        roster.insert(1, last);
        let _ = round;
    }

    rounds
}
