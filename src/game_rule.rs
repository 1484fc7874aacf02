//! Even/Odd game outcome rule (spec §4.8): draw a number, compare each
//! player's parity call against it, and decide the winner.

use std::collections::HashMap;

use league_protocol::payload::{MatchStatus, Parity};
use rand::Rng;

/// Draw a uniformly random integer in `[min, max]` (inclusive).
pub fn draw_number(min: i64, max: i64) -> i64 {
    rand::thread_rng().gen_range(min..=max)
}

/// Resolve a match given the drawn number and both players' parity calls.
///
/// Exactly one correct call wins the match; zero or two correct calls is a
/// draw (both players called the same parity, right or wrong).
pub fn resolve(drawn_number: i64, choices: &HashMap<String, Parity>) -> (MatchStatus, Option<String>) {
    let actual = Parity::of(drawn_number);
    let correct: Vec<&String> = choices
        .iter()
        .filter(|(_, choice)| **choice == actual)
        .map(|(player, _)| player)
        .collect();

    match correct.as_slice() {
        [winner] => (MatchStatus::Win, Some((*winner).clone())),
        _ => (MatchStatus::Draw, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choices(a: &str, a_choice: Parity, b: &str, b_choice: Parity) -> HashMap<String, Parity> {
        let mut map = HashMap::new();
        map.insert(a.to_string(), a_choice);
        map.insert(b.to_string(), b_choice);
        map
    }

    #[test]
    fn single_correct_call_wins() {
        let choices = choices("a", Parity::Even, "b", Parity::Odd);
        let (status, winner) = resolve(4, &choices);
        assert_eq!(status, MatchStatus::Win);
        assert_eq!(winner, Some("a".to_string()));
    }

    #[test]
    fn both_correct_is_a_draw() {
        let choices = choices("a", Parity::Even, "b", Parity::Even);
        let (status, winner) = resolve(4, &choices);
        assert_eq!(status, MatchStatus::Draw);
        assert!(winner.is_none());
    }

    #[test]
    fn both_wrong_is_a_draw() {
        let choices = choices("a", Parity::Odd, "b", Parity::Odd);
        let (status, winner) = resolve(4, &choices);
        assert_eq!(status, MatchStatus::Draw);
        assert!(winner.is_none());
    }

    #[test]
    fn draw_number_stays_within_bounds() {
        for _ in 0..200 {
            let n = draw_number(0, 99);
            assert!((0..=99).contains(&n));
        }
    }

    #[test]
    fn draw_number_supports_single_value_range() {
        assert_eq!(draw_number(7, 7), 7);
    }
}
