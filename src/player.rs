//! Player agent skeleton (spec §4.10): registers with a league manager,
//! then answers `GAME_INVITATION` and `CHOOSE_PARITY_CALL` requests from
//! whichever referee is assigned its matches.
//!
//! Per DESIGN NOTES §9 ("a `Strategy` trait for pluggable choice"), the
//! actual parity call is delegated to a [`Strategy`] implementation rather
//! than hardcoded, the same seam the teacher uses for pluggable adapters
//! (`HttpServerAdapter`) and pluggable tool backends (`ToolProtocol`).

use async_trait::async_trait;

use league_protocol::payload::{ChooseParityContext, Parity};

/// A player's parity-calling policy. Implementations receive only the
/// match and opponent identifiers a real player would have — no access to
/// the drawn number, which does not exist yet when the call is made.
#[async_trait]
pub trait Strategy: Send + Sync {
    async fn choose_parity(&self, match_id: &str, context: &ChooseParityContext) -> Parity;
}

/// Always calls the same parity, regardless of match context.
pub struct FixedStrategy(pub Parity);

#[async_trait]
impl Strategy for FixedStrategy {
    async fn choose_parity(&self, _match_id: &str, _context: &ChooseParityContext) -> Parity {
        self.0
    }
}

/// Alternates even/odd, starting with the value it was constructed with.
pub struct AlternatingStrategy {
    next: std::sync::Mutex<Parity>,
}

impl AlternatingStrategy {
    pub fn starting_with(parity: Parity) -> Self {
        AlternatingStrategy {
            next: std::sync::Mutex::new(parity),
        }
    }
}

#[async_trait]
impl Strategy for AlternatingStrategy {
    async fn choose_parity(&self, _match_id: &str, _context: &ChooseParityContext) -> Parity {
        let mut next = self.next.lock().unwrap();
        let current = *next;
        *next = match current {
            Parity::Even => Parity::Odd,
            Parity::Odd => Parity::Even,
        };
        current
    }
}

pub struct PlayerAgent {
    pub player_id: std::sync::Mutex<Option<String>>,
    pub league_id: std::sync::Mutex<Option<String>>,
    pub auth_token: std::sync::Mutex<Option<String>>,
    pub strategy: Box<dyn Strategy>,
}

impl PlayerAgent {
    pub fn new(strategy: Box<dyn Strategy>) -> Self {
        PlayerAgent {
            player_id: std::sync::Mutex::new(None),
            league_id: std::sync::Mutex::new(None),
            auth_token: std::sync::Mutex::new(None),
            strategy,
        }
    }

    pub fn on_registered(&self, player_id: String, league_id: String, auth_token: String) {
        *self.player_id.lock().unwrap() = Some(player_id);
        *self.league_id.lock().unwrap() = Some(league_id);
        *self.auth_token.lock().unwrap() = Some(auth_token);
    }

    pub fn is_registered(&self) -> bool {
        self.player_id.lock().unwrap().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ChooseParityContext {
        ChooseParityContext {
            opponent_id: "p2".to_string(),
            round_id: "round-0".to_string(),
        }
    }

    #[tokio::test]
    async fn fixed_strategy_always_returns_same_value() {
        let strategy = FixedStrategy(Parity::Odd);
        assert_eq!(strategy.choose_parity("m1", &ctx()).await, Parity::Odd);
        assert_eq!(strategy.choose_parity("m2", &ctx()).await, Parity::Odd);
    }

    #[tokio::test]
    async fn alternating_strategy_flips_each_call() {
        let strategy = AlternatingStrategy::starting_with(Parity::Even);
        assert_eq!(strategy.choose_parity("m1", &ctx()).await, Parity::Even);
        assert_eq!(strategy.choose_parity("m1", &ctx()).await, Parity::Odd);
        assert_eq!(strategy.choose_parity("m1", &ctx()).await, Parity::Even);
    }

    #[test]
    fn agent_starts_unregistered() {
        let agent = PlayerAgent::new(Box::new(FixedStrategy(Parity::Even)));
        assert!(!agent.is_registered());
    }

    #[test]
    fn on_registered_marks_agent_registered() {
        let agent = PlayerAgent::new(Box::new(FixedStrategy(Parity::Even)));
        agent.on_registered("p1".into(), "l1".into(), "tok".into());
        assert!(agent.is_registered());
    }
}
