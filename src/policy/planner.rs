use crate::service::GameState;

use super::action::ActionProposal;

/// Deterministic move for each session state.
///
/// The match has no wildcard arm: a new [`GameState`] variant will not
/// compile until it is given a move here.
pub fn plan(state: GameState) -> ActionProposal {
    match state {
        GameState::Idle => ActionProposal::PlaceBet { amount: None },
        GameState::Initialized => ActionProposal::PlaceBet { amount: None },
        GameState::Probing => ActionProposal::PlaceBet { amount: None },
        GameState::Playing => ActionProposal::Spin,
        GameState::Evaluating => ActionProposal::PlaceBet { amount: None },
        GameState::Completed => ActionProposal::CashOut,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bets_until_playing_then_spins() {
        for state in [
            GameState::Idle,
            GameState::Initialized,
            GameState::Probing,
            GameState::Evaluating,
        ] {
            assert_eq!(plan(state), ActionProposal::PlaceBet { amount: None });
        }
        assert_eq!(plan(GameState::Playing), ActionProposal::Spin);
        assert_eq!(plan(GameState::Completed), ActionProposal::CashOut);
    }
}
