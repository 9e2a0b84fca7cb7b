use std::fmt;

use serde::{Deserialize, Serialize};

use crate::service::Money;

/// The agent's chosen next move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ActionProposal {
    /// Stake on the next spin. `None` lets the executor fall back to the
    /// profile's minimum bet.
    PlaceBet { amount: Option<Money> },
    Spin,
    CashOut,
}

impl ActionProposal {
    pub fn label(&self) -> &'static str {
        match self {
            ActionProposal::PlaceBet { .. } => "PlaceBet",
            ActionProposal::Spin => "Spin",
            ActionProposal::CashOut => "CashOut",
        }
    }
}

impl fmt::Display for ActionProposal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionProposal::PlaceBet {
                amount: Some(money),
            } => write!(f, "PlaceBet({} {:?})", money.amount, money.currency),
            other => f.write_str(other.label()),
        }
    }
}
