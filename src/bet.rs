//! Bets and the bet schedule used by the smoke test.

use serde_json::json;

use crate::{
    amount::coins_to_units,
    error::{Error, Result},
};

/// A single bet against the lucky bet contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bet {
    /// On-chain account name of the participant
    pub participant: String,
    /// Number the participant bets on
    pub lucky_number: u64,
    /// Stake in whole coins
    pub stake: u64,
    /// Per-bet nonce
    pub nonce: u64,
}

impl Bet {
    /// Arguments for the contract's `bet` function. The stake is sent in contract units.
    pub fn contract_args(&self) -> Result<serde_json::Value> {
        let units = coins_to_units(self.stake).ok_or(Error::StakeOverflow(self.stake))?;
        Ok(json!([
            self.participant,
            self.lucky_number,
            units,
            self.nonce
        ]))
    }
}

/// A bet that the chain accepted, along with the gas its transaction cost the participant.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedBet {
    #[allow(missing_docs)]
    pub bet: Bet,
    /// Gas paid for the bet transaction, in coins
    pub gas_fee: f64,
}

impl PlacedBet {
    /// A placed bet that cost no gas.
    pub fn without_gas(bet: Bet) -> Self {
        PlacedBet { bet, gas_fee: 0.0 }
    }

    #[allow(missing_docs)]
    pub fn participant(&self) -> &str {
        &self.bet.participant
    }

    #[allow(missing_docs)]
    pub fn stake(&self) -> u64 {
        self.bet.stake
    }
}

/// Bet for the `index`th participant (0-based): lucky number `index`, a stake of
/// `index / 2 + 1` coins and nonce `index + 1`.
pub fn planned_bet(index: usize, participant: &str) -> Bet {
    let index = index as u64;
    Bet {
        participant: participant.to_string(),
        lucky_number: index,
        stake: index / 2 + 1,
        nonce: index + 1,
    }
}

/// Bets for every participant, in submission order.
pub fn bet_plan<S: AsRef<str>>(participants: &[S]) -> Vec<Bet> {
    participants
        .iter()
        .enumerate()
        .map(|(i, p)| planned_bet(i, p.as_ref()))
        .collect()
}
