//! Payout verification for a settled lucky bet round.
//!
//! The verifier is a pure function over already collected inputs: the bets in submission order,
//! the round's outcome records aligned to those bets, and the balances observed afterwards. It
//! stops at the first check that fails.

use thiserror::Error;

use crate::{
    amount::UNITS_PER_COIN,
    bet::PlacedBet,
    round_result::RoundResult,
};


/// Absolute tolerance used for every coin comparison.
pub const TOLERANCE: f64 = 1e-8;

#[allow(missing_docs)]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VerificationError {
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),
    #[error(
        "Balance mismatch for participant {index} ({participant}): expected {expected}, observed {observed}"
    )]
    BalanceMismatch {
        index: usize,
        participant: String,
        expected: f64,
        observed: f64,
    },
}

/// How the contract splits the pot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PayoutRule {
    /// Percentage of the pot the contract keeps
    pub fee_percent: u64,
    /// Contract units per coin; the paid pot is rounded down to this unit
    pub units_per_coin: u64,
}

impl Default for PayoutRule {
    fn default() -> Self {
        PayoutRule {
            fee_percent: 5,
            units_per_coin: UNITS_PER_COIN,
        }
    }
}

impl PayoutRule {
    #[allow(missing_docs)]
    pub fn with_fee_percent(fee_percent: u64) -> Self {
        PayoutRule {
            fee_percent,
            ..PayoutRule::default()
        }
    }

    /// Pot paid out for `total_staked` coins: `floor(total * (100 - fee) / 100)` taken in
    /// contract units, expressed in coins.
    pub fn expected_pot(&self, total_staked: u64) -> f64 {
        let keep = 100u128.saturating_sub(self.fee_percent as u128);
        let units = total_staked as u128 * self.units_per_coin as u128 * keep / 100;
        units as f64 / self.units_per_coin as f64
    }

    /// Convert a reward reported in contract units to coins.
    pub fn reward_in_coins(&self, units: f64) -> f64 {
        units / self.units_per_coin as f64
    }
}

/// What a passing verification computed.
#[derive(Clone, Debug, PartialEq)]
pub struct PayoutSummary {
    /// Index of the winning bet
    pub winner: usize,
    /// Reward per bet, in coins
    pub rewards: Vec<f64>,
    /// Expected post-round balance per participant
    pub expected_balances: Vec<f64>,
    /// Total staked, in coins
    pub total_staked: u64,
}

fn close_enough(a: f64, b: f64) -> bool {
    (a - b).abs() < TOLERANCE
}

/// Check a settled round against the bets that produced it.
///
/// `round` and `observed_balances` must be in the same order as `bets`.
pub fn verify_payout(
    bets: &[PlacedBet],
    round: &RoundResult,
    observed_balances: &[f64],
    initial_balance: f64,
    rule: &PayoutRule,
) -> Result<PayoutSummary, VerificationError> {
    if round.records.len() != bets.len() {
        return Err(VerificationError::InvariantViolation(format!(
            "round result has {} records for {} bets",
            round.records.len(),
            bets.len()
        )));
    }
    if observed_balances.len() != bets.len() {
        return Err(VerificationError::InvariantViolation(format!(
            "{} observed balances for {} bets",
            observed_balances.len(),
            bets.len()
        )));
    }

    let rewards: Vec<f64> = round
        .records
        .iter()
        .map(|r| r.reward.map(|units| rule.reward_in_coins(units)).unwrap_or(0.0))
        .collect();

    let winners: Vec<usize> = round
        .records
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.is_winner().then_some(i))
        .collect();
    let winner = match winners.as_slice() {
        [winner] => *winner,
        _ => {
            return Err(VerificationError::InvariantViolation(format!(
                "expected exactly one winner, found {}",
                winners.len()
            )))
        }
    };

    let total_staked = bets
        .iter()
        .try_fold(0u64, |total, bet| total.checked_add(bet.stake()))
        .ok_or_else(|| {
            VerificationError::InvariantViolation("total stake overflows a u64".to_string())
        })?;
    let expected_pot = rule.expected_pot(total_staked);
    let paid: f64 = rewards.iter().sum();
    if !close_enough(paid, expected_pot) {
        return Err(VerificationError::InvariantViolation(format!(
            "rewards total {paid} but {total_staked} staked should pay {expected_pot}"
        )));
    }

    let mut expected_balances = Vec::with_capacity(bets.len());
    for (index, ((bet, reward), observed)) in bets
        .iter()
        .zip(&rewards)
        .zip(observed_balances)
        .enumerate()
    {
        let expected = initial_balance - bet.stake() as f64 - bet.gas_fee + reward;
        tracing::debug!(
            participant = bet.participant(),
            expected,
            observed = *observed,
            "checking balance"
        );
        if !close_enough(expected, *observed) {
            return Err(VerificationError::BalanceMismatch {
                index,
                participant: bet.participant().to_string(),
                expected,
                observed: *observed,
            });
        }
        expected_balances.push(expected);
    }

    Ok(PayoutSummary {
        winner,
        rewards,
        expected_balances,
        total_staked,
    })
}
