//! The per-round result record written by the lucky bet contract.

use serde::Deserialize;

use crate::{
    amount::{amount_from_json, deserialize_optional_amount},
    error::{Error, Result},
    verifier::VerificationError,
};

/// State key holding the contract's current round counter.
pub const ROUND_KEY: &str = "round";

/// State key of the result record for `round`.
pub fn result_key(round: u64) -> String {
    format!("result{round}")
}

/// Read the round counter out of its state value. The contract stores it as a number or as a
/// numeric string.
pub fn parse_round_counter(value: &serde_json::Value) -> Option<u64> {
    amount_from_json(value)
        .filter(|n| *n >= 0.0 && n.fract() == 0.0)
        .map(|n| n as u64)
}

/// Outcome of a single bet.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct OutcomeRecord {
    /// Account that placed the bet, if the contract records it
    #[serde(default)]
    pub account: Option<String>,
    /// Reward in contract units. Only the winner carries one.
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    pub reward: Option<f64>,
}

impl OutcomeRecord {
    /// Record of a losing bet.
    pub fn loser() -> Self {
        OutcomeRecord::default()
    }

    /// Record of the winning bet with `reward` contract units.
    pub fn winner(reward: f64) -> Self {
        OutcomeRecord {
            account: None,
            reward: Some(reward),
        }
    }

    #[allow(missing_docs)]
    pub fn for_account(mut self, account: &str) -> Self {
        self.account = Some(account.to_string());
        self
    }

    #[allow(missing_docs)]
    pub fn is_winner(&self) -> bool {
        self.reward.is_some()
    }
}

/// Ordered outcome records of one settled round.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct RoundResult {
    #[allow(missing_docs)]
    pub records: Vec<OutcomeRecord>,
}

impl RoundResult {
    #[allow(missing_docs)]
    pub fn new(records: Vec<OutcomeRecord>) -> Self {
        RoundResult { records }
    }

    /// Decode the state value stored under [`result_key`].
    pub fn from_state(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::RoundResult(e.to_string()))
    }

    /// Reorder the records to follow `participants`.
    ///
    /// Bets submitted concurrently can land in any order, so when every record names its
    /// account the records are matched by account. Records without accounts are taken to be in
    /// submission order already.
    pub fn aligned_to<S: AsRef<str>>(
        &self,
        participants: &[S],
    ) -> std::result::Result<RoundResult, VerificationError> {
        if self.records.iter().any(|r| r.account.is_none()) {
            return Ok(self.clone());
        }
        if self.records.len() != participants.len() {
            return Err(VerificationError::InvariantViolation(format!(
                "round result has {} records for {} bets",
                self.records.len(),
                participants.len()
            )));
        }
        let mut remaining = self.records.clone();
        let mut aligned = Vec::with_capacity(remaining.len());
        for participant in participants {
            let participant = participant.as_ref();
            let index = remaining
                .iter()
                .position(|r| r.account.as_deref() == Some(participant))
                .ok_or_else(|| {
                    VerificationError::InvariantViolation(format!(
                        "no outcome record for participant {participant}"
                    ))
                })?;
            aligned.push(remaining.remove(index));
        }
        Ok(RoundResult::new(aligned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_records_with_string_and_numeric_rewards() {
        let value = json!({
            "records": [
                {"account": "IOSTa", "luckyNumber": 0, "coins": 100000000, "nonce": 1},
                {"account": "IOSTb", "luckyNumber": 1, "reward": "2850000000"},
                {"reward": 12}
            ]
        });
        let result = RoundResult::from_state(value).unwrap();
        assert_eq!(result.records[0], OutcomeRecord::loser().for_account("IOSTa"));
        assert_eq!(result.records[1].reward, Some(2_850_000_000.0));
        assert_eq!(result.records[2].reward, Some(12.0));
        assert_eq!(result.records[2].account, None);
    }

    #[test]
    fn malformed_state_is_an_error() {
        let err = RoundResult::from_state(json!({"records": "nope"})).unwrap_err();
        assert!(matches!(err, Error::RoundResult(_)));
    }

    #[test]
    fn aligns_records_by_account() {
        let result = RoundResult::new(vec![
            OutcomeRecord::loser().for_account("b"),
            OutcomeRecord::winner(5.0).for_account("c"),
            OutcomeRecord::loser().for_account("a"),
        ]);
        let aligned = result.aligned_to(&["a", "b", "c"]).unwrap();
        let accounts: Vec<_> = aligned
            .records
            .iter()
            .map(|r| r.account.clone().unwrap())
            .collect();
        assert_eq!(accounts, vec!["a", "b", "c"]);
        assert!(aligned.records[2].is_winner());
    }

    #[test]
    fn align_fails_for_unknown_participant() {
        let result = RoundResult::new(vec![OutcomeRecord::loser().for_account("a")]);
        let err = result.aligned_to(&["z"]).unwrap_err();
        assert!(matches!(err, VerificationError::InvariantViolation(_)));
    }

    #[test]
    fn records_without_accounts_keep_their_order() {
        let result = RoundResult::new(vec![OutcomeRecord::winner(1.0), OutcomeRecord::loser()]);
        assert_eq!(result.aligned_to(&["x", "y"]).unwrap(), result);
    }

    #[test]
    fn round_counter_accepts_numbers_and_strings() {
        assert_eq!(parse_round_counter(&json!(3)), Some(3));
        assert_eq!(parse_round_counter(&json!("2")), Some(2));
        assert_eq!(parse_round_counter(&json!(1.5)), None);
        assert_eq!(result_key(1), "result1");
    }
}
