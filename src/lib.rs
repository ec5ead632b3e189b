#![warn(missing_docs)]

//! Lucky bet smoke test harness!
//!
//! Drives a deployed lucky bet lottery contract through a [`ChainClient`], places one bet per
//! participant and checks the settled round against the expected payout.

pub use chain_client::{Account, ChainClient, ContractId, Signer, TxId, TxReceipt};
pub use config::RunConfig;
pub use scenario::{ContractSource, LuckyBetScenario, ScenarioReport};
pub use verifier::{verify_payout, PayoutRule, PayoutSummary, VerificationError};

/// Coin and contract unit amounts
pub mod amount;
pub mod bet;
/// Chain client module
pub mod chain_client;
pub mod config;
pub mod error;
pub mod round_result;
pub mod scenario;
pub mod verifier;
