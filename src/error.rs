//! Crate level error type.

use thiserror::Error;

use crate::{chain_client::ChainClientError, verifier::VerificationError};

#[allow(missing_docs)]
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum Error {
    #[error("Chain client error: {0}")]
    ChainClient(#[from] ChainClientError),
    #[error("Verification failed: {0}")]
    Verification(#[from] VerificationError),
    #[error("Error while reading file: {0:?}")]
    FileRead(std::io::Error),
    #[error("Error while parsing Toml: {0:?}")]
    Toml(toml::de::Error),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Stake of {0} coins is too large for contract units")]
    StakeOverflow(u64),
    #[error("Malformed round result: {0}")]
    RoundResult(String),
}
