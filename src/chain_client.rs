use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::json;
use std::{error, fmt, path::Path};
use thiserror::Error;

/// In-process fake chain module
pub mod in_memory_chain;
/// Wallet CLI and node HTTP backed client module
pub mod iost_client;

/// Contract holding the chain's native token operations.
pub const SYSTEM_CONTRACT: &str = "iost.system";
/// Native token transfer function of [`SYSTEM_CONTRACT`].
pub const TRANSFER_FUNCTION: &str = "Transfer";

/// An account known to the local wallet.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Account {
    /// Local name of the account's key
    pub nickname: String,
    /// On-chain account name
    pub name: String,
}

impl Account {
    #[allow(missing_docs)]
    pub fn new(nickname: &str, name: &str) -> Self {
        Account {
            nickname: nickname.to_string(),
            name: name.to_string(),
        }
    }
}

/// Transaction hash.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TxId(String);

impl TxId {
    #[allow(missing_docs)]
    pub fn new(hash: &str) -> Self {
        TxId(hash.to_string())
    }

    #[allow(missing_docs)]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a published contract.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContractId(String);

impl ContractId {
    #[allow(missing_docs)]
    pub fn new(id: &str) -> Self {
        ContractId(id.to_string())
    }

    /// Contracts are named after the transaction that published them.
    pub fn from_publishing_tx(tx: &TxId) -> Self {
        ContractId(format!("Contract{}", tx.as_str()))
    }

    #[allow(missing_docs)]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Receipt of a confirmed transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct TxReceipt {
    #[allow(missing_docs)]
    pub tx_id: TxId,
    /// Number of actions in the transaction that succeeded
    pub succeeded_actions: u32,
    /// Gas charged, in contract units
    pub gas_usage: f64,
}

impl TxReceipt {
    /// Gas charged, in coins.
    pub fn gas_in_coins(&self) -> f64 {
        crate::amount::units_to_coins(self.gas_usage)
    }

    /// Every transaction this harness sends carries a single action, which must succeed.
    pub fn ensure_succeeded(self) -> ChainClientResult<Self> {
        if self.succeeded_actions == 1 {
            Ok(self)
        } else {
            Err(ChainClientError::TxFailed(
                self.tx_id.clone(),
                self.succeeded_actions,
            ))
        }
    }
}

/// Who signs a transaction.
#[derive(Clone, Debug)]
pub enum Signer {
    /// An account whose key lives in the wallet's key directory
    Wallet(Account),
    /// An account whose private key is held directly, e.g. the network's funding account
    Key {
        #[allow(missing_docs)]
        account: String,
        #[allow(missing_docs)]
        key: SecretString,
    },
}

impl Signer {
    /// On-chain name of the signing account.
    pub fn account_name(&self) -> &str {
        match self {
            Signer::Wallet(account) => &account.name,
            Signer::Key { account, .. } => account,
        }
    }
}

/// Interface to the blockchain services the smoke test drives: accounts, token transfers,
/// contract publication and invocation, and state and balance queries. The abstraction lets the
/// scenario run against a fake chain in tests.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Create a new account whose key is stored under `nickname`
    async fn create_account(&self, nickname: &str) -> ChainClientResult<Account>;

    /// Publish a contract signed by `signer` and wait for it to be confirmed
    async fn publish_contract(
        &self,
        code: &Path,
        abi: &Path,
        signer: &Signer,
    ) -> ChainClientResult<ContractId>;

    /// Call `function` on `contract` signed by `signer` and wait for it to be confirmed
    async fn call_contract(
        &self,
        contract: &ContractId,
        function: &str,
        args: &serde_json::Value,
        signer: &Signer,
    ) -> ChainClientResult<TxReceipt>;

    /// Balance of `account` in coins
    async fn balance(&self, account: &str) -> ChainClientResult<f64>;

    /// Value stored by `contract` under `key`, if any
    async fn contract_state(
        &self,
        contract: &ContractId,
        key: &str,
    ) -> ChainClientResult<Option<serde_json::Value>>;

    /// Receipt of a transaction
    async fn tx_receipt(&self, tx: &TxId) -> ChainClientResult<TxReceipt>;

    /// Transfer `coins` from `from` to `to` and check that they arrived
    async fn transfer(&self, from: &Signer, to: &str, coins: u64) -> ChainClientResult<TxReceipt> {
        let contract = ContractId::new(SYSTEM_CONTRACT);
        let args = json!([from.account_name(), to, coins]);
        let receipt = self
            .call_contract(&contract, TRANSFER_FUNCTION, &args, from)
            .await?;
        let new_balance = self.balance(to).await?;
        if new_balance < coins as f64 {
            return Err(ChainClientError::TransferNotCredited {
                account: to.to_string(),
                expected: coins,
                actual: new_balance,
            });
        }
        tracing::info!(account = to, balance = new_balance, "after transfer of {coins} in");
        Ok(receipt)
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ChainClientError {
    #[error("Failed to run `{command}`: {source}")]
    Io {
        command: String,
        source: std::io::Error,
    },
    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("Couldn't find {expected} in output of `{command}`: {output:?}")]
    UnexpectedOutput {
        command: String,
        expected: &'static str,
        output: String,
    },
    #[error("Node request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Bad node url: {0}")]
    Url(#[from] url::ParseError),
    #[error("Malformed state value for {key}: {source}")]
    Json {
        key: String,
        source: serde_json::Error,
    },
    #[error("Transaction {0} failed: {1} actions succeeded")]
    TxFailed(TxId, u32),
    #[error("Transaction {0} not found")]
    UnknownTx(TxId),
    #[error("Transfer to {account} not credited: expected at least {expected}, balance is {actual}")]
    TransferNotCredited {
        account: String,
        expected: u64,
        actual: f64,
    },
    #[error("Unknown account: {0}")]
    UnknownAccount(String),
    #[error("Unknown contract: {0}")]
    UnknownContract(ContractId),
    #[error("Couldn't prepare signing key: {0:?}")]
    SigningKey(Box<dyn error::Error + Send + Sync>),
    #[error("Mutex lock error: {0:?}")]
    Mutex(String),
}

#[allow(missing_docs)]
pub type ChainClientResult<T> = Result<T, ChainClientError>;
