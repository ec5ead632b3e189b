use async_trait::async_trait;
use secrecy::ExposeSecret;
use std::{
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};
use tempfile::NamedTempFile;

use crate::{
    chain_client::{
        Account, ChainClient, ChainClientError, ChainClientResult, ContractId, Signer, TxId,
        TxReceipt,
    },
    config::RunConfig,
    error::Result,
};
use node_http::{NodeApi, NodeHttp};
use wallet_cli::WalletCli;

#[allow(missing_docs)]
pub mod node_http;
#[allow(missing_docs)]
pub mod schemas;
pub mod wallet_cli;


/// [`ChainClient`] for an IOST network: signing operations go through the `iwallet` CLI,
/// receipts and contract state come from the node's HTTP API.
pub struct IostClient<Node: NodeApi = NodeHttp> {
    wallet: WalletCli,
    node: Node,
    key_dir: PathBuf,
    confirmation_wait: Duration,
}

impl IostClient<NodeHttp> {
    /// Build a client for the network described by `config`.
    pub fn from_config(config: &RunConfig) -> Result<Self> {
        let node = NodeHttp::new(&config.node_url());
        Self::with_node(config, node)
    }
}

impl<Node: NodeApi> IostClient<Node> {
    /// Build a client that reads receipts and state from `node`.
    pub fn with_node(config: &RunConfig, node: Node) -> Result<Self> {
        let wallet = WalletCli::new(
            &config.wallet_program,
            config.wallet_env.clone(),
            config.expiration_secs,
            config.gas_limit,
        );
        Ok(IostClient {
            wallet,
            node,
            key_dir: config.resolved_key_dir()?,
            confirmation_wait: config.expiration(),
        })
    }

    fn key_file(&self, signer: &Signer) -> ChainClientResult<KeyFile> {
        match signer {
            Signer::Wallet(account) => {
                let path = self.key_dir.join(format!("{}_ed25519", account.nickname));
                Ok(KeyFile::Stored(path))
            }
            Signer::Key { key, .. } => {
                let mut file = NamedTempFile::new()
                    .map_err(|e| ChainClientError::SigningKey(Box::new(e)))?;
                file.write_all(key.expose_secret().as_bytes())
                    .map_err(|e| ChainClientError::SigningKey(Box::new(e)))?;
                Ok(KeyFile::Temporary(file))
            }
        }
    }

    // A transaction is settled once its expiration has passed.
    async fn confirm(&self, tx: &TxId) -> ChainClientResult<TxReceipt> {
        tokio::time::sleep(self.confirmation_wait).await;
        tracing::debug!("checking transaction {tx}");
        self.tx_receipt(tx).await?.ensure_succeeded()
    }
}

enum KeyFile {
    Stored(PathBuf),
    // Removed when dropped
    Temporary(NamedTempFile),
}

impl KeyFile {
    fn path(&self) -> &Path {
        match self {
            KeyFile::Stored(path) => path,
            KeyFile::Temporary(file) => file.path(),
        }
    }
}

#[async_trait]
impl<Node: NodeApi> ChainClient for IostClient<Node> {
    async fn create_account(&self, nickname: &str) -> ChainClientResult<Account> {
        let name = self.wallet.create_account(nickname).await?;
        tracing::info!(nickname, account = %name, "created account");
        Ok(Account::new(nickname, &name))
    }

    async fn publish_contract(
        &self,
        code: &Path,
        abi: &Path,
        signer: &Signer,
    ) -> ChainClientResult<ContractId> {
        let key_file = self.key_file(signer)?;
        let tx = self.wallet.compile(code, abi, key_file.path()).await?;
        tracing::info!("after publish_contract, txid is {tx}");
        self.confirm(&tx).await?;
        Ok(ContractId::from_publishing_tx(&tx))
    }

    async fn call_contract(
        &self,
        contract: &ContractId,
        function: &str,
        args: &serde_json::Value,
        signer: &Signer,
    ) -> ChainClientResult<TxReceipt> {
        let key_file = self.key_file(signer)?;
        let tx = self
            .wallet
            .call(contract.as_str(), function, &args.to_string(), key_file.path())
            .await?;
        tracing::info!("after call_contract {function}, txid is {tx}");
        self.confirm(&tx).await
    }

    async fn balance(&self, account: &str) -> ChainClientResult<f64> {
        self.wallet.balance(account).await
    }

    async fn contract_state(
        &self,
        contract: &ContractId,
        key: &str,
    ) -> ChainClientResult<Option<serde_json::Value>> {
        let res = self.node.state(contract.as_str(), key).await?;
        parse_state_value(key, &res.value)
    }

    async fn tx_receipt(&self, tx: &TxId) -> ChainClientResult<TxReceipt> {
        let res = self.node.tx_receipt(tx.as_str()).await?;
        Ok(TxReceipt {
            tx_id: tx.clone(),
            succeeded_actions: res.tx_receipt_raw.succ_action_num,
            gas_usage: res.tx_receipt_raw.gas_usage,
        })
    }
}

/// Strip the storage type tag and decode the rest. An empty or `null` value means the key is
/// unset.
pub(crate) fn parse_state_value(
    key: &str,
    raw: &str,
) -> ChainClientResult<Option<serde_json::Value>> {
    let mut chars = raw.chars();
    chars.next();
    let body = chars.as_str().trim();
    if body.is_empty() || body == "null" {
        return Ok(None);
    }
    serde_json::from_str(body)
        .map(Some)
        .map_err(|source| ChainClientError::Json {
            key: key.to_string(),
            source,
        })
}
