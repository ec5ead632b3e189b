use async_trait::async_trait;
use serde::de::DeserializeOwned;
use url::Url;

use super::schemas::{StateResponse, TxReceiptResponse};
use crate::chain_client::ChainClientResult;

/// Read-only endpoints of the node's HTTP API.
#[async_trait]
pub trait NodeApi: Send + Sync {
    async fn tx_receipt(&self, tx_hash: &str) -> ChainClientResult<TxReceiptResponse>;

    async fn state(&self, contract: &str, key: &str) -> ChainClientResult<StateResponse>;
}

pub struct NodeHttp {
    parent_url: String,
    client: reqwest::Client,
}

#[async_trait]
impl NodeApi for NodeHttp {
    async fn tx_receipt(&self, tx_hash: &str) -> ChainClientResult<TxReceiptResponse> {
        let ext = format!("./getTxReceiptByTxHash/{}", tx_hash);
        self.get_endpoint(&ext).await
    }

    async fn state(&self, contract: &str, key: &str) -> ChainClientResult<StateResponse> {
        let ext = format!("./getState/{}-{}", contract, key);
        self.get_endpoint(&ext).await
    }
}

impl NodeHttp {
    pub fn new(url: &str) -> Self {
        NodeHttp {
            parent_url: url.to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn get_endpoint<T: DeserializeOwned>(&self, ext: &str) -> ChainClientResult<T> {
        let url = Url::parse(&self.parent_url)?.join(ext)?;
        tracing::debug!("GET {url}");
        let res = self.client.get(url).send().await?.error_for_status()?;
        let res = res.json().await?;
        Ok(res)
    }
}
