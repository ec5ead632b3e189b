//! Run configuration for the smoke test.
//!
//! Every knob the scenario and clients need is carried here instead of living in globals. A
//! TOML file may set any subset of the fields; the rest take the local test network defaults.

use secrecy::SecretString;
use serde::Deserialize;
use std::{collections::HashMap, path::Path, path::PathBuf, time::Duration};
use tokio::fs;

use crate::{
    chain_client::Signer,
    error::{Error, Result},
    verifier::PayoutRule,
};

/// Name of the genesis account of a local test network.
pub const LOCAL_FUNDER_ACCOUNT: &str = "IOSTfQFocqDn7VrKV7vvPqhAQGyeFU9XMYo5SNn5yQbdbzC75wM7C";
// Well known key of the local test network's genesis account. Never use it anywhere real.
const LOCAL_FUNDER_KEY: &str =
    "1rANSfcRzr4HkhbUFZ7L1Zp69JZZHiDDq5v7dNSbbEqeU4jxy3fszV4HGiaLQEyqVpS1dKT9g7zCVRxBVzuiUzB";

#[allow(missing_docs)]
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Wallet CLI binary
    pub wallet_program: PathBuf,
    /// Extra environment for the wallet CLI, e.g. a library path for the VM
    pub wallet_env: HashMap<String, String>,
    /// Directory holding the wallet's `<nickname>_ed25519` key files. Defaults to `~/.iwallet`.
    pub key_dir: Option<PathBuf>,
    pub node_address: String,
    pub node_port: u16,
    /// Transaction expiration; also how long to wait before fetching a receipt
    pub expiration_secs: u64,
    pub gas_limit: u64,
    pub contract_code: PathBuf,
    pub contract_abi: PathBuf,
    pub uploader_nickname: String,
    /// Coins given to the uploader before publishing
    pub uploader_coins: u64,
    pub participants: usize,
    /// Coins given to every participant before betting
    pub initial_coins: u64,
    /// Percentage of the pot the contract keeps
    pub fee_percent: u64,
    /// Subtract each bet's gas from the participant's expected balance
    pub account_for_gas: bool,
    pub funder_account: String,
    pub funder_key: SecretString,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            wallet_program: PathBuf::from("iwallet"),
            wallet_env: HashMap::new(),
            key_dir: None,
            node_address: "127.0.0.1".to_string(),
            node_port: 30001,
            expiration_secs: 5,
            gas_limit: 100_000,
            contract_code: PathBuf::from("contract/lucky_bet.js"),
            contract_abi: PathBuf::from("contract/lucky_bet.js.abi"),
            uploader_nickname: "uploader".to_string(),
            uploader_coins: 100,
            participants: 10,
            initial_coins: 100,
            fee_percent: 5,
            account_for_gas: true,
            funder_account: LOCAL_FUNDER_ACCOUNT.to_string(),
            funder_key: SecretString::new(LOCAL_FUNDER_KEY.to_string()),
        }
    }
}

impl RunConfig {
    /// Read a config from a TOML file.
    pub async fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).await.map_err(Error::FileRead)?;
        let config = Self::from_toml_str(&text)?;
        Ok(config)
    }

    #[allow(missing_docs)]
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: RunConfig = toml::from_str(text).map_err(Error::Toml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.participants == 0 {
            return Err(Error::Config("participants must be at least 1".to_string()));
        }
        if self.fee_percent > 100 {
            return Err(Error::Config(format!(
                "fee_percent must be at most 100, got {}",
                self.fee_percent
            )));
        }
        Ok(())
    }

    /// Base url of the node's HTTP API.
    pub fn node_url(&self) -> String {
        format!("http://{}:{}/", self.node_address, self.node_port)
    }

    #[allow(missing_docs)]
    pub fn expiration(&self) -> Duration {
        Duration::from_secs(self.expiration_secs)
    }

    /// Wallet key directory, resolved against the home directory when not configured.
    pub fn resolved_key_dir(&self) -> Result<PathBuf> {
        match &self.key_dir {
            Some(dir) => Ok(dir.clone()),
            None => {
                let mut dir = dirs::home_dir()
                    .ok_or_else(|| Error::Config("Could not find home directory".to_string()))?;
                dir.push(".iwallet");
                Ok(dir)
            }
        }
    }

    /// Signer for the account that funds everyone else.
    pub fn funder(&self) -> Signer {
        Signer::Key {
            account: self.funder_account.clone(),
            key: self.funder_key.clone(),
        }
    }

    #[allow(missing_docs)]
    pub fn payout_rule(&self) -> PayoutRule {
        PayoutRule::with_fee_percent(self.fee_percent)
    }

    /// Nicknames of the betting accounts: `user_1` to `user_N`.
    pub fn participant_nicknames(&self) -> Vec<String> {
        (1..=self.participants).map(|i| format!("user_{i}")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn empty_file_gives_local_defaults() {
        let config = RunConfig::from_toml_str("").unwrap();
        assert_eq!(config.node_url(), "http://127.0.0.1:30001/");
        assert_eq!(config.participants, 10);
        assert_eq!(config.initial_coins, 100);
        assert_eq!(config.expiration(), Duration::from_secs(5));
        assert_eq!(config.funder().account_name(), LOCAL_FUNDER_ACCOUNT);
        assert_eq!(config.payout_rule(), PayoutRule::default());
    }

    #[test]
    fn overrides_selected_fields() {
        let text = r#"
            node_address = "10.0.0.7"
            participants = 4
            funder_key = "abc"
            key_dir = "/tmp/keys"

            [wallet_env]
            DYLD_LIBRARY_PATH = "/opt/v8"
        "#;
        let config = RunConfig::from_toml_str(text).unwrap();
        assert_eq!(config.node_url(), "http://10.0.0.7:30001/");
        assert_eq!(
            config.participant_nicknames(),
            vec!["user_1", "user_2", "user_3", "user_4"]
        );
        assert_eq!(config.funder_key.expose_secret(), "abc");
        assert_eq!(config.resolved_key_dir().unwrap(), PathBuf::from("/tmp/keys"));
        assert_eq!(config.wallet_env["DYLD_LIBRARY_PATH"], "/opt/v8");
    }

    #[test]
    fn rejects_zero_participants() {
        let err = RunConfig::from_toml_str("participants = 0").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn rejects_bad_toml() {
        let err = RunConfig::from_toml_str("participants = \"ten\"").unwrap_err();
        assert!(matches!(err, Error::Toml(_)));
    }
}
