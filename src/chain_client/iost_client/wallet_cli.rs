use std::{
    collections::HashMap,
    ffi::OsString,
    path::{Path, PathBuf},
};
use tokio::process::Command;

use crate::chain_client::{ChainClientError, ChainClientResult, TxId};

const TX_HASH_MARKER: &str = "the transaction hash is:";

/// Thin wrapper over the `iwallet` command line tool.
///
/// Each method runs one command and scrapes the one value it needs from the human readable
/// output. Nothing outside this module sees that output.
#[derive(Clone, Debug)]
pub struct WalletCli {
    program: PathBuf,
    env: HashMap<String, String>,
    expiration_secs: u64,
    gas_limit: u64,
}

impl WalletCli {
    #[allow(missing_docs)]
    pub fn new(
        program: &Path,
        env: HashMap<String, String>,
        expiration_secs: u64,
        gas_limit: u64,
    ) -> Self {
        WalletCli {
            program: program.to_path_buf(),
            env,
            expiration_secs,
            gas_limit,
        }
    }

    /// `iwallet account -n <nickname>`, returning the new account's name
    pub async fn create_account(&self, nickname: &str) -> ChainClientResult<String> {
        let args = vec!["account".into(), "-n".into(), nickname.into()];
        let (command, stdout) = self.run(args).await?;
        parse_account_name(&stdout)
            .map(str::to_string)
            .ok_or_else(|| unexpected(command, "an IOST account name", stdout))
    }

    /// `iwallet balance <account>`, in coins
    pub async fn balance(&self, account: &str) -> ChainClientResult<f64> {
        let args = vec!["balance".into(), account.into()];
        let (command, stdout) = self.run(args).await?;
        parse_balance(&stdout).ok_or_else(|| unexpected(command, "a balance", stdout))
    }

    /// `iwallet call`, returning the hash of the submitted transaction
    pub async fn call(
        &self,
        contract: &str,
        function: &str,
        args_json: &str,
        key_file: &Path,
    ) -> ChainClientResult<TxId> {
        let args = vec![
            "call".into(),
            "--expiration".into(),
            self.expiration_secs.to_string().into(),
            "-k".into(),
            key_file.into(),
            "-l".into(),
            self.gas_limit.to_string().into(),
            contract.into(),
            function.into(),
            args_json.into(),
        ];
        let (command, stdout) = self.run(args).await?;
        parse_tx_hash(&stdout)
            .map(TxId::new)
            .ok_or_else(|| unexpected(command, "a transaction hash", stdout))
    }

    /// `iwallet compile`, publishing a contract and returning the publishing transaction's hash
    pub async fn compile(
        &self,
        code: &Path,
        abi: &Path,
        key_file: &Path,
    ) -> ChainClientResult<TxId> {
        let args = vec![
            "compile".into(),
            "-e".into(),
            self.expiration_secs.to_string().into(),
            "-l".into(),
            self.gas_limit.to_string().into(),
            "-p".into(),
            "1".into(),
            "-k".into(),
            key_file.into(),
            code.into(),
            abi.into(),
        ];
        let (command, stdout) = self.run(args).await?;
        parse_tx_hash(&stdout)
            .map(TxId::new)
            .ok_or_else(|| unexpected(command, "a transaction hash", stdout))
    }

    async fn run(&self, args: Vec<OsString>) -> ChainClientResult<(String, String)> {
        let command = self.describe(&args);
        tracing::debug!("exec {command}");
        let output = Command::new(&self.program)
            .args(&args)
            .envs(&self.env)
            .output()
            .await
            .map_err(|source| ChainClientError::Io {
                command: command.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(ChainClientError::CommandFailed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        Ok((command, stdout))
    }

    fn describe(&self, args: &[OsString]) -> String {
        let mut parts = vec![self.program.to_string_lossy().into_owned()];
        parts.extend(args.iter().map(|a| a.to_string_lossy().into_owned()));
        parts.join(" ")
    }
}

fn unexpected(command: String, expected: &'static str, output: String) -> ChainClientError {
    ChainClientError::UnexpectedOutput {
        command,
        expected,
        output,
    }
}

/// First whitespace separated token that looks like an account name.
pub(crate) fn parse_account_name(stdout: &str) -> Option<&str> {
    stdout
        .split_whitespace()
        .find(|token| token.starts_with("IOST") && token.len() > "IOST".len())
}

/// The balance is the first token of `iwallet balance` output, e.g. `99.5 iost`.
pub(crate) fn parse_balance(stdout: &str) -> Option<f64> {
    stdout.split_whitespace().next()?.parse().ok()
}

pub(crate) fn parse_tx_hash(stdout: &str) -> Option<&str> {
    let start = stdout.find(TX_HASH_MARKER)? + TX_HASH_MARKER.len();
    stdout[start..].split_whitespace().next()
}
