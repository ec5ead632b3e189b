use async_trait::async_trait;
use rand::Rng;
use serde_json::{json, Value};
use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};
use thiserror::Error;

use crate::{
    amount::{amount_from_json, UNITS_PER_COIN},
    chain_client::{
        Account, ChainClient, ChainClientError, ChainClientResult, ContractId, Signer, TxId,
        TxReceipt, SYSTEM_CONTRACT, TRANSFER_FUNCTION,
    },
    config::RunConfig,
    round_result::{result_key, ROUND_KEY},
};

#[cfg(test)]
mod tests;

/// Coins held by the funding account of a fresh [`InMemoryChain`] built from a config.
pub const DEFAULT_FUNDER_COINS: u64 = 1_000_000_000;

/// Behaviour of the simulated lucky bet contract and the fake chain's gas.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LuckyBetSettings {
    /// Bets collected before a round settles
    pub round_size: usize,
    /// Percentage of the pot the contract keeps
    pub fee_percent: u64,
    /// Gas charged to the signer of every transaction, in contract units
    pub gas_per_tx: u64,
}

impl Default for LuckyBetSettings {
    fn default() -> Self {
        LuckyBetSettings {
            round_size: 10,
            fee_percent: 5,
            gas_per_tx: 0,
        }
    }
}

#[derive(Debug, Error)]
enum ActionError {
    #[error("Signer {0} doesn't match account {1}")]
    WrongSigner(String, String),
    #[error("Not enough balance in {0}")]
    InsufficientBalance(String),
    #[error("Unknown account {0}")]
    UnknownAccount(String),
    #[error("Bad arguments: {0}")]
    BadArgs(String),
    #[error("Unknown contract {0}")]
    UnknownContract(String),
    #[error("Unknown function {0}")]
    UnknownFunction(String),
}

#[derive(Debug)]
struct PendingBet {
    account: String,
    lucky_number: u64,
    units: u64,
    nonce: u64,
}

#[derive(Debug)]
struct LuckyBetContract {
    round: u64,
    pending: Vec<PendingBet>,
    storage: HashMap<String, Value>,
}

impl LuckyBetContract {
    fn new() -> Self {
        let mut storage = HashMap::new();
        storage.insert(ROUND_KEY.to_string(), json!(1));
        LuckyBetContract {
            round: 1,
            pending: Vec::new(),
            storage,
        }
    }
}

#[derive(Debug, Default)]
struct ChainState {
    balances: HashMap<String, u64>,
    contracts: HashMap<ContractId, LuckyBetContract>,
    receipts: HashMap<TxId, TxReceipt>,
    accounts_created: u64,
}

impl ChainState {
    fn debit(&mut self, account: &str, units: u64) -> Result<(), ActionError> {
        let balance = self
            .balances
            .get_mut(account)
            .ok_or_else(|| ActionError::UnknownAccount(account.to_string()))?;
        *balance = balance
            .checked_sub(units)
            .ok_or_else(|| ActionError::InsufficientBalance(account.to_string()))?;
        Ok(())
    }

    fn credit(&mut self, account: &str, units: u64) -> Result<(), ActionError> {
        let balance = self
            .balances
            .get_mut(account)
            .ok_or_else(|| ActionError::UnknownAccount(account.to_string()))?;
        *balance += units;
        Ok(())
    }

    fn transfer(&mut self, signer: &str, args: &Value) -> Result<(), ActionError> {
        let (from, to, coins) = match args.as_array().map(Vec::as_slice) {
            Some([from, to, amount]) => (
                str_arg(from, "from")?,
                str_arg(to, "to")?,
                amount_from_json(amount)
                    .filter(|a| *a >= 0.0)
                    .ok_or_else(|| ActionError::BadArgs("amount".to_string()))?,
            ),
            _ => return Err(ActionError::BadArgs("expected [from, to, amount]".to_string())),
        };
        if from != signer {
            return Err(ActionError::WrongSigner(signer.to_string(), from.to_string()));
        }
        if !self.balances.contains_key(to) {
            return Err(ActionError::UnknownAccount(to.to_string()));
        }
        let units = (coins * UNITS_PER_COIN as f64).round() as u64;
        self.debit(from, units)?;
        self.credit(to, units)
    }

    fn bet(
        &mut self,
        contract: &ContractId,
        signer: &str,
        args: &Value,
        settings: &LuckyBetSettings,
    ) -> Result<(), ActionError> {
        let bet = match args.as_array().map(Vec::as_slice) {
            Some([account, lucky_number, units, nonce]) => PendingBet {
                account: str_arg(account, "account")?.to_string(),
                lucky_number: u64_arg(lucky_number, "luckyNumber")?,
                units: u64_arg(units, "coins")?,
                nonce: u64_arg(nonce, "nonce")?,
            },
            _ => {
                return Err(ActionError::BadArgs(
                    "expected [account, luckyNumber, coins, nonce]".to_string(),
                ))
            }
        };
        if bet.account != signer {
            return Err(ActionError::WrongSigner(signer.to_string(), bet.account));
        }
        if bet.units == 0 {
            return Err(ActionError::BadArgs("coins must be positive".to_string()));
        }
        if !self.contracts.contains_key(contract) {
            return Err(ActionError::UnknownContract(contract.to_string()));
        }
        self.debit(&bet.account, bet.units)?;
        let lucky_bet = self
            .contracts
            .get_mut(contract)
            .ok_or_else(|| ActionError::UnknownContract(contract.to_string()))?;
        lucky_bet.pending.push(bet);
        if lucky_bet.pending.len() >= settings.round_size {
            let (winner, reward) = settle_round(lucky_bet, settings.fee_percent);
            self.credit(&winner, reward)?;
        }
        Ok(())
    }
}

// Pays the pot to one pending bet and records the round. Returns the winner and its reward.
fn settle_round(contract: &mut LuckyBetContract, fee_percent: u64) -> (String, u64) {
    let bets = std::mem::take(&mut contract.pending);
    let total: u64 = bets.iter().map(|b| b.units).sum();
    let reward = (total as u128 * 100u128.saturating_sub(fee_percent as u128) / 100) as u64;
    let seed = bets
        .iter()
        .map(|b| b.lucky_number as u128 + b.nonce as u128)
        .sum::<u128>();
    let winner = (seed % bets.len() as u128) as usize;
    let records: Vec<Value> = bets
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let mut record = json!({
                "account": b.account,
                "luckyNumber": b.lucky_number,
                "coins": b.units,
                "nonce": b.nonce,
            });
            if i == winner {
                record["reward"] = json!(reward.to_string());
            }
            record
        })
        .collect();
    contract
        .storage
        .insert(result_key(contract.round), json!({ "records": records }));
    contract.round += 1;
    contract
        .storage
        .insert(ROUND_KEY.to_string(), json!(contract.round));
    tracing::debug!(round = contract.round - 1, winner, reward, "settled round");
    (bets[winner].account.clone(), reward)
}

fn str_arg<'a>(value: &'a Value, name: &str) -> Result<&'a str, ActionError> {
    value
        .as_str()
        .ok_or_else(|| ActionError::BadArgs(name.to_string()))
}

fn u64_arg(value: &Value, name: &str) -> Result<u64, ActionError> {
    value
        .as_u64()
        .ok_or_else(|| ActionError::BadArgs(name.to_string()))
}

fn arbitrary_tx_id() -> TxId {
    let bytes = rand::thread_rng().gen::<[u8; 32]>();
    TxId::new(&hex::encode(bytes))
}

/// A [`ChainClient`] that keeps the whole chain in memory and runs a simulated lucky bet
/// contract. Transactions settle immediately.
#[derive(Debug, Clone)]
pub struct InMemoryChain {
    state: Arc<Mutex<ChainState>>,
    settings: LuckyBetSettings,
}

impl InMemoryChain {
    /// A chain where only `funder` exists, holding `funder_coins`.
    pub fn new(funder: &str, funder_coins: u64, settings: LuckyBetSettings) -> Self {
        let mut state = ChainState::default();
        state
            .balances
            .insert(funder.to_string(), funder_coins.saturating_mul(UNITS_PER_COIN));
        InMemoryChain {
            state: Arc::new(Mutex::new(state)),
            settings,
        }
    }

    /// A chain funded from `config`'s funding account, whose contract settles once every
    /// configured participant has bet.
    pub fn for_config(config: &RunConfig) -> Self {
        let settings = LuckyBetSettings {
            round_size: config.participants,
            fee_percent: config.fee_percent,
            gas_per_tx: 0,
        };
        InMemoryChain::new(&config.funder_account, DEFAULT_FUNDER_COINS, settings)
    }

    /// Overwrite a contract's stored value, e.g. to simulate a misbehaving contract.
    pub fn set_state(
        &self,
        contract: &ContractId,
        key: &str,
        value: Value,
    ) -> ChainClientResult<()> {
        let mut state = self.lock()?;
        let lucky_bet = state
            .contracts
            .get_mut(contract)
            .ok_or_else(|| ChainClientError::UnknownContract(contract.clone()))?;
        lucky_bet.storage.insert(key.to_string(), value);
        Ok(())
    }

    fn lock(&self) -> ChainClientResult<MutexGuard<'_, ChainState>> {
        self.state
            .lock()
            .map_err(|e| ChainClientError::Mutex(format! {"{:?}", e}))
    }

    fn ensure_account(state: &ChainState, account: &str) -> ChainClientResult<()> {
        if state.balances.contains_key(account) {
            Ok(())
        } else {
            Err(ChainClientError::UnknownAccount(account.to_string()))
        }
    }

    // Charges gas, runs `action` and stores the receipt. A failed action still pays gas.
    fn issue<F>(&self, signer: &Signer, action: F) -> ChainClientResult<TxReceipt>
    where
        F: FnOnce(&mut ChainState, &TxId) -> Result<(), ActionError>,
    {
        let signer = signer.account_name();
        let tx_id = arbitrary_tx_id();
        let mut state = self.lock()?;
        Self::ensure_account(&state, signer)?;
        let gas = self.settings.gas_per_tx;
        let outcome = match state.debit(signer, gas) {
            Ok(()) => action(&mut *state, &tx_id),
            Err(e) => Err(e),
        };
        let succeeded_actions = match outcome {
            Ok(()) => 1,
            Err(e) => {
                tracing::warn!(tx = %tx_id, "transaction failed: {e}");
                0
            }
        };
        let receipt = TxReceipt {
            tx_id: tx_id.clone(),
            succeeded_actions,
            gas_usage: gas as f64,
        };
        state.receipts.insert(tx_id, receipt.clone());
        receipt.ensure_succeeded()
    }
}

#[async_trait]
impl ChainClient for InMemoryChain {
    async fn create_account(&self, nickname: &str) -> ChainClientResult<Account> {
        let mut state = self.lock()?;
        state.accounts_created += 1;
        let name = format!("IOST{:08}", state.accounts_created);
        state.balances.insert(name.clone(), 0);
        Ok(Account::new(nickname, &name))
    }

    async fn publish_contract(
        &self,
        _code: &Path,
        _abi: &Path,
        signer: &Signer,
    ) -> ChainClientResult<ContractId> {
        let receipt = self.issue(signer, |state, tx_id| {
            let contract = ContractId::from_publishing_tx(tx_id);
            state.contracts.insert(contract, LuckyBetContract::new());
            Ok(())
        })?;
        Ok(ContractId::from_publishing_tx(&receipt.tx_id))
    }

    async fn call_contract(
        &self,
        contract: &ContractId,
        function: &str,
        args: &Value,
        signer: &Signer,
    ) -> ChainClientResult<TxReceipt> {
        let signer_name = signer.account_name().to_string();
        if contract.as_str() == SYSTEM_CONTRACT {
            return self.issue(signer, |state, _| match function {
                TRANSFER_FUNCTION => state.transfer(&signer_name, args),
                other => Err(ActionError::UnknownFunction(other.to_string())),
            });
        }
        if !self.lock()?.contracts.contains_key(contract) {
            return Err(ChainClientError::UnknownContract(contract.clone()));
        }
        let settings = self.settings.clone();
        self.issue(signer, |state, _| match function {
            "bet" => state.bet(contract, &signer_name, args, &settings),
            other => Err(ActionError::UnknownFunction(other.to_string())),
        })
    }

    async fn balance(&self, account: &str) -> ChainClientResult<f64> {
        let units = *self
            .lock()?
            .balances
            .get(account)
            .ok_or_else(|| ChainClientError::UnknownAccount(account.to_string()))?;
        Ok(units as f64 / UNITS_PER_COIN as f64)
    }

    async fn contract_state(
        &self,
        contract: &ContractId,
        key: &str,
    ) -> ChainClientResult<Option<Value>> {
        let state = self.lock()?;
        let lucky_bet = state
            .contracts
            .get(contract)
            .ok_or_else(|| ChainClientError::UnknownContract(contract.clone()))?;
        Ok(lucky_bet.storage.get(key).cloned())
    }

    async fn tx_receipt(&self, tx: &TxId) -> ChainClientResult<TxReceipt> {
        self.lock()?
            .receipts
            .get(tx)
            .cloned()
            .ok_or_else(|| ChainClientError::UnknownTx(tx.clone()))
    }
}
