//! The end-to-end lucky bet run: deploy or reuse the contract, create and fund participants,
//! bet, then verify the settled round.

use futures::future::try_join_all;

use crate::{
    bet::{bet_plan, PlacedBet},
    chain_client::{Account, ChainClient, ContractId, Signer},
    config::RunConfig,
    error::{Error, Result},
    round_result::{parse_round_counter, result_key, RoundResult, ROUND_KEY},
    verifier::{verify_payout, PayoutSummary},
};


/// Contract function that places a bet.
pub const BET_FUNCTION: &str = "bet";

/// Where the lucky bet contract comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContractSource {
    /// Create an uploader account, fund it and publish a fresh contract
    Deploy,
    /// Use an already published contract
    Existing(ContractId),
}

/// Everything a passing run observed.
#[allow(missing_docs)]
#[derive(Clone, Debug)]
pub struct ScenarioReport {
    pub contract: ContractId,
    /// Round the bets settled
    pub round: u64,
    pub participants: Vec<Account>,
    pub bets: Vec<PlacedBet>,
    pub observed_balances: Vec<f64>,
    pub summary: PayoutSummary,
}

/// Drives one lucky bet round through a [`ChainClient`].
pub struct LuckyBetScenario<Client: ChainClient> {
    client: Client,
    config: RunConfig,
}

impl<Client: ChainClient> LuckyBetScenario<Client> {
    #[allow(missing_docs)]
    pub fn new(client: Client, config: RunConfig) -> Self {
        LuckyBetScenario { client, config }
    }

    #[allow(missing_docs)]
    pub fn client(&self) -> &Client {
        &self.client
    }

    #[allow(missing_docs)]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run the whole scenario. Any failed step or check aborts the run.
    pub async fn run(&self, source: ContractSource) -> Result<ScenarioReport> {
        let contract = match source {
            ContractSource::Deploy => self.deploy().await?,
            ContractSource::Existing(contract) => contract,
        };
        tracing::info!(%contract, "using contract");

        let participants = self.create_participants().await?;
        self.fund_participants(&participants).await?;

        let round = self.current_round(&contract).await?;
        let bets = self.place_bets(&contract, &participants).await?;
        let observed_balances = self.observe_balances(&participants).await?;
        for (account, balance) in participants.iter().zip(&observed_balances) {
            tracing::info!(nickname = %account.nickname, balance, "balance after the bet");
        }

        let names: Vec<&str> = participants.iter().map(|a| a.name.as_str()).collect();
        let result = self.round_result(&contract, round).await?.aligned_to(&names)?;
        let summary = verify_payout(
            &bets,
            &result,
            &observed_balances,
            self.config.initial_coins as f64,
            &self.config.payout_rule(),
        )?;
        tracing::info!(round, winner = %names[summary.winner], "payout verified");

        Ok(ScenarioReport {
            contract,
            round,
            participants,
            bets,
            observed_balances,
            summary,
        })
    }

    /// Create and fund the uploader, then publish the contract with its key.
    pub async fn deploy(&self) -> Result<ContractId> {
        let uploader = self
            .client
            .create_account(&self.config.uploader_nickname)
            .await?;
        self.client
            .transfer(&self.config.funder(), &uploader.name, self.config.uploader_coins)
            .await?;
        let contract = self
            .client
            .publish_contract(
                &self.config.contract_code,
                &self.config.contract_abi,
                &Signer::Wallet(uploader),
            )
            .await?;
        Ok(contract)
    }

    /// Create every participant's account concurrently.
    pub async fn create_participants(&self) -> Result<Vec<Account>> {
        let nicknames = self.config.participant_nicknames();
        let creations = nicknames
            .iter()
            .map(|nickname| self.client.create_account(nickname));
        let accounts = try_join_all(creations).await?;
        Ok(accounts)
    }

    /// Give each participant the configured starting coins. Transfers share the funder's key,
    /// so they go one at a time.
    pub async fn fund_participants(&self, participants: &[Account]) -> Result<()> {
        let funder = self.config.funder();
        for account in participants {
            self.client
                .transfer(&funder, &account.name, self.config.initial_coins)
                .await?;
        }
        Ok(())
    }

    /// Round currently open for bets. A contract that hasn't stored a counter yet is in its first
    /// round.
    pub async fn current_round(&self, contract: &ContractId) -> Result<u64> {
        match self.client.contract_state(contract, ROUND_KEY).await? {
            None => Ok(1),
            Some(value) => parse_round_counter(&value)
                .ok_or_else(|| Error::RoundResult(format!("bad round counter: {value}"))),
        }
    }

    /// Place the planned bet of every participant concurrently, one request each.
    pub async fn place_bets(
        &self,
        contract: &ContractId,
        participants: &[Account],
    ) -> Result<Vec<PlacedBet>> {
        let names: Vec<&str> = participants.iter().map(|a| a.name.as_str()).collect();
        let placements = participants
            .iter()
            .zip(bet_plan(&names))
            .map(|(account, bet)| async move {
                let signer = Signer::Wallet(account.clone());
                let receipt = self
                    .client
                    .call_contract(contract, BET_FUNCTION, &bet.contract_args()?, &signer)
                    .await?;
                let gas_fee = if self.config.account_for_gas {
                    receipt.gas_in_coins()
                } else {
                    0.0
                };
                tracing::info!(
                    nickname = %account.nickname,
                    lucky_number = bet.lucky_number,
                    stake = bet.stake,
                    gas_fee,
                    "bet placed"
                );
                Ok::<_, Error>(PlacedBet { bet, gas_fee })
            });
        try_join_all(placements).await
    }

    /// Balances of all participants, in participant order.
    pub async fn observe_balances(&self, participants: &[Account]) -> Result<Vec<f64>> {
        let queries = participants
            .iter()
            .map(|account| self.client.balance(&account.name));
        let balances = try_join_all(queries).await?;
        Ok(balances)
    }

    /// Result record the contract stored for `round`.
    pub async fn round_result(&self, contract: &ContractId, round: u64) -> Result<RoundResult> {
        let key = result_key(round);
        let value = self
            .client
            .contract_state(contract, &key)
            .await?
            .ok_or_else(|| Error::RoundResult(format!("no result recorded for round {round}")))?;
        let result = RoundResult::from_state(value)?;
        tracing::debug!(?result, "round result");
        Ok(result)
    }
}
