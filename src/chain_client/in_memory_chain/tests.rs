use super::*;
use crate::{bet::planned_bet, round_result::RoundResult};

const FUNDER: &str = "IOSTfunder";

fn funder() -> Signer {
    Signer::Key {
        account: FUNDER.to_string(),
        key: secrecy::SecretString::new("key".to_string()),
    }
}

fn chain(settings: LuckyBetSettings) -> InMemoryChain {
    InMemoryChain::new(FUNDER, 10_000, settings)
}

async fn funded_account(chain: &InMemoryChain, nickname: &str, coins: u64) -> Account {
    let account = chain.create_account(nickname).await.unwrap();
    chain.transfer(&funder(), &account.name, coins).await.unwrap();
    account
}

async fn publish(chain: &InMemoryChain) -> ContractId {
    chain
        .publish_contract(Path::new("lucky_bet.js"), Path::new("lucky_bet.js.abi"), &funder())
        .await
        .unwrap()
}

#[tokio::test]
async fn transfer_moves_coins() {
    let chain = chain(LuckyBetSettings::default());
    let alice = funded_account(&chain, "alice", 100).await;

    assert_eq!(chain.balance(&alice.name).await.unwrap(), 100.0);
    assert_eq!(chain.balance(FUNDER).await.unwrap(), 9_900.0);
}

#[tokio::test]
async fn transfer_from_someone_else_fails() {
    let chain = chain(LuckyBetSettings::default());
    let alice = funded_account(&chain, "alice", 10).await;
    let bob = chain.create_account("bob").await.unwrap();

    let args = json!([FUNDER, bob.name, 5]);
    let err = chain
        .call_contract(
            &ContractId::new(SYSTEM_CONTRACT),
            TRANSFER_FUNCTION,
            &args,
            &Signer::Wallet(alice),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ChainClientError::TxFailed(_, 0)));
    assert_eq!(chain.balance(&bob.name).await.unwrap(), 0.0);
}

#[tokio::test]
async fn publishing_starts_at_round_one() {
    let chain = chain(LuckyBetSettings::default());
    let contract = publish(&chain).await;

    assert!(contract.as_str().starts_with("Contract"));
    let round = chain.contract_state(&contract, ROUND_KEY).await.unwrap();
    assert_eq!(round, Some(json!(1)));
    assert_eq!(chain.contract_state(&contract, "result1").await.unwrap(), None);
}

#[tokio::test]
async fn full_round_pays_one_winner_the_pot_minus_fee() {
    let settings = LuckyBetSettings {
        round_size: 4,
        ..LuckyBetSettings::default()
    };
    let chain = chain(settings);
    let contract = publish(&chain).await;
    let mut accounts = Vec::new();
    for i in 0..4 {
        let account = funded_account(&chain, &format!("user_{i}"), 100).await;
        let bet = planned_bet(i, &account.name);
        chain
            .call_contract(&contract, "bet", &bet.contract_args().unwrap(), &Signer::Wallet(account.clone()))
            .await
            .unwrap();
        accounts.push(account);
    }

    let value = chain.contract_state(&contract, "result1").await.unwrap().unwrap();
    let result = RoundResult::from_state(value).unwrap();
    let winners: Vec<_> = result.records.iter().filter(|r| r.is_winner()).collect();
    assert_eq!(winners.len(), 1);
    // stakes 1 + 1 + 2 + 2 coins
    assert_eq!(winners[0].reward, Some(570_000_000.0));
    assert_eq!(
        chain.contract_state(&contract, ROUND_KEY).await.unwrap(),
        Some(json!(2))
    );

    let mut total = 0.0;
    for account in &accounts {
        total += chain.balance(&account.name).await.unwrap();
    }
    assert!((total - (400.0 - 6.0 + 5.7)).abs() < 1e-8);
}

#[tokio::test]
async fn bet_without_funds_fails() {
    let chain = chain(LuckyBetSettings::default());
    let contract = publish(&chain).await;
    let broke = chain.create_account("broke").await.unwrap();
    let bet = planned_bet(0, &broke.name);

    let err = chain
        .call_contract(&contract, "bet", &bet.contract_args().unwrap(), &Signer::Wallet(broke))
        .await
        .unwrap_err();

    assert!(matches!(err, ChainClientError::TxFailed(_, 0)));
}

#[tokio::test]
async fn bet_on_unknown_contract_fails() {
    let chain = chain(LuckyBetSettings::default());
    let alice = funded_account(&chain, "alice", 10).await;
    let bet = planned_bet(0, &alice.name);

    let err = chain
        .call_contract(
            &ContractId::new("Contractnope"),
            "bet",
            &bet.contract_args().unwrap(),
            &Signer::Wallet(alice),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ChainClientError::UnknownContract(_)));
}

#[tokio::test]
async fn gas_is_charged_and_reported() {
    let settings = LuckyBetSettings {
        gas_per_tx: 1_000_000,
        ..LuckyBetSettings::default()
    };
    let chain = chain(settings);
    let contract = publish(&chain).await;
    let alice = funded_account(&chain, "alice", 10).await;
    let bet = planned_bet(0, &alice.name);

    let receipt = chain
        .call_contract(&contract, "bet", &bet.contract_args().unwrap(), &Signer::Wallet(alice.clone()))
        .await
        .unwrap();

    assert_eq!(receipt.gas_in_coins(), 0.01);
    assert_eq!(chain.balance(&alice.name).await.unwrap(), 8.99);
    let stored = chain.tx_receipt(&receipt.tx_id).await.unwrap();
    assert_eq!(stored, receipt);
}

#[tokio::test]
async fn state_can_be_overwritten() {
    let chain = chain(LuckyBetSettings::default());
    let contract = publish(&chain).await;

    chain
        .set_state(&contract, "result1", json!({"records": []}))
        .unwrap();

    assert_eq!(
        chain.contract_state(&contract, "result1").await.unwrap(),
        Some(json!({"records": []}))
    );
}

#[tokio::test]
async fn unknown_account_balance_is_an_error() {
    let chain = chain(LuckyBetSettings::default());
    let err = chain.balance("IOSTghost").await.unwrap_err();
    assert!(matches!(err, ChainClientError::UnknownAccount(_)));
}

// Reports every balance one coin short of what the chain holds
struct ShortBalanceChain(InMemoryChain);

#[async_trait]
impl ChainClient for ShortBalanceChain {
    async fn create_account(&self, nickname: &str) -> ChainClientResult<Account> {
        self.0.create_account(nickname).await
    }

    async fn publish_contract(
        &self,
        code: &Path,
        abi: &Path,
        signer: &Signer,
    ) -> ChainClientResult<ContractId> {
        self.0.publish_contract(code, abi, signer).await
    }

    async fn call_contract(
        &self,
        contract: &ContractId,
        function: &str,
        args: &Value,
        signer: &Signer,
    ) -> ChainClientResult<TxReceipt> {
        self.0.call_contract(contract, function, args, signer).await
    }

    async fn balance(&self, account: &str) -> ChainClientResult<f64> {
        Ok(self.0.balance(account).await? - 1.0)
    }

    async fn contract_state(
        &self,
        contract: &ContractId,
        key: &str,
    ) -> ChainClientResult<Option<Value>> {
        self.0.contract_state(contract, key).await
    }

    async fn tx_receipt(&self, tx: &TxId) -> ChainClientResult<TxReceipt> {
        self.0.tx_receipt(tx).await
    }
}

#[tokio::test]
async fn transfer_not_seen_in_recipient_balance_fails() {
    let chain = ShortBalanceChain(chain(LuckyBetSettings::default()));
    let alice = chain.create_account("alice").await.unwrap();

    let err = chain.transfer(&funder(), &alice.name, 10).await.unwrap_err();

    assert!(matches!(
        err,
        ChainClientError::TransferNotCredited { expected: 10, actual, .. } if actual == 9.0
    ));
}

#[tokio::test]
async fn accounts_get_sequential_names() {
    let chain = chain(LuckyBetSettings::default());

    let first = chain.create_account("alice").await.unwrap();
    let second = chain.create_account("bob").await.unwrap();

    assert_eq!(first.name, "IOST00000001");
    assert_eq!(second.name, "IOST00000002");
}

#[tokio::test]
async fn winner_is_lucky_numbers_plus_nonces_mod_round_size_every_round() {
    let settings = LuckyBetSettings {
        round_size: 3,
        ..LuckyBetSettings::default()
    };
    let chain = chain(settings);
    let contract = publish(&chain).await;
    let mut accounts = Vec::new();
    for nickname in ["a", "b", "c"] {
        accounts.push(funded_account(&chain, nickname, 100).await);
    }

    for round in 1..=2 {
        for (account, lucky_number) in accounts.iter().zip([5, 0, 0]) {
            let bet = crate::bet::Bet {
                participant: account.name.clone(),
                lucky_number,
                stake: 1,
                nonce: 1,
            };
            let args = bet.contract_args().unwrap();
            chain
                .call_contract(&contract, "bet", &args, &Signer::Wallet(account.clone()))
                .await
                .unwrap();
        }

        let value = chain
            .contract_state(&contract, &result_key(round))
            .await
            .unwrap()
            .unwrap();
        let result = RoundResult::from_state(value).unwrap();
        // (5 + 0 + 0) + (1 + 1 + 1) = 8, and 8 mod 3 = 2
        assert!(result.records[2].is_winner());
        assert_eq!(result.records[2].account.as_deref(), Some(accounts[2].name.as_str()));
    }
}
