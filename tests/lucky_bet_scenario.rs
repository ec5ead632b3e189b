use luckbet::{
    chain_client::in_memory_chain::InMemoryChain, error::Error, ChainClient, ContractSource,
    LuckyBetScenario, RunConfig, VerificationError,
};

const CONFIG: &str = r#"
participants = 6
initial_coins = 50
key_dir = "/tmp/luckbet-keys"
"#;

#[tokio::test]
async fn six_participants_settle_one_round() {
    let config = RunConfig::from_toml_str(CONFIG).unwrap();
    let chain = InMemoryChain::for_config(&config);
    let scenario = LuckyBetScenario::new(chain, config);

    let report = scenario.run(ContractSource::Deploy).await.unwrap();

    let stakes: Vec<u64> = report.bets.iter().map(|b| b.bet.stake).collect();
    assert_eq!(stakes, vec![1, 1, 2, 2, 3, 3]);
    // 95% of 12 coins
    assert_eq!(report.summary.rewards.iter().sum::<f64>(), 11.4);
    for (i, account) in report.participants.iter().enumerate() {
        let balance = scenario.client().balance(&account.name).await.unwrap();
        assert_eq!(balance, report.observed_balances[i]);
        assert!((balance - report.summary.expected_balances[i]).abs() < 1e-8);
    }
}

#[tokio::test]
async fn a_bigger_fee_than_configured_fails_the_run() {
    let config = RunConfig::from_toml_str(CONFIG).unwrap();
    let greedy = RunConfig {
        fee_percent: 10,
        ..config.clone()
    };
    // The chain keeps 10% while the harness expects 5%
    let chain = InMemoryChain::for_config(&greedy);
    let scenario = LuckyBetScenario::new(chain, config);

    let err = scenario.run(ContractSource::Deploy).await.unwrap_err();

    assert!(matches!(
        err,
        Error::Verification(VerificationError::InvariantViolation(_))
    ));
}
