use crate::Error;
use anyhow::Result;
use luckbet::{
    chain_client::{in_memory_chain::InMemoryChain, iost_client::IostClient},
    ChainClient, ContractId, ContractSource, LuckyBetScenario, RunConfig, ScenarioReport,
};
use std::path::PathBuf;

#[derive(Clone, Copy, Debug)]
pub enum Target {
    Node,
    Mocked,
}

pub async fn run_impl(
    setup: bool,
    cid: Option<String>,
    config_path: Option<PathBuf>,
    target: Target,
) -> Result<()> {
    let source = contract_source(setup, cid)?;
    let config = match config_path {
        Some(path) => RunConfig::from_file(&path).await?,
        None => RunConfig::default(),
    };
    let report = match target {
        Target::Node => {
            let client = IostClient::from_config(&config)?;
            run_scenario(client, config, source).await?
        }
        Target::Mocked => {
            let chain = InMemoryChain::for_config(&config);
            run_scenario(chain, config, source).await?
        }
    };
    print_report(&report);
    Ok(())
}

/// Runs the scenario, logging the failure chain before handing the error back.
pub async fn run_logged(
    setup: bool,
    cid: Option<String>,
    config_path: Option<PathBuf>,
    target: Target,
) -> Result<()> {
    run_impl(setup, cid, config_path, target)
        .await
        .map_err(|error| {
            tracing::error!("lucky bet run failed: {error:#}");
            error
        })
}

fn contract_source(setup: bool, cid: Option<String>) -> Result<ContractSource> {
    match (setup, cid) {
        (true, None) => Ok(ContractSource::Deploy),
        (false, Some(cid)) => Ok(ContractSource::Existing(ContractId::new(&cid))),
        _ => Err(Error::CLI("Pass exactly one of --setup or --cid".to_string()).into()),
    }
}

async fn run_scenario<Client: ChainClient>(
    client: Client,
    config: RunConfig,
    source: ContractSource,
) -> Result<ScenarioReport> {
    let scenario = LuckyBetScenario::new(client, config);
    let report = scenario.run(source).await?;
    Ok(report)
}

fn print_report(report: &ScenarioReport) {
    println!();
    println!("Contract: {}", report.contract);
    println!("Round: {}", report.round);
    println!("Balance after the bet:");
    for (i, account) in report.participants.iter().enumerate() {
        let marker = if i == report.summary.winner { " 🏆" } else { "" };
        println!(
            "{}: {} (expected {}){}",
            account.nickname,
            report.observed_balances[i],
            report.summary.expected_balances[i],
            marker
        );
    }
    println!();
    println!("Congratulations! The lucky bet contract paid out as expected!");
}
