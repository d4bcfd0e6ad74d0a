pub mod config;

use anyhow::Context;
use clap::Parser;

use std::path::PathBuf;

use tally_ledger::{
    balance::MemoryBalanceStore, transaction::MemoryTransactionStore, TallyLedger,
    TallyLedgerConfig,
};

use self::config::Config;
use crate::scenario::{Scenario, ScenarioRunner};

#[derive(Parser)]
#[clap(long_about = None)]
struct Cli {
    #[clap(short, long, env = "TALLY_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,
    /// YAML file with the balances to open and the requests to run.
    #[clap(value_name = "SCENARIO")]
    scenario: PathBuf,
    /// Print indented JSON.
    #[clap(long)]
    pretty: bool,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load_config(cli.config)?;
    let scenario = Scenario::load(&cli.scenario)?;

    run_cmd(config, scenario, cli.pretty).await?;

    Ok(())
}

async fn run_cmd(config: Config, scenario: Scenario, pretty: bool) -> anyhow::Result<()> {
    tally_tracing::init_tracer(config.tracing)?;

    let (clock, _ctrl) = sim_time::ClockHandle::from_config(&config.time);
    let balances = MemoryBalanceStore::with_clock(clock.clone());
    let transactions = MemoryTransactionStore::new();
    let ledger_config = TallyLedgerConfig::builder()
        .balance_store(balances.clone())
        .transaction_store(transactions)
        .asset_scales(config.ledger.asset_scales)
        .clock(clock)
        .build()?;
    let ledger = TallyLedger::init(ledger_config);

    let report = ScenarioRunner::new(ledger, balances).run(scenario).await?;
    let output = if pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .context("Couldn't serialize report")?;
    println!("{output}");
    Ok(())
}
