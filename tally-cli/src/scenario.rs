//! Scripted runs against an in-memory ledger.
//!
//! A scenario opens a set of balances and then runs its steps in order. Failing steps
//! are reported next to the successful ones and do not stop the run.

use anyhow::Context;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use std::{collections::HashMap, path::Path};

use tally_ledger::{
    balance::{BalanceValues, MemoryBalanceStore, NewBalance},
    dsl::{InflowInput, OutflowInput, TransactionInput},
    error::{ErrorKind, LedgerError},
    primitives::*,
    transaction::TransactionValues,
    Idempotent, TallyLedger,
};

#[derive(Debug, Clone, Deserialize)]
pub struct SeedBalance {
    pub account: AccountRef,
    #[serde(default)]
    pub key: BalanceKey,
    pub asset: AssetCode,
    #[serde(default)]
    pub available: Decimal,
    #[serde(default)]
    pub on_hold: Decimal,
    #[serde(default = "allowed")]
    pub allow_sending: bool,
    #[serde(default = "allowed")]
    pub allow_receiving: bool,
}

fn allowed() -> bool {
    true
}

/// One request. Steps that create a transaction may carry a `label` that later steps
/// use as their `target`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Post {
        label: Option<String>,
        request: TransactionInput,
    },
    Inflow {
        label: Option<String>,
        request: InflowInput,
    },
    Outflow {
        label: Option<String>,
        request: OutflowInput,
    },
    Note {
        label: Option<String>,
        request: TransactionInput,
    },
    Enqueue {
        label: Option<String>,
        request: TransactionInput,
    },
    Persist {
        target: String,
    },
    Commit {
        target: String,
    },
    Cancel {
        target: String,
    },
    Revert {
        label: Option<String>,
        target: String,
    },
}

impl Step {
    fn action(&self) -> &'static str {
        match self {
            Step::Post { .. } => "post",
            Step::Inflow { .. } => "inflow",
            Step::Outflow { .. } => "outflow",
            Step::Note { .. } => "note",
            Step::Enqueue { .. } => "enqueue",
            Step::Persist { .. } => "persist",
            Step::Commit { .. } => "commit",
            Step::Cancel { .. } => "cancel",
            Step::Revert { .. } => "revert",
        }
    }

    fn label(&self) -> Option<&str> {
        match self {
            Step::Post { label, .. }
            | Step::Inflow { label, .. }
            | Step::Outflow { label, .. }
            | Step::Note { label, .. }
            | Step::Enqueue { label, .. }
            | Step::Revert { label, .. } => label.as_deref(),
            Step::Persist { .. } | Step::Commit { .. } | Step::Cancel { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub balances: Vec<SeedBalance>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let file = std::fs::read_to_string(path).context("Couldn't read scenario file")?;
        Self::parse(&file)
    }

    pub fn parse(yaml: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(yaml).context("Couldn't parse scenario file")
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    Executed { transaction: TransactionValues },
    Ignored { transaction: TransactionValues },
    Failed { kind: ErrorKind, error: String },
}

impl From<Result<Idempotent<TransactionValues>, LedgerError>> for Outcome {
    fn from(res: Result<Idempotent<TransactionValues>, LedgerError>) -> Self {
        match res {
            Ok(Idempotent::Executed(transaction)) => Outcome::Executed { transaction },
            Ok(Idempotent::Ignored(transaction)) => Outcome::Ignored { transaction },
            Err(e) => Outcome::Failed {
                kind: e.kind(),
                error: e.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub steps: Vec<StepReport>,
    pub balances: Vec<BalanceValues>,
}

pub struct ScenarioRunner {
    ledger: TallyLedger,
    balances: MemoryBalanceStore,
    labels: HashMap<String, TransactionId>,
}

impl ScenarioRunner {
    pub fn new(ledger: TallyLedger, balances: MemoryBalanceStore) -> Self {
        Self {
            ledger,
            balances,
            labels: HashMap::new(),
        }
    }

    pub async fn run(mut self, scenario: Scenario) -> anyhow::Result<Report> {
        for seed in scenario.balances {
            let account = seed.account.clone();
            let new_balance = NewBalance::builder()
                .account(seed.account)
                .key(seed.key)
                .asset(seed.asset)
                .available(seed.available)
                .on_hold(seed.on_hold)
                .allow_sending(seed.allow_sending)
                .allow_receiving(seed.allow_receiving)
                .build()
                .with_context(|| format!("Invalid seed balance for {account}"))?;
            self.balances
                .create(new_balance)
                .await
                .with_context(|| format!("Couldn't open balance for {account}"))?;
        }

        let mut steps = Vec::with_capacity(scenario.steps.len());
        for (step, request) in scenario.steps.into_iter().enumerate() {
            let action = request.action();
            let label = request.label().map(str::to_string);
            let outcome = self.execute(request).await?;
            if let (
                Some(label),
                Outcome::Executed { transaction } | Outcome::Ignored { transaction },
            ) = (&label, &outcome)
            {
                self.labels.insert(label.clone(), transaction.id);
            }
            tracing::info!(step, action, "scenario step done");
            steps.push(StepReport {
                step,
                action,
                label,
                outcome,
            });
        }

        Ok(Report {
            steps,
            balances: self.balances.list().await,
        })
    }

    async fn execute(&self, step: Step) -> anyhow::Result<Outcome> {
        let outcome: Outcome = match step {
            Step::Post { request, .. } => self.ledger.post_transaction(request).await.into(),
            Step::Inflow { request, .. } => self.ledger.post_inflow(request).await.into(),
            Step::Outflow { request, .. } => self.ledger.post_outflow(request).await.into(),
            Step::Note { request, .. } => self.ledger.note_transaction(request).await.into(),
            Step::Enqueue { request, .. } => {
                self.ledger.enqueue_transaction(request).await.into()
            }
            Step::Persist { target } => {
                let id = self.resolve(&target)?;
                self.ledger.persist_balances(id).await.into()
            }
            Step::Commit { target } => {
                let id = self.resolve(&target)?;
                self.ledger
                    .commit_transaction(id)
                    .await
                    .map(Idempotent::Executed)
                    .into()
            }
            Step::Cancel { target } => {
                let id = self.resolve(&target)?;
                self.ledger
                    .cancel_transaction(id)
                    .await
                    .map(Idempotent::Executed)
                    .into()
            }
            Step::Revert { target, .. } => {
                let id = self.resolve(&target)?;
                self.ledger
                    .revert_transaction(id)
                    .await
                    .map(Idempotent::Executed)
                    .into()
            }
        };
        Ok(outcome)
    }

    fn resolve(&self, target: &str) -> anyhow::Result<TransactionId> {
        self.labels
            .get(target)
            .copied()
            .with_context(|| format!("No transaction labelled '{target}'"))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use sim_time::{ArtificialClockConfig, ClockHandle};
    use tally_ledger::{transaction::MemoryTransactionStore, AssetScales, TallyLedgerConfig};

    use super::*;

    const SCENARIO: &str = r#"
balances:
  - account: "@alice"
    asset: USD
    available: "100.00"
  - account: "@bob"
    asset: USD
steps:
  - post:
      label: rent
      request:
        pending: true
        send:
          asset: USD
          value: "30.00"
          source:
            from:
              - account: "@alice"
                allocation: remaining
          distribute:
            to:
              - account: "@bob"
                allocation:
                  amount: "30.00"
  - commit:
      target: rent
  - revert:
      target: rent
  - cancel:
      target: rent
"#;

    fn runner() -> (ScenarioRunner, MemoryBalanceStore) {
        let (clock, _) = ClockHandle::artificial(ArtificialClockConfig::manual());
        let balances = MemoryBalanceStore::with_clock(clock.clone());
        let config = TallyLedgerConfig::builder()
            .balance_store(balances.clone())
            .transaction_store(MemoryTransactionStore::new())
            .asset_scales(AssetScales::new().with_scale("USD".parse().unwrap(), 2))
            .clock(clock)
            .build()
            .unwrap();
        (
            ScenarioRunner::new(TallyLedger::init(config), balances.clone()),
            balances,
        )
    }

    #[tokio::test]
    async fn runs_every_step_in_order() -> anyhow::Result<()> {
        let (runner, _) = runner();
        let report = runner.run(Scenario::parse(SCENARIO)?).await?;

        let results: Vec<_> = report
            .steps
            .iter()
            .map(|s| match &s.outcome {
                Outcome::Executed { .. } => "executed",
                Outcome::Ignored { .. } => "ignored",
                Outcome::Failed { .. } => "failed",
            })
            .collect();
        assert_eq!(results, vec!["executed", "executed", "executed", "failed"]);

        let alice = report
            .balances
            .iter()
            .find(|b| b.account.to_string() == "@alice")
            .expect("alice is seeded");
        assert_eq!(alice.available, dec!(100.00));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_target_aborts_the_run() -> anyhow::Result<()> {
        let (runner, _) = runner();
        let scenario = Scenario::parse("steps:\n  - commit:\n      target: nope\n")?;
        assert!(runner.run(scenario).await.is_err());
        Ok(())
    }
}
