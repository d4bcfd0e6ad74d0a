#![allow(dead_code)]

use rand::distr::{Alphanumeric, SampleString};
use rust_decimal::Decimal;

use sim_time::{ArtificialClockConfig, ClockController, ClockHandle};
use tally_ledger::{
    balance::{BalanceValues, MemoryBalanceStore, NewBalance},
    dsl::{FromTo, Transfer},
    primitives::*,
    transaction::MemoryTransactionStore,
    AssetScales, TallyLedger, TallyLedgerConfig,
};

pub struct TestLedger {
    pub ledger: TallyLedger,
    pub balances: MemoryBalanceStore,
    pub transactions: MemoryTransactionStore,
    pub clock_ctrl: ClockController,
}

pub fn usd() -> AssetCode {
    "USD".parse().unwrap()
}

pub fn eur() -> AssetCode {
    "EUR".parse().unwrap()
}

pub fn test_ledger() -> TestLedger {
    let (clock, clock_ctrl) = ClockHandle::artificial(ArtificialClockConfig::manual());
    let balances = MemoryBalanceStore::with_clock(clock.clone());
    let transactions = MemoryTransactionStore::new();
    let config = TallyLedgerConfig::builder()
        .balance_store(balances.clone())
        .transaction_store(transactions.clone())
        .asset_scales(
            AssetScales::new()
                .with_scale(usd(), 2)
                .with_scale(eur(), 2),
        )
        .clock(clock)
        .build()
        .unwrap();
    TestLedger {
        ledger: TallyLedger::init(config),
        balances,
        transactions,
        clock_ctrl,
    }
}

pub fn random_alias() -> AccountRef {
    let code = Alphanumeric.sample_string(&mut rand::rng(), 16);
    AccountRef::named(format!("@{code}")).unwrap()
}

pub async fn funded_account(
    test: &TestLedger,
    asset: AssetCode,
    available: Decimal,
) -> anyhow::Result<BalanceValues> {
    let balance = test
        .balances
        .create(
            NewBalance::builder()
                .account(random_alias())
                .asset(asset)
                .available(available)
                .build()?,
        )
        .await?;
    Ok(balance)
}

pub fn transfer(
    from: &BalanceValues,
    to: &BalanceValues,
    value: Decimal,
) -> Transfer {
    Transfer::new(from.asset.clone(), value)
        .with_source(FromTo::amount(from.account.clone(), value))
        .with_destination(FromTo::amount(to.account.clone(), value))
}
