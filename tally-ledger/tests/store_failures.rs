mod helpers;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal_macros::dec;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use sim_time::{ArtificialClockConfig, ClockHandle};
use tally_ledger::{
    balance::{BalanceValues, MemoryBalanceStore, NewBalance},
    dsl::TransactionInput,
    error::ErrorKind,
    operation::{verify_history, OperationValues},
    primitives::*,
    transaction::{
        error::TransactionError, MemoryTransactionStore, TransactionStore, TransactionValues,
    },
    AssetScales, BalanceStatus, Idempotent, TallyLedger, TallyLedgerConfig, TransactionStatus,
};

/// Memory store whose operation appends fail while `full` is set and whose balance
/// status writes fail while `status_down` is set.
#[derive(Clone)]
struct DiskFull {
    inner: MemoryTransactionStore,
    full: Arc<AtomicBool>,
    status_down: Arc<AtomicBool>,
}

#[async_trait]
impl TransactionStore for DiskFull {
    async fn create(
        &self,
        transaction: TransactionValues,
    ) -> Result<TransactionValues, TransactionError> {
        self.inner.create(transaction).await
    }

    async fn find_by_id(&self, id: TransactionId) -> Result<TransactionValues, TransactionError> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<TransactionValues>, TransactionError> {
        self.inner.find_by_idempotency_key(key).await
    }

    async fn find_child(
        &self,
        parent: TransactionId,
    ) -> Result<Option<TransactionValues>, TransactionError> {
        self.inner.find_child(parent).await
    }

    async fn update_status(
        &self,
        id: TransactionId,
        expected: TransactionStatus,
        next: TransactionStatus,
        at: DateTime<Utc>,
    ) -> Result<TransactionValues, TransactionError> {
        self.inner.update_status(id, expected, next, at).await
    }

    async fn update_balance_status(
        &self,
        id: TransactionId,
        status: BalanceStatus,
        at: DateTime<Utc>,
    ) -> Result<Idempotent<TransactionValues>, TransactionError> {
        if self.status_down.load(Ordering::SeqCst) {
            return Err(TransactionError::Store("timeout".to_string()));
        }
        self.inner.update_balance_status(id, status, at).await
    }

    async fn soft_delete(
        &self,
        id: TransactionId,
        at: DateTime<Utc>,
    ) -> Result<(), TransactionError> {
        self.inner.soft_delete(id, at).await
    }

    async fn append_operations(
        &self,
        operations: &[OperationValues],
    ) -> Result<(), TransactionError> {
        if self.full.load(Ordering::SeqCst) {
            return Err(TransactionError::Store("disk full".to_string()));
        }
        self.inner.append_operations(operations).await
    }

    async fn list_operations(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Vec<OperationValues>, TransactionError> {
        self.inner.list_operations(transaction_id).await
    }

    async fn list_operations_for_balance(
        &self,
        balance_id: BalanceId,
    ) -> Result<Vec<OperationValues>, TransactionError> {
        self.inner.list_operations_for_balance(balance_id).await
    }
}

struct FlakyLedger {
    ledger: TallyLedger,
    balances: MemoryBalanceStore,
    transactions: MemoryTransactionStore,
    full: Arc<AtomicBool>,
    status_down: Arc<AtomicBool>,
}

impl FlakyLedger {
    fn new() -> Self {
        let (clock, _) = ClockHandle::artificial(ArtificialClockConfig::manual());
        let balances = MemoryBalanceStore::with_clock(clock.clone());
        let transactions = MemoryTransactionStore::new();
        let full = Arc::new(AtomicBool::new(false));
        let status_down = Arc::new(AtomicBool::new(false));
        let config = TallyLedgerConfig::builder()
            .balance_store(balances.clone())
            .transaction_store(DiskFull {
                inner: transactions.clone(),
                full: full.clone(),
                status_down: status_down.clone(),
            })
            .asset_scales(AssetScales::new().with_scale(helpers::usd(), 2))
            .clock(clock)
            .build()
            .unwrap();
        Self {
            ledger: TallyLedger::init(config),
            balances,
            transactions,
            full,
            status_down,
        }
    }

    fn disk_full(&self, full: bool) {
        self.full.store(full, Ordering::SeqCst);
    }

    async fn account(&self, available: rust_decimal::Decimal) -> anyhow::Result<BalanceValues> {
        let balance = self
            .balances
            .create(
                NewBalance::builder()
                    .account(helpers::random_alias())
                    .asset(helpers::usd())
                    .available(available)
                    .build()?,
            )
            .await?;
        Ok(balance)
    }
}

#[tokio::test]
async fn unrecorded_post_is_taken_back() -> anyhow::Result<()> {
    let test = FlakyLedger::new();
    let a = test.account(dec!(100)).await?;
    let b = test.account(dec!(0)).await?;
    let input =
        TransactionInput::new(helpers::transfer(&a, &b, dec!(30))).with_idempotency_key("pay-7");

    test.disk_full(true);
    let err = test
        .ledger
        .post_transaction(input.clone())
        .await
        .expect_err("operations cannot be appended");
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert!(!err.is_retryable());

    let balances = test.ledger.balances();
    assert_eq!(balances.find_by_id(a.id).await?.available, dec!(100));
    assert_eq!(balances.find_by_id(b.id).await?.available, dec!(0));
    assert_eq!(balances.find_by_id(a.id).await?.version, 3);
    assert!(test.transactions.list().await.is_empty());

    test.disk_full(false);
    let retried = test.ledger.post_transaction(input).await?;
    assert!(retried.did_execute());
    assert_eq!(balances.find_by_id(a.id).await?.available, dec!(70));
    assert_eq!(balances.find_by_id(b.id).await?.available, dec!(30));

    let history = test.ledger.operations().list_for_balance(a.id).await?;
    assert_eq!(history.len(), 1);
    verify_history(&history)?;
    Ok(())
}

#[tokio::test]
async fn unrecorded_commit_keeps_the_hold() -> anyhow::Result<()> {
    let test = FlakyLedger::new();
    let a = test.account(dec!(100)).await?;
    let b = test.account(dec!(0)).await?;
    let pending = test
        .ledger
        .post_transaction(TransactionInput::new(helpers::transfer(&a, &b, dec!(30))).pending())
        .await?
        .into_inner();

    test.disk_full(true);
    let err = test
        .ledger
        .commit_transaction(pending.id)
        .await
        .expect_err("operations cannot be appended");
    assert_eq!(err.kind(), ErrorKind::Storage);

    let balances = test.ledger.balances();
    let a_after = balances.find_by_id(a.id).await?;
    assert_eq!((a_after.available, a_after.on_hold), (dec!(70), dec!(30)));
    assert_eq!(balances.find_by_id(b.id).await?.available, dec!(0));
    assert_eq!(
        test.ledger.find_transaction(pending.id).await?.status,
        TransactionStatus::Pending
    );

    test.disk_full(false);
    let committed = test.ledger.commit_transaction(pending.id).await?;
    assert_eq!(committed.status, TransactionStatus::Approved);
    let a_after = balances.find_by_id(a.id).await?;
    assert_eq!((a_after.available, a_after.on_hold), (dec!(70), dec!(0)));
    assert_eq!(balances.find_by_id(b.id).await?.available, dec!(30));
    Ok(())
}

#[tokio::test]
async fn unrecorded_persist_stays_queued() -> anyhow::Result<()> {
    let test = FlakyLedger::new();
    let a = test.account(dec!(100)).await?;
    let b = test.account(dec!(0)).await?;
    let queued = test
        .ledger
        .enqueue_transaction(TransactionInput::new(helpers::transfer(&a, &b, dec!(30))))
        .await?
        .into_inner();

    test.disk_full(true);
    let err = test
        .ledger
        .persist_balances(queued.id)
        .await
        .expect_err("operations cannot be appended");
    assert_eq!(err.kind(), ErrorKind::Storage);

    let still_queued = test.ledger.find_transaction(queued.id).await?;
    assert_eq!(still_queued.status, TransactionStatus::Created);
    assert_eq!(still_queued.balance_status, Some(BalanceStatus::Pending));
    let balances = test.ledger.balances();
    assert_eq!(balances.find_by_id(a.id).await?.available, dec!(100));
    assert_eq!(balances.find_by_id(b.id).await?.available, dec!(0));

    test.disk_full(false);
    let persisted = test.ledger.persist_balances(queued.id).await?.into_inner();
    assert_eq!(persisted.balance_status, Some(BalanceStatus::Confirmed));
    assert_eq!(balances.find_by_id(b.id).await?.available, dec!(30));
    Ok(())
}

#[tokio::test]
async fn next_delivery_confirms_recorded_balances() -> anyhow::Result<()> {
    let test = FlakyLedger::new();
    let a = test.account(dec!(100)).await?;
    let b = test.account(dec!(0)).await?;
    let queued = test
        .ledger
        .enqueue_transaction(TransactionInput::new(helpers::transfer(&a, &b, dec!(30))))
        .await?
        .into_inner();

    test.status_down.store(true, Ordering::SeqCst);
    let err = test
        .ledger
        .persist_balances(queued.id)
        .await
        .expect_err("balance status cannot be written");
    assert_eq!(err.kind(), ErrorKind::Storage);
    let stuck = test.ledger.find_transaction(queued.id).await?;
    assert_eq!(stuck.status, TransactionStatus::Approved);
    assert_eq!(stuck.balance_status, Some(BalanceStatus::Pending));

    test.status_down.store(false, Ordering::SeqCst);
    let confirmed = test.ledger.persist_balances(queued.id).await?;
    assert!(confirmed.did_execute());
    assert_eq!(
        confirmed.value().balance_status,
        Some(BalanceStatus::Confirmed)
    );
    assert_eq!(
        test.ledger.balances().find_by_id(b.id).await?.available,
        dec!(30)
    );
    assert_eq!(test.ledger.operations_for(queued.id).await?.len(), 2);
    assert!(test.ledger.persist_balances(queued.id).await?.was_ignored());
    Ok(())
}
