use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tally_types::{
    operation::OperationValues,
    primitives::*,
    status::{BalanceStatus, TransactionStatus},
    transaction::TransactionValues,
};

use super::error::TransactionError;
use crate::Idempotent;

/// Where transactions and their operations live.
///
/// Soft-deleted transactions are invisible to every lookup and do not hold on to
/// their idempotency key.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Fails with `Duplicate` when the id or the idempotency key is taken.
    async fn create(
        &self,
        transaction: TransactionValues,
    ) -> Result<TransactionValues, TransactionError>;

    async fn find_by_id(&self, id: TransactionId) -> Result<TransactionValues, TransactionError>;

    async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<TransactionValues>, TransactionError>;

    /// The reversal of `parent`, if one was posted.
    async fn find_child(
        &self,
        parent: TransactionId,
    ) -> Result<Option<TransactionValues>, TransactionError>;

    /// Moves the status only while it is still `expected`, otherwise `StatusChanged`.
    async fn update_status(
        &self,
        id: TransactionId,
        expected: TransactionStatus,
        next: TransactionStatus,
        at: DateTime<Utc>,
    ) -> Result<TransactionValues, TransactionError>;

    /// Applies [`BalanceStatus::transition`] against the stored status. A request the
    /// rule ignores leaves the record untouched and returns it as `Ignored`.
    async fn update_balance_status(
        &self,
        id: TransactionId,
        status: BalanceStatus,
        at: DateTime<Utc>,
    ) -> Result<Idempotent<TransactionValues>, TransactionError>;

    async fn soft_delete(&self, id: TransactionId, at: DateTime<Utc>)
        -> Result<(), TransactionError>;

    async fn append_operations(
        &self,
        operations: &[OperationValues],
    ) -> Result<(), TransactionError>;

    /// Operations of one transaction in the order they were appended.
    async fn list_operations(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Vec<OperationValues>, TransactionError>;

    /// Operations of one balance in the order they were appended.
    async fn list_operations_for_balance(
        &self,
        balance_id: BalanceId,
    ) -> Result<Vec<OperationValues>, TransactionError>;
}
