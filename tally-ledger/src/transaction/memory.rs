use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use std::{collections::HashMap, sync::Arc};

use tally_types::{
    operation::OperationValues,
    primitives::*,
    status::{BalanceStatus, BalanceStatusTransition, TransactionStatus},
    transaction::TransactionValues,
};

use super::{error::TransactionError, store::TransactionStore};
use crate::Idempotent;

#[derive(Default)]
struct Inner {
    transactions: HashMap<TransactionId, TransactionValues>,
    operations: Vec<OperationValues>,
}

impl Inner {
    fn live(&self, id: TransactionId) -> Result<&TransactionValues, TransactionError> {
        self.transactions
            .get(&id)
            .filter(|tx| !tx.is_deleted())
            .ok_or(TransactionError::NotFound(id))
    }

    fn live_mut(&mut self, id: TransactionId) -> Result<&mut TransactionValues, TransactionError> {
        self.transactions
            .get_mut(&id)
            .filter(|tx| !tx.is_deleted())
            .ok_or(TransactionError::NotFound(id))
    }
}

/// Transactions and operations held in process memory.
#[derive(Clone, Default)]
pub struct MemoryTransactionStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn list(&self) -> Vec<TransactionValues> {
        let inner = self.inner.read().await;
        let mut transactions: Vec<_> = inner
            .transactions
            .values()
            .filter(|tx| !tx.is_deleted())
            .cloned()
            .collect();
        transactions.sort_by(|a, b| a.id.cmp(&b.id));
        transactions
    }
}

#[async_trait]
impl TransactionStore for MemoryTransactionStore {
    async fn create(
        &self,
        transaction: TransactionValues,
    ) -> Result<TransactionValues, TransactionError> {
        let mut inner = self.inner.write().await;
        let key_taken = inner
            .transactions
            .values()
            .any(|tx| !tx.is_deleted() && tx.idempotency_key == transaction.idempotency_key);
        if key_taken || inner.transactions.contains_key(&transaction.id) {
            return Err(TransactionError::Duplicate(transaction.idempotency_key));
        }
        inner.transactions.insert(transaction.id, transaction.clone());
        Ok(transaction)
    }

    async fn find_by_id(&self, id: TransactionId) -> Result<TransactionValues, TransactionError> {
        self.inner.read().await.live(id).cloned()
    }

    async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<TransactionValues>, TransactionError> {
        Ok(self
            .inner
            .read()
            .await
            .transactions
            .values()
            .find(|tx| !tx.is_deleted() && tx.idempotency_key == key)
            .cloned())
    }

    async fn find_child(
        &self,
        parent: TransactionId,
    ) -> Result<Option<TransactionValues>, TransactionError> {
        Ok(self
            .inner
            .read()
            .await
            .transactions
            .values()
            .find(|tx| !tx.is_deleted() && tx.parent_transaction_id == Some(parent))
            .cloned())
    }

    async fn update_status(
        &self,
        id: TransactionId,
        expected: TransactionStatus,
        next: TransactionStatus,
        at: DateTime<Utc>,
    ) -> Result<TransactionValues, TransactionError> {
        let mut inner = self.inner.write().await;
        let transaction = inner.live_mut(id)?;
        if transaction.status != expected {
            return Err(TransactionError::StatusChanged { id, expected });
        }
        transaction.status = next;
        transaction.updated_at = at;
        Ok(transaction.clone())
    }

    async fn update_balance_status(
        &self,
        id: TransactionId,
        status: BalanceStatus,
        at: DateTime<Utc>,
    ) -> Result<Idempotent<TransactionValues>, TransactionError> {
        let mut inner = self.inner.write().await;
        let transaction = inner.live_mut(id)?;
        match BalanceStatus::transition(transaction.balance_status, status) {
            BalanceStatusTransition::Apply(next) => {
                transaction.balance_status = Some(next);
                transaction.balance_persisted_at = Some(at);
                transaction.updated_at = at;
                Ok(Idempotent::Executed(transaction.clone()))
            }
            BalanceStatusTransition::NoOp => Ok(Idempotent::Ignored(transaction.clone())),
        }
    }

    async fn soft_delete(
        &self,
        id: TransactionId,
        at: DateTime<Utc>,
    ) -> Result<(), TransactionError> {
        let mut inner = self.inner.write().await;
        inner.live_mut(id)?.deleted_at = Some(at);
        for op in inner
            .operations
            .iter_mut()
            .filter(|op| op.transaction_id == id)
        {
            op.deleted_at = Some(at);
        }
        Ok(())
    }

    async fn append_operations(
        &self,
        operations: &[OperationValues],
    ) -> Result<(), TransactionError> {
        let mut inner = self.inner.write().await;
        for op in operations {
            inner.live(op.transaction_id)?;
        }
        inner.operations.extend_from_slice(operations);
        Ok(())
    }

    async fn list_operations(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Vec<OperationValues>, TransactionError> {
        let inner = self.inner.read().await;
        inner.live(transaction_id)?;
        Ok(inner
            .operations
            .iter()
            .filter(|op| op.transaction_id == transaction_id && op.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn list_operations_for_balance(
        &self,
        balance_id: BalanceId,
    ) -> Result<Vec<OperationValues>, TransactionError> {
        Ok(self
            .inner
            .read()
            .await
            .operations
            .iter()
            .filter(|op| op.balance_id == balance_id && op.deleted_at.is_none())
            .cloned()
            .collect())
    }
}
