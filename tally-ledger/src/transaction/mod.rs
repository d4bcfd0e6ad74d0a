mod entity;
pub mod error;
mod memory;
mod store;

use tracing::instrument;

use std::sync::Arc;

use sim_time::ClockHandle;
use tally_types::primitives::*;
pub use tally_types::{status::*, transaction::*};

use crate::Idempotent;

pub use entity::*;
use error::TransactionError;
pub use memory::MemoryTransactionStore;
pub use store::TransactionStore;

/// Transaction records and the two status machines that drive them.
#[derive(Clone)]
pub struct Transactions {
    store: Arc<dyn TransactionStore>,
    clock: ClockHandle,
}

impl Transactions {
    pub(crate) fn new(store: Arc<dyn TransactionStore>, clock: ClockHandle) -> Self {
        Self { store, clock }
    }

    /// Reserves the idempotency key by recording the transaction as `CREATED`.
    ///
    /// A live transaction holding the same key is returned as `Ignored`, also when
    /// the key was taken by a concurrent caller between lookup and insert.
    #[instrument(
        name = "tally_ledger.transaction.create",
        skip(self, new_transaction),
        fields(
            transaction_id = %new_transaction.id(),
            idempotency_key = new_transaction.idempotency_key()
        ),
        err
    )]
    pub(crate) async fn create(
        &self,
        new_transaction: NewTransaction,
    ) -> Result<Idempotent<TransactionValues>, TransactionError> {
        let key = new_transaction.idempotency_key().to_string();
        if let Some(existing) = self.store.find_by_idempotency_key(&key).await? {
            return Ok(Idempotent::Ignored(existing));
        }
        match self
            .store
            .create(new_transaction.into_values(self.clock.now()))
            .await
        {
            Ok(created) => Ok(Idempotent::Executed(created)),
            Err(TransactionError::Duplicate(_)) => {
                match self.store.find_by_idempotency_key(&key).await? {
                    Some(existing) => Ok(Idempotent::Ignored(existing)),
                    None => Err(TransactionError::Duplicate(key)),
                }
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(name = "tally_ledger.transaction.find_by_id", skip(self), err)]
    pub async fn find_by_id(
        &self,
        id: TransactionId,
    ) -> Result<TransactionValues, TransactionError> {
        self.store.find_by_id(id).await
    }

    #[instrument(name = "tally_ledger.transaction.find_by_idempotency_key", skip(self), err)]
    pub async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<TransactionValues>, TransactionError> {
        self.store.find_by_idempotency_key(key).await
    }

    #[instrument(name = "tally_ledger.transaction.find_reversal", skip(self), err)]
    pub async fn find_reversal(
        &self,
        id: TransactionId,
    ) -> Result<Option<TransactionValues>, TransactionError> {
        self.store.find_child(id).await
    }

    /// Moves a transaction along its lifecycle. Anything outside the table, including
    /// repeating the current status, is rejected.
    #[instrument(name = "tally_ledger.transaction.transition", skip(self), err)]
    pub async fn transition(
        &self,
        id: TransactionId,
        to: TransactionStatus,
    ) -> Result<TransactionValues, TransactionError> {
        let current = self.store.find_by_id(id).await?;
        current.status.transition_to(to)?;
        self.store
            .update_status(id, current.status, to, self.clock.now())
            .await
    }

    /// Records where the deferred balance write of a transaction ended up.
    ///
    /// Deliveries may repeat or arrive out of order: once the status left `PENDING`
    /// further requests are `Ignored` and the record is left as it is.
    #[instrument(name = "tally_ledger.transaction.update_balance_status", skip(self), err)]
    pub async fn update_balance_status(
        &self,
        id: TransactionId,
        status: BalanceStatus,
    ) -> Result<Idempotent<TransactionValues>, TransactionError> {
        let res = self
            .store
            .update_balance_status(id, status, self.clock.now())
            .await?;
        if res.was_ignored() {
            tracing::debug!(%id, %status, "balance status update ignored");
        }
        Ok(res)
    }

    /// Puts the status back after a claimed transition could not be carried out.
    /// Bypasses the lifecycle table and only applies while the status is still `from`.
    #[instrument(name = "tally_ledger.transaction.restore_status", skip(self), err)]
    pub(crate) async fn restore_status(
        &self,
        id: TransactionId,
        from: TransactionStatus,
        to: TransactionStatus,
    ) -> Result<TransactionValues, TransactionError> {
        self.store
            .update_status(id, from, to, self.clock.now())
            .await
    }

    #[instrument(name = "tally_ledger.transaction.soft_delete", skip(self), err)]
    pub(crate) async fn soft_delete(&self, id: TransactionId) -> Result<(), TransactionError> {
        self.store.soft_delete(id, self.clock.now()).await
    }
}
