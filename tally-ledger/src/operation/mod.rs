pub mod error;
mod replay;

use tracing::instrument;

use std::sync::Arc;

use sim_time::ClockHandle;
pub use tally_types::operation::*;
use tally_types::{primitives::*, status::TransactionStatus, transaction::TransactionValues};

use crate::{balance::AppliedLeg, transaction::TransactionStore};

use error::OperationError;
pub use replay::*;

/// The append-only record of every leg applied to a balance.
#[derive(Clone)]
pub struct Operations {
    store: Arc<dyn TransactionStore>,
    clock: ClockHandle,
}

impl Operations {
    pub(crate) fn new(store: Arc<dyn TransactionStore>, clock: ClockHandle) -> Self {
        Self { store, clock }
    }

    /// Writes one operation per applied leg, in the order the legs were applied.
    #[instrument(
        name = "tally_ledger.operation.record",
        skip(self, transaction, applied),
        fields(transaction_id = %transaction.id, count = applied.len()),
        err
    )]
    pub async fn record(
        &self,
        transaction: &TransactionValues,
        applied: &[AppliedLeg],
        status: TransactionStatus,
    ) -> Result<Vec<OperationValues>, OperationError> {
        let created_at = self.clock.now();
        let operations: Vec<_> = applied
            .iter()
            .map(|applied| OperationValues {
                id: OperationId::new(),
                transaction_id: transaction.id,
                account: applied.leg.account.clone(),
                account_id: applied.balance.account_id,
                balance_id: applied.balance.id,
                balance_key: applied.balance.key.clone(),
                asset: applied.balance.asset.clone(),
                operation_type: applied.operation_type,
                amount: applied.leg.amount,
                before: applied.before,
                after: applied.after,
                status,
                chart_of_accounts: applied.leg.chart_of_accounts.clone(),
                description: applied
                    .leg
                    .description
                    .clone()
                    .or_else(|| transaction.description.clone()),
                metadata: applied.leg.metadata.clone(),
                route: applied.leg.route.clone(),
                created_at,
                deleted_at: None,
            })
            .collect();
        self.store.append_operations(&operations).await?;
        Ok(operations)
    }

    #[instrument(name = "tally_ledger.operation.list_for_transaction", skip(self), err)]
    pub async fn list_for_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Vec<OperationValues>, OperationError> {
        Ok(self.store.list_operations(transaction_id).await?)
    }

    #[instrument(name = "tally_ledger.operation.list_for_balance", skip(self), err)]
    pub async fn list_for_balance(
        &self,
        balance_id: BalanceId,
    ) -> Result<Vec<OperationValues>, OperationError> {
        Ok(self.store.list_operations_for_balance(balance_id).await?)
    }
}
