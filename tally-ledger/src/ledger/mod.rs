pub mod config;
pub mod error;

use tokio_util::sync::CancellationToken;
use tracing::instrument;

use std::sync::Arc;

use tally_types::{metadata::Metadata, primitives::*};

pub use config::*;
use error::*;

use crate::{
    balance::{AppliedLeg, ApplyMode, Balances},
    dsl::{
        expand_inflow, expand_outflow, Dsl, DslError, InflowInput, OutflowInput, PreparedLegs,
        TransactionInput, Transfer,
    },
    operation::{OperationValues, Operations},
    transaction::{
        error::TransactionError, BalanceStatus, InvalidStatusTransition, NewTransaction,
        TransactionStatus, TransactionValues, Transactions,
    },
    Idempotent,
};

/// Request fields shared by every kind of posting.
struct Envelope {
    description: Option<String>,
    chart_of_accounts_group_name: Option<String>,
    idempotency_key: Option<String>,
    metadata: Metadata,
}

#[derive(Clone)]
pub struct TallyLedger {
    dsl: Arc<Dsl>,
    balances: Balances,
    transactions: Transactions,
    operations: Operations,
}

impl TallyLedger {
    pub fn init(config: TallyLedgerConfig) -> Self {
        let clock = config.clock;
        Self {
            dsl: Arc::new(Dsl::new(config.asset_scales)),
            balances: Balances::new(config.balance_store, config.notifier, clock.clone()),
            operations: Operations::new(config.transaction_store.clone(), clock.clone()),
            transactions: Transactions::new(config.transaction_store, clock),
        }
    }

    pub fn dsl(&self) -> &Dsl {
        &self.dsl
    }

    pub fn balances(&self) -> &Balances {
        &self.balances
    }

    pub fn transactions(&self) -> &Transactions {
        &self.transactions
    }

    pub fn operations(&self) -> &Operations {
        &self.operations
    }

    pub async fn post_transaction(
        &self,
        input: TransactionInput,
    ) -> Result<Idempotent<TransactionValues>, LedgerError> {
        self.post_transaction_in_ctx(input, &CancellationToken::new())
            .await
    }

    /// Validates the request, reserves its idempotency key and applies it.
    ///
    /// A request whose key is already taken is answered with the recorded transaction
    /// and has no further effect. When the balances cannot be applied the reservation
    /// is dropped so that the request can be retried under the same key.
    #[instrument(
        name = "tally_ledger.post_transaction",
        skip(self, input, cancel),
        fields(asset = %input.send.asset, pending = input.pending),
        err
    )]
    pub async fn post_transaction_in_ctx(
        &self,
        input: TransactionInput,
        cancel: &CancellationToken,
    ) -> Result<Idempotent<TransactionValues>, LedgerError> {
        let legs = self.dsl.build_full_transfer(&input.send)?;
        let envelope = Envelope {
            description: input.description,
            chart_of_accounts_group_name: input.chart_of_accounts_group_name,
            idempotency_key: input.idempotency_key,
            metadata: input.metadata,
        };
        self.execute(envelope, input.send, &legs, input.pending, cancel)
            .await
    }

    pub async fn post_inflow(
        &self,
        input: InflowInput,
    ) -> Result<Idempotent<TransactionValues>, LedgerError> {
        self.post_inflow_in_ctx(input, &CancellationToken::new())
            .await
    }

    #[instrument(
        name = "tally_ledger.post_inflow",
        skip(self, input, cancel),
        fields(asset = %input.send.asset),
        err
    )]
    pub async fn post_inflow_in_ctx(
        &self,
        input: InflowInput,
        cancel: &CancellationToken,
    ) -> Result<Idempotent<TransactionValues>, LedgerError> {
        let legs = self.dsl.build_inflow(&input.send)?;
        let envelope = Envelope {
            description: input.description,
            chart_of_accounts_group_name: input.chart_of_accounts_group_name,
            idempotency_key: input.idempotency_key,
            metadata: input.metadata,
        };
        self.execute(envelope, expand_inflow(&input.send), &legs, false, cancel)
            .await
    }

    pub async fn post_outflow(
        &self,
        input: OutflowInput,
    ) -> Result<Idempotent<TransactionValues>, LedgerError> {
        self.post_outflow_in_ctx(input, &CancellationToken::new())
            .await
    }

    #[instrument(
        name = "tally_ledger.post_outflow",
        skip(self, input, cancel),
        fields(asset = %input.send.asset, pending = input.pending),
        err
    )]
    pub async fn post_outflow_in_ctx(
        &self,
        input: OutflowInput,
        cancel: &CancellationToken,
    ) -> Result<Idempotent<TransactionValues>, LedgerError> {
        let legs = self.dsl.build_outflow(&input.send)?;
        let envelope = Envelope {
            description: input.description,
            chart_of_accounts_group_name: input.chart_of_accounts_group_name,
            idempotency_key: input.idempotency_key,
            metadata: input.metadata,
        };
        self.execute(
            envelope,
            expand_outflow(&input.send),
            &legs,
            input.pending,
            cancel,
        )
        .await
    }

    pub async fn commit_transaction(
        &self,
        id: TransactionId,
    ) -> Result<TransactionValues, LedgerError> {
        self.commit_transaction_in_ctx(id, &CancellationToken::new())
            .await
    }

    /// Settles the holds of a pending transaction and credits its destinations.
    #[instrument(name = "tally_ledger.commit_transaction", skip(self, cancel), err)]
    pub async fn commit_transaction_in_ctx(
        &self,
        id: TransactionId,
        cancel: &CancellationToken,
    ) -> Result<TransactionValues, LedgerError> {
        self.resolve_pending(id, TransactionStatus::Approved, ApplyMode::Commit, cancel)
            .await
    }

    pub async fn cancel_transaction(
        &self,
        id: TransactionId,
    ) -> Result<TransactionValues, LedgerError> {
        self.cancel_transaction_in_ctx(id, &CancellationToken::new())
            .await
    }

    /// Returns the holds of a pending transaction to its sources.
    #[instrument(name = "tally_ledger.cancel_transaction", skip(self, cancel), err)]
    pub async fn cancel_transaction_in_ctx(
        &self,
        id: TransactionId,
        cancel: &CancellationToken,
    ) -> Result<TransactionValues, LedgerError> {
        self.resolve_pending(id, TransactionStatus::Canceled, ApplyMode::Release, cancel)
            .await
    }

    pub async fn revert_transaction(
        &self,
        id: TransactionId,
    ) -> Result<TransactionValues, LedgerError> {
        self.revert_transaction_in_ctx(id, &CancellationToken::new())
            .await
    }

    /// Posts the mirror image of an approved transaction as its child.
    ///
    /// The reversal is keyed by its parent, so a transaction is reverted at most once
    /// even when several callers race for it.
    #[instrument(name = "tally_ledger.revert_transaction", skip(self, cancel), err)]
    pub async fn revert_transaction_in_ctx(
        &self,
        id: TransactionId,
        cancel: &CancellationToken,
    ) -> Result<TransactionValues, LedgerError> {
        let parent = self.transactions.find_by_id(id).await?;
        if parent.status != TransactionStatus::Approved {
            return Err(TransactionError::NotRevertible {
                id,
                status: parent.status,
            }
            .into());
        }
        if self.transactions.find_reversal(id).await?.is_some() {
            return Err(TransactionError::AlreadyReverted(id).into());
        }

        let operations = self.operations.list_for_transaction(id).await?;
        let reversal = Dsl::build_reversal(&parent, &operations)?;
        let legs = self.dsl.build_full_transfer(&reversal)?;

        let mut builder = NewTransaction::builder();
        builder
            .idempotency_key(reversal_key(id))
            .id(TransactionId::new())
            .parent_transaction_id(id)
            .asset(reversal.asset.clone())
            .amount(reversal.value)
            .description(format!("reversal of {id}"))
            .metadata(parent.metadata.clone())
            .body(reversal);
        if let Some(group) = parent.chart_of_accounts_group_name {
            builder.chart_of_accounts_group_name(group);
        }
        let new_transaction = builder
            .build()
            .expect("Couldn't build reversal transaction");

        match self
            .apply_reserved(new_transaction, &legs, false, cancel)
            .await?
        {
            Idempotent::Executed(reversal) => Ok(reversal),
            Idempotent::Ignored(_) => Err(TransactionError::AlreadyReverted(id).into()),
        }
    }

    /// Records a validated request as `NOTED` without touching any balance.
    #[instrument(
        name = "tally_ledger.note_transaction",
        skip(self, input),
        fields(asset = %input.send.asset),
        err
    )]
    pub async fn note_transaction(
        &self,
        input: TransactionInput,
    ) -> Result<Idempotent<TransactionValues>, LedgerError> {
        let legs = self.dsl.build_full_transfer(&input.send)?;
        let envelope = Envelope {
            description: input.description,
            chart_of_accounts_group_name: input.chart_of_accounts_group_name,
            idempotency_key: input.idempotency_key,
            metadata: input.metadata,
        };
        let new_transaction = self.new_transaction(envelope, input.send, &legs, None)?;
        let transaction = match self.transactions.create(new_transaction).await? {
            Idempotent::Ignored(existing) => return Ok(Idempotent::Ignored(existing)),
            Idempotent::Executed(transaction) => transaction,
        };
        let noted = self
            .transactions
            .transition(transaction.id, TransactionStatus::Noted)
            .await?;
        Ok(Idempotent::Executed(noted))
    }

    /// Records a request whose balance effect is applied later by
    /// [`persist_balances`](Self::persist_balances).
    #[instrument(
        name = "tally_ledger.enqueue_transaction",
        skip(self, input),
        fields(asset = %input.send.asset),
        err
    )]
    pub async fn enqueue_transaction(
        &self,
        input: TransactionInput,
    ) -> Result<Idempotent<TransactionValues>, LedgerError> {
        if input.pending {
            return Err(TransactionError::PendingNotDeferrable.into());
        }
        let legs = self.dsl.build_full_transfer(&input.send)?;
        let envelope = Envelope {
            description: input.description,
            chart_of_accounts_group_name: input.chart_of_accounts_group_name,
            idempotency_key: input.idempotency_key,
            metadata: input.metadata,
        };
        let new_transaction =
            self.new_transaction(envelope, input.send, &legs, Some(BalanceStatus::Pending))?;
        Ok(self.transactions.create(new_transaction).await?)
    }

    pub async fn persist_balances(
        &self,
        id: TransactionId,
    ) -> Result<Idempotent<TransactionValues>, LedgerError> {
        self.persist_balances_in_ctx(id, &CancellationToken::new())
            .await
    }

    /// Applies the balances of an enqueued transaction.
    ///
    /// Safe to call for repeated deliveries: only the first one that finds the
    /// balance status `PENDING` does any work. A business failure marks the
    /// transaction `FAILED` and cancels it; transient failures leave it pending for
    /// the next delivery and are returned. A delivery that finds the balances applied
    /// and recorded but not yet confirmed only confirms them.
    #[instrument(name = "tally_ledger.persist_balances", skip(self, cancel), err)]
    pub async fn persist_balances_in_ctx(
        &self,
        id: TransactionId,
        cancel: &CancellationToken,
    ) -> Result<Idempotent<TransactionValues>, LedgerError> {
        let transaction = self.transactions.find_by_id(id).await?;
        if transaction.balance_status != Some(BalanceStatus::Pending) {
            return Ok(Idempotent::Ignored(transaction));
        }
        if transaction.status == TransactionStatus::Approved {
            // applied and recorded by an earlier delivery that could not confirm
            if self.operations.list_for_transaction(id).await?.is_empty() {
                return Ok(Idempotent::Ignored(transaction));
            }
            return Ok(self
                .transactions
                .update_balance_status(id, BalanceStatus::Confirmed)
                .await?);
        }
        if transaction.status != TransactionStatus::Created {
            return Ok(Idempotent::Ignored(transaction));
        }
        let Some(body) = transaction.body.clone() else {
            return Err(TransactionError::MissingBody(id).into());
        };

        let claimed = match self
            .transactions
            .transition(id, TransactionStatus::Approved)
            .await
        {
            Ok(claimed) => claimed,
            Err(
                TransactionError::StatusChanged { .. }
                | TransactionError::InvalidStatusTransition(_),
            ) => return Ok(Idempotent::Ignored(self.transactions.find_by_id(id).await?)),
            Err(e) => return Err(e.into()),
        };

        let applied = match self.dsl.build_full_transfer(&body) {
            Ok(legs) => self
                .balances
                .apply(&legs, ApplyMode::Settle, cancel)
                .await
                .map_err(LedgerError::from),
            Err(e) => Err(e.into()),
        };
        let applied = match applied {
            Ok(applied) => applied,
            Err(e) => {
                self.transactions
                    .restore_status(id, TransactionStatus::Approved, TransactionStatus::Created)
                    .await?;
                if matches!(
                    e.kind(),
                    ErrorKind::Concurrency | ErrorKind::Canceled | ErrorKind::Storage
                ) {
                    return Err(e);
                }
                tracing::warn!(%id, error = %e, "balances of enqueued transaction rejected");
                self.transactions
                    .transition(id, TransactionStatus::Canceled)
                    .await?;
                let failed = self
                    .transactions
                    .update_balance_status(id, BalanceStatus::Failed)
                    .await?;
                return Ok(Idempotent::Executed(failed.into_inner()));
            }
        };

        if let Err(e) = self
            .operations
            .record(&claimed, &applied, TransactionStatus::Approved)
            .await
        {
            self.undo_applied(id, &applied).await?;
            self.transactions
                .restore_status(id, TransactionStatus::Approved, TransactionStatus::Created)
                .await?;
            return Err(e.into());
        }
        let confirmed = self
            .transactions
            .update_balance_status(id, BalanceStatus::Confirmed)
            .await?;
        Ok(Idempotent::Executed(confirmed.into_inner()))
    }

    pub async fn update_balance_status(
        &self,
        id: TransactionId,
        status: BalanceStatus,
    ) -> Result<Idempotent<TransactionValues>, LedgerError> {
        Ok(self.transactions.update_balance_status(id, status).await?)
    }

    pub async fn find_transaction(
        &self,
        id: TransactionId,
    ) -> Result<TransactionValues, LedgerError> {
        Ok(self.transactions.find_by_id(id).await?)
    }

    pub async fn operations_for(
        &self,
        id: TransactionId,
    ) -> Result<Vec<OperationValues>, LedgerError> {
        Ok(self.operations.list_for_transaction(id).await?)
    }

    async fn execute(
        &self,
        envelope: Envelope,
        body: Transfer,
        legs: &PreparedLegs,
        pending: bool,
        cancel: &CancellationToken,
    ) -> Result<Idempotent<TransactionValues>, LedgerError> {
        let new_transaction = self.new_transaction(envelope, body, legs, None)?;
        self.apply_reserved(new_transaction, legs, pending, cancel)
            .await
    }

    async fn apply_reserved(
        &self,
        new_transaction: NewTransaction,
        legs: &PreparedLegs,
        pending: bool,
        cancel: &CancellationToken,
    ) -> Result<Idempotent<TransactionValues>, LedgerError> {
        let transaction = match self.transactions.create(new_transaction).await? {
            Idempotent::Ignored(existing) => return Ok(Idempotent::Ignored(existing)),
            Idempotent::Executed(transaction) => transaction,
        };

        let (mode, status) = if pending {
            (ApplyMode::Hold, TransactionStatus::Pending)
        } else {
            (ApplyMode::Settle, TransactionStatus::Approved)
        };
        let applied = match self.balances.apply(legs, mode, cancel).await {
            Ok(applied) => applied,
            Err(e) => {
                self.release_reservation(transaction.id).await;
                return Err(e.into());
            }
        };

        let recorded = match self.operations.record(&transaction, &applied, status).await {
            Ok(_) => self
                .transactions
                .transition(transaction.id, status)
                .await
                .map_err(LedgerError::from),
            Err(e) => Err(e.into()),
        };
        match recorded {
            Ok(transaction) => Ok(Idempotent::Executed(transaction)),
            Err(e) => {
                self.undo_applied(transaction.id, &applied).await?;
                self.release_reservation(transaction.id).await;
                Err(e)
            }
        }
    }

    async fn resolve_pending(
        &self,
        id: TransactionId,
        to: TransactionStatus,
        mode: ApplyMode,
        cancel: &CancellationToken,
    ) -> Result<TransactionValues, LedgerError> {
        let transaction = self.transactions.find_by_id(id).await?;
        if transaction.status != TransactionStatus::Pending {
            return Err(TransactionError::from(InvalidStatusTransition {
                from: transaction.status,
                to,
            })
            .into());
        }
        let Some(body) = transaction.body.as_ref() else {
            return Err(TransactionError::MissingBody(id).into());
        };
        let legs = self.dsl.build_full_transfer(body)?;

        let claimed = self.transactions.transition(id, to).await?;
        let applied = match self.balances.apply(&legs, mode, cancel).await {
            Ok(applied) => applied,
            Err(e) => {
                self.transactions
                    .restore_status(id, to, TransactionStatus::Pending)
                    .await?;
                return Err(e.into());
            }
        };
        if let Err(e) = self.operations.record(&claimed, &applied, to).await {
            self.undo_applied(id, &applied).await?;
            self.transactions
                .restore_status(id, to, TransactionStatus::Pending)
                .await?;
            return Err(e.into());
        }
        Ok(claimed)
    }

    /// Takes back the balances written for a transaction whose bookkeeping failed.
    async fn undo_applied(
        &self,
        id: TransactionId,
        applied: &[AppliedLeg],
    ) -> Result<(), LedgerError> {
        self.balances.revert_applied(applied).await.map_err(|e| {
            tracing::error!(
                transaction_id = %id,
                error = %e,
                "could not take back applied balances"
            );
            LedgerError::from(e)
        })
    }

    async fn release_reservation(&self, id: TransactionId) {
        if let Err(e) = self.transactions.soft_delete(id).await {
            tracing::error!(
                transaction_id = %id,
                error = %e,
                "could not release idempotency reservation"
            );
        }
    }

    fn new_transaction(
        &self,
        envelope: Envelope,
        body: Transfer,
        legs: &PreparedLegs,
        balance_status: Option<BalanceStatus>,
    ) -> Result<NewTransaction, LedgerError> {
        envelope.metadata.validate().map_err(DslError::from)?;
        let mut builder = NewTransaction::builder();
        if let Some(key) = envelope.idempotency_key {
            builder.idempotency_key(key);
        }
        builder
            .id(TransactionId::new())
            .asset(legs.asset.clone())
            .amount(legs.value)
            .metadata(envelope.metadata)
            .body(body);
        if let Some(description) = envelope.description {
            builder.description(description);
        }
        if let Some(group) = envelope.chart_of_accounts_group_name {
            builder.chart_of_accounts_group_name(group);
        }
        if let Some(balance_status) = balance_status {
            builder.balance_status(balance_status);
        }
        Ok(builder.build().expect("Couldn't build NewTransaction"))
    }
}

fn reversal_key(parent: TransactionId) -> String {
    format!("{parent}:reversal")
}
