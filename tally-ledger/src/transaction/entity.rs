use chrono::{DateTime, Utc};
use derive_builder::Builder;
use rust_decimal::Decimal;

use tally_types::{
    dsl::Transfer,
    metadata::Metadata,
    primitives::*,
    status::{BalanceStatus, TransactionStatus},
    transaction::TransactionValues,
};

#[derive(Builder, Debug, Clone)]
pub struct NewTransaction {
    #[builder(setter(custom))]
    pub(super) id: TransactionId,
    #[builder(setter(into))]
    pub(super) idempotency_key: String,
    #[builder(setter(strip_option), default)]
    pub(super) parent_transaction_id: Option<TransactionId>,
    #[builder(setter(strip_option, into), default)]
    pub(super) description: Option<String>,
    pub(super) asset: AssetCode,
    pub(super) amount: Decimal,
    #[builder(setter(strip_option, into), default)]
    pub(super) chart_of_accounts_group_name: Option<String>,
    #[builder(setter(strip_option), default)]
    pub(super) body: Option<Transfer>,
    #[builder(default)]
    pub(super) metadata: Metadata,
    #[builder(setter(strip_option), default)]
    pub(super) balance_status: Option<BalanceStatus>,
}

impl NewTransaction {
    pub fn builder() -> NewTransactionBuilder {
        NewTransactionBuilder::default()
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn idempotency_key(&self) -> &str {
        &self.idempotency_key
    }

    pub(super) fn into_values(self, now: DateTime<Utc>) -> TransactionValues {
        TransactionValues {
            id: self.id,
            parent_transaction_id: self.parent_transaction_id,
            idempotency_key: self.idempotency_key,
            description: self.description,
            status: TransactionStatus::Created,
            asset: self.asset,
            amount: self.amount,
            chart_of_accounts_group_name: self.chart_of_accounts_group_name,
            body: self.body,
            metadata: self.metadata,
            balance_status: self.balance_status,
            balance_persisted_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

impl NewTransactionBuilder {
    /// Requests without an idempotency key are keyed by their id.
    pub fn id(&mut self, id: impl Into<TransactionId>) -> &mut Self {
        let id = id.into();
        self.id = Some(id);
        if self.idempotency_key.is_none() {
            self.idempotency_key = Some(id.to_string());
        }
        self
    }
}
