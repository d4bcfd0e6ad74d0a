use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    dsl::Transfer,
    metadata::Metadata,
    primitives::*,
    status::{BalanceStatus, TransactionStatus},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionValues {
    pub id: TransactionId,
    pub parent_transaction_id: Option<TransactionId>,
    pub idempotency_key: String,
    pub description: Option<String>,
    pub status: TransactionStatus,
    pub asset: AssetCode,
    pub amount: Decimal,
    pub chart_of_accounts_group_name: Option<String>,
    /// The validated request, kept so that deferred balance work can be replayed.
    pub body: Option<Transfer>,
    pub metadata: Metadata,
    pub balance_status: Option<BalanceStatus>,
    pub balance_persisted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TransactionValues {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_reversal(&self) -> bool {
        self.parent_transaction_id.is_some()
    }
}
