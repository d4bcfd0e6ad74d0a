use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    balance::BalanceSnapshot, metadata::Metadata, primitives::*, status::TransactionStatus,
};

/// One applied leg. Never changes after it is written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationValues {
    pub id: OperationId,
    pub transaction_id: TransactionId,
    pub account: AccountRef,
    pub account_id: AccountId,
    pub balance_id: BalanceId,
    pub balance_key: BalanceKey,
    pub asset: AssetCode,
    pub operation_type: OperationType,
    pub amount: Decimal,
    pub before: BalanceSnapshot,
    pub after: BalanceSnapshot,
    pub status: TransactionStatus,
    pub chart_of_accounts: Option<String>,
    pub description: Option<String>,
    pub metadata: Metadata,
    pub route: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl OperationValues {
    /// `after` must follow from `before` by exactly this operation.
    pub fn is_consistent(&self) -> bool {
        let (available, on_hold) = match self.operation_type {
            OperationType::Credit => (self.before.available + self.amount, self.before.on_hold),
            OperationType::OnHold => (
                self.before.available - self.amount,
                self.before.on_hold + self.amount,
            ),
            OperationType::Release => (
                self.before.available + self.amount,
                self.before.on_hold - self.amount,
            ),
            OperationType::Debit => {
                // a debit either consumes available funds or settles a hold
                if self.after.on_hold == self.before.on_hold {
                    (self.before.available - self.amount, self.before.on_hold)
                } else {
                    (self.before.available, self.before.on_hold - self.amount)
                }
            }
        };
        self.amount >= Decimal::ZERO
            && self.after.available == available
            && self.after.on_hold == on_hold
            && self.after.version == self.before.version + 1
    }

    pub fn direction(&self) -> DebitOrCredit {
        self.operation_type.direction()
    }
}
