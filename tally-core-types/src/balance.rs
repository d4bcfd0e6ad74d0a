use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::primitives::*;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceValues {
    pub id: BalanceId,
    pub account_id: AccountId,
    pub account: AccountRef,
    pub key: BalanceKey,
    pub asset: AssetCode,
    pub available: Decimal,
    pub on_hold: Decimal,
    pub version: u64,
    pub allow_sending: bool,
    pub allow_receiving: bool,
    pub account_type: AccountType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BalanceValues {
    pub fn is_external(&self) -> bool {
        self.account_type == AccountType::External
    }

    pub fn snapshot(&self) -> BalanceSnapshot {
        BalanceSnapshot {
            available: self.available,
            on_hold: self.on_hold,
            version: self.version,
        }
    }
}

/// The amounts and version of a balance at one point of its history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub available: Decimal,
    pub on_hold: Decimal,
    pub version: u64,
}
