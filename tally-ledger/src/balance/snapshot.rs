use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use tally_types::{
    balance::{BalanceSnapshot, BalanceValues},
    primitives::*,
};

use super::{error::BalanceError, ApplyMode};

/// What a single leg does to its balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Movement {
    Debit,
    SettleHold,
    Credit,
    Hold,
    Release,
}

impl Movement {
    /// `None` when the mode leaves legs of that side alone.
    pub fn for_leg(mode: ApplyMode, is_from: bool) -> Option<Self> {
        match (mode, is_from) {
            (ApplyMode::Settle, true) => Some(Self::Debit),
            (ApplyMode::Settle, false) => Some(Self::Credit),
            (ApplyMode::Hold, true) => Some(Self::Hold),
            (ApplyMode::Hold, false) => None,
            (ApplyMode::Commit, true) => Some(Self::SettleHold),
            (ApplyMode::Commit, false) => Some(Self::Credit),
            (ApplyMode::Release, true) => Some(Self::Release),
            (ApplyMode::Release, false) => None,
        }
    }

    pub fn operation_type(&self) -> OperationType {
        match self {
            Self::Debit | Self::SettleHold => OperationType::Debit,
            Self::Credit => OperationType::Credit,
            Self::Hold => OperationType::OnHold,
            Self::Release => OperationType::Release,
        }
    }
}

pub(super) fn next_snapshot(
    balance: &BalanceValues,
    movement: Movement,
    amount: Decimal,
) -> Result<BalanceSnapshot, BalanceError> {
    let mut next = balance.snapshot();
    next.version += 1;

    match movement {
        Movement::Debit | Movement::Hold if !balance.allow_sending => {
            return Err(BalanceError::SendingNotAllowed(
                balance.account.clone(),
                balance.key.clone(),
            ))
        }
        Movement::Credit if !balance.allow_receiving => {
            return Err(BalanceError::ReceivingNotAllowed(
                balance.account.clone(),
                balance.key.clone(),
            ))
        }
        _ => (),
    }

    let overflow = || BalanceError::Overflow {
        account: balance.account.clone(),
        key: balance.key.clone(),
        asset: balance.asset.clone(),
    };
    let (available, on_hold) = match movement {
        Movement::Debit => (next.available.checked_sub(amount), Some(next.on_hold)),
        Movement::Credit => (next.available.checked_add(amount), Some(next.on_hold)),
        Movement::Hold => (
            next.available.checked_sub(amount),
            next.on_hold.checked_add(amount),
        ),
        Movement::SettleHold => (Some(next.available), next.on_hold.checked_sub(amount)),
        Movement::Release => (
            next.available.checked_add(amount),
            next.on_hold.checked_sub(amount),
        ),
    };
    next.available = available.ok_or_else(overflow)?;
    next.on_hold = on_hold.ok_or_else(overflow)?;

    if next.available < Decimal::ZERO && !balance.is_external() {
        return Err(BalanceError::InsufficientFunds {
            account: balance.account.clone(),
            key: balance.key.clone(),
            asset: balance.asset.clone(),
        });
    }
    if next.on_hold < Decimal::ZERO {
        return Err(BalanceError::InsufficientOnHold {
            account: balance.account.clone(),
            key: balance.key.clone(),
            asset: balance.asset.clone(),
        });
    }
    Ok(next)
}

/// Conditional write of one balance: applies only while the stored version still
/// equals `before.version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceUpdate {
    pub balance_id: BalanceId,
    pub before: BalanceSnapshot,
    pub after: BalanceSnapshot,
    pub updated_at: DateTime<Utc>,
}

impl BalanceUpdate {
    pub fn expected_version(&self) -> u64 {
        self.before.version
    }

    /// The write that puts the amounts back after this update landed at `version`.
    pub fn compensation(&self, version: u64) -> Self {
        Self {
            balance_id: self.balance_id,
            before: BalanceSnapshot {
                version,
                ..self.after
            },
            after: BalanceSnapshot {
                version: version + 1,
                ..self.before
            },
            updated_at: self.updated_at,
        }
    }
}
