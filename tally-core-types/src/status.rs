use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Created,
    /// Funds sit on hold at the sources until the transaction is committed or canceled.
    Pending,
    Approved,
    Canceled,
    /// Recorded for information only, no balance was touched.
    Noted,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Canceled | Self::Noted)
    }

    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, next),
            (Created, Pending)
                | (Created, Approved)
                | (Created, Noted)
                | (Created, Canceled)
                | (Pending, Approved)
                | (Pending, Canceled)
        )
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("InvalidStatusTransition: {from} -> {to}")]
pub struct InvalidStatusTransition {
    pub from: TransactionStatus,
    pub to: TransactionStatus,
}

impl TransactionStatus {
    pub fn transition_to(
        self,
        next: TransactionStatus,
    ) -> Result<TransactionStatus, InvalidStatusTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvalidStatusTransition {
                from: self,
                to: next,
            })
        }
    }
}

/// Whether the balance side effect of a transaction has been durably written.
#[derive(
    Debug,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BalanceStatus {
    Pending,
    Confirmed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceStatusTransition {
    /// Write the new status and stamp the persisted-at time.
    Apply(BalanceStatus),
    /// Leave the record untouched and report success.
    NoOp,
}

impl BalanceStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed)
    }

    /// Deliveries arrive at least once and possibly out of order, so anything other
    /// than leaving `Pending` for a terminal state is ignored instead of rejected.
    pub fn transition(
        current: Option<BalanceStatus>,
        requested: BalanceStatus,
    ) -> BalanceStatusTransition {
        match (current, requested) {
            (Some(BalanceStatus::Pending), BalanceStatus::Confirmed | BalanceStatus::Failed) => {
                BalanceStatusTransition::Apply(requested)
            }
            _ => BalanceStatusTransition::NoOp,
        }
    }
}
