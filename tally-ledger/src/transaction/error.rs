use thiserror::Error;

use tally_types::{
    primitives::*,
    status::{InvalidStatusTransition, TransactionStatus},
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("TransactionError - NotFound: transaction {0} does not exist")]
    NotFound(TransactionId),
    #[error("TransactionError - Duplicate: a transaction with idempotency key '{0}' already exists")]
    Duplicate(String),
    #[error("TransactionError - InvalidStatusTransition: {0}")]
    InvalidStatusTransition(#[from] InvalidStatusTransition),
    #[error("TransactionError - StatusChanged: transaction {id} is no longer {expected}")]
    StatusChanged {
        id: TransactionId,
        expected: TransactionStatus,
    },
    #[error("TransactionError - NotRevertible: transaction {id} is {status}, only approved transactions can be reverted")]
    NotRevertible {
        id: TransactionId,
        status: TransactionStatus,
    },
    #[error("TransactionError - AlreadyReverted: transaction {0} already has a reversal")]
    AlreadyReverted(TransactionId),
    #[error("TransactionError - MissingBody: transaction {0} has no recorded request to apply")]
    MissingBody(TransactionId),
    #[error("TransactionError - PendingNotDeferrable: pending transactions are applied when they are posted")]
    PendingNotDeferrable,
    #[error("TransactionError - Store: {0}")]
    Store(String),
}
