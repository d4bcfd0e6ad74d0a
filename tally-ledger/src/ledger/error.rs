use serde::Serialize;
use thiserror::Error;

use crate::{
    balance::error::BalanceError, dsl::error::DslError, operation::error::OperationError,
    transaction::error::TransactionError,
};

/// Coarse classification of a failure, for callers that map errors onto a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    InsufficientFunds,
    PermissionDenied,
    Concurrency,
    NotFound,
    Conflict,
    InvalidState,
    Canceled,
    Storage,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("LedgerError - DslError: {0}")]
    DslError(#[from] DslError),
    #[error("LedgerError - BalanceError: {0}")]
    BalanceError(#[from] BalanceError),
    #[error("LedgerError - OperationError: {0}")]
    OperationError(#[from] OperationError),
    #[error("LedgerError - TransactionError: {0}")]
    TransactionError(#[from] TransactionError),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DslError(e) => dsl_kind(e),
            Self::BalanceError(e) => balance_kind(e),
            Self::OperationError(OperationError::TransactionError(e)) => transaction_kind(e),
            Self::OperationError(_) => ErrorKind::InvalidState,
            Self::TransactionError(e) => transaction_kind(e),
        }
    }

    /// Only a lost optimistic-lock race is worth retrying as is.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Concurrency
    }
}

fn dsl_kind(e: &DslError) -> ErrorKind {
    match e {
        DslError::NothingToReverse(_) | DslError::UnbalancedReversal(_) => {
            ErrorKind::InvalidState
        }
        _ => ErrorKind::Validation,
    }
}

fn balance_kind(e: &BalanceError) -> ErrorKind {
    use BalanceError::*;
    match e {
        NotFound(..) | NotFoundById(_) => ErrorKind::NotFound,
        AlreadyExists(..) => ErrorKind::Conflict,
        AssetMismatch { .. } | Overflow { .. } => ErrorKind::Validation,
        InsufficientFunds { .. } | InsufficientOnHold { .. } => ErrorKind::InsufficientFunds,
        SendingNotAllowed(..) | ReceivingNotAllowed(..) => ErrorKind::PermissionDenied,
        VersionConflict { .. } => ErrorKind::Concurrency,
        Canceled => ErrorKind::Canceled,
        Store(_) | CompensationFailed { .. } => ErrorKind::Storage,
    }
}

fn transaction_kind(e: &TransactionError) -> ErrorKind {
    use TransactionError::*;
    match e {
        NotFound(_) => ErrorKind::NotFound,
        Duplicate(_) | StatusChanged { .. } | AlreadyReverted(_) => ErrorKind::Conflict,
        InvalidStatusTransition(_) | NotRevertible { .. } | MissingBody(_) => {
            ErrorKind::InvalidState
        }
        PendingNotDeferrable => ErrorKind::Validation,
        Store(_) => ErrorKind::Storage,
    }
}
