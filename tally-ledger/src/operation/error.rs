use thiserror::Error;

use tally_types::primitives::*;

use crate::transaction::error::TransactionError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    #[error("OperationError - Inconsistent: operation {0} does not account for its own amount")]
    Inconsistent(OperationId),
    #[error("OperationError - BrokenChain: balance {balance_id} jumps from version {expected} to {actual}")]
    BrokenChain {
        balance_id: BalanceId,
        expected: u64,
        actual: u64,
    },
    #[error("OperationError - TransactionError: {0}")]
    TransactionError(#[from] TransactionError),
}
