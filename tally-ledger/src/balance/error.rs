use thiserror::Error;

use tally_types::primitives::*;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BalanceError {
    #[error("BalanceError - NotFound: there is no balance '{1}' for account {0}")]
    NotFound(AccountRef, BalanceKey),
    #[error("BalanceError - NotFound: there is no balance with id {0}")]
    NotFoundById(BalanceId),
    #[error("BalanceError - AlreadyExists: balance '{1}' of account {0} already exists")]
    AlreadyExists(AccountRef, BalanceKey),
    #[error("BalanceError - AssetMismatch: balance '{key}' of {account} holds {actual}, the transfer moves {expected}")]
    AssetMismatch {
        account: AccountRef,
        key: BalanceKey,
        expected: AssetCode,
        actual: AssetCode,
    },
    #[error("BalanceError - InsufficientFunds: balance '{key}' of {account} cannot cover the {asset} amount")]
    InsufficientFunds {
        account: AccountRef,
        key: BalanceKey,
        asset: AssetCode,
    },
    #[error("BalanceError - InsufficientOnHold: balance '{key}' of {account} holds less {asset} than requested")]
    InsufficientOnHold {
        account: AccountRef,
        key: BalanceKey,
        asset: AssetCode,
    },
    #[error("BalanceError - Overflow: balance '{key}' of {account} cannot represent the resulting {asset} amount")]
    Overflow {
        account: AccountRef,
        key: BalanceKey,
        asset: AssetCode,
    },
    #[error("BalanceError - CompensationFailed: balance {balance_id} could not be restored after a failed batch")]
    CompensationFailed { balance_id: BalanceId },
    #[error("BalanceError - SendingNotAllowed: balance '{1}' of account {0} cannot send")]
    SendingNotAllowed(AccountRef, BalanceKey),
    #[error("BalanceError - ReceivingNotAllowed: balance '{1}' of account {0} cannot receive")]
    ReceivingNotAllowed(AccountRef, BalanceKey),
    #[error("BalanceError - VersionConflict: balance {balance_id} is no longer at version {expected}")]
    VersionConflict { balance_id: BalanceId, expected: u64 },
    #[error("BalanceError - Canceled: the operation was canceled before balances were written")]
    Canceled,
    #[error("BalanceError - Store: {0}")]
    Store(String),
}

impl BalanceError {
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}
