use rust_decimal::Decimal;
use thiserror::Error;

use tally_types::{metadata::MetadataError, primitives::*};

/// Which list of a transfer a leg sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegSide {
    Source,
    Destination,
}

impl LegSide {
    pub fn is_from(&self) -> bool {
        matches!(self, Self::Source)
    }
}

impl std::fmt::Display for LegSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Destination => write!(f, "destination"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DslError {
    #[error("DslError - InvalidValue: the value of a {0} transfer must be greater than zero")]
    InvalidValue(AssetCode),
    #[error("DslError - ValueScaleExceeded: the {asset} value has more than {scale} decimal places")]
    ValueScaleExceeded { asset: AssetCode, scale: u32 },
    #[error("DslError - EmptyLegs: the {side} list of the {asset} transfer is empty")]
    EmptyLegs { side: LegSide, asset: AssetCode },
    #[error("DslError - InvalidAmount: {side} leg {index} of the {asset} transfer has a negative amount")]
    InvalidAmount {
        side: LegSide,
        index: usize,
        asset: AssetCode,
    },
    #[error("DslError - ScaleExceeded: {side} leg {index} has more than {scale} decimal places for {asset}")]
    ScaleExceeded {
        side: LegSide,
        index: usize,
        asset: AssetCode,
        scale: u32,
    },
    #[error("DslError - InvalidShare: {side} leg {index} of the {asset} transfer needs a percentage in (0, 100]")]
    InvalidShare {
        side: LegSide,
        index: usize,
        asset: AssetCode,
    },
    #[error("DslError - AmountOverflow: {side} leg {index} of the {asset} transfer overflows the total")]
    AmountOverflow {
        side: LegSide,
        index: usize,
        asset: AssetCode,
    },
    #[error("DslError - MultipleRemaining: the {side} list of the {asset} transfer has more than one remaining leg")]
    MultipleRemaining { side: LegSide, asset: AssetCode },
    #[error("DslError - NegativeRemaining: the other {side} legs of the {asset} transfer exceed the value, leaving leg {index} negative")]
    NegativeRemaining {
        side: LegSide,
        index: usize,
        asset: AssetCode,
    },
    #[error("DslError - SumMismatch: {side} legs of the {asset} transfer add up to {actual}, expected {expected}")]
    SumMismatch {
        side: LegSide,
        asset: AssetCode,
        expected: Decimal,
        actual: Decimal,
    },
    #[error("DslError - AmbiguousAccount: balance '{key}' of {account} appears more than once")]
    AmbiguousAccount {
        account: AccountRef,
        key: BalanceKey,
    },
    #[error("DslError - Metadata: {0}")]
    Metadata(#[from] MetadataError),
    #[error("DslError - NothingToReverse: transaction {0} has no settled operations")]
    NothingToReverse(TransactionId),
    #[error("DslError - UnbalancedReversal: debits and credits of transaction {0} do not match")]
    UnbalancedReversal(TransactionId),
}
