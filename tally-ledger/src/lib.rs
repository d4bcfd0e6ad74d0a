#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![cfg_attr(feature = "fail-on-warnings", deny(clippy::all))]

pub mod balance;
pub mod dsl;
mod idempotent;
mod ledger;
pub mod notify;
pub mod operation;
pub mod transaction;

pub use idempotent::*;
pub use ledger::*;

pub mod primitives {
    pub use tally_types::primitives::*;
}

pub use tally_types::{amount::*, metadata::*, status::*};
pub use tokio_util::sync::CancellationToken;
