#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![cfg_attr(feature = "fail-on-warnings", deny(clippy::all))]

pub mod amount;
pub mod balance;
pub mod dsl;
mod id;
pub mod metadata;
pub mod operation;
pub mod primitives;
pub mod status;
pub mod transaction;
