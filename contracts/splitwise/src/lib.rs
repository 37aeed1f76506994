pub mod calculator;
pub mod contract;
mod error;
pub mod helpers;
pub mod ledger;
mod mock;
pub mod msg;
pub mod payees;
pub mod state;
pub mod vesting;

pub use crate::error::{ContractError, ErrorKind};
