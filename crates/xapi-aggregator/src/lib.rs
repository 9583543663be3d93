pub mod aggregate;
pub mod contract;
pub mod deposit;
mod error;
pub mod mpc;
pub mod msg;
pub mod publish;
pub mod state;
pub mod testing;

pub use crate::error::AggregatorError;
