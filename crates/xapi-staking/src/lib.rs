pub mod contract;
mod error;
pub mod msg;
pub mod state;
pub mod testing;

pub use crate::error::StakingError;
