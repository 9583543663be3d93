use cosmwasm_std::{OverflowError, StdError, Uint128};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum StakingError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("{0}")]
    Overflow(#[from] OverflowError),

    #[error("{0}")]
    Ownership(#[from] xapi_library::ownership::OwnershipError),

    #[error("Unauthorized: {msg}")]
    Unauthorized { msg: String },

    #[error("Insufficient stake: staked {staked}, requested {requested}")]
    InsufficientStake {
        staked: Uint128,
        requested: Uint128,
    },

    #[error("Nothing unlocked")]
    NothingUnlocked,

    #[error("Insufficient total: staked and unlocking {available}, requested {requested}")]
    InsufficientTotal {
        available: Uint128,
        requested: Uint128,
    },

    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Unlock period must be greater than zero")]
    InvalidUnlockPeriod,
}

impl StakingError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        StakingError::Unauthorized { msg: msg.into() }
    }
}
