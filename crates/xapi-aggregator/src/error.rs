use crate::aggregate::AggregateError;
use crate::state::{RequestId, ResponseStatus};
use cosmwasm_std::{Coin, OverflowError, StdError};
use cw_utils::PaymentError;
use thiserror::Error;
use xapi_codec::CodecError;

#[derive(Error, Debug, PartialEq)]
pub enum AggregatorError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("{0}")]
    Overflow(#[from] OverflowError),

    #[error("{0}")]
    Payment(#[from] PaymentError),

    #[error("{0}")]
    Codec(#[from] CodecError),

    #[error("{0}")]
    Ownership(#[from] xapi_library::ownership::OwnershipError),

    #[error("{0}")]
    Aggregate(#[from] AggregateError),

    #[error("Unauthorized: {msg}")]
    Unauthorized { msg: String },

    #[error("Invalid data source: {msg}")]
    InvalidDataSource { msg: String },

    #[error("Data source already exists: {name}")]
    DataSourceExists { name: String },

    #[error("Data source not found: {name}")]
    DataSourceNotFound { name: String },

    #[error("Invalid report: {msg}")]
    InvalidReport { msg: String },

    #[error("Reporter {reporter} already reported for request {request_id}")]
    DuplicateReport {
        request_id: RequestId,
        reporter: String,
    },

    #[error("Deposit must be exactly {required}, got {paid}")]
    DepositMismatch { required: Coin, paid: Coin },

    #[error("Insufficient deposit: required {required}, got {paid}")]
    InsufficientDeposit { required: Coin, paid: Coin },

    #[error("Response not found for request {request_id}")]
    ResponseNotFound { request_id: RequestId },

    #[error("Request {request_id} is {actual}, expected {expected}")]
    InvalidStatus {
        request_id: RequestId,
        expected: String,
        actual: ResponseStatus,
    },

    #[error("Publish chain config not found for chain {chain_id}")]
    ChainConfigNotFound { chain_id: u64 },

    #[error("Invalid config: {msg}")]
    InvalidConfig { msg: String },

    #[error("Unknown callback {callback_id}")]
    UnknownCallback { callback_id: u64 },

    #[error("Callback {callback_id} does not belong to this hop")]
    CallbackMismatch { callback_id: u64 },

    #[error("Stale config version for chain {chain_id}: signed {signed}, current {current}")]
    StaleConfigVersion {
        chain_id: u64,
        signed: u64,
        current: u64,
    },

    #[error("Stale nonce for chain {chain_id}: signed {signed}, current {current}")]
    StaleNonce {
        chain_id: u64,
        signed: u64,
        current: u64,
    },
}

impl AggregatorError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        AggregatorError::Unauthorized { msg: msg.into() }
    }

    pub fn invalid_data_source(msg: impl Into<String>) -> Self {
        AggregatorError::InvalidDataSource { msg: msg.into() }
    }

    pub fn invalid_report(msg: impl Into<String>) -> Self {
        AggregatorError::InvalidReport { msg: msg.into() }
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        AggregatorError::InvalidConfig { msg: msg.into() }
    }
}
