use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum CodecError {
    #[error("Invalid hex: {msg}")]
    InvalidHex { msg: String },

    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Unsupported ABI type: {0}")]
    UnsupportedType(String),

    #[error("ABI type mismatch: expected {expected}")]
    TypeMismatch { expected: String },

    #[error("Length overflow")]
    LengthOverflow,

    #[error("Invalid RLP: {msg}")]
    InvalidRlp { msg: String },

    #[error("Invalid signature: {msg}")]
    InvalidSignature { msg: String },
}

impl CodecError {
    pub fn invalid_hex(msg: impl Into<String>) -> Self {
        CodecError::InvalidHex { msg: msg.into() }
    }

    pub fn invalid_rlp(msg: impl Into<String>) -> Self {
        CodecError::InvalidRlp { msg: msg.into() }
    }

    pub fn invalid_signature(msg: impl Into<String>) -> Self {
        CodecError::InvalidSignature { msg: msg.into() }
    }

    pub fn type_mismatch(expected: impl Into<String>) -> Self {
        CodecError::TypeMismatch {
            expected: expected.into(),
        }
    }
}
