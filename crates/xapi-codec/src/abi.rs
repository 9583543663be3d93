//! Solidity ABI encoding, restricted to the shapes the destination contract declares.
//!
//! Every value occupies whole 32-byte words. Dynamic values (`bytes`, `T[]` and tuples holding
//! either) are written in the tail of their enclosing block and referenced from the head by a byte
//! offset measured from the start of that block.

use crate::{keccak256, CodecError};
use cosmwasm_std::Uint256;
use std::fmt;
use std::str::FromStr;

pub const WORD: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AbiType {
    Uint256,
    Uint16,
    Address,
    Bytes32,
    Bytes,
    Array(Box<AbiType>),
    Tuple(Vec<AbiType>),
}

impl AbiType {
    pub fn is_dynamic(&self) -> bool {
        match self {
            AbiType::Bytes | AbiType::Array(_) => true,
            AbiType::Tuple(types) => types.iter().any(AbiType::is_dynamic),
            _ => false,
        }
    }

    /// Bytes the value takes in the head of its enclosing block.
    fn head_size(&self) -> usize {
        match self {
            AbiType::Tuple(types) if !self.is_dynamic() => {
                types.iter().map(AbiType::head_size).sum()
            }
            _ => WORD,
        }
    }
}

impl FromStr for AbiType {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(inner) = s.strip_suffix("[]") {
            return Ok(AbiType::Array(Box::new(inner.parse()?)));
        }
        if let Some(inner) = s.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
            let types = split_top_level(inner)?
                .into_iter()
                .map(str::parse)
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(AbiType::Tuple(types));
        }
        match s {
            "uint256" | "uint" => Ok(AbiType::Uint256),
            "uint16" => Ok(AbiType::Uint16),
            "address" => Ok(AbiType::Address),
            "bytes32" => Ok(AbiType::Bytes32),
            "bytes" => Ok(AbiType::Bytes),
            other => Err(CodecError::UnsupportedType(other.to_string())),
        }
    }
}

impl fmt::Display for AbiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbiType::Uint256 => write!(f, "uint256"),
            AbiType::Uint16 => write!(f, "uint16"),
            AbiType::Address => write!(f, "address"),
            AbiType::Bytes32 => write!(f, "bytes32"),
            AbiType::Bytes => write!(f, "bytes"),
            AbiType::Array(inner) => write!(f, "{}[]", inner),
            AbiType::Tuple(types) => {
                let inner: Vec<String> = types.iter().map(ToString::to_string).collect();
                write!(f, "({})", inner.join(","))
            }
        }
    }
}

/// Split `a,(b,c)[],d` on the commas that are not nested in parentheses.
fn split_top_level(s: &str) -> Result<Vec<&str>, CodecError> {
    if s.trim().is_empty() {
        return Ok(vec![]);
    }
    let mut parts = Vec::new();
    let mut depth: usize = 0;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| CodecError::UnsupportedType(s.to_string()))?;
            }
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(CodecError::UnsupportedType(s.to_string()));
    }
    parts.push(&s[start..]);
    Ok(parts)
}

/// Split `name(type,...)` into the function name and its parameter types.
pub fn parse_signature(signature: &str) -> Result<(&str, Vec<AbiType>), CodecError> {
    let open = signature
        .find('(')
        .ok_or_else(|| CodecError::UnsupportedType(signature.to_string()))?;
    let (name, params) = signature.split_at(open);
    match params.parse()? {
        AbiType::Tuple(types) => Ok((name, types)),
        _ => Err(CodecError::UnsupportedType(signature.to_string())),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AbiValue {
    Uint(Uint256),
    Address([u8; 20]),
    FixedBytes([u8; 32]),
    Bytes(Vec<u8>),
    Array(Vec<AbiValue>),
    Tuple(Vec<AbiValue>),
}

impl AbiValue {
    pub fn uint(value: impl Into<Uint256>) -> Self {
        AbiValue::Uint(value.into())
    }
}

/// Encode a single value of type `ty` on its own,
/// a dynamic value yields its tail encoding (length word followed by content).
pub fn encode_parameter(ty: &AbiType, value: &AbiValue) -> Result<Vec<u8>, CodecError> {
    match (ty, value) {
        (AbiType::Uint256, AbiValue::Uint(v)) => Ok(v.to_be_bytes().to_vec()),
        (AbiType::Uint16, AbiValue::Uint(v)) => {
            if *v > Uint256::from(u16::MAX as u128) {
                return Err(CodecError::type_mismatch("uint16"));
            }
            Ok(v.to_be_bytes().to_vec())
        }
        (AbiType::Address, AbiValue::Address(address)) => {
            let mut word = vec![0u8; WORD - 20];
            word.extend_from_slice(address);
            Ok(word)
        }
        (AbiType::Bytes32, AbiValue::FixedBytes(bytes)) => Ok(bytes.to_vec()),
        (AbiType::Bytes, AbiValue::Bytes(bytes)) => {
            let mut out = length_word(bytes.len())?;
            out.extend_from_slice(bytes);
            out.resize(out.len() + padding(bytes.len()), 0);
            Ok(out)
        }
        (AbiType::Array(inner), AbiValue::Array(values)) => {
            let mut out = length_word(values.len())?;
            let types = vec![inner.as_ref().clone(); values.len()];
            out.extend(encode(&types, values)?);
            Ok(out)
        }
        (AbiType::Tuple(types), AbiValue::Tuple(values)) => encode(types, values),
        (ty, _) => Err(CodecError::type_mismatch(ty.to_string())),
    }
}

/// `abi.encode(values...)`: heads in order, then the tails of the dynamic values
/// in the same order, each head offset counted from the start of this block.
pub fn encode(types: &[AbiType], values: &[AbiValue]) -> Result<Vec<u8>, CodecError> {
    if types.len() != values.len() {
        return Err(CodecError::type_mismatch(format!(
            "{} values",
            types.len()
        )));
    }

    let head_size: usize = types.iter().map(AbiType::head_size).sum();
    let mut head = Vec::with_capacity(head_size);
    let mut tail = Vec::new();

    for (ty, value) in types.iter().zip(values) {
        let encoded = encode_parameter(ty, value)?;
        if ty.is_dynamic() {
            head.extend(length_word(head_size + tail.len())?);
            tail.extend(encoded);
        } else {
            head.extend(encoded);
        }
    }

    head.extend(tail);
    Ok(head)
}

/// First 4 bytes of `keccak256(signature)`.
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Calldata for `signature` called with `args`: the selector followed by `abi.encode(args)`.
pub fn encode_function_call(signature: &str, args: &[AbiValue]) -> Result<Vec<u8>, CodecError> {
    let (_, types) = parse_signature(signature)?;
    let mut out = function_selector(signature).to_vec();
    out.extend(encode(&types, args)?);
    Ok(out)
}

fn length_word(len: usize) -> Result<Vec<u8>, CodecError> {
    let len = u128::try_from(len).map_err(|_| CodecError::LengthOverflow)?;
    Ok(Uint256::from(len).to_be_bytes().to_vec())
}

fn padding(len: usize) -> usize {
    (WORD - len % WORD) % WORD
}
