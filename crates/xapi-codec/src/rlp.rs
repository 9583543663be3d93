//! Recursive Length Prefix encoding.
//!
//! A byte string is `[0x80 + len] ++ bytes` (or itself when it is a single byte `<= 0x7f`),
//! longer than 55 bytes it is `[0xb7 + len(len)] ++ be(len) ++ bytes`.
//! Lists use `0xc0`/`0xf7` over the concatenated encodings of their children.

use crate::CodecError;
use cosmwasm_std::Uint256;

const STRING_OFFSET: u8 = 0x80;
const LIST_OFFSET: u8 = 0xc0;
const SHORT_MAX: usize = 55;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RlpItem {
    Bytes(Vec<u8>),
    List(Vec<RlpItem>),
}

impl RlpItem {
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        RlpItem::Bytes(bytes.into())
    }

    pub fn list(items: Vec<RlpItem>) -> Self {
        RlpItem::List(items)
    }

    /// Integers are their minimal big-endian bytes, zero is the empty string.
    pub fn uint(value: u128) -> Self {
        RlpItem::Bytes(trim_leading_zeros(&value.to_be_bytes()).to_vec())
    }

    pub fn uint256(value: Uint256) -> Self {
        RlpItem::Bytes(trim_leading_zeros(&value.to_be_bytes()).to_vec())
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            RlpItem::Bytes(bytes) => Some(bytes),
            RlpItem::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[RlpItem]> {
        match self {
            RlpItem::Bytes(_) => None,
            RlpItem::List(items) => Some(items),
        }
    }

    /// Read back an integer written by [RlpItem::uint], leading zeros are rejected.
    pub fn as_uint(&self) -> Result<u128, CodecError> {
        let bytes = self
            .as_bytes()
            .ok_or_else(|| CodecError::invalid_rlp("expected a byte string, got a list"))?;
        if bytes.len() > 16 {
            return Err(CodecError::LengthOverflow);
        }
        if bytes.first() == Some(&0) {
            return Err(CodecError::invalid_rlp("integer has a leading zero byte"));
        }
        Ok(bytes.iter().fold(0u128, |acc, b| (acc << 8) | u128::from(*b)))
    }
}

/// Strip leading zero bytes, an all-zero input becomes empty.
pub fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

pub fn encode(item: &RlpItem) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(item, &mut out);
    out
}

fn encode_into(item: &RlpItem, out: &mut Vec<u8>) {
    match item {
        RlpItem::Bytes(bytes) => {
            if bytes.len() == 1 && bytes[0] < STRING_OFFSET {
                out.push(bytes[0]);
            } else {
                encode_length(bytes.len(), STRING_OFFSET, out);
                out.extend_from_slice(bytes);
            }
        }
        RlpItem::List(items) => {
            let mut payload = Vec::new();
            for child in items {
                encode_into(child, &mut payload);
            }
            encode_length(payload.len(), LIST_OFFSET, out);
            out.extend_from_slice(&payload);
        }
    }
}

fn encode_length(len: usize, offset: u8, out: &mut Vec<u8>) {
    if len <= SHORT_MAX {
        out.push(offset + len as u8);
    } else {
        let len_bytes = (len as u64).to_be_bytes();
        let len_bytes = trim_leading_zeros(&len_bytes);
        out.push(offset + SHORT_MAX as u8 + len_bytes.len() as u8);
        out.extend_from_slice(len_bytes);
    }
}

/// Decode exactly one item, trailing bytes are an error.
/// Only canonical encodings are accepted.
pub fn decode(data: &[u8]) -> Result<RlpItem, CodecError> {
    let (item, consumed) = decode_item(data)?;
    if consumed != data.len() {
        return Err(CodecError::invalid_rlp("trailing bytes after item"));
    }
    Ok(item)
}

fn decode_item(data: &[u8]) -> Result<(RlpItem, usize), CodecError> {
    let prefix = *data
        .first()
        .ok_or_else(|| CodecError::invalid_rlp("unexpected end of input"))?;

    match prefix {
        0x00..=0x7f => Ok((RlpItem::Bytes(vec![prefix]), 1)),
        0x80..=0xb7 => {
            let len = usize::from(prefix - STRING_OFFSET);
            let payload = take(data, 1, len)?;
            if len == 1 && payload[0] < STRING_OFFSET {
                return Err(CodecError::invalid_rlp("single byte must encode as itself"));
            }
            Ok((RlpItem::Bytes(payload.to_vec()), 1 + len))
        }
        0xb8..=0xbf => {
            let (len, header) = decode_long_length(data, prefix - STRING_OFFSET - SHORT_MAX as u8)?;
            let payload = take(data, header, len)?;
            Ok((RlpItem::Bytes(payload.to_vec()), header + len))
        }
        0xc0..=0xf7 => {
            let len = usize::from(prefix - LIST_OFFSET);
            let payload = take(data, 1, len)?;
            Ok((RlpItem::List(decode_list(payload)?), 1 + len))
        }
        0xf8..=0xff => {
            let (len, header) = decode_long_length(data, prefix - LIST_OFFSET - SHORT_MAX as u8)?;
            let payload = take(data, header, len)?;
            Ok((RlpItem::List(decode_list(payload)?), header + len))
        }
    }
}

fn decode_list(mut payload: &[u8]) -> Result<Vec<RlpItem>, CodecError> {
    let mut items = Vec::new();
    while !payload.is_empty() {
        let (item, consumed) = decode_item(payload)?;
        items.push(item);
        payload = &payload[consumed..];
    }
    Ok(items)
}

/// Returns `(payload length, header length)` of a long-form item.
fn decode_long_length(data: &[u8], len_of_len: u8) -> Result<(usize, usize), CodecError> {
    let len_bytes = take(data, 1, usize::from(len_of_len))?;
    if len_bytes[0] == 0 {
        return Err(CodecError::invalid_rlp("length has a leading zero byte"));
    }
    let len = len_bytes
        .iter()
        .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
    if len <= SHORT_MAX as u64 {
        return Err(CodecError::invalid_rlp("long form used for a short item"));
    }
    let len = usize::try_from(len).map_err(|_| CodecError::LengthOverflow)?;
    Ok((len, 1 + usize::from(len_of_len)))
}

fn take(data: &[u8], start: usize, len: usize) -> Result<&[u8], CodecError> {
    let end = start.checked_add(len).ok_or(CodecError::LengthOverflow)?;
    data.get(start..end)
        .ok_or_else(|| CodecError::invalid_rlp("unexpected end of input"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_hex(item: &RlpItem) -> String {
        ::hex::encode(encode(item))
    }

    #[test]
    fn test_encode_strings() {
        assert_eq!(encode_hex(&RlpItem::bytes(b"dog".to_vec())), "83646f67");
        assert_eq!(encode_hex(&RlpItem::bytes(vec![])), "80");
        assert_eq!(encode_hex(&RlpItem::bytes(vec![0x00])), "00");
        assert_eq!(encode_hex(&RlpItem::bytes(vec![0x7f])), "7f");
        assert_eq!(encode_hex(&RlpItem::bytes(vec![0x80])), "8180");

        let lorem = b"Lorem ipsum dolor sit amet, consectetur adipisicing elit".to_vec();
        assert_eq!(lorem.len(), 56);
        assert_eq!(
            encode_hex(&RlpItem::bytes(lorem.clone())),
            format!("b838{}", ::hex::encode(&lorem))
        );
    }

    #[test]
    fn test_encode_integers() {
        assert_eq!(encode_hex(&RlpItem::uint(0)), "80");
        assert_eq!(encode_hex(&RlpItem::uint(1)), "01");
        assert_eq!(encode_hex(&RlpItem::uint(15)), "0f");
        assert_eq!(encode_hex(&RlpItem::uint(127)), "7f");
        assert_eq!(encode_hex(&RlpItem::uint(128)), "8180");
        assert_eq!(encode_hex(&RlpItem::uint(1024)), "820400");
        assert_eq!(
            encode_hex(&RlpItem::uint(u64::MAX as u128)),
            "88ffffffffffffffff"
        );
        assert_eq!(
            encode_hex(&RlpItem::uint256(Uint256::from(1024u128))),
            "820400"
        );
        assert_eq!(encode_hex(&RlpItem::uint256(Uint256::zero())), "80");
    }

    #[test]
    fn test_encode_lists() {
        assert_eq!(encode_hex(&RlpItem::list(vec![])), "c0");

        let cat_dog = RlpItem::list(vec![
            RlpItem::bytes(b"cat".to_vec()),
            RlpItem::bytes(b"dog".to_vec()),
        ]);
        assert_eq!(encode_hex(&cat_dog), "c88363617483646f67");

        // set theoretical representation of three
        let empty = || RlpItem::list(vec![]);
        let three = RlpItem::list(vec![
            empty(),
            RlpItem::list(vec![empty()]),
            RlpItem::list(vec![empty(), RlpItem::list(vec![empty()])]),
        ]);
        assert_eq!(encode_hex(&three), "c7c0c1c0c3c0c1c0");
    }

    #[test]
    fn test_encode_long_list() {
        // 20 items of "dog" = 80 bytes of payload
        let items = vec![RlpItem::bytes(b"dog".to_vec()); 20];
        let encoded = encode(&RlpItem::list(items));
        assert_eq!(&encoded[..2], &[0xf8, 80]);
        assert_eq!(encoded.len(), 82);
    }

    #[test]
    fn test_decode_agrees_with_encode() {
        let values: Vec<u128> = vec![0, 1, 127, 128, 255, 256, 1024, u64::MAX as u128, u128::MAX];
        for value in values {
            let item = RlpItem::uint(value);
            let decoded = decode(&encode(&item)).unwrap();
            assert_eq!(decoded, item);
            assert_eq!(decoded.as_uint().unwrap(), value);
        }

        let address = RlpItem::bytes([0xcc; 20].to_vec());
        assert_eq!(decode(&encode(&address)).unwrap(), address);

        let nested = RlpItem::list(vec![
            RlpItem::uint(1),
            RlpItem::list(vec![
                address.clone(),
                RlpItem::list(vec![RlpItem::bytes([0xab; 32].to_vec())]),
            ]),
            RlpItem::bytes(vec![0x55; 100]),
            RlpItem::list(vec![]),
        ]);
        assert_eq!(decode(&encode(&nested)).unwrap(), nested);
    }

    #[test]
    fn test_decode_rejects_non_canonical() {
        // single byte below 0x80 wrapped in a string prefix
        assert!(decode(&[0x81, 0x05]).is_err());
        // long form for a 3 byte string
        assert!(decode(&[0xb8, 0x03, 0x64, 0x6f, 0x67]).is_err());
        // leading zero in the length of length
        assert!(decode(&[0xb9, 0x00, 0x38]).is_err());
        // integer with leading zero
        assert!(decode(&[0x82, 0x00, 0x01]).unwrap().as_uint().is_err());
    }

    #[test]
    fn test_decode_truncated() {
        assert_eq!(
            decode(&[]),
            Err(CodecError::invalid_rlp("unexpected end of input"))
        );
        assert!(decode(&[0x83, 0x64, 0x6f]).is_err());
        assert!(decode(&[0xc8, 0x83, 0x63, 0x61, 0x74]).is_err());
        // trailing bytes
        assert!(decode(&[0x01, 0x02]).is_err());
    }
}
