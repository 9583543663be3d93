use crate::CodecError;

/// Decode hex text into bytes, the `0x` prefix is optional.
/// An odd number of digits is read as if it had a leading zero (`0x123` is `[0x01, 0x23]`).
pub fn decode_hex(value: &str) -> Result<Vec<u8>, CodecError> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    let result = if digits.len() % 2 == 1 {
        ::hex::decode(format!("0{}", digits))
    } else {
        ::hex::decode(digits)
    };
    result.map_err(|e| CodecError::invalid_hex(e.to_string()))
}

/// Decode hex text that must hold exactly `N` bytes.
pub fn decode_fixed<const N: usize>(value: &str) -> Result<[u8; N], CodecError> {
    let bytes = decode_hex(value)?;
    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| CodecError::InvalidLength {
        expected: N,
        actual: bytes.len(),
    })
}

/// Lowercase, `0x` prefixed.
pub fn encode_hex(bytes: &[u8]) -> String {
    format!("0x{}", ::hex::encode(bytes))
}

/// Parse a 20-byte EVM address, `0x` followed by exactly 40 hex digits (any case).
/// Checksums are not verified.
pub fn parse_address(value: &str) -> Result<[u8; 20], CodecError> {
    let digits = value
        .strip_prefix("0x")
        .ok_or_else(|| CodecError::invalid_hex("address must start with 0x"))?;
    if digits.len() != 40 {
        return Err(CodecError::InvalidLength {
            expected: 20,
            actual: digits.len() / 2,
        });
    }
    decode_fixed::<20>(digits)
}

/// Lowercase form of an address, the canonical form stored by the aggregator.
pub fn format_address(address: &[u8; 20]) -> String {
    encode_hex(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_hex() {
        assert_eq!(decode_hex("0x").unwrap(), Vec::<u8>::new());
        assert_eq!(decode_hex("").unwrap(), Vec::<u8>::new());
        assert_eq!(decode_hex("0x0a0B").unwrap(), vec![0x0a, 0x0b]);
        assert_eq!(decode_hex("ff").unwrap(), vec![0xff]);
        // odd length gets a leading zero
        assert_eq!(decode_hex("0x123").unwrap(), vec![0x01, 0x23]);
    }

    #[test]
    fn test_decode_hex_malformed() {
        assert!(matches!(
            decode_hex("0xzz"),
            Err(CodecError::InvalidHex { .. })
        ));
        assert!(matches!(
            decode_hex("hello"),
            Err(CodecError::InvalidHex { .. })
        ));
    }

    #[test]
    fn test_decode_fixed() {
        let bytes = decode_fixed::<2>("0xbeef").unwrap();
        assert_eq!(bytes, [0xbe, 0xef]);

        let err = decode_fixed::<32>("0xbeef").unwrap_err();
        assert_eq!(
            err,
            CodecError::InvalidLength {
                expected: 32,
                actual: 2
            }
        );
    }

    #[test]
    fn test_parse_address() {
        let address = parse_address("0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC").unwrap();
        assert_eq!(address, [0xcc; 20]);
        assert_eq!(
            format_address(&address),
            "0xcccccccccccccccccccccccccccccccccccccccc"
        );
    }

    #[test]
    fn test_parse_address_invalid() {
        // missing prefix
        assert!(parse_address("cccccccccccccccccccccccccccccccccccccccc").is_err());
        // too short
        assert!(matches!(
            parse_address("0xcccc"),
            Err(CodecError::InvalidLength { .. })
        ));
        // too long
        assert!(parse_address("0xcccccccccccccccccccccccccccccccccccccccccc").is_err());
        // not hex
        assert!(matches!(
            parse_address("0xgggggggggggggggggggggggggggggggggggggggg"),
            Err(CodecError::InvalidHex { .. })
        ));
    }
}
