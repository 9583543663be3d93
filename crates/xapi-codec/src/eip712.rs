//! EIP-712 typed structured data hashing.
//!
//! `digest = keccak256(0x1901 ++ domainSeparator ++ hashStruct(message))`.
//! Member values of type `string` (and nested struct members) are passed in already hashed,
//! as `bytes32`. Other members are encoded with [abi::encode], so `bytes` and `T[]` members
//! take an offset word in the head and their content in the tail.

use crate::abi::{self, AbiType, AbiValue};
use crate::{keccak256, CodecError};
use cosmwasm_std::Uint256;

pub const EIP712_DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Eip712Domain {
    pub name: String,
    pub version: String,
    pub chain_id: Uint256,
    pub verifying_contract: [u8; 20],
}

impl Eip712Domain {
    pub fn separator(&self) -> [u8; 32] {
        let mut encoded = Vec::with_capacity(5 * abi::WORD);
        encoded.extend(keccak256(EIP712_DOMAIN_TYPE.as_bytes()));
        encoded.extend(keccak256(self.name.as_bytes()));
        encoded.extend(keccak256(self.version.as_bytes()));
        encoded.extend(self.chain_id.to_be_bytes());
        encoded.extend([0u8; 12]);
        encoded.extend(self.verifying_contract);
        keccak256(&encoded)
    }
}

/// ABI types of the primary struct members declared in `type_string`,
/// e.g. `Response(uint256 requestId,bytes result)` gives `[uint256, bytes]`.
/// `string` and referenced struct members map to `bytes32`, they are hashed before encoding.
pub fn member_types(type_string: &str) -> Result<Vec<AbiType>, CodecError> {
    let unsupported = || CodecError::UnsupportedType(type_string.to_string());
    let open = type_string.find('(').ok_or_else(unsupported)?;
    let close = type_string.find(')').ok_or_else(unsupported)?;
    if close < open {
        return Err(unsupported());
    }

    let members = &type_string[open + 1..close];
    if members.trim().is_empty() {
        return Ok(vec![]);
    }

    members
        .split(',')
        .map(|member| {
            let (ty, _name) = member.trim().rsplit_once(' ').ok_or_else(unsupported)?;
            let is_struct = ty.starts_with(|c: char| c.is_ascii_uppercase()) && !ty.contains('[');
            if ty == "string" || is_struct {
                Ok(AbiType::Bytes32)
            } else {
                ty.parse()
            }
        })
        .collect()
}

/// `keccak256(abi.encode(typeHash, fields...))`.
pub fn hash_struct(type_string: &str, fields: &[AbiValue]) -> Result<[u8; 32], CodecError> {
    let mut types = vec![AbiType::Bytes32];
    types.extend(member_types(type_string)?);

    let mut values = vec![AbiValue::FixedBytes(keccak256(type_string.as_bytes()))];
    values.extend_from_slice(fields);

    Ok(keccak256(&abi::encode(&types, &values)?))
}

pub fn typed_data_digest(domain_separator: &[u8; 32], struct_hash: &[u8; 32]) -> [u8; 32] {
    let mut message = Vec::with_capacity(66);
    message.extend([0x19, 0x01]);
    message.extend(domain_separator);
    message.extend(struct_hash);
    keccak256(&message)
}

/// The digest a signer signs for `fields` of the struct `type_string` under `domain`.
pub fn eip712_digest(
    domain: &Eip712Domain,
    type_string: &str,
    fields: &[AbiValue],
) -> Result<[u8; 32], CodecError> {
    let struct_hash = hash_struct(type_string, fields)?;
    Ok(typed_data_digest(&domain.separator(), &struct_hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex::parse_address;

    const RESPONSE_TYPE: &str =
        "Response(uint256 requestId,address[] reporters,bytes result,uint16 errorCode)";

    fn mail_domain() -> Eip712Domain {
        Eip712Domain {
            name: "Ether Mail".to_string(),
            version: "1".to_string(),
            chain_id: Uint256::one(),
            verifying_contract: parse_address("0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC")
                .unwrap(),
        }
    }

    fn person(name: &str, wallet: &str) -> AbiValue {
        let hash = hash_struct(
            "Person(string name,address wallet)",
            &[
                AbiValue::FixedBytes(keccak256(name.as_bytes())),
                AbiValue::Address(parse_address(wallet).unwrap()),
            ],
        )
        .unwrap();
        AbiValue::FixedBytes(hash)
    }

    #[test]
    fn test_mail_example() {
        let domain = mail_domain();
        assert_eq!(
            ::hex::encode(domain.separator()),
            "f2cee375fa42b42143804025fc449deafd50cc031ca257e0b194a650a912090f"
        );

        let mail_type =
            "Mail(Person from,Person to,string contents)Person(string name,address wallet)";
        let fields = [
            person("Cow", "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"),
            person("Bob", "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB"),
            AbiValue::FixedBytes(keccak256(b"Hello, Bob!")),
        ];

        let struct_hash = hash_struct(mail_type, &fields).unwrap();
        assert_eq!(
            ::hex::encode(struct_hash),
            "c52c0ee5d84264471806290a3f2c4cecfc5490626bf912d01f240d7a274b371e"
        );

        let digest = eip712_digest(&domain, mail_type, &fields).unwrap();
        assert_eq!(
            ::hex::encode(digest),
            "be609aee343fb3c4b28e1df9e632fca64fcfaede20f02e86244efddf30957bd2"
        );
    }

    fn xapi_domain() -> Eip712Domain {
        Eip712Domain {
            name: "XAPI".to_string(),
            version: "1".to_string(),
            chain_id: Uint256::one(),
            verifying_contract: [0xaa; 20],
        }
    }

    fn response_fields() -> Vec<AbiValue> {
        // chain 1, count 7
        let mut request_id = [0u8; 32];
        request_id[7] = 1;
        request_id[31] = 7;

        let result = abi::encode(&[AbiType::Bytes], &[AbiValue::Bytes(b"A".to_vec())]).unwrap();
        vec![
            AbiValue::Uint(Uint256::from_be_bytes(request_id)),
            AbiValue::Array(vec![
                AbiValue::Address([0x11; 20]),
                AbiValue::Address([0x22; 20]),
            ]),
            AbiValue::Bytes(result),
            AbiValue::uint(0u128),
        ]
    }

    #[test]
    fn test_response_digest() {
        let domain = xapi_domain();
        assert_eq!(
            ::hex::encode(domain.separator()),
            "ac73b61df4a34f695ffeb162a5d917e85c94e3e16b1699312175aba8b5484285"
        );

        let fields = response_fields();
        assert_eq!(
            ::hex::encode(hash_struct(RESPONSE_TYPE, &fields).unwrap()),
            "33df6d406956c63dc752dd307d0c4516eae34e92bfa7302269552759f7e08101"
        );

        let digest = eip712_digest(&domain, RESPONSE_TYPE, &fields).unwrap();
        assert_eq!(
            ::hex::encode(digest),
            "aee85e0b6dbaa894a7aefe11f6a9e240cb0eb6a6711f9ad99c5f8cb71f6500e9"
        );
        // same input, same digest
        assert_eq!(
            eip712_digest(&domain, RESPONSE_TYPE, &response_fields()).unwrap(),
            digest
        );
    }

    #[test]
    fn test_response_digest_changes_with_any_field() {
        let domain = xapi_domain();
        let digest = eip712_digest(&domain, RESPONSE_TYPE, &response_fields()).unwrap();

        // error code
        let mut fields = response_fields();
        fields[3] = AbiValue::uint(1u128);
        assert_ne!(eip712_digest(&domain, RESPONSE_TYPE, &fields).unwrap(), digest);

        // reporter order
        let mut fields = response_fields();
        fields[1] = AbiValue::Array(vec![
            AbiValue::Address([0x22; 20]),
            AbiValue::Address([0x11; 20]),
        ]);
        assert_ne!(eip712_digest(&domain, RESPONSE_TYPE, &fields).unwrap(), digest);

        // result
        let mut fields = response_fields();
        fields[2] = AbiValue::Bytes(b"B".to_vec());
        assert_ne!(eip712_digest(&domain, RESPONSE_TYPE, &fields).unwrap(), digest);

        // field order in the type string
        let swapped = "Response(uint256 requestId,address[] reporters,uint16 errorCode,bytes result)";
        let mut fields = response_fields();
        fields.swap(2, 3);
        assert_ne!(eip712_digest(&domain, swapped, &fields).unwrap(), digest);

        // domain
        let mut other = xapi_domain();
        other.chain_id = Uint256::from(2u128);
        assert_ne!(
            eip712_digest(&other, RESPONSE_TYPE, &response_fields()).unwrap(),
            digest
        );
        let mut other = xapi_domain();
        other.version = "2".to_string();
        assert_ne!(
            eip712_digest(&other, RESPONSE_TYPE, &response_fields()).unwrap(),
            digest
        );
    }

    #[test]
    fn test_member_types() {
        assert_eq!(
            member_types(RESPONSE_TYPE).unwrap(),
            vec![
                AbiType::Uint256,
                AbiType::Array(Box::new(AbiType::Address)),
                AbiType::Bytes,
                AbiType::Uint16,
            ]
        );
        assert_eq!(
            member_types("AggregatorConfig(string aggregator,uint256 reportersFee,uint256 publishFee,address rewardAddress,uint256 version)").unwrap(),
            vec![
                AbiType::Bytes32,
                AbiType::Uint256,
                AbiType::Uint256,
                AbiType::Address,
                AbiType::Uint256,
            ]
        );
        assert_eq!(member_types("Empty()").unwrap(), vec![]);
        assert!(member_types("Broken").is_err());
        assert_eq!(
            member_types("Bad(int8 value)"),
            Err(CodecError::UnsupportedType("int8".to_string()))
        );
    }

    #[test]
    fn test_field_count_mismatch() {
        let err = hash_struct(RESPONSE_TYPE, &response_fields()[..3]).unwrap_err();
        assert!(matches!(err, CodecError::TypeMismatch { .. }));
    }
}
