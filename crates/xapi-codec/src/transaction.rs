//! EIP-1559 (type `0x02`) transactions and the signature shape returned by the threshold signer.

use crate::hex::{decode_fixed, decode_hex};
use crate::rlp::{self, trim_leading_zeros, RlpItem};
use crate::{keccak256, CodecError};

pub const EIP1559_TX_TYPE: u8 = 0x02;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessListItem {
    pub address: [u8; 20],
    pub storage_keys: Vec<[u8; 32]>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Eip1559Transaction {
    pub chain_id: u64,
    pub nonce: u64,
    pub max_priority_fee_per_gas: u128,
    pub max_fee_per_gas: u128,
    pub gas_limit: u128,
    pub to: [u8; 20],
    pub value: u128,
    pub data: Vec<u8>,
    pub access_list: Vec<AccessListItem>,
}

impl Eip1559Transaction {
    /// `[chainId, nonce, maxPriorityFeePerGas, maxFeePerGas, gasLimit, to, value, data, accessList]`
    fn fields(&self) -> Vec<RlpItem> {
        let access_list = self
            .access_list
            .iter()
            .map(|item| {
                RlpItem::list(vec![
                    RlpItem::bytes(item.address.to_vec()),
                    RlpItem::list(
                        item.storage_keys
                            .iter()
                            .map(|key| RlpItem::bytes(key.to_vec()))
                            .collect(),
                    ),
                ])
            })
            .collect();

        vec![
            RlpItem::uint(self.chain_id.into()),
            RlpItem::uint(self.nonce.into()),
            RlpItem::uint(self.max_priority_fee_per_gas),
            RlpItem::uint(self.max_fee_per_gas),
            RlpItem::uint(self.gas_limit),
            RlpItem::bytes(self.to.to_vec()),
            RlpItem::uint(self.value),
            RlpItem::bytes(self.data.clone()),
            RlpItem::list(access_list),
        ]
    }

    /// `0x02 ++ rlp(fields)`, the message whose hash gets signed.
    pub fn signing_payload(&self) -> Vec<u8> {
        envelope(RlpItem::list(self.fields()))
    }

    pub fn signing_digest(&self) -> [u8; 32] {
        keccak256(&self.signing_payload())
    }

    /// The raw transaction ready to broadcast: `0x02 ++ rlp(fields ++ [yParity, r, s])`.
    pub fn encode_signed(&self, signature: &Signature) -> Vec<u8> {
        let mut fields = self.fields();
        fields.push(RlpItem::uint(signature.recovery_id.into()));
        fields.push(RlpItem::bytes(trim_leading_zeros(&signature.r).to_vec()));
        fields.push(RlpItem::bytes(trim_leading_zeros(&signature.s).to_vec()));
        envelope(RlpItem::list(fields))
    }
}

fn envelope(item: RlpItem) -> Vec<u8> {
    let mut out = vec![EIP1559_TX_TYPE];
    out.extend(rlp::encode(&item));
    out
}

/// A secp256k1 signature split into `r`, `s` and the recovery id (0 or 1).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub recovery_id: u8,
}

impl Signature {
    /// Build from the signer's answer, `big_r` is the compressed point `R`
    /// (33 bytes, `02`/`03` prefix) and its x coordinate is `r`.
    pub fn from_mpc(big_r: &str, s: &str, recovery_id: u8) -> Result<Self, CodecError> {
        let big_r = decode_hex(big_r)?;
        if big_r.len() != 33 {
            return Err(CodecError::InvalidLength {
                expected: 33,
                actual: big_r.len(),
            });
        }
        if big_r[0] != 0x02 && big_r[0] != 0x03 {
            return Err(CodecError::invalid_signature(
                "big_r is not a compressed point",
            ));
        }
        if recovery_id > 1 {
            return Err(CodecError::invalid_signature(format!(
                "recovery id must be 0 or 1, got {}",
                recovery_id
            )));
        }

        let mut r = [0u8; 32];
        r.copy_from_slice(&big_r[1..]);
        Ok(Signature {
            r,
            s: decode_fixed::<32>(s)?,
            recovery_id,
        })
    }

    /// `v` as `ecrecover` expects it.
    pub fn v(&self) -> u8 {
        self.recovery_id + 27
    }

    /// `r ++ s ++ v`, 65 bytes.
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = self.v();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{encode_function_call, AbiValue};

    fn transfer_tx() -> Eip1559Transaction {
        Eip1559Transaction {
            chain_id: 1,
            nonce: 0,
            max_priority_fee_per_gas: 1_000_000_000,
            max_fee_per_gas: 2_000_000_000,
            gas_limit: 21_000,
            to: [0x11; 20],
            value: 0,
            data: vec![],
            access_list: vec![],
        }
    }

    #[test]
    fn test_signing_payload() {
        let tx = transfer_tx();
        assert_eq!(
            ::hex::encode(tx.signing_payload()),
            "02e70180843b9aca0084773594008252089411111111111111111111111111111111111111118080c0"
        );
        assert_eq!(
            ::hex::encode(tx.signing_digest()),
            "5ebbf2fc1d9e7b5afb163c5221a8d5506658e41c371f7b14a08ee960deed30cc"
        );
    }

    #[test]
    fn test_signing_payload_with_call_and_access_list() {
        let data = encode_function_call(
            "transfer(address,uint256)",
            &[AbiValue::Address([0x22; 20]), AbiValue::uint(1000u128)],
        )
        .unwrap();

        let tx = Eip1559Transaction {
            chain_id: 11_155_111,
            nonce: 42,
            max_priority_fee_per_gas: 1_500_000_000,
            max_fee_per_gas: 30_000_000_000,
            gas_limit: 200_000,
            to: [0x11; 20],
            value: 1_000_000_000_000_000_000,
            data,
            access_list: vec![AccessListItem {
                address: [0x33; 20],
                storage_keys: vec![[0x44; 32]],
            }],
        };

        assert_eq!(
            ::hex::encode(tx.signing_payload()),
            "02f8b283aa36a72a8459682f008506fc23ac0083030d40941111111111111111111111111111111111111111880de0b6b3a7640000b844a9059cbb000000000000000000000000222222222222222222222222222222222222222200000000000000000000000000000000000000000000000000000000000003e8f838f7943333333333333333333333333333333333333333e1a04444444444444444444444444444444444444444444444444444444444444444"
        );
        assert_eq!(
            ::hex::encode(tx.signing_digest()),
            "5def77beb1524ca9e13caca66c1a91a616f3bc8b50353fd9668b72088a64c4e4"
        );
    }

    #[test]
    fn test_encode_signed() {
        let mut r = [0xab; 32];
        r[0] = 0x00;
        r[1] = 0x01;
        let signature = Signature {
            r,
            s: [0xcd; 32],
            recovery_id: 1,
        };

        // leading zero of r is dropped
        assert_eq!(
            ::hex::encode(transfer_tx().encode_signed(&signature)),
            "02f8690180843b9aca0084773594008252089411111111111111111111111111111111111111118080c0019f01ababababababababababababababababababababababababababababababa0cdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcd"
        );
    }

    #[test]
    fn test_signature_from_mpc() {
        let big_r = format!("03{}", "ab".repeat(32));
        let s = "cd".repeat(32);
        let signature = Signature::from_mpc(&big_r, &s, 1).unwrap();

        assert_eq!(signature.r, [0xab; 32]);
        assert_eq!(signature.s, [0xcd; 32]);
        assert_eq!(signature.v(), 28);

        let bytes = signature.to_bytes();
        assert_eq!(bytes.len(), 65);
        assert_eq!(&bytes[..32], &[0xab; 32]);
        assert_eq!(&bytes[32..64], &[0xcd; 32]);
        assert_eq!(bytes[64], 28);

        let signature = Signature::from_mpc(&format!("0x02{}", "ab".repeat(32)), &s, 0).unwrap();
        assert_eq!(signature.v(), 27);
    }

    #[test]
    fn test_signature_from_mpc_invalid() {
        let s = "cd".repeat(32);

        let err = Signature::from_mpc(&"ab".repeat(32), &s, 0).unwrap_err();
        assert_eq!(
            err,
            CodecError::InvalidLength {
                expected: 33,
                actual: 32
            }
        );

        let err = Signature::from_mpc(&format!("04{}", "ab".repeat(32)), &s, 0).unwrap_err();
        assert!(matches!(err, CodecError::InvalidSignature { .. }));

        let err = Signature::from_mpc(&format!("02{}", "ab".repeat(32)), &s, 2).unwrap_err();
        assert!(matches!(err, CodecError::InvalidSignature { .. }));

        let err = Signature::from_mpc(&format!("02{}", "ab".repeat(32)), "cdcd", 0).unwrap_err();
        assert!(matches!(err, CodecError::InvalidLength { .. }));

        let err = Signature::from_mpc("02zz", &s, 0).unwrap_err();
        assert!(matches!(err, CodecError::InvalidHex { .. }));
    }
}
