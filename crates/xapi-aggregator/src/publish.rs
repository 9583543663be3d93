//! What gets signed for the destination chain and what relayers receive once it is signed.

use crate::state::{OracleResponse, PublishChainConfig, RequestId, SigningMode};
use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, HexBinary, Uint128, Uint256};
use xapi_codec::abi::{encode_function_call, AbiValue};
use xapi_codec::eip712::{eip712_digest, Eip712Domain};
use xapi_codec::hex::parse_address;
use xapi_codec::transaction::{Eip1559Transaction, Signature};
use xapi_codec::{keccak256, CodecError};

pub const DOMAIN_NAME: &str = "XAPI";
pub const DOMAIN_VERSION: &str = "1";

pub const RESPONSE_TYPE: &str =
    "Response(uint256 requestId,address[] reporters,bytes result,uint16 errorCode)";

pub const AGGREGATOR_CONFIG_TYPE: &str = "AggregatorConfig(string aggregator,uint256 reportersFee,uint256 publishFee,address rewardAddress,uint256 version)";

/// `fulfill(requestId, (reporters, result, errorCode))` on the XAPI contract.
pub const FULFILL_SIGNATURE: &str = "fulfill(uint256,(address[],bytes,uint16))";

#[cw_serde]
pub struct TypedDataDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: String,
}

impl TypedDataDomain {
    pub fn xapi(chain_id: u64, xapi_address: &str) -> Self {
        Self {
            name: DOMAIN_NAME.to_string(),
            version: DOMAIN_VERSION.to_string(),
            chain_id,
            verifying_contract: xapi_address.to_string(),
        }
    }

    fn to_eip712(&self) -> Result<Eip712Domain, CodecError> {
        Ok(Eip712Domain {
            name: self.name.clone(),
            version: self.version.clone(),
            chain_id: Uint256::from(self.chain_id),
            verifying_contract: parse_address(&self.verifying_contract)?,
        })
    }
}

/// Struct members as the destination contract declares them.
#[cw_serde]
pub enum TypedMessage {
    Response {
        request_id: RequestId,
        reporters: Vec<String>,
        result: HexBinary,
        error_code: u16,
    },
    AggregatorConfig {
        aggregator: String,
        reporters_fee: Uint256,
        publish_fee: Uint256,
        reward_address: String,
        version: u64,
    },
}

impl TypedMessage {
    pub fn type_string(&self) -> &'static str {
        match self {
            TypedMessage::Response { .. } => RESPONSE_TYPE,
            TypedMessage::AggregatorConfig { .. } => AGGREGATOR_CONFIG_TYPE,
        }
    }

    fn fields(&self) -> Result<Vec<AbiValue>, CodecError> {
        match self {
            TypedMessage::Response {
                request_id,
                reporters,
                result,
                error_code,
            } => Ok(vec![
                AbiValue::Uint(request_id.to_uint256()),
                addresses(reporters)?,
                AbiValue::Bytes(result.to_vec()),
                AbiValue::uint(*error_code as u128),
            ]),
            TypedMessage::AggregatorConfig {
                aggregator,
                reporters_fee,
                publish_fee,
                reward_address,
                version,
            } => Ok(vec![
                AbiValue::FixedBytes(keccak256(aggregator.as_bytes())),
                AbiValue::Uint(*reporters_fee),
                AbiValue::Uint(*publish_fee),
                AbiValue::Address(parse_address(reward_address)?),
                AbiValue::uint(*version as u128),
            ]),
        }
    }
}

fn addresses(values: &[String]) -> Result<AbiValue, CodecError> {
    let addresses = values
        .iter()
        .map(|value| parse_address(value).map(AbiValue::Address))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(AbiValue::Array(addresses))
}

/// Everything needed to rebuild the signed digest, captured when a signature is requested.
#[cw_serde]
pub enum UnsignedRelay {
    TypedData {
        domain: TypedDataDomain,
        message: TypedMessage,
    },
    Transaction {
        chain_id: u64,
        nonce: u64,
        to: String,
        data: HexBinary,
        gas_limit: Uint128,
        max_fee_per_gas: Uint128,
        max_priority_fee_per_gas: Uint128,
    },
}

impl UnsignedRelay {
    /// The 32 bytes handed to the signer.
    pub fn digest(&self) -> Result<[u8; 32], CodecError> {
        match self {
            UnsignedRelay::TypedData { domain, message } => eip712_digest(
                &domain.to_eip712()?,
                message.type_string(),
                &message.fields()?,
            ),
            UnsignedRelay::Transaction { .. } => Ok(self.transaction()?.signing_digest()),
        }
    }

    fn transaction(&self) -> Result<Eip1559Transaction, CodecError> {
        match self {
            UnsignedRelay::Transaction {
                chain_id,
                nonce,
                to,
                data,
                gas_limit,
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => Ok(Eip1559Transaction {
                chain_id: *chain_id,
                nonce: *nonce,
                max_priority_fee_per_gas: max_priority_fee_per_gas.u128(),
                max_fee_per_gas: max_fee_per_gas.u128(),
                gas_limit: gas_limit.u128(),
                to: parse_address(to)?,
                value: 0,
                data: data.to_vec(),
                access_list: vec![],
            }),
            UnsignedRelay::TypedData { .. } => {
                Err(CodecError::type_mismatch("transaction relay"))
            }
        }
    }

    /// Attach `signature`, producing what relayers submit to the destination chain.
    pub fn sign(&self, signature: &Signature) -> Result<RelayPayload, CodecError> {
        let signature_bytes = HexBinary::from(signature.to_bytes().as_slice());
        match self {
            UnsignedRelay::TypedData { domain, message } => Ok(RelayPayload::TypedData {
                domain: domain.clone(),
                type_string: message.type_string().to_string(),
                message: message.clone(),
                signature: signature_bytes,
            }),
            UnsignedRelay::Transaction {
                chain_id, nonce, ..
            } => Ok(RelayPayload::Transaction {
                chain_id: *chain_id,
                nonce: *nonce,
                raw_transaction: HexBinary::from(self.transaction()?.encode_signed(signature)),
                signature: signature_bytes,
            }),
        }
    }
}

/// Carried by the `Published` and `ConfigSynced` events as JSON.
#[cw_serde]
pub enum RelayPayload {
    /// Submit `message` with `signature` to the contract named in `domain`.
    TypedData {
        domain: TypedDataDomain,
        type_string: String,
        message: TypedMessage,
        /// `r ++ s ++ v`
        signature: HexBinary,
    },
    /// Broadcast `raw_transaction` as is.
    Transaction {
        chain_id: u64,
        nonce: u64,
        raw_transaction: HexBinary,
        signature: HexBinary,
    },
}

/// The relay for an aggregated `response` under the chain's signing mode.
/// `nonce` is only used in transaction mode.
pub fn response_relay(
    response: &OracleResponse,
    config: &PublishChainConfig,
    nonce: u64,
) -> Result<UnsignedRelay, CodecError> {
    match &config.signing_mode {
        SigningMode::TypedData => Ok(UnsignedRelay::TypedData {
            domain: TypedDataDomain::xapi(config.chain_id, &config.xapi_address),
            message: TypedMessage::Response {
                request_id: response.request_id,
                reporters: response.reporter_reward_addresses.clone(),
                result: response.result.clone(),
                error_code: response.error_code,
            },
        }),
        SigningMode::Transaction {
            gas_limit,
            max_fee_per_gas,
            max_priority_fee_per_gas,
        } => {
            let data = encode_function_call(
                FULFILL_SIGNATURE,
                &[
                    AbiValue::Uint(response.request_id.to_uint256()),
                    AbiValue::Tuple(vec![
                        addresses(&response.reporter_reward_addresses)?,
                        AbiValue::Bytes(response.result.to_vec()),
                        AbiValue::uint(response.error_code as u128),
                    ]),
                ],
            )?;
            Ok(UnsignedRelay::Transaction {
                chain_id: config.chain_id,
                nonce,
                to: config.xapi_address.clone(),
                data: HexBinary::from(data),
                gas_limit: *gas_limit,
                max_fee_per_gas: *max_fee_per_gas,
                max_priority_fee_per_gas: *max_priority_fee_per_gas,
            })
        }
    }
}

/// The `AggregatorConfig` struct the destination contract accepts from `aggregator`,
/// always signed as typed data.
pub fn config_relay(aggregator: &Addr, config: &PublishChainConfig) -> UnsignedRelay {
    UnsignedRelay::TypedData {
        domain: TypedDataDomain::xapi(config.chain_id, &config.xapi_address),
        message: TypedMessage::AggregatorConfig {
            aggregator: aggregator.to_string(),
            reporters_fee: config.reporters_fee,
            publish_fee: config.publish_fee,
            reward_address: config.reward_address.clone(),
            version: config.version,
        },
    }
}
