use crate::msg::{Answer, DataSource};
use crate::publish::UnsignedRelay;
use cosmwasm_schema::cw_serde;
use cosmwasm_std::{
    Addr, HexBinary, StdError, StdResult, Storage, Timestamp, Uint128, Uint256,
};
use cw_storage_plus::{Item, Key, KeyDeserialize, Map, Prefixer, PrimaryKey};
use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A request id as the destination contract encodes it: `chainId << 192 | count`.
/// Kept as its 32 big-endian bytes so it can be borrowed as a storage key,
/// on the wire it is a decimal `Uint256` string.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(from = "Uint256", into = "Uint256")]
pub struct RequestId([u8; 32]);

impl RequestId {
    pub fn new(chain_id: u64, count: u128) -> Self {
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&chain_id.to_be_bytes());
        bytes[16..].copy_from_slice(&count.to_be_bytes());
        RequestId(bytes)
    }

    /// The destination chain, the top 64 bits of the id.
    pub fn chain_id(&self) -> u64 {
        let mut chain_id = [0u8; 8];
        chain_id.copy_from_slice(&self.0[..8]);
        u64::from_be_bytes(chain_id)
    }

    pub fn to_uint256(&self) -> Uint256 {
        Uint256::from_be_bytes(self.0)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uint256())
    }
}

impl From<Uint256> for RequestId {
    fn from(value: Uint256) -> Self {
        Self(value.to_be_bytes())
    }
}

impl From<RequestId> for Uint256 {
    fn from(value: RequestId) -> Self {
        value.to_uint256()
    }
}

impl JsonSchema for RequestId {
    fn schema_name() -> String {
        "RequestId".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        Uint256::json_schema(gen)
    }
}

impl PrimaryKey<'_> for RequestId {
    type Prefix = ();
    type SubPrefix = ();
    type Suffix = Self;
    type SuperSuffix = Self;

    fn key(&self) -> Vec<Key> {
        vec![Key::Ref(self.0.as_slice())]
    }
}

impl Prefixer<'_> for RequestId {
    fn prefix(&self) -> Vec<Key> {
        vec![Key::Ref(self.0.as_slice())]
    }
}

impl KeyDeserialize for RequestId {
    type Output = Self;

    const KEY_ELEMS: u16 = 1;

    #[inline(always)]
    fn from_vec(value: Vec<u8>) -> StdResult<Self::Output> {
        let bytes = <[u8; 32]>::try_from(value.as_slice())
            .map_err(|_| StdError::generic_err("RequestId key must be 32 bytes"))?;
        Ok(RequestId(bytes))
    }
}

#[cw_serde]
#[derive(Copy)]
pub enum ResponseStatus {
    /// Collecting reports.
    Fetching = 0,
    /// A result was agreed on, ready to publish.
    Aggregated = 1,
    /// Signed and relayed at least once.
    Published = 2,
}

impl From<ResponseStatus> for u8 {
    fn from(value: ResponseStatus) -> u8 {
        value as u8
    }
}

impl TryFrom<u8> for ResponseStatus {
    type Error = StdError;

    fn try_from(value: u8) -> Result<Self, StdError> {
        match value {
            0 => Ok(ResponseStatus::Fetching),
            1 => Ok(ResponseStatus::Aggregated),
            2 => Ok(ResponseStatus::Published),
            _ => Err(StdError::generic_err("ResponseStatus out of range")),
        }
    }
}

impl PartialEq<u8> for ResponseStatus {
    fn eq(&self, other: &u8) -> bool {
        *other == u8::from(*self)
    }
}

impl PartialEq<ResponseStatus> for u8 {
    fn eq(&self, other: &ResponseStatus) -> bool {
        *self == u8::from(*other)
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseStatus::Fetching => write!(f, "FETCHING"),
            ResponseStatus::Aggregated => write!(f, "AGGREGATED"),
            ResponseStatus::Published => write!(f, "PUBLISHED"),
        }
    }
}

#[cw_serde]
pub struct Report {
    pub request_id: RequestId,
    pub reporter: Addr,
    pub timestamp: Timestamp,
    /// Lowercase `0x` address on the destination chain.
    pub reward_address: String,
    pub answers: Vec<Answer>,
}

/// The aggregated outcome of a request, created by its first report.
#[cw_serde]
pub struct OracleResponse {
    pub request_id: RequestId,
    pub chain_id: u64,
    pub valid_reporters: Vec<Addr>,
    /// Same order as `valid_reporters`.
    pub reporter_reward_addresses: Vec<String>,
    pub started_at: Timestamp,
    pub updated_at: Timestamp,
    /// See [ResponseStatus], only ever moves forward.
    pub status: u8,
    /// `abi.encode(bytes)` of the agreed value.
    pub result: HexBinary,
    /// 0 when the reporters agreed on a value, 1 when enough of them hit a data source error.
    pub error_code: u16,
}

impl OracleResponse {
    pub fn new(request_id: RequestId, now: Timestamp) -> Self {
        Self {
            request_id,
            chain_id: request_id.chain_id(),
            valid_reporters: vec![],
            reporter_reward_addresses: vec![],
            started_at: now,
            updated_at: now,
            status: ResponseStatus::Fetching.into(),
            result: HexBinary::default(),
            error_code: 0,
        }
    }

    pub fn status(&self) -> StdResult<ResponseStatus> {
        ResponseStatus::try_from(self.status)
    }
}

#[cw_serde]
pub struct ReporterRequired {
    /// Stake-eligible reporters needed before a result can be agreed on.
    pub quorum: u32,
    /// Reporters that must agree on the same value.
    pub threshold: u32,
}

#[cw_serde]
pub struct MpcConfig {
    pub contract: Addr,
    pub key_version: u32,
}

/// Storage deposits are paid in `denom` at `price_per_byte`.
#[cw_serde]
pub struct DepositConfig {
    pub denom: String,
    pub price_per_byte: Uint128,
}

#[cw_serde]
pub enum SigningMode {
    /// EIP-712 `Response` struct, submitted by relayers with the signature.
    TypedData,
    /// A signed EIP-1559 transaction calling `fulfill` on the XAPI contract.
    Transaction {
        gas_limit: Uint128,
        max_fee_per_gas: Uint128,
        max_priority_fee_per_gas: Uint128,
    },
}

#[cw_serde]
pub struct PublishChainConfig {
    pub chain_id: u64,
    /// XAPI contract on the destination chain, lowercase `0x` address.
    pub xapi_address: String,
    pub reporters_fee: Uint256,
    pub publish_fee: Uint256,
    /// Receives the publish fee on the destination chain, lowercase `0x` address.
    pub reward_address: String,
    pub signing_mode: SigningMode,
    /// Block time in nanoseconds of the last update, strictly increasing.
    pub version: u64,
}

/// What an outbound hop captured when it was dispatched.
#[cw_serde]
pub enum Hop {
    Aggregate {
        request_id: RequestId,
    },
    Publish {
        request_id: RequestId,
        chain_id: u64,
        digest: HexBinary,
        relay: UnsignedRelay,
        /// Set in transaction mode.
        nonce: Option<u64>,
    },
    SyncConfig {
        chain_id: u64,
        version: u64,
        digest: HexBinary,
        relay: UnsignedRelay,
    },
}

/// Correlation record of an outbound hop, keyed by its callback id.
#[cw_serde]
pub struct PendingCallback {
    /// The only address allowed to answer.
    pub callee: Addr,
    pub hop: Hop,
}

pub const STAKING: Item<Addr> = Item::new("staking");
pub const MPC_CONFIG: Item<MpcConfig> = Item::new("mpc_config");
pub const REPORTER_REQUIRED: Item<ReporterRequired> = Item::new("reporter_required");
pub const MAX_RESULT_LENGTH: Item<u32> = Item::new("max_result_length");
pub const DEPOSIT_CONFIG: Item<DepositConfig> = Item::new("deposit_config");

pub const DATA_SOURCES: Map<&str, DataSource> = Map::new("data_sources");

pub const RESPONSES: Map<RequestId, OracleResponse> = Map::new("responses");

/// Key = (RequestId, Reporter)
pub const REPORTS: Map<(RequestId, &Addr), Report> = Map::new("reports");

/// Reporters of a request in the order they reported.
pub const REPORTERS: Map<RequestId, Vec<Addr>> = Map::new("reporters");

pub const PUBLISH_CHAIN_CONFIGS: Map<u64, PublishChainConfig> = Map::new("publish_chain_configs");

/// Next transaction nonce of the signer per destination chain, used in transaction mode.
pub const PUBLISH_NONCES: Map<u64, u64> = Map::new("publish_nonces");

pub const PENDING_CALLBACKS: Map<u64, PendingCallback> = Map::new("pending_callbacks");
pub const NEXT_CALLBACK_ID: Item<u64> = Item::new("next_callback_id");

pub fn get_response(storage: &dyn Storage, request_id: RequestId) -> StdResult<OracleResponse> {
    RESPONSES
        .may_load(storage, request_id)?
        .ok_or_else(|| StdError::not_found(format!("response {}", request_id)))
}

/// Reports of a request in the order they were submitted.
pub fn get_reports(storage: &dyn Storage, request_id: RequestId) -> StdResult<Vec<Report>> {
    let reporters = REPORTERS
        .may_load(storage, request_id)?
        .unwrap_or_default();
    reporters
        .iter()
        .map(|reporter| REPORTS.load(storage, (request_id, reporter)))
        .collect()
}

pub fn save_report(storage: &mut dyn Storage, report: &Report) -> StdResult<usize> {
    REPORTS.save(storage, (report.request_id, &report.reporter), report)?;

    let mut reporters = REPORTERS
        .may_load(storage, report.request_id)?
        .unwrap_or_default();
    reporters.push(report.reporter.clone());
    REPORTERS.save(storage, report.request_id, &reporters)?;
    Ok(reporters.len())
}

/// Store `pending` under a fresh callback id and return the id.
pub fn save_pending_callback(
    storage: &mut dyn Storage,
    pending: &PendingCallback,
) -> StdResult<u64> {
    let callback_id = NEXT_CALLBACK_ID.may_load(storage)?.unwrap_or_default();
    NEXT_CALLBACK_ID.save(storage, &(callback_id + 1))?;
    PENDING_CALLBACKS.save(storage, callback_id, pending)?;
    Ok(callback_id)
}

pub fn get_publish_nonce(storage: &dyn Storage, chain_id: u64) -> StdResult<u64> {
    Ok(PUBLISH_NONCES
        .may_load(storage, chain_id)?
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosmwasm_std::testing::mock_dependencies;
    use cosmwasm_std::Order;

    #[test]
    fn test_request_id_chain_id() {
        let request_id = RequestId::new(11_155_111, 42);
        assert_eq!(request_id.chain_id(), 11_155_111);

        // chainId << 192 | count
        let expected = Uint256::from(11_155_111u128) << 192;
        assert_eq!(request_id.to_uint256(), expected + Uint256::from(42u128));

        assert_eq!(RequestId::from(Uint256::from(42u128)).chain_id(), 0);
        assert_eq!(RequestId::from(Uint256::MAX).chain_id(), u64::MAX);
    }

    #[test]
    fn test_request_id_json() {
        let request_id = RequestId::new(1, 7);
        let expected = (Uint256::from(1u128) << 192) + Uint256::from(7u128);

        let json = cosmwasm_std::to_json_string(&request_id).unwrap();
        assert_eq!(json, format!("\"{}\"", expected));
        assert_eq!(request_id.to_string(), expected.to_string());

        let parsed: RequestId = cosmwasm_std::from_json(json).unwrap();
        assert_eq!(parsed, request_id);
    }

    #[test]
    fn test_request_id_key_order() {
        let mut deps = mock_dependencies();
        let now = Timestamp::from_seconds(1);

        let ids = [
            RequestId::new(2, 1),
            RequestId::new(1, 300),
            RequestId::new(1, 2),
        ];
        for id in ids {
            RESPONSES
                .save(&mut deps.storage, id, &OracleResponse::new(id, now))
                .unwrap();
        }

        let keys: Vec<RequestId> = RESPONSES
            .keys(&deps.storage, None, None, Order::Ascending)
            .collect::<StdResult<_>>()
            .unwrap();
        assert_eq!(
            keys,
            vec![
                RequestId::new(1, 2),
                RequestId::new(1, 300),
                RequestId::new(2, 1),
            ]
        );
    }

    #[test]
    fn test_response_status_partial_eq() {
        assert_eq!(ResponseStatus::Fetching, 0u8);
        assert_eq!(1u8, ResponseStatus::Aggregated);
        assert_ne!(ResponseStatus::Published, 1u8);
        assert_eq!(
            ResponseStatus::try_from(2u8).unwrap(),
            ResponseStatus::Published
        );
        assert!(ResponseStatus::try_from(3u8).is_err());
    }

    #[test]
    fn test_reports_keep_submission_order() {
        let mut deps = mock_dependencies();
        let request_id = RequestId::new(1, 1);
        let reporters = [
            deps.api.addr_make("zed"),
            deps.api.addr_make("amy"),
            deps.api.addr_make("kim"),
        ];

        for (i, reporter) in reporters.iter().enumerate() {
            let report = Report {
                request_id,
                reporter: reporter.clone(),
                timestamp: Timestamp::from_seconds(i as u64),
                reward_address: format!("0x{}", "11".repeat(20)),
                answers: vec![],
            };
            assert_eq!(save_report(&mut deps.storage, &report).unwrap(), i + 1);
        }

        let reports = get_reports(&deps.storage, request_id).unwrap();
        let order: Vec<Addr> = reports.into_iter().map(|r| r.reporter).collect();
        assert_eq!(order, reporters.to_vec());

        assert!(get_reports(&deps.storage, RequestId::new(1, 2))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_callback_ids_increment() {
        let mut deps = mock_dependencies();
        let pending = PendingCallback {
            callee: deps.api.addr_make("staking"),
            hop: Hop::Aggregate {
                request_id: RequestId::new(1, 1),
            },
        };

        assert_eq!(save_pending_callback(&mut deps.storage, &pending).unwrap(), 0);
        assert_eq!(save_pending_callback(&mut deps.storage, &pending).unwrap(), 1);
        assert_eq!(
            PENDING_CALLBACKS.load(&deps.storage, 1).unwrap(),
            pending
        );
    }
}
