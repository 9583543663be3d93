use crate::mpc::SignatureCallbackMsg;
use crate::state::{
    DepositConfig, MpcConfig, OracleResponse, PendingCallback, PublishChainConfig, Report,
    ReporterRequired, RequestId, SigningMode,
};
use cosmwasm_schema::{cw_serde, QueryResponses};
use cosmwasm_std::{Addr, Coin, Uint256};
use xapi_staking::msg::TopStakedCallbackMsg;

#[cw_serde]
pub struct MigrateMsg {}

#[cw_serde]
pub struct InstantiateMsg {
    pub owner: String,
    /// The staking contract whose top stakers are eligible reporters.
    pub staking: String,
    pub mpc: MpcConfigMsg,
    pub reporter_required: ReporterRequired,
    /// Upper bound in bytes of every `Answer.result`.
    pub max_result_length: u32,
    pub deposit: DepositConfig,
}

#[cw_serde]
pub struct MpcConfigMsg {
    /// The threshold-signer contract.
    pub contract: String,
    pub key_version: u32,
}

#[cw_serde]
pub enum HttpMethod {
    Get,
    Post,
}

/// Where a reporter injects a secret into the request it sends to a data source.
#[cw_serde]
pub struct Auth {
    pub place_path: String,
    pub value_path: String,
}

/// An HTTP endpoint reporters fetch and extract results from.
#[cw_serde]
pub struct DataSource {
    /// Unique, 1 to 64 bytes.
    pub name: String,
    /// `http://` or `https://`.
    pub url: String,
    pub method: HttpMethod,
    /// JSON object of string values.
    pub headers: Option<String>,
    /// JSON object.
    pub body_json: Option<String>,
    /// JSON object.
    pub query_json: Option<String>,
    /// Extraction paths applied in order to the fetched document.
    pub result_paths: Vec<String>,
    pub auth: Option<Auth>,
}

/// A reporter's result for one data source.
#[cw_serde]
pub struct Answer {
    pub data_source_name: String,
    pub result: String,
    /// Set when the reporter could not fetch or extract a result.
    pub error: Option<String>,
}

#[cw_serde]
pub struct PublishChainConfigMsg {
    pub chain_id: u64,
    /// XAPI contract on the destination chain, `0x` address.
    pub xapi_address: String,
    pub reporters_fee: Uint256,
    pub publish_fee: Uint256,
    /// `0x` address that receives the publish fee on the destination chain.
    pub reward_address: String,
    /// Defaults to [SigningMode::TypedData].
    pub signing_mode: Option<SigningMode>,
}

#[cw_serde]
pub enum ExecuteMsg {
    /// Register a data source, a deposit in the configured denom covering its storage
    /// must be attached. Any surplus is refunded.
    /// Only the `owner` can call this message.
    AddDataSource(DataSource),

    /// Only the `owner` can call this message.
    RemoveDataSource { name: String },

    /// Submit the sender's answers for `request_id`. The attached deposit must equal
    /// [QueryMsg::ReportDeposit] exactly. Reaching the reporter threshold
    /// starts aggregation.
    Report {
        request_id: RequestId,
        answers: Vec<Answer>,
        /// Destination-chain address that receives the reporter reward.
        reward_address: String,
    },

    /// Request a signature over an aggregated response and relay it once signed.
    /// Can be repeated, e.g. after the signer failed.
    Publish { request_id: RequestId },

    /// Sign the chain's current publish config for the destination contract.
    /// Only the `owner` can call this message.
    SyncPublishConfig { chain_id: u64 },

    /// Only the `owner` can call this message.
    SetPublishChainConfig(PublishChainConfigMsg),

    /// Only the `owner` can call this message.
    SetMpcConfig(MpcConfigMsg),

    /// `quorum >= threshold > 0`.
    /// Only the `owner` can call this message.
    SetReporterRequired(ReporterRequired),

    /// Only the `owner` can call this message.
    SetStaking { staking: String },

    /// Only the `owner` can call this message.
    SetMaxResultLength { max_result_length: u32 },

    /// Only the `owner` can call this message.
    SetDepositConfig(DepositConfig),

    /// Answer to the top-staked hop, only accepted from the staking contract.
    TopStakedCallback(TopStakedCallbackMsg),

    /// Answer to a signing hop, only accepted from the MPC contract.
    SignatureCallback(SignatureCallbackMsg),

    /// ExecuteMsg TransferOwnership
    /// See [`xapi_library::ownership::transfer_ownership`] for more information on this field
    TransferOwnership { new_owner: String },
}

#[cw_serde]
#[derive(QueryResponses)]
pub enum QueryMsg {
    #[returns(DataSource)]
    DataSource { name: String },

    #[returns(DataSourcesResponse)]
    DataSources {
        start_after: Option<String>,
        limit: Option<u32>,
    },

    #[returns(OracleResponse)]
    Response { request_id: RequestId },

    #[returns(Report)]
    Report {
        request_id: RequestId,
        reporter: String,
    },

    /// Reports in submission order.
    #[returns(ReportsResponse)]
    Reports { request_id: RequestId },

    #[returns(ReporterRequired)]
    ReporterRequired {},

    #[returns(PublishChainConfig)]
    PublishChainConfig { chain_id: u64 },

    #[returns(MpcConfig)]
    MpcConfig {},

    #[returns(Addr)]
    Staking {},

    #[returns(u32)]
    MaxResultLength {},

    #[returns(DepositConfig)]
    DepositConfig {},

    /// The exact deposit [ExecuteMsg::Report] requires.
    #[returns(Coin)]
    ReportDeposit {
        request_id: RequestId,
        answers: Vec<Answer>,
        reward_address: String,
        reporter: String,
    },

    /// The minimum deposit [ExecuteMsg::AddDataSource] requires.
    #[returns(Coin)]
    DataSourceDeposit { data_source: DataSource },

    #[returns(PendingCallback)]
    PendingCallback { callback_id: u64 },
}

#[cw_serde]
pub struct DataSourcesResponse(pub Vec<DataSource>);

#[cw_serde]
pub struct ReportsResponse(pub Vec<Report>);
