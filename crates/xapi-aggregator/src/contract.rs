#[cfg(not(feature = "library"))]
use cosmwasm_std::entry_point;

use crate::error::AggregatorError;
use crate::msg::{ExecuteMsg, InstantiateMsg, MigrateMsg, QueryMsg};
use crate::state::{
    DepositConfig, MpcConfig, ReporterRequired, DEPOSIT_CONFIG, MAX_RESULT_LENGTH, MPC_CONFIG,
    NEXT_CALLBACK_ID, REPORTER_REQUIRED, STAKING,
};
use cosmwasm_std::{
    to_json_binary, Binary, Deps, DepsMut, Env, MessageInfo, Reply, Response, StdError,
    StdResult,
};
use cw2::set_contract_version;
use xapi_library::ownership;

const CONTRACT_NAME: &str = concat!("crates.io:", env!("CARGO_PKG_NAME"));
const CONTRACT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn instantiate(
    deps: DepsMut,
    _env: Env,
    _info: MessageInfo,
    msg: InstantiateMsg,
) -> Result<Response, AggregatorError> {
    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;

    let owner = deps.api.addr_validate(&msg.owner)?;
    ownership::set_owner(deps.storage, &owner)?;

    let staking = deps.api.addr_validate(&msg.staking)?;
    STAKING.save(deps.storage, &staking)?;

    let mpc = MpcConfig {
        contract: deps.api.addr_validate(&msg.mpc.contract)?,
        key_version: msg.mpc.key_version,
    };
    MPC_CONFIG.save(deps.storage, &mpc)?;

    validate_reporter_required(&msg.reporter_required)?;
    REPORTER_REQUIRED.save(deps.storage, &msg.reporter_required)?;

    validate_max_result_length(msg.max_result_length)?;
    MAX_RESULT_LENGTH.save(deps.storage, &msg.max_result_length)?;

    validate_deposit_config(&msg.deposit)?;
    DEPOSIT_CONFIG.save(deps.storage, &msg.deposit)?;

    NEXT_CALLBACK_ID.save(deps.storage, &0)?;

    Ok(Response::new()
        .add_attribute("method", "instantiate")
        .add_attribute("owner", owner)
        .add_attribute("staking", staking)
        .add_attribute("mpc", mpc.contract))
}

fn validate_reporter_required(required: &ReporterRequired) -> Result<(), AggregatorError> {
    if required.threshold == 0 || required.quorum < required.threshold {
        return Err(AggregatorError::invalid_config(
            "reporter_required must satisfy quorum >= threshold > 0",
        ));
    }
    Ok(())
}

fn validate_max_result_length(max_result_length: u32) -> Result<(), AggregatorError> {
    if max_result_length == 0 {
        return Err(AggregatorError::invalid_config(
            "max_result_length must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_deposit_config(deposit: &DepositConfig) -> Result<(), AggregatorError> {
    if deposit.denom.is_empty() {
        return Err(AggregatorError::invalid_config("deposit denom is empty"));
    }
    Ok(())
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn execute(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    msg: ExecuteMsg,
) -> Result<Response, AggregatorError> {
    match msg {
        ExecuteMsg::AddDataSource(data_source) => {
            execute::add_data_source(deps, env, info, data_source)
        }
        ExecuteMsg::RemoveDataSource { name } => {
            execute::remove_data_source(deps, env, info, name)
        }
        ExecuteMsg::Report {
            request_id,
            answers,
            reward_address,
        } => execute::report(deps, env, info, request_id, answers, reward_address),
        ExecuteMsg::Publish { request_id } => execute::publish(deps, env, info, request_id),
        ExecuteMsg::SyncPublishConfig { chain_id } => {
            execute::sync_publish_config(deps, env, info, chain_id)
        }
        ExecuteMsg::SetPublishChainConfig(config) => {
            execute::set_publish_chain_config(deps, env, info, config)
        }
        ExecuteMsg::SetMpcConfig(config) => execute::set_mpc_config(deps, env, info, config),
        ExecuteMsg::SetReporterRequired(required) => {
            execute::set_reporter_required(deps, env, info, required)
        }
        ExecuteMsg::SetStaking { staking } => {
            let staking = deps.api.addr_validate(&staking)?;
            execute::set_staking(deps, env, info, staking)
        }
        ExecuteMsg::SetMaxResultLength { max_result_length } => {
            execute::set_max_result_length(deps, env, info, max_result_length)
        }
        ExecuteMsg::SetDepositConfig(deposit) => {
            execute::set_deposit_config(deps, env, info, deposit)
        }
        ExecuteMsg::TopStakedCallback(callback) => {
            execute::top_staked_callback(deps, env, info, callback)
        }
        ExecuteMsg::SignatureCallback(callback) => {
            execute::signature_callback(deps, env, info, callback)
        }
        ExecuteMsg::TransferOwnership { new_owner } => {
            let new_owner = deps.api.addr_validate(&new_owner)?;
            ownership::transfer_ownership(deps.storage, &info.sender, new_owner)
                .map_err(AggregatorError::Ownership)
        }
    }
}

mod execute {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::deposit::deposit_required;
    use crate::mpc::{derivation_path, MpcExecuteMsg, SignOutcome, SignRequest, SignatureCallbackMsg};
    use crate::msg::{Answer, DataSource, MpcConfigMsg, PublishChainConfigMsg};
    use crate::publish::{config_relay, response_relay};
    use crate::state::{
        self, get_response, Hop, OracleResponse, PendingCallback, PublishChainConfig, Report,
        RequestId, ResponseStatus, SigningMode, DATA_SOURCES, PENDING_CALLBACKS,
        PUBLISH_CHAIN_CONFIGS, PUBLISH_NONCES, REPORTS, RESPONSES,
    };
    use cosmwasm_std::{
        coins, to_json_string, Addr, BankMsg, Coin, Event, HexBinary, Storage, SubMsg, WasmMsg,
    };
    use cw_utils::may_pay;
    use std::collections::BTreeMap;
    use xapi_codec::hex::{encode_hex, format_address, parse_address};
    use xapi_codec::transaction::Signature;
    use xapi_staking::msg::TopStakedCallbackMsg;

    const MAX_DATA_SOURCE_NAME_LENGTH: usize = 64;

    pub fn add_data_source(
        deps: DepsMut,
        _env: Env,
        info: MessageInfo,
        data_source: DataSource,
    ) -> Result<Response, AggregatorError> {
        ownership::assert_owner(deps.storage, &info.sender)?;

        validate_data_source(&data_source)?;
        if DATA_SOURCES.has(deps.storage, &data_source.name) {
            return Err(AggregatorError::DataSourceExists {
                name: data_source.name,
            });
        }

        let config = DEPOSIT_CONFIG.load(deps.storage)?;
        let required = deposit_required(&data_source, &config)?;
        let paid = may_pay(&info, &config.denom)?;
        if paid < required.amount {
            return Err(AggregatorError::InsufficientDeposit {
                required,
                paid: Coin::new(paid, config.denom),
            });
        }

        DATA_SOURCES.save(deps.storage, &data_source.name, &data_source)?;

        let mut response = Response::new().add_event(
            Event::new("DataSourceAdded")
                .add_attribute("name", &data_source.name)
                .add_attribute("url", &data_source.url)
                .add_attribute("deposit", required.to_string()),
        );

        let surplus = paid - required.amount;
        if !surplus.is_zero() {
            response = response.add_message(BankMsg::Send {
                to_address: info.sender.to_string(),
                amount: coins(surplus.u128(), &config.denom),
            });
        }

        Ok(response)
    }

    pub fn validate_data_source(data_source: &DataSource) -> Result<(), AggregatorError> {
        let name_length = data_source.name.len();
        if name_length == 0 || name_length > MAX_DATA_SOURCE_NAME_LENGTH {
            return Err(AggregatorError::invalid_data_source(format!(
                "name must be 1 to {} bytes",
                MAX_DATA_SOURCE_NAME_LENGTH
            )));
        }

        if !data_source.url.starts_with("http://") && !data_source.url.starts_with("https://") {
            return Err(AggregatorError::invalid_data_source(
                "url must start with http:// or https://",
            ));
        }

        if let Some(headers) = &data_source.headers {
            serde_json::from_str::<BTreeMap<String, String>>(headers).map_err(|_| {
                AggregatorError::invalid_data_source("headers must be a JSON object of strings")
            })?;
        }

        for (field, value) in [
            ("body_json", &data_source.body_json),
            ("query_json", &data_source.query_json),
        ] {
            if let Some(value) = value {
                // numbers are skipped lexically, no floats are parsed
                serde_json::from_str::<BTreeMap<String, serde::de::IgnoredAny>>(value).map_err(
                    |_| AggregatorError::invalid_data_source(format!("{} must be a JSON object", field)),
                )?;
            }
        }

        if data_source.result_paths.is_empty()
            || data_source.result_paths.iter().any(|path| path.is_empty())
        {
            return Err(AggregatorError::invalid_data_source(
                "result_paths must be non-empty paths",
            ));
        }

        if let Some(auth) = &data_source.auth {
            if auth.place_path.is_empty() || auth.value_path.is_empty() {
                return Err(AggregatorError::invalid_data_source(
                    "auth paths must not be empty",
                ));
            }
        }

        Ok(())
    }

    /// The storage deposit is kept, removing does not refund it.
    pub fn remove_data_source(
        deps: DepsMut,
        _env: Env,
        info: MessageInfo,
        name: String,
    ) -> Result<Response, AggregatorError> {
        ownership::assert_owner(deps.storage, &info.sender)?;

        if !DATA_SOURCES.has(deps.storage, &name) {
            return Err(AggregatorError::DataSourceNotFound { name });
        }
        DATA_SOURCES.remove(deps.storage, &name);

        Ok(Response::new().add_event(Event::new("DataSourceRemoved").add_attribute("name", name)))
    }

    /// Validate the answers and reward address of a report by `reporter`,
    /// the reward address is stored lowercase.
    pub fn new_report(
        deps: Deps,
        env: &Env,
        reporter: Addr,
        request_id: RequestId,
        answers: Vec<Answer>,
        reward_address: &str,
    ) -> Result<Report, AggregatorError> {
        if answers.is_empty() {
            return Err(AggregatorError::invalid_report("answers must not be empty"));
        }

        let max_result_length = MAX_RESULT_LENGTH.load(deps.storage)? as usize;
        let mut seen: Vec<&str> = Vec::with_capacity(answers.len());
        for answer in &answers {
            let name = answer.data_source_name.as_str();
            if answer.result.len() > max_result_length {
                return Err(AggregatorError::invalid_report(format!(
                    "result for {} exceeds {} bytes",
                    name, max_result_length
                )));
            }
            if !DATA_SOURCES.has(deps.storage, name) {
                return Err(AggregatorError::DataSourceNotFound {
                    name: name.to_string(),
                });
            }
            if seen.contains(&name) {
                return Err(AggregatorError::invalid_report(format!(
                    "more than one answer for {}",
                    name
                )));
            }
            seen.push(name);
        }

        let reward_address = format_address(&parse_address(reward_address)?);

        Ok(Report {
            request_id,
            reporter,
            timestamp: env.block.time,
            reward_address,
            answers,
        })
    }

    pub fn report(
        deps: DepsMut,
        env: Env,
        info: MessageInfo,
        request_id: RequestId,
        answers: Vec<Answer>,
        reward_address: String,
    ) -> Result<Response, AggregatorError> {
        let report = new_report(
            deps.as_ref(),
            &env,
            info.sender.clone(),
            request_id,
            answers,
            &reward_address,
        )?;

        let config = DEPOSIT_CONFIG.load(deps.storage)?;
        let required = deposit_required(&report, &config)?;
        let paid = may_pay(&info, &config.denom)?;
        if paid != required.amount {
            return Err(AggregatorError::DepositMismatch {
                required,
                paid: Coin::new(paid, config.denom),
            });
        }

        let mut response = RESPONSES
            .may_load(deps.storage, request_id)?
            .unwrap_or_else(|| OracleResponse::new(request_id, env.block.time));

        let status = response.status()?;
        if status != ResponseStatus::Fetching {
            return Err(AggregatorError::InvalidStatus {
                request_id,
                expected: ResponseStatus::Fetching.to_string(),
                actual: status,
            });
        }

        if REPORTS.has(deps.storage, (request_id, &info.sender)) {
            return Err(AggregatorError::DuplicateReport {
                request_id,
                reporter: info.sender.to_string(),
            });
        }

        let count = state::save_report(deps.storage, &report)?;
        response.updated_at = env.block.time;
        RESPONSES.save(deps.storage, request_id, &response)?;

        let mut res = Response::new().add_event(
            Event::new("Reported")
                .add_attribute("request_id", request_id.to_string())
                .add_attribute("chain_id", response.chain_id.to_string())
                .add_attribute("reporter", info.sender.as_str())
                .add_attribute("reward_address", &report.reward_address)
                .add_attribute("answers", report.answers.len().to_string())
                .add_attribute("reports", count.to_string()),
        );

        let required = REPORTER_REQUIRED.load(deps.storage)?;
        if count >= required.threshold as usize {
            let (callback_id, sub_msg) =
                new_top_staked_request(deps.storage, request_id, required.quorum)?;
            res = res.add_submessage(sub_msg).add_event(
                Event::new("AggregationRequested")
                    .add_attribute("request_id", request_id.to_string())
                    .add_attribute("callback_id", callback_id.to_string())
                    .add_attribute("n", required.quorum.to_string()),
            );
        }

        Ok(res)
    }

    /// Hop 1 of aggregation, the staking contract answers with [TopStakedCallbackMsg].
    fn new_top_staked_request(
        storage: &mut dyn Storage,
        request_id: RequestId,
        n: u32,
    ) -> Result<(u64, SubMsg), AggregatorError> {
        let staking = STAKING.load(storage)?;
        let callback_id = state::save_pending_callback(
            storage,
            &PendingCallback {
                callee: staking.clone(),
                hop: Hop::Aggregate { request_id },
            },
        )?;

        let msg = WasmMsg::Execute {
            contract_addr: staking.to_string(),
            msg: to_json_binary(&xapi_staking::msg::ExecuteMsg::RequestTopStaked {
                n,
                callback_id,
            })?,
            funds: vec![],
        };
        Ok((callback_id, SubMsg::reply_on_error(msg, callback_id)))
    }

    /// Ask the threshold signer to sign `digest`, it answers with [SignatureCallbackMsg].
    fn new_sign_request(
        storage: &mut dyn Storage,
        chain_id: u64,
        digest: &[u8; 32],
        hop: Hop,
    ) -> Result<(u64, SubMsg), AggregatorError> {
        let mpc = MPC_CONFIG.load(storage)?;
        let callback_id = state::save_pending_callback(
            storage,
            &PendingCallback {
                callee: mpc.contract.clone(),
                hop,
            },
        )?;

        let msg = MpcExecuteMsg::Sign {
            request: SignRequest {
                payload: HexBinary::from(digest.as_slice()),
                path: derivation_path(chain_id),
                key_version: mpc.key_version,
            },
            callback_id,
        }
        .into_cosmos_msg(mpc.contract)?;
        Ok((callback_id, SubMsg::reply_on_error(msg, callback_id)))
    }

    /// Remove and return the hop recorded under `callback_id`, only its callee may answer it.
    fn take_pending_callback(
        storage: &mut dyn Storage,
        sender: &Addr,
        callback_id: u64,
    ) -> Result<Hop, AggregatorError> {
        let pending = PENDING_CALLBACKS
            .may_load(storage, callback_id)?
            .ok_or(AggregatorError::UnknownCallback { callback_id })?;
        if *sender != pending.callee {
            return Err(AggregatorError::unauthorized("callback not from the callee"));
        }
        PENDING_CALLBACKS.remove(storage, callback_id);
        Ok(pending.hop)
    }

    /// Hop 2 of aggregation. Any error here aborts the hop and leaves the response FETCHING.
    pub fn top_staked_callback(
        deps: DepsMut,
        env: Env,
        info: MessageInfo,
        callback: TopStakedCallbackMsg,
    ) -> Result<Response, AggregatorError> {
        let callback_id = callback.callback_id;
        let request_id = match take_pending_callback(deps.storage, &info.sender, callback_id)? {
            Hop::Aggregate { request_id } => request_id,
            _ => return Err(AggregatorError::CallbackMismatch { callback_id }),
        };

        let mut response = get_response(deps.storage, request_id)?;
        let status = response.status()?;
        if status != ResponseStatus::Fetching {
            return Err(AggregatorError::InvalidStatus {
                request_id,
                expected: ResponseStatus::Fetching.to_string(),
                actual: status,
            });
        }

        let reports = state::get_reports(deps.storage, request_id)?;
        let top_staked: Vec<Addr> = callback.stakers.into_iter().map(|s| s.account).collect();
        let required = REPORTER_REQUIRED.load(deps.storage)?;
        let aggregation = aggregate(&reports, &top_staked, &required)?;

        response.valid_reporters = aggregation.valid_reporters;
        response.reporter_reward_addresses = aggregation.reporter_reward_addresses;
        response.result = aggregation.result;
        response.error_code = aggregation.error_code;
        response.status = ResponseStatus::Aggregated.into();
        response.updated_at = env.block.time;
        RESPONSES.save(deps.storage, request_id, &response)?;

        Ok(Response::new().add_event(
            Event::new("Aggregated")
                .add_attribute("request_id", request_id.to_string())
                .add_attribute("chain_id", response.chain_id.to_string())
                .add_attribute("callback_id", callback_id.to_string())
                .add_attribute("valid_reporters", response.valid_reporters.len().to_string())
                .add_attribute("result", encode_hex(response.result.as_slice()))
                .add_attribute("error_code", response.error_code.to_string()),
        ))
    }

    /// Anyone can publish an aggregated response, and publish again after a failure.
    pub fn publish(
        deps: DepsMut,
        _env: Env,
        info: MessageInfo,
        request_id: RequestId,
    ) -> Result<Response, AggregatorError> {
        let response = RESPONSES
            .may_load(deps.storage, request_id)?
            .ok_or(AggregatorError::ResponseNotFound { request_id })?;
        let status = response.status()?;
        if status == ResponseStatus::Fetching {
            return Err(AggregatorError::InvalidStatus {
                request_id,
                expected: format!(
                    "{} or {}",
                    ResponseStatus::Aggregated,
                    ResponseStatus::Published
                ),
                actual: status,
            });
        }

        let chain_id = response.chain_id;
        let config = PUBLISH_CHAIN_CONFIGS
            .may_load(deps.storage, chain_id)?
            .ok_or(AggregatorError::ChainConfigNotFound { chain_id })?;

        let nonce = match config.signing_mode {
            SigningMode::TypedData => None,
            SigningMode::Transaction { .. } => {
                Some(state::get_publish_nonce(deps.storage, chain_id)?)
            }
        };

        let relay = response_relay(&response, &config, nonce.unwrap_or_default())?;
        let digest = relay.digest()?;
        let hop = Hop::Publish {
            request_id,
            chain_id,
            digest: HexBinary::from(digest.as_slice()),
            relay,
            nonce,
        };
        let (callback_id, sub_msg) = new_sign_request(deps.storage, chain_id, &digest, hop)?;

        Ok(Response::new().add_submessage(sub_msg).add_event(
            Event::new("PublishRequested")
                .add_attribute("request_id", request_id.to_string())
                .add_attribute("chain_id", chain_id.to_string())
                .add_attribute("callback_id", callback_id.to_string())
                .add_attribute("sender", info.sender.as_str())
                .add_attribute("digest", encode_hex(&digest)),
        ))
    }

    pub fn sync_publish_config(
        deps: DepsMut,
        env: Env,
        info: MessageInfo,
        chain_id: u64,
    ) -> Result<Response, AggregatorError> {
        ownership::assert_owner(deps.storage, &info.sender)?;

        let config = PUBLISH_CHAIN_CONFIGS
            .may_load(deps.storage, chain_id)?
            .ok_or(AggregatorError::ChainConfigNotFound { chain_id })?;

        let relay = config_relay(&env.contract.address, &config);
        let digest = relay.digest()?;
        let hop = Hop::SyncConfig {
            chain_id,
            version: config.version,
            digest: HexBinary::from(digest.as_slice()),
            relay,
        };
        let (callback_id, sub_msg) = new_sign_request(deps.storage, chain_id, &digest, hop)?;

        Ok(Response::new().add_submessage(sub_msg).add_event(
            Event::new("ConfigSyncRequested")
                .add_attribute("chain_id", chain_id.to_string())
                .add_attribute("version", config.version.to_string())
                .add_attribute("callback_id", callback_id.to_string())
                .add_attribute("digest", encode_hex(&digest)),
        ))
    }

    /// The signer's answer to a publish or config sync hop.
    /// A failed signature only emits an event, the state it was requested for is unchanged.
    pub fn signature_callback(
        deps: DepsMut,
        env: Env,
        info: MessageInfo,
        callback: SignatureCallbackMsg,
    ) -> Result<Response, AggregatorError> {
        let callback_id = callback.callback_id;
        let hop = take_pending_callback(deps.storage, &info.sender, callback_id)?;

        let signed = match callback.outcome {
            SignOutcome::Signed(signed) => signed,
            SignOutcome::Failed { reason } => {
                return Ok(Response::new().add_event(failed_event(&hop, callback_id, &reason)))
            }
        };
        if let Some(stale) = stale_signature(deps.storage, &hop)? {
            return Ok(Response::new().add_event(failed_event(
                &hop,
                callback_id,
                &stale.to_string(),
            )));
        }
        let signature = Signature::from_mpc(&signed.big_r, &signed.s, signed.recovery_id)?;

        match hop {
            Hop::Publish {
                request_id,
                chain_id,
                digest,
                relay,
                nonce,
            } => {
                if let Some(nonce) = nonce {
                    PUBLISH_NONCES.save(deps.storage, chain_id, &(nonce + 1))?;
                }

                let mut response = get_response(deps.storage, request_id)?;
                let status = response.status()?;
                if status == ResponseStatus::Fetching {
                    return Err(AggregatorError::InvalidStatus {
                        request_id,
                        expected: ResponseStatus::Aggregated.to_string(),
                        actual: status,
                    });
                }
                response.status = ResponseStatus::Published.into();
                response.updated_at = env.block.time;
                RESPONSES.save(deps.storage, request_id, &response)?;

                let payload = relay.sign(&signature)?;
                Ok(Response::new().add_event(
                    Event::new("Published")
                        .add_attribute("request_id", request_id.to_string())
                        .add_attribute("chain_id", chain_id.to_string())
                        .add_attribute("callback_id", callback_id.to_string())
                        .add_attribute("digest", encode_hex(digest.as_slice()))
                        .add_attribute("signature", encode_hex(&signature.to_bytes()))
                        .add_attribute("payload", to_json_string(&payload)?),
                ))
            }
            Hop::SyncConfig {
                chain_id,
                version,
                digest,
                relay,
            } => {
                let payload = relay.sign(&signature)?;
                Ok(Response::new().add_event(
                    Event::new("ConfigSynced")
                        .add_attribute("chain_id", chain_id.to_string())
                        .add_attribute("version", version.to_string())
                        .add_attribute("callback_id", callback_id.to_string())
                        .add_attribute("digest", encode_hex(digest.as_slice()))
                        .add_attribute("signature", encode_hex(&signature.to_bytes()))
                        .add_attribute("payload", to_json_string(&payload)?),
                ))
            }
            Hop::Aggregate { .. } => Err(AggregatorError::CallbackMismatch { callback_id }),
        }
    }

    /// A signature over a nonce or config version that has since moved on.
    /// The hop is consumed with a failure event, the caller can request a fresh one.
    fn stale_signature(
        storage: &dyn Storage,
        hop: &Hop,
    ) -> Result<Option<AggregatorError>, AggregatorError> {
        match hop {
            Hop::Publish {
                chain_id,
                nonce: Some(nonce),
                ..
            } => {
                let current = state::get_publish_nonce(storage, *chain_id)?;
                Ok((*nonce != current).then_some(AggregatorError::StaleNonce {
                    chain_id: *chain_id,
                    signed: *nonce,
                    current,
                }))
            }
            Hop::SyncConfig {
                chain_id, version, ..
            } => {
                let current = PUBLISH_CHAIN_CONFIGS
                    .may_load(storage, *chain_id)?
                    .ok_or(AggregatorError::ChainConfigNotFound {
                        chain_id: *chain_id,
                    })?
                    .version;
                Ok((*version != current).then_some(AggregatorError::StaleConfigVersion {
                    chain_id: *chain_id,
                    signed: *version,
                    current,
                }))
            }
            _ => Ok(None),
        }
    }

    /// The event of a hop that did not complete, `reason` is the signer's or the host's error.
    pub fn failed_event(hop: &Hop, callback_id: u64, reason: &str) -> Event {
        let event = match hop {
            Hop::Aggregate { request_id } => Event::new("AggregationAborted")
                .add_attribute("request_id", request_id.to_string()),
            Hop::Publish {
                request_id,
                chain_id,
                ..
            } => Event::new("PublishFailed")
                .add_attribute("request_id", request_id.to_string())
                .add_attribute("chain_id", chain_id.to_string()),
            Hop::SyncConfig {
                chain_id, version, ..
            } => Event::new("ConfigSyncFailed")
                .add_attribute("chain_id", chain_id.to_string())
                .add_attribute("version", version.to_string()),
        };
        event
            .add_attribute("callback_id", callback_id.to_string())
            .add_attribute("reason", reason)
    }

    pub fn set_publish_chain_config(
        deps: DepsMut,
        env: Env,
        info: MessageInfo,
        msg: PublishChainConfigMsg,
    ) -> Result<Response, AggregatorError> {
        ownership::assert_owner(deps.storage, &info.sender)?;

        let signing_mode = msg.signing_mode.unwrap_or(SigningMode::TypedData);
        if let SigningMode::Transaction {
            gas_limit,
            max_fee_per_gas,
            max_priority_fee_per_gas,
        } = &signing_mode
        {
            if gas_limit.is_zero() || max_fee_per_gas < max_priority_fee_per_gas {
                return Err(AggregatorError::invalid_config(
                    "transaction mode needs gas_limit > 0 and max_fee_per_gas >= max_priority_fee_per_gas",
                ));
            }
        }

        // strictly increasing even when set twice in the same block
        let previous = PUBLISH_CHAIN_CONFIGS.may_load(deps.storage, msg.chain_id)?;
        let now = env.block.time.nanos();
        let version = match previous {
            Some(previous) if previous.version >= now => previous.version + 1,
            _ => now,
        };

        let config = PublishChainConfig {
            chain_id: msg.chain_id,
            xapi_address: format_address(&parse_address(&msg.xapi_address)?),
            reporters_fee: msg.reporters_fee,
            publish_fee: msg.publish_fee,
            reward_address: format_address(&parse_address(&msg.reward_address)?),
            signing_mode,
            version,
        };
        PUBLISH_CHAIN_CONFIGS.save(deps.storage, msg.chain_id, &config)?;

        Ok(Response::new().add_event(
            Event::new("SetPublishChainConfig")
                .add_attribute("chain_id", config.chain_id.to_string())
                .add_attribute("xapi_address", &config.xapi_address)
                .add_attribute("reporters_fee", config.reporters_fee.to_string())
                .add_attribute("publish_fee", config.publish_fee.to_string())
                .add_attribute("reward_address", &config.reward_address)
                .add_attribute("version", config.version.to_string()),
        ))
    }

    pub fn set_mpc_config(
        deps: DepsMut,
        _env: Env,
        info: MessageInfo,
        msg: MpcConfigMsg,
    ) -> Result<Response, AggregatorError> {
        ownership::assert_owner(deps.storage, &info.sender)?;

        let config = MpcConfig {
            contract: deps.api.addr_validate(&msg.contract)?,
            key_version: msg.key_version,
        };
        MPC_CONFIG.save(deps.storage, &config)?;

        Ok(Response::new().add_event(
            Event::new("SetMpcConfig")
                .add_attribute("contract", config.contract.as_str())
                .add_attribute("key_version", config.key_version.to_string()),
        ))
    }

    pub fn set_reporter_required(
        deps: DepsMut,
        _env: Env,
        info: MessageInfo,
        required: ReporterRequired,
    ) -> Result<Response, AggregatorError> {
        ownership::assert_owner(deps.storage, &info.sender)?;

        validate_reporter_required(&required)?;
        REPORTER_REQUIRED.save(deps.storage, &required)?;

        Ok(Response::new().add_event(
            Event::new("SetReporterRequired")
                .add_attribute("quorum", required.quorum.to_string())
                .add_attribute("threshold", required.threshold.to_string()),
        ))
    }

    pub fn set_staking(
        deps: DepsMut,
        _env: Env,
        info: MessageInfo,
        staking: Addr,
    ) -> Result<Response, AggregatorError> {
        ownership::assert_owner(deps.storage, &info.sender)?;

        STAKING.save(deps.storage, &staking)?;

        Ok(Response::new()
            .add_event(Event::new("SetStaking").add_attribute("staking", staking.as_str())))
    }

    pub fn set_max_result_length(
        deps: DepsMut,
        _env: Env,
        info: MessageInfo,
        max_result_length: u32,
    ) -> Result<Response, AggregatorError> {
        ownership::assert_owner(deps.storage, &info.sender)?;

        validate_max_result_length(max_result_length)?;
        MAX_RESULT_LENGTH.save(deps.storage, &max_result_length)?;

        Ok(Response::new().add_event(
            Event::new("SetMaxResultLength")
                .add_attribute("max_result_length", max_result_length.to_string()),
        ))
    }

    pub fn set_deposit_config(
        deps: DepsMut,
        _env: Env,
        info: MessageInfo,
        deposit: DepositConfig,
    ) -> Result<Response, AggregatorError> {
        ownership::assert_owner(deps.storage, &info.sender)?;

        validate_deposit_config(&deposit)?;
        DEPOSIT_CONFIG.save(deps.storage, &deposit)?;

        Ok(Response::new().add_event(
            Event::new("SetDepositConfig")
                .add_attribute("denom", &deposit.denom)
                .add_attribute("price_per_byte", deposit.price_per_byte.to_string()),
        ))
    }
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn query(deps: Deps, env: Env, msg: QueryMsg) -> StdResult<Binary> {
    match msg {
        QueryMsg::DataSource { name } => to_json_binary(&query::data_source(deps, name)?),
        QueryMsg::DataSources { start_after, limit } => {
            to_json_binary(&query::data_sources(deps, start_after, limit)?)
        }
        QueryMsg::Response { request_id } => {
            to_json_binary(&crate::state::get_response(deps.storage, request_id)?)
        }
        QueryMsg::Report {
            request_id,
            reporter,
        } => {
            let reporter = deps.api.addr_validate(&reporter)?;
            to_json_binary(&crate::state::REPORTS.load(deps.storage, (request_id, &reporter))?)
        }
        QueryMsg::Reports { request_id } => to_json_binary(&crate::msg::ReportsResponse(
            crate::state::get_reports(deps.storage, request_id)?,
        )),
        QueryMsg::ReporterRequired {} => to_json_binary(&REPORTER_REQUIRED.load(deps.storage)?),
        QueryMsg::PublishChainConfig { chain_id } => to_json_binary(
            &crate::state::PUBLISH_CHAIN_CONFIGS.load(deps.storage, chain_id)?,
        ),
        QueryMsg::MpcConfig {} => to_json_binary(&MPC_CONFIG.load(deps.storage)?),
        QueryMsg::Staking {} => to_json_binary(&STAKING.load(deps.storage)?),
        QueryMsg::MaxResultLength {} => to_json_binary(&MAX_RESULT_LENGTH.load(deps.storage)?),
        QueryMsg::DepositConfig {} => to_json_binary(&DEPOSIT_CONFIG.load(deps.storage)?),
        QueryMsg::ReportDeposit {
            request_id,
            answers,
            reward_address,
            reporter,
        } => {
            let reporter = deps.api.addr_validate(&reporter)?;
            let report = execute::new_report(
                deps,
                &env,
                reporter,
                request_id,
                answers,
                &reward_address,
            )
            .map_err(|e| StdError::generic_err(e.to_string()))?;
            let config = DEPOSIT_CONFIG.load(deps.storage)?;
            to_json_binary(&crate::deposit::deposit_required(&report, &config)?)
        }
        QueryMsg::DataSourceDeposit { data_source } => {
            let config = DEPOSIT_CONFIG.load(deps.storage)?;
            to_json_binary(&crate::deposit::deposit_required(&data_source, &config)?)
        }
        QueryMsg::PendingCallback { callback_id } => {
            to_json_binary(&crate::state::PENDING_CALLBACKS.load(deps.storage, callback_id)?)
        }
    }
}

mod query {
    use crate::msg::{DataSource, DataSourcesResponse};
    use crate::state::DATA_SOURCES;
    use cosmwasm_std::{Deps, Order, StdError, StdResult};
    use cw_storage_plus::Bound;

    // settings for pagination
    const MAX_LIMIT: u32 = 30;
    const DEFAULT_LIMIT: u32 = 10;

    pub fn data_source(deps: Deps, name: String) -> StdResult<DataSource> {
        DATA_SOURCES
            .may_load(deps.storage, &name)?
            .ok_or_else(|| StdError::not_found(format!("data source {}", name)))
    }

    /// Data sources ordered by name.
    pub fn data_sources(
        deps: Deps,
        start_after: Option<String>,
        limit: Option<u32>,
    ) -> StdResult<DataSourcesResponse> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT) as usize;
        let start = start_after.as_deref().map(Bound::exclusive);
        let data_sources = DATA_SOURCES
            .range(deps.storage, start, None, Order::Ascending)
            .take(limit)
            .map(|item| item.map(|(_, data_source)| data_source))
            .collect::<StdResult<_>>()?;
        Ok(DataSourcesResponse(data_sources))
    }
}

/// Only hops sent with `reply_on_error` come back here, after everything the failed hop wrote
/// was rolled back. The hop is dropped and the call that dispatched it still succeeds.
#[cfg_attr(not(feature = "library"), entry_point)]
pub fn reply(deps: DepsMut, _env: Env, msg: Reply) -> Result<Response, AggregatorError> {
    let reason = match msg.result {
        cosmwasm_std::SubMsgResult::Ok(_) => return Ok(Response::default()),
        cosmwasm_std::SubMsgResult::Err(err) => err,
    };

    let callback_id = msg.id;
    match crate::state::PENDING_CALLBACKS.may_load(deps.storage, callback_id)? {
        Some(pending) => {
            crate::state::PENDING_CALLBACKS.remove(deps.storage, callback_id);
            let event = execute::failed_event(&pending.hop, callback_id, &reason);
            Ok(Response::new().add_event(event))
        }
        None => Ok(Response::default()),
    }
}

/// This can only be called by the contract ADMIN, enforced by `wasmd` separate from cosmwasm.
/// See https://github.com/CosmWasm/cosmwasm/issues/926#issuecomment-851259818
#[cfg_attr(not(feature = "library"), entry_point)]
pub fn migrate(deps: DepsMut, _env: Env, _msg: MigrateMsg) -> Result<Response, AggregatorError> {
    cw2::ensure_from_older_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;
    Ok(Response::default())
}
