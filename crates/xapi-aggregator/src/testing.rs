#![cfg(not(target_arch = "wasm32"))]

use crate::mpc::{SignOutcome, SignRequest, SignatureCallbackMsg, SignatureResponse};
use crate::msg::{Answer, DataSource, ExecuteMsg, InstantiateMsg, MpcConfigMsg, QueryMsg};
use crate::state::{DepositConfig, OracleResponse, ReporterRequired, RequestId};
use cosmwasm_schema::cw_serde;
use cosmwasm_std::{
    coins, to_json_binary, Addr, Binary, Coin, Deps, DepsMut, Empty, Env, HexBinary,
    MessageInfo, Response, StdError, StdResult, Uint128,
};
use cw_multi_test::error::AnyResult;
use cw_multi_test::{App, AppResponse, BankSudo, Contract, ContractWrapper};
use cw_storage_plus::{Item, Map};
use serde::{Deserialize, Serialize};
use xapi_codec::keccak256;
use xapi_library::testing::TestingContract;

pub const DEPOSIT_DENOM: &str = "uxapi";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AggregatorContract {
    pub addr: Addr,
    pub init: InstantiateMsg,
}

impl TestingContract<InstantiateMsg, ExecuteMsg, QueryMsg> for AggregatorContract {
    fn wrapper() -> Box<dyn Contract<Empty>> {
        Box::new(
            ContractWrapper::new(
                crate::contract::execute,
                crate::contract::instantiate,
                crate::contract::query,
            )
            .with_reply(crate::contract::reply)
            .with_migrate(crate::contract::migrate),
        )
    }

    fn default_init(app: &mut App, _env: &Env) -> InstantiateMsg {
        InstantiateMsg {
            owner: app.api().addr_make("owner").to_string(),
            staking: Self::get_contract_addr(app, "staking").to_string(),
            mpc: MpcConfigMsg {
                contract: Self::get_contract_addr(app, "mpc").to_string(),
                key_version: 0,
            },
            reporter_required: ReporterRequired {
                quorum: 3,
                threshold: 2,
            },
            max_result_length: 256,
            deposit: DepositConfig {
                denom: DEPOSIT_DENOM.to_string(),
                price_per_byte: Uint128::new(1),
            },
        }
    }

    fn new(app: &mut App, env: &Env, msg: Option<InstantiateMsg>) -> Self {
        let init = msg.unwrap_or(Self::default_init(app, env));
        let code_id = Self::store_code(app);
        let addr = Self::instantiate(app, code_id, "aggregator", &init);
        Self { addr, init }
    }

    fn addr(&self) -> &Addr {
        &self.addr
    }
}

/// Mint native `amount` of the deposit denom to `recipient`.
pub fn fund_deposit(app: &mut App, recipient: &Addr, amount: u128) {
    if amount == 0 {
        return;
    }
    app.sudo(
        BankSudo::Mint {
            to_address: recipient.to_string(),
            amount: coins(amount, DEPOSIT_DENOM),
        }
        .into(),
    )
    .unwrap();
}

impl AggregatorContract {
    /// Add `data_source` as the owner, paying exactly the required deposit.
    pub fn add_data_source(&self, app: &mut App, data_source: DataSource) -> AnyResult<AppResponse> {
        let deposit: Coin = self.query(
            app,
            &QueryMsg::DataSourceDeposit {
                data_source: data_source.clone(),
            },
        )?;
        let owner = Addr::unchecked(&self.init.owner);
        fund_deposit(app, &owner, deposit.amount.u128());
        self.execute_with_funds(
            app,
            &owner,
            &ExecuteMsg::AddDataSource(data_source),
            vec![deposit],
        )
    }

    /// Report as `reporter` with the exact deposit minted to it first.
    pub fn report(
        &self,
        app: &mut App,
        reporter: &Addr,
        request_id: RequestId,
        answers: Vec<Answer>,
        reward_address: &str,
    ) -> AnyResult<AppResponse> {
        let deposit: Coin = self.query(
            app,
            &QueryMsg::ReportDeposit {
                request_id,
                answers: answers.clone(),
                reward_address: reward_address.to_string(),
                reporter: reporter.to_string(),
            },
        )?;
        fund_deposit(app, reporter, deposit.amount.u128());
        let funds = if deposit.amount.is_zero() {
            vec![]
        } else {
            vec![deposit]
        };
        self.execute_with_funds(
            app,
            reporter,
            &ExecuteMsg::Report {
                request_id,
                answers,
                reward_address: reward_address.to_string(),
            },
            funds,
        )
    }

    pub fn response(&self, app: &App, request_id: RequestId) -> OracleResponse {
        self.query(app, &QueryMsg::Response { request_id }).unwrap()
    }
}

/// A threshold signer stand-in. It signs with a deterministic pseudo-signature,
/// right away or once told to [MockMpcExecuteMsg::Deliver], and can be told to fail.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MockMpcContract {
    pub addr: Addr,
    pub init: MockMpcInstantiateMsg,
}

#[cw_serde]
pub struct MockMpcInstantiateMsg {
    /// Hold requests until delivered instead of answering in the same transaction.
    pub deferred: bool,
}

#[cw_serde]
pub enum MockMpcExecuteMsg {
    /// Same shape as [crate::mpc::MpcExecuteMsg::Sign].
    Sign {
        request: SignRequest,
        callback_id: u64,
    },
    Deliver {
        callback_id: u64,
    },
    SetFailure {
        reason: Option<String>,
    },
    SetDeferred {
        deferred: bool,
    },
}

#[cw_serde]
pub enum MockMpcQueryMsg {
    PendingRequests {},
}

#[cw_serde]
pub struct PendingSignRequest {
    pub callback_id: u64,
    pub requester: Addr,
    pub request: SignRequest,
}

const DEFERRED: Item<bool> = Item::new("deferred");
const FAILURE: Item<Option<String>> = Item::new("failure");
const PENDING: Map<u64, PendingSignRequest> = Map::new("pending");

/// `big_r = 02 ++ keccak(payload ++ path)`, `s = keccak(big_r)`, recovery id from the payload.
pub fn pseudo_signature(request: &SignRequest) -> SignatureResponse {
    let mut seed = request.payload.to_vec();
    seed.extend(request.path.as_bytes());

    let mut big_r = vec![0x02];
    big_r.extend(keccak256(&seed));
    let s = keccak256(&big_r);

    SignatureResponse {
        big_r: HexBinary::from(big_r).to_hex(),
        s: HexBinary::from(s.as_slice()).to_hex(),
        recovery_id: request.payload.first().copied().unwrap_or_default() % 2,
    }
}

fn mock_mpc_instantiate(
    deps: DepsMut,
    _env: Env,
    _info: MessageInfo,
    msg: MockMpcInstantiateMsg,
) -> StdResult<Response> {
    DEFERRED.save(deps.storage, &msg.deferred)?;
    FAILURE.save(deps.storage, &None)?;
    Ok(Response::new())
}

fn mock_mpc_answer(deps: Deps, pending: &PendingSignRequest) -> StdResult<Response> {
    let outcome = match FAILURE.load(deps.storage)? {
        Some(reason) => SignOutcome::Failed { reason },
        None => SignOutcome::Signed(pseudo_signature(&pending.request)),
    };
    let callback = SignatureCallbackMsg {
        callback_id: pending.callback_id,
        outcome,
    }
    .into_cosmos_msg(pending.requester.as_str())?;
    Ok(Response::new().add_message(callback))
}

fn mock_mpc_execute(
    deps: DepsMut,
    _env: Env,
    info: MessageInfo,
    msg: MockMpcExecuteMsg,
) -> StdResult<Response> {
    match msg {
        MockMpcExecuteMsg::Sign {
            request,
            callback_id,
        } => {
            let pending = PendingSignRequest {
                callback_id,
                requester: info.sender,
                request,
            };
            if DEFERRED.load(deps.storage)? {
                PENDING.save(deps.storage, callback_id, &pending)?;
                return Ok(Response::new());
            }
            mock_mpc_answer(deps.as_ref(), &pending)
        }
        MockMpcExecuteMsg::Deliver { callback_id } => {
            let pending = PENDING
                .may_load(deps.storage, callback_id)?
                .ok_or_else(|| StdError::not_found(format!("sign request {}", callback_id)))?;
            PENDING.remove(deps.storage, callback_id);
            mock_mpc_answer(deps.as_ref(), &pending)
        }
        MockMpcExecuteMsg::SetFailure { reason } => {
            FAILURE.save(deps.storage, &reason)?;
            Ok(Response::new())
        }
        MockMpcExecuteMsg::SetDeferred { deferred } => {
            DEFERRED.save(deps.storage, &deferred)?;
            Ok(Response::new())
        }
    }
}

fn mock_mpc_query(deps: Deps, _env: Env, msg: MockMpcQueryMsg) -> StdResult<Binary> {
    match msg {
        MockMpcQueryMsg::PendingRequests {} => {
            let pending = PENDING
                .range(deps.storage, None, None, cosmwasm_std::Order::Ascending)
                .map(|item| item.map(|(_, pending)| pending))
                .collect::<StdResult<Vec<_>>>()?;
            to_json_binary(&pending)
        }
    }
}

impl TestingContract<MockMpcInstantiateMsg, MockMpcExecuteMsg, MockMpcQueryMsg>
    for MockMpcContract
{
    fn wrapper() -> Box<dyn Contract<Empty>> {
        Box::new(ContractWrapper::new(
            mock_mpc_execute,
            mock_mpc_instantiate,
            mock_mpc_query,
        ))
    }

    fn default_init(_app: &mut App, _env: &Env) -> MockMpcInstantiateMsg {
        MockMpcInstantiateMsg { deferred: false }
    }

    fn new(app: &mut App, env: &Env, msg: Option<MockMpcInstantiateMsg>) -> Self {
        let init = msg.unwrap_or(Self::default_init(app, env));
        let code_id = Self::store_code(app);
        let addr = Self::instantiate(app, code_id, "mpc", &init);
        Self { addr, init }
    }

    fn addr(&self) -> &Addr {
        &self.addr
    }
}

impl MockMpcContract {
    pub fn pending_requests(&self, app: &App) -> Vec<PendingSignRequest> {
        self.query(app, &MockMpcQueryMsg::PendingRequests {})
            .unwrap()
    }

    /// Answer a deferred request, executed by anyone.
    pub fn deliver(&self, app: &mut App, callback_id: u64) -> AnyResult<AppResponse> {
        let sender = app.api().addr_make("relayer");
        self.execute(app, &sender, &MockMpcExecuteMsg::Deliver { callback_id })
    }

    pub fn set_failure(&self, app: &mut App, reason: Option<&str>) {
        let sender = app.api().addr_make("mpc_operator");
        let msg = MockMpcExecuteMsg::SetFailure {
            reason: reason.map(str::to_string),
        };
        self.execute(app, &sender, &msg).unwrap();
    }

    pub fn set_deferred(&self, app: &mut App, deferred: bool) {
        let sender = app.api().addr_make("mpc_operator");
        self.execute(app, &sender, &MockMpcExecuteMsg::SetDeferred { deferred })
            .unwrap();
    }
}
