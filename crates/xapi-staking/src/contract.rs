#[cfg(not(feature = "library"))]
use cosmwasm_std::entry_point;

use crate::error::StakingError;
use crate::msg::{ExecuteMsg, InstantiateMsg, MigrateMsg, QueryMsg};
use crate::state::{DEFAULT_UNLOCK_PERIOD, TOKEN, TOTAL_STAKED, UNLOCK_PERIOD};
use cosmwasm_std::{
    to_json_binary, Binary, Deps, DepsMut, Env, MessageInfo, Response, StdResult, Uint128,
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
) -> Result<Response, StakingError> {
    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;

    let owner = deps.api.addr_validate(&msg.owner)?;
    ownership::set_owner(deps.storage, &owner)?;

    let token = deps.api.addr_validate(&msg.token)?;
    TOKEN.save(deps.storage, &token)?;

    let unlock_period = msg.unlock_period.unwrap_or(DEFAULT_UNLOCK_PERIOD);
    if unlock_period == 0 {
        return Err(StakingError::InvalidUnlockPeriod);
    }
    UNLOCK_PERIOD.save(deps.storage, &unlock_period)?;
    TOTAL_STAKED.save(deps.storage, &Uint128::zero())?;

    Ok(Response::new()
        .add_attribute("method", "instantiate")
        .add_attribute("owner", owner)
        .add_attribute("token", token)
        .add_attribute("unlock_period", unlock_period.to_string()))
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn execute(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    msg: ExecuteMsg,
) -> Result<Response, StakingError> {
    match msg {
        ExecuteMsg::Receive(receive) => execute::receive(deps, env, info, receive),
        ExecuteMsg::Unlock { amount } => execute::unlock(deps, env, info, amount),
        ExecuteMsg::Withdraw {} => execute::withdraw(deps, env, info),
        ExecuteMsg::Slash { account, amount } => {
            let account = deps.api.addr_validate(&account)?;
            execute::slash(deps, env, info, account, amount)
        }
        ExecuteMsg::SetUnlockPeriod { unlock_period } => {
            execute::set_unlock_period(deps, env, info, unlock_period)
        }
        ExecuteMsg::RequestTopStaked { n, callback_id } => {
            execute::request_top_staked(deps, env, info, n, callback_id)
        }
        ExecuteMsg::TransferOwnership { new_owner } => {
            let new_owner = deps.api.addr_validate(&new_owner)?;
            ownership::transfer_ownership(deps.storage, &info.sender, new_owner)
                .map_err(StakingError::Ownership)
        }
    }
}

mod execute {
    use super::*;
    use crate::msg::{ReceiveHookMsg, TopStakedCallbackMsg};
    use crate::state;
    use cosmwasm_std::{from_json, Addr, CosmosMsg, Event, Storage, WasmMsg};
    use cw20::{Cw20ExecuteMsg, Cw20ReceiveMsg};

    /// Handles the cw20 `Send` notification.
    /// The sender of the notification must be the staking token
    /// and the hook must be [ReceiveHookMsg::Stake], anything else is rejected.
    pub fn receive(
        deps: DepsMut,
        _env: Env,
        info: MessageInfo,
        receive: Cw20ReceiveMsg,
    ) -> Result<Response, StakingError> {
        let token = TOKEN.load(deps.storage)?;
        if info.sender != token {
            return Err(StakingError::unauthorized(
                "transfer notification not from the staking token",
            ));
        }

        match from_json::<ReceiveHookMsg>(&receive.msg) {
            Ok(ReceiveHookMsg::Stake {}) => {}
            Err(_) => return Err(StakingError::unauthorized("unknown transfer hook")),
        }

        let account = deps.api.addr_validate(&receive.sender)?;
        stake(deps.storage, &account, receive.amount)
    }

    fn stake(
        storage: &mut dyn Storage,
        account: &Addr,
        amount: Uint128,
    ) -> Result<Response, StakingError> {
        if amount.is_zero() {
            return Err(StakingError::ZeroAmount);
        }

        let mut staked = state::get_staked(storage, account)?;
        staked.amount = staked.amount.checked_add(amount)?;
        state::save_staked(storage, account, &staked)?;

        let total_staked = state::get_total_staked(storage)?.checked_add(amount)?;
        TOTAL_STAKED.save(storage, &total_staked)?;

        Ok(Response::new().add_event(
            Event::new("Stake")
                .add_attribute("account", account.as_str())
                .add_attribute("amount", amount.to_string())
                .add_attribute("staked", staked.amount.to_string())
                .add_attribute("total_staked", total_staked.to_string()),
        ))
    }

    pub fn unlock(
        deps: DepsMut,
        env: Env,
        info: MessageInfo,
        amount: Uint128,
    ) -> Result<Response, StakingError> {
        if amount.is_zero() {
            return Err(StakingError::ZeroAmount);
        }

        let unlock_period = state::get_unlock_period(deps.storage)?;
        let unlock_time = env.block.time.plus_seconds(unlock_period);

        let mut staked = state::get_staked(deps.storage, &info.sender)?;
        staked.unlock(amount, unlock_time)?;
        state::save_staked(deps.storage, &info.sender, &staked)?;

        let total_staked = state::get_total_staked(deps.storage)?.checked_sub(amount)?;
        TOTAL_STAKED.save(deps.storage, &total_staked)?;

        Ok(Response::new().add_event(
            Event::new("Unlock")
                .add_attribute("account", info.sender.as_str())
                .add_attribute("amount", amount.to_string())
                .add_attribute("unlock_time", unlock_time.seconds().to_string())
                .add_attribute("total_staked", total_staked.to_string()),
        ))
    }

    /// Withdraw every matured unlocking entry, [TOTAL_STAKED] is untouched
    /// since unlocking funds were already removed from it.
    pub fn withdraw(
        deps: DepsMut,
        env: Env,
        info: MessageInfo,
    ) -> Result<Response, StakingError> {
        let mut staked = state::get_staked(deps.storage, &info.sender)?;
        let amount = staked.withdraw_unlocked(env.block.time)?;
        state::save_staked(deps.storage, &info.sender, &staked)?;

        let transfer = new_transfer(deps.storage, &info.sender, amount)?;

        Ok(Response::new().add_message(transfer).add_event(
            Event::new("Withdraw")
                .add_attribute("account", info.sender.as_str())
                .add_attribute("amount", amount.to_string()),
        ))
    }

    pub fn slash(
        deps: DepsMut,
        _env: Env,
        info: MessageInfo,
        account: Addr,
        amount: Uint128,
    ) -> Result<Response, StakingError> {
        ownership::assert_owner(deps.storage, &info.sender)?;

        if amount.is_zero() {
            return Err(StakingError::ZeroAmount);
        }

        let mut staked = state::get_staked(deps.storage, &account)?;
        let slashed = staked.slash(amount)?;
        state::save_staked(deps.storage, &account, &staked)?;

        let total_staked = state::get_total_staked(deps.storage)?.checked_sub(slashed.from_staked)?;
        TOTAL_STAKED.save(deps.storage, &total_staked)?;

        let transfer = new_transfer(deps.storage, &info.sender, amount)?;

        Ok(Response::new().add_message(transfer).add_event(
            Event::new("Slash")
                .add_attribute("account", account.as_str())
                .add_attribute("amount", amount.to_string())
                .add_attribute("from_staked", slashed.from_staked.to_string())
                .add_attribute("from_unlocking", slashed.from_unlocking.to_string())
                .add_attribute("total_staked", total_staked.to_string()),
        ))
    }

    pub fn set_unlock_period(
        deps: DepsMut,
        _env: Env,
        info: MessageInfo,
        unlock_period: u64,
    ) -> Result<Response, StakingError> {
        ownership::assert_owner(deps.storage, &info.sender)?;

        if unlock_period == 0 {
            return Err(StakingError::InvalidUnlockPeriod);
        }

        let prev_unlock_period = state::get_unlock_period(deps.storage)?;
        UNLOCK_PERIOD.save(deps.storage, &unlock_period)?;

        Ok(Response::new().add_event(
            Event::new("SetUnlockPeriod")
                .add_attribute("prev_unlock_period", prev_unlock_period.to_string())
                .add_attribute("new_unlock_period", unlock_period.to_string()),
        ))
    }

    /// Read-only: ranks the stakers and hands them back to the requester
    /// through its `TopStakedCallback` entry point.
    pub fn request_top_staked(
        deps: DepsMut,
        _env: Env,
        info: MessageInfo,
        n: u32,
        callback_id: u64,
    ) -> Result<Response, StakingError> {
        let stakers = query::top_staked(deps.as_ref(), n)?.0;
        let count = stakers.len();

        let callback = TopStakedCallbackMsg {
            callback_id,
            stakers,
        }
        .into_cosmos_msg(info.sender.as_str())?;

        Ok(Response::new().add_message(callback).add_event(
            Event::new("TopStakedRequested")
                .add_attribute("requester", info.sender.as_str())
                .add_attribute("callback_id", callback_id.to_string())
                .add_attribute("n", n.to_string())
                .add_attribute("count", count.to_string()),
        ))
    }

    /// New cw20 transfer out of the contract to `recipient`.
    fn new_transfer(
        storage: &dyn Storage,
        recipient: &Addr,
        amount: Uint128,
    ) -> StdResult<CosmosMsg> {
        let token = TOKEN.load(storage)?;
        Ok(WasmMsg::Execute {
            contract_addr: token.to_string(),
            msg: to_json_binary(&Cw20ExecuteMsg::Transfer {
                recipient: recipient.to_string(),
                amount,
            })?,
            funds: vec![],
        }
        .into())
    }
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn query(deps: Deps, _env: Env, msg: QueryMsg) -> StdResult<Binary> {
    match msg {
        QueryMsg::Staked { account } => {
            let account = deps.api.addr_validate(&account)?;
            to_json_binary(&crate::state::get_staked(deps.storage, &account)?)
        }
        QueryMsg::TopStaked { n } => to_json_binary(&query::top_staked(deps, n)?),
        QueryMsg::TotalStaked {} => {
            to_json_binary(&crate::state::get_total_staked(deps.storage)?)
        }
        QueryMsg::UnlockPeriod {} => {
            to_json_binary(&crate::state::get_unlock_period(deps.storage)?)
        }
        QueryMsg::Token {} => to_json_binary(&TOKEN.load(deps.storage)?),
    }
}

mod query {
    use crate::msg::{StakerAmount, TopStakedResponse};
    use crate::state::{MAX_TOP_STAKED, STAKED};
    use cosmwasm_std::{Deps, Order, StdResult};

    /// The `n` accounts with the largest live stake (capped at [MAX_TOP_STAKED]),
    /// amount descending and address ascending on ties.
    /// Accounts with nothing staked are never ranked.
    pub fn top_staked(deps: Deps, n: u32) -> StdResult<TopStakedResponse> {
        let n = n.min(MAX_TOP_STAKED) as usize;

        let mut stakers = STAKED
            .range(deps.storage, None, None, Order::Ascending)
            .filter(|item| !matches!(item, Ok((_, staked)) if staked.amount.is_zero()))
            .map(|item| {
                let (account, staked) = item?;
                Ok(StakerAmount {
                    account,
                    amount: staked.amount,
                })
            })
            .collect::<StdResult<Vec<_>>>()?;

        stakers.sort_by(|a, b| b.amount.cmp(&a.amount).then_with(|| a.account.cmp(&b.account)));
        stakers.truncate(n);
        Ok(TopStakedResponse(stakers))
    }
}

/// This can only be called by the contract ADMIN, enforced by `wasmd` separate from cosmwasm.
/// See https://github.com/CosmWasm/cosmwasm/issues/926#issuecomment-851259818
#[cfg_attr(not(feature = "library"), entry_point)]
pub fn migrate(deps: DepsMut, _env: Env, _msg: MigrateMsg) -> Result<Response, StakingError> {
    cw2::ensure_from_older_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;
    Ok(Response::default())
}
