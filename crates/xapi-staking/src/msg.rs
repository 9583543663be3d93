use crate::state::Staked;
use cosmwasm_schema::{cw_serde, QueryResponses};
use cosmwasm_std::{to_json_binary, Addr, Binary, CosmosMsg, StdResult, Uint128, WasmMsg};
use cw20::Cw20ReceiveMsg;

#[cw_serde]
pub struct MigrateMsg {}

#[cw_serde]
pub struct InstantiateMsg {
    pub owner: String,
    /// The cw20 token accepted for staking.
    pub token: String,
    /// Defaults to 7 days.
    pub unlock_period: Option<u64>,
}

#[cw_serde]
pub enum ExecuteMsg {
    /// Cw20 transfer notification, stakes `amount` for `sender`.
    /// Only accepted from the configured token with the [ReceiveHookMsg::Stake] hook.
    Receive(Cw20ReceiveMsg),

    /// Move `amount` of the sender's live stake into a new unlocking entry
    /// that matures after the unlock period.
    Unlock { amount: Uint128 },

    /// Transfer every matured unlocking entry back to the sender.
    Withdraw {},

    /// ExecuteMsg Slash takes `amount` from the account's live stake first,
    /// then from its unlocking entries oldest first.
    /// Slashed tokens are transferred to the `owner`.
    /// Only the `owner` can call this message.
    Slash { account: String, amount: Uint128 },

    /// Only the `owner` can call this message.
    SetUnlockPeriod { unlock_period: u64 },

    /// Rank the top `n` stakers and answer with a
    /// [TopStakedCallbackMsg] executed on the sender under the same `callback_id`.
    RequestTopStaked { n: u32, callback_id: u64 },

    /// ExecuteMsg TransferOwnership
    /// See [`xapi_library::ownership::transfer_ownership`] for more information on this field
    TransferOwnership { new_owner: String },
}

/// Hook carried in [Cw20ReceiveMsg::msg].
#[cw_serde]
pub enum ReceiveHookMsg {
    Stake {},
}

#[cw_serde]
pub struct StakerAmount {
    pub account: Addr,
    pub amount: Uint128,
}

/// Answer to [ExecuteMsg::RequestTopStaked], stakers sorted by amount descending.
#[cw_serde]
pub struct TopStakedCallbackMsg {
    pub callback_id: u64,
    pub stakers: Vec<StakerAmount>,
}

impl TopStakedCallbackMsg {
    /// Serializes the message with the `TopStakedCallback` variant the requester exposes.
    pub fn into_json_binary(self) -> StdResult<Binary> {
        let msg = TopStakedCallbackExecuteMsg::TopStakedCallback(self);
        to_json_binary(&msg)
    }

    pub fn into_cosmos_msg<T: Into<String>>(self, contract_addr: T) -> StdResult<CosmosMsg> {
        let msg = self.into_json_binary()?;
        let execute = WasmMsg::Execute {
            contract_addr: contract_addr.into(),
            msg,
            funds: vec![],
        };
        Ok(execute.into())
    }
}

// This is just a helper to properly serialize the above message
#[cw_serde]
enum TopStakedCallbackExecuteMsg {
    TopStakedCallback(TopStakedCallbackMsg),
}

#[cw_serde]
#[derive(QueryResponses)]
pub enum QueryMsg {
    /// Live balance and unlocking entries, empty for unknown accounts.
    #[returns(Staked)]
    Staked { account: String },

    #[returns(TopStakedResponse)]
    TopStaked { n: u32 },

    #[returns(Uint128)]
    TotalStaked {},

    #[returns(u64)]
    UnlockPeriod {},

    #[returns(Addr)]
    Token {},
}

#[cw_serde]
pub struct TopStakedResponse(pub Vec<StakerAmount>);
