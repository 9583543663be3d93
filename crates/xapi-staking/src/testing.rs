#![cfg(not(target_arch = "wasm32"))]

use crate::msg::{ExecuteMsg, InstantiateMsg, QueryMsg, ReceiveHookMsg};
use crate::state::Staked;
use cosmwasm_std::{to_json_binary, Addr, Empty, Env};
use cw_multi_test::error::AnyResult;
use cw_multi_test::{App, AppResponse, Contract, ContractWrapper};
use serde::{Deserialize, Serialize};
use xapi_library::testing::{Cw20TokenContract, TestingContract};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StakingContract {
    pub addr: Addr,
    pub init: InstantiateMsg,
}

impl TestingContract<InstantiateMsg, ExecuteMsg, QueryMsg> for StakingContract {
    fn wrapper() -> Box<dyn Contract<Empty>> {
        Box::new(
            ContractWrapper::new(
                crate::contract::execute,
                crate::contract::instantiate,
                crate::contract::query,
            )
            .with_migrate(crate::contract::migrate),
        )
    }

    fn default_init(app: &mut App, _env: &Env) -> InstantiateMsg {
        InstantiateMsg {
            owner: app.api().addr_make("owner").to_string(),
            token: Self::get_contract_addr(app, "cw20_token").to_string(),
            unlock_period: None,
        }
    }

    fn new(app: &mut App, env: &Env, msg: Option<InstantiateMsg>) -> Self {
        let init = msg.unwrap_or(Self::default_init(app, env));
        let code_id = Self::store_code(app);
        let addr = Self::instantiate(app, code_id, "staking", &init);
        Self { addr, init }
    }

    fn addr(&self) -> &Addr {
        &self.addr
    }
}

impl StakingContract {
    /// Stake through the token's `Send`, the way a staker does on chain.
    pub fn stake(
        &self,
        app: &mut App,
        token: &Cw20TokenContract,
        staker: &Addr,
        amount: u128,
    ) -> AnyResult<AppResponse> {
        let hook = to_json_binary(&ReceiveHookMsg::Stake {})?;
        token.send(app, staker, &self.addr, amount, hook)
    }

    pub fn staked(&self, app: &App, account: &Addr) -> Staked {
        let msg = QueryMsg::Staked {
            account: account.to_string(),
        };
        self.query(app, &msg).unwrap()
    }
}
