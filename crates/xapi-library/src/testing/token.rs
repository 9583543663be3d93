use crate::testing::TestingContract;
use cosmwasm_std::{Addr, Binary, Empty, Env, Uint128};
use cw20::{BalanceResponse, Cw20Coin, Cw20ExecuteMsg, Cw20QueryMsg, MinterResponse};
use cw_multi_test::{App, Contract, ContractWrapper};
use serde::{Deserialize, Serialize};

/// A cw20-base token, used as the staking token in tests.
/// The `minter` can fund any account through [Cw20TokenContract::fund].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Cw20TokenContract {
    pub addr: Addr,
    pub init: cw20_base::msg::InstantiateMsg,
}

impl TestingContract<cw20_base::msg::InstantiateMsg, Cw20ExecuteMsg, Cw20QueryMsg>
    for Cw20TokenContract
{
    fn wrapper() -> Box<dyn Contract<Empty>> {
        Box::new(ContractWrapper::new(
            cw20_base::contract::execute,
            cw20_base::contract::instantiate,
            cw20_base::contract::query,
        ))
    }

    fn default_init(app: &mut App, _env: &Env) -> cw20_base::msg::InstantiateMsg {
        cw20_base::msg::InstantiateMsg {
            name: "XAPI Token".to_string(),
            symbol: "XAPI".to_string(),
            decimals: 6,
            initial_balances: vec![Cw20Coin {
                address: app.api().addr_make("treasury").to_string(),
                amount: Uint128::new(1_000_000),
            }],
            mint: Some(MinterResponse {
                minter: app.api().addr_make("minter").to_string(),
                cap: None,
            }),
            marketing: None,
        }
    }

    fn new(app: &mut App, env: &Env, msg: Option<cw20_base::msg::InstantiateMsg>) -> Self {
        let init = msg.unwrap_or(Self::default_init(app, env));
        let code_id = Self::store_code(app);
        let addr = Self::instantiate(app, code_id, "cw20_token", &init);
        Self { addr, init }
    }

    fn addr(&self) -> &Addr {
        &self.addr
    }
}

impl Cw20TokenContract {
    /// Mint `amount` to `recipient`, requires the default minter.
    pub fn fund(&self, app: &mut App, recipient: &Addr, amount: u128) {
        let minter = app.api().addr_make("minter");
        let msg = Cw20ExecuteMsg::Mint {
            recipient: recipient.to_string(),
            amount: Uint128::new(amount),
        };
        self.execute(app, &minter, &msg).unwrap();
    }

    pub fn balance(&self, app: &App, address: &Addr) -> u128 {
        let msg = Cw20QueryMsg::Balance {
            address: address.to_string(),
        };
        let res: BalanceResponse = self.query(app, &msg).unwrap();
        res.balance.u128()
    }

    /// Cw20 `Send` from `sender` to `contract`, delivering `msg` to its `Receive` hook.
    pub fn send(
        &self,
        app: &mut App,
        sender: &Addr,
        contract: &Addr,
        amount: u128,
        msg: Binary,
    ) -> cw_multi_test::error::AnyResult<cw_multi_test::AppResponse> {
        let send = Cw20ExecuteMsg::Send {
            contract: contract.to_string(),
            amount: Uint128::new(amount),
            msg,
        };
        self.execute(app, sender, &send)
    }
}
