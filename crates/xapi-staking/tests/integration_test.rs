use cosmwasm_std::testing::mock_env;
use cosmwasm_std::{to_json_binary, Addr, Event, Uint128};
use cw_multi_test::App;
use xapi_library::testing::{Cw20TokenContract, TestingContract};
use xapi_library::time::DAYS;
use xapi_staking::msg::{ExecuteMsg, QueryMsg, StakerAmount, TopStakedResponse};
use xapi_staking::state::{Staked, Unlocking};
use xapi_staking::testing::StakingContract;
use xapi_staking::StakingError;

struct TestContracts {
    token: Cw20TokenContract,
    staking: StakingContract,
}

impl TestContracts {
    fn init(app: &mut App) -> TestContracts {
        let env = mock_env();

        let token = Cw20TokenContract::new(app, &env, None);
        let staking = StakingContract::new(app, &env, None);

        Self { token, staking }
    }
}

#[test]
fn test_stake_through_token() {
    let app = &mut App::default();
    let TestContracts { token, staking } = TestContracts::init(app);

    let staker = app.api().addr_make("staker");
    token.fund(app, &staker, 1_000);

    let res = staking.stake(app, &token, &staker, 1_000).unwrap();
    assert!(res.has_event(
        &Event::new("wasm-Stake")
            .add_attribute("account", staker.as_str())
            .add_attribute("amount", "1000")
    ));

    assert_eq!(token.balance(app, &staker), 0);
    assert_eq!(token.balance(app, &staking.addr), 1_000);

    let total: Uint128 = staking.query(app, &QueryMsg::TotalStaked {}).unwrap();
    assert_eq!(total, Uint128::new(1_000));

    let staked = staking.staked(app, &staker);
    assert_eq!(staked.amount, Uint128::new(1_000));
}

#[test]
fn test_receive_not_from_token() {
    let app = &mut App::default();
    let TestContracts { token, staking } = TestContracts::init(app);

    // a second token that is not the staking token
    let env = mock_env();
    let code_id = Cw20TokenContract::store_code(app);
    let init = Cw20TokenContract::default_init(app, &env);
    let addr = Cw20TokenContract::instantiate(app, code_id, "other_token", &init);
    let other = Cw20TokenContract { addr, init };

    let staker = app.api().addr_make("staker");
    other.fund(app, &staker, 1_000);

    let err = staking.stake(app, &other, &staker, 1_000).unwrap_err();
    assert_eq!(
        err.root_cause().to_string(),
        StakingError::unauthorized("transfer notification not from the staking token").to_string()
    );
    assert_eq!(other.balance(app, &staker), 1_000);

    // right token, wrong hook
    token.fund(app, &staker, 1_000);
    let err = token
        .send(
            app,
            &staker,
            &staking.addr,
            1_000,
            to_json_binary(&"Deposit").unwrap(),
        )
        .unwrap_err();
    assert_eq!(
        err.root_cause().to_string(),
        StakingError::unauthorized("unknown transfer hook").to_string()
    );
    assert_eq!(token.balance(app, &staker), 1_000);
}

#[test]
fn test_unlock_and_withdraw_after_period() {
    let app = &mut App::default();
    let TestContracts { token, staking } = TestContracts::init(app);

    let staker = app.api().addr_make("staker");
    token.fund(app, &staker, 1_000);
    staking.stake(app, &token, &staker, 1_000).unwrap();

    let msg = ExecuteMsg::Unlock {
        amount: Uint128::new(500),
    };
    staking.execute(app, &staker, &msg).unwrap();

    let unlock_time = app.block_info().time.plus_seconds(7 * DAYS);
    assert_eq!(
        staking.staked(app, &staker),
        Staked {
            amount: Uint128::new(500),
            unlocking: vec![Unlocking {
                amount: Uint128::new(500),
                unlock_time,
            }],
        }
    );

    // one second early
    app.update_block(|block| {
        block.time = unlock_time.minus_seconds(1);
    });
    let err = staking
        .execute(app, &staker, &ExecuteMsg::Withdraw {})
        .unwrap_err();
    assert_eq!(
        err.root_cause().to_string(),
        StakingError::NothingUnlocked.to_string()
    );

    app.update_block(|block| {
        block.time = unlock_time;
    });
    staking
        .execute(app, &staker, &ExecuteMsg::Withdraw {})
        .unwrap();

    assert_eq!(token.balance(app, &staker), 500);
    assert_eq!(token.balance(app, &staking.addr), 500);
    assert!(staking.staked(app, &staker).unlocking.is_empty());
}

#[test]
fn test_slash_transfers_to_owner() {
    let app = &mut App::default();
    let TestContracts { token, staking } = TestContracts::init(app);
    let owner = Addr::unchecked(&staking.init.owner);

    let staker = app.api().addr_make("staker");
    token.fund(app, &staker, 1_500);
    staking.stake(app, &token, &staker, 1_500).unwrap();

    let unlock = |amount: u128| ExecuteMsg::Unlock {
        amount: Uint128::new(amount),
    };
    staking.execute(app, &staker, &unlock(500)).unwrap();
    app.update_block(|block| block.time = block.time.plus_seconds(60));
    staking.execute(app, &staker, &unlock(800)).unwrap();

    let msg = ExecuteMsg::Slash {
        account: staker.to_string(),
        amount: Uint128::new(1_200),
    };

    let err = staking.execute(app, &staker, &msg).unwrap_err();
    assert_eq!(err.root_cause().to_string(), "Unauthorized");

    staking.execute(app, &owner, &msg).unwrap();

    let staked = staking.staked(app, &staker);
    assert_eq!(staked.amount, Uint128::zero());
    assert_eq!(staked.unlocking.len(), 1);
    assert_eq!(staked.unlocking[0].amount, Uint128::new(300));

    assert_eq!(token.balance(app, &owner), 1_200);
    assert_eq!(token.balance(app, &staking.addr), 300);

    let total: Uint128 = staking.query(app, &QueryMsg::TotalStaked {}).unwrap();
    assert_eq!(total, Uint128::zero());
}

#[test]
fn test_top_staked_ranking() {
    let app = &mut App::default();
    let TestContracts { token, staking } = TestContracts::init(app);

    let amounts = [400u128, 100, 300, 300, 200];
    let stakers: Vec<Addr> = amounts
        .iter()
        .enumerate()
        .map(|(i, _)| app.api().addr_make(&format!("staker/{}", i)))
        .collect();

    for (staker, amount) in stakers.iter().zip(amounts) {
        token.fund(app, staker, amount);
        staking.stake(app, &token, staker, amount).unwrap();
    }

    let response: TopStakedResponse = staking
        .query(app, &QueryMsg::TopStaked { n: 3 })
        .unwrap();

    let mut tied = vec![stakers[2].clone(), stakers[3].clone()];
    tied.sort();
    assert_eq!(
        response.0,
        vec![
            StakerAmount {
                account: stakers[0].clone(),
                amount: Uint128::new(400),
            },
            StakerAmount {
                account: tied[0].clone(),
                amount: Uint128::new(300),
            },
            StakerAmount {
                account: tied[1].clone(),
                amount: Uint128::new(300),
            },
        ]
    );

    // n above the number of stakers
    let response: TopStakedResponse = staking
        .query(app, &QueryMsg::TopStaked { n: 50 })
        .unwrap();
    assert_eq!(response.0.len(), 5);
    assert_eq!(response.0[4].account, stakers[1]);
}
