use crate::StakingError;
use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, StdResult, Storage, Timestamp, Uint128};
use cw_storage_plus::{Item, Map};
use xapi_library::time::DAYS;

/// The cw20 token that is staked, only transfer notifications from it are accepted.
pub const TOKEN: Item<Addr> = Item::new("token");

/// Seconds an unlocking entry waits before it can be withdrawn.
pub const UNLOCK_PERIOD: Item<u64> = Item::new("unlock_period");

pub const DEFAULT_UNLOCK_PERIOD: u64 = 7 * DAYS;

/// Sum of the live `amount` of every account in [STAKED], unlocking funds are not counted.
pub const TOTAL_STAKED: Item<Uint128> = Item::new("total_staked");

pub const STAKED: Map<&Addr, Staked> = Map::new("staked");

/// Upper bound for a single top staked ranking.
pub const MAX_TOP_STAKED: u32 = 100;

#[cw_serde]
pub struct Unlocking {
    pub amount: Uint128,
    pub unlock_time: Timestamp,
}

#[cw_serde]
#[derive(Default)]
pub struct Staked {
    pub amount: Uint128,
    /// Oldest first.
    pub unlocking: Vec<Unlocking>,
}

/// Portions of a penalty taken from the live balance and from the unlocking queue.
#[derive(Debug, PartialEq)]
pub struct Slashed {
    pub from_staked: Uint128,
    pub from_unlocking: Uint128,
}

impl Staked {
    /// Nothing live and nothing unlocking.
    pub fn is_drained(&self) -> bool {
        self.amount.is_zero() && self.unlocking.is_empty()
    }

    pub fn unlocking_total(&self) -> Uint128 {
        self.unlocking.iter().map(|u| u.amount).sum()
    }

    /// Move `amount` out of the live balance into a new unlocking entry.
    pub fn unlock(&mut self, amount: Uint128, unlock_time: Timestamp) -> Result<(), StakingError> {
        if amount > self.amount {
            return Err(StakingError::InsufficientStake {
                staked: self.amount,
                requested: amount,
            });
        }
        self.amount -= amount;
        self.unlocking.push(Unlocking {
            amount,
            unlock_time,
        });
        Ok(())
    }

    /// Remove every entry that matured at `now` and return their sum.
    pub fn withdraw_unlocked(&mut self, now: Timestamp) -> Result<Uint128, StakingError> {
        let (matured, pending): (Vec<_>, Vec<_>) = self
            .unlocking
            .drain(..)
            .partition(|u| u.unlock_time <= now);
        self.unlocking = pending;

        if matured.is_empty() {
            return Err(StakingError::NothingUnlocked);
        }
        Ok(matured.iter().map(|u| u.amount).sum())
    }

    /// Take `amount` from the live balance first, then from unlocking entries oldest first.
    /// Nothing changes if staked plus unlocking cannot cover it.
    pub fn slash(&mut self, amount: Uint128) -> Result<Slashed, StakingError> {
        let available = self.amount.checked_add(self.unlocking_total())?;
        if amount > available {
            return Err(StakingError::InsufficientTotal {
                available,
                requested: amount,
            });
        }

        let from_staked = amount.min(self.amount);
        self.amount -= from_staked;

        let mut remainder = amount - from_staked;
        for entry in self.unlocking.iter_mut() {
            if remainder.is_zero() {
                break;
            }
            let taken = remainder.min(entry.amount);
            entry.amount -= taken;
            remainder -= taken;
        }
        self.unlocking.retain(|u| !u.amount.is_zero());

        Ok(Slashed {
            from_staked,
            from_unlocking: amount - from_staked,
        })
    }
}

pub fn get_staked(storage: &dyn Storage, account: &Addr) -> StdResult<Staked> {
    Ok(STAKED.may_load(storage, account)?.unwrap_or_default())
}

/// Save `staked` for `account`, a drained account is removed from [STAKED] instead.
pub fn save_staked(storage: &mut dyn Storage, account: &Addr, staked: &Staked) -> StdResult<()> {
    if staked.is_drained() {
        STAKED.remove(storage, account);
        return Ok(());
    }
    STAKED.save(storage, account, staked)
}

pub fn get_total_staked(storage: &dyn Storage) -> StdResult<Uint128> {
    Ok(TOTAL_STAKED.may_load(storage)?.unwrap_or_default())
}

pub fn get_unlock_period(storage: &dyn Storage) -> StdResult<u64> {
    Ok(UNLOCK_PERIOD
        .may_load(storage)?
        .unwrap_or(DEFAULT_UNLOCK_PERIOD))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(seconds: u64) -> Timestamp {
        Timestamp::from_seconds(seconds)
    }

    #[test]
    fn test_unlock() {
        let mut staked = Staked {
            amount: Uint128::new(1000),
            unlocking: vec![],
        };

        staked.unlock(Uint128::new(500), at(100)).unwrap();
        assert_eq!(staked.amount, Uint128::new(500));
        assert_eq!(
            staked.unlocking,
            vec![Unlocking {
                amount: Uint128::new(500),
                unlock_time: at(100),
            }]
        );

        let err = staked.unlock(Uint128::new(501), at(200)).unwrap_err();
        assert_eq!(
            err,
            StakingError::InsufficientStake {
                staked: Uint128::new(500),
                requested: Uint128::new(501),
            }
        );
        assert_eq!(staked.unlocking.len(), 1);
    }

    #[test]
    fn test_withdraw_unlocked() {
        let mut staked = Staked {
            amount: Uint128::zero(),
            unlocking: vec![
                Unlocking {
                    amount: Uint128::new(10),
                    unlock_time: at(100),
                },
                Unlocking {
                    amount: Uint128::new(20),
                    unlock_time: at(200),
                },
                Unlocking {
                    amount: Uint128::new(30),
                    unlock_time: at(150),
                },
            ],
        };

        assert_eq!(
            staked.withdraw_unlocked(at(99)),
            Err(StakingError::NothingUnlocked)
        );
        assert_eq!(staked.unlocking.len(), 3);

        assert_eq!(staked.withdraw_unlocked(at(150)), Ok(Uint128::new(40)));
        assert_eq!(
            staked.unlocking,
            vec![Unlocking {
                amount: Uint128::new(20),
                unlock_time: at(200),
            }]
        );
    }

    #[test]
    fn test_slash_live_then_oldest_unlocking() {
        let mut staked = Staked {
            amount: Uint128::new(1500),
            unlocking: vec![],
        };
        staked.unlock(Uint128::new(500), at(10)).unwrap();
        staked.unlock(Uint128::new(800), at(20)).unwrap();
        assert_eq!(staked.amount, Uint128::new(200));

        let slashed = staked.slash(Uint128::new(1200)).unwrap();
        assert_eq!(
            slashed,
            Slashed {
                from_staked: Uint128::new(200),
                from_unlocking: Uint128::new(1000),
            }
        );
        assert_eq!(staked.amount, Uint128::zero());
        assert_eq!(
            staked.unlocking,
            vec![Unlocking {
                amount: Uint128::new(300),
                unlock_time: at(20),
            }]
        );
    }

    #[test]
    fn test_slash_exceeding_total() {
        let mut staked = Staked {
            amount: Uint128::new(100),
            unlocking: vec![Unlocking {
                amount: Uint128::new(50),
                unlock_time: at(10),
            }],
        };
        let before = staked.clone();

        let err = staked.slash(Uint128::new(151)).unwrap_err();
        assert_eq!(
            err,
            StakingError::InsufficientTotal {
                available: Uint128::new(150),
                requested: Uint128::new(151),
            }
        );
        assert_eq!(staked, before);

        // exactly everything
        let slashed = staked.slash(Uint128::new(150)).unwrap();
        assert_eq!(slashed.from_unlocking, Uint128::new(50));
        assert_eq!(staked, Staked::default());
        assert!(staked.is_drained());
    }

    #[test]
    fn test_save_staked_removes_drained() {
        let mut storage = cosmwasm_std::testing::MockStorage::new();
        let account = Addr::unchecked("account");

        let mut staked = Staked {
            amount: Uint128::new(10),
            unlocking: vec![],
        };
        save_staked(&mut storage, &account, &staked).unwrap();
        assert!(STAKED.has(&storage, &account));

        // unlocking funds keep the entry
        staked.unlock(Uint128::new(10), at(100)).unwrap();
        save_staked(&mut storage, &account, &staked).unwrap();
        assert_eq!(STAKED.load(&storage, &account).unwrap(), staked);

        staked.withdraw_unlocked(at(100)).unwrap();
        save_staked(&mut storage, &account, &staked).unwrap();
        assert!(!STAKED.has(&storage, &account));
        assert_eq!(get_staked(&storage, &account).unwrap(), Staked::default());
    }
}
