use cosmwasm_std::{Addr, Event, Response, StdError, StdResult, Storage};
use cw_storage_plus::Item;

/// The operator (owner) of a contract.
/// Operator-only messages compare the caller passed in by the entry point against this slot.
const OWNER: Item<Addr> = Item::new("_owner");

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum OwnershipError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("Unauthorized")]
    Unauthorized,
}

/// Set the [OWNER] of the contract (this is internal, no checks are done)
pub fn set_owner(storage: &mut dyn Storage, owner: &Addr) -> Result<(), OwnershipError> {
    OWNER.save(storage, owner)?;
    Ok(())
}

/// Get the owner of the contract
/// If [set_owner] has not been called, it will return an [StdError::NotFound]
pub fn get_owner(storage: &dyn Storage) -> StdResult<Addr> {
    OWNER.may_load(storage)?.ok_or(StdError::not_found("owner"))
}

/// Asserts that `sender` is the operator of the contract.
/// The caller identity is always handed in by the entry point, never read from ambient state.
pub fn assert_owner(storage: &dyn Storage, sender: &Addr) -> Result<(), OwnershipError> {
    let owner = get_owner(storage)?;
    if *sender != owner {
        return Err(OwnershipError::Unauthorized);
    }
    Ok(())
}

/// Hand the operator role over to `new_owner`, only the current operator can do this.
pub fn transfer_ownership(
    storage: &mut dyn Storage,
    sender: &Addr,
    new_owner: Addr,
) -> Result<Response, OwnershipError> {
    assert_owner(storage, sender)?;

    let old_owner = OWNER.load(storage)?;
    OWNER.save(storage, &new_owner)?;
    Ok(Response::new().add_event(
        Event::new("TransferredOwnership")
            .add_attribute("old_owner", old_owner.as_str())
            .add_attribute("new_owner", new_owner.as_str()),
    ))
}
