//! Messages exchanged with the threshold-signature (MPC) contract.
//!
//! The aggregator executes [MpcExecuteMsg::Sign] on the signer, which answers later by executing
//! `SignatureCallback` on the aggregator with the same `callback_id`.

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{to_json_binary, Binary, CosmosMsg, HexBinary, StdResult, WasmMsg};

/// Key derivation scheme, bumped if the derived keys ever change.
pub const DERIVATION_VERSION: u32 = 1;

/// `XAPI-1-<chain_id>`, every request for the same chain is signed by the same derived key.
pub fn derivation_path(chain_id: u64) -> String {
    format!("XAPI-{}-{}", DERIVATION_VERSION, chain_id)
}

#[cw_serde]
pub struct SignRequest {
    /// The 32-byte digest to sign.
    pub payload: HexBinary,
    pub path: String,
    pub key_version: u32,
}

#[cw_serde]
pub enum MpcExecuteMsg {
    Sign {
        request: SignRequest,
        callback_id: u64,
    },
}

impl MpcExecuteMsg {
    pub fn into_cosmos_msg<T: Into<String>>(self, contract_addr: T) -> StdResult<CosmosMsg> {
        let execute = WasmMsg::Execute {
            contract_addr: contract_addr.into(),
            msg: to_json_binary(&self)?,
            funds: vec![],
        };
        Ok(execute.into())
    }
}

#[cw_serde]
pub struct SignatureResponse {
    /// Compressed point `R`, 33 bytes hex.
    pub big_r: String,
    /// 32 bytes hex.
    pub s: String,
    pub recovery_id: u8,
}

#[cw_serde]
pub enum SignOutcome {
    Signed(SignatureResponse),
    Failed { reason: String },
}

#[cw_serde]
pub struct SignatureCallbackMsg {
    pub callback_id: u64,
    pub outcome: SignOutcome,
}

impl SignatureCallbackMsg {
    /// Serializes the message with the `SignatureCallback` variant the requester exposes.
    pub fn into_json_binary(self) -> StdResult<Binary> {
        let msg = SignatureCallbackExecuteMsg::SignatureCallback(self);
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
enum SignatureCallbackExecuteMsg {
    SignatureCallback(SignatureCallbackMsg),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msg::ExecuteMsg;
    use cosmwasm_std::from_json;

    #[test]
    fn test_derivation_path() {
        assert_eq!(derivation_path(1), "XAPI-1-1");
        assert_eq!(derivation_path(11_155_111), "XAPI-1-11155111");
    }

    #[test]
    fn test_callback_serializes_as_execute_msg() {
        let callback = SignatureCallbackMsg {
            callback_id: 7,
            outcome: SignOutcome::Failed {
                reason: "timeout".to_string(),
            },
        };

        let binary = callback.clone().into_json_binary().unwrap();
        let msg: ExecuteMsg = from_json(&binary).unwrap();
        assert_eq!(msg, ExecuteMsg::SignatureCallback(callback));
    }
}
