//! Storage deposits sized from the entity schema.
//!
//! Fixed-width fields count their width, variable-length fields count a 4-byte length
//! prefix plus their content, an `Option` adds a 1-byte tag and a `Vec` adds a 4-byte count.

use crate::msg::{Answer, Auth, DataSource};
use crate::state::{DepositConfig, Report};
use cosmwasm_std::{Coin, StdResult, Uint128};

/// Width of a length or count prefix.
const LEN_PREFIX: u64 = 4;
const REQUEST_ID_SIZE: u64 = 32;
const TIMESTAMP_SIZE: u64 = 8;
const METHOD_SIZE: u64 = 1;
const OPTION_TAG: u64 = 1;

pub trait StorageSize {
    /// Bytes this value occupies once stored.
    fn storage_size(&self) -> u64;
}

impl StorageSize for str {
    fn storage_size(&self) -> u64 {
        LEN_PREFIX + self.len() as u64
    }
}

impl StorageSize for String {
    fn storage_size(&self) -> u64 {
        self.as_str().storage_size()
    }
}

impl<T: StorageSize> StorageSize for Option<T> {
    fn storage_size(&self) -> u64 {
        OPTION_TAG + self.as_ref().map_or(0, StorageSize::storage_size)
    }
}

impl<T: StorageSize> StorageSize for Vec<T> {
    fn storage_size(&self) -> u64 {
        LEN_PREFIX + self.iter().map(StorageSize::storage_size).sum::<u64>()
    }
}

impl StorageSize for Auth {
    fn storage_size(&self) -> u64 {
        self.place_path.storage_size() + self.value_path.storage_size()
    }
}

impl StorageSize for DataSource {
    fn storage_size(&self) -> u64 {
        self.name.storage_size()
            + self.url.storage_size()
            + METHOD_SIZE
            + self.headers.storage_size()
            + self.body_json.storage_size()
            + self.query_json.storage_size()
            + self.result_paths.storage_size()
            + self.auth.storage_size()
    }
}

impl StorageSize for Answer {
    fn storage_size(&self) -> u64 {
        self.data_source_name.storage_size()
            + self.result.storage_size()
            + self.error.storage_size()
    }
}

impl StorageSize for Report {
    fn storage_size(&self) -> u64 {
        REQUEST_ID_SIZE
            + self.reporter.as_str().storage_size()
            + TIMESTAMP_SIZE
            + self.reward_address.storage_size()
            + self.answers.storage_size()
    }
}

/// `storage_size × price_per_byte` in the configured denom.
pub fn deposit_required(item: &impl StorageSize, config: &DepositConfig) -> StdResult<Coin> {
    let amount = Uint128::from(item.storage_size()).checked_mul(config.price_per_byte)?;
    Ok(Coin {
        denom: config.denom.clone(),
        amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msg::HttpMethod;
    use crate::state::RequestId;
    use cosmwasm_std::{Addr, Timestamp};

    fn answer(result: &str, error: Option<&str>) -> Answer {
        Answer {
            data_source_name: "price".to_string(),
            result: result.to_string(),
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_answer_size() {
        // (4 + 5) + (4 + 3) + 1
        assert_eq!(answer("100", None).storage_size(), 17);
        // (4 + 5) + (4 + 0) + (1 + 4 + 7)
        assert_eq!(answer("", Some("timeout")).storage_size(), 25);
    }

    #[test]
    fn test_report_size() {
        let report = Report {
            request_id: RequestId::new(1, 1),
            reporter: Addr::unchecked("reporter"),
            timestamp: Timestamp::from_seconds(1),
            reward_address: format!("0x{}", "ab".repeat(20)),
            answers: vec![answer("100", None), answer("101", None)],
        };
        // 32 + (4 + 8) + 8 + (4 + 42) + (4 + 17 + 17)
        assert_eq!(report.storage_size(), 136);
    }

    #[test]
    fn test_data_source_size() {
        let data_source = DataSource {
            name: "price".to_string(),
            url: "https://a.b".to_string(),
            method: HttpMethod::Get,
            headers: None,
            body_json: Some("{}".to_string()),
            query_json: None,
            result_paths: vec!["a.b".to_string()],
            auth: Some(Auth {
                place_path: "h".to_string(),
                value_path: "k".to_string(),
            }),
        };
        // 9 + 15 + 1 + 1 + 7 + 1 + (4 + 7) + (1 + 5 + 5)
        assert_eq!(data_source.storage_size(), 56);
    }

    #[test]
    fn test_deposit_required() {
        let config = DepositConfig {
            denom: "uxapi".to_string(),
            price_per_byte: Uint128::new(10),
        };
        let coin = deposit_required(&answer("100", None), &config).unwrap();
        assert_eq!(coin, Coin::new(170u128, "uxapi"));

        let config = DepositConfig {
            denom: "uxapi".to_string(),
            price_per_byte: Uint128::MAX,
        };
        assert!(deposit_required(&answer("100", None), &config).is_err());
    }
}
