//! Majority consensus over the reports of one request.

use crate::state::{Report, ReporterRequired};
use cosmwasm_std::{Addr, HexBinary};
use thiserror::Error;
use xapi_codec::abi::{self, AbiType, AbiValue};
use xapi_codec::CodecError;

/// `error_code` of a response finalized because enough reporters hit a data source error.
pub const ERROR_CODE_DATA_SOURCE: u16 = 1;

#[derive(Error, Debug, PartialEq)]
pub enum AggregateError {
    #[error("{0}")]
    Codec(#[from] CodecError),

    #[error("No reporter of this request is in the top staked set")]
    NoValidReporters,

    #[error("Quorum not met: {valid} valid reporters, {quorum} required")]
    QuorumNotMet { valid: u32, quorum: u32 },

    #[error("Threshold not met: {support} reporters agree, {threshold} required")]
    ThresholdNotMet { support: u32, threshold: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// Reporters rewarded for this result, in report order.
    pub valid_reporters: Vec<Addr>,
    pub reporter_reward_addresses: Vec<String>,
    /// `abi.encode(bytes)` of the agreed value.
    pub result: HexBinary,
    pub error_code: u16,
}

/// The most frequent value, ties go to the value seen first.
/// Returns the value and its count, `None` when `values` is empty.
pub fn majority<'a, I>(values: I) -> Option<(&'a str, u32)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: Vec<(&str, u32)> = vec![];
    for value in values {
        match counts.iter_mut().find(|(seen, _)| *seen == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value, 1)),
        }
    }

    // max_by_key keeps the last maximum, walk in reverse so the first seen wins
    counts.into_iter().rev().max_by_key(|(_, count)| *count)
}

/// `abi.encode(bytes(value))`, the result relayed to the destination contract.
pub fn encode_result(value: &[u8]) -> Result<HexBinary, CodecError> {
    let encoded = abi::encode(&[AbiType::Bytes], &[AbiValue::Bytes(value.to_vec())])?;
    Ok(HexBinary::from(encoded))
}

struct ReporterValue<'a> {
    report: &'a Report,
    value: &'a str,
    errored: bool,
}

/// Aggregate `reports` (in submission order) of the reporters found in `top_staked`.
///
/// Each report is first reduced to its own majority answer. A report with any answer error
/// counts as an error reporter, and once `threshold` of them exist the request is finalized
/// with [ERROR_CODE_DATA_SOURCE]. Otherwise the majority across reporters must have at least
/// `threshold` supporters out of at least `quorum` valid reporters.
pub fn aggregate(
    reports: &[Report],
    top_staked: &[Addr],
    required: &ReporterRequired,
) -> Result<Aggregation, AggregateError> {
    let values: Vec<ReporterValue> = reports
        .iter()
        .filter(|report| top_staked.contains(&report.reporter))
        .map(|report| ReporterValue {
            report,
            value: majority(report.answers.iter().map(|a| a.result.as_str()))
                .map_or("", |(value, _)| value),
            errored: report.answers.iter().any(|a| a.error.is_some()),
        })
        .collect();

    if values.is_empty() {
        return Err(AggregateError::NoValidReporters);
    }

    let errored = values.iter().filter(|v| v.errored).count() as u32;
    if errored >= required.threshold {
        let reporters: Vec<&ReporterValue> = values.iter().filter(|v| v.errored).collect();
        return finalize(&reporters, b"", ERROR_CODE_DATA_SOURCE);
    }

    let valid = values.len() as u32;
    if valid < required.quorum {
        return Err(AggregateError::QuorumNotMet {
            valid,
            quorum: required.quorum,
        });
    }

    let (value, support) = majority(values.iter().map(|v| v.value))
        .ok_or(AggregateError::NoValidReporters)?;
    if support < required.threshold {
        return Err(AggregateError::ThresholdNotMet {
            support,
            threshold: required.threshold,
        });
    }

    let reporters: Vec<&ReporterValue> = values.iter().filter(|v| v.value == value).collect();
    finalize(&reporters, value.as_bytes(), 0)
}

fn finalize(
    reporters: &[&ReporterValue],
    value: &[u8],
    error_code: u16,
) -> Result<Aggregation, AggregateError> {
    Ok(Aggregation {
        valid_reporters: reporters.iter().map(|v| v.report.reporter.clone()).collect(),
        reporter_reward_addresses: reporters
            .iter()
            .map(|v| v.report.reward_address.clone())
            .collect(),
        result: encode_result(value)?,
        error_code,
    })
}
