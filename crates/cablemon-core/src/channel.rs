//! Canonical channel readings and per-poll results

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum length of the error text carried in a diagnostic context
pub const DIAGNOSTIC_ERROR_MAX_CHARS: usize = 200;

/// One downstream or upstream channel sample.
///
/// `power` and `snr` serialize as `null` when filtered; other fields a vendor
/// page does not report are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelReading {
    pub channel_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modulation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ch_id: Option<u32>,
    /// Hz
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<u64>,
    /// dBmV
    #[serde(default)]
    pub power: Option<f64>,
    /// dB, downstream only
    #[serde(default)]
    pub snr: Option<f64>,
    /// Upstream only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol_rate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrected: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncorrected: Option<u64>,
}

/// Why a parse produced an authentication failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticContext {
    pub parser: String,
    pub error: String,
    pub error_type: String,
}

impl DiagnosticContext {
    pub fn new(parser: &str, error: &str, error_type: &str) -> Self {
        Self {
            parser: parser.to_string(),
            error: error.chars().take(DIAGNOSTIC_ERROR_MAX_CHARS).collect(),
            error_type: error_type.to_string(),
        }
    }
}

/// Everything one `parse` call extracted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    pub downstream: Vec<ChannelReading>,
    pub upstream: Vec<ChannelReading>,
    pub system_info: BTreeMap<String, String>,
    #[serde(rename = "_auth_failure", default, skip_serializing_if = "is_false")]
    pub auth_failure: bool,
    #[serde(
        rename = "_diagnostic_context",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub diagnostic_context: Option<DiagnosticContext>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl ParseResult {
    /// Empty channels flagged as an authentication failure
    pub fn auth_failure(context: DiagnosticContext) -> Self {
        Self {
            auth_failure: true,
            diagnostic_context: Some(context),
            ..Self::default()
        }
    }

    pub fn set_info(&mut self, key: &str, value: impl Into<String>) {
        self.system_info.insert(key.to_string(), value.into());
    }

    pub fn info(&self, key: &str) -> Option<&str> {
        self.system_info.get(key).map(String::as_str)
    }

    /// True when no channel and no system information was extracted
    pub fn is_empty(&self) -> bool {
        self.downstream.is_empty() && self.upstream.is_empty() && self.system_info.is_empty()
    }
}
