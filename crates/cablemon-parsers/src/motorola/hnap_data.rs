//! Decoding of the Motorola `GetMotoStatus*` HNAP actions
//!
//! Both HNAP models return the same payload; only the wire encoding differs.

use std::collections::BTreeMap;

use cablemon_auth::HnapFields;
use cablemon_core::{
    apply_restart_window, parse_records, parse_uptime_seconds, ChannelReading, ExtractionError, ParseResult, Record,
};
use tracing::{debug, warn};

pub const STARTUP_SEQUENCE: &str = "GetMotoStatusStartupSequence";
pub const CONNECTION_INFO: &str = "GetMotoStatusConnectionInfo";
pub const DOWNSTREAM_INFO: &str = "GetMotoStatusDownstreamChannelInfo";
pub const UPSTREAM_INFO: &str = "GetMotoStatusUpstreamChannelInfo";
pub const LAG_STATUS: &str = "GetMotoLagStatus";

/// Actions requested on every poll
pub const HNAP_ACTIONS: &[&str] = &[
    STARTUP_SEQUENCE,
    CONNECTION_INFO,
    DOWNSTREAM_INFO,
    UPSTREAM_INFO,
    LAG_STATUS,
];

const DOWNSTREAM_FIELDS: usize = 9;
const UPSTREAM_FIELDS: usize = 7;

const CONNECTION_KEYS: &[(&str, &str)] = &[
    ("MotoConnSystemUpTime", "system_uptime"),
    ("MotoConnNetworkAccess", "network_access"),
];

const STARTUP_KEYS: &[(&str, &str)] = &[
    ("MotoConnDSFreq", "downstream_frequency"),
    ("MotoConnConnectivityStatus", "connectivity_status"),
    ("MotoConnBootStatus", "boot_status"),
    ("MotoConnSecurityStatus", "security_status"),
    ("MotoConnSecurityComment", "security_comment"),
];

// ID^Status^Modulation^ChID^Freq(MHz)^Power^SNR^Corrected^Uncorrected
fn downstream_record(record: &Record<'_>) -> Result<ChannelReading, ExtractionError> {
    Ok(ChannelReading {
        channel_id: record.number(0, "channel_id")?,
        lock_status: record.string(1),
        modulation: record.string(2),
        ch_id: Some(record.number(3, "ch_id")?),
        frequency: Some(record.mhz_as_hz(4, "frequency")?),
        power: Some(record.number(5, "power")?),
        snr: Some(record.number(6, "snr")?),
        corrected: Some(record.number(7, "corrected")?),
        uncorrected: Some(record.number(8, "uncorrected")?),
        ..ChannelReading::default()
    })
}

// ID^Status^Modulation^ChID^SymbolRate^Freq(MHz)^Power
fn upstream_record(record: &Record<'_>) -> Result<ChannelReading, ExtractionError> {
    Ok(ChannelReading {
        channel_id: record.number(0, "channel_id")?,
        lock_status: record.string(1),
        modulation: record.string(2),
        ch_id: Some(record.number(3, "ch_id")?),
        symbol_rate: Some(record.number(4, "symbol_rate")?),
        frequency: Some(record.mhz_as_hz(5, "frequency")?),
        power: Some(record.number(6, "power")?),
        ..ChannelReading::default()
    })
}

pub fn parse_downstream(data: &str) -> Vec<ChannelReading> {
    parse_records(data, DOWNSTREAM_FIELDS, downstream_record)
}

pub fn parse_upstream(data: &str) -> Vec<ChannelReading> {
    parse_records(data, UPSTREAM_FIELDS, upstream_record)
}

fn field<'a>(responses: &'a BTreeMap<String, HnapFields>, action: &str, name: &str) -> Option<&'a str> {
    responses
        .get(action)
        .and_then(|fields| fields.get(name))
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
}

/// Build a `ParseResult` from per-action HNAP fields keyed by action name
pub fn parse_hnap_data(responses: &BTreeMap<String, HnapFields>) -> ParseResult {
    let mut result = ParseResult::default();

    match field(responses, DOWNSTREAM_INFO, "MotoConnDownstreamChannel") {
        Some(data) => result.downstream = parse_downstream(data),
        None => warn!(actions = ?responses.keys().collect::<Vec<_>>(), "No downstream channel data in HNAP response"),
    }
    match field(responses, UPSTREAM_INFO, "MotoConnUpstreamChannel") {
        Some(data) => result.upstream = parse_upstream(data),
        None => warn!(actions = ?responses.keys().collect::<Vec<_>>(), "No upstream channel data in HNAP response"),
    }

    for (action, keys) in [(CONNECTION_INFO, CONNECTION_KEYS), (STARTUP_SEQUENCE, STARTUP_KEYS)] {
        for (source, target) in keys {
            if let Some(value) = field(responses, action, source) {
                result.set_info(target, value.trim());
            }
        }
    }

    let uptime = result.info("system_uptime").and_then(parse_uptime_seconds);
    apply_restart_window(&mut result, uptime);
    debug!(
        downstream = result.downstream.len(),
        upstream = result.upstream.len(),
        "Parsed HNAP channel data"
    );
    result
}
