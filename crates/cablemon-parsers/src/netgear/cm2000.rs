//! Netgear CM2000 (Nighthawk)
//!
//! `DocsisStatus.htm` embeds channel tables in JavaScript initializers:
//! `var tagValueList = '<count>|<fields...>'`, with a fixed number of fields
//! per channel.

use cablemon_auth::{AuthError, Session};
use cablemon_core::{
    apply_restart_window, parse_uptime_seconds, AuthConfig, AuthMethod, ChannelReading, ModemCapability,
    ParseResult, ParserDescriptor, UrlPattern,
};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use super::MANUFACTURER;
use crate::error::ParserError;
use crate::html::{compile, element_text, fetch_page, leading_number};
use crate::parser::{failure_result, ModemParser};

pub const NAME: &str = "Netgear CM2000";

pub const STATUS_PAGE: &str = "/DocsisStatus.htm";

const LOGIN_FIELD: &str = "loginName";
const DOWNSTREAM_FIELDS: usize = 9;
const UPSTREAM_FIELDS: usize = 7;

static DOWNSTREAM_RE: Lazy<Regex> = Lazy::new(|| tag_value_pattern("InitDsTableTagValue"));
static UPSTREAM_RE: Lazy<Regex> = Lazy::new(|| tag_value_pattern("InitUsTableTagValue"));

fn tag_value_pattern(function: &str) -> Regex {
    Regex::new(&format!(
        r#"(?s)function\s+{}\s*\(\s*\)\s*\{{.*?var\s+tagValueList\s*=\s*['"]([^'"]*)['"]"#,
        function
    ))
    .expect("tag value pattern is valid")
}

/// The `tagValueList` string assigned inside `function`, if present
fn tag_values<'a>(pattern: &Regex, html: &'a str) -> Option<&'a str> {
    pattern.captures(html).and_then(|c| c.get(1)).map(|m| m.as_str())
}

/// Split `<count>|f1|f2|...` into per-channel field slices
fn channel_fields(list: &str, per_channel: usize) -> Vec<Vec<&str>> {
    let mut values = list.split('|').map(str::trim);
    let count: usize = match values.next().and_then(|c| c.parse().ok()) {
        Some(count) => count,
        None => {
            debug!(list = %list, "tagValueList has no channel count");
            return Vec::new();
        }
    };
    let fields: Vec<&str> = values.collect();
    let available = fields.len() / per_channel;
    if available < count {
        warn!(declared = count, available, "tagValueList shorter than its channel count");
    }
    fields.chunks_exact(per_channel).take(count).map(<[&str]>::to_vec).collect()
}

fn text(fields: &[&str], index: usize) -> Option<String> {
    fields.get(index).filter(|s| !s.is_empty()).map(|s| s.to_string())
}

fn number<T: std::str::FromStr>(fields: &[&str], index: usize) -> Option<T> {
    fields.get(index).and_then(|v| leading_number(v))
}

// Channel, Lock Status, Modulation, Channel ID, Frequency, Power, SNR, Corrected, Uncorrectable
fn downstream(list: &str) -> Vec<ChannelReading> {
    channel_fields(list, DOWNSTREAM_FIELDS)
        .iter()
        .filter_map(|f| {
            let Some(channel_id) = number(f, 0) else {
                warn!(fields = ?f, "Skipping downstream channel without a number");
                return None;
            };
            Some(ChannelReading {
                channel_id,
                lock_status: text(f, 1),
                modulation: text(f, 2),
                ch_id: number(f, 3),
                frequency: number(f, 4),
                power: number(f, 5),
                snr: number(f, 6),
                corrected: number(f, 7),
                uncorrected: number(f, 8),
                ..ChannelReading::default()
            })
        })
        .collect()
}

// Channel, Lock Status, Channel Type, Channel ID, Symbol Rate, Frequency, Power
fn upstream(list: &str) -> Vec<ChannelReading> {
    channel_fields(list, UPSTREAM_FIELDS)
        .iter()
        .filter_map(|f| {
            let Some(channel_id) = number(f, 0) else {
                warn!(fields = ?f, "Skipping upstream channel without a number");
                return None;
            };
            Some(ChannelReading {
                channel_id,
                lock_status: text(f, 1),
                modulation: text(f, 2),
                ch_id: number(f, 3),
                symbol_rate: number(f, 4),
                frequency: number(f, 5),
                power: number(f, 6),
                ..ChannelReading::default()
            })
        })
        .collect()
}

#[derive(Debug)]
pub struct NetgearCm2000Parser {
    descriptor: ParserDescriptor,
    uptime: Selector,
}

impl NetgearCm2000Parser {
    pub fn new() -> Result<Self, ParserError> {
        let descriptor = ParserDescriptor::new(NAME, MANUFACTURER, &["CM2000"])
            .priority(100)
            .verified("community user report")
            .capabilities(&[
                ModemCapability::DownstreamChannels,
                ModemCapability::UpstreamChannels,
                ModemCapability::SystemUptime,
            ])
            .url(UrlPattern::new(STATUS_PAGE, AuthMethod::Form, true))
            .auth(AuthConfig::form("/goform/Login", LOGIN_FIELD, "loginPassword"));
        Ok(Self {
            descriptor,
            uptime: compile("#SystemUpTime")?,
        })
    }

    fn extract(&self, document: &Html, html: &str) -> ParseResult {
        let mut result = ParseResult::default();
        if let Some(list) = tag_values(&DOWNSTREAM_RE, html) {
            result.downstream = downstream(list);
        }
        if let Some(list) = tag_values(&UPSTREAM_RE, html) {
            result.upstream = upstream(list);
        }
        if let Some(cell) = document.select(&self.uptime).next() {
            let text = element_text(cell);
            let value = text.trim_start_matches("System Up Time").trim_start_matches(':').trim();
            if !value.is_empty() {
                result.set_info("system_uptime", value);
            }
        }
        result
    }

    fn fetch_status(&self, session: &mut Session, base_url: &str) -> Result<ParseResult, ParserError> {
        let page = fetch_page(session, base_url, STATUS_PAGE)?;
        if tag_values(&DOWNSTREAM_RE, &page).is_none() && page.contains(LOGIN_FIELD) {
            return Err(AuthError::Rejected(format!("Login page served instead of {}", STATUS_PAGE)).into());
        }
        Ok(self.extract(&Html::parse_document(&page), &page))
    }
}

impl ModemParser for NetgearCm2000Parser {
    fn descriptor(&self) -> &ParserDescriptor {
        &self.descriptor
    }

    fn can_parse(&self, _document: &Html, _url: &str, html: &str) -> bool {
        html.contains("CM2000")
    }

    fn parse(&self, document: &Html, session: Option<&mut Session>, base_url: Option<&str>) -> ParseResult {
        let html = document.html();
        let mut result = match (session, base_url) {
            (Some(session), Some(base_url)) if tag_values(&DOWNSTREAM_RE, &html).is_none() => {
                match self.fetch_status(session, base_url) {
                    Ok(result) => result,
                    Err(e) => return failure_result(NAME, &e),
                }
            }
            _ => self.extract(document, &html),
        };
        let uptime = result.info("system_uptime").and_then(parse_uptime_seconds);
        apply_restart_window(&mut result, uptime);
        result
    }
}
