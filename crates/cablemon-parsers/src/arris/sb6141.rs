//! ARRIS SB6141
//!
//! `cmSignalData.htm` lays channels out column-wise: each row is a label cell
//! followed by one cell per channel. Codeword counters live in a separate
//! table and are joined to downstream channels by channel ID.

use std::collections::BTreeMap;

use cablemon_auth::Session;
use cablemon_core::{
    apply_restart_window, parse_uptime_seconds, ChannelReading, ModemCapability, ParseResult, ParserDescriptor,
    UrlPattern,
};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::MANUFACTURER;
use crate::error::ParserError;
use crate::html::{compile, direct_cells, direct_rows, element_text, fetch_page, leading_number};
use crate::parser::{failure_result, is_auth_failure, ModemParser};

pub const NAME: &str = "ARRIS SB6141";

pub const SIGNAL_PAGE: &str = "/cmSignalData.htm";
pub const STATUS_PAGE: &str = "/indexData.htm";

const SYSTEM_INFO_LABELS: &[(&str, &str)] = &[
    ("Up Time", "system_uptime"),
    ("Software Version", "software_version"),
    ("Hardware Version", "hardware_version"),
];

/// One transposed table: label to per-channel cell text
#[derive(Debug, Default)]
struct Transposed {
    rows: Vec<(String, Vec<String>)>,
}

impl Transposed {
    fn from_table(table: ElementRef<'_>) -> Self {
        let rows = direct_rows(table)
            .into_iter()
            .filter_map(|row| {
                let cells = direct_cells(row);
                let (label, values) = cells.split_first()?;
                Some((element_text(*label), values.iter().map(|c| element_text(*c)).collect()))
            })
            .collect();
        Self { rows }
    }

    fn title(&self) -> &str {
        self.rows.first().map(|(label, _)| label.as_str()).unwrap_or_default()
    }

    /// Values of the first row whose label starts with `label`
    fn values(&self, label: &str) -> &[String] {
        self.rows
            .iter()
            .find(|(l, _)| l.starts_with(label))
            .map(|(_, v)| v.as_slice())
            .unwrap_or_default()
    }

    fn channel_ids(&self) -> Vec<u32> {
        self.values("Channel ID").iter().filter_map(|v| leading_number(v)).collect()
    }

    fn number<T: std::str::FromStr>(&self, label: &str, column: usize) -> Option<T> {
        self.values(label).get(column).and_then(|v| leading_number(v))
    }

    fn text(&self, label: &str, column: usize) -> Option<String> {
        self.values(label).get(column).filter(|v| !v.is_empty()).cloned()
    }
}

#[derive(Debug, Default)]
struct SignalTables {
    downstream: Transposed,
    upstream: Transposed,
    codewords: Transposed,
}

#[derive(Debug)]
pub struct ArrisSb6141Parser {
    descriptor: ParserDescriptor,
    table: Selector,
}

impl ArrisSb6141Parser {
    pub fn new() -> Result<Self, ParserError> {
        let descriptor = ParserDescriptor::new(NAME, MANUFACTURER, &["SB6141"])
            .priority(100)
            .verified("community fixtures")
            .capabilities(&[
                ModemCapability::DownstreamChannels,
                ModemCapability::UpstreamChannels,
                ModemCapability::SystemUptime,
                ModemCapability::SoftwareVersion,
            ])
            .url(UrlPattern::public(SIGNAL_PAGE))
            .url(UrlPattern::public(STATUS_PAGE));
        Ok(Self {
            descriptor,
            table: compile("table")?,
        })
    }

    fn signal_tables(&self, document: &Html) -> Option<SignalTables> {
        let mut tables = SignalTables::default();
        let mut found = false;
        for table in document.select(&self.table) {
            let transposed = Transposed::from_table(table);
            let title = transposed.title().to_string();
            if title.starts_with("Downstream") {
                tables.downstream = transposed;
                found = true;
            } else if title.starts_with("Upstream") {
                tables.upstream = transposed;
                found = true;
            } else if title.starts_with("Signal Stats") {
                tables.codewords = transposed;
            }
        }
        found.then_some(tables)
    }

    fn system_info(&self, document: &Html) -> BTreeMap<String, String> {
        let mut info = BTreeMap::new();
        for table in document.select(&self.table) {
            for (label, values) in Transposed::from_table(table).rows {
                let Some((_, key)) = SYSTEM_INFO_LABELS.iter().find(|(l, _)| label == *l) else {
                    continue;
                };
                if let Some(value) = values.into_iter().find(|v| !v.is_empty()) {
                    info.insert(key.to_string(), value);
                }
            }
        }
        info
    }

    fn collect(&self, document: &Html, session: Option<(&mut Session, &str)>) -> Result<ParseResult, ParserError> {
        let mut result = ParseResult::default();
        let tables = match (self.signal_tables(document), session) {
            (Some(tables), Some((session, base_url))) => {
                self.merge_status_page(&mut result, session, base_url)?;
                Some(tables)
            }
            (Some(tables), None) => Some(tables),
            (None, Some((session, base_url))) => {
                let page = Html::parse_document(&fetch_page(session, base_url, SIGNAL_PAGE)?);
                self.merge_status_page(&mut result, session, base_url)?;
                self.signal_tables(&page)
            }
            (None, None) => None,
        };

        if let Some(tables) = tables {
            result.downstream = downstream(&tables);
            result.upstream = upstream(&tables.upstream);
        } else {
            debug!("No SB6141 signal tables found");
        }
        for (key, value) in self.system_info(document) {
            result.system_info.entry(key).or_insert(value);
        }
        Ok(result)
    }

    fn merge_status_page(&self, result: &mut ParseResult, session: &mut Session, base_url: &str) -> Result<(), ParserError> {
        match fetch_page(session, base_url, STATUS_PAGE) {
            Ok(page) => {
                result.system_info.extend(self.system_info(&Html::parse_document(&page)));
                Ok(())
            }
            Err(e) if is_auth_failure(&e) => Err(e),
            Err(e) => {
                warn!(error = %e, "Could not read SB6141 status page");
                Ok(())
            }
        }
    }
}

fn downstream(tables: &SignalTables) -> Vec<ChannelReading> {
    let table = &tables.downstream;
    let codeword_ids = tables.codewords.channel_ids();
    table
        .channel_ids()
        .into_iter()
        .enumerate()
        .map(|(column, ch_id)| {
            let stats = codeword_ids.iter().position(|id| *id == ch_id);
            ChannelReading {
                channel_id: column as u32 + 1,
                ch_id: Some(ch_id),
                frequency: table.number("Frequency", column),
                snr: table.number("Signal to Noise Ratio", column),
                modulation: table.text("Downstream Modulation", column),
                power: table.number("Power Level", column),
                corrected: stats.and_then(|i| tables.codewords.number("Total Correctable Codewords", i)),
                uncorrected: stats.and_then(|i| tables.codewords.number("Total Uncorrectable Codewords", i)),
                ..ChannelReading::default()
            }
        })
        .collect()
}

fn upstream(table: &Transposed) -> Vec<ChannelReading> {
    table
        .channel_ids()
        .into_iter()
        .enumerate()
        .map(|(column, ch_id)| ChannelReading {
            channel_id: column as u32 + 1,
            ch_id: Some(ch_id),
            frequency: table.number("Frequency", column),
            // Msym/sec on the page, ksym/sec in readings
            symbol_rate: table
                .number::<f64>("Symbol Rate", column)
                .map(|msym| (msym * 1000.0).round() as u32),
            power: table.number("Power Level", column),
            modulation: table.text("Upstream Modulation", column),
            lock_status: table.text("Ranging Status", column),
            ..ChannelReading::default()
        })
        .collect()
}

impl ModemParser for ArrisSb6141Parser {
    fn descriptor(&self) -> &ParserDescriptor {
        &self.descriptor
    }

    fn can_parse(&self, _document: &Html, _url: &str, html: &str) -> bool {
        html.contains("SB6141") || (html.contains("Downstream Modulation") && html.contains("Signal Stats"))
    }

    fn parse(&self, document: &Html, session: Option<&mut Session>, base_url: Option<&str>) -> ParseResult {
        let session = match (session, base_url) {
            (Some(session), Some(base_url)) => Some((session, base_url)),
            _ => None,
        };
        match self.collect(document, session) {
            Ok(mut result) => {
                let uptime = result.info("system_uptime").and_then(parse_uptime_seconds);
                apply_restart_window(&mut result, uptime);
                result
            }
            Err(e) => failure_result(NAME, &e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cablemon_auth::transport::mock::MockTransport;
    use std::sync::Arc;

    const SIGNAL: &str = r##"<html><body>
<table align="center" border="2" cellpadding="6" cellspacing="0">
<tr><th colspan="4"><font color="#ffffff">Downstream </font></th></tr>
<tr><td>Channel ID</td><td>5&nbsp; </td><td>6&nbsp; </td><td>7&nbsp; </td></tr>
<tr><td>Frequency</td><td>603000000 Hz&nbsp;</td><td>609000000 Hz&nbsp;</td><td>615000000 Hz&nbsp;</td></tr>
<tr><td>Signal to Noise Ratio</td><td>38 dB&nbsp;</td><td>38 dB&nbsp;</td><td>37 dB&nbsp;</td></tr>
<tr><td>Downstream Modulation</td><td>QAM256&nbsp;</td><td>QAM256&nbsp;</td><td>QAM256&nbsp;</td></tr>
<tr><td>Power Level<table><tr><td>The Downstream Power Level reading is a snapshot taken at the time this page was requested.</td></tr></table></td>
    <td>-2 dBmV&nbsp;</td><td>-1 dBmV&nbsp;</td><td>0 dBmV&nbsp;</td></tr>
</table>
<table align="center" border="2" cellpadding="6" cellspacing="0">
<tr><th colspan="3"><font color="#ffffff">Upstream </font></th></tr>
<tr><td>Channel ID</td><td>3&nbsp; </td><td>4&nbsp; </td></tr>
<tr><td>Frequency</td><td>30600000 Hz&nbsp;</td><td>24200000 Hz&nbsp;</td></tr>
<tr><td>Ranging Service ID</td><td>3451&nbsp;</td><td>3451&nbsp;</td></tr>
<tr><td>Symbol Rate</td><td>5.120 Msym/sec&nbsp;</td><td>2.560 Msym/sec&nbsp;</td></tr>
<tr><td>Power Level</td><td>44 dBmV&nbsp;</td><td>45 dBmV&nbsp;</td></tr>
<tr><td>Upstream Modulation</td><td>[3] QPSK<br>[3] 64QAM<br></td><td>[3] QPSK<br></td></tr>
<tr><td>Ranging Status</td><td>Success&nbsp;</td><td>Success&nbsp;</td></tr>
</table>
<table align="center" border="2" cellpadding="6" cellspacing="0">
<tr><th colspan="4"><font color="#ffffff">Signal Stats (Codewords)</font></th></tr>
<tr><td>Channel ID</td><td>7&nbsp; </td><td>5&nbsp; </td><td>6&nbsp; </td></tr>
<tr><td>Total Unerrored Codewords</td><td>1000&nbsp;</td><td>2000&nbsp;</td><td>3000&nbsp;</td></tr>
<tr><td>Total Correctable Codewords</td><td>12&nbsp;</td><td>34&nbsp;</td><td>0&nbsp;</td></tr>
<tr><td>Total Uncorrectable Codewords</td><td>1&nbsp;</td><td>2&nbsp;</td><td>0&nbsp;</td></tr>
</table>
</body></html>"##;

    const STATUS: &str = r#"<html><body><table>
<tr><td>Up Time</td><td>5 days 16h:12m:05s</td></tr>
<tr><td>Software Version</td><td>SB_KOMODO-1.0.6.16-SCM00-NOSH</td></tr>
</table></body></html>"#;

    #[test]
    fn test_downstream_transposed() {
        let parser = ArrisSb6141Parser::new().unwrap();
        let result = parser.parse(&Html::parse_document(SIGNAL), None, None);

        assert_eq!(result.downstream.len(), 3);
        let first = &result.downstream[0];
        assert_eq!(first.channel_id, 1);
        assert_eq!(first.ch_id, Some(5));
        assert_eq!(first.frequency, Some(603_000_000));
        assert_eq!(first.snr, Some(38.0));
        assert_eq!(first.power, Some(-2.0));
        assert_eq!(first.modulation.as_deref(), Some("QAM256"));
        // Codewords joined by channel ID, not column
        assert_eq!(first.corrected, Some(34));
        assert_eq!(first.uncorrected, Some(2));
        assert_eq!(result.downstream[2].corrected, Some(12));
    }

    #[test]
    fn test_upstream_symbol_rate_in_ksym() {
        let parser = ArrisSb6141Parser::new().unwrap();
        let result = parser.parse(&Html::parse_document(SIGNAL), None, None);

        assert_eq!(result.upstream.len(), 2);
        assert_eq!(result.upstream[0].symbol_rate, Some(5120));
        assert_eq!(result.upstream[1].symbol_rate, Some(2560));
        assert_eq!(result.upstream[0].frequency, Some(30_600_000));
        assert_eq!(result.upstream[0].power, Some(44.0));
        assert_eq!(result.upstream[0].lock_status.as_deref(), Some("Success"));
        assert_eq!(result.upstream[0].snr, None);
    }

    #[test]
    fn test_session_reads_status_page() {
        let mock = Arc::new(MockTransport::new());
        mock.push_ok(STATUS);
        let mut session = Session::new(mock.clone());
        let parser = ArrisSb6141Parser::new().unwrap();

        let result = parser.parse(&Html::parse_document(SIGNAL), Some(&mut session), Some("http://192.168.100.1"));
        assert_eq!(result.info("system_uptime"), Some("5 days 16h:12m:05s"));
        assert_eq!(result.info("software_version"), Some("SB_KOMODO-1.0.6.16-SCM00-NOSH"));
        assert_eq!(mock.request(0).unwrap().url, "http://192.168.100.1/indexData.htm");
    }

    #[test]
    fn test_session_fetches_signal_page_when_missing() {
        let mock = Arc::new(MockTransport::new());
        mock.push_ok(SIGNAL).push_ok(STATUS);
        let mut session = Session::new(mock.clone());
        let parser = ArrisSb6141Parser::new().unwrap();

        let result = parser.parse(&Html::parse_document(STATUS), Some(&mut session), Some("http://192.168.100.1"));
        assert_eq!(result.downstream.len(), 3);
        assert_eq!(mock.request(0).unwrap().url, "http://192.168.100.1/cmSignalData.htm");
    }

    #[test]
    fn test_can_parse() {
        let parser = ArrisSb6141Parser::new().unwrap();
        assert!(parser.can_parse(&Html::parse_document(SIGNAL), "http://192.168.100.1/cmSignalData.htm", SIGNAL));
        let moto = "<table class=\"moto-table-content\"></table>";
        assert!(!parser.can_parse(&Html::parse_document(moto), "http://192.168.100.1/", moto));
    }

    #[test]
    fn test_no_auth_declared() {
        let parser = ArrisSb6141Parser::new().unwrap();
        assert!(parser.descriptor().auth_config.is_none());
        assert!(parser.descriptor().url_patterns.iter().all(|p| !p.auth_required));
    }
}
