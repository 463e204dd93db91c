//! `moto-table-content` extraction shared by the Motorola HTML parsers

use std::collections::BTreeMap;

use cablemon_core::{ChannelReading, ExtractionError};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::error::ParserError;
use crate::html::{compile, direct_cells, direct_rows, element_text, leading_number};

const DOWNSTREAM_COLUMNS: usize = 9;
const UPSTREAM_COLUMNS: usize = 7;

/// Label text on Motorola status pages and the system_info key it maps to
const SYSTEM_INFO_LABELS: &[(&str, &str)] = &[
    ("System Up Time", "system_uptime"),
    ("Software Version", "software_version"),
    ("Hardware Version", "hardware_version"),
    ("Current System Time", "current_time"),
];

/// Compiled selectors for Motorola status tables.
///
/// A building block for parsers, not a parser itself.
#[derive(Debug)]
pub struct MotorolaTables {
    table: Selector,
    header: Selector,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableKind {
    Downstream,
    Upstream,
    Other,
}

impl MotorolaTables {
    pub fn new() -> Result<Self, ParserError> {
        Ok(Self {
            table: compile("table.moto-table-content")?,
            header: compile("td.moto-param-header-s")?,
        })
    }

    fn classify(&self, table: ElementRef<'_>) -> TableKind {
        let headers: Vec<String> = table.select(&self.header).map(element_text).collect();
        if headers.iter().any(|h| h.contains("SNR")) {
            TableKind::Downstream
        } else if headers.iter().any(|h| h.contains("Symb")) {
            TableKind::Upstream
        } else {
            TableKind::Other
        }
    }

    /// Data rows of a channel table as cell text
    fn data_rows(&self, table: ElementRef<'_>) -> Vec<Vec<String>> {
        direct_rows(table)
            .into_iter()
            .filter(|row| row.select(&self.header).next().is_none())
            .map(|row| direct_cells(row).into_iter().map(element_text).collect::<Vec<_>>())
            .filter(|cells| !cells.is_empty())
            .collect()
    }

    pub fn has_channel_tables(&self, document: &Html) -> bool {
        document
            .select(&self.table)
            .any(|t| !matches!(self.classify(t), TableKind::Other))
    }

    pub fn downstream(&self, document: &Html) -> Vec<ChannelReading> {
        self.channels(document, TableKind::Downstream)
    }

    pub fn upstream(&self, document: &Html) -> Vec<ChannelReading> {
        self.channels(document, TableKind::Upstream)
    }

    fn channels(&self, document: &Html, wanted: TableKind) -> Vec<ChannelReading> {
        let mut channels = Vec::new();
        for table in document.select(&self.table) {
            if self.classify(table) != wanted {
                continue;
            }
            let columns = match wanted {
                TableKind::Downstream => DOWNSTREAM_COLUMNS,
                _ => UPSTREAM_COLUMNS,
            };
            for cells in self.data_rows(table) {
                if !is_channel_row(&cells) {
                    debug!(row = ?cells, "Skipping Motorola summary row");
                    continue;
                }
                if cells.len() < columns {
                    debug!(row = ?cells, "Skipping short Motorola table row");
                    continue;
                }
                let parsed = match wanted {
                    TableKind::Downstream => downstream_row(&cells),
                    _ => upstream_row(&cells),
                };
                match parsed {
                    Ok(channel) => channels.push(channel),
                    Err(e) => warn!(row = ?cells, error = %e, "Skipping malformed Motorola channel row"),
                }
            }
        }
        channels
    }

    /// Label/value pairs from every Motorola table
    pub fn system_info(&self, document: &Html) -> BTreeMap<String, String> {
        let mut info = BTreeMap::new();
        for table in document.select(&self.table) {
            for row in direct_rows(table) {
                let cells: Vec<String> = direct_cells(row).into_iter().map(element_text).collect();
                let Some((label, rest)) = cells.split_first() else {
                    continue;
                };
                let Some((_, key)) = SYSTEM_INFO_LABELS.iter().find(|(l, _)| label == l) else {
                    continue;
                };
                if let Some(value) = rest.iter().find(|v| !v.is_empty()) {
                    info.insert(key.to_string(), value.clone());
                }
            }
        }
        info
    }
}

/// Channel rows start with a channel number; summary rows ("Total") do not
fn is_channel_row(cells: &[String]) -> bool {
    cells.first().is_some_and(|c| c.trim().parse::<u32>().is_ok())
}

fn number<T: std::str::FromStr>(cells: &[String], index: usize, field: &'static str) -> Result<T, ExtractionError> {
    let raw = cells.get(index).ok_or(ExtractionError::MissingField(field))?;
    raw.trim().parse().map_err(|_| ExtractionError::InvalidNumber {
        field,
        value: raw.clone(),
    })
}

fn mhz(cells: &[String], index: usize) -> Result<u64, ExtractionError> {
    let raw = cells.get(index).ok_or(ExtractionError::MissingField("frequency"))?;
    let value: f64 = leading_number(raw).ok_or_else(|| ExtractionError::InvalidNumber {
        field: "frequency",
        value: raw.clone(),
    })?;
    Ok((value * 1_000_000.0).round() as u64)
}

fn text(cells: &[String], index: usize) -> Option<String> {
    cells.get(index).filter(|s| !s.is_empty()).cloned()
}

// Channel, Lock Status, Modulation, Channel ID, Freq (MHz), Pwr, SNR, Corrected, Uncorrected
fn downstream_row(cells: &[String]) -> Result<ChannelReading, ExtractionError> {
    Ok(ChannelReading {
        channel_id: number(cells, 0, "channel_id")?,
        lock_status: text(cells, 1),
        modulation: text(cells, 2),
        ch_id: Some(number(cells, 3, "ch_id")?),
        frequency: Some(mhz(cells, 4)?),
        power: Some(number(cells, 5, "power")?),
        snr: Some(number(cells, 6, "snr")?),
        corrected: Some(number(cells, 7, "corrected")?),
        uncorrected: Some(number(cells, 8, "uncorrected")?),
        ..ChannelReading::default()
    })
}

// Channel, Lock Status, US Channel Type, Channel ID, Symb Rate, Freq (MHz), Pwr
fn upstream_row(cells: &[String]) -> Result<ChannelReading, ExtractionError> {
    Ok(ChannelReading {
        channel_id: number(cells, 0, "channel_id")?,
        lock_status: text(cells, 1),
        modulation: text(cells, 2),
        ch_id: Some(number(cells, 3, "ch_id")?),
        symbol_rate: Some(number(cells, 4, "symbol_rate")?),
        frequency: Some(mhz(cells, 5)?),
        power: Some(number(cells, 6, "power")?),
        ..ChannelReading::default()
    })
}
