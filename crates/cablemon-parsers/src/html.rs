//! HTML and page-fetch helpers shared by the vendor parsers

use std::str::FromStr;

use cablemon_auth::{join_url, Session};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::error::ParserError;

static LEADING_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?\d+(?:\.\d+)?").expect("number pattern is valid"));

/// Compile a CSS selector, surfacing failures as `ParserError::Selector`
pub fn compile(selector: &str) -> Result<Selector, ParserError> {
    Selector::parse(selector).map_err(|e| ParserError::Selector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Visible text of an element with `&nbsp;` and runs of whitespace collapsed
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// `td`/`th` children of a row, excluding cells of nested tables
pub fn direct_cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|c| matches!(c.value().name(), "td" | "th"))
        .collect()
}

/// Rows that belong to `table` itself, looking through `thead`/`tbody`/`tfoot`
pub fn direct_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => rows.extend(
                child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|r| r.value().name() == "tr"),
            ),
            _ => {}
        }
    }
    rows
}

/// Parse the number at the start of a value such as `"603000000 Hz"` or `"-2 dBmV"`
pub fn leading_number<T: FromStr>(text: &str) -> Option<T> {
    LEADING_NUMBER_RE
        .find(text.trim())
        .and_then(|m| m.as_str().parse().ok())
}

/// Document `<title>` text, if any
pub fn title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
}

/// GET a device page through the session, failing on 4xx/5xx
pub fn fetch_page(session: &mut Session, base_url: &str, path: &str) -> Result<String, ParserError> {
    let url = join_url(base_url, path);
    debug!(url = %url, "Fetching modem page");
    let response = session.get(&url)?.error_for_status()?;
    Ok(response.body)
}
