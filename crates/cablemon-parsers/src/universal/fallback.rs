//! Fallback for modems no parser recognizes
//!
//! Lets a device be added and polled for reachability while a real parser
//! is written. Never wins detection; callers select it explicitly.

use cablemon_auth::Session;
use cablemon_core::{ParseResult, ParserDescriptor, UrlPattern};
use scraper::Html;
use tracing::debug;

use crate::html::title;
use crate::parser::ModemParser;

pub const NAME: &str = "Unknown Modem (Fallback Mode)";
pub const MANUFACTURER: &str = "Unknown";

#[derive(Debug)]
pub struct FallbackParser {
    descriptor: ParserDescriptor,
}

impl FallbackParser {
    pub fn new() -> Self {
        Self {
            descriptor: ParserDescriptor::new(NAME, MANUFACTURER, &["Unknown"])
                .priority(1)
                .url(UrlPattern::public("/")),
        }
    }
}

impl Default for FallbackParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ModemParser for FallbackParser {
    fn descriptor(&self) -> &ParserDescriptor {
        &self.descriptor
    }

    fn can_parse(&self, _document: &Html, _url: &str, _html: &str) -> bool {
        false
    }

    fn parse(&self, document: &Html, _session: Option<&mut Session>, _base_url: Option<&str>) -> ParseResult {
        let mut result = ParseResult::default();
        result.set_info("fallback_mode", "true");
        if let Some(title) = title(document) {
            debug!(title = %title, "Unrecognized modem page");
            result.set_info("page_title", title);
        }
        result
    }
}
