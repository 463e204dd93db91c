//! Motorola MB7621

use cablemon_auth::Session;
use cablemon_core::{AuthMethod, ModemCapability, ParseResult, ParserDescriptor, UrlPattern};
use scraper::Html;

use super::{form_auth, parse_html, restart_via_security_form, MotorolaTables};
use super::{CONNECTION_PAGE, HOME_PAGE, MANUFACTURER, SOFTWARE_INFO_PAGE};
use crate::error::ParserError;
use crate::parser::ModemParser;

pub const NAME: &str = "Motorola MB7621";

/// Same page layout as the generic Motorola parser; the public software
/// info page carries the model string used for detection.
#[derive(Debug)]
pub struct MotorolaMb7621Parser {
    descriptor: ParserDescriptor,
    tables: MotorolaTables,
}

impl MotorolaMb7621Parser {
    pub fn new() -> Result<Self, ParserError> {
        let descriptor = ParserDescriptor::new(NAME, MANUFACTURER, &["MB7621"])
            .priority(100)
            .verified("maintainer's personal modem")
            .capabilities(&[
                ModemCapability::DownstreamChannels,
                ModemCapability::UpstreamChannels,
                ModemCapability::SystemUptime,
                ModemCapability::SoftwareVersion,
                ModemCapability::Restart,
            ])
            .url(UrlPattern::new(SOFTWARE_INFO_PAGE, AuthMethod::Form, false))
            .url(UrlPattern::new(CONNECTION_PAGE, AuthMethod::Form, true))
            .url(UrlPattern::new(HOME_PAGE, AuthMethod::Form, true))
            .auth(form_auth());
        Ok(Self {
            descriptor,
            tables: MotorolaTables::new()?,
        })
    }
}

impl ModemParser for MotorolaMb7621Parser {
    fn descriptor(&self) -> &ParserDescriptor {
        &self.descriptor
    }

    fn can_parse(&self, _document: &Html, _url: &str, html: &str) -> bool {
        html.contains("MB7621") || html.contains("MB 7621") || html.contains("2480-MB7621")
    }

    fn parse(&self, document: &Html, session: Option<&mut Session>, base_url: Option<&str>) -> ParseResult {
        parse_html(&self.tables, NAME, document, session, base_url)
    }

    fn restart(&self, session: &mut Session, base_url: &str) -> Result<bool, ParserError> {
        restart_via_security_form(session, base_url)
    }
}
