//! Catch-all parser for Motorola MB series HTML firmware

use cablemon_auth::Session;
use cablemon_core::{AuthMethod, ModemCapability, ParseResult, ParserDescriptor, UrlPattern};
use scraper::Html;

use super::{form_auth, parse_html, restart_via_security_form, MotorolaTables};
use super::{CONNECTION_PAGE, HOME_PAGE, MANUFACTURER};
use crate::error::ParserError;
use crate::parser::ModemParser;

pub const NAME: &str = "Motorola MB Series (Generic)";

#[derive(Debug)]
pub struct MotorolaGenericParser {
    descriptor: ParserDescriptor,
    tables: MotorolaTables,
}

impl MotorolaGenericParser {
    pub fn new() -> Result<Self, ParserError> {
        let descriptor = ParserDescriptor::new(NAME, MANUFACTURER, &["MB7220", "MB7420", "MB7621"])
            .priority(50)
            .capabilities(&[
                ModemCapability::DownstreamChannels,
                ModemCapability::UpstreamChannels,
                ModemCapability::SystemUptime,
                ModemCapability::SoftwareVersion,
                ModemCapability::Restart,
            ])
            .url(UrlPattern::new(CONNECTION_PAGE, AuthMethod::Form, true))
            .url(UrlPattern::new(HOME_PAGE, AuthMethod::Form, true))
            .auth(form_auth());
        Ok(Self {
            descriptor,
            tables: MotorolaTables::new()?,
        })
    }
}

impl ModemParser for MotorolaGenericParser {
    fn descriptor(&self) -> &ParserDescriptor {
        &self.descriptor
    }

    fn can_parse(&self, _document: &Html, _url: &str, html: &str) -> bool {
        html.contains("moto-table-content") || html.contains("Motorola Cable Modem")
    }

    fn parse(&self, document: &Html, session: Option<&mut Session>, base_url: Option<&str>) -> ParseResult {
        parse_html(&self.tables, NAME, document, session, base_url)
    }

    fn restart(&self, session: &mut Session, base_url: &str) -> Result<bool, ParserError> {
        restart_via_security_form(session, base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motorola::table::tests::connection_page;

    #[test]
    fn test_metadata() {
        let parser = MotorolaGenericParser::new().unwrap();
        assert_eq!(parser.name(), "Motorola MB Series (Generic)");
        assert_eq!(parser.priority(), 50);
        assert!(parser.descriptor().validate().is_ok());
    }

    #[test]
    fn test_can_parse_motorola_markup() {
        let parser = MotorolaGenericParser::new().unwrap();
        let html = connection_page("1.0", "40.0", "1 days 00h:00m:00s");
        let doc = Html::parse_document(&html);
        assert!(parser.can_parse(&doc, "http://192.168.100.1/MotoConnection.asp", &html));

        let other = "<html><title>NETGEAR Gateway CM600</title></html>";
        assert!(!parser.can_parse(&Html::parse_document(other), "http://192.168.100.1/", other));
    }
}
