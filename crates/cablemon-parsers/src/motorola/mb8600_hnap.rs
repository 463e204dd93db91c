//! Motorola MB8600 over HNAP XML/SOAP

use cablemon_auth::{HnapClient, HnapSoapClient, Session};
use cablemon_core::{AuthConfig, AuthMethod, AuthStrategyType, ModemCapability, ParseResult, ParserDescriptor, UrlPattern};
use scraper::Html;
use tracing::info;

use super::hnap_data::{parse_hnap_data, HNAP_ACTIONS};
use super::MANUFACTURER;
use crate::error::ParserError;
use crate::parser::{failure_result, ModemParser};

pub const NAME: &str = "Motorola MB8600 (HNAP)";

/// Status page served by the MB8600 web UI
pub const STATUS_PAGE: &str = "/MotoStatusConnection.html";

#[derive(Debug)]
pub struct MotorolaMb8600HnapParser {
    descriptor: ParserDescriptor,
    client: HnapSoapClient,
}

impl MotorolaMb8600HnapParser {
    pub fn new() -> Self {
        let auth = AuthConfig::hnap(AuthStrategyType::HnapSession, "/Login.html").with_session_timeout_indicator("UN-AUTH");
        let client = HnapSoapClient::new(&auth);

        let mut descriptor = ParserDescriptor::new(NAME, MANUFACTURER, &["MB8600"])
            .priority(101)
            .capabilities(&[
                ModemCapability::DownstreamChannels,
                ModemCapability::UpstreamChannels,
                ModemCapability::SystemUptime,
            ])
            .url(UrlPattern::new(auth.endpoint(), AuthMethod::Hnap, true))
            .url(UrlPattern::new(STATUS_PAGE, AuthMethod::Hnap, true))
            .auth(auth);
        descriptor.verification_source = Some("WIP".to_string());

        Self { descriptor, client }
    }
}

impl Default for MotorolaMb8600HnapParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ModemParser for MotorolaMb8600HnapParser {
    fn descriptor(&self) -> &ParserDescriptor {
        &self.descriptor
    }

    fn can_parse(&self, _document: &Html, _url: &str, html: &str) -> bool {
        html.contains("MB8600") || html.contains("MB 8600")
    }

    /// Data comes only from HNAP calls; `document` is ignored.
    fn parse(&self, _document: &Html, session: Option<&mut Session>, base_url: Option<&str>) -> ParseResult {
        let (Some(session), Some(base_url)) = (session, base_url) else {
            return failure_result(NAME, &ParserError::MissingSession(NAME.to_string()));
        };
        match self.client.call_multiple(session, base_url, HNAP_ACTIONS) {
            Ok(responses) => {
                let result = parse_hnap_data(&responses);
                info!(
                    downstream = result.downstream.len(),
                    upstream = result.upstream.len(),
                    "Parsed MB8600 HNAP data"
                );
                result
            }
            Err(e) => failure_result(NAME, &ParserError::from(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motorola::hnap_data::{CONNECTION_INFO, DOWNSTREAM_INFO, LAG_STATUS, STARTUP_SEQUENCE, UPSTREAM_INFO};
    use cablemon_auth::transport::mock::MockTransport;
    use cablemon_auth::TransportError;
    use std::sync::Arc;

    const BASE: &str = "http://192.168.100.1";

    fn soap(action: &str, inner: &str) -> String {
        format!(
            concat!(
                "<?xml version=\"1.0\" encoding=\"utf-8\"?>",
                "<soap:Envelope xmlns:soap=\"http://schemas.xmlsoap.org/soap/envelope/\"><soap:Body>",
                "<{action}Response xmlns=\"http://purenetworks.com/HNAP1/\">{inner}</{action}Response>",
                "</soap:Body></soap:Envelope>"
            ),
            action = action,
            inner = inner
        )
    }

    fn script_poll(mock: &MockTransport, uptime: &str) {
        mock.push_ok(&soap(STARTUP_SEQUENCE, "<MotoConnBootStatus>OK</MotoConnBootStatus>"))
            .push_ok(&soap(
                CONNECTION_INFO,
                &format!("<MotoConnSystemUpTime>{}</MotoConnSystemUpTime>", uptime),
            ))
            .push_ok(&soap(
                DOWNSTREAM_INFO,
                "<MotoConnDownstreamChannel>1^Locked^QAM256^20^543.0^1.4^45.1^41^0^|+|2^Locked^QAM256^21^549.0^1.2^44.9^0^0^</MotoConnDownstreamChannel>",
            ))
            .push_ok(&soap(
                UPSTREAM_INFO,
                "<MotoConnUpstreamChannel>1^Locked^SC-QAM^17^5120^16.4^44.3^</MotoConnUpstreamChannel>",
            ))
            .push_ok(&soap(LAG_STATUS, "<MotoLagCurrentStatus>0</MotoLagCurrentStatus>"));
    }

    #[test]
    fn test_metadata() {
        let parser = MotorolaMb8600HnapParser::new();
        let d = parser.descriptor();
        assert_eq!(d.name, "Motorola MB8600 (HNAP)");
        assert_eq!(d.priority, 101);
        assert!(!d.verified);
        assert_eq!(d.verification_source.as_deref(), Some("WIP"));
        assert_eq!(d.primary_path(), Some("/HNAP1/"));
        let auth = d.auth_config.as_ref().unwrap();
        assert_eq!(auth.strategy, AuthStrategyType::HnapSession);
        assert_eq!(auth.session_timeout_indicator.as_deref(), Some("UN-AUTH"));
        assert!(!parser.has_capability(ModemCapability::Restart));
        assert!(d.validate().is_ok());
    }

    #[test]
    fn test_can_parse() {
        let parser = MotorolaMb8600HnapParser::new();
        for html in ["<title>MB8600</title>", "Motorola MB 8600"] {
            assert!(parser.can_parse(&Html::parse_document(html), BASE, html));
        }
        let html = "<title>MB8611</title>";
        assert!(!parser.can_parse(&Html::parse_document(html), BASE, html));
    }

    #[test]
    fn test_parse_issues_one_call_per_action() {
        let mock = Arc::new(MockTransport::new());
        script_poll(&mock, "32 days 11h:58m:26s");
        let mut session = Session::new(mock.clone());

        let result = MotorolaMb8600HnapParser::new().parse(&Html::parse_document(""), Some(&mut session), Some(BASE));
        assert_eq!(result.downstream.len(), 2);
        assert_eq!(result.downstream[0].frequency, Some(543_000_000));
        assert_eq!(result.upstream[0].symbol_rate, Some(5120));
        assert_eq!(result.info("system_uptime"), Some("32 days 11h:58m:26s"));
        assert_eq!(result.info("boot_status"), Some("OK"));

        let requests = mock.requests();
        assert_eq!(requests.len(), HNAP_ACTIONS.len());
        assert_eq!(
            requests[2].header("SOAPAction"),
            Some("\"http://purenetworks.com/HNAP1/GetMotoStatusDownstreamChannelInfo\"")
        );
        assert!(requests.iter().all(|r| r.url == "http://192.168.100.1/HNAP1/"));
    }

    #[test]
    fn test_failed_action_does_not_abort_poll() {
        let mock = Arc::new(MockTransport::new());
        mock.push_status(500, "")
            .push_ok(&soap(CONNECTION_INFO, "<MotoConnSystemUpTime>1 days 00h:00m:00s</MotoConnSystemUpTime>"))
            .push_ok(&soap(
                DOWNSTREAM_INFO,
                "<MotoConnDownstreamChannel>1^Locked^QAM256^20^543.0^1.4^45.1^41^0^</MotoConnDownstreamChannel>",
            ));
        let mut session = Session::new(mock.clone());

        let result = MotorolaMb8600HnapParser::new().parse(&Html::parse_document(""), Some(&mut session), Some(BASE));
        assert_eq!(result.downstream.len(), 1);
        assert!(result.upstream.is_empty());
        assert!(!result.auth_failure);
        assert_eq!(mock.requests().len(), HNAP_ACTIONS.len());
    }

    #[test]
    fn test_unauthorized_flags_auth_failure() {
        let mock = Arc::new(MockTransport::new());
        mock.push_err(TransportError::Status(401));
        let mut session = Session::new(mock.clone());

        let result = MotorolaMb8600HnapParser::new().parse(&Html::parse_document(""), Some(&mut session), Some(BASE));
        assert!(result.auth_failure);
        assert!(result.downstream.is_empty());
        let context = result.diagnostic_context.unwrap();
        assert_eq!(context.parser, NAME);
        assert_eq!(context.error_type, "authentication");
        assert_eq!(mock.requests().len(), 1);
    }

    #[test]
    fn test_session_timeout_marker_flags_auth_failure() {
        let mock = Arc::new(MockTransport::new());
        mock.push_ok("<html>UN-AUTH</html>");
        let mut session = Session::new(mock);

        let result = MotorolaMb8600HnapParser::new().parse(&Html::parse_document(""), Some(&mut session), Some(BASE));
        assert!(result.auth_failure);
    }

    #[test]
    fn test_missing_session_is_not_auth_failure() {
        let result = MotorolaMb8600HnapParser::new().parse(&Html::parse_document(""), None, None);
        assert!(result.is_empty());
        assert!(!result.auth_failure);
    }
}
