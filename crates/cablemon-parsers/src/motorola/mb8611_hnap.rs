//! Motorola MB8611/MB8612 over HNAP JSON

use cablemon_auth::{AuthError, HnapClient, HnapJsonClient, Session};
use cablemon_core::{AuthConfig, AuthMethod, AuthStrategyType, ModemCapability, ParseResult, ParserDescriptor, UrlPattern};
use scraper::Html;
use tracing::{info, warn};

use super::hnap_data::{parse_hnap_data, HNAP_ACTIONS};
use super::MANUFACTURER;
use crate::error::ParserError;
use crate::parser::{failure_result, ModemParser};

pub const NAME: &str = "Motorola MB8611 (HNAP)";

pub const STATUS_PAGE: &str = "/MotoStatusConnection.html";

const RESTART_ACTION: &str = "SetStatusSecuritySettings";
const RESTART_PARAMS: &[(&str, &str)] = &[("MotoStatusSecurityAction", "1"), ("MotoStatusSecXXX", "XXX")];

#[derive(Debug)]
pub struct MotorolaMb8611HnapParser {
    descriptor: ParserDescriptor,
    client: HnapJsonClient,
}

impl MotorolaMb8611HnapParser {
    pub fn new() -> Self {
        let auth = AuthConfig::hnap(AuthStrategyType::HnapJson, "/Login.html").with_session_timeout_indicator("UN-AUTH");
        let client = HnapJsonClient::new(&auth);

        let descriptor = ParserDescriptor::new(NAME, MANUFACTURER, &["MB8611", "MB8612"])
            .priority(101)
            .capabilities(&[
                ModemCapability::DownstreamChannels,
                ModemCapability::UpstreamChannels,
                ModemCapability::SystemUptime,
                ModemCapability::Restart,
            ])
            .url(UrlPattern::new(auth.endpoint(), AuthMethod::Hnap, true))
            .url(UrlPattern::new(STATUS_PAGE, AuthMethod::Hnap, true))
            .auth(auth);

        Self { descriptor, client }
    }
}

impl Default for MotorolaMb8611HnapParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ModemParser for MotorolaMb8611HnapParser {
    fn descriptor(&self) -> &ParserDescriptor {
        &self.descriptor
    }

    fn can_parse(&self, _document: &Html, _url: &str, html: &str) -> bool {
        html.contains("MB8611") || html.contains("MB 8611") || html.contains("MB8612")
    }

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
                    "Parsed MB8611 HNAP data"
                );
                result
            }
            Err(e) => failure_result(NAME, &ParserError::from(e)),
        }
    }

    fn restart(&self, session: &mut Session, base_url: &str) -> Result<bool, ParserError> {
        match self.client.call_single(session, base_url, RESTART_ACTION, RESTART_PARAMS) {
            Ok(fields) => {
                let result = fields.get("SetStatusSecuritySettingsResult").map(String::as_str);
                if result.is_some_and(|r| r.eq_ignore_ascii_case("OK")) {
                    info!(base_url = %base_url, "Restart command accepted");
                    Ok(true)
                } else {
                    warn!(result = ?result, "Restart command not accepted");
                    Err(ParserError::Protocol(format!(
                        "{} returned {}",
                        RESTART_ACTION,
                        result.unwrap_or("no result")
                    )))
                }
            }
            Err(AuthError::Transport(e)) if e.is_reset() || e.is_timeout() => {
                info!(base_url = %base_url, error = %e, "Connection dropped during restart, modem is rebooting");
                Ok(true)
            }
            Err(e) => Err(e.into()),
        }
    }
}
