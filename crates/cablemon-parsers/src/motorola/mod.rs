//! Motorola/ARRIS MB series parsers
//!
//! The HTML models (MB7220, MB7420, MB7621) share the `moto-table-content`
//! layout. The DOCSIS 3.1 models (MB8600, MB8611) only expose data over HNAP.

pub mod generic;
pub mod hnap_data;
pub mod mb7621;
pub mod mb8600_hnap;
pub mod mb8611_hnap;
pub mod table;

use std::sync::Arc;

use cablemon_auth::{join_url, AuthError, Session};
use cablemon_core::{apply_restart_window, parse_uptime_seconds, AuthConfig, ParseResult};
use scraper::Html;
use tracing::{info, warn};

use crate::error::ParserError;
use crate::html::fetch_page;
use crate::parser::{failure_result, is_auth_failure, ModemParser};

pub use generic::MotorolaGenericParser;
pub use mb7621::MotorolaMb7621Parser;
pub use mb8600_hnap::MotorolaMb8600HnapParser;
pub use mb8611_hnap::MotorolaMb8611HnapParser;
pub use table::MotorolaTables;

pub const MANUFACTURER: &str = "Motorola";

pub const CONNECTION_PAGE: &str = "/MotoConnection.asp";
pub const HOME_PAGE: &str = "/MotoHome.asp";
pub const SOFTWARE_INFO_PAGE: &str = "/MotoSwInfo.asp";
pub const SECURITY_PAGE: &str = "/MotoSecurity.asp";
pub const SECURITY_FORM: &str = "/goform/MotoSecurity";

/// Marker present only on the Motorola login form
const LOGIN_FORM_MARKER: &str = "loginUsername";

/// Form login shared by the HTML models
pub fn form_auth() -> AuthConfig {
    AuthConfig::form("/goform/login", "loginUsername", "loginPassword")
        .with_login_page_indicator(LOGIN_FORM_MARKER)
}

/// Parsers defined in this group
pub fn load() -> Result<Vec<Arc<dyn ModemParser>>, ParserError> {
    Ok(vec![
        Arc::new(MotorolaGenericParser::new()?),
        Arc::new(MotorolaMb7621Parser::new()?),
        Arc::new(MotorolaMb8600HnapParser::new()),
        Arc::new(MotorolaMb8611HnapParser::new()),
    ])
}

fn extract(tables: &MotorolaTables, document: &Html) -> ParseResult {
    ParseResult {
        downstream: tables.downstream(document),
        upstream: tables.upstream(document),
        system_info: tables.system_info(document),
        ..ParseResult::default()
    }
}

fn finish(mut result: ParseResult) -> ParseResult {
    let uptime = result.info("system_uptime").and_then(parse_uptime_seconds);
    apply_restart_window(&mut result, uptime);
    result
}

fn collect_pages(
    tables: &MotorolaTables,
    document: &Html,
    session: &mut Session,
    base_url: &str,
) -> Result<ParseResult, ParserError> {
    let mut result = if tables.has_channel_tables(document) {
        extract(tables, document)
    } else {
        let page = fetch_page(session, base_url, CONNECTION_PAGE)?;
        let connection = Html::parse_document(&page);
        if !tables.has_channel_tables(&connection) && page.contains(LOGIN_FORM_MARKER) {
            return Err(AuthError::Rejected(format!(
                "Login page served instead of {}",
                CONNECTION_PAGE
            ))
            .into());
        }
        extract(tables, &connection)
    };

    if result.info("software_version").is_none() {
        match fetch_page(session, base_url, HOME_PAGE) {
            Ok(page) => {
                for (key, value) in tables.system_info(&Html::parse_document(&page)) {
                    result.system_info.entry(key).or_insert(value);
                }
            }
            Err(e) if is_auth_failure(&e) => return Err(e),
            Err(e) => warn!(error = %e, "Could not read Motorola home page"),
        }
    }
    Ok(result)
}

/// Parse Motorola HTML status pages.
///
/// With a session, missing pages (connection table, software version) are
/// fetched; without one only `document` is read.
pub(crate) fn parse_html(
    tables: &MotorolaTables,
    parser_name: &str,
    document: &Html,
    session: Option<&mut Session>,
    base_url: Option<&str>,
) -> ParseResult {
    match (session, base_url) {
        (Some(session), Some(base_url)) => match collect_pages(tables, document, session, base_url) {
            Ok(result) => finish(result),
            Err(e) => failure_result(parser_name, &e),
        },
        _ => finish(extract(tables, document)),
    }
}

const RESTART_FIELDS: &[(&str, &str)] = &[
    ("UserId", ""),
    ("OldPassword", ""),
    ("NewUserId", ""),
    ("Password", ""),
    ("PasswordReEnter", ""),
    ("MotoSecurityAction", "1"),
];

/// Reboot through the security page form.
///
/// The modem drops the connection as it goes down, so a reset or timeout on
/// the reboot POST counts as success.
pub(crate) fn restart_via_security_form(session: &mut Session, base_url: &str) -> Result<bool, ParserError> {
    fetch_page(session, base_url, SECURITY_PAGE)?;

    let url = join_url(base_url, SECURITY_FORM);
    match session.post_form(&url, RESTART_FIELDS) {
        Ok(response) => {
            response.error_for_status()?;
            info!(url = %url, "Restart command accepted");
            Ok(true)
        }
        Err(e) if e.is_reset() || e.is_timeout() => {
            info!(url = %url, error = %e, "Connection dropped during restart, modem is rebooting");
            Ok(true)
        }
        Err(e) => Err(e.into()),
    }
}
