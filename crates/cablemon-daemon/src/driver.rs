//! Per-modem fetch/dispatch: detect, log in, fetch, parse
//!
//! Everything here is blocking and runs on one `Session` per poll attempt.
//! The poller moves each modem onto its own blocking task.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use cablemon_auth::{join_url, AuthError, Session, Transport, TransportError};
use cablemon_core::{AuthMethod, ModemCapability, ParseResult};
use cablemon_parsers::{Html, ModemParser, ParserError, ParserRegistry, RegistryError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ModemConfig;

/// Parser used when detection finds no match
pub const FALLBACK_PARSER: &str = "Unknown Modem (Fallback Mode)";

const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum PollError {
    #[error("Authentication failed: {0}")]
    AuthFailed(String),
    #[error("Login attempt failed: {0}")]
    Login(AuthError),
    #[error("Parser {0:?} is not registered")]
    UnknownParser(String),
    #[error("Parser registry unavailable: {0}")]
    Registry(#[from] RegistryError),
    #[error("Failed to fetch modem page: {0}")]
    Fetch(#[from] ParserError),
    #[error("HTTP transport unavailable: {0}")]
    Transport(#[from] TransportError),
    #[error("No channel data after {0} attempt(s)")]
    NoData(u32),
    #[error("{0} does not support remote restart")]
    RestartUnsupported(String),
    #[error("Poll task failed: {0}")]
    Task(String),
}

impl PollError {
    /// Retrying with the same credentials would not help
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::AuthFailed(_) => true,
            Self::Login(e) => e.is_auth_failure(),
            Self::Fetch(e) => cablemon_parsers::is_auth_failure(e),
            _ => false,
        }
    }
}

/// One successful poll of one modem
#[derive(Debug, Clone, Serialize)]
pub struct PollReport {
    pub modem: String,
    pub parser: String,
    pub polled_at: DateTime<Utc>,
    pub attempts: u32,
    #[serde(flatten)]
    pub result: ParseResult,
}

/// Pages sampled while detecting a parser, keyed by path
#[derive(Default)]
struct PageCache {
    pages: HashMap<String, Option<String>>,
}

impl PageCache {
    fn get(&mut self, session: &mut Session, base_url: &str, path: &str) -> Option<&str> {
        self.pages
            .entry(path.to_string())
            .or_insert_with(|| {
                let url = join_url(base_url, path);
                match session.get(&url).and_then(|r| r.error_for_status()) {
                    Ok(response) => Some(response.body),
                    Err(e) => {
                        debug!(url = %url, error = %e, "Detection sample failed");
                        None
                    }
                }
            })
            .as_deref()
    }
}

pub struct Driver<'a> {
    registry: &'a ParserRegistry,
    transport: Arc<dyn Transport>,
    retry_delay: Duration,
}

impl<'a> Driver<'a> {
    pub fn new(registry: &'a ParserRegistry, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            transport,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    fn session(&self) -> Session {
        Session::new(Arc::clone(&self.transport))
    }

    /// Try parsers by priority against unauthenticated samples of their pages
    pub fn detect(&self, base_url: &str) -> Result<Arc<dyn ModemParser>, PollError> {
        let mut session = self.session();
        let mut cache = PageCache::default();

        for parser in self.registry.detection_order()? {
            let paths = std::iter::once("/").chain(parser.descriptor().url_patterns.iter().map(|p| p.path.as_str()));
            for path in paths {
                let Some(html) = cache.get(&mut session, base_url, path) else {
                    continue;
                };
                let document = Html::parse_document(html);
                if parser.can_parse(&document, &join_url(base_url, path), html) {
                    info!(base_url = %base_url, parser = %parser.name(), path = %path, "Detected modem");
                    return Ok(Arc::clone(&parser));
                }
            }
        }

        warn!(base_url = %base_url, "No parser matched, using fallback");
        self.registry
            .get_parser_by_name(FALLBACK_PARSER)
            .ok_or_else(|| PollError::UnknownParser(FALLBACK_PARSER.to_string()))
    }

    /// The configured parser, or the detected one
    pub fn resolve_parser(&self, modem: &ModemConfig) -> Result<Arc<dyn ModemParser>, PollError> {
        match &modem.parser {
            Some(name) => self
                .registry
                .get_parser_by_name(name)
                .ok_or_else(|| PollError::UnknownParser(name.clone())),
            None => self.detect(&modem.base_url()),
        }
    }

    fn login(&self, parser: &dyn ModemParser, session: &mut Session, modem: &ModemConfig) -> Result<(), PollError> {
        let outcome = parser.login(
            session,
            &modem.base_url(),
            modem.username.as_deref(),
            modem.password.as_deref(),
        );
        match outcome.error {
            Some(e) if e.is_auth_failure() => Err(PollError::AuthFailed(e.to_string())),
            Some(e) => {
                warn!(modem = %modem.name, error = %e, "Login attempt failed");
                Err(PollError::Login(e))
            }
            None => {
                debug!(modem = %modem.name, success = outcome.success, "Login step finished");
                Ok(())
            }
        }
    }

    /// One login, fetch, parse pass on a fresh session
    fn attempt(&self, parser: &dyn ModemParser, modem: &ModemConfig) -> Result<ParseResult, PollError> {
        let base_url = modem.base_url();
        let mut session = self.session();
        self.login(parser, &mut session, modem)?;

        let descriptor = parser.descriptor();
        let hnap = descriptor
            .url_patterns
            .first()
            .is_some_and(|p| p.auth_method == AuthMethod::Hnap);
        let page = match descriptor.primary_path() {
            Some(path) if !hnap => {
                let url = join_url(&base_url, path);
                session
                    .get(&url)
                    .and_then(|r| r.error_for_status())
                    .map_err(ParserError::from)?
                    .body
            }
            _ => String::new(),
        };
        let document = Html::parse_document(&page);

        let result = parser.parse(&document, Some(&mut session), Some(&base_url));
        if result.auth_failure {
            let detail = result
                .diagnostic_context
                .as_ref()
                .map(|c| c.error.clone())
                .unwrap_or_else(|| "session rejected".to_string());
            return Err(PollError::AuthFailed(detail));
        }
        Ok(result)
    }

    /// Poll one modem, retrying whole attempts except after auth failures
    pub fn poll(&self, modem: &ModemConfig, max_attempts: u32) -> Result<PollReport, PollError> {
        let parser = self.resolve_parser(modem)?;
        let expects_channels = parser.has_capability(ModemCapability::DownstreamChannels);
        let max_attempts = max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            if attempt > 1 && !self.retry_delay.is_zero() {
                std::thread::sleep(self.retry_delay);
            }
            match self.attempt(parser.as_ref(), modem) {
                Ok(result) if expects_channels && result.downstream.is_empty() => {
                    warn!(modem = %modem.name, attempt, "Parse returned no downstream channels");
                    last_error = Some(PollError::NoData(attempt));
                }
                Ok(result) => {
                    info!(
                        modem = %modem.name,
                        parser = %parser.name(),
                        downstream = result.downstream.len(),
                        upstream = result.upstream.len(),
                        attempt,
                        "Poll succeeded"
                    );
                    return Ok(PollReport {
                        modem: modem.name.clone(),
                        parser: parser.name().to_string(),
                        polled_at: Utc::now(),
                        attempts: attempt,
                        result,
                    });
                }
                Err(e) if e.is_auth_failure() => {
                    warn!(modem = %modem.name, error = %e, "Authentication failure, not retrying");
                    return Err(e);
                }
                Err(e) => {
                    warn!(modem = %modem.name, attempt, error = %e, "Poll attempt failed");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or(PollError::NoData(max_attempts)))
    }

    /// Log in and ask the modem to reboot
    pub fn restart(&self, modem: &ModemConfig) -> Result<bool, PollError> {
        let parser = self.resolve_parser(modem)?;
        if !parser.has_capability(ModemCapability::Restart) {
            return Err(PollError::RestartUnsupported(parser.name().to_string()));
        }
        let mut session = self.session();
        self.login(parser.as_ref(), &mut session, modem)?;
        let restarted = parser.restart(&mut session, &modem.base_url())?;
        info!(modem = %modem.name, parser = %parser.name(), restarted, "Restart requested");
        Ok(restarted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cablemon_auth::transport::mock::MockTransport;

    const MB7621_CONNECTION: &str = r#"<html><head><title>Motorola Cable Modem</title></head><body>
<table class="moto-table-content">
  <tr><td class="moto-param-header-s">Channel</td><td class="moto-param-header-s">Lock Status</td>
      <td class="moto-param-header-s">Modulation</td><td class="moto-param-header-s">Channel ID</td>
      <td class="moto-param-header-s">Freq. (MHz)</td><td class="moto-param-header-s">Pwr (dBmV)</td>
      <td class="moto-param-header-s">SNR (dB)</td><td class="moto-param-header-s">Corrected</td>
      <td class="moto-param-header-s">Uncorrected</td></tr>
  <tr><td>1</td><td>Locked</td><td>QAM256</td><td>135</td><td>567.0</td><td>0.5</td><td>41.4</td><td>42</td><td>0</td></tr>
</table>
<table class="moto-table-content">
  <tr><td>System Up Time</td><td>32 days 11h:58m:26s</td></tr>
  <tr><td>Software Version</td><td>7621-5.7.1.5</td></tr>
</table>
</body></html>"#;

    const LOGIN_PAGE: &str = r#"<form action="/goform/login"><input name="loginUsername"><input name="loginPassword"></form>"#;

    fn modem(parser: Option<&str>, credentials: bool) -> ModemConfig {
        ModemConfig {
            name: "office".to_string(),
            host: "192.168.100.1".to_string(),
            username: credentials.then(|| "admin".to_string()),
            password: credentials.then(|| "motorola".to_string()),
            parser: parser.map(str::to_string),
        }
    }

    fn driver(mock: &Arc<MockTransport>) -> Driver<'static> {
        Driver::new(ParserRegistry::global(), mock.clone()).with_retry_delay(Duration::ZERO)
    }

    #[test]
    fn test_poll_configured_parser() {
        let mock = Arc::new(MockTransport::new());
        mock.push_ok("<html>welcome</html>") // login
            .push_ok(MB7621_CONNECTION); // primary page, already complete
        let report = driver(&mock).poll(&modem(Some("Motorola MB7621"), true), 2).unwrap();

        assert_eq!(report.parser, "Motorola MB7621");
        assert_eq!(report.attempts, 1);
        assert_eq!(report.result.downstream.len(), 1);
        assert_eq!(report.result.info("software_version"), Some("7621-5.7.1.5"));

        let requests = mock.requests();
        assert_eq!(requests[0].url, "http://192.168.100.1/goform/login");
        assert_eq!(requests[0].form_value("loginUsername"), Some("admin"));
        assert_eq!(requests[1].url, "http://192.168.100.1/MotoSwInfo.asp");
    }

    #[test]
    fn test_login_rejection_halts_without_retry() {
        let mock = Arc::new(MockTransport::new());
        mock.push_ok(LOGIN_PAGE);
        let err = driver(&mock).poll(&modem(Some("Motorola MB7621"), true), 3).unwrap_err();

        assert!(matches!(err, PollError::AuthFailed(_)));
        assert_eq!(mock.requests().len(), 1);
    }

    #[test]
    fn test_parse_auth_failure_halts_without_retry() {
        let mock = Arc::new(MockTransport::new());
        mock.push_ok("<html>MB7621</html>") // public software info page
            .push_ok(LOGIN_PAGE); // connection page redirected to login
        let err = driver(&mock).poll(&modem(Some("Motorola MB7621"), false), 3).unwrap_err();

        assert!(err.is_auth_failure());
        assert_eq!(mock.requests().len(), 2);
    }

    #[test]
    fn test_transient_failure_retried() {
        let mock = Arc::new(MockTransport::new());
        mock.push_err(TransportError::Timeout("10s".into()))
            .push_ok(MB7621_CONNECTION);
        let report = driver(&mock).poll(&modem(Some("Motorola MB7621"), false), 2).unwrap();

        assert_eq!(report.attempts, 2);
        assert_eq!(report.result.downstream.len(), 1);
    }

    #[test]
    fn test_login_timeout_retried() {
        let mock = Arc::new(MockTransport::new());
        mock.push_err(TransportError::Timeout("10s".into())) // first login
            .push_ok("<html>welcome</html>")
            .push_ok(MB7621_CONNECTION);
        let report = driver(&mock).poll(&modem(Some("Motorola MB7621"), true), 3).unwrap();

        assert_eq!(report.attempts, 2);
        assert_eq!(report.result.downstream.len(), 1);
        assert_eq!(mock.requests().len(), 3);
    }

    #[test]
    fn test_login_network_errors_exhaust_attempts() {
        let mock = Arc::new(MockTransport::new());
        mock.push_err(TransportError::Connect("refused".into()))
            .push_err(TransportError::Connect("refused".into()));
        let err = driver(&mock).poll(&modem(Some("Motorola MB7621"), true), 2).unwrap_err();

        assert!(matches!(err, PollError::Login(AuthError::Transport(_))));
        assert!(!err.is_auth_failure());
        assert_eq!(mock.requests().len(), 2);
    }

    #[test]
    fn test_attempts_exhausted() {
        let mock = Arc::new(MockTransport::new());
        mock.push_err(TransportError::Connect("refused".into()))
            .push_err(TransportError::Connect("refused".into()));
        let err = driver(&mock).poll(&modem(Some("Motorola MB7621"), false), 2).unwrap_err();

        assert!(matches!(err, PollError::Fetch(_)));
        assert!(!err.is_auth_failure());
        assert_eq!(mock.requests().len(), 2);
    }

    #[test]
    fn test_unknown_parser_name() {
        let mock = Arc::new(MockTransport::new());
        let err = driver(&mock).poll(&modem(Some("Motorola MB9999"), false), 1).unwrap_err();
        assert!(matches!(err, PollError::UnknownParser(name) if name == "Motorola MB9999"));
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn test_detect_from_root_page() {
        let mock = Arc::new(MockTransport::new());
        mock.push_ok("<html><title>Motorola MB8611</title></html>");
        let parser = driver(&mock).detect("http://192.168.100.1").unwrap();

        assert_eq!(parser.name(), "Motorola MB8611 (HNAP)");
        assert_eq!(mock.requests()[0].url, "http://192.168.100.1/");
    }

    #[test]
    fn test_detect_falls_back() {
        let mock = Arc::new(MockTransport::new());
        mock.push_ok("<html><title>Some Gateway</title></html>");
        let parser = driver(&mock).detect("http://192.168.100.1").unwrap();

        assert_eq!(parser.name(), FALLBACK_PARSER);
        // The root page is fetched once and reused for every parser
        assert_eq!(
            mock.requests().iter().filter(|r| r.url == "http://192.168.100.1/").count(),
            1
        );
    }

    #[test]
    fn test_restart_unsupported() {
        let mock = Arc::new(MockTransport::new());
        let err = driver(&mock).restart(&modem(Some("Netgear CM2000"), true)).unwrap_err();
        assert!(matches!(err, PollError::RestartUnsupported(_)));
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn test_restart_after_login() {
        let mock = Arc::new(MockTransport::new());
        mock.push_ok("<html>welcome</html>")
            .push_ok("<html>security</html>")
            .push_err(TransportError::ConnectionReset("reset".into()));
        let restarted = driver(&mock).restart(&modem(Some("Motorola MB7621"), true)).unwrap();

        assert!(restarted);
        assert_eq!(mock.requests()[2].url, "http://192.168.100.1/goform/MotoSecurity");
    }
}
