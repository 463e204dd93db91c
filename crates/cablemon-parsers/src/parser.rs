//! The contract every modem parser implements

use cablemon_auth::{strategy_for, LoginOutcome, Session};
use cablemon_core::{DiagnosticContext, ModemCapability, ParseResult, ParserDescriptor};
use scraper::Html;
use tracing::{debug, warn};

use crate::error::ParserError;

/// Lower-cased substrings that identify an authentication failure in error text
pub const AUTH_FAILURE_INDICATORS: &[&str] = &[
    "401",
    "403",
    "unauthorized",
    "forbidden",
    "authentication failed",
    "login failed",
    "invalid credentials",
    "session timeout",
    "invalid session",
    "\"loginresult\":\"failed\"",
    "\"loginresult\": \"failed\"",
    "loginresult=failed",
];

/// A modem variant: detection, login delegation, and extraction.
///
/// Parsers are shared across devices through the registry, so they hold only
/// immutable data. Everything per-device lives on the `Session`.
pub trait ModemParser: Send + Sync {
    fn descriptor(&self) -> &ParserDescriptor;

    fn name(&self) -> &str {
        &self.descriptor().name
    }

    fn manufacturer(&self) -> &str {
        &self.descriptor().manufacturer
    }

    fn priority(&self) -> u8 {
        self.descriptor().priority
    }

    fn has_capability(&self, capability: ModemCapability) -> bool {
        self.descriptor().has_capability(capability)
    }

    /// Cheap marker checks against a sampled page
    fn can_parse(&self, document: &Html, url: &str, html: &str) -> bool;

    /// Authenticate using the descriptor's `auth_config`
    fn login(
        &self,
        session: &mut Session,
        base_url: &str,
        username: Option<&str>,
        password: Option<&str>,
    ) -> LoginOutcome {
        default_login(self.descriptor(), session, base_url, username, password)
    }

    /// Extract channels and system information.
    ///
    /// Never fails: errors become an empty result, flagged `_auth_failure`
    /// when attributable to authentication.
    fn parse(&self, document: &Html, session: Option<&mut Session>, base_url: Option<&str>) -> ParseResult;

    /// Reboot the modem. `Ok(false)` means the parser has no restart support.
    fn restart(&self, _session: &mut Session, _base_url: &str) -> Result<bool, ParserError> {
        Ok(false)
    }
}

/// Delegate to the strategy named by the descriptor's `auth_config`.
///
/// Returns a skipped outcome when credentials are missing or empty, or when
/// the parser declares no authentication.
pub fn default_login(
    descriptor: &ParserDescriptor,
    session: &mut Session,
    base_url: &str,
    username: Option<&str>,
    password: Option<&str>,
) -> LoginOutcome {
    let (Some(username), Some(password)) = (
        username.filter(|u| !u.is_empty()),
        password.filter(|p| !p.is_empty()),
    ) else {
        debug!(parser = %descriptor.name, "No credentials supplied, skipping login");
        return LoginOutcome::skipped();
    };
    let Some(config) = descriptor.auth_config.as_ref() else {
        debug!(parser = %descriptor.name, "Parser declares no authentication");
        return LoginOutcome::skipped();
    };

    strategy_for(config.strategy).login(session, base_url, username, password, config)
}

/// Whether free-form error text names an authentication failure
pub fn is_auth_failure_text(text: &str) -> bool {
    let lower = text.to_lowercase();
    AUTH_FAILURE_INDICATORS.iter().any(|i| lower.contains(i))
}

/// Whether an error is attributable to rejected credentials or an expired session
pub fn is_auth_failure(err: &ParserError) -> bool {
    match err {
        ParserError::Auth(e) => e.is_auth_failure(),
        ParserError::Transport(e) if e.is_unauthorized() => true,
        ParserError::MissingSession(_) | ParserError::Selector { .. } => false,
        other => is_auth_failure_text(&other.to_string()),
    }
}

/// Empty result for a failed parse, flagged when authentication is to blame
pub fn failure_result(parser_name: &str, err: &ParserError) -> ParseResult {
    if is_auth_failure(err) {
        warn!(parser = %parser_name, error = %err, "Authentication failure while parsing");
        ParseResult::auth_failure(DiagnosticContext::new(parser_name, &err.to_string(), err.kind()))
    } else {
        warn!(parser = %parser_name, error = %err, "Parse failed");
        ParseResult::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cablemon_auth::transport::mock::MockTransport;
    use cablemon_auth::{AuthError, TransportError};
    use cablemon_core::{AuthConfig, UrlPattern};
    use std::sync::Arc;

    struct StubParser {
        descriptor: ParserDescriptor,
    }

    impl ModemParser for StubParser {
        fn descriptor(&self) -> &ParserDescriptor {
            &self.descriptor
        }

        fn can_parse(&self, _document: &Html, _url: &str, html: &str) -> bool {
            html.contains("STUB")
        }

        fn parse(&self, _document: &Html, _session: Option<&mut Session>, _base_url: Option<&str>) -> ParseResult {
            ParseResult::default()
        }
    }

    fn stub(auth: Option<AuthConfig>) -> StubParser {
        let mut descriptor = ParserDescriptor::new("Stub", "Acme", &["S1"])
            .capabilities(&[ModemCapability::DownstreamChannels])
            .url(UrlPattern::public("/"));
        descriptor.auth_config = auth;
        StubParser { descriptor }
    }

    #[test]
    fn test_login_without_credentials_is_skipped() {
        let mock = Arc::new(MockTransport::new());
        let mut session = Session::new(mock.clone());
        let parser = stub(Some(AuthConfig::form("/login", "u", "p")));

        assert_eq!(parser.login(&mut session, "http://modem", None, None), LoginOutcome::skipped());
        assert_eq!(parser.login(&mut session, "http://modem", Some(""), Some("pw")), LoginOutcome::skipped());
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn test_login_without_auth_config_is_skipped() {
        let mut session = Session::new(Arc::new(MockTransport::new()));
        let parser = stub(None);
        let outcome = parser.login(&mut session, "http://modem", Some("admin"), Some("pw"));
        assert_eq!(outcome, LoginOutcome::skipped());
    }

    #[test]
    fn test_login_delegates_to_strategy() {
        let mock = Arc::new(MockTransport::new());
        mock.push_ok("welcome");
        let mut session = Session::new(mock.clone());
        let parser = stub(Some(AuthConfig::form("/login", "u", "p")));

        let outcome = parser.login(&mut session, "http://modem", Some("admin"), Some("pw"));
        assert!(outcome.success);
        assert_eq!(mock.request(0).unwrap().form_value("u"), Some("admin"));
    }

    #[test]
    fn test_default_restart_unsupported() {
        let mut session = Session::new(Arc::new(MockTransport::new()));
        assert_eq!(stub(None).restart(&mut session, "http://modem"), Ok(false));
    }

    #[test]
    fn test_auth_failure_detection() {
        assert!(is_auth_failure(&ParserError::Transport(TransportError::Status(401))));
        assert!(is_auth_failure(&ParserError::Auth(AuthError::Rejected("x".into()))));
        assert!(is_auth_failure(&ParserError::Protocol("Session Timeout".into())));
        assert!(is_auth_failure(&ParserError::Protocol(r#"{"LoginResult":"FAILED"}"#.into())));
        assert!(!is_auth_failure(&ParserError::Transport(TransportError::Timeout("10s".into()))));
        assert!(!is_auth_failure(&ParserError::MissingSession("Stub".into())));
        assert!(!is_auth_failure(&ParserError::Auth(AuthError::Transport(TransportError::Timeout(
            "login".into()
        )))));
    }

    #[test]
    fn test_failure_result() {
        let result = failure_result("Stub", &ParserError::Transport(TransportError::Status(403)));
        assert!(result.auth_failure);
        let context = result.diagnostic_context.unwrap();
        assert_eq!(context.parser, "Stub");
        assert_eq!(context.error_type, "transport");

        let result = failure_result("Stub", &ParserError::Protocol("bad html".into()));
        assert!(!result.auth_failure);
        assert!(result.diagnostic_context.is_none());
        assert!(result.downstream.is_empty());
    }
}
