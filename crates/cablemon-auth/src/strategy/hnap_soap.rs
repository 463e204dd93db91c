//! HNAP challenge-response login over XML/SOAP

use cablemon_core::{AuthConfig, AuthStrategyType};
use tracing::warn;

use super::{AuthStrategy, LoginOutcome};
use crate::hnap::{challenge_login, HnapSoapClient};
use crate::session::Session;

#[derive(Debug, Clone, Copy, Default)]
pub struct HnapSoapStrategy;

impl AuthStrategy for HnapSoapStrategy {
    fn strategy_type(&self) -> AuthStrategyType {
        AuthStrategyType::HnapSession
    }

    fn login(
        &self,
        session: &mut Session,
        base_url: &str,
        username: &str,
        password: &str,
        config: &AuthConfig,
    ) -> LoginOutcome {
        let client = HnapSoapClient::new(config);
        match challenge_login(&client, session, base_url, username, password) {
            Ok(result) => LoginOutcome::success(result),
            Err(e) => {
                warn!(error = %e, "HNAP SOAP login failed");
                LoginOutcome::failure(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::transport::mock::MockTransport;
    use cablemon_core::{derive_login_password, derive_private_key};
    use std::sync::Arc;

    fn soap(action: &str, inner: &str) -> String {
        format!(
            "<?xml version=\"1.0\"?><soap:Envelope xmlns:soap=\"http://schemas.xmlsoap.org/soap/envelope/\">\
             <soap:Body><{action}Response xmlns=\"http://purenetworks.com/HNAP1/\">{inner}</{action}Response>\
             </soap:Body></soap:Envelope>"
        )
    }

    fn config() -> AuthConfig {
        AuthConfig::hnap(AuthStrategyType::HnapSession, "/Login.html")
    }

    #[test]
    fn test_login_success_keeps_private_key() {
        let mock = Arc::new(MockTransport::new());
        mock.push_ok(&soap(
            "Login",
            "<LoginResult>OK</LoginResult><Challenge>abc</Challenge><Cookie>xyz</Cookie><PublicKey>pub</PublicKey>",
        ));
        mock.push_ok(&soap("Login", "<LoginResult>OK</LoginResult>"));
        let mut session = Session::new(mock.clone());

        let outcome = HnapSoapStrategy.login(&mut session, "http://modem", "admin", "pw", &config());
        assert!(outcome.success);

        let private_key = derive_private_key("pub", "pw", "abc");
        assert_eq!(session.private_key(), Some(private_key.as_str()));
        assert_eq!(session.cookie("uid"), Some("xyz"));
        assert_eq!(session.cookie("PrivateKey"), Some(private_key.as_str()));

        let login = mock.request(1).unwrap();
        let body = login.body_text().unwrap();
        let expected = derive_login_password(&private_key, "abc");
        assert!(body.contains(&format!("<LoginPassword>{}</LoginPassword>", expected)));
        assert!(body.contains("<Action>login</Action>"));
        assert!(login.header("Content-Type").unwrap().starts_with("text/xml"));
    }

    #[test]
    fn test_login_failed_result_clears_key() {
        let mock = Arc::new(MockTransport::new());
        mock.push_ok(&soap(
            "Login",
            "<Challenge>abc</Challenge><Cookie>xyz</Cookie><PublicKey>pub</PublicKey>",
        ));
        mock.push_ok(&soap("Login", "<LoginResult>FAILED</LoginResult>"));
        let mut session = Session::new(mock);

        let outcome = HnapSoapStrategy.login(&mut session, "http://modem", "admin", "bad", &config());
        assert!(!outcome.success);
        assert!(outcome.is_rejected());
        assert!(session.private_key().is_none());
        assert!(session.cookie("PrivateKey").is_none());
    }

    #[test]
    fn test_missing_challenge_is_failure() {
        let mock = Arc::new(MockTransport::new());
        mock.push_ok(&soap("Login", "<Cookie>xyz</Cookie><PublicKey>pub</PublicKey>"));
        let mut session = Session::new(mock.clone());

        let outcome = HnapSoapStrategy.login(&mut session, "http://modem", "admin", "pw", &config());
        assert!(!outcome.success);
        assert!(!outcome.is_rejected());
        assert_eq!(mock.requests().len(), 1);
    }

    #[test]
    fn test_connection_refused_is_not_rejection() {
        let mock = Arc::new(MockTransport::new());
        mock.push_err(TransportError::Connect("refused".into()));
        let mut session = Session::new(mock);

        let outcome = HnapSoapStrategy.login(&mut session, "http://modem", "admin", "pw", &config());
        assert!(outcome.is_failure());
        assert!(!outcome.is_rejected());
        assert!(session.private_key().is_none());
    }
}
