//! Per-parser authentication configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::UnknownStrategy;

/// Default HNAP endpoint path
pub const DEFAULT_HNAP_ENDPOINT: &str = "/HNAP1/";

/// Default SOAPAction namespace used by HNAP firmware
pub const DEFAULT_HNAP_NAMESPACE: &str = "http://purenetworks.com/HNAP1/";

/// Login protocol variants a device may speak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStrategyType {
    /// Single POST of a plain HTML login form
    FormPlain,
    /// HNAP challenge-response over XML/SOAP
    HnapSession,
    /// HNAP challenge-response over JSON
    HnapJson,
}

impl AuthStrategyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FormPlain => "form_plain",
            Self::HnapSession => "hnap_session",
            Self::HnapJson => "hnap_json",
        }
    }

    /// Whether this strategy derives a PrivateKey on the session
    pub fn is_hnap(&self) -> bool {
        matches!(self, Self::HnapSession | Self::HnapJson)
    }
}

impl fmt::Display for AuthStrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthStrategyType {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "form_plain" | "form" => Ok(Self::FormPlain),
            "hnap_session" | "hnap" => Ok(Self::HnapSession),
            "hnap_json" => Ok(Self::HnapJson),
            _ => Err(UnknownStrategy(s.to_string())),
        }
    }
}

/// How to authenticate against one modem variant.
///
/// Bound to a parser when its descriptor is built and never mutated afterward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    pub strategy: AuthStrategyType,
    /// Path of the login form target or login page
    pub login_url: String,
    /// HNAP endpoint path (HNAP strategies only)
    #[serde(default)]
    pub hnap_endpoint: Option<String>,
    /// SOAPAction namespace prefix (HNAP strategies only)
    #[serde(default)]
    pub soap_action_namespace: Option<String>,
    /// Body marker the device returns when the HNAP session has expired
    #[serde(default)]
    pub session_timeout_indicator: Option<String>,
    /// Form field carrying the username (form strategy only)
    #[serde(default)]
    pub username_field: Option<String>,
    /// Form field carrying the password (form strategy only)
    #[serde(default)]
    pub password_field: Option<String>,
    /// Body marker meaning the login page was served again after submit
    #[serde(default)]
    pub login_page_indicator: Option<String>,
}

impl AuthConfig {
    /// Plain form login posting `username_field`/`password_field` to `login_url`
    pub fn form(login_url: &str, username_field: &str, password_field: &str) -> Self {
        Self {
            strategy: AuthStrategyType::FormPlain,
            login_url: login_url.to_string(),
            hnap_endpoint: None,
            soap_action_namespace: None,
            session_timeout_indicator: None,
            username_field: Some(username_field.to_string()),
            password_field: Some(password_field.to_string()),
            login_page_indicator: None,
        }
    }

    /// HNAP challenge-response login using the given wire encoding
    pub fn hnap(strategy: AuthStrategyType, login_url: &str) -> Self {
        Self {
            strategy,
            login_url: login_url.to_string(),
            hnap_endpoint: Some(DEFAULT_HNAP_ENDPOINT.to_string()),
            soap_action_namespace: Some(DEFAULT_HNAP_NAMESPACE.to_string()),
            session_timeout_indicator: None,
            username_field: None,
            password_field: None,
            login_page_indicator: None,
        }
    }

    pub fn with_login_page_indicator(mut self, indicator: &str) -> Self {
        self.login_page_indicator = Some(indicator.to_string());
        self
    }

    pub fn with_session_timeout_indicator(mut self, indicator: &str) -> Self {
        self.session_timeout_indicator = Some(indicator.to_string());
        self
    }

    pub fn with_hnap_endpoint(mut self, endpoint: &str) -> Self {
        self.hnap_endpoint = Some(endpoint.to_string());
        self
    }

    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.soap_action_namespace = Some(namespace.to_string());
        self
    }

    /// HNAP endpoint, falling back to `/HNAP1/`
    pub fn endpoint(&self) -> &str {
        self.hnap_endpoint.as_deref().unwrap_or(DEFAULT_HNAP_ENDPOINT)
    }

    /// SOAPAction namespace, falling back to the purenetworks namespace
    pub fn namespace(&self) -> &str {
        self.soap_action_namespace
            .as_deref()
            .unwrap_or(DEFAULT_HNAP_NAMESPACE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("form_plain".parse(), Ok(AuthStrategyType::FormPlain));
        assert_eq!("HNAP_SESSION".parse(), Ok(AuthStrategyType::HnapSession));
        assert_eq!("hnap_json".parse(), Ok(AuthStrategyType::HnapJson));
        assert_eq!(
            "basic".parse::<AuthStrategyType>(),
            Err(UnknownStrategy("basic".to_string()))
        );
    }

    #[test]
    fn test_hnap_defaults() {
        let config = AuthConfig::hnap(AuthStrategyType::HnapJson, "/Login.html");
        assert_eq!(config.endpoint(), "/HNAP1/");
        assert_eq!(config.namespace(), "http://purenetworks.com/HNAP1/");
        assert!(config.strategy.is_hnap());
    }

    #[test]
    fn test_form_fields() {
        let config = AuthConfig::form("/goform/Login", "loginName", "loginPassword");
        assert_eq!(config.strategy, AuthStrategyType::FormPlain);
        assert_eq!(config.username_field.as_deref(), Some("loginName"));
        assert_eq!(config.password_field.as_deref(), Some("loginPassword"));
    }
}
