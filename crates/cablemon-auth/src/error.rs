//! Transport and authentication errors

use cablemon_core::UnknownStrategy;
use thiserror::Error;

/// A single HTTP exchange that did not produce a usable response
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("Connection failed: {0}")]
    Connect(String),
    #[error("Connection reset: {0}")]
    ConnectionReset(String),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("HTTP client error: {0}")]
    Other(String),
}

impl TransportError {
    /// The peer dropped the connection mid-request
    pub fn is_reset(&self) -> bool {
        matches!(self, Self::ConnectionReset(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// HTTP 401 or 403
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status(401 | 403))
    }
}

/// Authentication and HNAP request errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Authentication rejected: {0}")]
    Rejected(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuthError {
    /// Whether the error means the credentials or session are no longer accepted
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::Rejected(_) => true,
            Self::Transport(e) => e.is_unauthorized(),
            _ => false,
        }
    }

    /// Whether the error should abort a batch of HNAP calls rather than
    /// leave a single action empty
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Transport(TransportError::Status(code)) => matches!(code, 401 | 403),
            Self::Transport(_) | Self::Rejected(_) => true,
            _ => false,
        }
    }
}

impl From<UnknownStrategy> for AuthError {
    fn from(err: UnknownStrategy) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_failure_classification() {
        assert!(AuthError::Rejected("UN-AUTH".into()).is_auth_failure());
        assert!(AuthError::Transport(TransportError::Status(401)).is_auth_failure());
        assert!(AuthError::Transport(TransportError::Status(403)).is_auth_failure());
        assert!(!AuthError::Transport(TransportError::Status(500)).is_auth_failure());
        assert!(!AuthError::Protocol("bad json".into()).is_auth_failure());
    }

    #[test]
    fn test_unknown_strategy_is_config_error() {
        let err: AuthError = UnknownStrategy("digest".into()).into();
        assert!(matches!(err, AuthError::Config(msg) if msg.contains("digest")));
    }
}
