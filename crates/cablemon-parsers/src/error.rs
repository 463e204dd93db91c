//! Parser and registry errors

use cablemon_auth::{AuthError, TransportError};
use cablemon_core::DescriptorError;
use thiserror::Error;

/// Failure while fetching or extracting modem data
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParserError {
    #[error("{0} requires an authenticated session and base URL")]
    MissingSession(String),
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Invalid selector {selector:?}: {reason}")]
    Selector { selector: String, reason: String },
}

impl ParserError {
    /// Coarse category reported in diagnostic contexts
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingSession(_) => "missing_session",
            Self::Auth(_) => "authentication",
            Self::Transport(_) => "transport",
            Self::Protocol(_) => "protocol",
            Self::Selector { .. } => "selector",
        }
    }
}

/// Failure while discovering parsers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Duplicate parser name: {0}")]
    DuplicateName(String),
    #[error("Invalid parser descriptor: {0}")]
    InvalidDescriptor(#[from] DescriptorError),
    #[error("Parser group {group} failed to load: {reason}")]
    Loader { group: String, reason: String },
}
