//! Cablemon Parsers - Modem detection and data extraction
//!
//! This crate provides:
//! - The `ModemParser` contract every vendor parser implements
//! - A cached, process-wide `ParserRegistry` built from a static table of
//!   vendor groups
//! - Parsers for ARRIS, Motorola (HTML and HNAP), and Netgear modems, plus a
//!   fallback for unsupported devices

pub mod arris;
pub mod error;
pub mod html;
pub mod motorola;
pub mod netgear;
pub mod parser;
pub mod registry;
pub mod universal;

pub use error::{ParserError, RegistryError};
pub use parser::{
    default_login, failure_result, is_auth_failure, is_auth_failure_text, ModemParser,
};
pub use registry::{ParserGroup, ParserRegistry, ParserSet, PARSER_GROUPS};

/// Re-exported so callers can build documents without depending on scraper
pub use scraper::Html;
