//! Cablemon Core - Channel data model, parser metadata, and HNAP primitives
//!
//! This crate provides the foundational types shared by the cablemon crates:
//! - Canonical DOCSIS channel readings and the per-poll `ParseResult`
//! - Capability tags and static parser descriptors
//! - Authentication configuration bound to each parser variant
//! - The HMAC-MD5 keyed hash used by both HNAP wire encodings
//! - The `|+|` / `^` delimited record codec used by HNAP channel fields
//! - Post-reboot restart-window filtering

pub mod auth_config;
pub mod capability;
pub mod channel;
pub mod crypto;
pub mod descriptor;
pub mod error;
pub mod records;
pub mod restart;

pub use auth_config::{AuthConfig, AuthStrategyType};
pub use capability::ModemCapability;
pub use channel::{ChannelReading, DiagnosticContext, ParseResult};
pub use crypto::{derive_login_password, derive_private_key, keyed_hash};
pub use descriptor::{AuthMethod, ParserDescriptor, UrlPattern};
pub use error::{DescriptorError, ExtractionError, UnknownStrategy};
pub use records::{parse_records, Record, FIELD_SEPARATOR, RECORD_SEPARATOR};
pub use restart::{apply_restart_window, parse_uptime_seconds, RESTART_WINDOW_SECONDS};
