//! Cablemon Auth - Device sessions and login strategies
//!
//! This crate provides everything needed to talk to a modem's management UI:
//! - A pluggable blocking `Transport` (reqwest in production, scripted in tests)
//! - `Session`, which owns cookies and the derived HNAP PrivateKey
//! - The HNAP request clients for the XML/SOAP and JSON wire encodings
//! - The three login strategies and the factory that selects between them

pub mod error;
pub mod hnap;
pub mod session;
pub mod strategy;
pub mod transport;

pub use error::{AuthError, TransportError};
pub use hnap::{HnapClient, HnapFields, HnapJsonClient, HnapSigner, HnapSoapClient};
pub use session::{join_url, Session};
pub use strategy::{get_strategy, strategy_for, AuthStrategy, LoginOutcome};
pub use transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, RequestBody, Transport};
