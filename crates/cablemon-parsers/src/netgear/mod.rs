//! Netgear cable modem parsers

pub mod cm2000;

use std::sync::Arc;

use crate::error::ParserError;
use crate::parser::ModemParser;

pub use cm2000::NetgearCm2000Parser;

pub const MANUFACTURER: &str = "Netgear";

/// Parsers defined in this group
pub fn load() -> Result<Vec<Arc<dyn ModemParser>>, ParserError> {
    Ok(vec![Arc::new(NetgearCm2000Parser::new()?)])
}
