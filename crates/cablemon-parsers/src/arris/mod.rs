//! ARRIS SURFboard parsers

pub mod sb6141;

use std::sync::Arc;

use crate::error::ParserError;
use crate::parser::ModemParser;

pub use sb6141::ArrisSb6141Parser;

pub const MANUFACTURER: &str = "ARRIS";

/// Parsers defined in this group
pub fn load() -> Result<Vec<Arc<dyn ModemParser>>, ParserError> {
    Ok(vec![Arc::new(ArrisSb6141Parser::new()?)])
}
