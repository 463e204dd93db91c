//! Vendor-neutral parsers

pub mod fallback;

use std::sync::Arc;

use crate::error::ParserError;
use crate::parser::ModemParser;

pub use fallback::FallbackParser;

/// Parsers defined in this group
pub fn load() -> Result<Vec<Arc<dyn ModemParser>>, ParserError> {
    Ok(vec![Arc::new(FallbackParser::new())])
}
