//! Parser discovery, ordering, and lookup
//!
//! Parsers come from a static table of vendor groups. Discovery builds a
//! `ParserSet` (sorted list plus name index) and caches it behind a lock;
//! a refresh swaps in a whole new set so readers never see a partial one.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::error::{ParserError, RegistryError};
use crate::parser::ModemParser;
use crate::{arris, motorola, netgear, universal};

/// Manufacturer of the fallback parser; sorts after every real vendor
const UNKNOWN_MANUFACTURER: &str = "Unknown";
/// Marker for catch-all parsers; they sort after specific models
const GENERIC_MARKER: &str = "Generic";

pub type GroupLoader = fn() -> Result<Vec<Arc<dyn ModemParser>>, ParserError>;

/// A vendor module and the loader returning the parsers it defines
#[derive(Debug, Clone, Copy)]
pub struct ParserGroup {
    pub name: &'static str,
    pub load: GroupLoader,
}

pub static PARSER_GROUPS: &[ParserGroup] = &[
    ParserGroup {
        name: "arris",
        load: arris::load,
    },
    ParserGroup {
        name: "motorola",
        load: motorola::load,
    },
    ParserGroup {
        name: "netgear",
        load: netgear::load,
    },
    ParserGroup {
        name: "universal",
        load: universal::load,
    },
];

/// An immutable, sorted snapshot of the discovered parsers
pub struct ParserSet {
    parsers: Vec<Arc<dyn ModemParser>>,
    by_name: HashMap<String, usize>,
}

impl ParserSet {
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ModemParser>> {
        self.parsers.iter()
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.parsers.iter().map(|p| p.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ModemParser>> {
        self.by_name.get(name).map(|&i| Arc::clone(&self.parsers[i]))
    }

    /// Parsers by descending priority, ties kept in display order
    pub fn detection_order(&self) -> Vec<Arc<dyn ModemParser>> {
        let mut ordered = self.parsers.clone();
        ordered.sort_by_key(|p| Reverse(p.priority()));
        ordered
    }
}

impl fmt::Debug for ParserSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

fn sort_key(parser: &dyn ModemParser) -> (bool, String, bool, String) {
    (
        parser.manufacturer() == UNKNOWN_MANUFACTURER,
        parser.manufacturer().to_string(),
        parser.name().contains(GENERIC_MARKER),
        parser.name().to_string(),
    )
}

fn build_set(groups: &[ParserGroup]) -> Result<ParserSet, RegistryError> {
    let mut parsers: Vec<Arc<dyn ModemParser>> = Vec::new();

    for group in groups {
        let loaded = match (group.load)() {
            Ok(loaded) => loaded,
            Err(e) => {
                let err = RegistryError::Loader {
                    group: group.name.to_string(),
                    reason: e.to_string(),
                };
                warn!(error = %err, "Skipping parser group");
                continue;
            }
        };
        for parser in loaded {
            if let Err(e) = parser.descriptor().validate() {
                let err = RegistryError::from(e);
                warn!(group = group.name, error = %err, "Skipping parser");
                continue;
            }
            if parsers.iter().any(|p| p.name() == parser.name()) {
                return Err(RegistryError::DuplicateName(parser.name().to_string()));
            }
            debug!(group = group.name, parser = %parser.name(), "Registered parser");
            parsers.push(parser);
        }
    }

    parsers.sort_by_cached_key(|p| sort_key(p.as_ref()));
    let by_name = parsers
        .iter()
        .enumerate()
        .map(|(i, p)| (p.name().to_string(), i))
        .collect();
    Ok(ParserSet { parsers, by_name })
}

static GLOBAL: Lazy<ParserRegistry> = Lazy::new(ParserRegistry::new);

/// Cached discovery over a table of parser groups
pub struct ParserRegistry {
    groups: Vec<ParserGroup>,
    cache: RwLock<Option<Arc<ParserSet>>>,
}

impl ParserRegistry {
    /// A registry over the built-in vendor groups
    pub fn new() -> Self {
        Self::with_groups(PARSER_GROUPS.to_vec())
    }

    pub fn with_groups(groups: Vec<ParserGroup>) -> Self {
        Self {
            groups,
            cache: RwLock::new(None),
        }
    }

    /// The process-wide registry
    pub fn global() -> &'static ParserRegistry {
        &GLOBAL
    }

    /// Return the parser set, rebuilding it unless `use_cache` and warm
    pub fn discover(&self, use_cache: bool) -> Result<Arc<ParserSet>, RegistryError> {
        if use_cache {
            if let Some(set) = self.cache.read().as_ref() {
                return Ok(Arc::clone(set));
            }
        }

        let set = Arc::new(build_set(&self.groups)?);
        info!(count = set.len(), parsers = ?set.names(), "Discovered modem parsers");
        *self.cache.write() = Some(Arc::clone(&set));
        Ok(set)
    }

    /// All parsers in display order
    pub fn list_parsers(&self) -> Result<Vec<Arc<dyn ModemParser>>, RegistryError> {
        Ok(self.discover(true)?.iter().cloned().collect())
    }

    pub fn detection_order(&self) -> Result<Vec<Arc<dyn ModemParser>>, RegistryError> {
        Ok(self.discover(true)?.detection_order())
    }

    pub fn get_parser_by_name(&self, name: &str) -> Option<Arc<dyn ModemParser>> {
        let set = match self.discover(true) {
            Ok(set) => set,
            Err(e) => {
                warn!(error = %e, "Parser discovery failed");
                return None;
            }
        };
        let parser = set.get(name);
        if parser.is_none() {
            warn!(name = %name, "No parser registered under this name");
        }
        parser
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserRegistry")
            .field("groups", &self.groups.iter().map(|g| g.name).collect::<Vec<_>>())
            .field("cached", &self.cache.read().is_some())
            .finish()
    }
}
