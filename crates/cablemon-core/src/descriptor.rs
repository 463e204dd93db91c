//! Static parser metadata

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::auth_config::AuthConfig;
use crate::capability::ModemCapability;
use crate::error::DescriptorError;

/// How a single device page is protected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    Form,
    Hnap,
}

/// A page a parser knows how to read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlPattern {
    pub path: String,
    pub auth_required: bool,
    pub auth_method: AuthMethod,
}

impl UrlPattern {
    pub fn new(path: &str, auth_method: AuthMethod, auth_required: bool) -> Self {
        Self {
            path: path.to_string(),
            auth_required,
            auth_method,
        }
    }

    /// Unauthenticated page
    pub fn public(path: &str) -> Self {
        Self::new(path, AuthMethod::None, false)
    }
}

/// Immutable metadata for one parser variant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserDescriptor {
    /// Unique, stable display name
    pub name: String,
    pub manufacturer: String,
    pub models: Vec<String>,
    /// Higher values are tried first during detection
    pub priority: u8,
    pub verified: bool,
    #[serde(default)]
    pub verification_source: Option<String>,
    pub capabilities: BTreeSet<ModemCapability>,
    pub url_patterns: Vec<UrlPattern>,
    #[serde(default)]
    pub auth_config: Option<AuthConfig>,
}

impl ParserDescriptor {
    pub fn new(name: &str, manufacturer: &str, models: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            manufacturer: manufacturer.to_string(),
            models: models.iter().map(|m| m.to_string()).collect(),
            priority: 50,
            verified: false,
            verification_source: None,
            capabilities: BTreeSet::new(),
            url_patterns: Vec::new(),
            auth_config: None,
        }
    }

    pub fn priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn verified(mut self, source: &str) -> Self {
        self.verified = true;
        self.verification_source = Some(source.to_string());
        self
    }

    pub fn capabilities(mut self, caps: &[ModemCapability]) -> Self {
        self.capabilities.extend(caps.iter().copied());
        self
    }

    pub fn url(mut self, pattern: UrlPattern) -> Self {
        self.url_patterns.push(pattern);
        self
    }

    pub fn auth(mut self, config: AuthConfig) -> Self {
        self.auth_config = Some(config);
        self
    }

    pub fn has_capability(&self, capability: ModemCapability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// First URL pattern, used as the default page to fetch
    pub fn primary_path(&self) -> Option<&str> {
        self.url_patterns.first().map(|p| p.path.as_str())
    }

    /// Check the descriptor can be registered
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.name.trim().is_empty() {
            return Err(DescriptorError::EmptyName);
        }
        if self.manufacturer.trim().is_empty() {
            return Err(DescriptorError::EmptyManufacturer(self.name.clone()));
        }
        if self.models.is_empty() {
            return Err(DescriptorError::NoModels(self.name.clone()));
        }
        if let Some(bad) = self.url_patterns.iter().find(|p| !p.path.starts_with('/')) {
            return Err(DescriptorError::InvalidPath {
                name: self.name.clone(),
                path: bad.path.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> ParserDescriptor {
        ParserDescriptor::new("Test Modem", "Acme", &["T100"])
            .priority(80)
            .capabilities(&[ModemCapability::DownstreamChannels])
            .url(UrlPattern::public("/status.html"))
    }

    #[test]
    fn test_builder() {
        let d = descriptor();
        assert_eq!(d.priority, 80);
        assert!(!d.verified);
        assert!(d.has_capability(ModemCapability::DownstreamChannels));
        assert!(!d.has_capability(ModemCapability::Restart));
        assert_eq!(d.primary_path(), Some("/status.html"));
        assert!(d.auth_config.is_none());
    }

    #[test]
    fn test_validate() {
        assert!(descriptor().validate().is_ok());

        let mut d = descriptor();
        d.name = "  ".to_string();
        assert_eq!(d.validate(), Err(DescriptorError::EmptyName));

        let d = ParserDescriptor::new("X", "Acme", &[]);
        assert_eq!(d.validate(), Err(DescriptorError::NoModels("X".to_string())));

        let d = descriptor().url(UrlPattern::public("status.html"));
        assert!(matches!(d.validate(), Err(DescriptorError::InvalidPath { .. })));
    }
}
