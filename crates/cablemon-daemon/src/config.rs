//! Configuration loading and validation

use std::fmt;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const MIN_POLL_INTERVAL_SECS: u64 = 60;
pub const MAX_POLL_INTERVAL_SECS: u64 = 1800;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default, rename = "modem")]
    pub modems: Vec<ModemConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Seconds between polls, clamped to 60..=1800
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Whole attempts per modem per poll (login, fetch, parse)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl DaemonConfig {
    pub fn poll_interval(&self) -> Duration {
        let secs = self
            .poll_interval_secs
            .clamp(MIN_POLL_INTERVAL_SECS, MAX_POLL_INTERVAL_SECS);
        if secs != self.poll_interval_secs {
            warn!(
                configured = self.poll_interval_secs,
                effective = secs,
                "Poll interval out of range, clamping"
            );
        }
        Duration::from_secs(secs)
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

fn default_poll_interval() -> u64 {
    600 // Ten minutes
}

fn default_max_attempts() -> u32 {
    2
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ModemConfig {
    /// Display name, also used by `restart <modem>`
    pub name: String,
    /// Hostname or URL; `http://` is assumed without a scheme
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Parser name; auto-detected when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parser: Option<String>,
}

impl ModemConfig {
    pub fn base_url(&self) -> String {
        let host = self.host.trim().trim_end_matches('/');
        if host.contains("://") {
            host.to_string()
        } else {
            format!("http://{}", host)
        }
    }

    pub fn has_credentials(&self) -> bool {
        matches!((&self.username, &self.password), (Some(u), Some(p)) if !u.is_empty() && !p.is_empty())
    }
}

impl fmt::Debug for ModemConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModemConfig")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("parser", &self.parser)
            .finish()
    }
}

impl Config {
    pub fn modem(&self, name: &str) -> Option<&ModemConfig> {
        self.modems.iter().find(|m| m.name == name)
    }

    /// Reject configurations the poller cannot run
    pub fn validate(&self) -> Result<()> {
        for (i, modem) in self.modems.iter().enumerate() {
            if modem.name.trim().is_empty() {
                bail!("modem #{} has an empty name", i + 1);
            }
            if modem.host.trim().is_empty() {
                bail!("modem {:?} has an empty host", modem.name);
            }
            if self.modems[..i].iter().any(|m| m.name == modem.name) {
                bail!("modem name {:?} is used more than once", modem.name);
            }
        }
        Ok(())
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        info!(path = %path.display(), modems = config.modems.len(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

/// Write an example configuration, refusing to overwrite an existing file
pub fn save_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    let config = Config {
        daemon: DaemonConfig::default(),
        modems: vec![ModemConfig {
            name: "living-room".to_string(),
            host: "192.168.100.1".to_string(),
            username: Some("admin".to_string()),
            password: Some("motorola".to_string()),
            parser: Some("Motorola MB7621".to_string()),
        }],
    };

    let content = toml::to_string_pretty(&config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_full_config() {
        let file = write_config(
            r#"
[daemon]
poll_interval_secs = 300
max_attempts = 3

[[modem]]
name = "office"
host = "192.168.100.1"
username = "admin"
password = "secret"
parser = "Motorola MB7621"

[[modem]]
name = "basement"
host = "https://10.0.0.1/"
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.daemon.poll_interval(), Duration::from_secs(300));
        assert_eq!(config.daemon.attempts(), 3);
        assert_eq!(config.modems.len(), 2);

        let office = config.modem("office").unwrap();
        assert_eq!(office.base_url(), "http://192.168.100.1");
        assert!(office.has_credentials());
        assert_eq!(office.parser.as_deref(), Some("Motorola MB7621"));

        let basement = config.modem("basement").unwrap();
        assert_eq!(basement.base_url(), "https://10.0.0.1");
        assert!(!basement.has_credentials());
        assert!(basement.parser.is_none());
    }

    #[test]
    fn test_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.daemon.poll_interval_secs, 600);
        assert_eq!(config.daemon.max_attempts, 2);
        assert!(config.modems.is_empty());
    }

    #[test]
    fn test_poll_interval_clamped() {
        let fast = DaemonConfig {
            poll_interval_secs: 5,
            max_attempts: 2,
        };
        assert_eq!(fast.poll_interval(), Duration::from_secs(60));

        let slow = DaemonConfig {
            poll_interval_secs: 86_400,
            max_attempts: 0,
        };
        assert_eq!(slow.poll_interval(), Duration::from_secs(1800));
        assert_eq!(slow.attempts(), 1);
    }

    #[test]
    fn test_duplicate_modem_names_rejected() {
        let file = write_config(
            r#"
[[modem]]
name = "office"
host = "192.168.100.1"

[[modem]]
name = "office"
host = "192.168.0.1"
"#,
        );
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_password_redacted_in_debug() {
        let modem = ModemConfig {
            name: "office".to_string(),
            host: "192.168.100.1".to_string(),
            username: Some("admin".to_string()),
            password: Some("hunter2".to_string()),
            parser: None,
        };
        let debug = format!("{:?}", modem);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_default_config_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cablemon.toml");
        save_default_config(&path).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.modems[0].name, "living-room");
        assert!(save_default_config(&path).is_err());
    }
}
