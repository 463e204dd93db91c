//! Capability tags a parser may declare support for

use serde::{Deserialize, Serialize};
use std::fmt;

/// Standardized data points a modem parser can provide.
///
/// Consumers use the declared set to decide which readings to expose for a
/// modem, so a parser should only list what it actually extracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModemCapability {
    // System information
    SystemUptime,
    LastBootTime,
    CurrentTime,
    HardwareVersion,
    SoftwareVersion,

    // Channel data
    DownstreamChannels,
    UpstreamChannels,
    OfdmDownstream,
    OfdmUpstream,

    // Actions
    Restart,
}

impl ModemCapability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SystemUptime => "system_uptime",
            Self::LastBootTime => "last_boot_time",
            Self::CurrentTime => "current_time",
            Self::HardwareVersion => "hardware_version",
            Self::SoftwareVersion => "software_version",
            Self::DownstreamChannels => "downstream_channels",
            Self::UpstreamChannels => "upstream_channels",
            Self::OfdmDownstream => "ofdm_downstream",
            Self::OfdmUpstream => "ofdm_upstream",
            Self::Restart => "restart",
        }
    }
}

impl fmt::Display for ModemCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
