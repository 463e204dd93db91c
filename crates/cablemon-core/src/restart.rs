//! Post-reboot zero filtering
//!
//! While channels are still locking after a reboot, modems report spurious
//! zero power and SNR. Inside the restart window those zeros become `None`.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::channel::{ChannelReading, ParseResult};

/// Length of the post-boot window in seconds
pub const RESTART_WINDOW_SECONDS: u64 = 300;

// "32 days 11h:58m:26s", "7 days 00:00:01", "04h:30m:00s"
static UPTIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:(\d+)\s*days?\s*,?\s*)?(\d+)\s*h?\s*:\s*(\d+)\s*m?\s*:\s*(\d+)\s*s?")
        .expect("uptime pattern is valid")
});

/// Parse a modem uptime string into seconds
pub fn parse_uptime_seconds(text: &str) -> Option<u64> {
    let caps = UPTIME_RE.captures(text.trim())?;
    let num = |i: usize| -> Option<u64> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };
    let days = num(1)?;
    let hours = num(2)?;
    let minutes = num(3)?;
    let seconds = num(4)?;
    days.checked_mul(86_400)?
        .checked_add(hours.checked_mul(3_600)?)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(seconds)
}

fn filter_channel(channel: &mut ChannelReading) {
    if channel.power == Some(0.0) {
        channel.power = None;
    }
    if channel.snr == Some(0.0) {
        channel.snr = None;
    }
}

/// Null out zero power/SNR on every channel when uptime is inside the window.
///
/// Unknown uptime leaves readings untouched. Returns whether filtering applied.
pub fn apply_restart_window(result: &mut ParseResult, uptime_seconds: Option<u64>) -> bool {
    let Some(uptime) = uptime_seconds else {
        return false;
    };
    if uptime >= RESTART_WINDOW_SECONDS {
        return false;
    }
    debug!(uptime_seconds = uptime, "Inside restart window, filtering zero readings");
    result
        .downstream
        .iter_mut()
        .chain(result.upstream.iter_mut())
        .for_each(filter_channel);
    true
}
