//! Concurrent polling of the configured modems
//!
//! Each modem gets its own blocking task and its own transport; the parser
//! registry is the only shared state.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use cablemon_auth::{ReqwestTransport, Transport, TransportError};
use cablemon_parsers::ParserRegistry;
use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::config::{Config, ModemConfig};
use crate::driver::{Driver, PollError, PollReport};

pub type TransportFactory = Arc<dyn Fn() -> Result<Arc<dyn Transport>, TransportError> + Send + Sync>;

/// Fresh reqwest transports for production polling
pub fn reqwest_transports() -> TransportFactory {
    Arc::new(|| -> Result<Arc<dyn Transport>, TransportError> { Ok(Arc::new(ReqwestTransport::new()?)) })
}

/// How poll results are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    /// One JSON document per modem on stdout
    Json,
    /// Summary log lines only
    Log,
}

pub type PollOutcome = (String, Result<PollReport, PollError>);

/// Poll every modem once, concurrently; results sorted by modem name
pub async fn poll_all(modems: &[ModemConfig], max_attempts: u32, transports: &TransportFactory) -> Vec<PollOutcome> {
    let mut tasks = JoinSet::new();

    for modem in modems.iter().cloned() {
        let transports = Arc::clone(transports);
        tasks.spawn_blocking(move || {
            let result = transports()
                .map_err(PollError::from)
                .and_then(|transport| Driver::new(ParserRegistry::global(), transport).poll(&modem, max_attempts));
            (modem.name, result)
        });
    }

    let mut outcomes = Vec::with_capacity(modems.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => error!(error = %e, "Poll task did not complete"),
        }
    }
    outcomes.sort_by(|a, b| a.0.cmp(&b.0));
    outcomes
}

fn emit(output: Output, modem: &str, result: &Result<PollReport, PollError>) {
    match (output, result) {
        (Output::Json, Ok(report)) => match serde_json::to_string(report) {
            Ok(line) => println!("{}", line),
            Err(e) => error!(modem = %modem, error = %e, "Failed to serialize poll report"),
        },
        (Output::Log, Ok(report)) => info!(
            modem = %modem,
            parser = %report.parser,
            downstream = report.result.downstream.len(),
            upstream = report.result.upstream.len(),
            uptime = report.result.info("system_uptime").unwrap_or("unknown"),
            "Modem polled"
        ),
        (_, Err(e)) => error!(
            modem = %modem,
            auth_failure = e.is_auth_failure(),
            error = %e,
            "Modem poll failed"
        ),
    }
}

/// Only rejected credentials stop future polls; network failures do not
fn halts(result: &Result<PollReport, PollError>) -> bool {
    matches!(result, Err(e) if e.is_auth_failure())
}

/// Poll on the configured interval until Ctrl-C, or once when `once` is set.
///
/// A modem that fails authentication is dropped from later polls so a bad
/// password does not trip the modem's lockout.
pub async fn run(config: &Config, output: Output, once: bool, transports: TransportFactory) -> Result<()> {
    if config.modems.is_empty() {
        warn!("No modems configured, nothing to poll");
        return Ok(());
    }

    let mut ticker = interval(config.daemon.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut halted: HashSet<String> = HashSet::new();

    info!(
        modems = config.modems.len(),
        interval_secs = config.daemon.poll_interval().as_secs(),
        "Poller started"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                return Ok(());
            }
        }

        let active: Vec<ModemConfig> = config
            .modems
            .iter()
            .filter(|m| !halted.contains(&m.name))
            .cloned()
            .collect();
        if active.is_empty() {
            warn!("Every modem is halted after authentication failures");
            return Ok(());
        }

        for (modem, result) in poll_all(&active, config.daemon.attempts(), &transports).await {
            emit(output, &modem, &result);
            if halts(&result) {
                warn!(modem = %modem, "Halting polls for this modem until credentials are fixed");
                halted.insert(modem);
            }
        }

        if once {
            return Ok(());
        }
    }
}
