// src/engine.rs
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::{MonitorConfig, SourceKind};
use crate::drivers::{CsvLogSource, Endpoint, LiveJsonSource, MonitorError, SampleSource, SimulatedSource};
use crate::types::*;

// Idle wait between command checks when no session is running.
const IDLE_WAIT: Duration = Duration::from_millis(50);

/// Fixed-cadence schedule for the poller.
///
/// The next fetch is due one interval after the previous fetch *finished*, so a
/// slow source stretches the cadence instead of queueing requests.
#[derive(Clone, Debug)]
pub struct Ticker {
    interval: Duration,
    next_due: Option<Instant>,
}

impl Ticker {
    pub fn new(interval: Duration) -> Self {
        Self { interval, next_due: None }
    }

    /// First tick fires immediately.
    pub fn arm(&mut self, now: Instant) {
        self.next_due = Some(now);
    }

    pub fn disarm(&mut self) {
        self.next_due = None;
    }

    #[cfg(test)]
    pub fn is_armed(&self) -> bool {
        self.next_due.is_some()
    }

    /// How long until the next tick; `None` while disarmed.
    pub fn wait_time(&self, now: Instant) -> Option<Duration> {
        self.next_due.map(|due| due.saturating_duration_since(now))
    }

    /// Reschedules after a tick that completed at `finished`.
    pub fn complete(&mut self, finished: Instant) {
        if self.next_due.is_some() {
            self.next_due = Some(finished + self.interval);
        }
    }
}

/// Builds the source named by the configuration.
pub fn source_for(config: &MonitorConfig) -> Result<Box<dyn SampleSource>, MonitorError> {
    Ok(match config.source {
        SourceKind::Live => Box::new(LiveJsonSource::new(Endpoint::new(&config.base_url, config.request_timeout())?)),
        SourceKind::Csv => Box::new(CsvLogSource::new(Endpoint::new(&config.base_url, config.request_timeout())?)),
        SourceKind::Sim => Box::new(SimulatedSource::new()),
    })
}

/// Spawns the poller thread.
///
/// While a session is active it fetches from `source` once per tick and forwards
/// the readings tagged with the session id. Fetch errors are logged and the next
/// tick proceeds as usual.
pub fn spawn_thread(
    mut source: Box<dyn SampleSource>,
    interval: Duration,
    tx: Sender<EngineMessage>,
    rx_cmd: Receiver<EngineCommand>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("emgscope-poller".into())
        .spawn(move || {
            let source_name = source.describe();
            log::info!("poller ready, source {source_name}, every {interval:?}");
            tx.send(EngineMessage::Log(format!("Poller ready ({source_name})"))).ok();

            let mut ticker = Ticker::new(interval);
            let mut active: Option<SessionId> = None;
            let mut reachable: Option<bool> = None;

            loop {
                // 1. commands
                let command = match ticker.wait_time(Instant::now()) {
                    Some(wait) if wait.is_zero() => match rx_cmd.try_recv() {
                        Ok(cmd) => Some(cmd),
                        Err(TryRecvError::Empty) => None,
                        Err(TryRecvError::Disconnected) => Some(EngineCommand::Shutdown),
                    },
                    wait => match rx_cmd.recv_timeout(wait.unwrap_or(IDLE_WAIT)) {
                        Ok(cmd) => Some(cmd),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => Some(EngineCommand::Shutdown),
                    },
                };
                match command {
                    Some(EngineCommand::Start { session }) => {
                        if active.is_some() {
                            continue;
                        }
                        if let Err(err) = source.start() {
                            log::warn!("start request failed: {err}");
                            tx.send(EngineMessage::Log(format!("Start request failed: {err}"))).ok();
                        }
                        active = Some(session);
                        ticker.arm(Instant::now());
                        log::info!("session {} polling", session.0);
                        continue;
                    }
                    Some(EngineCommand::Stop) => {
                        if active.take().is_some() {
                            ticker.disarm();
                            if let Err(err) = source.stop() {
                                log::warn!("stop request failed: {err}");
                                tx.send(EngineMessage::Log(format!("Stop request failed: {err}"))).ok();
                            }
                            log::info!("polling stopped");
                        }
                        continue;
                    }
                    Some(EngineCommand::Shutdown) => {
                        if active.take().is_some() {
                            source.stop().ok();
                        }
                        log::info!("poller shutting down");
                        break;
                    }
                    None => {}
                }

                // 2. one fetch per due tick
                let Some(session) = active else { continue };
                if ticker.wait_time(Instant::now()) != Some(Duration::ZERO) {
                    continue;
                }
                let result = source.fetch();
                ticker.complete(Instant::now());
                let ok = result.is_ok();
                match result {
                    Ok(readings) if !readings.is_empty() => {
                        if tx.send(EngineMessage::Samples { session, readings }).is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(err) => log::debug!("fetch failed: {err}"),
                }
                if reachable != Some(ok) {
                    reachable = Some(ok);
                    tx.send(EngineMessage::SourceStatus(ok)).ok();
                }
            }
        })
}
