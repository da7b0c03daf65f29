// src/types.rs
use serde::Deserialize;

use crate::drivers::stats::Quality;

/// One `/live_data` payload, or one parsed row of the `/data` log.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct Reading {
    /// Milliseconds since the acquisition source started the session.
    pub time_ms: u64,
    pub raw: f64,
    pub filtered: f64,
    #[serde(default)]
    pub frequency: Option<f64>,
}

impl Reading {
    pub fn new(time_ms: u64, raw: f64, filtered: f64) -> Self {
        Self { time_ms, raw, filtered, frequency: None }
    }

    pub fn with_frequency(mut self, hz: f64) -> Self {
        self.frequency = Some(hz);
        self
    }
}

/// A timestamped raw/filtered pair as held by the session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub time_ms: u64,
    /// Unix epoch milliseconds: session start plus `time_ms`.
    pub epoch_ms: i64,
    pub raw: f64,
    pub filtered: f64,
    pub frequency_hz: Option<f64>,
    pub quality: Quality,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

// GUI -> poller
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineCommand {
    Start { session: SessionId },
    Stop,
    Shutdown,
}

// poller -> GUI
#[derive(Clone, Debug)]
pub enum EngineMessage {
    Log(String),
    Samples { session: SessionId, readings: Vec<Reading> },
    // Whether the last fetch reached the source.
    SourceStatus(bool),
}
