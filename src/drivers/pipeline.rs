use crate::drivers::stats::{Quality, Statistics};
use crate::drivers::{MonitorError, SessionBuffer};
use crate::types::{Reading, Sample};
/// Turns wire readings into samples and feeds the chart window, the full
/// recording log and the statistics in one step.
pub struct SamplePipeline {
    buffer: SessionBuffer,
    log: Vec<Sample>,
    stats: Statistics,
    session_epoch_ms: i64,
}
impl SamplePipeline {
    pub fn new(window_ms: u64, poll_interval_ms: u64) -> Result<Self, MonitorError> {
        Ok(Self {
            buffer: SessionBuffer::for_window(window_ms, poll_interval_ms)?,
            log: Vec::new(),
            stats: Statistics::default(),
            session_epoch_ms: 0,
        })
    }
    /// Empties everything and anchors sample epochs at `session_epoch_ms`.
    pub fn begin(&mut self, session_epoch_ms: i64, now: std::time::Instant) {
        self.buffer.clear();
        self.log.clear();
        self.stats.begin(now);
        self.session_epoch_ms = session_epoch_ms;
    }
    pub fn finish(&mut self, now: std::time::Instant) {
        self.stats.finish(now);
    }
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.log.clear();
        self.stats.reset();
    }
    /// Builds the sample for `reading` relative to the last one accepted.
    ///
    /// `None` when the reading's timestamp cannot be placed on the wall clock.
    pub fn to_sample(&self, reading: &Reading) -> Option<Sample> {
        let epoch_ms = i64::try_from(reading.time_ms)
            .ok()
            .and_then(|t| self.session_epoch_ms.checked_add(t))?;
        let frequency_hz = reading.frequency.or_else(|| {
            let previous = self.buffer.latest()?;
            let delta_ms = reading.time_ms.checked_sub(previous.time_ms)?;
            (delta_ms > 0).then(|| 1000.0 / delta_ms as f64)
        });
        Some(Sample {
            time_ms: reading.time_ms,
            epoch_ms,
            raw: reading.raw,
            filtered: reading.filtered,
            frequency_hz,
            quality: Quality::classify(reading.filtered),
        })
    }
    /// Appends every reading in order; returns how many were accepted.
    pub fn ingest(&mut self, readings: &[Reading]) -> usize {
        let mut accepted = 0;
        for reading in readings {
            let Some(sample) = self.to_sample(reading) else {
                log::debug!("dropping sample with out-of-range timestamp {} ms", reading.time_ms);
                continue;
            };
            if !self.buffer.append(sample) {
                log::debug!("dropping out-of-order sample at {} ms", reading.time_ms);
                continue;
            }
            self.log.push(sample);
            self.stats.record(&sample);
            accepted += 1;
        }
        accepted
    }
    pub fn buffer(&self) -> &SessionBuffer {
        &self.buffer
    }
    /// Every sample accepted since the session began.
    pub fn log(&self) -> &[Sample] {
        &self.log
    }
    pub fn stats(&self) -> &Statistics {
        &self.stats
    }
}
