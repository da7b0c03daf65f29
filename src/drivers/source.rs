#[cfg(test)]
use std::collections::VecDeque;
use std::f64::consts::PI;
use std::time::Instant;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::drivers::MonitorError;
use crate::types::Reading;
/// Something the poller can ask for the next batch of readings.
///
/// `start` and `stop` bracket a session; sources that front a device use them
/// to toggle acquisition.
pub trait SampleSource: Send {
    fn start(&mut self) -> Result<(), MonitorError> {
        Ok(())
    }
    fn fetch(&mut self) -> Result<Vec<Reading>, MonitorError>;
    fn stop(&mut self) -> Result<(), MonitorError> {
        Ok(())
    }
    fn describe(&self) -> String;
}
/// In-memory source useful for tests and deterministic playback.
#[cfg(test)]
pub struct ManualSource {
    queue: VecDeque<Result<Vec<Reading>, MonitorError>>,
}
#[cfg(test)]
impl ManualSource {
    pub fn new(batches: impl IntoIterator<Item = Vec<Reading>>) -> Self {
        Self {
            queue: batches.into_iter().map(Ok).collect(),
        }
    }
    pub fn push_batch(&mut self, readings: Vec<Reading>) {
        self.queue.push_back(Ok(readings));
    }
    /// Queues a failing fetch.
    pub fn push_error(&mut self, error: MonitorError) {
        self.queue.push_back(Err(error));
    }
}
#[cfg(test)]
impl SampleSource for ManualSource {
    fn fetch(&mut self) -> Result<Vec<Reading>, MonitorError> {
        self.queue.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
    fn describe(&self) -> String {
        "manual".into()
    }
}
const BASE_FREQUENCY_HZ: f64 = 1.5;
const NOISE_LEVEL: f64 = 0.3;
/// Synthesized electrode signal: an amplitude-modulated 1.5 Hz sine with a third
/// harmonic. `raw` carries uniform noise, `filtered` is the clean waveform.
pub struct SimulatedSource {
    rng: StdRng,
    started_at: Option<Instant>,
    clock: Option<Box<dyn FnMut() -> u64 + Send>>,
}
impl SimulatedSource {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            started_at: None,
            clock: None,
        }
    }
    /// Deterministic variant: the clock closure supplies the session time in ms.
    #[cfg(test)]
    pub fn seeded(seed: u64, clock: impl FnMut() -> u64 + Send + 'static) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            started_at: None,
            clock: Some(Box::new(clock)),
        }
    }
    fn elapsed_ms(&mut self) -> u64 {
        if let Some(clock) = self.clock.as_mut() {
            return clock();
        }
        self.started_at
            .map(|start| start.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }
}
impl Default for SimulatedSource {
    fn default() -> Self {
        Self::new()
    }
}
/// Clean synthetic waveform at `t` seconds.
pub fn simulated_waveform(t: f64) -> f64 {
    let amplitude = 2.5 + (t * 0.5).sin() * 1.5;
    amplitude * (2.0 * PI * BASE_FREQUENCY_HZ * t).sin()
        + 0.5 * (2.0 * PI * BASE_FREQUENCY_HZ * 3.0 * t).sin()
}
impl SampleSource for SimulatedSource {
    fn start(&mut self) -> Result<(), MonitorError> {
        self.started_at = Some(Instant::now());
        Ok(())
    }
    fn fetch(&mut self) -> Result<Vec<Reading>, MonitorError> {
        let time_ms = self.elapsed_ms();
        let t = time_ms as f64 / 1000.0;
        let clean = simulated_waveform(t);
        let noise = (self.rng.gen::<f64>() - 0.5) * NOISE_LEVEL;
        let frequency = BASE_FREQUENCY_HZ + (self.rng.gen::<f64>() - 0.5) * 0.5;
        Ok(vec![Reading::new(time_ms, clean + noise, clean).with_frequency(frequency)])
    }
    fn stop(&mut self) -> Result<(), MonitorError> {
        self.started_at = None;
        Ok(())
    }
    fn describe(&self) -> String {
        "simulator".into()
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    #[test]
    fn manual_source_drains_then_returns_empty() {
        let mut source = ManualSource::new(vec![vec![Reading::new(0, 1.0, 1.0)]]);
        source.push_error(MonitorError::Payload("bad".into()));
        assert_eq!(source.fetch().unwrap().len(), 1);
        assert!(source.fetch().is_err());
        assert!(source.fetch().unwrap().is_empty());
    }
    #[test]
    fn simulator_stays_near_clean_waveform() {
        let tick = Arc::new(AtomicU64::new(0));
        let clock = Arc::clone(&tick);
        let mut source = SimulatedSource::seeded(7, move || clock.fetch_add(100, Ordering::SeqCst));
        for expected_ms in [0u64, 100, 200, 300] {
            let batch = source.fetch().unwrap();
            assert_eq!(batch.len(), 1);
            let reading = batch[0];
            assert_eq!(reading.time_ms, expected_ms);
            assert!((reading.raw - reading.filtered).abs() <= NOISE_LEVEL / 2.0);
            let freq = reading.frequency.unwrap();
            assert!((1.25..=1.75).contains(&freq));
        }
    }
    #[test]
    fn waveform_is_bounded() {
        for i in 0..1000 {
            let v = simulated_waveform(i as f64 * 0.01);
            assert!(v.abs() <= 4.5);
        }
    }
}
