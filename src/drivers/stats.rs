//! Rolling statistics shown next to the chart.
//!
//! Average frequency uses an exponential blend with factor 0.5: each sample
//! that carries a frequency moves the average halfway toward it. The first
//! such sample seeds the average directly.
use std::fmt;
use std::time::{Duration, Instant};

use crate::types::Sample;

/// Blend factor applied toward each new frequency value.
pub const FREQUENCY_BLEND: f64 = 0.5;

/// Signal quality derived from the absolute filtered amplitude.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Quality {
    Excellent,
    Good,
    Fair,
    Low,
}
impl Quality {
    /// Threshold ladder: `>3` Excellent, `>2` Good, `>1` Fair, otherwise Low.
    pub fn classify(amplitude: f64) -> Self {
        let magnitude = amplitude.abs();
        if magnitude > 3.0 {
            Quality::Excellent
        } else if magnitude > 2.0 {
            Quality::Good
        } else if magnitude > 1.0 {
            Quality::Fair
        } else {
            // NaN lands here too
            Quality::Low
        }
    }
    pub fn as_str(self) -> &'static str {
        match self {
            Quality::Excellent => "Excellent",
            Quality::Good => "Good",
            Quality::Fair => "Fair",
            Quality::Low => "Low",
        }
    }
}
impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Default)]
pub struct Statistics {
    current_amplitude: Option<f64>,
    avg_frequency_hz: Option<f64>,
    sample_count: usize,
    started_at: Option<Instant>,
    frozen_elapsed: Option<Duration>,
}
impl Statistics {
    pub fn begin(&mut self, now: Instant) {
        *self = Self {
            started_at: Some(now),
            ..Self::default()
        };
    }
    /// Freezes the elapsed clock at `now`.
    pub fn finish(&mut self, now: Instant) {
        if let Some(start) = self.started_at {
            self.frozen_elapsed = Some(now.saturating_duration_since(start));
        }
    }
    pub fn reset(&mut self) {
        *self = Self::default();
    }
    pub fn record(&mut self, sample: &Sample) {
        self.current_amplitude = Some(sample.filtered);
        self.sample_count += 1;
        if let Some(freq) = sample.frequency_hz.filter(|f| f.is_finite()) {
            self.avg_frequency_hz = Some(match self.avg_frequency_hz {
                Some(avg) => avg + (freq - avg) * FREQUENCY_BLEND,
                None => freq,
            });
        }
    }
    pub fn current_amplitude(&self) -> Option<f64> {
        self.current_amplitude
    }
    pub fn avg_frequency_hz(&self) -> Option<f64> {
        self.avg_frequency_hz
    }
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }
    pub fn current_quality(&self) -> Option<Quality> {
        self.current_amplitude.map(Quality::classify)
    }
    pub fn elapsed(&self, now: Instant) -> Duration {
        match (self.frozen_elapsed, self.started_at) {
            (Some(frozen), _) => frozen,
            (None, Some(start)) => now.saturating_duration_since(start),
            (None, None) => Duration::ZERO,
        }
    }
}

/// `MM:SS`; minutes keep counting past an hour.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(filtered: f64, frequency_hz: Option<f64>) -> Sample {
        Sample {
            time_ms: 0,
            epoch_ms: 0,
            raw: filtered,
            filtered,
            frequency_hz,
            quality: Quality::classify(filtered),
        }
    }

    #[test]
    fn quality_ladder() {
        assert_eq!(Quality::classify(3.5), Quality::Excellent);
        assert_eq!(Quality::classify(2.2), Quality::Good);
        assert_eq!(Quality::classify(1.1), Quality::Fair);
        assert_eq!(Quality::classify(0.05), Quality::Low);
        assert_eq!(Quality::classify(-3.5), Quality::Excellent);
        // boundaries are exclusive
        assert_eq!(Quality::classify(3.0), Quality::Good);
        assert_eq!(Quality::classify(1.0), Quality::Low);
        assert_eq!(Quality::classify(f64::NAN), Quality::Low);
    }

    #[test]
    fn frequency_blends_halfway() {
        let mut stats = Statistics::default();
        stats.record(&sample(1.0, Some(10.0)));
        assert_eq!(stats.avg_frequency_hz(), Some(10.0));
        stats.record(&sample(1.0, Some(20.0)));
        assert_eq!(stats.avg_frequency_hz(), Some(15.0));
        stats.record(&sample(1.0, None));
        assert_eq!(stats.avg_frequency_hz(), Some(15.0));
        stats.record(&sample(-2.5, Some(5.0)));
        assert_eq!(stats.avg_frequency_hz(), Some(10.0));
        assert_eq!(stats.sample_count(), 4);
        assert_eq!(stats.current_amplitude(), Some(-2.5));
        assert_eq!(stats.current_quality(), Some(Quality::Good));
    }

    #[test]
    fn elapsed_freezes_on_finish() {
        let start = Instant::now();
        let mut stats = Statistics::default();
        assert_eq!(stats.elapsed(start), Duration::ZERO);
        stats.begin(start);
        assert_eq!(stats.elapsed(start + Duration::from_secs(5)), Duration::from_secs(5));
        stats.finish(start + Duration::from_secs(7));
        assert_eq!(stats.elapsed(start + Duration::from_secs(60)), Duration::from_secs(7));
    }

    #[test]
    fn elapsed_formatting() {
        assert_eq!(format_elapsed(Duration::ZERO), "00:00");
        assert_eq!(format_elapsed(Duration::from_millis(65_900)), "01:05");
        assert_eq!(format_elapsed(Duration::from_secs(6_000)), "100:00");
    }
}
