// src/config.rs
//! Startup configuration: built-in defaults, then an optional JSON file, then
//! command-line flags. The result is frozen and shared behind an `Arc`.
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::drivers::MonitorError;
use crate::render::ChartConfig;

pub const CONFIG_ENV: &str = "EMG_SCOPE_CONFIG";
pub const MIN_POLL_INTERVAL_MS: u64 = 10;
pub const MAX_POLL_INTERVAL_MS: u64 = 1000;
/// 12-bit ADC counts from the board.
pub const DEVICE_AXIS: (f64, f64) = (0.0, 4200.0);
/// The simulator emits a signed waveform within ±4.5.
pub const SIMULATOR_AXIS: (f64, f64) = (-5.0, 5.0);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// `GET /live_data`, one JSON reading per poll.
    Live,
    /// `GET /data`, the accumulated CSV log.
    Csv,
    /// Built-in synthesized signal.
    Sim,
}

impl FromStr for SourceKind {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "live" => Ok(SourceKind::Live),
            "csv" => Ok(SourceKind::Csv),
            "sim" | "simulate" => Ok(SourceKind::Sim),
            other => Err(MonitorError::InvalidConfig(format!("unknown source `{other}`"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorConfig {
    pub base_url: String,
    pub source: SourceKind,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub window_ms: u64,
    /// Left unset, the axis follows the source: see [`MonitorConfig::axis`].
    pub y_min: Option<f64>,
    pub y_max: Option<f64>,
    pub amplitude_divisions: u32,
    pub time_divisions: u32,
    pub decimal_places: usize,
    pub log_rows: usize,
    pub toast_duration_ms: u64,
    pub export_dir: PathBuf,
    pub default_label: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            // ESP32 soft-AP address
            base_url: "http://192.168.4.1".to_owned(),
            source: SourceKind::Live,
            poll_interval_ms: 10,
            request_timeout_ms: 2000,
            window_ms: 3000,
            y_min: None,
            y_max: None,
            amplitude_divisions: 5,
            time_divisions: 5,
            decimal_places: 6,
            log_rows: 8,
            toast_duration_ms: 3000,
            export_dir: PathBuf::from("exports"),
            default_label: "emg_session".to_owned(),
        }
    }
}

impl MonitorConfig {
    /// Parses a JSON document; fields left out keep their defaults.
    pub fn from_json(text: &str) -> Result<Self, MonitorError> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| MonitorError::InvalidConfig(e.to_string()))?;
        config.validated()
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Resolves the full configuration from process arguments (without the program name).
    ///
    /// Recognized: `--config <path>`, `--source <live|csv|sim>`, `--simulate`, `--url <base>`.
    /// Without `--config`, the `EMG_SCOPE_CONFIG` environment variable names the file.
    pub fn from_args<I>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut source = None;
        let mut url = None;
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => config_path = Some(PathBuf::from(required_value(&mut args, "--config")?)),
                "--source" => source = Some(required_value(&mut args, "--source")?.parse::<SourceKind>()?),
                "--simulate" => source = Some(SourceKind::Sim),
                "--url" => url = Some(required_value(&mut args, "--url")?),
                other => anyhow::bail!("unrecognized argument `{other}`"),
            }
        }
        let mut config = match config_path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        if let Some(source) = source {
            config.source = source;
        }
        if let Some(url) = url {
            config.base_url = url;
        }
        Ok(config.validated()?)
    }

    /// Clamps the poll interval and rejects settings the chart cannot draw.
    pub fn validated(mut self) -> Result<Self, MonitorError> {
        let clamped = self
            .poll_interval_ms
            .clamp(MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS);
        if clamped != self.poll_interval_ms {
            log::warn!(
                "poll interval {} ms outside {}..={} ms, using {} ms",
                self.poll_interval_ms,
                MIN_POLL_INTERVAL_MS,
                MAX_POLL_INTERVAL_MS,
                clamped
            );
            self.poll_interval_ms = clamped;
        }
        let (y_min, y_max) = self.axis();
        if !(y_max > y_min) {
            return Err(MonitorError::InvalidConfig(format!(
                "y_max ({y_max}) must be greater than y_min ({y_min})"
            )));
        }
        if self.amplitude_divisions == 0 || self.time_divisions == 0 {
            return Err(MonitorError::InvalidConfig("grid divisions must be at least 1".into()));
        }
        if self.window_ms == 0 {
            return Err(MonitorError::InvalidConfig("window_ms must be greater than zero".into()));
        }
        Ok(self)
    }

    /// Amplitude range: explicit bounds win, otherwise the source's native scale.
    pub fn axis(&self) -> (f64, f64) {
        let (min, max) = match self.source {
            SourceKind::Sim => SIMULATOR_AXIS,
            SourceKind::Live | SourceKind::Csv => DEVICE_AXIS,
        };
        (self.y_min.unwrap_or(min), self.y_max.unwrap_or(max))
    }

    pub fn chart(&self) -> ChartConfig {
        let (y_min, y_max) = self.axis();
        ChartConfig {
            y_min,
            y_max,
            amplitude_divisions: self.amplitude_divisions,
            time_divisions: self.time_divisions,
            window_ms: self.window_ms,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn toast_duration(&self) -> Duration {
        Duration::from_millis(self.toast_duration_ms)
    }
}

fn required_value(args: &mut impl Iterator<Item = String>, flag: &str) -> anyhow::Result<String> {
    args.next()
        .with_context(|| format!("{flag} expects a value"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn json_overrides_only_named_fields() {
        let config = MonitorConfig::from_json(r#"{"poll_interval_ms": 100, "source": "csv"}"#).unwrap();
        assert_eq!(config.poll_interval_ms, 100);
        assert_eq!(config.source, SourceKind::Csv);
        assert_eq!(config.window_ms, 3000);
    }

    #[test]
    fn poll_interval_is_clamped() {
        let fast = MonitorConfig::from_json(r#"{"poll_interval_ms": 1}"#).unwrap();
        assert_eq!(fast.poll_interval_ms, MIN_POLL_INTERVAL_MS);
        let slow = MonitorConfig::from_json(r#"{"poll_interval_ms": 5000}"#).unwrap();
        assert_eq!(slow.poll_interval_ms, MAX_POLL_INTERVAL_MS);
    }

    #[test]
    fn rejects_inverted_axis_and_unknown_fields() {
        assert!(MonitorConfig::from_json(r#"{"y_min": 10, "y_max": 5}"#).is_err());
        assert!(MonitorConfig::from_json(r#"{"time_divisions": 0}"#).is_err());
        assert!(MonitorConfig::from_json(r#"{"pol_interval": 10}"#).is_err());
    }

    #[test]
    fn flags_override_defaults() {
        let config = MonitorConfig::from_args(args(&["--simulate", "--url", "http://localhost:8080"])).unwrap();
        assert_eq!(config.source, SourceKind::Sim);
        assert_eq!(config.base_url, "http://localhost:8080");
        let csv = MonitorConfig::from_args(args(&["--source", "CSV"])).unwrap();
        assert_eq!(csv.source, SourceKind::Csv);
        assert!(MonitorConfig::from_args(args(&["--source"])).is_err());
        assert!(MonitorConfig::from_args(args(&["--bogus"])).is_err());
    }

    #[test]
    fn axis_follows_source_unless_set() {
        assert_eq!(MonitorConfig::default().axis(), DEVICE_AXIS);
        let sim = MonitorConfig::from_args(args(&["--simulate"])).unwrap();
        assert_eq!(sim.axis(), SIMULATOR_AXIS);
        let pinned = MonitorConfig::from_json(r#"{"source": "sim", "y_max": 10}"#).unwrap();
        assert_eq!(pinned.axis(), (-5.0, 10.0));
        assert!(MonitorConfig::from_json(r#"{"y_max": -1}"#).is_err());
    }

    #[test]
    fn simulated_trace_fills_the_plot() {
        use crate::drivers::{SamplePipeline, SampleSource, SimulatedSource};
        use crate::render::{ChartLayout, Series};

        let config = MonitorConfig::from_args(args(&["--simulate"])).unwrap();
        let step = config.poll_interval_ms;
        let mut tick = 0;
        let mut source = SimulatedSource::seeded(3, move || {
            tick += step;
            tick
        });
        let mut pipeline = SamplePipeline::new(config.window_ms, config.poll_interval_ms).unwrap();
        pipeline.begin(1_700_000_000_000, std::time::Instant::now());
        for _ in 0..300 {
            pipeline.ingest(&source.fetch().unwrap());
        }
        let layout = ChartLayout::compute(&pipeline.buffer().snapshot(), &config.chart(), 1000.0, 440.0);
        let ys: Vec<f32> = layout.trace(Series::Filtered).unwrap().points.iter().map(|p| p[1]).collect();
        let top = ys.iter().copied().fold(f32::INFINITY, f32::min);
        let bottom = ys.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        // both half-waves visible and nothing pinned to an edge
        assert!(bottom - top > layout.plot_height * 0.4, "span {top}..{bottom}");
        assert!(top > 0.0 && bottom < layout.plot_height);
    }

    #[test]
    fn config_file_is_read() {
        let path = std::env::temp_dir().join(format!("emgscope-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"y_max": 5.0, "y_min": -5.0}"#).unwrap();
        let config = MonitorConfig::from_args(args(&["--config", path.to_str().unwrap()])).unwrap();
        assert_eq!(config.chart().y_max, 5.0);
        assert_eq!(config.chart().y_min, -5.0);
        std::fs::remove_file(&path).ok();
    }
}
