// src/render.rs
//! Chart geometry, independent of any drawing backend.
//!
//! Coordinates are pixels with the origin at the top-left of the canvas. The
//! bottom `LABEL_BAND` pixels hold the time labels and the axis title.
use chrono::{Local, TimeZone, Timelike};

use crate::types::Sample;

pub const LABEL_BAND: f32 = 40.0;
pub const IDLE_LABEL: &str = "--:--";
pub const WAITING_MESSAGE: &str = "Waiting for data stream...";
pub const TIME_AXIS_TITLE: &str = "Time (s:cs)";

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChartConfig {
    pub y_min: f64,
    pub y_max: f64,
    pub amplitude_divisions: u32,
    pub time_divisions: u32,
    pub window_ms: u64,
}

impl Default for ChartConfig {
    fn default() -> Self {
        // 12-bit ADC over a 3 s window
        Self {
            y_min: 0.0,
            y_max: 4200.0,
            amplitude_divisions: 5,
            time_divisions: 5,
            window_ms: 3000,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Series {
    Raw,
    Filtered,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GridLine {
    /// y for horizontal lines, x for vertical ones.
    pub position: f32,
    pub label: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Polyline {
    pub series: Series,
    pub points: Vec<[f32; 2]>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChartLayout {
    pub width: f32,
    pub height: f32,
    pub plot_height: f32,
    pub horizontal: Vec<GridLine>,
    pub vertical: Vec<GridLine>,
    pub traces: Vec<Polyline>,
    pub placeholder: Option<&'static str>,
}

impl ChartLayout {
    /// Lays out one frame for `samples` (oldest first) on a `width` x `height` canvas.
    pub fn compute(samples: &[Sample], config: &ChartConfig, width: f32, height: f32) -> Self {
        let width = width.max(1.0);
        let height = height.max(LABEL_BAND + 1.0);
        let plot_height = height - LABEL_BAND;
        let horizontal = amplitude_grid(config, plot_height);
        let vertical = time_grid(samples.last(), config, width);

        let (traces, placeholder) = if samples.len() < 2 {
            (Vec::new(), Some(WAITING_MESSAGE))
        } else {
            let traces = [Series::Raw, Series::Filtered]
                .into_iter()
                .map(|series| Polyline {
                    series,
                    points: trace_points(samples, series, config, width, plot_height),
                })
                .collect();
            (traces, None)
        };

        Self {
            width,
            height,
            plot_height,
            horizontal,
            vertical,
            traces,
            placeholder,
        }
    }

    pub fn trace(&self, series: Series) -> Option<&Polyline> {
        self.traces.iter().find(|t| t.series == series)
    }
}

/// Maps `value` into plot pixels, clipping to `[y_min, y_max]`.
pub fn amplitude_to_y(value: f64, config: &ChartConfig, plot_height: f32) -> f32 {
    let span = config.y_max - config.y_min;
    let clipped = if value.is_nan() {
        config.y_min
    } else {
        value.clamp(config.y_min, config.y_max)
    };
    let fraction = if span > 0.0 { (clipped - config.y_min) / span } else { 0.0 };
    plot_height - (fraction as f32) * plot_height
}

fn amplitude_grid(config: &ChartConfig, plot_height: f32) -> Vec<GridLine> {
    let divisions = config.amplitude_divisions.max(1);
    let step = (config.y_max - config.y_min) / divisions as f64;
    (0..=divisions)
        .map(|i| GridLine {
            position: plot_height / divisions as f32 * i as f32,
            // the baseline carries no label
            label: (i < divisions).then(|| format!("{}", (config.y_max - step * i as f64).round())),
        })
        .collect()
}

fn time_grid(newest: Option<&Sample>, config: &ChartConfig, width: f32) -> Vec<GridLine> {
    let divisions = config.time_divisions.max(1);
    (0..=divisions)
        .map(|i| {
            let label = match newest {
                Some(sample) => {
                    let offset = config.window_ms as f64 * (1.0 - i as f64 / divisions as f64);
                    format_grid_time(sample.epoch_ms.saturating_sub(offset.round() as i64))
                }
                None => IDLE_LABEL.to_owned(),
            };
            GridLine {
                position: width / divisions as f32 * i as f32,
                label: Some(label),
            }
        })
        .collect()
}

/// `SS:cc` of an epoch timestamp in local time.
pub fn format_grid_time(epoch_ms: i64) -> String {
    match Local.timestamp_millis_opt(epoch_ms).single() {
        Some(dt) => format!("{:02}:{:02}", dt.second(), dt.timestamp_subsec_millis() / 10),
        None => IDLE_LABEL.to_owned(),
    }
}

fn trace_points(
    samples: &[Sample],
    series: Series,
    config: &ChartConfig,
    width: f32,
    plot_height: f32,
) -> Vec<[f32; 2]> {
    let Some(newest) = samples.last() else {
        return Vec::new();
    };
    let window = config.window_ms.max(1) as f32;
    samples
        .iter()
        .filter(|s| newest.time_ms.saturating_sub(s.time_ms) <= config.window_ms)
        .map(|s| {
            let age = newest.time_ms.saturating_sub(s.time_ms) as f32;
            let x = width * (1.0 - age / window);
            let value = match series {
                Series::Raw => s.raw,
                Series::Filtered => s.filtered,
            };
            [x, amplitude_to_y(value, config, plot_height)]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::stats::Quality;

    fn sample(time_ms: u64, raw: f64, filtered: f64) -> Sample {
        Sample {
            time_ms,
            epoch_ms: 1_700_000_000_000 + time_ms as i64,
            raw,
            filtered,
            frequency_hz: None,
            quality: Quality::classify(filtered),
        }
    }

    fn config() -> ChartConfig {
        ChartConfig {
            y_min: 0.0,
            y_max: 100.0,
            amplitude_divisions: 4,
            time_divisions: 5,
            window_ms: 1000,
        }
    }

    #[test]
    fn idle_frame_degrades_to_placeholders() {
        let layout = ChartLayout::compute(&[], &config(), 500.0, 240.0);
        assert_eq!(layout.placeholder, Some(WAITING_MESSAGE));
        assert!(layout.traces.is_empty());
        assert!(layout.vertical.iter().all(|g| g.label.as_deref() == Some(IDLE_LABEL)));
        assert_eq!(layout.vertical.len(), 6);
    }

    #[test]
    fn single_sample_still_shows_placeholder() {
        let layout = ChartLayout::compute(&[sample(0, 1.0, 1.0)], &config(), 500.0, 240.0);
        assert_eq!(layout.placeholder, Some(WAITING_MESSAGE));
        assert!(layout.vertical.iter().all(|g| g.label.as_deref() != Some(IDLE_LABEL)));
    }

    #[test]
    fn amplitude_grid_labels_skip_baseline() {
        let layout = ChartLayout::compute(&[], &config(), 500.0, 240.0);
        let labels: Vec<Option<&str>> = layout.horizontal.iter().map(|g| g.label.as_deref()).collect();
        assert_eq!(labels, vec![Some("100"), Some("75"), Some("50"), Some("25"), None]);
        assert_eq!(layout.horizontal[4].position, layout.plot_height);
        assert_eq!(layout.plot_height, 200.0);
    }

    #[test]
    fn values_above_max_are_clipped_not_rescaled() {
        let samples = [sample(0, 50.0, 250.0), sample(500, -10.0, 100.0), sample(1000, 0.0, 25.0)];
        let layout = ChartLayout::compute(&samples, &config(), 500.0, 240.0);
        let filtered = &layout.trace(Series::Filtered).unwrap().points;
        assert_eq!(filtered[0], [0.0, 0.0]);
        assert_eq!(filtered[1], [250.0, 0.0]);
        assert_eq!(filtered[2], [500.0, 150.0]);
        let raw = &layout.trace(Series::Raw).unwrap().points;
        assert_eq!(raw[0][1], 100.0);
        // below the floor stays out of the label band
        assert_eq!(raw[1][1], 200.0);
        // axis labels unchanged by the out-of-range value
        assert_eq!(layout.horizontal[0].label.as_deref(), Some("100"));
    }

    #[test]
    fn window_is_anchored_at_newest_sample() {
        let samples = [sample(0, 1.0, 1.0), sample(1500, 1.0, 1.0), sample(2000, 1.0, 1.0)];
        let layout = ChartLayout::compute(&samples, &config(), 400.0, 140.0);
        let xs: Vec<f32> = layout.trace(Series::Raw).unwrap().points.iter().map(|p| p[0]).collect();
        assert_eq!(xs, vec![200.0, 400.0]);
    }

    #[test]
    fn extreme_epoch_does_not_overflow_grid() {
        let mut oldest = sample(0, 1.0, 1.0);
        oldest.epoch_ms = i64::MIN + 5;
        let layout = ChartLayout::compute(&[oldest], &config(), 500.0, 240.0);
        assert_eq!(layout.vertical.len(), 6);
        assert!(layout.vertical.iter().all(|g| g.label.is_some()));
    }

    #[test]
    fn grid_time_has_two_fields() {
        let label = format_grid_time(1_700_000_000_000 + 12_345);
        assert_eq!(label.len(), 5);
        assert!(label.ends_with(":34"));
    }
}
