// src/session.rs
//! The monitoring session and its lifecycle:
//! `Idle -> Recording -> Idle`, with a save prompt entered when a recording
//! that captured data is stopped.
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Local, Timelike};

use crate::config::MonitorConfig;
use crate::drivers::{render_chart_png, MonitorError, PlotStyle, SamplePipeline};
use crate::export::{csv_bytes, export_file_name, Downloader};
use crate::history::{HistoryRegistry, SavedFile};
use crate::toast::{ToastLevel, ToastQueue};
use crate::types::{Reading, SessionId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SavePrompt {
    /// "Save this recording?"
    Confirm,
    /// Waiting for a file name.
    EnterName,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Recording { session: SessionId },
    AwaitingSaveName(SavePrompt),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopOutcome {
    /// Nothing was recording.
    Ignored,
    /// Stopped without data; no prompt.
    NothingCaptured,
    /// Stopped and the save prompt is open.
    PromptSave,
}

pub struct Monitor {
    config: Arc<MonitorConfig>,
    state: SessionState,
    pipeline: SamplePipeline,
    history: HistoryRegistry,
    toasts: ToastQueue,
    next_session: u64,
    /// Pre-filled file name for the save prompt.
    pub pending_name: String,
}

impl Monitor {
    pub fn new(config: Arc<MonitorConfig>) -> Result<Self, MonitorError> {
        let pipeline = SamplePipeline::new(config.window_ms, config.poll_interval_ms)?;
        let toasts = ToastQueue::new(config.toast_duration());
        Ok(Self {
            config,
            state: SessionState::Idle,
            pipeline,
            history: HistoryRegistry::default(),
            toasts,
            next_session: 1,
            pending_name: String::new(),
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, SessionState::Recording { .. })
    }

    pub fn pipeline(&self) -> &SamplePipeline {
        &self.pipeline
    }

    pub fn history(&self) -> &HistoryRegistry {
        &self.history
    }

    pub fn toasts(&mut self) -> &mut ToastQueue {
        &mut self.toasts
    }

    fn notify(&mut self, level: ToastLevel, text: impl Into<String>) {
        self.toasts.post(level, text, Instant::now());
    }

    fn reject(&mut self, err: MonitorError) -> MonitorError {
        if err.is_user_facing() {
            self.notify(ToastLevel::Warning, err.to_string());
        } else {
            log::warn!("{err}");
            self.notify(ToastLevel::Warning, format!("Error: {err}"));
        }
        err
    }

    /// Starts a new session. Returns its id, or `None` when already recording.
    pub fn start(&mut self, now: Instant, wall: DateTime<Local>) -> Result<Option<SessionId>, MonitorError> {
        match self.state {
            SessionState::Recording { .. } => return Ok(None),
            SessionState::AwaitingSaveName(_) => return Err(self.reject(MonitorError::SavePending)),
            SessionState::Idle => {}
        }
        let session = SessionId(self.next_session);
        self.next_session += 1;
        self.pipeline.begin(wall.timestamp_millis(), now);
        self.state = SessionState::Recording { session };
        self.notify(ToastLevel::Info, "Capturing EMG signal...");
        log::info!("session {} started", session.0);
        Ok(Some(session))
    }

    pub fn stop(&mut self, now: Instant, wall: DateTime<Local>) -> StopOutcome {
        let SessionState::Recording { session } = self.state else {
            return StopOutcome::Ignored;
        };
        self.pipeline.finish(now);
        log::info!("session {} stopped with {} samples", session.0, self.pipeline.log().len());
        if self.pipeline.log().is_empty() {
            self.state = SessionState::Idle;
            self.notify(ToastLevel::Info, "No data captured to save.");
            return StopOutcome::NothingCaptured;
        }
        self.pending_name = format!("Session_{}h{}", wall.hour(), wall.minute());
        self.state = SessionState::AwaitingSaveName(SavePrompt::Confirm);
        StopOutcome::PromptSave
    }

    /// Feeds a poller batch. Batches from any session other than the running one are discarded.
    pub fn ingest(&mut self, session: SessionId, readings: &[Reading]) -> usize {
        match self.state {
            SessionState::Recording { session: active } if active == session => {
                self.pipeline.ingest(readings)
            }
            _ => {
                log::debug!("discarding {} readings from stale session {}", readings.len(), session.0);
                0
            }
        }
    }

    /// Moves the save prompt from the question to the name field.
    pub fn accept_save(&mut self) {
        if self.state == SessionState::AwaitingSaveName(SavePrompt::Confirm) {
            self.state = SessionState::AwaitingSaveName(SavePrompt::EnterName);
        }
    }

    pub fn discard_save(&mut self) {
        if matches!(self.state, SessionState::AwaitingSaveName(_)) {
            self.state = SessionState::Idle;
        }
    }

    /// Saves the recording under `name`, adds it to history and delivers it.
    ///
    /// Only valid once the prompt has reached the name step. An empty name keeps
    /// the prompt open.
    pub fn confirm_save(
        &mut self,
        name: &str,
        wall: DateTime<Local>,
        downloader: &mut dyn Downloader,
    ) -> Result<String, MonitorError> {
        if self.state != SessionState::AwaitingSaveName(SavePrompt::EnterName) {
            log::debug!("save requested in state {:?}", self.state);
            return Err(MonitorError::NoPendingSave);
        }
        if name.trim().is_empty() {
            return Err(self.reject(MonitorError::EmptyName));
        }
        let file_name = export_file_name(name, &wall).map_err(|e| self.reject(e))?;
        let snapshot = self.pipeline.log().to_vec();
        let blob: Arc<[u8]> = csv_bytes(&snapshot, self.config.decimal_places)
            .map_err(|e| self.reject(e))?
            .into();
        self.history.push(SavedFile {
            name: file_name.clone(),
            created_at: wall,
            blob: Arc::clone(&blob),
            snapshot,
        });
        self.state = SessionState::Idle;
        self.deliver(&file_name, &blob, downloader)?;
        self.notify(ToastLevel::Info, format!("File saved: {file_name}"));
        Ok(file_name)
    }

    /// Writes the current recording with the default label; not added to history.
    pub fn quick_export(
        &mut self,
        wall: DateTime<Local>,
        downloader: &mut dyn Downloader,
    ) -> Result<String, MonitorError> {
        let bytes = csv_bytes(self.pipeline.log(), self.config.decimal_places)
            .map_err(|e| self.reject(e))?;
        let file_name = export_file_name(&self.config.default_label, &wall).map_err(|e| self.reject(e))?;
        self.deliver(&file_name, &bytes, downloader)?;
        self.notify(ToastLevel::Info, format!("Data exported as {file_name}"));
        Ok(file_name)
    }

    /// Renders the chart window to PNG and delivers it.
    pub fn export_chart(
        &mut self,
        wall: DateTime<Local>,
        downloader: &mut dyn Downloader,
    ) -> Result<String, MonitorError> {
        let samples = self.pipeline.buffer().snapshot();
        if samples.is_empty() {
            return Err(self.reject(MonitorError::EmptyExport));
        }
        let png = render_chart_png(&samples, &self.config.chart(), &PlotStyle::default())
            .map_err(|e| self.reject(e))?;
        let file_name = export_file_name(&self.config.default_label, &wall)
            .map_err(|e| self.reject(e))?
            .replace(".csv", ".png");
        self.deliver(&file_name, &png, downloader)?;
        self.notify(ToastLevel::Info, format!("Chart saved as {file_name}"));
        Ok(file_name)
    }

    /// Re-delivers history entry `index`; out-of-range indices are ignored.
    pub fn download_saved(&mut self, index: usize, downloader: &mut dyn Downloader) -> Result<(), MonitorError> {
        match self.history.download(index, downloader) {
            Ok(Some((name, _))) => {
                self.notify(ToastLevel::Info, format!("Download: {name}"));
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => Err(self.reject(e)),
        }
    }

    /// Empties the buffer, the recording, statistics and history. Rejected while recording.
    pub fn clear(&mut self) -> Result<(), MonitorError> {
        if self.is_recording() {
            return Err(self.reject(MonitorError::ClearWhileRecording));
        }
        self.pipeline.reset();
        self.history.clear();
        self.state = SessionState::Idle;
        self.notify(ToastLevel::Info, "Data and file history cleared.");
        Ok(())
    }

    fn deliver(&mut self, file_name: &str, bytes: &[u8], downloader: &mut dyn Downloader) -> Result<(), MonitorError> {
        downloader
            .deliver(file_name, bytes)
            .map(|_| ())
            .map_err(|e| self.reject(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::MemoryDownloader;
    use chrono::TimeZone;

    fn monitor() -> Monitor {
        let config = MonitorConfig {
            poll_interval_ms: 100,
            window_ms: 500,
            ..MonitorConfig::default()
        };
        Monitor::new(Arc::new(config)).unwrap()
    }

    fn wall() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 1, 9, 7, 0).unwrap()
    }

    fn readings(range: std::ops::Range<u64>) -> Vec<Reading> {
        range.map(|i| Reading::new(i * 100, i as f64, i as f64)).collect()
    }

    fn recording(monitor: &mut Monitor) -> SessionId {
        monitor.start(Instant::now(), wall()).unwrap().unwrap()
    }

    fn toast_text(monitor: &Monitor) -> String {
        monitor.toasts.latest().map(|t| t.text.clone()).unwrap_or_default()
    }

    #[test]
    fn start_is_idempotent_and_stop_when_idle_is_noop() {
        let mut monitor = monitor();
        assert_eq!(monitor.stop(Instant::now(), wall()), StopOutcome::Ignored);
        let id = recording(&mut monitor);
        assert_eq!(monitor.start(Instant::now(), wall()).unwrap(), None);
        assert_eq!(monitor.state(), SessionState::Recording { session: id });
    }

    #[test]
    fn stopping_without_samples_never_prompts() {
        let mut monitor = monitor();
        recording(&mut monitor);
        assert_eq!(monitor.stop(Instant::now(), wall()), StopOutcome::NothingCaptured);
        assert_eq!(monitor.state(), SessionState::Idle);
        assert_eq!(toast_text(&monitor), "No data captured to save.");
    }

    #[test]
    fn stale_batches_are_dropped() {
        let mut monitor = monitor();
        let first = recording(&mut monitor);
        assert_eq!(monitor.ingest(first, &readings(0..3)), 3);
        monitor.stop(Instant::now(), wall());
        assert_eq!(monitor.ingest(first, &readings(3..4)), 0);
        monitor.discard_save();
        let second = recording(&mut monitor);
        assert_ne!(first, second);
        assert_eq!(monitor.ingest(first, &readings(0..2)), 0);
        assert_eq!(monitor.ingest(second, &readings(0..2)), 2);
    }

    #[test]
    fn save_flow_adds_history_and_delivers() {
        let mut monitor = monitor();
        let id = recording(&mut monitor);
        monitor.ingest(id, &readings(0..8));
        assert_eq!(monitor.stop(Instant::now(), wall()), StopOutcome::PromptSave);
        assert_eq!(monitor.pending_name, "Session_9h7");
        monitor.accept_save();
        assert_eq!(monitor.state(), SessionState::AwaitingSaveName(SavePrompt::EnterName));

        let mut sink = MemoryDownloader::default();
        assert!(matches!(monitor.confirm_save("  ", wall(), &mut sink), Err(MonitorError::EmptyName)));
        assert_eq!(monitor.state(), SessionState::AwaitingSaveName(SavePrompt::EnterName));

        let name = monitor.confirm_save("arm test", wall(), &mut sink).unwrap();
        assert_eq!(name, "arm_test_2024-05-01T09-07-00.csv");
        assert_eq!(monitor.state(), SessionState::Idle);
        assert_eq!(monitor.history().len(), 1);
        // full recording, not just the chart window
        let csv = String::from_utf8(sink.delivered[0].1.clone()).unwrap();
        assert_eq!(csv.lines().count(), 9);
        assert_eq!(monitor.pipeline().buffer().len(), 5);
    }

    #[test]
    fn saved_snapshot_is_independent_of_later_samples() {
        let mut monitor = monitor();
        let id = recording(&mut monitor);
        monitor.ingest(id, &readings(0..3));
        monitor.stop(Instant::now(), wall());
        monitor.accept_save();
        let mut sink = MemoryDownloader::default();
        monitor.confirm_save("first", wall(), &mut sink).unwrap();
        let saved_blob = monitor.history().get(0).unwrap().blob.clone();

        let id = recording(&mut monitor);
        monitor.ingest(id, &readings(0..6));
        let saved = monitor.history().get(0).unwrap();
        assert_eq!(saved.snapshot.len(), 3);
        assert_eq!(saved.blob, saved_blob);
        monitor.download_saved(0, &mut sink).unwrap();
        assert_eq!(sink.delivered[1].1, saved_blob.to_vec());
    }

    #[test]
    fn save_requires_the_name_step() {
        let mut monitor = monitor();
        let mut sink = MemoryDownloader::default();
        assert!(matches!(monitor.confirm_save("idle", wall(), &mut sink), Err(MonitorError::NoPendingSave)));
        let id = recording(&mut monitor);
        monitor.ingest(id, &readings(0..2));
        monitor.stop(Instant::now(), wall());
        assert!(matches!(monitor.confirm_save("early", wall(), &mut sink), Err(MonitorError::NoPendingSave)));
        assert_eq!(monitor.state(), SessionState::AwaitingSaveName(SavePrompt::Confirm));
        assert!(sink.delivered.is_empty());
        assert!(monitor.history().is_empty());
        monitor.accept_save();
        monitor.confirm_save("late", wall(), &mut sink).unwrap();
        assert_eq!(sink.delivered.len(), 1);
    }

    #[test]
    fn clear_while_recording_is_rejected() {
        let mut monitor = monitor();
        let id = recording(&mut monitor);
        monitor.ingest(id, &readings(0..4));
        assert!(matches!(monitor.clear(), Err(MonitorError::ClearWhileRecording)));
        assert_eq!(monitor.pipeline().buffer().len(), 4);
        assert_eq!(toast_text(&monitor), "stop the recording before clearing data");
        monitor.stop(Instant::now(), wall());
        monitor.clear().unwrap();
        assert!(monitor.pipeline().buffer().is_empty());
        assert!(monitor.pipeline().log().is_empty());
        assert_eq!(monitor.state(), SessionState::Idle);
    }

    #[test]
    fn empty_quick_export_writes_nothing() {
        let mut monitor = monitor();
        let mut sink = MemoryDownloader::default();
        assert!(matches!(monitor.quick_export(wall(), &mut sink), Err(MonitorError::EmptyExport)));
        assert!(sink.delivered.is_empty());
        assert_eq!(toast_text(&monitor), "no data to export; start a recording first");
        assert!(matches!(monitor.export_chart(wall(), &mut sink), Err(MonitorError::EmptyExport)));
    }

    #[test]
    fn start_with_pending_save_is_rejected() {
        let mut monitor = monitor();
        let id = recording(&mut monitor);
        monitor.ingest(id, &readings(0..2));
        monitor.stop(Instant::now(), wall());
        assert!(matches!(monitor.start(Instant::now(), wall()), Err(MonitorError::SavePending)));
        assert_eq!(monitor.pipeline().log().len(), 2);
    }

    #[test]
    fn quick_export_uses_default_label() {
        let mut monitor = monitor();
        let id = recording(&mut monitor);
        monitor.ingest(id, &readings(0..2));
        let mut sink = MemoryDownloader::default();
        let name = monitor.quick_export(wall(), &mut sink).unwrap();
        assert_eq!(name, "emg_session_2024-05-01T09-07-00.csv");
        assert!(monitor.history().is_empty());
    }
}
