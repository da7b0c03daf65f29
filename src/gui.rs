// src/gui.rs
use eframe::egui;
use egui::Color32;
use egui_plot::{Legend, Line, Plot, PlotPoints};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use chrono::{Local, TimeZone};

use crate::config::MonitorConfig;
use crate::drivers::{format_elapsed, Quality};
use crate::engine;
use crate::export::DirectoryDownloader;
use crate::render::IDLE_LABEL;
use crate::session::{Monitor, SavePrompt, SessionState, StopOutcome};
use crate::toast::{Toast, ToastLevel};
use crate::types::*;
use crate::visualizer;

const EVENT_LOG_LINES: usize = 8;
// Bound on batches handled per frame so a backlog cannot stall the UI.
const MAX_MESSAGES_PER_FRAME: usize = 256;

pub struct MonitorApp {
    monitor: Monitor,
    downloader: DirectoryDownloader,
    source_online: Option<bool>,
    // history entry shown in the preview plot
    preview: Option<usize>,

    // event log panel
    log_messages: Vec<String>,

    // poller channels
    rx: Receiver<EngineMessage>,
    tx_cmd: Sender<EngineCommand>,
    poller: Option<JoinHandle<()>>,
}

impl MonitorApp {
    pub fn new(config: Arc<MonitorConfig>) -> anyhow::Result<Self> {
        let (tx, rx) = channel();
        let (tx_cmd, rx_cmd) = channel();

        // start the background poller
        let source = engine::source_for(&config)?;
        let poller = engine::spawn_thread(source, config.poll_interval(), tx, rx_cmd)?;

        Ok(Self {
            downloader: DirectoryDownloader::new(config.export_dir.clone()),
            monitor: Monitor::new(config)?,
            source_online: None,
            preview: None,
            log_messages: vec!["EMG Scope ready.".to_owned()],
            rx,
            tx_cmd,
            poller: Some(poller),
        })
    }

    fn log(&mut self, msg: &str) {
        self.log_messages.push(format!("> {}", msg));
        if self.log_messages.len() > EVENT_LOG_LINES {
            self.log_messages.remove(0);
        }
    }

    fn drain_engine(&mut self) {
        for _ in 0..MAX_MESSAGES_PER_FRAME {
            let Ok(msg) = self.rx.try_recv() else { break };
            match msg {
                EngineMessage::Log(s) => self.log(&s),
                EngineMessage::Samples { session, readings } => {
                    self.monitor.ingest(session, &readings);
                }
                EngineMessage::SourceStatus(online) => {
                    self.source_online = Some(online);
                    self.log(if online { "Source reachable." } else { "Source unreachable." });
                }
            }
        }
    }

    fn start(&mut self) {
        if let Ok(Some(session)) = self.monitor.start(Instant::now(), Local::now()) {
            self.preview = None;
            self.tx_cmd.send(EngineCommand::Start { session }).ok();
            self.log(&format!("Session {} started.", session.0));
        }
    }

    fn stop(&mut self) {
        // stop polling first so nothing new is queued for this session
        if self.monitor.is_recording() {
            self.tx_cmd.send(EngineCommand::Stop).ok();
        }
        match self.monitor.stop(Instant::now(), Local::now()) {
            StopOutcome::Ignored => {}
            StopOutcome::NothingCaptured => self.log("Stopped, nothing captured."),
            StopOutcome::PromptSave => {
                let count = self.monitor.pipeline().log().len();
                self.log(&format!("Stopped with {count} samples."));
            }
        }
    }

    fn controls(&mut self, ui: &mut egui::Ui) {
        let recording = self.monitor.is_recording();
        ui.horizontal(|ui| {
            let start = egui::Button::new(egui::RichText::new("▶ START").color(Color32::WHITE))
                .fill(Color32::from_rgb(30, 120, 60));
            if ui.add_enabled(!recording, start).clicked() {
                self.start();
            }
            let stop = egui::Button::new(egui::RichText::new("⏹ STOP").color(Color32::WHITE))
                .fill(Color32::from_rgb(160, 40, 40));
            if ui.add_enabled(recording, stop).clicked() {
                self.stop();
            }
            if ui.button("🗑 CLEAR").clicked() && self.monitor.clear().is_ok() {
                self.preview = None;
                self.log("Data cleared.");
            }
        });
        ui.horizontal(|ui| {
            if ui.button("Quick export").clicked() {
                if let Ok(name) = self.monitor.quick_export(Local::now(), &mut self.downloader) {
                    self.log(&format!("Exported {name}"));
                }
            }
            if ui.button("Save chart PNG").clicked() {
                if let Ok(name) = self.monitor.export_chart(Local::now(), &mut self.downloader) {
                    self.log(&format!("Saved {name}"));
                }
            }
        });
        ui.label(
            egui::RichText::new(format!("Files go to {}", self.downloader.dir().display()))
                .small()
                .color(Color32::GRAY),
        );
    }

    fn statistics(&self, ui: &mut egui::Ui) {
        let stats = self.monitor.pipeline().stats();
        let elapsed = if stats.sample_count() == 0 && !self.monitor.is_recording() {
            IDLE_LABEL.to_owned()
        } else {
            format_elapsed(stats.elapsed(Instant::now()))
        };
        egui::Grid::new("stats").num_columns(2).show(ui, |ui| {
            ui.label("Amplitude");
            ui.monospace(
                stats
                    .current_amplitude()
                    .map_or_else(|| "-".to_owned(), |a| format!("{a:.2}")),
            );
            ui.end_row();
            ui.label("Avg frequency");
            ui.monospace(
                stats
                    .avg_frequency_hz()
                    .map_or_else(|| "-".to_owned(), |f| format!("{f:.2} Hz")),
            );
            ui.end_row();
            ui.label("Samples");
            ui.monospace(stats.sample_count().to_string());
            ui.end_row();
            ui.label("Elapsed");
            ui.monospace(elapsed);
            ui.end_row();
            ui.label("Signal quality");
            match stats.current_quality() {
                Some(q) => ui.label(egui::RichText::new(q.as_str()).color(quality_color(q)).strong()),
                None => ui.monospace("-"),
            };
            ui.end_row();
        });
    }

    fn reading_table(&self, ui: &mut egui::Ui) {
        let rows = self.monitor.config().log_rows;
        egui::Grid::new("readings").num_columns(5).striped(true).show(ui, |ui| {
            for title in ["Time", "Raw", "Filtered", "Hz", "Quality"] {
                ui.strong(title);
            }
            ui.end_row();
            for s in self.monitor.pipeline().buffer().recent(rows) {
                let time = Local
                    .timestamp_millis_opt(s.epoch_ms)
                    .single()
                    .map_or_else(String::new, |t| t.format("%H:%M:%S%.3f").to_string());
                ui.monospace(time);
                ui.monospace(format!("{:.3}", s.raw));
                ui.monospace(format!("{:.3}", s.filtered));
                ui.monospace(s.frequency_hz.map_or_else(|| "-".to_owned(), |f| format!("{f:.1}")));
                ui.label(egui::RichText::new(s.quality.as_str()).color(quality_color(s.quality)));
                ui.end_row();
            }
        });
    }

    fn history(&mut self, ui: &mut egui::Ui) {
        if self.monitor.history().is_empty() {
            ui.label(egui::RichText::new("No saved files yet.").color(Color32::GRAY));
            return;
        }
        let mut download = None;
        let entries: Vec<(String, String)> = self
            .monitor
            .history()
            .iter()
            .map(|f| (f.name.clone(), f.created_at.format("%d/%m %H:%M:%S").to_string()))
            .collect();
        egui::ScrollArea::vertical().id_source("history").max_height(140.0).show(ui, |ui| {
            for (index, (name, created)) in entries.iter().enumerate() {
                ui.horizontal(|ui| {
                    if ui.small_button("⬇").on_hover_text("Download again").clicked() {
                        download = Some(index);
                    }
                    let selected = self.preview == Some(index);
                    if ui.selectable_label(selected, name).on_hover_text(created).clicked() {
                        self.preview = if selected { None } else { Some(index) };
                    }
                });
            }
        });
        if let Some(index) = download {
            if self.monitor.download_saved(index, &mut self.downloader).is_ok() {
                self.log(&format!("Downloaded {}", entries[index].0));
            }
        }
    }

    fn preview_plot(&self, ui: &mut egui::Ui, index: usize) {
        let Some(file) = self.monitor.history().get(index) else { return };
        ui.label(egui::RichText::new(format!("Preview: {}", file.name)).strong());
        let first = file.snapshot.first().map_or(0, |s| s.time_ms);
        let points = |pick: fn(&Sample) -> f64| -> PlotPoints {
            file.snapshot
                .iter()
                .map(|s| [(s.time_ms.saturating_sub(first)) as f64 / 1000.0, pick(s)])
                .collect()
        };
        Plot::new("preview_plot")
            .height(180.0)
            .legend(Legend::default())
            .auto_bounds_x()
            .auto_bounds_y()
            .show(ui, |plot_ui| {
                plot_ui.line(Line::new(points(|s| s.raw)).name("Raw").color(visualizer::RAW_COLOR));
                plot_ui.line(
                    Line::new(points(|s| s.filtered))
                        .name("Filtered")
                        .color(visualizer::FILTERED_COLOR)
                        .width(2.0),
                );
            });
    }

    fn save_prompt(&mut self, ctx: &egui::Context) {
        let SessionState::AwaitingSaveName(prompt) = self.monitor.state() else { return };
        egui::Window::new("Save recording")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| match prompt {
                SavePrompt::Confirm => {
                    let count = self.monitor.pipeline().log().len();
                    ui.label(format!("Save this recording ({count} samples)?"));
                    ui.horizontal(|ui| {
                        if ui.button("Yes").clicked() {
                            self.monitor.accept_save();
                        }
                        if ui.button("No").clicked() {
                            self.monitor.discard_save();
                            self.log("Recording not saved.");
                        }
                    });
                }
                SavePrompt::EnterName => {
                    ui.label("File name");
                    let edit = ui.text_edit_singleline(&mut self.monitor.pending_name);
                    let submitted = edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                    ui.horizontal(|ui| {
                        if ui.button("Save").clicked() || submitted {
                            let name = self.monitor.pending_name.clone();
                            if let Ok(file) = self.monitor.confirm_save(&name, Local::now(), &mut self.downloader) {
                                self.log(&format!("Saved {file}"));
                            }
                        }
                        if ui.button("Cancel").clicked() {
                            self.monitor.discard_save();
                        }
                    });
                }
            });
    }

    fn toasts(&mut self, ctx: &egui::Context) -> bool {
        let toasts: Vec<Toast> = self.monitor.toasts().active(Instant::now()).cloned().collect();
        if toasts.is_empty() {
            return false;
        }
        egui::Area::new("toasts")
            .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-16.0, -16.0))
            .interactable(false)
            .show(ctx, |ui| {
                for toast in &toasts {
                    let fill = match toast.level {
                        ToastLevel::Info => Color32::from_rgb(30, 60, 90),
                        ToastLevel::Warning => Color32::from_rgb(120, 70, 20),
                    };
                    egui::Frame::popup(ui.style()).fill(fill).show(ui, |ui| {
                        ui.label(egui::RichText::new(&toast.text).color(Color32::WHITE));
                    });
                }
            });
        true
    }
}

fn quality_color(q: Quality) -> Color32 {
    match q {
        Quality::Excellent => Color32::from_rgb(80, 220, 100),
        Quality::Good => Color32::from_rgb(160, 220, 80),
        Quality::Fair => Color32::from_rgb(240, 180, 40),
        Quality::Low => Color32::from_rgb(230, 80, 70),
    }
}

impl eframe::App for MonitorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // 1. engine messages
        self.drain_engine();

        // 2. layout
        let mut visuals = egui::Visuals::dark();
        visuals.widgets.noninteractive.bg_fill = Color32::from_rgb(10, 10, 15);
        ctx.set_visuals(visuals);

        egui::SidePanel::left("L").min_width(320.0).show(ctx, |ui| {
            ui.add_space(10.0);
            ui.heading("EMG Scope");
            let (status, color) = match (self.monitor.is_recording(), self.source_online) {
                (true, Some(false)) => ("RECORDING · source unreachable", Color32::YELLOW),
                (true, _) => ("RECORDING", Color32::RED),
                (false, _) => ("IDLE", Color32::GRAY),
            };
            ui.label(egui::RichText::new(status).color(color).small());
            ui.separator();
            self.controls(ui);
            ui.separator();
            self.statistics(ui);
            ui.separator();
            ui.label("SAVED FILES");
            self.history(ui);
            ui.add_space(10.0);
            ui.separator();
            egui::ScrollArea::vertical().id_source("events").max_height(120.0).show(ui, |ui| {
                for m in &self.log_messages {
                    ui.monospace(m);
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            visualizer::draw_legend(ui);
            let chart = self.monitor.config().chart();
            let samples = self.monitor.pipeline().buffer().snapshot();
            let preview = self.preview;
            let table_height = 28.0 + 20.0 * self.monitor.config().log_rows as f32;
            let reserved = table_height + if preview.is_some() { 220.0 } else { 0.0 };
            ui.allocate_ui(egui::vec2(ui.available_width(), (ui.available_height() - reserved).max(200.0)), |ui| {
                visualizer::draw_signal_chart(ui, &samples, &chart, 200.0);
            });
            ui.separator();
            self.reading_table(ui);
            if let Some(index) = preview {
                ui.separator();
                self.preview_plot(ui, index);
            }
        });

        self.save_prompt(ctx);
        let toasts_visible = self.toasts(ctx);

        if self.monitor.is_recording() {
            ctx.request_repaint();
        } else if toasts_visible {
            ctx.request_repaint_after(Duration::from_millis(250));
        }
    }
}

impl Drop for MonitorApp {
    fn drop(&mut self) {
        self.tx_cmd.send(EngineCommand::Shutdown).ok();
        if let Some(handle) = self.poller.take() {
            if handle.join().is_err() {
                log::warn!("poller thread panicked");
            }
        }
    }
}
