// src/main.rs
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
mod config;
mod drivers;
mod engine;
mod export;
mod gui;
mod history;
mod render;
mod session;
mod toast;
mod types;
mod visualizer;
use std::sync::Arc;
use anyhow::Context;
use eframe::egui;
use crate::config::MonitorConfig;
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = Arc::new(MonitorConfig::from_args(std::env::args().skip(1))?);
    log::info!(
        "source {:?} at {}, polling every {} ms",
        config.source,
        config.base_url,
        config.poll_interval_ms
    );
    let app = gui::MonitorApp::new(Arc::clone(&config)).context("starting monitor")?;
    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([1280.0, 800.0])
        .with_min_inner_size([960.0, 600.0])
        .with_title("EMG Scope");
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    eframe::run_native("EMG Scope", options, Box::new(|_cc| Box::new(app)))
        .map_err(|e| anyhow::anyhow!("window error: {e}"))
}
