use std::{fs, path::PathBuf, time::Duration};

mod backend_bridge;
mod canvas;
mod controller;
mod ui;

use anyhow::Context;
use clap::Parser;
use crossbeam_channel::bounded;
use eframe::egui;
use manual_core::config::{load_settings, load_settings_from, resolve_media_set};
use shared::domain::MediaSet;

use crate::backend_bridge::commands::BridgeCommand;
use crate::controller::events::UiEvent;
use crate::ui::{app::PersistedPrefs, app::SETTINGS_STORAGE_KEY, ManualModeApp, StartupConfig};

const APP_NAME: &str = "RoboPaint Manual Painting";

#[derive(Debug, Parser)]
#[command(name = "robopaint-manual", about = "Manual painting mode for RoboPaint")]
struct Args {
    /// Settings file; defaults to ./robopaint.toml, then the user config dir.
    #[arg(long)]
    config: Option<PathBuf>,
    /// SVG design to load once the canvas is ready.
    #[arg(long)]
    design: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let settings = match &args.config {
        Some(path) => load_settings_from(path),
        None => load_settings(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(settings.log_filter.as_str())
        .init();

    let media_set = resolve_media_set(&settings).unwrap_or_else(|err| {
        tracing::warn!("falling back to the default media set: {err:#}");
        MediaSet::default()
    });
    let design = args
        .design
        .as_ref()
        .map(|path| {
            fs::read_to_string(path)
                .with_context(|| format!("failed to read design {}", path.display()))
        })
        .transpose()?;

    let (cmd_tx, cmd_rx) = bounded::<BridgeCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(2048);
    let worker = backend_bridge::runtime::launch(
        cmd_rx,
        ui_tx,
        Duration::from_millis(settings.sim_tick_ms.max(1)),
    );

    let window = egui::vec2(
        settings.canvas_width * settings.canvas_scale
            + settings.wrapper_margin.left
            + settings.wrapper_margin.right,
        settings.canvas_height * settings.canvas_scale
            + settings.wrapper_margin.top
            + settings.wrapper_margin.bottom
            + 130.0,
    );
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(APP_NAME)
            .with_inner_size(window)
            .with_min_inner_size([800.0, 600.0]),
        ..Default::default()
    };

    eframe::run_native(
        APP_NAME,
        options,
        Box::new(move |cc| {
            let prefs = cc.storage.and_then(|storage| {
                storage
                    .get_string(SETTINGS_STORAGE_KEY)
                    .and_then(|text| serde_json::from_str::<PersistedPrefs>(&text).ok())
            });
            Ok(Box::new(ManualModeApp::new(
                cmd_tx,
                ui_rx,
                StartupConfig {
                    settings,
                    media_set,
                    design,
                    prefs,
                },
            )))
        }),
    )
    .map_err(|err| anyhow::anyhow!("window failed: {err}"))?;

    if worker.join().is_err() {
        tracing::error!("buffer worker panicked");
    }
    Ok(())
}
