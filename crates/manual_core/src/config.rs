use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;
use shared::domain::{MediaSet, PenMode};
use tracing::warn;

pub const SETTINGS_FILE: &str = "robopaint.toml";

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct WrapperMargin {
    pub top: f32,
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Default for WrapperMargin {
    fn default() -> Self {
        Self {
            top: 30.0,
            left: 30.0,
            right: 265.0,
            bottom: 40.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub pen_mode: PenMode,
    pub canvas_width: f32,
    pub canvas_height: f32,
    pub canvas_scale: f32,
    pub wrapper_margin: WrapperMargin,
    pub media_set_path: Option<PathBuf>,
    pub sim_tick_ms: u64,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pen_mode: PenMode::Full,
            canvas_width: 1152.0,
            canvas_height: 768.0,
            canvas_scale: 1.0,
            wrapper_margin: WrapperMargin::default(),
            media_set_path: None,
            sim_tick_ms: 20,
            log_filter: "info".into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSettings {
    pen_mode: Option<u8>,
    canvas_width: Option<f32>,
    canvas_height: Option<f32>,
    canvas_scale: Option<f32>,
    wrapper_margin: Option<WrapperMargin>,
    media_set_path: Option<PathBuf>,
    sim_tick_ms: Option<u64>,
    log_filter: Option<String>,
}

/// `robopaint.toml` in the working directory, falling back to the user's
/// config directory.
pub fn default_settings_path() -> PathBuf {
    let local = PathBuf::from(SETTINGS_FILE);
    if local.exists() {
        return local;
    }
    dirs::config_dir()
        .map(|dir| dir.join("robopaint").join(SETTINGS_FILE))
        .unwrap_or(local)
}

pub fn load_settings() -> Settings {
    load_settings_from(&default_settings_path())
}

pub fn load_settings_from(path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => apply_file(&mut settings, file_cfg),
            Err(err) => warn!(path = %path.display(), %err, "ignoring unreadable settings file"),
        }
    }

    apply_env(&mut settings, |name| std::env::var(name).ok());
    settings
}

fn apply_file(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.pen_mode {
        match PenMode::try_from(v) {
            Ok(mode) => settings.pen_mode = mode,
            Err(err) => warn!(%err, "ignoring pen_mode from settings file"),
        }
    }
    if let Some(v) = file_cfg.canvas_width {
        settings.canvas_width = v;
    }
    if let Some(v) = file_cfg.canvas_height {
        settings.canvas_height = v;
    }
    if let Some(v) = file_cfg.canvas_scale {
        settings.canvas_scale = v;
    }
    if let Some(v) = file_cfg.wrapper_margin {
        settings.wrapper_margin = v;
    }
    if let Some(v) = file_cfg.media_set_path {
        settings.media_set_path = Some(v);
    }
    if let Some(v) = file_cfg.sim_tick_ms {
        settings.sim_tick_ms = v;
    }
    if let Some(v) = file_cfg.log_filter {
        settings.log_filter = v;
    }
}

/// Environment wins over the file. Each key is read as `ROBOPAINT_<KEY>`
/// and then `APP__<KEY>`, the later one taking precedence.
fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    let read = |key: &str| {
        lookup(&format!("APP__{key}")).or_else(|| lookup(&format!("ROBOPAINT_{key}")))
    };

    if let Some(v) = read("PEN_MODE") {
        match v.parse::<u8>().map_err(|e| e.to_string()).and_then(PenMode::try_from) {
            Ok(mode) => settings.pen_mode = mode,
            Err(err) => warn!(value = %v, %err, "ignoring PEN_MODE override"),
        }
    }
    if let Some(parsed) = read("CANVAS_WIDTH").and_then(|v| v.parse::<f32>().ok()) {
        settings.canvas_width = parsed;
    }
    if let Some(parsed) = read("CANVAS_HEIGHT").and_then(|v| v.parse::<f32>().ok()) {
        settings.canvas_height = parsed;
    }
    if let Some(parsed) = read("CANVAS_SCALE").and_then(|v| v.parse::<f32>().ok()) {
        settings.canvas_scale = parsed;
    }
    if let Some(v) = read("MEDIA_SET") {
        settings.media_set_path = Some(PathBuf::from(v));
    }
    if let Some(parsed) = read("SIM_TICK_MS").and_then(|v| v.parse::<u64>().ok()) {
        settings.sim_tick_ms = parsed;
    }
    if let Some(v) = read("LOG") {
        settings.log_filter = v;
    }
}

pub fn load_media_set(path: &Path) -> anyhow::Result<MediaSet> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read media set '{}'", path.display()))?;
    let media_set = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse media set '{}'", path.display()))?;
    Ok(media_set)
}

/// Media set named by the settings, or the built-in default when none is
/// configured.
pub fn resolve_media_set(settings: &Settings) -> anyhow::Result<MediaSet> {
    match &settings.media_set_path {
        Some(path) => load_media_set(path),
        None => Ok(MediaSet::default()),
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
