use super::*;

use std::{
    collections::HashMap,
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn temp_dir(label: &str) -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = env::temp_dir().join(format!("robopaint_{label}_{suffix}"));
    fs::create_dir_all(&dir).expect("temp dir");
    dir
}

#[test]
fn missing_file_yields_defaults() {
    let dir = temp_dir("missing");
    let settings = load_settings_from(&dir.join("nope.toml"));
    assert_eq!(settings.canvas_height, Settings::default().canvas_height);
    assert_eq!(settings.wrapper_margin, WrapperMargin::default());
    fs::remove_dir_all(dir).expect("cleanup");
}

#[test]
fn file_values_override_defaults() {
    let dir = temp_dir("file");
    let path = dir.join(SETTINGS_FILE);
    fs::write(
        &path,
        r#"
pen_mode = 2
canvas_scale = 0.5
sim_tick_ms = 5

[wrapper_margin]
top = 10.0
left = 12.0
right = 200.0
bottom = 14.0
"#,
    )
    .expect("write settings");

    let mut settings = Settings::default();
    let raw = fs::read_to_string(&path).expect("read back");
    apply_file(&mut settings, toml::from_str(&raw).expect("parse"));

    assert_eq!(settings.pen_mode, PenMode::PaintOnly);
    assert_eq!(settings.canvas_scale, 0.5);
    assert_eq!(settings.sim_tick_ms, 5);
    assert_eq!(settings.wrapper_margin.right, 200.0);
    assert_eq!(settings.canvas_width, Settings::default().canvas_width);

    fs::remove_dir_all(dir).expect("cleanup");
}

#[test]
fn invalid_pen_mode_in_file_is_ignored() {
    let mut settings = Settings::default();
    apply_file(&mut settings, toml::from_str("pen_mode = 7").expect("parse"));
    assert_eq!(settings.pen_mode, PenMode::Full);
}

#[test]
fn app_prefixed_env_beats_robopaint_prefix() {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("ROBOPAINT_PEN_MODE", "1"),
        ("APP__PEN_MODE", "3"),
        ("ROBOPAINT_CANVAS_HEIGHT", "600"),
        ("ROBOPAINT_LOG", "debug"),
        ("ROBOPAINT_SIM_TICK_MS", "not-a-number"),
    ]);

    let mut settings = Settings::default();
    apply_env(&mut settings, |name| vars.get(name).map(|v| v.to_string()));

    assert_eq!(settings.pen_mode, PenMode::PenOnly);
    assert_eq!(settings.canvas_height, 600.0);
    assert_eq!(settings.log_filter, "debug");
    assert_eq!(settings.sim_tick_ms, Settings::default().sim_tick_ms);
}

#[test]
fn media_set_loads_from_json_and_reports_context() {
    let dir = temp_dir("media");
    let path = dir.join("set.json");
    fs::write(
        &path,
        r##"{"name":"Watercolor","baseClass":"watercolor","colors":[{"id":"color0","name":"Ink","color":"#101010"}]}"##,
    )
    .expect("write media set");

    let media_set = load_media_set(&path).expect("media set");
    assert_eq!(media_set.base_class, "watercolor");
    assert_eq!(media_set.colors.len(), 1);
    assert_eq!(media_set.waters.len(), 3);

    let err = load_media_set(&dir.join("absent.json")).expect_err("missing file");
    assert!(err.to_string().contains("failed to read media set"));

    let settings = Settings::default();
    assert_eq!(resolve_media_set(&settings).expect("default"), MediaSet::default());

    fs::remove_dir_all(dir).expect("cleanup");
}
