use std::{fs, path::PathBuf, time::Duration};

use chrono::{DateTime, Local};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use manual_core::{
    config::{load_media_set, Settings},
    tools::tool_panel_scale,
    CloseDecision, ControlPanel, ControlState, ManualController, ManualError, PrimaryStyle,
    RenderKind, RunState, RunTransition,
};
use serde::{Deserialize, Serialize};
use shared::{
    domain::{Coord, MediaColor, MediaSet, PenMode, ToolVariant, WASH_ENTRY},
    protocol::{DeviceEvent, HostMessage},
};
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::backend_bridge::commands::BridgeCommand;
use crate::canvas::PreviewCanvas;
use crate::controller::{
    events::{UiError, UiErrorContext, UiEvent},
    orchestration::ChannelDispatcher,
};

pub const SETTINGS_STORAGE_KEY: &str = "robopaint_manual_prefs";
const STATUS_LOG_LIMIT: usize = 200;
const HIT_TOLERANCE_PX: f32 = 4.0;
const TOOL_ROW_HEIGHT: f32 = 28.0;

const HIGHLIGHT: egui::Color32 = egui::Color32::from_rgb(0x1e, 0x90, 0xff);
const TEMP_OUTLINE: egui::Color32 = egui::Color32::from_rgb(0xff, 0xa5, 0x00);
const STROKE_MOTION: egui::Color32 = egui::Color32::from_rgb(0x30, 0x30, 0x30);
const FILL_MOTION: egui::Color32 = egui::Color32::from_rgb(0x2a, 0x7f, 0x8f);
const DRAW_POINT: egui::Color32 = egui::Color32::from_rgb(0xd0, 0x20, 0x20);

pub struct StartupConfig {
    pub settings: Settings,
    pub media_set: MediaSet,
    pub design: Option<String>,
    pub prefs: Option<PersistedPrefs>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PanelTab {
    #[default]
    Tools,
    Commands,
}

/// What the window remembers between launches, through eframe storage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedPrefs {
    pub tab: PanelTab,
    pub last_design_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Confirm {
    CancelRun,
    Exit,
}

struct StatusLine {
    at: DateTime<Local>,
    text: String,
    error: bool,
}

pub struct ManualModeApp {
    controller: ManualController<PreviewCanvas, ChannelDispatcher>,
    ui_rx: Receiver<UiEvent>,
    transitions: broadcast::Receiver<RunTransition>,
    settings: Settings,
    prefs: PersistedPrefs,
    status_log: Vec<StatusLine>,
    confirm: Option<Confirm>,
    allow_close: bool,
}

impl ManualModeApp {
    pub fn new(
        cmd_tx: Sender<BridgeCommand>,
        ui_rx: Receiver<UiEvent>,
        startup: StartupConfig,
    ) -> Self {
        let StartupConfig {
            settings,
            media_set,
            design,
            prefs,
        } = startup;

        let canvas = PreviewCanvas::new(settings.canvas_width, settings.canvas_height);
        let controller = ManualController::new(
            canvas,
            ChannelDispatcher::new(cmd_tx),
            media_set,
            settings.pen_mode,
        );
        let transitions = controller.subscribe_run();

        let mut app = Self {
            controller,
            ui_rx,
            transitions,
            settings,
            prefs: prefs.unwrap_or_default(),
            status_log: Vec::new(),
            confirm: None,
            allow_close: false,
        };
        let ready = app.controller.canvas_ready(design.as_deref());
        app.report(UiErrorContext::Startup, ready);
        app
    }

    fn push_status(&mut self, text: impl Into<String>, error: bool) {
        self.status_log.push(StatusLine {
            at: Local::now(),
            text: text.into(),
            error,
        });
        if self.status_log.len() > STATUS_LOG_LIMIT {
            let overflow = self.status_log.len() - STATUS_LOG_LIMIT;
            self.status_log.drain(..overflow);
        }
    }

    fn push_error(&mut self, err: UiError) {
        tracing::warn!(category = ?err.category(), "{err}");
        self.push_status(err.to_string(), true);
    }

    fn report(&mut self, context: UiErrorContext, result: Result<(), ManualError>) {
        let Err(err) = result else {
            return;
        };
        let err = UiError::from_manual(context, &err);
        if err.is_refusal() {
            tracing::debug!("{err}");
            self.push_status(err.message().to_string(), false);
        } else {
            self.push_error(err);
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Device(event) => {
                    if let DeviceEvent::Status(message) = &event {
                        if !message.text().is_empty() {
                            self.push_status(message.text(), false);
                        }
                    }
                    let handled = self.controller.handle_device_event(event);
                    self.report(UiErrorContext::DeviceEvent, handled);
                }
                UiEvent::Info(message) => self.push_status(message, false),
                UiEvent::Error(err) => self.push_error(err),
            }
        }
    }

    fn process_transitions(&mut self) {
        loop {
            match self.transitions.try_recv() {
                Ok(transition) => {
                    tracing::trace!(?transition, "run transition observed");
                    self.push_status(
                        format!("Run {} -> {}", transition.from, transition.to),
                        false,
                    );
                }
                Err(TryRecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "run transition log lagged");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }

    fn handle_close_request(&mut self, ctx: &egui::Context) {
        if self.allow_close || !ctx.input(|i| i.viewport().close_requested()) {
            return;
        }
        if self.controller.close_requires_confirmation() {
            ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
            self.confirm = Some(Confirm::Exit);
        }
    }

    fn open_design(&mut self) {
        let mut dialog = rfd::FileDialog::new().add_filter("SVG", &["svg"]);
        if let Some(dir) = self
            .prefs
            .last_design_dir
            .clone()
            .or_else(dirs::document_dir)
        {
            dialog = dialog.set_directory(dir);
        }
        let Some(path) = dialog.pick_file() else {
            return;
        };
        self.prefs.last_design_dir = path.parent().map(|dir| dir.to_path_buf());

        match fs::read_to_string(&path) {
            Ok(svg) => {
                let loaded = self
                    .controller
                    .handle_host_message(HostMessage::LoadDesign(svg));
                if loaded.is_ok() {
                    self.push_status(format!("Loaded {}", path.display()), false);
                }
                self.report(UiErrorContext::LoadDesign, loaded);
            }
            Err(err) => self.push_error(UiError::from_message(
                UiErrorContext::LoadDesign,
                format!("failed to read design {}: {err}", path.display()),
            )),
        }
    }

    fn reload_media_set(&mut self) {
        let Some(path) = self.settings.media_set_path.clone() else {
            return;
        };
        match load_media_set(&path) {
            Ok(media_set) => {
                self.push_status(format!("Media set: {}", media_set.name), false);
                let updated = self
                    .controller
                    .handle_host_message(HostMessage::UpdateMediaSet(media_set));
                self.report(UiErrorContext::MediaSet, updated);
            }
            Err(err) => {
                self.push_error(UiError::from_message(UiErrorContext::MediaSet, format!("{err:#}")))
            }
        }
    }

    fn show_top_bar(&mut self, ctx: &egui::Context, panel: &ControlPanel) {
        egui::TopBottomPanel::top("manual_top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui
                    .add_enabled(panel.reset.enabled, egui::Button::new("Open design..."))
                    .clicked()
                {
                    self.open_design();
                }

                let current = self.controller.state().pen_mode;
                let mut pen_mode = current;
                egui::ComboBox::from_id_salt("pen_mode_combo")
                    .selected_text(pen_mode_label(pen_mode))
                    .show_ui(ui, |ui| {
                        for mode in [
                            PenMode::Full,
                            PenMode::WaterOnly,
                            PenMode::PaintOnly,
                            PenMode::PenOnly,
                        ] {
                            ui.selectable_value(&mut pen_mode, mode, pen_mode_label(mode));
                        }
                    });
                if pen_mode != current {
                    let updated = self
                        .controller
                        .handle_host_message(HostMessage::UpdatePenMode(pen_mode));
                    self.report(UiErrorContext::Control, updated);
                }

                if self.settings.media_set_path.is_some() && ui.button("Reload media set").clicked()
                {
                    self.reload_media_set();
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(format!("Run: {}", self.controller.run_state()));
                    ui.separator();
                    ui.label(buffer_summary(&self.controller));
                });
            });
        });
    }

    fn show_status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("manual_status_log")
            .resizable(true)
            .default_height(90.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .stick_to_bottom(true)
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        for line in &self.status_log {
                            let text = format!("[{}] {}", line.at.format("%H:%M:%S"), line.text);
                            if line.error {
                                ui.colored_label(egui::Color32::LIGHT_RED, text);
                            } else {
                                ui.label(text);
                            }
                        }
                    });
            });
    }

    fn show_side_panel(&mut self, ctx: &egui::Context, panel: &ControlPanel) {
        egui::SidePanel::right("manual_side_panel")
            .resizable(false)
            .exact_width(self.settings.wrapper_margin.right)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.selectable_value(&mut self.prefs.tab, PanelTab::Tools, "Tools");
                    ui.selectable_value(&mut self.prefs.tab, PanelTab::Commands, "Commands");
                });
                ui.separator();
                egui::ScrollArea::vertical().show(ui, |ui| match self.prefs.tab {
                    PanelTab::Tools => self.show_tools(ui, panel),
                    PanelTab::Commands => self.show_commands(ui, panel),
                });
            });
    }

    fn show_tools(&mut self, ui: &mut egui::Ui, panel: &ControlPanel) {
        let media = self.controller.state().media_set.clone();
        let rows = media.colors.len() + media.waters.len() + 1;
        let scale = tool_panel_scale(
            self.settings.canvas_height,
            self.settings.canvas_scale,
            rows as f32 * TOOL_ROW_HEIGHT,
        )
        .clamp(0.75, 1.5);
        let layout = self.controller.tool_panel(scale);
        let row_height = TOOL_ROW_HEIGHT * layout.scale;

        ui.label(egui::RichText::new(&media.name).strong());
        ui.add_enabled_ui(panel.tools, |ui| {
            if layout.colors_visible {
                for color in &media.colors {
                    let highlighted = layout.highlighted.as_deref() == Some(color.id.as_str());
                    self.tool_row(ui, color, highlighted, row_height);
                }
                if ui
                    .add(
                        egui::Button::new("Wash brush")
                            .min_size(egui::vec2(ui.available_width(), row_height)),
                    )
                    .clicked()
                {
                    self.select_tool(WASH_ENTRY, ToolVariant::Full);
                }
            }
            if layout.waters_visible {
                ui.separator();
                for water in &media.waters {
                    let highlighted = layout.highlighted.as_deref() == Some(water.id.as_str());
                    self.tool_row(ui, water, highlighted, row_height);
                }
            }
        });
    }

    fn tool_row(&mut self, ui: &mut egui::Ui, entry: &MediaColor, highlighted: bool, height: f32) {
        let swatch = entry
            .rgb()
            .map(|[r, g, b]| egui::Color32::from_rgb(r, g, b))
            .unwrap_or(egui::Color32::GRAY);
        ui.horizontal(|ui| {
            let (rect, _) = ui.allocate_exact_size(egui::vec2(height, height), egui::Sense::hover());
            ui.painter().rect_filled(rect, 4.0, swatch);

            let full = egui::Button::new(entry.name.as_str())
                .selected(highlighted)
                .min_size(egui::vec2(110.0, height));
            if ui.add(full).clicked() {
                self.select_tool(&entry.id, ToolVariant::Full);
            }
            if ui
                .add(egui::Button::new("dip").min_size(egui::vec2(36.0, height)))
                .on_hover_text("Dip only")
                .clicked()
            {
                self.select_tool(&entry.id, ToolVariant::Dip);
            }
        });
    }

    fn select_tool(&mut self, entry: &str, variant: ToolVariant) {
        let picked = self.controller.select_tool(entry, variant);
        self.report(UiErrorContext::Control, picked);
    }

    fn show_commands(&mut self, ui: &mut egui::Ui, panel: &ControlPanel) {
        if control_button(ui, panel.primary, Some(panel.primary_style)) {
            let done = self.controller.primary_action();
            self.report(UiErrorContext::Control, done);
        }
        if control_button(ui, panel.cancel, None) {
            self.confirm = Some(Confirm::CancelRun);
        }

        ui.separator();
        if control_button(ui, panel.stroke, None) {
            let done = self.controller.stroke_selected();
            self.report(UiErrorContext::Control, done);
        }
        if control_button(ui, panel.fill, None) {
            let done = self.controller.fill_selected();
            self.report(UiErrorContext::Control, done);
        }
        if control_button(ui, panel.auto_paint, None) {
            let done = self.controller.auto_paint();
            self.report(UiErrorContext::Control, done);
        }
        if control_button(ui, panel.reset, None) {
            self.controller.reset();
        }

        ui.separator();
        if control_button(ui, panel.park, None) {
            let done = self.controller.park();
            self.report(UiErrorContext::Control, done);
        }
        if control_button(ui, panel.pen, None) {
            let done = self.controller.toggle_pen();
            self.report(UiErrorContext::Control, done);
        }
        if control_button(ui, panel.calibrate, None) {
            let done = self.controller.calibrate();
            self.report(UiErrorContext::Control, done);
        }
        if control_button(ui, panel.disable_motors, None) {
            let done = self.controller.disable_motors();
            self.report(UiErrorContext::Control, done);
        }
        if control_button(ui, panel.zero, None) {
            let done = self.controller.zero();
            self.report(UiErrorContext::Control, done);
        }
    }

    fn show_canvas(&mut self, ctx: &egui::Context) {
        let margin = self.settings.wrapper_margin;
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(margin.top);
            ui.horizontal_top(|ui| {
                ui.add_space(margin.left);
                self.paint_canvas(ui, margin.bottom);
            });
        });
    }

    fn paint_canvas(&mut self, ui: &mut egui::Ui, bottom_margin: f32) {
        let target = egui::vec2(self.settings.canvas_width, self.settings.canvas_height)
            * self.settings.canvas_scale;
        let avail = ui.available_size() - egui::vec2(0.0, bottom_margin);
        let fit = (avail.x / target.x).min(avail.y / target.y).clamp(0.1, 1.0);
        let (response, painter) = ui.allocate_painter(target * fit, egui::Sense::click());
        let rect = response.rect;

        let (design_w, design_h) = self.controller.canvas().size();
        let scale = (rect.width() / design_w.max(1.0)).min(rect.height() / design_h.max(1.0));
        let to_screen = |c: Coord| rect.min + egui::vec2(c.x as f32 * scale, c.y as f32 * scale);
        let to_design = |p: egui::Pos2| {
            Coord::new(
                f64::from((p.x - rect.min.x) / scale),
                f64::from((p.y - rect.min.y) / scale),
            )
        };

        let tolerance = f64::from(HIT_TOLERANCE_PX / scale);
        let hit = response
            .hover_pos()
            .and_then(|pos| self.controller.canvas().hit_test(to_design(pos), tolerance));
        self.controller.mouse_move(hit);
        if response.hovered() && ui.input(|i| i.pointer.primary_pressed()) {
            self.controller.mouse_down(hit);
        }

        painter.rect_filled(rect, 0.0, egui::Color32::WHITE);
        let canvas = self.controller.canvas();
        let selection = &self.controller.state().selection;
        let opacity = canvas.design_opacity();

        for item in canvas.main_layer() {
            let highlighted = selection.highlighted().any(|id| id == item.id);
            let stroke = if highlighted {
                egui::Stroke::new(3.0, HIGHLIGHT)
            } else {
                let [r, g, b] = item.stroke.or(item.fill).unwrap_or([0x80, 0x80, 0x80]);
                egui::Stroke::new(1.5, egui::Color32::from_rgb(r, g, b).gamma_multiply(opacity))
            };
            for points in &item.subpaths {
                painter.add(egui::Shape::line(
                    points.iter().copied().map(to_screen).collect(),
                    stroke,
                ));
            }
        }

        if let Some(item) = canvas.temp_item() {
            let stroke = egui::Stroke::new(2.0, TEMP_OUTLINE.gamma_multiply(opacity));
            for points in &item.subpaths {
                painter.add(egui::Shape::line(
                    points.iter().copied().map(to_screen).collect(),
                    stroke,
                ));
            }
        }

        for motion in canvas.action_layer() {
            let color = match motion.kind {
                RenderKind::Stroke => STROKE_MOTION,
                RenderKind::Fill => FILL_MOTION,
            };
            painter.add(egui::Shape::line(
                motion.points.iter().copied().map(to_screen).collect(),
                egui::Stroke::new(1.0, color),
            ));
        }

        let (point, duration_ms) = canvas.draw_point();
        let seconds = duration_ms as f32 / 1000.0;
        let x = ui
            .ctx()
            .animate_value_with_time(egui::Id::new("draw_point_x"), point.x as f32, seconds);
        let y = ui
            .ctx()
            .animate_value_with_time(egui::Id::new("draw_point_y"), point.y as f32, seconds);
        painter.circle_filled(
            to_screen(Coord::new(f64::from(x), f64::from(y))),
            5.0,
            DRAW_POINT,
        );
    }

    fn show_confirm(&mut self, ctx: &egui::Context) {
        let Some(confirm) = self.confirm else {
            return;
        };
        let (title, body) = match confirm {
            Confirm::CancelRun => (
                "Cancel painting?",
                "Everything queued for the robot will be discarded and the brush parked.",
            ),
            Confirm::Exit => (
                "Exit manual painting?",
                "Commands are still queued. Exiting stops the robot and parks the brush.",
            ),
        };

        let mut answer = None;
        let modal = egui::Modal::new(egui::Id::new("manual_confirm")).show(ctx, |ui| {
            ui.heading(title);
            ui.label(body);
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                if ui.button("Yes").clicked() {
                    answer = Some(true);
                }
                if ui.button("No").clicked() {
                    answer = Some(false);
                }
            });
        });
        if answer.is_none() && modal.should_close() {
            answer = Some(false);
        }
        let Some(confirmed) = answer else {
            return;
        };
        self.confirm = None;

        match confirm {
            Confirm::CancelRun => {
                let done = self.controller.cancel(confirmed);
                self.report(UiErrorContext::Control, done);
            }
            Confirm::Exit => match self.controller.close(confirmed) {
                Ok(CloseDecision::Close) => {
                    self.allow_close = true;
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
                Ok(CloseDecision::Stay) => {}
                Err(err) => self.report(UiErrorContext::Control, Err(err)),
            },
        }
    }
}

impl eframe::App for ManualModeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();
        self.process_transitions();
        let framed = self.controller.on_frame();
        self.report(UiErrorContext::Control, framed);
        self.handle_close_request(ctx);

        let panel = self.controller.controls();
        self.show_top_bar(ctx, &panel);
        self.show_status_bar(ctx);
        self.show_side_panel(ctx, &panel);
        self.show_canvas(ctx);
        self.show_confirm(ctx);

        let busy = self.controller.run_state() != RunState::Idle
            || self.controller.canvas().is_spooling();
        let every = if busy { 16 } else { 100 };
        ctx.request_repaint_after(Duration::from_millis(every));
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        if let Ok(serialized) = serde_json::to_string(&self.prefs) {
            storage.set_string(SETTINGS_STORAGE_KEY, serialized);
        }
    }
}

impl Drop for ManualModeApp {
    fn drop(&mut self) {
        self.controller.dispatcher().shutdown();
    }
}

fn control_button(ui: &mut egui::Ui, state: ControlState, style: Option<PrimaryStyle>) -> bool {
    let mut button =
        egui::Button::new(state.label.text()).min_size(egui::vec2(ui.available_width(), 26.0));
    match style {
        Some(PrimaryStyle::Ready) => button = button.fill(egui::Color32::from_rgb(0x2e, 0x8b, 0x57)),
        Some(PrimaryStyle::Active) => button = button.fill(egui::Color32::from_rgb(0xd9, 0x8c, 0x1f)),
        Some(PrimaryStyle::Normal) | None => {}
    }
    ui.add_enabled(state.enabled, button)
        .on_hover_text(state.hint.text())
        .on_disabled_hover_text(state.hint.text())
        .clicked()
}

fn pen_mode_label(mode: PenMode) -> &'static str {
    match mode {
        PenMode::Full => "Paint and water",
        PenMode::WaterOnly => "Water only",
        PenMode::PaintOnly => "Paint only",
        PenMode::PenOnly => "Pen only",
    }
}

fn buffer_summary(controller: &ManualController<PreviewCanvas, ChannelDispatcher>) -> String {
    match controller.state().buffer() {
        None => "Buffer: waiting for device".to_string(),
        Some(buffer) if buffer.paused => format!("Buffer: {} queued (paused)", buffer.length),
        Some(buffer) => format!("Buffer: {} queued", buffer.length),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use shared::protocol::{Command, DispatchRequest, StatusMessage};

    fn app_with_queue() -> (ManualModeApp, Receiver<BridgeCommand>, Sender<UiEvent>) {
        let (cmd_tx, cmd_rx) = bounded(16);
        let (ui_tx, ui_rx) = bounded(16);
        let app = ManualModeApp::new(
            cmd_tx,
            ui_rx,
            StartupConfig {
                settings: Settings::default(),
                media_set: MediaSet::default(),
                design: None,
                prefs: None,
            },
        );
        (app, cmd_rx, ui_tx)
    }

    #[test]
    fn startup_sends_pen_up_to_report_device_state() {
        let (_app, cmd_rx, _ui_tx) = app_with_queue();
        assert_eq!(
            cmd_rx.try_recv().expect("startup request"),
            BridgeCommand::Dispatch(DispatchRequest::single(Command::Up))
        );
    }

    #[test]
    fn device_status_lines_reach_the_log() {
        let (mut app, _cmd_rx, ui_tx) = app_with_queue();
        ui_tx
            .send(UiEvent::Device(DeviceEvent::Status(StatusMessage::Parked)))
            .expect("send");
        ui_tx
            .send(UiEvent::Device(DeviceEvent::Status(StatusMessage::Clear)))
            .expect("send");
        app.process_ui_events();

        let texts: Vec<_> = app.status_log.iter().map(|line| line.text.as_str()).collect();
        assert_eq!(texts, vec!["Parked"]);
    }

    #[test]
    fn refused_actions_are_logged_without_error_styling() {
        let (mut app, _cmd_rx, _ui_tx) = app_with_queue();
        app.report(UiErrorContext::Control, Err(ManualError::NothingSelected));
        let line = app.status_log.last().expect("logged");
        assert!(!line.error);
        assert_eq!(line.text, "no path is selected");
    }

    #[test]
    fn status_log_is_bounded() {
        let (mut app, _cmd_rx, _ui_tx) = app_with_queue();
        for i in 0..(STATUS_LOG_LIMIT + 25) {
            app.push_status(format!("line {i}"), false);
        }
        assert_eq!(app.status_log.len(), STATUS_LOG_LIMIT);
        assert_eq!(app.status_log[0].text, "line 25");
    }
}
