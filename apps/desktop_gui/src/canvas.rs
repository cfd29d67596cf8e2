//! SVG preview canvas: main, temporary and action layers plus a renderer
//! that spools stroke and fill motion one path per frame.

use std::collections::VecDeque;

use manual_core::{CanvasError, CanvasEvent, LayerFocus, PaintCanvas, RenderKind};
use shared::{
    domain::{Coord, PathId, ToolId},
    protocol::{CallbackEvent, Command},
};
use usvg::{tiny_skia_path::PathSegment, Options, Tree};

const CURVE_STEPS: usize = 12;
/// Distance between fill hatch lines, in design units.
const FILL_SPACING: f64 = 6.0;
/// Action-layer ids start here so they never collide with design paths.
const ACTION_ID_BASE: u64 = 1 << 32;
const DIMMED_OPACITY: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Coord,
    pub max: Coord,
}

impl Bounds {
    fn around(points: impl IntoIterator<Item = Coord>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(
            Bounds {
                min: first,
                max: first,
            },
            |b, p| Bounds {
                min: Coord::new(b.min.x.min(p.x), b.min.y.min(p.y)),
                max: Coord::new(b.max.x.max(p.x), b.max.y.max(p.y)),
            },
        ))
    }

    pub fn contains(&self, p: Coord) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    fn area(&self) -> f64 {
        (self.max.x - self.min.x) * (self.max.y - self.min.y)
    }
}

/// One ungrouped design path, flattened to polylines in canvas space.
#[derive(Debug, Clone)]
pub struct DesignPath {
    pub id: PathId,
    pub subpaths: Vec<Vec<Coord>>,
    pub bounds: Bounds,
    pub fill: Option<[u8; 3]>,
    pub stroke: Option<[u8; 3]>,
}

/// A brush movement rendered into the action layer.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionPath {
    pub id: PathId,
    pub source: PathId,
    pub kind: RenderKind,
    pub tool: Option<ToolId>,
    pub points: Vec<Coord>,
}

#[derive(Debug, Clone)]
enum RenderJob {
    Path {
        path: PathId,
        tool: Option<ToolId>,
        kind: RenderKind,
        report: bool,
    },
    MotionBatchDone,
}

#[derive(Debug)]
pub struct PreviewCanvas {
    size: (f32, f32),
    main: Vec<DesignPath>,
    /// Outline of the path currently being rendered.
    temp: Option<PathId>,
    action: Vec<MotionPath>,
    jobs: VecDeque<RenderJob>,
    focus: LayerFocus,
    draw_point: Coord,
    draw_duration_ms: u64,
    next_action_id: u64,
}

impl PreviewCanvas {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            size: (width, height),
            main: Vec::new(),
            temp: None,
            action: Vec::new(),
            jobs: VecDeque::new(),
            focus: LayerFocus::Design,
            draw_point: Coord::ORIGIN,
            draw_duration_ms: 0,
            next_action_id: ACTION_ID_BASE,
        }
    }

    pub fn size(&self) -> (f32, f32) {
        self.size
    }

    pub fn main_layer(&self) -> &[DesignPath] {
        &self.main
    }

    pub fn action_layer(&self) -> &[MotionPath] {
        &self.action
    }

    pub fn temp_item(&self) -> Option<&DesignPath> {
        let id = self.temp?;
        self.main.iter().find(|item| item.id == id)
    }

    pub fn is_spooling(&self) -> bool {
        !self.jobs.is_empty()
    }

    /// Opacity for the main and temporary layers.
    pub fn design_opacity(&self) -> f32 {
        match self.focus {
            LayerFocus::Design => 1.0,
            LayerFocus::Action => DIMMED_OPACITY,
        }
    }

    pub fn draw_point(&self) -> (Coord, u64) {
        (self.draw_point, self.draw_duration_ms)
    }

    /// Topmost item under `point`: action layer first, then the design.
    pub fn hit_test(&self, point: Coord, tolerance: f64) -> Option<PathId> {
        let action_hit = self.action.iter().rev().find(|motion| {
            motion
                .points
                .windows(2)
                .any(|seg| distance_to_segment(point, seg[0], seg[1]) <= tolerance)
        });
        if let Some(motion) = action_hit {
            return Some(motion.id);
        }

        self.main
            .iter()
            .filter(|item| item.bounds.contains(point))
            .min_by(|a, b| a.bounds.area().total_cmp(&b.bounds.area()))
            .map(|item| item.id)
    }

    fn render_job(&mut self, path: PathId, tool: Option<ToolId>, kind: RenderKind) {
        let Some(item) = self.main.iter().find(|item| item.id == path) else {
            tracing::debug!(path = path.0, "render skipped; path no longer on canvas");
            return;
        };
        self.temp = Some(path);

        let runs = match kind {
            RenderKind::Stroke => item
                .subpaths
                .iter()
                .filter(|points| points.len() > 1)
                .cloned()
                .collect(),
            RenderKind::Fill => hatch(&item.subpaths, &item.bounds, FILL_SPACING),
        };
        for points in runs {
            let id = PathId(self.next_action_id);
            self.next_action_id += 1;
            self.action.push(MotionPath {
                id,
                source: path,
                kind,
                tool: tool.clone(),
                points,
            });
        }
    }
}

impl PaintCanvas for PreviewCanvas {
    fn reset(&mut self) {
        self.jobs.clear();
        self.temp = None;
        self.action.clear();
        self.focus = LayerFocus::Design;
        self.next_action_id = ACTION_ID_BASE;
    }

    fn load_design(&mut self, svg: &str) -> Result<(), CanvasError> {
        let tree = Tree::from_data(svg.as_bytes(), &Options::default())
            .map_err(|err| CanvasError::Parse(err.to_string()))?;

        let mut paths = Vec::new();
        collect_paths(tree.root(), &mut paths);
        if paths.is_empty() {
            return Err(CanvasError::EmptyDesign);
        }

        let size = tree.size();
        self.size = (size.width(), size.height());
        self.main = paths;
        self.reset();
        tracing::debug!(paths = self.main.len(), "design ungrouped onto main layer");
        Ok(())
    }

    fn is_main_layer_item(&self, id: PathId) -> bool {
        self.main.iter().any(|item| item.id == id)
    }

    fn action_layer_len(&self) -> usize {
        self.action.len()
    }

    fn set_focus(&mut self, focus: LayerFocus) {
        self.focus = focus;
    }

    fn render_path(&mut self, path: PathId, tool: Option<&ToolId>, kind: RenderKind) {
        self.jobs.push_back(RenderJob::Path {
            path,
            tool: tool.cloned(),
            kind,
            report: true,
        });
    }

    fn render_motion_paths(&mut self) {
        for kind in [RenderKind::Stroke, RenderKind::Fill] {
            for item in &self.main {
                let wanted = match kind {
                    RenderKind::Stroke => item.stroke.is_some(),
                    RenderKind::Fill => item.fill.is_some(),
                };
                if wanted {
                    self.jobs.push_back(RenderJob::Path {
                        path: item.id,
                        tool: None,
                        kind,
                        report: false,
                    });
                }
            }
        }
        self.jobs.push_back(RenderJob::MotionBatchDone);
    }

    fn auto_paint(&mut self) -> Vec<Command> {
        let mut commands = vec![Command::Callback(CallbackEvent::AutoPaintBegin)];
        let mut loaded: Option<&ToolId> = None;

        for motion in &self.action {
            let Some((first, rest)) = motion.points.split_first() else {
                continue;
            };
            if let Some(tool) = motion.tool.as_ref() {
                if loaded != Some(tool) {
                    commands.push(Command::Media(tool.clone()));
                    loaded = Some(tool);
                }
            }
            commands.push(Command::Up);
            commands.push(Command::Move(*first));
            commands.push(Command::Down);
            commands.extend(rest.iter().copied().map(Command::Move));
        }

        commands.extend([
            Command::Up,
            Command::Park,
            Command::Callback(CallbackEvent::AutoPaintComplete),
        ]);
        commands
    }

    fn move_draw_point(&mut self, to: Coord, duration_ms: u64) {
        self.draw_point = to;
        self.draw_duration_ms = duration_ms;
    }

    fn on_frame(&mut self) -> Vec<CanvasEvent> {
        let mut events = Vec::new();
        match self.jobs.pop_front() {
            Some(RenderJob::Path {
                path,
                tool,
                kind,
                report,
            }) => {
                self.render_job(path, tool, kind);
                if report {
                    events.push(CanvasEvent::RenderComplete { path, kind });
                }
            }
            Some(RenderJob::MotionBatchDone) => events.push(CanvasEvent::MotionPathsRendered),
            None => return events,
        }

        if matches!(self.jobs.front(), Some(RenderJob::MotionBatchDone)) {
            self.jobs.pop_front();
            events.push(CanvasEvent::MotionPathsRendered);
        }
        if self.jobs.is_empty() {
            self.temp = None;
        }
        events
    }
}

fn collect_paths(group: &usvg::Group, out: &mut Vec<DesignPath>) {
    for child in group.children() {
        match child {
            usvg::Node::Group(g) => collect_paths(g, out),
            usvg::Node::Path(p) => {
                let transform = p.abs_transform();
                let subpaths = flatten(p.data(), |x, y| {
                    Coord::new(
                        f64::from(transform.sx * x + transform.kx * y + transform.tx),
                        f64::from(transform.ky * x + transform.sy * y + transform.ty),
                    )
                });
                let Some(bounds) = Bounds::around(subpaths.iter().flatten().copied()) else {
                    continue;
                };
                out.push(DesignPath {
                    id: PathId(out.len() as u64 + 1),
                    subpaths,
                    bounds,
                    fill: p.fill().and_then(|fill| solid_rgb(fill.paint())),
                    stroke: p.stroke().and_then(|stroke| solid_rgb(stroke.paint())),
                });
            }
            _ => {}
        }
    }
}

fn solid_rgb(paint: &usvg::Paint) -> Option<[u8; 3]> {
    match paint {
        usvg::Paint::Color(color) => Some([color.red, color.green, color.blue]),
        _ => None,
    }
}

/// Flattens path segments into polylines, sampling curves.
fn flatten(
    data: &usvg::tiny_skia_path::Path,
    map: impl Fn(f32, f32) -> Coord,
) -> Vec<Vec<Coord>> {
    let mut subpaths: Vec<Vec<Coord>> = Vec::new();
    let mut current: Vec<Coord> = Vec::new();
    let mut pen = (0.0f32, 0.0f32);
    let mut start = pen;

    for segment in data.segments() {
        match segment {
            PathSegment::MoveTo(p) => {
                if current.len() > 1 {
                    subpaths.push(std::mem::take(&mut current));
                }
                current.clear();
                pen = (p.x, p.y);
                start = pen;
                current.push(map(p.x, p.y));
            }
            PathSegment::LineTo(p) => {
                pen = (p.x, p.y);
                current.push(map(p.x, p.y));
            }
            PathSegment::QuadTo(c, e) => {
                for step in 1..=CURVE_STEPS {
                    let t = step as f32 / CURVE_STEPS as f32;
                    let u = 1.0 - t;
                    let x = u * u * pen.0 + 2.0 * u * t * c.x + t * t * e.x;
                    let y = u * u * pen.1 + 2.0 * u * t * c.y + t * t * e.y;
                    current.push(map(x, y));
                }
                pen = (e.x, e.y);
            }
            PathSegment::CubicTo(c1, c2, e) => {
                for step in 1..=CURVE_STEPS {
                    let t = step as f32 / CURVE_STEPS as f32;
                    let u = 1.0 - t;
                    let x = u * u * u * pen.0
                        + 3.0 * u * u * t * c1.x
                        + 3.0 * u * t * t * c2.x
                        + t * t * t * e.x;
                    let y = u * u * u * pen.1
                        + 3.0 * u * u * t * c1.y
                        + 3.0 * u * t * t * c2.y
                        + t * t * t * e.y;
                    current.push(map(x, y));
                }
                pen = (e.x, e.y);
            }
            PathSegment::Close => {
                current.push(map(start.0, start.1));
                pen = start;
            }
        }
    }
    if current.len() > 1 {
        subpaths.push(current);
    }
    subpaths
}

/// Horizontal even-odd hatch runs covering the closed shape.
fn hatch(subpaths: &[Vec<Coord>], bounds: &Bounds, spacing: f64) -> Vec<Vec<Coord>> {
    let mut runs = Vec::new();
    let mut y = bounds.min.y + spacing / 2.0;
    let mut reverse = false;

    while y < bounds.max.y {
        let mut xs: Vec<f64> = subpaths
            .iter()
            .flat_map(|points| {
                let closing = [points.last().copied(), points.first().copied()];
                points
                    .windows(2)
                    .map(|seg| (seg[0], seg[1]))
                    .chain(match closing {
                        [Some(a), Some(b)] if a != b => Some((a, b)),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
            })
            .filter_map(|(a, b)| {
                let crosses = (a.y <= y && b.y > y) || (b.y <= y && a.y > y);
                crosses.then(|| a.x + (y - a.y) / (b.y - a.y) * (b.x - a.x))
            })
            .collect();
        xs.sort_by(f64::total_cmp);

        let mut row: Vec<Vec<Coord>> = xs
            .chunks_exact(2)
            .map(|pair| vec![Coord::new(pair[0], y), Coord::new(pair[1], y)])
            .collect();
        if reverse {
            row.reverse();
            row.iter_mut().for_each(|run| run.reverse());
        }
        runs.extend(row);
        reverse = !reverse;
        y += spacing;
    }
    runs
}

fn distance_to_segment(p: Coord, a: Coord, b: Coord) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return p.distance_to(&a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance_to(&Coord::new(a.x + t * dx, a.y + t * dy))
}
