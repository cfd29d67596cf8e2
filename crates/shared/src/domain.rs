use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a single vector item on one of the canvas layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub const ORIGIN: Coord = Coord { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Coord) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamedHeight {
    Up,
    Down,
}

/// Pen height as reported by the device: a named position or a raw value
/// between 0 (fully up) and 1 (fully down).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PenHeight {
    Named(NamedHeight),
    Position(f64),
}

impl PenHeight {
    pub const UP: PenHeight = PenHeight::Named(NamedHeight::Up);
    pub const DOWN: PenHeight = PenHeight::Named(NamedHeight::Down);

    /// Raw positions below the half-way mark read as up.
    pub fn is_up(&self) -> bool {
        match self {
            PenHeight::Named(NamedHeight::Up) => true,
            PenHeight::Named(NamedHeight::Down) => false,
            PenHeight::Position(value) => *value < 0.5,
        }
    }
}

impl Default for PenHeight {
    fn default() -> Self {
        Self::UP
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PenState {
    pub state: PenHeight,
    pub abs_coord: Coord,
    #[serde(default)]
    pub media: String,
    /// Duration of the last reported move, in milliseconds.
    #[serde(default)]
    pub last_duration: u64,
}

impl PenState {
    /// Nav entry id of the tool the pen currently holds, ignoring the dip
    /// variant.
    pub fn media_entry(&self) -> Option<&str> {
        let entry = self.media.strip_suffix(DIP_SUFFIX).unwrap_or(&self.media);
        (!entry.is_empty()).then_some(entry)
    }
}

/// Abbreviated command buffer status pushed by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BufferSnapshot {
    pub length: usize,
    pub paused: bool,
}

impl BufferSnapshot {
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

pub const DIP_SUFFIX: &str = "dip";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolVariant {
    #[default]
    Full,
    Dip,
}

/// Tool identifier sent with `media` commands, e.g. `color3` or
/// `water0dip`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolId(String);

impl ToolId {
    pub fn new(entry: &str, variant: ToolVariant) -> Self {
        match variant {
            ToolVariant::Full => Self(entry.to_string()),
            ToolVariant::Dip => Self(format!("{entry}{DIP_SUFFIX}")),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn entry(&self) -> &str {
        self.0.strip_suffix(DIP_SUFFIX).unwrap_or(&self.0)
    }

    pub fn variant(&self) -> ToolVariant {
        if self.0.ends_with(DIP_SUFFIX) {
            ToolVariant::Dip
        } else {
            ToolVariant::Full
        }
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Id of the nav entry that triggers a full brush wash.
pub const WASH_ENTRY: &str = "colorx";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaColor {
    pub id: String,
    pub name: String,
    /// `#rrggbb`
    pub color: String,
}

impl MediaColor {
    fn new(id: &str, name: &str, color: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            color: color.to_string(),
        }
    }

    pub fn rgb(&self) -> Option<[u8; 3]> {
        let hex = self.color.strip_prefix('#')?;
        if hex.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        Some([channel(0)?, channel(2)?, channel(4)?])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaSet {
    pub name: String,
    pub base_class: String,
    pub colors: Vec<MediaColor>,
    #[serde(default = "default_waters")]
    pub waters: Vec<MediaColor>,
}

fn default_waters() -> Vec<MediaColor> {
    vec![
        MediaColor::new("water0", "Water 1", "#dde9f5"),
        MediaColor::new("water1", "Water 2", "#dde9f5"),
        MediaColor::new("water2", "Water 3", "#dde9f5"),
    ]
}

impl Default for MediaSet {
    fn default() -> Self {
        Self {
            name: "Crayola Classic".to_string(),
            base_class: "crayola".to_string(),
            colors: vec![
                MediaColor::new("color0", "Black", "#000000"),
                MediaColor::new("color1", "Red", "#e0262f"),
                MediaColor::new("color2", "Orange", "#f57e22"),
                MediaColor::new("color3", "Yellow", "#fde62d"),
                MediaColor::new("color4", "Green", "#1ba158"),
                MediaColor::new("color5", "Blue", "#1f64b0"),
                MediaColor::new("color6", "Purple", "#6b3e98"),
                MediaColor::new("color7", "Brown", "#8b5a2b"),
            ],
            waters: default_waters(),
        }
    }
}

impl MediaSet {
    pub fn group_of(&self, entry: &str) -> Option<ToolGroup> {
        if entry == WASH_ENTRY {
            Some(ToolGroup::Wash)
        } else if self.colors.iter().any(|c| c.id == entry) {
            Some(ToolGroup::Color)
        } else if self.waters.iter().any(|w| w.id == entry) {
            Some(ToolGroup::Water)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolGroup {
    Color,
    Water,
    Wash,
}

/// Which implement groups the operator has available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PenMode {
    #[default]
    Full,
    WaterOnly,
    PaintOnly,
    PenOnly,
}

impl PenMode {
    pub fn colors_visible(self) -> bool {
        matches!(self, PenMode::Full | PenMode::PaintOnly)
    }

    pub fn waters_visible(self) -> bool {
        matches!(self, PenMode::Full | PenMode::WaterOnly)
    }

    pub fn allows(self, group: ToolGroup) -> bool {
        match group {
            ToolGroup::Color => self.colors_visible(),
            ToolGroup::Water => self.waters_visible(),
            ToolGroup::Wash => true,
        }
    }
}

impl TryFrom<u8> for PenMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Full),
            1 => Ok(Self::WaterOnly),
            2 => Ok(Self::PaintOnly),
            3 => Ok(Self::PenOnly),
            other => Err(format!("unknown pen mode {other}")),
        }
    }
}

impl From<PenMode> for u8 {
    fn from(value: PenMode) -> Self {
        match value {
            PenMode::Full => 0,
            PenMode::WaterOnly => 1,
            PenMode::PaintOnly => 2,
            PenMode::PenOnly => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pen_height_accepts_names_and_positions() {
        let up: PenState =
            serde_json::from_str(r#"{"state":"up","absCoord":{"x":1.0,"y":2.0},"media":"color1dip","lastDuration":40}"#)
                .expect("named height");
        assert!(up.state.is_up());
        assert_eq!(up.media_entry(), Some("color1"));

        let raw: PenState =
            serde_json::from_str(r#"{"state":0.8,"absCoord":{"x":0.0,"y":0.0}}"#).expect("raw height");
        assert!(!raw.state.is_up());
        assert_eq!(raw.media_entry(), None);
        assert!(PenHeight::Position(0.2).is_up());
    }

    #[test]
    fn tool_id_tracks_dip_variant() {
        let tool = ToolId::new("water1", ToolVariant::Dip);
        assert_eq!(tool.as_str(), "water1dip");
        assert_eq!(tool.entry(), "water1");
        assert_eq!(tool.variant(), ToolVariant::Dip);
        assert_eq!(ToolId::new("color2", ToolVariant::Full).variant(), ToolVariant::Full);
    }

    #[test]
    fn pen_mode_hides_groups() {
        assert!(PenMode::Full.allows(ToolGroup::Color) && PenMode::Full.allows(ToolGroup::Water));
        assert!(!PenMode::WaterOnly.colors_visible());
        assert!(!PenMode::PaintOnly.waters_visible());
        assert!(!PenMode::PenOnly.colors_visible() && !PenMode::PenOnly.waters_visible());
        assert!(PenMode::PenOnly.allows(ToolGroup::Wash));
        assert_eq!(PenMode::try_from(2), Ok(PenMode::PaintOnly));
        assert!(PenMode::try_from(9).is_err());
    }

    #[test]
    fn default_media_set_resolves_groups() {
        let set = MediaSet::default();
        assert_eq!(set.group_of("color4"), Some(ToolGroup::Color));
        assert_eq!(set.group_of("water2"), Some(ToolGroup::Water));
        assert_eq!(set.group_of(WASH_ENTRY), Some(ToolGroup::Wash));
        assert_eq!(set.group_of("color42"), None);
        assert_eq!(set.colors[1].rgb(), Some([0xe0, 0x26, 0x2f]));
    }
}
