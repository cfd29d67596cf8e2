use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::domain::{BufferSnapshot, Coord, MediaSet, PenMode, PenState, ToolId};

/// Status lines shown by the device layer while it works through the
/// buffer. Serialized as their message keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusMessage {
    #[serde(rename = "")]
    Clear,
    #[serde(rename = "status.pausing")]
    Pausing,
    #[serde(rename = "status.paused")]
    Paused,
    #[serde(rename = "status.resuming")]
    Resuming,
    #[serde(rename = "status.resumed")]
    Resumed,
    #[serde(rename = "status.parking")]
    Parking,
    #[serde(rename = "status.parked")]
    Parked,
    #[serde(rename = "status.unlocking")]
    Unlocking,
    #[serde(rename = "status.unlocked")]
    Unlocked,
    #[serde(rename = "status.zero")]
    Zero,
}

impl StatusMessage {
    pub fn text(self) -> &'static str {
        match self {
            StatusMessage::Clear => "",
            StatusMessage::Pausing => "Pausing...",
            StatusMessage::Paused => "Paused",
            StatusMessage::Resuming => "Resuming...",
            StatusMessage::Resumed => "Resumed",
            StatusMessage::Parking => "Parking...",
            StatusMessage::Parked => "Parked",
            StatusMessage::Unlocking => "Unlocking motors...",
            StatusMessage::Unlocked => "Motors unlocked",
            StatusMessage::Zero => "Zeroing position",
        }
    }
}

/// Lifecycle callbacks the auto-paint routine threads through the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CallbackEvent {
    AutoPaintBegin,
    AutoPaintComplete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "arg", rename_all = "kebab-case")]
pub enum Command {
    Status(StatusMessage),
    Pause,
    Resume,
    Clear,
    ClearLocal,
    Park,
    Up,
    Down,
    Zero,
    Unlock,
    Wash,
    Media(ToolId),
    Move(Coord),
    Callback(CallbackEvent),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Status(_) => "status",
            Command::Pause => "pause",
            Command::Resume => "resume",
            Command::Clear => "clear",
            Command::ClearLocal => "clear-local",
            Command::Park => "park",
            Command::Up => "up",
            Command::Down => "down",
            Command::Zero => "zero",
            Command::Unlock => "unlock",
            Command::Wash => "wash",
            Command::Media(_) => "media",
            Command::Move(_) => "move",
            Command::Callback(_) => "callback",
        }
    }
}

/// Where a request lands in the dispatcher's FIFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    #[default]
    Append,
    /// Inserted at the head, in order, ahead of everything already queued.
    Immediate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub commands: Vec<Command>,
    #[serde(default)]
    pub placement: Placement,
}

impl DispatchRequest {
    pub fn append(commands: impl IntoIterator<Item = Command>) -> Self {
        Self {
            commands: commands.into_iter().collect(),
            placement: Placement::Append,
        }
    }

    pub fn immediate(commands: impl IntoIterator<Item = Command>) -> Self {
        Self {
            commands: commands.into_iter().collect(),
            placement: Placement::Immediate,
        }
    }

    pub fn single(command: Command) -> Self {
        Self::append([command])
    }

    /// Priority when `now` is set, tail append otherwise.
    pub fn placed(commands: impl IntoIterator<Item = Command>, now: bool) -> Self {
        if now {
            Self::immediate(commands)
        } else {
            Self::append(commands)
        }
    }

    pub fn is_immediate(&self) -> bool {
        self.placement == Placement::Immediate
    }

    pub fn command_names(&self) -> Vec<&'static str> {
        self.commands.iter().map(Command::name).collect()
    }
}

/// Notifications pushed by the dispatcher and device layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum DeviceEvent {
    PenUpdate(PenState),
    BufferUpdate(BufferSnapshot),
    FullyPaused,
    FullyResumed,
    Callback(CallbackEvent),
    Status(StatusMessage),
}

/// Named-channel messages from the host application.
#[derive(Debug, Clone, PartialEq)]
pub enum HostMessage {
    /// A design has been stored; the payload is its SVG text.
    LoadDesign(String),
    UpdateMediaSet(MediaSet),
    UpdatePenMode(PenMode),
}

impl HostMessage {
    pub fn channel(&self) -> HostChannel {
        match self {
            HostMessage::LoadDesign(_) => HostChannel::LoadSvg,
            HostMessage::UpdateMediaSet(_) => HostChannel::UpdateMediaSet,
            HostMessage::UpdatePenMode(_) => HostChannel::UpdatePenMode,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostChannel {
    LoadSvg,
    UpdateMediaSet,
    UpdatePenMode,
}

impl HostChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            HostChannel::LoadSvg => "loadSVG",
            HostChannel::UpdateMediaSet => "updateMediaSet",
            HostChannel::UpdatePenMode => "updatePenMode",
        }
    }
}

impl fmt::Display for HostChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HostChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "loadSVG" => Ok(Self::LoadSvg),
            "updateMediaSet" => Ok(Self::UpdateMediaSet),
            "updatePenMode" => Ok(Self::UpdatePenMode),
            other => Err(format!("unknown host channel '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ToolVariant;

    #[test]
    fn commands_use_name_arg_wire_shape() {
        let json = serde_json::to_value(Command::Media(ToolId::new("color2", ToolVariant::Dip)))
            .expect("serialize");
        assert_eq!(json, serde_json::json!({"name": "media", "arg": "color2dip"}));

        let json = serde_json::to_value(Command::ClearLocal).expect("serialize");
        assert_eq!(json, serde_json::json!({"name": "clear-local"}));

        let json = serde_json::to_value(Command::Status(StatusMessage::Pausing)).expect("serialize");
        assert_eq!(json, serde_json::json!({"name": "status", "arg": "status.pausing"}));
    }

    #[test]
    fn placed_requests_follow_priority_flag() {
        assert!(DispatchRequest::placed([Command::Up], true).is_immediate());
        assert!(!DispatchRequest::placed([Command::Up], false).is_immediate());
        assert_eq!(
            DispatchRequest::immediate([Command::Clear, Command::Park, Command::ClearLocal]).command_names(),
            vec!["clear", "park", "clear-local"]
        );
    }

    #[test]
    fn host_channels_round_trip_names() {
        for channel in [HostChannel::LoadSvg, HostChannel::UpdateMediaSet, HostChannel::UpdatePenMode] {
            assert_eq!(channel.as_str().parse::<HostChannel>(), Ok(channel));
        }
        assert!("refreshEverything".parse::<HostChannel>().is_err());
    }
}
