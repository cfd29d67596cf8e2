//! UI/worker events and error modeling for the manual-mode window.

use std::fmt;

use manual_core::ManualError;
use shared::protocol::DeviceEvent;

#[derive(Debug)]
pub enum UiEvent {
    Device(DeviceEvent),
    Info(String),
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    /// The action was refused and nothing changed.
    Refused,
    Transport,
    Design,
    Config,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    Startup,
    Control,
    LoadDesign,
    MediaSet,
    DeviceEvent,
}

impl UiErrorContext {
    fn label(self) -> &'static str {
        match self {
            UiErrorContext::Startup => "startup",
            UiErrorContext::Control => "control",
            UiErrorContext::LoadDesign => "load design",
            UiErrorContext::MediaSet => "media set",
            UiErrorContext::DeviceEvent => "device event",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_manual(context: UiErrorContext, err: &ManualError) -> Self {
        let category = match err {
            ManualError::Dispatch(_) => UiErrorCategory::Transport,
            ManualError::Canvas(_) => UiErrorCategory::Design,
            refused if refused.is_refusal() => UiErrorCategory::Refused,
            _ => UiErrorCategory::Unknown,
        };
        Self {
            category,
            context,
            message: err.to_string(),
        }
    }

    /// Classifies free-form failures such as `anyhow` chains from config
    /// and file loading.
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_ascii_lowercase();
        let category = if lower.contains("disconnected")
            || lower.contains("queue is full")
            || lower.contains("dispatch")
        {
            UiErrorCategory::Transport
        } else if lower.contains("svg") || lower.contains("design") {
            UiErrorCategory::Design
        } else if lower.contains("media set")
            || lower.contains("settings")
            || lower.contains("parse")
        {
            UiErrorCategory::Config
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_refusal(&self) -> bool {
        self.category == UiErrorCategory::Refused
    }
}

impl fmt::Display for UiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.context.label(), self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use manual_core::{CanvasError, RunError};
    use shared::error::DispatchError;

    #[test]
    fn manual_errors_map_to_categories() {
        let refused = UiError::from_manual(
            UiErrorContext::Control,
            &ManualError::Run(RunError::BufferBusy { length: 3 }),
        );
        assert!(refused.is_refusal());

        let transport = UiError::from_manual(
            UiErrorContext::Control,
            &ManualError::Dispatch(DispatchError::QueueFull),
        );
        assert_eq!(transport.category(), UiErrorCategory::Transport);

        let design = UiError::from_manual(
            UiErrorContext::LoadDesign,
            &ManualError::Canvas(CanvasError::EmptyDesign),
        );
        assert_eq!(design.category(), UiErrorCategory::Design);
        assert_eq!(
            design.to_string(),
            "load design failed: design contains no drawable paths"
        );
    }

    #[test]
    fn free_form_messages_are_classified() {
        let err = UiError::from_message(
            UiErrorContext::MediaSet,
            "failed to parse media set /tmp/set.json",
        );
        assert_eq!(err.category(), UiErrorCategory::Config);
        assert_eq!(err.context(), UiErrorContext::MediaSet);

        let err = UiError::from_message(UiErrorContext::Control, "buffer worker disconnected");
        assert_eq!(err.category(), UiErrorCategory::Transport);
        assert!(!err.is_refusal());
    }
}
