//! Side-effect descriptors returned by session handlers, and user notices.

use std::fmt;

use chronosketch_common::error::SketchError;
use chronosketch_model::Snapshot;

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A non-blocking message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    /// An error notice prefixed with what was being attempted.
    pub fn from_error(action: &str, err: &SketchError) -> Self {
        Self::error(format!("{action}: {err}"))
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        write!(f, "[{tag}] {}", self.message)
    }
}

/// Work a handler asks the caller to perform after a state change.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Write the current stroke list as the `paths` record.
    PersistPaths,
    /// Write a snapshot record. Only failures are reported.
    PersistSnapshot(Snapshot),
    /// Write a snapshot record the user explicitly saved; success is reported too.
    SaveSnapshot(Snapshot),
    /// The canvas and timeline need repainting.
    Redraw,
    /// Show a message.
    Notice(Notice),
}

impl Effect {
    pub fn is_redraw(&self) -> bool {
        matches!(self, Effect::Redraw)
    }
}
