use serde::Serialize;
use tracing::{info, warn};

pub const DELETE_ICON: &str = "mdi:delete";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
}

/// Short-lived, user-facing message.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub icon: &'static str,
}

impl Notice {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
        icon: &'static str,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity,
            icon,
        }
    }
}

/// Fire-and-forget notification sink.
pub trait Notifier {
    fn notify(&mut self, notice: Notice);
}

/// Logs every notice and keeps it until the front end drains it.
#[derive(Debug, Default)]
pub struct NoticeQueue {
    pending: Vec<Notice>,
}

impl NoticeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> &[Notice] {
        &self.pending
    }

    pub fn drain(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.pending)
    }
}

impl Notifier for NoticeQueue {
    fn notify(&mut self, notice: Notice) {
        match notice.severity {
            Severity::Success => {
                info!(title = %notice.title, description = %notice.description, "notice")
            }
            Severity::Error => {
                warn!(title = %notice.title, description = %notice.description, "notice")
            }
        }
        self.pending.push(notice);
    }
}
