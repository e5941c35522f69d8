//! User-visible notice effect trait
//!
//! The SOS flow reports blocking failures and outcomes through this trait;
//! the UI decides how to render them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Severity of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeLevel {
    /// Informational, e.g. "alert sent"
    Info,
    /// Something degraded but the flow continued
    Warning,
    /// The flow was aborted
    Error,
}

/// A message shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserNotice {
    /// Severity
    pub level: NoticeLevel,
    /// Short title
    pub title: String,
    /// Body text
    pub body: String,
}

impl UserNotice {
    /// Informational notice
    pub fn info(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            title: title.into(),
            body: body.into(),
        }
    }

    /// Warning notice
    pub fn warning(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            title: title.into(),
            body: body.into(),
        }
    }

    /// Error notice
    pub fn error(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Surface notices to the user
#[async_trait]
pub trait NoticeEffects: Send + Sync {
    /// Show a notice
    async fn notify(&self, notice: UserNotice);
}

#[async_trait]
impl<T: NoticeEffects + ?Sized> NoticeEffects for std::sync::Arc<T> {
    async fn notify(&self, notice: UserNotice) {
        (**self).notify(notice).await;
    }
}
