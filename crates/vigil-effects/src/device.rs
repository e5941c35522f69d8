//! Simulated device capabilities
//!
//! Battery, haptics, SMS and notices for hosts without a phone attached.
//! Side effects are reported through `tracing` so a demo run shows what a
//! device would have done.

use async_trait::async_trait;
use vigil_core::effects::{
    BatteryEffects, HapticEffects, NoticeEffects, NoticeLevel, SmsEffects, SmsError,
    SmsSendStatus, UserNotice,
};

/// Battery reporting a fixed level (or nothing)
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticBatteryHandler {
    level: Option<f32>,
}

impl StaticBatteryHandler {
    /// Report `level` (fraction 0.0–1.0); `None` simulates an unsupported device
    pub fn new(level: Option<f32>) -> Self {
        Self { level }
    }
}

#[async_trait]
impl BatteryEffects for StaticBatteryHandler {
    async fn battery_level(&self) -> Option<f32> {
        self.level
    }
}

/// Haptics that only log
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHapticHandler;

#[async_trait]
impl HapticEffects for LoggingHapticHandler {
    async fn vibrate(&self, duration_ms: u64) {
        tracing::debug!(duration_ms, "vibrate");
    }
}

/// SMS "composer" that logs the batch instead of sending it
#[derive(Debug, Clone, Copy)]
pub struct LoggingSmsHandler {
    available: bool,
}

impl LoggingSmsHandler {
    /// Handler whose availability check returns `available`
    pub fn new(available: bool) -> Self {
        Self { available }
    }
}

impl Default for LoggingSmsHandler {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl SmsEffects for LoggingSmsHandler {
    async fn is_available(&self) -> bool {
        self.available
    }

    async fn send_batch(
        &self,
        recipients: &[String],
        body: &str,
    ) -> Result<SmsSendStatus, SmsError> {
        if !self.available {
            return Err(SmsError::Unavailable);
        }
        if recipients.is_empty() {
            return Err(SmsError::NoRecipients);
        }
        tracing::info!(recipients = ?recipients, chars = body.len(), "sms batch sent");
        Ok(SmsSendStatus::Sent)
    }
}

/// Notices routed to the log at a matching level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNoticeHandler;

#[async_trait]
impl NoticeEffects for TracingNoticeHandler {
    async fn notify(&self, notice: UserNotice) {
        match notice.level {
            NoticeLevel::Info => tracing::info!(title = %notice.title, "{}", notice.body),
            NoticeLevel::Warning => tracing::warn!(title = %notice.title, "{}", notice.body),
            NoticeLevel::Error => tracing::error!(title = %notice.title, "{}", notice.body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unavailable_sms_refuses_to_send() {
        let sms = LoggingSmsHandler::new(false);
        assert!(!sms.is_available().await);
        assert_eq!(
            sms.send_batch(&["112".to_string()], "help").await,
            Err(SmsError::Unavailable)
        );
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let sms = LoggingSmsHandler::default();
        assert_eq!(sms.send_batch(&[], "help").await, Err(SmsError::NoRecipients));
    }
}
