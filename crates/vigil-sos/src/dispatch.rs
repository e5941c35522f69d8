//! Notification fan-out
//!
//! Sends one composed alert over two independent channels:
//!
//! - **SMS**: one batched send to every resolved phone number
//! - **Chat**: append to every conversation thread the user is part of
//!
//! The channels run concurrently and neither can fail the other. Every
//! failure is folded into the returned [`DispatchResult`]; nothing is retried.

use futures::future::join_all;
use vigil_core::effects::{DocumentFilter, FanOutEffects, SmsError, SmsSendStatus};
use vigil_core::{Coordinate, UserId};

use crate::config::{DefaultContact, MessageConfig, SosConfig};
use crate::contacts::{resolve_recipients, Recipients};
use crate::error::SosError;
use crate::message::{compose_alert_message, ComposedAlert};
use crate::records::{chat_messages_collection, ChatThread, CloseFriendContact, CHATS};

/// What happened on one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelOutcome {
    /// Every target received the alert
    Delivered {
        /// Number of targets (recipients or threads)
        delivered: usize,
    },
    /// Some targets received the alert
    Partial {
        /// Targets that received it
        delivered: usize,
        /// Targets that did not
        failed: usize,
    },
    /// The channel was not attempted
    Skipped {
        /// Why it was skipped
        reason: String,
    },
    /// The channel was attempted and nothing got through
    Failed {
        /// Why it failed
        reason: String,
    },
}

impl ChannelOutcome {
    /// Whether at least one target received the alert
    pub fn reached_anyone(&self) -> bool {
        match self {
            Self::Delivered { delivered } => *delivered > 0,
            Self::Partial { delivered, .. } => *delivered > 0,
            Self::Skipped { .. } | Self::Failed { .. } => false,
        }
    }

    /// Whether the channel was skipped rather than attempted
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    /// Short label for notices and logs
    pub fn label(&self) -> String {
        match self {
            Self::Delivered { delivered } => format!("delivered ({delivered})"),
            Self::Partial { delivered, failed } => {
                format!("partial ({delivered} ok, {failed} failed)")
            }
            Self::Skipped { reason } => format!("skipped ({reason})"),
            Self::Failed { reason } => format!("failed ({reason})"),
        }
    }
}

/// Summary of one fan-out
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResult {
    /// The message that was sent
    pub alert: ComposedAlert,
    /// Phone numbers targeted by the SMS channel
    pub recipients: Recipients,
    /// SMS channel outcome
    pub sms: ChannelOutcome,
    /// Chat channel outcome
    pub chat: ChannelOutcome,
    /// Non-fatal failures folded into the outcomes above
    pub failures: Vec<SosError>,
}

impl DispatchResult {
    /// Whether the alert reached anyone on any channel
    pub fn reached_anyone(&self) -> bool {
        self.sms.reached_anyone() || self.chat.reached_anyone()
    }
}

/// Composes alerts and fans them out over SMS and chat
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    message: MessageConfig,
    default_contacts: Vec<DefaultContact>,
    sender: UserId,
}

impl NotificationDispatcher {
    /// Dispatcher sending on behalf of `sender`
    pub fn new(config: &SosConfig, sender: UserId) -> Self {
        Self {
            message: config.message.clone(),
            default_contacts: config.default_contacts.clone(),
            sender,
        }
    }

    /// Message composition settings in use
    pub fn message_config(&self) -> &MessageConfig {
        &self.message
    }

    /// Compose the alert and send it over both channels.
    ///
    /// Resolves once both channels have finished; never returns an error.
    pub async fn dispatch<E>(
        &self,
        effects: &E,
        coordinate: Coordinate,
        battery_percent: u8,
        live_share_link: Option<&str>,
        close_friends: &[CloseFriendContact],
    ) -> DispatchResult
    where
        E: FanOutEffects + ?Sized,
    {
        let alert =
            compose_alert_message(&self.message, coordinate, battery_percent, live_share_link);
        let recipients = resolve_recipients(close_friends, &self.default_contacts);

        let ((sms, sms_failure), (chat, chat_failures)) = futures::join!(
            self.send_sms(effects, &recipients, &alert.text),
            self.send_chat(effects, &alert.text),
        );

        let mut failures: Vec<SosError> = sms_failure.into_iter().collect();
        failures.extend(chat_failures);

        tracing::info!(
            sms = %sms.label(),
            chat = %chat.label(),
            recipients = recipients.numbers.len(),
            "alert dispatched"
        );

        DispatchResult {
            alert,
            recipients,
            sms,
            chat,
            failures,
        }
    }

    async fn send_sms<E>(
        &self,
        effects: &E,
        recipients: &Recipients,
        body: &str,
    ) -> (ChannelOutcome, Option<SosError>)
    where
        E: FanOutEffects + ?Sized,
    {
        if !effects.is_available().await {
            tracing::warn!("sms capability unavailable, skipping channel");
            return (
                ChannelOutcome::Skipped {
                    reason: "sms unavailable".to_string(),
                },
                Some(SosError::ChannelUnavailable("sms".to_string())),
            );
        }
        if recipients.numbers.is_empty() {
            return (
                ChannelOutcome::Skipped {
                    reason: "no recipients".to_string(),
                },
                None,
            );
        }

        match effects.send_batch(&recipients.numbers, body).await {
            Ok(SmsSendStatus::Sent) | Ok(SmsSendStatus::Unknown) => (
                ChannelOutcome::Delivered {
                    delivered: recipients.numbers.len(),
                },
                None,
            ),
            Ok(SmsSendStatus::Cancelled) => (
                ChannelOutcome::Failed {
                    reason: "sms composer dismissed".to_string(),
                },
                None,
            ),
            Err(SmsError::Unavailable) => (
                ChannelOutcome::Skipped {
                    reason: "sms unavailable".to_string(),
                },
                Some(SosError::ChannelUnavailable("sms".to_string())),
            ),
            Err(err) => {
                tracing::warn!(error = %err, "sms batch failed");
                (
                    ChannelOutcome::Failed {
                        reason: err.to_string(),
                    },
                    None,
                )
            }
        }
    }

    async fn send_chat<E>(&self, effects: &E, body: &str) -> (ChannelOutcome, Vec<SosError>)
    where
        E: FanOutEffects + ?Sized,
    {
        let filter = DocumentFilter::array_contains("participants", self.sender.as_str());
        let threads = match effects.query(CHATS, &filter).await {
            Ok(found) => found
                .iter()
                .map(|(id, doc)| ChatThread::from_document(id, doc))
                .filter(|thread| thread.reaches_someone_besides(&self.sender))
                .collect::<Vec<_>>(),
            Err(err) => {
                tracing::warn!(error = %err, "could not enumerate chat threads");
                return (
                    ChannelOutcome::Failed {
                        reason: err.to_string(),
                    },
                    Vec::new(),
                );
            }
        };
        if threads.is_empty() {
            return (
                ChannelOutcome::Skipped {
                    reason: "no conversation threads".to_string(),
                },
                Vec::new(),
            );
        }

        let results = join_all(
            threads
                .iter()
                .map(|thread| self.append_to_thread(effects, thread, body)),
        )
        .await;

        let failures: Vec<SosError> = results.into_iter().filter_map(Result::err).collect();
        let failed = failures.len();
        let delivered = threads.len() - failed;
        let outcome = match (delivered, failed) {
            (_, 0) => ChannelOutcome::Delivered { delivered },
            (0, _) => ChannelOutcome::Failed {
                reason: format!("all {failed} thread writes failed"),
            },
            _ => ChannelOutcome::Partial { delivered, failed },
        };
        (outcome, failures)
    }

    /// Append then summarise, in that order, for one thread
    async fn append_to_thread<E>(
        &self,
        effects: &E,
        thread: &ChatThread,
        body: &str,
    ) -> Result<(), SosError>
    where
        E: FanOutEffects + ?Sized,
    {
        let write_failed = |reason: String| SosError::ThreadWriteFailed {
            thread_id: thread.id.clone(),
            reason,
        };

        effects
            .add(
                &chat_messages_collection(&thread.id),
                ChatThread::message_document(&self.sender, body),
            )
            .await
            .map_err(|e| write_failed(e.to_string()))?;
        effects
            .merge(
                CHATS,
                thread.id.as_str(),
                ChatThread::summary_patch(&self.sender, body),
            )
            .await
            .map_err(|e| write_failed(e.to_string()))?;

        tracing::debug!(thread = %thread.id, "alert appended to thread");
        Ok(())
    }
}
