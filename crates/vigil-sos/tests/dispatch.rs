//! Fan-out dispatcher behaviour against the mock store and SMS

use assert_matches::assert_matches;
use serde_json::json;
use vigil_core::effects::{DocumentStoreEffects, SmsError};
use vigil_core::{Coordinate, ThreadId, UserId};
use vigil_sos::{
    ChannelOutcome, CloseFriendContact, NotificationDispatcher, RecipientSource, SosConfig,
    SosError,
};
use vigil_testkit::{seed_thread, thread_messages, MockEffects};

const HERE: Coordinate = Coordinate::new(12.9, 77.6);

fn dispatcher() -> NotificationDispatcher {
    NotificationDispatcher::new(&SosConfig::default(), UserId::new("alice"))
}

async fn effects_with_threads() -> MockEffects {
    let effects = MockEffects::deterministic();
    seed_thread(&effects, "t1", &["alice", "bob"]).await;
    seed_thread(&effects, "t2", &["carol", "alice"]).await;
    seed_thread(&effects, "t3", &["bob", "carol"]).await;
    effects
}

#[tokio::test]
async fn no_close_friends_falls_back_to_default_contacts() {
    let effects = effects_with_threads().await;
    let result = dispatcher().dispatch(&effects, HERE, 80, None, &[]).await;

    assert_eq!(result.recipients.source, RecipientSource::Defaults);
    assert_eq!(result.sms, ChannelOutcome::Delivered { delivered: 2 });

    let batches = effects.sms_batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].recipients, vec!["112".to_string(), "1091".to_string()]);
    assert_eq!(batches[0].body, result.alert.text);
}

#[tokio::test]
async fn close_friends_receive_one_batched_sms() {
    let effects = effects_with_threads().await;
    let friends = vec![
        CloseFriendContact::new("c1", "Ravi", Some("+919900000001")),
        CloseFriendContact::new("c2", "Meera", None),
        CloseFriendContact::new("c3", "Anu", Some("+919900000003")),
    ];
    let result = dispatcher().dispatch(&effects, HERE, 55, None, &friends).await;

    assert_eq!(result.recipients.source, RecipientSource::CloseFriends);
    let batches = effects.sms_batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(
        batches[0].recipients,
        vec!["+919900000001".to_string(), "+919900000003".to_string()]
    );
    assert!(batches[0].body.contains("Battery: 55%"));
}

#[tokio::test]
async fn unavailable_sms_is_skipped_and_chat_still_runs() {
    let effects = effects_with_threads().await;
    effects.set_sms_available(false);

    let result = dispatcher().dispatch(&effects, HERE, 100, None, &[]).await;

    assert_matches!(result.sms, ChannelOutcome::Skipped { .. });
    assert!(result.sms.is_skipped());
    assert_eq!(result.chat, ChannelOutcome::Delivered { delivered: 2 });
    assert!(result.reached_anyone());
    assert!(result
        .failures
        .contains(&SosError::ChannelUnavailable("sms".to_string())));
    assert!(effects.sms_batches().is_empty());
}

#[tokio::test]
async fn alert_reaches_only_threads_with_the_user() {
    let effects = effects_with_threads().await;
    let result = dispatcher().dispatch(&effects, HERE, 100, None, &[]).await;

    for thread in ["t1", "t2"] {
        let messages = thread_messages(&effects, thread).await;
        assert_eq!(messages.len(), 1, "thread {thread}");
        assert_eq!(messages[0]["text"], json!(result.alert.text));
        assert_eq!(messages[0]["senderId"], json!("alice"));
        assert_eq!(messages[0]["kind"], json!("sos"));
        assert!(messages[0]["createdAt"].is_u64());

        let summary = effects.get("chats", thread).await.unwrap().unwrap();
        assert_eq!(summary["lastMessage"], json!(result.alert.text));
        assert_eq!(summary["lastSenderId"], json!("alice"));
        assert!(summary["lastMessageAt"].is_u64());
    }
    assert!(thread_messages(&effects, "t3").await.is_empty());
}

#[tokio::test]
async fn one_failing_thread_does_not_block_the_others() {
    let effects = effects_with_threads().await;
    effects.fail_thread("t2");

    let result = dispatcher().dispatch(&effects, HERE, 100, None, &[]).await;

    assert_eq!(
        result.chat,
        ChannelOutcome::Partial {
            delivered: 1,
            failed: 1
        }
    );
    assert_eq!(thread_messages(&effects, "t1").await.len(), 1);
    assert_matches!(
        result.failures.as_slice(),
        [SosError::ThreadWriteFailed { thread_id, .. }] if *thread_id == ThreadId::new("t2")
    );
}

#[tokio::test]
async fn every_thread_failing_is_a_failed_channel() {
    let effects = effects_with_threads().await;
    effects.fail_thread("t1");
    effects.fail_thread("t2");

    let result = dispatcher().dispatch(&effects, HERE, 100, None, &[]).await;

    assert_matches!(result.chat, ChannelOutcome::Failed { .. });
    assert_eq!(result.failures.len(), 2);
    assert!(result.sms.reached_anyone());
}

#[tokio::test]
async fn user_without_threads_skips_chat() {
    let effects = MockEffects::deterministic();
    let result = dispatcher().dispatch(&effects, HERE, 100, None, &[]).await;
    assert_matches!(result.chat, ChannelOutcome::Skipped { .. });
    assert_eq!(result.sms, ChannelOutcome::Delivered { delivered: 2 });
}

#[tokio::test]
async fn thread_with_only_the_sender_is_not_written() {
    let effects = MockEffects::deterministic();
    seed_thread(&effects, "notes", &["alice"]).await;
    seed_thread(&effects, "t1", &["alice", "bob"]).await;

    let result = dispatcher().dispatch(&effects, HERE, 100, None, &[]).await;

    assert_eq!(result.chat, ChannelOutcome::Delivered { delivered: 1 });
    assert!(thread_messages(&effects, "notes").await.is_empty());
    assert_eq!(thread_messages(&effects, "t1").await.len(), 1);
}

#[tokio::test]
async fn only_solo_threads_skip_chat() {
    let effects = MockEffects::deterministic();
    seed_thread(&effects, "notes", &["alice"]).await;

    let result = dispatcher().dispatch(&effects, HERE, 100, None, &[]).await;

    assert_matches!(result.chat, ChannelOutcome::Skipped { .. });
    assert!(thread_messages(&effects, "notes").await.is_empty());
}

#[tokio::test]
async fn sms_send_error_is_a_failed_channel() {
    let effects = effects_with_threads().await;
    effects.fail_sms(SmsError::SendFailed {
        reason: "carrier".to_string(),
    });

    let result = dispatcher().dispatch(&effects, HERE, 100, None, &[]).await;

    assert_matches!(result.sms, ChannelOutcome::Failed { .. });
    assert_eq!(result.chat, ChannelOutcome::Delivered { delivered: 2 });
    assert!(result.reached_anyone());
}

#[tokio::test]
async fn live_link_is_carried_into_the_message() {
    let effects = effects_with_threads().await;
    let link = "https://vigil-live.web.app/track?session=abc";
    let result = dispatcher().dispatch(&effects, HERE, 100, Some(link), &[]).await;

    assert_eq!(result.alert.live_share_link.as_deref(), Some(link));
    assert!(result.alert.text.contains(&format!("Live location: {link}")));
    assert!(result
        .alert
        .text
        .contains("https://www.google.com/maps/search/?api=1&query=12.9,77.6"));
}
