mod common;

use std::time::Duration;

use pricewatch::{
    error::ChannelError,
    models::{ChannelKind, Recipient, TriggerEvent},
    services::notifications::{Dispatcher, EmailChannel, InAppChannel, SmsChannel, WebhookChannel},
};

use common::RecordingChannel;

fn event() -> TriggerEvent {
    TriggerEvent {
        alert_id: "65f0c0ffee0000000000abcd".to_string(),
        symbol: "BTC".to_string(),
        price_at_trigger: 50_001.0,
        triggered_at: 1_700_000_000,
        condition_description: "above 50000.00".to_string(),
    }
}

fn recipient() -> Recipient {
    Recipient {
        owner_id: "65f0c0ffee0000000000ffff".to_string(),
        email: Some("trader@example.com".to_string()),
        phone: Some("+15550100".to_string()),
        webhook_url: Some("http://127.0.0.1:9/hook".to_string()),
    }
}

#[tokio::test]
async fn failing_channel_does_not_block_siblings() {
    let email = RecordingChannel::failing(ChannelKind::Email, ChannelError::Delivery("smtp down".into()));
    let sms = RecordingChannel::ok(ChannelKind::Sms);
    let webhook = RecordingChannel::ok(ChannelKind::Webhook);
    let dispatcher = Dispatcher::new(Duration::from_secs(1))
        .register(email)
        .register(sms.clone())
        .register(webhook.clone());

    let outcomes = dispatcher
        .dispatch(
            &event(),
            &[ChannelKind::Email, ChannelKind::Sms, ChannelKind::Webhook],
            &recipient(),
        )
        .await;

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].channel, ChannelKind::Email);
    assert!(!outcomes[0].success);
    assert!(outcomes[0].error.as_deref().unwrap().contains("smtp down"));
    assert!(outcomes[1].success);
    assert!(outcomes[2].success);
    assert_eq!(sms.sent().len(), 1);
    assert_eq!(webhook.sent().len(), 1);
}

#[tokio::test]
async fn slow_channel_times_out_alone() {
    let slow = RecordingChannel::slow(ChannelKind::Email, Duration::from_millis(500));
    let fast = RecordingChannel::ok(ChannelKind::Sms);
    let dispatcher = Dispatcher::new(Duration::from_millis(30))
        .register(slow)
        .register(fast.clone());

    let started = std::time::Instant::now();
    let outcomes = dispatcher
        .dispatch(&event(), &[ChannelKind::Email, ChannelKind::Sms], &recipient())
        .await;

    assert!(started.elapsed() < Duration::from_millis(400));
    assert!(!outcomes[0].success);
    assert!(outcomes[0].error.as_deref().unwrap().contains("timed out"));
    assert!(outcomes[1].success);
    assert_eq!(fast.sent().len(), 1);
}

#[tokio::test]
async fn unregistered_channel_is_reported_not_configured() {
    let dispatcher = Dispatcher::new(Duration::from_secs(1));

    let outcomes = dispatcher
        .dispatch(&event(), &[ChannelKind::Sms], &recipient())
        .await;

    assert_eq!(outcomes.len(), 1);
    assert!(!outcomes[0].success);
    assert!(outcomes[0].error.as_deref().unwrap().contains("not configured"));
}

#[tokio::test]
async fn in_app_publishes_on_event_bus() {
    let (tx, mut rx) = tokio::sync::broadcast::channel::<String>(8);
    let dispatcher = Dispatcher::new(Duration::from_secs(1)).register(std::sync::Arc::new(InAppChannel::new(tx)));

    let outcomes = dispatcher
        .dispatch(&event(), &[ChannelKind::InApp], &recipient())
        .await;

    assert!(outcomes[0].success);
    let payload: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
    assert_eq!(payload["event"], "alertTriggered");
    assert_eq!(payload["trigger"]["alert_id"], "65f0c0ffee0000000000abcd");
    assert_eq!(payload["owner_id"], "65f0c0ffee0000000000ffff");
}

#[tokio::test]
async fn in_app_without_listeners_still_succeeds() {
    let (tx, rx) = tokio::sync::broadcast::channel::<String>(8);
    drop(rx);
    let dispatcher = Dispatcher::new(Duration::from_secs(1)).register(std::sync::Arc::new(InAppChannel::new(tx)));

    let outcomes = dispatcher
        .dispatch(&event(), &[ChannelKind::InApp], &recipient())
        .await;

    assert!(outcomes[0].success);
}

#[tokio::test]
async fn address_channels_fail_without_address() {
    let dispatcher = Dispatcher::new(Duration::from_secs(1))
        .register(std::sync::Arc::new(WebhookChannel::new()))
        .register(std::sync::Arc::new(SmsChannel::new(
            "http://127.0.0.1:9/sms".into(),
            "key".into(),
            "+15550000".into(),
        )));
    let bare = Recipient {
        owner_id: "65f0c0ffee0000000000ffff".to_string(),
        ..Default::default()
    };

    let outcomes = dispatcher
        .dispatch(&event(), &[ChannelKind::Webhook, ChannelKind::Sms], &bare)
        .await;

    assert_eq!(
        outcomes[0].error.as_deref(),
        Some("recipient has no webhook address")
    );
    assert_eq!(outcomes[1].error.as_deref(), Some("recipient has no phone address"));
}

#[tokio::test]
async fn email_without_relay_url_is_not_configured() {
    let dispatcher = Dispatcher::new(Duration::from_secs(1)).register(std::sync::Arc::new(
        EmailChannel::new(String::new(), String::new(), "alerts@example.com".into()),
    ));

    let outcomes = dispatcher
        .dispatch(&event(), &[ChannelKind::Email], &recipient())
        .await;

    assert!(!outcomes[0].success);
    assert!(outcomes[0].error.as_deref().unwrap().contains("EMAIL_API_URL"));
}
