use risk_engine::broadcast::hub::BroadcastHub;
use serde_json::json;

#[tokio::test]
async fn subscriber_gets_connected_frame_first() {
    let hub = BroadcastHub::new(16);
    let (connected, _rx) = hub.subscribe();

    assert_eq!(connected.event, "connected");
    let data: serde_json::Value = serde_json::from_str(&connected.data).unwrap();
    assert!(data.get("ts").is_some());
}

#[tokio::test]
async fn publish_reaches_every_subscriber() {
    let hub = BroadcastHub::new(16);
    let (_, mut rx_a) = hub.subscribe();
    let (_, mut rx_b) = hub.subscribe();
    assert_eq!(hub.subscriber_count(), 2);

    hub.publish("event.received", json!({"eventId": "evt-1"}));

    let frame_a = rx_a.recv().await.unwrap();
    let frame_b = rx_b.recv().await.unwrap();
    assert_eq!(frame_a.event, "event.received");
    assert_eq!(frame_a.data, frame_b.data);
}

#[tokio::test]
async fn publish_without_subscribers_is_a_noop() {
    let hub = BroadcastHub::new(16);
    hub.publish("score.computed", json!({"totalScore": 50}));
    assert_eq!(hub.subscriber_count(), 0);
}

#[tokio::test]
async fn dropped_subscriber_deregisters_itself() {
    let hub = BroadcastHub::new(16);
    let (_, rx) = hub.subscribe();
    assert_eq!(hub.subscriber_count(), 1);
    drop(rx);
    assert_eq!(hub.subscriber_count(), 0);
}

#[tokio::test]
async fn slow_subscriber_loses_oldest_frames_only() {
    let hub = BroadcastHub::new(4);
    let (_, mut rx) = hub.subscribe();

    for i in 0..10 {
        hub.publish("event.received", json!({"seq": i}));
    }

    // The first recv reports the lag, then delivery resumes from the
    // oldest retained frame. Newer frames are never dropped.
    let lagged = rx.recv().await;
    assert!(matches!(
        lagged,
        Err(tokio::sync::broadcast::error::RecvError::Lagged(6))
    ));

    let frame = rx.recv().await.unwrap();
    let data: serde_json::Value = serde_json::from_str(&frame.data).unwrap();
    assert_eq!(data["seq"], 6);

    let mut last = None;
    while let Ok(frame) = rx.try_recv() {
        last = Some(frame);
    }
    let data: serde_json::Value = serde_json::from_str(&last.unwrap().data).unwrap();
    assert_eq!(data["seq"], 9);
}

#[tokio::test]
async fn frames_are_serialized_once_at_publish() {
    let hub = BroadcastHub::new(16);
    let (_, mut rx) = hub.subscribe();

    hub.publish("score.computed", json!({"riskLevel": "HIGH", "totalScore": 73}));

    let frame = rx.recv().await.unwrap();
    let data: serde_json::Value = serde_json::from_str(&frame.data).unwrap();
    assert_eq!(data["riskLevel"], "HIGH");
    assert_eq!(data["totalScore"], 73);
}
