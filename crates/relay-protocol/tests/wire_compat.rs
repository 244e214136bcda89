// Verify wire format matches what the worker extension sends and expects.
// These tests ensure protocol compatibility is never broken.

use relay_protocol::frames::{OutboundFrame, WorkerCommand, WorkerEvent};
use relay_protocol::handshake;

#[test]
fn handshake_ack_shape() {
    let json = handshake::ack_json();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value, serde_json::json!({"type": "connection", "isActive": true}));
}

#[test]
fn message_event_parses() {
    let json = r#"{"type":"event","eventName":"message","channelId":"42",
        "data":{"taskId":"t-1","action":"updated",
        "message":{"ts":1,"type":"say","say":"completion_result","text":"done","partial":true}}}"#;
    let event = WorkerEvent::parse(json).unwrap();

    assert!(event.is_message());
    assert_eq!(event.channel_id(), Some("42"));
    assert_eq!(event.task_id(), Some("t-1"));
    assert!(event.is_partial());

    let msg = event.message().unwrap();
    assert_eq!(msg.say.as_deref(), Some("completion_result"));
    assert_eq!(msg.text(), "done");
    // unknown message fields are kept, not rejected
    assert!(msg.extra.contains_key("ts"));
}

#[test]
fn numeric_channel_id_is_normalised() {
    let json = r#"{"type":"event","eventName":"message","channelId":1234567890123,"data":{}}"#;
    let event = WorkerEvent::parse(json).unwrap();
    assert_eq!(event.channel_id(), Some("1234567890123"));
}

#[test]
fn missing_partial_means_final() {
    let json = r#"{"type":"event","eventName":"message","data":{"taskId":"t","message":{"say":"completion_result","text":"x"}}}"#;
    let event = WorkerEvent::parse(json).unwrap();
    assert!(!event.is_partial());
    assert_eq!(event.channel_id(), None);
}

#[test]
fn non_message_frames_still_parse() {
    let json = r#"{"type":"event","eventName":"taskCompleted","data":{"taskId":"t","usage":{"totalCost":0.1}}}"#;
    let event = WorkerEvent::parse(json).unwrap();
    assert!(!event.is_message());
    assert!(event.message().is_none());
}

#[test]
fn malformed_json_is_an_error() {
    assert!(WorkerEvent::parse("{not json").is_err());
    assert!(WorkerEvent::parse(r#"{"eventName":"message"}"#).is_err(), "type is required");
}

#[test]
fn outbound_message_serialization() {
    let frame = OutboundFrame::message("42", "hello");
    let json = frame.to_json().unwrap();

    assert!(json.contains(r#""type":"message""#));
    assert!(json.contains(r#""content":"hello""#));
    assert!(json.contains(r#""channelId":"42""#));
    // advisory flag must be absent unless set
    assert!(!json.contains("new_task"));
}

#[test]
fn outbound_message_with_new_task_flag() {
    let frame = OutboundFrame::Message {
        content: "hi".into(),
        channel_id: "7".into(),
        new_task: Some(true),
    };
    let json = frame.to_json().unwrap();
    assert!(json.contains(r#""new_task":true"#));
}

#[test]
fn outbound_new_command_serialization() {
    let frame = OutboundFrame::command("42", WorkerCommand::New);
    let value: serde_json::Value = serde_json::from_str(&frame.to_json().unwrap()).unwrap();
    assert_eq!(
        value,
        serde_json::json!({"type": "command", "command": "new", "channelId": "42"})
    );
}
