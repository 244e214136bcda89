use crate::frames::OutboundFrame;

/// Acknowledgement sent to the worker as the first frame of every connection.
/// Sent as: `{ "type": "connection", "isActive": true }`
pub fn ack() -> OutboundFrame {
    OutboundFrame::Connection { is_active: true }
}

/// Serialized [`ack`] frame.
pub fn ack_json() -> String {
    // A unit-like variant with one bool field cannot fail to serialize.
    ack().to_json().unwrap_or_default()
}
