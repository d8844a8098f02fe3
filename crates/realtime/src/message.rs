use serde_json::Value;

/// Event emitted once the socket is open
pub const EVENT_CONNECTED: &str = "connected";
/// Event emitted whenever the socket closes or a connection attempt fails
pub const EVENT_DISCONNECTED: &str = "disconnected";
/// Event emitted for every inbound JSON message
pub const EVENT_MESSAGE: &str = "message";
/// Event emitted on transport errors
pub const EVENT_ERROR: &str = "error";

/// Returns the `type` discriminator of an inbound message, if it carries one.
pub fn event_type(message: &Value) -> Option<&str> {
    message.get("type").and_then(Value::as_str)
}
