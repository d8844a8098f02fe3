//! Realtime channel for the Smart Traffic Management API
//!
//! A single socket at `<api base>/ws` carrying free-form JSON. Inbound
//! messages are fanned out to listeners registered by event name: every
//! message goes to `message`, and messages with a `type` field also go to the
//! listeners of that type.

mod client;
mod error;
mod listeners;
mod message;

pub use client::{
    websocket_url, ConnectionHandle, ConnectionState, RealtimeClient, RealtimeClientOptions,
};
pub use error::RealtimeError;
pub use listeners::{Callback, ListenerId};
pub use message::{event_type, EVENT_CONNECTED, EVENT_DISCONNECTED, EVENT_ERROR, EVENT_MESSAGE};
