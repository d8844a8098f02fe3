//! Domain API groups: one method per backend operation
//!
//! Each group is a thin address book over [`HttpClient`]: a fixed path and
//! method per operation, with request bodies serialized as JSON.

mod auth;
mod locations;
mod system;
mod traffic;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use auth::AuthApi;
pub(crate) use auth::response_message;
pub use locations::LocationApi;
pub use system::{HealthStatus, ServiceInfo, SystemApi};
pub use traffic::{EmergencyRequest, OptimizeRequest, TrafficApi};

/// Response body shared by the traffic, location and system endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T = Value> {
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub data: Option<T>,

    #[serde(default)]
    pub timestamp: Option<String>,
}
