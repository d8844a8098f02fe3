//! Smart Traffic client library
//!
//! A Rust client for the Smart Traffic Management backend: REST endpoints,
//! session handling, a local key-value store, demo location management,
//! dashboard data feeds and the realtime WebSocket channel.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod fetch;
pub mod locations;
pub mod storage;

pub use smart_traffic_realtime as realtime;

use crate::api::{AuthApi, LocationApi, SystemApi, TrafficApi};
use crate::auth::SessionContext;
use crate::config::ClientOptions;
use crate::error::Error;
use crate::fetch::HttpClient;
use crate::locations::LocationManager;
use crate::realtime::RealtimeClient;
use crate::storage::LocalStore;

/// The main entry point for the Smart Traffic client
#[derive(Clone)]
pub struct TrafficClient {
    http: HttpClient,
    options: ClientOptions,
}

impl TrafficClient {
    /// Create a new client for the API at `base_url`
    ///
    /// # Example
    ///
    /// ```
    /// use smart_traffic_client::TrafficClient;
    ///
    /// let client = TrafficClient::new("http://localhost:5001/api").unwrap();
    /// ```
    pub fn new(base_url: &str) -> Result<Self, Error> {
        Self::new_with_options(base_url, ClientOptions::default())
    }

    /// Create a new client with custom options
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use smart_traffic_client::{TrafficClient, config::ClientOptions};
    ///
    /// let options = ClientOptions::default().with_cache_ttl(Duration::from_secs(30));
    /// let client = TrafficClient::new_with_options("http://localhost:5001/api", options).unwrap();
    /// ```
    pub fn new_with_options(base_url: &str, options: ClientOptions) -> Result<Self, Error> {
        let http = HttpClient::new(base_url, &options)?;
        Ok(Self { http, options })
    }

    /// Create a client for the URL in `SMART_TRAFFIC_API_URL`, or the local default
    pub fn from_env() -> Result<Self, Error> {
        Self::new(&config::base_url_from_env())
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// The shared request helper, for endpoints without a typed wrapper
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.http.clone())
    }

    pub fn traffic(&self) -> TrafficApi {
        TrafficApi::new(self.http.clone())
    }

    pub fn locations(&self) -> LocationApi {
        LocationApi::new(self.http.clone())
    }

    pub fn system(&self) -> SystemApi {
        SystemApi::new(self.http.clone())
    }

    /// Realtime channel at `<base>/ws`. Not connected until `connect` is called.
    pub fn realtime(&self) -> Result<RealtimeClient, Error> {
        Ok(RealtimeClient::new_with_options(
            self.http.base_url().as_str(),
            self.options.realtime.clone(),
        )?)
    }

    /// Session context persisting into `store`. Call `initialize` on it once.
    pub fn session_context(&self, store: LocalStore) -> SessionContext {
        SessionContext::new(self.auth(), store)
    }

    /// Demo locations persisted in `store`
    pub fn location_manager(&self, store: LocalStore) -> Result<LocationManager, Error> {
        LocationManager::load(store)
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::auth::{Outcome, Session, SessionContext, User};
    pub use crate::config::ClientOptions;
    pub use crate::dashboard::{spawn_feed, DashboardSource, Snapshot};
    pub use crate::error::Error;
    pub use crate::storage::LocalStore;
    pub use crate::TrafficClient;
}
