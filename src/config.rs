//! Configuration options for the Smart Traffic client

use std::time::Duration;

use smart_traffic_realtime::RealtimeClientOptions;

/// Base URL used when none is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:5001/api";

/// Environment variable that overrides [`DEFAULT_BASE_URL`]
pub const BASE_URL_ENV: &str = "SMART_TRAFFIC_API_URL";

/// Default time-to-live for cached responses
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Read the API base URL from the environment, falling back to the default
pub fn base_url_from_env() -> String {
    std::env::var(BASE_URL_ENV)
        .ok()
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}

/// Configuration options for the Smart Traffic client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Send and store cookies so the backend session survives between calls
    pub include_credentials: bool,

    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// Time-to-live for responses fetched through the cached-request wrapper
    pub cache_ttl: Duration,

    /// Reconnect behaviour of the realtime channel
    pub realtime: RealtimeClientOptions,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            include_credentials: true,
            request_timeout: Some(Duration::from_secs(10)),
            cache_ttl: DEFAULT_CACHE_TTL,
            realtime: RealtimeClientOptions::default(),
        }
    }
}

impl ClientOptions {
    /// Set whether cookies are sent with every request
    pub fn with_include_credentials(mut self, value: bool) -> Self {
        self.include_credentials = value;
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the default cache time-to-live
    pub fn with_cache_ttl(mut self, value: Duration) -> Self {
        self.cache_ttl = value;
        self
    }

    /// Set the realtime reconnect options
    pub fn with_realtime(mut self, value: RealtimeClientOptions) -> Self {
        self.realtime = value;
        self
    }
}
