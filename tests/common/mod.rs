#![allow(dead_code)]

use smart_traffic_client::TrafficClient;
use wiremock::MockServer;

pub fn init_logger() {
    let _ = pretty_env_logger::try_init();
}

/// Client whose base URL mirrors the real deployment layout, `<server>/api`
pub fn client_for(server: &MockServer) -> TrafficClient {
    TrafficClient::new(&format!("{}/api", server.uri())).unwrap()
}

/// A base URL nothing listens on
pub const UNREACHABLE: &str = "http://127.0.0.1:1/api";
