use crate::error::Error;
use crate::fetch::{ApiResponse, HttpClient};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `GET /api/health`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,

    #[serde(default)]
    pub timestamp: Option<String>,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub services: Map<String, Value>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Body of `GET /`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub endpoints: Map<String, Value>,
}

/// System health endpoints
#[derive(Clone)]
pub struct SystemApi {
    http: HttpClient,
}

impl SystemApi {
    pub(crate) fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// `GET /api/health`
    pub async fn health(&self) -> Result<ApiResponse<HealthStatus>, Error> {
        self.http.get("/api/health")?.execute_as().await
    }

    /// `GET /`
    pub async fn info(&self) -> Result<ApiResponse<ServiceInfo>, Error> {
        self.http.get("/")?.execute_as().await
    }
}
