use crate::api::Envelope;
use crate::error::Error;
use crate::fetch::{ApiResponse, HttpClient};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of an optimization request; no intersection means the whole system
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptimizeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intersection_id: Option<String>,
}

/// Body of an emergency declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyRequest {
    #[serde(rename = "type")]
    pub emergency_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Value>,
}

impl Default for EmergencyRequest {
    fn default() -> Self {
        Self {
            emergency_type: "general".to_string(),
            location: None,
        }
    }
}

/// Traffic management endpoints
#[derive(Clone)]
pub struct TrafficApi {
    http: HttpClient,
}

impl TrafficApi {
    pub(crate) fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// `GET /api/traffic/status`
    pub async fn status(&self) -> Result<ApiResponse<Envelope>, Error> {
        self.http.get("/api/traffic/status")?.execute_as().await
    }

    /// Same as [`TrafficApi::status`], served from the response cache when fresh
    pub async fn status_cached(&self) -> Result<ApiResponse<Envelope>, Error> {
        self.http
            .cached_get("/api/traffic/status", None)
            .await?
            .into_typed()
    }

    /// `POST /api/traffic/optimize`
    pub async fn optimize(&self, params: &OptimizeRequest) -> Result<ApiResponse<Envelope>, Error> {
        self.http
            .post("/api/traffic/optimize")?
            .json(params)?
            .execute_as()
            .await
    }

    /// `GET /api/traffic/analytics`
    pub async fn analytics(&self) -> Result<ApiResponse<Envelope>, Error> {
        self.http.get("/api/traffic/analytics")?.execute_as().await
    }

    /// `POST /api/traffic/emergency`
    pub async fn emergency(
        &self,
        request: &EmergencyRequest,
    ) -> Result<ApiResponse<Envelope>, Error> {
        self.http
            .post("/api/traffic/emergency")?
            .json(request)?
            .execute_as()
            .await
    }
}
