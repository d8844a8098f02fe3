use crate::api::Envelope;
use crate::error::Error;
use crate::fetch::{ApiResponse, HttpClient};
use serde::Serialize;
use std::fmt::Display;

/// Location CRUD endpoints.
///
/// The demo dashboard keeps its locations in the local store instead; see
/// [`crate::locations::LocationManager`].
#[derive(Clone)]
pub struct LocationApi {
    http: HttpClient,
}

impl LocationApi {
    pub(crate) fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// `GET /api/locations`
    pub async fn list(&self) -> Result<ApiResponse<Envelope>, Error> {
        self.http.get("/api/locations")?.execute_as().await
    }

    /// `POST /api/locations`
    pub async fn create<T: Serialize + ?Sized>(
        &self,
        location: &T,
    ) -> Result<ApiResponse<Envelope>, Error> {
        self.http
            .post("/api/locations")?
            .json(location)?
            .execute_as()
            .await
    }

    /// `PUT /api/locations/:id`
    pub async fn update<T: Serialize + ?Sized>(
        &self,
        id: impl Display,
        location: &T,
    ) -> Result<ApiResponse<Envelope>, Error> {
        self.http
            .put(&format!("/api/locations/{}", id))?
            .json(location)?
            .execute_as()
            .await
    }

    /// `DELETE /api/locations/:id`
    pub async fn delete(&self, id: impl Display) -> Result<ApiResponse<Envelope>, Error> {
        self.http
            .delete(&format!("/api/locations/{}", id))?
            .execute_as()
            .await
    }
}
