use crate::auth::{AuthResponse, Credentials, PasswordChange, SignupForm};
use crate::error::Error;
use crate::fetch::{ApiResponse, HttpClient};
use serde_json::{json, Value};

/// Authentication endpoints
#[derive(Clone)]
pub struct AuthApi {
    http: HttpClient,
}

impl AuthApi {
    pub(crate) fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// `POST /api/auth/login`
    pub async fn login(&self, credentials: &Credentials) -> Result<ApiResponse<AuthResponse>, Error> {
        self.http
            .post("/api/auth/login")?
            .json(credentials)?
            .execute()
            .await
            .map(auth_response)
    }

    /// `POST /api/auth/register`
    pub async fn register(&self, form: &SignupForm) -> Result<ApiResponse<AuthResponse>, Error> {
        self.http
            .post("/api/auth/register")?
            .json(form)?
            .execute()
            .await
            .map(auth_response)
    }

    /// `POST /api/auth/logout`
    pub async fn logout(&self) -> Result<ApiResponse, Error> {
        self.http.post("/api/auth/logout")?.execute().await
    }

    /// `GET /api/auth/me`
    pub async fn current_user(&self) -> Result<ApiResponse<AuthResponse>, Error> {
        self.http
            .get("/api/auth/me")?
            .execute()
            .await
            .map(auth_response)
    }

    /// `POST /api/auth/forgot-password`
    pub async fn forgot_password(&self, email: &str) -> Result<ApiResponse, Error> {
        self.http
            .post("/api/auth/forgot-password")?
            .json(&json!({ "email": email }))?
            .execute()
            .await
    }

    /// `POST /api/auth/change-password`
    pub async fn change_password(&self, change: &PasswordChange) -> Result<ApiResponse, Error> {
        self.http
            .post("/api/auth/change-password")?
            .json(change)?
            .execute()
            .await
    }
}

fn auth_response(response: ApiResponse) -> ApiResponse<AuthResponse> {
    ApiResponse {
        data: AuthResponse::from_body(&response.data),
        status: response.status,
    }
}

/// Server `message` field of a response, if any
pub(crate) fn response_message(data: &Value) -> Option<String> {
    data.get("message").and_then(Value::as_str).map(str::to_string)
}
