//! HTTP client wrapper for the Smart Traffic REST API

use std::time::Duration;

use log::{debug, error, trace};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

use crate::cache::{cache_key, TtlCache};
use crate::config::ClientOptions;
use crate::error::Error;

/// A decoded successful response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T = Value> {
    /// Parsed JSON body, or the raw text as a JSON string for non-JSON bodies
    pub data: T,
    pub status: u16,
}

impl ApiResponse<Value> {
    /// Deserialize the body into a concrete type
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<ApiResponse<T>, Error> {
        Ok(ApiResponse {
            data: serde_json::from_value(self.data)?,
            status: self.status,
        })
    }
}

/// Helper for building and executing a single request
pub struct FetchBuilder<'a> {
    client: &'a Client,
    endpoint: String,
    url: Url,
    method: Method,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
}

impl<'a> FetchBuilder<'a> {
    /// Create a new FetchBuilder
    pub fn new(client: &'a Client, endpoint: &str, url: Url, method: Method) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Self {
            client,
            endpoint: endpoint.to_string(),
            url,
            method,
            headers,
            body: None,
        }
    }

    /// Add a header to the request
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => debug!("Skipping invalid header {}", name),
        }
        self
    }

    /// Add a JSON body to the request
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, Error> {
        self.body = Some(serde_json::to_vec(body)?);
        Ok(self)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn build(&self) -> RequestBuilder {
        let mut req = self
            .client
            .request(self.method.clone(), self.url.clone())
            .headers(self.headers.clone());

        if let Some(body) = &self.body {
            req = req.body(body.clone());
        }
        req
    }

    /// Execute the request and decode the body.
    ///
    /// Fails with [`Error::Request`] when the status is not in 200-299. Every
    /// failure is logged with the endpoint before it is returned.
    pub async fn execute(self) -> Result<ApiResponse, Error> {
        trace!("{} {}", self.method, self.url);
        let result = self.send().await;
        if let Err(e) = &result {
            error!("API Request Error [{}]: {}", self.endpoint, e);
        }
        result
    }

    /// Execute the request and deserialize the body into `T`
    pub async fn execute_as<T: DeserializeOwned>(self) -> Result<ApiResponse<T>, Error> {
        let endpoint = self.endpoint.clone();
        self.execute().await?.into_typed().map_err(|e| {
            error!("API Request Error [{}]: {}", endpoint, e);
            e
        })
    }

    async fn send(&self) -> Result<ApiResponse, Error> {
        let response = self.build().send().await?;
        let status = response.status();
        let data = decode_body(response).await?;

        if !status.is_success() {
            let message = data
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string);
            return Err(Error::request(status.as_u16(), message));
        }

        Ok(ApiResponse {
            data,
            status: status.as_u16(),
        })
    }
}

/// JSON bodies are parsed, anything else is returned as a JSON string
async fn decode_body(response: Response) -> Result<Value, Error> {
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("application/json"));

    if is_json {
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    } else {
        Ok(Value::String(response.text().await?))
    }
}

/// Shared HTTP client bound to the API base URL.
///
/// Cheap to clone: the connection pool, cookie store and response cache are
/// shared between clones.
#[derive(Clone)]
pub struct HttpClient {
    base_url: Url,
    client: Client,
    cache: TtlCache<ApiResponse>,
}

impl HttpClient {
    /// Create a new HttpClient for `base_url`
    pub fn new(base_url: &str, options: &ClientOptions) -> Result<Self, Error> {
        let mut builder = Client::builder().cookie_store(options.include_credentials);
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            base_url: Url::parse(base_url)?,
            client: builder.build()?,
            cache: TtlCache::new(options.cache_ttl),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The response cache used by [`HttpClient::cached_get`]
    pub fn cache(&self) -> &TtlCache<ApiResponse> {
        &self.cache
    }

    /// Resolve an absolute API path such as `/api/health` against the base URL
    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(endpoint)?)
    }

    /// Start a request for `endpoint`
    pub fn request(&self, method: Method, endpoint: &str) -> Result<FetchBuilder<'_>, Error> {
        let url = self.endpoint_url(endpoint)?;
        Ok(FetchBuilder::new(&self.client, endpoint, url, method))
    }

    /// Create a GET request
    pub fn get(&self, endpoint: &str) -> Result<FetchBuilder<'_>, Error> {
        self.request(Method::GET, endpoint)
    }

    /// Create a POST request
    pub fn post(&self, endpoint: &str) -> Result<FetchBuilder<'_>, Error> {
        self.request(Method::POST, endpoint)
    }

    /// Create a PUT request
    pub fn put(&self, endpoint: &str) -> Result<FetchBuilder<'_>, Error> {
        self.request(Method::PUT, endpoint)
    }

    /// Create a DELETE request
    pub fn delete(&self, endpoint: &str) -> Result<FetchBuilder<'_>, Error> {
        self.request(Method::DELETE, endpoint)
    }

    /// GET `endpoint`, serving a fresh cached response when there is one.
    ///
    /// `ttl` defaults to the configured cache TTL. Nothing invalidates the
    /// cache on writes, so callers opt in per read.
    pub async fn cached_get(
        &self,
        endpoint: &str,
        ttl: Option<Duration>,
    ) -> Result<ApiResponse, Error> {
        let key = cache_key(endpoint, &json!({ "method": "GET" }));
        if let Some(cached) = self.cache.get(&key) {
            trace!("Cache hit for {}", key);
            return Ok(cached);
        }

        let response = self.get(endpoint)?.execute().await?;
        self.cache.set(
            &key,
            response.clone(),
            ttl.unwrap_or_else(|| self.cache.default_ttl()),
        );
        Ok(response)
    }
}
