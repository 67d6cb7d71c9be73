//! PostgREST table client used by nightly-ritual
//!
//! A small builder over the PostgREST HTTP API exposed by the hosted datastore.
//! It covers the calls the app actually makes against its tables:
//!
//! - `select` with equality and range filters, ordering and limits
//! - `insert`, `update` and `upsert` returning the written representation
//!
//! Filters may repeat a column (`gte` and `lte` on the same timestamp), so query
//! parameters are kept in insertion order rather than in a map.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use url::Url;

/// Error body returned by PostgREST on a failed request.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct PostgrestApiErrorDetails {
    pub code: Option<String>,
    pub message: Option<String>,
    pub details: Option<String>,
    pub hint: Option<String>,
}

impl fmt::Display for PostgrestApiErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(code) = &self.code {
            parts.push(format!("Code: {}", code));
        }
        if let Some(message) = &self.message {
            parts.push(format!("Message: {}", message));
        }
        if let Some(details) = &self.details {
            parts.push(format!("Details: {}", details));
        }
        if let Some(hint) = &self.hint {
            parts.push(format!("Hint: {}", hint));
        }
        write!(f, "{}", parts.join(", "))
    }
}

#[derive(Error, Debug)]
pub enum PostgrestError {
    #[error("API error: {details} (Status: {status})")]
    ApiError {
        details: PostgrestApiErrorDetails,
        status: StatusCode,
    },

    #[error("API error (unparsed): {message} (Status: {status})")]
    UnparsedApiError { message: String, status: StatusCode },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

impl PostgrestError {
    /// HTTP status of the failed request, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            PostgrestError::ApiError { status, .. } => Some(*status),
            PostgrestError::UnparsedApiError { status, .. } => Some(*status),
            PostgrestError::NetworkError(e) => e.status(),
            _ => None,
        }
    }
}

/// Sort direction for `order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }
}

/// Query builder bound to one table.
#[derive(Debug, Clone)]
pub struct PostgrestClient {
    base_url: String,
    table: String,
    http_client: Client,
    headers: HeaderMap,
    query_params: Vec<(String, String)>,
}

impl PostgrestClient {
    /// Creates a client for `table`. Fails only when the key is not a valid header value.
    pub fn new(
        base_url: &str,
        api_key: &str,
        table: &str,
        http_client: Client,
    ) -> Result<Self, PostgrestError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key).map_err(|_| {
            PostgrestError::InvalidParameters("API key is not a valid header value".to_string())
        })?;
        headers.insert("apikey", key);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            table: table.to_string(),
            http_client,
            headers,
            query_params: Vec::new(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Result<Self, PostgrestError> {
        let header_value = HeaderValue::from_str(value).map_err(|_| {
            PostgrestError::InvalidParameters(format!("Invalid header value: {}", value))
        })?;
        let header_name = HeaderName::from_bytes(key.as_bytes()).map_err(|_| {
            PostgrestError::InvalidParameters(format!("Invalid header name: {}", key))
        })?;

        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    /// Sets the user's access token as the bearer credential.
    pub fn with_auth(self, token: &str) -> Result<Self, PostgrestError> {
        self.with_header("Authorization", &format!("Bearer {}", token))
    }

    fn set_param(mut self, key: &str, value: String) -> Self {
        self.query_params.retain(|(k, _)| k != key);
        self.query_params.push((key.to_string(), value));
        self
    }

    fn push_filter(mut self, column: &str, value: String) -> Self {
        self.query_params.push((column.to_string(), value));
        self
    }

    /// Columns to return. Replaces any previous selection.
    pub fn select(self, columns: &str) -> Self {
        self.set_param("select", columns.to_string())
    }

    pub fn eq(self, column: &str, value: &str) -> Self {
        self.push_filter(column, format!("eq.{}", value))
    }

    pub fn gte(self, column: &str, value: &str) -> Self {
        self.push_filter(column, format!("gte.{}", value))
    }

    pub fn lte(self, column: &str, value: &str) -> Self {
        self.push_filter(column, format!("lte.{}", value))
    }

    pub fn order(self, column: &str, order: SortOrder) -> Self {
        self.set_param("order", format!("{}.{}", column, order.as_str()))
    }

    pub fn limit(self, count: u32) -> Self {
        self.set_param("limit", count.to_string())
    }

    /// Column list used to resolve upsert conflicts.
    pub fn on_conflict(self, columns: &str) -> Self {
        self.set_param("on_conflict", columns.to_string())
    }

    fn build_url(&self) -> Result<Url, PostgrestError> {
        let mut url = Url::parse(&format!("{}/rest/v1/{}", self.base_url, self.table))?;
        if !self.query_params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.query_params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Runs the query and deserializes every returned row.
    pub async fn execute<T: DeserializeOwned>(&self) -> Result<Vec<T>, PostgrestError> {
        let url = self.build_url()?;
        log::debug!("GET {}", url);

        let response = self
            .http_client
            .get(url)
            .headers(self.headers.clone())
            .send()
            .await?;

        let response = check_status(response).await?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| PostgrestError::DeserializationError(e.to_string()))
    }

    /// Like `execute`, but returns only the first row.
    pub async fn maybe_single<T: DeserializeOwned>(&self) -> Result<Option<T>, PostgrestError> {
        let rows = self.execute::<T>().await?;
        Ok(rows.into_iter().next())
    }

    pub async fn insert<T: Serialize>(&self, values: T) -> Result<Value, PostgrestError> {
        self.write(Method::POST, "return=representation", &values)
            .await
    }

    pub async fn update<T: Serialize>(&self, values: T) -> Result<Value, PostgrestError> {
        self.write(Method::PATCH, "return=representation", &values)
            .await
    }

    /// Insert, merging into the existing row on conflict.
    pub async fn upsert<T: Serialize>(&self, values: T) -> Result<Value, PostgrestError> {
        self.write(
            Method::POST,
            "resolution=merge-duplicates,return=representation",
            &values,
        )
        .await
    }

    async fn write<T: Serialize>(
        &self,
        method: Method,
        prefer: &'static str,
        body: &T,
    ) -> Result<Value, PostgrestError> {
        let url = self.build_url()?;
        log::debug!("{} {}", method, url);

        let mut headers = self.headers.clone();
        headers.insert(
            HeaderName::from_static("prefer"),
            HeaderValue::from_static(prefer),
        );

        let request = self
            .http_client
            .request(method, url)
            .headers(headers)
            .json(body);

        let response = check_status(request.send().await?).await?;

        // 204 No Content and empty 201s are both legal answers
        let body_text = response.text().await.map_err(|e| {
            PostgrestError::DeserializationError(format!("Failed to read response body: {}", e))
        })?;
        if body_text.trim().is_empty() {
            Ok(Value::Null)
        } else {
            serde_json::from_str::<Value>(&body_text)
                .map_err(|e| PostgrestError::DeserializationError(e.to_string()))
        }
    }
}

async fn check_status(response: Response) -> Result<Response, PostgrestError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error response".to_string());
    log::warn!("PostgREST request failed with {}: {}", status, error_text);

    match serde_json::from_str::<PostgrestApiErrorDetails>(&error_text) {
        Ok(details) => Err(PostgrestError::ApiError { details, status }),
        Err(_) => Err(PostgrestError::UnparsedApiError {
            message: error_text,
            status,
        }),
    }
}

/// Decodes the first row of a `return=representation` write.
pub fn first_row<T: DeserializeOwned>(value: Value) -> Result<T, PostgrestError> {
    let row = match value {
        Value::Array(rows) => rows.into_iter().next().ok_or_else(|| {
            PostgrestError::DeserializationError("No row data returned".to_string())
        })?,
        obj @ Value::Object(_) => obj,
        _ => {
            return Err(PostgrestError::DeserializationError(
                "No row data returned".to_string(),
            ))
        }
    };
    serde_json::from_value(row).map_err(PostgrestError::from)
}
