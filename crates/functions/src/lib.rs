//! Edge Functions client for nightly-ritual
//!
//! Invokes hosted functions under `/functions/v1/<name>` and decodes their
//! JSON answers. The app uses it for payment-intent creation.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use url::Url;

/// Structured error body a function may return.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FunctionErrorDetails {
    pub message: Option<String>,
    pub error: Option<String>,
    pub code: Option<String>,
}

impl FunctionErrorDetails {
    fn summary(&self) -> Option<String> {
        self.message.clone().or_else(|| self.error.clone())
    }
}

#[derive(Debug, Error)]
pub enum FunctionsError {
    #[error("Request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Function error (status {status}): {message}")]
    FunctionError {
        status: u16,
        message: String,
        details: Option<FunctionErrorDetails>,
    },
}

pub type Result<T> = std::result::Result<T, FunctionsError>;

#[derive(Debug, Clone, Default)]
pub struct FunctionOptions {
    /// Bearer token for the call; the anon key is used when absent.
    pub access_token: Option<String>,
    pub headers: Option<HashMap<String, String>>,
}

pub struct FunctionsClient {
    base_url: String,
    api_key: String,
    http_client: Client,
}

impl FunctionsClient {
    pub fn new(supabase_url: &str, supabase_key: &str, http_client: Client) -> Self {
        Self {
            base_url: supabase_url.to_string(),
            api_key: supabase_key.to_string(),
            http_client,
        }
    }

    fn function_url(&self, function_name: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| FunctionsError::UrlError(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push("functions")
            .push("v1")
            .push(function_name);
        Ok(url)
    }

    /// Invokes `function_name` with an optional JSON body and decodes the answer as `T`.
    pub async fn invoke<T, B>(
        &self,
        function_name: &str,
        body: Option<B>,
        options: Option<FunctionOptions>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let url = self.function_url(function_name)?;
        let opts = options.unwrap_or_default();
        let token = opts.access_token.as_deref().unwrap_or(&self.api_key);

        let mut request = self
            .http_client
            .post(url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", token));

        if let Some(headers) = opts.headers {
            for (key, value) in headers {
                request = request.header(key, value);
            }
        }

        if let Some(body_data) = body {
            request = request.json(&body_data);
        }

        log::debug!("invoking edge function {}", function_name);
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await?;
            let details = serde_json::from_str::<FunctionErrorDetails>(&error_text).ok();
            let message = details
                .as_ref()
                .and_then(FunctionErrorDetails::summary)
                .unwrap_or(error_text);
            log::warn!("edge function {} failed with {}: {}", function_name, status, message);
            return Err(FunctionsError::FunctionError {
                status: status.as_u16(),
                message,
                details,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Deserialize, Debug, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct IntentResponse {
        client_secret: String,
    }

    #[tokio::test]
    async fn test_invoke_json_success() {
        let server = MockServer::start().await;
        let client = FunctionsClient::new(&server.uri(), "fake-api-key", Client::new());

        Mock::given(method("POST"))
            .and(path("/functions/v1/create-payment-intent"))
            .and(header("apikey", "fake-api-key"))
            .and(header("Authorization", "Bearer user-token"))
            .and(body_json(json!({ "amount": 500 })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "clientSecret": "pi_secret" })),
            )
            .mount(&server)
            .await;

        let options = FunctionOptions {
            access_token: Some("user-token".to_string()),
            ..Default::default()
        };
        let result = client
            .invoke::<IntentResponse, _>(
                "create-payment-intent",
                Some(json!({ "amount": 500 })),
                Some(options),
            )
            .await;

        assert_eq!(
            result.unwrap(),
            IntentResponse {
                client_secret: "pi_secret".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_invoke_error_with_details() {
        let server = MockServer::start().await;
        let client = FunctionsClient::new(&server.uri(), "fake-api-key", Client::new());

        Mock::given(method("POST"))
            .and(path("/functions/v1/create-payment-intent"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({ "error": "Invalid amount" })),
            )
            .mount(&server)
            .await;

        let result = client
            .invoke::<Value, Value>("create-payment-intent", Some(json!({})), None)
            .await;

        match result.err().unwrap() {
            FunctionsError::FunctionError {
                status,
                message,
                details,
            } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid amount");
                assert!(details.is_some());
            }
            other => panic!("Expected FunctionError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invoke_error_status_only() {
        let server = MockServer::start().await;
        let client = FunctionsClient::new(&server.uri(), "fake-api-key", Client::new());

        Mock::given(method("POST"))
            .and(path("/functions/v1/broken"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .mount(&server)
            .await;

        let result = client.invoke::<Value, Value>("broken", None, None).await;

        match result.err().unwrap() {
            FunctionsError::FunctionError {
                status,
                message,
                details,
            } => {
                assert_eq!(status, 500);
                assert_eq!(message, "Internal Server Error");
                assert!(details.is_none());
            }
            other => panic!("Expected FunctionError, got {:?}", other),
        }
    }
}
