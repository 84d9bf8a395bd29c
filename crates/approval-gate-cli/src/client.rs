// crates/approval-gate-cli/src/client.rs
// ============================================================================
// Module: HTTP Client
// Description: Thin reqwest wrapper over the approval gate HTTP surface.
// Purpose: Attach the bearer token and anti-CSRF marker header once, so
// every command module just builds a path and an optional JSON body.
// Dependencies: reqwest, serde_json
// ============================================================================

use serde_json::Value;

/// Errors talking to the approval gate service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request could not be sent, or the response body could not be
    /// read or parsed as JSON.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The server responded with a non-2xx status; `body` is its parsed
    /// JSON payload, when present.
    #[error("server responded {status}: {body}")]
    Status {
        /// HTTP status code returned.
        status: u16,
        /// Response body, or `null` when it was not valid JSON.
        body: Value,
    },
}

/// Talks to one approval gate deployment on behalf of one operator.
pub struct Client {
    /// Underlying HTTP client, reused across requests for connection pooling.
    http: reqwest::Client,
    /// Scheme and host of the target deployment, with no trailing slash.
    base_url: String,
    /// Bearer token sent with every request.
    token: String,
}

impl Client {
    /// Builds a client targeting `base_url`, authenticating as `token`.
    #[must_use]
    pub fn new(base_url: String, token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            token,
        }
    }

    /// Issues a `GET` against `path`, returning the parsed JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on a transport failure or a non-2xx status.
    pub async fn get(&self, path: &str) -> Result<Value, ClientError> {
        let response = self
            .http
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::into_body(response).await
    }

    /// Issues a mutating `POST`/`PUT` carrying the anti-CSRF marker header
    /// and `body` as JSON, returning the parsed response body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on a transport failure or a non-2xx status.
    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, ClientError> {
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
            .header("X-PuddleJumper-Request", "true")
            .json(body)
            .send()
            .await?;
        Self::into_body(response).await
    }

    async fn into_body(response: reqwest::Response) -> Result<Value, ClientError> {
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if status.is_success() {
            Ok(body)
        } else {
            Err(ClientError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}
