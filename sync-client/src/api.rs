//! Account HTTP API: signin and vault listing.
//!
//! Two JSON POST endpoints sit in front of the sync protocol:
//! `/user/signin` exchanges account credentials for an auth token, and
//! `/vault/list` enumerates the account's vaults. The server reports
//! failures both ways it knows how: an `error` member in an otherwise
//! valid body, or a non-success status. Either counts as failure.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use sync_types::VaultIdentity;

/// Default API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.vaultsync.io";

/// Account API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request itself failed.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server reported an error.
    #[error("server error: {0}")]
    Server(String),

    /// The response body did not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Client for the account endpoints.
pub struct AccountApi {
    base: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct SigninResponse {
    token: String,
}

#[derive(Deserialize)]
struct VaultListResponse {
    vaults: Vec<VaultIdentity>,
}

impl AccountApi {
    /// Client against the default API base.
    pub fn new() -> Self {
        Self::with_base(DEFAULT_API_BASE)
    }

    /// Client against a specific API base URL.
    pub fn with_base(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Exchange account credentials for an auth token.
    pub async fn signin(&self, email: &str, password: &str) -> Result<String, ApiError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let response: SigninResponse = self.post("/user/signin", &body).await?;
        Ok(response.token)
    }

    /// List the account's vaults.
    pub async fn list_vaults(&self, token: &str) -> Result<Vec<VaultIdentity>, ApiError> {
        let body = serde_json::json!({ "token": token });
        let response: VaultListResponse = self.post("/vault/list", &body).await?;
        Ok(response.vaults)
    }

    async fn post<R: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<R, ApiError> {
        let url = format!("{}{}", self.base, path);
        tracing::debug!(%url, "account api request");
        let response = self.http.post(&url).json(body).send().await?;
        let success = response.status().is_success();
        let status = response.status();
        let value: Value = response.json().await?;
        decode_body(success, status.as_u16(), value)
    }
}

impl Default for AccountApi {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_body<R: DeserializeOwned>(
    success: bool,
    status: u16,
    value: Value,
) -> Result<R, ApiError> {
    if let Some(message) = value.get("error").and_then(Value::as_str) {
        return Err(ApiError::Server(message.to_string()));
    }
    if !success {
        return Err(ApiError::Server(format!("status {status}")));
    }
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_member_wins_even_with_success_status() {
        let body = serde_json::json!({ "error": "invalid credentials" });
        let result: Result<SigninResponse, _> = decode_body(true, 200, body);
        match result {
            Err(ApiError::Server(message)) => assert_eq!(message, "invalid credentials"),
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[test]
    fn non_success_status_is_a_server_error() {
        let result: Result<SigninResponse, _> = decode_body(false, 503, serde_json::json!({}));
        assert!(matches!(result, Err(ApiError::Server(_))));
    }

    #[test]
    fn signin_response_decodes() {
        let body = serde_json::json!({ "token": "tok-123" });
        let response: SigninResponse = decode_body(true, 200, body).unwrap();
        assert_eq!(response.token, "tok-123");
    }

    #[test]
    fn vault_list_decodes_with_optional_password() {
        let body = serde_json::json!({
            "vaults": [
                {"id": "v1", "name": "Notes", "host": "sync.example.com", "salt": "s1"},
                {"id": "v2", "name": "Work", "host": "sync.example.com",
                 "password": "pw", "salt": "s2"},
            ]
        });
        let response: VaultListResponse = decode_body(true, 200, body).unwrap();
        assert_eq!(response.vaults.len(), 2);
        assert_eq!(response.vaults[0].password, "");
        assert_eq!(response.vaults[1].password, "pw");
    }

    #[test]
    fn unexpected_shape_is_malformed() {
        let result: Result<SigninResponse, _> =
            decode_body(true, 200, serde_json::json!({ "nope": 1 }));
        assert!(matches!(result, Err(ApiError::Malformed(_))));
    }
}
