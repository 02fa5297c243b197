//! # Action HTTP Client
//!
//! Thin transport for the action protocol. Responses are returned as raw JSON so callers always
//! run them through schema validation before trusting any field. Every call is a single attempt;
//! failures are surfaced to the caller.
use std::time::Duration;

use async_trait::async_trait;
use blink_common::dto::{ActionError, NextActionRequest, TransactionRequest};
#[cfg(test)]
use mockall::automock;
use reqwest::{header, Client, ClientBuilder, Response};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, trace};
use url::Url;

#[derive(Error, Debug)]
pub enum RPCError {
    /// The passed url failed to parse.
    #[error("Failed to parse URL: {0}. Error: {1}")]
    UrlParsing(String, String),

    /// The request data is not correctly formed.
    #[error("Failed to format request: {0}")]
    FormatRequest(String),

    /// Errors forwarded from the HTTP protocol.
    #[error("Unexpected HTTP client error: {0}")]
    HttpClient(String, #[source] reqwest::Error),

    /// The response from the server could not be parsed correctly.
    #[error("Failed to parse response: {0}")]
    ParseResponse(String),

    /// The server answered with a non-success status. Carries the server supplied message if
    /// there was one.
    #[error("{message}")]
    Status { status: u16, message: String },
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ActionClient: Send + Sync {
    /// Fetches the action metadata document served at `url`.
    async fn get_metadata(&self, url: &str) -> Result<Value, RPCError>;

    /// Submits a transaction request and returns the unvalidated response body.
    async fn post_transaction(
        &self,
        url: &str,
        request: &TransactionRequest,
    ) -> Result<Value, RPCError>;

    /// Follows a chained `post` link, returning the unvalidated next action metadata.
    async fn post_next_action(
        &self,
        url: &str,
        request: &NextActionRequest,
    ) -> Result<Value, RPCError>;
}

/// Configuration options for HttpActionClient
#[derive(Debug, Clone, Default)]
pub struct HttpActionClientOptions {
    /// Per request timeout, none by default
    pub timeout: Option<Duration>,
    /// Overrides the default `blink-client-<version>` user agent
    pub user_agent: Option<String>,
}

impl HttpActionClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = Some(user_agent.to_string());
        self
    }
}

#[derive(Debug, Clone)]
pub struct HttpActionClient {
    http_client: Client,
}

impl HttpActionClient {
    pub fn new(options: HttpActionClientOptions) -> Result<Self, RPCError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));
        let user_agent = options
            .user_agent
            .unwrap_or_else(|| {
                format!("blink-client-{version}", version = env!("CARGO_PKG_VERSION"))
            });
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_str(&user_agent)
                .map_err(|e| RPCError::FormatRequest(format!("Invalid user agent format: {e}")))?,
        );

        let mut builder = ClientBuilder::new().default_headers(headers);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| RPCError::HttpClient(e.to_string(), e))?;
        Ok(Self { http_client: client })
    }

    async fn make_post_request<T: Serialize + ?Sized>(
        &self,
        request: &T,
        url: &str,
    ) -> Result<Value, RPCError> {
        let url = parse_url(url)?;
        debug!(%url, "Sending POST request");
        let response = self
            .http_client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| RPCError::HttpClient(e.to_string(), e))?;
        read_json(response).await
    }
}

fn parse_url(url: &str) -> Result<Url, RPCError> {
    url.parse::<Url>()
        .map_err(|e| RPCError::UrlParsing(url.to_string(), e.to_string()))
}

/// Turns a response into its JSON body, or into a [`RPCError::Status`] for non-success codes.
async fn read_json(response: Response) -> Result<Value, RPCError> {
    let status = response.status();
    trace!(?response, "Received response");
    let body = response
        .text()
        .await
        .map_err(|e| RPCError::ParseResponse(e.to_string()))?;

    if !status.is_success() {
        let message = serde_json::from_str::<ActionError>(&body)
            .ok()
            .map(|err| err.message().to_string())
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));
        return Err(RPCError::Status { status: status.as_u16(), message });
    }

    serde_json::from_str(&body)
        .map_err(|err| RPCError::ParseResponse(format!("Error: {err}, Body: {body}")))
}

#[async_trait]
impl ActionClient for HttpActionClient {
    #[instrument(skip(self))]
    async fn get_metadata(&self, url: &str) -> Result<Value, RPCError> {
        let url = parse_url(url)?;
        debug!(%url, "Fetching action metadata");
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| RPCError::HttpClient(e.to_string(), e))?;
        read_json(response).await
    }

    #[instrument(skip(self, request))]
    async fn post_transaction(
        &self,
        url: &str,
        request: &TransactionRequest,
    ) -> Result<Value, RPCError> {
        trace!(?request, "Sending transaction request");
        self.make_post_request(request, url)
            .await
    }

    #[instrument(skip(self, request))]
    async fn post_next_action(
        &self,
        url: &str,
        request: &NextActionRequest,
    ) -> Result<Value, RPCError> {
        self.make_post_request(request, url)
            .await
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    const ACCOUNT: &str = "0x52908400098527886e0f7030069857d2e4169ee7";

    fn client() -> HttpActionClient {
        HttpActionClient::new(HttpActionClientOptions::default()).expect("create client")
    }

    #[tokio::test]
    async fn test_get_metadata() {
        let mut server = Server::new_async().await;
        let server_resp = r#"
        {
            "title": "Donate",
            "icon": "/icon.png",
            "description": "Support us",
            "actions": [{ "type": "button", "label": "Send 1", "value": "1" }]
        }
        "#;
        let mocked_server = server
            .mock("GET", "/api/actions/donate")
            .expect(1)
            .with_body(server_resp)
            .create_async()
            .await;

        let response = client()
            .get_metadata(&format!("{}/api/actions/donate", server.url()))
            .await
            .expect("get metadata");

        mocked_server.assert();
        assert_eq!(response["title"], "Donate");
    }

    #[tokio::test]
    async fn test_post_transaction_sends_request_body() {
        let mut server = Server::new_async().await;
        let request = TransactionRequest {
            account: ACCOUNT.to_string(),
            action: Some("1".to_string()),
            ..Default::default()
        };
        let mocked_server = server
            .mock("POST", "/api/actions/donate")
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(json!({ "account": ACCOUNT, "action": "1" })))
            .expect(1)
            .with_body(r#"{"transaction": {"to": "0x0", "value": "1", "data": "0x", "chainId": 1}}"#)
            .create_async()
            .await;

        let response = client()
            .post_transaction(&format!("{}/api/actions/donate", server.url()), &request)
            .await
            .expect("post transaction");

        mocked_server.assert();
        assert_eq!(response["transaction"]["chainId"], 1);
    }

    #[tokio::test]
    async fn test_error_uses_server_message() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/actions/donate")
            .with_status(400)
            .with_body(r#"{"error": {"message": "account: must be a valid address"}}"#)
            .create_async()
            .await;

        let err = client()
            .post_transaction(
                &format!("{}/api/actions/donate", server.url()),
                &TransactionRequest::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, RPCError::Status { status: 400, .. }));
        assert_eq!(err.to_string(), "account: must be a valid address");
    }

    #[tokio::test]
    async fn test_error_without_message_uses_status() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/missing")
            .with_status(404)
            .with_body("not found")
            .create_async()
            .await;

        let err = client()
            .get_metadata(&format!("{}/missing", server.url()))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Request failed with status 404");
    }

    #[tokio::test]
    async fn test_invalid_json_body() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/broken")
            .with_body("<html></html>")
            .create_async()
            .await;

        let err = client()
            .get_metadata(&format!("{}/broken", server.url()))
            .await
            .unwrap_err();

        assert!(matches!(err, RPCError::ParseResponse(_)));
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let err = client()
            .get_metadata("not a url")
            .await
            .unwrap_err();

        assert!(matches!(err, RPCError::UrlParsing(..)));
    }

    #[tokio::test]
    async fn test_post_next_action() {
        let mut server = Server::new_async().await;
        let mocked_server = server
            .mock("POST", "/api/actions/next")
            .match_body(Matcher::Json(json!({ "account": ACCOUNT, "signature": "0xabc" })))
            .with_body(r#"{"title": "Thanks"}"#)
            .create_async()
            .await;

        let response = client()
            .post_next_action(
                &format!("{}/api/actions/next", server.url()),
                &NextActionRequest { account: ACCOUNT.to_string(), signature: "0xabc".to_string() },
            )
            .await
            .expect("post next action");

        mocked_server.assert();
        assert_eq!(response, json!({ "title": "Thanks" }));
    }
}
