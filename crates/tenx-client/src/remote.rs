//! HTTP client for the chat log API.

use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::StatusCode;
use tenx_core::constants::USER_ID_HEADER;
use tenx_core::{ChatId, ChatLog, ChatLogPage, ChatLogPayload, UserId};

use crate::errors::{Result, SyncError};

/// Remote chat log operations, scoped to one principal.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatLogRemote: Send + Sync {
    /// Fetch one log. `Ok(None)` when the server answers 404.
    async fn get(&self, chat_id: &ChatId) -> Result<Option<ChatLog>>;

    /// Create a log.
    async fn create(&self, payload: &ChatLogPayload) -> Result<ChatLog>;

    /// Patch a log.
    async fn patch(&self, chat_id: &ChatId, payload: &ChatLogPayload) -> Result<ChatLog>;

    /// Delete a log. `Ok(false)` when it did not exist.
    async fn delete(&self, chat_id: &ChatId) -> Result<bool>;

    /// One page of logs, newest first.
    async fn list(&self, limit: u32, offset: u32) -> Result<ChatLogPage>;
}

/// [`ChatLogRemote`] over HTTP, sending the principal in the `user-id`
/// header.
#[derive(Clone, Debug)]
pub struct HttpChatLogClient {
    http: reqwest::Client,
    base_url: String,
    user_id: UserId,
}

impl HttpChatLogClient {
    /// Client for `base_url` acting as `user_id`.
    pub fn new(base_url: &str, user_id: UserId, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            user_id,
        })
    }

    /// Principal this client acts as.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/chat-logs{path}", self.base_url)
    }

    /// Path of one log, with the id escaped as a single segment.
    fn item_path(chat_id: &ChatId) -> String {
        format!("/{}", utf8_percent_encode(chat_id.as_str(), NON_ALPHANUMERIC))
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, self.url(path))
            .header(USER_ID_HEADER, self.user_id.as_str())
    }
}

async fn error_for_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(SyncError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl ChatLogRemote for HttpChatLogClient {
    async fn get(&self, chat_id: &ChatId) -> Result<Option<ChatLog>> {
        let resp = self
            .request(reqwest::Method::GET, &Self::item_path(chat_id))
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = error_for_status(resp).await?;
        Ok(Some(resp.json().await?))
    }

    async fn create(&self, payload: &ChatLogPayload) -> Result<ChatLog> {
        let resp = self
            .request(reqwest::Method::POST, "")
            .json(payload)
            .send()
            .await?;
        Ok(error_for_status(resp).await?.json().await?)
    }

    async fn patch(&self, chat_id: &ChatId, payload: &ChatLogPayload) -> Result<ChatLog> {
        let resp = self
            .request(reqwest::Method::PATCH, &Self::item_path(chat_id))
            .json(payload)
            .send()
            .await?;
        Ok(error_for_status(resp).await?.json().await?)
    }

    async fn delete(&self, chat_id: &ChatId) -> Result<bool> {
        let resp = self
            .request(reqwest::Method::DELETE, &Self::item_path(chat_id))
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        let _ = error_for_status(resp).await?;
        Ok(true)
    }

    async fn list(&self, limit: u32, offset: u32) -> Result<ChatLogPage> {
        let resp = self
            .request(reqwest::Method::GET, "")
            .query(&[("limit", limit), ("offset", offset)])
            .send()
            .await?;
        Ok(error_for_status(resp).await?.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn log_json(chat_id: &str) -> serde_json::Value {
        json!({
            "chatId": chat_id,
            "userId": "u1",
            "modelId": "gpt-4o-mini",
            "topic": "t",
            "messages": [],
            "tokenUsage": {"promptTokens": 0, "completionTokens": 0, "totalTokens": 0},
            "cost": 0,
            "createdAt": "2024-05-01T10:00:00Z"
        })
    }

    fn client(server: &MockServer) -> HttpChatLogClient {
        HttpChatLogClient::new(&server.uri(), "u1".into(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn get_sends_principal_and_maps_404() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/chat-logs/missing"))
            .and(header("user-id", "u1"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "nf"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/chat-logs/c1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(log_json("c1")))
            .mount(&server)
            .await;

        let c = client(&server);
        assert!(c.get(&"missing".into()).await.unwrap().is_none());
        assert_eq!(c.get(&"c1".into()).await.unwrap().unwrap().chat_id.as_str(), "c1");
    }

    #[tokio::test]
    async fn server_error_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client(&server)
            .patch(&"c1".into(), &ChatLogPayload::default())
            .await
            .unwrap_err();
        assert_matches!(err, SyncError::Status { status: 500, .. });
    }

    #[tokio::test]
    async fn list_passes_paging() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/chat-logs"))
            .and(query_param("limit", "50"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "chatLogs": [log_json("c1")],
                "pagination": {"total": 1, "offset": 0, "limit": 50}
            })))
            .mount(&server)
            .await;

        let page = client(&server).list(50, 0).await.unwrap();
        assert_eq!(page.chat_logs.len(), 1);
        assert_eq!(page.pagination.total, 1);
    }

    #[tokio::test]
    async fn delete_reports_absence() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/chat-logs/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        assert!(!client(&server).delete(&"gone".into()).await.unwrap());
    }

    #[tokio::test]
    async fn chat_id_is_escaped_as_one_segment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/chat-logs/a%2Fb"))
            .respond_with(ResponseTemplate::new(200).set_body_json(log_json("a/b")))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/chat-logs/x%3Fy%23z"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let c = client(&server);
        let log = c.get(&"a/b".into()).await.unwrap().unwrap();
        assert_eq!(log.chat_id.as_str(), "a/b");
        assert!(c.delete(&"x?y#z".into()).await.unwrap());
    }
}
