//! WebDriver endpoint client
//!
//! Implements the handful of W3C WebDriver commands the browser fixture needs.
//! Failures are reported as transport errors and never retried.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::browser::{Cookie, RemoteEndpoint, SessionOptions};
use fixturekit_common::{FixtureError, FixtureResult};

/// HTTP client for a remote WebDriver endpoint
#[derive(Debug, Clone)]
pub struct WebDriverClient {
    base_url: String,
    client: reqwest::Client,
}

/// Readiness reported by `GET /status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointStatus {
    pub ready: bool,
    #[serde(default)]
    pub message: String,
}

impl WebDriverClient {
    pub fn new(base_url: &str) -> FixtureResult<Self> {
        let client = reqwest::Client::builder().build().map_err(transport)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Query endpoint readiness
    pub async fn status(&self) -> FixtureResult<EndpointStatus> {
        let resp = self
            .client
            .get(self.url("/status"))
            .send()
            .await
            .map_err(transport)?;
        let body = read_body(resp).await?;
        let value = body.get("value").cloned().unwrap_or(body);
        serde_json::from_value(value).map_err(|e| FixtureError::transport(format!("malformed status: {}", e)))
    }
}

#[async_trait]
impl RemoteEndpoint for WebDriverClient {
    async fn open_session(&self, options: &SessionOptions) -> FixtureResult<String> {
        // Session creation is the only call bounded by timeouts
        let client = reqwest::Client::builder()
            .connect_timeout(options.connect_timeout)
            .timeout(options.request_timeout)
            .build()
            .map_err(transport)?;

        let payload = json!({
            "capabilities": { "alwaysMatch": options.capabilities },
            "desiredCapabilities": options.capabilities,
        });

        debug!("Opening session at {}", self.base_url);
        let resp = client
            .post(self.url("/session"))
            .json(&payload)
            .send()
            .await
            .map_err(transport)?;
        let body = read_body(resp).await?;

        // W3C responses nest the id under `value`; legacy ones keep it at the top level
        let session_id = body
            .pointer("/value/sessionId")
            .or_else(|| body.get("sessionId"))
            .and_then(Value::as_str)
            .ok_or_else(|| FixtureError::transport("new session response carried no sessionId"))?;

        info!("WebDriver session {} created", session_id);
        Ok(session_id.to_string())
    }

    async fn quit_session(&self, session_id: &str) -> FixtureResult<()> {
        let resp = self
            .client
            .delete(self.url(&format!("/session/{}", session_id)))
            .send()
            .await
            .map_err(transport)?;
        read_body(resp).await?;
        Ok(())
    }

    async fn list_cookies(&self, session_id: &str) -> FixtureResult<Vec<Cookie>> {
        let resp = self
            .client
            .get(self.url(&format!("/session/{}/cookie", session_id)))
            .send()
            .await
            .map_err(transport)?;
        let body = read_body(resp).await?;
        let cookies = body.get("value").cloned().unwrap_or(Value::Array(Vec::new()));
        serde_json::from_value(cookies).map_err(|e| FixtureError::transport(format!("malformed cookies: {}", e)))
    }

    async fn delete_all_cookies(&self, session_id: &str) -> FixtureResult<()> {
        let resp = self
            .client
            .delete(self.url(&format!("/session/{}/cookie", session_id)))
            .send()
            .await
            .map_err(transport)?;
        read_body(resp).await?;
        Ok(())
    }
}

fn transport(e: reqwest::Error) -> FixtureError {
    FixtureError::transport(e.to_string())
}

/// Read a JSON body, turning HTTP and WebDriver errors into transport errors
async fn read_body(resp: reqwest::Response) -> FixtureResult<Value> {
    let status = resp.status();
    let text = resp.text().await.map_err(transport)?;
    let body: Value = if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };

    if !status.is_success() {
        let error = body.pointer("/value/error").and_then(Value::as_str).unwrap_or("unknown error");
        let message = body.pointer("/value/message").and_then(Value::as_str).unwrap_or("");
        return Err(FixtureError::transport(format!("HTTP {}: {} {}", status, error, message).trim_end().to_string()));
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_open_session_w3c_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/session"))
            .and(body_partial_json(json!({
                "capabilities": { "alwaysMatch": { "browserName": "firefox" } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": { "sessionId": "abc123", "capabilities": {} }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = WebDriverClient::new(&format!("{}/", server.uri())).unwrap();
        let id = client.open_session(&SessionOptions::default()).await.unwrap();
        assert_eq!(id, "abc123");
    }

    #[tokio::test]
    async fn test_open_session_legacy_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sessionId": "legacy-1", "status": 0, "value": {}
            })))
            .mount(&server)
            .await;

        let client = WebDriverClient::new(&server.uri()).unwrap();
        assert_eq!(client.open_session(&SessionOptions::default()).await.unwrap(), "legacy-1");
    }

    #[tokio::test]
    async fn test_endpoint_error_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/session"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "value": { "error": "session not created", "message": "no free slots" }
            })))
            .mount(&server)
            .await;

        let client = WebDriverClient::new(&server.uri()).unwrap();
        let err = client.open_session(&SessionOptions::default()).await.unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().contains("session not created"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let client = WebDriverClient::new("http://127.0.0.1:9").unwrap();
        let options = SessionOptions {
            connect_timeout: std::time::Duration::from_millis(200),
            request_timeout: std::time::Duration::from_millis(500),
            ..Default::default()
        };
        let err = client.open_session(&options).await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_cookie_commands() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/session/s1/cookie"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [
                    { "name": "PHPSESSID", "value": "xyz", "path": "/", "httpOnly": true }
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/session/s1/cookie"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": null })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/session/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": null })))
            .expect(1)
            .mount(&server)
            .await;

        let client = WebDriverClient::new(&server.uri()).unwrap();
        let cookies = client.list_cookies("s1").await.unwrap();
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name, "PHPSESSID");
        assert_eq!(cookies[0].http_only, Some(true));

        client.delete_all_cookies("s1").await.unwrap();
        client.quit_session("s1").await.unwrap();
    }

    #[tokio::test]
    async fn test_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": { "ready": true, "message": "Selenium Grid ready." }
            })))
            .mount(&server)
            .await;

        let client = WebDriverClient::new(&server.uri()).unwrap();
        let status = client.status().await.unwrap();
        assert!(status.ready);
        assert_eq!(status.message, "Selenium Grid ready.");
    }
}
