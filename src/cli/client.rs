use std::time::Duration;

use anyhow::anyhow;
use reqwest::{multipart, Client, RequestBuilder, Response};
use serde::Serialize;
use serde_json::Value;

/// Thin HTTP client for the gallery API that unwraps the response envelope
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    http: Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            base_url: base_url.into(),
            token,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get(&self, path: &str) -> anyhow::Result<Value> {
        let response = self.authorized(self.http.get(self.url(path))).send().await?;
        unwrap_envelope(response).await
    }

    pub async fn post_json<T: Serialize>(&self, path: &str, body: &T) -> anyhow::Result<Value> {
        let response = self
            .authorized(self.http.post(self.url(path)))
            .json(body)
            .send()
            .await?;
        unwrap_envelope(response).await
    }

    pub async fn post_file(&self, path: &str, file_name: String, content_type: &str, bytes: Vec<u8>) -> anyhow::Result<Value> {
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(content_type)?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .authorized(self.http.post(self.url(path)))
            .multipart(form)
            .send()
            .await?;
        unwrap_envelope(response).await
    }

    /// GET for endpoints that answer with a non-JSON body on success
    pub async fn get_text(&self, path: &str) -> anyhow::Result<String> {
        let response = self.authorized(self.http.get(self.url(path))).send().await?;
        if response.status().is_success() {
            return Ok(response.text().await?);
        }
        Err(unwrap_envelope(response).await.err().unwrap_or_else(|| anyhow!("request failed")))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

async fn unwrap_envelope(response: Response) -> anyhow::Result<Value> {
    let status = response.status();
    let body: Value = response
        .json()
        .await
        .map_err(|e| anyhow!("HTTP {}: unreadable response body: {}", status, e))?;

    if status.is_success() && body["success"] == Value::Bool(true) {
        return Ok(body["data"].clone());
    }

    let message = body["error"].as_str().unwrap_or("request failed");
    match body["code"].as_str() {
        Some(code) => Err(anyhow!("{} ({}, HTTP {})", message, code, status.as_u16())),
        None => Err(anyhow!("{} (HTTP {})", message, status.as_u16())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn success_envelope_yields_data_and_sends_bearer() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/images")
            .match_header("authorization", "Bearer tok")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":true,"data":[{"url":"http://g.test/media/a.png"}]}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), Some("tok".to_string())).unwrap();
        let data = client.get("/api/images").await.unwrap();
        assert_eq!(data, json!([{"url": "http://g.test/media/a.png"}]));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn error_envelope_reports_message_and_code() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/sign-in")
            .with_status(401)
            .with_body(r#"{"success":false,"error":"token expired","code":"auth/id-token-expired"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), None).unwrap();
        let err = client.post_json("/auth/sign-in", &json!({"id_token": "x"})).await.unwrap_err();
        assert_eq!(err.to_string(), "token expired (auth/id-token-expired, HTTP 401)");
    }

    #[tokio::test]
    async fn error_without_code_reports_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/auth/whoami")
            .with_status(404)
            .with_body(r#"{"success":false,"error":"not here"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), None).unwrap();
        let err = client.get("/api/auth/whoami").await.unwrap_err();
        assert_eq!(err.to_string(), "not here (HTTP 404)");
    }

    #[tokio::test]
    async fn non_json_error_body_is_reported_with_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(502)
            .with_header("content-type", "text/html")
            .with_body("<html>Bad Gateway</html>")
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), None).unwrap();
        let err = client.get("/health").await.unwrap_err().to_string();
        assert!(err.starts_with("HTTP 502"), "{}", err);
        assert!(err.contains("unreadable response body"), "{}", err);
    }

    #[tokio::test]
    async fn success_without_envelope_flag_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(200)
            .with_body(r#"{"status":"ok"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), None).unwrap();
        let err = client.get("/health").await.unwrap_err();
        assert_eq!(err.to_string(), "request failed (HTTP 200)");
    }

    #[tokio::test]
    async fn get_text_returns_html_or_maps_the_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/gallery")
            .match_header("authorization", "Bearer good")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<div class=\"gallery\"></div>")
            .create_async()
            .await;
        server
            .mock("GET", "/api/gallery")
            .match_header("authorization", "Bearer stale")
            .with_status(401)
            .with_body(r#"{"success":false,"error":"Invalid session token","code":"UNAUTHORIZED"}"#)
            .create_async()
            .await;

        let good = ApiClient::new(server.url(), Some("good".to_string())).unwrap();
        assert_eq!(good.get_text("/api/gallery").await.unwrap(), "<div class=\"gallery\"></div>");

        let stale = ApiClient::new(server.url(), Some("stale".to_string())).unwrap();
        let err = stale.get_text("/api/gallery").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid session token (UNAUTHORIZED, HTTP 401)");
    }
}
