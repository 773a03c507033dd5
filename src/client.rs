use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000/ask";

#[derive(Serialize)]
struct AskRequest<'a> {
    question: &'a str,
}

#[derive(Deserialize)]
struct AskResponse {
    answer: String,
}

/// Error body returned by the backend on 400/500.
#[derive(Deserialize)]
struct AskErrorBody {
    error: String,
}

/// Client for the question-answering endpoint.
#[derive(Clone, Debug)]
pub struct AskClient {
    client: Client,
    endpoint: String,
}

impl AskClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
        }
    }

    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn ask(&self, question: &str) -> Result<String> {
        tracing::debug!(endpoint = %self.endpoint, "sending question");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&AskRequest { question })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // Body is only used for diagnostics
            let detail = response
                .json::<AskErrorBody>()
                .await
                .map(|body| body.error)
                .unwrap_or_default();
            return Err(anyhow!("ask request failed with status {}: {}", status, detail));
        }

        let ask_response: AskResponse = response.json().await?;
        Ok(ask_response.answer)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    /// Serve `router` on an ephemeral port and return the `/ask` URL.
    pub(crate) async fn spawn_endpoint(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/ask", addr)
    }

    pub(crate) fn echo_router() -> Router {
        Router::new().route(
            "/ask",
            post(|Json(body): Json<Value>| async move {
                let question = body["question"].as_str().unwrap_or_default().to_string();
                Json(json!({ "answer": format!("echo: {}", question) }))
            }),
        )
    }

    pub(crate) fn failing_router() -> Router {
        Router::new().route(
            "/ask",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "An internal server error occurred: boom" })),
                )
            }),
        )
    }

    #[tokio::test]
    async fn returns_answer_on_success() {
        let endpoint = spawn_endpoint(echo_router()).await;
        let client = AskClient::new(&endpoint);

        let answer = client.ask("How spicy is it?").await.unwrap();
        assert_eq!(answer, "echo: How spicy is it?");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let endpoint = spawn_endpoint(failing_router()).await;
        let client = AskClient::new(&endpoint);

        let err = client.ask("Q").await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("500"));
        assert!(message.contains("boom"));
    }

    #[tokio::test]
    async fn malformed_body_is_an_error() {
        let router = Router::new().route(
            "/ask",
            post(|| async { Json(json!({ "reply": "wrong shape" })) }),
        );
        let endpoint = spawn_endpoint(router).await;
        let client = AskClient::new(&endpoint);

        assert!(client.ask("Q").await.is_err());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_error() {
        // Bind then drop to get a port nothing listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = AskClient::new(&format!("http://{}/ask", addr));
        assert!(client.ask("Q").await.is_err());
    }
}
