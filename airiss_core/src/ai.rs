use std::time::Duration;

use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::warn;

use crate::{CoreError, FeedbackProvider};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

const SYSTEM_PROMPT: &str = "You are an experienced HR evaluation analyst. You read the written \
evaluation comments for one employee and reply with a short structured note under the headings \
Strengths, Development Areas and Suggested Actions. Be specific, fair and concise, and answer in \
the language the comments are written in.";

/// Feedback provider backed by an OpenAI-compatible chat-completions API.
pub struct AIAnalyzer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    max_retry: Duration,
}

impl AIAnalyzer {
    pub fn new(api_key: String) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CoreError::Ai(e.to_string()))?;
        Ok(Self {
            client,
            api_key,
            model: DEFAULT_MODEL.to_string(),
            endpoint: CHAT_COMPLETIONS_URL.to_string(),
            max_retry: Duration::from_secs(60),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn payload(&self, subject: &str, comments: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": format!("Employee: {subject}\n\nEvaluation comments:\n{comments}")
                }
            ],
            "temperature": 0.3,
            "max_tokens": 600
        })
    }

    async fn request(&self, payload: &Value) -> Result<String, backoff::Error<CoreError>> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| backoff::Error::transient(CoreError::Ai(e.to_string())))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(backoff::Error::transient(CoreError::Ai(format!(
                "server answered {status}"
            ))));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(backoff::Error::permanent(CoreError::Ai(format!(
                "server answered {status}: {body}"
            ))));
        }

        let result: Value = response
            .json()
            .await
            .map_err(|e| backoff::Error::permanent(CoreError::Ai(e.to_string())))?;
        extract_content(&result).map_err(backoff::Error::permanent)
    }
}

#[async_trait]
impl FeedbackProvider for AIAnalyzer {
    async fn feedback(&self, subject: &str, comments: &str) -> Result<String, CoreError> {
        let payload = self.payload(subject, comments);
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(self.max_retry),
            ..ExponentialBackoff::default()
        };

        retry(backoff, || async {
            self.request(&payload).await.map_err(|e| {
                if let backoff::Error::Transient { err, .. } = &e {
                    warn!(error = %err, "feedback request failed, retrying");
                }
                e
            })
        })
        .await
    }
}

fn extract_content(result: &Value) -> Result<String, CoreError> {
    result["choices"][0]["message"]["content"]
        .as_str()
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or_else(|| CoreError::Ai("response contained no message content".to_string()))
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    use super::*;

    /// Serves one canned HTTP response on a local port and returns its URL.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\n\
                 content-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });
        format!("http://{addr}/v1/chat/completions")
    }

    async fn read_request(socket: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return;
                }
            }
        }
    }

    fn analyzer(endpoint: String) -> AIAnalyzer {
        AIAnalyzer::new("sk-test".into()).unwrap().with_endpoint(endpoint)
    }

    #[tokio::test]
    async fn client_errors_are_permanent() {
        let ai = analyzer(serve_once("400 Bad Request", r#"{"error":"bad model"}"#).await);
        let err = ai.request(&ai.payload("Kim", "opinion: ok")).await.unwrap_err();
        match err {
            backoff::Error::Permanent(CoreError::Ai(message)) => {
                assert!(message.contains("400"), "{message}");
                assert!(message.contains("bad model"), "{message}");
            }
            other => panic!("expected a permanent error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_errors_and_throttling_are_transient() {
        for status_line in ["503 Service Unavailable", "429 Too Many Requests"] {
            let ai = analyzer(serve_once(status_line, "{}").await);
            let err = ai.request(&ai.payload("Kim", "opinion: ok")).await.unwrap_err();
            assert!(
                matches!(err, backoff::Error::Transient { .. }),
                "{status_line}: {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn refused_connection_is_transient() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let ai = analyzer(format!("http://{addr}/v1/chat/completions"));
        let err = ai.request(&ai.payload("Kim", "opinion: ok")).await.unwrap_err();
        assert!(matches!(err, backoff::Error::Transient { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn success_returns_message_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Strengths: steady"}}]}"#;
        let ai = analyzer(serve_once("200 OK", body).await);
        assert_eq!(ai.feedback("Kim", "opinion: ok").await.unwrap(), "Strengths: steady");
    }

    #[tokio::test]
    async fn permanent_failure_surfaces_from_feedback() {
        let ai = analyzer(serve_once("401 Unauthorized", r#"{"error":"bad key"}"#).await);
        let err = ai.feedback("Kim", "opinion: ok").await.unwrap_err();
        assert!(matches!(err, CoreError::Ai(_)));
    }

    #[test]
    fn extracts_first_choice() {
        let value = json!({
            "choices": [{ "message": { "role": "assistant", "content": "  Strengths: ...\n" } }]
        });
        assert_eq!(extract_content(&value).unwrap(), "Strengths: ...");
    }

    #[test]
    fn missing_content_is_an_error() {
        assert!(extract_content(&json!({ "choices": [] })).is_err());
        assert!(extract_content(&json!({
            "choices": [{ "message": { "content": "   " } }]
        }))
        .is_err());
    }

    #[test]
    fn payload_carries_model_and_comments() {
        let analyzer = AIAnalyzer::new("sk-test".into()).unwrap().with_model("test-model");
        let payload = analyzer.payload("Kim", "opinion: Reliable");
        assert_eq!(payload["model"], "test-model");
        let user = payload["messages"][1]["content"].as_str().unwrap();
        assert!(user.contains("Kim"));
        assert!(user.contains("opinion: Reliable"));
    }
}
