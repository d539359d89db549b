// Session reporting - hands the completed classification to the session backend

use crate::core::config::ScanConfig;
use crate::models::classification::ClassificationResult;
use crate::models::session::{ReportError, ReportResult, SessionContext, SessionRecord};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info};

/// Path the backend accepts completed sessions on
pub const SESSION_ENDPOINT: &str = "/start-camera";

/// Remote store for completed session records
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Submit one record, returning the backend's JSON reply
    async fn submit(&self, record: &SessionRecord) -> ReportResult<Value>;
}

/// Session backend reached over HTTP with a JSON POST
pub struct HttpSessionBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSessionBackend {
    pub fn new(base_url: &str, timeout: Duration) -> ReportResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReportError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), SESSION_ENDPOINT),
        })
    }

    pub fn from_config(config: &ScanConfig) -> ReportResult<Self> {
        Self::new(
            &config.backend_url,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SessionBackend for HttpSessionBackend {
    async fn submit(&self, record: &SessionRecord) -> ReportResult<Value> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(record)
            .send()
            .await
            .map_err(|e| ReportError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ReportError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ReportError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| ReportError::InvalidResponse(e.to_string()))
    }
}

/// Result of handing a record to the backend
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub record: SessionRecord,
    /// Backend reply when delivery succeeded
    pub response: Option<Value>,
    /// Failure description when it did not
    pub failure: Option<String>,
}

impl ReportOutcome {
    pub fn delivered(&self) -> bool {
        self.response.is_some()
    }
}

pub struct SessionReporter<B: SessionBackend> {
    backend: B,
}

impl<B: SessionBackend> SessionReporter<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Build the record and submit it once. Failures are logged, never retried.
    pub async fn report(
        &self,
        context: &SessionContext,
        result: &ClassificationResult,
    ) -> ReportOutcome {
        let record = SessionRecord::new(context, result, chrono::Utc::now());

        match self.backend.submit(&record).await {
            Ok(response) => {
                info!("Saved session {} to backend: {}", context.session_id, response);
                ReportOutcome {
                    record,
                    response: Some(response),
                    failure: None,
                }
            }
            Err(e) => {
                error!("Error saving session {}: {}", context.session_id, e);
                ReportOutcome {
                    record,
                    response: None,
                    failure: Some(e.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::classification::{BodyType, SkinTone};
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    struct RecordingBackend {
        records: Mutex<Vec<SessionRecord>>,
        fail: bool,
    }

    #[async_trait]
    impl SessionBackend for RecordingBackend {
        async fn submit(&self, record: &SessionRecord) -> ReportResult<Value> {
            self.records.lock().unwrap().push(record.clone());
            if self.fail {
                Err(ReportError::Transport("connection refused".to_string()))
            } else {
                Ok(serde_json::json!({ "message": "Camera session started" }))
            }
        }
    }

    fn sample_result() -> ClassificationResult {
        ClassificationResult {
            skin_tone: SkinTone::Light,
            body_type: BodyType::Hourglass,
            height_cm: 163.2,
        }
    }

    /// Serve one HTTP request with the given status line and body, returning the raw request
    async fn serve_once(status: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).to_string()
        });

        (format!("http://{}", addr), handle)
    }

    #[tokio::test]
    async fn test_report_success() {
        let reporter = SessionReporter::new(RecordingBackend {
            records: Mutex::new(Vec::new()),
            fail: false,
        });
        let context = SessionContext::new(Some("gala".to_string()), Some("female".to_string()));

        let outcome = reporter.report(&context, &sample_result()).await;
        assert!(outcome.delivered());
        assert_eq!(outcome.record.height_cm, "163.20");
        assert_eq!(reporter.backend().records.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_report_failure_is_not_retried() {
        let reporter = SessionReporter::new(RecordingBackend {
            records: Mutex::new(Vec::new()),
            fail: true,
        });
        let context = SessionContext::new(None, None);

        let outcome = reporter.report(&context, &sample_result()).await;
        assert!(!outcome.delivered());
        assert!(outcome.failure.unwrap().contains("connection refused"));
        assert_eq!(reporter.backend().records.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_http_backend_posts_json() {
        let (url, server) = serve_once("200 OK", r#"{"message":"Camera session started"}"#).await;
        let backend = HttpSessionBackend::new(&url, Duration::from_secs(5)).unwrap();
        assert!(backend.endpoint().ends_with("/start-camera"));

        let context = SessionContext::new(Some("gala".to_string()), Some("male".to_string()));
        let record = SessionRecord::new(&context, &sample_result(), chrono::Utc::now());
        let reply = backend.submit(&record).await.unwrap();
        assert_eq!(reply["message"], "Camera session started");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /start-camera HTTP/1.1"));
        let body = &request[request.find("\r\n\r\n").unwrap() + 4..];
        let sent: SessionRecord = serde_json::from_str(body).unwrap();
        assert_eq!(sent, record);
    }

    #[tokio::test]
    async fn test_http_backend_rejects_error_status() {
        let (url, server) = serve_once("500 Internal Server Error", r#"{"error":"boom"}"#).await;
        let backend = HttpSessionBackend::new(&url, Duration::from_secs(5)).unwrap();
        let record = SessionRecord::new(&SessionContext::new(None, None), &sample_result(), chrono::Utc::now());

        match backend.submit(&record).await {
            Err(ReportError::Rejected { status, body }) => {
                assert_eq!(status, 500);
                assert!(body.contains("boom"));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_http_backend_unreachable() {
        // Bind then drop to get a port with nothing listening
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = HttpSessionBackend::new(&format!("http://{}", addr), Duration::from_secs(2)).unwrap();
        let reporter = SessionReporter::new(backend);
        let outcome = reporter.report(&SessionContext::new(None, None), &ClassificationResult::unknown()).await;
        assert!(!outcome.delivered());
        assert_eq!(outcome.record.skin_tone, "Unknown");
        assert_eq!(outcome.record.height_cm, "0.00");
    }
}
