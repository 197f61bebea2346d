//! REST issue API client.
//!
//! `GET {base}/api/issues` returns a JSON array of stored issue documents.
//! `POST {base}/api/issues` takes a multipart form with the fields
//! `issueType`, `description`, `latitude`, `longitude` and an optional
//! `photo` file, and answers with the inserted document ID.

use std::time::Duration;

use async_trait::async_trait;
use issue_map_issue_models::{IssueReport, NewIssue, SubmissionReceipt};
use reqwest::multipart::{Form, Part};

use crate::document::{decode_issue_documents, decode_receipt};
use crate::retry::{self, RetryPolicy, preview};
use crate::{BackendError, IssueBackend, validate_new_issue};

/// Path of the issue collection below the API base URL.
pub const ISSUES_PATH: &str = "/api/issues";

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the REST issue API.
#[derive(Debug, Clone)]
pub struct HttpIssueBackend {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl HttpIssueBackend {
    /// Creates a client for the API rooted at `base_url`
    /// (e.g. `http://localhost:3000`).
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
        })
    }

    /// Replaces the retry policy used for fetches.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn issues_url(&self) -> String {
        format!("{}{ISSUES_PATH}", self.base_url)
    }

    async fn build_form(issue: &NewIssue) -> Result<Form, BackendError> {
        let mut form = Form::new()
            .text("issueType", issue.issue_type.to_string())
            .text("description", issue.description.clone())
            .text("latitude", issue.location.latitude.to_string())
            .text("longitude", issue.location.longitude.to_string());

        if let Some(path) = &issue.photo {
            let bytes = tokio::fs::read(path).await?;
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("photo")
                .to_string();
            log::debug!("Attaching photo {} ({} bytes)", path.display(), bytes.len());
            form = form.part("photo", Part::bytes(bytes).file_name(file_name));
        }

        Ok(form)
    }
}

#[async_trait]
impl IssueBackend for HttpIssueBackend {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch_all_issues(&self) -> Result<Vec<IssueReport>, BackendError> {
        let url = self.issues_url();
        log::debug!("Fetching issues from {url}");
        let body = retry::send_json(&self.retry, || self.client.get(&url)).await?;
        decode_issue_documents(&body)
    }

    async fn submit_issue(&self, issue: &NewIssue) -> Result<SubmissionReceipt, BackendError> {
        validate_new_issue(issue)?;

        let url = self.issues_url();
        let form = Self::build_form(issue).await?;
        let response = self.client.post(&url).multipart(form).send().await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            log::warn!("Issue submission to {url} failed with HTTP {status}");
            return Err(BackendError::Status {
                status: status.as_u16(),
                message: preview(&text),
            });
        }

        let receipt = decode_receipt(&serde_json::from_str(&text)?)?;
        log::info!("Submitted {} issue as {}", issue.issue_type, receipt.id);
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use issue_map_issue_models::{GeoCoordinate, IssueType};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    use super::*;

    /// Serves one canned `(status, body)` per connection, in order, and
    /// records every raw request.
    async fn serve(responses: Vec<(u16, &'static str)>) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen = requests.clone();
        tokio::spawn(async move {
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().await.unwrap();
                let request = read_request(&mut stream).await;
                seen.lock().unwrap().push(request);
                let reply = format!(
                    "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(reply.as_bytes()).await.unwrap();
                stream.shutdown().await.unwrap();
            }
        });

        (base, requests)
    }

    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())?
                    })
                    .unwrap_or(0);
                let chunked = text[..header_end]
                    .to_ascii_lowercase()
                    .contains("transfer-encoding: chunked");
                let body_len = buf.len() - (header_end + 4);
                let done = if chunked {
                    text.ends_with("0\r\n\r\n")
                } else {
                    body_len >= content_length
                };
                if done {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn fetch_decodes_issue_array() {
        let (base, requests) = serve(vec![(
            200,
            r#"[{"_id":"1","issueType":"road","latitude":"50.1","longitude":"6.1"}]"#,
        )])
        .await;

        let backend = HttpIssueBackend::new(format!("{base}/")).unwrap();
        let reports = backend.fetch_all_issues().await.unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].issue_type, IssueType::Road);
        assert!(requests.lock().unwrap()[0].starts_with("GET /api/issues "));
    }

    #[tokio::test]
    async fn fetch_retries_server_errors() {
        let (base, requests) = serve(vec![(503, "busy"), (200, "[]")]).await;

        let backend = HttpIssueBackend::new(base)
            .unwrap()
            .with_retry_policy(fast_retry());

        assert!(backend.fetch_all_issues().await.unwrap().is_empty());
        assert_eq!(requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn fetch_does_not_retry_client_errors() {
        let (base, requests) = serve(vec![(404, "no such route")]).await;

        let backend = HttpIssueBackend::new(base)
            .unwrap()
            .with_retry_policy(fast_retry());

        match backend.fetch_all_issues().await {
            Err(BackendError::Status { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "no such route");
            }
            other => panic!("expected a status error, got {other:?}"),
        }
        assert_eq!(requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn submit_posts_multipart_form() {
        let (base, requests) = serve(vec![(201, r#"{"insertedId":"65aa"}"#)]).await;
        let backend = HttpIssueBackend::new(base).unwrap();

        let receipt = backend
            .submit_issue(&NewIssue {
                issue_type: IssueType::TrafficCongestion,
                description: "gridlock".to_string(),
                location: GeoCoordinate::new(6.5, 50.25, 0.0),
                photo: None,
            })
            .await
            .unwrap();

        assert_eq!(receipt.id, "65aa");
        let request = requests.lock().unwrap()[0].clone();
        assert!(request.starts_with("POST /api/issues "));
        assert!(request.contains("multipart/form-data"));
        assert!(request.contains("name=\"issueType\"\r\n\r\ntrafficCongestion"));
        assert!(request.contains("name=\"latitude\"\r\n\r\n50.25"));
        assert!(request.contains("name=\"longitude\"\r\n\r\n6.5"));
    }

    #[tokio::test]
    async fn submit_failure_is_not_retried() {
        let (base, requests) = serve(vec![(500, "db down")]).await;
        let backend = HttpIssueBackend::new(base)
            .unwrap()
            .with_retry_policy(fast_retry());

        let result = backend
            .submit_issue(&NewIssue {
                issue_type: IssueType::Noise,
                description: String::new(),
                location: GeoCoordinate::new(6.0, 50.0, 0.0),
                photo: None,
            })
            .await;

        assert!(matches!(result, Err(BackendError::Status { status: 500, .. })));
        assert_eq!(requests.lock().unwrap().len(), 1);
    }
}
