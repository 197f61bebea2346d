//! Issue store backed by a JSON file.
//!
//! The file holds a JSON array of issue documents in the same loose format
//! the REST API serves. A missing or empty file is an empty store. Writes
//! go to a sibling temporary file that is then renamed over the original.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use issue_map_issue_models::{IssueReport, NewIssue, PhotoRef, SubmissionReceipt};
use tokio::sync::Mutex;

use crate::document::decode_issue_documents;
use crate::{BackendError, IssueBackend, validate_new_issue};

/// JSON file issue store.
#[derive(Debug)]
pub struct JsonFileBackend {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileBackend {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_reports(&self) -> Result<Vec<IssueReport>, BackendError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("Issue file {} does not exist yet", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let body: serde_json::Value = serde_json::from_str(&text)?;
        decode_issue_documents(&body)
    }

    async fn write_reports(&self, reports: &[IssueReport]) -> Result<(), BackendError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, serde_json::to_vec_pretty(reports)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl IssueBackend for JsonFileBackend {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch_all_issues(&self) -> Result<Vec<IssueReport>, BackendError> {
        self.read_reports().await
    }

    async fn submit_issue(&self, issue: &NewIssue) -> Result<SubmissionReceipt, BackendError> {
        validate_new_issue(issue)?;

        let _guard = self.write_lock.lock().await;
        let mut reports = self.read_reports().await?;

        let id = uuid::Uuid::new_v4().to_string();
        let photo = issue
            .photo
            .as_ref()
            .map(|p| PhotoRef(p.display().to_string()));
        let mut report = issue.to_report(photo, Utc::now());
        report.id = Some(id.clone());
        reports.push(report);

        self.write_reports(&reports).await?;
        log::info!(
            "Stored {} issue {id} in {} ({} total)",
            issue.issue_type,
            self.path.display(),
            reports.len()
        );

        Ok(SubmissionReceipt { id })
    }
}
