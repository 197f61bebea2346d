#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Issue store backends.
//!
//! Every store implements [`IssueBackend`]: fetch the full report set, and
//! submit a new report. Three implementations ship with the crate:
//!
//! - [`HttpIssueBackend`]: the REST issue API (`GET`/`POST /api/issues`).
//! - [`JsonFileBackend`]: a JSON array on disk, used by the CLI and demos.
//! - [`InMemoryIssueBackend`]: a vector behind a mutex, used in tests.
//!
//! Stored documents are loosely typed (coordinates may be strings, issue
//! types may use legacy spellings); [`document`] normalizes them into
//! [`IssueReport`]s and drops the ones that cannot be salvaged.

pub mod document;
pub mod file;
pub mod http;
pub mod memory;
mod retry;

use std::sync::Arc;

use async_trait::async_trait;
use issue_map_issue_models::{IssueReport, NewIssue, SubmissionReceipt};

pub use file::JsonFileBackend;
pub use http::HttpIssueBackend;
pub use memory::InMemoryIssueBackend;
pub use retry::RetryPolicy;

/// Errors that can occur while talking to an issue store.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body preview.
        message: String,
    },

    /// The response or stored document had an unexpected shape.
    #[error("Unexpected response: {message}")]
    Response {
        /// Description of what was wrong.
        message: String,
    },

    /// The submission was rejected before reaching the store.
    #[error("Invalid issue: {message}")]
    InvalidIssue {
        /// Description of the rejected field.
        message: String,
    },

    /// The store is not reachable.
    #[error("Backend unavailable: {message}")]
    Unavailable {
        /// Description of the outage.
        message: String,
    },
}

/// A store of issue reports.
#[async_trait]
pub trait IssueBackend: Send + Sync {
    /// Short label used in log lines.
    fn name(&self) -> &str;

    /// Fetches every stored report.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the store cannot be read.
    async fn fetch_all_issues(&self) -> Result<Vec<IssueReport>, BackendError>;

    /// Stores a new report.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the submission is invalid or the store
    /// rejects it.
    async fn submit_issue(&self, issue: &NewIssue) -> Result<SubmissionReceipt, BackendError>;
}

/// Fetches every report, treating a failed fetch as an empty set.
///
/// The failure is logged as a warning. Callers that need to distinguish
/// "no issues" from "store unreachable" should call
/// [`IssueBackend::fetch_all_issues`] directly.
pub async fn fetch_issues_or_empty(backend: &dyn IssueBackend) -> Vec<IssueReport> {
    match backend.fetch_all_issues().await {
        Ok(reports) => {
            log::debug!("{}: fetched {} issues", backend.name(), reports.len());
            reports
        }
        Err(e) => {
            log::warn!("{}: failed to fetch issues, rendering none: {e}", backend.name());
            Vec::new()
        }
    }
}

/// Checks a submission before it is sent to any store.
///
/// # Errors
///
/// Returns [`BackendError::InvalidIssue`] if the location is not a valid
/// WGS84 coordinate.
pub fn validate_new_issue(issue: &NewIssue) -> Result<(), BackendError> {
    if !issue.location.is_valid() {
        return Err(BackendError::InvalidIssue {
            message: format!(
                "location ({}, {}) is not a valid coordinate",
                issue.location.latitude, issue.location.longitude
            ),
        });
    }
    Ok(())
}

/// Opens the backend addressed by `location`.
///
/// `http://` and `https://` locations select the REST API; anything else is
/// treated as the path of a JSON issue file.
///
/// # Errors
///
/// Returns [`BackendError::Http`] if the HTTP client cannot be built.
pub fn open_backend(location: &str) -> Result<Arc<dyn IssueBackend>, BackendError> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Ok(Arc::new(HttpIssueBackend::new(location)?))
    } else {
        Ok(Arc::new(JsonFileBackend::new(location)))
    }
}
