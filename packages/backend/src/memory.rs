//! In-memory issue store.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use issue_map_issue_models::{IssueReport, NewIssue, PhotoRef, SubmissionReceipt};

use crate::{BackendError, IssueBackend, validate_new_issue};

/// Issue store held in process memory.
///
/// Can be switched into an unavailable state to exercise failure paths.
#[derive(Debug, Default)]
pub struct InMemoryIssueBackend {
    reports: Mutex<Vec<IssueReport>>,
    unavailable: AtomicBool,
    fetches: AtomicUsize,
}

impl InMemoryIssueBackend {
    #[must_use]
    pub fn new(reports: Vec<IssueReport>) -> Self {
        Self {
            reports: Mutex::new(reports),
            ..Self::default()
        }
    }

    /// Makes every subsequent call fail with [`BackendError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Snapshot of the stored reports.
    #[must_use]
    pub fn reports(&self) -> Vec<IssueReport> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of fetches served so far, including failed ones.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), BackendError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable {
                message: "in-memory store switched off".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl IssueBackend for InMemoryIssueBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch_all_issues(&self) -> Result<Vec<IssueReport>, BackendError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.reports())
    }

    async fn submit_issue(&self, issue: &NewIssue) -> Result<SubmissionReceipt, BackendError> {
        self.check_available()?;
        validate_new_issue(issue)?;

        let mut reports = self.reports.lock().unwrap_or_else(PoisonError::into_inner);
        let id = format!("mem-{}", reports.len() + 1);
        let photo = issue
            .photo
            .as_ref()
            .map(|p| PhotoRef(p.display().to_string()));
        let mut report = issue.to_report(photo, Utc::now());
        report.id = Some(id.clone());
        reports.push(report);
        drop(reports);

        Ok(SubmissionReceipt { id })
    }
}
