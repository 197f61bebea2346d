//! Normalization of stored issue documents.
//!
//! The issue store is schemaless. Documents written by different client
//! versions disagree on coordinate types (`50.1` vs `"50.1"`), ID shape
//! (`"abc"` vs `{"$oid": "abc"}`) and issue type spelling. A document is
//! kept when its latitude and longitude can be read as numbers; everything
//! else falls back to a default.

use chrono::{DateTime, Utc};
use issue_map_issue_models::{IssueReport, IssueType, PhotoRef, SubmissionReceipt};
use serde_json::Value;

use crate::BackendError;

/// Decodes a fetch response body into reports.
///
/// Accepts a bare JSON array or an object wrapping it under `"issues"`.
/// Malformed documents are skipped.
///
/// # Errors
///
/// Returns [`BackendError::Response`] if `body` holds no document array.
pub fn decode_issue_documents(body: &Value) -> Result<Vec<IssueReport>, BackendError> {
    let documents = match body {
        Value::Array(documents) => documents,
        Value::Object(map) => match map.get("issues") {
            Some(Value::Array(documents)) => documents,
            _ => {
                return Err(BackendError::Response {
                    message: "expected an array of issues or an object with an \"issues\" array"
                        .to_string(),
                });
            }
        },
        other => {
            return Err(BackendError::Response {
                message: format!("expected an array of issues, got {}", kind(other)),
            });
        }
    };

    let reports: Vec<IssueReport> = documents.iter().filter_map(decode_issue_document).collect();

    let skipped = documents.len() - reports.len();
    if skipped > 0 {
        log::warn!(
            "Skipped {skipped} of {} issue documents with unreadable coordinates",
            documents.len()
        );
    }

    Ok(reports)
}

/// Decodes one stored document, or `None` if it has no usable coordinates.
#[must_use]
pub fn decode_issue_document(document: &Value) -> Option<IssueReport> {
    let Some(map) = document.as_object() else {
        log::debug!("Skipping non-object issue document: {document}");
        return None;
    };

    let latitude = map.get("latitude").and_then(number_like);
    let longitude = map.get("longitude").and_then(number_like);
    let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
        log::debug!(
            "Skipping issue document {:?} without numeric coordinates",
            map.get("_id").and_then(document_id)
        );
        return None;
    };

    let issue_type = map
        .get("issueType")
        .and_then(Value::as_str)
        .map_or(IssueType::Other, IssueType::from_legacy);

    Some(IssueReport {
        id: map
            .get("_id")
            .or_else(|| map.get("id"))
            .and_then(document_id),
        issue_type,
        description: map
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        latitude,
        longitude,
        photo: map
            .get("photoPath")
            .and_then(Value::as_str)
            .filter(|p| !p.is_empty())
            .map(|p| PhotoRef(p.to_string())),
        created_at: map
            .get("createdAt")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc)),
    })
}

/// Extracts the stored ID from a submission response.
///
/// Understands `{"insertedId": ...}` (raw insert results) as well as
/// responses echoing the stored document (`_id` or `id`).
///
/// # Errors
///
/// Returns [`BackendError::Response`] if no ID is present.
pub fn decode_receipt(body: &Value) -> Result<SubmissionReceipt, BackendError> {
    ["insertedId", "_id", "id"]
        .iter()
        .find_map(|key| body.get(key).and_then(document_id))
        .map(|id| SubmissionReceipt { id })
        .ok_or_else(|| BackendError::Response {
            message: format!("submission response carries no ID: {body}"),
        })
}

/// Reads a number or a numeric string.
fn number_like(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Reads an ID stored as a string, a number or `{"$oid": "..."}`.
fn document_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get("$oid").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
