#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Civic issue taxonomy and issue report types.
//!
//! This crate defines the closed [`IssueType`] taxonomy shared by every part
//! of the issue map, the immutable [`IssueReport`] record persisted by the
//! backend, and the [`IssueTypeFilter`] used to narrow a report set before
//! it is turned into heatmap points.
//!
//! Issue types stored by older clients used ad hoc spellings (`"float"` for
//! floods, `"lightning"`, snake-cased names). [`IssueType::from_legacy`]
//! folds all of these into the closed enum and treats anything it does not
//! recognize as [`IssueType::Other`] rather than rejecting the record.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Category of a reported civic issue.
///
/// Serialized in camel case (`"trafficCongestion"`) to match the documents
/// stored by the issue backend.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "camelCase", from = "String")]
#[strum(serialize_all = "camelCase")]
pub enum IssueType {
    /// Flooded streets, blocked drains
    Flood,
    /// Potholes and other road surface damage
    Road,
    /// Broken or missing street lighting
    Lightening,
    /// General public infrastructure maintenance
    Maintenance,
    /// Noise complaints
    Noise,
    /// Crime or public safety concerns
    Crime,
    /// Recurring traffic jams
    TrafficCongestion,
    /// Uncollected garbage, illegal dumping
    Garbage,
    /// Anything else, including unrecognized legacy values
    Other,
}

impl IssueType {
    /// Maps a raw issue type string, including legacy spellings, onto the
    /// closed taxonomy.
    ///
    /// Matching is case-insensitive and ignores `_`, `-` and spaces.
    /// Returns [`IssueType::Other`] when no mapping can be determined.
    #[must_use]
    pub fn from_legacy(raw: &str) -> Self {
        let key: String = raw
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_lowercase();

        match key.as_str() {
            "flood" | "float" | "flooding" => Self::Flood,
            "road" | "roaddamage" | "pothole" => Self::Road,
            "lightening" | "lightning" | "streetlight" | "lighting" => Self::Lightening,
            "maintenance" => Self::Maintenance,
            "noise" => Self::Noise,
            "crime" => Self::Crime,
            "trafficcongestion" | "traffic" | "congestion" => Self::TrafficCongestion,
            "garbage" | "trash" | "waste" => Self::Garbage,
            _ => Self::Other,
        }
    }

    /// Human-readable label for pickers and legends.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Flood => "Flood",
            Self::Road => "Road",
            Self::Lightening => "Lightening",
            Self::Maintenance => "Maintenance",
            Self::Noise => "Noise",
            Self::Crime => "Crime",
            Self::TrafficCongestion => "Traffic Congestion",
            Self::Garbage => "Garbage",
            Self::Other => "Other",
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Flood,
            Self::Road,
            Self::Lightening,
            Self::Maintenance,
            Self::Noise,
            Self::Crime,
            Self::TrafficCongestion,
            Self::Garbage,
            Self::Other,
        ]
    }
}

impl From<String> for IssueType {
    fn from(raw: String) -> Self {
        Self::from_legacy(&raw)
    }
}

/// Selects which issue types feed the heatmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum IssueTypeFilter {
    /// Wildcard: every issue type.
    #[default]
    All,
    /// Only issues of the given type.
    Only(IssueType),
}

impl IssueTypeFilter {
    /// Whether an issue of type `issue_type` passes this filter.
    #[must_use]
    pub fn matches(self, issue_type: IssueType) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == issue_type,
        }
    }

    /// Returns the reports that pass this filter, preserving their order.
    #[must_use]
    pub fn apply<'a>(self, reports: &'a [IssueReport]) -> Vec<&'a IssueReport> {
        reports
            .iter()
            .filter(|report| self.matches(report.issue_type))
            .collect()
    }
}

/// Error returned when a filter string names no known issue type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownIssueTypeError {
    /// The rejected input.
    pub value: String,
}

impl std::fmt::Display for UnknownIssueTypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown issue type filter '{}'", self.value)
    }
}

impl std::error::Error for UnknownIssueTypeError {}

impl FromStr for IssueTypeFilter {
    type Err = UnknownIssueTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }

        IssueType::all()
            .iter()
            .copied()
            .find(|t| t.as_ref().eq_ignore_ascii_case(trimmed))
            .map(Self::Only)
            .ok_or_else(|| UnknownIssueTypeError {
                value: trimmed.to_string(),
            })
    }
}

impl TryFrom<String> for IssueTypeFilter {
    type Error = UnknownIssueTypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<IssueTypeFilter> for String {
    fn from(filter: IssueTypeFilter) -> Self {
        match filter {
            IssueTypeFilter::All => "all".to_string(),
            IssueTypeFilter::Only(t) => t.to_string(),
        }
    }
}

impl std::fmt::Display for IssueTypeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(t) => write!(f, "{t}"),
        }
    }
}

/// A geographic coordinate in decimal degrees, with an ellipsoid height in
/// metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinate {
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Height above the ellipsoid in metres.
    pub height: f64,
}

impl GeoCoordinate {
    /// Creates a coordinate at the given height.
    #[must_use]
    pub const fn new(longitude: f64, latitude: f64, height: f64) -> Self {
        Self {
            longitude,
            latitude,
            height,
        }
    }

    /// Whether both angles are finite and inside the WGS84 domain.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.height.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Reference to a photo attached to an issue (server-side path or URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoRef(pub String);

impl PhotoRef {
    /// Returns the reference as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Height, in metres, at which stored issues are projected.
pub const ISSUE_PROJECTION_HEIGHT: f64 = 1.0;

/// A civic issue submitted by a user.
///
/// Reports are never mutated after creation; only backend administration
/// removes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueReport {
    /// Backend document ID, when the report came from the store.
    #[serde(default, rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Category of the issue.
    pub issue_type: IssueType,
    /// Free-text description entered by the reporter.
    #[serde(default)]
    pub description: String,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Attached photo, if any.
    #[serde(
        default,
        rename = "photoPath",
        skip_serializing_if = "Option::is_none"
    )]
    pub photo: Option<PhotoRef>,
    /// Creation time. Reports from older stores may lack it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl IssueReport {
    /// Creates a report without a backend ID or photo.
    #[must_use]
    pub fn new(
        issue_type: IssueType,
        description: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            id: None,
            issue_type,
            description: description.into(),
            latitude,
            longitude,
            photo: None,
            created_at: None,
        }
    }

    /// The geographic location used when projecting this report into model
    /// space.
    #[must_use]
    pub const fn coordinate(&self) -> GeoCoordinate {
        GeoCoordinate::new(self.longitude, self.latitude, ISSUE_PROJECTION_HEIGHT)
    }
}

/// Payload for a new issue submission.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIssue {
    /// Category of the issue.
    pub issue_type: IssueType,
    /// Free-text description.
    pub description: String,
    /// Where the issue was observed.
    pub location: GeoCoordinate,
    /// Local path of a photo to upload alongside the report.
    pub photo: Option<std::path::PathBuf>,
}

impl NewIssue {
    /// Builds the report the backend is expected to store for this
    /// submission.
    #[must_use]
    pub fn to_report(&self, photo: Option<PhotoRef>, created_at: DateTime<Utc>) -> IssueReport {
        IssueReport {
            id: None,
            issue_type: self.issue_type,
            description: self.description.clone(),
            latitude: self.location.latitude,
            longitude: self.location.longitude,
            photo,
            created_at: Some(created_at),
        }
    }
}

/// Confirmation returned by the backend after a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    /// ID assigned to the stored report.
    pub id: String,
}
