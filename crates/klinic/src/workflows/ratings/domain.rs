use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier wrapper for appointments as issued by the upstream backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppointmentId(pub String);

impl fmt::Display for AppointmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of an appointment.
///
/// Only `Completed` and `MarkedAsRead` make an appointment worth a rating
/// check. Statuses this crate does not know are preserved verbatim so that
/// a transition between two unknown statuses still changes the snapshot
/// fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    MarkedAsRead,
    Cancelled,
    Other(String),
}

impl AppointmentStatus {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "confirmed" => Self::Confirmed,
            "completed" => Self::Completed,
            "marked-as-read" => Self::MarkedAsRead,
            "cancelled" => Self::Cancelled,
            _ => Self::Other(value.trim().to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::MarkedAsRead => "marked-as-read",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Other(raw) => raw,
        }
    }

    /// Whether this status admits the appointment into a rating pass at all.
    pub fn rating_eligible(&self) -> bool {
        matches!(self, Self::Completed | Self::MarkedAsRead)
    }
}

/// Doctor linkage as attached to an appointment record.
///
/// The provider catalog is keyed by profile id, so `profile_id` is the
/// preferred rating target and `account_id` only a fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorRef {
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub profile_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// A specific lab test/service offering. This, not the laboratory
/// organization, is the rateable entity for lab appointments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabServiceRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// The laboratory organization an appointment was booked with. Never a
/// rating target on its own; kept for classification and diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabOrgRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Which of the heterogeneous upstream appointment shapes a record is,
/// decided once at the ingest boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum AppointmentShape {
    Doctor(DoctorRef),
    LabService(LabServiceRef),
    /// Lab appointment without a usable service reference. The record's
    /// unrecognized fields are retained so the narrow fallback scan can
    /// look for a service-shaped object among them.
    LabOrder {
        laboratory: Option<LabOrgRef>,
        extras: BTreeMap<String, Value>,
    },
    Unclassified,
}

/// One appointment from the caller-supplied snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentRecord {
    pub id: AppointmentId,
    pub status: AppointmentStatus,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub shape: AppointmentShape,
}

/// The category a rating is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProviderKind {
    Doctor,
    LaboratoryService,
}

impl ProviderKind {
    pub const fn label(self) -> &'static str {
        match self {
            ProviderKind::Doctor => "doctor",
            ProviderKind::LaboratoryService => "laboratoryService",
        }
    }
}

/// A fully resolved rateable provider identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingTarget {
    pub provider_id: String,
    pub provider_name: String,
    pub kind: ProviderKind,
}

/// Per-appointment answer from the rating status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingEligibility {
    pub has_rated: bool,
    pub feedback_requested: bool,
}

impl RatingEligibility {
    /// An appointment qualifies for a prompt only when the backend asked
    /// for feedback and the user has not rated it yet.
    pub fn prompt_candidate(&self) -> bool {
        !self.has_rated && self.feedback_requested
    }
}

/// The at-most-one tuple surfaced to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingPrompt {
    pub appointment_id: AppointmentId,
    pub provider_id: String,
    pub provider_name: String,
    pub provider_type: ProviderKind,
}

/// Content fingerprint of an appointment snapshot: the `(id, status)` pair
/// of every element, in list order.
///
/// Scanning is first-match-in-order, so a reordered list is a genuinely
/// different snapshot and earns a fresh pass. JSON field order inside each
/// record never matters; only the extracted id and status feed the hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnapshotFingerprint(u64);

impl SnapshotFingerprint {
    pub fn of(appointments: &[AppointmentRecord]) -> Self {
        let mut hasher = DefaultHasher::new();
        appointments.len().hash(&mut hasher);
        for appointment in appointments {
            appointment.id.0.hash(&mut hasher);
            appointment.status.label().hash(&mut hasher);
        }
        Self(hasher.finish())
    }
}
