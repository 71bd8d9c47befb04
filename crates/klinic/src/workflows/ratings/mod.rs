//! Appointment rating prompt workflow.
//!
//! Takes snapshots of a user's appointments, decides which single appointment
//! (if any) deserves a rating prompt, and remembers that decision per
//! snapshot so the question is never asked twice for the same data. Shape
//! classification happens once at the ingest boundary; the scan itself is a
//! sequential first-match pass over already-typed records.

pub mod domain;
pub mod ingest;
pub(crate) mod resolution;
pub mod router;
pub mod service;
pub mod status;

#[cfg(test)]
mod tests;

pub use domain::{
    AppointmentId, AppointmentRecord, AppointmentShape, AppointmentStatus, DoctorRef, LabOrgRef,
    LabServiceRef, ProviderKind, RatingEligibility, RatingPrompt, RatingTarget,
    SnapshotFingerprint,
};
pub use ingest::{classify, classify_all, AppointmentPayload};
pub use router::{rating_prompt_router, ScanRequest, ScanResponse};
pub use service::{RatingPromptService, ScanOutcome};
pub use status::{HttpRatingStatusClient, RatingStatusSource, StatusLookupError};
