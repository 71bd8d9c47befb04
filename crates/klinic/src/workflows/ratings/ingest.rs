//! Wire-to-domain decoding for the heterogeneous appointment payloads the
//! host client forwards from the appointment query service.
//!
//! Classification happens exactly once, here. Everything downstream works
//! on the explicit [`AppointmentShape`] union instead of probing JSON.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::domain::{
    AppointmentId, AppointmentRecord, AppointmentShape, AppointmentStatus, DoctorRef, LabOrgRef,
    LabServiceRef,
};

/// One appointment as it arrives on the wire.
///
/// Upstream records are camelCase and inconsistent: the provider linkage
/// may be a `doctorRef`, a `laboratoryServiceRef`, a bare `laboratoryRef`,
/// or only an explicit `kind` marker. Fields this crate does not recognize
/// are collected into `extras` so lab-order classification can keep them.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentPayload {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub doctor_ref: Option<DoctorRef>,
    #[serde(default)]
    pub laboratory_service_ref: Option<LabServiceRef>,
    #[serde(default)]
    pub laboratory_ref: Option<LabOrgRef>,
    #[serde(default)]
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extras: BTreeMap<String, Value>,
}

/// Decide which shape a payload is and build the domain record.
///
/// Precedence mirrors provider resolution: a doctor linkage wins over a
/// lab-service linkage, which wins over the lab-order markers. Upstream
/// sends both `null` and `""` for absent identifiers, so blank strings are
/// normalized to missing before any rule can see them.
pub fn classify(payload: AppointmentPayload) -> AppointmentRecord {
    let AppointmentPayload {
        id,
        status,
        kind,
        doctor_ref,
        laboratory_service_ref,
        laboratory_ref,
        scheduled_for,
        extras,
    } = payload;

    let lab_kind = kind
        .as_deref()
        .map(|value| value.trim().eq_ignore_ascii_case("laboratory"))
        .unwrap_or(false);

    let shape = if let Some(doctor) = doctor_ref {
        AppointmentShape::Doctor(DoctorRef {
            account_id: non_blank(doctor.account_id),
            profile_id: non_blank(doctor.profile_id),
            name: non_blank(doctor.name),
        })
    } else if let Some(service) = laboratory_service_ref {
        AppointmentShape::LabService(LabServiceRef {
            id: non_blank(service.id),
            name: non_blank(service.name),
        })
    } else if laboratory_ref.is_some() || lab_kind {
        AppointmentShape::LabOrder {
            laboratory: laboratory_ref.map(|laboratory| LabOrgRef {
                id: non_blank(laboratory.id),
                name: non_blank(laboratory.name),
            }),
            extras,
        }
    } else {
        AppointmentShape::Unclassified
    };

    AppointmentRecord {
        id: AppointmentId(id),
        status: AppointmentStatus::parse(&status),
        scheduled_for,
        shape,
    }
}

/// Classify a whole snapshot, preserving input order.
pub fn classify_all(payloads: Vec<AppointmentPayload>) -> Vec<AppointmentRecord> {
    payloads.into_iter().map(classify).collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}
