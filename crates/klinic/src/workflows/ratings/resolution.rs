use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::warn;

use super::domain::{
    AppointmentId, AppointmentRecord, AppointmentShape, DoctorRef, LabServiceRef, ProviderKind,
    RatingTarget,
};

pub(crate) const DOCTOR_FALLBACK_NAME: &str = "Doctor";
pub(crate) const LAB_SERVICE_FALLBACK_NAME: &str = "Laboratory Service";

/// Resolve the rateable provider for an appointment, first matching rule
/// wins: doctor linkage, then lab-service linkage, then the lab-order
/// fallback scan. `None` means the appointment yields no candidate and the
/// caller moves on to the next one.
pub(crate) fn resolve_target(appointment: &AppointmentRecord) -> Option<RatingTarget> {
    match &appointment.shape {
        AppointmentShape::Doctor(doctor) => doctor_target(doctor),
        AppointmentShape::LabService(service) => lab_service_target(service),
        // The laboratory organization is never a target, even when the
        // extras turn up nothing.
        AppointmentShape::LabOrder { extras, .. } => lab_order_target(&appointment.id, extras),
        AppointmentShape::Unclassified => None,
    }
}

fn doctor_target(doctor: &DoctorRef) -> Option<RatingTarget> {
    let provider_id = doctor
        .profile_id
        .clone()
        .or_else(|| doctor.account_id.clone())?;

    Some(RatingTarget {
        provider_id,
        provider_name: doctor
            .name
            .clone()
            .unwrap_or_else(|| DOCTOR_FALLBACK_NAME.to_string()),
        kind: ProviderKind::Doctor,
    })
}

fn lab_service_target(service: &LabServiceRef) -> Option<RatingTarget> {
    let provider_id = service.id.clone()?;

    Some(RatingTarget {
        provider_id,
        provider_name: service
            .name
            .clone()
            .unwrap_or_else(|| LAB_SERVICE_FALLBACK_NAME.to_string()),
        kind: ProviderKind::LaboratoryService,
    })
}

/// Compatibility shim for lab appointments that arrive without a
/// `laboratoryServiceRef`: search the retained extra fields, one level
/// deep, for an object carrying both an id and a name. Keys hinting at
/// "service" or "laboratory" are tried first. Every firing is logged so
/// the inconsistent upstream records remain visible to operators.
fn lab_order_target(
    appointment: &AppointmentId,
    extras: &BTreeMap<String, Value>,
) -> Option<RatingTarget> {
    let hinted = extras.iter().filter(|(key, _)| hints_lab_service(key));
    let unhinted = extras.iter().filter(|(key, _)| !hints_lab_service(key));

    for (key, value) in hinted.chain(unhinted) {
        if let Some((provider_id, provider_name)) = service_shaped(value) {
            warn!(
                appointment = %appointment,
                field = %key,
                "recovered lab-service rating target from unrecognized field"
            );
            return Some(RatingTarget {
                provider_id,
                provider_name,
                kind: ProviderKind::LaboratoryService,
            });
        }
    }

    None
}

fn hints_lab_service(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.contains("service") || key.contains("laboratory")
}

fn service_shaped(value: &Value) -> Option<(String, String)> {
    let object = value.as_object()?;
    let id = text_field(object, "id")?;
    let name = text_field(object, "name")?;
    Some((id, name))
}

fn text_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}
