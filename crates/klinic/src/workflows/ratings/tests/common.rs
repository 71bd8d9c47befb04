use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::{json, Value};
use tokio::sync::Notify;

use crate::workflows::ratings::domain::{
    AppointmentId, AppointmentRecord, AppointmentShape, AppointmentStatus, DoctorRef, LabOrgRef,
    LabServiceRef, RatingEligibility,
};
use crate::workflows::ratings::ingest::AppointmentPayload;
use crate::workflows::ratings::status::{RatingStatusSource, StatusLookupError};
use crate::workflows::ratings::{rating_prompt_router, RatingPromptService};

pub(super) fn payload(value: Value) -> AppointmentPayload {
    serde_json::from_value(value).expect("payload decodes")
}

pub(super) fn doctor_payload(id: &str, status: &str) -> AppointmentPayload {
    payload(json!({
        "id": id,
        "status": status,
        "doctorRef": {
            "accountId": "acct-77",
            "profileId": "prof-12",
            "name": "Dr. Mercer"
        }
    }))
}

pub(super) fn doctor_record(id: &str, status: AppointmentStatus) -> AppointmentRecord {
    AppointmentRecord {
        id: AppointmentId(id.to_string()),
        status,
        scheduled_for: None,
        shape: AppointmentShape::Doctor(DoctorRef {
            account_id: Some("acct-77".to_string()),
            profile_id: Some("prof-12".to_string()),
            name: Some("Dr. Mercer".to_string()),
        }),
    }
}

pub(super) fn lab_service_record(id: &str, status: AppointmentStatus) -> AppointmentRecord {
    AppointmentRecord {
        id: AppointmentId(id.to_string()),
        status,
        scheduled_for: None,
        shape: AppointmentShape::LabService(LabServiceRef {
            id: Some("svc-9".to_string()),
            name: Some("Lipid Panel".to_string()),
        }),
    }
}

/// Lab appointment that carries only the laboratory organization, no
/// service linkage anywhere. Resolution finds nothing rateable on it.
pub(super) fn bare_lab_order_record(id: &str, status: AppointmentStatus) -> AppointmentRecord {
    AppointmentRecord {
        id: AppointmentId(id.to_string()),
        status,
        scheduled_for: None,
        shape: AppointmentShape::LabOrder {
            laboratory: Some(LabOrgRef {
                id: Some("lab-3".to_string()),
                name: Some("Central Diagnostics".to_string()),
            }),
            extras: BTreeMap::new(),
        },
    }
}

pub(super) fn candidate() -> RatingEligibility {
    RatingEligibility {
        has_rated: false,
        feedback_requested: true,
    }
}

pub(super) fn not_a_candidate() -> RatingEligibility {
    RatingEligibility {
        has_rated: false,
        feedback_requested: false,
    }
}

pub(super) fn already_rated() -> RatingEligibility {
    RatingEligibility {
        has_rated: true,
        feedback_requested: true,
    }
}

/// In-memory stand-in for the ratings backend. Unscripted appointments
/// answer as non-candidates; every lookup is recorded in call order.
#[derive(Default)]
pub(super) struct ScriptedStatusSource {
    responses: HashMap<String, ScriptedAnswer>,
    calls: Mutex<Vec<AppointmentId>>,
}

enum ScriptedAnswer {
    Eligibility(RatingEligibility),
    Failure,
}

impl ScriptedStatusSource {
    pub(super) fn with(mut self, id: &str, eligibility: RatingEligibility) -> Self {
        self.responses
            .insert(id.to_string(), ScriptedAnswer::Eligibility(eligibility));
        self
    }

    pub(super) fn with_failure(mut self, id: &str) -> Self {
        self.responses
            .insert(id.to_string(), ScriptedAnswer::Failure);
        self
    }

    pub(super) fn calls(&self) -> Vec<AppointmentId> {
        self.calls.lock().expect("call log mutex poisoned").clone()
    }

    pub(super) fn call_count(&self) -> usize {
        self.calls.lock().expect("call log mutex poisoned").len()
    }
}

#[async_trait::async_trait]
impl RatingStatusSource for ScriptedStatusSource {
    async fn check(
        &self,
        appointment: &AppointmentId,
    ) -> Result<RatingEligibility, StatusLookupError> {
        self.calls
            .lock()
            .expect("call log mutex poisoned")
            .push(appointment.clone());

        match self.responses.get(&appointment.0) {
            Some(ScriptedAnswer::Eligibility(eligibility)) => Ok(*eligibility),
            Some(ScriptedAnswer::Failure) => Err(StatusLookupError::Endpoint {
                status: 503,
                body: "scripted outage".to_string(),
            }),
            None => Ok(not_a_candidate()),
        }
    }
}

/// Source that parks every lookup on a gate so a test can hold a scan
/// mid-flight, then let it finish.
#[derive(Default)]
pub(super) struct GatedStatusSource {
    entered: Notify,
    release: Notify,
}

impl GatedStatusSource {
    pub(super) async fn wait_until_entered(&self) {
        self.entered.notified().await;
    }

    pub(super) fn release_one(&self) {
        self.release.notify_one();
    }
}

#[async_trait::async_trait]
impl RatingStatusSource for GatedStatusSource {
    async fn check(
        &self,
        _appointment: &AppointmentId,
    ) -> Result<RatingEligibility, StatusLookupError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(candidate())
    }
}

pub(super) fn build_service(
    source: ScriptedStatusSource,
) -> (
    Arc<RatingPromptService<ScriptedStatusSource>>,
    Arc<ScriptedStatusSource>,
) {
    let source = Arc::new(source);
    let service = Arc::new(RatingPromptService::new(source.clone()));
    (service, source)
}

pub(super) fn rating_router_with_source(source: ScriptedStatusSource) -> axum::Router {
    let (service, _) = build_service(source);
    rating_prompt_router(service)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 4096)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
