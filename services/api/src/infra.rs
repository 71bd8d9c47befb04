use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use klinic::workflows::ratings::{
    AppointmentId, RatingEligibility, RatingStatusSource, StatusLookupError,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Canned rating status answers, used by the demo command instead of a live
/// ratings backend. Unscripted appointments answer as already handled.
#[derive(Default)]
pub(crate) struct ScriptedRatingStatusSource {
    responses: Mutex<HashMap<String, RatingEligibility>>,
    lookups: Mutex<Vec<AppointmentId>>,
}

impl ScriptedRatingStatusSource {
    pub(crate) fn script(&self, appointment: &str, has_rated: bool, feedback_requested: bool) {
        self.responses.lock().expect("script mutex poisoned").insert(
            appointment.to_string(),
            RatingEligibility {
                has_rated,
                feedback_requested,
            },
        );
    }

    pub(crate) fn lookup_count(&self) -> usize {
        self.lookups.lock().expect("lookup mutex poisoned").len()
    }
}

#[async_trait::async_trait]
impl RatingStatusSource for ScriptedRatingStatusSource {
    async fn check(
        &self,
        appointment: &AppointmentId,
    ) -> Result<RatingEligibility, StatusLookupError> {
        self.lookups
            .lock()
            .expect("lookup mutex poisoned")
            .push(appointment.clone());

        let scripted = self
            .responses
            .lock()
            .expect("script mutex poisoned")
            .get(&appointment.0)
            .copied();

        Ok(scripted.unwrap_or(RatingEligibility {
            has_rated: true,
            feedback_requested: false,
        }))
    }
}
