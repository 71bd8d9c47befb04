use async_trait::async_trait;
use tracing::debug;

use super::domain::{AppointmentId, RatingEligibility};

/// Answers "has this appointment been rated / was feedback requested" for
/// a single appointment. The production implementation talks HTTP; tests
/// and the demo script it in memory.
#[async_trait]
pub trait RatingStatusSource: Send + Sync {
    async fn check(
        &self,
        appointment: &AppointmentId,
    ) -> Result<RatingEligibility, StatusLookupError>;
}

/// Failure modes of a single status lookup. All of them are recovered by
/// the scan loop; none aborts a pass.
#[derive(Debug, thiserror::Error)]
pub enum StatusLookupError {
    #[error("status request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("status endpoint returned {status}: {body}")]
    Endpoint { status: u16, body: String },
    #[error("status payload malformed: {0}")]
    Decode(#[from] serde_json::Error),
}

/// HTTP client for the ratings backend's check endpoint.
pub struct HttpRatingStatusClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRatingStatusClient {
    /// `base_url` is the ratings backend root, e.g. `http://localhost:4000`;
    /// a trailing slash is tolerated.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn check_url(&self, appointment: &AppointmentId) -> String {
        format!(
            "{}/ratings/appointments/{}/check",
            self.base_url, appointment
        )
    }
}

#[async_trait]
impl RatingStatusSource for HttpRatingStatusClient {
    async fn check(
        &self,
        appointment: &AppointmentId,
    ) -> Result<RatingEligibility, StatusLookupError> {
        let url = self.check_url(appointment);
        debug!(url = %url, "checking rating status");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(StatusLookupError::Endpoint {
                status: status.as_u16(),
                body,
            });
        }

        let eligibility: RatingEligibility = serde_json::from_str(&body)?;
        Ok(eligibility)
    }
}
