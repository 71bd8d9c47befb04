use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use super::domain::{AppointmentRecord, RatingPrompt, SnapshotFingerprint};
use super::resolution::resolve_target;
use super::status::RatingStatusSource;

/// Decides whether the user should be prompted to rate an appointment.
///
/// A snapshot of appointments is scanned at most once per distinct
/// fingerprint, in list order, and the first appointment that is completed,
/// unrated, flagged for feedback, and resolvable to a provider becomes the
/// single pending prompt. Acknowledging the prompt never reopens the same
/// snapshot; only a changed fingerprint earns a new pass.
pub struct RatingPromptService<S> {
    status_source: Arc<S>,
    state: Mutex<ResolverState>,
}

/// Outcome of one `scan` call, for callers that want to observe resolver
/// behavior without reaching into its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A fresh pass ran to completion and was committed.
    Completed {
        prompt_found: bool,
        status_checks: usize,
    },
    /// The snapshot matches an already-completed pass; nothing was queried.
    Unchanged,
    /// An empty snapshot is ignored outright.
    EmptySnapshot,
    /// A pass for this same snapshot is already in flight.
    AlreadyScanning,
    /// The snapshot changed under a running pass; its result was discarded.
    Superseded,
}

impl ScanOutcome {
    pub const fn label(self) -> &'static str {
        match self {
            ScanOutcome::Completed { .. } => "completed",
            ScanOutcome::Unchanged => "unchanged",
            ScanOutcome::EmptySnapshot => "empty_snapshot",
            ScanOutcome::AlreadyScanning => "already_scanning",
            ScanOutcome::Superseded => "superseded",
        }
    }
}

impl<S> RatingPromptService<S>
where
    S: RatingStatusSource + 'static,
{
    pub fn new(status_source: Arc<S>) -> Self {
        Self {
            status_source,
            state: Mutex::new(ResolverState::Idle),
        }
    }

    /// Run one eligibility pass over a snapshot of appointments.
    ///
    /// Status checks are issued strictly one at a time, in list order, and
    /// stop at the first resolved candidate. A lookup failure skips that
    /// appointment and the pass continues. The state lock is never held
    /// across an await; a pass whose snapshot was superseded mid-flight
    /// discards its result at commit time.
    pub async fn scan(&self, appointments: &[AppointmentRecord]) -> ScanOutcome {
        if appointments.is_empty() {
            return ScanOutcome::EmptySnapshot;
        }

        let fingerprint = SnapshotFingerprint::of(appointments);
        let admission = self.lock_state().begin(fingerprint);
        match admission {
            PassAdmission::Unchanged => {
                debug!("appointment snapshot unchanged; skipping rating scan");
                return ScanOutcome::Unchanged;
            }
            PassAdmission::AlreadyScanning => return ScanOutcome::AlreadyScanning,
            PassAdmission::Admitted => {}
        }

        let mut status_checks = 0usize;
        let mut prompt = None;

        for appointment in appointments {
            if !appointment.status.rating_eligible() {
                continue;
            }

            status_checks += 1;
            let eligibility = match self.status_source.check(&appointment.id).await {
                Ok(eligibility) => eligibility,
                Err(error) => {
                    debug!(
                        appointment = %appointment.id,
                        %error,
                        "rating status lookup failed; treating appointment as ineligible"
                    );
                    continue;
                }
            };

            if !eligibility.prompt_candidate() {
                continue;
            }

            let Some(target) = resolve_target(appointment) else {
                debug!(
                    appointment = %appointment.id,
                    "no rateable provider on appointment; moving on"
                );
                continue;
            };

            prompt = Some(RatingPrompt {
                appointment_id: appointment.id.clone(),
                provider_id: target.provider_id,
                provider_name: target.provider_name,
                provider_type: target.kind,
            });
            break;
        }

        let committed = self.lock_state().commit(fingerprint, prompt.clone());
        if !committed {
            debug!("appointment snapshot changed mid-scan; discarding pass result");
            return ScanOutcome::Superseded;
        }

        if let Some(prompt) = &prompt {
            info!(
                appointment = %prompt.appointment_id,
                provider = %prompt.provider_id,
                provider_type = prompt.provider_type.label(),
                "rating prompt resolved"
            );
        }

        ScanOutcome::Completed {
            prompt_found: prompt.is_some(),
            status_checks,
        }
    }

    /// The prompt waiting to be shown, if any. Non-consuming.
    pub fn pending_prompt(&self) -> Option<RatingPrompt> {
        self.lock_state().pending_prompt().cloned()
    }

    /// The user responded to (or dismissed) the prompt. Clears it without
    /// reopening the snapshot: the same fingerprint stays settled.
    pub fn acknowledge(&self) -> Option<RatingPrompt> {
        self.lock_state().acknowledge()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ResolverState> {
        self.state.lock().expect("resolver state mutex poisoned")
    }
}

/// `Idle -> Scanning(fingerprint) -> Resolved(fingerprint, prompt?)`.
///
/// Transitions happen only on a fingerprint change or an acknowledge. The
/// prompt belongs to a resolved snapshot; a pass in flight has none.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ResolverState {
    Idle,
    Scanning(SnapshotFingerprint),
    Resolved {
        fingerprint: SnapshotFingerprint,
        prompt: Option<RatingPrompt>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassAdmission {
    Admitted,
    AlreadyScanning,
    Unchanged,
}

impl ResolverState {
    /// Ask to start a pass for `fingerprint`. A differing fingerprint always
    /// wins: it supersedes an in-flight pass and reopens a settled one.
    fn begin(&mut self, fingerprint: SnapshotFingerprint) -> PassAdmission {
        match self {
            ResolverState::Scanning(current) if *current == fingerprint => {
                PassAdmission::AlreadyScanning
            }
            ResolverState::Resolved {
                fingerprint: current,
                ..
            } if *current == fingerprint => PassAdmission::Unchanged,
            _ => {
                *self = ResolverState::Scanning(fingerprint);
                PassAdmission::Admitted
            }
        }
    }

    /// Settle the pass for `fingerprint`. Returns false when another pass
    /// superseded it, in which case the result must be discarded.
    fn commit(&mut self, fingerprint: SnapshotFingerprint, prompt: Option<RatingPrompt>) -> bool {
        match self {
            ResolverState::Scanning(current) if *current == fingerprint => {
                *self = ResolverState::Resolved {
                    fingerprint,
                    prompt,
                };
                true
            }
            _ => false,
        }
    }

    fn acknowledge(&mut self) -> Option<RatingPrompt> {
        match self {
            ResolverState::Resolved { prompt, .. } => prompt.take(),
            _ => None,
        }
    }

    fn pending_prompt(&self) -> Option<&RatingPrompt> {
        match self {
            ResolverState::Resolved { prompt, .. } => prompt.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::ratings::domain::{
        AppointmentId, AppointmentRecord, AppointmentShape, AppointmentStatus, ProviderKind,
    };

    fn record(id: &str, status: AppointmentStatus) -> AppointmentRecord {
        AppointmentRecord {
            id: AppointmentId(id.to_string()),
            status,
            scheduled_for: None,
            shape: AppointmentShape::Unclassified,
        }
    }

    fn fingerprint(ids: &[(&str, AppointmentStatus)]) -> SnapshotFingerprint {
        let records: Vec<_> = ids
            .iter()
            .map(|(id, status)| record(id, status.clone()))
            .collect();
        SnapshotFingerprint::of(&records)
    }

    fn prompt(appointment: &str) -> RatingPrompt {
        RatingPrompt {
            appointment_id: AppointmentId(appointment.to_string()),
            provider_id: "prov-1".to_string(),
            provider_name: "Dr. Mercer".to_string(),
            provider_type: ProviderKind::Doctor,
        }
    }

    #[test]
    fn begin_admits_fresh_fingerprint_from_idle() {
        let mut state = ResolverState::Idle;
        let fp = fingerprint(&[("a1", AppointmentStatus::Completed)]);
        assert_eq!(state.begin(fp), PassAdmission::Admitted);
        assert_eq!(state, ResolverState::Scanning(fp));
    }

    #[test]
    fn begin_rejects_same_fingerprint_while_scanning() {
        let fp = fingerprint(&[("a1", AppointmentStatus::Completed)]);
        let mut state = ResolverState::Scanning(fp);
        assert_eq!(state.begin(fp), PassAdmission::AlreadyScanning);
        assert_eq!(state, ResolverState::Scanning(fp));
    }

    #[test]
    fn begin_supersedes_in_flight_pass_on_new_fingerprint() {
        let fp_old = fingerprint(&[("a1", AppointmentStatus::Completed)]);
        let fp_new = fingerprint(&[("a1", AppointmentStatus::MarkedAsRead)]);
        let mut state = ResolverState::Scanning(fp_old);

        assert_eq!(state.begin(fp_new), PassAdmission::Admitted);
        assert!(!state.commit(fp_old, Some(prompt("a1"))), "stale commit");
        assert!(state.commit(fp_new, None));
    }

    #[test]
    fn begin_short_circuits_settled_fingerprint() {
        let fp = fingerprint(&[("a1", AppointmentStatus::Completed)]);
        let mut state = ResolverState::Idle;
        assert_eq!(state.begin(fp), PassAdmission::Admitted);
        assert!(state.commit(fp, Some(prompt("a1"))));
        assert_eq!(state.begin(fp), PassAdmission::Unchanged);
        assert_eq!(state.pending_prompt(), Some(&prompt("a1")));
    }

    #[test]
    fn new_fingerprint_reopens_settled_state_and_drops_old_prompt() {
        let fp_old = fingerprint(&[("a1", AppointmentStatus::Completed)]);
        let fp_new = fingerprint(&[
            ("a1", AppointmentStatus::Completed),
            ("a2", AppointmentStatus::Completed),
        ]);
        let mut state = ResolverState::Idle;
        state.begin(fp_old);
        state.commit(fp_old, Some(prompt("a1")));

        assert_eq!(state.begin(fp_new), PassAdmission::Admitted);
        assert_eq!(state.pending_prompt(), None);
    }

    #[test]
    fn acknowledge_clears_prompt_but_keeps_snapshot_settled() {
        let fp = fingerprint(&[("a1", AppointmentStatus::Completed)]);
        let mut state = ResolverState::Idle;
        state.begin(fp);
        state.commit(fp, Some(prompt("a1")));

        assert_eq!(state.acknowledge(), Some(prompt("a1")));
        assert_eq!(state.pending_prompt(), None);
        assert_eq!(state.begin(fp), PassAdmission::Unchanged);
    }

    #[test]
    fn acknowledge_without_resolved_pass_is_a_no_op() {
        let mut state = ResolverState::Idle;
        assert_eq!(state.acknowledge(), None);

        let fp = fingerprint(&[("a1", AppointmentStatus::Completed)]);
        let mut state = ResolverState::Scanning(fp);
        assert_eq!(state.acknowledge(), None);
        assert_eq!(state, ResolverState::Scanning(fp));
    }

    #[test]
    fn commit_requires_matching_in_flight_fingerprint() {
        let fp = fingerprint(&[("a1", AppointmentStatus::Completed)]);
        let mut state = ResolverState::Idle;
        assert!(!state.commit(fp, None), "no pass was begun");

        state.begin(fp);
        assert!(state.commit(fp, None));
        assert!(!state.commit(fp, None), "pass already settled");
    }
}
