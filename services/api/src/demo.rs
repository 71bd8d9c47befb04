use std::collections::BTreeMap;
use std::sync::Arc;

use clap::Args;
use serde_json::json;

use crate::infra::ScriptedRatingStatusSource;
use klinic::error::AppError;
use klinic::workflows::ratings::{
    classify_all, AppointmentPayload, AppointmentRecord, AppointmentShape, DoctorRef, LabOrgRef,
    LabServiceRef, RatingPromptService, RatingStatusSource, ScanOutcome,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Skip the second snapshot that demonstrates rescanning after upstream changes
    #[arg(long)]
    pub(crate) skip_rescan: bool,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { skip_rescan } = args;

    println!("Klinic rating prompt demo (scripted ratings backend)");

    let source = Arc::new(ScriptedRatingStatusSource::default());
    source.script("appt-202", true, true);
    source.script("appt-203", false, true);
    source.script("appt-204", false, true);
    source.script("appt-205", false, true);
    let service = Arc::new(RatingPromptService::new(source.clone()));

    let snapshot = classify_all(first_snapshot());
    println!("\nSnapshot A ({} appointments)", snapshot.len());
    for record in &snapshot {
        println!("  - {}", describe(record));
    }

    let before = source.lookup_count();
    let outcome = service.scan(&snapshot).await;
    report_scan("First scan", outcome, source.lookup_count() - before);
    print_prompt(&service);

    let before = source.lookup_count();
    let outcome = service.scan(&snapshot).await;
    report_scan("Identical rescan", outcome, source.lookup_count() - before);

    if skip_rescan {
        return Ok(());
    }

    // The user rated the lipid panel in the app; upstream now reports it as
    // rated and flips the appointment to marked-as-read.
    source.script("appt-203", true, true);
    let snapshot = classify_all(second_snapshot());
    println!("\nSnapshot B (appt-203 rated and marked as read upstream)");

    let before = source.lookup_count();
    let outcome = service.scan(&snapshot).await;
    report_scan("Changed-snapshot scan", outcome, source.lookup_count() - before);
    print_prompt(&service);
    println!("  (appt-204 names only the laboratory, so the scan moved past it)");

    match service.acknowledge() {
        Some(prompt) => println!("\nAcknowledged prompt for {}", prompt.appointment_id),
        None => println!("\nNo prompt to acknowledge"),
    }

    let before = source.lookup_count();
    let outcome = service.scan(&snapshot).await;
    report_scan("Post-acknowledge rescan", outcome, source.lookup_count() - before);
    match service.pending_prompt() {
        Some(prompt) => println!("  Unexpected pending prompt for {}", prompt.appointment_id),
        None => println!("  Nothing pending; the snapshot stays settled until it changes"),
    }

    Ok(())
}

fn report_scan(label: &str, outcome: ScanOutcome, lookups: usize) {
    println!(
        "\n{label}: outcome={} status lookups={}",
        outcome.label(),
        lookups
    );
}

fn print_prompt<S>(service: &RatingPromptService<S>)
where
    S: RatingStatusSource + 'static,
{
    match service.pending_prompt() {
        Some(prompt) => match serde_json::to_string_pretty(&prompt) {
            Ok(payload) => println!("  Pending prompt payload:\n{payload}"),
            Err(err) => println!("  Pending prompt payload unavailable: {err}"),
        },
        None => println!("  No pending prompt"),
    }
}

fn describe(record: &AppointmentRecord) -> String {
    let provider = match &record.shape {
        AppointmentShape::Doctor(doctor) => {
            format!("doctor visit with {}", doctor.name.as_deref().unwrap_or("unknown"))
        }
        AppointmentShape::LabService(service) => {
            format!("lab service {}", service.name.as_deref().unwrap_or("unknown"))
        }
        AppointmentShape::LabOrder { laboratory, .. } => format!(
            "lab order at {}",
            laboratory
                .as_ref()
                .and_then(|lab| lab.name.as_deref())
                .unwrap_or("unknown laboratory")
        ),
        AppointmentShape::Unclassified => "unclassified appointment".to_string(),
    };
    format!("{} [{}] {}", record.id, record.status.label(), provider)
}

fn doctor_payload(id: &str, status: &str, profile_id: &str, name: &str) -> AppointmentPayload {
    AppointmentPayload {
        id: id.to_string(),
        status: status.to_string(),
        kind: None,
        doctor_ref: Some(DoctorRef {
            account_id: None,
            profile_id: Some(profile_id.to_string()),
            name: Some(name.to_string()),
        }),
        laboratory_service_ref: None,
        laboratory_ref: None,
        scheduled_for: None,
        extras: BTreeMap::new(),
    }
}

fn lab_service_payload(id: &str, status: &str, service_id: &str, name: &str) -> AppointmentPayload {
    AppointmentPayload {
        id: id.to_string(),
        status: status.to_string(),
        kind: None,
        doctor_ref: None,
        laboratory_service_ref: Some(LabServiceRef {
            id: Some(service_id.to_string()),
            name: Some(name.to_string()),
        }),
        laboratory_ref: None,
        scheduled_for: None,
        extras: BTreeMap::new(),
    }
}

/// Lab order without a service linkage; the rateable service hides in an
/// unrecognized field, exactly as the inconsistent upstream sends it.
fn lab_order_payload(id: &str, status: &str) -> AppointmentPayload {
    let mut extras = BTreeMap::new();
    extras.insert(
        "bookedService".to_string(),
        json!({ "id": "svc-377", "name": "Comprehensive Metabolic Panel" }),
    );

    AppointmentPayload {
        id: id.to_string(),
        status: status.to_string(),
        kind: None,
        doctor_ref: None,
        laboratory_service_ref: None,
        laboratory_ref: Some(LabOrgRef {
            id: Some("lab-12".to_string()),
            name: Some("Central Diagnostics".to_string()),
        }),
        scheduled_for: None,
        extras,
    }
}

/// Lab order that names only the laboratory organization. The organization is
/// never a rating target, so the scan has to move past this one.
fn bare_lab_order_payload(id: &str, status: &str) -> AppointmentPayload {
    AppointmentPayload {
        id: id.to_string(),
        status: status.to_string(),
        kind: None,
        doctor_ref: None,
        laboratory_service_ref: None,
        laboratory_ref: Some(LabOrgRef {
            id: Some("lab-29".to_string()),
            name: Some("Metro Pathology Group".to_string()),
        }),
        scheduled_for: None,
        extras: BTreeMap::new(),
    }
}

fn first_snapshot() -> Vec<AppointmentPayload> {
    vec![
        doctor_payload("appt-201", "pending", "prof-41", "Dr. Amara Okafor"),
        doctor_payload("appt-202", "completed", "prof-77", "Dr. Elias Brandt"),
        lab_service_payload("appt-203", "completed", "svc-310", "Lipid Panel"),
        bare_lab_order_payload("appt-204", "completed"),
        lab_order_payload("appt-205", "completed"),
        doctor_payload("appt-206", "cancelled", "prof-41", "Dr. Amara Okafor"),
    ]
}

fn second_snapshot() -> Vec<AppointmentPayload> {
    let mut snapshot = first_snapshot();
    for payload in &mut snapshot {
        if payload.id == "appt-203" {
            payload.status = "marked-as-read".to_string();
        }
    }
    snapshot
}
