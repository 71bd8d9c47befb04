//! Backend-for-frontend workflows for the Klinic healthcare marketplace.
//!
//! The crate currently carries one workflow: deciding whether a patient
//! should be prompted to rate a recently completed appointment, and if so,
//! for which provider. See [`workflows::ratings`].

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
