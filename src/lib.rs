//! Multi-channel clinical-symptom intake and triage backend.
//!
//! The decision core classifies one encounter into GREEN, YELLOW or RED
//! with an AI backend when one is available and a deterministic rule
//! engine when it is not; a regex danger-sign detector always runs and
//! can only raise severity.

pub mod api;
pub mod config;
pub mod inference;
pub mod models;
pub mod protocol;
pub mod store;
pub mod triage;
