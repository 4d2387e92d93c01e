//! Prescription Lifecycle Domain Models

/// Prescription records, dispensing flow, selection and authoring
pub mod prescriptions;

/// Domain errors
pub mod errors;

pub use errors::Error;
