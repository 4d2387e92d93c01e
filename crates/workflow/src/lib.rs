//! Prescription dispensing coordination: session gating, catalog access,
//! and the side-effecting dispensing and authoring workflows.

/// Environment configuration
pub mod config;

/// Workflow errors
pub mod errors;

/// Session context and durable session store
pub mod session;

/// Patient identity verification gate
pub mod verify;

/// Records-service HTTP boundary
pub mod records;

/// Prescription catalog client
pub mod catalog;

/// Dispensing coordinator
pub mod dispense;

/// Prescription authoring workflow
pub mod authoring;

pub use config::Config;
pub use errors::Error;
pub use session::{Role, SessionContext, SessionStore, VerifiedPatient};
