//! Casing-tolerant normalization of remote prescription responses.
//!
//! The record system returns at least two shapes: a flat `prescriptions`
//! array (doctor/pharmacist queries) and a `history` array of timestamped
//! events each nesting its own `prescriptions` (patient queries). Field
//! casing is inconsistent across and even within responses, so every field
//! is resolved independently: lowerCamel key first, PascalCase key second,
//! documented default last.

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::record::{Prescription, PrescriptionStatus};

pub const DEFAULT_DIAGNOSIS: &str = "No diagnosis recorded";
pub const DEFAULT_FIELD: &str = "Not specified";

/// Extract every prescription object from a response `data` payload,
/// whichever shape it arrived in, and normalize each one.
pub fn prescriptions_from_response(data: &Value) -> Vec<Prescription> {
    collect_raw(data).into_iter().map(normalize_one).collect()
}

fn collect_raw(data: &Value) -> Vec<&Value> {
    // Bare array of prescription objects.
    if let Some(items) = data.as_array() {
        return items.iter().collect();
    }

    // Flat doctor/pharmacist shape.
    if let Some(items) = pick(data, "prescriptions").and_then(Value::as_array) {
        return items.iter().collect();
    }

    // Patient-history shape: events each nesting prescriptions.
    if let Some(events) = pick(data, "history").and_then(Value::as_array) {
        return events
            .iter()
            .filter_map(|event| pick(event, "prescriptions").and_then(Value::as_array))
            .flatten()
            .collect();
    }

    Vec::new()
}

/// Normalize one raw prescription object into the canonical record.
pub fn normalize_one(raw: &Value) -> Prescription {
    Prescription {
        id: string_field(raw, "prescriptionId", ""),
        patient_id: string_field(raw, "patientId", ""),
        patient_name: string_field(raw, "patientName", DEFAULT_FIELD),
        doctor_id: doctor_id(raw),
        medication_name: string_field(raw, "medicationName", DEFAULT_FIELD),
        dosage: string_field(raw, "dosage", DEFAULT_FIELD),
        instructions: string_field(raw, "instructions", DEFAULT_FIELD),
        diagnosis: string_field(raw, "diagnosis", DEFAULT_DIAGNOSIS),
        status: status_field(raw),
        issued_at: timestamp_field(raw, "issuedTimestamp"),
        expires_at: timestamp_field(raw, "expiryDate"),
        dispensed_by: optional_field(raw, "dispensingPharmacist"),
        dispensed_at: timestamp_field(raw, "dispensingTimestamp"),
        dispensing_note: optional_field(raw, "dispensingNote"),
        transaction_id: optional_field(raw, "transactionId"),
    }
}

/// Look a key up by its lowerCamel name, falling back to PascalCase.
fn pick<'a>(raw: &'a Value, camel: &str) -> Option<&'a Value> {
    if let Some(value) = raw.get(camel) {
        return Some(value);
    }
    raw.get(pascal_case(camel))
}

fn pascal_case(camel: &str) -> String {
    let mut chars = camel.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

fn string_field(raw: &Value, camel: &str, default: &str) -> String {
    match pick(raw, camel).and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => s.to_string(),
        _ => default.to_string(),
    }
}

/// Dispensing fields: absent, empty, and the wire literal `N/A` all mean
/// "not populated yet".
fn optional_field(raw: &Value, camel: &str) -> Option<String> {
    match pick(raw, camel).and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() && s.trim() != "N/A" => Some(s.to_string()),
        _ => None,
    }
}

/// The issuing doctor appears as either `doctorId` or `createdBy`.
fn doctor_id(raw: &Value) -> String {
    let direct = string_field(raw, "doctorId", "");
    if !direct.is_empty() {
        return direct;
    }
    string_field(raw, "createdBy", "")
}

fn status_field(raw: &Value) -> PrescriptionStatus {
    pick(raw, "status")
        .and_then(Value::as_str)
        .map(PrescriptionStatus::from_wire)
        .unwrap_or_default()
}

fn timestamp_field(raw: &Value, camel: &str) -> Option<DateTime<Utc>> {
    let s = pick(raw, camel)?.as_str()?;
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn doctor_and_patient_shapes_normalize_identically() {
        // Same underlying prescription, different shapes and casing.
        let doctor_shape = json!({
            "prescriptions": [{
                "prescriptionId": "rx001",
                "patientId": "P1",
                "patientName": "Jane Doe",
                "doctorId": "D9",
                "medicationName": "Amoxicillin",
                "dosage": "500mg",
                "instructions": "After meals",
                "diagnosis": "Sinusitis",
                "status": "Active",
                "issuedTimestamp": "2026-08-01T10:00:00Z"
            }]
        });

        let patient_shape = json!({
            "history": [{
                "timestamp": "2026-08-01T10:00:00Z",
                "Prescriptions": [{
                    "PrescriptionId": "rx001",
                    "PatientId": "P1",
                    "PatientName": "Jane Doe",
                    "CreatedBy": "D9",
                    "MedicationName": "Amoxicillin",
                    "Dosage": "500mg",
                    "Instructions": "After meals",
                    "Diagnosis": "Sinusitis",
                    "Status": "Active",
                    "IssuedTimestamp": "2026-08-01T10:00:00Z"
                }]
            }]
        });

        let from_doctor = prescriptions_from_response(&doctor_shape);
        let from_patient = prescriptions_from_response(&patient_shape);

        assert_eq!(from_doctor.len(), 1);
        assert_eq!(from_doctor, from_patient);
    }

    #[test]
    fn fallback_chain_is_applied_per_field() {
        // Mixed casing within one object.
        let raw = json!({
            "prescriptionId": "rx002",
            "PatientId": "P2",
            "medicationName": "Ibuprofen",
            "Status": "completed"
        });

        let rx = normalize_one(&raw);
        assert_eq!(rx.id, "rx002");
        assert_eq!(rx.patient_id, "P2");
        assert_eq!(rx.medication_name, "Ibuprofen");
        assert_eq!(rx.status, PrescriptionStatus::Dispensed);
        assert_eq!(rx.diagnosis, DEFAULT_DIAGNOSIS);
        assert_eq!(rx.dosage, DEFAULT_FIELD);
    }

    #[test]
    fn not_applicable_literals_become_none() {
        let raw = json!({
            "prescriptionId": "rx003",
            "status": "Active",
            "dispensingPharmacist": "N/A",
            "transactionId": "",
            "dispensingNote": "left at counter"
        });

        let rx = normalize_one(&raw);
        assert_eq!(rx.dispensed_by, None);
        assert_eq!(rx.transaction_id, None);
        assert_eq!(rx.dispensing_note.as_deref(), Some("left at counter"));
    }

    #[test]
    fn unparseable_timestamps_are_dropped() {
        let raw = json!({
            "prescriptionId": "rx004",
            "issuedTimestamp": "yesterday-ish",
            "expiryDate": "2026-12-01T00:00:00Z"
        });

        let rx = normalize_one(&raw);
        assert!(rx.issued_at.is_none());
        assert!(rx.expires_at.is_some());
    }

    #[test]
    fn unknown_shapes_yield_empty() {
        assert!(prescriptions_from_response(&json!({"message": "ok"})).is_empty());
        assert!(prescriptions_from_response(&Value::Null).is_empty());
    }
}
