//! Core domain types for the billing system.
//!
//! This module defines the fundamental types used throughout the system:
//! - Billing code entries and their rates
//! - Appointment billing records
//! - Collaborator DTOs (patients, appointments)
//! - Ministry response codes and reconciliation results

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

// ============================================================================
// Catalog Types
// ============================================================================

/// A single fee-schedule entry from the ministry master file
///
/// Entries are immutable once loaded; the catalog is refreshed only by
/// reconstruction.
#[derive(Clone, Debug, PartialEq)]
pub struct BillingCodeEntry {
    /// Billing code, stored upper-cased
    pub code: String,
    /// Rate in dollars
    pub cost: Decimal,
    /// Date the code entered the fee schedule
    pub date_initialized: NaiveDate,
}

// ============================================================================
// Store Types
// ============================================================================

/// A billable encounter: one billing code attached to one appointment
#[derive(Clone, Debug, PartialEq)]
pub struct ApptBillingRecord {
    /// Unique record ID, assigned by the table provider
    pub id: String,
    pub appointment_id: String,
    pub patient_id: String,
    /// Upper-cased code; must exist in the catalog at generation time
    pub billing_code: String,
}

impl ApptBillingRecord {
    /// Serialize to the table row layout `[id, appointment_id, patient_id, billing_code]`
    pub fn to_fields(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.appointment_id.clone(),
            self.patient_id.clone(),
            self.billing_code.clone(),
        ]
    }

    /// Reconstruct a record from a table row
    pub fn from_fields(fields: &[String]) -> Option<Self> {
        if fields.len() < 4 || fields[0].is_empty() {
            return None;
        }
        Some(Self {
            id: fields[0].clone(),
            appointment_id: fields[1].clone(),
            patient_id: fields[2].clone(),
            billing_code: fields[3].clone(),
        })
    }
}

// ============================================================================
// Collaborator DTOs
// ============================================================================

/// Patient demographics as exposed by the demographics collaborator
#[derive(Clone, Debug, PartialEq)]
pub struct Patient {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    /// Health Card Number
    pub hcn: String,
    /// Single-letter sex marker as submitted to the ministry
    pub sex: String,
}

/// Appointment as exposed by the scheduling collaborator
#[derive(Clone, Debug, PartialEq)]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub date: NaiveDate,
}

// ============================================================================
// Reconciliation Types
// ============================================================================

/// Response codes the ministry attaches to each reconciled encounter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseCode {
    /// Claim paid in full
    Paid,
    /// Claim declined
    Declined,
    /// Failed health card validation
    FailedValidation,
    /// Contact the Ministry of Health
    ContactMinistry,
}

impl ResponseCode {
    /// Parse a response code field. Case-sensitive: the ministry emits
    /// exactly `PAID`, `DECL`, `FHCV`, or `CMOH`.
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "PAID" => Some(Self::Paid),
            "DECL" => Some(Self::Declined),
            "FHCV" => Some(Self::FailedValidation),
            "CMOH" => Some(Self::ContactMinistry),
            _ => None,
        }
    }

    /// True when the encounter needs manual follow-up
    pub fn needs_follow_up(self) -> bool {
        matches!(self, Self::FailedValidation | Self::ContactMinistry)
    }
}

/// A response row that requires manual follow-up (`FHCV` or `CMOH`)
#[derive(Clone, Debug)]
pub struct FlaggedEncounter {
    /// Key of the row in the response table
    pub row_key: String,
    /// The original response row, in field order
    pub fields: Vec<String>,
    pub patient_hcn: String,
    pub billing_code: String,
}

/// Aggregated totals for one reconciliation run
///
/// Derived, never persisted. Money values are scaled back down from the
/// ministry's x10000 fixed-point representation.
#[derive(Clone, Debug, Serialize)]
pub struct ReconciliationSummary {
    pub total_encounters: usize,
    pub total_billed: Decimal,
    pub total_received: Decimal,
    /// `total_received / total_billed * 100`; zero when nothing was billed
    pub received_percentage: Decimal,
    /// `total_received / total_encounters`; zero when the response was empty
    pub average_billing: Decimal,
    pub follow_up_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_code_parse_is_case_sensitive() {
        assert_eq!(ResponseCode::parse("PAID"), Some(ResponseCode::Paid));
        assert_eq!(ResponseCode::parse("paid"), None);
        assert_eq!(ResponseCode::parse("Paid"), None);
    }

    #[test]
    fn test_follow_up_codes() {
        assert!(ResponseCode::FailedValidation.needs_follow_up());
        assert!(ResponseCode::ContactMinistry.needs_follow_up());
        assert!(!ResponseCode::Paid.needs_follow_up());
        assert!(!ResponseCode::Declined.needs_follow_up());
    }

    #[test]
    fn test_record_field_roundtrip() {
        let record = ApptBillingRecord {
            id: "12".into(),
            appointment_id: "3".into(),
            patient_id: "7".into(),
            billing_code: "A005".into(),
        };
        let rebuilt = ApptBillingRecord::from_fields(&record.to_fields()).unwrap();
        assert_eq!(rebuilt, record);
    }

    #[test]
    fn test_record_from_short_row() {
        let fields = vec!["1".to_string(), "2".to_string()];
        assert!(ApptBillingRecord::from_fields(&fields).is_none());
    }
}
