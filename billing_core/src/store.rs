//! Appointment billing store: billable encounter records.
//!
//! The store is the single owner of `ApptBillingRecord`s. Every
//! mutation rewrites the whole `appointment_bills` table through the
//! provider's atomic replace, so a failed write leaves both the store
//! and the table in their prior state. Callers get success/failure
//! values back; failures are logged, never raised.

use crate::catalog::BillingCatalog;
use crate::services::SchedulingService;
use crate::table::{TableProvider, APPOINTMENT_BILLS_TABLE};
use crate::{ApptBillingRecord, Error, Result};
use std::collections::BTreeMap;

/// Mutable mapping from billing record ID to encounter association
#[derive(Clone, Debug, Default)]
pub struct ApptBillingStore {
    records: BTreeMap<String, ApptBillingRecord>,
}

impl ApptBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the store from the `appointment_bills` table
    ///
    /// Malformed rows are logged and skipped.
    pub fn load(provider: &dyn TableProvider) -> Result<Self> {
        let rows = provider.get_table(APPOINTMENT_BILLS_TABLE)?;
        let mut records = BTreeMap::new();
        for fields in rows.values() {
            match ApptBillingRecord::from_fields(fields) {
                Some(record) => {
                    records.insert(record.id.clone(), record);
                }
                None => tracing::warn!("Skipping malformed billing record row: {:?}", fields),
            }
        }
        tracing::info!("Loaded {} appointment billing records", records.len());
        Ok(Self { records })
    }

    pub fn get(&self, record_id: &str) -> Option<&ApptBillingRecord> {
        self.records.get(record_id)
    }

    pub fn records(&self) -> impl Iterator<Item = &ApptBillingRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Add a billable encounter and persist the full store
    ///
    /// Validates that all inputs are non-empty and that the
    /// (upper-normalized) billing code exists in the catalog. Returns
    /// the new record ID, or `None` with no mutation on any failure.
    pub fn add_record(
        &mut self,
        provider: &mut dyn TableProvider,
        catalog: &BillingCatalog,
        appointment_id: &str,
        patient_id: &str,
        billing_code: &str,
    ) -> Option<String> {
        match self.try_add(provider, catalog, appointment_id, patient_id, billing_code) {
            Ok(id) => {
                tracing::info!(
                    "Added billing code {} to appointment {} patient {} as record {}",
                    billing_code,
                    appointment_id,
                    patient_id,
                    id
                );
                Some(id)
            }
            Err(e) => {
                tracing::warn!("Failed adding billing record: {}", e);
                None
            }
        }
    }

    fn try_add(
        &mut self,
        provider: &mut dyn TableProvider,
        catalog: &BillingCatalog,
        appointment_id: &str,
        patient_id: &str,
        billing_code: &str,
    ) -> Result<String> {
        if appointment_id.is_empty() || patient_id.is_empty() || billing_code.is_empty() {
            return Err(Error::Validation("empty field in billing record".into()));
        }
        let code = billing_code.to_uppercase();
        if !catalog.contains(&code) {
            return Err(Error::Validation(format!("unknown billing code {}", code)));
        }

        let id = provider.generate_id(APPOINTMENT_BILLS_TABLE)?;
        if self.records.contains_key(&id) {
            return Err(Error::Validation(format!("duplicate record ID {}", id)));
        }

        self.records.insert(
            id.clone(),
            ApptBillingRecord {
                id: id.clone(),
                appointment_id: appointment_id.to_string(),
                patient_id: patient_id.to_string(),
                billing_code: code,
            },
        );

        if let Err(e) = self.try_persist(provider) {
            self.records.remove(&id);
            return Err(e);
        }
        Ok(id)
    }

    /// Replace an existing record's fields and persist the full store
    ///
    /// The replacement keeps the original record ID: lookups by
    /// `record_id` continue to succeed and no entry is keyed by the
    /// appointment ID. Unknown IDs fail with no mutation.
    pub fn update_record(
        &mut self,
        provider: &mut dyn TableProvider,
        record_id: &str,
        appointment_id: &str,
        patient_id: &str,
        billing_code: &str,
    ) -> bool {
        let previous = match self.records.get(record_id) {
            Some(record) => record.clone(),
            None => {
                tracing::warn!("Failed updating record {}: not found", record_id);
                return false;
            }
        };

        self.records.insert(
            record_id.to_string(),
            ApptBillingRecord {
                id: record_id.to_string(),
                appointment_id: appointment_id.to_string(),
                patient_id: patient_id.to_string(),
                billing_code: billing_code.to_uppercase(),
            },
        );

        match self.try_persist(provider) {
            Ok(()) => {
                tracing::info!(
                    "Updated record {} to code {} appointment {} patient {}",
                    record_id,
                    billing_code,
                    appointment_id,
                    patient_id
                );
                true
            }
            Err(e) => {
                self.records.insert(record_id.to_string(), previous);
                tracing::warn!("Failed updating record {}: {}", record_id, e);
                false
            }
        }
    }

    /// Remove a record and persist the full store
    pub fn remove_record(&mut self, provider: &mut dyn TableProvider, record_id: &str) -> bool {
        let previous = match self.records.remove(record_id) {
            Some(record) => record,
            None => {
                tracing::warn!("Failed removing record {}: not found", record_id);
                return false;
            }
        };

        match self.try_persist(provider) {
            Ok(()) => {
                tracing::info!("Removed billing record {}", record_id);
                true
            }
            Err(e) => {
                self.records.insert(previous.id.clone(), previous);
                tracing::warn!("Failed removing record {}: {}", record_id, e);
                false
            }
        }
    }

    /// Serialize every record to the `appointment_bills` table,
    /// replacing prior contents
    pub fn persist(&self, provider: &mut dyn TableProvider) -> bool {
        match self.try_persist(provider) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed persisting billing records: {}", e);
                false
            }
        }
    }

    fn try_persist(&self, provider: &mut dyn TableProvider) -> Result<()> {
        let rows: Vec<Vec<String>> = self.records.values().map(|r| r.to_fields()).collect();
        provider
            .replace_table(APPOINTMENT_BILLS_TABLE, &rows)
            .map_err(|e| Error::Persistence(e.to_string()))
    }

    /// Ask the scheduling collaborator to set an appointment's recall flag
    ///
    /// Reports the collaborator's result; failures are logged, not retried.
    pub fn flag_appointment(
        scheduling: &mut dyn SchedulingService,
        appointment_id: &str,
        recall_flag: i32,
    ) -> bool {
        let updated = scheduling.update_appointment_info(appointment_id, recall_flag);
        if updated {
            tracing::info!(
                "Flagged appointment {} for recall with flag {}",
                appointment_id,
                recall_flag
            );
        } else {
            tracing::warn!("Failed flagging appointment {} for recall", appointment_id);
        }
        updated
    }
}
