//! Scheduling and demographics collaborators.
//!
//! The billing core consumes scheduling and patient demographics through
//! the narrow traits defined here. Table-backed implementations are
//! provided so the CLI runs against the same table files as the rest of
//! the system; hosts with their own scheduling or demographics modules
//! implement the traits directly.

use crate::table::{TableProvider, APPOINTMENTS_TABLE, PATIENTS_TABLE};
use crate::{Appointment, Error, Patient, Result};
use chrono::{Datelike, NaiveDate};

/// Date format used in the appointments table
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Scheduling module surface consumed by billing
pub trait SchedulingService {
    /// All appointments whose date falls within the given year/month
    fn appointments_by_month(&self, year: i32, month: u32) -> Result<Vec<Appointment>>;

    /// Date of a single appointment
    fn date_by_appointment_id(&self, appointment_id: &str) -> Result<NaiveDate>;

    /// Set the recall flag on an appointment; reports the collaborator's
    /// own success/failure and is never retried
    fn update_appointment_info(&mut self, appointment_id: &str, recall_flag: i32) -> bool;
}

/// Demographics module surface consumed by billing
pub trait DemographicsService {
    /// Look up a patient by numeric patient ID
    fn patient_by_id(&self, patient_id: u32) -> Result<Patient>;

    /// Look up a patient by Health Card Number
    fn patient_by_hcn(&self, hcn: &str) -> Option<Patient>;
}

fn appointment_from_fields(fields: &[String]) -> Option<Appointment> {
    if fields.len() < 3 {
        return None;
    }
    let date = NaiveDate::parse_from_str(&fields[2], DATE_FORMAT).ok()?;
    Some(Appointment {
        id: fields[0].clone(),
        patient_id: fields[1].clone(),
        date,
    })
}

fn patient_from_fields(fields: &[String]) -> Option<Patient> {
    if fields.len() < 5 {
        return None;
    }
    Some(Patient {
        id: fields[0].clone(),
        first_name: fields[1].clone(),
        last_name: fields[2].clone(),
        hcn: fields[3].clone(),
        sex: fields[4].clone(),
    })
}

/// Scheduling service backed by the `appointments` table
pub struct TableSchedulingService<P: TableProvider> {
    provider: P,
}

impl<P: TableProvider> TableSchedulingService<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    fn try_update(&mut self, appointment_id: &str, recall_flag: i32) -> Result<()> {
        let mut rows = self.provider.get_table(APPOINTMENTS_TABLE)?;
        let row = rows
            .get_mut(appointment_id)
            .ok_or_else(|| Error::NotFound(format!("appointment {}", appointment_id)))?;
        row.resize(4, String::new());
        row[3] = recall_flag.to_string();

        let all: Vec<Vec<String>> = rows.values().cloned().collect();
        self.provider.replace_table(APPOINTMENTS_TABLE, &all)
    }
}

impl<P: TableProvider> SchedulingService for TableSchedulingService<P> {
    fn appointments_by_month(&self, year: i32, month: u32) -> Result<Vec<Appointment>> {
        let rows = self.provider.get_table(APPOINTMENTS_TABLE)?;
        let mut appointments = Vec::new();
        for fields in rows.values() {
            match appointment_from_fields(fields) {
                Some(a) if a.date.year() == year && a.date.month() == month => {
                    appointments.push(a)
                }
                Some(_) => {}
                None => tracing::warn!("Skipping malformed appointment row: {:?}", fields),
            }
        }
        Ok(appointments)
    }

    fn date_by_appointment_id(&self, appointment_id: &str) -> Result<NaiveDate> {
        let rows = self.provider.get_table(APPOINTMENTS_TABLE)?;
        let fields = rows
            .get(appointment_id)
            .ok_or_else(|| Error::NotFound(format!("appointment {}", appointment_id)))?;
        appointment_from_fields(fields)
            .map(|a| a.date)
            .ok_or_else(|| Error::Parse(format!("malformed appointment row {:?}", fields)))
    }

    fn update_appointment_info(&mut self, appointment_id: &str, recall_flag: i32) -> bool {
        match self.try_update(appointment_id, recall_flag) {
            Ok(()) => {
                tracing::info!(
                    "Set recall flag {} on appointment {}",
                    recall_flag,
                    appointment_id
                );
                true
            }
            Err(e) => {
                tracing::warn!("Failed updating appointment {}: {}", appointment_id, e);
                false
            }
        }
    }
}

/// Demographics service backed by the `patients` table
pub struct TableDemographicsService<P: TableProvider> {
    provider: P,
}

impl<P: TableProvider> TableDemographicsService<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl<P: TableProvider> DemographicsService for TableDemographicsService<P> {
    fn patient_by_id(&self, patient_id: u32) -> Result<Patient> {
        let rows = self.provider.get_table(PATIENTS_TABLE)?;
        let fields = rows
            .get(&patient_id.to_string())
            .ok_or_else(|| Error::NotFound(format!("patient {}", patient_id)))?;
        patient_from_fields(fields)
            .ok_or_else(|| Error::Parse(format!("malformed patient row {:?}", fields)))
    }

    fn patient_by_hcn(&self, hcn: &str) -> Option<Patient> {
        let rows = match self.provider.get_table(PATIENTS_TABLE) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!("Failed reading patients table: {}", e);
                return None;
            }
        };
        rows.values()
            .filter_map(|fields| patient_from_fields(fields))
            .find(|p| p.hcn == hcn)
    }
}
