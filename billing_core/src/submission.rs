//! Monthly billing file generation.
//!
//! Joins the month's appointments against the billing store and the fee
//! schedule, and emits one fixed-concatenation line per billable
//! encounter:
//!
//! ```text
//! YYYYMMDD + HCN + sex + billing code + 11-digit zero-padded round(cost * 10000)
//! ```
//!
//! The file is written in full or not at all; any failure while
//! matching or formatting is logged and reported as `false`.

use crate::catalog::BillingCatalog;
use crate::services::{DemographicsService, SchedulingService};
use crate::store::ApptBillingStore;
use crate::table::TableProvider;
use crate::{ApptBillingRecord, Error, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Generate the ministry submission file for a given year/month
///
/// The file lands at `{year:04}{month:02}MonthlyBillingFile` via the
/// provider's line writer. Returns `false` (and writes nothing) if any
/// record in the month fails to resolve or the write fails.
pub fn generate_monthly_file(
    store: &ApptBillingStore,
    catalog: &BillingCatalog,
    scheduling: &dyn SchedulingService,
    demographics: &dyn DemographicsService,
    provider: &mut dyn TableProvider,
    year: i32,
    month: u32,
) -> bool {
    match try_generate(store, catalog, scheduling, demographics, provider, year, month) {
        Ok(count) => {
            tracing::info!(
                "Generated monthly billing file for {}-{:02} with {} encounters",
                year,
                month,
                count
            );
            true
        }
        Err(e) => {
            tracing::warn!(
                "Failed generating monthly billing file for {}-{:02}: {}",
                year,
                month,
                e
            );
            false
        }
    }
}

fn try_generate(
    store: &ApptBillingStore,
    catalog: &BillingCatalog,
    scheduling: &dyn SchedulingService,
    demographics: &dyn DemographicsService,
    provider: &mut dyn TableProvider,
    year: i32,
    month: u32,
) -> Result<usize> {
    if !(1..=12).contains(&month) {
        return Err(Error::Validation(format!("invalid month {}", month)));
    }

    // Index records by appointment so the join stays linear in the
    // number of records rather than appointments x records.
    let mut by_appointment: HashMap<&str, Vec<&ApptBillingRecord>> = HashMap::new();
    for record in store.records() {
        by_appointment
            .entry(record.appointment_id.as_str())
            .or_default()
            .push(record);
    }

    let mut lines = Vec::new();
    for appointment in scheduling.appointments_by_month(year, month)? {
        let Some(records) = by_appointment.get(appointment.id.as_str()) else {
            continue;
        };
        let date = scheduling.date_by_appointment_id(&appointment.id)?;
        for record in records {
            let patient_id: u32 = record.patient_id.parse().map_err(|_| {
                Error::Parse(format!(
                    "record {} has non-numeric patient ID {}",
                    record.id, record.patient_id
                ))
            })?;
            let patient = demographics.patient_by_id(patient_id)?;
            let entry = catalog.lookup(&record.billing_code)?;

            lines.push(format!(
                "{}{}{}{}{:011}",
                date.format("%Y%m%d"),
                patient.hcn,
                patient.sex,
                record.billing_code,
                scaled_cost(entry.cost)?,
            ));
        }
    }

    let filename = format!("{:04}{:02}MonthlyBillingFile", year, month);
    provider
        .save_lines(&filename, &lines)
        .map_err(|e| Error::Persistence(e.to_string()))?;
    Ok(lines.len())
}

/// Cost in hundredths of a cent, as submitted to the ministry
fn scaled_cost(cost: Decimal) -> Result<i64> {
    (cost * Decimal::from(10_000))
        .round()
        .to_i64()
        .ok_or_else(|| Error::Parse(format!("cost {} out of range", cost)))
}
