//! Reconciliation of ministry response files.
//!
//! A response file is processed in one pass: load the keyed rows,
//! aggregate totals, summarize, and render display lines. Encounters
//! the ministry marked `FHCV` or `CMOH` are kept on the engine so the
//! clinic can follow up; the list accumulates across runs until
//! [`ReconciliationEngine::clear_flagged`] is called.

use crate::services::DemographicsService;
use crate::table::read_response_table;
use crate::{FlaggedEncounter, ReconciliationSummary, ResponseCode, Result};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

/// Response rows carry at least: key, HCN, sex, billing code, amount, code
const MIN_RESPONSE_FIELDS: usize = 6;
const AMOUNT_FIELD: usize = 4;
const CODE_FIELD: usize = 5;
const HCN_FIELD: usize = 1;
const BILLING_CODE_FIELD: usize = 3;

/// Result of one reconciliation run
#[derive(Clone, Debug)]
pub struct ReconciliationReport {
    pub summary: ReconciliationSummary,
    /// Human-readable summary lines, including one line per flagged
    /// encounter that resolved to a patient
    pub lines: Vec<String>,
}

/// Aggregates ministry responses and tracks flagged encounters
#[derive(Debug, Default)]
pub struct ReconciliationEngine {
    flagged: Vec<FlaggedEncounter>,
}

impl ReconciliationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encounters flagged for follow-up, across every run so far
    pub fn flagged(&self) -> &[FlaggedEncounter] {
        &self.flagged
    }

    /// Drop all accumulated flagged encounters
    pub fn clear_flagged(&mut self) {
        self.flagged.clear();
    }

    /// Reconcile a response file, returning the rendered summary lines
    ///
    /// Failures are logged and yield an empty list.
    pub fn reconcile(
        &mut self,
        response_path: &Path,
        demographics: &dyn DemographicsService,
    ) -> Vec<String> {
        match self.try_reconcile(response_path, demographics) {
            Ok(report) => report.lines,
            Err(e) => {
                tracing::warn!("Failed reconciling {:?}: {}", response_path, e);
                Vec::new()
            }
        }
    }

    /// Reconcile the response file for a month, using the conventional
    /// `{month}govFile.txt` name under `dir`
    pub fn generate_monthly_summary(
        &mut self,
        dir: &Path,
        month: &str,
        demographics: &dyn DemographicsService,
    ) -> Vec<String> {
        self.reconcile(&dir.join(format!("{}govFile.txt", month)), demographics)
    }

    /// Full reconciliation flow: load, aggregate, summarize, render
    pub fn try_reconcile(
        &mut self,
        response_path: &Path,
        demographics: &dyn DemographicsService,
    ) -> Result<ReconciliationReport> {
        // Year and month come from the leading six characters of the
        // filename; informational only.
        let name = response_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let year = name.get(0..4).unwrap_or("");
        let month = name.get(4..6).unwrap_or("");

        let rows = read_response_table(response_path, MIN_RESPONSE_FIELDS)?;

        // Aggregate. Amounts are the ministry's x10000 fixed point;
        // malformed rows contribute nothing but never abort the batch.
        let mut total_billed = Decimal::ZERO;
        let mut total_received = Decimal::ZERO;
        let mut follow_up_count = 0;
        for (key, fields) in &rows {
            let amount = match Decimal::from_str(fields[AMOUNT_FIELD].trim()) {
                Ok(amount) => amount,
                Err(e) => {
                    tracing::warn!("Skipping response row {}: bad amount: {}", key, e);
                    continue;
                }
            };
            total_billed += amount;

            match ResponseCode::parse(&fields[CODE_FIELD]) {
                Some(ResponseCode::Paid) => total_received += amount,
                Some(code) if code.needs_follow_up() => {
                    follow_up_count += 1;
                    self.flagged.push(FlaggedEncounter {
                        row_key: key.clone(),
                        fields: fields.clone(),
                        patient_hcn: fields[HCN_FIELD].clone(),
                        billing_code: fields[BILLING_CODE_FIELD].clone(),
                    });
                }
                Some(_) => {}
                None => tracing::warn!(
                    "Response row {} has unknown code {:?}",
                    key,
                    fields[CODE_FIELD]
                ),
            }
        }

        // Summarize, scaling back down to dollars. Both divisions have
        // explicit zero branches: an empty or fully-declined response
        // reports zero rather than failing.
        let total_billed = (total_billed / Decimal::from(10_000)).round_dp(2);
        let total_received = (total_received / Decimal::from(10_000)).round_dp(2);
        let total_encounters = rows.len();

        let received_percentage = if total_billed.is_zero() {
            Decimal::ZERO
        } else {
            (total_received / total_billed * Decimal::from(100)).round_dp(2)
        };
        let average_billing = if total_encounters == 0 {
            Decimal::ZERO
        } else {
            (total_received / Decimal::from(total_encounters as u64)).round_dp(2)
        };

        let summary = ReconciliationSummary {
            total_encounters,
            total_billed,
            total_received,
            received_percentage,
            average_billing,
            follow_up_count,
        };

        let lines = self.render(&summary, demographics);
        tracing::info!(
            "Reconciled {} encounters for month {} year {}",
            total_encounters,
            month,
            year
        );
        Ok(ReconciliationReport { summary, lines })
    }

    fn render(
        &self,
        summary: &ReconciliationSummary,
        demographics: &dyn DemographicsService,
    ) -> Vec<String> {
        let mut lines = vec![
            format!("Total Billed : {:.2}", summary.total_billed),
            format!("Total Received : {:.2}", summary.total_received),
            format!("Received Percentage : {:.2}", summary.received_percentage),
            format!("Average Billing : {:.2}", summary.average_billing),
            format!("Number of Follow Ups : {}", summary.follow_up_count),
        ];

        // One line per accumulated flagged encounter; encounters whose
        // patient cannot be resolved stay on the flagged list but are
        // not rendered.
        for encounter in &self.flagged {
            if let Some(patient) = demographics.patient_by_hcn(&encounter.patient_hcn) {
                lines.push(format!(
                    "{} - {},{} - {}",
                    encounter.row_key,
                    patient.last_name,
                    patient.first_name,
                    encounter.billing_code
                ));
            }
        }
        lines
    }
}

/// True only for the closed set of ministry response codes
/// (`PAID`, `DECL`, `FHCV`, `CMOH`); case-sensitive.
pub fn is_code_valid(code: &str) -> bool {
    ResponseCode::parse(code).is_some()
}
