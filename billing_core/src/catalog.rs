//! Billing code catalog: the ministry fee schedule.
//!
//! The catalog is built once from the `billing_codes` table and is
//! read-only afterwards; a refreshed fee schedule means constructing a
//! new catalog.

use crate::table::{TableProvider, BILLING_CODES_TABLE};
use crate::{BillingCodeEntry, Error, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

/// Date format used in the `billing_codes` table
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Immutable-per-load mapping from billing code to rate metadata
///
/// Keys are upper-normalized; lookups normalize the same way, so
/// `a005` and `A005` resolve to the same entry.
#[derive(Clone, Debug, Default)]
pub struct BillingCatalog {
    entries: HashMap<String, BillingCodeEntry>,
}

impl BillingCatalog {
    /// Build a catalog from raw table rows `[code, date_initialized, cost, ...]`
    ///
    /// Malformed rows are logged and skipped; a duplicate code keeps the
    /// first entry seen.
    pub fn from_rows<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a Vec<String>>,
    {
        let mut entries = HashMap::new();
        for fields in rows {
            match entry_from_fields(fields) {
                Ok(entry) => {
                    if entries.contains_key(&entry.code) {
                        tracing::warn!("Duplicate billing code {}, keeping first entry", entry.code);
                        continue;
                    }
                    entries.insert(entry.code.clone(), entry);
                }
                Err(e) => tracing::warn!("Skipping malformed fee schedule row: {}", e),
            }
        }
        tracing::info!("Loaded {} billing codes", entries.len());
        Self { entries }
    }

    /// Build a catalog from the `billing_codes` table of a provider
    pub fn load(provider: &dyn TableProvider) -> Result<Self> {
        let rows = provider.get_table(BILLING_CODES_TABLE)?;
        Ok(Self::from_rows(rows.values()))
    }

    /// Look up a billing code entry; fails with `NotFound` for absent codes
    pub fn lookup(&self, code: &str) -> Result<&BillingCodeEntry> {
        self.entries
            .get(&code.to_uppercase())
            .ok_or_else(|| Error::NotFound(format!("billing code {}", code)))
    }

    /// True when the (case-normalized) code exists in the fee schedule
    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(&code.to_uppercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn entry_from_fields(fields: &[String]) -> Result<BillingCodeEntry> {
    if fields.len() < 3 {
        return Err(Error::Parse(format!(
            "fee schedule row has {} fields, expected at least 3",
            fields.len()
        )));
    }
    if fields[0].is_empty() {
        return Err(Error::Parse("fee schedule row has empty code".into()));
    }
    let date_initialized = NaiveDate::parse_from_str(&fields[1], DATE_FORMAT)
        .map_err(|e| Error::Parse(format!("bad date for code {}: {}", fields[0], e)))?;
    let cost = Decimal::from_str(fields[2].trim())
        .map_err(|e| Error::Parse(format!("bad cost for code {}: {}", fields[0], e)))?;

    Ok(BillingCodeEntry {
        code: fields[0].to_uppercase(),
        cost,
        date_initialized,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_lookup_is_case_normalized() {
        let rows = vec![row(&["a005", "2018-01-01", "33.70"])];
        let catalog = BillingCatalog::from_rows(&rows);

        assert_eq!(catalog.len(), 1);
        let entry = catalog.lookup("A005").unwrap();
        assert_eq!(entry.code, "A005");
        assert_eq!(entry.cost, Decimal::from_str("33.70").unwrap());
        assert!(catalog.lookup("a005").is_ok());
        assert!(catalog.contains("A005"));
    }

    #[test]
    fn test_lookup_missing_code_is_not_found() {
        let catalog = BillingCatalog::from_rows(&[]);
        assert!(matches!(catalog.lookup("Z999"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let rows = vec![
            row(&["A005", "2018-01-01", "33.70"]),
            row(&["B102", "not-a-date", "10.00"]),
            row(&["C300", "2018-01-01", "not-a-cost"]),
            row(&["D400"]),
        ];
        let catalog = BillingCatalog::from_rows(&rows);
        assert_eq!(catalog.len(), 1);
        assert!(catalog.contains("A005"));
    }

    #[test]
    fn test_duplicate_code_keeps_first() {
        let rows = vec![
            row(&["A005", "2018-01-01", "33.70"]),
            row(&["A005", "2019-01-01", "99.99"]),
        ];
        let catalog = BillingCatalog::from_rows(&rows);
        let entry = catalog.lookup("A005").unwrap();
        assert_eq!(entry.cost, Decimal::from_str("33.70").unwrap());
    }

    #[test]
    fn test_load_from_provider() {
        use crate::table::CsvTableProvider;

        let temp_dir = tempfile::tempdir().unwrap();
        let mut provider = CsvTableProvider::new(temp_dir.path());
        provider
            .replace_table(
                BILLING_CODES_TABLE,
                &[
                    row(&["A005", "2018-01-01", "33.70"]),
                    row(&["B102", "2018-03-12", "102.35"]),
                ],
            )
            .unwrap();

        let catalog = BillingCatalog::load(&provider).unwrap();
        assert_eq!(catalog.len(), 2);
    }
}
