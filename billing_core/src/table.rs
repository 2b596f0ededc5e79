//! Table provider abstraction and the CSV file-backed implementation.
//!
//! The billing core never touches storage directly; it talks to a
//! [`TableProvider`]. Tables are keyed by the first field of each row.
//! Persistence is always a full-table replace, done atomically by
//! writing a temp file and renaming it over the original.

use crate::{Error, Result};
use fs2::FileExt;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Table holding the fee schedule: `[code, date_initialized, cost]`
pub const BILLING_CODES_TABLE: &str = "billing_codes";
/// Table holding billable encounters: `[id, appointment_id, patient_id, billing_code]`
pub const APPOINTMENT_BILLS_TABLE: &str = "appointment_bills";
/// Table holding appointments: `[id, patient_id, date, recall_flag]`
pub const APPOINTMENTS_TABLE: &str = "appointments";
/// Table holding patient demographics: `[id, first_name, last_name, hcn, sex]`
pub const PATIENTS_TABLE: &str = "patients";

/// Rows of a table, keyed by each row's first field
pub type TableRows = BTreeMap<String, Vec<String>>;

/// Abstract key-value table storage consumed by the billing core
///
/// Implementations own the physical representation. The core only
/// requires that `replace_table` is atomic: a failed replace must leave
/// the previous contents intact.
pub trait TableProvider {
    /// Read every row of a table. A missing table reads as empty.
    fn get_table(&self, name: &str) -> Result<TableRows>;

    /// Atomically replace the entire contents of a table
    fn replace_table(&mut self, name: &str, rows: &[Vec<String>]) -> Result<()>;

    /// Produce a fresh unique row ID for a table
    fn generate_id(&mut self, name: &str) -> Result<String>;

    /// Write a plain line-oriented file (submission output)
    fn save_lines(&mut self, name: &str, lines: &[String]) -> Result<()>;
}

/// Directory-of-CSV-files table provider
///
/// Each table lives at `{root}/{name}.csv` with no header row. Reads
/// take a shared lock; writes go through an exclusively-locked temp
/// file that is fsynced and renamed over the table.
pub struct CsvTableProvider {
    root: PathBuf,
}

impl CsvTableProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn table_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.csv", name))
    }

    fn atomic_write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::Persistence(format!("{:?} has no parent directory", path)))?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            writer.write_all(contents)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;
        temp.persist(path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

impl TableProvider for CsvTableProvider {
    fn get_table(&self, name: &str) -> Result<TableRows> {
        let path = self.table_path(name);
        if !path.exists() {
            return Ok(TableRows::new());
        }

        let file = File::open(&path)?;
        file.lock_shared()?;
        let result = read_rows(&file);
        file.unlock()?;

        let mut rows = TableRows::new();
        for fields in result? {
            if fields.is_empty() || fields[0].is_empty() {
                continue;
            }
            if rows.insert(fields[0].clone(), fields.clone()).is_some() {
                tracing::warn!("Duplicate key {} in table {}, keeping last row", fields[0], name);
            }
        }
        tracing::debug!("Read {} rows from table {}", rows.len(), name);
        Ok(rows)
    }

    fn replace_table(&mut self, name: &str, rows: &[Vec<String>]) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_writer(Vec::new());
        for row in rows {
            writer.write_record(row)?;
        }
        let contents = writer
            .into_inner()
            .map_err(|e| Error::Persistence(e.to_string()))?;

        self.atomic_write(&self.table_path(name), &contents)?;
        tracing::debug!("Replaced table {} with {} rows", name, rows.len());
        Ok(())
    }

    fn generate_id(&mut self, name: &str) -> Result<String> {
        let rows = self.get_table(name)?;
        let max = rows
            .keys()
            .filter_map(|k| k.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        Ok((max + 1).to_string())
    }

    fn save_lines(&mut self, name: &str, lines: &[String]) -> Result<()> {
        let mut contents = lines.join("\n");
        if !contents.is_empty() {
            contents.push('\n');
        }
        self.atomic_write(&self.root.join(name), contents.as_bytes())?;
        tracing::info!("Wrote {} lines to {}", lines.len(), name);
        Ok(())
    }
}

fn read_rows(file: &File) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/// Read a ministry response file into keyed rows
///
/// The response format is row-oriented with the encounter key in the
/// first field. Rows shorter than `min_fields` are logged and skipped
/// rather than aborting the batch.
pub fn read_response_table(path: &Path, min_fields: usize) -> Result<TableRows> {
    let file = File::open(path)?;
    file.lock_shared()?;
    let result = read_rows(&file);
    file.unlock()?;

    let mut rows = TableRows::new();
    for fields in result? {
        if fields.len() < min_fields {
            tracing::warn!(
                "Skipping response row with {} fields (expected at least {})",
                fields.len(),
                min_fields
            );
            continue;
        }
        rows.insert(fields[0].clone(), fields);
    }
    Ok(rows)
}
