use billing_core::*;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "emsbill")]
#[command(about = "Clinic billing and ministry reconciliation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a billing code to an appointment
    Add {
        #[arg(long)]
        appointment: String,
        #[arg(long)]
        patient: String,
        #[arg(long)]
        code: String,
    },

    /// Update an existing billing record
    Update {
        #[arg(long)]
        record: String,
        #[arg(long)]
        appointment: String,
        #[arg(long)]
        patient: String,
        #[arg(long)]
        code: String,
    },

    /// Remove a billing record
    Remove {
        #[arg(long)]
        record: String,
    },

    /// Flag an appointment for recall
    Flag {
        #[arg(long)]
        appointment: String,
        #[arg(long, default_value_t = 1)]
        recall: i32,
    },

    /// Generate the monthly ministry submission file
    Generate { year: i32, month: u32 },

    /// Reconcile a ministry response file
    Reconcile {
        /// Path to the response file
        file: PathBuf,

        /// Print the summary as JSON instead of display lines
        #[arg(long)]
        json: bool,
    },

    /// Reconcile the conventional {month}govFile.txt response file
    Summary {
        /// Month prefix of the response file, e.g. 202305
        month: String,

        /// Print the summary as JSON instead of display lines
        #[arg(long)]
        json: bool,
    },

    /// Check whether a ministry response code is valid
    CheckCode { code: String },
}

fn main() -> Result<()> {
    billing_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    tracing::debug!("Using data directory {:?}", data_dir);

    match cli.command {
        Commands::Add {
            appointment,
            patient,
            code,
        } => cmd_add(&data_dir, &appointment, &patient, &code),
        Commands::Update {
            record,
            appointment,
            patient,
            code,
        } => cmd_update(&data_dir, &record, &appointment, &patient, &code),
        Commands::Remove { record } => cmd_remove(&data_dir, &record),
        Commands::Flag {
            appointment,
            recall,
        } => cmd_flag(&data_dir, &appointment, recall),
        Commands::Generate { year, month } => cmd_generate(&data_dir, year, month),
        Commands::Reconcile { file, json } => cmd_reconcile(&data_dir, &file, json),
        Commands::Summary { month, json } => {
            let response_dir = if config.reconcile.response_dir.is_some() {
                config.response_dir().to_path_buf()
            } else {
                data_dir.clone()
            };
            let file = response_dir.join(format!("{}govFile.txt", month));
            cmd_reconcile(&data_dir, &file, json)
        }
        Commands::CheckCode { code } => cmd_check_code(&code),
    }
}

fn cmd_add(data_dir: &PathBuf, appointment: &str, patient: &str, code: &str) -> Result<()> {
    let mut provider = CsvTableProvider::new(data_dir);
    let catalog = BillingCatalog::load(&provider)?;
    let mut store = ApptBillingStore::load(&provider)?;

    match store.add_record(&mut provider, &catalog, appointment, patient, code) {
        Some(id) => {
            println!("✓ Added billing record {}", id);
            Ok(())
        }
        None => Err(Error::Other("failed adding billing record".into())),
    }
}

fn cmd_update(
    data_dir: &PathBuf,
    record: &str,
    appointment: &str,
    patient: &str,
    code: &str,
) -> Result<()> {
    let mut provider = CsvTableProvider::new(data_dir);
    let mut store = ApptBillingStore::load(&provider)?;

    if store.update_record(&mut provider, record, appointment, patient, code) {
        println!("✓ Updated billing record {}", record);
        Ok(())
    } else {
        Err(Error::Other(format!("failed updating record {}", record)))
    }
}

fn cmd_remove(data_dir: &PathBuf, record: &str) -> Result<()> {
    let mut provider = CsvTableProvider::new(data_dir);
    let mut store = ApptBillingStore::load(&provider)?;

    if store.remove_record(&mut provider, record) {
        println!("✓ Removed billing record {}", record);
        Ok(())
    } else {
        Err(Error::Other(format!("failed removing record {}", record)))
    }
}

fn cmd_flag(data_dir: &PathBuf, appointment: &str, recall: i32) -> Result<()> {
    let mut scheduling = TableSchedulingService::new(CsvTableProvider::new(data_dir));

    if ApptBillingStore::flag_appointment(&mut scheduling, appointment, recall) {
        println!("✓ Flagged appointment {} for recall", appointment);
        Ok(())
    } else {
        Err(Error::Other(format!(
            "failed flagging appointment {}",
            appointment
        )))
    }
}

fn cmd_generate(data_dir: &PathBuf, year: i32, month: u32) -> Result<()> {
    let mut provider = CsvTableProvider::new(data_dir);
    let catalog = BillingCatalog::load(&provider)?;
    let store = ApptBillingStore::load(&provider)?;
    let scheduling = TableSchedulingService::new(CsvTableProvider::new(data_dir));
    let demographics = TableDemographicsService::new(CsvTableProvider::new(data_dir));

    if generate_monthly_file(
        &store,
        &catalog,
        &scheduling,
        &demographics,
        &mut provider,
        year,
        month,
    ) {
        println!(
            "✓ Generated {}",
            data_dir
                .join(format!("{:04}{:02}MonthlyBillingFile", year, month))
                .display()
        );
        Ok(())
    } else {
        Err(Error::Other(format!(
            "failed generating monthly billing file for {}-{:02}",
            year, month
        )))
    }
}

fn cmd_reconcile(data_dir: &PathBuf, file: &PathBuf, json: bool) -> Result<()> {
    let demographics = TableDemographicsService::new(CsvTableProvider::new(data_dir));

    let mut engine = ReconciliationEngine::new();
    let report = engine.try_reconcile(file, &demographics)?;

    if json {
        let rendered = serde_json::to_string_pretty(&report.summary)
            .map_err(|e| Error::Other(format!("failed serializing summary: {}", e)))?;
        println!("{}", rendered);
    } else {
        for line in &report.lines {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_check_code(code: &str) -> Result<()> {
    if is_code_valid(code) {
        println!("{} is a valid response code", code);
    } else {
        println!("{} is not a valid response code", code);
    }
    Ok(())
}
