//! recon-runner: validates treasury exports before they are published.
//!
//! Usage:
//!   recon-runner check
//!   recon-runner check --epoch outputs/epoch_treasury_fees.csv --year outputs/year_treasury_fees.csv
//!   recon-runner check --db outputs/treasury.sqlite --record --json
//!   recon-runner policy --policy policy.json

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use treasury_recon_core::{
    engine::{DatasetInput, ReconEngine},
    loader::{self, DEFAULT_PERIOD_PATH, DEFAULT_YEAR_PATH},
    model::{PeriodTable, YearTable},
    store::{RowStore, PERIOD_TABLE, YEAR_TABLE},
    ValidationPolicy,
};

#[derive(Parser, Debug)]
#[command(name = "recon-runner", version, about = "Treasury dataset validator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate period and/or year datasets and exit non-zero on failure
    Check {
        /// Period-level CSV (one row per epoch)
        #[arg(long)]
        epoch: Option<PathBuf>,

        /// Year rollup CSV
        #[arg(long)]
        year: Option<PathBuf>,

        /// Read both datasets from a SQLite index instead of CSV
        #[arg(long, conflicts_with_all = ["epoch", "year"])]
        db: Option<PathBuf>,

        /// JSON policy file (defaults apply when omitted)
        #[arg(long)]
        policy: Option<PathBuf>,

        /// Print the machine-readable JSON report instead of text
        #[arg(long)]
        json: bool,

        /// Record the run in the index database's run ledger
        #[arg(long, requires = "db")]
        record: bool,
    },

    /// Validate a policy file and print the effective policy
    Policy {
        #[arg(long)]
        policy: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Check { epoch, year, db, policy, json, record } => {
            let code = cmd_check(epoch, year, db, policy.as_deref(), json, record)?;
            if code != 0 {
                std::process::exit(code);
            }
        }
        Commands::Policy { policy } => {
            let policy = load_policy(policy.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&policy)?);
        }
    }
    Ok(())
}

fn cmd_check(
    epoch: Option<PathBuf>,
    year: Option<PathBuf>,
    db: Option<PathBuf>,
    policy: Option<&Path>,
    json: bool,
    record: bool,
) -> Result<i32> {
    let engine = ReconEngine::new(load_policy(policy)?);

    let (periods, years, store) = match db {
        Some(db) => {
            let (periods, years, store) = inputs_from_db(&db)?;
            (Some(periods), Some(years), Some(store))
        }
        None => {
            let (epoch, year) = match (epoch, year) {
                (None, None) => (
                    Some(PathBuf::from(DEFAULT_PERIOD_PATH)),
                    Some(PathBuf::from(DEFAULT_YEAR_PATH)),
                ),
                other => other,
            };
            (
                epoch.map(|p| loader::period_input(&p)),
                year.map(|p| loader::year_input(&p)),
                None,
            )
        }
    };

    let outcome = engine.run(periods.as_ref(), years.as_ref());
    let summary = outcome.summary();

    if json {
        println!("{}", outcome.json_report().to_json_pretty()?);
    } else {
        println!("{}", summary.text);
    }

    if record {
        if let Some(store) = &store {
            // The run ledger table may not exist in an index built by another tool.
            store.migrate_run_ledger()?;
            store.record_run(&outcome.to_run_record()?)?;
            log::info!("recorded run {}", outcome.run_id);
        }
    }

    Ok(summary.exit_code)
}

type DbInputs = (DatasetInput<PeriodTable>, DatasetInput<YearTable>, RowStore);

fn inputs_from_db(path: &Path) -> Result<DbInputs> {
    if !path.exists() {
        anyhow::bail!("Index database not found: {}", path.display());
    }
    let store = RowStore::open(path)?;
    let source = |table: &str| format!("{}#{table}", path.display());

    let periods = match store.load_periods() {
        Ok(Some(table)) => DatasetInput::loaded(source(PERIOD_TABLE), table),
        Ok(None) => DatasetInput::missing(source(PERIOD_TABLE)),
        Err(e) => DatasetInput::failed(source(PERIOD_TABLE), e),
    };
    let years = match store.load_years() {
        Ok(Some(table)) => DatasetInput::loaded(source(YEAR_TABLE), table),
        Ok(None) => DatasetInput::missing(source(YEAR_TABLE)),
        Err(e) => DatasetInput::failed(source(YEAR_TABLE), e),
    };

    Ok((periods, years, store))
}

fn load_policy(path: Option<&Path>) -> Result<ValidationPolicy> {
    match path {
        Some(path) => ValidationPolicy::load(path),
        None => Ok(ValidationPolicy::default()),
    }
}
