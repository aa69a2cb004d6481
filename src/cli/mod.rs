pub mod build;
pub mod init;
pub mod preview;
pub mod summary;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::error::Result;
use crate::loader::load_ledger;
use crate::models::FreelancerDirectory;
use crate::settings::{load_settings, Config, Overrides};
use crate::transactions::Transactions;

#[derive(Parser)]
#[command(
    name = "reimburse",
    version,
    about = "Reimbursement reports and merged invoices from a shared expense ledger."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write the reimbursement report and the merged invoice archive.
    Build {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        filters: FilterArgs,
        #[command(flatten)]
        report: ReportArgs,
        /// Directory for the two output files (default: current directory)
        #[arg(long = "output-dir", env = "REIMBURSE_OUTPUT_DIR")]
        output_dir: Option<String>,
    },
    /// Print the report to the terminal without writing any files.
    Preview {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        filters: FilterArgs,
        #[command(flatten)]
        report: ReportArgs,
    },
    /// Net amount and funding source per freelancer.
    Freelancers {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Number of transactions per type.
    Types {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Save defaults to ~/.config/reimburse/settings.json.
    Init {
        /// Spreadsheet export URL
        #[arg(long = "sheets-url")]
        sheets_url: Option<String>,
        /// Funding source for freelancers missing from the freelancers sheet
        #[arg(long = "default-funding-source")]
        default_funding_source: Option<String>,
        /// Directory holding T<ref id>.pdf invoices
        #[arg(long = "invoice-dir")]
        invoice_dir: Option<String>,
        /// Directory for generated files
        #[arg(long = "output-dir")]
        output_dir: Option<String>,
        /// Seconds to wait for the spreadsheet download
        #[arg(long = "fetch-timeout")]
        fetch_timeout: Option<u64>,
    },
}

/// Where the ledger and invoices come from.
#[derive(Args, Clone, Debug, Default)]
pub struct SourceArgs {
    /// Spreadsheet export URL
    #[arg(long = "sheets-url", env = "SHEETS_URL")]
    pub sheets_url: Option<String>,
    /// Funding source for freelancers missing from the freelancers sheet
    #[arg(long = "default-funding-source", env = "DEFAULT_FUNDING_SOURCE")]
    pub default_funding_source: Option<String>,
    /// Directory holding T<ref id>.pdf invoices (default: ./upwork_invoices)
    #[arg(long = "invoice-dir", env = "INVOICE_DIR")]
    pub invoice_dir: Option<String>,
}

impl SourceArgs {
    pub fn overrides(&self, output_dir: Option<String>) -> Overrides {
        Overrides {
            sheets_url: self.sheets_url.clone(),
            default_funding_source: self.default_funding_source.clone(),
            invoice_dir: self.invoice_dir.clone(),
            output_dir,
        }
    }
}

/// Which transactions make it into the report.
#[derive(Args, Clone, Debug)]
pub struct FilterArgs {
    /// Keep only transactions paid by this funding source
    #[arg(long = "funding-source", default_value = "Acme")]
    pub funding_source: String,
    /// Drop transactions of this type (repeatable)
    #[arg(long = "exclude-type", default_value = "Payment")]
    pub exclude_types: Vec<String>,
    /// Keep transactions already marked as processed
    #[arg(long = "include-processed")]
    pub include_processed: bool,
    /// Keep only this freelancer's transactions
    #[arg(long)]
    pub freelancer: Option<String>,
    /// First date to include: YYYY-MM-DD
    #[arg(long)]
    pub since: Option<NaiveDate>,
    /// Last date to include: YYYY-MM-DD
    #[arg(long)]
    pub until: Option<NaiveDate>,
}

impl FilterArgs {
    pub fn apply(&self, txns: &mut Transactions) {
        for kind in &self.exclude_types {
            txns.filter_out_type(kind);
        }
        if !self.include_processed {
            txns.filter_out_processed();
        }
        txns.filter_by_funding_source(&self.funding_source);
        if self.since.is_some() || self.until.is_some() {
            txns.filter_by_date(
                self.since.unwrap_or(NaiveDate::MIN),
                self.until.unwrap_or(NaiveDate::MAX),
            );
        }
        if let Some(name) = &self.freelancer {
            txns.filter_by_freelancer(name);
        }
    }
}

#[derive(Args, Clone, Debug)]
pub struct ReportArgs {
    /// Report name, used in both output file names
    #[arg(long, default_value = "upwork_expenses_acme")]
    pub name: String,
    /// Who is asking for the reimbursement
    #[arg(long, default_value = "Coyote")]
    pub from: String,
    /// Who is being billed
    #[arg(long, default_value = "ACME")]
    pub to: String,
}

/// Resolve config, fetch the ledger and narrow it with `filters`.
pub(crate) fn load_filtered(
    source: &SourceArgs,
    filters: &FilterArgs,
    output_dir: Option<String>,
) -> Result<(Config, FreelancerDirectory, Transactions)> {
    let config = Config::resolve(&source.overrides(output_dir), &load_settings())?;
    let raw = load_ledger(&config)?;
    let directory = FreelancerDirectory::from_records(&raw.freelancers);
    if directory.is_empty() {
        tracing::warn!("no named freelancers; every transaction uses the default funding source");
    }
    let mut txns =
        Transactions::from_records(&raw.transactions, &directory, &config.default_funding_source)?;
    let loaded = txns.len();
    filters.apply(&mut txns);
    tracing::info!(loaded, kept = txns.len(), freelancers = directory.len(), "applied filters");
    Ok((config, directory, txns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CellValue, Record, FREELANCER, FUNDING_SOURCE};
    use crate::transaction::{AMOUNT, DATE, DESCRIPTION, PROCESSED, REF_ID, TYPE};

    fn record(id: i64, date: &str, kind: &str, freelancer: &str, processed: bool) -> Record {
        vec![
            (REF_ID.to_string(), CellValue::Int(id)),
            (DATE.to_string(), CellValue::text(date)),
            (DESCRIPTION.to_string(), CellValue::text("work")),
            (AMOUNT.to_string(), CellValue::Float(-10.0)),
            (TYPE.to_string(), CellValue::text(kind)),
            (FREELANCER.to_string(), CellValue::text(freelancer)),
            (PROCESSED.to_string(), CellValue::Bool(processed)),
        ]
    }

    fn ledger() -> Transactions {
        let directory = FreelancerDirectory::from_records(&[
            vec![
                (FREELANCER.to_string(), CellValue::text("Alice")),
                (FUNDING_SOURCE.to_string(), CellValue::text("Acme")),
            ],
            vec![
                (FREELANCER.to_string(), CellValue::text("Bob")),
                (FUNDING_SOURCE.to_string(), CellValue::text("Other")),
            ],
        ]);
        let records = vec![
            record(1, "2024-01-01", "Hourly", "Alice", false),
            record(2, "2024-01-02", "Payment", "Alice", false),
            record(3, "2024-01-03", "Hourly", "Alice", true),
            record(4, "2024-01-04", "Hourly", "Bob", false),
            record(5, "2024-02-01", "Fee", "Alice", false),
        ];
        Transactions::from_records(&records, &directory, "Acme").unwrap()
    }

    fn ids(txns: &Transactions) -> Vec<&str> {
        txns.iter().map(|t| t.ref_id()).collect()
    }

    fn parse(args: &[&str]) -> Commands {
        let mut argv = vec!["reimburse"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().command
    }

    #[test]
    fn test_default_filters_match_standard_run() {
        let Commands::Build { filters, report, .. } = parse(&["build"]) else {
            panic!("expected build");
        };
        assert_eq!(filters.funding_source, "Acme");
        assert_eq!(filters.exclude_types, vec!["Payment".to_string()]);
        assert!(!filters.include_processed);
        assert_eq!(report.name, "upwork_expenses_acme");

        let mut txns = ledger();
        filters.apply(&mut txns);
        assert_eq!(ids(&txns), vec!["1", "5"]);
    }

    #[test]
    fn test_date_bounds_are_optional() {
        let Commands::Preview { filters, .. } = parse(&["preview", "--until", "2024-01-31"]) else {
            panic!("expected preview");
        };
        let mut txns = ledger();
        filters.apply(&mut txns);
        assert_eq!(ids(&txns), vec!["1"]);
    }

    #[test]
    fn test_include_processed_and_freelancer() {
        let Commands::Types { filters, .. } =
            parse(&["types", "--include-processed", "--freelancer", "Alice", "--exclude-type", "Fee"])
        else {
            panic!("expected types");
        };
        let mut txns = ledger();
        filters.apply(&mut txns);
        assert_eq!(ids(&txns), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_rejects_bad_date() {
        assert!(Cli::try_parse_from(["reimburse", "build", "--since", "01/02/2024"]).is_err());
    }
}
