use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::Result;
use crate::fmt::field_value;
use crate::models::{FreelancerDirectory, FREELANCER};
use crate::transaction::DEFAULT_SUMMARY_FIELDS;
use crate::transactions::{Transactions, TypeSummary};

/// Two-column table rows, already formatted for display.
pub type Rows = Vec<(String, String)>;

pub struct FreelancerSection {
    pub name: String,
    pub metadata: Rows,
    pub by_type: TypeSummary,
    pub transactions: Vec<Rows>,
}

/// Everything the reimbursement document shows, independent of how it is
/// rendered.
pub struct Report {
    pub name: String,
    pub from: String,
    pub to: String,
    pub date: NaiveDate,
    pub total_charges: f64,
    pub total_credits: f64,
    pub count: usize,
    pub by_type: TypeSummary,
    pub freelancers: Vec<FreelancerSection>,
}

impl Report {
    pub fn file_name(&self) -> String {
        format!("{}_{}.pdf", self.name, self.date.format("%Y_%m_%d"))
    }

    pub fn invoices_file_name(&self) -> String {
        format!("invoices_{}_{}.pdf", self.name, self.date.format("%Y_%m_%d"))
    }
}

/// Assemble the report for an already-filtered collection. Freelancer
/// sections come out in name order.
pub fn build_report(
    txns: &Transactions,
    directory: &FreelancerDirectory,
    name: &str,
    from: &str,
    to: &str,
    date: NaiveDate,
) -> Result<Report> {
    let mut freelancers = Vec::new();
    for freelancer in txns.unique_freelancers() {
        let metadata: Rows = match directory.get(&freelancer) {
            Some(record) => record
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), field_value(k, v)))
                .collect(),
            None => vec![(FREELANCER.to_string(), freelancer.clone())],
        };
        let subset = txns.filtered_by_freelancer(&freelancer);
        let transactions = subset
            .iter()
            .map(|t| -> Result<Rows> {
                let rows: Rows = t
                    .summary(DEFAULT_SUMMARY_FIELDS)?
                    .into_iter()
                    .map(|(k, v)| {
                        let shown = field_value(&k, &v);
                        (k, shown)
                    })
                    .collect();
                Ok(rows)
            })
            .collect::<Result<Vec<Rows>>>()?;
        freelancers.push(FreelancerSection {
            by_type: subset.summary_by_type(),
            name: freelancer,
            metadata,
            transactions,
        });
    }

    Ok(Report {
        name: name.to_string(),
        from: from.to_string(),
        to: to.to_string(),
        date,
        total_charges: txns.total_charges(),
        total_credits: txns.total_credits(),
        count: txns.len(),
        by_type: txns.summary_by_type(),
        freelancers,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct WrittenReport {
    pub report: PathBuf,
    pub invoices: PathBuf,
}

/// Render the document, merge the invoices, then write the document.
///
/// The document is rendered in memory and every invoice is checked before
/// either file is written.
pub fn write_report(
    report: &Report,
    txns: &Transactions,
    invoice_dir: &Path,
    output_dir: &Path,
) -> Result<WrittenReport> {
    let bytes = crate::pdf::render_report(report)?;

    std::fs::create_dir_all(output_dir)?;
    let invoices = output_dir.join(report.invoices_file_name());
    txns.combine_invoices(invoice_dir, &invoices)?;

    let path = output_dir.join(report.file_name());
    std::fs::write(&path, bytes)?;
    tracing::info!(report = %path.display(), invoices = %invoices.display(), "wrote report");

    Ok(WrittenReport {
        report: path,
        invoices,
    })
}
