use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::{ReimburseError, Result};
use crate::models::{record_field, CellValue, FreelancerDirectory, Record, FREELANCER, FUNDING_SOURCE};

pub const REF_ID: &str = "Ref ID";
pub const DATE: &str = "Date";
pub const DESCRIPTION: &str = "Description";
pub const AMOUNT: &str = "Amount";
pub const TYPE: &str = "Type";
pub const PROCESSED: &str = "Processed";

/// Columns shown for each transaction in the detailed report section.
pub const DEFAULT_SUMMARY_FIELDS: &[&str] = &[REF_ID, DATE, DESCRIPTION, AMOUNT];

const KNOWN_COLUMNS: &[&str] = &[REF_ID, DATE, DESCRIPTION, AMOUNT, TYPE, FREELANCER, PROCESSED];

const UNKNOWN_REF: &str = "(no Ref ID)";

/// One ledger line item. Built once from a sheet row; read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    ref_id: String,
    date: NaiveDate,
    description: String,
    amount: f64,
    kind: String,
    freelancer: Option<String>,
    processed: bool,
    funding_source: String,
    extra: Record,
}

impl Transaction {
    /// Types a raw row and resolves its funding source through `directory`,
    /// using `default_funding_source` when the freelancer is unknown.
    pub fn from_record(
        record: &Record,
        directory: &FreelancerDirectory,
        default_funding_source: &str,
    ) -> Result<Self> {
        let ref_id = record_field(record, REF_ID)
            .and_then(ref_id_text)
            .ok_or_else(|| missing(UNKNOWN_REF, REF_ID))?;

        let date_cell = required(record, DATE, &ref_id)?;
        let date = parse_date(date_cell).ok_or_else(|| mismatch(&ref_id, DATE, "a date", date_cell))?;

        let amount_cell = required(record, AMOUNT, &ref_id)?;
        let amount = parse_amount(amount_cell)
            .ok_or_else(|| mismatch(&ref_id, AMOUNT, "a number", amount_cell))?;

        let description = required(record, DESCRIPTION, &ref_id)?.to_string();
        let kind = required(record, TYPE, &ref_id)?.to_string();

        let freelancer = record_field(record, FREELANCER)
            .and_then(CellValue::as_text)
            .filter(|n| !n.trim().is_empty())
            .map(String::from);
        let processed = record_field(record, PROCESSED).map_or(false, CellValue::is_truthy);
        let funding_source =
            directory.funding_source_for(freelancer.as_deref(), default_funding_source);

        let extra = record
            .iter()
            .filter(|(k, _)| !KNOWN_COLUMNS.contains(&k.as_str()))
            .cloned()
            .collect();

        Ok(Self {
            ref_id,
            date,
            description,
            amount,
            kind,
            freelancer,
            processed,
            funding_source,
            extra,
        })
    }

    pub fn ref_id(&self) -> &str {
        &self.ref_id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// The ledger's `Type` tag.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn freelancer(&self) -> Option<&str> {
        self.freelancer.as_deref()
    }

    pub fn is_processed(&self) -> bool {
        self.processed
    }

    pub fn funding_source(&self) -> &str {
        &self.funding_source
    }

    /// `<invoice_dir>/T<ref id>.pdf`. Existence is not checked here.
    pub fn invoice_path(&self, invoice_dir: &Path) -> PathBuf {
        invoice_dir.join(format!("T{}.pdf", self.ref_id))
    }

    /// Value of a column by its sheet name. The derived funding source is
    /// reachable as `Funding source`.
    pub fn field(&self, name: &str) -> Option<CellValue> {
        match name {
            REF_ID => Some(CellValue::Text(self.ref_id.clone())),
            DATE => Some(CellValue::Date(self.date)),
            DESCRIPTION => Some(CellValue::Text(self.description.clone())),
            AMOUNT => Some(CellValue::Float(self.amount)),
            TYPE => Some(CellValue::Text(self.kind.clone())),
            FREELANCER => self.freelancer.clone().map(CellValue::Text),
            PROCESSED => Some(CellValue::Bool(self.processed)),
            FUNDING_SOURCE => Some(CellValue::Text(self.funding_source.clone())),
            _ => record_field(&self.extra, name).cloned(),
        }
    }

    /// Projects the transaction onto `fields`, in the order given.
    pub fn summary(&self, fields: &[&str]) -> Result<Vec<(String, CellValue)>> {
        fields
            .iter()
            .map(|&name| {
                self.field(name)
                    .map(|v| (name.to_string(), v))
                    .ok_or_else(|| missing(&self.ref_id, name))
            })
            .collect()
    }
}

fn missing(reference: &str, field: &str) -> ReimburseError {
    ReimburseError::MissingField {
        reference: reference.to_string(),
        field: field.to_string(),
    }
}

fn mismatch(reference: &str, field: &str, expected: &'static str, found: &CellValue) -> ReimburseError {
    ReimburseError::TypeComparison {
        reference: reference.to_string(),
        field: field.to_string(),
        expected,
        found: found.to_string(),
    }
}

fn required<'a>(record: &'a Record, field: &str, reference: &str) -> Result<&'a CellValue> {
    record_field(record, field)
        .filter(|v| !v.is_blank())
        .ok_or_else(|| missing(reference, field))
}

fn ref_id_text(cell: &CellValue) -> Option<String> {
    match cell {
        CellValue::Text(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        CellValue::Int(i) => Some(i.to_string()),
        CellValue::Float(f) if f.fract() == 0.0 => Some(format!("{f:.0}")),
        CellValue::Float(f) => Some(f.to_string()),
        _ => None,
    }
}

fn parse_date(cell: &CellValue) -> Option<NaiveDate> {
    match cell {
        CellValue::Date(d) => Some(*d),
        CellValue::Text(s) => {
            let s = s.trim();
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
                .ok()
        }
        _ => None,
    }
}

/// Numeric cells as-is; text with `$`, thousands separators, or accounting
/// parentheses for negatives.
fn parse_amount(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Int(_) | CellValue::Float(_) => cell.as_f64(),
        CellValue::Text(raw) => {
            let s = raw.replace([',', '$'], "");
            let s = s.trim();
            if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
                return inner.trim().parse::<f64>().ok().map(|v| -v);
            }
            s.parse().ok()
        }
        _ => None,
    }
}
