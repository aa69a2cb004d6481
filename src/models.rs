use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;

/// Column holding the freelancer name, on both sheets.
pub const FREELANCER: &str = "Freelancer";
/// Column on the freelancers sheet naming who pays for that freelancer.
pub const FUNDING_SOURCE: &str = "Funding source";

/// A single spreadsheet cell, typed as the loader found it.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
}

impl CellValue {
    pub fn text(s: &str) -> Self {
        Self::Text(s.to_string())
    }

    /// Empty cells and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Processed-flag truthiness. A blank cell reads as unknown and counts
    /// as set; only `false`, zero and empty text are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Text(s) => !s.is_empty(),
            Self::Date(_) => true,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// One sheet row as (column name, value) pairs in source column order.
pub type Record = Vec<(String, CellValue)>;

pub fn record_field<'a>(record: &'a Record, name: &str) -> Option<&'a CellValue> {
    record.iter().find(|(k, _)| k == name).map(|(_, v)| v)
}

/// Metadata row from the freelancers sheet.
#[derive(Debug, Clone)]
pub struct Freelancer {
    pub funding_source: Option<String>,
    /// Every column of the row, verbatim, for the report.
    pub attributes: Record,
}

/// Freelancer metadata keyed by exact name.
#[derive(Debug, Clone, Default)]
pub struct FreelancerDirectory {
    by_name: HashMap<String, Freelancer>,
}

impl FreelancerDirectory {
    /// Rows without a text freelancer name cannot be looked up and are skipped.
    /// Names are keyed exactly as written. A repeated name replaces the
    /// earlier row.
    pub fn from_records(records: &[Record]) -> Self {
        let mut by_name = HashMap::new();
        for record in records {
            let Some(name) = record_field(record, FREELANCER)
                .and_then(CellValue::as_text)
                .filter(|n| !n.trim().is_empty())
            else {
                tracing::warn!("skipping freelancer row without a name");
                continue;
            };
            let funding_source = record_field(record, FUNDING_SOURCE)
                .filter(|v| !v.is_blank())
                .map(|v| v.to_string());
            by_name.insert(
                name.to_string(),
                Freelancer {
                    funding_source,
                    attributes: record.clone(),
                },
            );
        }
        Self { by_name }
    }

    pub fn get(&self, name: &str) -> Option<&Freelancer> {
        self.by_name.get(name)
    }

    /// Funding source for a freelancer, falling back to `default` when the
    /// name is absent, unknown, or its record names no source.
    pub fn funding_source_for(&self, name: Option<&str>, default: &str) -> String {
        name.and_then(|n| self.get(n))
            .and_then(|f| f.funding_source.clone())
            .unwrap_or_else(|| default.to_string())
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
