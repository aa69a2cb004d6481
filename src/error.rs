use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReimburseError {
    #[error("Failed to fetch ledger from {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Failed to parse ledger: {0}")]
    Parse(String),

    #[error("Transaction {reference}: missing field '{field}'")]
    MissingField { reference: String, field: String },

    #[error("Transaction {reference}: cannot compare '{field}', expected {expected} but found '{found}'")]
    TypeComparison {
        reference: String,
        field: String,
        expected: &'static str,
        found: String,
    },

    #[error("Invoice for transaction {reference} not found at {}", path.display())]
    InvoiceMissing { reference: String, path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, ReimburseError>;
