use std::collections::{BTreeMap, BTreeSet};
use std::ops::Index;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::{ReimburseError, Result};
use crate::fmt::round_cents;
use crate::merge::merge_pdfs;
use crate::models::{FreelancerDirectory, Record};
use crate::transaction::Transaction;

/// Label of the grand-total row appended to a per-type summary.
pub const TOTAL: &str = "Total";

/// Per-type sums in first-seen order, plus the grand total. All values are
/// rounded to cents.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSummary {
    by_type: Vec<(String, f64)>,
    total: f64,
}

impl TypeSummary {
    pub fn by_type(&self) -> &[(String, f64)] {
        &self.by_type
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    /// Looks up a type's sum; `Total` yields the grand total.
    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<f64> {
        if name == TOTAL {
            return Some(self.total);
        }
        self.by_type.iter().find(|(k, _)| k == name).map(|(_, v)| *v)
    }

    /// Rows for a two-column table, `Total` last.
    pub fn rows(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.by_type
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
            .chain(std::iter::once((TOTAL, self.total)))
    }
}

/// Ordered ledger transactions. Filters narrow the collection in place and
/// never reorder it; clone first to keep the unfiltered state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transactions {
    items: Vec<Transaction>,
}

impl Transactions {
    /// Types every ledger row. The first invalid row aborts the load.
    pub fn from_records(
        records: &[Record],
        directory: &FreelancerDirectory,
        default_funding_source: &str,
    ) -> Result<Self> {
        let items = records
            .iter()
            .map(|r| Transaction::from_record(r, directory, default_funding_source))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Transaction> {
        self.items.iter()
    }

    fn retain(&mut self, filter: &str, keep: impl Fn(&Transaction) -> bool) {
        let before = self.items.len();
        self.items.retain(|t| keep(t));
        tracing::debug!(filter, before, after = self.items.len(), "filtered transactions");
    }

    // -----------------------------------------------------------------------
    // Filters
    // -----------------------------------------------------------------------

    pub fn filter_by_funding_source(&mut self, funding_source: &str) {
        self.retain("funding_source", |t| t.funding_source() == funding_source);
    }

    pub fn filter_out_processed(&mut self) {
        self.retain("processed", |t| !t.is_processed());
    }

    pub fn filter_out_type(&mut self, kind: &str) {
        self.retain("type", |t| t.kind() != kind);
    }

    /// Keeps transactions dated within `start..=end`.
    pub fn filter_by_date(&mut self, start: NaiveDate, end: NaiveDate) {
        self.retain("date", |t| (start..=end).contains(&t.date()));
    }

    pub fn filter_by_freelancer(&mut self, freelancer: &str) {
        self.retain("freelancer", |t| t.freelancer() == Some(freelancer));
    }

    /// A filtered copy; `self` is left untouched.
    pub fn filtered_by_freelancer(&self, freelancer: &str) -> Self {
        let mut copy = self.clone();
        copy.filter_by_freelancer(freelancer);
        copy
    }

    // -----------------------------------------------------------------------
    // Aggregates
    // -----------------------------------------------------------------------

    pub fn total_charges(&self) -> f64 {
        self.items.iter().map(Transaction::amount).filter(|a| *a < 0.0).sum()
    }

    pub fn total_credits(&self) -> f64 {
        self.items.iter().map(Transaction::amount).filter(|a| *a > 0.0).sum()
    }

    pub fn summary_by_type(&self) -> TypeSummary {
        let mut by_type: Vec<(String, f64)> = Vec::new();
        let mut total = 0.0;
        for t in &self.items {
            total += t.amount();
            match by_type.iter().position(|(k, _)| k == t.kind()) {
                Some(i) => by_type[i].1 += t.amount(),
                None => by_type.push((t.kind().to_string(), t.amount())),
            }
        }
        for (_, sum) in by_type.iter_mut() {
            *sum = round_cents(*sum);
        }
        TypeSummary {
            by_type,
            total: round_cents(total),
        }
    }

    /// Number of transactions per type tag, in first-seen order.
    pub fn type_counts(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for t in &self.items {
            match counts.iter().position(|(k, _)| k == t.kind()) {
                Some(i) => counts[i].1 += 1,
                None => counts.push((t.kind().to_string(), 1)),
            }
        }
        counts
    }

    /// Distinct freelancer names, sorted. Transactions without one are skipped.
    pub fn unique_freelancers(&self) -> BTreeSet<String> {
        self.items
            .iter()
            .filter_map(Transaction::freelancer)
            .map(String::from)
            .collect()
    }

    /// Signed sum per freelancer; charges and credits both count.
    pub fn charges_per_freelancer(&self) -> BTreeMap<String, f64> {
        let mut sums = BTreeMap::new();
        for t in &self.items {
            if let Some(name) = t.freelancer() {
                *sums.entry(name.to_string()).or_insert(0.0) += t.amount();
            }
        }
        sums
    }

    // -----------------------------------------------------------------------
    // Invoices
    // -----------------------------------------------------------------------

    /// Invoice path of every transaction, failing on the first one missing
    /// from disk.
    fn invoice_paths(&self, invoice_dir: &Path) -> Result<Vec<PathBuf>> {
        self.items
            .iter()
            .map(|t| {
                let path = t.invoice_path(invoice_dir);
                if path.is_file() {
                    Ok(path)
                } else {
                    Err(ReimburseError::InvoiceMissing {
                        reference: t.ref_id().to_string(),
                        path,
                    })
                }
            })
            .collect()
    }

    /// Merge every transaction's invoice, in collection order, into one PDF.
    /// Nothing is written unless every invoice exists.
    pub fn combine_invoices(&self, invoice_dir: &Path, output: &Path) -> Result<()> {
        let paths = self.invoice_paths(invoice_dir)?;
        merge_pdfs(&paths, output)
    }
}

impl Index<usize> for Transactions {
    type Output = Transaction;

    fn index(&self, index: usize) -> &Transaction {
        &self.items[index]
    }
}

impl<'a> IntoIterator for &'a Transactions {
    type Item = &'a Transaction;
    type IntoIter = std::slice::Iter<'a, Transaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
