use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{load_filtered, FilterArgs, SourceArgs};
use crate::error::Result;
use crate::fmt::money;
use crate::models::FreelancerDirectory;
use crate::transactions::Transactions;

pub fn freelancers(source: &SourceArgs, filters: &FilterArgs) -> Result<String> {
    let (config, directory, txns) = load_filtered(source, filters, None)?;
    Ok(format_freelancers(&txns, &directory, &config.default_funding_source))
}

pub fn types(source: &SourceArgs, filters: &FilterArgs) -> Result<String> {
    let (_, _, txns) = load_filtered(source, filters, None)?;
    Ok(format_types(&txns))
}

pub fn format_freelancers(
    txns: &Transactions,
    directory: &FreelancerDirectory,
    default_funding_source: &str,
) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Freelancer", "Funding source", "Net"]);
    let sums = txns.charges_per_freelancer();
    for (name, net) in &sums {
        let source = directory.funding_source_for(Some(name.as_str()), default_funding_source);
        let amount = if *net < 0.0 {
            money(*net).red()
        } else {
            money(*net).green()
        };
        table.add_row(vec![Cell::new(name), Cell::new(source), Cell::new(amount)]);
    }
    let total: f64 = sums.values().sum();
    table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(""),
        Cell::new(money(total).bold()),
    ]);
    format!("Freelancers\n{table}")
}

pub fn format_types(txns: &Transactions) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Type", "Count"]);
    for (kind, count) in txns.type_counts() {
        table.add_row(vec![Cell::new(kind), Cell::new(count)]);
    }
    table.add_row(vec![Cell::new("Total".bold()), Cell::new(txns.len())]);
    format!("Transaction types\n{table}")
}
