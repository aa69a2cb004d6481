use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{load_filtered, FilterArgs, ReportArgs, SourceArgs};
use crate::error::Result;
use crate::fmt::money;
use crate::report::{build_report, Report, Rows};
use crate::transactions::TypeSummary;

pub fn run(source: &SourceArgs, filters: &FilterArgs, args: &ReportArgs) -> Result<String> {
    let (_, directory, txns) = load_filtered(source, filters, None)?;
    let today = chrono::Local::now().date_naive();
    let report = build_report(&txns, &directory, &args.name, &args.from, &args.to, today)?;
    Ok(format_report(&report))
}

// ---------------------------------------------------------------------------
// Pure formatting functions (report → String)
// ---------------------------------------------------------------------------

fn type_table(summary: &TypeSummary) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Type", "Amount"]);
    for (kind, amount) in summary.by_type() {
        table.add_row(vec![Cell::new(kind), Cell::new(money(*amount))]);
    }
    table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(money(summary.total()).bold()),
    ]);
    table
}

fn rows_table(rows: &Rows) -> Table {
    let mut table = Table::new();
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    table
}

pub fn format_report(report: &Report) -> String {
    let mut out = format!(
        "{}\nFrom: {}\nTo: {}\nDate: {}\n",
        report.name.bold(),
        report.from,
        report.to,
        report.date.format("%b %d, %Y"),
    );
    out.push_str(&format!(
        "\nTotal amount for re-imbursement: {}\nTotal invoices: {}\n",
        money(report.total_charges).red().bold(),
        report.count
    ));
    if report.total_credits > 0.0 {
        out.push_str(&format!("Credits in range: {}\n", money(report.total_credits).green()));
    }
    out.push_str(&format!("\nCharges by type\n{}\n", type_table(&report.by_type)));

    if report.freelancers.is_empty() {
        out.push_str(&format!("\n{}\n", "No transactions match.".dimmed()));
        return out;
    }

    out.push_str(&format!("\n{}\n", "Summary by Freelancer".bold()));
    for section in &report.freelancers {
        out.push_str(&format!("\n{}\n{}\n", section.name.cyan().bold(), rows_table(&section.metadata)));
        out.push_str(&format!("By type of charge\n{}\n", type_table(&section.by_type)));
        out.push_str(&format!("Detailed transactions for {}\n", section.name));
        for rows in &section.transactions {
            out.push_str(&format!("{}\n", rows_table(rows)));
        }
    }
    out
}
