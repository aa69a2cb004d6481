use crate::cli::{load_filtered, FilterArgs, ReportArgs, SourceArgs};
use crate::error::Result;
use crate::report::{build_report, write_report, WrittenReport};

pub fn run(
    source: &SourceArgs,
    filters: &FilterArgs,
    args: &ReportArgs,
    output_dir: Option<String>,
) -> Result<WrittenReport> {
    let (config, directory, txns) = load_filtered(source, filters, output_dir)?;
    if txns.is_empty() {
        tracing::warn!("no transactions match the filters; writing an empty report");
    }
    let today = chrono::Local::now().date_naive();
    let report = build_report(&txns, &directory, &args.name, &args.from, &args.to, today)?;
    let written = write_report(&report, &txns, &config.invoice_dir, &config.output_dir)?;
    println!("Wrote {}", written.report.display());
    println!("Wrote {}", written.invoices.display());
    Ok(written)
}
