use std::io::{Cursor, Read};
use std::time::Duration;

use calamine::{Data, Range, Reader, Sheets};
use chrono::{NaiveDate, TimeDelta};

use crate::error::{ReimburseError, Result};
use crate::models::{CellValue, Record};
use crate::settings::Config;

pub const TRANSACTIONS_SHEET: &str = "transactions";
pub const FREELANCERS_SHEET: &str = "freelancers";

/// The two sheets of a ledger snapshot, as untyped rows.
#[derive(Debug, Clone, Default)]
pub struct RawLedger {
    pub transactions: Vec<Record>,
    pub freelancers: Vec<Record>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Excel serial day number to a calendar date (epoch 1899-12-30, which
/// absorbs the 1900 leap-year bug). `None` when the serial is not finite or
/// falls outside chrono's calendar.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    let days = TimeDelta::try_days(serial.floor() as i64)?;
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(days)
}

pub fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64())
            .map(CellValue::Date)
            .unwrap_or(CellValue::Float(dt.as_f64())),
        Data::DateTimeIso(s) => NaiveDate::parse_from_str(s.get(..10).unwrap_or(s), "%Y-%m-%d")
            .map(CellValue::Date)
            .unwrap_or_else(|_| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}

/// First row is the header; blank rows are dropped. Unnamed header cells
/// become `Column <n>`.
pub fn records_from_range(range: &Range<Data>) -> Vec<Record> {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Vec::new();
    };
    let columns: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let name = cell_value(cell).to_string().trim().to_string();
            if name.is_empty() {
                format!("Column {}", i + 1)
            } else {
                name
            }
        })
        .collect();

    rows.map(|row| row.iter().map(cell_value).collect::<Vec<_>>())
        .filter(|cells| cells.iter().any(|c| !c.is_blank()))
        .map(|cells| -> Record { columns.iter().cloned().zip(cells).collect() })
        .collect()
}

// ---------------------------------------------------------------------------
// Fetch + parse
// ---------------------------------------------------------------------------

/// Download the spreadsheet body. Non-2xx answers are failures; there are
/// no retries.
pub fn fetch(url: &str, timeout: Duration) -> Result<Vec<u8>> {
    let fetch_err = |reason: String| ReimburseError::Fetch {
        url: url.to_string(),
        reason,
    };
    let agent = ureq::AgentBuilder::new().timeout(timeout).build();
    let response = agent.get(url).call().map_err(|e| match e {
        ureq::Error::Status(code, resp) => fetch_err(format!("HTTP {code} {}", resp.status_text())),
        ureq::Error::Transport(t) => fetch_err(t.to_string()),
    })?;

    let mut body = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut body)
        .map_err(|e| fetch_err(e.to_string()))?;
    Ok(body)
}

fn read_sheet(workbook: &mut Sheets<Cursor<Vec<u8>>>, name: &str) -> Result<Option<Range<Data>>> {
    if !workbook.sheet_names().iter().any(|n| n == name) {
        return Ok(None);
    }
    workbook
        .worksheet_range(name)
        .map(Some)
        .map_err(|e| ReimburseError::Parse(format!("sheet '{name}': {e}")))
}

/// Parse an xlsx/xls/ods body into its `transactions` and `freelancers` sheets.
pub fn parse_workbook(bytes: Vec<u8>) -> Result<RawLedger> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| ReimburseError::Parse(format!("not a readable spreadsheet: {e}")))?;
    let transactions = read_sheet(&mut workbook, TRANSACTIONS_SHEET)?;
    let freelancers = read_sheet(&mut workbook, FREELANCERS_SHEET)?;
    ledger_from_ranges(transactions, freelancers)
}

pub fn ledger_from_ranges(
    transactions: Option<Range<Data>>,
    freelancers: Option<Range<Data>>,
) -> Result<RawLedger> {
    let missing = |sheet: &str| ReimburseError::Parse(format!("missing required sheet '{sheet}'"));
    let transactions = transactions.ok_or_else(|| missing(TRANSACTIONS_SHEET))?;
    let freelancers = freelancers.ok_or_else(|| missing(FREELANCERS_SHEET))?;
    Ok(RawLedger {
        transactions: records_from_range(&transactions),
        freelancers: records_from_range(&freelancers),
    })
}

/// Fetch and parse the configured ledger.
pub fn load_ledger(config: &Config) -> Result<RawLedger> {
    let bytes = fetch(&config.sheets_url, config.fetch_timeout)?;
    tracing::info!(bytes = bytes.len(), "fetched ledger");
    let ledger = parse_workbook(bytes)?;
    tracing::info!(
        transactions = ledger.transactions.len(),
        freelancers = ledger.freelancers.len(),
        "parsed ledger"
    );
    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(rows: &[Vec<Data>]) -> Range<Data> {
        let height = rows.len() as u32;
        let width = rows.iter().map(Vec::len).max().unwrap_or(1) as u32;
        let mut range = Range::new((0, 0), (height - 1, width - 1));
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                range.set_value((r as u32, c as u32), cell.clone());
            }
        }
        range
    }

    fn s(v: &str) -> Data {
        Data::String(v.to_string())
    }

    #[test]
    fn test_excel_serial_to_date() {
        assert_eq!(excel_serial_to_date(45667.0), NaiveDate::from_ymd_opt(2025, 1, 10));
        assert_eq!(excel_serial_to_date(45667.75), NaiveDate::from_ymd_opt(2025, 1, 10));
    }

    #[test]
    fn test_out_of_range_serial_is_none() {
        assert_eq!(excel_serial_to_date(1e16), None);
        assert_eq!(excel_serial_to_date(-1e16), None);
        assert_eq!(excel_serial_to_date(f64::NAN), None);
    }

    #[test]
    fn test_out_of_range_date_cell_falls_back_to_number() {
        let cell = Data::DateTime(calamine::ExcelDateTime::new(
            1e16,
            calamine::ExcelDateTimeType::DateTime,
            false,
        ));
        assert_eq!(cell_value(&cell), CellValue::Float(1e16));
    }

    #[test]
    fn test_records_keep_header_names_and_order() {
        let sheet = range(&[
            vec![s("Ref ID"), s("Amount"), s("Freelancer")],
            vec![Data::Int(1), Data::Float(-50.0), s("Alice")],
            vec![Data::Empty, Data::Empty, Data::Empty],
            vec![Data::Int(2), Data::Float(-30.0), Data::Empty],
        ]);
        let records = records_from_range(&sheet);
        assert_eq!(records.len(), 2);
        let cols: Vec<&str> = records[0].iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(cols, vec!["Ref ID", "Amount", "Freelancer"]);
        assert_eq!(records[0][1].1, CellValue::Float(-50.0));
        assert_eq!(records[1][2].1, CellValue::Empty);
    }

    #[test]
    fn test_unnamed_header_cells() {
        let sheet = range(&[
            vec![s("Ref ID"), Data::Empty],
            vec![Data::Int(1), s("note")],
        ]);
        let records = records_from_range(&sheet);
        assert_eq!(records[0][1].0, "Column 2");
    }

    #[test]
    fn test_iso_datetime_cell() {
        let cell = Data::DateTimeIso("2024-05-01T00:00:00".to_string());
        assert_eq!(
            cell_value(&cell),
            CellValue::Date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
        );
    }

    #[test]
    fn test_missing_sheet_is_parse_error() {
        let txns = range(&[vec![s("Ref ID")]]);
        let err = ledger_from_ranges(Some(txns), None).unwrap_err();
        assert!(matches!(err, ReimburseError::Parse(ref m) if m.contains(FREELANCERS_SHEET)));

        let err = ledger_from_ranges(None, None).unwrap_err();
        assert!(matches!(err, ReimburseError::Parse(ref m) if m.contains(TRANSACTIONS_SHEET)));
    }

    #[test]
    fn test_garbage_body_is_parse_error() {
        let err = parse_workbook(b"<html>Sign in</html>".to_vec()).unwrap_err();
        assert!(matches!(err, ReimburseError::Parse(_)));
    }

    #[test]
    fn test_unreachable_url_is_fetch_error() {
        let err = fetch("http://127.0.0.1:9/ledger.xlsx", Duration::from_secs(2)).unwrap_err();
        assert!(matches!(err, ReimburseError::Fetch { ref url, .. } if url.ends_with("ledger.xlsx")));
    }
}
