use crate::models::CellValue;
use crate::transaction::AMOUNT;

/// Round to whole cents, halves away from zero. Every displayed total in the
/// report goes through this.
pub fn round_cents(val: f64) -> f64 {
    (val * 100.0).round() / 100.0
}

/// Format a float as a dollar amount with thousands separators: $1,234.56
pub fn money(val: f64) -> String {
    let rounded = round_cents(val);
    let cents = format!("{:.2}", rounded.abs());
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if rounded < 0.0 {
        format!("-${grouped}.{dec_part}")
    } else {
        format!("${grouped}.{dec_part}")
    }
}

/// Cell text for a two-column report table. Amounts read as money.
pub fn field_value(name: &str, value: &CellValue) -> String {
    match (name, value.as_f64()) {
        (AMOUNT, Some(v)) => money(v),
        _ => value.to_string(),
    }
}
