use chrono::NaiveDate;
use outlay_core::{Money, Transaction};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// How to read one bank's export: which headers carry the three fields and
/// which date format to try first. Headers are matched case-insensitively
/// (exports disagree on "Date" vs "date").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvProfile {
    pub date_header: String,
    pub description_header: String,
    pub amount_header: String,
    pub date_format: String,
}

impl Default for CsvProfile {
    fn default() -> Self {
        Self {
            date_header: "date".to_string(),
            description_header: "description".to_string(),
            amount_header: "amount".to_string(),
            date_format: "%Y-%m-%d".to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum CsvError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing required column: {0}")]
    MissingColumn(String),
    #[error("invalid date: {0}")]
    InvalidDate(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("no data rows")]
    NoDataRows,
}

/// Parsed rows plus the count of rows dropped for unparseable dates or
/// amounts. Bad rows are skipped, not fatal.
#[derive(Debug)]
pub struct ReadOutcome {
    pub transactions: Vec<Transaction>,
    pub skipped_rows: usize,
}

pub fn read_transactions(path: &Path, profile: &CsvProfile) -> Result<ReadOutcome, CsvError> {
    let file = File::open(path)?;
    read_transactions_from(file, profile)
}

pub fn read_transactions_from<R: Read>(
    data: R,
    profile: &CsvProfile,
) -> Result<ReadOutcome, CsvError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    let headers = reader.headers()?.clone();
    let date_col = resolve_column(&headers, &profile.date_header)?;
    let description_col = resolve_column(&headers, &profile.description_header)?;
    let amount_col = resolve_column(&headers, &profile.amount_header)?;

    let mut transactions = Vec::new();
    let mut skipped_rows = 0usize;

    for result in reader.records() {
        let record = result?;
        if record.is_empty() {
            continue;
        }

        let date_field = record.get(date_col).unwrap_or_default();
        let amount_field = record.get(amount_col).unwrap_or_default();
        let (date, amount) = match (
            parse_date(date_field, &profile.date_format),
            parse_amount(amount_field),
        ) {
            (Ok(date), Ok(amount)) => (date, amount),
            _ => {
                skipped_rows += 1;
                continue;
            }
        };

        let description = record.get(description_col).unwrap_or_default().to_string();
        transactions.push(Transaction::new(date, description, Money::from_cents(amount)));
    }

    if skipped_rows > 0 {
        warn!("dropped {skipped_rows} row(s) with unparseable dates or amounts");
    }
    if transactions.is_empty() && skipped_rows == 0 {
        return Err(CsvError::NoDataRows);
    }

    Ok(ReadOutcome {
        transactions,
        skipped_rows,
    })
}

/// Writes transactions back out with the canonical lowercase header, as
/// used for `combined_transactions.csv`.
pub fn write_transactions(path: &Path, transactions: &[Transaction]) -> Result<(), CsvError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["date", "description", "amount"])?;
    for t in transactions {
        writer.write_record([
            t.date.to_string(),
            t.description.clone(),
            t.amount.amount_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn resolve_column(headers: &csv::StringRecord, name: &str) -> Result<usize, CsvError> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
        .ok_or_else(|| CsvError::MissingColumn(name.to_string()))
}

fn parse_date(s: &str, format: &str) -> Result<NaiveDate, CsvError> {
    let s = s.trim();

    if let Ok(date) = NaiveDate::parse_from_str(s, format) {
        return Ok(date);
    }

    for fmt in &[
        "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d", "%m-%d-%Y", "%d-%m-%Y", "%Y-%m-%d",
    ] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    Err(CsvError::InvalidDate(s.to_string()))
}

fn parse_amount(s: &str) -> Result<i64, CsvError> {
    let s = s.trim();
    let (negative, s) = if s.starts_with('(') && s.ends_with(')') {
        (true, &s[1..s.len() - 1])
    } else {
        (false, s)
    };
    let s = s.replace([',', '$', ' '], "");
    let mut dec = Decimal::from_str(&s).map_err(|_| CsvError::InvalidAmount(s.to_string()))?;
    if negative {
        dec = -dec;
    }
    let cents = (dec * Decimal::from(100))
        .round()
        .to_i64()
        .ok_or_else(|| CsvError::InvalidAmount(s.to_string()))?;
    Ok(cents)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ── parse_amount ──────────────────────────────────────────────────────────

    #[test]
    fn parse_amount_plain() {
        assert_eq!(parse_amount("123.45").unwrap(), 12345);
    }

    #[test]
    fn parse_amount_with_dollar_sign_and_commas() {
        assert_eq!(parse_amount("$1,234.56").unwrap(), 123456);
    }

    #[test]
    fn parse_amount_negative_and_parens() {
        assert_eq!(parse_amount("-50.00").unwrap(), -5000);
        assert_eq!(parse_amount("(75.25)").unwrap(), -7525);
    }

    #[test]
    fn parse_amount_invalid() {
        assert!(parse_amount("not_a_number").is_err());
        assert!(parse_amount("").is_err());
    }

    // ── parse_date ────────────────────────────────────────────────────────────

    #[test]
    fn parse_date_primary_format() {
        assert_eq!(parse_date("2024-01-15", "%Y-%m-%d").unwrap(), date(2024, 1, 15));
    }

    #[test]
    fn parse_date_falls_back_to_common_formats() {
        assert_eq!(parse_date("01/15/2024", "%Y-%m-%d").unwrap(), date(2024, 1, 15));
    }

    #[test]
    fn parse_date_invalid() {
        assert!(parse_date("not-a-date", "%Y-%m-%d").is_err());
    }

    // ── reading ───────────────────────────────────────────────────────────────

    #[test]
    fn read_basic_export() {
        let data = b"date,description,amount\n2024-01-15,AMAZON,49.99\n2024-01-16,STARBUCKS,-5.00\n";
        let outcome = read_transactions_from(data.as_ref(), &CsvProfile::default()).unwrap();
        assert_eq!(outcome.transactions.len(), 2);
        assert_eq!(outcome.skipped_rows, 0);
        assert_eq!(outcome.transactions[0].description, "AMAZON");
        assert_eq!(outcome.transactions[0].amount.to_cents(), 4999);
        assert_eq!(outcome.transactions[1].amount.to_cents(), -500);
    }

    #[test]
    fn read_matches_headers_case_insensitively() {
        let data = b"Date,Description,Amount\n2024-01-15,AMAZON,49.99\n";
        let outcome = read_transactions_from(data.as_ref(), &CsvProfile::default()).unwrap();
        assert_eq!(outcome.transactions.len(), 1);
    }

    #[test]
    fn read_strips_dollar_signs_in_amounts() {
        let data = b"date,description,amount\n2024-01-15,RENT,\"$1,500.00\"\n";
        let outcome = read_transactions_from(data.as_ref(), &CsvProfile::default()).unwrap();
        assert_eq!(outcome.transactions[0].amount.to_cents(), 150000);
    }

    #[test]
    fn read_skips_and_counts_bad_rows() {
        let data = b"date,description,amount\nnot-a-date,BAD,1.00\n2024-01-15,GOOD,2.00\n2024-01-16,ALSO BAD,oops\n";
        let outcome = read_transactions_from(data.as_ref(), &CsvProfile::default()).unwrap();
        assert_eq!(outcome.transactions.len(), 1);
        assert_eq!(outcome.skipped_rows, 2);
        assert_eq!(outcome.transactions[0].description, "GOOD");
    }

    #[test]
    fn read_missing_column_errors() {
        let data = b"date,name,amount\n2024-01-15,AMAZON,49.99\n";
        let result = read_transactions_from(data.as_ref(), &CsvProfile::default());
        assert!(matches!(result, Err(CsvError::MissingColumn(c)) if c == "description"));
    }

    #[test]
    fn read_header_only_file_errors() {
        let data = b"date,description,amount\n";
        let result = read_transactions_from(data.as_ref(), &CsvProfile::default());
        assert!(matches!(result, Err(CsvError::NoDataRows)));
    }

    #[test]
    fn write_then_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let txs = vec![
            Transaction::new(date(2024, 1, 15), "AMAZON", Money::from_cents(4999)),
            Transaction::new(date(2024, 1, 16), "REFUND", Money::from_cents(-500)),
        ];
        write_transactions(&path, &txs).unwrap();
        let outcome = read_transactions(&path, &CsvProfile::default()).unwrap();
        assert_eq!(outcome.transactions, txs);
    }
}
