use chrono::NaiveDate;
use outlay_core::period::months_before;
use outlay_core::{CycleSchedule, Month, Transaction};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::csv::{self, CsvProfile};

/// Wholesale concatenation of the located monthly files, regenerated on
/// every run.
pub const COMBINED_FILENAME: &str = "combined_transactions.csv";

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] crate::csv::CsvError),
    #[error("invalid filename pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("no transaction files found for the requested period")]
    NoFilesFound,
}

/// The export filename convention: `"January 2024 - transactions.csv"`.
pub fn transactions_filename(month: Month) -> String {
    format!("{} - transactions.csv", month.label())
}

/// Candidate file paths for the last `num_months` calendar months, most
/// recent first. When a billing cutoff is in play one extra month is
/// fetched so the oldest cycle's head is covered.
pub fn candidate_files(
    folder: &Path,
    num_months: usize,
    schedule: Option<CycleSchedule>,
    today: NaiveDate,
) -> Vec<PathBuf> {
    let fetch = match schedule {
        Some(s) => {
            info!(
                "billing cutoff day {} set, fetching {} calendar month(s) to cover {} cycle(s)",
                s.cutoff_day(),
                num_months + 1,
                num_months
            );
            num_months + 1
        }
        None => num_months,
    };

    months_before(today, fetch)
        .into_iter()
        .map(|m| folder.join(transactions_filename(m)))
        .collect()
}

/// Finds the export for a specific month by parsing the `"<Month> <Year>"`
/// prefix of each CSV filename. Files that do not follow the convention
/// are ignored.
pub fn find_month_file(folder: &Path, month: Month) -> Option<PathBuf> {
    let entries = match fs::read_dir(folder) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("cannot list {}: {e}", folder.display());
            return None;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some((prefix, _)) = name.split_once(" -") else {
            continue;
        };
        if Month::parse_label(prefix) == Ok(month) {
            return Some(path);
        }
    }

    None
}

/// Is any `"<Month> <Year> -*.csv"` export present for the month of `today`?
pub fn current_month_exists(folder: &Path, today: NaiveDate) -> Result<bool, DiscoveryError> {
    let label = Month::containing(today).label();
    let pattern = Regex::new(&format!("^{} -.*\\.csv$", regex::escape(&label)))?;

    for entry in fs::read_dir(folder)?.flatten() {
        if let Some(name) = entry.path().file_name().and_then(|n| n.to_str()) {
            if pattern.is_match(name) {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

#[derive(Debug)]
pub struct CombineOutcome {
    pub combined_path: PathBuf,
    pub transactions: Vec<Transaction>,
    pub files_read: usize,
    pub rows_skipped: usize,
}

/// Reads every located monthly file (missing files are skipped), errors if
/// none were readable, and writes the concatenation next to the inputs.
pub fn combine_recent_months(
    folder: &Path,
    num_months: usize,
    schedule: Option<CycleSchedule>,
    today: NaiveDate,
    profile: &CsvProfile,
) -> Result<CombineOutcome, DiscoveryError> {
    let mut transactions = Vec::new();
    let mut files_read = 0usize;
    let mut rows_skipped = 0usize;

    for path in candidate_files(folder, num_months, schedule, today) {
        if !path.exists() {
            info!("missing file {}, skipping", path.display());
            continue;
        }
        match csv::read_transactions(&path, profile) {
            Ok(outcome) => {
                transactions.extend(outcome.transactions);
                rows_skipped += outcome.skipped_rows;
                files_read += 1;
            }
            Err(e) => warn!("error reading file {}: {e}", path.display()),
        }
    }

    if files_read == 0 {
        return Err(DiscoveryError::NoFilesFound);
    }
    info!("found and read {files_read} transaction file(s)");

    let combined_path = folder.join(COMBINED_FILENAME);
    csv::write_transactions(&combined_path, &transactions)?;

    Ok(CombineOutcome {
        combined_path,
        transactions,
        files_read,
        rows_skipped,
    })
}

/// Filters transactions to the overall window of the last `num_cycles`
/// billing cycles counted back from the reference date.
pub fn segment_by_cycles(
    transactions: Vec<Transaction>,
    schedule: CycleSchedule,
    num_cycles: usize,
    reference: NaiveDate,
) -> Vec<Transaction> {
    let Some(window) = schedule.window(num_cycles, reference) else {
        return Vec::new();
    };
    info!("filtering transactions from {} to {}", window.start, window.end);
    transactions
        .into_iter()
        .filter(|t| window.contains(t.date))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use outlay_core::Money;
    use std::fs::File;
    use std::io::Write;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn month(y: i32, m: u32) -> Month {
        Month::new(y, m).unwrap()
    }

    fn write_file(dir: &Path, name: &str, contents: &str) {
        let mut file = File::create(dir.join(name)).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn filename_follows_export_convention() {
        assert_eq!(
            transactions_filename(month(2024, 1)),
            "January 2024 - transactions.csv"
        );
    }

    #[test]
    fn candidate_files_walk_backward_from_today() {
        let files = candidate_files(Path::new("data"), 2, None, date(2024, 3, 15));
        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "February 2024 - transactions.csv",
                "January 2024 - transactions.csv"
            ]
        );
    }

    #[test]
    fn candidate_files_fetch_one_extra_month_for_cycles() {
        let schedule = CycleSchedule::new(15).unwrap();
        let files = candidate_files(Path::new("data"), 2, Some(schedule), date(2024, 3, 15));
        assert_eq!(files.len(), 3);
        assert!(files[2].ends_with("December 2023 - transactions.csv"));
    }

    #[test]
    fn find_month_file_parses_filename_prefixes() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "January 2024 - transactions.csv", "x");
        write_file(dir.path(), "December 2023 - transactions.csv", "x");
        write_file(dir.path(), "notes.csv", "x");
        write_file(dir.path(), "January 2024 - budget.txt", "x");

        let found = find_month_file(dir.path(), month(2024, 1)).unwrap();
        assert!(found.ends_with("January 2024 - transactions.csv"));
        assert!(find_month_file(dir.path(), month(2024, 2)).is_none());
    }

    #[test]
    fn find_month_file_missing_folder_is_none() {
        assert!(find_month_file(Path::new("/no/such/folder"), month(2024, 1)).is_none());
    }

    #[test]
    fn current_month_matches_any_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let today = date(2024, 3, 10);
        assert!(!current_month_exists(dir.path(), today).unwrap());

        write_file(dir.path(), "March 2024 - card export.csv", "x");
        assert!(current_month_exists(dir.path(), today).unwrap());
    }

    #[test]
    fn current_month_ignores_other_months_and_extensions() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "February 2024 - transactions.csv", "x");
        write_file(dir.path(), "March 2024 - transactions.txt", "x");
        assert!(!current_month_exists(dir.path(), date(2024, 3, 10)).unwrap());
    }

    #[test]
    fn combine_concatenates_found_months_and_skips_missing() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "February 2024 - transactions.csv",
            "date,description,amount\n2024-02-05,COFFEE,4.50\n",
        );
        // January is missing on purpose.
        let outcome = combine_recent_months(
            dir.path(),
            2,
            None,
            date(2024, 3, 15),
            &CsvProfile::default(),
        )
        .unwrap();

        assert_eq!(outcome.files_read, 1);
        assert_eq!(outcome.transactions.len(), 1);
        assert!(outcome.combined_path.exists());

        let written = csv::read_transactions(&outcome.combined_path, &CsvProfile::default())
            .unwrap()
            .transactions;
        assert_eq!(written, outcome.transactions);
    }

    #[test]
    fn combine_with_no_files_errors() {
        let dir = tempfile::tempdir().unwrap();
        let result = combine_recent_months(
            dir.path(),
            2,
            None,
            date(2024, 3, 15),
            &CsvProfile::default(),
        );
        assert!(matches!(result, Err(DiscoveryError::NoFilesFound)));
    }

    #[test]
    fn segment_keeps_only_window_transactions() {
        let schedule = CycleSchedule::new(10).unwrap();
        let txs = vec![
            Transaction::new(date(2023, 1, 5), "TOO OLD", Money::from_cents(100)),
            Transaction::new(date(2023, 1, 11), "WINDOW START", Money::from_cents(200)),
            Transaction::new(date(2023, 3, 10), "WINDOW END", Money::from_cents(300)),
            Transaction::new(date(2023, 3, 11), "TOO NEW", Money::from_cents(400)),
        ];
        let kept = segment_by_cycles(txs, schedule, 2, date(2023, 3, 15));
        let names: Vec<_> = kept.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(names, vec!["WINDOW START", "WINDOW END"]);
    }

    #[test]
    fn segment_zero_cycles_is_empty() {
        let schedule = CycleSchedule::new(10).unwrap();
        let txs = vec![Transaction::new(date(2023, 1, 5), "A", Money::from_cents(100))];
        assert!(segment_by_cycles(txs, schedule, 0, date(2023, 3, 15)).is_empty());
    }
}
