use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use outlay_core::{CycleSchedule, Money, Month};
use outlay_import::csv::CsvProfile;
use outlay_import::rules::KeywordClassifier;
use outlay_import::{csv as transactions_csv, monthly};
use outlay_report::{
    budget_review, category_totals_chart, other_transactions_report, spending_vs_budget_chart,
    ReviewInputs,
};
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tracing::info;

pub const NOTIFICATIONS_FILENAME: &str = "notifications.log";

/// Prints and returns whether the current month's export is present; the
/// caller turns a miss into a nonzero exit.
pub fn check(folder: &Path, today: NaiveDate) -> Result<bool> {
    let month = Month::containing(today);
    let found = monthly::current_month_exists(folder, today)
        .with_context(|| format!("searching {}", folder.display()))?;

    if found {
        println!("The transaction CSV for {month} was found.");
    } else {
        println!("The transaction CSV for {month} was not found.");
    }
    Ok(found)
}

pub fn graph(csv: &Path, budget: Money, out: &Path) -> Result<()> {
    let outcome = transactions_csv::read_transactions(csv, &CsvProfile::default())
        .with_context(|| format!("reading {}", csv.display()))?;
    spending_vs_budget_chart(&outcome.transactions, budget, out)?;
    println!("Plot saved to {}", out.display());
    Ok(())
}

pub fn categories(csv: &Path, rules: &Path, out: &Path, other_out: &Path) -> Result<()> {
    let outcome = transactions_csv::read_transactions(csv, &CsvProfile::default())
        .with_context(|| format!("reading {}", csv.display()))?;
    let classifier = KeywordClassifier::from_csv_path(rules)
        .with_context(|| format!("loading classification file {}", rules.display()))?;
    let tagged = classifier.classify(&outcome.transactions);

    let other_report = other_transactions_report(&tagged);
    fs::write(other_out, &other_report)
        .with_context(|| format!("writing {}", other_out.display()))?;
    print!("{other_report}");

    category_totals_chart(&tagged, out)?;
    println!("Chart saved to {}", out.display());
    Ok(())
}

pub fn review(
    folder: &Path,
    months: usize,
    budget: Money,
    cutoff_day: Option<u32>,
    out: &Path,
    today: NaiveDate,
) -> Result<()> {
    let schedule = cutoff_day.map(CycleSchedule::new).transpose()?;
    let outcome =
        monthly::combine_recent_months(folder, months, schedule, today, &CsvProfile::default())?;
    info!(
        "combined transactions written to {}",
        outcome.combined_path.display()
    );

    let transactions = match schedule {
        Some(s) => monthly::segment_by_cycles(outcome.transactions, s, months, today),
        None => outcome.transactions,
    };
    if transactions.is_empty() {
        println!("No transactions found for the requested period; skipping the review.");
        return Ok(());
    }

    let report = budget_review(&ReviewInputs {
        transactions: &transactions,
        budget,
        num_periods: months,
        schedule,
        reference: today,
    });
    fs::write(out, &report).with_context(|| format!("writing {}", out.display()))?;
    print!("{report}");
    println!("Review written to {}", out.display());
    Ok(())
}

/// The driver: locate last month's export, run the graph and categories
/// steps as subprocesses of this same binary, and log notification
/// messages. State moves between steps through files and exit codes only.
pub fn run_pipeline(
    folder: &Path,
    rules: &Path,
    budget: Money,
    out_dir: &Path,
    today: NaiveDate,
) -> Result<()> {
    let last_month = Month::containing(today).pred();
    let Some(latest) = monthly::find_month_file(folder, last_month) else {
        let message = "Last month's CSV export is missing.";
        notify(out_dir, message, None)?;
        println!("{message}");
        bail!("no transaction file for {last_month} in {}", folder.display());
    };
    println!("Latest file: {}", latest.display());

    fs::create_dir_all(out_dir)?;
    let graph_out = out_dir.join("spending_graph.png");
    let categories_out = out_dir.join("spending_categories.png");
    let other_out = out_dir.join("other_transactions.txt");

    let exe = std::env::current_exe().context("resolving own executable")?;
    run_step(&exe, &graph_step(&latest, budget, &graph_out))?;
    run_step(
        &exe,
        &categories_step(&latest, rules, &categories_out, &other_out),
    )?;

    notify(
        out_dir,
        &format!(
            "Analysis completed for file: {}\nGraph and categories are ready!",
            latest.display()
        ),
        Some(&graph_out),
    )?;
    notify(out_dir, "Categories Breakdown", Some(&categories_out))?;
    Ok(())
}

fn graph_step(csv: &Path, budget: Money, out: &Path) -> Vec<OsString> {
    vec![
        "graph".into(),
        csv.into(),
        "--budget".into(),
        budget.amount_str().into(),
        "--out".into(),
        out.into(),
    ]
}

fn categories_step(csv: &Path, rules: &Path, out: &Path, other_out: &Path) -> Vec<OsString> {
    vec![
        "categories".into(),
        csv.into(),
        "--rules".into(),
        rules.into(),
        "--out".into(),
        out.into(),
        "--other-out".into(),
        other_out.into(),
    ]
}

fn run_step(exe: &Path, args: &[OsString]) -> Result<()> {
    let status = Command::new(exe)
        .args(args)
        .status()
        .with_context(|| format!("spawning {} {:?}", exe.display(), args))?;
    if !status.success() {
        bail!("step {:?} failed with {status}", args.first());
    }
    Ok(())
}

/// Appends the operator notification to the log next to the outputs.
/// Delivery to a chat channel happens outside this tool.
fn notify(out_dir: &Path, message: &str, attachment: Option<&Path>) -> Result<()> {
    fs::create_dir_all(out_dir)?;

    let mut entry = String::from(message);
    if let Some(attachment) = attachment {
        entry.push_str(&format!("\nattachment: {}", attachment.display()));
    }
    entry.push('\n');

    let path = out_dir.join(NOTIFICATIONS_FILENAME);
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening {}", path.display()))?;
    file.write_all(entry.as_bytes())?;
    info!("notification logged to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn check_reports_presence_of_current_month_file() {
        let dir = tempfile::tempdir().unwrap();
        let today = date(2024, 3, 10);
        assert!(!check(dir.path(), today).unwrap());

        fs::write(dir.path().join("March 2024 - transactions.csv"), "x").unwrap();
        assert!(check(dir.path(), today).unwrap());
    }

    #[test]
    fn graph_step_arguments() {
        let args = graph_step(
            Path::new("February 2024 - transactions.csv"),
            Money::from_cents(150_000),
            Path::new("out/spending_graph.png"),
        );
        let rendered: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            rendered,
            vec![
                "graph",
                "February 2024 - transactions.csv",
                "--budget",
                "1500.00",
                "--out",
                "out/spending_graph.png",
            ]
        );
    }

    #[test]
    fn categories_step_arguments() {
        let args = categories_step(
            Path::new("feb.csv"),
            Path::new("classification.csv"),
            Path::new("cats.png"),
            Path::new("other.txt"),
        );
        assert_eq!(args[0], OsString::from("categories"));
        assert_eq!(args[2], OsString::from("--rules"));
        assert_eq!(args.len(), 8);
    }

    #[test]
    fn notify_appends_to_the_log() {
        let dir = tempfile::tempdir().unwrap();
        notify(dir.path(), "first message", None).unwrap();
        notify(dir.path(), "second message", Some(Path::new("chart.png"))).unwrap();

        let log = fs::read_to_string(dir.path().join(NOTIFICATIONS_FILENAME)).unwrap();
        assert!(log.contains("first message\n"));
        assert!(log.contains("second message\nattachment: chart.png\n"));
    }

    #[test]
    fn run_pipeline_without_last_month_logs_and_fails() {
        let exports = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();

        let result = run_pipeline(
            exports.path(),
            Path::new("classification.csv"),
            Money::from_cents(100_000),
            out_dir.path(),
            date(2024, 3, 10),
        );
        assert!(result.is_err());

        let log = fs::read_to_string(out_dir.path().join(NOTIFICATIONS_FILENAME)).unwrap();
        assert!(log.contains("Last month's CSV export is missing."));
    }
}
