use chrono::NaiveDate;
use outlay_core::period::months_before;
use outlay_core::{transaction, CycleSchedule, DateRange, Money, Transaction};
use outlay_import::{Categorized, OTHER_CATEGORY};
use std::fmt::Write as _;

/// Everything the review report needs; `reference` is "today" so callers
/// and tests control the clock.
pub struct ReviewInputs<'a> {
    pub transactions: &'a [Transaction],
    pub budget: Money,
    pub num_periods: usize,
    pub schedule: Option<CycleSchedule>,
    pub reference: NaiveDate,
}

/// Lists every transaction that fell through to the reserved `Other`
/// category, so unrecognized merchants can be added to the classification
/// file.
pub fn other_transactions_report(categorized: &[Categorized]) -> String {
    let others: Vec<&Categorized> = categorized
        .iter()
        .filter(|c| c.category == OTHER_CATEGORY)
        .collect();

    if others.is_empty() {
        return "No transactions categorized as 'Other'.\n".to_string();
    }

    let mut out = String::from("Transactions categorized as 'Other':\n");
    for c in others {
        let t = &c.transaction;
        let _ = writeln!(out, "{}  {:<40}  {:>12}", t.date, t.description, t.amount.to_string());
    }
    out
}

/// Plain-text spending review over the last n calendar months or billing
/// cycles: per-period totals, the budget verdict, daily average, largest
/// transactions, and the first-to-last trend.
pub fn budget_review(inputs: &ReviewInputs<'_>) -> String {
    let periods = review_periods(inputs);
    let window = overall_window(&periods);

    let mut out = String::new();
    let descriptor = match inputs.schedule {
        Some(s) => format!(
            "{} billing cycle(s) ending on day {} of the month",
            inputs.num_periods,
            s.cutoff_day()
        ),
        None => format!("{} calendar month(s)", inputs.num_periods),
    };
    let _ = writeln!(out, "Spending review for the last {descriptor}.");

    // Oldest first so the list reads chronologically.
    let mut period_totals = Vec::new();
    for (label, range) in periods.iter().rev() {
        let in_period: Vec<&Transaction> = inputs
            .transactions
            .iter()
            .filter(|t| range.contains(t.date) && !t.is_account_activity())
            .collect();
        let total = transaction::gross_spending(in_period.iter().copied());
        let _ = writeln!(out, "  {label}: {}", total.grouped());
        period_totals.push(total);
    }

    let spending: Vec<&Transaction> = inputs
        .transactions
        .iter()
        .filter(|t| !t.is_account_activity())
        .collect();
    let total = transaction::gross_spending(spending.iter().copied());

    let verdict = if total > inputs.budget {
        format!("over budget by {}", (total - inputs.budget).grouped())
    } else {
        format!("under budget by {}", (inputs.budget - total).grouped())
    };
    let _ = writeln!(
        out,
        "Total spending: {} against a budget of {}, {verdict}.",
        total.grouped(),
        inputs.budget.grouped()
    );

    if let Some(window) = window {
        let average = Money::from_cents(total.to_cents() / window.day_count());
        let _ = writeln!(out, "Average daily spend: {} across {}.", average.grouped(), window);
    }

    let mut largest: Vec<&&Transaction> = spending.iter().filter(|t| t.is_spending()).collect();
    largest.sort_by_key(|t| std::cmp::Reverse(t.amount.to_cents()));
    if !largest.is_empty() {
        let _ = writeln!(out, "Largest transactions:");
        for t in largest.iter().take(5) {
            let _ = writeln!(out, "  {}  {:<40}  {:>12}", t.date, t.description, t.amount.to_string());
        }
    }

    if let (Some(first), Some(last)) = (period_totals.first(), period_totals.last()) {
        if period_totals.len() > 1 {
            let direction = if last > first {
                "increased"
            } else if last < first {
                "decreased"
            } else {
                "held steady"
            };
            let _ = writeln!(
                out,
                "Trend: spending {direction} from {} in the earliest period to {} in the most recent.",
                first.grouped(),
                last.grouped()
            );
        }
    }

    out
}

/// Labelled period ranges, most recent first, mirroring the file-fetch
/// order.
fn review_periods(inputs: &ReviewInputs<'_>) -> Vec<(String, DateRange)> {
    match inputs.schedule {
        Some(schedule) => schedule
            .last_cycles(inputs.num_periods, inputs.reference)
            .into_iter()
            .map(|range| (range.to_string(), range))
            .collect(),
        None => months_before(inputs.reference, inputs.num_periods)
            .into_iter()
            .map(|month| (month.label(), month.range()))
            .collect(),
    }
}

fn overall_window(periods: &[(String, DateRange)]) -> Option<DateRange> {
    let start = periods.iter().map(|(_, r)| r.start).min()?;
    let end = periods.iter().map(|(_, r)| r.end).max()?;
    Some(DateRange::new(start, end))
}
