use chrono::{Duration, NaiveDate};
use outlay_core::{transaction, Money, Transaction};
use outlay_import::Categorized;
use plotters::prelude::*;
use std::path::Path;
use thiserror::Error;
use tracing::info;

const CHART_SIZE: (u32, u32) = (1200, 600);
const BAR_FILL: RGBColor = RGBColor(135, 206, 235); // sky blue
const PLOT_DAYS: i64 = 30;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("no dated spending rows to plot")]
    NoData,
    #[error("failed to render chart: {0}")]
    Render(String),
}

fn rerr(e: impl std::fmt::Display) -> ChartError {
    ChartError::Render(e.to_string())
}

/// Cumulative daily spending over a 30-day window starting at the earliest
/// transaction, against a straight pro-rated budget line.
pub fn spending_vs_budget_chart(
    transactions: &[Transaction],
    budget: Money,
    out: &Path,
) -> Result<(), ChartError> {
    let daily = transaction::daily_spending(transactions);
    let start = daily.keys().next().copied().ok_or(ChartError::NoData)?;
    let days: Vec<NaiveDate> = (0..PLOT_DAYS).map(|i| start + Duration::days(i)).collect();

    let mut cumulative = Vec::with_capacity(days.len());
    let mut running = Money::zero();
    for day in &days {
        if let Some(spent) = daily.get(day) {
            running += *spent;
        }
        cumulative.push((*day, running.to_f64()));
    }
    let total = running;

    let daily_budget = budget.to_f64() / days.len() as f64;
    let budget_line: Vec<(NaiveDate, f64)> = days
        .iter()
        .enumerate()
        .map(|(i, day)| (*day, daily_budget * (i + 1) as f64))
        .collect();

    let y_max = (total.to_f64().max(budget.to_f64()).max(1.0)) * 1.1;
    let x_range = days[0]..days[days.len() - 1];

    let root = BitMapBackend::new(out, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(rerr)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Spending vs Budget", ("sans-serif", 32))
        .margin(20)
        .x_label_area_size(45)
        .y_label_area_size(75)
        .build_cartesian_2d(x_range, 0f64..y_max)
        .map_err(rerr)?;

    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc("Cumulative Spending ($)")
        .x_labels(10)
        .x_label_formatter(&|d| d.format("%b %d").to_string())
        .draw()
        .map_err(rerr)?;

    chart
        .draw_series(LineSeries::new(cumulative.iter().copied(), BLUE.stroke_width(2)))
        .map_err(rerr)?
        .label("Actual Spending")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE.stroke_width(2)));

    chart
        .draw_series(LineSeries::new(budget_line.iter().copied(), RED.stroke_width(2)))
        .map_err(rerr)?
        .label(format!("Budget ({})", budget.grouped()))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(2)));

    if let Some(&(last_day, last_value)) = cumulative.last() {
        chart
            .draw_series(std::iter::once(Text::new(
                format!("Total: {}", total.grouped()),
                (last_day, last_value),
                ("sans-serif", 18).into_font().color(&BLACK),
            )))
            .map_err(rerr)?;
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(rerr)?;

    root.present().map_err(rerr)?;
    info!("plot saved to {}", out.display());
    Ok(())
}

/// Net spending per category as a descending bar chart. Payments and
/// interest charges are excluded first; the title carries the gross
/// (positive-only) spend over the remaining date extent.
pub fn category_totals_chart(categorized: &[Categorized], out: &Path) -> Result<(), ChartError> {
    let kept: Vec<&Categorized> = categorized
        .iter()
        .filter(|c| !c.transaction.is_account_activity())
        .collect();

    let extent = transaction::date_extent(kept.iter().map(|c| &c.transaction))
        .ok_or(ChartError::NoData)?;
    let gross = transaction::gross_spending(kept.iter().map(|c| &c.transaction));
    let totals = net_category_totals(&kept);

    let names: Vec<String> = totals.iter().map(|(name, _)| name.clone()).collect();
    let values: Vec<f64> = totals.iter().map(|(_, total)| total.to_f64()).collect();

    let y_max = values.iter().copied().fold(1.0, f64::max) * 1.15;
    let y_min = values.iter().copied().fold(0.0, f64::min).min(0.0) * 1.15;
    let title = format!(
        "{} spent over {} to {}",
        gross.grouped(),
        extent.start.format("%B %d, %Y"),
        extent.end.format("%B %d, %Y"),
    );

    let root = BitMapBackend::new(out, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(rerr)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 26))
        .margin(20)
        .x_label_area_size(110)
        .y_label_area_size(75)
        .build_cartesian_2d((0..totals.len()).into_segmented(), y_min..y_max)
        .map_err(rerr)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .y_desc("Total Spending ($)")
        .x_labels(totals.len())
        .x_label_formatter(&|segment| {
            let index = match segment {
                SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => *i,
                SegmentValue::Last => return String::new(),
            };
            names.get(index).cloned().unwrap_or_default()
        })
        .draw()
        .map_err(rerr)?;

    chart
        .draw_series(values.iter().enumerate().map(|(i, value)| {
            Rectangle::new(
                [
                    (SegmentValue::Exact(i), 0.0),
                    (SegmentValue::Exact(i + 1), *value),
                ],
                BAR_FILL.filled(),
            )
        }))
        .map_err(rerr)?;

    let label_offset = (y_max - y_min) * 0.02;
    chart
        .draw_series(totals.iter().enumerate().map(|(i, (_, total))| {
            Text::new(
                total.grouped(),
                (SegmentValue::CenterOf(i), total.to_f64() + label_offset),
                ("sans-serif", 14).into_font().color(&BLACK),
            )
        }))
        .map_err(rerr)?;

    root.present().map_err(rerr)?;
    info!("chart saved to {}", out.display());
    Ok(())
}

/// Net total per category (negative refunds offset spending), sorted
/// descending the way the bars are drawn.
fn net_category_totals(kept: &[&Categorized]) -> Vec<(String, Money)> {
    let mut totals: Vec<(String, Money)> = Vec::new();
    for c in kept {
        match totals.iter_mut().find(|(name, _)| *name == c.category) {
            Some((_, total)) => *total += c.transaction.amount,
            None => totals.push((c.category.clone(), c.transaction.amount)),
        }
    }
    totals.sort_by_key(|(_, total)| std::cmp::Reverse(total.to_cents()));
    totals
}
