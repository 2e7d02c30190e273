pub mod chart;
pub mod summary;

pub use chart::{category_totals_chart, spending_vs_budget_chart, ChartError};
pub use summary::{budget_review, other_transactions_report, ReviewInputs};
