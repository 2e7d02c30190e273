use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::money::Money;
use super::period::DateRange;

/// One row of a bank export: positive amounts are spending, negative
/// amounts are payments or refunds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Money,
}

impl Transaction {
    pub fn new(date: NaiveDate, description: impl Into<String>, amount: Money) -> Self {
        Transaction {
            date,
            description: description.into(),
            amount,
        }
    }

    pub fn is_spending(&self) -> bool {
        self.amount.is_positive()
    }

    /// Card payments and interest charges are account activity, not
    /// spending, and are excluded before any category aggregate.
    pub fn is_account_activity(&self) -> bool {
        let description = self.description.to_lowercase();
        description.contains("payment") || description.contains("interest charge")
    }
}

/// Sum of positive amounts only; payments and refunds do not offset it.
pub fn gross_spending<'a, I>(transactions: I) -> Money
where
    I: IntoIterator<Item = &'a Transaction>,
{
    transactions
        .into_iter()
        .filter(|t| t.is_spending())
        .map(|t| t.amount)
        .sum()
}

/// Per-day spending totals (positive amounts only), keyed in date order.
pub fn daily_spending<'a, I>(transactions: I) -> BTreeMap<NaiveDate, Money>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut daily = BTreeMap::new();
    for t in transactions.into_iter().filter(|t| t.is_spending()) {
        *daily.entry(t.date).or_insert_with(Money::zero) += t.amount;
    }
    daily
}

/// Earliest and latest transaction dates, or None for an empty slice.
pub fn date_extent<'a, I>(transactions: I) -> Option<DateRange>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut iter = transactions.into_iter();
    let first = iter.next()?.date;
    let (start, end) = iter.fold((first, first), |(lo, hi), t| {
        (lo.min(t.date), hi.max(t.date))
    });
    Some(DateRange::new(start, end))
}
