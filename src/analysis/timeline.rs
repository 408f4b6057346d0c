use crate::analysis::stats::accumulate;
use crate::analysis::{AggregateKind, Availability, Unavailable};
use crate::model::Transactions;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTotal {
    pub day: NaiveDate,
    pub credit: Decimal,
    pub debit: Decimal,
}

/// Credit and debit per calendar day, ascending by day. Days without records are not filled in.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DailyTotals {
    pub days: Vec<DailyTotal>,
    /// Records left out because their timestamp was missing or unparseable.
    pub excluded: usize,
}

pub fn daily_totals(transactions: &Transactions) -> Availability<DailyTotals> {
    totals(transactions).into()
}

fn totals(transactions: &Transactions) -> Result<DailyTotals, Unavailable> {
    AggregateKind::DailyTotals.check(transactions.mapping())?;

    let mut days: BTreeMap<NaiveDate, (Decimal, Decimal)> = BTreeMap::new();
    let mut excluded = 0;
    for t in transactions.iter() {
        let Some(day) = t.day() else {
            excluded += 1;
            continue;
        };
        let sums = days.entry(day).or_default();
        accumulate(&mut sums.0, t.credit().unwrap_or_default(), "daily_totals")?;
        accumulate(&mut sums.1, t.debit().unwrap_or_default(), "daily_totals")?;
    }

    let days = days
        .into_iter()
        .map(|(day, (credit, debit))| DailyTotal { day, credit, debit })
        .collect();
    Ok(DailyTotals { days, excluded })
}
