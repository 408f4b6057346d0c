use crate::analysis::groups::Groups;
use crate::analysis::stats::{accumulate, quantile};
use crate::analysis::{AggregateKind, Availability, Unavailable};
use crate::model::{Column, Transactions};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

/// One account type's slice of the distribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountTypeShare {
    pub account_type: String,
    pub count: usize,
    /// Fraction of `AccountTypeDistribution::total`, in `[0, 1]`.
    pub share: f64,
}

/// How many records carry each account type. Entries are sorted by count, largest first, with ties
/// kept in order of first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccountTypeDistribution {
    /// Records with a non-blank account type. Blank account types are not counted at all.
    pub total: usize,
    pub entries: Vec<AccountTypeShare>,
}

impl AccountTypeDistribution {
    pub fn count(&self, account_type: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|e| e.account_type == account_type)
            .map(|e| e.count)
    }
}

pub fn account_type_distribution(
    transactions: &Transactions,
) -> Availability<AccountTypeDistribution> {
    distribution(transactions).into()
}

fn distribution(transactions: &Transactions) -> Result<AccountTypeDistribution, Unavailable> {
    AggregateKind::AccountTypes.check(transactions.mapping())?;

    let mut groups: Groups<usize> = Groups::new();
    for account_type in transactions.iter().filter_map(|t| t.account_type()) {
        *groups.entry(account_type) += 1;
    }

    let mut counts = groups.into_entries();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    let total: usize = counts.iter().map(|(_, count)| count).sum();
    let entries = counts
        .into_iter()
        .map(|(account_type, count)| AccountTypeShare {
            account_type,
            count,
            share: count as f64 / total as f64,
        })
        .collect();

    Ok(AccountTypeDistribution { total, entries })
}

/// Summed credit and debit for one account type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountTypeTotals {
    pub account_type: String,
    pub credit: Decimal,
    pub debit: Decimal,
}

/// Totals per account type in order of first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccountTypesTotals {
    pub account_types: Vec<AccountTypeTotals>,
}

impl AccountTypesTotals {
    pub fn get(&self, account_type: &str) -> Option<&AccountTypeTotals> {
        self.account_types
            .iter()
            .find(|t| t.account_type == account_type)
    }
}

const TOTALS: &str = "account_type_totals";

pub fn account_type_totals(transactions: &Transactions) -> Availability<AccountTypesTotals> {
    totals(transactions).into()
}

fn totals(transactions: &Transactions) -> Result<AccountTypesTotals, Unavailable> {
    AggregateKind::AccountTypeTotals.check(transactions.mapping())?;

    let mut groups: Groups<(Decimal, Decimal)> = Groups::new();
    for t in transactions.iter() {
        let Some(account_type) = t.account_type() else {
            continue;
        };
        let sums = groups.entry(account_type);
        accumulate(&mut sums.0, t.credit().unwrap_or_default(), TOTALS)?;
        accumulate(&mut sums.1, t.debit().unwrap_or_default(), TOTALS)?;
    }

    let account_types = groups
        .into_entries()
        .into_iter()
        .map(|(account_type, (credit, debit))| AccountTypeTotals {
            account_type,
            credit,
            debit,
        })
        .collect();
    Ok(AccountTypesTotals { account_types })
}

/// The minimum, quartiles and maximum of a sample, which is what a box plot draws.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FiveNumberSummary {
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl FiveNumberSummary {
    /// Returns `None` for an empty sample.
    pub fn from_values(mut values: Vec<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        values.sort_by(|a, b| a.total_cmp(b));
        Some(Self {
            count: values.len(),
            min: values[0],
            q1: quantile(&values, 0.25),
            median: quantile(&values, 0.5),
            q3: quantile(&values, 0.75),
            max: values[values.len() - 1],
        })
    }
}

/// The spread of credit and debit values for one account type. A side is `None` when its column
/// is absent or no record of this account type has a value in it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountTypeSpread {
    pub account_type: String,
    pub credit: Option<FiveNumberSummary>,
    pub debit: Option<FiveNumberSummary>,
}

pub fn account_type_spread(transactions: &Transactions) -> Availability<Vec<AccountTypeSpread>> {
    spread(transactions).into()
}

fn spread(transactions: &Transactions) -> Result<Vec<AccountTypeSpread>, Unavailable> {
    AggregateKind::AccountTypeSpread.check(transactions.mapping())?;

    let mut groups: Groups<(Vec<f64>, Vec<f64>)> = Groups::new();
    for t in transactions.iter() {
        let Some(account_type) = t.account_type() else {
            continue;
        };
        let samples = groups.entry(account_type);
        if let Some(credit) = t.amount(Column::Credit).and_then(|v| v.to_f64()) {
            samples.0.push(credit);
        }
        if let Some(debit) = t.amount(Column::Debit).and_then(|v| v.to_f64()) {
            samples.1.push(debit);
        }
    }

    Ok(groups
        .into_entries()
        .into_iter()
        .map(|(account_type, (credit, debit))| AccountTypeSpread {
            account_type,
            credit: FiveNumberSummary::from_values(credit),
            debit: FiveNumberSummary::from_values(debit),
        })
        .collect())
}
