use crate::analysis::stats::{mean, std_dev};
use crate::analysis::{AggregateKind, Availability, Unavailable};
use crate::model::{Column, Transactions};
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

/// Z-score flags for one amount column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnOutliers {
    pub column: Column,
    /// Records with a value in this column.
    pub observations: usize,
    pub mean: Option<f64>,
    /// Population standard deviation.
    pub std_dev: Option<f64>,
    pub threshold: f64,
    /// One flag per record, by record index. Records without a value are never flagged.
    pub flags: Vec<bool>,
}

impl ColumnOutliers {
    pub fn flagged_count(&self) -> usize {
        self.flags.iter().filter(|f| **f).count()
    }

    fn z_score(&self, value: f64) -> Option<f64> {
        match (self.mean, self.std_dev) {
            (Some(mean), Some(std)) if std > 0.0 => Some((value - mean) / std),
            _ => None,
        }
    }
}

/// A record that is an outlier on at least one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlaggedRecord {
    pub index: usize,
    pub line: u64,
    /// Set only when the record is an outlier on credit.
    pub credit_z: Option<f64>,
    /// Set only when the record is an outlier on debit.
    pub debit_z: Option<f64>,
}

/// Outlier flags for credit and debit. Each column is available on its own, so a file with only
/// a `Credit` column still gets credit flags.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outliers {
    pub credit: Availability<ColumnOutliers>,
    pub debit: Availability<ColumnOutliers>,
    pub flagged: Vec<FlaggedRecord>,
}

/// Flags values whose distance from their column's mean exceeds `threshold` standard deviations.
pub fn outliers(transactions: &Transactions, threshold: f64) -> Availability<Outliers> {
    flag(transactions, threshold).into()
}

fn flag(transactions: &Transactions, threshold: f64) -> Result<Outliers, Unavailable> {
    AggregateKind::Outliers.check(transactions.mapping())?;

    let credit = column_outliers(transactions, Column::Credit, threshold);
    let debit = column_outliers(transactions, Column::Debit, threshold);

    let mut flagged = Vec::new();
    for t in transactions.iter() {
        let credit_z = flagged_z(&credit, t.index(), t.amount(Column::Credit));
        let debit_z = flagged_z(&debit, t.index(), t.amount(Column::Debit));
        if credit_z.is_some() || debit_z.is_some() {
            flagged.push(FlaggedRecord {
                index: t.index(),
                line: t.line(),
                credit_z,
                debit_z,
            });
        }
    }

    Ok(Outliers {
        credit: credit.into(),
        debit: debit.into(),
        flagged,
    })
}

fn column_outliers(
    transactions: &Transactions,
    column: Column,
    threshold: f64,
) -> Result<ColumnOutliers, Unavailable> {
    if !transactions.has(column) {
        return Err(Unavailable::missing([column]));
    }

    let values: Vec<Option<f64>> = transactions
        .iter()
        .map(|t| t.amount(column).and_then(|v| v.to_f64()))
        .collect();
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let mean = mean(&present);
    let std_dev = mean.and_then(|m| std_dev(&present, m));

    let mut outliers = ColumnOutliers {
        column,
        observations: present.len(),
        mean,
        std_dev,
        threshold,
        flags: Vec::with_capacity(values.len()),
    };
    let flags: Vec<bool> = values
        .iter()
        .map(|v| {
            v.and_then(|v| outliers.z_score(v))
                .is_some_and(|z| z.abs() > threshold)
        })
        .collect();
    outliers.flags = flags;
    Ok(outliers)
}

fn flagged_z(
    outliers: &Result<ColumnOutliers, Unavailable>,
    index: usize,
    value: Option<rust_decimal::Decimal>,
) -> Option<f64> {
    let outliers = outliers.as_ref().ok()?;
    if !outliers.flags.get(index).copied().unwrap_or(false) {
        return None;
    }
    outliers.z_score(value?.to_f64()?)
}
