//! The aggregation pipeline: pure functions that turn a `Transactions` set into the tables that a
//! charting layer consumes.
//!
//! Each aggregate checks the columns it needs and returns an `Availability`, so a missing column
//! degrades only the aggregates that use it.

mod accounts;
mod availability;
mod beneficiaries;
mod correlation;
mod groups;
mod outliers;
mod regions;
mod stats;
mod timeline;

pub use accounts::{
    account_type_distribution, account_type_spread, account_type_totals, AccountTypeDistribution,
    AccountTypeShare, AccountTypeSpread, AccountTypeTotals, AccountTypesTotals, FiveNumberSummary,
};
pub use availability::{Availability, Unavailable};
pub use beneficiaries::{
    top_beneficiaries, BeneficiaryCredit, RegionBeneficiaries, TopBeneficiaries,
};
pub use correlation::{correlation, CorrelationMatrix};
pub use outliers::{outliers, ColumnOutliers, FlaggedRecord, Outliers};
pub use regions::{regional_intensity, RegionTotals, RegionalIntensity};
pub use timeline::{daily_totals, DailyTotal, DailyTotals};

use crate::model::{Column, Mapping, Transactions};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// The number of beneficiaries listed per region unless configured otherwise.
pub const DEFAULT_TOP_N: usize = 5;

/// The z-score above which a value is an outlier unless configured otherwise.
pub const DEFAULT_OUTLIER_THRESHOLD: f64 = 3.0;

/// Tunable parameters of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisOptions {
    pub top_n: usize,
    pub outlier_threshold: f64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            outlier_threshold: DEFAULT_OUTLIER_THRESHOLD,
        }
    }
}

/// Names each aggregate the pipeline can produce.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum AggregateKind {
    /// Count and share of records per account type.
    AccountTypes,
    /// Largest beneficiaries by summed credit, per region.
    TopBeneficiaries,
    /// Credit and debit totals per region.
    RegionalIntensity,
    /// Pearson correlation between credit and debit.
    Correlation,
    /// Credit and debit totals per calendar day.
    DailyTotals,
    /// Z-score outlier flags on credit and debit.
    Outliers,
    /// Credit and debit totals per account type.
    AccountTypeTotals,
    /// Five-number summaries of credit and debit per account type.
    AccountTypeSpread,
}

serde_plain::derive_display_from_serialize!(AggregateKind);
serde_plain::derive_fromstr_from_deserialize!(AggregateKind);

impl AggregateKind {
    pub const ALL: [AggregateKind; 8] = [
        AggregateKind::AccountTypes,
        AggregateKind::TopBeneficiaries,
        AggregateKind::RegionalIntensity,
        AggregateKind::Correlation,
        AggregateKind::DailyTotals,
        AggregateKind::Outliers,
        AggregateKind::AccountTypeTotals,
        AggregateKind::AccountTypeSpread,
    ];

    /// Checks that `mapping` has the columns this aggregate needs.
    pub fn check(self, mapping: &Mapping) -> Result<(), Unavailable> {
        use Column::*;
        let (all_of, one_of): (&[Column], &[Column]) = match self {
            AggregateKind::AccountTypes => (&[AccountType], &[]),
            AggregateKind::TopBeneficiaries => (&[Region, TransactionTo, Credit], &[]),
            AggregateKind::RegionalIntensity => (&[Region, Credit, Debit], &[]),
            AggregateKind::Correlation => (&[Credit, Debit], &[]),
            AggregateKind::DailyTotals => (&[Credit, Debit], &[Date, Time]),
            AggregateKind::Outliers => (&[], &[Credit, Debit]),
            AggregateKind::AccountTypeTotals => (&[AccountType, Credit, Debit], &[]),
            AggregateKind::AccountTypeSpread => (&[AccountType], &[Credit, Debit]),
        };

        let missing: Vec<Column> = all_of
            .iter()
            .copied()
            .filter(|c| !mapping.contains(*c))
            .collect();
        if !missing.is_empty() {
            return Err(Unavailable::missing(missing));
        }
        if !one_of.is_empty() && !one_of.iter().any(|c| mapping.contains(*c)) {
            return Err(Unavailable::missing_one_of(one_of.iter().copied()));
        }
        Ok(())
    }
}

/// Every requested aggregate over one transaction set, along with what was learned while loading
/// it. Aggregates that were not requested are `None` and are omitted from the JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub records: usize,
    pub columns: Vec<Column>,
    pub unparseable: BTreeMap<Column, usize>,
    pub skipped_rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_types: Option<Availability<AccountTypeDistribution>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_beneficiaries: Option<Availability<TopBeneficiaries>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regional_intensity: Option<Availability<RegionalIntensity>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation: Option<Availability<CorrelationMatrix>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_totals: Option<Availability<DailyTotals>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outliers: Option<Availability<Outliers>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_type_totals: Option<Availability<AccountTypesTotals>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_type_spread: Option<Availability<Vec<AccountTypeSpread>>>,
}

impl Report {
    /// The number of aggregates that were requested, and the number of those that are available.
    pub fn availability_counts(&self) -> (usize, usize) {
        let flags = [
            self.account_types.as_ref().map(Availability::is_available),
            self.top_beneficiaries.as_ref().map(Availability::is_available),
            self.regional_intensity.as_ref().map(Availability::is_available),
            self.correlation.as_ref().map(Availability::is_available),
            self.daily_totals.as_ref().map(Availability::is_available),
            self.outliers.as_ref().map(Availability::is_available),
            self.account_type_totals.as_ref().map(Availability::is_available),
            self.account_type_spread.as_ref().map(Availability::is_available),
        ];
        let requested = flags.iter().flatten().count();
        let available = flags.iter().flatten().filter(|f| **f).count();
        (requested, available)
    }
}

/// Runs the aggregates named in `only`, or all of them when `only` is empty.
pub fn analyze(
    transactions: &Transactions,
    options: &AnalysisOptions,
    only: &[AggregateKind],
) -> Report {
    let run = |kind: AggregateKind| {
        let wanted = only.is_empty() || only.contains(&kind);
        if wanted {
            debug!("Computing {kind} over {} records", transactions.len());
        }
        wanted
    };

    Report {
        records: transactions.len(),
        columns: transactions.mapping().present(),
        unparseable: transactions.unparseable().clone(),
        skipped_rows: transactions.skipped_rows(),
        account_types: run(AggregateKind::AccountTypes)
            .then(|| account_type_distribution(transactions)),
        top_beneficiaries: run(AggregateKind::TopBeneficiaries)
            .then(|| top_beneficiaries(transactions, options.top_n)),
        regional_intensity: run(AggregateKind::RegionalIntensity)
            .then(|| regional_intensity(transactions)),
        correlation: run(AggregateKind::Correlation).then(|| correlation(transactions)),
        daily_totals: run(AggregateKind::DailyTotals).then(|| daily_totals(transactions)),
        outliers: run(AggregateKind::Outliers)
            .then(|| outliers(transactions, options.outlier_threshold)),
        account_type_totals: run(AggregateKind::AccountTypeTotals)
            .then(|| account_type_totals(transactions)),
        account_type_spread: run(AggregateKind::AccountTypeSpread)
            .then(|| account_type_spread(transactions)),
    }
}
