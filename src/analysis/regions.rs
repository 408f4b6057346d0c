use crate::analysis::groups::Groups;
use crate::analysis::stats::accumulate;
use crate::analysis::{AggregateKind, Availability, Unavailable};
use crate::model::Transactions;
use rust_decimal::Decimal;
use serde::Serialize;

/// Credit and debit summed for one region. Missing amounts add nothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionTotals {
    pub region: String,
    pub credit: Decimal,
    pub debit: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegionalIntensity {
    pub regions: Vec<RegionTotals>,
}

impl RegionalIntensity {
    pub fn get(&self, region: &str) -> Option<&RegionTotals> {
        self.regions.iter().find(|r| r.region == region)
    }
}

const STATISTIC: &str = "regional_intensity";

pub fn regional_intensity(transactions: &Transactions) -> Availability<RegionalIntensity> {
    intensity(transactions).into()
}

fn intensity(transactions: &Transactions) -> Result<RegionalIntensity, Unavailable> {
    AggregateKind::RegionalIntensity.check(transactions.mapping())?;

    let mut groups: Groups<(Decimal, Decimal)> = Groups::new();
    for t in transactions.iter() {
        let Some(region) = t.region() else {
            continue;
        };
        let sums = groups.entry(region);
        accumulate(&mut sums.0, t.credit().unwrap_or_default(), STATISTIC)?;
        accumulate(&mut sums.1, t.debit().unwrap_or_default(), STATISTIC)?;
    }

    let regions: Vec<RegionTotals> = groups
        .into_entries()
        .into_iter()
        .map(|(region, (credit, debit))| {
            let mut total = credit;
            accumulate(&mut total, debit, STATISTIC)?;
            Ok(RegionTotals {
                region,
                credit,
                debit,
                total,
            })
        })
        .collect::<Result<_, Unavailable>>()?;
    Ok(RegionalIntensity { regions })
}
