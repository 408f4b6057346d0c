use crate::analysis::groups::Groups;
use crate::analysis::stats::accumulate;
use crate::analysis::{AggregateKind, Availability, Unavailable};
use crate::model::Transactions;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeneficiaryCredit {
    pub beneficiary: String,
    pub credit: Decimal,
}

/// The largest beneficiaries of one region, sorted by summed credit, largest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionBeneficiaries {
    pub region: String,
    pub beneficiaries: Vec<BeneficiaryCredit>,
}

/// Summed credit per beneficiary, limited to the `limit` largest in each region. Regions are in
/// order of first occurrence and beneficiaries with equal sums keep their input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TopBeneficiaries {
    pub limit: usize,
    pub regions: Vec<RegionBeneficiaries>,
}

impl TopBeneficiaries {
    pub fn region(&self, region: &str) -> Option<&RegionBeneficiaries> {
        self.regions.iter().find(|r| r.region == region)
    }

    /// Flattens the groups into `(region, beneficiary, summed credit)` rows.
    pub fn rows(&self) -> impl Iterator<Item = (&str, &str, Decimal)> + '_ {
        self.regions.iter().flat_map(|r| {
            r.beneficiaries
                .iter()
                .map(move |b| (r.region.as_str(), b.beneficiary.as_str(), b.credit))
        })
    }
}

pub fn top_beneficiaries(transactions: &Transactions, limit: usize) -> Availability<TopBeneficiaries> {
    top(transactions, limit).into()
}

fn top(transactions: &Transactions, limit: usize) -> Result<TopBeneficiaries, Unavailable> {
    AggregateKind::TopBeneficiaries.check(transactions.mapping())?;

    let mut regions: Groups<Groups<Decimal>> = Groups::new();
    for t in transactions.iter() {
        let (Some(region), Some(credit)) = (t.region(), t.credit()) else {
            continue;
        };
        let sum = regions.entry(region).entry(t.beneficiary());
        accumulate(sum, credit, "top_beneficiaries")?;
    }

    let regions = regions
        .into_entries()
        .into_iter()
        .map(|(region, beneficiaries)| {
            let mut sums = beneficiaries.into_entries();
            // sort_by is stable, so equal sums stay in order of first occurrence.
            sums.sort_by(|a, b| b.1.cmp(&a.1));
            sums.truncate(limit);
            RegionBeneficiaries {
                region,
                beneficiaries: sums
                    .into_iter()
                    .map(|(beneficiary, credit)| BeneficiaryCredit {
                        beneficiary,
                        credit,
                    })
                    .collect(),
            }
        })
        .collect();

    Ok(TopBeneficiaries { limit, regions })
}
