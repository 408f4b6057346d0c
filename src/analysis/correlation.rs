use crate::analysis::stats::{mean, std_dev};
use crate::analysis::{AggregateKind, Availability, Unavailable};
use crate::model::{Column, Transactions};
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

const STATISTIC: &str = "correlation";

/// The Pearson correlation between credit and debit, as the 2x2 matrix a heatmap draws.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    /// Row and column labels of `matrix`.
    pub columns: [Column; 2],
    /// Records where both credit and debit are present.
    pub pairs: usize,
    pub coefficient: f64,
    pub matrix: [[f64; 2]; 2],
}

pub fn correlation(transactions: &Transactions) -> Availability<CorrelationMatrix> {
    pearson(transactions).into()
}

fn pearson(transactions: &Transactions) -> Result<CorrelationMatrix, Unavailable> {
    AggregateKind::Correlation.check(transactions.mapping())?;

    let (credit, debit): (Vec<f64>, Vec<f64>) = transactions
        .iter()
        .filter_map(|t| Some((t.credit()?.to_f64()?, t.debit()?.to_f64()?)))
        .unzip();

    let pairs = credit.len();
    if pairs < 2 {
        return Err(Unavailable::degenerate(
            STATISTIC,
            format!("{pairs} paired observation(s), at least 2 are needed"),
        ));
    }

    // Both are Some since pairs >= 2.
    let (Some(credit_mean), Some(debit_mean)) = (mean(&credit), mean(&debit)) else {
        return Err(Unavailable::degenerate(STATISTIC, "no observations"));
    };
    let credit_std = std_dev(&credit, credit_mean).unwrap_or_default();
    let debit_std = std_dev(&debit, debit_mean).unwrap_or_default();
    for (column, std) in [(Column::Credit, credit_std), (Column::Debit, debit_std)] {
        if std == 0.0 {
            return Err(Unavailable::degenerate(
                STATISTIC,
                format!("{column} has zero variance"),
            ));
        }
    }

    let covariance = credit
        .iter()
        .zip(&debit)
        .map(|(c, d)| (c - credit_mean) * (d - debit_mean))
        .sum::<f64>()
        / pairs as f64;
    let coefficient = (covariance / (credit_std * debit_std)).clamp(-1.0, 1.0);

    Ok(CorrelationMatrix {
        columns: [Column::Credit, Column::Debit],
        pairs,
        coefficient,
        matrix: [[1.0, coefficient], [coefficient, 1.0]],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::transactions_from_csv;

    #[test]
    fn test_perfect_correlation() {
        let transactions = transactions_from_csv(
            "Credit,Debit\n\
             1,2\n\
             2,4\n\
             3,6\n",
        );
        let corr = correlation(&transactions).into_result().unwrap();
        assert_eq!(corr.pairs, 3);
        assert!((corr.coefficient - 1.0).abs() < 1e-12);
        assert_eq!(corr.matrix[0][0], 1.0);
        assert_eq!(corr.matrix[1][1], 1.0);
        assert_eq!(corr.matrix[0][1], corr.matrix[1][0]);
    }

    #[test]
    fn test_negative_correlation() {
        let transactions = transactions_from_csv(
            "Credit,Debit\n\
             10,1\n\
             20,0.5\n\
             30,0\n",
        );
        let corr = correlation(&transactions).into_result().unwrap();
        assert!((corr.coefficient + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_unpaired_records_are_excluded() {
        let transactions = transactions_from_csv(
            "Account Type,Credit,Debit\n\
             Savings,1,3\n\
             Savings,5,\n\
             Savings,2,1\n\
             Savings,3,7\n",
        );
        let corr = correlation(&transactions).into_result().unwrap();
        assert_eq!(corr.pairs, 3);

        let dist = crate::analysis::account_type_distribution(&transactions)
            .into_result()
            .unwrap();
        assert_eq!(dist.count("Savings"), Some(4));
    }

    #[test]
    fn test_too_few_pairs() {
        let transactions = transactions_from_csv("Credit,Debit\n1,2\n3,\n");
        let reason = correlation(&transactions).into_result().unwrap_err();
        assert_eq!(reason.reason(), "degenerate_statistic");

        let empty = transactions_from_csv("Credit,Debit\n");
        assert!(!correlation(&empty).is_available());
    }

    #[test]
    fn test_zero_variance() {
        let transactions = transactions_from_csv("Credit,Debit\n5,1\n5,2\n5,3\n");
        let reason = correlation(&transactions).into_result().unwrap_err();
        assert_eq!(
            reason,
            Unavailable::degenerate("correlation", "Credit has zero variance")
        );
    }

    #[test]
    fn test_missing_column() {
        let transactions = transactions_from_csv("Credit\n1\n2\n");
        assert_eq!(
            correlation(&transactions).unavailable(),
            Some(&Unavailable::missing([Column::Debit]))
        );
    }
}
