use crate::analysis::{self, AggregateKind, AnalysisOptions, Report, Unavailable};
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::model::{Column, Transactions};
use crate::{load, Config, Result};
use anyhow::Context;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Loads the transaction file and runs the aggregates named in `only`, or all of them when `only`
/// is empty.
///
/// # Arguments
/// - `config` - Supplies the analysis options, date formats and the default input file.
/// - `file` - The CSV to analyze. When `None`, the `default_input` from `config.json` is used.
/// - `only` - Restricts the report to these aggregates.
///
/// # Errors
/// - Returns an error if no input file can be determined, or it cannot be read or parsed.
pub async fn analyze(
    config: &Config,
    file: Option<&Path>,
    only: &[AggregateKind],
) -> Result<Out<Report>> {
    let (path, transactions) = read_input(config, file).await?;
    Ok(report_out(
        &path,
        &transactions,
        &config.analysis_options(),
        only,
    ))
}

/// Computes one aggregate and returns its tagged result as JSON.
pub async fn aggregate(
    config: &Config,
    file: Option<&Path>,
    kind: AggregateKind,
) -> Result<Out<serde_json::Value>> {
    let (path, transactions) = read_input(config, file).await?;
    aggregate_out(&path, &transactions, &config.analysis_options(), kind)
}

/// Reports which known columns the file has and which aggregates each missing column disables.
pub async fn columns(config: &Config, file: Option<&Path>) -> Result<Out<ColumnsReport>> {
    let (path, transactions) = read_input(config, file).await?;
    Ok(columns_out(&path, &transactions))
}

async fn read_input(config: &Config, file: Option<&Path>) -> Result<(PathBuf, Transactions)> {
    let path = config.resolve_input(file).pub_result(ErrorType::Input)?;
    let transactions = load::load(&path, &config.timestamp_parser())
        .await
        .pub_result(ErrorType::Input)?;
    Ok((path, transactions))
}

pub(crate) fn report_out(
    path: &Path,
    transactions: &Transactions,
    options: &AnalysisOptions,
    only: &[AggregateKind],
) -> Out<Report> {
    let report = analysis::analyze(transactions, options, only);
    let (requested, available) = report.availability_counts();
    let mut message = format!(
        "Analyzed {} records from {}: {available} of {requested} aggregates available",
        report.records,
        path.display()
    );
    if report.skipped_rows > 0 {
        message.push_str(&format!(
            ", {} unreadable rows skipped",
            report.skipped_rows
        ));
    }
    Out::new(message, report)
}

pub(crate) fn aggregate_out(
    path: &Path,
    transactions: &Transactions,
    options: &AnalysisOptions,
    kind: AggregateKind,
) -> Result<Out<serde_json::Value>> {
    let report = analysis::analyze(transactions, options, &[kind]);
    let (_, available) = report.availability_counts();
    let mut json = serde_json::to_value(&report).context("Unable to serialize the report")?;
    // Report fields are named after the aggregate they hold.
    let value = json
        .get_mut(kind.to_string())
        .map(serde_json::Value::take)
        .with_context(|| format!("The report has no '{kind}' entry"))?;
    let status = if available == 1 {
        "available"
    } else {
        "unavailable"
    };
    Ok(Out::new(
        format!(
            "Computed {kind} over {} records from {}: {status}",
            report.records,
            path.display()
        ),
        value,
    ))
}

/// A known column that the file lacks, and the aggregates that cannot run without it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnImpact {
    pub column: Column,
    pub disables: Vec<AggregateKind>,
}

/// Column presence for a transaction file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnsReport {
    pub path: PathBuf,
    pub records: usize,
    pub present: Vec<Column>,
    pub missing: Vec<ColumnImpact>,
    /// Headers that are not a known column. Their values are carried but not aggregated.
    pub other_headers: Vec<String>,
}

pub(crate) fn columns_out(path: &Path, transactions: &Transactions) -> Out<ColumnsReport> {
    let mapping = transactions.mapping();

    let failures: Vec<(AggregateKind, Vec<Column>)> = AggregateKind::ALL
        .into_iter()
        .filter_map(|kind| match kind.check(mapping) {
            Err(Unavailable::MissingColumn { columns, .. }) => Some((kind, columns)),
            _ => None,
        })
        .collect();

    let missing: Vec<ColumnImpact> = mapping
        .missing()
        .into_iter()
        .map(|column| ColumnImpact {
            column,
            disables: failures
                .iter()
                .filter(|(_, columns)| columns.contains(&column))
                .map(|(kind, _)| *kind)
                .collect(),
        })
        .collect();

    let other_headers = mapping
        .headers()
        .iter()
        .map(|h| h.as_ref())
        .filter(|h| Column::from_header(h).is_none())
        .map(str::to_string)
        .collect();

    let disabled = failures.len();
    let report = ColumnsReport {
        path: path.to_path_buf(),
        records: transactions.len(),
        present: mapping.present(),
        missing,
        other_headers,
    };
    let message = format!(
        "{} has {} of {} known columns, {disabled} aggregates are disabled",
        path.display(),
        report.present.len(),
        Column::ALL.len()
    );
    Out::new(message, report)
}
