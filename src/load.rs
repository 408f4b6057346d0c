//! Reads a transaction CSV into a `Transactions` set.

use crate::model::{Mapping, TimestampParser, Transactions};
use crate::{utils, Result};
use anyhow::Context;
use std::path::Path;
use tracing::{debug, warn};

/// Reads and parses the CSV file at `path`.
///
/// # Errors
/// - Returns an error if the file cannot be read.
/// - Returns an error if the header row cannot be decoded.
pub async fn load(path: &Path, timestamps: &TimestampParser) -> Result<Transactions> {
    let bytes = utils::read_bytes(path).await?;
    let transactions =
        parse(&bytes, timestamps).with_context(|| format!("Unable to parse {}", path.display()))?;
    debug!(
        "Loaded {} records from {}",
        transactions.len(),
        path.display()
    );
    Ok(transactions)
}

/// Parses CSV bytes where the first row is the header.
///
/// Short and long rows are accepted. Rows that cannot be decoded are skipped and counted, they do
/// not stop the load.
pub fn parse(bytes: &[u8], timestamps: &TimestampParser) -> Result<Transactions> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);
    let mut records = rdr.records();

    let mapping = match records.next() {
        None => return Ok(Transactions::default()),
        Some(header) => {
            let header = header.context("Unable to read the header row")?;
            Mapping::new(
                header
                    .iter()
                    .map(|h| h.trim_start_matches('\u{feff}').to_string()),
            )
        }
    };

    let mut transactions = Transactions::new(mapping);
    for (row_ix, result) in records.enumerate() {
        match result {
            Ok(record) => {
                let line = record
                    .position()
                    .map(|p| p.line())
                    .unwrap_or(row_ix as u64 + 2);
                transactions.push_row(line, record.iter(), timestamps);
            }
            Err(e) => {
                let line = e
                    .position()
                    .map(|p| p.line().to_string())
                    .unwrap_or_else(|| "?".to_string());
                warn!("Skipping line {line}, it could not be read: {e}");
                transactions.skip_row();
            }
        }
    }
    Ok(transactions)
}
