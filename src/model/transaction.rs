use crate::model::mapping::{Column, Header, Mapping};
use crate::model::{Amount, TimestampParser};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::debug;

/// The beneficiary used for rows that have no `Transaction To` value.
pub const UNKNOWN_BENEFICIARY: &str = "Unknown";

/// Represents the rows of a transaction file, including the header mapping and a tally of the
/// cells that could not be used.
///
/// The set is immutable once loaded. Aggregates read it and write their results elsewhere.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Transactions {
    mapping: Mapping,
    data: Vec<Transaction>,
    unparseable: BTreeMap<Column, usize>,
    skipped_rows: usize,
}

impl Transactions {
    /// Creates an empty set for the given header.
    pub fn new(mapping: Mapping) -> Self {
        Self {
            mapping,
            ..Default::default()
        }
    }

    /// Parses rows of string cells where the first row is the header.
    pub fn parse<S, R>(rows: impl IntoIterator<Item = R>, timestamps: &TimestampParser) -> Self
    where
        S: AsRef<str>,
        R: IntoIterator<Item = S>,
    {
        let mut rows = rows.into_iter();
        let mapping = match rows.next() {
            Some(header_row) => Mapping::new(
                header_row
                    .into_iter()
                    .map(|s| s.as_ref().trim().to_string()),
            ),
            None => Mapping::default(),
        };
        let mut transactions = Transactions::new(mapping);
        for (row_ix, row) in rows.enumerate() {
            // The header is line 1.
            transactions.push_row(row_ix as u64 + 2, row, timestamps);
        }
        transactions
    }

    /// Creates a set from records that were built in code rather than parsed.
    pub fn from_records(mapping: Mapping, records: impl IntoIterator<Item = Transaction>) -> Self {
        let data = records
            .into_iter()
            .enumerate()
            .map(|(index, mut t)| {
                t.index = index;
                t
            })
            .collect();
        Self {
            mapping,
            data,
            ..Default::default()
        }
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn data(&self) -> &[Transaction] {
        &self.data
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.data.iter()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the header contains `column`.
    pub fn has(&self, column: Column) -> bool {
        self.mapping.contains(column)
    }

    /// The number of cells per column that were present but could not be parsed.
    pub fn unparseable(&self) -> &BTreeMap<Column, usize> {
        &self.unparseable
    }

    /// The number of rows that the CSV reader could not decode at all.
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    /// Appends one row of cells in header order.
    pub(crate) fn push_row<S>(
        &mut self,
        line: u64,
        values: impl IntoIterator<Item = S>,
        timestamps: &TimestampParser,
    ) where
        S: AsRef<str>,
    {
        let index = self.data.len();
        let mut transaction = Transaction {
            index,
            line,
            ..Default::default()
        };
        let mut date = None;
        let mut time = None;
        for (ix, value) in values.into_iter().enumerate() {
            // Cells past the end of the header have nowhere to go.
            let Some(header) = self.mapping.headers().get(ix) else {
                break;
            };
            let value = value.as_ref().trim();
            match transaction.set_with_header(header, value, timestamps) {
                Ok(Some((Column::Date, ts))) => date = Some(ts),
                Ok(Some((_, ts))) => time = Some(ts),
                Ok(None) => {}
                Err(column) => {
                    debug!(
                        "Line {line}: unable to parse {} value '{value}', treating it as missing",
                        column
                    );
                    *self.unparseable.entry(column).or_default() += 1;
                }
            }
        }
        transaction.timestamp = date.or(time);
        self.data.push(transaction);
    }

    pub(crate) fn skip_row(&mut self) {
        self.skipped_rows += 1;
    }
}

/// Represents a single row of the transaction file. Every field is optional because any column may
/// be absent from the file and any cell may be blank.
#[derive(Default, Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Transaction {
    /// Zero-based position in the transaction set.
    pub(crate) index: usize,
    /// One-based line in the source file, 0 for records built in code.
    pub(crate) line: u64,
    pub(crate) account_type: Option<String>,
    pub(crate) region: Option<String>,
    pub(crate) transaction_to: Option<String>,
    pub(crate) credit: Option<Decimal>,
    pub(crate) debit: Option<Decimal>,
    pub(crate) timestamp: Option<NaiveDateTime>,
    pub(crate) other_fields: BTreeMap<String, String>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account_type(mut self, value: impl Into<String>) -> Self {
        self.account_type = Some(value.into());
        self
    }

    pub fn with_region(mut self, value: impl Into<String>) -> Self {
        self.region = Some(value.into());
        self
    }

    pub fn with_transaction_to(mut self, value: impl Into<String>) -> Self {
        self.transaction_to = Some(value.into());
        self
    }

    pub fn with_credit(mut self, value: impl Into<Decimal>) -> Self {
        self.credit = Some(value.into());
        self
    }

    pub fn with_debit(mut self, value: impl Into<Decimal>) -> Self {
        self.debit = Some(value.into());
        self
    }

    pub fn with_timestamp(mut self, value: NaiveDateTime) -> Self {
        self.timestamp = Some(value);
        self
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn line(&self) -> u64 {
        self.line
    }

    pub fn account_type(&self) -> Option<&str> {
        self.account_type.as_deref()
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn transaction_to(&self) -> Option<&str> {
        self.transaction_to.as_deref()
    }

    /// The `Transaction To` value, or `"Unknown"` when it is missing.
    pub fn beneficiary(&self) -> &str {
        self.transaction_to().unwrap_or(UNKNOWN_BENEFICIARY)
    }

    pub fn credit(&self) -> Option<Decimal> {
        self.credit
    }

    pub fn debit(&self) -> Option<Decimal> {
        self.debit
    }

    /// Looks up the amount for `Column::Credit` or `Column::Debit`. Other columns have no amount.
    pub fn amount(&self, column: Column) -> Option<Decimal> {
        match column {
            Column::Credit => self.credit,
            Column::Debit => self.debit,
            _ => None,
        }
    }

    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamp
    }

    /// The calendar day of the timestamp.
    pub fn day(&self) -> Option<NaiveDate> {
        self.timestamp.map(|ts| ts.date())
    }

    pub fn other_fields(&self) -> &BTreeMap<String, String> {
        &self.other_fields
    }

    /// Stores `value` in the field named by `header`. Blank values leave the field missing.
    ///
    /// Timestamps are returned rather than stored because `Date` and `Time` compete for the same
    /// field. An unusable value is reported as the `Err` of its column.
    fn set_with_header(
        &mut self,
        header: &Header,
        value: &str,
        timestamps: &TimestampParser,
    ) -> Result<Option<(Column, NaiveDateTime)>, Column> {
        let Some(col) = Column::from_header(header.as_ref()) else {
            if !value.is_empty() {
                let _ = self
                    .other_fields
                    .insert(header.as_ref().to_string(), value.to_string());
            }
            return Ok(None);
        };

        if value.is_empty() {
            return Ok(None);
        }

        match col {
            Column::AccountType => self.account_type = Some(value.to_string()),
            Column::Region => self.region = Some(value.to_string()),
            Column::TransactionTo => self.transaction_to = Some(value.to_string()),
            Column::Credit => self.credit = Some(parse_amount(value).ok_or(col)?),
            Column::Debit => self.debit = Some(parse_amount(value).ok_or(col)?),
            Column::Date | Column::Time => {
                let ts = timestamps.parse(value).ok_or(col)?;
                return Ok(Some((col, ts)));
            }
        }
        Ok(None)
    }
}

/// Credits and debits are magnitudes, so a negative value is as unusable as a malformed one.
fn parse_amount(value: &str) -> Option<Decimal> {
    match Amount::from_str(value) {
        Ok(amount) if !amount.is_negative() => Some(amount.value()),
        _ => None,
    }
}
