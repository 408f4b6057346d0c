use schemars::JsonSchema;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use tracing::warn;

pub(crate) const ACCOUNT_TYPE_STR: &str = "Account Type";
pub(crate) const REGION_STR: &str = "Region";
pub(crate) const TRANSACTION_TO_STR: &str = "Transaction To";
pub(crate) const CREDIT_STR: &str = "Credit";
pub(crate) const DEBIT_STR: &str = "Debit";
pub(crate) const DATE_STR: &str = "Date";
pub(crate) const TIME_STR: &str = "Time";

/// The columns that the aggregates know how to use. Header matching is exact: `Credit` is a
/// column, `credit` and `CREDIT` are not.
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    AccountType,
    Region,
    TransactionTo,
    Credit,
    Debit,
    Date,
    Time,
}

impl Column {
    pub const ALL: [Column; 7] = [
        Column::AccountType,
        Column::Region,
        Column::TransactionTo,
        Column::Credit,
        Column::Debit,
        Column::Date,
        Column::Time,
    ];

    /// The header text that identifies this column in a CSV file.
    pub fn header(self) -> &'static str {
        match self {
            Column::AccountType => ACCOUNT_TYPE_STR,
            Column::Region => REGION_STR,
            Column::TransactionTo => TRANSACTION_TO_STR,
            Column::Credit => CREDIT_STR,
            Column::Debit => DEBIT_STR,
            Column::Date => DATE_STR,
            Column::Time => TIME_STR,
        }
    }

    pub fn from_header(header: &str) -> Option<Self> {
        Column::ALL.into_iter().find(|c| c.header() == header)
    }
}

impl Display for Column {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.header())
    }
}

/// The header row of a transaction CSV, along with the positions of the known `Column`s.
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct Mapping {
    headers: Vec<Header>,
    header_map: HashMap<Header, usize>,
    column_map: HashMap<Column, usize>,
}

impl Mapping {
    /// Create a new `Mapping` from a list of header strings. Headers that do not name a known
    /// `Column` are kept so their values can be carried along, but they play no part in any
    /// aggregate.
    ///
    /// A repeated header is renamed with a numeric suffix, so `Notes,Notes` becomes `Notes` and
    /// `Notes.1`. Only the first occurrence of a known column's header maps to that column.
    pub fn new<S, I>(headers: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        let mut header_map: HashMap<Header, usize> = HashMap::new();
        let mut column_map: HashMap<Column, usize> = HashMap::new();
        let mut unique = Vec::new();

        for (idx, name) in headers.into_iter().enumerate() {
            let header = dedupe(Header::from(name), &header_map);
            if let Some(column) = Column::from_header(header.as_ref()) {
                column_map.insert(column, idx);
            }
            header_map.insert(header.clone(), idx);
            unique.push(header);
        }

        Self {
            headers: unique,
            header_map,
            column_map,
        }
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    pub fn header_index(&self, header: impl Into<Header>) -> Option<usize> {
        let h = header.into();
        self.header_map.get(&h).cloned()
    }

    pub fn column_index(&self, column: Column) -> Option<usize> {
        self.column_map.get(&column).cloned()
    }

    pub fn contains(&self, column: Column) -> bool {
        self.column_map.contains_key(&column)
    }

    /// The known columns found in the header, in `Column` order.
    pub fn present(&self) -> Vec<Column> {
        Column::ALL
            .into_iter()
            .filter(|c| self.contains(*c))
            .collect()
    }

    /// The known columns absent from the header, in `Column` order.
    pub fn missing(&self) -> Vec<Column> {
        Column::ALL
            .into_iter()
            .filter(|c| !self.contains(*c))
            .collect()
    }

    /// `Date` is preferred over `Time` when both are present.
    pub fn timestamp_column(&self) -> Option<Column> {
        [Column::Date, Column::Time]
            .into_iter()
            .find(|c| self.contains(*c))
    }
}

impl Serialize for Mapping {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.headers.len()))?;
        for header in &self.headers {
            seq.serialize_element(header.as_ref())?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Mapping {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let items: Vec<String> = Vec::deserialize(deserializer)?;
        Ok(Mapping::new(items))
    }
}

fn dedupe(header: Header, taken: &HashMap<Header, usize>) -> Header {
    if !taken.contains_key(&header) {
        return header;
    }
    let mut suffix = 1;
    loop {
        let candidate = Header::from(format!("{}.{suffix}", header.as_ref()));
        if !taken.contains_key(&candidate) {
            warn!(
                "The header '{}' is repeated, renamed the repeat to '{}'",
                header.as_ref(),
                candidate.as_ref()
            );
            return candidate;
        }
        suffix += 1;
    }
}

/// Represents a header in the CSV file, for example, `Transaction To`
#[derive(Default, Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Header(String);

impl AsRef<str> for Header {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl<S: Into<String>> From<S> for Header {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl FromStr for Header {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.into())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_column_from_header() {
        assert_eq!(
            Column::from_header(TRANSACTION_TO_STR),
            Some(Column::TransactionTo)
        );
        assert_eq!(Column::from_header("Credit"), Some(Column::Credit));
        assert_eq!(Column::from_header("credit"), None);
        assert_eq!(Column::from_header("Balance"), None);
    }

    #[test]
    fn test_column_display_is_header() {
        assert_eq!(Column::AccountType.to_string(), "Account Type");
        assert_eq!(
            serde_json::to_string(&Column::AccountType).unwrap(),
            r#""account_type""#
        );
    }

    #[test]
    fn test_mapping_indexes() {
        let mapping = Mapping::new(["Id", "Region", "Credit", "Notes", "Debit"]);
        assert_eq!(mapping.len(), 5);
        assert_eq!(mapping.column_index(Column::Region), Some(1));
        assert_eq!(mapping.column_index(Column::Debit), Some(4));
        assert_eq!(mapping.column_index(Column::AccountType), None);
        assert_eq!(mapping.header_index("Notes"), Some(3));
        assert_eq!(
            mapping.present(),
            vec![Column::Region, Column::Credit, Column::Debit]
        );
        assert!(mapping.missing().contains(&Column::TransactionTo));
    }

    #[test]
    fn test_mapping_renames_repeated_headers() {
        let mapping = Mapping::new(["Notes", "Credit", "Notes", "Credit", "Notes"]);
        let headers: Vec<&str> = mapping.headers().iter().map(|h| h.as_ref()).collect();
        assert_eq!(
            headers,
            vec!["Notes", "Credit", "Notes.1", "Credit.1", "Notes.2"]
        );
        assert_eq!(mapping.column_index(Column::Credit), Some(1));
        assert_eq!(mapping.header_index("Credit.1"), Some(3));
        assert_eq!(mapping.present(), vec![Column::Credit]);
    }

    #[test]
    fn test_mapping_suffix_skips_taken_names() {
        let mapping = Mapping::new(["Notes", "Notes.1", "Notes"]);
        assert_eq!(mapping.header_index("Notes.2"), Some(2));
        assert_eq!(mapping.len(), 3);
    }

    #[test]
    fn test_timestamp_column_prefers_date() {
        let both = Mapping::new(["Time", "Date"]);
        assert_eq!(both.timestamp_column(), Some(Column::Date));

        let time_only = Mapping::new(["Time"]);
        assert_eq!(time_only.timestamp_column(), Some(Column::Time));

        let neither = Mapping::new(["Credit"]);
        assert_eq!(neither.timestamp_column(), None);
    }

    #[test]
    fn test_mapping_serde() {
        let original_json = r##"["Account Type","Region","Something Else"]"##;
        let mapping: Mapping = serde_json::from_str(original_json).unwrap();
        let serialized = serde_json::to_string(&mapping).unwrap();
        assert_eq!(original_json, serialized);
        assert_eq!(mapping.present(), vec![Column::AccountType, Column::Region]);
    }
}
