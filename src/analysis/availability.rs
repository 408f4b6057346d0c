use crate::model::Column;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// The result of one aggregate: either the data, or the reason it could not be computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Availability<T> {
    Available(T),
    Unavailable(Unavailable),
}

impl<T> Availability<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available(_))
    }

    pub fn available(&self) -> Option<&T> {
        match self {
            Availability::Available(value) => Some(value),
            Availability::Unavailable(_) => None,
        }
    }

    pub fn unavailable(&self) -> Option<&Unavailable> {
        match self {
            Availability::Available(_) => None,
            Availability::Unavailable(reason) => Some(reason),
        }
    }

    pub fn into_result(self) -> Result<T, Unavailable> {
        match self {
            Availability::Available(value) => Ok(value),
            Availability::Unavailable(reason) => Err(reason),
        }
    }
}

impl<T> From<Result<T, Unavailable>> for Availability<T> {
    fn from(value: Result<T, Unavailable>) -> Self {
        match value {
            Ok(value) => Availability::Available(value),
            Err(reason) => Availability::Unavailable(reason),
        }
    }
}

/// Why an aggregate was not computed. This is reported to the consumer, it does not stop any
/// other aggregate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Unavailable {
    /// The header lacks a column the aggregate needs. When `one_of` is set, any single column in
    /// `columns` would have been enough.
    #[error("{}", missing_column_message(.columns, .one_of))]
    MissingColumn { columns: Vec<Column>, one_of: bool },

    /// The statistic is undefined for the data, e.g. zero variance or too few samples.
    #[error("{statistic} is undefined: {detail}")]
    DegenerateStatistic {
        statistic: &'static str,
        detail: String,
    },
}

impl Unavailable {
    pub fn missing(columns: impl IntoIterator<Item = Column>) -> Self {
        Unavailable::MissingColumn {
            columns: columns.into_iter().collect(),
            one_of: false,
        }
    }

    pub fn missing_one_of(columns: impl IntoIterator<Item = Column>) -> Self {
        Unavailable::MissingColumn {
            columns: columns.into_iter().collect(),
            one_of: true,
        }
    }

    pub fn degenerate(statistic: &'static str, detail: impl Into<String>) -> Self {
        Unavailable::DegenerateStatistic {
            statistic,
            detail: detail.into(),
        }
    }

    /// A short machine readable name for the reason.
    pub fn reason(&self) -> &'static str {
        match self {
            Unavailable::MissingColumn { .. } => "missing_column",
            Unavailable::DegenerateStatistic { .. } => "degenerate_statistic",
        }
    }
}

fn missing_column_message(columns: &[Column], one_of: &bool) -> String {
    let names = columns
        .iter()
        .map(|c| c.header())
        .collect::<Vec<_>>()
        .join(", ");
    if *one_of {
        format!("missing column: one of {names} is required")
    } else {
        format!("missing required column(s): {names}")
    }
}

impl Serialize for Unavailable {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("reason", self.reason())?;
        map.serialize_entry("message", &self.to_string())?;
        match self {
            Unavailable::MissingColumn { columns, one_of } => {
                map.serialize_entry("columns", columns)?;
                map.serialize_entry("one_of", one_of)?;
            }
            Unavailable::DegenerateStatistic { statistic, .. } => {
                map.serialize_entry("statistic", statistic)?;
            }
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_column_message() {
        let reason = Unavailable::missing([Column::Region, Column::Credit]);
        assert_eq!(
            reason.to_string(),
            "missing required column(s): Region, Credit"
        );

        let reason = Unavailable::missing_one_of([Column::Date, Column::Time]);
        assert_eq!(
            reason.to_string(),
            "missing column: one of Date, Time is required"
        );
    }

    #[test]
    fn test_serialize_available() {
        let value: Availability<u32> = Availability::Available(3);
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            json!({"status": "available", "value": 3})
        );
    }

    #[test]
    fn test_serialize_unavailable() {
        let value: Availability<u32> =
            Err::<u32, _>(Unavailable::missing([Column::AccountType])).into();
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            json!({
                "status": "unavailable",
                "value": {
                    "reason": "missing_column",
                    "message": "missing required column(s): Account Type",
                    "columns": ["account_type"],
                    "one_of": false
                }
            })
        );
    }

    #[test]
    fn test_serialize_degenerate() {
        let value: Availability<u32> =
            Availability::Unavailable(Unavailable::degenerate("correlation", "zero variance"));
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["value"]["reason"], "degenerate_statistic");
        assert_eq!(json["value"]["message"], "correlation is undefined: zero variance");
    }

    #[test]
    fn test_accessors() {
        let ok: Availability<u32> = Ok::<u32, Unavailable>(1).into();
        assert!(ok.is_available());
        assert_eq!(ok.available(), Some(&1));
        assert!(ok.unavailable().is_none());
        assert_eq!(ok.into_result(), Ok(1));
    }
}
