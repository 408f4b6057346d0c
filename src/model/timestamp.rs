use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Formats that carry a time of day. Tried in order after RFC 3339.
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Formats that only carry a calendar day. These resolve to midnight.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y", "%d %b %Y"];

/// Parses the `Date` and `Time` cells of a transaction file. User supplied formats are tried
/// before the built-in ones.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct TimestampParser {
    formats: Vec<String>,
}

impl TimestampParser {
    pub fn new<S, I>(formats: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        Self {
            formats: formats.into_iter().map(|s| s.into()).collect(),
        }
    }

    pub fn formats(&self) -> &[String] {
        &self.formats
    }

    /// Returns `None` for empty or unrecognized input.
    pub fn parse(&self, s: &str) -> Option<NaiveDateTime> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }

        self.formats
            .iter()
            .map(String::as_str)
            .find_map(|f| parse_with(s, f))
            .or_else(|| {
                DateTime::parse_from_rfc3339(s)
                    .ok()
                    .map(|dt| dt.naive_local())
            })
            .or_else(|| DATE_TIME_FORMATS.iter().find_map(|f| parse_with(s, f)))
            .or_else(|| DATE_FORMATS.iter().find_map(|f| parse_with(s, f)))
    }
}

fn parse_with(s: &str, format: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, format).ok().or_else(|| {
        NaiveDate::parse_from_str(s, format)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    })
}
