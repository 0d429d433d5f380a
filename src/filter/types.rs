use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Serialize;

/// Storage type of a column, used to parse query-string values before binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Float,
    Boolean,
    Text,
    Timestamp,
    Date,
}

impl ColumnType {
    /// Parse a raw request value into a typed, bindable parameter
    pub fn parse(&self, raw: &str) -> Result<SqlParam, String> {
        let raw = raw.trim();
        match self {
            ColumnType::Integer => raw
                .parse::<i64>()
                .map(|v| SqlParam::Int(Some(v)))
                .map_err(|_| format!("'{}' is not an integer", raw)),
            ColumnType::Float => raw
                .parse::<f64>()
                .map(|v| SqlParam::Float(Some(v)))
                .map_err(|_| format!("'{}' is not a number", raw)),
            ColumnType::Boolean => match raw.to_ascii_lowercase().as_str() {
                "true" | "t" | "1" => Ok(SqlParam::Bool(Some(true))),
                "false" | "f" | "0" => Ok(SqlParam::Bool(Some(false))),
                _ => Err(format!("'{}' is not a boolean", raw)),
            },
            ColumnType::Text => Ok(SqlParam::Text(Some(raw.to_string()))),
            ColumnType::Timestamp => parse_timestamp(raw)
                .map(|v| SqlParam::Timestamp(Some(v)))
                .ok_or_else(|| format!("'{}' is not a timestamp", raw)),
            ColumnType::Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(|v| SqlParam::Date(Some(v)))
                .map_err(|_| format!("'{}' is not a date (YYYY-MM-DD)", raw)),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, ColumnType::Text)
    }
}

/// Accepts RFC 3339 timestamps or plain dates (midnight UTC)
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&midnight))
}

/// A column an entity exposes to filtering and sorting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnType,
}

impl Column {
    pub const fn int(name: &'static str) -> Self {
        Self { name, kind: ColumnType::Integer }
    }

    pub const fn float(name: &'static str) -> Self {
        Self { name, kind: ColumnType::Float }
    }

    pub const fn bool(name: &'static str) -> Self {
        Self { name, kind: ColumnType::Boolean }
    }

    pub const fn text(name: &'static str) -> Self {
        Self { name, kind: ColumnType::Text }
    }

    pub const fn timestamp(name: &'static str) -> Self {
        Self { name, kind: ColumnType::Timestamp }
    }

    pub const fn date(name: &'static str) -> Self {
        Self { name, kind: ColumnType::Date }
    }
}

/// Typed bind parameter. Nulls keep their type so Postgres can infer the column.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Int(Option<i64>),
    Float(Option<f64>),
    Bool(Option<bool>),
    Text(Option<String>),
    Timestamp(Option<DateTime<Utc>>),
    Date(Option<NaiveDate>),
}

macro_rules! sql_param_from {
    ($variant:ident, $ty:ty) => {
        impl From<$ty> for SqlParam {
            fn from(v: $ty) -> Self {
                SqlParam::$variant(Some(v.into()))
            }
        }

        impl From<Option<$ty>> for SqlParam {
            fn from(v: Option<$ty>) -> Self {
                SqlParam::$variant(v.map(Into::into))
            }
        }
    };
}

sql_param_from!(Int, i64);
sql_param_from!(Int, i32);
sql_param_from!(Float, f64);
sql_param_from!(Bool, bool);
sql_param_from!(Text, String);
sql_param_from!(Timestamp, DateTime<Utc>);
sql_param_from!(Date, NaiveDate);

impl From<&str> for SqlParam {
    fn from(v: &str) -> Self {
        SqlParam::Text(Some(v.to_string()))
    }
}

/// Predicate shapes recognised in request parameters
#[derive(Debug, Clone, PartialEq)]
pub enum FilterCondition {
    /// `col=v`
    Eq { column: String, value: String },
    /// `col=null`
    IsNull { column: String },
    /// `col=a,b`
    In { column: String, values: Vec<String> },
    /// `filter_not[col]=a,b`
    NotIn { column: String, values: Vec<String> },
    /// `search[col]=v` and `search_cols[a|b]=v`
    Search { columns: Vec<String>, term: String },
    /// `filterrange[col]=lo|hi`, `-` leaves a side open
    Range { column: String, lower: Option<String>, upper: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Null,
    In,
    NotIn,
    ILike,
    Gte,
    Lte,
}

/// A condition resolved against the column catalog, ready for SQL generation
#[derive(Debug, Clone)]
pub struct FilterWhereInfo {
    pub columns: Vec<Column>,
    pub operator: FilterOp,
    pub data: Vec<SqlParam>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(s) if s.trim().eq_ignore_ascii_case("desc") => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }

    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<SqlParam>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_values_by_column_type() {
        assert_eq!(ColumnType::Integer.parse("42").unwrap(), SqlParam::Int(Some(42)));
        assert_eq!(ColumnType::Float.parse("0.25").unwrap(), SqlParam::Float(Some(0.25)));
        assert_eq!(ColumnType::Boolean.parse("TRUE").unwrap(), SqlParam::Bool(Some(true)));
        assert_eq!(ColumnType::Text.parse("abc").unwrap(), SqlParam::Text(Some("abc".into())));
        assert!(ColumnType::Integer.parse("4x").is_err());
        assert!(ColumnType::Date.parse("2024-13-01").is_err());
    }

    #[test]
    fn timestamps_accept_plain_dates() {
        let param = ColumnType::Timestamp.parse("2024-03-01").unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(param, SqlParam::Timestamp(Some(expected)));

        let param = ColumnType::Timestamp.parse("2024-03-01T10:30:00+02:00").unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap();
        assert_eq!(param, SqlParam::Timestamp(Some(expected)));
    }

    #[test]
    fn sort_direction_is_case_insensitive() {
        assert_eq!(SortDirection::parse(Some("DESC")), SortDirection::Desc);
        assert_eq!(SortDirection::parse(Some("desc")), SortDirection::Desc);
        assert_eq!(SortDirection::parse(Some("sideways")), SortDirection::Asc);
        assert_eq!(SortDirection::parse(None), SortDirection::Asc);
    }
}
