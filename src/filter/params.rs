use std::collections::BTreeMap;

use super::error::FilterError;
use super::types::{FilterCondition, FilterOrderInfo, SortDirection};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const DEFAULT_SORT_COLUMN: &str = "id";

/// Keys that drive ordering and pagination and never become filters
pub const RESERVED_KEYS: [&str; 4] = ["page", "limit", "sort_by", "sort_order"];

/// Per-request listing instructions parsed from the query string
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub filters: Vec<FilterCondition>,
    pub sort: FilterOrderInfo,
    pub page: i64,
    pub page_size: i64,
}

impl Default for QueryRequest {
    fn default() -> Self {
        Self {
            filters: vec![],
            sort: FilterOrderInfo {
                column: DEFAULT_SORT_COLUMN.to_string(),
                sort: SortDirection::Asc,
            },
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl QueryRequest {
    /// Build a request from raw key/value pairs.
    ///
    /// Keys are processed in sorted order so the generated SQL is stable for a
    /// given parameter set.
    pub fn from_params<I, K, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let params: BTreeMap<String, String> = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let mut request = QueryRequest::default();

        for (key, value) in &params {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            if let Some(condition) = Self::parse_condition(key, value) {
                request.filters.push(condition);
            }
        }

        if let Some(column) = params.get("sort_by").map(|s| s.trim()).filter(|s| !s.is_empty()) {
            request.sort.column = column.to_string();
        }
        request.sort.sort = SortDirection::parse(params.get("sort_order").map(String::as_str));

        request.page = params
            .get("page")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(DEFAULT_PAGE);

        request.page_size = params
            .get("limit")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE);

        request
    }

    fn parse_condition(key: &str, value: &str) -> Option<FilterCondition> {
        if let Some(column) = bracketed(key, "search") {
            return Some(FilterCondition::Search {
                columns: vec![column.to_string()],
                term: value.to_string(),
            });
        }

        if let Some(columns) = bracketed(key, "search_cols") {
            let columns: Vec<String> = columns
                .split('|')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect();
            return Some(FilterCondition::Search { columns, term: value.to_string() });
        }

        if let Some(column) = bracketed(key, "filter_not") {
            return Some(FilterCondition::NotIn {
                column: column.to_string(),
                values: split_values(value),
            });
        }

        if let Some(column) = bracketed(key, "filterrange") {
            let bounds: Vec<&str> = value.split('|').collect();
            if bounds.len() != 2 {
                tracing::debug!("Ignoring malformed range for {}: {}", column, value);
                return None;
            }
            let side = |b: &str| {
                let b = b.trim();
                (b != "-").then(|| b.to_string())
            };
            return Some(FilterCondition::Range {
                column: column.to_string(),
                lower: side(bounds[0]),
                upper: side(bounds[1]),
            });
        }

        let values = split_values(value);
        if values.len() > 1 {
            return Some(FilterCondition::In { column: key.to_string(), values });
        }

        if value.trim().eq_ignore_ascii_case("null") {
            Some(FilterCondition::IsNull { column: key.to_string() })
        } else {
            Some(FilterCondition::Eq { column: key.to_string(), value: value.to_string() })
        }
    }

    /// Rows skipped before the current page; a window past `i64::MAX` is rejected
    pub fn offset(&self) -> Result<i64, FilterError> {
        (self.page - 1)
            .checked_mul(self.page_size)
            .ok_or_else(|| FilterError::InvalidOffset(format!("page {} of size {} is out of range", self.page, self.page_size)))
    }

    /// Apply an upper bound to the page size, returning the bound that was hit
    pub fn cap_page_size(&mut self, max: Option<i64>) -> Option<i64> {
        match max {
            Some(max) if max > 0 && self.page_size > max => {
                self.page_size = max;
                Some(max)
            }
            _ => None,
        }
    }
}

/// `prefix[inner]` -> `inner`
fn bracketed<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    key.strip_prefix(prefix)?
        .strip_prefix('[')?
        .strip_suffix(']')
}

fn split_values(value: &str) -> Vec<String> {
    value.split(',').map(|v| v.trim().to_string()).collect()
}
