use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::params::QueryRequest;
use super::types::{
    Column, FilterCondition, FilterOp, FilterOrderInfo, FilterWhereInfo, SqlParam,
    SqlResult,
};

/// Composes a parameterised SELECT against one table from a [`QueryRequest`].
///
/// Every column named by the request is checked against the table's catalog
/// before any SQL is produced, and every value is parsed to the column's type.
pub struct Filter {
    table_name: String,
    columns: &'static [Column],
    soft_delete: bool,
    conditions: Vec<FilterWhereInfo>,
    order: Option<FilterOrderInfo>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl Filter {
    pub fn new(table_name: impl Into<String>, columns: &'static [Column]) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        validate_identifier(&table_name).map_err(FilterError::InvalidTableName)?;
        Ok(Self {
            table_name,
            columns,
            soft_delete: false,
            conditions: vec![],
            order: None,
            limit: None,
            offset: None,
        })
    }

    /// Exclude rows carrying a `deleted_at` marker
    pub fn soft_delete(&mut self, enabled: bool) -> &mut Self {
        self.soft_delete = enabled;
        self
    }

    /// Apply filters, ordering and the page window from a request
    pub fn assign(&mut self, request: &QueryRequest) -> Result<&mut Self, FilterError> {
        for condition in &request.filters {
            self.where_condition(condition)?;
        }
        self.order(&request.sort)?;
        self.limit(request.page_size, Some(request.offset()?))?;
        Ok(self)
    }

    pub fn where_condition(&mut self, condition: &FilterCondition) -> Result<&mut Self, FilterError> {
        let resolved = self.resolve(condition)?;
        self.conditions.extend(resolved);
        Ok(self)
    }

    pub fn order(&mut self, order: &FilterOrderInfo) -> Result<&mut Self, FilterError> {
        self.order = Some(FilterOrder::validate(order, self.columns)?);
        Ok(self)
    }

    pub fn limit(&mut self, limit: i64, offset: Option<i64>) -> Result<&mut Self, FilterError> {
        if limit < 0 {
            return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string()));
        }
        if let Some(off) = offset {
            if off < 0 {
                return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string()));
            }
        }
        self.limit = Some(limit);
        self.offset = offset;
        Ok(self)
    }

    pub fn to_sql(&self) -> SqlResult {
        let (where_clause, params) = self.where_sql();
        let query = [
            "SELECT *".to_string(),
            format!("FROM \"{}\"", self.table_name),
            format!("WHERE {}", where_clause),
            FilterOrder::generate(self.order.as_ref()),
            self.build_limit_clause(),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        SqlResult { query, params }
    }

    /// Counts every row matching the filters, ignoring order and page window
    pub fn to_count_sql(&self) -> SqlResult {
        let (where_clause, params) = self.where_sql();
        let query = format!(
            "SELECT COUNT(*) AS count FROM \"{}\" WHERE {}",
            self.table_name, where_clause
        );
        SqlResult { query, params }
    }

    fn where_sql(&self) -> (String, Vec<SqlParam>) {
        FilterWhere::generate(&self.conditions, self.soft_delete)
    }

    fn resolve(&self, condition: &FilterCondition) -> Result<Vec<FilterWhereInfo>, FilterError> {
        let single = |column: Column, operator: FilterOp, data: Vec<SqlParam>| FilterWhereInfo {
            columns: vec![column],
            operator,
            data,
        };

        Ok(match condition {
            FilterCondition::Eq { column, value } => {
                let column = self.column(column)?;
                vec![single(column, FilterOp::Eq, vec![parse_value(&column, value)?])]
            }
            FilterCondition::IsNull { column } => {
                vec![single(self.column(column)?, FilterOp::Null, vec![])]
            }
            FilterCondition::In { column, values } | FilterCondition::NotIn { column, values } => {
                let column = self.column(column)?;
                let data = values
                    .iter()
                    .map(|v| parse_value(&column, v))
                    .collect::<Result<Vec<_>, _>>()?;
                let operator = if matches!(condition, FilterCondition::In { .. }) {
                    FilterOp::In
                } else {
                    FilterOp::NotIn
                };
                vec![single(column, operator, data)]
            }
            FilterCondition::Search { columns, term } => {
                let columns = columns
                    .iter()
                    .map(|c| self.column(c))
                    .collect::<Result<Vec<_>, _>>()?;
                vec![FilterWhereInfo {
                    columns,
                    operator: FilterOp::ILike,
                    data: vec![SqlParam::Text(Some(format!("%{}%", term)))],
                }]
            }
            FilterCondition::Range { column, lower, upper } => {
                let column = self.column(column)?;
                let mut out = vec![];
                if let Some(lower) = lower {
                    out.push(single(column, FilterOp::Gte, vec![parse_value(&column, lower)?]));
                }
                if let Some(upper) = upper {
                    out.push(single(column, FilterOp::Lte, vec![parse_value(&column, upper)?]));
                }
                out
            }
        })
    }

    fn column(&self, name: &str) -> Result<Column, FilterError> {
        lookup_column(self.columns, name)
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            _ => String::new(),
        }
    }
}

pub(crate) fn lookup_column(columns: &[Column], name: &str) -> Result<Column, FilterError> {
    validate_identifier(name).map_err(FilterError::InvalidColumn)?;
    columns
        .iter()
        .find(|c| c.name == name)
        .copied()
        .ok_or_else(|| FilterError::UnknownColumn(name.to_string()))
}

fn parse_value(column: &Column, raw: &str) -> Result<SqlParam, FilterError> {
    column.kind.parse(raw).map_err(|reason| FilterError::InvalidValue {
        column: column.name.to_string(),
        reason,
    })
}

/// Identifiers must look like `[A-Za-z_][A-Za-z0-9_]*`
pub fn validate_identifier(name: &str) -> Result<(), String> {
    let mut chars = name.chars();
    match chars.next() {
        None => Err("identifier cannot be empty".to_string()),
        Some(first) if !(first.is_ascii_alphabetic() || first == '_') => {
            Err(format!("invalid identifier format: {}", name))
        }
        Some(_) if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') => {
            Err(format!("invalid identifier format: {}", name))
        }
        Some(_) => Ok(()),
    }
}
