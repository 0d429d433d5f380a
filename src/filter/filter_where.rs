use super::types::{Column, FilterOp, FilterWhereInfo, SqlParam};

pub struct FilterWhere {
    param_values: Vec<SqlParam>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    /// Build the WHERE body (without the keyword) and its parameters
    pub fn generate(conditions: &[FilterWhereInfo], soft_delete: bool) -> (String, Vec<SqlParam>) {
        let mut filter_where = Self::new(0);
        let mut sql_conditions = vec![];

        if soft_delete {
            sql_conditions.push("\"deleted_at\" IS NULL".to_string());
        }
        for condition in conditions {
            sql_conditions.push(filter_where.build_sql_condition(condition));
        }

        let where_clause = if sql_conditions.is_empty() {
            "1=1".to_string()
        } else {
            sql_conditions.join(" AND ")
        };
        (where_clause, filter_where.param_values)
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> String {
        match condition.operator {
            FilterOp::ILike => {
                let Some(pattern) = condition.data.first() else {
                    return "1=0".to_string();
                };
                let placeholder = self.param(pattern.clone());
                let parts: Vec<String> = condition
                    .columns
                    .iter()
                    .map(|c| format!("{} ILIKE {}", Self::text_column(c), placeholder))
                    .collect();
                match parts.len() {
                    0 => "1=0".to_string(),
                    1 => parts.join(""),
                    _ => format!("({})", parts.join(" OR ")),
                }
            }
            _ => {
                let Some(column) = condition.columns.first() else {
                    return "1=0".to_string();
                };
                let quoted_column = format!("\"{}\"", column.name);
                match condition.operator {
                    FilterOp::Null => format!("{} IS NULL", quoted_column),
                    FilterOp::Eq => self.compare(&quoted_column, "=", condition),
                    FilterOp::Gte => self.compare(&quoted_column, ">=", condition),
                    FilterOp::Lte => self.compare(&quoted_column, "<=", condition),
                    FilterOp::In | FilterOp::NotIn => {
                        let negate = condition.operator == FilterOp::NotIn;
                        if condition.data.is_empty() {
                            return if negate { "1=1".to_string() } else { "1=0".to_string() };
                        }
                        let params: Vec<String> =
                            condition.data.iter().map(|v| self.param(v.clone())).collect();
                        let keyword = if negate { "NOT IN" } else { "IN" };
                        format!("{} {} ({})", quoted_column, keyword, params.join(", "))
                    }
                    FilterOp::ILike => unreachable!("handled above"),
                }
            }
        }
    }

    fn compare(&mut self, quoted_column: &str, op: &str, condition: &FilterWhereInfo) -> String {
        match condition.data.first() {
            Some(value) => format!("{} {} {}", quoted_column, op, self.param(value.clone())),
            None => "1=0".to_string(),
        }
    }

    /// Substring matching on non-text columns goes through a text cast
    fn text_column(column: &Column) -> String {
        if column.kind.is_text() {
            format!("\"{}\"", column.name)
        } else {
            format!("\"{}\"::text", column.name)
        }
    }

    fn param(&mut self, value: SqlParam) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(columns: Vec<Column>, operator: FilterOp, data: Vec<SqlParam>) -> FilterWhereInfo {
        FilterWhereInfo { columns, operator, data }
    }

    #[test]
    fn soft_delete_guard_comes_first() {
        let (sql, params) = FilterWhere::generate(&[], true);
        assert_eq!(sql, "\"deleted_at\" IS NULL");
        assert!(params.is_empty());

        let (sql, _) = FilterWhere::generate(&[], false);
        assert_eq!(sql, "1=1");
    }

    #[test]
    fn numbers_placeholders_in_order() {
        let conditions = vec![
            info(vec![Column::int("project_id")], FilterOp::Eq, vec![SqlParam::Int(Some(3))]),
            info(
                vec![Column::int("status_id")],
                FilterOp::NotIn,
                vec![SqlParam::Int(Some(1)), SqlParam::Int(Some(2))],
            ),
            info(vec![Column::timestamp("due_date")], FilterOp::Null, vec![]),
        ];
        let (sql, params) = FilterWhere::generate(&conditions, false);
        assert_eq!(
            sql,
            "\"project_id\" = $1 AND \"status_id\" NOT IN ($2, $3) AND \"due_date\" IS NULL"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn search_across_columns_is_ored_and_casts_non_text() {
        let conditions = vec![info(
            vec![Column::text("title"), Column::int("id")],
            FilterOp::ILike,
            vec![SqlParam::Text(Some("%bug%".into()))],
        )];
        let (sql, params) = FilterWhere::generate(&conditions, false);
        assert_eq!(sql, "(\"title\" ILIKE $1 OR \"id\"::text ILIKE $1)");
        assert_eq!(params, vec![SqlParam::Text(Some("%bug%".into()))]);
    }
}
