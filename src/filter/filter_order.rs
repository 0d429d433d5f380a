use super::error::FilterError;
use super::types::{Column, FilterOrderInfo};

pub struct FilterOrder;

impl FilterOrder {
    /// Resolve the requested sort column against the catalog
    pub fn validate(order: &FilterOrderInfo, columns: &[Column]) -> Result<FilterOrderInfo, FilterError> {
        let column = super::filter::lookup_column(columns, &order.column)?;
        Ok(FilterOrderInfo {
            column: column.name.to_string(),
            sort: order.sort,
        })
    }

    pub fn generate(info: Option<&FilterOrderInfo>) -> String {
        match info {
            Some(i) => format!("ORDER BY \"{}\" {}", i.column, i.sort.to_sql()),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::types::SortDirection;

    #[test]
    fn generates_single_column_order() {
        let info = FilterOrderInfo { column: "id".into(), sort: SortDirection::Desc };
        assert_eq!(FilterOrder::generate(Some(&info)), "ORDER BY \"id\" DESC");
        assert_eq!(FilterOrder::generate(None), "");
    }

    #[test]
    fn rejects_unknown_sort_column() {
        let columns = [Column::int("id")];
        let info = FilterOrderInfo { column: "nope".into(), sort: SortDirection::Asc };
        assert!(matches!(
            FilterOrder::validate(&info, &columns),
            Err(FilterError::UnknownColumn(_))
        ));
    }
}
