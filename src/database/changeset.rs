use crate::filter::SqlParam;

/// Columns no client payload may write
pub const PROTECTED_FIELDS: [&str; 4] = ["id", "created_at", "updated_at", "deleted_at"];

/// Ordered column assignments for an INSERT or a partial UPDATE
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changeset {
    fields: Vec<(&'static str, SqlParam)>,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a column, replacing an earlier assignment of the same column
    pub fn set(&mut self, column: &'static str, value: impl Into<SqlParam>) -> &mut Self {
        let value = value.into();
        match self.fields.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((column, value)),
        }
        self
    }

    /// Assign only when the patch carried the field
    pub fn set_if<T: Into<SqlParam>>(&mut self, column: &'static str, value: Option<T>) -> &mut Self {
        if let Some(value) = value {
            self.set(column, value);
        }
        self
    }

    /// Drop protected columns, returning the names that were removed
    pub fn strip_protected(&mut self) -> Vec<&'static str> {
        let mut removed = vec![];
        self.fields.retain(|(column, _)| {
            if PROTECTED_FIELDS.contains(column) {
                removed.push(*column);
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn columns(&self) -> Vec<&'static str> {
        self.fields.iter().map(|(c, _)| *c).collect()
    }

    pub fn params(&self) -> Vec<SqlParam> {
        self.fields.iter().map(|(_, v)| v.clone()).collect()
    }

    /// `INSERT ... RETURNING *`
    pub fn insert_sql(&self, table: &str) -> String {
        if self.fields.is_empty() {
            return format!("INSERT INTO \"{}\" DEFAULT VALUES RETURNING *", table);
        }
        let columns: Vec<String> = self.fields.iter().map(|(c, _)| format!("\"{}\"", c)).collect();
        let placeholders: Vec<String> = (1..=self.fields.len()).map(|i| format!("${}", i)).collect();
        format!(
            "INSERT INTO \"{}\" ({}) VALUES ({}) RETURNING *",
            table,
            columns.join(", "),
            placeholders.join(", ")
        )
    }

    /// `UPDATE ... WHERE "id" = $n`; the id is bound after the assignments
    pub fn update_sql(&self, table: &str, touch_updated_at: bool, soft_delete: bool) -> String {
        let mut assignments: Vec<String> = self
            .fields
            .iter()
            .enumerate()
            .map(|(i, (c, _))| format!("\"{}\" = ${}", c, i + 1))
            .collect();
        if touch_updated_at {
            assignments.push("\"updated_at\" = NOW()".to_string());
        }
        let mut sql = format!(
            "UPDATE \"{}\" SET {} WHERE \"id\" = ${}",
            table,
            assignments.join(", "),
            self.fields.len() + 1
        );
        if soft_delete {
            sql.push_str(" AND \"deleted_at\" IS NULL");
        }
        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_protected_columns() {
        let mut cs = Changeset::new();
        cs.set("id", 9_i64)
            .set("title", "Fix login")
            .set("created_at", "2020-01-01")
            .set("deleted_at", "2020-01-01");
        let removed = cs.strip_protected();
        assert_eq!(removed, vec!["id", "created_at", "deleted_at"]);
        assert_eq!(cs.columns(), vec!["title"]);
    }

    #[test]
    fn becomes_empty_when_only_protected_fields() {
        let mut cs = Changeset::new();
        cs.set("updated_at", "now");
        cs.strip_protected();
        assert!(cs.is_empty());
    }

    #[test]
    fn later_assignment_wins() {
        let mut cs = Changeset::new();
        cs.set("title", "a").set("title", "b");
        assert_eq!(cs.len(), 1);
        assert_eq!(cs.params(), vec![SqlParam::Text(Some("b".into()))]);
    }

    #[test]
    fn set_if_skips_absent_fields() {
        let mut cs = Changeset::new();
        cs.set_if("title", None::<String>).set_if("bio", Some(None::<String>));
        assert_eq!(cs.columns(), vec!["bio"]);
        assert_eq!(cs.params(), vec![SqlParam::Text(None)]);
    }

    #[test]
    fn builds_insert_and_update_sql() {
        let mut cs = Changeset::new();
        cs.set("title", "a").set("project_id", 3_i64);
        assert_eq!(
            cs.insert_sql("tickets"),
            "INSERT INTO \"tickets\" (\"title\", \"project_id\") VALUES ($1, $2) RETURNING *"
        );
        assert_eq!(
            cs.update_sql("tickets", true, true),
            "UPDATE \"tickets\" SET \"title\" = $1, \"project_id\" = $2, \"updated_at\" = NOW() WHERE \"id\" = $3 AND \"deleted_at\" IS NULL"
        );
        assert_eq!(
            Changeset::new().insert_sql("labels"),
            "INSERT INTO \"labels\" DEFAULT VALUES RETURNING *"
        );
    }
}
