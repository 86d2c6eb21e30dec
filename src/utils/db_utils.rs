use chrono::{NaiveDate, NaiveDateTime};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use sqlx::mysql::{MySql, MySqlArguments};
use sqlx::query::{Query, QueryAs, QueryScalar};
use sqlx::Executor;

use crate::error::ApiError;
use tracing::error;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    I64(i64),
    U64(u64),
    F64(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Null,
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::String(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::String(v.to_string())
    }
}

impl From<u64> for SqlValue {
    fn from(v: u64) -> Self {
        SqlValue::U64(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::I64(v as i64)
    }
}

/// Binds `SqlValue`s onto any of the sqlx query builders.
pub trait BindValues: Sized {
    fn bind_value(self, value: SqlValue) -> Self;

    fn bind_values(self, values: &[SqlValue]) -> Self {
        values.iter().cloned().fold(self, Self::bind_value)
    }
}

impl<'q> BindValues for Query<'q, MySql, MySqlArguments> {
    fn bind_value(self, value: SqlValue) -> Self {
        match value {
            SqlValue::String(v) => self.bind(v),
            SqlValue::I64(v) => self.bind(v),
            SqlValue::U64(v) => self.bind(v),
            SqlValue::F64(v) => self.bind(v),
            SqlValue::Bool(v) => self.bind(v),
            SqlValue::Date(v) => self.bind(v),
            SqlValue::DateTime(v) => self.bind(v),
            SqlValue::Null => self.bind(None::<String>),
        }
    }
}

impl<'q, O> BindValues for QueryAs<'q, MySql, O, MySqlArguments> {
    fn bind_value(self, value: SqlValue) -> Self {
        match value {
            SqlValue::String(v) => self.bind(v),
            SqlValue::I64(v) => self.bind(v),
            SqlValue::U64(v) => self.bind(v),
            SqlValue::F64(v) => self.bind(v),
            SqlValue::Bool(v) => self.bind(v),
            SqlValue::Date(v) => self.bind(v),
            SqlValue::DateTime(v) => self.bind(v),
            SqlValue::Null => self.bind(None::<String>),
        }
    }
}

impl<'q, O> BindValues for QueryScalar<'q, MySql, O, MySqlArguments> {
    fn bind_value(self, value: SqlValue) -> Self {
        match value {
            SqlValue::String(v) => self.bind(v),
            SqlValue::I64(v) => self.bind(v),
            SqlValue::U64(v) => self.bind(v),
            SqlValue::F64(v) => self.bind(v),
            SqlValue::Bool(v) => self.bind(v),
            SqlValue::Date(v) => self.bind(v),
            SqlValue::DateTime(v) => self.bind(v),
            SqlValue::Null => self.bind(None::<String>),
        }
    }
}

/// WHERE clause assembled from optional list filters.
#[derive(Debug, Default)]
pub struct Filters {
    conditions: Vec<&'static str>,
    values: Vec<SqlValue>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(&mut self, condition: &'static str, value: impl Into<SqlValue>) -> &mut Self {
        self.conditions.push(condition);
        self.values.push(value.into());
        self
    }

    /// `condition` with one placeholder per pattern, each bound to `%term%`.
    pub fn like(&mut self, condition: &'static str, term: &str, placeholders: usize) -> &mut Self {
        let pattern = format!("%{}%", term.trim());
        self.conditions.push(condition);
        self.values
            .extend(std::iter::repeat(SqlValue::String(pattern)).take(placeholders));
        self
    }

    pub fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
/// Only keys listed in `allowed` may appear in the payload. The payload is
/// then read as `T`, so a value of the wrong type is a 400 before any SQL
/// runs. Keys the caller sent are written with the typed value; an explicit
/// `null` clears the column.
pub fn build_update_sql<T>(
    table: &str,
    payload: &Value,
    allowed: &[&str],
    id_column: &str,
    id_value: u64,
) -> Result<SqlUpdate, ApiError>
where
    T: DeserializeOwned + Serialize,
{
    let obj = payload
        .as_object()
        .ok_or_else(|| ApiError::bad_request("Payload must be a JSON object"))?;

    if obj.is_empty() {
        return Err(ApiError::bad_request("No fields provided for update"));
    }

    if let Some(unknown) = obj.keys().find(|k| !allowed.contains(&k.as_str())) {
        return Err(ApiError::bad_request(format!("Unknown field: {unknown}")));
    }

    let typed: T = serde_json::from_value(payload.clone())
        .map_err(|e| ApiError::bad_request(format!("Invalid payload: {e}")))?;
    let typed = serde_json::to_value(&typed).map_err(|e| {
        error!(error = %e, "Failed to re-serialize update payload");
        ApiError::Internal
    })?;
    let typed = typed
        .as_object()
        .ok_or_else(|| ApiError::bad_request("Payload must be a JSON object"))?;

    let set_clause = obj
        .keys()
        .map(|k| format!("{} = ?", k))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!("UPDATE {} SET {} WHERE {} = ?", table, set_clause, id_column);

    let mut values = Vec::with_capacity(obj.len() + 1);

    for key in obj.keys() {
        let value = typed.get(key).unwrap_or(&Value::Null);
        let converted = match value {
            Value::String(s) => {
                if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                    SqlValue::Date(d)
                } else if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
                    SqlValue::DateTime(dt)
                } else {
                    SqlValue::String(s.clone())
                }
            }
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlValue::I64(i)
                } else if let Some(u) = n.as_u64() {
                    SqlValue::U64(u)
                } else if let Some(f) = n.as_f64() {
                    SqlValue::F64(f)
                } else {
                    return Err(ApiError::bad_request("Unsupported number"));
                }
            }
            Value::Bool(b) => SqlValue::Bool(*b),
            Value::Null => SqlValue::Null,
            _ => return Err(ApiError::bad_request("Unsupported JSON value type")),
        };
        values.push(converted);
    }

    // WHERE id = ?
    values.push(SqlValue::U64(id_value));

    Ok(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
/// Returns the number of rows matched by the WHERE clause.
pub async fn execute_update<'c, E>(executor: E, update: SqlUpdate) -> Result<u64, sqlx::Error>
where
    E: Executor<'c, Database = MySql>,
{
    let result = sqlx::query(&update.sql)
        .bind_values(&update.values)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    const STUDENT_COLUMNS: &[&str] = &["name", "date_of_birth", "class_id", "nemis_no"];

    #[derive(Deserialize, Serialize)]
    struct StudentPatch {
        name: Option<String>,
        date_of_birth: Option<NaiveDate>,
        class_id: Option<u64>,
        nemis_no: Option<i64>,
    }

    fn student_update(payload: &Value) -> Result<SqlUpdate, ApiError> {
        build_update_sql::<StudentPatch>("students", payload, STUDENT_COLUMNS, "id", 9)
    }

    #[test]
    fn builds_set_clause_with_typed_values() {
        let payload = json!({"name": "Amina", "date_of_birth": "2015-04-02", "class_id": 3});
        let update = student_update(&payload).unwrap();

        assert!(update.sql.starts_with("UPDATE students SET "));
        assert!(update.sql.ends_with(" WHERE id = ?"));
        assert_eq!(update.values.len(), 4);
        assert!(update.values.contains(&SqlValue::String("Amina".into())));
        assert!(update.values.contains(&SqlValue::Date(
            NaiveDate::from_ymd_opt(2015, 4, 2).unwrap()
        )));
        assert_eq!(update.values.last(), Some(&SqlValue::U64(9)));
    }

    #[test]
    fn rejects_columns_outside_allow_list() {
        let payload = json!({"name": "x", "id = 1; DROP TABLE students; --": 1});
        let err = student_update(&payload).unwrap_err();
        assert!(err.to_string().starts_with("Unknown field"));
    }

    #[test]
    fn rejects_empty_and_non_object_payloads() {
        assert!(student_update(&json!({})).is_err());
        assert!(student_update(&json!([1, 2])).is_err());
    }

    #[test]
    fn null_clears_a_column() {
        let update = student_update(&json!({"nemis_no": null})).unwrap();
        assert_eq!(update.sql, "UPDATE students SET nemis_no = ? WHERE id = ?");
        assert_eq!(update.values[0], SqlValue::Null);
    }

    #[test]
    fn values_of_the_wrong_type_are_rejected() {
        for payload in [
            json!({"date_of_birth": "02/04/2015"}),
            json!({"class_id": "abc"}),
            json!({"nemis_no": 12.5}),
            json!({"name": 7}),
        ] {
            let err = student_update(&payload).unwrap_err();
            assert!(matches!(err, ApiError::BadRequest(_)), "{payload}");
            assert!(err.to_string().starts_with("Invalid payload"), "{payload}");
        }
    }

    #[test]
    fn only_sent_keys_are_written() {
        let update = student_update(&json!({"class_id": 4})).unwrap();
        assert_eq!(update.sql, "UPDATE students SET class_id = ? WHERE id = ?");
        assert_eq!(update.values, vec![SqlValue::I64(4), SqlValue::U64(9)]);
    }

    #[test]
    fn filters_build_where_clause() {
        let mut filters = Filters::new();
        assert_eq!(filters.where_clause(), "");

        filters
            .eq("class_id = ?", 4u64)
            .like("(first_name LIKE ? OR last_name LIKE ?)", " ann ", 2);

        assert_eq!(
            filters.where_clause(),
            "WHERE class_id = ? AND (first_name LIKE ? OR last_name LIKE ?)"
        );
        assert_eq!(filters.values().len(), 3);
        assert_eq!(filters.values()[2], SqlValue::String("%ann%".into()));
    }
}
