//! Query specification shared by every store backend.
//!
//! A [`QuerySpec`] is a conjunction of [`Filter`]s plus a [`Projection`].
//! The REST backend renders it to parameterized SQL with [`QuerySpec::to_sql`];
//! the in-process backend evaluates it directly with [`QuerySpec::matches`].

use serde::Serialize;
use serde_json::Value;
use std::fmt;

const ROOT_ALIAS: &str = "root";

/// Predicate on one wire property of a document
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { field: String, value: Value },
    Ne { field: String, value: Value },
    /// Substring match on a string property
    Contains { field: String, value: String },
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Ne {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Contains {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Filter::Eq { field, .. } | Filter::Ne { field, .. } | Filter::Contains { field, .. } => {
                field
            }
        }
    }

    /// Evaluate against a stored document.
    ///
    /// A missing property never matches, the same as an undefined comparison
    /// on the server.
    pub fn matches(&self, document: &Value) -> bool {
        let Some(actual) = document.get(self.field()) else {
            return false;
        };

        match self {
            Filter::Eq { value, .. } => actual == value,
            Filter::Ne { value, .. } => actual != value,
            Filter::Contains { value, .. } => actual
                .as_str()
                .is_some_and(|text| text.contains(value.as_str())),
        }
    }

    fn to_sql(&self, parameter: &str) -> String {
        let property = property_path(self.field());
        match self {
            Filter::Eq { .. } => format!("{} = {}", property, parameter),
            Filter::Ne { .. } => format!("{} != {}", property, parameter),
            Filter::Contains { .. } => format!("CONTAINS({}, {})", property, parameter),
        }
    }

    fn parameter_value(&self) -> Value {
        match self {
            Filter::Eq { value, .. } | Filter::Ne { value, .. } => value.clone(),
            Filter::Contains { value, .. } => Value::String(value.clone()),
        }
    }
}

/// What each query result contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Projection {
    /// The whole document
    #[default]
    Document,
    /// Only the `id` property, as a bare value
    Id,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuerySpec {
    filters: Vec<Filter>,
    projection: Projection,
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn project(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    /// True if the document satisfies every filter
    pub fn matches(&self, document: &Value) -> bool {
        self.filters.iter().all(|filter| filter.matches(document))
    }

    /// Apply the projection to a matching document
    pub fn project_document(&self, document: &Value) -> Value {
        match self.projection {
            Projection::Document => document.clone(),
            Projection::Id => document.get("id").cloned().unwrap_or(Value::Null),
        }
    }

    pub fn to_sql(&self) -> SqlQuerySpec {
        let select = match self.projection {
            Projection::Document => "SELECT *".to_string(),
            Projection::Id => format!("SELECT VALUE {}.id", ROOT_ALIAS),
        };

        let mut query = format!("{} FROM {}", select, ROOT_ALIAS);
        let mut parameters = Vec::with_capacity(self.filters.len());

        for (index, filter) in self.filters.iter().enumerate() {
            let name = format!("@p{}", index);
            query.push_str(if index == 0 { " WHERE " } else { " AND " });
            query.push_str(&filter.to_sql(&name));
            parameters.push(SqlParameter {
                name,
                value: filter.parameter_value(),
            });
        }

        SqlQuerySpec { query, parameters }
    }
}

impl fmt::Display for QuerySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql().query)
    }
}

/// Request body of a SQL query against a collection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlQuerySpec {
    pub query: String,
    pub parameters: Vec<SqlParameter>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlParameter {
    pub name: String,
    pub value: Value,
}

fn property_path(field: &str) -> String {
    // JSON string quoting escapes any quote or backslash in the property name
    let quoted = serde_json::to_string(field).unwrap_or_else(|_| format!("\"{}\"", field));
    format!("{}[{}]", ROOT_ALIAS, quoted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unfiltered_sql() {
        let spec = QuerySpec::new();
        assert_eq!(spec.to_sql().query, "SELECT * FROM root");
        assert!(spec.to_sql().parameters.is_empty());
    }

    #[test]
    fn test_filters_become_parameters() {
        let spec = QuerySpec::new()
            .filter(Filter::eq("isComplete", false))
            .filter(Filter::contains("name", "milk"));

        let sql = spec.to_sql();
        assert_eq!(
            sql.query,
            r#"SELECT * FROM root WHERE root["isComplete"] = @p0 AND CONTAINS(root["name"], @p1)"#
        );
        assert_eq!(sql.parameters[0].name, "@p0");
        assert_eq!(sql.parameters[0].value, json!(false));
        assert_eq!(sql.parameters[1].value, json!("milk"));
    }

    #[test]
    fn test_id_projection() {
        let spec = QuerySpec::new()
            .filter(Filter::ne("isComplete", true))
            .project(Projection::Id);
        assert_eq!(
            spec.to_string(),
            r#"SELECT VALUE root.id FROM root WHERE root["isComplete"] != @p0"#
        );

        let document = json!({"id": "a", "isComplete": false});
        assert_eq!(spec.project_document(&document), json!("a"));
    }

    #[test]
    fn test_matches() {
        let document = json!({"id": "a", "name": "Buy milk", "isComplete": false});

        assert!(Filter::eq("isComplete", false).matches(&document));
        assert!(!Filter::eq("isComplete", true).matches(&document));
        assert!(Filter::ne("isComplete", true).matches(&document));
        assert!(Filter::contains("name", "milk").matches(&document));
        assert!(!Filter::contains("isComplete", "fal").matches(&document));
        // missing property
        assert!(!Filter::eq("priority", 1).matches(&document));
        assert!(!Filter::ne("priority", 1).matches(&document));
    }

    #[test]
    fn test_property_names_are_quoted() {
        let spec = QuerySpec::new().filter(Filter::eq(r#"we"ird"#, 1));
        assert_eq!(
            spec.to_sql().query,
            r#"SELECT * FROM root WHERE root["we\"ird"] = @p0"#
        );
    }
}
