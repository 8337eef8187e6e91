//! Query fragments
//!
//! The building block every finder method composes from: optional join and
//! WHERE fragments with `?` placeholders, the parameter list whose order
//! matches those placeholders, and optional limit/offset/order plus a
//! statement-cache key.

use param_bind::{Parameter, ParameterList};

#[derive(Debug, Clone, Default)]
pub struct Query {
    pub join: Option<String>,
    pub where_clause: Option<String>,
    pub params: ParameterList,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub order: Option<String>,
    pub cache_key: Option<String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for the common single-column equality filter.
    pub fn by_column(column: &str, param: Parameter) -> Self {
        Self::new().filter(&format!("{}=?", column)).param(param)
    }

    /// Set the JOIN fragment, e.g. `"JOIN orders ON users.id=orders.user_id"`.
    pub fn join(mut self, join: &str) -> Self {
        self.join = Some(join.to_string());
        self
    }

    /// Set the WHERE fragment (without the keyword). Placeholder order must
    /// match the parameter list.
    pub fn filter(mut self, where_clause: &str) -> Self {
        self.where_clause = Some(where_clause.to_string());
        self
    }

    /// Append a parameter.
    pub fn param(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    /// Replace the parameter list.
    pub fn params(mut self, params: ParameterList) -> Self {
        self.params = params;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Set the ORDER BY content (without the keyword), e.g. `"id ASC"`.
    pub fn order(mut self, order: &str) -> Self {
        self.order = Some(order.to_string());
        self
    }

    /// Statement-cache key; under the keep-open policy the built SQL is
    /// reused verbatim for subsequent calls with the same key.
    pub fn cache_key(mut self, cache_key: &str) -> Self {
        self.cache_key = Some(cache_key.to_string());
        self
    }

    /// Human-readable filter description for not-found errors.
    pub(crate) fn describe(&self, table: &str) -> String {
        match (&self.join, &self.where_clause) {
            (Some(join), Some(where_clause)) => {
                format!("{} {} WHERE {}", table, join, where_clause)
            }
            (None, Some(where_clause)) => format!("{} WHERE {}", table, where_clause),
            (Some(join), None) => format!("{} {}", table, join),
            (None, None) => table.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let query = Query::new()
            .filter("name=?")
            .param(Parameter::of("alice"))
            .limit(10)
            .order("id ASC")
            .cache_key("by_name");
        assert_eq!(query.where_clause.as_deref(), Some("name=?"));
        assert_eq!(query.params.len(), 1);
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.cache_key.as_deref(), Some("by_name"));
    }

    #[test]
    fn test_describe() {
        let query = Query::new().filter("id=?");
        assert_eq!(query.describe("users"), "users WHERE id=?");
        assert_eq!(Query::new().describe("users"), "users");
    }
}
