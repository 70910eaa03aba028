//! Typed collection queries
//!
//! A [`Query`] describes how the service should order, filter and trim the
//! children of a location. The remote backend renders it as REST
//! parameters; the local backend evaluates it directly.
//!
//! ```
//! use fireman_engine::Query;
//!
//! let query = Query::new().order_by_key().start_at("abce").limit_to_first(100);
//! assert!(query.validate().is_ok());
//! ```

use fireman_core::{Error, Result};
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Ordering directive for a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderBy {
    /// Order by child key
    Key,
    /// Order by child value
    Value,
    /// Order by priority
    Priority,
    /// Order by the value at a path below each child
    Child(String),
}

impl OrderBy {
    /// Name as the service spells it (`$key`, `$value`, `$priority` or a child path)
    pub fn name(&self) -> &str {
        match self {
            OrderBy::Key => "$key",
            OrderBy::Value => "$value",
            OrderBy::Priority => "$priority",
            OrderBy::Child(path) => path,
        }
    }
}

impl Serialize for OrderBy {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Ordering, filtering and limiting applied to a location's children
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    /// How children are ordered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<OrderBy>,
    /// Inclusive lower bound in the chosen ordering
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_at: Option<Value>,
    /// Inclusive upper bound in the chosen ordering
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_at: Option<Value>,
    /// Exact match in the chosen ordering
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equal_to: Option<Value>,
    /// Keep only the first `n` children
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_to_first: Option<usize>,
    /// Keep only the last `n` children
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_to_last: Option<usize>,
    /// Replace compound children with `true`
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub shallow: bool,
}

impl Query {
    /// Empty query: the whole location
    pub fn new() -> Self {
        Self::default()
    }

    /// Order children by key
    pub fn order_by_key(mut self) -> Self {
        self.order_by = Some(OrderBy::Key);
        self
    }

    /// Order children by value
    pub fn order_by_value(mut self) -> Self {
        self.order_by = Some(OrderBy::Value);
        self
    }

    /// Order children by priority
    pub fn order_by_priority(mut self) -> Self {
        self.order_by = Some(OrderBy::Priority);
        self
    }

    /// Order children by the value at `path` below each child
    pub fn order_by_child(mut self, path: impl Into<String>) -> Self {
        self.order_by = Some(OrderBy::Child(path.into()));
        self
    }

    /// Inclusive lower bound
    pub fn start_at(mut self, value: impl Into<Value>) -> Self {
        self.start_at = Some(value.into());
        self
    }

    /// Inclusive upper bound
    pub fn end_at(mut self, value: impl Into<Value>) -> Self {
        self.end_at = Some(value.into());
        self
    }

    /// Exact match
    pub fn equal_to(mut self, value: impl Into<Value>) -> Self {
        self.equal_to = Some(value.into());
        self
    }

    /// Keep the first `limit` children
    pub fn limit_to_first(mut self, limit: usize) -> Self {
        self.limit_to_first = Some(limit);
        self
    }

    /// Keep the last `limit` children
    pub fn limit_to_last(mut self, limit: usize) -> Self {
        self.limit_to_last = Some(limit);
        self
    }

    /// Only report which children exist
    pub fn shallow(mut self) -> Self {
        self.shallow = true;
        self
    }

    /// True when the query selects the whole location unchanged
    pub fn is_empty(&self) -> bool {
        self == &Query::default()
    }

    /// Reject combinations the service refuses.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidQuery` when both limits are set, when range
    /// filters or limits are used without an ordering, when `equal_to` is
    /// combined with a range bound, or when `shallow` is combined with
    /// anything else.
    pub fn validate(&self) -> Result<()> {
        if self.limit_to_first.is_some() && self.limit_to_last.is_some() {
            return Err(Error::InvalidQuery(
                "limitToFirst and limitToLast cannot be combined".to_string(),
            ));
        }
        let filtered = self.start_at.is_some()
            || self.end_at.is_some()
            || self.equal_to.is_some()
            || self.limit_to_first.is_some()
            || self.limit_to_last.is_some();
        if filtered && self.order_by.is_none() {
            return Err(Error::InvalidQuery(
                "range filters and limits require orderBy".to_string(),
            ));
        }
        if self.equal_to.is_some() && (self.start_at.is_some() || self.end_at.is_some()) {
            return Err(Error::InvalidQuery(
                "equalTo cannot be combined with startAt or endAt".to_string(),
            ));
        }
        if self.shallow && (filtered || self.order_by.is_some()) {
            return Err(Error::InvalidQuery(
                "shallow cannot be combined with other parameters".to_string(),
            ));
        }
        Ok(())
    }

    /// REST parameters, values JSON-encoded as the service expects
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(order_by) = &self.order_by {
            params.push(("orderBy", Value::from(order_by.name()).to_string()));
        }
        if let Some(value) = &self.start_at {
            params.push(("startAt", value.to_string()));
        }
        if let Some(value) = &self.end_at {
            params.push(("endAt", value.to_string()));
        }
        if let Some(value) = &self.equal_to {
            params.push(("equalTo", value.to_string()));
        }
        if let Some(limit) = self.limit_to_first {
            params.push(("limitToFirst", limit.to_string()));
        }
        if let Some(limit) = self.limit_to_last {
            params.push(("limitToLast", limit.to_string()));
        }
        if self.shallow {
            params.push(("shallow", "true".to_string()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_query_has_no_params() {
        let query = Query::new();
        assert!(query.is_empty());
        assert!(query.to_params().is_empty());
        assert!(query.validate().is_ok());
    }

    #[test]
    fn params_are_json_encoded() {
        let query = Query::new().order_by_key().start_at("abce").limit_to_first(2);
        assert_eq!(
            query.to_params(),
            vec![
                ("orderBy", "\"$key\"".to_string()),
                ("startAt", "\"abce\"".to_string()),
                ("limitToFirst", "2".to_string()),
            ]
        );
    }

    #[test]
    fn child_ordering_with_numeric_bound() {
        let query = Query::new().order_by_child("age").start_at(10).limit_to_last(1);
        assert_eq!(
            query.to_params(),
            vec![
                ("orderBy", "\"age\"".to_string()),
                ("startAt", "10".to_string()),
                ("limitToLast", "1".to_string()),
            ]
        );
    }

    #[test]
    fn shallow_param() {
        assert_eq!(Query::new().shallow().to_params(), vec![("shallow", "true".to_string())]);
    }

    #[test]
    fn serializes_for_logging() {
        let query = Query::new().order_by_value().end_at("s");
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({"orderBy": "$value", "endAt": "s"})
        );
    }

    #[test]
    fn rejects_both_limits() {
        let query = Query::new().order_by_key().limit_to_first(1).limit_to_last(1);
        assert!(matches!(query.validate(), Err(Error::InvalidQuery(_))));
    }

    #[test]
    fn rejects_filters_without_ordering() {
        assert!(Query::new().limit_to_first(3).validate().is_err());
        assert!(Query::new().start_at("a").validate().is_err());
    }

    #[test]
    fn rejects_equal_to_with_range() {
        let query = Query::new().order_by_key().equal_to("a").start_at("a");
        assert!(query.validate().is_err());
    }

    #[test]
    fn rejects_shallow_with_ordering() {
        assert!(Query::new().shallow().order_by_key().validate().is_err());
    }
}
