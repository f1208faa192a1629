//! Ordered range queries over the children of a node.
//!
//! Children are ordered the way a realtime database orders them: by the value
//! of a declared child field (or by key when no field is declared), with ties
//! broken by key. Value types sort as
//! `null < false < true < numbers < strings < objects`.

use std::cmp::Ordering;

use serde_json::Value;

use super::Child;

/// Upper bound appended to a prefix to turn a range query into "starts with".
///
/// `char::MAX` sorts after every character a stored string can contain, so
/// `[prefix, prefix + HIGH_SENTINEL]` holds exactly the strings beginning with
/// `prefix`.
pub const HIGH_SENTINEL: char = char::MAX;

/// A query over the children of a single node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    /// Child field to order by; `None` orders by key.
    pub order_by: Option<String>,
    /// Inclusive lower bound on the ordering value.
    pub start_at: Option<Value>,
    /// Inclusive upper bound on the ordering value.
    pub end_at: Option<Value>,
    /// Exact match on the ordering value. Takes precedence over the bounds.
    pub equal_to: Option<Value>,
    /// Keep only the first `n` results.
    pub limit_to_first: Option<usize>,
    /// Keep only the last `n` results.
    pub limit_to_last: Option<usize>,
}

impl ListQuery {
    /// All children, ordered by `field` (or by key).
    #[must_use]
    pub fn ordered_by(field: Option<&str>) -> Self {
        Self {
            order_by: field.map(str::to_string),
            ..Self::default()
        }
    }

    /// Children whose `field` starts with `prefix`, at most `limit` of them.
    #[must_use]
    pub fn prefix(field: &str, prefix: &str, limit: Option<usize>) -> Self {
        Self {
            order_by: Some(field.to_string()),
            start_at: Some(Value::String(prefix.to_string())),
            end_at: Some(Value::String(format!("{prefix}{HIGH_SENTINEL}"))),
            limit_to_first: limit,
            ..Self::default()
        }
    }

    /// Set the inclusive lower bound.
    #[must_use]
    pub fn start_at(mut self, value: impl Into<Value>) -> Self {
        self.start_at = Some(value.into());
        self
    }

    /// Set the inclusive upper bound.
    #[must_use]
    pub fn end_at(mut self, value: impl Into<Value>) -> Self {
        self.end_at = Some(value.into());
        self
    }

    /// Match the ordering value exactly.
    #[must_use]
    pub fn equal_to(mut self, value: impl Into<Value>) -> Self {
        self.equal_to = Some(value.into());
        self
    }

    /// Keep only the first `limit` results.
    #[must_use]
    pub const fn limit_to_first(mut self, limit: usize) -> Self {
        self.limit_to_first = Some(limit);
        self
    }

    /// Keep only the last `limit` results.
    #[must_use]
    pub const fn limit_to_last(mut self, limit: usize) -> Self {
        self.limit_to_last = Some(limit);
        self
    }

    /// Evaluate the query against a node. Non-object nodes have no children.
    #[must_use]
    pub fn apply(&self, node: Option<&Value>) -> Vec<Child> {
        let Some(Value::Object(children)) = node else {
            return Vec::new();
        };

        let mut entries: Vec<Child> = children
            .iter()
            .map(|(key, value)| Child {
                key: key.clone(),
                value: value.clone(),
            })
            .filter(|child| self.within_bounds(child))
            .collect();

        match self.order_by.as_deref() {
            Some(field) => entries.sort_by(|a, b| {
                compare_values(a.value.get(field), b.value.get(field))
                    .then_with(|| a.key.cmp(&b.key))
            }),
            None => entries.sort_by(|a, b| a.key.cmp(&b.key)),
        }

        if let Some(limit) = self.limit_to_first {
            entries.truncate(limit);
        }
        if let Some(limit) = self.limit_to_last {
            let skip = entries.len().saturating_sub(limit);
            entries.drain(..skip);
        }
        entries
    }

    fn within_bounds(&self, child: &Child) -> bool {
        let key_value;
        let value = match self.order_by.as_deref() {
            Some(field) => child.value.get(field),
            None => {
                key_value = Value::String(child.key.clone());
                Some(&key_value)
            }
        };

        if let Some(expected) = &self.equal_to {
            return compare_values(value, Some(expected)) == Ordering::Equal;
        }

        let after_start = self
            .start_at
            .as_ref()
            .map_or(true, |start| compare_values(value, Some(start)) != Ordering::Less);
        let before_end = self
            .end_at
            .as_ref()
            .map_or(true, |end| compare_values(value, Some(end)) != Ordering::Greater);
        after_start && before_end
    }
}

/// Total order over optional JSON values used for child ordering.
#[must_use]
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

const fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(false)) => 1,
        Some(Value::Bool(true)) => 2,
        Some(Value::Number(_)) => 3,
        Some(Value::String(_)) => 4,
        Some(Value::Array(_) | Value::Object(_)) => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(children: &[Child]) -> Vec<&str> {
        children.iter().map(|c| c.key.as_str()).collect()
    }

    fn people() -> Value {
        json!({
            "k1": { "n": "maria" },
            "k2": { "n": "jose" },
            "k3": { "n": "joao" },
            "k4": { "n": "ana" },
            "k5": { "other": true },
        })
    }

    #[test]
    fn test_orders_by_child_field_with_missing_first() {
        let result = ListQuery::ordered_by(Some("n")).apply(Some(&people()));
        assert_eq!(keys(&result), ["k5", "k4", "k3", "k2", "k1"]);
    }

    #[test]
    fn test_orders_by_key_without_field() {
        let tree = json!({ "b": 1, "a": 2, "c": 0 });
        let result = ListQuery::ordered_by(None).apply(Some(&tree));
        assert_eq!(keys(&result), ["a", "b", "c"]);
    }

    #[test]
    fn test_prefix_query_matches_starts_with() {
        let result = ListQuery::prefix("n", "jo", None).apply(Some(&people()));
        assert_eq!(keys(&result), ["k3", "k2"]);
    }

    #[test]
    fn test_empty_prefix_matches_every_string() {
        let result = ListQuery::prefix("n", "", None).apply(Some(&people()));
        assert_eq!(keys(&result), ["k4", "k3", "k2", "k1"]);
    }

    #[test]
    fn test_prefix_covers_supplementary_plane_characters() {
        let tree = json!({
            "a": { "n": "jo\u{1F600}" },
            "b": { "n": "jo\u{F8FF}z" },
            "c": { "n": "jp" },
        });
        let result = ListQuery::prefix("n", "jo", None).apply(Some(&tree));
        assert_eq!(keys(&result), ["b", "a"]);
    }

    #[test]
    fn test_limits() {
        let first = ListQuery::ordered_by(Some("n"))
            .limit_to_first(2)
            .apply(Some(&people()));
        assert_eq!(keys(&first), ["k5", "k4"]);

        let last = ListQuery::ordered_by(Some("n"))
            .limit_to_last(2)
            .apply(Some(&people()));
        assert_eq!(keys(&last), ["k2", "k1"]);
    }

    #[test]
    fn test_equal_to_overrides_bounds() {
        let result = ListQuery::ordered_by(Some("n"))
            .start_at("z")
            .equal_to("ana")
            .apply(Some(&people()));
        assert_eq!(keys(&result), ["k4"]);
    }

    #[test]
    fn test_ties_broken_by_key() {
        let tree = json!({ "b": { "n": 1 }, "a": { "n": 1 }, "c": { "n": 0.5 } });
        let result = ListQuery::ordered_by(Some("n")).apply(Some(&tree));
        assert_eq!(keys(&result), ["c", "a", "b"]);
    }

    #[test]
    fn test_non_object_node_has_no_children() {
        assert!(ListQuery::default().apply(Some(&json!("leaf"))).is_empty());
        assert!(ListQuery::default().apply(None).is_empty());
    }

    #[test]
    fn test_type_ranking() {
        let ordered = [
            Value::Null,
            json!(false),
            json!(true),
            json!(-3),
            json!(2.5),
            json!(""),
            json!("a"),
            json!({ "x": 1 }),
        ];
        for pair in ordered.windows(2) {
            assert_ne!(
                compare_values(Some(&pair[0]), Some(&pair[1])),
                Ordering::Greater,
                "{} should not sort after {}",
                pair[0],
                pair[1]
            );
        }
    }
}
