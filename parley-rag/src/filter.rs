//! Metadata pre-filters
//!
//! A filter is a JSON mapping evaluated against document metadata before
//! similarity ranking. Plain values mean equality; operator objects support
//! `$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`, `$in` and `$nin`, and filters
//! combine with `$and` / `$or`. Keys may be dotted paths into nested objects.
//! The empty mapping matches every document.

use parley_core::{ParleyError, ParleyResult};
use serde_json::{Map, Value};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches everything
    All,
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Field { path: String, condition: Condition },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
}

impl Filter {
    /// Parse a filter mapping. Unknown operators are rejected.
    pub fn parse(value: &Value) -> ParleyResult<Self> {
        match value {
            Value::Null => Ok(Filter::All),
            Value::Object(map) => Self::parse_map(map),
            other => Err(invalid(format!(
                "Filter must be a JSON object, got {}",
                type_name(other)
            ))),
        }
    }

    fn parse_map(map: &Map<String, Value>) -> ParleyResult<Self> {
        let mut clauses = Vec::with_capacity(map.len());

        for (key, value) in map {
            let clause = match key.as_str() {
                "$and" => Filter::And(Self::parse_list(key, value)?),
                "$or" => Filter::Or(Self::parse_list(key, value)?),
                op if op.starts_with('$') => {
                    return Err(invalid(format!("Unknown filter operator: {op}")));
                }
                path => Self::parse_field(path, value)?,
            };
            clauses.push(clause);
        }

        Ok(match clauses.len() {
            0 => Filter::All,
            1 => clauses.remove(0),
            _ => Filter::And(clauses),
        })
    }

    fn parse_list(op: &str, value: &Value) -> ParleyResult<Vec<Filter>> {
        value
            .as_array()
            .ok_or_else(|| invalid(format!("{op} expects an array of filters")))?
            .iter()
            .map(Self::parse)
            .collect()
    }

    fn parse_field(path: &str, value: &Value) -> ParleyResult<Self> {
        let operators = match value {
            Value::Object(ops) if ops.keys().any(|k| k.starts_with('$')) => ops,
            literal => {
                return Ok(Filter::Field {
                    path: path.to_string(),
                    condition: Condition::Eq(literal.clone()),
                })
            }
        };

        let mut clauses = Vec::with_capacity(operators.len());
        for (op, operand) in operators {
            let condition = match op.as_str() {
                "$eq" => Condition::Eq(operand.clone()),
                "$ne" => Condition::Ne(operand.clone()),
                "$gt" => Condition::Gt(operand.clone()),
                "$gte" => Condition::Gte(operand.clone()),
                "$lt" => Condition::Lt(operand.clone()),
                "$lte" => Condition::Lte(operand.clone()),
                "$in" => Condition::In(operand_list(op, operand)?),
                "$nin" => Condition::Nin(operand_list(op, operand)?),
                other => return Err(invalid(format!("Unknown filter operator: {other}"))),
            };
            clauses.push(Filter::Field {
                path: path.to_string(),
                condition,
            });
        }

        Ok(if clauses.len() == 1 {
            clauses.remove(0)
        } else {
            Filter::And(clauses)
        })
    }

    /// Evaluate the filter against a metadata mapping
    pub fn matches(&self, metadata: &Map<String, Value>) -> bool {
        match self {
            Filter::All => true,
            Filter::And(filters) => filters.iter().all(|f| f.matches(metadata)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(metadata)),
            Filter::Field { path, condition } => condition.test(lookup(metadata, path)),
        }
    }
}

impl Condition {
    fn test(&self, actual: Option<&Value>) -> bool {
        match self {
            Condition::Eq(expected) => actual == Some(expected),
            Condition::Ne(expected) => actual != Some(expected),
            Condition::In(values) => actual.is_some_and(|a| values.contains(a)),
            Condition::Nin(values) => !actual.is_some_and(|a| values.contains(a)),
            Condition::Gt(bound) => compare(actual, bound) == Some(Ordering::Greater),
            Condition::Gte(bound) => matches!(
                compare(actual, bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Condition::Lt(bound) => compare(actual, bound) == Some(Ordering::Less),
            Condition::Lte(bound) => matches!(
                compare(actual, bound),
                Some(Ordering::Less | Ordering::Equal)
            ),
        }
    }
}

fn lookup<'a>(metadata: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    if let Some(value) = metadata.get(path) {
        return Some(value);
    }

    let mut parts = path.split('.');
    let mut current = metadata.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Order two values of the same kind; numbers and strings only
fn compare(actual: Option<&Value>, bound: &Value) -> Option<Ordering> {
    match (actual?, bound) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn operand_list(op: &str, operand: &Value) -> ParleyResult<Vec<Value>> {
    operand
        .as_array()
        .cloned()
        .ok_or_else(|| invalid(format!("{op} expects an array of values")))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn invalid(message: String) -> ParleyError {
    parley_core::validation_error!(message, "filter", "filter")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = Filter::parse(&json!({})).unwrap();
        assert_eq!(filter, Filter::All);
        assert!(filter.matches(&Map::new()));
    }

    #[test]
    fn test_plain_value_is_equality() {
        let filter = Filter::parse(&json!({"category": "billing"})).unwrap();
        assert!(filter.matches(&meta(json!({"category": "billing", "x": 1}))));
        assert!(!filter.matches(&meta(json!({"category": "shipping"}))));
        assert!(!filter.matches(&Map::new()));
    }

    #[test]
    fn test_comparison_operators() {
        let filter = Filter::parse(&json!({"year": {"$gte": 2020, "$lt": 2024}})).unwrap();
        assert!(filter.matches(&meta(json!({"year": 2020}))));
        assert!(filter.matches(&meta(json!({"year": 2023.5}))));
        assert!(!filter.matches(&meta(json!({"year": 2024}))));
        assert!(!filter.matches(&meta(json!({"year": "2021"}))));
    }

    #[test]
    fn test_membership_and_negation() {
        let filter = Filter::parse(&json!({"lang": {"$in": ["en", "de"]}})).unwrap();
        assert!(filter.matches(&meta(json!({"lang": "de"}))));
        assert!(!filter.matches(&meta(json!({"lang": "fr"}))));

        let filter = Filter::parse(&json!({"lang": {"$nin": ["en"]}})).unwrap();
        assert!(filter.matches(&meta(json!({"lang": "fr"}))));
        assert!(filter.matches(&Map::new()));

        let filter = Filter::parse(&json!({"lang": {"$ne": "en"}})).unwrap();
        assert!(!filter.matches(&meta(json!({"lang": "en"}))));
    }

    #[test]
    fn test_logical_combinators_and_paths() {
        let filter = Filter::parse(&json!({
            "$or": [
                {"source.kind": "faq"},
                {"$and": [{"priority": {"$gt": 2}}, {"public": true}]}
            ]
        }))
        .unwrap();

        assert!(filter.matches(&meta(json!({"source": {"kind": "faq"}}))));
        assert!(filter.matches(&meta(json!({"priority": 3, "public": true}))));
        assert!(!filter.matches(&meta(json!({"priority": 3, "public": false}))));
    }

    #[test]
    fn test_unknown_operator_is_validation_error() {
        let err = Filter::parse(&json!({"x": {"$regex": "a.*"}})).unwrap_err();
        assert!(matches!(err, ParleyError::Validation { .. }));
        assert!(err.to_string().contains("$regex"));

        assert!(Filter::parse(&json!({"$not": {}})).is_err());
        assert!(Filter::parse(&json!([1, 2])).is_err());
        assert!(Filter::parse(&json!({"x": {"$in": "en"}})).is_err());
    }
}
