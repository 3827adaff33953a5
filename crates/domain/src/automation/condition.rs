//! Condition: a predicate over event data that must hold for a rule to fire.
//!
//! Evaluation is pure and never fails: type mismatches and unresolvable
//! fields evaluate to "no match" (fail closed), except that an **absent**
//! field satisfies the negative operators `neq`, `not_in` and
//! `not_contains`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// Comparison operator of a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Neq,
    In,
    NotIn,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    NotContains,
    StartsWith,
}

impl Operator {
    pub const ALL: [Self; 11] = [
        Self::Eq,
        Self::Neq,
        Self::In,
        Self::NotIn,
        Self::Gt,
        Self::Gte,
        Self::Lt,
        Self::Lte,
        Self::Contains,
        Self::NotContains,
        Self::StartsWith,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::StartsWith => "starts_with",
        }
    }

    /// Outcome when the condition's field is missing (or `null`).
    #[must_use]
    pub fn matches_absent(self) -> bool {
        matches!(self, Self::Neq | Self::NotIn | Self::NotContains)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownOperator(s.to_string()))
    }
}

/// A single predicate: `field operator value`.
///
/// All conditions of a rule are AND-combined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Dotted path into the event payload, e.g. `customer.address.city`.
    /// Numeric segments index into arrays (`items.0.sku`).
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

impl Condition {
    #[must_use]
    pub fn new(field: impl Into<String>, operator: Operator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Check the condition is well-formed for its operator.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyConditionField`] for an empty path
    /// (or an empty path segment), and
    /// [`ValidationError::InvalidConditionValue`] when the literal's type
    /// cannot work with the operator.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.field.split('.').any(str::is_empty) {
            return Err(ValidationError::EmptyConditionField);
        }
        let expected = match self.operator {
            Operator::In | Operator::NotIn if !self.value.is_array() => Some("an array value"),
            Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte
                if as_number(&self.value).is_none() =>
            {
                Some("a numeric value")
            }
            Operator::StartsWith if !self.value.is_string() => Some("a string value"),
            _ => None,
        };
        match expected {
            Some(expected) => Err(ValidationError::InvalidConditionValue {
                field: self.field.clone(),
                operator: self.operator.as_str(),
                expected,
            }),
            None => Ok(()),
        }
    }

    /// Evaluate the condition against an event payload.
    #[must_use]
    pub fn evaluate(&self, data: &Value) -> bool {
        let Some(actual) = resolve_path(data, &self.field) else {
            return self.operator.matches_absent();
        };
        let expected = &self.value;
        match self.operator {
            Operator::Eq => values_equal(actual, expected),
            Operator::Neq => !values_equal(actual, expected),
            Operator::In => expected
                .as_array()
                .is_some_and(|items| items.iter().any(|item| values_equal(actual, item))),
            Operator::NotIn => expected
                .as_array()
                .is_some_and(|items| !items.iter().any(|item| values_equal(actual, item))),
            Operator::Gt => compare_numbers(actual, expected) == Some(Ordering::Greater),
            Operator::Gte => matches!(
                compare_numbers(actual, expected),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Operator::Lt => compare_numbers(actual, expected) == Some(Ordering::Less),
            Operator::Lte => matches!(
                compare_numbers(actual, expected),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Operator::Contains => contains(actual, expected),
            Operator::NotContains => !contains(actual, expected),
            Operator::StartsWith => match (actual.as_str(), expected.as_str()) {
                (Some(text), Some(prefix)) => text.starts_with(prefix),
                _ => false,
            },
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.operator, self.value)
    }
}

/// Outcome of evaluating one condition, kept for logs and dry runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionResult {
    pub field: String,
    pub operator: Operator,
    pub matched: bool,
}

/// Evaluate every condition in order, without short-circuiting.
#[must_use]
pub fn evaluate_all(conditions: &[Condition], data: &Value) -> Vec<ConditionResult> {
    conditions
        .iter()
        .map(|condition| ConditionResult {
            field: condition.field.clone(),
            operator: condition.operator,
            matched: condition.evaluate(data),
        })
        .collect()
}

/// Whether every condition holds (vacuously true for an empty list).
#[must_use]
pub fn all_match(conditions: &[Condition], data: &Value) -> bool {
    conditions.iter().all(|condition| condition.evaluate(data))
}

/// Walk a dotted path. `null` leaves are reported as absent.
fn resolve_path<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = data;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    (!current.is_null()).then_some(current)
}

/// JSON numbers and numeric strings (e.g. decimal totals sent as `"150.00"`).
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn compare_numbers(actual: &Value, expected: &Value) -> Option<Ordering> {
    as_number(actual)?.partial_cmp(&as_number(expected)?)
}

/// Type-aware equality: when a number is involved both sides are coerced
/// to `f64`; everything else is strict JSON equality.
#[allow(clippy::float_cmp)]
fn values_equal(actual: &Value, expected: &Value) -> bool {
    if actual.is_number() || expected.is_number() {
        if let (Some(a), Some(b)) = (as_number(actual), as_number(expected)) {
            return a == b;
        }
    }
    actual == expected
}

fn contains(actual: &Value, needle: &Value) -> bool {
    match actual {
        Value::String(haystack) => needle.as_str().is_some_and(|n| haystack.contains(n)),
        Value::Array(items) => items.iter().any(|item| values_equal(item, needle)),
        _ => false,
    }
}
