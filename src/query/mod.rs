//! Structured query matching.
//!
//! A query is itself a document: a JSON object whose fields name conditions
//! on document fields. [`Filter::parse`] turns the query text into a
//! predicate tree once; [`Filter::matches`] evaluates it against the relaxed
//! JSON projection of a document.
//!
//! Supported shape: implicit equality (`{"a": 3}`), per-field operator
//! objects (`{"a": {"$gt": 3, "$lt": 9}}`) with `$eq $ne $gt $gte $lt $lte
//! $in $nin $exists $regex $options $not`, and the top-level connectives
//! `$and $or $nor`. Dotted paths descend sub-documents; a leaf that is an
//! array matches when any element matches.

use std::cmp::Ordering;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query must be a JSON object")]
    NotAnObject,

    #[error("invalid query: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported operator '{0}'")]
    UnsupportedOperator(String),

    #[error("{0} expects an array of query objects")]
    ExpectsFilterArray(String),

    #[error("{0} expects an array")]
    ExpectsArray(&'static str),

    #[error("$regex expects a string pattern")]
    RegexPattern,

    #[error("invalid regular expression: {0}")]
    Regex(#[from] regex::Error),
}

/// A parsed query document. The top level is an implicit conjunction.
#[derive(Debug, Clone)]
pub struct Filter {
    clauses: Vec<Clause>,
}

#[derive(Debug, Clone)]
enum Clause {
    Field { path: Vec<String>, preds: Vec<Pred> },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Nor(Vec<Filter>),
}

#[derive(Debug, Clone)]
enum Pred {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Exists(bool),
    Regex(Regex),
    Not(Vec<Pred>),
}

impl Filter {
    pub fn parse(text: &str) -> Result<Self, QueryError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value)
    }

    fn from_value(value: &Value) -> Result<Self, QueryError> {
        let Value::Object(map) = value else {
            return Err(QueryError::NotAnObject);
        };

        let mut clauses = Vec::with_capacity(map.len());
        for (key, condition) in map {
            if let Some(connective) = key.strip_prefix('$') {
                let filters = filter_list(key, condition)?;
                clauses.push(match connective {
                    "and" => Clause::And(filters),
                    "or" => Clause::Or(filters),
                    "nor" => Clause::Nor(filters),
                    _ => return Err(QueryError::UnsupportedOperator(key.clone())),
                });
            } else {
                clauses.push(Clause::Field {
                    path: key.split('.').map(str::to_string).collect(),
                    preds: parse_preds(condition)?,
                });
            }
        }
        Ok(Self { clauses })
    }

    pub fn matches(&self, doc: &Value) -> bool {
        self.clauses.iter().all(|clause| clause.matches(doc))
    }
}

fn filter_list(key: &str, condition: &Value) -> Result<Vec<Filter>, QueryError> {
    let Value::Array(items) = condition else {
        return Err(QueryError::ExpectsFilterArray(key.to_string()));
    };
    items.iter().map(Filter::from_value).collect()
}

/// Parse the right-hand side of a field condition.
///
/// An object whose every key is an operator becomes a predicate list; any
/// other value is an implicit equality.
fn parse_preds(condition: &Value) -> Result<Vec<Pred>, QueryError> {
    let Value::Object(map) = condition else {
        return Ok(vec![Pred::Eq(condition.clone())]);
    };
    if map.is_empty() || !map.keys().all(|k| k.starts_with('$')) {
        return Ok(vec![Pred::Eq(condition.clone())]);
    }

    let mut preds = Vec::with_capacity(map.len());
    for (op, arg) in map {
        match op.as_str() {
            "$eq" => preds.push(Pred::Eq(arg.clone())),
            "$ne" => preds.push(Pred::Ne(arg.clone())),
            "$gt" => preds.push(Pred::Gt(arg.clone())),
            "$gte" => preds.push(Pred::Gte(arg.clone())),
            "$lt" => preds.push(Pred::Lt(arg.clone())),
            "$lte" => preds.push(Pred::Lte(arg.clone())),
            "$in" => preds.push(Pred::In(value_list("$in", arg)?)),
            "$nin" => preds.push(Pred::Nin(value_list("$nin", arg)?)),
            "$exists" => preds.push(Pred::Exists(truthy(arg))),
            "$not" => preds.push(Pred::Not(parse_preds(arg)?)),
            "$regex" => {
                let Some(pattern) = arg.as_str() else {
                    return Err(QueryError::RegexPattern);
                };
                let options = map.get("$options").and_then(Value::as_str).unwrap_or("");
                preds.push(Pred::Regex(build_regex(pattern, options)?));
            }
            // Consumed together with $regex above.
            "$options" => {}
            other => return Err(QueryError::UnsupportedOperator(other.to_string())),
        }
    }
    Ok(preds)
}

fn value_list(op: &'static str, arg: &Value) -> Result<Vec<Value>, QueryError> {
    match arg {
        Value::Array(items) => Ok(items.clone()),
        _ => Err(QueryError::ExpectsArray(op)),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::Null => false,
        _ => true,
    }
}

fn build_regex(pattern: &str, options: &str) -> Result<Regex, QueryError> {
    let mut builder = regex::RegexBuilder::new(pattern);
    builder.case_insensitive(options.contains('i'));
    builder.multi_line(options.contains('m'));
    builder.dot_matches_new_line(options.contains('s'));
    Ok(builder.build()?)
}

impl Clause {
    fn matches(&self, doc: &Value) -> bool {
        match self {
            Self::Field { path, preds } => {
                let target = resolve(doc, path);
                preds.iter().all(|pred| pred.matches(target))
            }
            Self::And(filters) => filters.iter().all(|f| f.matches(doc)),
            Self::Or(filters) => filters.iter().any(|f| f.matches(doc)),
            Self::Nor(filters) => !filters.iter().any(|f| f.matches(doc)),
        }
    }
}

/// Walk a dotted path through nested objects.
fn resolve<'a>(doc: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut current = doc;
    for segment in path {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

impl Pred {
    fn matches(&self, target: Option<&Value>) -> bool {
        if let Self::Exists(want) = self {
            return target.is_some() == *want;
        }
        // $ne and $not treat a missing field as "not equal" / "not matching",
        // the rest require a value.
        let Some(value) = target else {
            return matches!(self, Self::Ne(_) | Self::Not(_) | Self::Nin(_));
        };
        match self {
            Self::Eq(q) => value_eq(value, q),
            Self::Ne(q) => !value_eq(value, q),
            Self::Gt(q) => any_leaf(value, |v| compare(v, q) == Some(Ordering::Greater)),
            Self::Gte(q) => any_leaf(value, |v| {
                matches!(compare(v, q), Some(Ordering::Greater | Ordering::Equal))
            }),
            Self::Lt(q) => any_leaf(value, |v| compare(v, q) == Some(Ordering::Less)),
            Self::Lte(q) => any_leaf(value, |v| {
                matches!(compare(v, q), Some(Ordering::Less | Ordering::Equal))
            }),
            Self::In(list) => list.iter().any(|item| value_eq(value, item)),
            Self::Nin(list) => !list.iter().any(|item| value_eq(value, item)),
            Self::Regex(re) => any_leaf(value, |v| {
                v.as_str().is_some_and(|s| re.is_match(s))
            }),
            Self::Not(preds) => !preds.iter().all(|p| p.matches(Some(value))),
            Self::Exists(_) => unreachable!(),
        }
    }
}

/// Equality with numeric cross-type comparison and array-contains semantics.
fn value_eq(value: &Value, query: &Value) -> bool {
    if scalar_eq(value, query) {
        return true;
    }
    match value {
        Value::Array(items) => items.iter().any(|item| scalar_eq(item, query)),
        _ => false,
    }
}

fn scalar_eq(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    matches!(compare(a, b), Some(Ordering::Equal))
}

/// Apply `pred` to the value, or to any element when the value is an array.
fn any_leaf(value: &Value, pred: impl Fn(&Value) -> bool) -> bool {
    if pred(value) {
        return true;
    }
    match value {
        Value::Array(items) => items.iter().any(pred),
        _ => false,
    }
}

/// Ordering over comparable scalars: numbers cross-type, strings, booleans.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
