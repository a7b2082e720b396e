//! Compiler from query state to the store query IR.
//!
//! A pure function from [`QueryState`] to [`QueryPlan`]. Where-clause values
//! are parsed here and nowhere else; a clause whose value fails its declared
//! coercion is dropped rather than aborting the whole query, matching the
//! tolerance of a partially-filled form. Only an empty source path is a hard
//! error, raised before any constraint is built.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use docbench_proto::{
    AggregateMode, FieldFilter, QueryPlan, QueryScope, QueryState, SourceScope, StructuredQuery,
    Value, WhereClause, WhereValueType,
};

use crate::error::Error;

/// Compile a query state into an executable plan.
pub fn compile(state: &QueryState) -> Result<QueryPlan, Error> {
    let path = state.source.path.trim();
    if path.is_empty() {
        return Err(Error::InvalidArgument("query path is empty".into()));
    }

    let scope = match state.source.scope {
        SourceScope::Collection => QueryScope::Collection {
            path: path.to_string(),
        },
        // A collection group binds to the last path segment, spanning all
        // nesting levels.
        SourceScope::CollectionGroup => QueryScope::CollectionGroup {
            id: path
                .rsplit('/')
                .find(|s| !s.is_empty())
                .unwrap_or(path)
                .to_string(),
        },
    };

    let mut query = StructuredQuery::new(scope);

    for clause in &state.constraints.where_clauses {
        if clause.field.trim().is_empty() {
            continue;
        }
        match coerce_clause_value(clause) {
            Some(value) => {
                query = query.with_filter(FieldFilter::new(
                    clause.field.clone(),
                    clause.operator,
                    value,
                ));
            }
            None => {
                tracing::debug!(
                    field = %clause.field,
                    operator = clause.operator.as_str(),
                    value = %clause.value,
                    "dropping where clause with uncoercible value"
                );
            }
        }
    }

    let order = &state.constraints.order_by;
    if order.enabled && !order.field.trim().is_empty() {
        query = query.with_order_by(order.field.clone(), order.direction);
    }

    let limit = &state.constraints.limit;
    if limit.enabled {
        if let Ok(n) = limit.value.trim().parse::<usize>() {
            if n > 0 {
                query = query.with_limit(n);
            }
        }
    }

    Ok(QueryPlan {
        query,
        mode: select_mode(state),
    })
}

/// Select the execution mode from the aggregation toggles.
///
/// Count has the highest precedence and ignores sum/average; sum beats
/// average; both require at least one non-blank field.
fn select_mode(state: &QueryState) -> AggregateMode {
    let agg = &state.aggregation;
    if agg.count.enabled {
        return AggregateMode::Count;
    }
    if agg.sum.enabled {
        let fields = non_blank(&agg.sum.fields);
        if !fields.is_empty() {
            return AggregateMode::Sum(fields);
        }
    }
    if agg.average.enabled {
        let fields = non_blank(&agg.average.fields);
        if !fields.is_empty() {
            return AggregateMode::Average(fields);
        }
    }
    AggregateMode::List
}

fn non_blank(fields: &[String]) -> Vec<String> {
    fields
        .iter()
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}

/// Coerce the raw clause value per its operator and declared type.
///
/// Returns `None` when the clause must be dropped.
fn coerce_clause_value(clause: &WhereClause) -> Option<Value> {
    if clause.operator.requires_array() {
        return Some(parse_array_value(&clause.value));
    }
    coerce_scalar(&clause.value, clause.value_type)
}

/// Right-hand side of `in` / `not-in` / `array-contains-any`.
///
/// Strict JSON-array parse first; a parsed scalar wraps in a singleton; on
/// parse failure fall back to splitting on `,` and trimming each segment.
fn parse_array_value(raw: &str) -> Value {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(items)) => {
            Value::Array(items.into_iter().map(Value::from_json).collect())
        }
        Ok(other) => Value::Array(vec![Value::from_json(other)]),
        Err(_) => Value::Array(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Value::String(s.to_string()))
                .collect(),
        ),
    }
}

fn coerce_scalar(raw: &str, value_type: WhereValueType) -> Option<Value> {
    match value_type {
        WhereValueType::String => Some(Value::String(raw.to_string())),
        WhereValueType::Number => {
            let n: f64 = raw.trim().parse().ok()?;
            if n.is_nan() {
                return None;
            }
            // Preserve integer-ness when the literal has no fraction.
            if n.fract() == 0.0 && raw.trim().parse::<i64>().is_ok() {
                Some(Value::Int(n as i64))
            } else {
                Some(Value::Float(n))
            }
        }
        WhereValueType::Boolean => Some(Value::Bool(raw == "true")),
        WhereValueType::Null => Some(Value::Null),
        WhereValueType::Timestamp => parse_timestamp(raw).map(Value::Timestamp),
    }
}

/// Parse a user-typed date: RFC 3339 first, then the common plain forms.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}
