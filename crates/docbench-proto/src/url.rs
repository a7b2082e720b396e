//! URL query-parameter codec for [`QueryState`].
//!
//! Makes a query shareable and restorable as a query string:
//!
//! - `path`, `type` (`group` means collection group, absent means collection)
//! - `where` — comma-joined clauses `field:operator:encodedValue[:valueType]`
//!   (the type segment is omitted for `string`)
//! - `orderBy` — `field:direction`
//! - `limit` — integer string
//! - `count` — `"true"`; `sum` / `avg` — comma-joined field lists
//!
//! Clause values are percent-encoded so `:` and `,` never collide with the
//! separators. Decoding is permissive: an individually malformed clause is
//! dropped, the rest of the parse goes through.

use crate::error::Error;
use crate::query::{
    OrderDirection, QueryState, SourceScope, WhereClause, WhereOperator, WhereValueType,
};

/// Encode a query state into a URL query string (no leading `?`).
///
/// Only the source, constraints, and aggregation sections are encoded; the
/// id, title, and timestamps stay local to the session.
pub fn query_state_to_url_params(state: &QueryState) -> String {
    let mut params: Vec<(&str, String)> = Vec::new();

    params.push(("path", state.source.path.clone()));
    if state.source.scope == SourceScope::CollectionGroup {
        params.push(("type", "group".to_string()));
    }

    if !state.constraints.where_clauses.is_empty() {
        let clauses: Vec<String> = state
            .constraints
            .where_clauses
            .iter()
            .map(encode_clause)
            .collect();
        params.push(("where", clauses.join(",")));
    }

    let order = &state.constraints.order_by;
    if order.enabled && !order.field.is_empty() {
        params.push((
            "orderBy",
            format!("{}:{}", order.field, order.direction.as_str()),
        ));
    }

    let limit = &state.constraints.limit;
    if limit.enabled && !limit.value.is_empty() {
        params.push(("limit", limit.value.clone()));
    }

    let agg = &state.aggregation;
    if agg.count.enabled {
        params.push(("count", "true".to_string()));
    }
    if agg.sum.enabled && !agg.sum.fields.is_empty() {
        params.push(("sum", agg.sum.fields.join(",")));
    }
    if agg.average.enabled && !agg.average.fields.is_empty() {
        params.push(("avg", agg.average.fields.join(",")));
    }

    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Decode a URL query string into a fresh query state.
///
/// The result carries a new id and timestamps; source, constraints, and
/// aggregation come from the parameters. Malformed where clauses are
/// dropped individually.
pub fn url_params_to_query_state(input: &str) -> QueryState {
    let mut state = QueryState::new();
    let input = input.strip_prefix('?').unwrap_or(input);

    for pair in input.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = match pair.split_once('=') {
            Some(kv) => kv,
            None => (pair, ""),
        };
        match key {
            "path" => state.source.path = value.to_string(),
            "type" => {
                if value == "group" {
                    state.source.scope = SourceScope::CollectionGroup;
                }
            }
            "where" => {
                for clause_text in value.split(',').filter(|c| !c.is_empty()) {
                    match decode_clause(clause_text) {
                        Ok(clause) => state.constraints.where_clauses.push(clause),
                        Err(e) => {
                            tracing::debug!(clause = clause_text, error = %e, "dropping malformed where clause");
                        }
                    }
                }
            }
            "orderBy" => {
                if let Some((field, dir)) = value.split_once(':') {
                    if let Some(direction) = OrderDirection::parse(dir) {
                        if !field.is_empty() {
                            state.constraints.order_by.enabled = true;
                            state.constraints.order_by.field = field.to_string();
                            state.constraints.order_by.direction = direction;
                        }
                    }
                }
            }
            "limit" => {
                if !value.is_empty() {
                    state.constraints.limit.enabled = true;
                    state.constraints.limit.value = value.to_string();
                }
            }
            "count" => {
                if value == "true" {
                    state.aggregation.count.enabled = true;
                }
            }
            "sum" => {
                state.aggregation.sum.enabled = true;
                state.aggregation.sum.fields = split_fields(value);
            }
            "avg" => {
                state.aggregation.average.enabled = true;
                state.aggregation.average.fields = split_fields(value);
            }
            other => {
                tracing::debug!(param = other, "ignoring unknown query parameter");
            }
        }
    }

    state
}

fn split_fields(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}

fn encode_clause(clause: &WhereClause) -> String {
    let mut out = format!(
        "{}:{}:{}",
        clause.field,
        clause.operator.as_str(),
        percent_encode(&clause.value)
    );
    if clause.value_type != WhereValueType::String {
        out.push(':');
        out.push_str(clause.value_type.as_str());
    }
    out
}

fn decode_clause(text: &str) -> Result<WhereClause, Error> {
    let parts: Vec<&str> = text.split(':').collect();
    let (field, operator, value, value_type) = match parts.as_slice() {
        [field, op, value] => (*field, *op, *value, WhereValueType::String),
        [field, op, value, ty] => {
            let ty = WhereValueType::parse(ty)
                .ok_or_else(|| Error::InvalidEncoding(format!("unknown value type '{}'", ty)))?;
            (*field, *op, *value, ty)
        }
        _ => {
            return Err(Error::InvalidEncoding(format!(
                "expected 3 or 4 segments, got {}",
                parts.len()
            )))
        }
    };

    let operator = WhereOperator::parse(operator)
        .ok_or_else(|| Error::InvalidEncoding(format!("unknown operator '{}'", operator)))?;

    Ok(WhereClause {
        field: field.to_string(),
        operator,
        value: percent_decode(value)?,
        value_type,
    })
}

/// Percent-encode a clause value. Everything outside the unreserved set is
/// escaped, separators included, so the clause grammar stays unambiguous.
fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => {
                out.push('%');
                out.push_str(&format!("{:02X}", byte));
            }
        }
    }
    out
}

fn percent_decode(input: &str) -> Result<String, Error> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = input
                    .get(i + 1..i + 3)
                    .ok_or_else(|| Error::InvalidEncoding("truncated percent escape".into()))?;
                let byte = u8::from_str_radix(hex, 16).map_err(|_| {
                    Error::InvalidEncoding(format!("invalid percent escape '%{}'", hex))
                })?;
                out.push(byte);
                i += 3;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8(out).map_err(|_| Error::InvalidEncoding("invalid utf-8 after decode".into()))
}
