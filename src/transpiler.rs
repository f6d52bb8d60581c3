//! SQL Transpiler for Query Intents.
//!
//! Renders a [`QueryIntent`] as one `SELECT` statement. Output is meant for
//! a human to read and run: identifiers are double-quoted, every literal is
//! a single-quoted string, and each clause sits on its own line.

use crate::error::{NlSqlError, NlSqlResult};
use crate::intent::*;
use crate::schema::SchemaRegistry;

/// Trait for converting intent nodes to SQL.
pub trait ToSql {
    /// Convert this node to a SQL string.
    fn to_sql(&self) -> String;
}

/// Wrap an identifier in double quotes. Embedded quotes are not escaped.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name)
}

/// Render a string literal, doubling single quotes.
pub fn format_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

impl ToSql for FieldRef {
    fn to_sql(&self) -> String {
        match self {
            FieldRef::Column(name) => quote_ident(name),
            FieldRef::Count => "COUNT(*)".to_string(),
            FieldRef::Raw(expr) => expr.clone(),
        }
    }
}

impl ToSql for FilterIntent {
    fn to_sql(&self) -> String {
        let expr = self.field.to_sql();

        match self.operator {
            Operator::Between => match &self.value {
                FilterValue::Range { low, high } => format!(
                    "{} BETWEEN {} AND {}",
                    expr,
                    format_literal(low),
                    format_literal(high)
                ),
                FilterValue::List(items) if items.len() == 2 => format!(
                    "{} BETWEEN {} AND {}",
                    expr,
                    format_literal(&items[0]),
                    format_literal(&items[1])
                ),
                // Not a pair: pass the value through as typed
                other => format!("{} BETWEEN {}", expr, other),
            },
            Operator::In => {
                let items: Vec<String> = match &self.value {
                    FilterValue::List(items) => items.iter().map(|v| format_literal(v)).collect(),
                    FilterValue::Scalar(s) => s
                        .split(',')
                        .map(str::trim)
                        .filter(|p| !p.is_empty())
                        .map(format_literal)
                        .collect(),
                    FilterValue::Range { low, high } => {
                        vec![format_literal(low), format_literal(high)]
                    }
                };
                format!("{} IN ({})", expr, items.join(", "))
            }
            op => format!("{} {} {}", expr, op, format_literal(&self.value.to_string())),
        }
    }
}

impl ToSql for SortIntent {
    fn to_sql(&self) -> String {
        format!("{} {}", self.field.to_sql(), self.direction)
    }
}

/// Build a WHERE or HAVING clause. Each condition after the first is
/// prefixed with its own logical operator; nothing is parenthesized.
fn filter_clause(keyword: &str, filters: &[FilterIntent]) -> Option<String> {
    if filters.is_empty() {
        return None;
    }
    let mut parts: Vec<String> = Vec::with_capacity(filters.len());
    for (idx, filter) in filters.iter().enumerate() {
        if idx == 0 {
            parts.push(filter.to_sql());
        } else {
            parts.push(format!("{} {}", filter.logical, filter.to_sql()));
        }
    }
    Some(format!("{} {}", keyword, parts.join(" ")))
}

fn join_sql<T: ToSql>(items: &[T]) -> String {
    items
        .iter()
        .map(ToSql::to_sql)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render `intent` as a SQL `SELECT`, mapping its entity to a table through `registry`.
pub fn build_sql(intent: &QueryIntent, registry: &SchemaRegistry) -> NlSqlResult<String> {
    let table = registry
        .get_table_for_entity(&intent.entity)
        .ok_or_else(|| NlSqlError::missing_mapping(&intent.entity))?;

    let mut lines: Vec<String> = Vec::new();

    // SELECT
    let select_expr = if intent.fields.is_empty() {
        "*".to_string()
    } else {
        join_sql(&intent.fields)
    };
    let distinct = if intent.distinct { "DISTINCT " } else { "" };
    lines.push(format!("SELECT {}{}", distinct, select_expr));

    // FROM
    lines.push(format!("FROM {}", quote_ident(table)));

    // WHERE
    if let Some(clause) = filter_clause("WHERE", &intent.filters) {
        lines.push(clause);
    }

    // GROUP BY / HAVING
    if !intent.group_by.is_empty() {
        lines.push(format!("GROUP BY {}", join_sql(&intent.group_by)));
    }
    if let Some(clause) = filter_clause("HAVING", &intent.having) {
        lines.push(clause);
    }

    // ORDER BY
    if !intent.sort.is_empty() {
        lines.push(format!("ORDER BY {}", join_sql(&intent.sort)));
    }

    // LIMIT
    if let Some(n) = intent.limit {
        lines.push(format!("LIMIT {}", n));
    }

    tracing::debug!(
        "Rendered {} clause(s) for entity '{}' on table '{}'",
        lines.len(),
        intent.entity,
        table
    );
    Ok(lines.join("\n") + ";")
}
