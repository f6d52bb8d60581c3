//! Rule-based natural language parser.
//!
//! Turns a free-text data request into a [`QueryIntent`].
//!
//! # Pipeline
//!
//! ```text
//! "top 10 members joined after 2023-01-01"
//!        │
//!        ├── entity resolution  (hard stop if nothing matches)
//!        │
//!        ├── rule 1 ─┐
//!        ├── rule 2 ─┤  Fragments
//!        ├── ...    ─┤
//!        └── rule N ─┘
//!                    │
//!                    └── reducer ──► QueryIntent
//! ```
//!
//! Rules are independent: a rule that finds nothing contributes nothing,
//! and the only failure is an unresolvable entity.

pub mod lexeme;
pub mod rules;

use std::fmt;

use crate::error::{NlSqlError, NlSqlResult};
use crate::intent::QueryIntent;
use crate::schema::SchemaRegistry;

pub use rules::{Fragment, LiteralFilterRule, Rule, RuleContext};

/// Parse a request with the default rule set.
pub fn parse_nl_to_intent(text: &str, registry: &SchemaRegistry) -> NlSqlResult<QueryIntent> {
    NlParser::default().parse(text, registry)
}

/// An ordered battery of extraction rules.
pub struct NlParser {
    rules: Vec<Box<dyn Rule>>,
}

impl Default for NlParser {
    fn default() -> Self {
        Self {
            rules: rules::default_rules(),
        }
    }
}

impl fmt::Debug for NlParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NlParser")
            .field("rules", &self.rule_names())
            .finish()
    }
}

impl NlParser {
    /// Parser with no rules; only the entity is resolved.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule after the existing ones.
    pub fn with_rule(mut self, rule: impl Rule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Parse one request.
    pub fn parse(&self, text: &str, registry: &SchemaRegistry) -> NlSqlResult<QueryIntent> {
        let entity = resolve_entity(text, registry)?;
        tracing::debug!("Resolved entity '{}' for request: {}", entity, text);

        let ctx = RuleContext::new(text, entity, registry);
        let mut intent = QueryIntent::new(entity);
        let mut fields_set = false;

        for rule in &self.rules {
            let Some(fragment) = rule.extract(&ctx) else {
                continue;
            };
            tracing::debug!("Rule '{}' contributed {:?}", rule.name(), fragment);
            apply_fragment(&mut intent, &mut fields_set, fragment);
        }

        Ok(intent)
    }
}

/// Alias match, else the only configured entity, else an error.
fn resolve_entity<'r>(text: &str, registry: &'r SchemaRegistry) -> NlSqlResult<&'r str> {
    if let Some(entity) = registry.resolve_entity(text) {
        return Ok(entity);
    }
    match registry.entities().as_slice() {
        [only] => {
            tracing::debug!("No entity alias matched; defaulting to '{}'", only);
            Ok(*only)
        }
        _ => Err(NlSqlError::AmbiguousOrUnknownRequest),
    }
}

/// Fold one fragment into the intent under construction.
///
/// Fields and limit keep the first contribution; filters, having and sort
/// append; group-by appends without repeating a column.
fn apply_fragment(intent: &mut QueryIntent, fields_set: &mut bool, fragment: Fragment) {
    match fragment {
        Fragment::Distinct => intent.distinct = true,
        Fragment::Fields(fields) => {
            if !*fields_set {
                intent.fields = fields;
                *fields_set = true;
            }
        }
        Fragment::Filters(filters) => intent.filters.extend(filters),
        Fragment::GroupBy(cols) => {
            for col in cols {
                if !intent.group_by.contains(&col) {
                    intent.group_by.push(col);
                }
            }
        }
        Fragment::Having(filter) => intent.having.push(filter),
        Fragment::Sort(sort) => intent.sort.push(sort),
        Fragment::Limit(n) => {
            intent.limit.get_or_insert(n);
        }
    }
}
