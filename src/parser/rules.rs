//! Extraction rules.
//!
//! Every rule looks for one kind of phrase in the request and, if it finds
//! one, returns a [`Fragment`] of the intent. Rules never fail and never see
//! each other's output; the parser folds their fragments together.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use super::lexeme;
use crate::intent::{FieldRef, FilterIntent, Operator, SortDirection, SortIntent};
use crate::schema::SchemaRegistry;

/// Column the "joined after/before/between" phrases filter on.
pub const JOIN_DATE_COLUMN: &str = "join_date";

static WHERE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"where\s+([\w\.]+)\s+(is|=)\s+([^\s,]+)").unwrap());

static JOINED_AFTER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"joined\s+after\s+(\d{4}-\d{2}-\d{2})").unwrap());

static JOINED_BEFORE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"joined\s+before\s+(\d{4}-\d{2}-\d{2})").unwrap());

static JOINED_BETWEEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"joined\s+between\s+(\d{4}-\d{2}-\d{2})\s+and\s+(\d{4}-\d{2}-\d{2})").unwrap()
});

static IN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)([A-Za-z_ ]+?)\s+in\s+([A-Za-z0-9_,\s'"-]+)"#).unwrap());

static TOP_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\btop\s+(\d+)").unwrap());

static GROUP_BY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bgroup(?:ed)? by\s+([A-Za-z_ ]+?)(?:[,\.\n]|$)").unwrap()
});

static PER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bper\s+([A-Za-z_ ]+?)(?:[,\.\n]|$)").unwrap());

static HAVING_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bhaving\s+count\s*(=|!=|>=|<=|>|<)\s*(\d+)").unwrap()
});

static SORTED_BY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bsorted by\s+(.+?)\s+in\s+(ascending|descending)\s+order").unwrap()
});

static ORDER_BY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\border by\s+(.+?)\s+(asc|desc)\b").unwrap());

/// Everything a rule may look at.
pub struct RuleContext<'a> {
    /// Request as typed
    pub text: &'a str,
    /// Request lowercased
    pub lowered: String,
    /// Already-resolved entity
    pub entity: &'a str,
    pub registry: &'a SchemaRegistry,
}

impl<'a> RuleContext<'a> {
    pub fn new(text: &'a str, entity: &'a str, registry: &'a SchemaRegistry) -> Self {
        Self {
            text,
            lowered: text.to_lowercase(),
            entity,
            registry,
        }
    }

    fn resolve_phrase(&self, phrase: &str) -> Option<FieldRef> {
        self.registry
            .resolve_field_from_phrase(self.entity, phrase)
            .map(|col| FieldRef::Column(col.to_string()))
    }
}

/// A partial intent contributed by one rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Distinct,
    Fields(Vec<FieldRef>),
    Filters(Vec<FilterIntent>),
    GroupBy(Vec<FieldRef>),
    Having(FilterIntent),
    Sort(SortIntent),
    Limit(u64),
}

/// One independent extraction rule.
pub trait Rule: fmt::Debug + Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Look for this rule's phrase; `None` means no contribution.
    fn extract(&self, ctx: &RuleContext<'_>) -> Option<Fragment>;
}

/// Strip the punctuation a captured phrase tends to drag along.
fn clean_phrase(phrase: &str) -> &str {
    phrase.trim_matches(|c: char| matches!(c, ' ' | '.' | ','))
}

// ---------- Distinct ----------

/// "no duplicates", "unique" and friends → DISTINCT.
#[derive(Debug, Clone)]
pub struct DistinctRule {
    phrases: Vec<String>,
}

impl Default for DistinctRule {
    fn default() -> Self {
        Self {
            phrases: ["no duplicates", "no duplicate", "distinct", "unique", "deduplicated"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

impl Rule for DistinctRule {
    fn name(&self) -> &'static str {
        "distinct"
    }

    fn extract(&self, ctx: &RuleContext<'_>) -> Option<Fragment> {
        self.phrases
            .iter()
            .any(|p| ctx.lowered.contains(&p.to_lowercase()))
            .then_some(Fragment::Distinct)
    }
}

// ---------- Fields ----------

/// Mentioned columns, or the details bundle when nothing is mentioned.
#[derive(Debug, Clone, Default)]
pub struct FieldsRule;

impl Rule for FieldsRule {
    fn name(&self) -> &'static str {
        "fields"
    }

    fn extract(&self, ctx: &RuleContext<'_>) -> Option<Fragment> {
        let mut fields = ctx.registry.resolve_fields_from_text(ctx.entity, ctx.text);
        if fields.is_empty() {
            fields = ctx.registry.bundle_for_entity(ctx.entity).to_vec();
        }
        if fields.is_empty() {
            return None;
        }
        Some(Fragment::Fields(
            fields.into_iter().map(FieldRef::Column).collect(),
        ))
    }
}

// ---------- Literal phrase filters ----------

/// A fixed business phrase that always means the same equality filter.
///
/// Only fires when the entity actually has `column`.
#[derive(Debug, Clone)]
pub struct LiteralFilterRule {
    phrase: String,
    column: String,
    value: String,
}

impl LiteralFilterRule {
    pub fn new(
        phrase: impl Into<String>,
        column: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            phrase: phrase.into().to_lowercase(),
            column: column.into(),
            value: value.into(),
        }
    }

    /// "darknet forum" → `breach_source = 'darknet_forum'`.
    pub fn darknet_forum() -> Self {
        Self::new("darknet forum", "breach_source", "darknet_forum")
    }
}

impl Rule for LiteralFilterRule {
    fn name(&self) -> &'static str {
        "literal_filter"
    }

    fn extract(&self, ctx: &RuleContext<'_>) -> Option<Fragment> {
        if !ctx.lowered.contains(&self.phrase)
            || !ctx.registry.field_exists(ctx.entity, &self.column)
        {
            return None;
        }
        Some(Fragment::Filters(vec![FilterIntent::equals(
            FieldRef::Column(self.column.clone()),
            self.value.clone(),
        )]))
    }
}

// ---------- where X is Y ----------

/// `where <field> is|= <value>`, at most once per request.
///
/// The field is taken as typed; it is not checked against the schema.
#[derive(Debug, Clone, Default)]
pub struct WhereEqualsRule;

impl Rule for WhereEqualsRule {
    fn name(&self) -> &'static str {
        "where_equals"
    }

    fn extract(&self, ctx: &RuleContext<'_>) -> Option<Fragment> {
        let caps = WHERE_PATTERN.captures(&ctx.lowered)?;
        let field = caps.get(1)?.as_str();
        let value = caps.get(3)?.as_str();
        Some(Fragment::Filters(vec![FilterIntent::equals(
            FieldRef::Column(field.to_string()),
            value,
        )]))
    }
}

// ---------- joined after / before / between ----------

/// Date phrases around the `join_date` column.
#[derive(Debug, Clone, Default)]
pub struct JoinDateRule;

impl Rule for JoinDateRule {
    fn name(&self) -> &'static str {
        "join_date"
    }

    fn extract(&self, ctx: &RuleContext<'_>) -> Option<Fragment> {
        if !ctx.registry.field_exists(ctx.entity, JOIN_DATE_COLUMN) {
            return None;
        }
        let mut filters = Vec::new();

        if let Some(caps) = JOINED_AFTER_PATTERN.captures(&ctx.lowered) {
            filters.push(FilterIntent::compare(
                JOIN_DATE_COLUMN,
                Operator::Gt,
                &caps[1],
            ));
        }
        if let Some(caps) = JOINED_BEFORE_PATTERN.captures(&ctx.lowered) {
            filters.push(FilterIntent::compare(
                JOIN_DATE_COLUMN,
                Operator::Lt,
                &caps[1],
            ));
        }
        if let Some(caps) = JOINED_BETWEEN_PATTERN.captures(&ctx.lowered) {
            filters.push(FilterIntent::between(JOIN_DATE_COLUMN, &caps[1], &caps[2]));
        }

        (!filters.is_empty()).then_some(Fragment::Filters(filters))
    }
}

// ---------- <phrase> in a, b, c ----------

/// `<column phrase> in <v1>, <v2>, ...`.
#[derive(Debug, Clone, Default)]
pub struct InListRule;

impl Rule for InListRule {
    fn name(&self) -> &'static str {
        "in_list"
    }

    fn extract(&self, ctx: &RuleContext<'_>) -> Option<Fragment> {
        let caps = IN_PATTERN.captures(ctx.text)?;
        let phrase = clean_phrase(caps.get(1)?.as_str());

        // "sorted by X in descending order" also fits the pattern
        if phrase.to_lowercase().contains("sorted by") {
            return None;
        }

        let field = ctx.resolve_phrase(phrase)?;
        let values = lexeme::value_list(caps.get(2)?.as_str());
        if values.is_empty() {
            return None;
        }
        Some(Fragment::Filters(vec![FilterIntent::one_of(field, values)]))
    }
}

// ---------- top N ----------

/// `top <n>` → LIMIT n.
#[derive(Debug, Clone, Default)]
pub struct LimitRule;

impl Rule for LimitRule {
    fn name(&self) -> &'static str {
        "limit"
    }

    fn extract(&self, ctx: &RuleContext<'_>) -> Option<Fragment> {
        let caps = TOP_PATTERN.captures(&ctx.lowered)?;
        caps[1].parse().ok().map(Fragment::Limit)
    }
}

// ---------- group by / per ----------

/// `group by <phrase>`, `grouped by <phrase>` and `per <phrase>`, every occurrence.
#[derive(Debug, Clone, Default)]
pub struct GroupByRule;

impl Rule for GroupByRule {
    fn name(&self) -> &'static str {
        "group_by"
    }

    fn extract(&self, ctx: &RuleContext<'_>) -> Option<Fragment> {
        let mut group_by: Vec<FieldRef> = Vec::new();

        let phrases = GROUP_BY_PATTERN
            .captures_iter(ctx.text)
            .chain(PER_PATTERN.captures_iter(ctx.text));
        for caps in phrases {
            let Some(field) = ctx.resolve_phrase(clean_phrase(&caps[1])) else {
                continue;
            };
            if !group_by.contains(&field) {
                group_by.push(field);
            }
        }

        (!group_by.is_empty()).then_some(Fragment::GroupBy(group_by))
    }
}

// ---------- having count <op> N ----------

/// `having count <op> <n>` → `HAVING COUNT(*) <op> 'n'`.
#[derive(Debug, Clone, Default)]
pub struct HavingCountRule;

impl Rule for HavingCountRule {
    fn name(&self) -> &'static str {
        "having_count"
    }

    fn extract(&self, ctx: &RuleContext<'_>) -> Option<Fragment> {
        let caps = HAVING_PATTERN.captures(&ctx.lowered)?;
        let op = lexeme::parse_operator(&caps[1])?;
        Some(Fragment::Having(FilterIntent::compare(
            FieldRef::Count,
            op,
            &caps[2],
        )))
    }
}

// ---------- sorting ----------

/// `sorted by <phrase> in ascending|descending order`, else
/// `order by <phrase> asc|desc`.
///
/// A phrase that names no column drops the sort.
#[derive(Debug, Clone, Default)]
pub struct SortRule;

impl Rule for SortRule {
    fn name(&self) -> &'static str {
        "sort"
    }

    fn extract(&self, ctx: &RuleContext<'_>) -> Option<Fragment> {
        let caps = SORTED_BY_PATTERN
            .captures(ctx.text)
            .or_else(|| ORDER_BY_PATTERN.captures(ctx.text))?;

        let phrase = clean_phrase(&caps[1]);
        let direction = if caps[2].to_lowercase().starts_with("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };

        let field = ctx.resolve_phrase(phrase)?;
        Some(Fragment::Sort(SortIntent { field, direction }))
    }
}

/// The standard battery, in composition order.
pub fn default_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(DistinctRule::default()),
        Box::new(FieldsRule),
        Box::new(LiteralFilterRule::darknet_forum()),
        Box::new(WhereEqualsRule),
        Box::new(JoinDateRule),
        Box::new(InListRule),
        Box::new(LimitRule),
        Box::new(GroupByRule),
        Box::new(HavingCountRule),
        Box::new(SortRule),
    ]
}
