//! Query Intent model.
//!
//! The structured form of a data request: which entity, which fields,
//! which filters, grouping, sorting and limit. The parser produces it,
//! the transpiler consumes it. Values are plain data with no behavior
//! beyond construction and display.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

use crate::error::{NlSqlError, NlSqlResult};

/// Serialized name of the aggregate count field.
pub const COUNT_SENTINEL: &str = "__count__";

/// Serialized prefix of a raw SQL expression field.
pub const RAW_PREFIX: &str = "expr:";

/// The primary structure representing a parsed data request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryIntent {
    /// Logical entity name (resolved through the schema registry)
    pub entity: String,
    /// Columns to select; empty means all columns
    #[serde(default)]
    pub fields: Vec<FieldRef>,
    /// Whether to use DISTINCT in SELECT
    #[serde(default)]
    pub distinct: bool,
    /// WHERE conditions
    #[serde(default)]
    pub filters: Vec<FilterIntent>,
    /// GROUP BY columns
    #[serde(default)]
    pub group_by: Vec<FieldRef>,
    /// HAVING conditions
    #[serde(default)]
    pub having: Vec<FilterIntent>,
    /// ORDER BY terms
    #[serde(default)]
    pub sort: Vec<SortIntent>,
    /// LIMIT
    #[serde(default)]
    pub limit: Option<u64>,
}

impl QueryIntent {
    /// Create an empty intent for the given entity.
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            fields: vec![],
            distinct: false,
            filters: vec![],
            group_by: vec![],
            having: vec![],
            sort: vec![],
            limit: None,
        }
    }

    /// Select the given columns.
    pub fn fields<I, S>(mut self, cols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<FieldRef>,
    {
        self.fields = cols.into_iter().map(Into::into).collect();
        self
    }

    /// Mark the select as DISTINCT.
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Add a WHERE condition.
    pub fn filter(mut self, filter: FilterIntent) -> Self {
        self.filters.push(filter);
        self
    }

    /// Add a GROUP BY column.
    pub fn group_by(mut self, field: impl Into<FieldRef>) -> Self {
        self.group_by.push(field.into());
        self
    }

    /// Add a HAVING condition.
    pub fn having(mut self, filter: FilterIntent) -> Self {
        self.having.push(filter);
        self
    }

    /// Add an ORDER BY term.
    pub fn sort(mut self, sort: SortIntent) -> Self {
        self.sort.push(sort);
        self
    }

    /// Set the LIMIT.
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }
}

/// A reference to something that can appear where a column can.
///
/// Serialized as a plain string: `"__count__"` for [`FieldRef::Count`],
/// `"expr:<sql>"` for [`FieldRef::Raw`], anything else is a column name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldRef {
    /// A canonical column name, rendered as a quoted identifier
    Column(String),
    /// `COUNT(*)`
    Count,
    /// Trusted SQL fragment, rendered verbatim without quoting or escaping
    Raw(String),
}

impl FieldRef {
    /// Column name, if this is a plain column.
    pub fn column_name(&self) -> Option<&str> {
        match self {
            FieldRef::Column(name) => Some(name),
            _ => None,
        }
    }
}

impl From<String> for FieldRef {
    fn from(s: String) -> Self {
        if s == COUNT_SENTINEL {
            FieldRef::Count
        } else if let Some(expr) = s.strip_prefix(RAW_PREFIX) {
            FieldRef::Raw(expr.to_string())
        } else {
            FieldRef::Column(s)
        }
    }
}

impl From<&str> for FieldRef {
    fn from(s: &str) -> Self {
        FieldRef::from(s.to_string())
    }
}

impl From<FieldRef> for String {
    fn from(field: FieldRef) -> Self {
        field.to_string()
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRef::Column(name) => write!(f, "{}", name),
            FieldRef::Count => write!(f, "{}", COUNT_SENTINEL),
            FieldRef::Raw(expr) => write!(f, "{}{}", RAW_PREFIX, expr),
        }
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    /// Equal (=)
    #[serde(rename = "=")]
    Eq,
    /// Not equal (!=)
    #[serde(rename = "!=")]
    Ne,
    /// Greater than (>)
    #[serde(rename = ">")]
    Gt,
    /// Less than (<)
    #[serde(rename = "<")]
    Lt,
    /// Greater than or equal (>=)
    #[serde(rename = ">=")]
    Gte,
    /// Less than or equal (<=)
    #[serde(rename = "<=")]
    Lte,
    /// Pattern match
    #[serde(rename = "LIKE")]
    Like,
    /// Membership in a value list
    #[serde(rename = "IN")]
    In,
    /// Inclusive range
    #[serde(rename = "BETWEEN")]
    Between,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Gte => ">=",
            Operator::Lte => "<=",
            Operator::Like => "LIKE",
            Operator::In => "IN",
            Operator::Between => "BETWEEN",
        };
        write!(f, "{}", s)
    }
}

/// Logical operator placed before a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOp {
    #[default]
    And,
    Or,
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOp::And => write!(f, "AND"),
            LogicalOp::Or => write!(f, "OR"),
        }
    }
}

/// The right-hand side of a condition.
///
/// Deserializes from a scalar, an array or a `{low, high}` object. Numbers
/// and booleans are accepted anywhere a string is and kept as their text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Single value
    Scalar(String),
    /// Value list (IN)
    List(Vec<String>),
    /// Inclusive bounds (BETWEEN)
    Range { low: String, high: String },
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Scalar(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        FilterValue::Scalar(s)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(items: Vec<String>) -> Self {
        FilterValue::List(items)
    }
}

/// A string that may have been written as a JSON number or boolean.
struct LooseString(String);

impl<'de> Deserialize<'de> for LooseString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LooseVisitor;

        impl Visitor<'_> for LooseVisitor {
            type Value = LooseString;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string, number or boolean")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<LooseString, E> {
                Ok(LooseString(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<LooseString, E> {
                Ok(LooseString(v))
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<LooseString, E> {
                Ok(LooseString(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<LooseString, E> {
                Ok(LooseString(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<LooseString, E> {
                Ok(LooseString(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<LooseString, E> {
                Ok(LooseString(v.to_string()))
            }
        }

        deserializer.deserialize_any(LooseVisitor)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FilterValueRepr {
    Scalar(LooseString),
    List(Vec<LooseString>),
    Range { low: LooseString, high: LooseString },
}

impl<'de> Deserialize<'de> for FilterValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match FilterValueRepr::deserialize(deserializer)? {
            FilterValueRepr::Scalar(s) => FilterValue::Scalar(s.0),
            FilterValueRepr::List(items) => {
                FilterValue::List(items.into_iter().map(|s| s.0).collect())
            }
            FilterValueRepr::Range { low, high } => FilterValue::Range {
                low: low.0,
                high: high.0,
            },
        })
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Scalar(s) => write!(f, "{}", s),
            FilterValue::List(items) => write!(f, "{}", items.join(", ")),
            FilterValue::Range { low, high } => write!(f, "{} AND {}", low, high),
        }
    }
}

/// A single condition, e.g. `join_date > '2024-01-01'`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterIntent {
    pub field: FieldRef,
    pub operator: Operator,
    pub value: FilterValue,
    /// How this condition combines with the previous one
    #[serde(default)]
    pub logical: LogicalOp,
}

impl FilterIntent {
    /// Create a condition, checking that the value shape fits the operator.
    ///
    /// BETWEEN takes a [`FilterValue::Range`], IN takes a list or a
    /// comma-separated scalar, every other operator takes a scalar.
    pub fn new(
        field: impl Into<FieldRef>,
        operator: Operator,
        value: impl Into<FilterValue>,
    ) -> NlSqlResult<Self> {
        let value = value.into();
        let fits = match (operator, &value) {
            (Operator::Between, FilterValue::Range { .. }) => true,
            (Operator::Between, _) => false,
            (Operator::In, FilterValue::List(_) | FilterValue::Scalar(_)) => true,
            (Operator::In, _) => false,
            (_, FilterValue::Scalar(_)) => true,
            _ => false,
        };
        if !fits {
            return Err(NlSqlError::InvalidIntent(format!(
                "operator {} cannot take value '{}'",
                operator, value
            )));
        }
        Ok(Self {
            field: field.into(),
            operator,
            value,
            logical: LogicalOp::And,
        })
    }

    /// Equality condition.
    pub fn equals(field: impl Into<FieldRef>, value: impl Into<String>) -> Self {
        Self::compare(field, Operator::Eq, value)
    }

    /// Scalar comparison. `IN` and `BETWEEN` should go through [`FilterIntent::one_of`]
    /// and [`FilterIntent::between`].
    pub fn compare(field: impl Into<FieldRef>, operator: Operator, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: FilterValue::Scalar(value.into()),
            logical: LogicalOp::And,
        }
    }

    /// `field IN (values...)`.
    pub fn one_of<I, S>(field: impl Into<FieldRef>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field: field.into(),
            operator: Operator::In,
            value: FilterValue::List(values.into_iter().map(Into::into).collect()),
            logical: LogicalOp::And,
        }
    }

    /// `field BETWEEN low AND high`.
    pub fn between(
        field: impl Into<FieldRef>,
        low: impl Into<String>,
        high: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            operator: Operator::Between,
            value: FilterValue::Range {
                low: low.into(),
                high: high.into(),
            },
            logical: LogicalOp::And,
        }
    }

    /// Combine with the previous condition using OR.
    pub fn or(mut self) -> Self {
        self.logical = LogicalOp::Or;
        self
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "ASC"),
            SortDirection::Desc => write!(f, "DESC"),
        }
    }
}

/// A single ORDER BY term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortIntent {
    pub field: FieldRef,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortIntent {
    pub fn asc(field: impl Into<FieldRef>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<FieldRef>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}
