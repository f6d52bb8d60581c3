//! # nlsql: plain-English data requests in, reviewable SQL out
//!
//! nlsql turns a request like "top 10 members joined after 2023-01-01" into a
//! structured [`QueryIntent`](intent::QueryIntent) and then into one SQL
//! `SELECT`. Vocabulary (entities, tables, column aliases) comes from a
//! schema document; the parser itself is a fixed battery of pattern rules.
//!
//! ## Quick Example
//!
//! ```
//! use nlsql::prelude::*;
//!
//! let registry = SchemaRegistry::new(
//!     SchemaConfig::new().entity(
//!         "members",
//!         EntityConfig::new("members_table")
//!             .aliases(&["members"])
//!             .details_bundle(&["id", "username"])
//!             .column("id", &["id"])
//!             .column("username", &["username"]),
//!     ),
//! );
//!
//! let sql = nlsql::translate("top 5 members", &registry).unwrap();
//! assert_eq!(sql, "SELECT \"id\", \"username\"\nFROM \"members_table\"\nLIMIT 5;");
//! ```
//!
//! ## Pipeline
//!
//! | Stage      | Input        | Output        |
//! |------------|--------------|---------------|
//! | `schema`   | JSON / TOML  | registry      |
//! | `parser`   | request text | `QueryIntent` |
//! | `transpiler` | `QueryIntent` | SQL text   |

pub mod config;
pub mod error;
pub mod intent;
pub mod parser;
pub mod schema;
pub mod transpiler;

pub mod prelude {
    pub use crate::config::{OutputFormat, Settings};
    pub use crate::error::*;
    pub use crate::intent::*;
    pub use crate::parser::{parse_nl_to_intent, NlParser};
    pub use crate::schema::{ColumnConfig, EntityConfig, SchemaConfig, SchemaRegistry};
    pub use crate::transpiler::{build_sql, ToSql};
}

/// Parse a request and render it as SQL.
///
/// # Example
///
/// ```
/// use nlsql::schema::SchemaRegistry;
///
/// let registry = SchemaRegistry::from_json_str(
///     r#"{"entities": {"members": {"table": "members_table", "aliases": ["members"]}}}"#,
/// ).unwrap();
/// let sql = nlsql::translate("members", &registry).unwrap();
/// assert_eq!(sql, "SELECT *\nFROM \"members_table\";");
/// ```
pub fn translate(request: &str, registry: &schema::SchemaRegistry) -> error::NlSqlResult<String> {
    let intent = parser::parse_nl_to_intent(request, registry)?;
    transpiler::build_sql(&intent, registry)
}
