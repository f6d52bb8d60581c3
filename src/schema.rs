//! Schema registry: the natural-language vocabulary of the logical schema.
//!
//! Loads entity/column alias definitions from JSON or TOML and answers
//! resolution queries. Lookups never fail: anything unknown comes back
//! as `None` or an empty list, and the parser decides what that means.
//!
//! # Example
//! ```
//! use nlsql::schema::SchemaRegistry;
//!
//! let json = r#"{
//!     "entities": {
//!         "members": {
//!             "table": "members_table",
//!             "aliases": ["members", "member"],
//!             "details_bundle": ["id", "email"],
//!             "columns": {
//!                 "id": { "aliases": ["id"] },
//!                 "email": { "aliases": ["email", "e-mail"] }
//!             }
//!         }
//!     }
//! }"#;
//!
//! let registry = SchemaRegistry::from_json_str(json).unwrap();
//! assert_eq!(registry.resolve_entity("list all members"), Some("members"));
//! ```

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{NlSqlError, NlSqlResult};

/// Word starting with a fuzzy "details", tolerant of common misspellings.
static DETAILS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bde(?:tai|ati|tia)\w*").unwrap());

/// Top-level schema document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default)]
    pub entities: IndexMap<String, EntityConfig>,
}

impl SchemaConfig {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity.
    pub fn entity(mut self, name: impl Into<String>, entity: EntityConfig) -> Self {
        self.entities.insert(name.into(), entity);
        self
    }
}

/// One logical entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityConfig {
    /// Physical table; may be missing in a half-written config
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub details_bundle: Vec<String>,
    #[serde(default)]
    pub columns: IndexMap<String, ColumnConfig>,
}

impl EntityConfig {
    /// Entity mapped to the given table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            ..Self::default()
        }
    }

    /// Entity with no table mapping.
    pub fn unmapped() -> Self {
        Self::default()
    }

    pub fn aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn details_bundle(mut self, cols: &[&str]) -> Self {
        self.details_bundle = cols.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn column(mut self, name: impl Into<String>, aliases: &[&str]) -> Self {
        self.columns.insert(
            name.into(),
            ColumnConfig {
                aliases: aliases.iter().map(|a| a.to_string()).collect(),
            },
        );
        self
    }
}

/// One column of an entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnConfig {
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Read-only resolver over a [`SchemaConfig`].
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    config: SchemaConfig,
}

impl SchemaRegistry {
    pub fn new(config: SchemaConfig) -> Self {
        for (entity, data) in &config.entities {
            for col in &data.details_bundle {
                if !data.columns.contains_key(col) {
                    tracing::warn!(
                        "Details bundle of '{}' names undeclared column '{}'",
                        entity,
                        col
                    );
                }
            }
        }
        Self { config }
    }

    /// Parse a JSON schema document.
    pub fn from_json_str(json: &str) -> NlSqlResult<Self> {
        let config: SchemaConfig = serde_json::from_str(json)
            .map_err(|e| NlSqlError::Schema(format!("Failed to parse JSON schema: {}", e)))?;
        Ok(Self::new(config))
    }

    /// Parse a TOML schema document.
    pub fn from_toml_str(input: &str) -> NlSqlResult<Self> {
        let config: SchemaConfig = toml::from_str(input)
            .map_err(|e| NlSqlError::Schema(format!("Failed to parse TOML schema: {}", e)))?;
        Ok(Self::new(config))
    }

    /// Load a schema file. `.toml` files are read as TOML, anything else as JSON.
    pub fn load(path: impl AsRef<Path>) -> NlSqlResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            NlSqlError::Schema(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let registry = if is_toml {
            Self::from_toml_str(&content)?
        } else {
            Self::from_json_str(&content)?
        };

        tracing::info!(
            "Loaded {} entities from {}",
            registry.config.entities.len(),
            path.display()
        );
        Ok(registry)
    }

    /// The underlying document.
    pub fn config(&self) -> &SchemaConfig {
        &self.config
    }

    // ---------- Entity resolution ----------

    /// Entity whose alias is the longest substring of `text`.
    ///
    /// Ties go to the alias seen first in declaration order.
    pub fn resolve_entity(&self, text: &str) -> Option<&str> {
        let text_low = text.to_lowercase();
        longest_alias_match(
            self.config
                .entities
                .iter()
                .map(|(name, entity)| (name.as_str(), entity.aliases.as_slice())),
            &text_low,
        )
    }

    /// All configured entity names, in declaration order.
    pub fn entities(&self) -> Vec<&str> {
        self.config.entities.keys().map(String::as_str).collect()
    }

    pub fn get_table_for_entity(&self, entity: &str) -> Option<&str> {
        self.config
            .entities
            .get(entity)
            .and_then(|e| e.table.as_deref())
    }

    // ---------- Field & bundle resolution ----------

    pub fn bundle_for_entity(&self, entity: &str) -> &[String] {
        self.config
            .entities
            .get(entity)
            .map(|e| e.details_bundle.as_slice())
            .unwrap_or(&[])
    }

    /// Columns mentioned in `text`.
    ///
    /// A "details" token (misspellings included) pulls in the whole bundle
    /// first; then every column with an alias inside the text follows in
    /// declaration order. Duplicates keep their first position.
    pub fn resolve_fields_from_text(&self, entity: &str, text: &str) -> Vec<String> {
        let Some(entity_data) = self.config.entities.get(entity) else {
            return Vec::new();
        };
        let text_low = text.to_lowercase();
        let mut fields: Vec<String> = Vec::new();

        if DETAILS_PATTERN.is_match(&text_low) {
            for col in &entity_data.details_bundle {
                if !fields.contains(col) {
                    fields.push(col.clone());
                }
            }
        }

        for (col_name, col) in &entity_data.columns {
            let mentioned = col
                .aliases
                .iter()
                .any(|alias| text_low.contains(&alias.to_lowercase()));
            if mentioned && !fields.contains(col_name) {
                fields.push(col_name.clone());
            }
        }

        fields
    }

    pub fn field_exists(&self, entity: &str, column: &str) -> bool {
        self.config
            .entities
            .get(entity)
            .is_some_and(|e| e.columns.contains_key(column))
    }

    /// Column aliases of an entity, in declaration order.
    pub fn column_aliases(&self, entity: &str) -> Vec<(&str, &[String])> {
        self.config
            .entities
            .get(entity)
            .map(|e| {
                e.columns
                    .iter()
                    .map(|(name, col)| (name.as_str(), col.aliases.as_slice()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Resolve a short phrase like "join dates" to one column of `entity`,
    /// using the same longest-alias rule as [`SchemaRegistry::resolve_entity`].
    pub fn resolve_field_from_phrase(&self, entity: &str, phrase: &str) -> Option<&str> {
        let entity_data = self.config.entities.get(entity)?;
        let phrase_low = phrase.to_lowercase();
        longest_alias_match(
            entity_data
                .columns
                .iter()
                .map(|(name, col)| (name.as_str(), col.aliases.as_slice())),
            &phrase_low,
        )
    }
}

/// Name whose alias is the longest substring of `haystack` (already lowercased).
fn longest_alias_match<'a>(
    candidates: impl Iterator<Item = (&'a str, &'a [String])>,
    haystack: &str,
) -> Option<&'a str> {
    let mut best: Option<&'a str> = None;
    let mut best_score = 0;

    for (name, aliases) in candidates {
        for alias in aliases {
            let alias_low = alias.to_lowercase();
            let score = alias_low.chars().count();
            if score > best_score && haystack.contains(&alias_low) {
                best_score = score;
                best = Some(name);
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new(
            SchemaConfig::new()
                .entity(
                    "members",
                    EntityConfig::new("members_table")
                        .aliases(&["member", "members", "users"])
                        .details_bundle(&["id", "username", "email"])
                        .column("id", &["id", "member id"])
                        .column("username", &["username", "user name"])
                        .column("email", &["email", "e-mail"])
                        .column("join_date", &["join date", "joined", "signup date"])
                        .column("status", &["status"]),
                )
                .entity(
                    "breached_members",
                    EntityConfig::new("breached_members_table")
                        .aliases(&["breached members", "breaches"])
                        .column("breach_source", &["breach source", "source"]),
                ),
        )
    }

    #[test]
    fn test_resolve_entity_longest_alias() {
        let reg = registry();
        assert_eq!(reg.resolve_entity("list members"), Some("members"));
        assert_eq!(
            reg.resolve_entity("show breached members per source"),
            Some("breached_members")
        );
        assert_eq!(reg.resolve_entity("SHOW ALL USERS"), Some("members"));
        assert_eq!(reg.resolve_entity("orders last week"), None);
    }

    #[test]
    fn test_resolve_entity_tie_goes_to_first_seen() {
        let reg = SchemaRegistry::new(
            SchemaConfig::new()
                .entity("a", EntityConfig::new("a_t").aliases(&["rows"]))
                .entity("b", EntityConfig::new("b_t").aliases(&["rows"])),
        );
        assert_eq!(reg.resolve_entity("all rows"), Some("a"));
    }

    #[test]
    fn test_longest_alias_counts_characters() {
        let reg = SchemaRegistry::new(
            SchemaConfig::new()
                .entity("pinatas", EntityConfig::new("pinatas").aliases(&["piñatas"]))
                .entity(
                    "party_supplies",
                    EntityConfig::new("party_supplies").aliases(&["supplies"]),
                ),
        );
        assert_eq!(
            reg.resolve_entity("piñatas and party supplies"),
            Some("party_supplies")
        );
        assert_eq!(reg.resolve_entity("Piñatas only"), Some("pinatas"));
    }

    #[test]
    fn test_entities_in_declaration_order() {
        assert_eq!(registry().entities(), vec!["members", "breached_members"]);
    }

    #[test]
    fn test_table_and_bundle_lookup() {
        let reg = registry();
        assert_eq!(reg.get_table_for_entity("members"), Some("members_table"));
        assert_eq!(reg.get_table_for_entity("orders"), None);
        assert_eq!(reg.bundle_for_entity("members"), ["id", "username", "email"]);
        assert!(reg.bundle_for_entity("breached_members").is_empty());
        assert!(reg.bundle_for_entity("orders").is_empty());
    }

    #[test]
    fn test_fields_from_details_and_aliases() {
        let reg = registry();
        let fields = reg.resolve_fields_from_text("members", "member deatils and join date");
        assert_eq!(fields, vec!["id", "username", "email", "join_date"]);
    }

    #[test]
    fn test_details_must_start_a_word() {
        let reg = registry();
        // `id` comes from its own alias, not from the bundle
        assert_eq!(
            reg.resolve_fields_from_text("members", "members status ideation"),
            vec!["id", "status"]
        );
        assert_eq!(
            reg.resolve_fields_from_text("members", "member Detials"),
            vec!["id", "username", "email"]
        );
    }

    #[test]
    fn test_fields_deduplicated() {
        let reg = registry();
        let fields = reg.resolve_fields_from_text("members", "details with email and e-mail");
        assert_eq!(fields, vec!["id", "username", "email"]);
    }

    #[test]
    fn test_fields_from_aliases_only() {
        let reg = registry();
        assert_eq!(
            reg.resolve_fields_from_text("members", "STATUS and email of members"),
            vec!["email", "status"]
        );
        assert!(reg.resolve_fields_from_text("members", "top 5").is_empty());
        assert!(reg.resolve_fields_from_text("orders", "details").is_empty());
    }

    #[test]
    fn test_resolve_field_from_phrase() {
        let reg = registry();
        assert_eq!(reg.resolve_field_from_phrase("members", "join dates"), Some("join_date"));
        assert_eq!(reg.resolve_field_from_phrase("members", "Member ID"), Some("id"));
        assert_eq!(reg.resolve_field_from_phrase("members", "colour"), None);
        assert_eq!(reg.resolve_field_from_phrase("orders", "status"), None);
    }

    #[test]
    fn test_field_exists() {
        let reg = registry();
        assert!(reg.field_exists("members", "join_date"));
        assert!(!reg.field_exists("members", "breach_source"));
        assert!(!reg.field_exists("orders", "id"));
    }

    #[test]
    fn test_column_aliases() {
        let reg = registry();
        let aliases = reg.column_aliases("breached_members");
        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases[0].0, "breach_source");
        assert_eq!(aliases[0].1, ["breach source", "source"]);
        assert!(reg.column_aliases("orders").is_empty());
    }

    #[test]
    fn test_json_preserves_declaration_order() {
        let json = r#"{
            "entities": {
                "zebras": { "table": "z", "aliases": ["zebra"] },
                "apples": { "table": "a", "aliases": ["apple"] }
            }
        }"#;
        let reg = SchemaRegistry::from_json_str(json).unwrap();
        assert_eq!(reg.entities(), vec!["zebras", "apples"]);
    }

    #[test]
    fn test_toml_schema() {
        let input = r#"
            [entities.members]
            table = "members_table"
            aliases = ["members"]
            details_bundle = ["id"]

            [entities.members.columns.id]
            aliases = ["id"]
        "#;
        let reg = SchemaRegistry::from_toml_str(input).unwrap();
        assert_eq!(reg.get_table_for_entity("members"), Some("members_table"));
        assert!(reg.field_exists("members", "id"));
    }

    #[test]
    fn test_bad_document_is_schema_error() {
        let err = SchemaRegistry::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, NlSqlError::Schema(_)));
    }
}
