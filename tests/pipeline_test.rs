//! End-to-end tests: request text through the parser and SQL builder.

use std::io::Write;
use std::path::PathBuf;

use nlsql::prelude::*;
use pretty_assertions::assert_eq;

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/members_schema.json")
}

fn registry() -> SchemaRegistry {
    SchemaRegistry::load(fixture_path()).unwrap()
}

#[test]
fn test_top_n_uses_details_bundle() {
    let sql = nlsql::translate("top 5 members", &registry()).unwrap();
    assert_eq!(
        sql,
        "SELECT \"id\", \"username\", \"email\"\nFROM \"members_table\"\nLIMIT 5;"
    );
}

#[test]
fn test_where_and_join_date() {
    let sql = nlsql::translate(
        "member details where status is active joined after 2023-01-01",
        &registry(),
    )
    .unwrap();
    assert_eq!(
        sql,
        "SELECT \"id\", \"username\", \"email\", \"status\"\n\
         FROM \"members_table\"\n\
         WHERE \"status\" = 'active' AND \"join_date\" > '2023-01-01';"
    );
}

#[test]
fn test_in_list() {
    let sql = nlsql::translate("members with status in active, pending", &registry()).unwrap();
    assert_eq!(
        sql,
        "SELECT \"status\"\nFROM \"members_table\"\nWHERE \"status\" IN ('active', 'pending');"
    );
}

#[test]
fn test_group_having_and_order() {
    let sql = nlsql::translate(
        "count of members per breach source, having count > 2, order by breach source desc",
        &registry(),
    )
    .unwrap();
    assert_eq!(
        sql,
        "SELECT \"breach_source\"\n\
         FROM \"members_table\"\n\
         GROUP BY \"breach_source\"\n\
         HAVING COUNT(*) > '2'\n\
         ORDER BY \"breach_source\" DESC;"
    );
}

#[test]
fn test_distinct_with_sorted_by() {
    let sql = nlsql::translate(
        "unique member emails sorted by join date in descending order",
        &registry(),
    )
    .unwrap();
    assert_eq!(
        sql,
        "SELECT DISTINCT \"email\", \"join_date\"\n\
         FROM \"members_table\"\n\
         ORDER BY \"join_date\" DESC;"
    );
}

#[test]
fn test_darknet_forum_phrase() {
    let sql = nlsql::translate("members from the darknet forum", &registry()).unwrap();
    assert_eq!(
        sql,
        "SELECT \"id\", \"username\", \"email\"\n\
         FROM \"members_table\"\n\
         WHERE \"breach_source\" = 'darknet_forum';"
    );
}

#[test]
fn test_quote_in_value_is_escaped() {
    let sql = nlsql::translate("members where username is O'Brien", &registry()).unwrap();
    assert_eq!(
        sql,
        "SELECT \"username\"\nFROM \"members_table\"\nWHERE \"username\" = 'o''brien';"
    );
}

#[test]
fn test_details_inside_another_word_is_ignored() {
    let sql = nlsql::translate("members status ideation", &registry()).unwrap();
    assert_eq!(sql, "SELECT \"status\"\nFROM \"members_table\";");
}

#[test]
fn test_unstructured_request_has_no_clauses() {
    let sql = nlsql::translate("members please", &registry()).unwrap();
    assert!(!sql.contains("WHERE"));
    assert!(!sql.contains("ORDER BY"));
    assert!(!sql.contains("LIMIT"));
    assert!(sql.starts_with("SELECT \"id\", \"username\", \"email\""));
}

#[test]
fn test_unknown_entity_is_rejected() {
    let err = nlsql::translate("show me everything", &registry()).unwrap_err();
    assert!(matches!(err, NlSqlError::AmbiguousOrUnknownRequest));
    assert!(err.is_request_error());
}

#[test]
fn test_entity_without_table() {
    let err = nlsql::translate("everything in the archive", &registry()).unwrap_err();
    assert!(matches!(err, NlSqlError::MissingSchemaMapping { ref entity } if entity == "archive"));
}

#[test]
fn test_hand_written_intent() {
    let json = r#"{
        "entity": "orders",
        "fields": ["order_id", "__count__", "expr:SUM(total)"],
        "filters": [
            { "field": "total", "operator": ">=", "value": "100" },
            {
                "field": "placed_at",
                "operator": "BETWEEN",
                "value": { "low": "2024-01-01", "high": "2024-06-30" },
                "logical": "OR"
            }
        ],
        "sort": [{ "field": "order_id", "direction": "desc" }],
        "limit": 3
    }"#;
    let intent: QueryIntent = serde_json::from_str(json).unwrap();
    assert_eq!(
        build_sql(&intent, &registry()).unwrap(),
        "SELECT \"order_id\", COUNT(*), SUM(total)\n\
         FROM \"orders_table\"\n\
         WHERE \"total\" >= '100' OR \"placed_at\" BETWEEN '2024-01-01' AND '2024-06-30'\n\
         ORDER BY \"order_id\" DESC\n\
         LIMIT 3;"
    );
}

#[test]
fn test_parsed_intent_survives_json() {
    let reg = registry();
    let intent = parse_nl_to_intent(
        "top 3 members per breach source, having count >= 2",
        &reg,
    )
    .unwrap();
    let json = serde_json::to_string(&intent).unwrap();
    let back: QueryIntent = serde_json::from_str(&json).unwrap();
    assert_eq!(back, intent);
    assert!(json.contains("\"__count__\""));
    assert_eq!(build_sql(&back, &reg).unwrap(), build_sql(&intent, &reg).unwrap());
}

#[test]
fn test_toml_schema_file_with_single_entity() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    write!(
        file,
        r#"
[entities.tickets]
table = "support_tickets"
aliases = ["tickets"]
details_bundle = ["ticket_id", "subject"]

[entities.tickets.columns.ticket_id]
aliases = ["ticket id"]

[entities.tickets.columns.subject]
aliases = ["subject"]
"#
    )
    .unwrap();

    let reg = SchemaRegistry::load(file.path()).unwrap();
    // No alias in the text: the only entity is assumed
    let sql = nlsql::translate("show me the top 3", &reg).unwrap();
    assert_eq!(
        sql,
        "SELECT \"ticket_id\", \"subject\"\nFROM \"support_tickets\"\nLIMIT 3;"
    );
}

#[test]
fn test_missing_schema_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = SchemaRegistry::load(dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, NlSqlError::Schema(_)));
}
