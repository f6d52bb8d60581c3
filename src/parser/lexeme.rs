//! Small nom grammars for fragments the rules capture with regexes.

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while},
    character::complete::{char, multispace0},
    combinator::{all_consuming, value},
    multi::separated_list0,
    sequence::delimited,
    IResult,
};

use crate::intent::Operator;

/// Parse a comparison operator symbol or keyword.
pub fn comparison_operator(input: &str) -> IResult<&str, Operator> {
    alt((
        value(Operator::Ne, tag("!=")),
        value(Operator::Ne, tag("<>")),
        value(Operator::Gte, tag(">=")),
        value(Operator::Lte, tag("<=")),
        value(Operator::Gt, char('>')),
        value(Operator::Lt, char('<')),
        value(Operator::Eq, char('=')),
        value(Operator::Like, tag_no_case("like")),
        value(Operator::In, tag_no_case("in")),
        value(Operator::Between, tag_no_case("between")),
    ))(input)
}

/// Parse a whole string as one operator, surrounding whitespace allowed.
pub fn parse_operator(input: &str) -> Option<Operator> {
    all_consuming(delimited(multispace0, comparison_operator, multispace0))(input)
        .ok()
        .map(|(_, op)| op)
}

/// Split a comma-separated value list.
///
/// Each item is trimmed of whitespace, quotes and periods; empty items are
/// dropped.
pub fn value_list(input: &str) -> Vec<String> {
    let parsed: IResult<&str, Vec<&str>> =
        separated_list0(char(','), take_while(|c: char| c != ','))(input);

    match parsed {
        Ok((_, items)) => items
            .into_iter()
            .map(|item| item.trim_matches(|c: char| c.is_whitespace() || matches!(c, '\'' | '"' | '.')))
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_symbols() {
        assert_eq!(parse_operator(">="), Some(Operator::Gte));
        assert_eq!(parse_operator(" < "), Some(Operator::Lt));
        assert_eq!(parse_operator("!="), Some(Operator::Ne));
        assert_eq!(parse_operator("<>"), Some(Operator::Ne));
        assert_eq!(parse_operator("="), Some(Operator::Eq));
    }

    #[test]
    fn test_operator_keywords() {
        assert_eq!(parse_operator("LIKE"), Some(Operator::Like));
        assert_eq!(parse_operator("between"), Some(Operator::Between));
        assert_eq!(parse_operator("In"), Some(Operator::In));
    }

    #[test]
    fn test_operator_rejects_trailing_input() {
        assert_eq!(parse_operator("=>"), None);
        assert_eq!(parse_operator("is"), None);
        assert_eq!(parse_operator(""), None);
    }

    #[test]
    fn test_value_list_trims_and_drops_empty() {
        assert_eq!(
            value_list(" 'active', \"pending\" ,, blocked. "),
            vec!["active", "pending", "blocked"]
        );
    }

    #[test]
    fn test_value_list_single_and_empty() {
        assert_eq!(value_list("gold"), vec!["gold"]);
        assert!(value_list("").is_empty());
        assert!(value_list(" , ,").is_empty());
    }
}
