use std::collections::BTreeMap;

use serde::Serialize;

/// Comparison carried by one filter clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Contains,
    Gte,
    Lte,
    Gt,
    Lt,
    Eq,
}

/// Operators in the order they are tried. The two-character comparisons come
/// before `>`, `<` and `=` so `calories>=100` is never read as `calories>` `=100`.
const OPERATORS: [(&str, FilterOp); 6] = [
    (":", FilterOp::Contains),
    (">=", FilterOp::Gte),
    ("<=", FilterOp::Lte),
    (">", FilterOp::Gt),
    ("<", FilterOp::Lt),
    ("=", FilterOp::Eq),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Predicate {
    pub op: FilterOp,
    pub value: String,
}

/// Parsed filter, one predicate per field.
pub type FilterMap = BTreeMap<String, Predicate>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("malformed filter clause '{0}'")]
    MalformedClause(String),
}

/// Parse a comma-separated filter string such as `calories>=100,name:chicken`.
///
/// Syntax only: field names are not checked against any entity. A later clause
/// for the same field replaces an earlier one. The first malformed clause
/// rejects the whole string.
pub fn parse_filter(input: &str) -> Result<FilterMap, FilterError> {
    let mut filters = FilterMap::new();
    for clause in input.split(',').map(str::trim) {
        if clause.is_empty() {
            continue;
        }
        let (field, predicate) = parse_clause(clause)?;
        filters.insert(field, predicate);
    }
    Ok(filters)
}

fn parse_clause(clause: &str) -> Result<(String, Predicate), FilterError> {
    let malformed = || FilterError::MalformedClause(clause.to_string());

    let (token, op) = OPERATORS
        .iter()
        .find(|(token, _)| clause.contains(token))
        .ok_or_else(malformed)?;
    let (field, value) = clause.split_once(token).ok_or_else(malformed)?;
    let (field, value) = (field.trim(), value.trim());
    if field.is_empty() || value.is_empty() {
        return Err(malformed());
    }

    Ok((
        field.to_string(),
        Predicate {
            op: *op,
            value: value.to_string(),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pred(op: FilterOp, value: &str) -> Predicate {
        Predicate {
            op,
            value: value.to_string(),
        }
    }

    #[test]
    fn parses_mixed_clauses() {
        let parsed = parse_filter("calories>=100,name:chicken").unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["calories"], pred(FilterOp::Gte, "100"));
        assert_eq!(parsed["name"], pred(FilterOp::Contains, "chicken"));
    }

    #[test]
    fn two_char_operators_win_over_single() {
        let parsed = parse_filter("calories>=100").unwrap();
        assert_eq!(parsed["calories"], pred(FilterOp::Gte, "100"));
        assert_ne!(parsed["calories"], pred(FilterOp::Gt, "=100"));

        let parsed = parse_filter("fat<=5").unwrap();
        assert_eq!(parsed["fat"], pred(FilterOp::Lte, "5"));
    }

    #[test]
    fn every_operator_is_recognised() {
        let parsed = parse_filter("a:x,b>=1,c<=2,d>3,e<4,f=5").unwrap();
        assert_eq!(parsed["a"].op, FilterOp::Contains);
        assert_eq!(parsed["b"].op, FilterOp::Gte);
        assert_eq!(parsed["c"].op, FilterOp::Lte);
        assert_eq!(parsed["d"].op, FilterOp::Gt);
        assert_eq!(parsed["e"].op, FilterOp::Lt);
        assert_eq!(parsed["f"], pred(FilterOp::Eq, "5"));
    }

    #[test]
    fn colon_is_tried_first() {
        let parsed = parse_filter("name:a>=b").unwrap();
        assert_eq!(parsed["name"], pred(FilterOp::Contains, "a>=b"));
    }

    #[test]
    fn last_clause_for_a_field_wins() {
        let parsed = parse_filter("calories>100,calories<500").unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed["calories"], pred(FilterOp::Lt, "500"));
    }

    #[test]
    fn clause_order_is_otherwise_irrelevant() {
        let a = parse_filter("protein>10,name:egg").unwrap();
        let b = parse_filter("name:egg,protein>10").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn whitespace_and_empty_clauses_are_tolerated() {
        let parsed = parse_filter(" date >= 2024-01-01 , ,weight<90,").unwrap();
        assert_eq!(parsed["date"], pred(FilterOp::Gte, "2024-01-01"));
        assert_eq!(parsed["weight"], pred(FilterOp::Lt, "90"));
        assert!(parse_filter("").unwrap().is_empty());
    }

    #[test]
    fn unknown_fields_pass_through() {
        let parsed = parse_filter("colour:red").unwrap();
        assert_eq!(parsed["colour"], pred(FilterOp::Contains, "red"));
    }

    #[test]
    fn clause_without_operator_is_rejected() {
        let err = parse_filter("bogus_clause").unwrap_err();
        assert_eq!(err, FilterError::MalformedClause("bogus_clause".into()));
        assert!(err.to_string().contains("bogus_clause"));
    }

    #[test]
    fn first_bad_clause_rejects_everything() {
        let err = parse_filter("calories>=100,oops,name:egg").unwrap_err();
        assert_eq!(err, FilterError::MalformedClause("oops".into()));
    }

    #[test]
    fn missing_field_or_value_is_rejected() {
        assert!(parse_filter(">=100").is_err());
        assert!(parse_filter("calories>=").is_err());
        assert!(parse_filter("name:").is_err());
    }
}
