//! Turns list-endpoint query parameters into SQL predicates.
//!
//! Two inputs are merged: structured parameters (`calories_min=100`) and the
//! free-form `filter` string understood by [`parse_filter`]. Both are checked
//! against a per-entity allowlist, typed, and pushed into a [`QueryBuilder`].

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::{Postgres, QueryBuilder};
use time::Date;

use super::parser::{parse_filter, FilterOp};
use crate::clock::parse_date;
use crate::error::{AppResult, FieldErrors};

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Date,
}

/// A filterable field and the SQL column behind it.
#[derive(Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub column: &'static str,
    pub kind: FieldKind,
}

/// A structured query parameter such as `calories_min`, bound to one field and
/// one comparison.
#[derive(Debug)]
pub struct ParamSpec {
    pub param: &'static str,
    pub field: &'static str,
    pub op: FilterOp,
}

#[derive(Debug)]
pub struct OrderSpec {
    pub name: &'static str,
    pub column: &'static str,
}

/// Everything a list endpoint allows callers to filter and sort on.
#[derive(Debug)]
pub struct EntityFilter {
    pub fields: &'static [FieldSpec],
    pub params: &'static [ParamSpec],
    pub orderings: &'static [OrderSpec],
    /// SQL used when no `ordering` parameter is given.
    pub default_order: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Number(Decimal),
    Date(Date),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: &'static str,
    pub column: &'static str,
    pub op: FilterOp,
    pub value: FilterValue,
}

/// Typed, allowlisted predicates ready to be pushed into SQL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// Raw query string of a list endpoint, split into its reserved keys and the
/// remaining structured filter parameters.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub filter: Option<String>,
    pub ordering: Option<String>,
    pub page: Page,
    pub params: HashMap<String, String>,
}

impl ListQuery {
    pub fn from_params(mut params: HashMap<String, String>) -> AppResult<Self> {
        let mut errors = FieldErrors::new();

        let mut page = Page::default();
        if let Some(raw) = params.remove("limit") {
            match raw.trim().parse::<i64>() {
                Ok(v) if v > 0 => page.limit = v.min(MAX_LIMIT),
                _ => errors.add("limit", "Enter a positive whole number."),
            }
        }
        if let Some(raw) = params.remove("offset") {
            match raw.trim().parse::<i64>() {
                Ok(v) if v >= 0 => page.offset = v,
                _ => errors.add("offset", "Enter a whole number of at least 0."),
            }
        }
        errors.into_result()?;

        Ok(Self {
            filter: params.remove("filter").filter(|s| !s.trim().is_empty()),
            ordering: params.remove("ordering").filter(|s| !s.trim().is_empty()),
            page,
            params,
        })
    }
}

impl EntityFilter {
    fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Merge the free-form filter string with structured parameters.
    /// Structured parameters replace a parsed clause on the same field and
    /// comparison. Unrecognised structured parameters are ignored; unknown
    /// fields inside the filter string are rejected.
    pub fn resolve(&self, query: &ListQuery) -> AppResult<FilterSet> {
        let mut merged: BTreeMap<(&'static str, FilterOp), String> = BTreeMap::new();
        let mut errors = FieldErrors::new();

        if let Some(raw) = &query.filter {
            for (name, predicate) in parse_filter(raw)? {
                match self.field(&name) {
                    Some(spec) => {
                        merged.insert((spec.name, predicate.op), predicate.value);
                    }
                    None => errors.add(&name, "Unknown filter field."),
                }
            }
        }

        for spec in self.params {
            if let Some(value) = query.params.get(spec.param) {
                if !value.trim().is_empty() {
                    merged.insert((spec.field, spec.op), value.trim().to_string());
                }
            }
        }

        let mut conditions = Vec::with_capacity(merged.len());
        for ((name, op), raw) in merged {
            let Some(spec) = self.field(name) else {
                continue;
            };
            match typed_value(spec.kind, &raw) {
                Ok(value) => conditions.push(Condition {
                    field: spec.name,
                    column: spec.column,
                    op,
                    value,
                }),
                Err(message) => errors.add(spec.name, message),
            }
        }
        errors.into_result()?;

        Ok(FilterSet { conditions })
    }

    /// SQL `ORDER BY` body for an `ordering` parameter (`name` or `-name`).
    pub fn order_by(&self, ordering: Option<&str>) -> AppResult<String> {
        let Some(raw) = ordering.map(str::trim) else {
            return Ok(self.default_order.to_string());
        };
        let (name, direction) = match raw.strip_prefix('-') {
            Some(name) => (name, "DESC"),
            None => (raw, "ASC"),
        };
        let spec = self
            .orderings
            .iter()
            .find(|o| o.name == name)
            .ok_or_else(|| {
                FieldErrors::single("ordering", format!("Cannot order by '{name}'."))
            })?;
        Ok(format!("{} {direction}", spec.column))
    }
}

fn typed_value(kind: FieldKind, raw: &str) -> Result<FilterValue, &'static str> {
    match kind {
        FieldKind::Text => Ok(FilterValue::Text(raw.to_string())),
        FieldKind::Number => Decimal::from_str(raw)
            .map(FilterValue::Number)
            .map_err(|_| "Enter a number."),
        FieldKind::Date => parse_date(raw)
            .map(FilterValue::Date)
            .map_err(|_| "Enter a valid date (YYYY-MM-DD)."),
    }
}

/// Escape `%`, `_` and `\` so user text matches literally inside `LIKE`.
fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl FilterSet {
    /// Whether any condition constrains `field`.
    pub fn constrains(&self, field: &str) -> bool {
        self.conditions.iter().any(|c| c.field == field)
    }

    /// Append every condition as ` AND <predicate>`.
    pub fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        for c in &self.conditions {
            qb.push(" AND ");
            match (&c.value, c.op) {
                (FilterValue::Text(text), FilterOp::Contains) => {
                    qb.push(c.column)
                        .push(" ILIKE '%' || ")
                        .push_bind(escape_like(text))
                        .push(" || '%'");
                }
                (FilterValue::Text(text), FilterOp::Eq) => {
                    qb.push("lower(")
                        .push(c.column)
                        .push(") = lower(")
                        .push_bind(text.clone())
                        .push(")");
                }
                (value, op) => {
                    qb.push(c.column).push(sql_operator(op));
                    match value {
                        FilterValue::Text(text) => qb.push_bind(text.clone()),
                        FilterValue::Number(n) => qb.push_bind(*n),
                        FilterValue::Date(d) => qb.push_bind(*d),
                    };
                }
            }
        }
    }
}

fn sql_operator(op: FilterOp) -> &'static str {
    match op {
        FilterOp::Contains | FilterOp::Eq => " = ",
        FilterOp::Gte => " >= ",
        FilterOp::Lte => " <= ",
        FilterOp::Gt => " > ",
        FilterOp::Lt => " < ",
    }
}

impl Page {
    pub fn push(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" LIMIT ")
            .push_bind(self.limit)
            .push(" OFFSET ")
            .push_bind(self.offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::filters::FilterError;
    use rust_decimal_macros::dec;
    use time::macros::date;

    const FIELDS: &[FieldSpec] = &[
        FieldSpec {
            name: "name",
            column: "f.name",
            kind: FieldKind::Text,
        },
        FieldSpec {
            name: "calories",
            column: "f.calories",
            kind: FieldKind::Number,
        },
        FieldSpec {
            name: "date",
            column: "i.entry_date",
            kind: FieldKind::Date,
        },
    ];

    const SAMPLE: EntityFilter = EntityFilter {
        fields: FIELDS,
        params: &[
            ParamSpec {
                param: "calories_min",
                field: "calories",
                op: FilterOp::Gte,
            },
            ParamSpec {
                param: "calories_max",
                field: "calories",
                op: FilterOp::Lte,
            },
            ParamSpec {
                param: "name",
                field: "name",
                op: FilterOp::Contains,
            },
        ],
        orderings: &[OrderSpec {
            name: "calories",
            column: "f.calories",
        }],
        default_order: "f.name ASC",
    };

    fn query(pairs: &[(&str, &str)]) -> ListQuery {
        let params = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ListQuery::from_params(params).unwrap()
    }

    fn condition(set: &FilterSet, field: &str, op: FilterOp) -> Option<FilterValue> {
        set.conditions
            .iter()
            .find(|c| c.field == field && c.op == op)
            .map(|c| c.value.clone())
    }

    #[test]
    fn filter_string_becomes_typed_conditions() {
        let set = SAMPLE
            .resolve(&query(&[("filter", "calories>=100,name:chicken")]))
            .unwrap();
        assert_eq!(
            condition(&set, "calories", FilterOp::Gte),
            Some(FilterValue::Number(dec!(100)))
        );
        assert_eq!(
            condition(&set, "name", FilterOp::Contains),
            Some(FilterValue::Text("chicken".into()))
        );
    }

    #[test]
    fn structured_params_win_on_collision() {
        let set = SAMPLE
            .resolve(&query(&[("filter", "calories>=100"), ("calories_min", "250")]))
            .unwrap();
        assert_eq!(set.conditions.len(), 1);
        assert_eq!(
            condition(&set, "calories", FilterOp::Gte),
            Some(FilterValue::Number(dec!(250)))
        );
    }

    #[test]
    fn distinct_comparisons_on_one_field_coexist() {
        let set = SAMPLE
            .resolve(&query(&[("filter", "calories<=500"), ("calories_min", "100")]))
            .unwrap();
        assert_eq!(set.conditions.len(), 2);
        assert!(set.constrains("calories"));
        assert!(!set.constrains("date"));
    }

    #[test]
    fn unknown_filter_field_is_named() {
        let err = SAMPLE
            .resolve(&query(&[("filter", "colour:red")]))
            .unwrap_err();
        match err {
            AppError::Validation(fields) => assert!(fields.get("colour").is_some()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unrecognised_params_and_blank_values_are_ignored() {
        let set = SAMPLE
            .resolve(&query(&[("page", "2"), ("calories_max", "  ")]))
            .unwrap();
        assert!(set.conditions.is_empty());
    }

    #[test]
    fn malformed_clause_surfaces_as_filter_error() {
        let err = SAMPLE
            .resolve(&query(&[("filter", "bogus_clause")]))
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Filter(FilterError::MalformedClause(ref c)) if c == "bogus_clause"
        ));
    }

    #[test]
    fn values_are_typed_per_field() {
        let set = SAMPLE
            .resolve(&query(&[("filter", "date<2024-03-01")]))
            .unwrap();
        assert_eq!(
            condition(&set, "date", FilterOp::Lt),
            Some(FilterValue::Date(date!(2024 - 03 - 01)))
        );

        let err = SAMPLE
            .resolve(&query(&[("filter", "calories>lots,date=2023-02-30")]))
            .unwrap_err();
        match err {
            AppError::Validation(fields) => {
                assert!(fields.get("calories").is_some());
                assert!(fields.get("date").is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn pushes_sql_with_binds() {
        let set = SAMPLE
            .resolve(&query(&[("filter", "name:50%_off,calories>10,date=2024-01-01")]))
            .unwrap();
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM foods f WHERE TRUE");
        set.push_conditions(&mut qb);
        Page::default().push(&mut qb);

        let sql = qb.sql();
        assert!(sql.contains("f.name ILIKE '%' || $"));
        assert!(sql.contains("f.calories > $"));
        assert!(sql.contains("i.entry_date = $"));
        assert!(sql.ends_with("LIMIT $4 OFFSET $5"));
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("chicken"), "chicken");
    }

    #[test]
    fn ordering_is_allowlisted() {
        assert_eq!(SAMPLE.order_by(None).unwrap(), "f.name ASC");
        assert_eq!(SAMPLE.order_by(Some("calories")).unwrap(), "f.calories ASC");
        assert_eq!(SAMPLE.order_by(Some("-calories")).unwrap(), "f.calories DESC");
        assert!(SAMPLE.order_by(Some("password_hash")).is_err());
    }

    #[test]
    fn pagination_is_parsed_and_capped() {
        let q = query(&[("limit", "500"), ("offset", "40"), ("calories_min", "1")]);
        assert_eq!(q.page, Page { limit: MAX_LIMIT, offset: 40 });
        assert!(q.params.contains_key("calories_min"));
        assert!(!q.params.contains_key("limit"));

        let params = [("limit".to_string(), "-1".to_string())].into_iter().collect();
        assert!(ListQuery::from_params(params).is_err());
    }
}
