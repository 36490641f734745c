//! Pagination and filtering of list requests.
//!
//! Filters follow the `X-Filter` JSON dialect of the modeled API:
//!
//! ```text
//! {"domain": "example.com"}                     equality
//! {"domain": {"+contains": "example"}}          substring
//! {"+or": [{"type": "master"}, {"tags": "x"}]}  disjunction (also "+and")
//! {"+order_by": "domain", "+order": "desc"}     ordering
//! ```
//!
//! The filter is applied to the full collection; pagination happens afterwards.

use crate::envelope::Page;
use crate::error::{FieldError, MockError};
use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Name under which filter errors are reported.
pub const FILTER_FIELD: &str = "X-Filter";

/// Requested page of a collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number
    pub page: u32,
    /// Items per page, at least 1
    pub page_size: u32,
}

impl PageRequest {
    /// First page of `page_size` items
    #[must_use]
    pub const fn first(page_size: u32) -> Self {
        Self { page: 1, page_size }
    }

    /// Parses the `page` and `page_size` query parameters.
    ///
    /// Missing parameters fall back to page 1 and `default_size`.
    ///
    /// # Errors
    ///
    /// Returns a [`MockError::Validation`] naming every malformed parameter.
    pub fn parse(
        page: Option<&str>,
        page_size: Option<&str>,
        default_size: u32,
        max_size: u32,
    ) -> Result<Self, MockError> {
        let mut errors = Vec::new();

        let page = match page.map(str::parse::<u32>) {
            None => 1,
            Some(Ok(page)) if page >= 1 => page,
            Some(_) => {
                errors.push(FieldError::new("page", "page must be a positive integer"));
                1
            },
        };

        let page_size = match page_size.map(str::parse::<u32>) {
            None => default_size,
            Some(Ok(size)) if (1..=max_size).contains(&size) => size,
            Some(_) => {
                errors.push(FieldError::new(
                    "page_size",
                    format!("page_size must be between 1 and {max_size}"),
                ));
                default_size
            },
        };

        if errors.is_empty() {
            Ok(Self { page, page_size })
        } else {
            Err(MockError::Validation(errors))
        }
    }

    /// Cuts the requested page out of an already filtered collection.
    ///
    /// A page past the end yields empty `data` with unchanged `pages`/`results`.
    #[must_use]
    pub fn paginate<T>(&self, items: Vec<T>) -> Page<T> {
        let results = items.len();
        let size = self.page_size.max(1) as usize;
        let pages = u32::try_from(results.div_ceil(size)).unwrap_or(u32::MAX);
        let skip = (self.page.saturating_sub(1) as usize).saturating_mul(size);

        Page {
            data: items.into_iter().skip(skip).take(size).collect(),
            page: self.page,
            pages,
            results,
        }
    }
}

/// A predicate over a record's JSON form.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    /// Attribute equals the value (or, for array attributes, contains it)
    Eq {
        /// Attribute name
        field: String,
        /// Expected value
        value: Value,
    },
    /// String attribute contains the needle
    Contains {
        /// Attribute name
        field: String,
        /// Substring to look for
        needle: String,
    },
    /// Any clause matches
    Or(Vec<Filter>),
    /// Every clause matches
    And(Vec<Filter>),
}

impl Filter {
    /// Evaluates the predicate
    #[must_use]
    pub fn matches(&self, record: &Value) -> bool {
        match self {
            Self::Eq { field, value } => match record.get(field) {
                Some(Value::Array(items)) if !value.is_array() => items.contains(value),
                Some(actual) => actual == value,
                None => value.is_null(),
            },
            Self::Contains { field, needle } => record
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|s| s.contains(needle.as_str())),
            Self::Or(clauses) => clauses.iter().any(|c| c.matches(record)),
            Self::And(clauses) => clauses.iter().all(|c| c.matches(record)),
        }
    }

    fn parse_object(object: &Map<String, Value>) -> Result<Vec<Self>, MockError> {
        let mut clauses = Vec::new();
        for (key, value) in object {
            match key.as_str() {
                "+order_by" | "+order" => {},
                "+or" | "+and" => {
                    let Value::Array(items) = value else {
                        return Err(filter_error(format!("{key} expects an array")));
                    };
                    let nested = items
                        .iter()
                        .map(|item| match item {
                            Value::Object(inner) => Self::parse_object(inner).map(Self::And),
                            _ => Err(filter_error(format!("{key} expects objects"))),
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    clauses.push(if key == "+or" {
                        Self::Or(nested)
                    } else {
                        Self::And(nested)
                    });
                },
                op if op.starts_with('+') => {
                    return Err(filter_error(format!("unsupported operator {op}")));
                },
                field => clauses.push(Self::parse_condition(field, value)?),
            }
        }
        Ok(clauses)
    }

    fn parse_condition(field: &str, value: &Value) -> Result<Self, MockError> {
        let Value::Object(condition) = value else {
            return Ok(Self::Eq {
                field: field.to_string(),
                value: value.clone(),
            });
        };
        match condition.get("+contains") {
            Some(Value::String(needle)) if condition.len() == 1 => Ok(Self::Contains {
                field: field.to_string(),
                needle: needle.clone(),
            }),
            _ => Err(filter_error(format!("unsupported condition on {field}"))),
        }
    }
}

/// Sort key of a list request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBy {
    /// Attribute to sort on
    pub field: String,
    /// Sort descending
    pub descending: bool,
}

/// Parsed filter and ordering of a list request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListQuery {
    /// Predicate; `None` keeps every record
    pub filter: Option<Filter>,
    /// Ordering; `None` keeps collection order
    pub order: Option<OrderBy>,
}

impl ListQuery {
    /// Keeps records matching `filter`
    #[must_use]
    pub fn filtered(filter: Filter) -> Self {
        Self {
            filter: Some(filter),
            order: None,
        }
    }

    /// Parses an `X-Filter` header value; `None` means no filter.
    ///
    /// # Errors
    ///
    /// Returns a [`MockError::Validation`] on field `X-Filter` for malformed JSON,
    /// unknown operators or a bad `+order`.
    pub fn parse(raw: Option<&str>) -> Result<Self, MockError> {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(Self::default());
        };
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| filter_error(format!("invalid JSON: {e}")))?;
        let Value::Object(object) = value else {
            return Err(filter_error("filter must be a JSON object"));
        };

        let order = match object.get("+order_by") {
            None => None,
            Some(Value::String(field)) => {
                let descending = match object.get("+order").and_then(Value::as_str) {
                    None | Some("asc") => false,
                    Some("desc") => true,
                    Some(other) => {
                        return Err(filter_error(format!("+order must be asc or desc, got {other}")));
                    },
                };
                Some(OrderBy {
                    field: field.clone(),
                    descending,
                })
            },
            Some(_) => return Err(filter_error("+order_by must be a string")),
        };

        let clauses = Filter::parse_object(&object)?;
        let filter = (!clauses.is_empty()).then_some(Filter::And(clauses));

        Ok(Self { filter, order })
    }

    /// Filters then orders `items`, keeping their original order on ties.
    ///
    /// # Errors
    ///
    /// Returns [`MockError::Internal`] if an item does not serialize.
    pub fn apply<T: Serialize>(&self, items: Vec<T>) -> Result<Vec<T>, MockError> {
        if self.filter.is_none() && self.order.is_none() {
            return Ok(items);
        }

        let mut keyed = Vec::with_capacity(items.len());
        for item in items {
            let json = serde_json::to_value(&item)?;
            if self.filter.as_ref().is_none_or(|f| f.matches(&json)) {
                keyed.push((json, item));
            }
        }

        if let Some(order) = &self.order {
            keyed.sort_by(|(a, _), (b, _)| {
                let ordering = compare_values(a.get(&order.field), b.get(&order.field));
                if order.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        Ok(keyed.into_iter().map(|(_, item)| item).collect())
    }
}

fn filter_error(reason: impl Into<String>) -> MockError {
    MockError::invalid(FILTER_FIELD, reason)
}

/// Total order over optional JSON scalars: missing/null < bool < number < string.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.total_cmp(&y)
        },
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn records() -> Vec<Value> {
        vec![
            json!({"id": 1, "domain": "alpha.com", "type": "master", "tags": ["prod"]}),
            json!({"id": 2, "domain": "beta.org", "type": "slave", "tags": []}),
            json!({"id": 3, "domain": "gamma.com", "type": "master", "tags": ["prod", "eu"]}),
        ]
    }

    fn ids(items: &[Value]) -> Vec<u64> {
        items.iter().filter_map(|v| v["id"].as_u64()).collect()
    }

    #[test]
    fn parse_page_defaults() {
        let request = PageRequest::parse(None, None, 25, 500);
        assert_eq!(request, Ok(PageRequest { page: 1, page_size: 25 }));
    }

    #[test]
    fn parse_page_reports_every_bad_param() {
        let Err(MockError::Validation(errors)) = PageRequest::parse(Some("0"), Some("x"), 25, 500)
        else {
            unreachable!("expected validation error");
        };
        let fields: Vec<_> = errors.iter().filter_map(|e| e.field.as_deref()).collect();
        assert_eq!(fields, vec!["page", "page_size"]);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let page = PageRequest { page: 4, page_size: 2 }.paginate(vec![1, 2, 3, 4, 5]);
        assert!(page.data.is_empty());
        assert_eq!(page.pages, 3);
        assert_eq!(page.results, 5);
        assert_eq!(page.page, 4);
    }

    #[test]
    fn empty_collection_has_zero_pages() {
        let page = PageRequest::first(25).paginate(Vec::<u8>::new());
        assert_eq!(page.pages, 0);
        assert_eq!(page.results, 0);
    }

    #[test]
    fn equality_filter_and_array_membership() {
        let query = ListQuery::parse(Some(r#"{"tags": "prod"}"#)).unwrap_or_default();
        let matched = query.apply(records()).unwrap_or_default();
        assert_eq!(ids(&matched), vec![1, 3]);

        let query = ListQuery::parse(Some(r#"{"type": "slave"}"#)).unwrap_or_default();
        assert_eq!(ids(&query.apply(records()).unwrap_or_default()), vec![2]);
    }

    #[test]
    fn contains_or_and_ordering() {
        let query = ListQuery::parse(Some(
            r#"{"+or": [{"domain": {"+contains": "alp"}}, {"type": "slave"}],
                "+order_by": "domain", "+order": "desc"}"#,
        ))
        .unwrap_or_default();
        assert_eq!(ids(&query.apply(records()).unwrap_or_default()), vec![2, 1]);
    }

    #[test]
    fn malformed_filters_are_validation_errors() {
        for raw in [
            "not json",
            "[1, 2]",
            r#"{"+nope": 1}"#,
            r#"{"domain": {"+gt": 3}}"#,
            r#"{"+order_by": "id", "+order": "sideways"}"#,
            r#"{"+or": {"type": "master"}}"#,
        ] {
            let err = ListQuery::parse(Some(raw)).err();
            assert!(
                matches!(&err, Some(MockError::Validation(e)) if e[0].field.as_deref() == Some(FILTER_FIELD)),
                "{raw} should be rejected, got {err:?}"
            );
        }
    }

    proptest! {
        #[test]
        fn pagination_arithmetic(len in 0usize..200, size in 1u32..50, page in 1u32..12) {
            let items: Vec<usize> = (0..len).collect();
            let result = PageRequest { page, page_size: size }.paginate(items);
            let size = size as usize;
            let pages = len.div_ceil(size);

            prop_assert_eq!(result.pages as usize, pages);
            prop_assert_eq!(result.results, len);
            let page = page as usize;
            let expected = if page > pages { 0 } else { size.min(len - (page - 1) * size) };
            prop_assert_eq!(result.data.len(), expected);
            if let Some(first) = result.data.first() {
                prop_assert_eq!(*first, (page - 1) * size);
            }
        }
    }
}
