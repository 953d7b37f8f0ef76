use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;

use super::RESERVED_KEYS;

/// Comparison operators accepted in query-string filters.
///
/// Bracket notation (`price[gte]=100`) is parsed once into this tagged form;
/// there is no string rewriting of operator names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equals,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
}

impl Comparison {
    /// Map a bracketed operator name to its tagged form.
    ///
    /// Only `gte`, `gt`, `lte` and `lt` are recognized; anything else is not
    /// an operator and the full bracketed key is treated as a literal field
    /// name by the caller.
    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "gte" => Some(Comparison::GreaterOrEqual),
            "gt" => Some(Comparison::GreaterThan),
            "lte" => Some(Comparison::LessOrEqual),
            "lt" => Some(Comparison::LessThan),
            _ => None,
        }
    }
}

/// A single field condition
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub comparison: Comparison,
    pub value: Value,
}

impl Predicate {
    pub fn new(field: impl Into<String>, comparison: Comparison, value: Value) -> Self {
        Self {
            field: field.into(),
            comparison,
            value,
        }
    }

    /// Whether a document satisfies this predicate.
    ///
    /// A missing field fails every comparison, except equality against null
    /// (null matches a missing field, as in the store's filter semantics).
    pub fn matches(&self, document: &Value) -> bool {
        let field_value = lookup_path(document, &self.field);

        let Some(actual) = field_value else {
            return self.comparison == Comparison::Equals && self.value.is_null();
        };

        let Some(ordering) = compare_values(actual, &self.value) else {
            return false;
        };

        match self.comparison {
            Comparison::Equals => ordering == Ordering::Equal,
            Comparison::GreaterThan => ordering == Ordering::Greater,
            Comparison::GreaterOrEqual => ordering != Ordering::Less,
            Comparison::LessThan => ordering == Ordering::Less,
            Comparison::LessOrEqual => ordering != Ordering::Greater,
        }
    }
}

/// An AND-combined list of predicates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-predicate equality filter
    pub fn equals(field: impl Into<String>, value: Value) -> Self {
        Self::new().with(field, Comparison::Equals, value)
    }

    pub fn with(mut self, field: impl Into<String>, comparison: Comparison, value: Value) -> Self {
        self.predicates.push(Predicate::new(field, comparison, value));
        self
    }

    /// Combine two filters into a new AND filter
    pub fn and(&self, other: &Filter) -> Filter {
        let mut predicates = self.predicates.clone();
        predicates.extend(other.predicates.iter().cloned());
        Filter { predicates }
    }

    /// Parse filter predicates from a query-string map.
    ///
    /// Reserved pipeline keys (`page`, `sort`, `limit`, `fields`) are
    /// skipped. `field[op]=value` becomes a comparison predicate when `op`
    /// is on the allow-list; an unknown bracketed key passes through as a
    /// literal field name. The request map is not modified.
    pub fn from_request(request: &HashMap<String, String>) -> Filter {
        let mut keys: Vec<&String> = request
            .keys()
            .filter(|key| !RESERVED_KEYS.contains(&key.as_str()))
            .collect();
        // HashMap iteration order is arbitrary; keep predicates stable
        keys.sort_unstable();

        let mut filter = Filter::new();
        for key in keys {
            let value = Value::String(request[key].clone());
            match split_bracket(key) {
                Some((field, suffix)) => match Comparison::from_suffix(suffix) {
                    Some(comparison) => {
                        filter.predicates.push(Predicate::new(field, comparison, value));
                    }
                    // Documented limitation: unknown operators are literal field names
                    None => {
                        filter
                            .predicates
                            .push(Predicate::new(key.as_str(), Comparison::Equals, value));
                    }
                },
                None => {
                    filter
                        .predicates
                        .push(Predicate::new(key.as_str(), Comparison::Equals, value));
                }
            }
        }
        filter
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Whether a document satisfies every predicate (empty filter matches all)
    pub fn matches(&self, document: &Value) -> bool {
        self.predicates.iter().all(|p| p.matches(document))
    }
}

/// Split `price[gte]` into `("price", "gte")`
fn split_bracket(key: &str) -> Option<(&str, &str)> {
    let open = key.find('[')?;
    let rest = &key[open + 1..];
    let close = rest.find(']')?;
    if open == 0 || close + 1 != rest.len() {
        return None;
    }
    Some((&key[..open], &rest[..close]))
}

/// Compare a document value against a query value.
///
/// Query-string values arrive as strings, so a numeric document value is
/// compared against the parsed number. Two strings that both parse as
/// numbers compare numerically, otherwise lexicographically. Booleans and
/// null only support equality. Mismatched types are incomparable.
pub fn compare_values(actual: &Value, target: &Value) -> Option<Ordering> {
    match (actual, target) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::Number(a), Value::String(b)) => {
            a.as_f64()?.partial_cmp(&b.parse::<f64>().ok()?)
        }
        (Value::String(a), Value::Number(b)) => {
            a.parse::<f64>().ok()?.partial_cmp(&b.as_f64()?)
        }
        (Value::String(a), Value::String(b)) => {
            if let (Ok(x), Ok(y)) = (a.parse::<f64>(), b.parse::<f64>()) {
                x.partial_cmp(&y)
            } else {
                Some(a.cmp(b))
            }
        }
        (Value::Bool(a), Value::Bool(b)) => (a == b).then_some(Ordering::Equal),
        (Value::Bool(a), Value::String(b)) => {
            (a.to_string() == *b).then_some(Ordering::Equal)
        }
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Resolve a possibly dotted field path against a document
fn lookup_path<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = document;
    for part in path.split('.') {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_bracket_operators_translate() {
        let filter = Filter::from_request(&request(&[
            ("price[gte]", "100"),
            ("duration[lt]", "10"),
        ]));

        let preds = filter.predicates();
        assert_eq!(preds.len(), 2);
        assert_eq!(preds[1].field, "price");
        assert_eq!(preds[1].comparison, Comparison::GreaterOrEqual);
        assert_eq!(preds[0].field, "duration");
        assert_eq!(preds[0].comparison, Comparison::LessThan);
    }

    #[test]
    fn test_plain_key_is_equality() {
        let filter = Filter::from_request(&request(&[("difficulty", "easy")]));
        let preds = filter.predicates();
        assert_eq!(preds[0].field, "difficulty");
        assert_eq!(preds[0].comparison, Comparison::Equals);
        assert_eq!(preds[0].value, json!("easy"));
    }

    #[test]
    fn test_reserved_keys_are_stripped() {
        let filter = Filter::from_request(&request(&[
            ("page", "2"),
            ("sort", "-price"),
            ("limit", "10"),
            ("fields", "name"),
            ("difficulty", "easy"),
        ]));
        assert_eq!(filter.predicates().len(), 1);
        assert_eq!(filter.predicates()[0].field, "difficulty");
    }

    #[test]
    fn test_unknown_bracket_operator_is_literal_field() {
        let filter = Filter::from_request(&request(&[("price[regex]", "10")]));
        let preds = filter.predicates();
        assert_eq!(preds[0].field, "price[regex]");
        assert_eq!(preds[0].comparison, Comparison::Equals);
    }

    #[test]
    fn test_gte_matches_boundary() {
        let doc = json!({"price": 100});
        let gte = Predicate::new("price", Comparison::GreaterOrEqual, json!("100"));
        let gt = Predicate::new("price", Comparison::GreaterThan, json!("100"));
        let lte = Predicate::new("price", Comparison::LessOrEqual, json!("100"));
        let lt = Predicate::new("price", Comparison::LessThan, json!("100"));

        assert!(gte.matches(&doc));
        assert!(!gt.matches(&doc));
        assert!(lte.matches(&doc));
        assert!(!lt.matches(&doc));
    }

    #[test]
    fn test_numeric_comparison_from_string_value() {
        let doc = json!({"price": 397.5});
        assert!(Predicate::new("price", Comparison::GreaterThan, json!("100")).matches(&doc));
        assert!(Predicate::new("price", Comparison::LessThan, json!("400")).matches(&doc));
    }

    #[test]
    fn test_equality_on_strings_and_bools() {
        let doc = json!({"difficulty": "easy", "secretTour": false});
        assert!(Predicate::new("difficulty", Comparison::Equals, json!("easy")).matches(&doc));
        assert!(!Predicate::new("difficulty", Comparison::Equals, json!("medium")).matches(&doc));
        assert!(Predicate::new("secretTour", Comparison::Equals, json!(false)).matches(&doc));
        assert!(!Predicate::new("secretTour", Comparison::Equals, json!(true)).matches(&doc));
    }

    #[test]
    fn test_missing_field_fails_unless_null_equality() {
        let doc = json!({"name": "Sea Explorer"});
        assert!(!Predicate::new("price", Comparison::GreaterThan, json!("1")).matches(&doc));
        assert!(!Predicate::new("price", Comparison::Equals, json!("1")).matches(&doc));
        assert!(Predicate::new("price", Comparison::Equals, Value::Null).matches(&doc));
    }

    #[test]
    fn test_dotted_path_lookup() {
        let doc = json!({"startLocation": {"address": "Miami"}});
        assert!(
            Predicate::new("startLocation.address", Comparison::Equals, json!("Miami"))
                .matches(&doc)
        );
    }

    #[test]
    fn test_filter_and_combines() {
        let base = Filter::equals("secretTour", json!(false));
        let combined = base.and(&Filter::equals("difficulty", json!("easy")));

        assert_eq!(combined.predicates().len(), 2);
        assert!(combined.matches(&json!({"secretTour": false, "difficulty": "easy"})));
        assert!(!combined.matches(&json!({"secretTour": true, "difficulty": "easy"})));
    }

    #[test]
    fn test_split_bracket() {
        assert_eq!(split_bracket("price[gte]"), Some(("price", "gte")));
        assert_eq!(split_bracket("price"), None);
        assert_eq!(split_bracket("[gte]"), None);
        assert_eq!(split_bracket("price[gte]x"), None);
    }
}
