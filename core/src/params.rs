//! Typed query parameters.
//!
//! Keys are kept sorted so the rendered query string is reproducible. List
//! values expand to repeated `key[]=item` pairs in the order they were given.

use std::collections::BTreeMap;

use url::form_urlencoded;

use crate::error::ApiError;

/// Key under which `add_query` stores a JSON filter.
pub const QUERY_KEY: &str = "query";

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Str(String),
    Number(f64),
    Bool(bool),
    StrList(Vec<String>),
    NumberList(Vec<f64>),
}

impl ParameterValue {
    fn render(&self, key: &str, out: &mut Vec<(String, String)>) {
        match self {
            ParameterValue::Str(s) => out.push((key.to_string(), s.clone())),
            ParameterValue::Number(n) => out.push((key.to_string(), render_number(*n))),
            ParameterValue::Bool(b) => out.push((key.to_string(), b.to_string())),
            ParameterValue::StrList(items) => {
                out.extend(items.iter().map(|item| (format!("{key}[]"), item.clone())));
            }
            ParameterValue::NumberList(items) => {
                out.extend(items.iter().map(|item| (format!("{key}[]"), render_number(*item))));
            }
        }
    }
}

/// Whole numbers render without a fractional part (`10`, not `10.0`).
fn render_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Str(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::Str(value)
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Number(value)
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        ParameterValue::Number(value as f64)
    }
}

impl From<i32> for ParameterValue {
    fn from(value: i32) -> Self {
        ParameterValue::Number(f64::from(value))
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Bool(value)
    }
}

impl From<Vec<String>> for ParameterValue {
    fn from(value: Vec<String>) -> Self {
        ParameterValue::StrList(value)
    }
}

impl From<Vec<&str>> for ParameterValue {
    fn from(value: Vec<&str>) -> Self {
        ParameterValue::StrList(value.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<f64>> for ParameterValue {
    fn from(value: Vec<f64>) -> Self {
        ParameterValue::NumberList(value)
    }
}

/// Query parameters attached to a service descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterCollection {
    values: BTreeMap<String, ParameterValue>,
}

impl ParameterCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, replacing any previous value.
    pub fn add(&mut self, key: &str, value: impl Into<ParameterValue>) -> Result<(), ApiError> {
        if key.trim().is_empty() {
            return Err(ApiError::Validation { field: "key" });
        }
        self.values.insert(key.to_string(), value.into());
        Ok(())
    }

    /// Store a JSON filter under `query`.
    pub fn add_query(&mut self, query: &serde_json::Value) -> Result<(), ApiError> {
        let rendered =
            serde_json::to_string(query).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        self.add(QUERY_KEY, rendered)
    }

    pub fn get(&self, key: &str) -> Option<&ParameterValue> {
        self.values.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ParameterValue> {
        self.values.remove(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Unencoded `(key, value)` pairs, sorted by key then list order.
    pub fn pairs(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        for (key, value) in &self.values {
            value.render(key, &mut out);
        }
        out
    }

    /// The encoded query string without the leading `?`.
    pub fn to_query_string(&self) -> String {
        encode_pairs(self.pairs())
    }
}

/// Percent-encode each key and value and join as `k=v&k=v`. The `[]` suffix
/// of list keys is left literal.
pub(crate) fn encode_pairs<I, K, V>(pairs: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    pairs
        .into_iter()
        .map(|(key, value)| format!("{}={}", encode_key(key.as_ref()), encode(value.as_ref())))
        .collect::<Vec<_>>()
        .join("&")
}

fn encode_key(key: &str) -> String {
    match key.strip_suffix("[]") {
        Some(stem) => format!("{}[]", encode(stem)),
        None => encode(key),
    }
}

/// Form encoding with spaces as `%20`. `byte_serialize` escapes a literal
/// `+` as `%2B`, so every `+` it emits stands for a space.
fn encode(raw: &str) -> String {
    form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spaces_and_reserved_characters_are_percent_encoded() {
        let mut params = ParameterCollection::new();
        params.add("title", "Hello World+1").unwrap();
        params.add("desc", "a&b=c").unwrap();
        assert_eq!(params.to_query_string(), "desc=a%26b%3Dc&title=Hello%20World%2B1");
    }

    #[test]
    fn list_expands_in_insertion_order() {
        let mut params = ParameterCollection::new();
        params.add("include", vec!["1", "2", "3"]).unwrap();
        assert_eq!(params.to_query_string(), "include[]=1&include[]=2&include[]=3");
    }

    #[test]
    fn keys_are_sorted_and_output_is_stable() {
        let mut params = ParameterCollection::new();
        params.add("limit", 10).unwrap();
        params.add("include", vec!["1", "2"]).unwrap();
        params.add("asc", true).unwrap();
        let first = params.to_query_string();
        assert_eq!(first, "asc=true&include[]=1&include[]=2&limit=10");
        assert_eq!(first, params.to_query_string());
        assert_eq!(first, params.clone().to_query_string());
    }

    #[test]
    fn numbers_render_without_trailing_zero() {
        let mut params = ParameterCollection::new();
        params.add("skip", 20.0).unwrap();
        params.add("ratio", 0.5).unwrap();
        params.add("versions", vec![1.0, 2.5]).unwrap();
        assert_eq!(
            params.to_query_string(),
            "ratio=0.5&skip=20&versions[]=1&versions[]=2.5"
        );
    }

    #[test]
    fn values_are_percent_encoded() {
        let mut params = ParameterCollection::new();
        params.add("locale", "en us&fr").unwrap();
        assert_eq!(params.to_query_string(), "locale=en%20us%26fr");
    }

    #[test]
    fn add_query_stores_json_under_query_key() {
        let mut params = ParameterCollection::new();
        params.add_query(&serde_json::json!({"title": "Home"})).unwrap();
        assert_eq!(
            params.get(QUERY_KEY),
            Some(&ParameterValue::Str(r#"{"title":"Home"}"#.to_string()))
        );
        assert_eq!(
            params.to_query_string(),
            "query=%7B%22title%22%3A%22Home%22%7D"
        );
    }

    #[test]
    fn repeated_add_replaces_value() {
        let mut params = ParameterCollection::new();
        params.add("limit", 10).unwrap();
        params.add("limit", 5).unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params.to_query_string(), "limit=5");
    }

    #[test]
    fn empty_key_is_rejected() {
        let mut params = ParameterCollection::new();
        let err = params.add("  ", "x").unwrap_err();
        assert!(matches!(err, ApiError::Validation { field: "key" }));
        assert!(params.is_empty());
    }
}
