//! Query parameter encoding for the marketplace API
//!
//! The API requires array-valued parameters as repeated `key[]=value` pairs,
//! never comma-joined, with both keys and values percent-encoded. `QueryPairs`
//! builds parameter lists in insertion order and serializes them
//! deterministically.

use url::form_urlencoded;

/// Ordered list of query parameters, with repeated keys for arrays
#[derive(Debug, Clone, Default)]
pub struct QueryPairs {
    pairs: Vec<(String, String)>,
}

impl QueryPairs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a single `key=value` pair
    pub fn push(&mut self, key: &str, value: impl ToString) {
        self.pairs.push((key.to_string(), value.to_string()));
    }

    /// Appends one `key[]=value` pair per item, preserving item order
    pub fn push_array<I, V>(&mut self, key: &str, values: I)
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        let array_key = format!("{}[]", key);
        for value in values {
            self.pairs.push((array_key.clone(), value.to_string()));
        }
    }

    /// Builder-style variant of [`push`](Self::push)
    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.push(key, value);
        self
    }

    /// Builder-style variant of [`push_array`](Self::push_array)
    pub fn with_array<I, V>(mut self, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        self.push_array(key, values);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Serializes the pairs as a percent-encoded query string
    pub fn encode(&self) -> String {
        format_query_params(&self.pairs)
    }
}

/// Serializes `(key, value)` pairs into a percent-encoded query string
///
/// Repeated keys stay repeated; `[` and `]` encode as `%5B` and `%5D`.
pub fn format_query_params(pairs: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_params_encode_as_repeated_keys() {
        let query = QueryPairs::new().with_array("projects", [1u64, 2, 3]);

        assert_eq!(
            query.encode(),
            "projects%5B%5D=1&projects%5B%5D=2&projects%5B%5D=3"
        );
    }

    #[test]
    fn test_mixed_params_preserve_insertion_order() {
        let mut query = QueryPairs::new();
        query.push_array("bidders", [7u64]);
        query.push("project_details", true);
        query.push("offset", 100);

        assert_eq!(
            query.encode(),
            "bidders%5B%5D=7&project_details=true&offset=100"
        );
    }

    #[test]
    fn test_values_are_percent_encoded() {
        let query = QueryPairs::new().with("q", "a b&c");
        assert_eq!(query.encode(), "q=a+b%26c");
    }

    #[test]
    fn test_empty_query() {
        let query = QueryPairs::new();
        assert!(query.is_empty());
        assert_eq!(query.encode(), "");
    }

    #[test]
    fn test_format_query_params_direct() {
        let pairs = vec![
            ("projects[]".to_string(), "1".to_string()),
            ("projects[]".to_string(), "2".to_string()),
        ];
        assert_eq!(
            format_query_params(&pairs),
            "projects%5B%5D=1&projects%5B%5D=2"
        );
    }
}
