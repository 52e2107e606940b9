//! Case-insensitive KVP request parameters.

use std::collections::HashMap;
use std::str::FromStr;

use ogc_common::{OgcError, OgcResult};

/// Query parameters with lowercased keys.
///
/// A key given more than once keeps every value, joined with `,` in arrival
/// order. WCS 2.0 relies on this for repeated `subset` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KvpParams {
    values: HashMap<String, String>,
}

impl KvpParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (k, v) in pairs {
            params.insert(k.as_ref(), v);
        }
        params
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        self.values
            .entry(key.trim().to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(&value);
            })
            .or_insert(value);
    }

    /// Replace any existing value for `key`.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values
            .insert(key.trim().to_ascii_lowercase(), value.into());
    }

    /// Raw value, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Trimmed value, treating an empty string as absent.
    pub fn get_nonempty(&self, key: &str) -> Option<&str> {
        self.get(key).map(str::trim).filter(|v| !v.is_empty())
    }

    /// First non-empty value among several spellings of one parameter.
    pub fn get_any(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| self.get_nonempty(k))
    }

    /// Non-empty value or `MissingParameterValue(key)`.
    pub fn require(&self, key: &str) -> OgcResult<&str> {
        self.get_nonempty(key)
            .ok_or_else(|| OgcError::MissingParameterValue(key.to_string()))
    }

    /// Parse an optional value, mapping a parse failure through `on_error`.
    pub fn parse_opt<T: FromStr>(
        &self,
        key: &str,
        on_error: impl FnOnce(&str) -> OgcError,
    ) -> OgcResult<Option<T>> {
        match self.get_nonempty(key) {
            None => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(|_| on_error(raw)),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for KvpParams {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::from_pairs(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ogc_common::ErrorKind;

    #[test]
    fn test_keys_are_case_insensitive() {
        let params = KvpParams::from_pairs([("SERVICE", "WMS"), ("Request", "GetMap")]);
        assert_eq!(params.get("service"), Some("WMS"));
        assert_eq!(params.get("request"), Some("GetMap"));
    }

    #[test]
    fn test_repeated_keys_are_joined() {
        let params: KvpParams = [("subset", "Lat(0,1)"), ("SUBSET", "Long(2,3)")]
            .into_iter()
            .collect();
        assert_eq!(params.get("subset"), Some("Lat(0,1),Long(2,3)"));
    }

    #[test]
    fn test_require_treats_blank_as_missing() {
        let params = KvpParams::from_pairs([("bbox", "  ")]);
        let err = params.require("bbox").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingParameterValue);
        assert_eq!(err.locator(), Some("bbox"));
    }

    #[test]
    fn test_parse_opt() {
        let params = KvpParams::from_pairs([("width", "abc"), ("height", "20")]);
        let height: Option<usize> = params
            .parse_opt("height", |_| OgcError::InvalidDimensions("h".into()))
            .unwrap();
        assert_eq!(height, Some(20));
        let width: OgcResult<Option<usize>> =
            params.parse_opt("width", |raw| OgcError::InvalidDimensions(raw.into()));
        assert_eq!(width.unwrap_err().kind(), ErrorKind::InvalidDimensions);
    }
}
