//! Asset references
//!
//! An asset reference is the locator of a remotely hosted image. Its query
//! may carry a transformation chain in the `tr` parameter; the base path is
//! fixed for the lifetime of a project and only the chain changes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Query parameter holding the transformation chain
pub const CHAIN_PARAM: &str = "tr";

/// Locator for a remote image, optionally carrying a transformation chain
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetReference(String);

impl AssetReference {
    pub fn new(reference: impl Into<String>) -> Self {
        AssetReference(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Scheme, host and path: everything before the query
    pub fn base_path(&self) -> &str {
        self.split().0
    }

    /// Raw query string without the leading `?`
    pub fn query(&self) -> Option<&str> {
        self.split().1
    }

    /// Split into base path and query
    pub fn split(&self) -> (&str, Option<&str>) {
        match self.0.split_once('?') {
            Some((base, query)) if !query.is_empty() => (base, Some(query)),
            Some((base, _)) => (base, None),
            None => (self.0.as_str(), None),
        }
    }

    /// Raw value of the transformation chain, if any
    pub fn chain(&self) -> Option<&str> {
        self.query_pairs()
            .find(|(key, _)| *key == CHAIN_PARAM)
            .map(|(_, value)| value)
            .filter(|value| !value.is_empty())
    }

    /// Whether the reference carries any transformation
    pub fn is_transformed(&self) -> bool {
        self.chain().is_some()
    }

    /// Derive a new reference with `chain` as its transformation chain.
    ///
    /// Other query parameters keep their original order; `tr` is emitted last.
    /// An empty chain drops the parameter altogether.
    pub fn with_chain(&self, chain: &str) -> AssetReference {
        let mut params: Vec<String> = self
            .query_pairs()
            .filter(|(key, _)| *key != CHAIN_PARAM)
            .map(|(key, value)| {
                if value.is_empty() {
                    key.to_string()
                } else {
                    format!("{}={}", key, value)
                }
            })
            .collect();

        if !chain.is_empty() {
            params.push(format!("{}={}", CHAIN_PARAM, chain));
        }

        if params.is_empty() {
            AssetReference(self.base_path().to_string())
        } else {
            AssetReference(format!("{}?{}", self.base_path(), params.join("&")))
        }
    }

    /// The same asset with every transformation removed
    pub fn without_chain(&self) -> AssetReference {
        self.with_chain("")
    }

    fn query_pairs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.query()
            .unwrap_or("")
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
    }
}

impl fmt::Display for AssetReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetReference {
    fn from(value: &str) -> Self {
        AssetReference::new(value)
    }
}

impl From<String> for AssetReference {
    fn from(value: String) -> Self {
        AssetReference(value)
    }
}

impl AsRef<str> for AssetReference {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_without_query() {
        let reference = AssetReference::new("https://ik.example.com/demo/img.png");
        assert_eq!(reference.base_path(), "https://ik.example.com/demo/img.png");
        assert_eq!(reference.query(), None);
        assert_eq!(reference.chain(), None);
        assert!(!reference.is_transformed());
    }

    #[test]
    fn test_chain_is_read_from_tr_param() {
        let reference = AssetReference::new("img.png?v=2&tr=e-bgremove:w-10,h-20");
        assert_eq!(reference.base_path(), "img.png");
        assert_eq!(reference.chain(), Some("e-bgremove:w-10,h-20"));
    }

    #[test]
    fn test_with_chain_preserves_other_params() {
        let reference = AssetReference::new("img.png?tr=e-upscale&v=2&download");
        let updated = reference.with_chain("e-upscale:e-retouch");
        assert_eq!(updated.as_str(), "img.png?v=2&download&tr=e-upscale:e-retouch");
    }

    #[test]
    fn test_without_chain_drops_empty_query() {
        let reference = AssetReference::new("img.png?tr=e-bgremove");
        assert_eq!(reference.without_chain().as_str(), "img.png");
    }

    #[test]
    fn test_empty_query_is_ignored() {
        let reference = AssetReference::new("img.png?");
        assert_eq!(reference.query(), None);
        assert_eq!(reference.with_chain("e-upscale").as_str(), "img.png?tr=e-upscale");
    }
}
