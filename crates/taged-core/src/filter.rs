//! Note search filter and its query-string codec
//!
//! The same encoded form is used for outgoing list requests and for the
//! browser location, so decoding a location restores the filter that produced it.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const SEARCH_PARAM: &str = "search";
pub const TAGS_PARAM: &str = "tags-in";
pub const USE_VECTORIZER_PARAM: &str = "use-vectorizer";
pub const VECTORIZER_ONLY_PARAM: &str = "vectorizer-only";

/// Structured note search filter
///
/// `vectorizer_only` is meant to imply `use_vectorizer`, but only
/// [`NoteSearchFilter::toggle_vector_search`] keeps that pairing; direct field
/// assignment can produce any combination and the codec carries it as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSearchFilter {
    /// Free-text search; omitted from the query when empty
    pub search: String,

    /// Selected tags in selection order, duplicates allowed
    pub tags: Vec<String>,

    /// Blend vector search results into the text search
    pub use_vectorizer: bool,

    /// Use vector search results exclusively
    pub vectorizer_only: bool,
}

/// Raw query value as produced by a query-string parser
///
/// A key that appears once may come back as a single string even when the
/// caller expects a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    One(String),
    Many(Vec<String>),
}

impl QueryValue {
    fn first(&self) -> Option<&str> {
        match self {
            QueryValue::One(value) => Some(value),
            QueryValue::Many(values) => values.first().map(String::as_str),
        }
    }

    fn into_vec(self) -> Vec<String> {
        match self {
            QueryValue::One(value) => vec![value],
            QueryValue::Many(values) => values,
        }
    }
}

impl NoteSearchFilter {
    /// Create a filter with the given search text
    pub fn new(search: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            ..Self::default()
        }
    }

    /// Append tags in the given order
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Toggle vector search.
    ///
    /// Off goes to on in non-exclusive mode; on (exclusive or not) goes fully off.
    pub fn toggle_vector_search(&mut self) {
        if self.use_vectorizer {
            self.use_vectorizer = false;
            self.vectorizer_only = false;
        } else {
            self.use_vectorizer = true;
            self.vectorizer_only = false;
        }
    }

    /// Encode the filter as ordered query pairs.
    ///
    /// Order is fixed: search, every tag, then the two vectorizer flags.
    /// `false` flags are never emitted.
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(self.tags.len() + 3);

        if !self.search.is_empty() {
            params.push((SEARCH_PARAM.to_string(), self.search.clone()));
        }
        for tag in &self.tags {
            params.push((TAGS_PARAM.to_string(), tag.clone()));
        }
        if self.use_vectorizer {
            params.push((USE_VECTORIZER_PARAM.to_string(), "true".to_string()));
        }
        if self.vectorizer_only {
            params.push((VECTORIZER_ONLY_PARAM.to_string(), "true".to_string()));
        }

        params
    }

    /// Percent-encoded query without a leading `?`
    pub fn query_string(&self) -> Result<String> {
        Ok(serde_urlencoded::to_string(self.params())?)
    }

    /// Query string prefixed with `?`, or empty when the filter emits nothing
    pub fn params_string(&self) -> Result<String> {
        let query = self.query_string()?;
        if query.is_empty() {
            Ok(query)
        } else {
            Ok(format!("?{}", query))
        }
    }

    /// Location path pushed to history when a search runs
    pub fn location(&self) -> Result<String> {
        Ok(format!("/{}", self.params_string()?))
    }

    /// Decode a filter from parsed query parameters.
    ///
    /// Flags are set only by the exact value `"true"`. A missing `search`
    /// decodes to the empty string and missing `tags-in` to no tags.
    pub fn from_params(mut params: HashMap<String, QueryValue>) -> Self {
        let search = params
            .get(SEARCH_PARAM)
            .and_then(QueryValue::first)
            .unwrap_or_default()
            .to_string();

        let tags = params
            .remove(TAGS_PARAM)
            .map(QueryValue::into_vec)
            .unwrap_or_default();

        let flag = |key: &str| {
            params
                .get(key)
                .and_then(QueryValue::first)
                .is_some_and(|value| value == "true")
        };

        Self {
            search,
            tags,
            use_vectorizer: flag(USE_VECTORIZER_PARAM),
            vectorizer_only: flag(VECTORIZER_ONLY_PARAM),
        }
    }

    /// Decode a filter from a raw query string, with or without the leading `?`
    pub fn from_query(query: &str) -> Result<Self> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)?;
        Ok(Self::from_params(group_pairs(pairs)))
    }
}

/// Group ordered pairs by key; a key seen once stays a single value
pub fn group_pairs(pairs: Vec<(String, String)>) -> HashMap<String, QueryValue> {
    let mut grouped: HashMap<String, QueryValue> = HashMap::new();

    for (key, value) in pairs {
        match grouped.remove(&key) {
            None => {
                grouped.insert(key, QueryValue::One(value));
            }
            Some(QueryValue::One(first)) => {
                grouped.insert(key, QueryValue::Many(vec![first, value]));
            }
            Some(QueryValue::Many(mut values)) => {
                values.push(value);
                grouped.insert(key, QueryValue::Many(values));
            }
        }
    }

    grouped
}
