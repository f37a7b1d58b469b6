//! Path filter for `fetch` and `get` requests.
//!
//! A matcher describes which entries of the daemon's namespace a fetch is
//! interested in. All predicates are AND gated; the empty matcher matches
//! everything. Matching itself is the daemon's job, the peer only forwards
//! the descriptor.

use std::fmt;

use serde_json::{Map, Value};

use crate::protocol::consts;

/// Match rules for fetchers. All rules are AND gated.
///
/// # Example
///
/// ```
/// use jet_common::Matcher;
///
/// let matcher = Matcher {
///     starts_with: Some("measurement/".into()),
///     ends_with: Some("/value".into()),
///     ..Matcher::default()
/// };
/// assert!(!matcher.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Matcher {
    /// Apply all string predicates case insensitively.
    pub case_insensitive: bool,
    /// Matches if the path contains this.
    pub contains: Option<String>,
    /// Matches if the path starts with this.
    pub starts_with: Option<String>,
    /// Matches if the path ends with this.
    pub ends_with: Option<String>,
    /// Matches if the path equals this.
    pub equals: Option<String>,
    /// Matches if the path does not equal this.
    pub equals_not: Option<String>,
    /// Matches if the path contains all of these.
    pub contains_all_of: Vec<String>,
}

impl Matcher {
    /// A matcher with no predicates, matching every path.
    pub fn all() -> Self {
        Self::default()
    }

    /// Shorthand for the single most common filter.
    pub fn prefix(starts_with: impl Into<String>) -> Self {
        Self {
            starts_with: Some(starts_with.into()),
            ..Self::default()
        }
    }

    /// True when no predicate is set.
    pub fn is_empty(&self) -> bool {
        !self.case_insensitive
            && self.contains.is_none()
            && self.starts_with.is_none()
            && self.ends_with.is_none()
            && self.equals.is_none()
            && self.equals_not.is_none()
            && self.contains_all_of.is_empty()
    }

    /// The wire dictionary placed under `params.path`, containing only the
    /// predicates that are set.
    pub fn to_wire(&self) -> Value {
        let mut dict = Map::new();
        if let Some(contains) = &self.contains {
            dict.insert(consts::CONTAINS.into(), Value::String(contains.clone()));
        }
        if let Some(starts_with) = &self.starts_with {
            dict.insert(consts::STARTS_WITH.into(), Value::String(starts_with.clone()));
        }
        if let Some(ends_with) = &self.ends_with {
            dict.insert(consts::ENDS_WITH.into(), Value::String(ends_with.clone()));
        }
        if let Some(equals) = &self.equals {
            dict.insert(consts::EQUALS.into(), Value::String(equals.clone()));
        }
        if let Some(equals_not) = &self.equals_not {
            dict.insert(consts::EQUALS_NOT.into(), Value::String(equals_not.clone()));
        }
        if !self.contains_all_of.is_empty() {
            let entries = self
                .contains_all_of
                .iter()
                .cloned()
                .map(Value::String)
                .collect();
            dict.insert(consts::CONTAINS_ALL_OF.into(), Value::Array(entries));
        }
        if self.case_insensitive {
            dict.insert(consts::CASE_INSENSITIVE.into(), Value::Bool(true));
        }
        Value::Object(dict)
    }

    /// Insert the wire dictionary into `params` under the `path` key.
    ///
    /// An empty matcher inserts nothing, so `params` stays free of a `path`
    /// member exactly as the daemon expects for a match-all request.
    pub fn append_to(&self, params: &mut Map<String, Value>) {
        if !self.is_empty() {
            params.insert(consts::PATH.into(), self.to_wire());
        }
    }
}

/// Log rendering: `caseInsensitive` first as a bare token, then the set
/// predicates as `key=value` joined by `", "`.
impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.case_insensitive {
            parts.push(consts::CASE_INSENSITIVE.to_string());
        }
        for (key, predicate) in [
            (consts::CONTAINS, &self.contains),
            (consts::STARTS_WITH, &self.starts_with),
            (consts::ENDS_WITH, &self.ends_with),
            (consts::EQUALS, &self.equals),
            (consts::EQUALS_NOT, &self.equals_not),
        ] {
            if let Some(value) = predicate {
                parts.push(format!("{key}={value}"));
            }
        }
        if !self.contains_all_of.is_empty() {
            parts.push(format!(
                "{}=[{}]",
                consts::CONTAINS_ALL_OF,
                self.contains_all_of.join(", ")
            ));
        }
        write!(f, "{}", parts.join(", "))
    }
}
