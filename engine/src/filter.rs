//! Regular-expression filter over type names.

use crate::{error::Result, Error};
use regex::Regex;

/// Filter used by dashboards to narrow the list of types on offer.
///
/// An empty pattern matches everything. Otherwise the pattern is searched
/// anywhere in the type name; anchor it with `^`/`$` for exact matches.
#[derive(Debug, Clone)]
pub struct TypeFilter {
    pattern: String,
    regex: Option<Regex>,
}

impl TypeFilter {
    /// Compile a filter.
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        let regex = if pattern.is_empty() {
            None
        } else {
            let compiled = Regex::new(&pattern).map_err(|e| Error::InvalidFilter {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
            Some(compiled)
        };

        Ok(Self { pattern, regex })
    }

    /// A filter that lets every type through.
    pub fn all() -> Self {
        Self {
            pattern: String::new(),
            regex: None,
        }
    }

    /// The source pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Check a single type name.
    pub fn matches(&self, type_name: &str) -> bool {
        self.regex
            .as_ref()
            .map_or(true, |regex| regex.is_match(type_name))
    }

    /// Keep the matching names, preserving their order.
    pub fn filter_types<'a, I>(&self, types: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a String>,
    {
        types
            .into_iter()
            .map(String::as_str)
            .filter(|name| self.matches(name))
            .collect()
    }
}

impl Default for TypeFilter {
    fn default() -> Self {
        Self::all()
    }
}
