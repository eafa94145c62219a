//! Filter values, field maps, and the filter-cleaning policy.
//!
//! Repositories constrain selections with a [`FieldMap`]: an ordered mapping
//! of column name to [`FilterValue`]. The same type carries change sets for
//! create/update operations. [`clean_filters`] implements the null-handling
//! policy applied before a map is used to build a query.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A dynamically-typed value usable as a filter constraint or column value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// SQL NULL. As a filter it renders an `IS NULL` predicate.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
}

impl FilterValue {
    /// Whether this value is the null marker.
    pub fn is_null(&self) -> bool {
        matches!(self, FilterValue::Null)
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Null => write!(f, "NULL"),
            FilterValue::Bool(v) => write!(f, "{}", v),
            FilterValue::Int(v) => write!(f, "{}", v),
            FilterValue::Float(v) => write!(f, "{}", v),
            FilterValue::Text(v) => write!(f, "{}", v),
            FilterValue::Uuid(v) => write!(f, "{}", v),
            FilterValue::Timestamp(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        FilterValue::Bool(v)
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        FilterValue::Int(v as i64)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        FilterValue::Int(v)
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        FilterValue::Float(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::Text(v.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        FilterValue::Text(v)
    }
}

impl From<Uuid> for FilterValue {
    fn from(v: Uuid) -> Self {
        FilterValue::Uuid(v)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(v: DateTime<Utc>) -> Self {
        FilterValue::Timestamp(v)
    }
}

impl<V> From<Option<V>> for FilterValue
where
    V: Into<FilterValue>,
{
    fn from(v: Option<V>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => FilterValue::Null,
        }
    }
}

/// An ordered field-name → value mapping.
///
/// Used both as a filter set narrowing a selection and as the change set for
/// create/update. Insertion order is preserved so generated SQL is
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    entries: Vec<(String, FilterValue)>,
}

impl FieldMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any existing entry for the field.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FilterValue>) {
        let field = field.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(name, _)| *name == field) {
            entry.1 = value;
        } else {
            self.entries.push((field, value));
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.insert(field, value);
        self
    }

    /// Insert only if the field is not already present.
    ///
    /// This is how decorating repositories force defaults without overriding
    /// an explicit caller-supplied value.
    pub fn set_default(&mut self, field: impl Into<String>, value: impl Into<FilterValue>) {
        let field = field.into();
        if !self.contains(&field) {
            self.entries.push((field, value.into()));
        }
    }

    /// Look up the value for a field.
    pub fn get(&self, field: &str) -> Option<&FilterValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    /// Whether the field is present (even with a null value).
    pub fn contains(&self, field: &str) -> bool {
        self.entries.iter().any(|(name, _)| name == field)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl FromIterator<(String, FilterValue)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (String, FilterValue)>>(iter: I) -> Self {
        let mut map = FieldMap::new();
        for (field, value) in iter {
            map.insert(field, value);
        }
        map
    }
}

/// Build a [`FieldMap`] literal.
///
/// ```
/// use stratum_common::fields;
///
/// let filters = fields! { "name" => "alpha", "attempts" => 3 };
/// assert_eq!(filters.len(), 2);
/// ```
#[macro_export]
macro_rules! fields {
    () => { $crate::filters::FieldMap::new() };
    ($($field:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::filters::FieldMap::new();
        $(map.insert($field, $value);)+
        map
    }};
}

/// Normalize a filter map before it constrains a query.
///
/// With `allow_null_filters` false, every null-valued entry is removed; an
/// unset optional parameter passed through by a caller then simply does not
/// constrain the query. With `allow_null_filters` true, null entries are kept
/// and become explicit `IS NULL` predicates.
pub fn clean_filters(filters: &FieldMap, allow_null_filters: bool) -> FieldMap {
    if allow_null_filters {
        return filters.clone();
    }
    filters
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(field, value)| (field.to_string(), value.clone()))
        .collect()
}
