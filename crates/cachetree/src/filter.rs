//! Records, conditions and filters
//!
//! A [`Filter`] maps field names to a [`Condition`]: a single value or an
//! array of values (OR). Fields left out of a filter are wildcards for
//! [`get`](crate::CacheTree::get). Filters serialize to the same JSON shape
//! callers send, e.g. `{"sex":1,"estimate":[1,2]}`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A cached data record: key fields plus any payload fields
pub type Record = serde_json::Map<String, Value>;

/// Accepted values for one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    /// Any of these values
    Any(Vec<Value>),
    /// Exactly this value
    One(Value),
}

impl Condition {
    /// Candidate values, a singleton for [`Condition::One`]
    pub fn values(&self) -> &[Value] {
        match self {
            Condition::Any(values) => values,
            Condition::One(value) => std::slice::from_ref(value),
        }
    }

    /// Check if this is a scalar condition
    pub fn is_scalar(&self) -> bool {
        matches!(self, Condition::One(_))
    }

    /// Same shape as `self`, holding `values` instead
    ///
    /// A scalar condition stays scalar and takes the first value.
    pub(crate) fn reshaped(&self, values: Vec<Value>) -> Condition {
        if self.is_scalar() && values.len() == 1 {
            Condition::One(values.into_iter().next().unwrap_or(Value::Null))
        } else {
            Condition::Any(values)
        }
    }
}

impl From<Value> for Condition {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(values) => Condition::Any(values),
            other => Condition::One(other),
        }
    }
}

impl From<&Value> for Condition {
    fn from(value: &Value) -> Self {
        Condition::from(value.clone())
    }
}

macro_rules! scalar_condition {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Condition {
                fn from(value: $ty) -> Self {
                    Condition::One(Value::from(value))
                }
            }
        )*
    };
}

scalar_condition!(i32, i64, u32, u64, usize, f64, bool, &str, String);

impl<T: Into<Value>> From<Vec<T>> for Condition {
    fn from(values: Vec<T>) -> Self {
        Condition::Any(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Condition {
    fn from(values: [T; N]) -> Self {
        Condition::Any(values.into_iter().map(Into::into).collect())
    }
}

/// Query over the field space
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter {
    fields: IndexMap<String, Condition>,
}

impl Filter {
    /// Create an empty filter (all wildcards)
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn field(mut self, name: impl Into<String>, condition: impl Into<Condition>) -> Self {
        self.insert(name, condition);
        self
    }

    /// Set the condition for a field, replacing any previous one
    pub fn insert(&mut self, name: impl Into<String>, condition: impl Into<Condition>) {
        self.fields.insert(name.into(), condition.into());
    }

    /// Condition for a field, `None` for a wildcard
    pub fn get(&self, name: &str) -> Option<&Condition> {
        self.fields.get(name)
    }

    /// Number of constrained fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if no field is constrained
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate constrained fields in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Condition)> + '_ {
        self.fields.iter().map(|(name, cond)| (name.as_str(), cond))
    }

    /// Every combination of the filter's values, one record per combination
    ///
    /// Fields are taken in insertion order. A filter with an empty array
    /// condition has no combinations.
    pub fn combinations(&self) -> Vec<Record> {
        let mut out = vec![Record::new()];
        for (name, cond) in self.iter() {
            out = out
                .into_iter()
                .flat_map(|partial| {
                    cond.values().iter().map(move |value| {
                        let mut record = partial.clone();
                        record.insert(name.to_string(), value.clone());
                        record
                    })
                })
                .collect();
        }
        out
    }
}

impl From<&Record> for Filter {
    /// Filter that selects exactly the record's own field values
    fn from(record: &Record) -> Self {
        let mut filter = Filter::new();
        for (name, value) in record {
            filter.insert(name.clone(), value);
        }
        filter
    }
}

impl FromIterator<(String, Condition)> for Filter {
    fn from_iter<I: IntoIterator<Item = (String, Condition)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
