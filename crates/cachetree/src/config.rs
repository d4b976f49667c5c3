//! Cache configuration

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::Schema;

/// Construction parameters for a [`CacheTree`](crate::CacheTree)
///
/// ```json
/// { "fields": ["sex", "estimate", "age", "year", "location"], "capacity": 10000 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Key fields, outermost first
    pub fields: Vec<String>,

    /// Maximum number of records; `None` is unbounded
    #[serde(default)]
    pub capacity: Option<usize>,
}

impl CacheConfig {
    /// Unbounded config over `fields`
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            capacity: None,
        }
    }

    /// Set the maximum number of records
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Parse a JSON config document
    pub fn from_json_str(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Check the config and build its schema
    pub fn validate(&self) -> Result<Schema> {
        if let Some(0) = self.capacity {
            return Err(Error::InvalidCapacity(0));
        }
        Schema::new(self.fields.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_json() {
        let config = CacheConfig::from_json_str(r#"{"fields": ["sex", "age"], "capacity": 5}"#)
            .unwrap();
        assert_eq!(config, CacheConfig::new(["sex", "age"]).with_capacity(5));

        let unbounded = CacheConfig::from_json_str(r#"{"fields": ["sex"]}"#).unwrap();
        assert_eq!(unbounded.capacity, None);
    }

    #[test]
    fn test_config_validate() {
        assert!(CacheConfig::new(["sex"]).validate().is_ok());
        assert!(matches!(
            CacheConfig::new(["sex"]).with_capacity(0).validate(),
            Err(Error::InvalidCapacity(0))
        ));
        assert!(matches!(
            CacheConfig::new(Vec::<String>::new()).validate(),
            Err(Error::EmptySchema)
        ));
    }

    #[test]
    fn test_config_bad_json() {
        assert!(matches!(
            CacheConfig::from_json_str(r#"{"capacity": 5}"#),
            Err(Error::Json(_))
        ));
        // Negative capacity is not representable
        assert!(CacheConfig::from_json_str(r#"{"fields": ["a"], "capacity": -1}"#).is_err());
    }
}
