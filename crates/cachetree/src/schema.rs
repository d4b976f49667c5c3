//! Field schema: the ordered key fields that define tree depth

use ahash::AHashSet;

use crate::error::{Error, Result};
use crate::filter::Record;
use crate::key::Key;

/// Ordered, non-empty list of distinct field names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<String>,
}

impl Schema {
    /// Validate and build a schema
    pub fn new<I, S>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        if fields.is_empty() {
            return Err(Error::EmptySchema);
        }

        let mut seen = AHashSet::with_capacity(fields.len());
        for field in &fields {
            if !seen.insert(field.as_str()) {
                return Err(Error::DuplicateField(field.clone()));
            }
        }

        Ok(Self { fields })
    }

    /// Field names in nesting order
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Keys addressing a record's leaf, one per field
    pub fn key_path(&self, record: &Record) -> Vec<Key> {
        self.fields
            .iter()
            .map(|field| Key::from_value(record.get(field)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_schema_validation() {
        assert!(Schema::new(["sex", "age"]).is_ok());
        assert!(matches!(Schema::new(Vec::<String>::new()), Err(Error::EmptySchema)));
        assert!(matches!(
            Schema::new(["sex", "age", "sex"]),
            Err(Error::DuplicateField(f)) if f == "sex"
        ));
    }

    #[test]
    fn test_key_path() {
        let schema = Schema::new(["sex", "age", "year"]).unwrap();
        let record = json!({"age": 3, "sex": "f", "value": 1.5});

        let path = schema.key_path(record.as_object().unwrap());
        assert_eq!(
            path,
            vec![
                Key::Name("f".into()),
                Key::Index(3),
                Key::Name("undefined".into()),
            ]
        );
    }
}
