use aws_sdk_dynamodb::types::{KeyType, ScalarAttributeType};
use serde_json::{json, Value};

/// Type of a key attribute.
///
/// Every table in this app keys on strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldType {
    /// Represents a string field.
    String,
}

impl FieldType {
    fn scalar_type(self) -> ScalarAttributeType {
        match self {
            FieldType::String => ScalarAttributeType::S,
        }
    }
}

/// One attribute of a table's primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAttribute {
    name: String,
    field_type: FieldType,
}

impl KeyAttribute {
    pub fn string(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::String,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `AttributeDefinitions` entry.
    pub(crate) fn definition(&self) -> Value {
        json!({
            "AttributeName": self.name,
            "AttributeType": self.field_type.scalar_type().as_str(),
        })
    }

    /// `KeySchema` entry.
    pub(crate) fn key_schema(&self, key_type: KeyType) -> Value {
        json!({ "AttributeName": self.name, "KeyType": key_type.as_str() })
    }
}
