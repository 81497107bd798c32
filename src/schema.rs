//! Schema definitions for JSON generation.
//!
//! A schema describes the shape of every generated record as a tree of typed
//! fields. It is loaded from a YAML file and is the source of truth for the
//! value generators: integer ranges, string and array length bounds, and
//! nested record structure all come from here.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Default maximum length for strings and variable-length arrays.
pub const DEFAULT_MAX_LENGTH: usize = 16;

/// Schema for one kind of generated record.
///
/// The root of every generated record is an object holding `fields` in
/// declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    /// Schema version.
    #[serde(default = "default_version")]
    pub version: u32,

    /// Top-level field definitions.
    pub fields: Vec<Field>,
}

fn default_version() -> u32 {
    1
}

impl Schema {
    /// Load a schema from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a schema from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let schema: Schema = serde_yaml::from_str(yaml)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Build a schema directly from fields, for programmatic use.
    pub fn from_fields(fields: Vec<Field>) -> Result<Self> {
        let schema = Schema {
            version: default_version(),
            fields,
        };
        schema.validate()?;
        Ok(schema)
    }

    /// Check bounds and length constraints on every field.
    pub fn validate(&self) -> Result<()> {
        for field in &self.fields {
            field.field_type.validate(&field.name)?;
        }
        Ok(())
    }
}

/// A named field inside an object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    /// Member name as it appears in the generated JSON.
    pub name: String,

    /// The type of the generated value.
    #[serde(flatten)]
    pub field_type: FieldType,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// The type of a generated value, with optional per-type constraints.
///
/// Integers are drawn uniformly from `[min, max]`, defaulting to the full
/// range of the declared width. String and array lengths are drawn uniformly
/// from `[min_length, max_length]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    /// Always `null`. Spell the tag as `"null"` (quoted) in YAML.
    Null,
    /// Uniform `true`/`false`.
    Bool,
    Int8 {
        min: Option<i64>,
        max: Option<i64>,
    },
    Int16 {
        min: Option<i64>,
        max: Option<i64>,
    },
    Int32 {
        min: Option<i64>,
        max: Option<i64>,
    },
    Int64 {
        min: Option<i64>,
        max: Option<i64>,
    },
    Uint8 {
        min: Option<u64>,
        max: Option<u64>,
    },
    Uint16 {
        min: Option<u64>,
        max: Option<u64>,
    },
    Uint32 {
        min: Option<u64>,
        max: Option<u64>,
    },
    Uint64 {
        min: Option<u64>,
        max: Option<u64>,
    },
    /// Random lowercase `a..=z` characters.
    String {
        min_length: Option<usize>,
        max_length: Option<usize>,
    },
    /// ISO-8601-like date and time string.
    Date,
    /// Variable-length array.
    Array {
        items: Box<FieldType>,
        min_length: Option<usize>,
        max_length: Option<usize>,
    },
    /// Fixed-length array.
    FixedArray {
        items: Box<FieldType>,
        length: usize,
    },
    /// Nested object with fields in declaration order.
    Object {
        fields: Vec<Field>,
    },
}

impl FieldType {
    /// Resolved signed bounds for the integer widths, or `None` for other types.
    pub(crate) fn signed_bounds(&self) -> Option<(i64, i64)> {
        let (lo, hi, min, max) = match self {
            FieldType::Int8 { min, max } => (i8::MIN as i64, i8::MAX as i64, min, max),
            FieldType::Int16 { min, max } => (i16::MIN as i64, i16::MAX as i64, min, max),
            FieldType::Int32 { min, max } => (i32::MIN as i64, i32::MAX as i64, min, max),
            FieldType::Int64 { min, max } => (i64::MIN, i64::MAX, min, max),
            _ => return None,
        };
        Some((min.unwrap_or(lo), max.unwrap_or(hi)))
    }

    /// Resolved unsigned bounds for the integer widths, or `None` for other types.
    pub(crate) fn unsigned_bounds(&self) -> Option<(u64, u64)> {
        let (hi, min, max) = match self {
            FieldType::Uint8 { min, max } => (u8::MAX as u64, min, max),
            FieldType::Uint16 { min, max } => (u16::MAX as u64, min, max),
            FieldType::Uint32 { min, max } => (u32::MAX as u64, min, max),
            FieldType::Uint64 { min, max } => (u64::MAX, min, max),
            _ => return None,
        };
        Some((min.unwrap_or(0), max.unwrap_or(hi)))
    }

    fn validate(&self, name: &str) -> Result<()> {
        if let Some((min, max)) = self.signed_bounds() {
            if min > max {
                return Err(Error::Generic(format!(
                    "Field '{name}': min ({min}) exceeds max ({max})"
                )));
            }
        }
        if let Some((min, max)) = self.unsigned_bounds() {
            if min > max {
                return Err(Error::Generic(format!(
                    "Field '{name}': min ({min}) exceeds max ({max})"
                )));
            }
        }
        match self {
            FieldType::String {
                min_length,
                max_length,
            } => {
                let min = min_length.unwrap_or(0);
                let max = max_length.unwrap_or(DEFAULT_MAX_LENGTH);
                if min > max {
                    return Err(Error::Generic(format!(
                        "Field '{name}': min_length ({min}) exceeds max_length ({max})"
                    )));
                }
            }
            FieldType::Array {
                items,
                min_length,
                max_length,
            } => {
                let min = min_length.unwrap_or(0);
                let max = max_length.unwrap_or(DEFAULT_MAX_LENGTH);
                if min > max {
                    return Err(Error::Generic(format!(
                        "Field '{name}': min_length ({min}) exceeds max_length ({max})"
                    )));
                }
                items.validate(name)?;
            }
            FieldType::FixedArray { items, .. } => items.validate(name)?,
            FieldType::Object { fields } => {
                for field in fields {
                    field.field_type.validate(&field.name)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_schema_yaml() {
        let yaml = r#"
version: 1
fields:
  - name: test
    type: uint64
    min: 0
    max: 9
  - name: name
    type: string
    max_length: 8
  - name: when
    type: date
  - name: tags
    type: array
    items:
      type: string
  - name: pair
    type: fixed_array
    length: 2
    items:
      type: int32
  - name: inner
    type: object
    fields:
      - name: flag
        type: bool
      - name: nothing
        type: "null"
"#;
        let schema = Schema::from_yaml(yaml).unwrap();
        assert_eq!(schema.version, 1);
        assert_eq!(schema.fields.len(), 6);
        assert_eq!(schema.fields[0].name, "test");
        assert!(matches!(
            schema.fields[0].field_type,
            FieldType::Uint64 {
                min: Some(0),
                max: Some(9)
            }
        ));
        assert!(matches!(schema.fields[2].field_type, FieldType::Date));
        if let FieldType::Object { fields } = &schema.fields[5].field_type {
            assert_eq!(fields.len(), 2);
            assert!(matches!(fields[1].field_type, FieldType::Null));
        } else {
            panic!("expected object field");
        }
    }

    #[test]
    fn test_default_integer_bounds() {
        let t = FieldType::Int8 {
            min: None,
            max: None,
        };
        assert_eq!(t.signed_bounds(), Some((-128, 127)));

        let t = FieldType::Uint16 {
            min: None,
            max: Some(100),
        };
        assert_eq!(t.unsigned_bounds(), Some((0, 100)));
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let yaml = r#"
fields:
  - name: bad
    type: int32
    min: 10
    max: 1
"#;
        let result = Schema::from_yaml(yaml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("exceeds max"));
    }

    #[test]
    fn test_invalid_length_bounds_rejected() {
        let yaml = r#"
fields:
  - name: bad
    type: string
    min_length: 9
    max_length: 3
"#;
        assert!(Schema::from_yaml(yaml).is_err());
    }
}
