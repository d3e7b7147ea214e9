use crate::{Error, MapperError, Result};
use std::{fmt, str::FromStr};

/// Scalar exchanged with the transport, one per column.
#[derive(Default, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Int64(i64),
    Varchar(String),
    Blob(Box<[u8]>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Type the value can be stored into, `None` for `Null`.
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            Value::Null => None,
            Value::Boolean(..) => Some(FieldType::Boolean),
            Value::Int64(..) => Some(FieldType::Integer),
            Value::Varchar(..) => Some(FieldType::String),
            Value::Blob(..) => Some(FieldType::Binary),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Varchar(v) => write!(f, "{:?}", v),
            Value::Blob(v) => write!(f, "0x{}", hex::encode(v)),
        }
    }
}

/// Declared type of a mapped property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Integer,
    String,
    Boolean,
    Binary,
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Integer => "int",
            FieldType::String => "string",
            FieldType::Boolean => "bool",
            FieldType::Binary => "binary",
        }
    }

    /// Whether `value` can be stored in a property of this type. `Null` fits every type.
    pub fn accepts(&self, value: &Value) -> bool {
        value.field_type().is_none_or(|v| v == *self)
    }
}

impl FromStr for FieldType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        Ok(match value.to_ascii_lowercase().as_str() {
            "int" | "integer" | "bigint" => FieldType::Integer,
            "string" | "text" | "varchar" => FieldType::String,
            "bool" | "boolean" => FieldType::Boolean,
            "binary" | "blob" | "bytes" => FieldType::Binary,
            _ => {
                return Err(MapperError::Config(format!("Unknown field type `{}`", value)).into());
            }
        })
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_type_names() {
        assert_eq!("INT".parse::<FieldType>().unwrap(), FieldType::Integer);
        assert_eq!("text".parse::<FieldType>().unwrap(), FieldType::String);
        assert_eq!("boolean".parse::<FieldType>().unwrap(), FieldType::Boolean);
        assert_eq!("blob".parse::<FieldType>().unwrap(), FieldType::Binary);
        let error = "decimal".parse::<FieldType>().unwrap_err();
        assert!(matches!(MapperError::of(&error), Some(MapperError::Config(..))));
    }

    #[test]
    fn field_type_accepts() {
        assert!(FieldType::Integer.accepts(&Value::Int64(3)));
        assert!(FieldType::Integer.accepts(&Value::Null));
        assert!(!FieldType::Integer.accepts(&Value::Varchar("3".into())));
        assert!(FieldType::Binary.accepts(&Value::Blob([1u8, 2].into())));
    }
}
