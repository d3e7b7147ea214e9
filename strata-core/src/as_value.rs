use crate::{Error, Result, Value};
use std::any;

/// Conversion between native Rust types and the dynamically typed [`Value`].
///
/// Entity fields are stored in their native type and converted at the row boundary.
/// `try_from_value` must fail (never panic) when the variant or the range does not fit.
///
/// ```rust
/// use strata_core::{AsValue, Value};
/// let v = 42i32.as_value();
/// assert_eq!(v, Value::Int64(42));
/// let n: i32 = AsValue::try_from_value(v).unwrap();
/// assert_eq!(n, 42);
/// ```
pub trait AsValue {
    fn as_value(self) -> Value;
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
}

fn unexpected<T>(value: &Value) -> Error {
    Error::msg(format!(
        "Cannot convert {:?} into {}",
        value,
        any::type_name::<T>()
    ))
}

impl AsValue for Value {
    fn as_value(self) -> Value {
        self
    }
    fn try_from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl AsValue for bool {
    fn as_value(self) -> Value {
        Value::Boolean(self)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Boolean(v) => Ok(v),
            Value::Int64(v @ (0 | 1)) => Ok(v == 1),
            v => Err(unexpected::<Self>(&v)),
        }
    }
}

macro_rules! impl_as_value_integer {
    ($($ty:ty),+) => {
        $(
            impl AsValue for $ty {
                fn as_value(self) -> Value {
                    Value::Int64(self as i64)
                }
                fn try_from_value(value: Value) -> Result<Self> {
                    match value {
                        Value::Int64(v) => <$ty>::try_from(v).map_err(|_| {
                            Error::msg(format!(
                                "Value {} is out of range for {}",
                                v,
                                any::type_name::<Self>()
                            ))
                        }),
                        v => Err(unexpected::<Self>(&v)),
                    }
                }
            }
        )+
    };
}
impl_as_value_integer!(i8, i16, i32, u8, u16, u32);

impl AsValue for i64 {
    fn as_value(self) -> Value {
        Value::Int64(self)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Int64(v) => Ok(v),
            v => Err(unexpected::<Self>(&v)),
        }
    }
}

impl AsValue for String {
    fn as_value(self) -> Value {
        Value::Varchar(self)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Varchar(v) => Ok(v),
            v => Err(unexpected::<Self>(&v)),
        }
    }
}

impl AsValue for &str {
    fn as_value(self) -> Value {
        Value::Varchar(self.into())
    }
    fn try_from_value(value: Value) -> Result<Self> {
        Err(unexpected::<Self>(&value))
    }
}

impl AsValue for Box<[u8]> {
    fn as_value(self) -> Value {
        Value::Blob(self)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Blob(v) => Ok(v),
            v => Err(unexpected::<Self>(&v)),
        }
    }
}

impl AsValue for Vec<u8> {
    fn as_value(self) -> Value {
        Value::Blob(self.into_boxed_slice())
    }
    fn try_from_value(value: Value) -> Result<Self> {
        Box::<[u8]>::try_from_value(value).map(Into::into)
    }
}

impl<T: AsValue> AsValue for Option<T> {
    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => Value::Null,
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            v => T::try_from_value(v).map(Some),
        }
    }
}

macro_rules! impl_value_from {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    value.as_value()
                }
            }
        )+
    };
}
impl_value_from!(bool, i8, i16, i32, i64, u8, u16, u32, String, &str, Vec<u8>, Box<[u8]>);

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers() {
        assert_eq!(7u8.as_value(), Value::Int64(7));
        assert_eq!(i16::try_from_value(Value::Int64(-3)).unwrap(), -3);
        assert!(u8::try_from_value(Value::Int64(300)).is_err());
        assert!(i64::try_from_value(Value::Varchar("1".into())).is_err());
    }

    #[test]
    fn options() {
        assert_eq!(None::<String>.as_value(), Value::Null);
        assert_eq!(Option::<i64>::try_from_value(Value::Null).unwrap(), None);
        assert_eq!(
            Option::<String>::try_from_value(Value::Varchar("x".into())).unwrap(),
            Some("x".to_string())
        );
        assert!(String::try_from_value(Value::Null).is_err());
    }

    #[test]
    fn booleans() {
        assert!(bool::try_from_value(Value::Boolean(true)).unwrap());
        assert!(!bool::try_from_value(Value::Int64(0)).unwrap());
        assert!(bool::try_from_value(Value::Int64(2)).is_err());
    }
}
