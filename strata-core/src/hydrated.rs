use crate::{AsValue, MapperError, Result, Value};

/// Field of an entity that may not have been loaded yet.
///
/// `NotSet` is different from a hydrated `Set(None)` on a nullable field: reading it through
/// [`Hydrated::value`] fails with [`MapperError::UnhydratedField`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum Hydrated<T> {
    Set(T),
    #[default]
    NotSet,
}

impl<T> Hydrated<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, Self::Set(..))
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            Self::Set(v) => Some(v),
            Self::NotSet => None,
        }
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Set(v) => Some(v),
            Self::NotSet => None,
        }
    }

    /// Returns the value or the unhydrated field error naming `entity_type` and `property`.
    pub fn value(&self, entity_type: &str, property: &str) -> Result<&T> {
        self.get()
            .ok_or_else(|| MapperError::unhydrated(entity_type, property).into())
    }

    pub fn set(&mut self, value: T) {
        *self = Self::Set(value);
    }

    pub fn take(&mut self) -> Option<T> {
        match std::mem::take(self) {
            Self::Set(v) => Some(v),
            Self::NotSet => None,
        }
    }
}

impl<T: AsValue + Clone> Hydrated<T> {
    pub fn to_value(&self, entity_type: &str, property: &str) -> Result<Value> {
        self.value(entity_type, property).cloned().map(AsValue::as_value)
    }

    pub fn set_value(&mut self, value: Value) -> Result<()> {
        self.set(T::try_from_value(value)?);
        Ok(())
    }
}

impl<T> From<T> for Hydrated<T> {
    fn from(value: T) -> Self {
        Self::Set(value)
    }
}
