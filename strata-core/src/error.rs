use crate::Value;
use thiserror::Error;

/// Failures callers are expected to tell apart.
///
/// They travel inside the crate wide [`crate::Error`] (an `anyhow::Error`), possibly wrapped in
/// extra context, use [`MapperError::of`] to recover the kind.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MapperError {
    /// Transport unreachable or authentication failure.
    #[error("Could not connect to the database: {0}")]
    Connection(String),

    /// Missing or invalid connection configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Entity metadata declaration that cannot be used.
    #[error("Invalid metadata for `{entity_type}`: {message}")]
    InvalidMetadata {
        entity_type: String,
        message: String,
    },

    #[error("Entity type `{0}` is not registered")]
    UnknownEntityType(String),

    #[error("Relation `{relation}` is not declared on `{entity_type}`")]
    UnknownRelation {
        entity_type: String,
        relation: String,
    },

    #[error("Property `{property}` is not mapped on `{entity_type}`")]
    UnknownProperty {
        entity_type: String,
        property: String,
    },

    /// Reading a property that no load ever populated.
    #[error("Field `{property}` of `{entity_type}` was never hydrated")]
    UnhydratedField {
        entity_type: String,
        property: String,
    },

    #[error("Field `{property}` of `{entity_type}` expects {expected}, got {value:?}")]
    TypeMismatch {
        entity_type: String,
        property: String,
        expected: String,
        value: Value,
    },

    #[error("Cannot insert an empty batch of rows")]
    EmptyBatch,

    /// Several rows without any column, a single statement can only insert one of them.
    #[error("Cannot insert {0} rows without any column in a single statement")]
    ColumnlessBatch(usize),

    /// Refuses to update or delete a whole table.
    #[error("Refusing to run {0} without any WHERE predicate")]
    NoPredicate(&'static str),

    #[error("The query has no target table")]
    MissingTable,

    #[error("Entity `{0}` is not tracked by the unit of work")]
    UntrackedEntity(String),
}

impl MapperError {
    /// Finds the kind of `error`, looking through any context attached to it.
    pub fn of(error: &crate::Error) -> Option<&MapperError> {
        error.downcast_ref::<MapperError>()
    }

    pub fn unhydrated(entity_type: &str, property: &str) -> Self {
        Self::UnhydratedField {
            entity_type: entity_type.into(),
            property: property.into(),
        }
    }

    pub fn unknown_property(entity_type: &str, property: &str) -> Self {
        Self::UnknownProperty {
            entity_type: entity_type.into(),
            property: property.into(),
        }
    }

    pub fn invalid_metadata(entity_type: &str, message: impl Into<String>) -> Self {
        Self::InvalidMetadata {
            entity_type: entity_type.into(),
            message: message.into(),
        }
    }
}
