//! Error types for store operations
//!
//! Every mutating operation on the [`Store`](crate::Store) and every import
//! returns [`Error`]. The variants map one-to-one onto the ways an operation
//! can be refused:
//!
//! - `Validation`: the caller supplied an empty title, flavor or name, no
//!   ingredients, or an out-of-range slice count. Never auto-corrected.
//! - `NotFound`: an update targeted an id that does not exist.
//! - `Format`: a backup snapshot could not be understood.
//! - `Persistence`: the in-memory change was applied but writing it to the
//!   durable store failed.

use std::fmt;

use thiserror::Error;

use crate::storage::StorageError;

/// Field that failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Flavor,
    Ingredients,
    Slices,
    Name,
}

impl Field {
    /// Name of the field as it appears in persisted records
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Flavor => "flavor",
            Field::Ingredients => "ingredients",
            Field::Slices => "slices",
            Field::Name => "name",
        }
    }

    fn message(&self) -> &'static str {
        match self {
            Field::Title => "Enter a title.",
            Field::Flavor => "Enter a flavor name.",
            Field::Ingredients => "Choose at least one ingredient.",
            Field::Slices => "Slices must be between 0 and 10.",
            Field::Name => "Enter a collection name.",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A draft or name was rejected
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Invalid {field}: {}", .field.message())]
pub struct ValidationError {
    pub field: Field,
}

impl ValidationError {
    pub fn new(field: Field) -> Self {
        Self { field }
    }
}

/// Kind of entity an id refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Rating,
    Collection,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Rating => f.write_str("Rating"),
            EntityKind::Collection => f.write_str("Collection"),
        }
    }
}

/// Errors returned by store and backup operations
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("Invalid backup file: {0}")]
    Format(String),

    /// The change is visible in memory but was not written to disk
    #[error("Failed to persist changes: {0}")]
    Persistence(#[from] StorageError),
}

impl Error {
    pub(crate) fn rating_not_found(id: &str) -> Self {
        Error::NotFound {
            kind: EntityKind::Rating,
            id: id.to_string(),
        }
    }

    pub(crate) fn format(details: impl Into<String>) -> Self {
        Error::Format(details.into())
    }

    /// The field that failed validation, if this is a validation error
    pub fn field(&self) -> Option<Field> {
        match self {
            Error::Validation(err) => Some(err.field),
            _ => None,
        }
    }

    /// Whether the in-memory state reflects the attempted change
    ///
    /// True only for persistence failures: the store keeps the mutation
    /// even though the durable copy is now stale.
    pub fn is_applied_in_memory(&self) -> bool {
        matches!(self, Error::Persistence(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display_names_field() {
        let err = Error::from(ValidationError::new(Field::Flavor));
        let msg = err.to_string();
        assert!(msg.contains("flavor"));
        assert_eq!(err.field(), Some(Field::Flavor));
    }

    #[test]
    fn test_not_found_display() {
        let err = Error::rating_not_found("abc");
        assert_eq!(err.to_string(), "Rating not found: abc");
        assert!(err.field().is_none());
        assert!(!err.is_applied_in_memory());
    }

    #[test]
    fn test_persistence_is_applied_in_memory() {
        let err = Error::from(StorageError::Unavailable("quota exceeded".to_string()));
        assert!(err.is_applied_in_memory());
        assert!(err.to_string().contains("quota exceeded"));
    }
}
