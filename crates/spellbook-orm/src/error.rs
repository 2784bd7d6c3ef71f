//! Error types for the ORM.

use std::error::Error as StdError;
use std::time::Duration;

use spellbook_core::{Feature, SpellError};
use thiserror::Error;

/// Message of [`OrmError::Persistence`] for operations that need a row.
pub const NOT_PERSISTED: &str = "instance is not persisted yet";

/// Message of [`OrmError::Persistence`] when no primary key is available.
pub const MISSING_PRIMARY_KEY: &str = "missing primary key";

/// ORM errors.
///
/// Everything except [`OrmError::Database`] is raised locally, before any
/// SQL reaches the driver.
#[derive(Debug, Error)]
pub enum OrmError {
    /// Reference to an attribute that was never defined.
    #[error("no attribute `{name}` in model {model}")]
    MissingAttribute {
        /// Model name.
        model: String,
        /// Attribute name.
        name: String,
    },

    /// The attribute exists but was not loaded on this instance.
    #[error("unset attribute `{name}` of {model}")]
    UnsetAttribute {
        /// Model name.
        model: String,
        /// Attribute name.
        name: String,
    },

    /// A definition or rename collides with an existing attribute.
    #[error("attribute `{name}` already exists in model {model}")]
    AttributeExists {
        /// Model name.
        model: String,
        /// The colliding name.
        name: String,
    },

    /// A second primary key was declared.
    #[error("model {model} already has primary key `{existing}`, cannot make `{name}` one")]
    DuplicatePrimaryKey {
        /// Model name.
        model: String,
        /// The current primary key.
        existing: String,
        /// The rejected attribute.
        name: String,
    },

    /// The instance cannot be written: it was never persisted or has no
    /// primary key.
    #[error("{0}")]
    Persistence(String),

    /// Restore attempted on a model without a deleted marker.
    #[error("Model is not paranoid: {model}")]
    NotParanoid {
        /// Model name.
        model: String,
    },

    /// The dialect cannot express the requested construct.
    #[error("{dialect} does not support {feature}")]
    Capability {
        /// Dialect name.
        dialect: &'static str,
        /// Missing capability.
        feature: Feature,
    },

    /// Structurally incomplete spell.
    #[error("invalid spell: {0}")]
    InvalidSpell(String),

    /// A setter rejected a value.
    #[error("validation error: {0}")]
    Validation(String),

    /// No row matched.
    #[error("object not found")]
    NotFound,

    /// More than one row matched where one was expected.
    #[error("multiple objects returned")]
    MultipleObjectsReturned,

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Failure reported by the driver.
    #[error("database error: {source} (after {elapsed:?}, sql: {sql})")]
    Database {
        /// The statement that failed.
        sql: String,
        /// Time spent before the failure.
        elapsed: Duration,
        /// The driver's error.
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl OrmError {
    pub(crate) fn not_persisted() -> Self {
        Self::Persistence(NOT_PERSISTED.to_string())
    }

    pub(crate) fn missing_primary_key() -> Self {
        Self::Persistence(MISSING_PRIMARY_KEY.to_string())
    }

    /// Returns the driver error of a [`OrmError::Database`], downcast to the
    /// driver's concrete type.
    #[must_use]
    pub fn database_source<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            Self::Database { source, .. } => source.downcast_ref::<E>(),
            _ => None,
        }
    }
}

impl From<SpellError> for OrmError {
    fn from(err: SpellError) -> Self {
        match err {
            SpellError::MissingAttribute { model, name } => Self::MissingAttribute { model, name },
            SpellError::AttributeExists { model, name } => Self::AttributeExists { model, name },
            SpellError::DuplicatePrimaryKey {
                model,
                existing,
                name,
            } => Self::DuplicatePrimaryKey {
                model,
                existing,
                name,
            },
            SpellError::Capability { dialect, feature } => Self::Capability { dialect, feature },
            SpellError::InvalidSpell(msg) => Self::InvalidSpell(msg),
        }
    }
}

/// Result type alias for ORM operations.
pub type Result<T> = std::result::Result<T, OrmError>;
