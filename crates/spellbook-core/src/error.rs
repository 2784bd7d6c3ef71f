//! Error types for registry operations and spell compilation.

use thiserror::Error;

use crate::dialect::Feature;

/// Errors raised while defining attributes or compiling spells.
///
/// None of these ever reach a driver: they are raised before any SQL is
/// produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpellError {
    /// An attribute name that was never registered.
    #[error("no attribute `{name}` in model {model}")]
    MissingAttribute {
        /// Model owning the registry.
        model: String,
        /// The unknown attribute name.
        name: String,
    },

    /// A rename or definition collides with an attribute (or column) that
    /// already exists.
    #[error("attribute `{name}` already exists in model {model}")]
    AttributeExists {
        /// Model owning the registry.
        model: String,
        /// The colliding attribute or column name.
        name: String,
    },

    /// A second primary key was declared.
    #[error("model {model} already has primary key `{existing}`, cannot make `{name}` one")]
    DuplicatePrimaryKey {
        /// Model owning the registry.
        model: String,
        /// The primary key already registered.
        existing: String,
        /// The attribute that tried to become a primary key.
        name: String,
    },

    /// The target dialect cannot express a construct the spell asks for.
    #[error("{dialect} does not support {feature}")]
    Capability {
        /// Name of the dialect.
        dialect: &'static str,
        /// The missing capability.
        feature: Feature,
    },

    /// The spell is structurally incomplete (e.g. an update without values).
    #[error("invalid spell: {0}")]
    InvalidSpell(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, SpellError>;
