#![allow(dead_code)]

use spellbook_core::{compile, Attribute, AttributeRegistry, DataType, Dialect, Spell, SqlValue};

/// `Post`, stored in `articles`, paranoid, with a renamed `updatedAt`.
pub fn posts() -> AttributeRegistry {
    let mut registry = AttributeRegistry::new("Post");
    registry
        .define("id", Attribute::new(DataType::BigInt).primary_key())
        .unwrap();
    registry.define("title", DataType::String).unwrap();
    registry.define("content", DataType::Text).unwrap();
    registry.define("authorId", DataType::BigInt).unwrap();
    registry.define("wordCount", DataType::Integer).unwrap();
    registry.define("isPrivate", DataType::Boolean).unwrap();
    registry.define("extra", DataType::Json).unwrap();
    registry.define("createdAt", DataType::DateTime).unwrap();
    registry
        .define("updatedAt", Attribute::new(DataType::DateTime).column("gmt_modified"))
        .unwrap();
    registry.define("deletedAt", DataType::DateTime).unwrap();
    registry
}

/// `Book`, keyed by `isbn`.
pub fn books() -> AttributeRegistry {
    let mut registry = AttributeRegistry::new("Book");
    registry
        .define("isbn", Attribute::new(DataType::BigInt).primary_key())
        .unwrap();
    registry.define("name", DataType::String).unwrap();
    registry.define("price", DataType::Float).unwrap();
    registry.define("createdAt", DataType::DateTime).unwrap();
    registry.define("updatedAt", DataType::DateTime).unwrap();
    registry
}

/// `User`, not paranoid, with a unique `email`.
pub fn users() -> AttributeRegistry {
    let mut registry = AttributeRegistry::new("User");
    registry
        .define("id", Attribute::new(DataType::BigInt).primary_key())
        .unwrap();
    registry
        .define("email", Attribute::new(DataType::String).unique())
        .unwrap();
    registry.define("nickname", DataType::String).unwrap();
    registry
}

pub fn sql(spell: &Spell, registry: &AttributeRegistry, dialect: &dyn Dialect) -> String {
    compile(spell, registry, dialect)
        .unwrap_or_else(|e| panic!("Failed to compile {spell:?}\nError: {e}"))
        .0
}

pub fn params(
    spell: &Spell,
    registry: &AttributeRegistry,
    dialect: &dyn Dialect,
) -> Vec<SqlValue> {
    compile(spell, registry, dialect)
        .unwrap_or_else(|e| panic!("Failed to compile {spell:?}\nError: {e}"))
        .1
}
