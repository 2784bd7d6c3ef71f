#![allow(dead_code)]

use std::sync::Arc;

use spellbook_core::{Attribute, DataType};
use spellbook_orm::{run, Model};
use spellbook_sqlite::SqliteDriver;

const SCHEMA: [&str; 3] = [
    "CREATE TABLE articles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT,
        content TEXT,
        word_count INTEGER DEFAULT 0,
        extra TEXT,
        created_at TEXT,
        gmt_modified TEXT,
        deleted_at TEXT
    )",
    "CREATE TABLE books (
        isbn INTEGER PRIMARY KEY,
        name TEXT,
        price REAL
    )",
    "CREATE TABLE users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT UNIQUE,
        nickname TEXT
    )",
];

/// A fresh in-memory database with the test schema.
pub async fn setup() -> SqliteDriver {
    let driver = SqliteDriver::in_memory()
        .await
        .expect("Failed to create in-memory SQLite pool");
    for ddl in SCHEMA {
        run(&driver, None, ddl, &[]).await.expect("Failed to create schema");
    }
    driver
}

/// Paranoid model on `articles` with `updatedAt` stored in `gmt_modified`.
pub fn post() -> Arc<Model> {
    Arc::new(
        Model::builder("Post")
            .table("articles")
            .attribute("id", Attribute::new(DataType::BigInt).primary_key())
            .attribute("title", DataType::String)
            .attribute("content", DataType::Text)
            .attribute("wordCount", Attribute::new(DataType::Integer).default_value(0))
            .attribute("extra", DataType::Json)
            .attribute("createdAt", DataType::DateTime)
            .attribute(
                "updatedAt",
                Attribute::new(DataType::DateTime).column("gmt_modified"),
            )
            .attribute("deletedAt", DataType::DateTime)
            .build()
            .unwrap(),
    )
}

pub fn book() -> Arc<Model> {
    Arc::new(
        Model::builder("Book")
            .attribute("isbn", Attribute::new(DataType::BigInt).primary_key())
            .attribute("name", DataType::String)
            .attribute("price", DataType::Float)
            .build()
            .unwrap(),
    )
}

pub fn user() -> Arc<Model> {
    Arc::new(
        Model::builder("User")
            .attribute("id", Attribute::new(DataType::BigInt).primary_key())
            .attribute("email", Attribute::new(DataType::String).unique())
            .attribute("nickname", DataType::String)
            .build()
            .unwrap(),
    )
}
