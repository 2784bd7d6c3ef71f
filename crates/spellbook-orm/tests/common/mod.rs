#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use spellbook_core::{Attribute, DataType, Dialect, DialectKind, SqlValue};
use spellbook_orm::{Driver, Instance, Model, QueryResult, Row};

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct MockError(pub String);

/// A driver that records every statement and answers with queued results.
#[derive(Debug)]
pub struct RecordingDriver {
    kind: DialectKind,
    log: Mutex<Vec<(String, Vec<SqlValue>)>>,
    results: Mutex<VecDeque<QueryResult>>,
    failure: Mutex<Option<String>>,
    escape: Option<fn(&str) -> String>,
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl RecordingDriver {
    pub fn new(kind: DialectKind) -> Self {
        Self {
            kind,
            log: Mutex::new(Vec::new()),
            results: Mutex::new(VecDeque::new()),
            failure: Mutex::new(None),
            escape: None,
            acquired: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
        }
    }

    pub fn sqlite() -> Self {
        Self::new(DialectKind::Sqlite)
    }

    pub fn mysql() -> Self {
        Self::new(DialectKind::Mysql)
    }

    pub fn postgres() -> Self {
        Self::new(DialectKind::Postgres)
    }

    /// Quotes identifiers with `escape` instead of the dialect.
    pub fn escaping(mut self, escape: fn(&str) -> String) -> Self {
        self.escape = Some(escape);
        self
    }

    /// Queues the result of the next statement.
    pub fn push_result(&self, result: QueryResult) {
        self.results.lock().unwrap().push_back(result);
    }

    /// Queues a result carrying `rows`.
    pub fn push_rows(&self, rows: Vec<Row>) {
        self.push_result(QueryResult {
            rows,
            ..QueryResult::default()
        });
    }

    /// Makes the next statement fail.
    pub fn fail_next(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn statements(&self) -> Vec<String> {
        self.log.lock().unwrap().iter().map(|(sql, _)| sql.clone()).collect()
    }

    pub fn params(&self, index: usize) -> Vec<SqlValue> {
        self.log.lock().unwrap()[index].1.clone()
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl Driver for RecordingDriver {
    type Connection = ();
    type Error = MockError;

    fn dialect(&self) -> &dyn Dialect {
        self.kind.dialect()
    }

    fn escape_identifier(&self, name: &str) -> String {
        match self.escape {
            Some(escape) => escape(name),
            None => self.dialect().quote_identifier(name),
        }
    }

    async fn acquire(&self) -> Result<(), MockError> {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn release(&self, _conn: ()) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }

    async fn execute(
        &self,
        _conn: &mut (),
        sql: &str,
        params: &[SqlValue],
    ) -> Result<QueryResult, MockError> {
        self.log
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
        if let Some(message) = self.failure.lock().unwrap().take() {
            return Err(MockError(message));
        }
        Ok(self.results.lock().unwrap().pop_front().unwrap_or_default())
    }
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

/// Plain model keyed by `isbn`.
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

/// Plain model with a unique email.
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

pub fn row(columns: &[(&str, SqlValue)]) -> Row {
    columns.iter().cloned().collect()
}

pub fn text(s: &str) -> SqlValue {
    SqlValue::Text(s.to_string())
}

/// A persisted post as if loaded with `SELECT *`.
pub fn loaded_post(driver: &RecordingDriver, id: i64, title: &str) -> Instance {
    let row = row(&[
        ("id", SqlValue::Int(id)),
        ("title", text(title)),
        ("content", SqlValue::Null),
        ("word_count", SqlValue::Int(0)),
        ("extra", SqlValue::Null),
        ("created_at", text("2021-01-01 00:00:00.000")),
        ("gmt_modified", text("2021-01-01 00:00:00.000")),
        ("deleted_at", SqlValue::Null),
    ]);
    post().instantiate(&row, driver.dialect())
}
