//! The query spell: a value-like description of one query or mutation.
//!
//! Spells are built by chaining. Every chain method consumes the receiver
//! and returns the derived spell; clone first to keep the base around:
//!
//! ```rust
//! use spellbook_core::{Condition, Spell};
//!
//! let base = Spell::select("posts").filter(Condition::eq("title", "New Post"));
//! let first = base.clone().order("-id").limit(1);
//!
//! assert_eq!(base.limit, None);
//! assert_eq!(first.limit, Some(1));
//! ```
//!
//! A spell holds no results. Compiling it twice yields the same SQL and
//! running it twice queries the database twice.

mod aggregate;
mod condition;

pub use aggregate::Aggregate;
pub use condition::{CompareOp, Condition};

use crate::value::Values;

/// The statement a spell compiles to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// SELECT
    Select,
    /// INSERT of one or many rows.
    Insert,
    /// UPDATE
    Update,
    /// DELETE, or an UPDATE of the deleted marker for paranoid models.
    Delete,
    /// INSERT with conflict resolution.
    Upsert,
}

/// Row lock requested by a select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// `FOR UPDATE`
    Update,
    /// `FOR SHARE` (`LOCK IN SHARE MODE` on MySQL)
    Share,
}

/// Join types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// INNER JOIN
    Inner,
    /// LEFT JOIN
    Left,
    /// RIGHT JOIN
    Right,
}

impl JoinKind {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
        }
    }
}

/// A joined table.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// Join type.
    pub kind: JoinKind,
    /// Joined table.
    pub table: String,
    /// Optional alias of the joined table.
    pub alias: Option<String>,
    /// Join predicate. Names qualified with the joined table (or alias) are
    /// quoted as given, the others are resolved against the spell's model.
    pub on: Condition,
}

/// Order direction for sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    /// Ascending order (ASC)
    Asc,
    /// Descending order (DESC)
    Desc,
}

/// An ordering specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Attribute or column to order by
    pub column: String,
    /// Order direction
    pub direction: OrderDirection,
}

impl OrderBy {
    /// Creates a new ascending order specification.
    #[must_use]
    pub fn asc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            direction: OrderDirection::Asc,
        }
    }

    /// Creates a new descending order specification.
    #[must_use]
    pub fn desc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            direction: OrderDirection::Desc,
        }
    }

    /// Parses an order specification.
    ///
    /// Accepts `"-createdAt"`, `"createdAt DESC"`, `"createdAt asc"` and a
    /// bare name for ascending order.
    #[must_use]
    pub fn parse(spec: &str) -> Self {
        let spec = spec.trim();
        if let Some(column) = spec.strip_prefix('-') {
            return Self::desc(column.trim());
        }
        match spec.rsplit_once(char::is_whitespace) {
            Some((column, dir)) if dir.eq_ignore_ascii_case("desc") => Self::desc(column.trim()),
            Some((column, dir)) if dir.eq_ignore_ascii_case("asc") => Self::asc(column.trim()),
            _ => Self::asc(spec),
        }
    }

    /// Returns the same column in the opposite direction.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            column: self.column.clone(),
            direction: match self.direction {
                OrderDirection::Asc => OrderDirection::Desc,
                OrderDirection::Desc => OrderDirection::Asc,
            },
        }
    }
}

/// Which columns an insert rewrites when it hits an existing row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOnDuplicate {
    /// Every inserted column except the key and `createdAt`.
    All,
    /// Exactly these attributes, plus `updatedAt` unless the write is silent.
    Only(Vec<String>),
}

/// Options of a write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Leave `updatedAt` alone.
    pub silent: bool,
    /// Restrict the write to these attributes. An empty list means all.
    pub fields: Option<Vec<String>>,
    /// Bypass soft deletion.
    pub force: bool,
    /// Turn an insert into an upsert.
    pub update_on_duplicate: Option<UpdateOnDuplicate>,
    /// Explicit conflict target of an upsert.
    pub unique_keys: Option<Vec<String>>,
}

impl WriteOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the write silent.
    #[must_use]
    pub const fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    /// Forces physical deletion.
    #[must_use]
    pub const fn force(mut self) -> Self {
        self.force = true;
        self
    }

    /// Restricts the write to `fields`.
    #[must_use]
    pub fn fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the update-on-duplicate strategy.
    #[must_use]
    pub fn update_on_duplicate(mut self, strategy: UpdateOnDuplicate) -> Self {
        self.update_on_duplicate = Some(strategy);
        self
    }

    /// Sets the explicit upsert conflict target.
    #[must_use]
    pub fn unique_keys<S: Into<String>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.unique_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Returns the `fields` restriction, with an empty list read as none.
    #[must_use]
    pub fn field_filter(&self) -> Option<&[String]> {
        self.fields.as_deref().filter(|fields| !fields.is_empty())
    }
}

/// One query or mutation intent.
#[derive(Debug, Clone, PartialEq)]
pub struct Spell {
    /// Statement kind.
    pub command: Command,
    /// Target table.
    pub table: String,
    /// Selected attributes; empty selects everything.
    pub columns: Vec<String>,
    /// Aggregate replacing the selected columns.
    pub aggregate: Option<Aggregate>,
    /// SELECT DISTINCT
    pub distinct: bool,
    /// WHERE conditions, combined with AND.
    pub conditions: Vec<Condition>,
    /// Joined tables.
    pub joins: Vec<Join>,
    /// GROUP BY attributes.
    pub group_by: Vec<String>,
    /// HAVING conditions, combined with AND.
    pub having: Vec<Condition>,
    /// ORDER BY
    pub order_by: Vec<OrderBy>,
    /// LIMIT
    pub limit: Option<u64>,
    /// OFFSET
    pub offset: Option<u64>,
    /// Row lock.
    pub lock: Option<LockMode>,
    /// Value rows of inserts and upserts, the assignments of an update.
    pub rows: Vec<Values>,
    /// Skip every scope, the paranoid one included.
    pub unscoped: bool,
    /// Skip the paranoid scope.
    pub unparanoid: bool,
    /// Write options.
    pub options: WriteOptions,
}

impl Spell {
    fn new(command: Command, table: &str, rows: Vec<Values>) -> Self {
        Self {
            command,
            table: table.to_string(),
            columns: Vec::new(),
            aggregate: None,
            distinct: false,
            conditions: Vec::new(),
            joins: Vec::new(),
            group_by: Vec::new(),
            having: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            lock: None,
            rows,
            unscoped: false,
            unparanoid: false,
            options: WriteOptions::default(),
        }
    }

    /// Creates a select spell.
    #[must_use]
    pub fn select(table: &str) -> Self {
        Self::new(Command::Select, table, Vec::new())
    }

    /// Creates an insert of one row.
    #[must_use]
    pub fn insert(table: &str, values: Values) -> Self {
        Self::new(Command::Insert, table, vec![values])
    }

    /// Creates an insert of many rows.
    #[must_use]
    pub fn bulk_insert(table: &str, rows: Vec<Values>) -> Self {
        Self::new(Command::Insert, table, rows)
    }

    /// Creates an update assigning `values`.
    #[must_use]
    pub fn update(table: &str, values: Values) -> Self {
        Self::new(Command::Update, table, vec![values])
    }

    /// Creates a delete.
    #[must_use]
    pub fn delete(table: &str) -> Self {
        Self::new(Command::Delete, table, Vec::new())
    }

    /// Creates an upsert of one row.
    #[must_use]
    pub fn upsert(table: &str, values: Values) -> Self {
        Self::new(Command::Upsert, table, vec![values])
    }

    /// Selects only these attributes.
    #[must_use]
    pub fn columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a WHERE condition.
    #[must_use]
    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Adds a negated WHERE condition.
    #[must_use]
    pub fn exclude(mut self, condition: Condition) -> Self {
        self.conditions.push(condition.not());
        self
    }

    /// Adds a join.
    #[must_use]
    pub fn join(mut self, kind: JoinKind, table: &str, alias: Option<&str>, on: Condition) -> Self {
        self.joins.push(Join {
            kind,
            table: table.to_string(),
            alias: alias.map(ToString::to_string),
            on,
        });
        self
    }

    /// Groups by these attributes.
    #[must_use]
    pub fn group<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.group_by.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Adds a HAVING condition.
    #[must_use]
    pub fn having(mut self, condition: Condition) -> Self {
        self.having.push(condition);
        self
    }

    /// Adds an ordering, see [`OrderBy::parse`].
    #[must_use]
    pub fn order(mut self, spec: &str) -> Self {
        self.order_by.push(OrderBy::parse(spec));
        self
    }

    /// Adds an ordering.
    #[must_use]
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    /// Sets LIMIT.
    #[must_use]
    pub const fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Sets OFFSET.
    #[must_use]
    pub const fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Locks the selected rows.
    #[must_use]
    pub const fn lock(mut self, mode: LockMode) -> Self {
        self.lock = Some(mode);
        self
    }

    /// Skips every scope.
    #[must_use]
    pub const fn unscoped(mut self) -> Self {
        self.unscoped = true;
        self
    }

    /// Skips the paranoid scope.
    #[must_use]
    pub const fn unparanoid(mut self) -> Self {
        self.unparanoid = true;
        self
    }

    /// Replaces the write options.
    #[must_use]
    pub fn with_options(mut self, options: WriteOptions) -> Self {
        self.options = options;
        self
    }

    /// Marks the write silent.
    #[must_use]
    pub const fn silent(mut self) -> Self {
        self.options.silent = true;
        self
    }

    /// Forces physical deletion.
    #[must_use]
    pub const fn force(mut self) -> Self {
        self.options.force = true;
        self
    }

    /// Selects an aggregate instead of rows.
    #[must_use]
    pub fn aggregate(mut self, aggregate: Aggregate) -> Self {
        self.aggregate = Some(aggregate);
        self
    }

    /// Selects distinct rows.
    #[must_use]
    pub const fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Turns the spell into another statement over the same table and
    /// conditions, e.g. a filtered select into an update.
    #[must_use]
    pub fn with_command(mut self, command: Command, rows: Vec<Values>) -> Self {
        self.command = command;
        self.rows = rows;
        self
    }
}
