//! The spell compiler.
//!
//! [`compile`] is a pure function of a spell, the model's attribute registry
//! and a dialect. It resolves attribute names to columns, binds every value as
//! a parameter, applies the soft-delete scope and rejects what the dialect
//! cannot express before producing any SQL.

mod insert;
mod select;
mod update;
mod upsert;

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::attribute::{Attribute, AttributeRegistry, TimestampKind};
use crate::coerce;
use crate::dialect::{Dialect, Feature};
use crate::error::{Result, SpellError};
use crate::spell::{CompareOp, Command, Condition, OrderDirection, Spell};
use crate::value::{SqlValue, Value, Values};

/// Compiles a spell into SQL text and bound parameters.
///
/// # Errors
///
/// - [`SpellError::Capability`] when the dialect cannot express the spell
/// - [`SpellError::InvalidSpell`] for structurally incomplete spells
/// - [`SpellError::MissingAttribute`] for unknown upsert conflict targets
pub fn compile(
    spell: &Spell,
    registry: &AttributeRegistry,
    dialect: &dyn Dialect,
) -> Result<(String, Vec<SqlValue>)> {
    let mut compiler = Compiler::new(spell, registry, dialect);
    let sql = match spell.command {
        Command::Select => compiler.select()?,
        Command::Insert if spell.options.update_on_duplicate.is_some() => compiler.upsert()?,
        Command::Insert => compiler.insert()?,
        Command::Update => compiler.update()?,
        Command::Delete => compiler.delete()?,
        Command::Upsert => compiler.upsert()?,
    };
    trace!(sql = %sql, params = compiler.params.len(), "compiled spell");
    Ok((sql, compiler.params))
}

struct Compiler<'a> {
    spell: &'a Spell,
    registry: &'a AttributeRegistry,
    dialect: &'a dyn Dialect,
    params: Vec<SqlValue>,
    now: Option<DateTime<Utc>>,
}

impl<'a> Compiler<'a> {
    fn new(spell: &'a Spell, registry: &'a AttributeRegistry, dialect: &'a dyn Dialect) -> Self {
        Self {
            spell,
            registry,
            dialect,
            params: Vec::new(),
            now: None,
        }
    }

    /// One timestamp per compilation, so every auto-filled column agrees.
    fn now(&mut self) -> DateTime<Utc> {
        *self.now.get_or_insert_with(coerce::now)
    }

    fn capability_error(&self, feature: Feature) -> SpellError {
        SpellError::Capability {
            dialect: self.dialect.name(),
            feature,
        }
    }

    fn bind(&mut self, value: SqlValue) -> String {
        self.params.push(value);
        self.dialect.placeholder(self.params.len())
    }

    fn quote(&self, name: &str) -> String {
        self.dialect.quote_identifier(name)
    }

    fn table(&self) -> String {
        self.quote(&self.spell.table)
    }

    /// Resolves an attribute name (or column, or qualified name) to a quoted
    /// column reference.
    fn column(&self, name: &str) -> String {
        if name == "*" {
            return name.to_string();
        }
        if let Some((qualifier, rest)) = name.split_once('.') {
            if qualifier == self.spell.table {
                return format!("{}.{}", self.table(), self.quote(self.registry.unalias(rest)));
            }
            return self.quote(name);
        }
        let column = self.quote(self.registry.unalias(name));
        if self.spell.joins.is_empty() {
            column
        } else {
            format!("{}.{column}", self.table())
        }
    }

    fn attribute_of(&self, name: &str) -> Option<&'a Attribute> {
        let registry = self.registry;
        let bare = match name.split_once('.') {
            Some((qualifier, rest)) if qualifier == self.spell.table => rest,
            Some(_) => return None,
            None => name,
        };
        registry.resolve(bare)
    }

    /// Binds a condition value, uncast through the attribute when the name
    /// resolves to one.
    fn bind_for(&mut self, name: &str, value: &Value) -> String {
        let wire = match self.attribute_of(name) {
            Some(attribute) => attribute.uncast(value, self.dialect),
            None => coerce::to_wire(value, self.dialect),
        };
        self.bind(wire)
    }

    fn condition(&mut self, condition: &Condition) -> Result<String> {
        let sql = match condition {
            Condition::Compare { column, op, value } => {
                let col = self.column(column);
                match (op, value) {
                    (CompareOp::Eq, Value::Null) => format!("{col} IS NULL"),
                    (CompareOp::Ne, Value::Null) => format!("{col} IS NOT NULL"),
                    _ => {
                        let placeholder = self.bind_for(column, value);
                        format!("{col} {op} {placeholder}")
                    }
                }
            }
            Condition::IsNull { column } => format!("{} IS NULL", self.column(column)),
            Condition::IsNotNull { column } => format!("{} IS NOT NULL", self.column(column)),
            Condition::In { column, values } => {
                if values.is_empty() {
                    return Ok("1 = 0".to_string());
                }
                let col = self.column(column);
                let placeholders = self.bind_list(column, values);
                format!("{col} IN ({placeholders})")
            }
            Condition::NotIn { column, values } => {
                if values.is_empty() {
                    return Ok("1 = 1".to_string());
                }
                let col = self.column(column);
                let placeholders = self.bind_list(column, values);
                format!("{col} NOT IN ({placeholders})")
            }
            Condition::Like { column, pattern } => {
                let col = self.column(column);
                let placeholder = self.bind(SqlValue::Text(pattern.clone()));
                format!("{col} LIKE {placeholder}")
            }
            Condition::Between { column, low, high } => {
                let col = self.column(column);
                let low = self.bind_for(column, low);
                let high = self.bind_for(column, high);
                format!("{col} BETWEEN {low} AND {high}")
            }
            Condition::Columns { left, op, right } => {
                format!("{} {op} {}", self.column(left), self.column(right))
            }
            Condition::And(children) => self.junction(children, " AND ")?,
            Condition::Or(children) => self.junction(children, " OR ")?,
            Condition::Not(inner) => format!("NOT ({})", self.condition(inner)?),
            Condition::Raw { sql, params } => self.raw(sql, params)?,
        };
        Ok(sql)
    }

    fn bind_list(&mut self, column: &str, values: &[Value]) -> String {
        values
            .iter()
            .map(|value| self.bind_for(column, value))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Joins children, parenthesizing the composite ones.
    fn junction(&mut self, children: &[Condition], separator: &str) -> Result<String> {
        if children.is_empty() {
            let neutral = if separator == " OR " { "1 = 0" } else { "1 = 1" };
            return Ok(neutral.to_string());
        }
        let mut parts = Vec::with_capacity(children.len());
        for child in children {
            let sql = self.condition(child)?;
            let composite = match child {
                Condition::And(inner) | Condition::Or(inner) => inner.len() > 1,
                Condition::Raw { .. } => true,
                _ => false,
            };
            if composite && children.len() > 1 {
                parts.push(format!("({sql})"));
            } else {
                parts.push(sql);
            }
        }
        Ok(parts.join(separator))
    }

    /// Rewrites `?` markers of a raw fragment into dialect placeholders.
    fn raw(&mut self, sql: &str, params: &[Value]) -> Result<String> {
        let markers = sql.matches('?').count();
        if markers != params.len() {
            return Err(SpellError::InvalidSpell(format!(
                "raw condition `{sql}` has {markers} placeholders but {} parameters",
                params.len()
            )));
        }
        let mut out = String::with_capacity(sql.len());
        let mut values = params.iter();
        for ch in sql.chars() {
            if ch == '?' {
                if let Some(value) = values.next() {
                    let wire = coerce::to_wire(value, self.dialect);
                    out.push_str(&self.bind(wire));
                    continue;
                }
            }
            out.push(ch);
        }
        Ok(out)
    }

    /// The deleted marker when the paranoid scope applies to this spell.
    fn paranoid_marker(&self) -> Option<&'a Attribute> {
        let spell = self.spell;
        if spell.unscoped || spell.unparanoid {
            return None;
        }
        self.registry.timestamp(TimestampKind::Deleted)
    }

    /// Renders `WHERE ...` from the spell's conditions plus, when `scoped`,
    /// the paranoid predicate.
    fn where_clause(&mut self, scoped: bool) -> Result<Option<String>> {
        let spell = self.spell;
        let mut conditions = spell.conditions.clone();
        if scoped {
            if let Some(marker) = self.paranoid_marker() {
                conditions.push(Condition::is_null(marker.name()));
            }
        }
        if conditions.is_empty() {
            return Ok(None);
        }
        let sql = self.junction(&conditions, " AND ")?;
        Ok(Some(format!("WHERE {sql}")))
    }

    fn order_clause(&self) -> Option<String> {
        let spell = self.spell;
        if spell.order_by.is_empty() {
            return None;
        }
        let parts: Vec<String> = spell
            .order_by
            .iter()
            .map(|order| {
                let direction = match order.direction {
                    OrderDirection::Asc => "ASC",
                    OrderDirection::Desc => "DESC",
                };
                format!("{} {direction}", self.column(&order.column))
            })
            .collect();
        Some(format!("ORDER BY {}", parts.join(", ")))
    }

    /// Keeps the attributes of a write payload, dropping everything else.
    fn attributes_only(&self, row: &Values) -> Values {
        row.iter()
            .filter(|(name, _)| {
                let known = self.registry.has_attribute(name);
                if !known {
                    trace!(model = self.registry.model(), attribute = %name, "dropping non-attribute from write");
                }
                known
            })
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}
