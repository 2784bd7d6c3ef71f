use super::Compiler;
use crate::attribute::{Attribute, TimestampKind};
use crate::error::{Result, SpellError};
use crate::value::{SqlValue, Value, Values};

impl<'a> Compiler<'a> {
    pub(super) fn insert(&mut self) -> Result<String> {
        let (_, body) = self.values_clause()?;
        let mut sql = format!("INSERT INTO {} {body}", self.table());
        if let Some(returning) = self.returning() {
            sql.push(' ');
            sql.push_str(&returning);
        }
        Ok(sql)
    }

    /// Renders `(columns) VALUES (...), (...)` and returns the inserted
    /// attributes in registry order.
    ///
    /// Rows are restricted to attributes and get `createdAt`/`updatedAt`
    /// filled in when absent. Columns are the union over all rows; a row
    /// lacking one binds NULL.
    pub(super) fn values_clause(&mut self) -> Result<(Vec<&'a Attribute>, String)> {
        let spell = self.spell;
        if spell.rows.is_empty() {
            return Err(SpellError::InvalidSpell("insert without rows".to_string()));
        }
        let rows: Vec<Values> = spell
            .rows
            .iter()
            .map(|row| self.prepare_insert_row(row))
            .collect();

        let registry = self.registry;
        let columns: Vec<&'a Attribute> = registry
            .iter()
            .filter(|attribute| rows.iter().any(|row| row.contains_key(attribute.name())))
            .collect();

        if columns.is_empty() {
            if rows.len() > 1 {
                return Err(SpellError::InvalidSpell(
                    "cannot insert several rows without columns".to_string(),
                ));
            }
            return Ok((columns, self.dialect.empty_insert().to_string()));
        }

        let names: Vec<String> = columns
            .iter()
            .map(|attribute| self.quote(attribute.column_name()))
            .collect();
        let mut tuples = Vec::with_capacity(rows.len());
        for row in &rows {
            let placeholders: Vec<String> = columns
                .iter()
                .map(|attribute| {
                    let wire = row
                        .get(attribute.name())
                        .map_or(SqlValue::Null, |value| attribute.uncast(value, self.dialect));
                    self.bind(wire)
                })
                .collect();
            tuples.push(format!("({})", placeholders.join(", ")));
        }
        let body = format!("({}) VALUES {}", names.join(", "), tuples.join(", "));
        Ok((columns, body))
    }

    fn prepare_insert_row(&mut self, row: &Values) -> Values {
        let registry = self.registry;
        let mut row = self.attributes_only(row);
        for kind in [TimestampKind::Created, TimestampKind::Updated] {
            if let Some(attribute) = registry.timestamp(kind) {
                let missing = row.get(attribute.name()).is_none_or(Value::is_null);
                if missing {
                    row.insert(attribute.name().to_string(), Value::Timestamp(self.now()));
                }
            }
        }
        row
    }

    /// `RETURNING pk` for dialects that report generated keys that way.
    pub(super) fn returning(&self) -> Option<String> {
        if !self.dialect.capabilities().returning {
            return None;
        }
        self.registry
            .primary_key()
            .map(|pk| format!("RETURNING {}", self.quote(pk.column_name())))
    }
}
