use super::Compiler;
use crate::attribute::{Attribute, TimestampKind};
use crate::dialect::{Feature, UpsertStyle};
use crate::error::{Result, SpellError};
use crate::spell::UpdateOnDuplicate;

impl<'a> Compiler<'a> {
    /// Compiles an insert that updates the conflicting row instead of
    /// failing.
    pub(super) fn upsert(&mut self) -> Result<String> {
        let spell = self.spell;
        let capabilities = self.dialect.capabilities();
        if spell.rows.len() > 1 && !capabilities.multi_row_upsert {
            return Err(self.capability_error(Feature::MultiRowUpsert));
        }
        if spell.options.unique_keys.is_some() && !capabilities.conflict_target {
            return Err(self.capability_error(Feature::ConflictTarget));
        }

        let (columns, body) = self.values_clause()?;
        let table = self.table();

        match capabilities.upsert {
            UpsertStyle::OnDuplicateKey => {
                let pk = self.registry.primary_key();
                let exclude: Vec<&str> = pk.iter().map(|a| a.name()).collect();
                let mut sets = Vec::new();
                if let Some(pk) = pk {
                    let column = self.quote(pk.column_name());
                    sets.push(format!("{column} = LAST_INSERT_ID({column})"));
                }
                for attribute in self.update_columns(&columns, &exclude) {
                    let column = self.quote(attribute.column_name());
                    sets.push(format!("{column} = VALUES({column})"));
                }
                if sets.is_empty() {
                    return Err(SpellError::InvalidSpell(
                        "upsert without primary key or columns to update".to_string(),
                    ));
                }
                Ok(format!(
                    "INSERT INTO {table} {body} ON DUPLICATE KEY UPDATE {}",
                    sets.join(", ")
                ))
            }
            UpsertStyle::OnConflict => {
                let targets = self.conflict_target(&columns)?;
                let exclude: Vec<&str> = targets.iter().map(|a| a.name()).collect();
                let sets: Vec<String> = self
                    .update_columns(&columns, &exclude)
                    .into_iter()
                    .map(|attribute| {
                        let column = self.quote(attribute.column_name());
                        format!("{column} = excluded.{column}")
                    })
                    .collect();
                let target = targets
                    .iter()
                    .map(|a| self.quote(a.column_name()))
                    .collect::<Vec<_>>()
                    .join(", ");
                let action = if sets.is_empty() {
                    "DO NOTHING".to_string()
                } else {
                    format!("DO UPDATE SET {}", sets.join(", "))
                };
                let mut sql = format!("INSERT INTO {table} {body} ON CONFLICT ({target}) {action}");
                if let Some(returning) = self.returning() {
                    sql.push(' ');
                    sql.push_str(&returning);
                }
                Ok(sql)
            }
        }
    }

    /// Picks the conflict target: explicit unique keys, else the primary key
    /// when it is inserted, else the first inserted unique attribute, else the
    /// primary key.
    fn conflict_target(&self, columns: &[&'a Attribute]) -> Result<Vec<&'a Attribute>> {
        let registry = self.registry;
        if let Some(keys) = &self.spell.options.unique_keys {
            return keys.iter().map(|key| registry.require(key)).collect();
        }
        let pk = registry.primary_key();
        if let Some(pk) = pk.filter(|pk| columns.iter().any(|c| c.name() == pk.name())) {
            return Ok(vec![pk]);
        }
        if let Some(unique) = columns.iter().find(|c| c.is_unique()) {
            return Ok(vec![*unique]);
        }
        pk.map(|pk| vec![pk])
            .ok_or_else(|| SpellError::InvalidSpell("upsert without conflict target".to_string()))
    }

    /// Columns rewritten on conflict, in registry order.
    fn update_columns(&self, columns: &[&'a Attribute], exclude: &[&str]) -> Vec<&'a Attribute> {
        let registry = self.registry;
        let options = &self.spell.options;
        let created = registry.timestamp(TimestampKind::Created).map(Attribute::name);
        let updated = registry.timestamp(TimestampKind::Updated).map(Attribute::name);
        let supplied = |name: &str| self.spell.rows.iter().any(|row| row.contains_key(name));

        let strategy = options
            .update_on_duplicate
            .clone()
            .unwrap_or(UpdateOnDuplicate::All);
        columns
            .iter()
            .copied()
            .filter(|attribute| {
                let name = attribute.name();
                if exclude.contains(&name) || attribute.is_primary_key() {
                    return false;
                }
                let is_updated = Some(name) == updated;
                if is_updated && options.silent && !supplied(name) {
                    return false;
                }
                match &strategy {
                    UpdateOnDuplicate::All => Some(name) != created,
                    UpdateOnDuplicate::Only(names) => {
                        names.iter().any(|n| n == name) || (is_updated && !options.silent)
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::dialect::{MysqlDialect, PostgresDialect, SqliteDialect};
    use crate::{
        compile, values, Attribute, AttributeRegistry, DataType, Feature, Spell, SpellError,
        UpdateOnDuplicate, WriteOptions,
    };

    fn books() -> AttributeRegistry {
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

    fn users() -> AttributeRegistry {
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

    #[test]
    fn test_mysql_upsert() {
        let spell = Spell::upsert("books", values! { "isbn" => 1, "name" => "Dark Souls" });
        let (sql, params) = compile(&spell, &books(), &MysqlDialect).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO `books` (`isbn`, `name`, `created_at`, `updated_at`) VALUES (?, ?, ?, ?) \
             ON DUPLICATE KEY UPDATE `isbn` = LAST_INSERT_ID(`isbn`), `name` = VALUES(`name`), \
             `updated_at` = VALUES(`updated_at`)"
        );
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_on_conflict_upsert() {
        let spell = Spell::upsert("books", values! { "isbn" => 1, "name" => "Dark Souls" });
        let (sql, _) = compile(&spell, &books(), &SqliteDialect).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO \"books\" (\"isbn\", \"name\", \"created_at\", \"updated_at\") \
             VALUES (?, ?, ?, ?) ON CONFLICT (\"isbn\") \
             DO UPDATE SET \"name\" = excluded.\"name\", \"updated_at\" = excluded.\"updated_at\""
        );

        let (sql, _) = compile(&spell, &books(), &PostgresDialect).unwrap();
        assert!(sql.ends_with("RETURNING \"isbn\""));
        assert!(sql.contains("VALUES ($1, $2, $3, $4)"));
    }

    #[test]
    fn test_silent_upsert_leaves_updated_at() {
        let spell = Spell::upsert("books", values! { "isbn" => 1, "name" => "Dark Souls" }).silent();
        let (sql, _) = compile(&spell, &books(), &SqliteDialect).unwrap();
        assert!(sql.ends_with("DO UPDATE SET \"name\" = excluded.\"name\""));
    }

    #[test]
    fn test_update_on_duplicate_subset() {
        let rows = vec![
            values! { "isbn" => 1, "name" => "A", "price" => 1.0 },
            values! { "isbn" => 2, "name" => "B", "price" => 2.0 },
        ];
        let options = WriteOptions::new()
            .update_on_duplicate(UpdateOnDuplicate::Only(vec!["price".to_string()]));
        let spell = Spell::bulk_insert("books", rows.clone()).with_options(options.clone());
        let (sql, _) = compile(&spell, &books(), &SqliteDialect).unwrap();
        assert!(sql.ends_with(
            "DO UPDATE SET \"price\" = excluded.\"price\", \"updated_at\" = excluded.\"updated_at\""
        ));

        let spell = Spell::bulk_insert("books", rows).with_options(options.silent());
        let (sql, _) = compile(&spell, &books(), &MysqlDialect).unwrap();
        assert!(sql.ends_with(
            "ON DUPLICATE KEY UPDATE `isbn` = LAST_INSERT_ID(`isbn`), `price` = VALUES(`price`)"
        ));
    }

    #[test]
    fn test_conflict_target_falls_back_to_unique() {
        let spell = Spell::upsert("users", values! { "email" => "a@b.c", "nickname" => "x" });
        let (sql, _) = compile(&spell, &users(), &SqliteDialect).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO \"users\" (\"email\", \"nickname\") VALUES (?, ?) \
             ON CONFLICT (\"email\") DO UPDATE SET \"nickname\" = excluded.\"nickname\""
        );
    }

    #[test]
    fn test_explicit_unique_keys() {
        let spell = Spell::upsert("users", values! { "email" => "a@b.c", "nickname" => "x" })
            .with_options(WriteOptions::new().unique_keys(["nickname"]));
        let (sql, _) = compile(&spell, &users(), &PostgresDialect).unwrap();
        assert!(sql.contains("ON CONFLICT (\"nickname\") DO UPDATE SET \"email\" = excluded.\"email\""));

        let err = compile(&spell, &users(), &MysqlDialect).unwrap_err();
        assert!(matches!(err, SpellError::Capability { feature: Feature::ConflictTarget, .. }));

        let spell = Spell::upsert("users", values! { "email" => "a@b.c" })
            .with_options(WriteOptions::new().unique_keys(["missing"]));
        assert!(matches!(
            compile(&spell, &users(), &SqliteDialect),
            Err(SpellError::MissingAttribute { .. })
        ));
    }

    #[test]
    fn test_do_nothing_when_only_keys_are_inserted() {
        let spell = Spell::upsert("users", values! { "id" => 1 });
        let (sql, _) = compile(&spell, &users(), &SqliteDialect).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO \"users\" (\"id\") VALUES (?) ON CONFLICT (\"id\") DO NOTHING"
        );
    }
}
