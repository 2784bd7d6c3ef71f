use super::Compiler;
use crate::attribute::TimestampKind;
use crate::dialect::Feature;
use crate::error::{Result, SpellError};
use crate::value::Value;

impl Compiler<'_> {
    pub(super) fn update(&mut self) -> Result<String> {
        let spell = self.spell;
        self.reject_joins()?;

        let payload = spell
            .rows
            .first()
            .ok_or_else(|| SpellError::InvalidSpell("update without values".to_string()))?;
        let mut values = self.attributes_only(payload);
        if let Some(fields) = spell.options.field_filter() {
            values.retain(|name, _| fields.contains(name));
        }
        let registry = self.registry;
        if !spell.options.silent {
            if let Some(updated) = registry.timestamp(TimestampKind::Updated) {
                if !values.contains_key(updated.name()) {
                    values.insert(updated.name().to_string(), Value::Timestamp(self.now()));
                }
            }
        }
        if values.is_empty() {
            return Err(SpellError::InvalidSpell("update without values".to_string()));
        }

        let mut assignments = Vec::with_capacity(values.len());
        for attribute in registry.iter() {
            if let Some(value) = values.get(attribute.name()) {
                let column = self.quote(attribute.column_name());
                let placeholder = self.bind(attribute.uncast(value, self.dialect));
                assignments.push(format!("{column} = {placeholder}"));
            }
        }

        let mut sql = format!("UPDATE {} SET {}", self.table(), assignments.join(", "));
        self.finish_dml(&mut sql, true)?;
        Ok(sql)
    }

    /// Compiles a delete. Paranoid models get their deleted marker set
    /// instead, unless the spell is forced, unscoped or unparanoid.
    pub(super) fn delete(&mut self) -> Result<String> {
        let spell = self.spell;
        self.reject_joins()?;

        let soft = if spell.options.force {
            None
        } else {
            self.paranoid_marker()
        };

        let mut sql = if let Some(marker) = soft {
            let now = Value::Timestamp(self.now());
            let column = self.quote(marker.column_name());
            let placeholder = self.bind(marker.uncast(&now, self.dialect));
            format!("UPDATE {} SET {column} = {placeholder}", self.table())
        } else {
            format!("DELETE FROM {}", self.table())
        };
        self.finish_dml(&mut sql, soft.is_some())?;
        Ok(sql)
    }

    fn reject_joins(&self) -> Result<()> {
        if self.spell.joins.is_empty() {
            Ok(())
        } else {
            Err(SpellError::InvalidSpell(
                "joins are only supported on select".to_string(),
            ))
        }
    }

    /// Appends WHERE and the bounded tail of an UPDATE or DELETE.
    fn finish_dml(&mut self, sql: &mut String, scoped: bool) -> Result<()> {
        let spell = self.spell;
        if spell.offset.is_some() {
            return Err(self.capability_error(Feature::DmlOffset));
        }
        let bounded = spell.limit.is_some() || !spell.order_by.is_empty();
        if bounded && !self.dialect.capabilities().bounded_dml {
            return Err(self.capability_error(Feature::BoundedDml));
        }

        if let Some(where_sql) = self.where_clause(scoped)? {
            sql.push(' ');
            sql.push_str(&where_sql);
        }
        if let Some(order) = self.order_clause() {
            sql.push(' ');
            sql.push_str(&order);
        }
        if let Some(limit) = spell.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::dialect::{MysqlDialect, PostgresDialect, SqliteDialect};
    use crate::{
        compile, values, Attribute, AttributeRegistry, Condition, DataType, Feature, Spell,
        SpellError, SqlValue, WriteOptions,
    };

    fn posts() -> AttributeRegistry {
        let mut registry = AttributeRegistry::new("Post");
        registry
            .define("id", Attribute::new(DataType::BigInt).primary_key())
            .unwrap();
        registry.define("title", DataType::String).unwrap();
        registry.define("updatedAt", DataType::DateTime).unwrap();
        registry.define("deletedAt", DataType::DateTime).unwrap();
        registry
    }

    fn users() -> AttributeRegistry {
        let mut registry = AttributeRegistry::new("User");
        registry
            .define("id", Attribute::new(DataType::BigInt).primary_key())
            .unwrap();
        registry.define("nickname", DataType::String).unwrap();
        registry
    }

    #[test]
    fn test_update_bumps_updated_at() {
        let spell = Spell::update("posts", values! { "title" => "B" }).filter(Condition::eq("id", 1));
        let (sql, params) = compile(&spell, &posts(), &SqliteDialect).unwrap();
        assert_eq!(
            sql,
            "UPDATE \"posts\" SET \"title\" = ?, \"updated_at\" = ? \
             WHERE \"id\" = ? AND \"deleted_at\" IS NULL"
        );
        assert_eq!(params.len(), 3);

        let (sql, params) = compile(&spell.silent(), &posts(), &SqliteDialect).unwrap();
        assert_eq!(
            sql,
            "UPDATE \"posts\" SET \"title\" = ? WHERE \"id\" = ? AND \"deleted_at\" IS NULL"
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_update_honors_fields() {
        let spell = Spell::update("users", values! { "nickname" => "x", "id" => 2 })
            .with_options(WriteOptions::new().fields(["nickname"]));
        let (sql, _) = compile(&spell, &users(), &MysqlDialect).unwrap();
        assert_eq!(sql, "UPDATE `users` SET `nickname` = ?");
    }

    #[test]
    fn test_update_without_values() {
        let spell = Spell::update("users", values! { "foo" => 1 });
        assert!(matches!(
            compile(&spell, &users(), &SqliteDialect),
            Err(SpellError::InvalidSpell(_))
        ));
    }

    #[test]
    fn test_bounded_update_is_dialect_specific() {
        let spell = Spell::update("users", values! { "nickname" => "x" })
            .order("id")
            .limit(1);
        let (sql, _) = compile(&spell, &users(), &MysqlDialect).unwrap();
        assert_eq!(sql, "UPDATE `users` SET `nickname` = ? ORDER BY `id` ASC LIMIT 1");

        for dialect in [&SqliteDialect as &dyn crate::Dialect, &PostgresDialect] {
            let err = compile(&spell, &users(), dialect).unwrap_err();
            assert!(matches!(
                err,
                SpellError::Capability { feature: Feature::BoundedDml, .. }
            ));
        }

        let spell = Spell::delete("users").offset(3);
        let err = compile(&spell, &users(), &MysqlDialect).unwrap_err();
        assert!(matches!(err, SpellError::Capability { feature: Feature::DmlOffset, .. }));
    }

    #[test]
    fn test_soft_delete() {
        let spell = Spell::delete("posts").filter(Condition::eq("id", 1));
        let (sql, params) = compile(&spell, &posts(), &SqliteDialect).unwrap();
        assert_eq!(
            sql,
            "UPDATE \"posts\" SET \"deleted_at\" = ? WHERE \"id\" = ? AND \"deleted_at\" IS NULL"
        );
        assert!(matches!(params[0], SqlValue::Text(_)));
        assert_eq!(params[1], SqlValue::Int(1));
    }

    #[test]
    fn test_forced_delete() {
        let spell = Spell::delete("posts").filter(Condition::eq("id", 1));
        for forced in [spell.clone().force(), spell.clone().unparanoid(), spell.unscoped()] {
            let (sql, _) = compile(&forced, &posts(), &PostgresDialect).unwrap();
            assert_eq!(sql, "DELETE FROM \"posts\" WHERE \"id\" = $1");
        }
    }

    #[test]
    fn test_plain_delete() {
        let spell = Spell::delete("users").filter(Condition::in_list("id", [1, 2]));
        let (sql, _) = compile(&spell, &users(), &MysqlDialect).unwrap();
        assert_eq!(sql, "DELETE FROM `users` WHERE `id` IN (?, ?)");
    }
}
