use super::Compiler;
use crate::dialect::Feature;
use crate::error::Result;

impl Compiler<'_> {
    pub(super) fn select(&mut self) -> Result<String> {
        let spell = self.spell;

        let mut sql = String::from("SELECT ");
        if spell.distinct {
            sql.push_str("DISTINCT ");
        }
        sql.push_str(&self.select_list());
        sql.push_str(" FROM ");
        sql.push_str(&self.table());

        for join in &spell.joins {
            let mut target = self.quote(&join.table);
            if let Some(alias) = &join.alias {
                target = format!("{target} AS {}", self.quote(alias));
            }
            let on = self.condition(&join.on)?;
            sql.push_str(&format!(" {} {target} ON {on}", join.kind.as_sql()));
        }

        if let Some(where_sql) = self.where_clause(true)? {
            sql.push(' ');
            sql.push_str(&where_sql);
        }

        if !spell.group_by.is_empty() {
            let columns: Vec<String> = spell.group_by.iter().map(|c| self.column(c)).collect();
            sql.push_str(&format!(" GROUP BY {}", columns.join(", ")));
        }

        if !spell.having.is_empty() {
            let having = self.junction(&spell.having, " AND ")?;
            sql.push_str(&format!(" HAVING {having}"));
        }

        if let Some(order) = self.order_clause() {
            sql.push(' ');
            sql.push_str(&order);
        }

        if let Some(tail) = self.dialect.limit_offset(spell.limit, spell.offset) {
            sql.push(' ');
            sql.push_str(&tail);
        }

        if let Some(mode) = spell.lock {
            if !self.dialect.capabilities().row_locking {
                return Err(self.capability_error(Feature::RowLocking));
            }
            sql.push(' ');
            sql.push_str(self.dialect.lock_clause(mode));
        }

        Ok(sql)
    }

    fn select_list(&self) -> String {
        let spell = self.spell;
        if let Some(aggregate) = &spell.aggregate {
            let column = self.column(aggregate.column());
            return format!("{} AS {}", aggregate.to_sql(&column), self.quote(aggregate.alias()));
        }
        if spell.columns.is_empty() {
            return if spell.joins.is_empty() {
                "*".to_string()
            } else {
                format!("{}.*", self.table())
            };
        }
        spell
            .columns
            .iter()
            .map(|c| self.column(c))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
