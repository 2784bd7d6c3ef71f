//! Condition trees for WHERE and HAVING clauses.
//!
//! Leaves compare an attribute (or column) with a value; interior nodes
//! combine children with AND/OR/NOT. Names are resolved and values bound by
//! the compiler, never interpolated.

use std::fmt;

use crate::value::Value;

/// A condition node.
///
/// # Example
///
/// ```rust
/// use spellbook_core::Condition;
///
/// let cond = Condition::eq("title", "New Post")
///     .and(Condition::gt("wordCount", 100).or(Condition::is_null("authorId")));
/// assert!(matches!(cond, Condition::And(ref children) if children.len() == 2));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `column op value`
    Compare {
        /// Attribute or column name.
        column: String,
        /// Operator.
        op: CompareOp,
        /// Bound value.
        value: Value,
    },
    /// `column IS NULL`
    IsNull {
        /// Attribute or column name.
        column: String,
    },
    /// `column IS NOT NULL`
    IsNotNull {
        /// Attribute or column name.
        column: String,
    },
    /// `column IN (...)`
    In {
        /// Attribute or column name.
        column: String,
        /// Bound values.
        values: Vec<Value>,
    },
    /// `column NOT IN (...)`
    NotIn {
        /// Attribute or column name.
        column: String,
        /// Bound values.
        values: Vec<Value>,
    },
    /// `column LIKE pattern`
    Like {
        /// Attribute or column name.
        column: String,
        /// Pattern, `%` and `_` are wildcards.
        pattern: String,
    },
    /// `column BETWEEN low AND high`
    Between {
        /// Attribute or column name.
        column: String,
        /// Lower bound.
        low: Value,
        /// Upper bound.
        high: Value,
    },
    /// Compares two columns, e.g. in a join predicate.
    Columns {
        /// Left column.
        left: String,
        /// Operator.
        op: CompareOp,
        /// Right column.
        right: String,
    },
    /// All children hold.
    And(Vec<Condition>),
    /// At least one child holds.
    Or(Vec<Condition>),
    /// Negation.
    Not(Box<Condition>),
    /// Raw SQL with `?` placeholders for `params`.
    ///
    /// **Warning**: the text is emitted as is. Keep values in `params`.
    Raw {
        /// SQL fragment.
        sql: String,
        /// Bound values, one per `?`.
        params: Vec<Value>,
    },
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Equal (=)
    Eq,
    /// Not equal (!=)
    Ne,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    Gte,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    Lte,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq => write!(f, "="),
            Self::Ne => write!(f, "!="),
            Self::Gt => write!(f, ">"),
            Self::Gte => write!(f, ">="),
            Self::Lt => write!(f, "<"),
            Self::Lte => write!(f, "<="),
        }
    }
}

impl Condition {
    fn compare(column: &str, op: CompareOp, value: impl Into<Value>) -> Self {
        Self::Compare {
            column: column.to_string(),
            op,
            value: value.into(),
        }
    }

    /// Creates an equality condition. A null value compiles to `IS NULL`.
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Eq, value)
    }

    /// Creates an inequality condition. A null value compiles to `IS NOT NULL`.
    pub fn ne(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Ne, value)
    }

    /// Creates a greater-than condition.
    pub fn gt(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Gt, value)
    }

    /// Creates a greater-than-or-equal condition.
    pub fn gte(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Gte, value)
    }

    /// Creates a less-than condition.
    pub fn lt(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Lt, value)
    }

    /// Creates a less-than-or-equal condition.
    pub fn lte(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Lte, value)
    }

    /// Creates an IS NULL condition.
    #[must_use]
    pub fn is_null(column: &str) -> Self {
        Self::IsNull {
            column: column.to_string(),
        }
    }

    /// Creates an IS NOT NULL condition.
    #[must_use]
    pub fn is_not_null(column: &str) -> Self {
        Self::IsNotNull {
            column: column.to_string(),
        }
    }

    /// Creates an IN condition. An empty list matches nothing.
    pub fn in_list<V: Into<Value>>(column: &str, values: impl IntoIterator<Item = V>) -> Self {
        Self::In {
            column: column.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a NOT IN condition. An empty list matches everything.
    pub fn not_in_list<V: Into<Value>>(column: &str, values: impl IntoIterator<Item = V>) -> Self {
        Self::NotIn {
            column: column.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a LIKE condition.
    #[must_use]
    pub fn like(column: &str, pattern: &str) -> Self {
        Self::Like {
            column: column.to_string(),
            pattern: pattern.to_string(),
        }
    }

    /// Creates a contains condition (LIKE %value%).
    #[must_use]
    pub fn contains(column: &str, value: &str) -> Self {
        Self::like(column, &format!("%{value}%"))
    }

    /// Creates a BETWEEN condition (low <= column <= high).
    pub fn between(column: &str, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Self::Between {
            column: column.to_string(),
            low: low.into(),
            high: high.into(),
        }
    }

    /// Creates a column-to-column equality.
    #[must_use]
    pub fn columns_eq(left: &str, right: &str) -> Self {
        Self::Columns {
            left: left.to_string(),
            op: CompareOp::Eq,
            right: right.to_string(),
        }
    }

    /// Creates a raw SQL condition.
    pub fn raw<V: Into<Value>>(sql: &str, params: impl IntoIterator<Item = V>) -> Self {
        Self::Raw {
            sql: sql.to_string(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// Combines this condition with another using AND.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match self {
            Self::And(mut children) => {
                children.push(other);
                Self::And(children)
            }
            first => Self::And(vec![first, other]),
        }
    }

    /// Combines this condition with another using OR.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        match self {
            Self::Or(mut children) => {
                children.push(other);
                Self::Or(children)
            }
            first => Self::Or(vec![first, other]),
        }
    }

    /// Negates this condition with NOT.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Collects the attribute or column names this condition references,
    /// `Raw` fragments excluded.
    #[must_use]
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Compare { column, .. }
            | Self::IsNull { column }
            | Self::IsNotNull { column }
            | Self::In { column, .. }
            | Self::NotIn { column, .. }
            | Self::Like { column, .. }
            | Self::Between { column, .. } => out.push(column),
            Self::Columns { left, right, .. } => {
                out.push(left);
                out.push(right);
            }
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.collect_columns(out);
                }
            }
            Self::Not(inner) => inner.collect_columns(out),
            Self::Raw { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_flattens() {
        let cond = Condition::eq("a", 1)
            .and(Condition::eq("b", 2))
            .and(Condition::eq("c", 3));
        match cond {
            Condition::And(children) => assert_eq!(children.len(), 3),
            other => panic!("expected AND, got {other:?}"),
        }
    }

    #[test]
    fn test_or_nests_under_and() {
        let cond = Condition::eq("a", 1).and(Condition::eq("b", 2).or(Condition::eq("c", 3)));
        match cond {
            Condition::And(children) => {
                assert!(matches!(children[1], Condition::Or(ref inner) if inner.len() == 2));
            }
            other => panic!("expected AND, got {other:?}"),
        }
    }

    #[test]
    fn test_contains() {
        assert_eq!(
            Condition::contains("title", "Post"),
            Condition::like("title", "%Post%")
        );
    }

    #[test]
    fn test_columns() {
        let cond = Condition::eq("title", "x")
            .or(Condition::in_list("id", [1, 2]).not())
            .and(Condition::raw("1 = ?", [1]));
        assert_eq!(cond.columns(), vec!["title", "id"]);
    }

    #[test]
    fn test_option_values_become_null() {
        assert_eq!(
            Condition::eq("deletedAt", None::<&str>),
            Condition::Compare {
                column: "deletedAt".to_string(),
                op: CompareOp::Eq,
                value: Value::Null,
            }
        );
    }

    #[test]
    fn test_compare_op_display() {
        assert_eq!(CompareOp::Ne.to_string(), "!=");
        assert_eq!(CompareOp::Lte.to_string(), "<=");
    }
}
