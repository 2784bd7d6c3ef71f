//! Aggregate functions for counting and summarizing spells.

/// An aggregate function applied to a select spell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Aggregate {
    /// COUNT aggregate
    Count {
        /// Attribute to count, or "*" for all rows
        column: String,
        /// Whether to count only distinct values
        distinct: bool,
    },
    /// SUM aggregate
    Sum {
        /// Attribute to sum
        column: String,
    },
    /// AVG aggregate
    Avg {
        /// Attribute to average
        column: String,
    },
    /// MAX aggregate
    Max {
        /// Attribute to find maximum
        column: String,
    },
    /// MIN aggregate
    Min {
        /// Attribute to find minimum
        column: String,
    },
}

impl Aggregate {
    /// Creates a COUNT(*) aggregate.
    #[must_use]
    pub fn count_all() -> Self {
        Self::count("*")
    }

    /// Creates a COUNT(column) aggregate.
    #[must_use]
    pub fn count(column: &str) -> Self {
        Self::Count {
            column: column.to_string(),
            distinct: false,
        }
    }

    /// Creates a COUNT(DISTINCT column) aggregate.
    #[must_use]
    pub fn count_distinct(column: &str) -> Self {
        Self::Count {
            column: column.to_string(),
            distinct: true,
        }
    }

    /// Creates a SUM(column) aggregate.
    #[must_use]
    pub fn sum(column: &str) -> Self {
        Self::Sum {
            column: column.to_string(),
        }
    }

    /// Creates an AVG(column) aggregate.
    #[must_use]
    pub fn avg(column: &str) -> Self {
        Self::Avg {
            column: column.to_string(),
        }
    }

    /// Creates a MAX(column) aggregate.
    #[must_use]
    pub fn max(column: &str) -> Self {
        Self::Max {
            column: column.to_string(),
        }
    }

    /// Creates a MIN(column) aggregate.
    #[must_use]
    pub fn min(column: &str) -> Self {
        Self::Min {
            column: column.to_string(),
        }
    }

    /// Returns the aggregated attribute name.
    #[must_use]
    pub fn column(&self) -> &str {
        match self {
            Self::Count { column, .. }
            | Self::Sum { column }
            | Self::Avg { column }
            | Self::Max { column }
            | Self::Min { column } => column,
        }
    }

    /// Returns the lowercase alias the result column is selected as.
    #[must_use]
    pub const fn alias(&self) -> &'static str {
        match self {
            Self::Count { .. } => "count",
            Self::Sum { .. } => "sum",
            Self::Avg { .. } => "average",
            Self::Max { .. } => "maximum",
            Self::Min { .. } => "minimum",
        }
    }

    /// Renders the aggregate over an already quoted column expression.
    #[must_use]
    pub fn to_sql(&self, column: &str) -> String {
        match self {
            Self::Count { distinct, .. } => {
                if *distinct {
                    format!("COUNT(DISTINCT {column})")
                } else {
                    format!("COUNT({column})")
                }
            }
            Self::Sum { .. } => format!("SUM({column})"),
            Self::Avg { .. } => format!("AVG({column})"),
            Self::Max { .. } => format!("MAX({column})"),
            Self::Min { .. } => format!("MIN({column})"),
        }
    }
}
