//! Composite column identifiers
//!
//! A column node is addressed as a single dotted token `unit.column`, where
//! `unit` is itself a dotted fully-qualified name. The column name is the
//! segment after the LAST dot; everything before it is the owning unit key.

use serde::{Deserialize, Serialize};

/// A parsed `unit.column` reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    /// Fully-qualified key of the owning unit
    pub unit: String,

    /// Column name within the unit
    pub column: String,
}

impl ColumnRef {
    /// Parse a composite `unit.column` token.
    ///
    /// Splits on the last `.` so the unit key may itself contain dots
    /// (`database.schema.name.column`). A token with no separator is not a
    /// column reference and is rejected.
    pub fn parse(token: &str) -> Result<Self, IdentError> {
        let (unit, column) = token
            .rsplit_once('.')
            .ok_or_else(|| IdentError::MissingSeparator(token.to_string()))?;

        if unit.is_empty() || column.is_empty() {
            return Err(IdentError::MissingSeparator(token.to_string()));
        }

        Ok(Self {
            unit: unit.to_string(),
            column: column.to_string(),
        })
    }

    /// Build the composite token for a unit key and column name
    pub fn key(unit: &str, column: &str) -> String {
        format!("{}.{}", unit, column)
    }
}

impl std::fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.unit, self.column)
    }
}

/// Identifier parsing errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentError {
    #[error("malformed column reference '{0}': expected '<unit>.<column>'")]
    MissingSeparator(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_on_last_dot() {
        let col = ColumnRef::parse("analytics.main.orders.amount").unwrap();
        assert_eq!(col.unit, "analytics.main.orders");
        assert_eq!(col.column, "amount");
    }

    #[test]
    fn bare_token_is_rejected() {
        assert!(matches!(
            ColumnRef::parse("unnamed"),
            Err(IdentError::MissingSeparator(_))
        ));
    }

    #[test]
    fn empty_segments_are_rejected() {
        assert!(ColumnRef::parse(".amount").is_err());
        assert!(ColumnRef::parse("orders.").is_err());
    }

    #[test]
    fn roundtrip_display() {
        let col = ColumnRef::parse("db.schema.orders.id").unwrap();
        assert_eq!(col.to_string(), "db.schema.orders.id");
        assert_eq!(ColumnRef::key("db.schema.orders", "id"), "db.schema.orders.id");
    }
}
