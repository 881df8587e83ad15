//! Attribute filter predicates.
//!
//! Filters are built as a small intermediate representation and rendered
//! to the service's SQL-like `where` string at the query boundary, so the
//! escaping rules live in exactly one place.

use std::fmt;

/// A boolean attribute predicate over a feature layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every feature (`1=1`).
    All,
    /// Field equality against a literal value.
    Eq {
        field: String,
        value: String,
        /// Case-insensitive comparison (`UPPER(field) = UPPER('value')`).
        fold_case: bool,
    },
    /// Conjunction of predicates.
    And(Vec<Predicate>),
}

impl Predicate {
    /// Case-sensitive equality.
    pub fn eq(field: &str, value: &str) -> Self {
        Self::Eq {
            field: field.to_string(),
            value: value.to_string(),
            fold_case: false,
        }
    }

    /// Case-insensitive equality.
    pub fn eq_fold(field: &str, value: &str) -> Self {
        Self::Eq {
            field: field.to_string(),
            value: value.to_string(),
            fold_case: true,
        }
    }

    /// Conjunction; trivial members are dropped and an empty list matches all.
    pub fn and(clauses: Vec<Predicate>) -> Self {
        let mut clauses: Vec<Predicate> = clauses
            .into_iter()
            .filter(|clause| !matches!(clause, Predicate::All))
            .collect();
        match clauses.len() {
            0 => Predicate::All,
            1 => clauses.remove(0),
            _ => Predicate::And(clauses),
        }
    }

    /// Renders the predicate to the wire format.
    pub fn to_sql(&self) -> String {
        match self {
            Predicate::All => "1=1".to_string(),
            Predicate::Eq {
                field,
                value,
                fold_case,
            } => {
                let literal = escape(value);
                if *fold_case {
                    format!("UPPER({field}) = UPPER('{literal}')")
                } else {
                    format!("{field} = '{literal}'")
                }
            }
            Predicate::And(clauses) => clauses
                .iter()
                .map(Predicate::to_sql)
                .collect::<Vec<_>>()
                .join(" AND "),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

/// Escapes a string literal by doubling embedded quotes.
fn escape(value: &str) -> String {
    value.replace('\'', "''")
}
