//! Filter predicates ("domains") used to select records
//!
//! On the wire a domain is a JSON array of 3-element arrays:
//!
//! ```json
//! [["name", "ilike", "acme"], ["id", ">", 10]]
//! ```
//!
//! All predicates are combined with logical AND.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::core::field::RecordId;

/// Comparison operator of a predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not in")]
    NotIn,
    #[serde(rename = "like")]
    Like,
    #[serde(rename = "ilike")]
    ILike,
    #[serde(rename = "=like")]
    EqLike,
    #[serde(rename = "=ilike")]
    EqILike,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::In => "in",
            Operator::NotIn => "not in",
            Operator::Like => "like",
            Operator::ILike => "ilike",
            Operator::EqLike => "=like",
            Operator::EqILike => "=ilike",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `(field, operator, value)` triple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(String, Operator, Value)", into = "(String, Operator, Value)")]
pub struct Predicate {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

impl Predicate {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Equality predicate pinning the record identifier
    pub fn id_eq(id: RecordId) -> Self {
        Self::new("id", Operator::Eq, id)
    }
}

impl From<(String, Operator, Value)> for Predicate {
    fn from((field, operator, value): (String, Operator, Value)) -> Self {
        Self {
            field,
            operator,
            value,
        }
    }
}

impl From<Predicate> for (String, Operator, Value) {
    fn from(p: Predicate) -> Self {
        (p.field, p.operator, p.value)
    }
}

/// Ordered list of predicates (implicit AND)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Domain(Vec<Predicate>);

impl Domain {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Domain selecting exactly one record by id
    pub fn by_id(id: RecordId) -> Self {
        Self(vec![Predicate::id_eq(id)])
    }

    pub fn push(&mut self, predicate: Predicate) {
        self.0.push(predicate);
    }

    /// Append the identifier pin
    pub fn pin_id(mut self, id: RecordId) -> Self {
        self.push(Predicate::id_eq(id));
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<Vec<Predicate>> for Domain {
    fn from(predicates: Vec<Predicate>) -> Self {
        Self(predicates)
    }
}
