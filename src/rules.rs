//! The validation rules extracted from a source file's constraints methods.
//!
//! This is the structured middle of the pipeline: the extractor produces a
//! [`Rules`] value, the generator consumes one. Record types and fields are
//! keyed in ordered maps so that downstream walks are deterministic.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::syntax::{Expr, Span};

/// The full set of rules for one source file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Rules {
    pub types: BTreeMap<String, TypeRules>,
}

/// The rules configured for one record type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TypeRules {
    pub constraints: Vec<ConstraintClause>,
    pub fields: BTreeMap<String, FieldRules>,
}

/// The rules configured for one field: applied to the field value directly,
/// to each element, or to each key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldRules {
    pub constraints: Vec<ConstraintClause>,
    pub elements: Vec<ConstraintClause>,
    pub keys: Vec<ConstraintClause>,
}

/// One parsed constraint reference: the fully-qualified constraint name, its
/// argument expressions, and the `When` predicate in effect when it was
/// written, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstraintClause {
    pub name: String,
    pub predicate: Option<Expr>,
    pub args: Vec<Expr>,
    pub span: Span,
}
