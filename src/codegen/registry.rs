//! The constraint registry.
//!
//! A registry is a plain value mapping fully-qualified constraint names to
//! emitter functions. It is passed into the generator's constructor, so
//! every invocation composes its own constraint set — built-ins, custom
//! emitters, or both — with no global state involved.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::codegen::Context;
use crate::source::Import;
use crate::syntax::{Expr, TypeExpr};

/// A constraint emitter: turns one clause plus its field-type context into a
/// code fragment.
pub type Emitter = Box<dyn Fn(&Context<'_>, &TypeExpr, &[Expr]) -> Result<Output, EmitError>>;

/// What an emitter hands back: the code fragment, plus any imports and
/// helper variables the fragment depends on. Imports and variables are
/// deduplicated by value across all clauses in a run.
///
/// `warning` carries a type-compatibility concern — the constraint may not
/// apply cleanly to the field's declared type. The code is still emitted;
/// the host language's own compiler is the final arbiter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Output {
    pub code: String,
    pub imports: Vec<Import>,
    pub vars: Vec<Variable>,
    pub warning: Option<String>,
}

/// A helper variable declaration hoisted to the top of the generated file,
/// e.g. a precompiled pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    pub name: String,
    pub value: String,
}

/// A hard emitter failure (wrong argument count and the like). Aborts
/// generation entirely.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct EmitError(String);

impl EmitError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Default)]
pub struct Registry {
    emitters: BTreeMap<String, Emitter>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an emitter under a fully-qualified constraint name,
    /// replacing any previous entry with that name.
    pub fn register(&mut self, name: impl Into<String>, emitter: Emitter) {
        self.emitters.insert(name.into(), emitter);
    }

    pub fn get(&self, name: &str) -> Option<&Emitter> {
        self.emitters.get(name)
    }

    pub fn len(&self) -> usize {
        self.emitters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emitters.is_empty()
    }

    /// Registered names, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.emitters.keys().map(String::as_str)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("names", &self.emitters.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_lookup() {
        let mut registry = Registry::new();
        assert!(registry.is_empty());

        registry.register(
            "example.com/rules.Nop",
            Box::new(|_, _, _| Ok(Output::default())),
        );

        assert_eq!(registry.len(), 1);
        assert!(registry.get("example.com/rules.Nop").is_some());
        assert!(registry.get("example.com/rules.Missing").is_none());
    }

    #[test]
    fn later_registrations_replace_earlier_ones() {
        let mut registry = Registry::new();
        registry.register(
            "example.com/rules.Nop",
            Box::new(|_, _, _| {
                Ok(Output {
                    code: "first".into(),
                    ..Output::default()
                })
            }),
        );
        registry.register(
            "example.com/rules.Nop",
            Box::new(|_, _, _| {
                Ok(Output {
                    code: "second".into(),
                    ..Output::default()
                })
            }),
        );

        assert_eq!(registry.len(), 1);
    }
}
