//! Vouch error handling.
//!
//! Every failure in the pipeline is represented by [`VouchError`]: an
//! [`ErrorKind`] describing what went wrong, plus the named source and span
//! saying where. Warnings are not errors here — statements that merely don't
//! look like DSL usage become [`Warning`] values that the pipeline collects
//! and the CLI renders, while the run continues.

use std::fmt;
use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceSpan};
use thiserror::Error;

use crate::syntax::Span;

/// Source context for error reporting: the file name and its full content,
/// convertible to a `NamedSource` for miette rendering.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub name: String,
    pub content: String,
}

impl SourceContext {
    pub fn from_file(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn to_named_source(&self) -> Arc<NamedSource<String>> {
        Arc::new(NamedSource::new(self.name.clone(), self.content.clone()))
    }

    /// 1-based line and column of a byte offset into the content.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.content.len());
        let mut line = 1;
        let mut col = 1;
        for ch in self.content[..offset].chars() {
            if ch == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        (line, col)
    }
}

/// The single error type used across parsing, extraction, and generation.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct VouchError {
    pub kind: ErrorKind,
    pub source_info: SourceInfo,
    pub help: Option<String>,
}

/// Where an error happened.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub source: Arc<NamedSource<String>>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    // Parse errors: the frontend could not read the source file.
    Syntax {
        message: String,
    },

    // Extraction errors: statements that are DSL-shaped but violate the
    // contract. These abort rule-building for the whole file.
    WrongArity {
        method: String,
    },
    FieldNotSelector,
    FieldNotOnReceiver,
    DanglingField,
    UnknownDslMethod {
        method: String,
        on: String,
    },
    ConstraintNotImportedCall,
    UnknownField {
        type_name: String,
        field: String,
    },
    MalformedTag {
        field: String,
        reason: String,
    },

    // Generation errors.
    UnknownConstraint {
        name: String,
    },
    ElementsOnNonIterable {
        selector: String,
    },
    KeysOnNonMap {
        selector: String,
    },
    Emit {
        selector: String,
        constraint: String,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Parse,
    Extract,
    Generate,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Parse => "parse",
            ErrorCategory::Extract => "extract",
            ErrorCategory::Generate => "generate",
        }
    }
}

impl ErrorKind {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Syntax { .. } => ErrorCategory::Parse,

            Self::WrongArity { .. }
            | Self::FieldNotSelector
            | Self::FieldNotOnReceiver
            | Self::DanglingField
            | Self::UnknownDslMethod { .. }
            | Self::ConstraintNotImportedCall
            | Self::UnknownField { .. }
            | Self::MalformedTag { .. } => ErrorCategory::Extract,

            Self::UnknownConstraint { .. }
            | Self::ElementsOnNonIterable { .. }
            | Self::KeysOnNonMap { .. }
            | Self::Emit { .. } => ErrorCategory::Generate,
        }
    }

    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::Syntax { .. } => "syntax",
            Self::WrongArity { .. } => "wrong_arity",
            Self::FieldNotSelector => "field_not_selector",
            Self::FieldNotOnReceiver => "field_not_on_receiver",
            Self::DanglingField => "dangling_field",
            Self::UnknownDslMethod { .. } => "unknown_dsl_method",
            Self::ConstraintNotImportedCall => "constraint_not_imported_call",
            Self::UnknownField { .. } => "unknown_field",
            Self::MalformedTag { .. } => "malformed_tag",
            Self::UnknownConstraint { .. } => "unknown_constraint",
            Self::ElementsOnNonIterable { .. } => "elements_on_non_iterable",
            Self::KeysOnNonMap { .. } => "keys_on_non_map",
            Self::Emit { .. } => "emit",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Syntax { message } => {
                write!(f, "parse error: {}", message)
            }
            ErrorKind::WrongArity { method } => {
                write!(f, "exactly one argument should be passed to {}", method)
            }
            ErrorKind::FieldNotSelector => {
                write!(f, "value passed to Field should be a selector")
            }
            ErrorKind::FieldNotOnReceiver => {
                write!(f, "value passed to Field should be a field on the receiver's type")
            }
            ErrorKind::DanglingField => {
                write!(f, "a method should be called on Field")
            }
            ErrorKind::UnknownDslMethod { method, on } => {
                write!(f, "unknown method {:?} called on {}", method, on)
            }
            ErrorKind::ConstraintNotImportedCall => {
                write!(f, "constraint must be a function call from an imported package")
            }
            ErrorKind::UnknownField { type_name, field } => {
                write!(f, "field {:?} does not exist on type {}", field, type_name)
            }
            ErrorKind::MalformedTag { field, reason } => {
                write!(f, "malformed struct tag on field {:?}: {}", field, reason)
            }
            ErrorKind::UnknownConstraint { name } => {
                write!(f, "unknown validation constraint: {:?}", name)
            }
            ErrorKind::ElementsOnNonIterable { selector } => {
                write!(f, "Elements constraints on {} applied to non-iterable type", selector)
            }
            ErrorKind::KeysOnNonMap { selector } => {
                write!(f, "Keys constraints on {} applied to non-map type", selector)
            }
            ErrorKind::Emit {
                selector,
                constraint,
                message,
            } => {
                write!(
                    f,
                    "failed to generate code for {}'s {:?} constraint: {}",
                    selector, constraint, message
                )
            }
        }
    }
}

impl VouchError {
    pub fn new(kind: ErrorKind, ctx: &SourceContext, span: Span) -> Self {
        Self {
            kind,
            source_info: SourceInfo {
                source: ctx.to_named_source(),
                span: to_source_span(span),
            },
            help: None,
        }
    }

    fn primary_label(&self) -> String {
        match &self.kind {
            ErrorKind::Syntax { .. } => "invalid syntax".into(),
            ErrorKind::WrongArity { .. } => "wrong number of arguments".into(),
            ErrorKind::FieldNotSelector => "not a field selector".into(),
            ErrorKind::FieldNotOnReceiver => "not a field on the receiver".into(),
            ErrorKind::DanglingField => "nothing chained on Field".into(),
            ErrorKind::UnknownDslMethod { .. } => "unknown method".into(),
            ErrorKind::ConstraintNotImportedCall => "not an imported constraint call".into(),
            ErrorKind::UnknownField { .. } => "no such field".into(),
            ErrorKind::MalformedTag { .. } => "malformed tag".into(),
            ErrorKind::UnknownConstraint { .. } => "unregistered constraint".into(),
            ErrorKind::ElementsOnNonIterable { .. } => "field cannot be iterated".into(),
            ErrorKind::KeysOnNonMap { .. } => "field has no keys".into(),
            ErrorKind::Emit { .. } => "constraint failed here".into(),
        }
    }
}

impl Diagnostic for VouchError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!(
            "vouch::{}::{}",
            self.kind.category().as_str(),
            self.kind.code_suffix()
        )))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let labels = vec![LabeledSpan::new_with_span(
            Some(self.primary_label()),
            self.source_info.span,
        )];
        Some(Box::new(labels.into_iter()))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&*self.source_info.source)
    }
}

/// Converts a host-syntax span to a miette source span.
pub fn to_source_span(span: Span) -> SourceSpan {
    SourceSpan::from(span.start..span.end)
}

/// A non-fatal finding, already formatted with its source position.
///
/// Extraction and generation collect these instead of printing from library
/// code, so callers decide how (and whether) to render them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    message: String,
}

impl Warning {
    pub fn new(message: impl Into<String>, ctx: &SourceContext, span: Span) -> Self {
        let (line, col) = ctx.line_col(span.start);
        Self {
            message: format!(
                "{} on line {}, col {} in '{}'",
                message.into(),
                line,
                col,
                ctx.name
            ),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
