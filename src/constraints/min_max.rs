//! `Min` / `Max`: numeric bound checks, dereferencing one level when the
//! field is a pointer.

use crate::codegen::{EmitError, Emitter, Output};
use crate::syntax::{printer, TypeExpr};

use super::{
    collect_expr_imports, pointer_guard, standard_block, unwrap_pointers, NUMERIC_TYPES,
    TYPE_WARNING,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Bound {
    Min,
    Max,
}

impl Bound {
    pub(super) fn word(self) -> &'static str {
        match self {
            Bound::Min => "minimum",
            Bound::Max => "maximum",
        }
    }
}

pub(super) fn emitter(bound: Bound) -> Emitter {
    Box::new(move |ctx, field_type, args| {
        if args.len() != 1 {
            return Err(EmitError::new("expected exactly one option"));
        }

        // Render the bound expression as written. If it's configured with
        // something senseless, the generated code won't compile either.
        let value = printer::expr_to_string(&args[0]);

        let (guard, var_name) = pointer_guard(&ctx.var_name, field_type);

        let (message, operator) = match bound {
            Bound::Max => ("maximum value exceeded", ">"),
            Bound::Min => ("minimum value not met", "<"),
        };

        let predicate = format!("{guard}{var_name} {operator} {value}");
        let details = [(bound.word(), value)];

        Ok(Output {
            imports: collect_expr_imports(ctx, &args[0]),
            code: standard_block(ctx, &predicate, message, &details),
            vars: Vec::new(),
            warning: numeric_type_check(field_type),
        })
    })
}

fn numeric_type_check(field_type: &TypeExpr) -> Option<String> {
    match unwrap_pointers(field_type) {
        TypeExpr::Named(name, _) if NUMERIC_TYPES.contains(&name.as_str()) => None,
        _ => Some(TYPE_WARNING.to_string()),
    }
}
