//! `MinLength` / `MaxLength`: length bound checks for values with a length
//! notion.

use crate::codegen::{EmitError, Emitter, Output};
use crate::syntax::{printer, TypeExpr};

use super::min_max::Bound;
use super::{collect_expr_imports, pointer_guard, standard_block, unwrap_pointers, TYPE_WARNING};

pub(super) fn emitter(bound: Bound) -> Emitter {
    Box::new(move |ctx, field_type, args| {
        if args.len() != 1 {
            return Err(EmitError::new("expected exactly one option"));
        }

        let value = printer::expr_to_string(&args[0]);

        let (guard, var_name) = pointer_guard(&ctx.var_name, field_type);

        let (message, operator) = match bound {
            Bound::Max => ("maximum length exceeded", ">"),
            Bound::Min => ("minimum length not met", "<"),
        };

        let predicate = format!("{guard}len({var_name}) {operator} {value}");
        let details = [(bound.word(), value)];

        Ok(Output {
            imports: collect_expr_imports(ctx, &args[0]),
            code: standard_block(ctx, &predicate, message, &details),
            vars: Vec::new(),
            warning: length_type_check(field_type),
        })
    })
}

fn length_type_check(field_type: &TypeExpr) -> Option<String> {
    match unwrap_pointers(field_type) {
        TypeExpr::Slice(..) | TypeExpr::Map { .. } => None,
        TypeExpr::Named(name, _) if name == "string" => None,
        _ => Some(TYPE_WARNING.to_string()),
    }
}
