//! `Regexp`: the value must match a pattern given as a string. The pattern
//! is hoisted into a helper variable so it compiles once, when the generated
//! package loads.

use crate::codegen::{Context, EmitError, Output, Variable};
use crate::source::Import;
use crate::syntax::{printer, Expr, TypeExpr};

use super::{
    collect_expr_imports, pointer_guard, standard_block, unwrap_pointers, variable_name,
    TYPE_WARNING,
};

pub(super) fn emit(
    ctx: &Context<'_>,
    field_type: &TypeExpr,
    args: &[Expr],
) -> Result<Output, EmitError> {
    if args.len() != 1 {
        return Err(EmitError::new("expected exactly one option"));
    }

    let pattern = printer::expr_to_string(&args[0]);
    let pattern_var = variable_name(ctx);

    let vars = vec![Variable {
        name: pattern_var.clone(),
        value: format!("regexp.MustCompile({})", pattern),
    }];

    let (guard, var_name) = pointer_guard(&ctx.var_name, field_type);
    let predicate = format!("{guard}!{pattern_var}.MatchString({var_name})");
    let details = [("regexp", format!("{}.String()", pattern_var))];

    let mut imports = collect_expr_imports(ctx, &args[0]);
    imports.push(Import::new("regexp", ""));

    Ok(Output {
        code: standard_block(ctx, &predicate, "value must match regular expression", &details),
        imports,
        vars,
        warning: string_type_check(field_type),
    })
}

fn string_type_check(field_type: &TypeExpr) -> Option<String> {
    match unwrap_pointers(field_type) {
        TypeExpr::Named(name, _) if name == "string" => None,
        // A qualified type may well be a string underneath; stay quiet.
        TypeExpr::Qualified { .. } => None,
        _ => Some(TYPE_WARNING.to_string()),
    }
}
