//! `Valid`: recurse into a nested record's own `Validate` routine and carry
//! its violations through, guarded by a nil check for pointer fields.

use crate::codegen::{Context, EmitError, Output};
use crate::syntax::{Expr, TypeExpr};

pub(super) fn emit(
    ctx: &Context<'_>,
    field_type: &TypeExpr,
    _args: &[Expr],
) -> Result<Output, EmitError> {
    let is_pointer = matches!(field_type, TypeExpr::Pointer(..));

    let mut code = String::new();

    if is_pointer {
        code.push_str(&format!("\tif {} != nil {{\n", ctx.var_name));
    }

    if !ctx.before_violation.is_empty() {
        code.push_str(&format!("\t{}\n", ctx.before_violation));
    }
    code.push_str(&format!(
        "\tviolations = append(violations, {}.Validate(path)...)\n",
        ctx.var_name
    ));
    if !ctx.after_violation.is_empty() {
        code.push_str(&format!("\t{}\n", ctx.after_violation));
    }

    if is_pointer {
        code.push_str("\t}\n");
    }

    Ok(Output {
        code,
        ..Output::default()
    })
}
