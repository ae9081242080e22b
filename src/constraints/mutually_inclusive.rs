//! `MutuallyInclusive`: a named set of fields must be all empty or all
//! non-empty. Type-level only, like `MutuallyExclusive`.

use crate::codegen::{Context, EmitError, Output};
use crate::syntax::{Expr, TypeExpr};

use super::mutually_exclusive::{member_selectors, non_empty_checks};

pub(super) fn emit(
    ctx: &Context<'_>,
    field_type: &TypeExpr,
    args: &[Expr],
) -> Result<Output, EmitError> {
    let members = member_selectors(ctx, "MutuallyInclusive", args)?;

    if !matches!(field_type, TypeExpr::Struct(_)) {
        return Err(EmitError::new("`MutuallyInclusive` applied to non-struct type"));
    }

    let (checks, imports) = non_empty_checks(ctx, &members)?;

    let mut code = String::new();
    code.push_str("\t{\n");
    code.push_str("\t\t// MutuallyInclusive uses its own block to lock down nonEmpty's scope.\n");
    code.push_str("\t\tvar nonEmpty []string\n\n");
    code.push_str(&checks);
    code.push('\n');
    code.push_str(&format!(
        "\t\tif len(nonEmpty) != 0 && len(nonEmpty) != {} {{\n",
        members.len()
    ));
    if !ctx.before_violation.is_empty() {
        code.push_str(&format!("\t\t\t{}\n", ctx.before_violation));
    }
    code.push_str("\t\t\tviolations = append(violations, ConstraintViolation{\n");
    code.push_str("\t\t\t\tPath:     path.String(),\n");
    code.push_str(&format!("\t\t\t\tPathKind: \"{}\",\n", ctx.path_kind.as_str()));
    code.push_str("\t\t\t\tMessage:  \"fields are mutually inclusive\",\n");
    code.push_str("\t\t\t\tDetails: map[string]interface{}{\n");
    code.push_str("\t\t\t\t\t\"fields\": nonEmpty,\n");
    code.push_str("\t\t\t\t},\n");
    code.push_str("\t\t\t})\n");
    if !ctx.after_violation.is_empty() {
        code.push_str(&format!("\t\t\t{}\n", ctx.after_violation));
    }
    code.push_str("\t\t}\n");
    code.push_str("\t}\n");

    Ok(Output {
        code,
        imports,
        vars: Vec::new(),
        warning: None,
    })
}
