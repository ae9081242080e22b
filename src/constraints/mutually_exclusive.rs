//! `MutuallyExclusive`: at most one of a named set of fields may be
//! non-empty. Type-level only; each argument must be a field selector on the
//! constraints method's receiver.

use crate::codegen::{Context, EmitError, Output};
use crate::source::{field_alias, Import};
use crate::syntax::{Expr, TypeExpr};

use super::emptiness_predicate;

pub(super) fn emit(
    ctx: &Context<'_>,
    field_type: &TypeExpr,
    args: &[Expr],
) -> Result<Output, EmitError> {
    let members = member_selectors(ctx, "MutuallyExclusive", args)?;

    if !matches!(field_type, TypeExpr::Struct(_)) {
        return Err(EmitError::new("`MutuallyExclusive` applied to non-struct type"));
    }

    let (checks, imports) = non_empty_checks(ctx, &members)?;

    let mut code = String::new();
    code.push_str("\t{\n");
    code.push_str("\t\t// MutuallyExclusive uses its own block to lock down nonEmpty's scope.\n");
    code.push_str("\t\tvar nonEmpty []string\n\n");
    code.push_str(&checks);
    code.push('\n');
    code.push_str("\t\tif len(nonEmpty) > 1 {\n");
    if !ctx.before_violation.is_empty() {
        code.push_str(&format!("\t\t\t{}\n", ctx.before_violation));
    }
    code.push_str("\t\t\tviolations = append(violations, ConstraintViolation{\n");
    code.push_str("\t\t\t\tPath:     path.String(),\n");
    code.push_str(&format!("\t\t\t\tPathKind: \"{}\",\n", ctx.path_kind.as_str()));
    code.push_str("\t\t\t\tMessage:  \"fields are mutually exclusive\",\n");
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

/// Checks that every argument is a field selection on the receiver, and
/// returns the selected field names.
pub(super) fn member_selectors(
    ctx: &Context<'_>,
    constraint: &str,
    args: &[Expr],
) -> Result<Vec<String>, EmitError> {
    if args.len() < 2 {
        return Err(EmitError::new("expected at least two options"));
    }

    let mut members = Vec::new();

    for arg in args {
        let Expr::Selector { target, member, .. } = arg else {
            return Err(EmitError::new(format!(
                "value passed to `{constraint}` is not a field selector"
            )));
        };

        match target.as_ref() {
            Expr::Ident(base, _) if *base == ctx.receiver => {}
            _ => {
                return Err(EmitError::new(format!(
                    "value passed to `{constraint}` is not a field on the receiver's type"
                )));
            }
        }

        members.push(member.clone());
    }

    Ok(members)
}

/// One `if !(<empty>) { nonEmpty = append(...) }` check per referenced
/// field, walking the struct's fields in sorted order so output is stable.
pub(super) fn non_empty_checks(
    ctx: &Context<'_>,
    members: &[String],
) -> Result<(String, Vec<Import>), EmitError> {
    let strct = ctx
        .source
        .structs
        .get(&ctx.type_name)
        .ok_or_else(|| EmitError::new(format!("unknown type {:?}", ctx.type_name)))?;

    let mut checks = String::new();
    let mut imports = Vec::new();

    for (field_name, field) in &strct.fields {
        if !members.contains(field_name) {
            continue;
        }

        let alias = field_alias(field_name, &ctx.tag_name, field.tag.as_deref())
            .map_err(|err| EmitError::new(format!("failed to resolve output field name: {err}")))?;

        let (predicate, more) =
            emptiness_predicate(&format!("{}.{}", ctx.var_name, field_name), &field.ty);
        imports.extend(more);

        checks.push_str(&format!(
            "\t\tif !({}) {{\n\t\t\tnonEmpty = append(nonEmpty, \"{}\")\n\t\t}}\n",
            predicate, alias
        ));
    }

    Ok((checks, imports))
}
