//! `Required`: the value must be non-empty for its declared type.

use crate::codegen::{Context, EmitError, Output};
use crate::syntax::{Expr, TypeExpr};

use super::{emptiness_predicate, standard_block};

pub(super) fn emit(
    ctx: &Context<'_>,
    field_type: &TypeExpr,
    _args: &[Expr],
) -> Result<Output, EmitError> {
    let (predicate, imports) = emptiness_predicate(&ctx.var_name, field_type);

    Ok(Output {
        code: standard_block(ctx, &predicate, "a value is required", &[]),
        imports,
        vars: Vec::new(),
        warning: None,
    })
}
