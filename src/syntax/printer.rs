//! Renders AST nodes back to host-language source text.
//!
//! Constraint arguments and `When` predicates captured from the DSL are
//! re-emitted verbatim into generated code through these functions. Grouping
//! written by the user survives because the parser keeps explicit
//! parenthesis nodes.

use crate::syntax::{Expr, TypeExpr};

pub fn expr_to_string(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name, _) => name.clone(),
        Expr::Selector { target, member, .. } => {
            format!("{}.{}", expr_to_string(target), member)
        }
        Expr::Call { callee, args, .. } => {
            let rendered: Vec<String> = args.iter().map(expr_to_string).collect();
            format!("{}({})", expr_to_string(callee), rendered.join(", "))
        }
        Expr::Unary { op, operand, .. } => {
            format!("{}{}", op.symbol(), expr_to_string(operand))
        }
        Expr::Binary { op, lhs, rhs, .. } => {
            format!(
                "{} {} {}",
                expr_to_string(lhs),
                op.symbol(),
                expr_to_string(rhs)
            )
        }
        Expr::Paren(inner, _) => format!("({})", expr_to_string(inner)),
        Expr::Literal { text, .. } => text.clone(),
    }
}

pub fn type_expr_to_string(ty: &TypeExpr) -> String {
    match ty {
        TypeExpr::Named(name, _) => name.clone(),
        TypeExpr::Qualified {
            package, member, ..
        } => format!("{}.{}", package, member),
        TypeExpr::Pointer(inner, _) => format!("*{}", type_expr_to_string(inner)),
        TypeExpr::Slice(inner, _) => format!("[]{}", type_expr_to_string(inner)),
        TypeExpr::Map { key, value, .. } => format!(
            "map[{}]{}",
            type_expr_to_string(key),
            type_expr_to_string(value)
        ),
        TypeExpr::Struct(_) => "struct".to_string(),
    }
}
