//! Call-chain builder.
//!
//! A DSL statement is one expression made of chained method calls:
//! `v.Field(s.X).Constraints(c.Required())`. In the AST the outermost call is
//! the *last* method in the chain, so the chain is collected innermost-last
//! by walking callees, then reversed, giving the interpreter the calls in
//! left-to-right source order with the root identifier first.

use crate::syntax::{Expr, Span};

/// One link in a call chain: the root identifier everything hangs off, or a
/// single method call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Link<'a> {
    Root {
        name: &'a str,
        span: Span,
    },
    Call {
        method: &'a str,
        method_span: Span,
        args: &'a [Expr],
        span: Span,
    },
}

/// A chain that could not be built; the caller decides whether that is a
/// warning (statement wasn't meant to be DSL) or worse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainError {
    pub message: &'static str,
    pub span: Span,
}

/// Builds the call chain for one statement expression, in left-to-right
/// call order. The first link is always [`Link::Root`].
pub fn build(expr: &Expr) -> Result<Vec<Link<'_>>, ChainError> {
    let mut links = Vec::new();
    let mut current = expr;

    loop {
        match current {
            Expr::Ident(name, span) => {
                links.push(Link::Root { name, span: *span });
                break;
            }
            Expr::Call { callee, args, span } => match callee.as_ref() {
                Expr::Selector {
                    target,
                    member,
                    member_span,
                    ..
                } => {
                    links.push(Link::Call {
                        method: member,
                        method_span: *member_span,
                        args,
                        span: *span,
                    });
                    current = target;
                }
                _ => {
                    return Err(ChainError {
                        message: "statement expression must be a method call",
                        span: current.span(),
                    })
                }
            },
            _ => {
                return Err(ChainError {
                    message: "statement expression must be a call",
                    span: current.span(),
                })
            }
        }
    }

    links.reverse();
    Ok(links)
}
