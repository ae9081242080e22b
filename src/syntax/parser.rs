//! Host-language parser.
//!
//! Converts source text into the AST in [`crate::syntax`], with byte spans on
//! every node. This stage is purely syntactic; nothing here knows about the
//! constraints DSL.

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::diagnostics::{ErrorKind, SourceContext, VouchError};
use crate::syntax::{
    BinaryOp, Decl, Expr, FieldDecl, FuncDecl, ImportDecl, LiteralKind, Param, Receiver,
    SourceFile, Span, Stmt, StructDecl, TypeExpr, UnaryOp,
};

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
struct HostParser;

/// Parse one host source file into a [`SourceFile`].
pub fn parse(text: &str, file_name: &str) -> Result<SourceFile, VouchError> {
    let ctx = SourceContext::from_file(file_name, text);

    let mut pairs =
        HostParser::parse(Rule::file, text).map_err(|e| convert_parse_error(e, &ctx))?;

    let file = pairs.next().unwrap(); // pest guarantees the file rule exists
    Ok(build_file(file))
}

fn convert_parse_error(err: pest::error::Error<Rule>, ctx: &SourceContext) -> VouchError {
    use pest::error::InputLocation;

    let span = match err.location {
        InputLocation::Pos(pos) => Span {
            start: pos,
            end: pos,
        },
        InputLocation::Span((start, end)) => Span { start, end },
    };

    VouchError::new(
        ErrorKind::Syntax {
            message: err.variant.message().to_string(),
        },
        ctx,
        span,
    )
}

fn span_of(pair: &Pair<Rule>) -> Span {
    let span = pair.as_span();
    Span {
        start: span.start(),
        end: span.end(),
    }
}

fn build_file(pair: Pair<Rule>) -> SourceFile {
    let span = span_of(&pair);

    let mut package = String::new();
    let mut imports = Vec::new();
    let mut decls = Vec::new();

    for item in pair.into_inner() {
        match item.as_rule() {
            Rule::package_clause => {
                package = item.into_inner().next().unwrap().as_str().to_string();
            }
            Rule::import_decl => build_import_decl(item, &mut imports),
            Rule::type_decl => decls.push(Decl::Struct(build_struct_decl(item))),
            Rule::func_decl => decls.push(Decl::Func(build_func_decl(item))),
            Rule::EOI => {}
            _ => unreachable!("unexpected rule in file: {:?}", item.as_rule()),
        }
    }

    SourceFile {
        package,
        imports,
        decls,
        span,
    }
}

fn build_import_decl(pair: Pair<Rule>, imports: &mut Vec<ImportDecl>) {
    for spec in pair.into_inner() {
        let span = span_of(&spec);

        let mut alias = None;
        let mut path = String::new();

        for part in spec.into_inner() {
            match part.as_rule() {
                Rule::ident => alias = Some(part.as_str().to_string()),
                Rule::string_lit => path = unquote(part.as_str()),
                _ => unreachable!(),
            }
        }

        imports.push(ImportDecl { alias, path, span });
    }
}

fn build_struct_decl(pair: Pair<Rule>) -> StructDecl {
    let span = span_of(&pair);
    let mut inner = pair.into_inner();

    let name = inner.next().unwrap().as_str().to_string();
    let struct_type = inner.next().unwrap();

    let fields = struct_type.into_inner().map(build_field_decl).collect();

    StructDecl { name, fields, span }
}

fn build_field_decl(pair: Pair<Rule>) -> FieldDecl {
    let span = span_of(&pair);
    let mut inner = pair.into_inner();

    let name = inner.next().unwrap().as_str().to_string();
    let ty = build_type_expr(inner.next().unwrap());
    let tag = inner.next().map(|tag| {
        let text = tag.as_str();
        text[1..text.len() - 1].to_string() // strip the backticks
    });

    FieldDecl {
        name,
        ty,
        tag,
        span,
    }
}

fn build_func_decl(pair: Pair<Rule>) -> FuncDecl {
    let span = span_of(&pair);

    let mut receiver = None;
    let mut name = String::new();
    let mut params = Vec::new();
    let mut results = Vec::new();
    let mut body = Vec::new();

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::receiver => {
                let recv_span = span_of(&part);
                let mut inner = part.into_inner();
                receiver = Some(Receiver {
                    name: inner.next().unwrap().as_str().to_string(),
                    ty: build_type_expr(inner.next().unwrap()),
                    span: recv_span,
                });
            }
            Rule::ident => name = part.as_str().to_string(),
            Rule::param_list => {
                params = part.into_inner().map(build_param).collect();
            }
            Rule::result_list => {
                results = part.into_inner().map(build_type_expr).collect();
            }
            Rule::block => {
                body = part.into_inner().map(build_stmt).collect();
            }
            _ => unreachable!(),
        }
    }

    FuncDecl {
        receiver,
        name,
        params,
        results,
        body,
        span,
    }
}

fn build_param(pair: Pair<Rule>) -> Param {
    let span = span_of(&pair);
    let mut inner = pair.into_inner();

    Param {
        name: inner.next().unwrap().as_str().to_string(),
        ty: build_type_expr(inner.next().unwrap()),
        span,
    }
}

fn build_stmt(pair: Pair<Rule>) -> Stmt {
    let span = span_of(&pair);

    match pair.as_rule() {
        Rule::expr_stmt => Stmt::Expr(build_expr(pair.into_inner().next().unwrap())),
        Rule::assign_stmt => {
            let mut inner = pair.into_inner();
            Stmt::Assign {
                target: build_expr(inner.next().unwrap()),
                value: build_expr(inner.next().unwrap()),
                span,
            }
        }
        Rule::short_var_decl => {
            let mut inner = pair.into_inner();
            Stmt::ShortVarDecl {
                name: inner.next().unwrap().as_str().to_string(),
                value: build_expr(inner.next().unwrap()),
                span,
            }
        }
        Rule::return_stmt => Stmt::Return {
            value: pair.into_inner().next().map(build_expr),
            span,
        },
        _ => unreachable!("unexpected rule in block: {:?}", pair.as_rule()),
    }
}

fn build_type_expr(pair: Pair<Rule>) -> TypeExpr {
    let span = span_of(&pair);

    match pair.as_rule() {
        Rule::pointer_type => TypeExpr::Pointer(
            Box::new(build_type_expr(pair.into_inner().next().unwrap())),
            span,
        ),
        Rule::slice_type => TypeExpr::Slice(
            Box::new(build_type_expr(pair.into_inner().next().unwrap())),
            span,
        ),
        Rule::map_type => {
            let mut inner = pair.into_inner();
            TypeExpr::Map {
                key: Box::new(build_type_expr(inner.next().unwrap())),
                value: Box::new(build_type_expr(inner.next().unwrap())),
                span,
            }
        }
        Rule::qualified_type => {
            let mut inner = pair.into_inner();
            TypeExpr::Qualified {
                package: inner.next().unwrap().as_str().to_string(),
                member: inner.next().unwrap().as_str().to_string(),
                span,
            }
        }
        Rule::named_type => TypeExpr::Named(
            pair.into_inner().next().unwrap().as_str().to_string(),
            span,
        ),
        _ => unreachable!("unexpected rule in type expression: {:?}", pair.as_rule()),
    }
}

fn build_expr(pair: Pair<Rule>) -> Expr {
    match pair.as_rule() {
        Rule::or_expr | Rule::and_expr | Rule::cmp_expr | Rule::add_expr | Rule::mul_expr => {
            build_binary(pair)
        }
        Rule::unary_expr => build_unary(pair),
        Rule::postfix_expr => build_postfix(pair),
        Rule::paren_expr => {
            let span = span_of(&pair);
            Expr::Paren(Box::new(build_expr(pair.into_inner().next().unwrap())), span)
        }
        Rule::ident => Expr::Ident(pair.as_str().to_string(), span_of(&pair)),
        Rule::int_lit => build_literal(LiteralKind::Int, pair),
        Rule::float_lit => build_literal(LiteralKind::Float, pair),
        Rule::string_lit => build_literal(LiteralKind::String, pair),
        Rule::bool_lit => build_literal(LiteralKind::Bool, pair),
        _ => unreachable!("unexpected rule in expression: {:?}", pair.as_rule()),
    }
}

fn build_literal(kind: LiteralKind, pair: Pair<Rule>) -> Expr {
    Expr::Literal {
        kind,
        text: pair.as_str().to_string(),
        span: span_of(&pair),
    }
}

/// Folds `operand (op operand)*` pairs into left-associative binary nodes.
/// A chain with a single operand collapses to that operand.
fn build_binary(pair: Pair<Rule>) -> Expr {
    let mut inner = pair.into_inner();
    let mut lhs = build_expr(inner.next().unwrap());

    while let Some(op_pair) = inner.next() {
        let op = binary_op(op_pair.as_str());
        let rhs = build_expr(inner.next().unwrap());
        let span = Span {
            start: lhs.span().start,
            end: rhs.span().end,
        };
        lhs = Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            span,
        };
    }

    lhs
}

fn build_unary(pair: Pair<Rule>) -> Expr {
    let span = span_of(&pair);
    let mut inner = pair.into_inner();
    let first = inner.next().unwrap();

    match first.as_rule() {
        Rule::unary_op => {
            let op = unary_op(first.as_str());
            let operand = build_expr(inner.next().unwrap());
            Expr::Unary {
                op,
                operand: Box::new(operand),
                span,
            }
        }
        _ => build_expr(first),
    }
}

fn build_postfix(pair: Pair<Rule>) -> Expr {
    let mut inner = pair.into_inner();
    let mut expr = build_expr(inner.next().unwrap());

    for suffix in inner {
        let suffix_span = span_of(&suffix);
        let span = Span {
            start: expr.span().start,
            end: suffix_span.end,
        };

        match suffix.as_rule() {
            Rule::selector_suffix => {
                let member = suffix.into_inner().next().unwrap();
                expr = Expr::Selector {
                    target: Box::new(expr),
                    member: member.as_str().to_string(),
                    member_span: span_of(&member),
                    span,
                };
            }
            Rule::call_suffix => {
                let args = suffix.into_inner().map(build_expr).collect();
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                    span,
                };
            }
            _ => unreachable!(),
        }
    }

    expr
}

fn binary_op(symbol: &str) -> BinaryOp {
    match symbol {
        "||" => BinaryOp::Or,
        "&&" => BinaryOp::And,
        "==" => BinaryOp::Eq,
        "!=" => BinaryOp::NotEq,
        "<" => BinaryOp::Lt,
        "<=" => BinaryOp::LtEq,
        ">" => BinaryOp::Gt,
        ">=" => BinaryOp::GtEq,
        "+" => BinaryOp::Add,
        "-" => BinaryOp::Sub,
        "*" => BinaryOp::Mul,
        "/" => BinaryOp::Div,
        "%" => BinaryOp::Rem,
        _ => unreachable!("unexpected binary operator: {symbol}"),
    }
}

fn unary_op(symbol: &str) -> UnaryOp {
    match symbol {
        "!" => UnaryOp::Not,
        "-" => UnaryOp::Neg,
        "*" => UnaryOp::Deref,
        "&" => UnaryOp::Ref,
        _ => unreachable!("unexpected unary operator: {symbol}"),
    }
}

fn unquote(text: &str) -> String {
    let inner = &text[1..text.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => {}
        }
    }

    out
}
