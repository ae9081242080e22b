//! Built-in constraint emitters, and the helpers they share.
//!
//! Everything here is exposed so that binaries composing their own
//! constraint sets can build on the built-in rules and reuse the same
//! helpers from custom emitters.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::codegen::{Context, Registry};
use crate::source::Import;
use crate::syntax::{Expr, TypeExpr};

mod length;
mod min_max;
mod mutually_exclusive;
mod mutually_inclusive;
mod regexp;
mod required;
mod valid;

/// The module path built-in constraints are referenced from in the DSL.
pub const IMPORT_PATH: &str = "vouch.dev/vouch/constraints";

/// The warning message attached when a constraint is used on a type it may
/// not support. The code is still emitted; the host compiler has the final
/// say.
pub const TYPE_WARNING: &str = "type used may not produce valid code (is it a custom type?)";

pub(crate) const NUMERIC_TYPES: &[&str] = &[
    "int", "int8", "int16", "int32", "int64", "uint", "uint8", "uint16", "uint32", "uint64",
    "float32", "float64",
];

/// All of the built-in validation constraints provided by vouch.
pub fn built_in() -> Registry {
    let mut registry = Registry::new();

    registry.register(qualified("Max"), min_max::emitter(min_max::Bound::Max));
    registry.register(qualified("MaxLength"), length::emitter(min_max::Bound::Max));
    registry.register(qualified("Min"), min_max::emitter(min_max::Bound::Min));
    registry.register(qualified("MinLength"), length::emitter(min_max::Bound::Min));
    registry.register(
        qualified("MutuallyExclusive"),
        Box::new(mutually_exclusive::emit),
    );
    registry.register(
        qualified("MutuallyInclusive"),
        Box::new(mutually_inclusive::emit),
    );
    registry.register(qualified("Regexp"), Box::new(regexp::emit));
    registry.register(qualified("Required"), Box::new(required::emit));
    registry.register(qualified("Valid"), Box::new(valid::emit));

    registry
}

fn qualified(name: &str) -> String {
    format!("{IMPORT_PATH}.{name}")
}

/// The emptiness predicate for a value of the given declared type.
///
/// Pointer types check against nil; slices, maps, and strings check their
/// length; numeric types check against zero. Anything the source alone can't
/// classify falls back to the structural zero check — that fallback is what
/// lets MutuallyExclusive work over arbitrary member types.
pub fn emptiness_predicate(var_name: &str, field_type: &TypeExpr) -> (String, Vec<Import>) {
    match field_type {
        TypeExpr::Pointer(..) => (format!("{var_name} == nil"), Vec::new()),
        TypeExpr::Slice(..) | TypeExpr::Map { .. } => {
            (format!("len({var_name}) == 0"), Vec::new())
        }
        TypeExpr::Named(name, _) if name == "string" => {
            (format!("len({var_name}) == 0"), Vec::new())
        }
        TypeExpr::Named(name, _) if NUMERIC_TYPES.contains(&name.as_str()) => {
            (format!("{var_name} == 0"), Vec::new())
        }
        _ => (
            format!("reflect.ValueOf({var_name}).IsZero()"),
            vec![Import::new("reflect", "")],
        ),
    }
}

/// The shared violation block: predicate guard, path push, append, path pop.
pub fn standard_block(
    ctx: &Context<'_>,
    predicate: &str,
    message: &str,
    details: &[(&str, String)],
) -> String {
    let mut code = String::new();

    code.push_str(&format!("\tif {} {{\n", predicate));
    if !ctx.before_violation.is_empty() {
        code.push_str(&format!("\t\t{}\n", ctx.before_violation));
    }
    code.push_str("\t\tviolations = append(violations, ConstraintViolation{\n");
    code.push_str("\t\t\tPath:     path.String(),\n");
    code.push_str(&format!("\t\t\tPathKind: \"{}\",\n", ctx.path_kind.as_str()));
    code.push_str(&format!("\t\t\tMessage:  \"{}\",\n", message));
    if !details.is_empty() {
        code.push_str("\t\t\tDetails: map[string]interface{}{\n");
        for (key, value) in details {
            code.push_str(&format!("\t\t\t\t\"{}\": {},\n", key, value));
        }
        code.push_str("\t\t\t},\n");
    }
    code.push_str("\t\t})\n");
    if !ctx.after_violation.is_empty() {
        code.push_str(&format!("\t\t{}\n", ctx.after_violation));
    }
    code.push_str("\t}\n");

    code
}

static IDENT_SANITIZER: Lazy<Regex> =
    Lazy::new(|| Regex::new("[^A-Za-z0-9]").expect("sanitizer pattern is valid"));

/// A deterministic helper-variable name, unique within one generated file:
/// built from the constraint name, the source file stem, and the clause's
/// running ordinal.
pub fn variable_name(ctx: &Context<'_>) -> String {
    let file_name = &ctx.source.file_name;
    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name);

    format!(
        "{}_{}_{}",
        lower_first(&IDENT_SANITIZER.replace_all(&ctx.constraint, "_")),
        upper_first(&IDENT_SANITIZER.replace_all(stem, "_")),
        ctx.ordinal
    )
}

/// Finds imports referenced by an expression that is copied into generated
/// code, so the generated file can import them too. Selectors on the
/// receiver are field accesses, not package references, and are skipped.
pub fn collect_expr_imports(ctx: &Context<'_>, expr: &Expr) -> Vec<Import> {
    let mut imports = Vec::new();
    walk_imports(ctx, expr, &mut imports);
    imports
}

fn walk_imports(ctx: &Context<'_>, expr: &Expr, imports: &mut Vec<Import>) {
    match expr {
        Expr::Selector { target, .. } => match target.as_ref() {
            Expr::Ident(name, _) => {
                if *name != ctx.receiver {
                    if let Some(import) = ctx.source.import_by_alias(name) {
                        imports.push(import.clone());
                    }
                }
            }
            _ => walk_imports(ctx, target, imports),
        },
        Expr::Call { callee, args, .. } => {
            walk_imports(ctx, callee, imports);
            for arg in args {
                walk_imports(ctx, arg, imports);
            }
        }
        Expr::Unary { operand, .. } => walk_imports(ctx, operand, imports),
        Expr::Binary { lhs, rhs, .. } => {
            walk_imports(ctx, lhs, imports);
            walk_imports(ctx, rhs, imports);
        }
        Expr::Paren(inner, _) => walk_imports(ctx, inner, imports),
        Expr::Ident(..) | Expr::Literal { .. } => {}
    }
}

/// For pointer fields, a nil guard prefix plus the dereferenced access
/// expression; otherwise no guard and the access expression unchanged.
pub(crate) fn pointer_guard(var_name: &str, field_type: &TypeExpr) -> (String, String) {
    if matches!(field_type, TypeExpr::Pointer(..)) {
        (format!("{var_name} != nil && "), format!("*{var_name}"))
    } else {
        (String::new(), var_name.to_string())
    }
}

pub(crate) fn unwrap_pointers(field_type: &TypeExpr) -> &TypeExpr {
    let mut current = field_type;
    while let TypeExpr::Pointer(inner, _) = current {
        current = inner;
    }
    current
}

fn lower_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn upper_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::{Context, PathKind};
    use crate::source::Source;
    use crate::syntax::{parse, Span};

    fn read(text: &str) -> Source {
        let file = parse(text, "testdata.vg").expect("source should parse");
        Source::from_file(file, "testdata.vg", text)
    }

    fn subject_source() -> Source {
        read(
            r#"
            package td01

            import (
                "vouch.dev/vouch"
                c "vouch.dev/vouch/constraints"
                custom "example.com/custom"
            )

            type T struct {
                A string
                B *string
                C []int
                D map[string]int
                E int
                F custom.Thing
            }
            "#,
        )
    }

    fn context(source: &Source) -> Context<'_> {
        Context {
            source,
            tag_name: "vouch".into(),
            type_name: "T".into(),
            receiver: "t".into(),
            field_name: Some("A".into()),
            field_alias: Some("A".into()),
            var_name: "t.A".into(),
            path: "\"A\"".into(),
            path_kind: PathKind::Field,
            before_violation: "size := path.Write(\"A\")".into(),
            after_violation: "path.TruncateRight(size)".into(),
            constraint: qualified("Regexp"),
            ordinal: 3,
        }
    }

    fn field_type<'a>(source: &'a Source, name: &str) -> &'a TypeExpr {
        &source.structs["T"].fields[name].ty
    }

    #[test]
    fn built_in_registers_every_constraint() {
        let registry = built_in();
        for name in [
            "Max",
            "MaxLength",
            "Min",
            "MinLength",
            "MutuallyExclusive",
            "MutuallyInclusive",
            "Regexp",
            "Required",
            "Valid",
        ] {
            assert!(
                registry.get(&qualified(name)).is_some(),
                "{name} should be registered"
            );
        }
    }

    #[test]
    fn emptiness_depends_on_type_kind() {
        let source = subject_source();

        let cases = [
            ("A", "len(t.A) == 0"),
            ("B", "t.B == nil"),
            ("C", "len(t.C) == 0"),
            ("D", "len(t.D) == 0"),
            ("E", "t.E == 0"),
        ];
        for (field, expected) in cases {
            let (predicate, imports) =
                emptiness_predicate(&format!("t.{field}"), field_type(&source, field));
            assert_eq!(predicate, expected);
            assert!(imports.is_empty());
        }

        // Custom types fall back to the structural zero check.
        let (predicate, imports) = emptiness_predicate("t.F", field_type(&source, "F"));
        assert_eq!(predicate, "reflect.ValueOf(t.F).IsZero()");
        assert_eq!(imports, vec![Import::new("reflect", "")]);
    }

    #[test]
    fn variable_names_are_deterministic_and_ordinal_scoped() {
        let source = subject_source();
        let ctx = context(&source);

        assert_eq!(
            variable_name(&ctx),
            "vouch_dev_vouch_constraints_Regexp_Testdata_3"
        );

        let mut later = ctx.clone();
        later.ordinal = 4;
        assert_ne!(variable_name(&ctx), variable_name(&later));
    }

    #[test]
    fn expr_imports_skip_the_receiver() {
        let source = subject_source();
        let ctx = context(&source);

        let text = r#"
        package p

        func (t T) Constraints(v vouch.Subject) {
            v.Field(t.A).Constraints(c.Min(custom.Limit(t.E)))
        }
        "#;
        let file = parse(text, "expr.vg").expect("source should parse");
        let crate::syntax::Decl::Func(func) = &file.decls[0] else {
            panic!("expected a function declaration");
        };
        let crate::syntax::Stmt::Expr(expr) = &func.body[0] else {
            panic!("expected an expression statement");
        };

        let imports = collect_expr_imports(&ctx, expr);
        assert_eq!(
            imports,
            vec![
                Import::new("vouch.dev/vouch/constraints", "c"),
                Import::new("example.com/custom", "custom"),
            ]
        );
    }

    #[test]
    fn regexp_hoists_a_compiled_pattern() {
        let source = subject_source();
        let ctx = context(&source);

        let pattern = Expr::Literal {
            kind: crate::syntax::LiteralKind::String,
            text: "\"^[a-z]+$\"".into(),
            span: Span::default(),
        };

        let output = regexp::emit(&ctx, field_type(&source, "A"), &[pattern])
            .expect("emitter should succeed");

        assert_eq!(output.vars.len(), 1);
        assert_eq!(
            output.vars[0].name,
            "vouch_dev_vouch_constraints_Regexp_Testdata_3"
        );
        assert_eq!(
            output.vars[0].value,
            "regexp.MustCompile(\"^[a-z]+$\")"
        );
        assert!(output
            .code
            .contains("if !vouch_dev_vouch_constraints_Regexp_Testdata_3.MatchString(t.A) {"));
        assert!(output.imports.contains(&Import::new("regexp", "")));
        assert!(output.warning.is_none());
    }

    #[test]
    fn regexp_requires_exactly_one_option() {
        let source = subject_source();
        let ctx = context(&source);

        let err = regexp::emit(&ctx, field_type(&source, "A"), &[]).unwrap_err();
        assert_eq!(err.to_string(), "expected exactly one option");
    }

    #[test]
    fn min_on_pointer_dereferences_behind_a_nil_check() {
        let source = subject_source();
        let ctx = context(&source);
        let registry = built_in();
        let emitter = registry.get(&qualified("Min")).unwrap();

        let bound = Expr::Literal {
            kind: crate::syntax::LiteralKind::Int,
            text: "1".into(),
            span: Span::default(),
        };

        let output = emitter(&ctx, field_type(&source, "B"), &[bound])
            .expect("emitter should succeed");

        assert!(output.code.contains("if t.A != nil && *t.A < 1 {"));
        // A pointer to string is still not numeric.
        assert_eq!(output.warning.as_deref(), Some(TYPE_WARNING));
    }

    #[test]
    fn mutually_inclusive_requires_all_or_none() {
        let source = subject_source();
        let mut ctx = context(&source);
        ctx.field_name = None;
        ctx.field_alias = None;
        ctx.var_name = "t".into();
        ctx.path_kind = PathKind::Struct;
        ctx.before_violation = String::new();
        ctx.after_violation = String::new();

        let args = [selector("t", "A"), selector("t", "E")];
        let node = &source.structs["T"].node;

        let output =
            mutually_inclusive::emit(&ctx, node, &args).expect("emitter should succeed");

        assert!(output.code.contains("var nonEmpty []string"));
        assert!(output
            .code
            .contains("if len(nonEmpty) != 0 && len(nonEmpty) != 2 {"));
        assert!(output.code.contains("\"fields are mutually inclusive\""));
    }

    #[test]
    fn mutually_exclusive_rejects_field_level_use() {
        let source = subject_source();
        let ctx = context(&source);

        let args = [selector("t", "A"), selector("t", "E")];
        let err = mutually_exclusive::emit(&ctx, field_type(&source, "A"), &args).unwrap_err();
        assert_eq!(
            err.to_string(),
            "`MutuallyExclusive` applied to non-struct type"
        );
    }

    fn selector(base: &str, member: &str) -> Expr {
        Expr::Selector {
            target: Box::new(Expr::Ident(base.into(), Span::default())),
            member: member.into(),
            member_span: Span::default(),
            span: Span::default(),
        }
    }
}
