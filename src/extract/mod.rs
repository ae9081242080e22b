//! The extractor: turns constraints methods into [`Rules`].
//!
//! Discovery scans every type's methods for the DSL's signature shape — no
//! results, one parameter, and that parameter typed as the `Subject` marker
//! imported from the framework's own module path. Each statement in a
//! discovered method is then read as a chain of DSL calls.
//!
//! Statements that don't look like DSL usage at all (declarations,
//! assignments, calls on other values) are skipped with a warning.
//! Statements that are clearly DSL but break its contract abort extraction
//! for the whole file.

use std::collections::BTreeMap;

use crate::diagnostics::{ErrorKind, VouchError, Warning};
use crate::rules::{ConstraintClause, FieldRules, Rules, TypeRules};
use crate::source::{Method, Source};
use crate::syntax::{Expr, Span, Stmt, TypeExpr};

pub mod chain;

use chain::Link;

/// The module path the `Subject` marker type must be imported from.
pub const MODULE_PATH: &str = "vouch.dev/vouch";

/// The name of the sentinel marker type.
pub const SUBJECT_TYPE_NAME: &str = "Subject";

/// The result of extraction: the rules, plus any statements that were
/// skipped along the way.
#[derive(Debug)]
pub struct Extraction {
    pub rules: Rules,
    pub warnings: Vec<Warning>,
}

/// Extracts validation rules from every constraints method in the source.
pub fn extract(source: &Source) -> Result<Extraction, VouchError> {
    let mut extractor = Extractor {
        source,
        warnings: Vec::new(),
    };

    let mut rules = Rules::default();

    for (type_name, method) in extractor.constraints_methods() {
        let type_rules = extractor.build_type_rules(&type_name, method)?;
        rules.types.insert(type_name, type_rules);
    }

    Ok(Extraction {
        rules,
        warnings: extractor.warnings,
    })
}

struct Extractor<'a> {
    source: &'a Source,
    warnings: Vec<Warning>,
}

impl<'a> Extractor<'a> {
    /// Finds the first constraints method of each type. Later qualifying
    /// methods are ignored.
    fn constraints_methods(&self) -> BTreeMap<String, &'a Method> {
        let mut found = BTreeMap::new();

        for (type_name, methods) in &self.source.methods {
            for method in methods {
                if self.is_constraints_method(method) {
                    found.insert(type_name.clone(), method);
                    break;
                }
            }
        }

        found
    }

    fn is_constraints_method(&self, method: &Method) -> bool {
        if !method.results.is_empty() || method.params.len() != 1 {
            // Constraints methods don't return anything, and take one param.
            return false;
        }

        let TypeExpr::Qualified {
            package, member, ..
        } = &method.params[0].ty
        else {
            return false;
        };

        if member != SUBJECT_TYPE_NAME {
            return false;
        }

        // The marker type must come from our module, not one that happens to
        // share the name.
        matches!(
            self.source.import_by_alias(package),
            Some(import) if import.path == MODULE_PATH
        )
    }

    fn build_type_rules(
        &mut self,
        type_name: &str,
        method: &'a Method,
    ) -> Result<TypeRules, VouchError> {
        let mut rules = TypeRules::default();
        let param_name = &method.params[0].name;

        for stmt in &method.body {
            let Some(links) = self.statement_chain(param_name, stmt) else {
                continue;
            };
            self.interpret_chain(type_name, method, &links, &mut rules)?;
        }

        Ok(rules)
    }

    /// Builds the call chain for one statement, or reports why the statement
    /// was skipped. `None` always means a warning was recorded.
    fn statement_chain(&mut self, param_name: &str, stmt: &'a Stmt) -> Option<Vec<Link<'a>>> {
        let expr = match stmt {
            Stmt::Expr(expr) => expr,
            other => {
                self.warn("skipping statement that is not an expression", other.span());
                return None;
            }
        };

        if !matches!(expr, Expr::Call { .. }) {
            self.warn("skipping statement that is not a call expression", expr.span());
            return None;
        }

        let links = match chain::build(expr) {
            Ok(links) => links,
            Err(err) => {
                self.warn(
                    format!("skipping statement with unexpected structure: {}", err.message),
                    err.span,
                );
                return None;
            }
        };

        // Calls must hang off the method's Subject parameter. It doesn't
        // have to be called `v`, so compare against the parameter name.
        match links.first() {
            Some(Link::Root { name, .. }) if *name == param_name => Some(links),
            _ => {
                self.warn("skipping call that isn't on the Subject value", expr.span());
                None
            }
        }
    }

    fn interpret_chain(
        &mut self,
        type_name: &str,
        method: &Method,
        links: &[Link<'a>],
        rules: &mut TypeRules,
    ) -> Result<(), VouchError> {
        let mut predicate: Option<&Expr> = None;
        let mut index = 1;

        while index < links.len() {
            let Link::Call {
                method: name,
                method_span,
                args,
                span,
            } = links[index]
            else {
                unreachable!("only the first link can be a root");
            };

            match name {
                "Constraints" => {
                    let clauses = self.constraint_clauses(predicate, args)?;
                    rules.constraints.extend(clauses);
                    index += 1;
                }
                "Field" => {
                    let (field_name, field_rules) =
                        self.field_rules(type_name, method, predicate, &links[index..])?;

                    // Merge with any rules from earlier statements on the
                    // same field.
                    let entry = rules.fields.entry(field_name).or_default();
                    entry.constraints.extend(field_rules.constraints);
                    entry.elements.extend(field_rules.elements);
                    entry.keys.extend(field_rules.keys);

                    // Field consumes the remainder of the statement.
                    index = links.len();
                }
                "When" => {
                    if args.len() != 1 {
                        return Err(self.error(
                            ErrorKind::WrongArity {
                                method: "When".into(),
                            },
                            span,
                        ));
                    }
                    predicate = Some(&args[0]);
                    index += 1;
                }
                other => {
                    return Err(self.error(
                        ErrorKind::UnknownDslMethod {
                            method: other.into(),
                            on: SUBJECT_TYPE_NAME.into(),
                        },
                        method_span,
                    ));
                }
            }
        }

        Ok(())
    }

    /// Interprets `Field(...)` and everything chained after it. `links[0]`
    /// is the Field call itself.
    fn field_rules(
        &mut self,
        type_name: &str,
        method: &Method,
        predicate: Option<&Expr>,
        links: &[Link<'a>],
    ) -> Result<(String, FieldRules), VouchError> {
        let Link::Call { args, span, .. } = links[0] else {
            unreachable!("field_rules is only called on a call link");
        };

        if args.len() != 1 {
            return Err(self.error(
                ErrorKind::WrongArity {
                    method: "Field".into(),
                },
                span,
            ));
        }

        if links.len() == 1 {
            return Err(self.error(ErrorKind::DanglingField, span));
        }

        let Expr::Selector { target, member, .. } = &args[0] else {
            return Err(self.error(ErrorKind::FieldNotSelector, args[0].span()));
        };

        match target.as_ref() {
            Expr::Ident(base, _) if *base == method.receiver => {}
            _ => return Err(self.error(ErrorKind::FieldNotOnReceiver, target.span())),
        }

        // Configured fields must exist on the record type.
        if let Some(strct) = self.source.structs.get(type_name) {
            if !strct.fields.contains_key(member) {
                return Err(self.error(
                    ErrorKind::UnknownField {
                        type_name: type_name.into(),
                        field: member.clone(),
                    },
                    args[0].span(),
                ));
            }
        }

        let mut rules = FieldRules::default();

        for link in &links[1..] {
            let Link::Call {
                method: name,
                method_span,
                args,
                ..
            } = *link
            else {
                unreachable!("only the first link can be a root");
            };

            let bucket = match name {
                "Constraints" => &mut rules.constraints,
                "Elements" => &mut rules.elements,
                "Keys" => &mut rules.keys,
                other => {
                    return Err(self.error(
                        ErrorKind::UnknownDslMethod {
                            method: other.into(),
                            on: "Field".into(),
                        },
                        method_span,
                    ));
                }
            };

            bucket.extend(self.constraint_clauses(predicate, args)?);
        }

        Ok((member.clone(), rules))
    }

    fn constraint_clauses(
        &self,
        predicate: Option<&Expr>,
        args: &[Expr],
    ) -> Result<Vec<ConstraintClause>, VouchError> {
        args.iter()
            .map(|arg| self.constraint_clause(predicate, arg))
            .collect()
    }

    /// One argument to `Constraints`/`Elements`/`Keys` must be a call of a
    /// function in an imported package; local constraints aren't supported.
    fn constraint_clause(
        &self,
        predicate: Option<&Expr>,
        expr: &Expr,
    ) -> Result<ConstraintClause, VouchError> {
        let Expr::Call { callee, args, span } = expr else {
            return Err(self.error(ErrorKind::ConstraintNotImportedCall, expr.span()));
        };

        let Expr::Selector { target, member, .. } = callee.as_ref() else {
            return Err(self.error(ErrorKind::ConstraintNotImportedCall, expr.span()));
        };

        let Expr::Ident(package, _) = target.as_ref() else {
            return Err(self.error(ErrorKind::ConstraintNotImportedCall, expr.span()));
        };

        let Some(import) = self.source.import_by_alias(package) else {
            return Err(self.error(ErrorKind::ConstraintNotImportedCall, expr.span()));
        };

        Ok(ConstraintClause {
            name: format!("{}.{}", import.path, member),
            predicate: predicate.cloned(),
            args: args.clone(),
            span: *span,
        })
    }

    fn warn(&mut self, message: impl Into<String>, span: Span) {
        self.warnings
            .push(Warning::new(message, &self.source.context, span));
    }

    fn error(&self, kind: ErrorKind, span: Span) -> VouchError {
        VouchError::new(kind, &self.source.context, span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;

    fn read(text: &str) -> Source {
        let file = parse(text, "test.vg").expect("source should parse");
        Source::from_file(file, "test.vg", text)
    }

    fn header() -> &'static str {
        r#"
        package td01

        import (
            "vouch.dev/vouch"
            c "vouch.dev/vouch/constraints"
        )
        "#
    }

    fn extract_ok(body: &str) -> Extraction {
        let text = format!("{}\n{}", header(), body);
        let source = read(&text);
        extract(&source).expect("extraction should succeed")
    }

    fn extract_err(body: &str) -> VouchError {
        let text = format!("{}\n{}", header(), body);
        let source = read(&text);
        extract(&source).expect_err("extraction should fail")
    }

    #[test]
    fn field_constraints_arrive_in_argument_order() {
        let extraction = extract_ok(
            r#"
            type Subject struct {
                SomeText string
            }

            func (s Subject) Constraints(v vouch.Subject) {
                v.Field(s.SomeText).Constraints(c.Required(), c.MinLength(1), c.MaxLength(64))
            }
            "#,
        );

        let field = &extraction.rules.types["Subject"].fields["SomeText"];
        let names: Vec<&str> = field.constraints.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "vouch.dev/vouch/constraints.Required",
                "vouch.dev/vouch/constraints.MinLength",
                "vouch.dev/vouch/constraints.MaxLength",
            ]
        );
        assert!(extraction.warnings.is_empty());
    }

    #[test]
    fn types_without_constraints_methods_are_absent() {
        let extraction = extract_ok(
            r#"
            type Subject struct {
                SomeText string
            }

            type Bystander struct {
                SomeText string
            }

            func (s Subject) Constraints(v vouch.Subject) {
                v.Field(s.SomeText).Constraints(c.Required())
            }

            func (b Bystander) Rename(name string) {
                b.SomeText = name
            }
            "#,
        );

        assert!(extraction.rules.types.contains_key("Subject"));
        assert!(!extraction.rules.types.contains_key("Bystander"));
    }

    #[test]
    fn first_constraints_method_wins() {
        let extraction = extract_ok(
            r#"
            type Subject struct {
                SomeText string
                SomeBool bool
            }

            func (s Subject) Primary(v vouch.Subject) {
                v.Field(s.SomeText).Constraints(c.Required())
            }

            func (s Subject) Secondary(v vouch.Subject) {
                v.Field(s.SomeBool).Constraints(c.Required())
            }
            "#,
        );

        let type_rules = &extraction.rules.types["Subject"];
        assert!(type_rules.fields.contains_key("SomeText"));
        assert!(!type_rules.fields.contains_key("SomeBool"));
    }

    #[test]
    fn sentinel_type_must_come_from_the_framework_module() {
        let text = r#"
        package td01

        import (
            other "example.com/other"
            c "vouch.dev/vouch/constraints"
        )

        type Subject struct {
            SomeText string
        }

        func (s Subject) Constraints(v other.Subject) {
            v.Field(s.SomeText).Constraints(c.Required())
        }
        "#;
        let source = read(text);
        let extraction = extract(&source).expect("extraction should succeed");
        assert!(extraction.rules.types.is_empty());
    }

    #[test]
    fn non_dsl_statements_are_skipped_with_warnings() {
        let extraction = extract_ok(
            r#"
            type Subject struct {
                SomeText string
            }

            func (s Subject) Constraints(v vouch.Subject) {
                x := 1
                x = 2
                doSomething(s)
                s.Helper()
                v.Field(s.SomeText).Constraints(c.Required())
            }
            "#,
        );

        // The real statement still configures the field.
        let field = &extraction.rules.types["Subject"].fields["SomeText"];
        assert_eq!(field.constraints.len(), 1);

        let messages: Vec<String> = extraction
            .warnings
            .iter()
            .map(|w| w.to_string())
            .collect();
        assert_eq!(messages.len(), 4);
        assert!(messages[0].contains("skipping statement that is not an expression"));
        assert!(messages[1].contains("skipping statement that is not an expression"));
        assert!(messages[2].contains("skipping statement with unexpected structure"));
        assert!(messages[3].contains("skipping call that isn't on the Subject value"));
    }

    #[test]
    fn statements_on_the_same_field_merge() {
        let extraction = extract_ok(
            r#"
            type Subject struct {
                SomeText string
            }

            func (s Subject) Constraints(v vouch.Subject) {
                v.Field(s.SomeText).Constraints(c.Required())
                v.Field(s.SomeText).Constraints(c.MinLength(1))
            }
            "#,
        );

        let field = &extraction.rules.types["Subject"].fields["SomeText"];
        assert_eq!(field.constraints.len(), 2);
        assert_eq!(field.constraints[0].name, "vouch.dev/vouch/constraints.Required");
        assert_eq!(field.constraints[1].name, "vouch.dev/vouch/constraints.MinLength");
    }

    #[test]
    fn elements_and_keys_land_in_their_own_buckets() {
        let extraction = extract_ok(
            r#"
            type Subject struct {
                SomeMap map[string]int
            }

            func (s Subject) Constraints(v vouch.Subject) {
                v.Field(s.SomeMap).
                    Constraints(c.MinLength(1)).
                    Elements(c.Min(1)).
                    Keys(c.MinLength(3))
            }
            "#,
        );

        let field = &extraction.rules.types["Subject"].fields["SomeMap"];
        assert_eq!(field.constraints.len(), 1);
        assert_eq!(field.elements.len(), 1);
        assert_eq!(field.keys.len(), 1);
        assert_eq!(field.elements[0].name, "vouch.dev/vouch/constraints.Min");
        assert_eq!(field.keys[0].name, "vouch.dev/vouch/constraints.MinLength");
    }

    #[test]
    fn when_predicate_applies_to_the_rest_of_the_statement_only() {
        let extraction = extract_ok(
            r#"
            type Subject struct {
                SomeText string
                SomePtr  *Subject
            }

            func (s Subject) Constraints(v vouch.Subject) {
                v.When(s.SomeText == "on").Field(s.SomePtr).Constraints(c.Required())
                v.Field(s.SomeText).Constraints(c.Required())
            }
            "#,
        );

        let fields = &extraction.rules.types["Subject"].fields;
        assert!(fields["SomePtr"].constraints[0].predicate.is_some());
        assert!(fields["SomeText"].constraints[0].predicate.is_none());
    }

    #[test]
    fn type_level_constraints_collect_in_order() {
        let extraction = extract_ok(
            r#"
            type Subject struct {
                SomeText string
                SomeBool bool
            }

            func (s Subject) Constraints(v vouch.Subject) {
                v.Constraints(c.MutuallyExclusive(s.SomeText, s.SomeBool))
                v.Constraints(c.MutuallyInclusive(s.SomeText, s.SomeBool))
            }
            "#,
        );

        let type_rules = &extraction.rules.types["Subject"];
        assert_eq!(type_rules.constraints.len(), 2);
        assert_eq!(
            type_rules.constraints[0].name,
            "vouch.dev/vouch/constraints.MutuallyExclusive"
        );
    }

    #[test]
    fn non_call_constraint_argument_is_a_hard_error() {
        let err = extract_err(
            r#"
            type Subject struct {
                SomeText string
            }

            func (s Subject) Constraints(v vouch.Subject) {
                v.Field(s.SomeText).Constraints("not a call")
            }
            "#,
        );

        assert_eq!(err.kind, ErrorKind::ConstraintNotImportedCall);
        assert_eq!(
            err.to_string(),
            "constraint must be a function call from an imported package"
        );
    }

    #[test]
    fn constraint_from_unimported_package_is_a_hard_error() {
        let err = extract_err(
            r#"
            type Subject struct {
                SomeText string
            }

            func (s Subject) Constraints(v vouch.Subject) {
                v.Field(s.SomeText).Constraints(nowhere.Required())
            }
            "#,
        );

        assert_eq!(err.kind, ErrorKind::ConstraintNotImportedCall);
    }

    #[test]
    fn field_selector_must_be_on_the_receiver() {
        let err = extract_err(
            r#"
            type Subject struct {
                SomeText string
            }

            func (s Subject) Constraints(v vouch.Subject) {
                v.Field(c.SomeText).Constraints(c.Required())
            }
            "#,
        );

        assert_eq!(err.kind, ErrorKind::FieldNotOnReceiver);
    }

    #[test]
    fn unchained_field_is_a_hard_error() {
        let err = extract_err(
            r#"
            type Subject struct {
                SomeText string
            }

            func (s Subject) Constraints(v vouch.Subject) {
                v.Field(s.SomeText)
            }
            "#,
        );

        assert_eq!(err.kind, ErrorKind::DanglingField);
        assert_eq!(err.to_string(), "a method should be called on Field");
    }

    #[test]
    fn field_arity_is_checked() {
        let err = extract_err(
            r#"
            type Subject struct {
                SomeText string
                SomeBool bool
            }

            func (s Subject) Constraints(v vouch.Subject) {
                v.Field(s.SomeText, s.SomeBool).Constraints(c.Required())
            }
            "#,
        );

        assert_eq!(err.kind, ErrorKind::WrongArity { method: "Field".into() });
    }

    #[test]
    fn when_arity_is_checked() {
        let err = extract_err(
            r#"
            type Subject struct {
                SomeText string
            }

            func (s Subject) Constraints(v vouch.Subject) {
                v.When(s.SomeText, s.SomeText).Field(s.SomeText).Constraints(c.Required())
            }
            "#,
        );

        assert_eq!(err.kind, ErrorKind::WrongArity { method: "When".into() });
    }

    #[test]
    fn unknown_field_is_a_hard_error() {
        let err = extract_err(
            r#"
            type Subject struct {
                SomeText string
            }

            func (s Subject) Constraints(v vouch.Subject) {
                v.Field(s.Missing).Constraints(c.Required())
            }
            "#,
        );

        assert_eq!(
            err.kind,
            ErrorKind::UnknownField {
                type_name: "Subject".into(),
                field: "Missing".into(),
            }
        );
    }

    #[test]
    fn unknown_subject_method_is_a_hard_error() {
        let err = extract_err(
            r#"
            type Subject struct {
                SomeText string
            }

            func (s Subject) Constraints(v vouch.Subject) {
                v.Frobnicate(s.SomeText)
            }
            "#,
        );

        assert_eq!(
            err.kind,
            ErrorKind::UnknownDslMethod {
                method: "Frobnicate".into(),
                on: "Subject".into(),
            }
        );
    }
}
