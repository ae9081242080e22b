//! The code generator.
//!
//! Walks a [`Rules`] value in sorted order and synthesizes one `Validate`
//! routine per record type, dispatching every clause to the matching emitter
//! in the [`Registry`]. Imports and helper variables reported by emitters are
//! collected into insertion-ordered sets, so repeated emission deduplicates
//! and identical input always produces byte-identical output.

use indexmap::IndexSet;

use crate::constraints::collect_expr_imports;
use crate::diagnostics::{ErrorKind, VouchError, Warning};
use crate::rules::{ConstraintClause, FieldRules, Rules, TypeRules};
use crate::source::{field_alias, Field, Import, Source};
use crate::syntax::{printer, TypeExpr};

pub mod registry;
pub mod runtime;
pub mod write;

pub use registry::{EmitError, Emitter, Output, Registry, Variable};

/// Where in a value a violation was found, carried on every emitted
/// violation as its path-kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Struct,
    Field,
    Element,
    Key,
}

impl PathKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PathKind::Struct => "struct",
            PathKind::Field => "field",
            PathKind::Element => "element",
            PathKind::Key => "key",
        }
    }
}

/// Everything an emitter can see while generating one clause. Rebuilt for
/// every clause; cloning is cheap and keeps nested contexts (element and key
/// loops) independent of their parent.
#[derive(Debug, Clone)]
pub struct Context<'a> {
    pub source: &'a Source,
    /// The tag consulted for field aliases.
    pub tag_name: String,
    pub type_name: String,
    pub receiver: String,
    /// Set for field-level clauses; `None` at type level.
    pub field_name: Option<String>,
    /// The tag-derived alias for the current field.
    pub field_alias: Option<String>,
    /// Expression that accesses the value under validation.
    pub var_name: String,
    /// Expression producing the path segment for the current value.
    pub path: String,
    pub path_kind: PathKind,
    /// Statement to run before appending a violation (pushes the path).
    pub before_violation: String,
    /// Statement to run after appending a violation (pops the path).
    pub after_violation: String,
    /// Fully-qualified name of the constraint being generated.
    pub constraint: String,
    /// Running count of generated constraints, for unique helper names.
    pub ordinal: usize,
}

/// The generator's result: the full output text, plus any type-compatibility
/// warnings emitters raised along the way.
#[derive(Debug)]
pub struct Generated {
    pub text: String,
    pub warnings: Vec<Warning>,
}

pub struct Generator {
    registry: Registry,
    tag_name: String,
    ordinal: usize,

    code: String,
    imports: IndexSet<Import>,
    vars: IndexSet<Variable>,
    warnings: Vec<Warning>,
}

impl Generator {
    /// Returns a generator using the given constraint set and tag name.
    pub fn new(registry: Registry, tag_name: impl Into<String>) -> Self {
        let mut imports = IndexSet::new();
        imports.insert(Import::new("fmt", "fmt"));
        imports.insert(Import::new("strconv", "strconv"));

        Self {
            registry,
            tag_name: tag_name.into(),
            ordinal: 0,
            code: String::new(),
            imports,
            vars: IndexSet::new(),
            warnings: Vec::new(),
        }
    }

    /// Generates the complete output file for the given rules.
    pub fn generate(mut self, rules: &Rules, source: &Source) -> Result<Generated, VouchError> {
        // BTreeMap iteration gives types in sorted name order, so routines
        // come out in the same order each time.
        for (type_name, type_rules) in &rules.types {
            self.generate_type(source, type_name, type_rules)?;
        }

        let mut out = String::new();
        out.push_str("// Code generated by vouch. DO NOT EDIT.\n");
        out.push_str(&format!("package {}\n\n", source.package));

        for import in &self.imports {
            if import.alias.is_empty() {
                out.push_str(&format!("import \"{}\"\n", import.path));
            } else {
                out.push_str(&format!("import {} \"{}\"\n", import.alias, import.path));
            }
        }

        out.push('\n');
        out.push_str("// Reference imports to suppress errors if they aren't otherwise used\n");
        out.push_str("var _ = fmt.Sprintf\n");
        out.push_str("var _ = strconv.Itoa\n\n");

        if !self.vars.is_empty() {
            out.push_str("// Variables generated by constraints:\n");
            for var in &self.vars {
                out.push_str(&format!("var {} = {}\n", var.name, var.value));
            }
            out.push('\n');
        }

        out.push_str(runtime::SUPPORT);
        out.push('\n');
        out.push_str(&self.code);

        Ok(Generated {
            text: out,
            warnings: self.warnings,
        })
    }

    /// Generates the entire `Validate` routine for one record type.
    fn generate_type(
        &mut self,
        source: &Source,
        type_name: &str,
        type_rules: &TypeRules,
    ) -> Result<(), VouchError> {
        let Some(strct) = source.structs.get(type_name) else {
            return Ok(());
        };

        // Use the receiver name from the type's own methods where there is
        // one, so generated code reads like the code it sits next to.
        let receiver = source
            .methods
            .get(type_name)
            .and_then(|methods| methods.first())
            .map(|method| method.receiver.clone())
            .unwrap_or_else(|| derive_receiver(type_name));

        self.wc(&format!("// Validate validates this {}.\n", type_name));
        self.wc("// This method was generated by vouch.\n");
        self.wc(&format!(
            "func ({} {}) Validate(path *Path) []ConstraintViolation {{\n",
            receiver, type_name
        ));
        self.wc("\tvar violations []ConstraintViolation\n\n");
        self.wc("\tpath.Write(\".\")\n\n");

        let mut ctx = Context {
            source,
            tag_name: self.tag_name.clone(),
            type_name: type_name.to_string(),
            receiver: receiver.clone(),
            field_name: None,
            field_alias: None,
            var_name: receiver.clone(),
            path: String::new(),
            path_kind: PathKind::Struct,
            before_violation: String::new(),
            after_violation: String::new(),
            constraint: String::new(),
            ordinal: 0,
        };

        for clause in &type_rules.constraints {
            self.generate_constraint(&ctx, source, clause, &strct.node)?;
        }

        // BTreeMap iteration means fields generate in sorted name order, not
        // declaration order.
        for (field_name, field_rules) in &type_rules.fields {
            let Some(field) = strct.fields.get(field_name) else {
                return Err(VouchError::new(
                    ErrorKind::UnknownField {
                        type_name: type_name.to_string(),
                        field: field_name.clone(),
                    },
                    &source.context,
                    first_clause_span(field_rules).unwrap_or(strct.span),
                ));
            };

            let alias = field_alias(field_name, &self.tag_name, field.tag.as_deref()).map_err(
                |err| {
                    VouchError::new(
                        ErrorKind::MalformedTag {
                            field: field_name.clone(),
                            reason: err.to_string(),
                        },
                        &source.context,
                        field.span,
                    )
                },
            )?;

            ctx.field_name = Some(field_name.clone());
            ctx.var_name = format!("{}.{}", receiver, field_name);
            ctx.path = format!("\"{}\"", alias);
            ctx.field_alias = Some(alias);
            ctx.path_kind = PathKind::Field;
            ctx.before_violation = format!("size := path.Write({})", ctx.path);
            ctx.after_violation = "path.TruncateRight(size)".to_string();

            for clause in &field_rules.constraints {
                self.generate_constraint(&ctx, source, clause, &field.ty)?;
            }

            self.generate_iteration(&ctx, source, field_rules, field)?;
        }

        self.wc("\tpath.TruncateRight(1)\n\n");
        self.wc("\treturn violations\n");
        self.wc("}\n\n");

        Ok(())
    }

    /// Generates the loop for a field's element and key clauses, if any.
    /// Slices loop with an index; maps loop with key and value, which is
    /// also what makes `Keys` clauses possible.
    fn generate_iteration(
        &mut self,
        ctx: &Context,
        source: &Source,
        field_rules: &FieldRules,
        field: &Field,
    ) -> Result<(), VouchError> {
        if field_rules.elements.is_empty() && field_rules.keys.is_empty() {
            return Ok(());
        }

        let selector = format!("{}.{}", ctx.type_name, field.name);
        let alias = ctx
            .field_alias
            .clone()
            .unwrap_or_else(|| field.name.clone());

        match &field.ty {
            TypeExpr::Slice(element_type, _) => {
                if let Some(clause) = field_rules.keys.first() {
                    return Err(VouchError::new(
                        ErrorKind::KeysOnNonMap { selector },
                        &source.context,
                        clause.span,
                    ));
                }

                self.wc(&format!("\tfor i, element := range {} {{\n", ctx.var_name));

                for clause in &field_rules.elements {
                    let mut element_ctx = ctx.clone();
                    element_ctx.var_name = "element".to_string();
                    element_ctx.path =
                        format!("\"{}.[\" + strconv.Itoa(i) + \"]\"", alias);
                    element_ctx.before_violation =
                        format!("size := path.Write({})", element_ctx.path);
                    element_ctx.path_kind = PathKind::Element;

                    self.generate_constraint(&element_ctx, source, clause, element_type)?;
                }

                self.wc("\t}\n\n");
            }
            TypeExpr::Map { key, value, .. } => {
                self.wc(&format!(
                    "\tfor key, element := range {} {{\n",
                    ctx.var_name
                ));

                for clause in &field_rules.elements {
                    let mut element_ctx = ctx.clone();
                    element_ctx.var_name = "element".to_string();
                    element_ctx.path = format!(
                        "\"{}.[\" + fmt.Sprintf(\"%v\", key) + \"]\"",
                        alias
                    );
                    element_ctx.before_violation =
                        format!("size := path.Write({})", element_ctx.path);
                    element_ctx.path_kind = PathKind::Element;

                    self.generate_constraint(&element_ctx, source, clause, value)?;
                }

                for clause in &field_rules.keys {
                    let mut key_ctx = ctx.clone();
                    key_ctx.var_name = "key".to_string();
                    key_ctx.path = format!(
                        "\"{}.[\" + fmt.Sprintf(\"%v\", key) + \"]\"",
                        alias
                    );
                    key_ctx.before_violation = format!("size := path.Write({})", key_ctx.path);
                    key_ctx.path_kind = PathKind::Key;

                    self.generate_constraint(&key_ctx, source, clause, key)?;
                }

                self.wc("\t}\n\n");
            }
            _ => {
                let clause = field_rules
                    .elements
                    .first()
                    .or_else(|| field_rules.keys.first())
                    .expect("checked above that one bucket is non-empty");
                return Err(VouchError::new(
                    ErrorKind::ElementsOnNonIterable { selector },
                    &source.context,
                    clause.span,
                ));
            }
        }

        Ok(())
    }

    /// Generates the code for one clause via its registered emitter.
    fn generate_constraint(
        &mut self,
        ctx: &Context,
        source: &Source,
        clause: &ConstraintClause,
        field_type: &TypeExpr,
    ) -> Result<(), VouchError> {
        self.ordinal += 1;

        let mut ctx = ctx.clone();
        ctx.constraint = clause.name.clone();
        ctx.ordinal = self.ordinal;

        let selector = match &ctx.field_name {
            Some(field) => format!("{}.{}", ctx.type_name, field),
            None => ctx.type_name.clone(),
        };

        let Some(emitter) = self.registry.get(&clause.name) else {
            return Err(VouchError::new(
                ErrorKind::UnknownConstraint {
                    name: clause.name.clone(),
                },
                &source.context,
                clause.span,
            ));
        };

        let output = emitter(&ctx, field_type, &clause.args).map_err(|err| {
            VouchError::new(
                ErrorKind::Emit {
                    selector: selector.clone(),
                    constraint: clause.name.clone(),
                    message: err.to_string(),
                },
                &source.context,
                clause.span,
            )
        })?;

        if let Some(message) = &output.warning {
            self.warnings.push(Warning::new(
                format!(
                    "warning generating code for {}'s {:?} constraint: {}",
                    selector, clause.name, message
                ),
                &source.context,
                clause.span,
            ));
        }

        for import in output.imports {
            self.imports.insert(import);
        }
        for var in output.vars {
            self.vars.insert(var);
        }

        // A clause gated by a When predicate wraps its whole fragment.
        let code = match &clause.predicate {
            Some(predicate) => {
                for import in collect_expr_imports(&ctx, predicate) {
                    self.imports.insert(import);
                }
                format!(
                    "\tif {} {{\n{}\t}}\n",
                    printer::expr_to_string(predicate),
                    output.code
                )
            }
            None => output.code,
        };

        self.code.push_str(&code);
        self.code.push('\n');

        Ok(())
    }

    fn wc(&mut self, code: &str) {
        self.code.push_str(code);
    }
}

fn derive_receiver(type_name: &str) -> String {
    match type_name.chars().next() {
        Some(first) => first.to_lowercase().to_string(),
        None => "v".to_string(),
    }
}

fn first_clause_span(field_rules: &FieldRules) -> Option<crate::syntax::Span> {
    field_rules
        .constraints
        .first()
        .or_else(|| field_rules.elements.first())
        .or_else(|| field_rules.keys.first())
        .map(|clause| clause.span)
}
