//! The source model: everything the extractor and generator need to know
//! about one parsed host file, in lookup-friendly form.
//!
//! Struct fields and types are keyed in ordered maps, so every walk over
//! them is sorted by name. That ordering is what makes generated output
//! byte-identical across runs regardless of declaration order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diagnostics::SourceContext;
use crate::syntax::{Decl, Param, SourceFile, Span, Stmt, TypeExpr};

/// One import, with its resolved alias. When no alias is written in the
/// source, the last segment of the import path stands in for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Import {
    pub alias: String,
    pub path: String,
}

impl Import {
    pub fn new(path: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            path: path.into(),
        }
    }
}

/// The in-memory representation of one source file. Immutable once built;
/// owned by the pipeline run that created it.
#[derive(Debug, Clone)]
pub struct Source {
    pub context: SourceContext,
    pub file_name: String,
    pub package: String,
    pub imports: Vec<Import>,
    pub structs: BTreeMap<String, Struct>,
    pub methods: BTreeMap<String, Vec<Method>>,
}

#[derive(Debug, Clone)]
pub struct Struct {
    pub name: String,
    /// Stands for the record type itself in type-level constraint contexts.
    pub node: TypeExpr,
    /// Keyed by field name; iteration order is sorted by name.
    pub fields: BTreeMap<String, Field>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub ty: TypeExpr,
    /// Raw tag contents, without the enclosing backticks.
    pub tag: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Method {
    pub receiver: String,
    pub name: String,
    pub params: Vec<Param>,
    pub results: Vec<TypeExpr>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

impl Source {
    /// Distills a parsed file into the source model.
    pub fn from_file(file: SourceFile, file_name: &str, text: &str) -> Source {
        let mut source = Source {
            context: SourceContext::from_file(file_name, text),
            file_name: file_name.to_string(),
            package: file.package,
            imports: Vec::new(),
            structs: BTreeMap::new(),
            methods: BTreeMap::new(),
        };

        for import in file.imports {
            let alias = import
                .alias
                .unwrap_or_else(|| last_path_segment(&import.path).to_string());
            source.imports.push(Import {
                alias,
                path: import.path,
            });
        }

        for decl in file.decls {
            match decl {
                Decl::Struct(decl) => {
                    let mut fields = BTreeMap::new();
                    for field in decl.fields {
                        fields.insert(
                            field.name.clone(),
                            Field {
                                name: field.name,
                                ty: field.ty,
                                tag: field.tag,
                                span: field.span,
                            },
                        );
                    }

                    source.structs.insert(
                        decl.name.clone(),
                        Struct {
                            name: decl.name,
                            node: TypeExpr::Struct(decl.span),
                            fields,
                            span: decl.span,
                        },
                    );
                }
                Decl::Func(decl) => {
                    let Some(receiver) = decl.receiver else {
                        continue;
                    };

                    // A method receiver is at most one pointer away from the
                    // named type it belongs to.
                    let type_name = match unpack_pointer(&receiver.ty) {
                        TypeExpr::Named(name, _) => name.clone(),
                        _ => continue,
                    };

                    source.methods.entry(type_name).or_default().push(Method {
                        receiver: receiver.name,
                        name: decl.name,
                        params: decl.params,
                        results: decl.results,
                        body: decl.body,
                        span: decl.span,
                    });
                }
            }
        }

        source
    }

    /// Looks for an import with the given name (or alias).
    pub fn import_by_alias(&self, name: &str) -> Option<&Import> {
        self.imports.iter().find(|imp| imp.alias == name)
    }
}

fn unpack_pointer(ty: &TypeExpr) -> &TypeExpr {
    match ty {
        TypeExpr::Pointer(inner, _) => inner,
        other => other,
    }
}

fn last_path_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct TagError(String);

/// Resolves the output alias for a field from its raw tag string.
///
/// Returns the value of the `tag_name` key up to the first comma, trimmed.
/// Falls back to the field's declared name when the tag is absent, has no
/// matching key, or the matching value is empty. A tag string that does not
/// follow the ``key:"value"`` form at all is an error.
pub fn field_alias(field_name: &str, tag_name: &str, tag: Option<&str>) -> Result<String, TagError> {
    let Some(tag) = tag else {
        return Ok(field_name.to_string());
    };

    let mut rest = tag;

    loop {
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            return Ok(field_name.to_string());
        }

        let name_len = rest
            .bytes()
            .take_while(|&b| b > b' ' && b != b':' && b != b'"' && b != 0x7f)
            .count();
        if name_len == 0 {
            return Err(TagError(format!("bad syntax for struct tag pair: {tag:?}")));
        }

        let name = &rest[..name_len];
        rest = &rest[name_len..];

        if !rest.starts_with(":\"") {
            return Err(TagError(format!("bad syntax for struct tag value: {tag:?}")));
        }
        rest = &rest[2..];

        let mut value = String::new();
        let mut bytes = rest.char_indices();
        let mut closed_at = None;
        while let Some((i, ch)) = bytes.next() {
            match ch {
                '\\' => {
                    if let Some((_, escaped)) = bytes.next() {
                        value.push(escaped);
                    }
                }
                '"' => {
                    closed_at = Some(i);
                    break;
                }
                other => value.push(other),
            }
        }

        let Some(end) = closed_at else {
            return Err(TagError(format!("bad syntax for struct tag value: {tag:?}")));
        };
        rest = &rest[end + 1..];

        if name != tag_name {
            continue;
        }

        let alias = value.split(',').next().unwrap_or("").trim();
        if alias.is_empty() {
            return Ok(field_name.to_string());
        }
        return Ok(alias.to_string());
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

    #[test]
    fn builds_imports_with_default_aliases() {
        let source = read(
            r#"
            package td01

            import (
                "vouch.dev/vouch"
                c "vouch.dev/vouch/constraints"
                "fmt"
            )
            "#,
        );

        assert_eq!(source.package, "td01");
        assert_eq!(source.imports.len(), 3);
        assert_eq!(source.imports[0], Import::new("vouch.dev/vouch", "vouch"));
        assert_eq!(
            source.imports[1],
            Import::new("vouch.dev/vouch/constraints", "c")
        );
        assert_eq!(source.imports[2], Import::new("fmt", "fmt"));

        assert_eq!(
            source.import_by_alias("c").map(|imp| imp.path.as_str()),
            Some("vouch.dev/vouch/constraints")
        );
        assert!(source.import_by_alias("missing").is_none());
    }

    #[test]
    fn keys_methods_by_receiver_type() {
        let source = read(
            r#"
            package td01

            type Subject struct {
                SomeText string
            }

            func (s Subject) Constraints(v vouch.Subject) {
                v.Field(s.SomeText).Constraints(c.Required())
            }

            func (s *Subject) Reset() {
                s.SomeText = ""
            }

            func Helper() {
                x := 1
                x = x
            }
            "#,
        );

        let methods = source.methods.get("Subject").expect("methods should exist");
        assert_eq!(methods.len(), 2);
        assert_eq!(methods[0].name, "Constraints");
        assert_eq!(methods[0].receiver, "s");
        assert_eq!(methods[1].name, "Reset");
    }

    #[test]
    fn field_iteration_is_sorted_by_name() {
        let source = read(
            r#"
            package td01

            type Subject struct {
                Zebra string
                Apple string
                Mango string
            }
            "#,
        );

        let strct = source.structs.get("Subject").expect("struct should exist");
        let names: Vec<&str> = strct.fields.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Apple", "Mango", "Zebra"]);
    }

    #[test]
    fn alias_falls_back_to_field_name() {
        assert_eq!(field_alias("testField", "vouch", None).unwrap(), "testField");
        assert_eq!(
            field_alias("testField", "vouch", Some(r#"json:"test""#)).unwrap(),
            "testField"
        );
        assert_eq!(
            field_alias("testField", "vouch", Some(r#"vouch:"""#)).unwrap(),
            "testField"
        );
    }

    #[test]
    fn alias_errors_on_invalid_tag() {
        assert!(field_alias("testField", "vouch", Some("this is not a valid tag")).is_err());
    }

    #[test]
    fn alias_reads_matching_tag() {
        assert_eq!(
            field_alias("testField", "vouch", Some(r#"vouch:"test_field""#)).unwrap(),
            "test_field"
        );
        assert_eq!(
            field_alias("testField", "json", Some(r#"json:"test_field,omitempty""#)).unwrap(),
            "test_field"
        );
        assert_eq!(
            field_alias("testField", "vouch", Some(r#"vouch:"  test_field  ""#)).unwrap(),
            "test_field"
        );
        assert_eq!(
            field_alias(
                "testField",
                "vouch",
                Some(r#"json:"other" vouch:"test_field""#)
            )
            .unwrap(),
            "test_field"
        );
    }
}
