//! Import/export rewriting of bundled modules.
//!
//! Turns an ES module produced by the bundler into the body of a factory
//! function: imports of shared dependencies become reads from the injected
//! dependency table, and the default export becomes the factory's return
//! value.

use thiserror::Error;

use crate::compile::lexer::{SyntaxError, Token, TokenKind, tokenize};
use crate::compile::types::SpecifierMatch;
use crate::compile::wrap::js_string;

/// Name of the factory parameter holding the dependency table.
pub const DEPS_PARAM: &str = "__pl_deps";

/// Helper resolving the default binding of an injected dependency.
pub const INTEROP_HELPER: &str = "__pl_default";

/// Binding that holds an anonymous default export.
const EXPORT_BINDING: &str = "__pl_export";

/// Why a module cannot be turned into a factory body.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RewriteError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("malformed {statement} statement at byte {offset}")]
    Malformed {
        statement: &'static str,
        offset: usize,
    },

    #[error("module has no default export")]
    MissingDefaultExport,

    #[error("module has {count} default exports, expected exactly one")]
    MultipleDefaultExports { count: usize },

    #[error("re-export at byte {offset} is not supported; import the binding and export it")]
    ReExport { offset: usize },
}

/// A factory body ready to be wrapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenModule {
    /// Processed body. The content hash is computed over this text.
    pub body: String,

    /// Identifier returned by the factory.
    pub default_export: String,

    /// Number of import declarations bound to the dependency table.
    pub injected_imports: usize,
}

/// Rewrites top-level `import`/`export` statements of one module.
#[derive(Debug, Clone, Copy)]
pub struct ModuleRewriter<'a> {
    externals: &'a [String],
    mode: SpecifierMatch,
}

struct Edit {
    start: usize,
    end: usize,
    replacement: String,
}

struct ImportDecl<'a> {
    specifier: &'a str,
    default: Option<&'a str>,
    namespace: Option<&'a str>,
    /// `(property, local)` pairs, property kept as written (may be quoted).
    named: Vec<(&'a str, &'a str)>,
    /// Index one past the last token of the statement.
    next: usize,
}

impl<'a> ModuleRewriter<'a> {
    pub fn new(externals: &'a [String], mode: SpecifierMatch) -> Self {
        Self { externals, mode }
    }

    fn is_external(&self, specifier: &str) -> bool {
        self.externals
            .iter()
            .any(|declared| self.mode.matches(declared, specifier))
    }

    /// Rewrite `source` into a factory body.
    pub fn rewrite(&self, source: &str) -> Result<RewrittenModule, RewriteError> {
        let tokens = tokenize(source)?;
        let mut edits = Vec::new();
        let mut defaults = Vec::new();
        let mut injected_imports = 0;
        let mut uses_interop = false;
        let mut depth = 0usize;
        let mut i = 0;

        while i < tokens.len() {
            let token = &tokens[i];
            if depth == 0 && at_statement_start(source, &tokens, i) {
                if token.is_ident("import") && is_import_declaration(&tokens, i) {
                    let decl = parse_import(&tokens, i)?;
                    if self.is_external(decl.specifier) {
                        uses_interop |= decl.default.is_some();
                        injected_imports += 1;
                        edits.push(Edit {
                            start: token.start,
                            end: tokens[decl.next - 1].end,
                            replacement: injected_bindings(&decl),
                        });
                    }
                    i = decl.next;
                    continue;
                }
                if token.is_ident("export") {
                    i = rewrite_export(&tokens, i, &mut edits, &mut defaults)?;
                    continue;
                }
            }

            if token.kind == TokenKind::Punct {
                match token.text {
                    "{" | "(" | "[" => depth += 1,
                    "}" | ")" | "]" => depth = depth.saturating_sub(1),
                    _ => {}
                }
            }
            i += 1;
        }

        let default_export = match defaults.len() {
            0 => return Err(RewriteError::MissingDefaultExport),
            1 => defaults.remove(0),
            count => return Err(RewriteError::MultipleDefaultExports { count }),
        };

        let mut body = String::with_capacity(source.len() + 128);
        if uses_interop {
            body.push_str(&format!(
                "const {INTEROP_HELPER} = (m) => (m != null && typeof m === \"object\" && \"default\" in m ? m.default : m);\n"
            ));
        }
        let mut cursor = 0;
        for edit in &edits {
            body.push_str(&source[cursor..edit.start]);
            body.push_str(&edit.replacement);
            cursor = edit.end;
        }
        body.push_str(&source[cursor..]);
        if !body.ends_with('\n') {
            body.push('\n');
        }
        body.push_str(&format!("return {default_export};\n"));

        Ok(RewrittenModule {
            body,
            default_export,
            injected_imports,
        })
    }
}

fn at_statement_start(source: &str, tokens: &[Token<'_>], i: usize) -> bool {
    let Some(prev) = i.checked_sub(1).map(|p| &tokens[p]) else {
        return true;
    };
    if prev.is_punct('.') {
        return false;
    }
    prev.is_punct(';') || prev.is_punct('}') || source[prev.end..tokens[i].start].contains('\n')
}

/// `import(...)` and `import.meta` are expressions, not declarations.
fn is_import_declaration(tokens: &[Token<'_>], i: usize) -> bool {
    tokens
        .get(i + 1)
        .is_some_and(|next| !next.is_punct('(') && !next.is_punct('.'))
}

fn parse_import<'a>(tokens: &[Token<'a>], i: usize) -> Result<ImportDecl<'a>, RewriteError> {
    let malformed = || RewriteError::Malformed {
        statement: "import",
        offset: tokens[i].start,
    };
    let at = |j: usize| tokens.get(j).ok_or_else(malformed);

    let mut decl = ImportDecl {
        specifier: "",
        default: None,
        namespace: None,
        named: Vec::new(),
        next: i + 1,
    };
    let mut j = i + 1;

    if let Some(specifier) = at(j)?.string_value() {
        decl.specifier = specifier;
        j += 1;
    } else {
        if at(j)?.kind == TokenKind::Ident {
            decl.default = Some(at(j)?.text);
            j += 1;
            if at(j)?.is_punct(',') {
                j += 1;
            }
        }

        if at(j)?.is_punct('*') {
            if !at(j + 1)?.is_ident("as") || at(j + 2)?.kind != TokenKind::Ident {
                return Err(malformed());
            }
            decl.namespace = Some(at(j + 2)?.text);
            j += 3;
        } else if at(j)?.is_punct('{') {
            j += 1;
            while !at(j)?.is_punct('}') {
                let imported = at(j)?;
                if !matches!(imported.kind, TokenKind::Ident | TokenKind::Str) {
                    return Err(malformed());
                }
                j += 1;
                let local = if at(j)?.is_ident("as") {
                    let local = at(j + 1)?;
                    if local.kind != TokenKind::Ident {
                        return Err(malformed());
                    }
                    j += 2;
                    local.text
                } else if imported.kind == TokenKind::Ident {
                    imported.text
                } else {
                    return Err(malformed());
                };
                decl.named.push((imported.text, local));
                if at(j)?.is_punct(',') {
                    j += 1;
                } else if !at(j)?.is_punct('}') {
                    return Err(malformed());
                }
            }
            j += 1;
        }

        if !at(j)?.is_ident("from") {
            return Err(malformed());
        }
        decl.specifier = at(j + 1)?.string_value().ok_or_else(malformed)?;
        j += 2;
    }

    // Import attributes: `with { type: "json" }`.
    if tokens
        .get(j)
        .is_some_and(|t| t.is_ident("with") || t.is_ident("assert"))
        && tokens.get(j + 1).is_some_and(|t| t.is_punct('{'))
    {
        j += 2;
        while !at(j)?.is_punct('}') {
            j += 1;
        }
        j += 1;
    }
    if tokens.get(j).is_some_and(|t| t.is_punct(';')) {
        j += 1;
    }

    decl.next = j;
    Ok(decl)
}

fn injected_bindings(decl: &ImportDecl<'_>) -> String {
    let source = format!("{DEPS_PARAM}[{}]", js_string(decl.specifier));
    let mut statements = Vec::new();

    if let Some(namespace) = decl.namespace {
        statements.push(format!("const {namespace} = {source};"));
    }
    if let Some(default) = decl.default {
        statements.push(format!("const {default} = {INTEROP_HELPER}({source});"));
    }
    if !decl.named.is_empty() {
        let fields: Vec<String> = decl
            .named
            .iter()
            .map(|(property, local)| {
                if property == local {
                    (*local).to_string()
                } else {
                    format!("{property}: {local}")
                }
            })
            .collect();
        statements.push(format!("const {{ {} }} = {source};", fields.join(", ")));
    }

    statements.join(" ")
}

/// Rewrite the export statement starting at `i`; returns the next index.
fn rewrite_export(
    tokens: &[Token<'_>],
    i: usize,
    edits: &mut Vec<Edit>,
    defaults: &mut Vec<String>,
) -> Result<usize, RewriteError> {
    let export = &tokens[i];
    let malformed = || RewriteError::Malformed {
        statement: "export",
        offset: export.start,
    };
    let next = tokens.get(i + 1).ok_or_else(malformed)?;

    if next.is_ident("default") {
        let value = tokens.get(i + 2).ok_or_else(malformed)?;
        match declaration_name(tokens, i + 2) {
            // `export default function Name` keeps the hoisted declaration.
            Some(name) => {
                defaults.push(name.to_string());
                edits.push(Edit {
                    start: export.start,
                    end: value.start,
                    replacement: String::new(),
                });
            }
            None => {
                defaults.push(EXPORT_BINDING.to_string());
                edits.push(Edit {
                    start: export.start,
                    end: next.end,
                    replacement: format!("const {EXPORT_BINDING} ="),
                });
            }
        }
        return Ok(i + 2);
    }

    if next.is_punct('*') {
        return Err(RewriteError::ReExport {
            offset: export.start,
        });
    }

    if next.is_punct('{') {
        let mut j = i + 2;
        while !tokens.get(j).ok_or_else(malformed)?.is_punct('}') {
            let local = &tokens[j];
            let mut exported = local;
            j += 1;
            if tokens.get(j).is_some_and(|t| t.is_ident("as")) {
                exported = tokens.get(j + 1).ok_or_else(malformed)?;
                j += 2;
            }
            if exported.is_ident("default") || exported.string_value() == Some("default") {
                defaults.push(local.text.to_string());
            }
            if tokens.get(j).is_some_and(|t| t.is_punct(',')) {
                j += 1;
            }
        }
        j += 1;

        if tokens.get(j).is_some_and(|t| t.is_ident("from")) {
            return Err(RewriteError::ReExport {
                offset: export.start,
            });
        }
        if tokens.get(j).is_some_and(|t| t.is_punct(';')) {
            j += 1;
        }
        edits.push(Edit {
            start: export.start,
            end: tokens[j - 1].end,
            replacement: String::new(),
        });
        return Ok(j);
    }

    // `export const|let|var|function|class|async ...`
    edits.push(Edit {
        start: export.start,
        end: next.start,
        replacement: String::new(),
    });
    Ok(i + 1)
}

/// Name of a function or class declaration starting at `i`, if it has one.
fn declaration_name<'a>(tokens: &[Token<'a>], mut i: usize) -> Option<&'a str> {
    if tokens.get(i)?.is_ident("async") {
        i += 1;
    }
    let keyword = tokens.get(i)?;
    if keyword.is_ident("function") {
        i += 1;
        if tokens.get(i)?.is_punct('*') {
            i += 1;
        }
    } else if keyword.is_ident("class") {
        i += 1;
    } else {
        return None;
    }

    let name = tokens.get(i)?;
    (name.kind == TokenKind::Ident && name.text != "extends").then_some(name.text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewrite(source: &str) -> Result<RewrittenModule, RewriteError> {
        let externals = vec!["react".to_string(), "react/jsx-runtime".to_string()];
        ModuleRewriter::new(&externals, SpecifierMatch::Exact).rewrite(source)
    }

    #[test]
    fn test_named_imports_become_destructuring() {
        let out = rewrite(
            "import { jsx as _jsx, Fragment } from \"react/jsx-runtime\";\nconst Button = () => _jsx(\"button\", {});\nexport { Button as default };\n",
        )
        .unwrap();

        assert!(
            out.body
                .contains("const { jsx: _jsx, Fragment } = __pl_deps[\"react/jsx-runtime\"];")
        );
        assert!(!out.body.contains("import"));
        assert!(!out.body.contains("export"));
        assert!(out.body.ends_with("return Button;\n"));
        assert_eq!(out.default_export, "Button");
        assert_eq!(out.injected_imports, 1);
    }

    #[test]
    fn test_namespace_and_default_imports() {
        let out = rewrite(
            "import * as R from 'react';\nimport React, { useState } from \"react\";\nexport default function App() { return R; }\n",
        )
        .unwrap();

        assert!(out.body.contains("const R = __pl_deps[\"react\"];"));
        assert!(out.body.contains("const React = __pl_default(__pl_deps[\"react\"]);"));
        assert!(out.body.contains("const { useState } = __pl_deps[\"react\"];"));
        assert!(out.body.starts_with("const __pl_default = "));
        assert!(out.body.contains("function App() { return R; }"));
        assert!(out.body.ends_with("return App;\n"));
    }

    #[test]
    fn test_non_matching_imports_untouched() {
        let out = rewrite("import x from \"lodash\";\nexport default x;\n").unwrap();
        assert!(out.body.contains("import x from \"lodash\";"));
        assert!(out.body.contains("const __pl_export = x;"));
        assert_eq!(out.injected_imports, 0);
    }

    #[test]
    fn test_side_effect_import_removed() {
        let out = rewrite("import \"react\";\nexport default 1;\n").unwrap();
        assert!(!out.body.contains("import"));
    }

    #[test]
    fn test_import_text_inside_strings_is_ignored() {
        let source = "const s = `import { x } from \"react\"`;\n// export default nope\nexport default s;\n";
        let out = rewrite(source).unwrap();
        assert!(out.body.contains("`import { x } from \"react\"`"));
        assert_eq!(out.default_export, "__pl_export");
    }

    #[test]
    fn test_regex_literal_after_block_or_condition() {
        let out = rewrite("function f() {}\n/'/.test(s);\nexport default f;\n").unwrap();
        assert!(out.body.contains("/'/.test(s);"));
        assert_eq!(out.default_export, "f");

        let out = rewrite("if (a) /'/.test(s);\nexport default a;\n").unwrap();
        assert!(out.body.contains("if (a) /'/.test(s);"));
        assert_eq!(out.default_export, "a");
    }

    #[test]
    fn test_nested_import_keyword_is_ignored() {
        let out = rewrite("function f() { return import(\"react\"); }\nexport default f;\n").unwrap();
        assert!(out.body.contains("import(\"react\")"));
    }

    #[test]
    fn test_export_keyword_stripped_from_declarations() {
        let out = rewrite("export const a = 1;\nexport function b() {}\nexport default a;\n").unwrap();
        assert!(out.body.contains("const a = 1;"));
        assert!(out.body.contains("function b() {}"));
        assert!(!out.body.lines().any(|l| l.trim_start().starts_with("export")));
    }

    #[test]
    fn test_default_export_count() {
        assert_eq!(
            rewrite("const a = 1;\n").unwrap_err(),
            RewriteError::MissingDefaultExport
        );
        assert_eq!(
            rewrite("export default 1;\nexport { a as default };\n").unwrap_err(),
            RewriteError::MultipleDefaultExports { count: 2 }
        );
    }

    #[test]
    fn test_reexport_rejected() {
        assert!(matches!(
            rewrite("export { a } from \"./a\";\nexport default 1;\n"),
            Err(RewriteError::ReExport { .. })
        ));
        assert!(matches!(
            rewrite("export * from \"./a\";\n"),
            Err(RewriteError::ReExport { .. })
        ));
    }

    #[test]
    fn test_subpath_mode() {
        let externals = vec!["react".to_string()];
        let out = ModuleRewriter::new(&externals, SpecifierMatch::Subpath)
            .rewrite("import { jsx } from \"react/jsx-runtime\";\nexport default jsx;\n")
            .unwrap();
        assert!(out.body.contains("__pl_deps[\"react/jsx-runtime\"]"));

        let out = ModuleRewriter::new(&externals, SpecifierMatch::Exact)
            .rewrite("import { jsx } from \"react/jsx-runtime\";\nexport default jsx;\n")
            .unwrap();
        assert_eq!(out.injected_imports, 0);
    }

    #[test]
    fn test_anonymous_class_default() {
        let out = rewrite("export default class extends Base {}\n").unwrap();
        assert!(out.body.contains("const __pl_export = class extends Base {}"));
    }
}
