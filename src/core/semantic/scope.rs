use tree_sitter::Node;

use crate::core::languages::syntax;
use super::TypeKey;

/// Enclosing namespaces and types of a syntax node, outermost first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclarationScope {
    pub namespace: Vec<String>,
    pub types: Vec<String>,
}

impl DeclarationScope {
    /// Scope of `node`, including `node` itself when it is a type declaration
    pub fn of(node: Node<'_>, source: &str) -> Self {
        let mut namespace = Vec::new();
        let mut types = Vec::new();
        let mut saw_file_scoped = false;
        let mut root = node;

        let mut current = Some(node);
        while let Some(n) = current {
            let kind = n.kind();
            if syntax::is_type_declaration(kind) {
                if let Some(name) = syntax::declared_name(n, source) {
                    types.push(name);
                }
            } else if kind == "namespace_declaration" || kind == "file_scoped_namespace_declaration" {
                saw_file_scoped |= kind == "file_scoped_namespace_declaration";
                if let Some(name) = n.child_by_field_name("name") {
                    let mut parts = namespace_parts(syntax::text(name, source));
                    parts.reverse();
                    namespace.extend(parts);
                }
            }
            root = n;
            current = n.parent();
        }

        // Older grammars keep `namespace X;` as a sibling of the declarations it scopes
        if !saw_file_scoped {
            if let Some(name) = file_scoped_namespace(root, source) {
                let mut parts = namespace_parts(&name);
                parts.reverse();
                namespace.extend(parts);
            }
        }

        namespace.reverse();
        types.reverse();
        Self { namespace, types }
    }

    /// Key of the innermost enclosing type, if any
    pub fn type_key(&self) -> Option<TypeKey> {
        if self.types.is_empty() {
            None
        } else {
            Some(TypeKey::from_parts(&self.namespace, &self.types))
        }
    }

    /// Keys of every enclosing type, innermost first
    pub fn enclosing_types(&self) -> Vec<TypeKey> {
        (1..=self.types.len()).rev()
            .map(|depth| TypeKey::from_parts(&self.namespace, &self.types[..depth]))
            .collect()
    }

    /// Candidate keys for `name` seen from this scope, innermost first:
    /// nested types of every enclosing type, then every enclosing namespace.
    pub fn candidates(&self, name: &str) -> Vec<TypeKey> {
        let mut out = Vec::new();
        for depth in (1..=self.types.len()).rev() {
            let mut types = self.types[..depth].to_vec();
            types.push(name.to_string());
            out.push(TypeKey::from_parts(&self.namespace, &types));
        }
        for depth in (0..=self.namespace.len()).rev() {
            out.push(TypeKey::from_parts(&self.namespace[..depth], &[name.to_string()]));
        }
        out
    }
}

pub fn namespace_parts(name: &str) -> Vec<String> {
    name.split('.')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

fn file_scoped_namespace(root: Node<'_>, source: &str) -> Option<String> {
    let mut cursor = root.walk();
    let name = root.named_children(&mut cursor)
        .find(|child| child.kind() == "file_scoped_namespace_declaration")
        .and_then(|decl| decl.child_by_field_name("name"))
        .map(|name| syntax::text(name, source).to_string());
    name
}

/// Namespaces imported by `using` directives (aliases and `using static` excluded)
pub fn using_namespaces(root: Node<'_>, source: &str) -> Vec<String> {
    let mut out = Vec::new();
    for node in syntax::descendants(root) {
        if node.kind() != "using_directive" {
            continue;
        }
        let text = syntax::text(node, source).trim().trim_end_matches(';');
        if text.contains('=') {
            continue;
        }
        let mut words: Vec<&str> = text.split_whitespace().collect();
        words.retain(|w| *w != "global" && *w != "using");
        if words.first() == Some(&"static") {
            continue;
        }
        let name = words.concat();
        if !name.is_empty() {
            out.push(name.trim_start_matches("global::").to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::languages::{CSharpParser, LanguageParser};
    use std::path::Path;

    fn parse(source: &str) -> crate::core::SourceUnit {
        let mut parser = CSharpParser::new().unwrap();
        parser.parse(source.to_string(), Path::new("Test.cs")).unwrap()
    }

    fn method_scope(unit: &crate::core::SourceUnit, name: &str) -> DeclarationScope {
        let root = unit.tree().root_node();
        let method = syntax::descendants(root)
            .into_iter()
            .find(|n| n.kind() == "method_declaration"
                && syntax::declared_name(*n, unit.source()).as_deref() == Some(name))
            .unwrap();
        DeclarationScope::of(method, unit.source())
    }

    #[test]
    fn test_nested_namespace_and_types() {
        let unit = parse(r#"
namespace App.Core
{
    namespace Inner
    {
        class Outer
        {
            class Nested
            {
                void Run() {}
            }
        }
    }
}
"#);
        let scope = method_scope(&unit, "Run");
        assert_eq!(scope.namespace, vec!["App", "Core", "Inner"]);
        assert_eq!(scope.types, vec!["Outer", "Nested"]);
        assert_eq!(scope.type_key().unwrap().as_str(), "App.Core.Inner.Outer.Nested");

        let enclosing: Vec<String> = scope.enclosing_types().iter().map(|k| k.to_string()).collect();
        assert_eq!(enclosing, vec!["App.Core.Inner.Outer.Nested", "App.Core.Inner.Outer"]);
    }

    #[test]
    fn test_file_scoped_namespace() {
        let unit = parse("namespace App.Models;\n\npublic class Person\n{\n    public void Greet() {}\n}\n");
        let scope = method_scope(&unit, "Greet");
        assert_eq!(scope.type_key().unwrap().as_str(), "App.Models.Person");
    }

    #[test]
    fn test_candidates_innermost_first() {
        let scope = DeclarationScope {
            namespace: vec!["App".to_string()],
            types: vec!["Outer".to_string()],
        };
        let keys: Vec<String> = scope.candidates("Helper").iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["App.Outer.Helper", "App.Helper", "Helper"]);
    }

    #[test]
    fn test_using_namespaces() {
        let unit = parse(r#"
global using App.Shared;
using System;
using App.Models;
using static System.Math;
using Alias = App.Other.Thing;

class C {}
"#);
        let usings = using_namespaces(unit.tree().root_node(), unit.source());
        assert_eq!(usings, vec!["App.Shared", "System", "App.Models"]);
    }
}
