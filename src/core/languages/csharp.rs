use std::path::Path;
use tree_sitter::{Parser, Tree};
use tracing::warn;

use crate::error::{AnalysisError, Result};
use super::{LanguageParser, SourceUnit};

/// C#-specific parser using Tree-sitter
pub struct CSharpParser {
    parser: Parser,
}

impl CSharpParser {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let csharp_language = tree_sitter_c_sharp::language();
        parser.set_language(&csharp_language)
            .map_err(|e| AnalysisError::Parser(format!("Failed to set C# language: {}", e)))?;

        Ok(Self { parser })
    }

    fn parse_tree(&mut self, content: &str, file_path: &Path) -> Result<Tree> {
        let tree = self.parser.parse(content, None)
            .ok_or_else(|| AnalysisError::Parser(format!("Failed to parse {}", file_path.display())))?;

        if tree.root_node().has_error() {
            warn!("Syntax errors in {}, continuing with partial tree", file_path.display());
        }

        Ok(tree)
    }
}

impl LanguageParser for CSharpParser {
    fn parse(&mut self, content: String, file_path: &Path) -> Result<SourceUnit> {
        let tree = self.parse_tree(&content, file_path)?;
        Ok(SourceUnit::new(file_path.to_path_buf(), content, tree))
    }

    fn file_extensions(&self) -> &[&str] {
        &["cs"]
    }

    fn language_name(&self) -> &str {
        "csharp"
    }
}

/// Node-level helpers shared by the type registry and the semantic model.
///
/// Grammar releases disagree on a few node kinds and field names
/// (`this` vs `this_expression`, `returns` vs `type`), so lookups here
/// accept both spellings.
pub(crate) mod syntax {
    use tree_sitter::Node;

    const TYPE_DECLARATIONS: &[&str] = &[
        "class_declaration",
        "struct_declaration",
        "interface_declaration",
        "record_declaration",
        "record_struct_declaration",
    ];

    const PREDEFINED_TYPES: &[&str] = &[
        "bool", "byte", "sbyte", "char", "decimal", "double", "float", "int", "uint", "nint",
        "nuint", "long", "ulong", "short", "ushort", "object", "string", "void", "dynamic",
    ];

    pub fn text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
        &source[node.byte_range()]
    }

    pub fn is_type_declaration(kind: &str) -> bool {
        TYPE_DECLARATIONS.contains(&kind)
    }

    pub fn is_this(kind: &str) -> bool {
        kind == "this" || kind == "this_expression"
    }

    pub fn is_base(kind: &str) -> bool {
        kind == "base" || kind == "base_expression"
    }

    pub fn is_predefined(name: &str) -> bool {
        PREDEFINED_TYPES.contains(&name)
    }

    /// Collapse whitespace runs so type descriptors compare and print consistently
    pub fn normalize_type(raw: &str) -> String {
        raw.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Text of the `name` field of a declaration
    pub fn declared_name(node: Node<'_>, source: &str) -> Option<String> {
        node.child_by_field_name("name")
            .map(|n| text(n, source).to_string())
            .filter(|name| !name.is_empty())
    }

    /// Identifier text of a simple name (`Foo` or `Foo<T>`)
    pub fn simple_name(node: Node<'_>, source: &str) -> Option<String> {
        match node.kind() {
            "identifier" => Some(text(node, source).to_string()),
            "generic_name" => {
                if let Some(name) = node.child_by_field_name("name") {
                    return Some(text(name, source).to_string());
                }
                let mut cursor = node.walk();
                let identifier = node.named_children(&mut cursor)
                    .find(|child| child.kind() == "identifier")
                    .map(|child| text(child, source).to_string());
                identifier
            }
            _ => None,
        }
    }

    /// Return type node of a method or local function
    pub fn return_type(node: Node<'_>) -> Option<Node<'_>> {
        node.child_by_field_name("returns")
            .or_else(|| node.child_by_field_name("type"))
    }

    /// Executable body: a block or an `=> expr` clause
    pub fn body(node: Node<'_>) -> Option<Node<'_>> {
        if let Some(body) = node.child_by_field_name("body") {
            if body.kind() != ";" {
                return Some(body);
            }
        }
        let mut cursor = node.walk();
        let arrow = node.named_children(&mut cursor)
            .find(|child| child.kind() == "arrow_expression_clause");
        arrow
    }

    /// `(name, type)` pairs of a parameter list, in declaration order.
    /// Untyped lambda parameters carry an empty type.
    pub fn parameters(node: Node<'_>, source: &str) -> Vec<(String, String)> {
        let Some(list) = parameter_list(node) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        let mut cursor = list.walk();
        for param in list.named_children(&mut cursor) {
            if param.kind() != "parameter" && param.kind() != "parameter_array" {
                continue;
            }
            if let Some(pair) = parameter(param, source) {
                out.push(pair);
            }
        }
        out
    }

    fn parameter_list(node: Node<'_>) -> Option<Node<'_>> {
        if let Some(list) = node.child_by_field_name("parameters") {
            return Some(list);
        }
        let mut cursor = node.walk();
        let found = node.named_children(&mut cursor)
            .find(|child| child.kind() == "parameter_list");
        found
    }

    /// True when the first parameter carries the `this` modifier
    pub fn is_extension_method(node: Node<'_>, source: &str) -> bool {
        let Some(list) = parameter_list(node) else {
            return false;
        };
        let mut cursor = list.walk();
        let first = list.named_children(&mut cursor).find(|child| child.kind() == "parameter");
        let Some(first) = first else {
            return false;
        };
        let mut cursor = first.walk();
        let leading = first.children(&mut cursor).find(|child| child.kind() != "attribute_list");
        leading.map_or(false, |token| text(token, source) == "this")
    }

    /// Element type written in `T[]` or a single-argument generic such as `List<T>`
    pub fn element_type(descriptor: &str) -> Option<&str> {
        let ty = descriptor.trim().trim_end_matches('?');
        if let Some(element) = ty.strip_suffix("[]") {
            return Some(element.trim());
        }
        let open = ty.find('<')?;
        let inner = ty.strip_suffix('>')?.get(open + 1..)?.trim();
        let mut depth = 0i32;
        for c in inner.chars() {
            match c {
                '<' => depth += 1,
                '>' => depth -= 1,
                ',' if depth == 0 => return None,
                _ => {}
            }
        }
        (!inner.is_empty()).then_some(inner)
    }

    fn parameter(node: Node<'_>, source: &str) -> Option<(String, String)> {
        let name = node.child_by_field_name("name").map(|n| text(n, source).to_string());
        let ty = node.child_by_field_name("type").map(|n| normalize_type(text(n, source)));
        if let (Some(name), Some(ty)) = (&name, &ty) {
            return Some((name.clone(), ty.clone()));
        }

        let mut cursor = node.walk();
        let parts: Vec<Node<'_>> = node.named_children(&mut cursor)
            .filter(|child| !matches!(
                child.kind(),
                "attribute_list" | "modifier" | "parameter_modifier" | "equals_value_clause"
            ))
            .collect();
        let name = name.or_else(|| parts.last().map(|n| text(*n, source).to_string()))?;
        let ty = ty.or_else(|| {
            if parts.len() >= 2 {
                Some(normalize_type(text(parts[0], source)))
            } else {
                None
            }
        });
        Some((name, ty.unwrap_or_default()))
    }

    pub fn declarator_name(node: Node<'_>, source: &str) -> Option<String> {
        if let Some(name) = node.child_by_field_name("name") {
            return Some(text(name, source).to_string());
        }
        let mut cursor = node.walk();
        let identifier = node.named_children(&mut cursor)
            .find(|child| child.kind() == "identifier")
            .map(|child| text(child, source).to_string());
        identifier
    }

    /// Initializer expression of `name = expr`
    pub fn declarator_initializer(node: Node<'_>) -> Option<Node<'_>> {
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
        if let Some(clause) = children.iter().find(|c| c.kind() == "equals_value_clause") {
            return clause.named_child(0);
        }
        children.into_iter()
            .skip(1)
            .find(|c| c.kind() != "bracketed_argument_list")
    }

    /// Variable declarators under a `variable_declaration`
    pub fn declarators(declaration: Node<'_>) -> Vec<Node<'_>> {
        let mut cursor = declaration.walk();
        let declarators = declaration.named_children(&mut cursor)
            .filter(|child| child.kind() == "variable_declarator")
            .collect();
        declarators
    }

    /// First `variable_declaration` child of a field or local declaration
    pub fn variable_declaration(node: Node<'_>) -> Option<Node<'_>> {
        let mut cursor = node.walk();
        let declaration = node.named_children(&mut cursor)
            .find(|child| child.kind() == "variable_declaration");
        declaration
    }

    pub fn argument_count(invocation: Node<'_>) -> usize {
        match invocation.child_by_field_name("arguments") {
            Some(arguments) => {
                let mut cursor = arguments.walk();
                let count = arguments.named_children(&mut cursor)
                    .filter(|child| child.kind() == "argument")
                    .count();
                count
            }
            None => 0,
        }
    }

    /// True when `node` is the callee of its parent invocation
    pub fn is_invocation_target(node: Node<'_>) -> bool {
        match node.parent() {
            Some(parent) if parent.kind() == "invocation_expression" => parent
                .child_by_field_name("function")
                .map_or(false, |function| function.id() == node.id()),
            _ => false,
        }
    }

    /// All descendants of `node` in document order, excluding `node` itself
    pub fn descendants(node: Node<'_>) -> Vec<Node<'_>> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if current.id() != node.id() {
                out.push(current);
            }
            let mut cursor = current.walk();
            let children: Vec<Node<'_>> = current.named_children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
        out
    }
}
