use tracing::{trace, warn};
use tree_sitter::Node;

use crate::core::languages::syntax;
use crate::core::{SourceUnit, UnitId};
use crate::error::{AnalysisError, Result};
use super::registry::{self, LookupContext, MethodDecl, TypeRegistry};
use super::scope::DeclarationScope;
use super::{MethodBody, MethodSymbol, Symbol, SymbolResolver, TypeKey};

/// Receiver chains deeper than this are treated as unresolvable
const MAX_TYPING_DEPTH: usize = 32;

const TARGET_TYPE_NAMES: &[&str] = &["string", "String", "System.String"];

/// Symbol resolution over a set of parsed source units
pub struct SemanticModel {
    units: Vec<SourceUnit>,
    registry: TypeRegistry,
}

impl SemanticModel {
    pub fn new(units: Vec<SourceUnit>) -> Self {
        let registry = TypeRegistry::build(&units);
        Self { units, registry }
    }

    pub fn units(&self) -> &[SourceUnit] {
        &self.units
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// First method named `method_name` declared in any type of the unit, in document order
    pub fn find_seed(&self, unit_id: UnitId, method_name: &str) -> Result<MethodSymbol> {
        let unit = self.units.get(unit_id)
            .ok_or_else(|| AnalysisError::Parser(format!("Unknown source unit {}", unit_id)))?;
        let source = unit.source();

        let candidates: Vec<Node<'_>> = syntax::descendants(unit.tree().root_node())
            .into_iter()
            .filter(|node| node.kind() == "method_declaration")
            .filter(|node| syntax::declared_name(*node, source).as_deref() == Some(method_name))
            .collect();

        let Some(first) = candidates.first() else {
            return Err(AnalysisError::SeedMethodNotFound {
                file: unit.path().to_path_buf(),
                method: method_name.to_string(),
            });
        };

        if candidates.len() > 1 {
            warn!(
                "{} declarations named '{}' in {}, using the first",
                candidates.len(),
                method_name,
                unit.display_path()
            );
        }

        registry::method_identity(*first, source)
            .and_then(|id| self.registry.method(&id))
            .map(|decl| decl.symbol.clone())
            .ok_or_else(|| AnalysisError::SeedSymbolUnresolved {
                file: unit.path().to_path_buf(),
                method: method_name.to_string(),
            })
    }

    fn context_of(&self, unit: UnitId, node: Node<'_>, source: &str) -> LookupContext {
        LookupContext {
            unit,
            scope: DeclarationScope::of(node, source),
        }
    }

    fn resolve_member_access(
        &self,
        ctx: &LookupContext,
        source: &str,
        node: Node<'_>,
        depth: usize,
    ) -> Option<Symbol> {
        let name = syntax::simple_name(node.child_by_field_name("name")?, source)?;
        let receiver = node.child_by_field_name("expression")?;
        let receiver_type = self.type_of(ctx, source, receiver, depth + 1);

        if syntax::is_invocation_target(node) {
            let arguments = syntax::argument_count(node.parent()?);
            return receiver_type.as_ref()
                .and_then(|key| self.pick_overload(key, &name, arguments))
                .or_else(|| self.pick_extension(receiver_type.as_ref(), &name, arguments))
                .map(Symbol::Method);
        }

        let receiver_type = receiver_type?;
        if let Some(property) = self.registry.find_property(&receiver_type, &name) {
            return Some(Symbol::Property(property.symbol.clone()));
        }
        // Method group, e.g. a delegate argument
        self.registry.find_methods(&receiver_type, &name)
            .first()
            .map(|decl| Symbol::Method(decl.symbol.clone()))
    }

    fn resolve_simple_name(
        &self,
        ctx: &LookupContext,
        source: &str,
        node: Node<'_>,
    ) -> Option<Symbol> {
        let name = syntax::simple_name(node, source)?;
        let containing = ctx.scope.type_key()?;

        if syntax::is_invocation_target(node) {
            let arguments = syntax::argument_count(node.parent()?);
            // Own type and its bases first, then the types it is nested in
            return ctx.scope.enclosing_types()
                .iter()
                .find_map(|key| self.pick_overload(key, &name, arguments))
                .map(Symbol::Method);
        }

        if self.find_binding(source, node, &name).is_some() {
            return None;
        }
        self.registry.find_property(&containing, &name)
            .map(|property| Symbol::Property(property.symbol.clone()))
    }

    /// Method called by an invocation expression
    fn resolve_callee(
        &self,
        ctx: &LookupContext,
        source: &str,
        invocation: Node<'_>,
        depth: usize,
    ) -> Option<MethodSymbol> {
        let function = invocation.child_by_field_name("function")?;
        let symbol = match function.kind() {
            "member_access_expression" => self.resolve_member_access(ctx, source, function, depth + 1),
            "identifier" | "generic_name" => self.resolve_simple_name(ctx, source, function),
            _ => None,
        };
        match symbol {
            Some(Symbol::Method(method)) => Some(method),
            _ => None,
        }
    }

    /// Overload with a matching parameter count, else the first declared
    fn pick_overload(&self, key: &TypeKey, name: &str, arguments: usize) -> Option<MethodSymbol> {
        let candidates = self.registry.find_methods(key, name);
        candidates.iter()
            .find(|decl| decl.symbol.parameters.len() == arguments)
            .or_else(|| candidates.first())
            .map(|decl| decl.symbol.clone())
    }

    /// Extension method applicable to a receiver. A user-defined receiver must
    /// match the extended type or one of its bases; a receiver of unknown or
    /// library type only matches extensions of types outside the project.
    fn pick_extension(&self, receiver: Option<&TypeKey>, name: &str, arguments: usize) -> Option<MethodSymbol> {
        let chain: Vec<&TypeKey> = match receiver {
            Some(key) => self.registry.type_chain(key).into_iter().map(|decl| &decl.key).collect(),
            None => Vec::new(),
        };
        let candidates: Vec<&MethodDecl> = self.registry.find_extensions(name)
            .into_iter()
            .filter(|decl| match (&decl.extended_type, receiver) {
                (Some(target), Some(_)) => chain.contains(&target),
                (None, None) => true,
                _ => false,
            })
            .collect();
        candidates.iter()
            .find(|decl| decl.symbol.parameters.len() == arguments + 1)
            .or_else(|| candidates.first())
            .map(|decl| decl.symbol.clone())
    }

    /// Static type of an expression, when it is a user-defined type
    fn type_of(&self, ctx: &LookupContext, source: &str, node: Node<'_>, depth: usize) -> Option<TypeKey> {
        if depth > MAX_TYPING_DEPTH {
            return None;
        }

        let kind = node.kind();
        match kind {
            "parenthesized_expression" => self.type_of(ctx, source, node.named_child(0)?, depth + 1),
            _ if syntax::is_this(kind) => ctx.scope.type_key(),
            _ if syntax::is_base(kind) => {
                let current = ctx.scope.type_key()?;
                self.registry.type_decl(&current)?.bases.first().cloned()
            }
            "object_creation_expression" | "cast_expression" => {
                let ty = node.child_by_field_name("type")?;
                self.registry.resolve_type(syntax::text(ty, source), ctx)
            }
            "identifier" => {
                let name = syntax::text(node, source);
                match self.local_type(ctx, source, node, name, depth) {
                    Some(local) => local,
                    None => self.member_type(ctx, name)
                        .or_else(|| self.registry.resolve_type(name, ctx)),
                }
            }
            "generic_name" | "qualified_name" | "alias_qualified_name" => {
                self.registry.resolve_type(syntax::text(node, source), ctx)
            }
            "member_access_expression" => {
                let via_receiver = || -> Option<TypeKey> {
                    let name = syntax::simple_name(node.child_by_field_name("name")?, source)?;
                    let receiver = self.type_of(ctx, source, node.child_by_field_name("expression")?, depth + 1)?;
                    if let Some(property) = self.registry.find_property(&receiver, &name) {
                        return property.type_key.clone();
                    }
                    if let Some(field) = self.registry.find_field(&receiver, &name) {
                        return field.type_key.clone();
                    }
                    let nested = TypeKey::from(format!("{}.{}", receiver, name).as_str());
                    self.registry.is_user_defined(&nested).then_some(nested)
                };
                via_receiver().or_else(|| self.registry.resolve_type(syntax::text(node, source), ctx))
            }
            "invocation_expression" => {
                let method = self.resolve_callee(ctx, source, node, depth)?;
                self.registry.method(&method.id)?.return_type_key.clone()
            }
            _ => None,
        }
    }

    /// Written type descriptor of an expression, e.g. `List<Widget>` for a
    /// collection, when the declaration spells one out
    fn descriptor_of(&self, ctx: &LookupContext, source: &str, node: Node<'_>, depth: usize) -> Option<String> {
        if depth > MAX_TYPING_DEPTH {
            return None;
        }

        match node.kind() {
            "parenthesized_expression" => self.descriptor_of(ctx, source, node.named_child(0)?, depth + 1),
            "object_creation_expression" | "cast_expression" | "array_creation_expression" => {
                let ty = node.child_by_field_name("type")?;
                Some(syntax::normalize_type(syntax::text(ty, source)))
            }
            "identifier" => {
                let name = syntax::text(node, source);
                match self.find_binding(source, node, name) {
                    Some(Binding::Declared(ty)) => Some(ty),
                    Some(Binding::Initialized(init)) => self.descriptor_of(ctx, source, init, depth + 1),
                    Some(_) => None,
                    None => self.member_descriptor(&ctx.scope.type_key()?, name),
                }
            }
            "member_access_expression" => {
                let name = syntax::simple_name(node.child_by_field_name("name")?, source)?;
                let receiver = self.type_of(ctx, source, node.child_by_field_name("expression")?, depth + 1)?;
                self.member_descriptor(&receiver, &name)
            }
            "invocation_expression" => self.resolve_callee(ctx, source, node, depth)
                .map(|method| method.return_type),
            _ => None,
        }
    }

    fn member_descriptor(&self, key: &TypeKey, name: &str) -> Option<String> {
        if let Some(property) = self.registry.find_property(key, name) {
            return Some(property.symbol.type_name.clone());
        }
        self.registry.find_field(key, name)
            .map(|field| field.type_name.clone())
    }

    /// Type of a local variable or parameter named `name` visible at `node`.
    /// `Some(None)` means the name is a local whose type is not user-defined.
    fn local_type(
        &self,
        ctx: &LookupContext,
        source: &str,
        node: Node<'_>,
        name: &str,
        depth: usize,
    ) -> Option<Option<TypeKey>> {
        let resolved = match self.find_binding(source, node, name)? {
            Binding::Declared(ty) => self.registry.resolve_type(&ty, ctx),
            Binding::Initialized(init) => self.type_of(ctx, source, init, depth + 1),
            Binding::Element(collection) => self.descriptor_of(ctx, source, collection, depth + 1)
                .and_then(|collection| syntax::element_type(&collection).map(str::to_string))
                .and_then(|element| self.registry.resolve_type(&element, ctx)),
            Binding::OutArgument(declaration) => self.out_argument_type(ctx, source, declaration, depth + 1),
        };
        trace!("Local '{}' typed as {:?}", name, resolved);
        Some(resolved)
    }

    /// Declaration of the local or parameter named `name` in scope at `node`
    fn find_binding<'t>(&self, source: &str, node: Node<'t>, name: &str) -> Option<Binding<'t>> {
        let mut member = node;
        let mut current = node.parent();
        while let Some(n) = current {
            match n.kind() {
                "declaration_list" | "compilation_unit" => break,
                kind if syntax::is_type_declaration(kind) => break,
                "method_declaration" | "constructor_declaration" | "local_function_statement"
                | "lambda_expression" | "anonymous_method_expression" => {
                    if let Some((_, ty)) = syntax::parameters(n, source)
                        .into_iter()
                        .find(|(param, _)| param == name)
                    {
                        return Some(Binding::Declared(ty));
                    }
                }
                _ => {}
            }
            member = n;
            current = n.parent();
        }

        let mut found = None;
        for candidate in syntax::descendants(member) {
            if candidate.start_byte() >= node.start_byte() {
                break;
            }
            let binding = match candidate.kind() {
                "variable_declarator" => {
                    if syntax::declarator_name(candidate, source).as_deref() != Some(name) {
                        continue;
                    }
                    let declared = candidate.parent()
                        .and_then(|declaration| declaration.child_by_field_name("type"))
                        .map(|ty| syntax::normalize_type(syntax::text(ty, source)))
                        .unwrap_or_else(|| "var".to_string());
                    match syntax::declarator_initializer(candidate) {
                        Some(init) if declared == "var" => Binding::Initialized(init),
                        _ => Binding::Declared(declared),
                    }
                }
                "declaration_pattern" | "declaration_expression" => {
                    let Some((declared, designation)) = designation(candidate) else {
                        continue;
                    };
                    if syntax::text(designation, source) != name {
                        continue;
                    }
                    let declared = syntax::normalize_type(syntax::text(declared, source));
                    if declared == "var" && candidate.kind() == "declaration_expression" {
                        Binding::OutArgument(candidate)
                    } else {
                        Binding::Declared(declared)
                    }
                }
                "foreach_statement" => {
                    let declares = candidate.child_by_field_name("left")
                        .map_or(false, |left| syntax::text(left, source) == name);
                    if !declares || !encloses(candidate, node) {
                        continue;
                    }
                    let declared = candidate.child_by_field_name("type")
                        .map(|ty| syntax::normalize_type(syntax::text(ty, source)))
                        .unwrap_or_else(|| "var".to_string());
                    match candidate.child_by_field_name("right") {
                        Some(collection) if declared == "var" => Binding::Element(collection),
                        _ => Binding::Declared(declared),
                    }
                }
                _ => continue,
            };

            if candidate.kind() != "foreach_statement" {
                // Visible only inside the block (or statement) that declares it,
                // and never inside its own declaration
                let visible = local_scope(candidate).map_or(true, |scope| encloses(scope, node));
                if !visible || encloses(candidate, node) {
                    continue;
                }
            }
            found = Some(binding);
        }
        found
    }

    /// Type of `out var x`, taken from the called method's parameter
    fn out_argument_type(
        &self,
        ctx: &LookupContext,
        source: &str,
        declaration: Node<'_>,
        depth: usize,
    ) -> Option<TypeKey> {
        let argument = declaration.parent().filter(|parent| parent.kind() == "argument")?;
        let list = argument.parent()?;
        let invocation = list.parent().filter(|parent| parent.kind() == "invocation_expression")?;

        let mut cursor = list.walk();
        let arguments: Vec<Node<'_>> = list.named_children(&mut cursor)
            .filter(|child| child.kind() == "argument")
            .collect();
        let index = arguments.iter().position(|child| child.id() == argument.id())?;

        let method = self.resolve_callee(ctx, source, invocation, depth)?;
        // Extension calls pass the receiver as the first parameter
        let decl = self.registry.method(&method.id)?;
        let offset = usize::from(decl.is_extension && method.parameters.len() == arguments.len() + 1);
        self.registry.parameter_type(&method.id, index + offset)
    }

    /// Type of a field or property of the enclosing types
    fn member_type(&self, ctx: &LookupContext, name: &str) -> Option<TypeKey> {
        ctx.scope.enclosing_types().iter().find_map(|containing| {
            if let Some(property) = self.registry.find_property(containing, name) {
                return property.type_key.clone();
            }
            self.registry.find_field(containing, name)
                .and_then(|field| field.type_key.clone())
        })
    }
}

/// How a local or parameter was declared
enum Binding<'t> {
    /// Spelled-out type, `var` included when nothing better is known
    Declared(String),
    /// `var x = init`
    Initialized(Node<'t>),
    /// `foreach (var x in collection)`
    Element(Node<'t>),
    /// `out var x` inside an argument list
    OutArgument(Node<'t>),
}

/// Nodes that bound the visibility of the locals declared inside them
const LOCAL_SCOPES: &[&str] = &[
    "block",
    "switch_section",
    "switch_expression_arm",
    "for_statement",
    "using_statement",
    "fixed_statement",
    "catch_clause",
    "lambda_expression",
    "arrow_expression_clause",
];

fn local_scope(node: Node<'_>) -> Option<Node<'_>> {
    let mut current = node.parent();
    while let Some(n) = current {
        if LOCAL_SCOPES.contains(&n.kind()) {
            return Some(n);
        }
        current = n.parent();
    }
    None
}

fn encloses(outer: Node<'_>, inner: Node<'_>) -> bool {
    outer.start_byte() <= inner.start_byte() && inner.end_byte() <= outer.end_byte()
}

/// `(type, name)` of a declaration pattern or declaration expression
fn designation(node: Node<'_>) -> Option<(Node<'_>, Node<'_>)> {
    let declared = node.child_by_field_name("type").or_else(|| node.named_child(0))?;
    let name = node.child_by_field_name("name")
        .or_else(|| node.named_child(node.named_child_count().checked_sub(1)?))?;
    if name.id() == declared.id() {
        return None;
    }
    let name = match name.kind() {
        "identifier" => name,
        "single_variable_designation" => name.named_child(0).unwrap_or(name),
        _ => return None,
    };
    Some((declared, name))
}

impl SymbolResolver for SemanticModel {
    fn resolve_symbol(&self, unit: UnitId, node: Node<'_>) -> Option<Symbol> {
        let source = self.units.get(unit)?.source();
        let ctx = self.context_of(unit, node, source);
        match node.kind() {
            "member_access_expression" => self.resolve_member_access(&ctx, source, node, 0),
            "identifier" | "generic_name" => self.resolve_simple_name(&ctx, source, node),
            _ => None,
        }
    }

    fn is_user_defined_type(&self, key: &TypeKey) -> bool {
        self.registry.is_user_defined(key)
    }

    fn is_target_type(&self, descriptor: &str) -> bool {
        let name = descriptor.trim().trim_start_matches("global::").trim_end_matches('?');
        TARGET_TYPE_NAMES.contains(&name)
    }

    fn method_body(&self, method: &MethodSymbol) -> Option<MethodBody<'_>> {
        let decl = self.registry.method(&method.id)?;
        let unit = self.units.get(decl.unit)?;
        let range = decl.byte_range.clone();

        let mut node = unit.tree().root_node().descendant_for_byte_range(range.start, range.end)?;
        while node.kind() != "method_declaration" || node.byte_range() != range {
            node = node.parent()?;
        }

        Some(MethodBody {
            unit: decl.unit,
            declaration: node,
            body: syntax::body(node),
        })
    }
}
