use std::collections::{HashMap, HashSet};
use std::ops::Range;
use tracing::debug;
use tree_sitter::Node;

use crate::core::languages::syntax;
use crate::core::{SourceUnit, UnitId};
use super::scope::{self, DeclarationScope};
use super::{Location, MethodSymbol, Parameter, PropertySymbol, SymbolId, TypeKey};

/// Where a type descriptor was written, for resolving it to a declared type
#[derive(Debug, Clone)]
pub struct LookupContext {
    pub unit: UnitId,
    pub scope: DeclarationScope,
}

/// A type declared in one of the loaded source units.
/// Partial declarations across files merge into one entry.
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub key: TypeKey,
    pub name: String,
    /// Resolved user-defined base types, in declaration order
    pub bases: Vec<TypeKey>,
    /// Methods in declaration order
    pub methods: Vec<SymbolId>,
    pub properties: Vec<SymbolId>,
    pub fields: Vec<FieldDecl>,
    base_names: Vec<(String, LookupContext)>,
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub type_name: String,
    pub type_key: Option<TypeKey>,
    context: LookupContext,
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub symbol: MethodSymbol,
    pub unit: UnitId,
    pub byte_range: Range<usize>,
    pub has_body: bool,
    pub return_type_key: Option<TypeKey>,
    /// Declared with `this` on its first parameter
    pub is_extension: bool,
    /// Resolved type of the `this` parameter, when it is user-defined
    pub extended_type: Option<TypeKey>,
    context: LookupContext,
}

#[derive(Debug, Clone)]
pub struct PropertyDecl {
    pub symbol: PropertySymbol,
    pub type_key: Option<TypeKey>,
    context: LookupContext,
}

/// Every type and member declared in the loaded project.
/// Built once before traversal, read-only afterwards.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<TypeKey, TypeDecl>,
    methods: HashMap<SymbolId, MethodDecl>,
    properties: HashMap<SymbolId, PropertyDecl>,
    /// Extension methods by name, in declaration order
    extensions: HashMap<String, Vec<SymbolId>>,
    usings: Vec<Vec<String>>,
}

/// Identity of a `method_declaration` node
pub fn method_identity(node: Node<'_>, source: &str) -> Option<SymbolId> {
    let name = syntax::declared_name(node, source)?;
    let key = DeclarationScope::of(node, source).type_key()?;
    let parameter_types = syntax::parameters(node, source)
        .into_iter()
        .map(|(_, ty)| ty)
        .collect();
    Some(SymbolId::method(key, &name, parameter_types))
}

/// Strip a descriptor down to a name that could denote a declared type
fn lookup_name(descriptor: &str) -> Option<String> {
    let mut name = descriptor.trim().trim_start_matches("global::").trim_end_matches('?').trim();
    if name.is_empty() || name.ends_with(']') || name.ends_with('*') || name.starts_with('(') {
        return None;
    }
    if let Some(generic) = name.find('<') {
        name = name[..generic].trim();
    }
    if name == "var" || syntax::is_predefined(name) {
        return None;
    }
    Some(name.to_string())
}

impl TypeRegistry {
    pub fn build(units: &[SourceUnit]) -> Self {
        let mut registry = Self::default();

        for (unit_id, unit) in units.iter().enumerate() {
            let root = unit.tree().root_node();
            registry.usings.push(scope::using_namespaces(root, unit.source()));

            for node in syntax::descendants(root) {
                if syntax::is_type_declaration(node.kind()) {
                    registry.collect_type(unit_id, unit, node);
                }
            }
        }

        registry.resolve_declared_types();

        debug!(
            "Type registry: {} types, {} methods, {} properties",
            registry.types.len(),
            registry.methods.len(),
            registry.properties.len()
        );
        registry
    }

    fn collect_type(&mut self, unit_id: UnitId, unit: &SourceUnit, node: Node<'_>) {
        let source = unit.source();
        let scope = DeclarationScope::of(node, source);
        let Some(key) = scope.type_key() else {
            return;
        };
        let name = key.simple_name().to_string();
        let context = LookupContext { unit: unit_id, scope };

        let mut base_names = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == "base_list" {
                base_names.extend(base_list_types(child, source));
            }
        }

        let decl = self.types.entry(key.clone()).or_insert_with(|| TypeDecl {
            key: key.clone(),
            name: name.clone(),
            bases: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
            fields: Vec::new(),
            base_names: Vec::new(),
        });
        decl.base_names.extend(base_names.into_iter().map(|b| (b, context.clone())));

        // Positional record parameters declare properties
        if node.kind() == "record_declaration" || node.kind() == "record_struct_declaration" {
            for param in positional_parameters(node, source) {
                let (param_name, type_name, point) = param;
                let symbol = PropertySymbol {
                    id: SymbolId::property(key.clone(), &param_name),
                    containing_type: name.clone(),
                    type_name,
                    location: Location::from_point(unit.display_path(), point),
                };
                self.insert_property(symbol, context.clone());
            }
        }

        let Some(body) = node.child_by_field_name("body").or_else(|| declaration_list(node)) else {
            return;
        };

        let mut cursor = body.walk();
        let members: Vec<Node<'_>> = body.named_children(&mut cursor).collect();
        for member in members {
            match member.kind() {
                "method_declaration" => self.collect_method(unit_id, unit, member, &key, &name, &context),
                "property_declaration" => {
                    let (Some(prop_name), Some(ty)) = (
                        syntax::declared_name(member, source),
                        member.child_by_field_name("type"),
                    ) else {
                        continue;
                    };
                    let name_point = member.child_by_field_name("name")
                        .map(|n| n.start_position())
                        .unwrap_or_else(|| member.start_position());
                    let symbol = PropertySymbol {
                        id: SymbolId::property(key.clone(), &prop_name),
                        containing_type: name.clone(),
                        type_name: syntax::normalize_type(syntax::text(ty, source)),
                        location: Location::from_point(unit.display_path(), name_point),
                    };
                    self.insert_property(symbol, context.clone());
                }
                "field_declaration" => {
                    let Some(declaration) = syntax::variable_declaration(member) else {
                        continue;
                    };
                    let type_name = declaration.child_by_field_name("type")
                        .map(|ty| syntax::normalize_type(syntax::text(ty, source)))
                        .unwrap_or_default();
                    for declarator in syntax::declarators(declaration) {
                        if let Some(field_name) = syntax::declarator_name(declarator, source) {
                            let field = FieldDecl {
                                name: field_name,
                                type_name: type_name.clone(),
                                type_key: None,
                                context: context.clone(),
                            };
                            if let Some(decl) = self.types.get_mut(&key) {
                                decl.fields.push(field);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn collect_method(
        &mut self,
        unit_id: UnitId,
        unit: &SourceUnit,
        node: Node<'_>,
        key: &TypeKey,
        type_name: &str,
        context: &LookupContext,
    ) {
        let source = unit.source();
        let Some(id) = method_identity(node, source) else {
            return;
        };

        let return_type = syntax::return_type(node)
            .map(|ty| syntax::normalize_type(syntax::text(ty, source)))
            .unwrap_or_else(|| "void".to_string());
        let parameters = syntax::parameters(node, source)
            .into_iter()
            .map(|(name, type_name)| Parameter { name, type_name })
            .collect();
        let name_point = node.child_by_field_name("name")
            .map(|n| n.start_position())
            .unwrap_or_else(|| node.start_position());

        let decl = MethodDecl {
            symbol: MethodSymbol {
                id: id.clone(),
                containing_type: type_name.to_string(),
                return_type,
                parameters,
                location: Location::from_point(unit.display_path(), name_point),
            },
            unit: unit_id,
            byte_range: node.byte_range(),
            has_body: syntax::body(node).is_some(),
            return_type_key: None,
            is_extension: syntax::is_extension_method(node, source),
            extended_type: None,
            context: context.clone(),
        };

        // A partial method's implementing declaration wins over its defining one
        if let Some(existing) = self.methods.get(&id) {
            if existing.has_body && !decl.has_body {
                return;
            }
        }

        if !self.methods.contains_key(&id) {
            if let Some(type_decl) = self.types.get_mut(key) {
                type_decl.methods.push(id.clone());
            }
            if decl.is_extension {
                self.extensions.entry(id.name.clone()).or_default().push(id.clone());
            }
        }
        self.methods.insert(id, decl);
    }

    fn insert_property(&mut self, symbol: PropertySymbol, context: LookupContext) {
        let id = symbol.id.clone();
        if self.properties.contains_key(&id) {
            return;
        }
        if let Some(type_decl) = self.types.get_mut(symbol.containing_type_key()) {
            type_decl.properties.push(id.clone());
        }
        self.properties.insert(id, PropertyDecl { symbol, type_key: None, context });
    }

    /// Second pass: bind base lists, member types and return types to registry keys
    fn resolve_declared_types(&mut self) {
        let bases: Vec<(TypeKey, Vec<TypeKey>)> = self.types.values()
            .map(|decl| {
                let resolved = decl.base_names.iter()
                    .filter_map(|(name, ctx)| self.resolve_type(name, ctx))
                    .filter(|base| base != &decl.key)
                    .collect();
                (decl.key.clone(), resolved)
            })
            .collect();
        for (key, resolved) in bases {
            if let Some(decl) = self.types.get_mut(&key) {
                decl.bases = resolved;
            }
        }

        let fields: Vec<(TypeKey, Vec<Option<TypeKey>>)> = self.types.values()
            .map(|decl| {
                let resolved = decl.fields.iter()
                    .map(|field| self.resolve_type(&field.type_name, &field.context))
                    .collect();
                (decl.key.clone(), resolved)
            })
            .collect();
        for (key, resolved) in fields {
            if let Some(decl) = self.types.get_mut(&key) {
                for (field, type_key) in decl.fields.iter_mut().zip(resolved) {
                    field.type_key = type_key;
                }
            }
        }

        let returns: Vec<(SymbolId, Option<TypeKey>)> = self.methods.iter()
            .map(|(id, m)| (id.clone(), self.resolve_type(&m.symbol.return_type, &m.context)))
            .collect();
        for (id, type_key) in returns {
            if let Some(method) = self.methods.get_mut(&id) {
                method.return_type_key = type_key;
            }
        }

        let extended: Vec<(SymbolId, Option<TypeKey>)> = self.methods.iter()
            .filter(|(_, m)| m.is_extension)
            .map(|(id, m)| {
                let target = m.symbol.parameters.first()
                    .and_then(|param| self.resolve_type(&param.type_name, &m.context));
                (id.clone(), target)
            })
            .collect();
        for (id, type_key) in extended {
            if let Some(method) = self.methods.get_mut(&id) {
                method.extended_type = type_key;
            }
        }

        let property_types: Vec<(SymbolId, Option<TypeKey>)> = self.properties.iter()
            .map(|(id, p)| (id.clone(), self.resolve_type(&p.symbol.type_name, &p.context)))
            .collect();
        for (id, type_key) in property_types {
            if let Some(property) = self.properties.get_mut(&id) {
                property.type_key = type_key;
            }
        }
    }

    /// Resolve a type descriptor written at `ctx` to a declared type.
    /// Library, predefined, array and unknown types resolve to `None`.
    pub fn resolve_type(&self, descriptor: &str, ctx: &LookupContext) -> Option<TypeKey> {
        let name = lookup_name(descriptor)?;
        let usings = self.usings.get(ctx.unit).map(Vec::as_slice).unwrap_or(&[]);

        if name.contains('.') {
            let exact = TypeKey::from(name.as_str());
            if self.types.contains_key(&exact) {
                return Some(exact);
            }
            let relative = (1..=ctx.scope.namespace.len()).rev()
                .map(|depth| format!("{}.{}", ctx.scope.namespace[..depth].join("."), name));
            let imported = usings.iter().map(|u| format!("{}.{}", u, name));
            return relative.chain(imported)
                .map(|candidate| TypeKey::from(candidate.as_str()))
                .find(|candidate| self.types.contains_key(candidate));
        }

        if let Some(found) = ctx.scope.candidates(&name)
            .into_iter()
            .find(|candidate| self.types.contains_key(candidate))
        {
            return Some(found);
        }

        usings.iter()
            .map(|u| TypeKey::from(format!("{}.{}", u, name).as_str()))
            .find(|candidate| self.types.contains_key(candidate))
    }

    pub fn is_user_defined(&self, key: &TypeKey) -> bool {
        self.types.contains_key(key)
    }

    pub fn type_decl(&self, key: &TypeKey) -> Option<&TypeDecl> {
        self.types.get(key)
    }

    pub fn method(&self, id: &SymbolId) -> Option<&MethodDecl> {
        self.methods.get(id)
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    /// `key` followed by its user-defined base types, depth first, each once
    pub fn type_chain(&self, key: &TypeKey) -> Vec<&TypeDecl> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![key.clone()];
        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(decl) = self.types.get(&current) {
                stack.extend(decl.bases.iter().rev().cloned());
                chain.push(decl);
            }
        }
        chain
    }

    /// Methods named `name` visible on `key`, most derived first
    pub fn find_methods(&self, key: &TypeKey, name: &str) -> Vec<&MethodDecl> {
        self.type_chain(key)
            .into_iter()
            .flat_map(|decl| decl.methods.iter())
            .filter(|id| id.name == name)
            .filter_map(|id| self.methods.get(id))
            .collect()
    }

    pub fn find_property(&self, key: &TypeKey, name: &str) -> Option<&PropertyDecl> {
        self.type_chain(key)
            .into_iter()
            .flat_map(|decl| decl.properties.iter())
            .find(|id| id.name == name)
            .and_then(|id| self.properties.get(id))
    }

    pub fn find_field(&self, key: &TypeKey, name: &str) -> Option<&FieldDecl> {
        self.type_chain(key)
            .into_iter()
            .flat_map(|decl| decl.fields.iter())
            .find(|field| field.name == name)
    }

    /// Extension methods named `name`, in declaration order
    pub fn find_extensions(&self, name: &str) -> Vec<&MethodDecl> {
        self.extensions.get(name)
            .map(|ids| ids.iter().filter_map(|id| self.methods.get(id)).collect())
            .unwrap_or_default()
    }

    /// User-defined type of the `index`th parameter of a method
    pub fn parameter_type(&self, id: &SymbolId, index: usize) -> Option<TypeKey> {
        let method = self.methods.get(id)?;
        let parameter = method.symbol.parameters.get(index)?;
        self.resolve_type(&parameter.type_name, &method.context)
    }
}

fn declaration_list(node: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = node.walk();
    let list = node.named_children(&mut cursor)
        .find(|child| child.kind() == "declaration_list");
    list
}

fn base_list_types(node: Node<'_>, source: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        let type_node = match child.kind() {
            "argument_list" => continue,
            "primary_constructor_base_type" => child.child_by_field_name("type").unwrap_or(child),
            _ => child,
        };
        let name = syntax::normalize_type(syntax::text(type_node, source));
        if !name.is_empty() {
            out.push(name);
        }
    }
    out
}

fn positional_parameters(node: Node<'_>, source: &str) -> Vec<(String, String, tree_sitter::Point)> {
    let Some(list) = node.child_by_field_name("parameters").or_else(|| {
        let mut cursor = node.walk();
        let found = node.named_children(&mut cursor)
            .find(|child| child.kind() == "parameter_list");
        found
    }) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    let mut cursor = list.walk();
    for param in list.named_children(&mut cursor) {
        if param.kind() != "parameter" {
            continue;
        }
        let (Some(name), Some(ty)) = (param.child_by_field_name("name"), param.child_by_field_name("type")) else {
            continue;
        };
        out.push((
            syntax::text(name, source).to_string(),
            syntax::normalize_type(syntax::text(ty, source)),
            name.start_position(),
        ));
    }
    out
}
