//! Symbol resolution over parsed C# sources
//!
//! Builds the registry of user-defined types once per run and answers the
//! questions the reachability core asks: what does this node denote, is this
//! type declared in the project, is this the tracked property type, and where
//! is this method's body.

mod symbol;
mod scope;
mod registry;
mod model;

pub use symbol::{Location, MethodSymbol, Parameter, PropertySymbol, Symbol, SymbolId, TypeKey};
pub use model::SemanticModel;

use tree_sitter::Node;

use super::UnitId;

/// A located method declaration and its executable body
#[derive(Debug, Clone, Copy)]
pub struct MethodBody<'a> {
    pub unit: UnitId,
    pub declaration: Node<'a>,
    /// `None` for interface, abstract, extern and bodiless partial declarations
    pub body: Option<Node<'a>>,
}

/// Authoritative answers about symbols and types.
/// Anything it cannot resolve is out of scope, never an error.
pub trait SymbolResolver {
    /// Symbol denoted by an identifier or member access node of `unit`
    fn resolve_symbol(&self, unit: UnitId, node: Node<'_>) -> Option<Symbol>;

    /// Whether the type is declared in one of the loaded source units
    fn is_user_defined_type(&self, key: &TypeKey) -> bool;

    /// Whether a type descriptor names the tracked property type
    fn is_target_type(&self, descriptor: &str) -> bool;

    /// Declaration of a method, looked up by identity
    fn method_body(&self, method: &MethodSymbol) -> Option<MethodBody<'_>>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;

    use crate::core::languages::{CSharpParser, LanguageParser};
    use crate::core::SourceUnit;
    use super::{MethodSymbol, SemanticModel, TypeKey};

    pub fn units(files: &[(&str, &str)]) -> Vec<SourceUnit> {
        let mut parser = CSharpParser::new().unwrap();
        files.iter()
            .map(|(path, source)| parser.parse(source.to_string(), Path::new(path)).unwrap())
            .collect()
    }

    pub fn model(files: &[(&str, &str)]) -> SemanticModel {
        SemanticModel::new(units(files))
    }

    /// First declared method `name` of the type `key`
    pub fn method(model: &SemanticModel, key: &str, name: &str) -> MethodSymbol {
        model.registry()
            .find_methods(&TypeKey::from(key), name)
            .first()
            .map(|decl| decl.symbol.clone())
            .unwrap_or_else(|| panic!("no method {}.{}", key, name))
    }
}
