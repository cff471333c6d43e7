// src/core/call_graph/classifier.rs
use std::collections::BTreeSet;
use tracing::trace;

use crate::core::languages::syntax;
use super::{MethodBody, MethodSymbol, PropertySymbol, Symbol, SymbolResolver};

/// Member accesses of one method body, split into property reads and calls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub property_reads: BTreeSet<PropertySymbol>,
    pub method_calls: BTreeSet<MethodSymbol>,
}

/// Splits a body's member accesses into property reads and method invocations.
///
/// A member access that is not the callee of an invocation is a read; the
/// callee of every invocation, bare identifier or member access, is a call.
/// Only string properties and methods of user-defined types are retained.
pub struct MemberAccessClassifier<'r> {
    resolver: &'r dyn SymbolResolver,
}

impl<'r> MemberAccessClassifier<'r> {
    pub fn new(resolver: &'r dyn SymbolResolver) -> Self {
        Self { resolver }
    }

    pub fn classify(&self, method: &MethodBody<'_>) -> Classification {
        let mut classification = Classification::default();
        let Some(body) = method.body else {
            return classification;
        };

        for node in syntax::descendants(body) {
            match node.kind() {
                "member_access_expression" if !syntax::is_invocation_target(node) => {
                    if let Some(Symbol::Property(property)) = self.resolver.resolve_symbol(method.unit, node) {
                        if self.retain_property(&property) {
                            classification.property_reads.insert(property);
                        }
                    }
                }
                "invocation_expression" => {
                    let Some(target) = node.child_by_field_name("function") else {
                        continue;
                    };
                    if !matches!(target.kind(), "identifier" | "generic_name" | "member_access_expression") {
                        continue;
                    }
                    if let Some(Symbol::Method(called)) = self.resolver.resolve_symbol(method.unit, target) {
                        if self.retain_method(&called) {
                            classification.method_calls.insert(called);
                        }
                    }
                }
                _ => {}
            }
        }

        classification
    }

    fn retain_property(&self, property: &PropertySymbol) -> bool {
        let keep = self.resolver.is_target_type(&property.type_name)
            && self.resolver.is_user_defined_type(property.containing_type_key());
        if !keep {
            trace!("Filtered property {} ({})", property.id, property.type_name);
        }
        keep
    }

    fn retain_method(&self, method: &MethodSymbol) -> bool {
        let keep = self.resolver.is_user_defined_type(method.containing_type_key());
        if !keep {
            trace!("Filtered call {}", method.id);
        }
        keep
    }
}
