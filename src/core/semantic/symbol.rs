use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use serde::{Deserialize, Serialize};

/// Namespace-qualified identity of a declared type, e.g. `SimpleProject.SecondClass`.
/// Nested types append their enclosing types: `Ns.Outer.Inner`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeKey(String);

impl TypeKey {
    pub fn from_parts(namespace: &[String], types: &[String]) -> Self {
        let parts: Vec<&str> = namespace.iter()
            .chain(types.iter())
            .map(String::as_str)
            .collect();
        Self(parts.join("."))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last segment, i.e. the type's own name
    pub fn simple_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }
}

impl From<&str> for TypeKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SymbolKind {
    Method,
    Property,
}

/// Semantic identity of a declared member.
///
/// Derived from the declaration site rather than from any occurrence, so
/// every reference to the same declaration produces an equal key.
/// Parameter types are part of a method's identity so overloads stay apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId {
    pub kind: SymbolKind,
    pub containing_type: TypeKey,
    pub name: String,
    pub parameter_types: Vec<String>,
}

impl SymbolId {
    pub fn method(containing_type: TypeKey, name: &str, parameter_types: Vec<String>) -> Self {
        Self {
            kind: SymbolKind::Method,
            containing_type,
            name: name.to_string(),
            parameter_types,
        }
    }

    pub fn property(containing_type: TypeKey, name: &str) -> Self {
        Self {
            kind: SymbolKind::Property,
            containing_type,
            name: name.to_string(),
            parameter_types: Vec::new(),
        }
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SymbolKind::Method => write!(
                f,
                "{}.{}({})",
                self.containing_type,
                self.name,
                self.parameter_types.join(", ")
            ),
            SymbolKind::Property => write!(f, "{}.{}", self.containing_type, self.name),
        }
    }
}

/// Declaration site, 1-based
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn from_point(file: &str, point: tree_sitter::Point) -> Self {
        Self {
            file: file.to_string(),
            line: point.row + 1,
            column: point.column + 1,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub type_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodSymbol {
    pub id: SymbolId,
    /// Simple name of the containing type
    pub containing_type: String,
    pub return_type: String,
    pub parameters: Vec<Parameter>,
    pub location: Location,
}

impl MethodSymbol {
    pub fn name(&self) -> &str {
        &self.id.name
    }

    pub fn containing_type_key(&self) -> &TypeKey {
        &self.id.containing_type
    }

    /// `ContainingType.MemberName`
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.containing_type, self.id.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySymbol {
    pub id: SymbolId,
    /// Simple name of the containing type
    pub containing_type: String,
    pub type_name: String,
    pub location: Location,
}

impl PropertySymbol {
    pub fn name(&self) -> &str {
        &self.id.name
    }

    pub fn containing_type_key(&self) -> &TypeKey {
        &self.id.containing_type
    }

    /// `ContainingType.MemberName`
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.containing_type, self.id.name)
    }
}

// Equality, hashing and ordering go through the identity key only.
macro_rules! identity_semantics {
    ($symbol:ty) => {
        impl PartialEq for $symbol {
            fn eq(&self, other: &Self) -> bool {
                self.id == other.id
            }
        }

        impl Eq for $symbol {}

        impl Hash for $symbol {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.id.hash(state);
            }
        }

        impl PartialOrd for $symbol {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $symbol {
            fn cmp(&self, other: &Self) -> Ordering {
                self.id.cmp(&other.id)
            }
        }
    };
}

identity_semantics!(MethodSymbol);
identity_semantics!(PropertySymbol);

/// What a name or member access resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    Method(MethodSymbol),
    Property(PropertySymbol),
}
