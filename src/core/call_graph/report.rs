// src/core/call_graph/report.rs
use serde::{Deserialize, Serialize};

use super::{ClosureResult, MethodSymbol, PropertySymbol};

/// JSON report of a closure. Field names and nesting are the wire contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub seed_file: String,
    pub seed_method: String,
    /// Sorted by `full_name`
    pub properties: Vec<PropertyEntry>,
    /// Sorted by `full_name`
    pub methods: Vec<MethodEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyEntry {
    pub name: String,
    pub containing_type: String,
    pub full_name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodEntry {
    pub name: String,
    pub containing_type: String,
    pub full_name: String,
    pub return_type: String,
    pub parameters: Vec<ParameterEntry>,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

impl From<&PropertySymbol> for PropertyEntry {
    fn from(property: &PropertySymbol) -> Self {
        Self {
            name: property.name().to_string(),
            containing_type: property.containing_type.clone(),
            full_name: property.full_name(),
            type_name: property.type_name.clone(),
            location: property.location.to_string(),
        }
    }
}

impl From<&MethodSymbol> for MethodEntry {
    fn from(method: &MethodSymbol) -> Self {
        Self {
            name: method.name().to_string(),
            containing_type: method.containing_type.clone(),
            full_name: method.full_name(),
            return_type: method.return_type.clone(),
            parameters: method.parameters.iter()
                .map(|p| ParameterEntry { name: p.name.clone(), type_name: p.type_name.clone() })
                .collect(),
            location: method.location.to_string(),
        }
    }
}

/// Turns a closure into its ordered report view
#[derive(Debug, Default)]
pub struct ReportBuilder;

impl ReportBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Entries are ordered by full name (ordinal); ties between same-named
    /// types of different namespaces keep symbol identity order.
    pub fn render(&self, result: &ClosureResult, seed_file: &str, seed_method: &str) -> Report {
        let mut properties: Vec<PropertyEntry> = result.properties.iter().map(PropertyEntry::from).collect();
        properties.sort_by(|a, b| a.full_name.cmp(&b.full_name));

        let mut methods: Vec<MethodEntry> = result.methods.iter().map(MethodEntry::from).collect();
        methods.sort_by(|a, b| a.full_name.cmp(&b.full_name));

        Report {
            seed_file: seed_file.to_string(),
            seed_method: seed_method.to_string(),
            properties,
            methods,
        }
    }
}
