// src/core/call_graph/mod.rs
//! Reachability over the call graph of user-defined methods
//!
//! Starting from a seed method, bodies are classified one at a time and the
//! calls they make are fed back into a worklist until nothing new turns up.
//! The closure is then rendered into the ordered report.

mod classifier;
mod closure;
mod report;

pub use classifier::MemberAccessClassifier;
pub use closure::{ClosureBuilder, ClosureResult, ClosureStats, WorklistOrder};
pub use report::{Report, ReportBuilder};

// Re-export needed types from other modules for internal use
pub use super::semantic::{MethodBody, MethodSymbol, PropertySymbol, Symbol, SymbolResolver};
