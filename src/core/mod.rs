// src/core/mod.rs
mod engine;
mod parser;
mod writer;

// Language-specific parsers
mod languages;

// Symbol resolution over parsed sources
mod semantic;

// Reachability closure and report
mod call_graph;

pub use parser::{ProjectLoader, SourceUnit, UnitId};
pub use semantic::SemanticModel;
pub use call_graph::{ClosureBuilder, ClosureStats, Report, ReportBuilder, WorklistOrder};
pub use writer::ReportWriter;

// Export the main engine
pub use engine::{AnalysisOutcome, Engine};
