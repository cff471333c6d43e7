use std::path::PathBuf;
use thiserror::Error;

/// Main error type for reachability analysis
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parser error: {0}")]
    Parser(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("Seed file not found: {}", .0.display())]
    SeedFileNotFound(PathBuf),

    #[error("Seed file {} could not be read: {reason}", .file.display())]
    SeedFileUnreadable { file: PathBuf, reason: String },

    #[error("Method '{method}' not found in {}", .file.display())]
    SeedMethodNotFound { file: PathBuf, method: String },

    #[error("Method '{method}' in {} could not be resolved to a declared symbol", .file.display())]
    SeedSymbolUnresolved { file: PathBuf, method: String },
}

impl AnalysisError {
    /// True for the seed lookup failures, which abort the run without a report
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AnalysisError::SeedFileNotFound(_)
                | AnalysisError::SeedFileUnreadable { .. }
                | AnalysisError::SeedMethodNotFound { .. }
                | AnalysisError::SeedSymbolUnresolved { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
