use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::WorklistOrder;
use crate::error::{AnalysisError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source code loading configuration
    pub parsing: ParsingConfig,

    /// Closure computation settings
    pub analysis: AnalysisConfig,

    /// Report output settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    /// File extensions to load as source units
    pub file_extensions: Vec<String>,

    /// Maximum file size to parse (in bytes)
    pub max_file_size: usize,

    /// Gitignore-style globs excluded from the project walk
    pub ignore_patterns: Vec<String>,

    /// Whether .gitignore files under the project root are honoured
    pub respect_gitignore: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Order in which discovered methods are drained from the worklist
    pub worklist_order: WorklistOrder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Pretty-print the JSON report
    pub pretty: bool,

    /// Suffix appended to `<file>_<method>` when naming the report
    pub file_suffix: String,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            file_extensions: vec!["cs".to_string()],
            max_file_size: 1024 * 1024, // 1MB
            ignore_patterns: vec![
                "bin/".to_string(),
                "obj/".to_string(),
                ".git/".to_string(),
            ],
            respect_gitignore: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            pretty: true,
            file_suffix: "analysis".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| AnalysisError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Ok(Self::default())
                }
            }
            None => {
                // Try common config file locations
                let candidates = ["reachlens.toml", ".reachlens.toml"];

                for candidate in &candidates {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }
}
