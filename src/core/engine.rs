// src/core/engine.rs
use std::path::{Path, PathBuf};
use anyhow::Result;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::AnalysisError;
use super::{
    ClosureBuilder, ClosureStats, ProjectLoader, Report, ReportBuilder, ReportWriter, SemanticModel,
};

/// Result of one successful analysis run
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub report: Report,
    pub report_path: PathBuf,
    /// Reached methods whose declaration was not among the loaded sources
    pub skipped_methods: usize,
    pub stats: ClosureStats,
}

/// Main orchestration engine: load, resolve the seed, close over calls, report
pub struct Engine {
    config: Config,
    loader: ProjectLoader,
    report_builder: ReportBuilder,
    writer: ReportWriter,
}

impl Engine {
    /// Create a new engine instance from a config file (or the defaults)
    pub async fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load_or_default(config_path)?;

        debug!("Loaded configuration: {:?}", config);

        Ok(Self::with_config(config)?)
    }

    pub fn with_config(config: Config) -> crate::error::Result<Self> {
        let loader = ProjectLoader::new(&config.parsing)?;
        let writer = ReportWriter::new(&config.output);

        Ok(Self {
            config,
            loader,
            report_builder: ReportBuilder::new(),
            writer,
        })
    }

    /// Analyze `method_name` in `seed_file`, treating every source under
    /// `project_root` (default: the seed's directory) as user code.
    /// Seed lookup failures come back as the NotFound variants and write nothing.
    pub async fn analyze(
        &mut self,
        seed_file: &Path,
        method_name: &str,
        project_root: Option<&Path>,
    ) -> crate::error::Result<AnalysisOutcome> {
        match tokio::fs::metadata(seed_file).await {
            Ok(metadata) if metadata.is_file() => {}
            _ => return Err(AnalysisError::SeedFileNotFound(seed_file.to_path_buf())),
        }

        let root = match project_root {
            Some(root) => root.to_path_buf(),
            None => seed_file.parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        };

        info!("Loading project sources from {}", root.display());
        let (units, seed_unit) = self.loader.load_project(&root, seed_file).await?;

        let model = SemanticModel::new(units);
        info!(
            "Parsed {} source files, registered {} types and {} methods",
            model.units().len(),
            model.registry().type_count(),
            model.registry().method_count()
        );

        let seed = model.find_seed(seed_unit, method_name)?;
        info!("Seed method {} at {}", seed.id, seed.location);

        let result = ClosureBuilder::new(&model, self.config.analysis.worklist_order).build_closure(&seed);
        info!(
            "Closure complete: {} methods, {} properties, {} skipped",
            result.methods.len(),
            result.properties.len(),
            result.skipped.len()
        );

        let report = self.report_builder.render(&result, &seed_file.display().to_string(), method_name);
        let report_path = self.writer.write(&report, seed_file).await?;

        Ok(AnalysisOutcome {
            report,
            report_path,
            skipped_methods: result.skipped.len(),
            stats: result.stats,
        })
    }
}
