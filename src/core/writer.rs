use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::OutputConfig;
use crate::error::Result;
use super::Report;

/// Persists reports next to the seed file
pub struct ReportWriter {
    config: OutputConfig,
}

impl ReportWriter {
    pub fn new(config: &OutputConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// `<dir>/<stem>_<method>_<suffix>.json` for a seed `<dir>/<stem>.cs`
    pub fn output_path(&self, seed_file: &Path, seed_method: &str) -> PathBuf {
        let stem = seed_file.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "source".to_string());
        let file_name = if self.config.file_suffix.is_empty() {
            format!("{}_{}.json", stem, seed_method)
        } else {
            format!("{}_{}_{}.json", stem, seed_method, self.config.file_suffix)
        };

        match seed_file.parent() {
            Some(dir) => dir.join(file_name),
            None => PathBuf::from(file_name),
        }
    }

    pub fn serialize(&self, report: &Report) -> Result<String> {
        let json = if self.config.pretty {
            serde_json::to_string_pretty(report)?
        } else {
            serde_json::to_string(report)?
        };
        Ok(json)
    }

    pub async fn write(&self, report: &Report, seed_file: &Path) -> Result<PathBuf> {
        let path = self.output_path(seed_file, &report.seed_method);
        let json = self.serialize(report)?;
        tokio::fs::write(&path, json).await?;

        info!("Report written to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use predicates::prelude::*;

    fn report() -> Report {
        Report {
            seed_file: "FirstClass.cs".to_string(),
            seed_method: "DoSomething".to_string(),
            properties: vec![],
            methods: vec![],
        }
    }

    #[test]
    fn test_output_path_alongside_seed() {
        let writer = ReportWriter::new(&OutputConfig::default());
        let path = writer.output_path(Path::new("src/demo/FirstClass.cs"), "DoSomething");
        assert_eq!(path, PathBuf::from("src/demo/FirstClass_DoSomething_analysis.json"));

        let bare = ReportWriter::new(&OutputConfig { pretty: true, file_suffix: String::new() });
        assert_eq!(
            bare.output_path(Path::new("FirstClass.cs"), "DoSomething"),
            PathBuf::from("FirstClass_DoSomething.json")
        );
    }

    #[test]
    fn test_compact_serialization() {
        let writer = ReportWriter::new(&OutputConfig { pretty: false, file_suffix: "analysis".to_string() });
        let json = writer.serialize(&report()).unwrap();
        assert_eq!(
            json,
            r#"{"seedFile":"FirstClass.cs","seedMethod":"DoSomething","properties":[],"methods":[]}"#
        );
    }

    #[tokio::test]
    async fn test_write_creates_report_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let seed = temp.child("FirstClass.cs");
        seed.write_str("class FirstClass {}").unwrap();

        let writer = ReportWriter::new(&OutputConfig::default());
        let path = writer.write(&report(), seed.path()).await.unwrap();

        temp.child("FirstClass_DoSomething_analysis.json")
            .assert(predicate::path::exists())
            .assert(predicate::str::contains("\"seedMethod\": \"DoSomething\""));
        assert_eq!(path, temp.path().join("FirstClass_DoSomething_analysis.json"));
    }
}
