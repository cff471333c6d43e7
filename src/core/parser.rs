use std::path::{Path, PathBuf};
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use tracing::{debug, warn};
use tree_sitter::Tree;

use crate::config::ParsingConfig;
use crate::error::{AnalysisError, Result};
use super::languages::{CSharpParser, LanguageParser};

/// Index of a source unit inside a loaded project
pub type UnitId = usize;

/// One parsed source file. Immutable once parsed.
pub struct SourceUnit {
    /// File path as loaded (canonical when loaded from disk)
    path: PathBuf,

    /// Path relative to the project root, used in report locations
    display_path: String,

    /// Raw source content
    source: String,

    /// Syntax tree over `source`
    tree: Tree,
}

impl SourceUnit {
    pub fn new(path: PathBuf, source: String, tree: Tree) -> Self {
        let display_path = path.to_string_lossy().replace('\\', "/");
        Self {
            path,
            display_path,
            source,
            tree,
        }
    }

    /// Re-label the unit relative to `root` (falls back to the full path)
    pub fn relative_to(mut self, root: &Path) -> Self {
        if let Ok(relative) = self.path.strip_prefix(root) {
            self.display_path = relative.to_string_lossy().replace('\\', "/");
        }
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn display_path(&self) -> &str {
        &self.display_path
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }
}

impl std::fmt::Debug for SourceUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceUnit")
            .field("path", &self.path)
            .field("bytes", &self.source.len())
            .finish()
    }
}

/// Loads every source file of a project into parsed units
pub struct ProjectLoader {
    config: ParsingConfig,
    parser: Box<dyn LanguageParser>,
}

impl ProjectLoader {
    pub fn new(config: &ParsingConfig) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            parser: Box::new(CSharpParser::new()?),
        })
    }

    /// Load the whole project under `root`, making sure the seed file is part of it.
    /// Returns the units and the index of the seed unit.
    /// The seed ignores the size and ignore filters; failing to read it is a seed lookup failure.
    pub async fn load_project(&mut self, root: &Path, seed_file: &Path) -> Result<(Vec<SourceUnit>, UnitId)> {
        let root = tokio::fs::canonicalize(root).await?;
        let seed_file = tokio::fs::canonicalize(seed_file).await
            .map_err(|_| AnalysisError::SeedFileNotFound(seed_file.to_path_buf()))?;

        let mut units = self.load_directory(&root).await?;

        let seed_id = match units.iter().position(|unit| unit.path() == seed_file) {
            Some(id) => id,
            None => {
                debug!("Seed file {} is outside the walked set, loading it directly", seed_file.display());
                let unit = self.read_unit(&seed_file, &root).await
                    .map_err(|e| AnalysisError::SeedFileUnreadable {
                        file: seed_file.clone(),
                        reason: e.to_string(),
                    })?;
                units.push(unit);
                units.len() - 1
            }
        };

        Ok((units, seed_id))
    }

    /// Parse all matching files in a directory
    pub async fn load_directory(&mut self, dir: &Path) -> Result<Vec<SourceUnit>> {
        let mut overrides = OverrideBuilder::new(dir);
        for pattern in &self.config.ignore_patterns {
            overrides.add(&format!("!{}", pattern))
                .map_err(|e| AnalysisError::Config(format!("Invalid ignore pattern '{}': {}", pattern, e)))?;
        }
        let overrides = overrides.build()
            .map_err(|e| AnalysisError::Config(e.to_string()))?;

        let walker = WalkBuilder::new(dir)
            .hidden(false)
            .git_ignore(self.config.respect_gitignore)
            .overrides(overrides)
            .sort_by_file_path(|a, b| a.cmp(b))
            .build();

        let mut units = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| AnalysisError::FileSystem(e.to_string()))?;
            let path = entry.path();

            if !path.is_file() || !self.should_load(path) {
                continue;
            }

            match self.load_file(path, dir).await {
                Ok(unit) => units.push(unit),
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }

        debug!("Loaded {} {} source units from {}", units.len(), self.parser.language_name(), dir.display());
        Ok(units)
    }

    /// Parse a single source file
    pub async fn load_file(&mut self, path: &Path, root: &Path) -> Result<SourceUnit> {
        let metadata = tokio::fs::metadata(path).await?;
        if metadata.len() as usize > self.config.max_file_size {
            return Err(AnalysisError::Parser(
                format!("File {} exceeds maximum size limit", path.display())
            ));
        }

        self.read_unit(path, root).await
    }

    async fn read_unit(&mut self, path: &Path, root: &Path) -> Result<SourceUnit> {
        let content = tokio::fs::read_to_string(path).await?;
        let unit = self.parser.parse(content, path)?;
        Ok(unit.relative_to(root))
    }

    /// Determine if a file should be parsed based on configuration
    fn should_load(&self, path: &Path) -> bool {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(extension) => {
                self.config.file_extensions.iter().any(|e| e == extension)
                    && self.parser.file_extensions().contains(&extension)
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[tokio::test]
    async fn test_load_directory_filters_extensions_and_ignores() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("FirstClass.cs").write_str("class FirstClass {}").unwrap();
        temp.child("Nested/SecondClass.cs").write_str("class SecondClass {}").unwrap();
        temp.child("notes.txt").write_str("not code").unwrap();
        temp.child("obj/Generated.cs").write_str("class Generated {}").unwrap();

        let mut loader = ProjectLoader::new(&ParsingConfig::default()).unwrap();
        let root = std::fs::canonicalize(temp.path()).unwrap();
        let units = loader.load_directory(&root).await.unwrap();

        let paths: Vec<&str> = units.iter().map(|u| u.display_path()).collect();
        assert_eq!(paths, vec!["FirstClass.cs", "Nested/SecondClass.cs"]);
    }

    #[tokio::test]
    async fn test_oversized_files_are_skipped() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("Small.cs").write_str("class Small {}").unwrap();
        temp.child("Large.cs").write_str(&"// padding\n".repeat(100)).unwrap();

        let config = ParsingConfig {
            max_file_size: 64,
            ..ParsingConfig::default()
        };
        let mut loader = ProjectLoader::new(&config).unwrap();
        let root = std::fs::canonicalize(temp.path()).unwrap();
        let units = loader.load_directory(&root).await.unwrap();

        assert_eq!(units.len(), 1);
        assert_eq!(units[0].display_path(), "Small.cs");
    }

    #[tokio::test]
    async fn test_seed_outside_root_is_loaded() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("project/SecondClass.cs").write_str("class SecondClass {}").unwrap();
        temp.child("elsewhere/FirstClass.cs").write_str("class FirstClass {}").unwrap();

        let mut loader = ProjectLoader::new(&ParsingConfig::default()).unwrap();
        let (units, seed) = loader
            .load_project(&temp.path().join("project"), &temp.path().join("elsewhere/FirstClass.cs"))
            .await
            .unwrap();

        assert_eq!(units.len(), 2);
        assert!(units[seed].path().ends_with("elsewhere/FirstClass.cs"));
    }

    #[tokio::test]
    async fn test_oversized_seed_is_still_loaded() {
        let temp = assert_fs::TempDir::new().unwrap();
        let padding = "// padding\n".repeat(20);
        temp.child("Seed.cs").write_str(&format!("{}class Seed {{}}", padding)).unwrap();
        temp.child("Other.cs").write_str(&format!("{}class Other {{}}", padding)).unwrap();

        let config = ParsingConfig {
            max_file_size: 64,
            ..ParsingConfig::default()
        };
        let mut loader = ProjectLoader::new(&config).unwrap();
        let (units, seed) = loader.load_project(temp.path(), &temp.path().join("Seed.cs")).await.unwrap();

        assert_eq!(units.len(), 1);
        assert_eq!(units[seed].display_path(), "Seed.cs");
    }

    #[tokio::test]
    async fn test_unreadable_seed_is_a_seed_failure() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("Seed.cs").write_binary(&[0x63, 0x6c, 0xff, 0xfe, 0x00]).unwrap();

        let mut loader = ProjectLoader::new(&ParsingConfig::default()).unwrap();
        let err = loader.load_project(temp.path(), &temp.path().join("Seed.cs")).await.unwrap_err();

        assert!(matches!(err, AnalysisError::SeedFileUnreadable { .. }));
        assert!(err.is_not_found());
    }
}
