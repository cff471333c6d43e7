use clap::Parser;
use std::path::PathBuf;
use anyhow::Result;

use crate::core::{AnalysisOutcome, Engine};

#[derive(Parser)]
#[command(name = "reachlens")]
#[command(about = "Find the string properties and methods reachable from a C# method")]
#[command(version)]
pub struct Cli {
    /// C# source file declaring the seed method
    pub file: PathBuf,

    /// Name of the seed method
    pub method: String,

    /// Project root whose sources count as user code (defaults to the file's directory)
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub async fn execute(self, mut engine: Engine) -> Result<()> {
        println!("Starting analysis...");
        println!("File: {}", self.file.display());
        println!("Method: {}", self.method);

        match engine.analyze(&self.file, &self.method, self.root.as_deref()).await {
            Ok(outcome) => {
                print_outcome(&outcome);
                println!("Analysis completed.");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                println!("{}", e);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn print_outcome(outcome: &AnalysisOutcome) {
    println!();
    println!("Properties Accessed:");
    if outcome.report.properties.is_empty() {
        println!("  (none)");
    }
    for property in &outcome.report.properties {
        println!("  {} ({}) at {}", property.full_name, property.type_name, property.location);
    }

    println!();
    println!("Methods Called:");
    if outcome.report.methods.is_empty() {
        println!("  (none)");
    }
    for method in &outcome.report.methods {
        println!("  {} -> {} at {}", method.full_name, method.return_type, method.location);
    }

    if outcome.skipped_methods > 0 {
        println!();
        println!("{} reached methods had no declaration in the loaded sources", outcome.skipped_methods);
    }

    println!();
    println!("Results written to {}", outcome.report_path.display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use clap::CommandFactory;
    use predicates::prelude::*;

    use crate::config::Config;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_positional_arguments() {
        let cli = Cli::try_parse_from(["reachlens", "src/FirstClass.cs", "DoSomething"]).unwrap();
        assert_eq!(cli.file, PathBuf::from("src/FirstClass.cs"));
        assert_eq!(cli.method, "DoSomething");
        assert!(cli.root.is_none());
        assert!(cli.config.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_options() {
        let cli = Cli::try_parse_from([
            "reachlens", "-v", "--root", "src", "-c", "reachlens.toml", "src/FirstClass.cs", "DoSomething",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.root, Some(PathBuf::from("src")));
        assert_eq!(cli.config, Some(PathBuf::from("reachlens.toml")));
    }

    #[test]
    fn test_missing_method_argument_is_rejected() {
        assert!(Cli::try_parse_from(["reachlens", "src/FirstClass.cs"]).is_err());
    }

    #[tokio::test]
    async fn test_seed_failures_exit_successfully() {
        let temp = assert_fs::TempDir::new().unwrap();
        let seed = temp.child("FirstClass.cs");
        seed.write_str("class FirstClass { void Run() { } }").unwrap();
        let unreadable = temp.child("Broken.cs");
        unreadable.write_binary(&[0xff, 0xfe, 0x00]).unwrap();

        let runs = [
            (temp.path().join("Missing.cs"), "Run"),
            (seed.path().to_path_buf(), "DoesNotExist"),
            (unreadable.path().to_path_buf(), "Run"),
        ];
        for (file, method) in runs {
            let cli = Cli::try_parse_from([
                "reachlens".to_string(),
                file.display().to_string(),
                method.to_string(),
            ])
            .unwrap();
            let engine = Engine::with_config(Config::default()).unwrap();
            assert!(cli.execute(engine).await.is_ok());
        }

        temp.child("FirstClass_DoesNotExist_analysis.json").assert(predicate::path::missing());
    }
}
