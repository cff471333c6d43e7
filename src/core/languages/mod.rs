//! Language-specific parsers
//!
//! Each language gets its own module turning source text into a
//! [`SourceUnit`] that owns its syntax tree. Only C# is analysed today.

mod csharp;

pub use csharp::CSharpParser;
pub(crate) use csharp::syntax;

use crate::error::Result;
use super::SourceUnit;

/// Trait that all language parsers must implement
pub trait LanguageParser {
    /// Parse source text into an immutable source unit
    fn parse(&mut self, content: String, file_path: &std::path::Path) -> Result<SourceUnit>;

    /// Get the file extensions this parser handles
    fn file_extensions(&self) -> &[&str];

    /// Get the language name
    fn language_name(&self) -> &str;
}
