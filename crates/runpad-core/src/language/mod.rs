//! Language identifiers and per-language capabilities.
//!
//! This module provides:
//! - [`LanguageId`], the closed set of built-in languages plus validated custom names
//! - The [`LanguageRegistry`], the single table both the input detector and the
//!   error locator read their patterns from

mod custom;
mod registry;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub use custom::validate_custom_name;
pub use registry::{LanguageCapabilities, LanguageRegistry};

/// Identifier of a source language.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum LanguageId {
    Python,
    JavaScript,
    TypeScript,
    Java,
    C,
    Cpp,
    CSharp,
    Go,
    Rust,
    Ruby,
    Php,
    Kotlin,
    Swift,
    /// A user-typed language name that passed [`validate_custom_name`].
    Custom(String),
}

impl LanguageId {
    /// All built-in languages, in menu order.
    pub const BUILTIN: [LanguageId; 13] = [
        LanguageId::Python,
        LanguageId::JavaScript,
        LanguageId::TypeScript,
        LanguageId::Java,
        LanguageId::C,
        LanguageId::Cpp,
        LanguageId::CSharp,
        LanguageId::Go,
        LanguageId::Rust,
        LanguageId::Ruby,
        LanguageId::Php,
        LanguageId::Kotlin,
        LanguageId::Swift,
    ];

    /// Canonical lowercase name, also the registry key.
    pub fn name(&self) -> &str {
        match self {
            LanguageId::Python => "python",
            LanguageId::JavaScript => "javascript",
            LanguageId::TypeScript => "typescript",
            LanguageId::Java => "java",
            LanguageId::C => "c",
            LanguageId::Cpp => "cpp",
            LanguageId::CSharp => "csharp",
            LanguageId::Go => "go",
            LanguageId::Rust => "rust",
            LanguageId::Ruby => "ruby",
            LanguageId::Php => "php",
            LanguageId::Kotlin => "kotlin",
            LanguageId::Swift => "swift",
            LanguageId::Custom(name) => name,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, LanguageId::Custom(_))
    }

    /// Resolve a built-in language from its name or a common alias.
    pub fn builtin(name: &str) -> Option<Self> {
        let lang = match name.trim().to_ascii_lowercase().as_str() {
            "python" | "py" | "python3" => LanguageId::Python,
            "javascript" | "js" | "node" | "nodejs" => LanguageId::JavaScript,
            "typescript" | "ts" => LanguageId::TypeScript,
            "java" => LanguageId::Java,
            "c" => LanguageId::C,
            "cpp" | "c++" | "cplusplus" => LanguageId::Cpp,
            "csharp" | "c#" | "cs" => LanguageId::CSharp,
            "go" | "golang" => LanguageId::Go,
            "rust" | "rs" => LanguageId::Rust,
            "ruby" | "rb" => LanguageId::Ruby,
            "php" => LanguageId::Php,
            "kotlin" | "kt" => LanguageId::Kotlin,
            "swift" => LanguageId::Swift,
            _ => return None,
        };
        Some(lang)
    }

    /// Parse a language name, falling back to a validated custom language.
    pub fn parse(name: &str) -> Result<Self, ValidationError> {
        if let Some(lang) = Self::builtin(name) {
            return Ok(lang);
        }
        validate_custom_name(name).map(LanguageId::Custom)
    }

    /// Guess the language from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        let lang = match ext.as_str() {
            "py" => LanguageId::Python,
            "js" | "mjs" | "cjs" => LanguageId::JavaScript,
            "ts" => LanguageId::TypeScript,
            "java" => LanguageId::Java,
            "c" | "h" => LanguageId::C,
            "cc" | "cpp" | "cxx" | "hpp" => LanguageId::Cpp,
            "cs" => LanguageId::CSharp,
            "go" => LanguageId::Go,
            "rs" => LanguageId::Rust,
            "rb" => LanguageId::Ruby,
            "php" => LanguageId::Php,
            "kt" | "kts" => LanguageId::Kotlin,
            "swift" => LanguageId::Swift,
            "dart" => LanguageId::Custom("dart".to_string()),
            "scala" => LanguageId::Custom("scala".to_string()),
            "lua" => LanguageId::Custom("lua".to_string()),
            "pl" => LanguageId::Custom("perl".to_string()),
            "hs" => LanguageId::Custom("haskell".to_string()),
            "ex" | "exs" => LanguageId::Custom("elixir".to_string()),
            "sh" => LanguageId::Custom("bash".to_string()),
            "r" => LanguageId::Custom("r".to_string()),
            "jl" => LanguageId::Custom("julia".to_string()),
            _ => return None,
        };
        Some(lang)
    }

    /// Runtime name understood by the execution service, if any.
    pub fn runtime(&self) -> Option<&'static str> {
        LanguageRegistry::global().runtime_for(self)
    }
}

impl fmt::Display for LanguageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LanguageId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<LanguageId> for String {
    fn from(lang: LanguageId) -> Self {
        lang.name().to_string()
    }
}

impl TryFrom<String> for LanguageId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}
