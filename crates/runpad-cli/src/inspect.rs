//! `detect` and `locate` commands: the static checks without running anything.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::Context;
use runpad_core::{ErrorLocator, InputDetector, LanguageId};

use crate::run::resolve_language;

/// Print the input requirement of a source file as JSON.
pub fn detect(file: &Path, language: Option<&str>) -> anyhow::Result<()> {
    let code = std::fs::read_to_string(file)
        .with_context(|| format!("could not read {}", file.display()))?;
    let language = resolve_language(language, file)?;

    let requirement = InputDetector::default().detect(&code, &language);
    println!("{}", serde_json::to_string_pretty(&requirement)?);
    Ok(())
}

/// Print the source line an error message points at, as JSON.
///
/// The message is read from `error_file`, or from stdin when absent.
pub fn locate(language: &str, error_file: Option<&PathBuf>, line_offset: usize) -> anyhow::Result<()> {
    let language = LanguageId::parse(language).map_err(runpad_core::Error::from)?;
    let message = match error_file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("could not read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let location = ErrorLocator::default()
        .with_line_offset(line_offset)
        .locate(&message, &language);
    println!("{}", serde_json::to_string(&location)?);
    Ok(())
}
