//! Extraction of the failing source line from error output.

use serde::{Deserialize, Serialize};

use crate::language::{LanguageId, LanguageRegistry};

/// A line in the user's source (1-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorLocation {
    pub line: usize,
}

/// Finds line numbers in error text using per-language patterns.
#[derive(Debug, Clone, Copy)]
pub struct ErrorLocator<'a> {
    registry: &'a LanguageRegistry,

    /// Lines the execution service prepends to the user's code.
    line_offset: usize,
}

impl Default for ErrorLocator<'static> {
    fn default() -> Self {
        Self::new(LanguageRegistry::global())
    }
}

impl<'a> ErrorLocator<'a> {
    pub fn new(registry: &'a LanguageRegistry) -> Self {
        Self {
            registry,
            line_offset: 0,
        }
    }

    /// Account for a harness that wraps the submitted code.
    ///
    /// Reported lines inside the harness map to no location.
    pub fn with_line_offset(mut self, offset: usize) -> Self {
        self.line_offset = offset;
        self
    }

    /// Locate the failing line in `message`.
    ///
    /// Returns `None` when the language has no pattern, nothing matches, or the
    /// number is not a valid line.
    pub fn locate(&self, message: &str, language: &LanguageId) -> Option<ErrorLocation> {
        let pattern = self.registry.lookup(language)?.error_line_pattern()?;
        let captures = pattern.captures(message)?;

        // Patterns may have alternatives; take the first group that took part.
        let raw = captures.iter().skip(1).flatten().next()?.as_str();
        let reported: usize = raw.parse().ok()?;

        let line = reported.checked_sub(self.line_offset)?;
        if line == 0 {
            return None;
        }
        Some(ErrorLocation { line })
    }
}

/// Locate the failing line with the global registry.
pub fn locate(message: &str, language: &LanguageId) -> Option<ErrorLocation> {
    ErrorLocator::default().locate(message, language)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_traceback() {
        let msg = "Traceback (most recent call last):\n  File \"main.py\", line 7, in <module>\n    print(x)\nNameError: name 'x' is not defined";
        assert_eq!(locate(msg, &LanguageId::Python), Some(ErrorLocation { line: 7 }));
    }

    /// An error message and the line it points at, per registered language.
    const SAMPLES: &[(&str, &str, usize)] = &[
        ("bash", "main.sh: line 4: foo: command not found", 4),
        ("c", "main.c:5:3: error: expected ';'", 5),
        ("cpp", "main.cpp:14:7: error: 'x' was not declared", 14),
        ("csharp", "Program.cs(8,13): error CS0103", 8),
        ("dart", "main.dart:4:3: Error: Undefined name 'x'.", 4),
        ("elixir", "** (CompileError) main.exs:9: undefined function foo/0", 9),
        ("go", "./main.go:6:2: undefined: x", 6),
        ("haskell", "Main.hs:3:8: error: Variable not in scope: x", 3),
        ("java", "at Main.main(Main.java:9)", 9),
        ("javascript", "/tmp/main.js:12\n    foo();\n    ^\nReferenceError", 12),
        ("julia", "ERROR: LoadError: UndefVarError: x not defined\nin top-level scope at main.jl:12", 12),
        ("kotlin", "Main.kt:21:5: error: unresolved reference", 21),
        ("lua", "lua: main.lua:5: attempt to call a nil value", 5),
        ("perl", "syntax error at main.pl line 8, near \"}\"", 8),
        ("php", "PHP Parse error: syntax error in /code/main.php on line 11", 11),
        ("python", "  File \"main.py\", line 3\n    print(\nSyntaxError", 3),
        ("r", "Error: unexpected symbol in line 6", 6),
        ("ruby", "main.rb:3:in `<main>': undefined", 3),
        ("rust", "error[E0425]\n --> src/main.rs:2:5", 2),
        ("scala", "Main.scala:7: error: not found: value x", 7),
        ("swift", "main.swift:2:1: error: cannot find 'x'", 2),
        ("typescript", "main.ts(4,10): error TS2304", 4),
    ];

    #[test]
    fn test_every_registered_language() {
        let names = LanguageRegistry::global().names();
        assert_eq!(names.len(), SAMPLES.len());

        for name in names {
            let (_, message, line) = SAMPLES
                .iter()
                .find(|(sample, _, _)| *sample == name)
                .unwrap_or_else(|| panic!("no sample for {name}"));
            let lang = LanguageId::parse(name).unwrap();
            assert_eq!(locate(message, &lang), Some(ErrorLocation { line: *line }), "{name}");
        }
    }

    #[test]
    fn test_alternative_group() {
        let msg = "Unhandled exception. System.Exception: boom\n   at Program.Main() in /app/Program.cs:line 17";
        assert_eq!(locate(msg, &LanguageId::CSharp), Some(ErrorLocation { line: 17 }));
    }

    #[test]
    fn test_no_match() {
        assert_eq!(locate("Segmentation fault", &LanguageId::C), None);
        assert_eq!(locate("", &LanguageId::Python), None);
        assert_eq!(
            locate("main.py line 4", &LanguageId::Custom("cobol".to_string())),
            None
        );
    }

    #[test]
    fn test_invalid_numbers() {
        assert_eq!(locate("File \"main.py\", line 0", &LanguageId::Python), None);
        let huge = format!("main.go:{}:1", "9".repeat(40));
        assert_eq!(locate(&huge, &LanguageId::Go), None);
    }

    #[test]
    fn test_line_offset() {
        let locator = ErrorLocator::default().with_line_offset(2);
        assert_eq!(
            locator.locate("main.rb:5: syntax error", &LanguageId::Ruby),
            Some(ErrorLocation { line: 3 })
        );
        assert_eq!(locator.locate("main.rb:2: syntax error", &LanguageId::Ruby), None);
    }
}
