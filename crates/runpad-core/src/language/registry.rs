//! The language-capability registry.
//!
//! One table, keyed by canonical language name, holding everything the run
//! flow needs to know about a language: which runtime executes it, which call
//! sites block on standard input, how line comments start, and where a line
//! number sits in its error output.

use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::FxHashMap;

use super::LanguageId;

/// Static description of one language, compiled into [`LanguageCapabilities`].
struct LanguageEntry {
    name: &'static str,
    runtime: Option<&'static str>,
    line_comments: &'static [&'static str],
    input_pattern: Option<&'static str>,
    error_line_pattern: Option<&'static str>,
}

const C_COMMENTS: &[&str] = &["//"];
const HASH_COMMENTS: &[&str] = &["#"];

const ENTRIES: &[LanguageEntry] = &[
    LanguageEntry {
        name: "python",
        runtime: Some("python"),
        line_comments: HASH_COMMENTS,
        input_pattern: Some(
            r"\binput\s*\(|\bsys\.stdin\.read(?:line|lines)?\s*\(|\bfor\s+\w+\s+in\s+sys\.stdin\b|\bfileinput\.input\s*\(",
        ),
        error_line_pattern: Some(r#"(?:File "[^"]*", )?line (\d+)"#),
    },
    LanguageEntry {
        name: "javascript",
        runtime: Some("javascript"),
        line_comments: C_COMMENTS,
        input_pattern: Some(
            r#"\bprompt\s*\(|\.question\s*\(|\bprocess\.stdin\b|\breadFileSync\s*\(\s*(?:0|['"]/dev/stdin['"])"#,
        ),
        error_line_pattern: Some(r"(?:\.[cm]?js|<anonymous>|\[eval\]):(\d+)"),
    },
    LanguageEntry {
        name: "typescript",
        runtime: Some("typescript"),
        line_comments: C_COMMENTS,
        input_pattern: Some(
            r#"\bprompt\s*\(|\.question\s*\(|\bprocess\.stdin\b|\breadFileSync\s*\(\s*(?:0|['"]/dev/stdin['"])"#,
        ),
        error_line_pattern: Some(r"\.tsx?(?::|\()(\d+)"),
    },
    LanguageEntry {
        name: "java",
        runtime: Some("java"),
        line_comments: C_COMMENTS,
        input_pattern: Some(
            r"\.next(?:Int|Line|Double|Long|Float|Boolean|Short|Byte)?\s*\(\s*\)|\.readLine\s*\(\s*\)|\bSystem\.in\.read\s*\(",
        ),
        error_line_pattern: Some(r"\.java:(\d+)"),
    },
    LanguageEntry {
        name: "c",
        runtime: Some("c"),
        line_comments: C_COMMENTS,
        input_pattern: Some(r"\b(?:scanf|fgets|getchar|gets|getline)\s*\("),
        error_line_pattern: Some(r"\.[ch]:(\d+)"),
    },
    LanguageEntry {
        name: "cpp",
        runtime: Some("cpp"),
        line_comments: C_COMMENTS,
        input_pattern: Some(r"\bcin\s*>>|\bgetline\s*\(|\b(?:scanf|fgets|getchar)\s*\("),
        error_line_pattern: Some(r"\.(?:cpp|cc|cxx|hpp|h):(\d+)"),
    },
    LanguageEntry {
        name: "csharp",
        runtime: Some("csharp"),
        line_comments: C_COMMENTS,
        input_pattern: Some(r"\bConsole\.(?:ReadLine|ReadKey|Read)\s*\("),
        error_line_pattern: Some(r"\.cs\((\d+),\d+\)|:line (\d+)"),
    },
    LanguageEntry {
        name: "go",
        runtime: Some("go"),
        line_comments: C_COMMENTS,
        input_pattern: Some(
            r"\bfmt\.(?:Scan|Scanln|Scanf)\s*\(|\.ReadString\s*\(|\.ReadLine\s*\(\s*\)|\bscanner\.Scan\s*\(\s*\)",
        ),
        error_line_pattern: Some(r"\.go:(\d+)"),
    },
    LanguageEntry {
        name: "rust",
        runtime: Some("rust"),
        line_comments: C_COMMENTS,
        input_pattern: Some(r"\.read_line\s*\(|\.read_to_string\s*\(|\bstdin\(\)\s*\.lines\s*\("),
        error_line_pattern: Some(r"\.rs:(\d+)"),
    },
    LanguageEntry {
        name: "ruby",
        runtime: Some("ruby"),
        line_comments: HASH_COMMENTS,
        input_pattern: Some(r"\bgets\b|\bSTDIN\.(?:read|gets|readlines)\b|\$stdin\.(?:read|gets|readlines)\b"),
        error_line_pattern: Some(r"\.rb:(\d+)"),
    },
    LanguageEntry {
        name: "php",
        runtime: Some("php"),
        line_comments: &["//", "#"],
        input_pattern: Some(
            r"\bfgets\s*\(\s*STDIN|\breadline\s*\(|\bfscanf\s*\(\s*STDIN|\bstream_get_contents\s*\(\s*STDIN",
        ),
        error_line_pattern: Some(r"on line (\d+)|\.php:(\d+)"),
    },
    LanguageEntry {
        name: "kotlin",
        runtime: Some("kotlin"),
        line_comments: C_COMMENTS,
        input_pattern: Some(r"\breadLine\s*\(|\breadln(?:OrNull)?\s*\(|\.next(?:Int|Line)?\s*\(\s*\)"),
        error_line_pattern: Some(r"\.kts?:(\d+)"),
    },
    LanguageEntry {
        name: "swift",
        runtime: Some("swift"),
        line_comments: C_COMMENTS,
        input_pattern: Some(r"\breadLine\s*\("),
        error_line_pattern: Some(r"\.swift:(\d+)"),
    },
    // Custom languages the runner also knows how to execute.
    LanguageEntry {
        name: "dart",
        runtime: Some("dart"),
        line_comments: C_COMMENTS,
        input_pattern: Some(r"\bstdin\.readLineSync\s*\(|\bstdin\.readByteSync\s*\("),
        error_line_pattern: Some(r"\.dart:(\d+)"),
    },
    LanguageEntry {
        name: "scala",
        runtime: Some("scala"),
        line_comments: C_COMMENTS,
        input_pattern: Some(r"\bStdIn\.read\w*\s*\(|\breadLine\s*\(|\breadInt\s*\("),
        error_line_pattern: Some(r"\.scala:(\d+)"),
    },
    LanguageEntry {
        name: "lua",
        runtime: Some("lua"),
        line_comments: &["--"],
        input_pattern: Some(r"\bio\.read\s*\(|\bio\.lines\s*\(\s*\)"),
        error_line_pattern: Some(r"\.lua:(\d+)"),
    },
    LanguageEntry {
        name: "perl",
        runtime: Some("perl"),
        line_comments: HASH_COMMENTS,
        input_pattern: Some(r"<STDIN>|<>"),
        error_line_pattern: Some(r"at \S+ line (\d+)"),
    },
    LanguageEntry {
        name: "r",
        runtime: Some("r"),
        line_comments: HASH_COMMENTS,
        input_pattern: Some(r#"\breadline\s*\(|\breadLines\s*\(\s*(?:"stdin"|file\s*\(\s*"stdin")|\bscan\s*\("#),
        error_line_pattern: Some(r"#(\d+):|line (\d+)"),
    },
    LanguageEntry {
        name: "haskell",
        runtime: Some("haskell"),
        line_comments: &["--"],
        input_pattern: Some(r"\bgetLine\b|\bgetContents\b|\binteract\b|\breadLn\b"),
        error_line_pattern: Some(r"\.hs:(\d+)"),
    },
    LanguageEntry {
        name: "elixir",
        runtime: Some("elixir"),
        line_comments: HASH_COMMENTS,
        input_pattern: Some(r"\bIO\.(?:gets|read)\b"),
        error_line_pattern: Some(r"\.exs?:(\d+)"),
    },
    LanguageEntry {
        name: "bash",
        runtime: Some("bash"),
        line_comments: HASH_COMMENTS,
        input_pattern: Some(r"\bread\s+(?:-\w+\s+)*\w+"),
        error_line_pattern: Some(r"line (\d+):"),
    },
    LanguageEntry {
        name: "julia",
        runtime: Some("julia"),
        line_comments: HASH_COMMENTS,
        input_pattern: Some(r"\breadline\s*\(|\breadlines\s*\(\s*stdin|\bread\s*\(\s*stdin"),
        error_line_pattern: Some(r"\.jl:(\d+)"),
    },
];

static GLOBAL: LazyLock<LanguageRegistry> = LazyLock::new(LanguageRegistry::builtin);

/// Compiled capabilities of one language.
#[derive(Debug)]
pub struct LanguageCapabilities {
    /// Canonical language name.
    pub name: &'static str,

    /// Runtime name sent to the execution service.
    pub runtime: Option<&'static str>,

    /// Prefixes that start a line comment.
    pub line_comments: &'static [&'static str],

    input_pattern: Option<Regex>,
    error_line_pattern: Option<Regex>,
}

impl LanguageCapabilities {
    /// Pattern matching a blocking read from standard input.
    pub fn input_pattern(&self) -> Option<&Regex> {
        self.input_pattern.as_ref()
    }

    /// Pattern capturing a line number in the language's error output.
    pub fn error_line_pattern(&self) -> Option<&Regex> {
        self.error_line_pattern.as_ref()
    }

    /// Whether `line` is entirely a line comment.
    pub fn is_comment_line(&self, line: &str) -> bool {
        let trimmed = line.trim_start();
        self.line_comments.iter().any(|prefix| trimmed.starts_with(prefix))
    }
}

/// Lookup table from language to [`LanguageCapabilities`].
#[derive(Debug)]
pub struct LanguageRegistry {
    entries: FxHashMap<&'static str, LanguageCapabilities>,
}

impl LanguageRegistry {
    /// The process-wide registry with every built-in entry.
    pub fn global() -> &'static LanguageRegistry {
        &GLOBAL
    }

    fn builtin() -> Self {
        let entries = ENTRIES
            .iter()
            .map(|entry| {
                let caps = LanguageCapabilities {
                    name: entry.name,
                    runtime: entry.runtime,
                    line_comments: entry.line_comments,
                    input_pattern: entry.input_pattern.and_then(|p| compile(entry.name, p)),
                    error_line_pattern: entry.error_line_pattern.and_then(|p| compile(entry.name, p)),
                };
                (entry.name, caps)
            })
            .collect();

        Self { entries }
    }

    /// Capabilities for a language, if it is registered.
    pub fn lookup(&self, language: &LanguageId) -> Option<&LanguageCapabilities> {
        self.entries.get(language.name())
    }

    /// Runtime name for a language, `None` when it cannot be executed.
    pub fn runtime_for(&self, language: &LanguageId) -> Option<&'static str> {
        self.lookup(language).and_then(|caps| caps.runtime)
    }

    /// Canonical names of every registered language, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.entries.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Number of registered languages.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn compile(language: &str, pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!("Invalid pattern for {}: {}", language, e);
            None
        }
    }
}
