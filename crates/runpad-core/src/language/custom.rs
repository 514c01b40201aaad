//! Validation of free-text ("other") language names.

use crate::error::ValidationError;

const MIN_LEN: usize = 2;
const MAX_LEN: usize = 32;

/// Score an unknown name must reach to be accepted.
const ACCEPT_SCORE: i32 = 2;

/// Languages accepted outright, regardless of length or score.
const KNOWN_LANGUAGES: &[&str] = &[
    "ada", "apl", "assembly", "awk", "bash", "clojure", "cobol", "coffeescript", "crystal", "d",
    "dart", "elixir", "elm", "erlang", "f#", "fortran", "fsharp", "groovy", "hack", "haskell",
    "julia", "lisp", "lua", "matlab", "nim", "objective-c", "ocaml", "pascal", "perl",
    "powershell", "prolog", "purescript", "r", "racket", "scala", "scheme", "shell", "smalltalk",
    "solidity", "sql", "tcl", "v", "vala", "vb.net", "visual basic", "zig",
];

/// Common words people type into the language box that are not languages.
const BLOCKLIST: &[&str] = &[
    "anything", "art", "basketball", "biology", "car", "cat", "chemistry", "chinese", "cooking",
    "dog", "english", "food", "football", "french", "game", "german", "hello", "history", "love",
    "math", "maths", "money", "movie", "music", "none", "nothing", "physics", "pizza", "science",
    "soccer", "something", "spanish", "sports", "test", "weather",
];

/// Markup and data formats: real technical names, but nothing to execute.
const NON_EXECUTABLE_FORMATS: &[&str] = &[
    "css", "csv", "html", "json", "latex", "markdown", "md", "toml", "xml", "yaml", "yml",
];

const LANGUAGE_SUFFIXES: &[&str] = &["script", "lang", "++", "#", "ql", "ml"];

/// Validate a custom language name and return its normalized form.
///
/// Normalization lowercases, trims and collapses runs of whitespace.
pub fn validate_custom_name(raw: &str) -> Result<String, ValidationError> {
    let name = raw.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    let reject = |reason: &str| ValidationError::InvalidLanguage {
        name: raw.trim().to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(reject("the name is empty"));
    }
    if KNOWN_LANGUAGES.contains(&name.as_str()) {
        return Ok(name);
    }
    if name.len() < MIN_LEN || name.len() > MAX_LEN {
        return Err(reject(&format!(
            "the name must be between {MIN_LEN} and {MAX_LEN} characters"
        )));
    }
    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(reject("the name must start with a letter"));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '+' | '#' | '.' | '_' | '-' | ' ')))
    {
        return Err(reject(&format!("'{bad}' is not allowed in a language name")));
    }
    if BLOCKLIST.contains(&name.as_str()) {
        return Err(reject("it is not a programming language"));
    }
    if NON_EXECUTABLE_FORMATS.contains(&name.as_str()) {
        return Err(reject("it is a markup or data format, not an executable language"));
    }

    let score = language_score(&name);
    tracing::debug!("custom language {:?} scored {}", name, score);
    if score < ACCEPT_SCORE {
        return Err(reject("it does not look like a programming language"));
    }

    Ok(name)
}

/// Lightweight "looks like a language name" heuristic.
fn language_score(name: &str) -> i32 {
    let mut score = 0;

    // Versioned spelling of a known language, e.g. "lua5.4" or "perl6".
    let base = name.trim_end_matches(|c: char| c.is_ascii_digit() || c == '.');
    if base != name && KNOWN_LANGUAGES.contains(&base) {
        score += 3;
    }
    if LANGUAGE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
        score += 2;
    }

    let words = name.split(' ').count();
    match words {
        1 => score += 1,
        2 => {}
        _ => score -= 2,
    }
    if name.len() <= 12 {
        score += 1;
    }

    let letters: Vec<char> = name.chars().filter(|c| c.is_ascii_alphabetic()).collect();
    if letters.len() > 4 && !letters.iter().any(|c| "aeiouy".contains(*c)) {
        score -= 2;
    }
    if letters.len() > 2 && letters.iter().all(|c| *c == letters[0]) {
        score -= 3;
    }

    score
}
