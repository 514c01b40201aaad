//! Static detection of programs that block on standard input.
//!
//! Detection is pattern matching over the source, never execution. Misses are
//! expected; the execution service reporting that input was required is the
//! authoritative fallback.

use serde::{Deserialize, Serialize};

use crate::language::{LanguageId, LanguageRegistry};

/// Longest hint shown to the user.
const MAX_HINT_LEN: usize = 60;

/// What a program is expected to read before it can finish.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRequirement {
    /// Whether execution is expected to block on input.
    pub requires_input: bool,

    /// Short, advisory snippets describing each read.
    pub hints: Vec<String>,

    /// Estimated number of reads. Advisory only.
    pub count: usize,
}

impl InputRequirement {
    /// No input expected.
    pub fn none() -> Self {
        Self::default()
    }
}

/// Detects input reads using the patterns of a [`LanguageRegistry`].
#[derive(Debug, Clone, Copy)]
pub struct InputDetector<'a> {
    registry: &'a LanguageRegistry,
}

impl Default for InputDetector<'static> {
    fn default() -> Self {
        Self::new(LanguageRegistry::global())
    }
}

impl<'a> InputDetector<'a> {
    pub fn new(registry: &'a LanguageRegistry) -> Self {
        Self { registry }
    }

    /// Decide whether `code` will block for interactive input.
    pub fn detect(&self, code: &str, language: &LanguageId) -> InputRequirement {
        if code.trim().is_empty() {
            return InputRequirement::none();
        }
        let Some(caps) = self.registry.lookup(language) else {
            return InputRequirement::none();
        };
        let Some(pattern) = caps.input_pattern() else {
            return InputRequirement::none();
        };

        let lines: Vec<&str> = code.lines().collect();
        let mut count = 0;
        let mut hints: Vec<String> = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            if caps.is_comment_line(line) {
                continue;
            }
            for m in pattern.find_iter(line) {
                count += 1;
                let hint = call_site_hint(&lines, idx, &line[m.end()..]);
                if !hints.contains(&hint) {
                    hints.push(hint);
                }
            }
        }

        if count == 0 {
            return InputRequirement::none();
        }

        tracing::debug!("detected {} input read(s) in {} code", count, language);
        InputRequirement {
            requires_input: true,
            hints,
            count: count.max(1),
        }
    }
}

/// Detect input reads with the global registry.
pub fn detect(code: &str, language: &LanguageId) -> InputRequirement {
    InputDetector::default().detect(code, language)
}

/// Build a hint for the read at line `idx`.
///
/// Preference order: a prompt literal passed as the call's first argument, a
/// prompt printed on the previous line, then the source line.
fn call_site_hint(lines: &[&str], idx: usize, after_match: &str) -> String {
    if let Some(prompt) = leading_string_literal(after_match)
        && !is_format_string(prompt)
    {
        let prompt = prompt.trim();
        if !prompt.is_empty() {
            return truncate(prompt);
        }
    }

    if let Some(prev) = lines[..idx].iter().rev().find(|l| !l.trim().is_empty())
        && let Some(prompt) = first_string_literal(prev)
    {
        let prompt = prompt.trim();
        if prompt.ends_with(':') || prompt.ends_with('?') {
            return truncate(prompt);
        }
    }

    truncate(&format!("line {}: {}", idx + 1, lines[idx].trim()))
}

/// The string literal `args` opens with, skipping an opening parenthesis.
///
/// Only a literal right at the start counts: one further along belongs to
/// another argument or another call.
fn leading_string_literal(args: &str) -> Option<&str> {
    let args = args.trim_start();
    let args = args.strip_prefix('(').map_or(args, str::trim_start);
    let quote = args.chars().next().filter(|c| matches!(c, '"' | '\'' | '`'))?;
    let body = &args[quote.len_utf8()..];
    let end = body.find(quote)?;
    Some(&body[..end])
}

/// Whether `s` holds a printf-style conversion such as `%d`.
fn is_format_string(s: &str) -> bool {
    s.split('%').skip(1).any(|rest| rest.starts_with(|c: char| c.is_ascii_alphanumeric()))
}

/// Contents of the first quoted string in `s`, if it is closed on the same line.
fn first_string_literal(s: &str) -> Option<&str> {
    let (start, quote) = s.char_indices().find(|(_, c)| matches!(c, '"' | '\'' | '`'))?;
    let body = &s[start + quote.len_utf8()..];
    let end = body.find(quote)?;
    Some(&body[..end])
}

fn truncate(s: &str) -> String {
    if s.chars().count() <= MAX_HINT_LEN {
        return s.to_string();
    }
    let mut out: String = s.chars().take(MAX_HINT_LEN - 1).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom(name: &str) -> LanguageId {
        LanguageId::Custom(name.to_string())
    }

    #[test]
    fn test_empty_code() {
        assert_eq!(detect("", &LanguageId::Python), InputRequirement::none());
        assert_eq!(detect("  \n\t", &LanguageId::Python), InputRequirement::none());
    }

    #[test]
    fn test_python_no_input() {
        let req = detect("print(\"hi\")", &LanguageId::Python);
        assert!(!req.requires_input);
        assert_eq!(req.count, 0);
        assert!(req.hints.is_empty());
    }

    #[test]
    fn test_python_single_input() {
        let req = detect("name = input(\"Your name: \")\nprint(name)", &LanguageId::Python);
        assert!(req.requires_input);
        assert_eq!(req.count, 1);
        assert_eq!(req.hints, vec!["Your name:".to_string()]);
    }

    #[test]
    fn test_counts_every_call_site() {
        let code = "a = int(input())\nb = int(input())\nprint(a + b)";
        let req = detect(code, &LanguageId::Python);
        assert_eq!(req.count, 2);
        assert_eq!(
            req.hints,
            vec![
                "line 1: a = int(input())".to_string(),
                "line 2: b = int(input())".to_string()
            ]
        );
    }

    #[test]
    fn test_prompt_from_previous_line() {
        let code = "#include <stdio.h>\nint main() {\n  int n;\n  printf(\"Enter n:\");\n  scanf(\"%d\", &n);\n}";
        let req = detect(code, &LanguageId::C);
        assert!(req.requires_input);
        assert_eq!(req.count, 1);
        // The format string given to scanf is not a prompt.
        assert_eq!(req.hints, vec!["Enter n:".to_string()]);

        let code = "int n;\nprintf(\"How many?\");\nn = getchar();";
        let req = detect(code, &LanguageId::C);
        assert_eq!(req.hints, vec!["How many?".to_string()]);
    }

    #[test]
    fn test_literal_of_a_later_call_is_not_a_hint() {
        let req = detect("n = int(input()); print(\"x\")", &LanguageId::Python);
        assert_eq!(req.hints, vec!["line 1: n = int(input()); print(\"x\")".to_string()]);

        let req = detect("name = IO.gets(\"Name? \")", &LanguageId::Custom("elixir".to_string()));
        assert_eq!(req.hints, vec!["Name?".to_string()]);

        let req = detect("scanf(\"%d %d\", &a, &b);", &LanguageId::C);
        assert_eq!(req.hints, vec!["line 1: scanf(\"%d %d\", &a, &b);".to_string()]);
    }

    #[test]
    fn test_comment_lines_ignored() {
        let code = "# x = input()\nprint('no input')";
        assert!(!detect(code, &LanguageId::Python).requires_input);

        let code = "// std::cin >> x;\nint main() { return 0; }";
        assert!(!detect(code, &LanguageId::Cpp).requires_input);
    }

    /// One program that reads stdin and one that does not, per registered language.
    const SAMPLES: &[(&str, &str, &str)] = &[
        ("bash", "read name", "echo hi"),
        ("c", "scanf(\"%d\", &n);", "printf(\"hi\");"),
        ("cpp", "int x; std::cin >> x;", "std::cout << \"hi\";"),
        ("csharp", "var line = Console.ReadLine();", "Console.WriteLine(\"hi\");"),
        ("dart", "var s = stdin.readLineSync();", "print('hi');"),
        ("elixir", "name = IO.gets(\"Name: \")", "IO.puts(\"hi\")"),
        ("go", "fmt.Scanln(&name)", "fmt.Println(\"hi\")"),
        ("haskell", "main = getLine >>= putStrLn", "main = putStrLn \"hi\""),
        ("java", "Scanner sc = new Scanner(System.in);\nint n = sc.nextInt();", "System.out.println(\"hi\");"),
        ("javascript", "const rl = readline.createInterface({input: process.stdin});", "console.log('hi');"),
        ("julia", "n = readline()", "println(\"hi\")"),
        ("kotlin", "val n = readLine()!!.toInt()", "println(\"hi\")"),
        ("lua", "local n = io.read(\"n\")", "print(\"hi\")"),
        ("perl", "my $n = <STDIN>;", "print \"hi\";"),
        ("php", "$line = fgets(STDIN);", "echo \"hi\";"),
        ("python", "x = input()", "print('hi')"),
        ("r", "x <- readLines(\"stdin\")", "print(\"hi\")"),
        ("ruby", "name = gets.chomp", "puts 'hi'"),
        ("rust", "std::io::stdin().read_line(&mut buf).unwrap();", "println!(\"hi\");"),
        ("scala", "val n = StdIn.readInt()", "println(\"hi\")"),
        ("swift", "let n = Int(readLine()!)!", "print(\"hi\")"),
        ("typescript", "const data = fs.readFileSync(0, 'utf8');", "console.log('hi');"),
    ];

    #[test]
    fn test_every_registered_language() {
        let names = LanguageRegistry::global().names();
        assert_eq!(names.len(), SAMPLES.len());

        for name in names {
            let (_, reads, plain) = SAMPLES
                .iter()
                .find(|(sample, _, _)| *sample == name)
                .unwrap_or_else(|| panic!("no sample for {name}"));
            let lang = LanguageId::parse(name).unwrap();
            assert_eq!(lang.name(), name);

            let req = detect(reads, &lang);
            assert!(req.requires_input, "{name} should require input");
            assert!(req.count >= 1, "{name} count");
            assert!(!detect(plain, &lang).requires_input, "{name} without input");
        }
    }

    #[test]
    fn test_custom_languages() {
        let req = detect("var s = stdin.readLineSync();", &custom("dart"));
        assert!(req.requires_input);

        // Accepted custom name without registered patterns.
        let req = detect("READ X", &custom("cobol"));
        assert!(!req.requires_input);
    }

    #[test]
    fn test_long_hint_truncated() {
        let code = format!("x = input()  # {}", "z".repeat(100));
        let req = detect(&code, &LanguageId::Python);
        assert_eq!(req.hints[0].chars().count(), MAX_HINT_LEN);
        assert!(req.hints[0].ends_with('…'));
    }
}
