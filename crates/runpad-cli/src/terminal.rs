//! The terminal as a host for the run flow: notifications, the stdin prompt
//! and the rendered source with its error highlight.

use std::future::Future;
use std::io::{self, BufRead};

use runpad_core::execute::{AbortHandle, Notification, NotificationLevel, NotificationSink};
use runpad_core::{InputRequirement, SourceBuffer};
use tokio::sync::mpsc;

use crate::colors;

/// Prints notifications to stderr.
#[derive(Debug, Default)]
pub struct TerminalNotifier;

impl NotificationSink for TerminalNotifier {
    fn notify(&self, notification: Notification) {
        let (color, label) = match notification.level {
            NotificationLevel::Info => (colors::CYAN, "info"),
            NotificationLevel::Success => (colors::GREEN, "ok"),
            NotificationLevel::Warning => (colors::YELLOW, "warning"),
            NotificationLevel::Error => (colors::RED, "error"),
        };
        eprintln!(
            "{}{}{}: {}",
            color, label, colors::RESET, notification.message
        );
    }
}

/// Lines of an input stream, read on their own thread so they can be awaited
/// next to signals and timers.
///
/// The reader is a plain thread, so a read blocked on the terminal does not
/// hold up runtime shutdown.
pub struct InputLines {
    rx: mpsc::UnboundedReceiver<io::Result<String>>,
}

impl InputLines {
    /// Lines of the process's stdin.
    pub fn stdin() -> Self {
        Self::spawn(io::BufReader::new(io::stdin()))
    }

    /// Lines of `reader`, with line endings stripped.
    pub fn spawn(reader: impl BufRead + Send + 'static) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::spawn(move || {
            for line in reader.lines() {
                let failed = line.is_err();
                if tx.send(line).is_err() || failed {
                    break;
                }
            }
        });
        Self { rx }
    }

    /// Next line, or `None` at end of input. Cancel safe.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        self.rx.recv().await.transpose()
    }
}

/// Await `fut` with Ctrl-C wired to `abort`.
///
/// The signal only aborts while `fut` is pending.
pub async fn interruptible<F: Future>(abort: AbortHandle, fut: F) -> F::Output {
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("interrupted, aborting run");
            abort.abort();
        }
    });
    let output = fut.await;
    watcher.abort();
    output
}

/// Ask for stdin on the terminal.
///
/// Reads lines until an empty line or end of input. Fewer or more lines than
/// the program is expected to read are accepted.
pub async fn prompt_stdin(requirement: &InputRequirement, input: &mut InputLines) -> io::Result<String> {
    eprintln!(
        "{}The program reads input ({} value(s) expected).{}",
        colors::BOLD,
        requirement.count.max(1),
        colors::RESET
    );
    for hint in &requirement.hints {
        eprintln!("  {}•{} {}", colors::DIM, colors::RESET, hint);
    }
    eprintln!(
        "{}Enter input, one value per line; finish with an empty line:{}",
        colors::DIM,
        colors::RESET
    );
    colors::flush_stderr();

    let mut stdin = String::new();
    while let Some(line) = input.next_line().await? {
        if line.is_empty() {
            break;
        }
        stdin.push_str(&line);
        stdin.push('\n');
    }
    Ok(stdin)
}

/// Print the source with line numbers, marking decorated lines.
pub fn render_source(buffer: &SourceBuffer) {
    let decorated = buffer.decorated_lines();
    let width = buffer.lines().count().max(1).to_string().len();

    for (index, text) in buffer.lines().enumerate() {
        let number = index + 1;
        if decorated.contains(&number) {
            eprintln!(
                "{}{}{:>width$} >{} {}{}",
                colors::RED_BG,
                colors::BOLD,
                number,
                colors::RESET,
                text,
                colors::RESET
            );
        } else {
            eprintln!("{}{:>width$} |{} {}", colors::DIM, number, colors::RESET, text);
        }
    }
}

/// Print a few lines around `line`, with the line itself highlighted.
pub fn render_excerpt(buffer: &SourceBuffer, line: usize, context: usize) {
    let first = line.saturating_sub(context).max(1);
    let last = line + context;
    let width = last.to_string().len();

    for (index, text) in buffer.lines().enumerate() {
        let number = index + 1;
        if number < first || number > last {
            continue;
        }
        if buffer.decoration(number).is_some() {
            eprintln!(
                "{}{:>width$} >{} {}",
                colors::RED,
                number,
                colors::RESET,
                text
            );
        } else {
            eprintln!("{}{:>width$} |{} {}", colors::DIM, number, colors::RESET, text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_prompt_stops_at_empty_line() {
        let requirement = InputRequirement {
            requires_input: true,
            hints: vec!["Name:".to_string()],
            count: 1,
        };
        let mut input = InputLines::spawn(Cursor::new("Ada\nLovelace\n\nignored\n"));
        let stdin = prompt_stdin(&requirement, &mut input).await.unwrap();
        assert_eq!(stdin, "Ada\nLovelace\n");

        // The rest stays queued for the next reader.
        assert_eq!(input.next_line().await.unwrap().as_deref(), Some("ignored"));
        assert_eq!(input.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_prompt_stops_at_eof() {
        let mut input = InputLines::spawn(Cursor::new("1\r\n2"));
        let stdin = prompt_stdin(&InputRequirement::none(), &mut input).await.unwrap();
        assert_eq!(stdin, "1\n2\n");
    }

    #[tokio::test]
    async fn test_interruptible_passes_output_through() {
        let abort = AbortHandle::new();
        let value = interruptible(abort.clone(), async { 42 }).await;
        assert_eq!(value, 42);
        assert!(!abort.is_aborted());
    }
}
