//! Interactive scratchpad: a line-oriented editing surface whose code,
//! language and stdin are autosaved as a draft.
//!
//! Plain lines are appended to the code. Commands start with `:`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use runpad_core::{
    DraftFields, DraftKey, DraftStore, HttpExecutionBackend, LanguageId, RunOrchestrator, RunState,
    RunnerConfig, SourceBuffer, UnloadDecision,
};
use serde_json::json;
use tokio::time::MissedTickBehavior;

use crate::colors;
use crate::terminal::{self, InputLines, TerminalNotifier};

const HELP: &str = "\
:run            run the code (asks for input when needed)
:lang <name>    switch language
:stdin <text>   set stdin (\\n for newlines)
:undo           drop the last line
:show           print the code
:clear          reset the draft
:quit           leave";

/// How often debounced drafts are checked while waiting for input.
const AUTOSAVE_TICK: Duration = Duration::from_millis(250);

/// Options of `runpad scratch`.
pub struct ScratchOptions {
    pub key: String,
    pub language: Option<String>,
}

/// One scratch session.
struct Scratch {
    key: DraftKey,
    store: DraftStore,
    orch: RunOrchestrator<HttpExecutionBackend>,
    editor: SourceBuffer,
}

/// What woke the session loop.
enum Event {
    Line(Option<String>),
    Tick,
    Interrupt,
}

/// Execute the scratch command, reading commands from stdin.
pub async fn execute(options: ScratchOptions, config: &RunnerConfig) -> anyhow::Result<()> {
    let key = DraftKey::new(options.key).map_err(runpad_core::Error::from)?;
    let backend =
        HttpExecutionBackend::new(&config.executor_url).map_err(runpad_core::Error::from)?;
    let orch = RunOrchestrator::new(backend, Arc::new(TerminalNotifier))
        .with_max_input_rounds(config.max_input_rounds);

    let mut store = DraftStore::open_dir(&config.drafts_dir, config.autosave);
    if store.is_degraded() {
        eprintln!(
            "{}warning{}: drafts will not be saved this session",
            colors::YELLOW,
            colors::RESET
        );
    }

    let mut defaults = DraftFields::new();
    defaults.insert("code".to_string(), json!(""));
    defaults.insert("language".to_string(), json!("python"));
    defaults.insert("stdin".to_string(), json!(""));
    let restored = store.open(&key, defaults).field_str("code").unwrap_or_default().to_string();

    let mut scratch = Scratch {
        key,
        store,
        orch,
        editor: SourceBuffer::new(restored),
    };

    if let Some(name) = options.language {
        scratch.set_language(&name)?;
    }
    if scratch.store.has_content(&scratch.key) {
        eprintln!("{}Restored draft {}{}", colors::DIM, scratch.key, colors::RESET);
        terminal::render_source(&scratch.editor);
    }
    eprintln!("{}Type code, or :help for commands{}", colors::DIM, colors::RESET);

    let result = scratch.session(&mut InputLines::stdin()).await;
    scratch.store.flush();
    result
}

impl Scratch {
    /// Handle lines until the user leaves or input ends.
    async fn session(&mut self, input: &mut InputLines) -> anyhow::Result<()> {
        let mut autosave = tokio::time::interval(AUTOSAVE_TICK);
        autosave.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let event = tokio::select! {
                line = input.next_line() => Event::Line(line?),
                _ = autosave.tick() => Event::Tick,
                _ = tokio::signal::ctrl_c() => Event::Interrupt,
            };

            match event {
                // End of input leaves like :quit, without asking.
                Event::Line(None) => return Ok(()),
                Event::Line(Some(text)) => {
                    if !self.handle(&text, input).await? {
                        return Ok(());
                    }
                }
                Event::Tick => {}
                Event::Interrupt => {
                    eprintln!();
                    if self.confirm_leave(input).await? {
                        return Ok(());
                    }
                }
            }
            self.store.flush_due(Instant::now());
        }
    }

    /// Apply one input line. Returns `false` when the user leaves.
    async fn handle(&mut self, text: &str, input: &mut InputLines) -> anyhow::Result<bool> {
        let Some(command) = text.strip_prefix(':') else {
            self.append(text);
            return Ok(true);
        };

        let (name, arg) = command.split_once(' ').unwrap_or((command, ""));
        match name {
            "run" => self.run(input).await?,
            "lang" => {
                if let Err(e) = self.set_language(arg.trim()) {
                    eprintln!("{}{e}{}", colors::RED, colors::RESET);
                }
            }
            "stdin" => self.set_stdin(&arg.replace("\\n", "\n")),
            "undo" => self.undo(),
            "show" => terminal::render_source(&self.editor),
            "clear" => self.clear(),
            "quit" | "q" => return Ok(!self.confirm_leave(input).await?),
            "help" => eprintln!("{HELP}"),
            other => eprintln!("unknown command :{other} (try :help)"),
        }
        Ok(true)
    }

    fn code(&self) -> String {
        self.editor.text().to_string()
    }

    fn language(&mut self) -> anyhow::Result<LanguageId> {
        let name = self
            .store
            .get(&self.key)
            .field_str("language")
            .unwrap_or("python")
            .to_string();
        Ok(LanguageId::parse(&name).map_err(runpad_core::Error::from)?)
    }

    fn append(&mut self, text: &str) {
        let mut code = self.code();
        if !code.is_empty() {
            code.push('\n');
        }
        code.push_str(text);
        self.replace_code(code);
    }

    fn undo(&mut self) {
        let code = self.code();
        let trimmed = code.rsplit_once('\n').map(|(head, _)| head).unwrap_or("");
        self.replace_code(trimmed.to_string());
    }

    fn replace_code(&mut self, code: String) {
        self.editor.set_text(code.clone());
        self.orch.on_source_edited(&mut self.editor);
        self.store.set_field(&self.key, "code", code);
    }

    fn set_language(&mut self, name: &str) -> anyhow::Result<()> {
        let language = LanguageId::parse(name).map_err(runpad_core::Error::from)?;
        self.orch.on_language_changed(&mut self.editor);
        self.store.set_field(&self.key, "language", language.name());
        eprintln!("{}language: {}{}", colors::DIM, language, colors::RESET);
        Ok(())
    }

    fn set_stdin(&mut self, stdin: &str) {
        self.store.set_field(&self.key, "stdin", stdin);
    }

    fn clear(&mut self) {
        if self.store.clear(&self.key) {
            let code = self.store.get(&self.key).field_str("code").unwrap_or_default().to_string();
            self.editor.set_text(code);
            self.orch.on_source_edited(&mut self.editor);
            eprintln!("draft cleared");
        } else {
            eprintln!("nothing to clear");
        }
    }

    /// Run the draft. Ctrl-C aborts the run and returns to the session.
    async fn run(&mut self, input: &mut InputLines) -> anyhow::Result<()> {
        let code = self.code();
        let language = match self.language() {
            Ok(language) => language,
            Err(e) => {
                eprintln!("{}{e}{}", colors::RED, colors::RESET);
                return Ok(());
            }
        };
        let stdin = self
            .store
            .get(&self.key)
            .field_str("stdin")
            .unwrap_or_default()
            .to_string();

        let mut state = match terminal::interruptible(
            self.orch.abort_handle(),
            self.orch.run(&mut self.editor, &code, language, Some(&stdin)),
        )
        .await
        {
            Ok(state) => state.clone(),
            // Already notified on the terminal.
            Err(_) => return Ok(()),
        };

        loop {
            let requirement = match state {
                RunState::AwaitingInput { requirement } => requirement,
                RunState::NeedsInput { .. } => self.orch.provide_input().map_err(runpad_core::Error::from)?,
                settled => {
                    self.show_result(settled);
                    return Ok(());
                }
            };
            let stdin = tokio::select! {
                stdin = terminal::prompt_stdin(&requirement, input) => stdin?,
                _ = tokio::signal::ctrl_c() => {
                    self.show_result(RunState::Idle);
                    return Ok(());
                }
            };
            self.set_stdin(&stdin);
            state = terminal::interruptible(
                self.orch.abort_handle(),
                self.orch.run_with_input(&mut self.editor, &stdin),
            )
            .await
            .map_err(runpad_core::Error::from)?
            .clone();
        }
    }

    fn show_result(&self, state: RunState) {
        match state {
            RunState::Succeeded { output, .. } => println!("{output}"),
            RunState::Failed { location, .. } => {
                if let Some(location) = location {
                    terminal::render_excerpt(&self.editor, location.line, 2);
                }
            }
            RunState::Idle => eprintln!("run aborted"),
            other => tracing::debug!("run settled as {}", other.name()),
        }
    }

    /// Ask before leaving while the draft has content.
    ///
    /// A second Ctrl-C at the question leaves.
    async fn confirm_leave(&mut self, input: &mut InputLines) -> anyhow::Result<bool> {
        let UnloadDecision::Prompt { keys } = self.store.unload_guard() else {
            return Ok(true);
        };
        let keys: Vec<String> = keys.iter().map(ToString::to_string).collect();

        eprint!("Draft {} has content. Leave anyway? [y/N] ", keys.join(", "));
        colors::flush_stderr();
        let answer = tokio::select! {
            answer = input.next_line() => answer?,
            _ = tokio::signal::ctrl_c() => return Ok(true),
        };
        Ok(matches!(answer.as_deref().map(str::trim), Some("y" | "Y" | "yes")))
    }
}
