//! Run command implementation for runpad CLI.
//!
//! Sends a source file to the execution service, collecting stdin on the
//! terminal when the program reads input.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use runpad_core::{
    ExecutionBackend, HttpExecutionBackend, LanguageId, RunOrchestrator, RunState, RunnerConfig,
    SourceBuffer,
};

use crate::colors;
use crate::terminal::{self, InputLines, TerminalNotifier};

/// Options of `runpad run`.
pub struct RunOptions {
    pub file: PathBuf,
    pub language: Option<String>,
    pub stdin: Option<String>,
    pub stdin_file: Option<PathBuf>,
    pub no_prompt: bool,
    pub json: bool,
}

/// Execute a source file.
pub async fn execute(options: RunOptions, config: &RunnerConfig) -> anyhow::Result<()> {
    let code = std::fs::read_to_string(&options.file)
        .with_context(|| format!("could not read {}", options.file.display()))?;
    let language = resolve_language(options.language.as_deref(), &options.file)?;
    let stdin = match (&options.stdin, &options.stdin_file) {
        (Some(text), _) => Some(text.clone()),
        (None, Some(path)) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("could not read {}", path.display()))?,
        ),
        (None, None) => None,
    };

    let backend =
        HttpExecutionBackend::new(&config.executor_url).map_err(runpad_core::Error::from)?;
    let mut orch = RunOrchestrator::new(backend, Arc::new(TerminalNotifier))
        .with_max_input_rounds(config.max_input_rounds);
    let mut editor = SourceBuffer::new(code.clone());

    tracing::debug!("running {} as {}", options.file.display(), language);
    let state = terminal::interruptible(
        orch.abort_handle(),
        orch.run(&mut editor, &code, language, stdin.as_deref()),
    )
    .await
    .map_err(runpad_core::Error::from)?
    .clone();
    let state = drive(&mut orch, &mut editor, state, options.no_prompt).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return match state {
            RunState::Succeeded { .. } => Ok(()),
            _ => Err(anyhow::anyhow!("run ended as {}", state.name())),
        };
    }
    report(state, &editor)
}

/// Parse `--language`, or infer it from the file extension.
pub fn resolve_language(explicit: Option<&str>, file: &Path) -> anyhow::Result<LanguageId> {
    match explicit {
        Some(name) => Ok(LanguageId::parse(name).map_err(runpad_core::Error::from)?),
        None => LanguageId::from_path(file).with_context(|| {
            format!(
                "cannot tell the language of {}; pass --language",
                file.display()
            )
        }),
    }
}

/// Answer input requests until the run settles.
///
/// Ctrl-C while a request is in flight aborts it; at the input prompt it
/// abandons the run.
async fn drive<B: ExecutionBackend>(
    orch: &mut RunOrchestrator<B>,
    editor: &mut SourceBuffer,
    mut state: RunState,
    no_prompt: bool,
) -> anyhow::Result<RunState> {
    let mut input: Option<InputLines> = None;
    loop {
        let requirement = match state {
            RunState::AwaitingInput { requirement } => requirement,
            RunState::NeedsInput { .. } if !no_prompt => {
                orch.provide_input().map_err(runpad_core::Error::from)?
            }
            RunState::NeedsInput { hint } => {
                anyhow::bail!(
                    "the program needs input ({}); pass --stdin or --stdin-file",
                    hint.as_deref().unwrap_or("no details")
                )
            }
            settled => return Ok(settled),
        };

        if no_prompt {
            anyhow::bail!("the program reads input; pass --stdin or --stdin-file");
        }
        let input = input.get_or_insert_with(InputLines::stdin);
        let stdin = tokio::select! {
            stdin = terminal::prompt_stdin(&requirement, input) => stdin?,
            _ = tokio::signal::ctrl_c() => return Ok(RunState::Idle),
        };
        state = terminal::interruptible(orch.abort_handle(), orch.run_with_input(editor, &stdin))
            .await
            .map_err(runpad_core::Error::from)?
            .clone();
    }
}

/// Print the outcome of a settled run.
fn report(state: RunState, editor: &SourceBuffer) -> anyhow::Result<()> {
    match state {
        RunState::Succeeded {
            output, runtime_ms, ..
        } => {
            if !output.is_empty() {
                println!("{output}");
            }
            if let Some(ms) = runtime_ms {
                eprintln!("{}Completed in {} ms{}", colors::DIM, ms, colors::RESET);
            }
            Ok(())
        }
        RunState::Failed {
            message,
            formatted,
            location,
        } => {
            eprintln!("{}{}{}", colors::RED, formatted.as_deref().unwrap_or(&message), colors::RESET);
            if let Some(location) = location {
                eprintln!("\n{}Line {}:{}", colors::BOLD, location.line, colors::RESET);
                terminal::render_excerpt(editor, location.line, 2);
            }
            anyhow::bail!("the program failed")
        }
        RunState::Idle => anyhow::bail!("run aborted"),
        other => anyhow::bail!("run ended in unexpected state {}", other.name()),
    }
}
