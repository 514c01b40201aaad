//! runpad CLI - run code snippets against a remote code runner.

mod colors;
mod draft;
mod inspect;
mod run;
mod scratch;
mod terminal;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use runpad_core::{AutosavePolicy, RunnerConfig};

#[derive(Parser)]
#[command(name = "runpad")]
#[command(about = "Run code snippets against a remote code runner")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Base URL of the code runner
    #[arg(long, global = true)]
    executor_url: Option<String>,

    /// Directory for saved drafts
    #[arg(long, global = true)]
    drafts_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a source file
    Run {
        /// Path to the source file
        file: PathBuf,

        /// Language (inferred from the file extension by default)
        #[arg(short, long)]
        language: Option<String>,

        /// Text to feed to the program's standard input
        #[arg(long, conflicts_with = "stdin_file")]
        stdin: Option<String>,

        /// File to feed to the program's standard input
        #[arg(long)]
        stdin_file: Option<PathBuf>,

        /// Fail instead of asking for input on the terminal
        #[arg(long)]
        no_prompt: bool,

        /// Print the final run state as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report whether a source file reads standard input
    Detect {
        /// Path to the source file
        file: PathBuf,

        /// Language (inferred from the file extension by default)
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Find the source line an error message points at
    Locate {
        /// Language that produced the error
        #[arg(short, long)]
        language: String,

        /// File holding the error text (stdin by default)
        #[arg(long)]
        error_file: Option<PathBuf>,

        /// Lines the runner prepends to the submitted code
        #[arg(long, default_value = "0")]
        line_offset: usize,
    },

    /// Inspect and edit saved drafts
    Draft {
        #[command(subcommand)]
        command: draft::DraftCommand,
    },

    /// Interactive scratchpad with an autosaved draft
    Scratch {
        /// Draft key to edit
        #[arg(long, default_value = "scratch")]
        key: String,

        /// Language to start with
        #[arg(short, long)]
        language: Option<String>,

        /// Save at most this often instead of on every edit (milliseconds)
        #[arg(long)]
        debounce_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = RunnerConfig::default();
    if let Some(url) = cli.executor_url {
        config = config.with_executor_url(url);
    }
    if let Some(dir) = cli.drafts_dir {
        config = config.with_drafts_dir(dir);
    }

    // Helper to format runpad-core errors with recovery hints
    let format_error = |err: anyhow::Error| -> anyhow::Error {
        if let Some(core_err) = err.downcast_ref::<runpad_core::Error>() {
            anyhow::anyhow!("{}", core_err.with_hint())
        } else {
            err
        }
    };

    match cli.command {
        Commands::Run {
            file,
            language,
            stdin,
            stdin_file,
            no_prompt,
            json,
        } => {
            let options = run::RunOptions {
                file,
                language,
                stdin,
                stdin_file,
                no_prompt,
                json,
            };
            run::execute(options, &config).await.map_err(format_error)?;
        }

        Commands::Detect { file, language } => {
            inspect::detect(&file, language.as_deref()).map_err(format_error)?;
        }

        Commands::Locate {
            language,
            error_file,
            line_offset,
        } => {
            inspect::locate(&language, error_file.as_ref(), line_offset).map_err(format_error)?;
        }

        Commands::Draft { command } => {
            draft::execute(command, &config).map_err(format_error)?;
        }

        Commands::Scratch {
            key,
            language,
            debounce_ms,
        } => {
            if let Some(ms) = debounce_ms {
                config.autosave = AutosavePolicy::debounced(Duration::from_millis(ms));
            }
            let options = scratch::ScratchOptions { key, language };
            scratch::execute(options, &config).await.map_err(format_error)?;
        }
    }

    Ok(())
}
