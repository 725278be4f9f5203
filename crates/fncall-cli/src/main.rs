//! `fncall` CLI — extract function calls from language model output.
//!
//! ## Usage
//!
//! ```sh
//! # Parse a call expression or JSON payload into invocations (JSON output)
//! echo 'get_weather(city="Paris")' | fncall parse
//! echo '[{"name":"f","arguments":{}}]' | fncall parse --syntax json
//!
//! # Split text at a fence
//! fncall split --start '<tool>' --end '</tool>' -i response.txt
//!
//! # Parse a full model response with a model's conventions
//! fncall extract --model gemma -i response.txt
//!
//! # Replay a response as a token stream, one JSON event per line
//! fncall stream --model llama --chunk-size 3 -i response.txt
//!
//! # Re-render between syntaxes
//! echo 'f(a=1)' | fncall convert --from call --to json
//!
//! # Custom fences from a config file
//! fncall --config fncall.toml extract -i response.txt
//! ```

mod config;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use config::CliConfig;
use fncall_core::{
    format_call_list, format_json_list, split_fenced, FailurePolicy, FencedFormatter,
    GemmaFormatter, HammerFormatter, LlamaFormatter, ModelFormatter, Syntax, ToolCallStream,
};
use serde::Serialize;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::mpsc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "fncall",
    version,
    about = "Extract function calls from language model output"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging (on stderr)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a payload into invocations
    Parse {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        #[arg(long, value_enum, default_value_t = SyntaxArg::Call)]
        syntax: SyntaxArg,
    },
    /// Split text into the text before a fence and the fenced payload
    Split {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        /// Treat --start and --end as regular expressions
        #[arg(long)]
        pattern: bool,
    },
    /// Parse a complete model response into text and invocation parts
    Extract {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Model conventions (defaults to the config file's [format])
        #[arg(long, value_enum)]
        model: Option<ModelArg>,
    },
    /// Feed a response through a streaming session in fixed-size chunks
    Stream {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Model conventions (defaults to the config file's [format])
        #[arg(long, value_enum)]
        model: Option<ModelArg>,
        /// Chunk size in bytes (rounded up to a character boundary)
        #[arg(long, default_value_t = 16)]
        chunk_size: usize,
        /// What to do when a payload fails to parse (overrides the config file)
        #[arg(long, value_enum)]
        on_error: Option<PolicyArg>,
    },
    /// Parse in one syntax and render in another
    Convert {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        #[arg(long, value_enum)]
        from: SyntaxArg,
        #[arg(long, value_enum)]
        to: SyntaxArg,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SyntaxArg {
    Call,
    Json,
}

impl From<SyntaxArg> for Syntax {
    fn from(arg: SyntaxArg) -> Self {
        match arg {
            SyntaxArg::Call => Syntax::CallExpression,
            SyntaxArg::Json => Syntax::Json,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ModelArg {
    Gemma,
    Hammer,
    Llama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum PolicyArg {
    Poison,
    Resume,
}

impl From<PolicyArg> for FailurePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Poison => FailurePolicy::Poison,
            PolicyArg::Resume => FailurePolicy::Resume,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = CliConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Parse { input, syntax } => {
            let text = read_input(input.as_deref())?;
            let invocations = Syntax::from(syntax)
                .parse(&text)
                .context("Failed to parse function calls")?;
            print_json(&invocations)?;
        }
        Commands::Split {
            input,
            start,
            end,
            pattern,
        } => {
            let text = read_input(input.as_deref())?;
            let span = split_fenced(&text, &start, &end, !pattern).context("Failed to split text")?;
            print_json(&span)?;
        }
        Commands::Extract { input, model } => {
            let text = read_input(input.as_deref())?;
            let formatter = build_formatter(model, &config)?;
            let response = formatter
                .parse_response(&text)
                .context("Failed to parse model response")?;
            print_json(&response)?;
        }
        Commands::Stream {
            input,
            model,
            chunk_size,
            on_error,
        } => {
            if chunk_size == 0 {
                bail!("--chunk-size must be at least 1");
            }
            let text = read_input(input.as_deref())?;
            let formatter = build_formatter(model, &config)?;
            let policy = on_error.map_or(config.stream.on_error, FailurePolicy::from);
            run_stream(formatter, policy, &text, chunk_size)?;
        }
        Commands::Convert { input, from, to } => {
            let text = read_input(input.as_deref())?;
            let invocations = Syntax::from(from)
                .parse(&text)
                .context("Failed to parse function calls")?;
            let rendered = match to {
                SyntaxArg::Call => format_call_list(&invocations),
                SyntaxArg::Json => {
                    format_json_list(&invocations).context("Failed to render JSON")?
                }
            };
            println!("{rendered}");
        }
    }

    Ok(())
}

/// Log to stderr: `info` by default, `debug` with --verbose, `RUST_LOG` wins.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("fncall={level},fncall_core={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Pick the formatter from --model, falling back to the config file's format.
fn build_formatter(model: Option<ModelArg>, config: &CliConfig) -> Result<Box<dyn ModelFormatter>> {
    let formatter: Box<dyn ModelFormatter> = match (model, &config.format) {
        (Some(ModelArg::Gemma), _) => Box::new(GemmaFormatter),
        (Some(ModelArg::Hammer), _) => match &config.hammer_role {
            Some(role) => Box::new(
                HammerFormatter::new(role.clone()).context("Invalid hammer_role in config")?,
            ),
            None => Box::new(HammerFormatter::default()),
        },
        (Some(ModelArg::Llama), _) => Box::new(LlamaFormatter),
        (None, Some(format)) => Box::new(FencedFormatter::new(format.clone())),
        (None, None) => {
            bail!("No model conventions given: pass --model or set [format] in a --config file")
        }
    };
    Ok(formatter)
}

/// Feed `text` in chunks and print one JSON event per line as events arrive.
fn run_stream(
    formatter: Box<dyn ModelFormatter>,
    policy: FailurePolicy,
    text: &str,
    chunk_size: usize,
) -> Result<()> {
    let (sender, events) = mpsc::channel();
    let mut stream = ToolCallStream::new(formatter, move |event| {
        // The receiver outlives the stream.
        let _ = sender.send(event);
    })
    .with_policy(policy);

    for chunk in chunks(text, chunk_size) {
        debug!(chunk, "feeding chunk");
        let fed = stream.feed(chunk);
        for event in events.try_iter() {
            println!("{}", serde_json::to_string(&event)?);
        }
        if let Err(err) = fed {
            if policy == FailurePolicy::Poison {
                return Err(err).context("Stream stopped on a payload that failed to parse");
            }
            debug!(error = %err, "skipping payload");
        }
    }

    stream.finish().context("Failed to finish stream")?;
    for event in events.try_iter() {
        println!("{}", serde_json::to_string(&event)?);
    }
    Ok(())
}

/// Split `text` into chunks of at least `size` bytes, ending on char boundaries.
fn chunks(text: &str, size: usize) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    while start < text.len() {
        let mut end = (start + size).min(text.len());
        while !text.is_char_boundary(end) {
            end += 1;
        }
        out.push(&text[start..end]);
        start = end;
    }
    out
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}
