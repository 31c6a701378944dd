//! Command line runner and REPL

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use brisk::{BriskError, EngineConfig, Interpreter, Program};

#[derive(Parser)]
#[command(name = "brisk", version, about = "Run scripts, or start a REPL when no files are given")]
struct Cli {
    /// Source files, loaded in order into one program
    #[arg(value_name = "FILES")]
    files: Vec<PathBuf>,

    /// Directory relative file paths are resolved against
    #[arg(long)]
    root: Option<PathBuf>,

    /// Additional component directory (repeatable)
    #[arg(long = "ext-root", value_name = "DIR")]
    ext_root: Vec<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Conditional compilation constant, `NAME=true|false` (repeatable)
    #[arg(long = "const", value_name = "NAME=BOOL")]
    constants: Vec<String>,

    /// Report warnings on stderr
    #[arg(long)]
    dev: bool,

    /// Log each executed statement (needs a debug log level)
    #[arg(long)]
    trace: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;
    init_logging(&config.log_level);

    if cli.files.is_empty() {
        return repl(&config);
    }
    run_files(&config, &cli.files)
}

fn build_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(root) = &cli.root {
        config = config.with_root_dir(root);
    }
    for dir in &cli.ext_root {
        config = config.with_component_dir(dir);
    }
    for constant in &cli.constants {
        let (name, value) = parse_constant(constant)?;
        config = config.with_const(name, value);
    }
    if cli.dev {
        config = config.with_dev_mode(true);
    }
    if cli.trace {
        config = config.with_trace(true);
        config.log_level = "brisk=debug".to_string();
    }
    Ok(config)
}

fn parse_constant(text: &str) -> anyhow::Result<(&str, bool)> {
    let (name, value) = text
        .split_once('=')
        .ok_or_else(|| anyhow!("constant '{text}' must look like NAME=true"))?;
    let value = match value.trim().to_ascii_lowercase().as_str() {
        "true" => true,
        "false" => false,
        other => bail!("constant '{name}' must be true or false, got '{other}'"),
    };
    Ok((name.trim(), value))
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

fn resolve(root: Option<&Path>, file: &Path) -> PathBuf {
    match root {
        Some(root) if file.is_relative() => root.join(file),
        _ => file.to_path_buf(),
    }
}

fn run_files(config: &EngineConfig, files: &[PathBuf]) -> anyhow::Result<()> {
    let mut interp = Interpreter::from_config(config);
    let mut program = Program::default();
    let mut syntax_errors = 0;

    for file in files {
        let path = resolve(config.root_dir.as_deref(), file);
        let source = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        match interp.parse(&path.to_string_lossy(), &source) {
            Ok(parsed) => program.extend(parsed),
            Err(BriskError::Syntax(errors)) => {
                for err in &errors {
                    eprintln!("{err}");
                }
                syntax_errors += errors.len();
            }
            Err(err) => return Err(err.into()),
        }
    }
    if syntax_errors > 0 {
        bail!("{syntax_errors} syntax error(s); nothing was run");
    }

    debug!(files = files.len(), statements = program.statements.len(), "running");
    interp.run(&program).map_err(BriskError::from)?;
    Ok(())
}

fn repl(config: &EngineConfig) -> anyhow::Result<()> {
    let mut interp = Interpreter::from_config(config);
    let mut editor = DefaultEditor::new()?;
    println!("brisk {} (type 'quit' to leave)", brisk::VERSION);

    loop {
        match editor.readline("brisk> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line);
                if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
                    break;
                }
                match interp.eval_source("$repl", line) {
                    Ok(()) => {}
                    Err(BriskError::Syntax(errors)) => {
                        for err in errors {
                            eprintln!("{err}");
                        }
                    }
                    Err(err) => eprintln!("{err}"),
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("readline error: {err}");
                break;
            }
        }
    }
    Ok(())
}
