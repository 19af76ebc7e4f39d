// crates/parchment-cli/src/main.rs
// ============================================================================
// Module: Parchment CLI Entry Point
// Description: Command dispatcher for the Parchment MCP server and tooling.
// Purpose: Serve MCP requests, lint templates, and print the tool inventory.
// Dependencies: clap, parchment-config, parchment-core, parchment-lint,
//               parchment-mcp, tokio
// ============================================================================

//! ## Overview
//! The Parchment CLI starts the MCP server and provides offline utilities:
//! template linting with a findings-aware exit code and a JSON dump of the
//! registered tool inventory. Inputs are untrusted and size-capped before
//! parsing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use parchment_config::LogSinkKind;
use parchment_config::ParchmentConfig;
use parchment_core::FileLogSink;
use parchment_core::InMemoryCacheBackend;
use parchment_core::InMemoryContentStore;
use parchment_core::NoopLogSink;
use parchment_core::RuntimeInspector;
use parchment_core::RuntimeVersions;
use parchment_core::StaticRuntimeInspector;
use parchment_core::StderrLogSink;
use parchment_core::ToolCache;
use parchment_core::ToolLogSink;
use parchment_core::ToolLogger;
use parchment_lint::TemplateLinter;
use parchment_mcp::McpServer;
use parchment_mcp::ToolRegistry;
use parchment_mcp::build_registry;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a template file accepted by `lint`.
const MAX_TEMPLATE_BYTES: u64 = 1024 * 1024;

/// Environment variable naming an alternate config file.
const CONFIG_ENV: &str = "PARCHMENT_CONFIG";

/// Default config file name probed in the working directory.
const DEFAULT_CONFIG_FILE: &str = "parchment.toml";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "parchment", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Parchment MCP server.
    Serve(ServeCommand),
    /// Lint a template file and report findings.
    Lint(LintCommand),
    /// Print the registered tool inventory as JSON.
    Tools(ToolsCommand),
}

/// Configuration for the `serve` command.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Optional config file path (defaults to parchment.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Configuration for the `lint` command.
#[derive(Args, Debug)]
struct LintCommand {
    /// Template file to lint.
    #[arg(value_name = "FILE")]
    file: PathBuf,
    /// Optional config file path supplying extra known tags.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Configuration for the `tools` command.
#[derive(Args, Debug)]
struct ToolsCommand {
    /// Optional config file path.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying a user-facing message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Lint(command) => command_lint(&command),
        Commands::Tools(command) => command_tools(&command),
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let config = resolve_config(command.config.as_deref())?;
    let registry = wire_registry(&config)?;
    let server = McpServer::new(config, registry)
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Builds the full tool registry from configuration.
fn wire_registry(config: &ParchmentConfig) -> CliResult<ToolRegistry> {
    let mut versions = RuntimeVersions::unknown();
    versions.server_version = env!("CARGO_PKG_VERSION").to_string();
    let runtime: Arc<dyn RuntimeInspector> = Arc::new(StaticRuntimeInspector::new(versions));
    let sink = log_sink(config)?;
    let cache = Arc::new(ToolCache::new(
        Arc::new(InMemoryCacheBackend::new()),
        Arc::clone(&runtime),
        config.cache.enabled,
    ));
    Ok(build_registry(
        config,
        Arc::new(InMemoryContentStore::new()),
        runtime,
        Arc::new(ToolLogger::new(sink)),
        cache,
        Vec::new(),
    ))
}

/// Builds the configured tool log sink.
fn log_sink(config: &ParchmentConfig) -> CliResult<Arc<dyn ToolLogSink>> {
    match config.logging.sink {
        LogSinkKind::Stderr => Ok(Arc::new(StderrLogSink)),
        LogSinkKind::None => Ok(Arc::new(NoopLogSink)),
        LogSinkKind::File => {
            let path = config
                .logging
                .path
                .as_deref()
                .ok_or_else(|| CliError::new("file log sink requires a path".to_string()))?;
            let sink = FileLogSink::new(Path::new(path))
                .map_err(|err| CliError::new(format!("log file open failed: {err}")))?;
            Ok(Arc::new(sink))
        }
    }
}

// ============================================================================
// SECTION: Lint Command
// ============================================================================

/// Executes the `lint` command.
fn command_lint(command: &LintCommand) -> CliResult<ExitCode> {
    let config = resolve_config(command.config.as_deref())?;
    let source = read_template(&command.file)?;
    let linter = TemplateLinter::new(&config.lint.extra_tags);
    let report = linter.lint(&source);
    let error_count = report.error_count();

    let payload = json!({
        "file": command.file.display().to_string(),
        "valid": error_count == 0,
        "error_count": error_count,
        "warning_count": report.warning_count(),
        "tag_count": report.tag_count,
        "issues": report.issues,
    });
    let rendered = serde_json::to_string_pretty(&payload)
        .map_err(|err| CliError::new(format!("report serialization failed: {err}")))?;
    write_stdout_line(&rendered)?;

    if error_count > 0 {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Reads a size-capped UTF-8 template file.
fn read_template(path: &Path) -> CliResult<String> {
    let metadata = std::fs::metadata(path)
        .map_err(|err| CliError::new(format!("cannot read {}: {err}", path.display())))?;
    if metadata.len() > MAX_TEMPLATE_BYTES {
        return Err(CliError::new(format!(
            "template {} exceeds {MAX_TEMPLATE_BYTES} bytes",
            path.display()
        )));
    }
    std::fs::read_to_string(path)
        .map_err(|err| CliError::new(format!("cannot read {}: {err}", path.display())))
}

// ============================================================================
// SECTION: Tools Command
// ============================================================================

/// Executes the `tools` command.
fn command_tools(command: &ToolsCommand) -> CliResult<ExitCode> {
    let config = resolve_config(command.config.as_deref())?;
    let registry = wire_registry(&config)?;
    let payload = json!({ "tools": registry.definitions() });
    let rendered = serde_json::to_string_pretty(&payload)
        .map_err(|err| CliError::new(format!("inventory serialization failed: {err}")))?;
    write_stdout_line(&rendered)?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config Resolution
// ============================================================================

/// Loads configuration, falling back to defaults when nothing is configured.
///
/// An explicit path or environment override must load successfully. Without
/// either, the default file is used when present and built-in defaults
/// otherwise.
fn resolve_config(path: Option<&Path>) -> CliResult<ParchmentConfig> {
    let explicit = path.is_some() || std::env::var(CONFIG_ENV).is_ok();
    if !explicit && !Path::new(DEFAULT_CONFIG_FILE).exists() {
        let config = ParchmentConfig::default();
        config.validate().map_err(|err| CliError::new(err.to_string()))?;
        return Ok(config);
    }
    ParchmentConfig::load(path).map_err(|err| CliError::new(format!("config load failed: {err}")))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes one line to stdout.
fn write_stdout_line(line: &str) -> CliResult<()> {
    writeln!(std::io::stdout(), "{line}")
        .map_err(|err| CliError::new(format!("stdout write failed: {err}")))
}

/// Writes an error to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = writeln!(std::io::stderr(), "parchment: error: {message}");
    ExitCode::FAILURE
}

// ============================================================================
// SECTION: Tests
// ============================================================================
