//! Argument parsing, logging setup, and command dispatch.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use diagpack_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging};
use tracing::warn;
use url::Url;
use uuid::Uuid;

use crate::backend::HttpDiagnosticSource;
use crate::client::{CliDependencies, CliResult, parse_url};
use crate::commands::diagnostic::handle_diagnostic;
use crate::output::OutputFormat;

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_API_URL: &str = "http://127.0.0.1:7070";
const EXIT_INTERRUPTED: i32 = 130;

/// Parses CLI arguments, installs logging, and executes the requested command.
/// Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();

    let logging = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format.unwrap_or_else(LogFormat::infer),
        build_sha: option_env!("DIAGPACK_BUILD_SHA").unwrap_or("dev"),
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("warning: {err:#}");
    }

    let trace_id = Uuid::new_v4().to_string();
    let deps = match CliDependencies::from_cli(&cli, &trace_id) {
        Ok(deps) => deps,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            return err.exit_code();
        }
    };

    let result = tokio::select! {
        result = dispatch(cli, &deps) => result,
        () = interrupted() => {
            warn!(trace_id = %trace_id, "interrupted; partial outputs cleaned up");
            eprintln!("interrupted");
            return EXIT_INTERRUPTED;
        }
    };

    match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

/// Resolves on Ctrl-C. Never resolves when the handler cannot be installed.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

async fn dispatch(cli: Cli, deps: &CliDependencies) -> CliResult<()> {
    let source = HttpDiagnosticSource::new(deps.client.clone(), deps.base_url.clone());
    match cli.command {
        Command::Diagnostic(args) => handle_diagnostic(source, args, cli.output).await,
    }
}

#[derive(Parser)]
#[command(
    name = "diagpack",
    version,
    about = "Collect diagnostic bundles for backup-system commands"
)]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "DIAGPACK_API_URL",
        value_parser = parse_url,
        default_value = DEFAULT_API_URL
    )]
    pub(crate) api_url: Url,
    #[arg(long, global = true, env = "DIAGPACK_API_KEY", hide_env_values = true)]
    pub(crate) api_key: Option<String>,
    #[arg(
        long,
        global = true,
        env = "DIAGPACK_CONNECT_TIMEOUT_SECS",
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS,
        help = "Seconds allowed for establishing a connection; requests themselves are unbounded"
    )]
    pub(crate) connect_timeout: u64,
    #[arg(long, global = true, env = "DIAGPACK_LOG", default_value = DEFAULT_LOG_LEVEL)]
    pub(crate) log_level: String,
    #[arg(long, global = true, env = "DIAGPACK_LOG_FORMAT")]
    pub(crate) log_format: Option<LogFormat>,
    #[arg(
        long = "output",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Format of the confirmation message"
    )]
    pub(crate) output: OutputFormat,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Collect the report, metadata, and logs of one command into a directory.
    Diagnostic(DiagnosticArgs),
}

#[derive(Args, Debug, Clone)]
pub(crate) struct DiagnosticArgs {
    /// Directory receiving the bundle; created when absent.
    #[arg(long)]
    pub(crate) path: PathBuf,
    /// Operation id of the command. Takes precedence over `--name`.
    #[arg(long)]
    pub(crate) opid: Option<String>,
    /// Name of the command, such as a backup or restore name.
    #[arg(long)]
    pub(crate) name: Option<String>,
    /// Also pack the bundle into `<prefix>.zip`.
    #[arg(long)]
    pub(crate) archive: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn diagnostic_arguments_parse() -> Result<()> {
        let cli = Cli::try_parse_from([
            "diagpack",
            "diagnostic",
            "--path",
            "/tmp/report",
            "--name",
            "2024-01-01T00:00:00Z",
            "--archive",
            "--output",
            "json",
        ])?;
        assert_eq!(cli.output, OutputFormat::Json);
        let Command::Diagnostic(args) = cli.command;
        assert_eq!(args.path, PathBuf::from("/tmp/report"));
        assert_eq!(args.name.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(args.opid, None);
        assert!(args.archive);
        Ok(())
    }

    #[test]
    fn path_is_required() {
        let result = Cli::try_parse_from(["diagpack", "diagnostic", "--opid", "65a0"]);
        assert!(result.is_err());
    }

    #[test]
    fn log_format_accepts_known_names() -> Result<()> {
        let cli = Cli::try_parse_from([
            "diagpack",
            "--log-format",
            "json",
            "diagnostic",
            "--path",
            "/tmp/report",
            "--opid",
            "65a0",
        ])?;
        let format = cli.log_format.ok_or_else(|| anyhow!("format not parsed"))?;
        assert_eq!(format, LogFormat::Json);
        assert!(
            Cli::try_parse_from(["diagpack", "--log-format", "xml", "diagnostic", "--path", "x"])
                .is_err()
        );
        Ok(())
    }
}
