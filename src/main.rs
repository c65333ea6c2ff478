mod cli;

use clap::{Parser, Subcommand, ValueEnum};

use cli::ops::OpsArgs;
use cli::trace::TraceArgs;

#[derive(Parser)]
#[command(
    name = "morphic",
    version,
    about = "Self-specializing operation nodes for tree-walking interpreters"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Explicit log level; overrides -v
    #[arg(long, value_enum, global = true)]
    log_level: Option<LogLevel>,
}

#[derive(Subcommand)]
enum Command {
    /// Execute one operator node over a sequence of operand combinations
    /// and show how it rewrites itself
    Trace(TraceArgs),
    /// List operators, their cases in declared order, and chain bounds
    Ops(OpsArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.log_level);

    match cli.command {
        Command::Trace(args) => cli::trace::cmd_trace(args),
        Command::Ops(args) => cli::ops::cmd_ops(args),
    }
}

fn setup_logging(verbose: u8, log_level: Option<LogLevel>) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = match log_level {
        Some(level) => EnvFilter::new(match level {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }),
        None => match verbose {
            0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        },
    };

    let formatter = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_level(true);

    tracing_subscriber::registry()
        .with(formatter)
        .with(filter)
        .init();
}
