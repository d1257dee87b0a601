pub mod commands;
pub mod session;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "haulvoice",
    about = "HaulVoice operator CLI",
    long_about = "Run the voice assistant session, apply migrations, load demo data, and inspect configuration.",
    after_help = "Examples:\n  haulvoice start --role driver --email jo@demo.haulvoice.dev\n  haulvoice doctor --json\n  haulvoice config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run the interactive voice assistant session")]
    Start {
        #[arg(long, help = "Session role: admin, driver, or client")]
        role: Option<String>,
        #[arg(long, help = "Account email for driver/client roles")]
        email: Option<String>,
        #[arg(long, help = "Path to a haulvoice.toml config file")]
        config: Option<PathBuf>,
    },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo dataset (orders, driver, client, states)")]
    Seed,
    #[command(about = "Inspect effective configuration values with secrets redacted")]
    Config,
    #[command(about = "Validate config, database connectivity, and capability readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Start { role, email, config } => commands::start::run(role, email, config),
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
