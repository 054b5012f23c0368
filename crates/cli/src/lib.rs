pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "hookrelay",
    about = "Hookrelay operator CLI",
    long_about = "Inspect configuration, run readiness checks, and sign test webhooks for the relay.",
    after_help = "Examples:\n  hookrelay doctor --json\n  hookrelay config\n  hookrelay sign --uuid 2f1c0b7e"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run startup preflight checks and return structured status output")]
    Check,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, knowledge base readability, and signature readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Print the channel_hmac signature for a channel uuid")]
    Sign {
        #[arg(long, help = "Channel uuid carried in payload.channel.uuid")]
        uuid: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Check => commands::check::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Sign { uuid } => commands::sign::run(&uuid),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
