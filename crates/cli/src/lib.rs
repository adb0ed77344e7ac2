pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "sfquery",
    about = "sfquery operator CLI",
    long_about = "Inspect configuration, check readiness, and run one-off Salesforce queries through the reasoning engine.",
    after_help = "Examples:\n  sfquery doctor --json\n  sfquery config\n  sfquery ask \"Can the Sales Rep profile see Account.Rating?\" --context '{\"profile\":\"Sales Rep\"}'"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config and LLM credential readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Run one query through the full pipeline and print the response JSON")]
    Ask {
        #[arg(help = "Natural-language question")]
        query: String,
        #[arg(long, help = "Permission context as a JSON object")]
        context: Option<String>,
        #[arg(long, help = "Salesforce user id to attach to the request")]
        user_id: Option<String>,
        #[arg(long, help = "Salesforce username to attach to the request")]
        username: Option<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Ask { query, context, user_id, username } => {
            commands::ask::run(commands::ask::AskArgs { query, context, user_id, username })
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
