pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "tanya",
    about = "Tanya operator CLI",
    long_about = "Inspect Tanya configuration, check backend readiness, and run one-shot questions.",
    after_help = "Examples:\n  tanya doctor --json\n  tanya config\n  tanya ask \"tampilkan data customer\""
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
    #[command(about = "Validate config, vision readiness, and ERP backend connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Run one conversational turn and print the response envelope")]
    Ask {
        #[arg(help = "Question or instruction, as typed in the chat")]
        message: String,
        #[arg(long, help = "Attach an image file (png, jpg, gif, webp)")]
        image: Option<PathBuf>,
        #[arg(long, help = "ERP tenant slug overriding erp.tenant")]
        tenant: Option<String>,
        #[arg(long, help = "ERP bearer token overriding erp.bearer_token")]
        credential: Option<String>,
        #[arg(long, help = "Conversation key for cached context")]
        conversation_id: Option<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Ask { message, image, tenant, credential, conversation_id } => {
            commands::ask::run(commands::ask::AskArgs {
                message,
                image,
                tenant,
                credential,
                conversation_id,
            })
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
