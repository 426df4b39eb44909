pub mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use cloudgate_core::SafetyMode;

#[derive(Debug, Parser)]
#[command(
    name = "cloudgate",
    about = "Cloudgate operator CLI",
    long_about = "Inspect and rehearse the cloud operation safety gate: resolve natural-language \
                  requests, classify operation risk, and review the policy that would apply.",
    after_help = "Examples:\n  cloudgate check \"list s3 buckets\"\n  cloudgate classify ec2 terminate_instances\n  cloudgate denylist\n  cloudgate config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Resolve a request and show the full gate decision without executing")]
    Check {
        #[arg(help = "Natural-language request, e.g. \"list s3 buckets\"")]
        request: String,
        #[arg(long, value_parser = parse_mode, help = "Safety mode to evaluate under (read_only|standard|unrestricted)")]
        mode: Option<SafetyMode>,
    },
    #[command(about = "Classify one service operation's risk category")]
    Classify {
        service: String,
        operation: String,
    },
    #[command(about = "List operations that are blocked in every safety mode")]
    Denylist,
    #[command(about = "Show the effective configuration with source attribution")]
    Config,
}

fn parse_mode(value: &str) -> Result<SafetyMode, String> {
    value.parse()
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Check { request, mode } => commands::check::run(&request, mode),
        Command::Classify { service, operation } => commands::classify::run(&service, &operation),
        Command::Denylist => commands::denylist::run(),
        Command::Config => commands::CommandResult { exit_code: 0, output: commands::config::run() },
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
