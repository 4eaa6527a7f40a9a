// server/src/cli/commands.rs

// Command-line arguments and subcommands for the clinic administration CLI.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bariatric-cli")]
#[command(version = "0.1.0")]
#[command(about = "Administration tool for the bariatric clinic assistant")]
pub struct CliArgs {
    /// YAML configuration file; `bariatric.yaml` is used when present.
    #[arg(long, short = 'c', global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// Overrides the configured data directory.
    #[arg(long, global = true, env = "BARIATRIC_DATA_DIR", value_hint = clap::ValueHint::DirPath)]
    pub data_directory: Option<PathBuf>,
    #[command(subcommand)]
    pub command: ClinicCommands,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum ClinicCommands {
    /// Seed the default roles.
    Init,
    /// Create a super administrator account.
    CreateAdmin {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "BARIATRIC_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, default_value = "System")]
        first_name: String,
        #[arg(long, default_value = "Administrator")]
        last_name: String,
    },
    /// Import surgery types from a JSON file.
    ImportSurgeryTypes {
        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,
    },
    /// Import diet plans from a JSON file.
    ImportDietPlans {
        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,
    },
    /// List every user with status and roles.
    ListUsers,
    ActivateUser {
        username: String,
    },
    DeactivateUser {
        username: String,
    },
    /// Export surgery types and diet plans as JSON.
    ExportConfig {
        #[arg(long, short = 'o', default_value = "config_export.json")]
        output: PathBuf,
    },
    /// Classify a message and print the assistant's answer.
    Chat {
        message: String,
    },
}
