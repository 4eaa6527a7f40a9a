// server/src/cli/handlers.rs

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use lib::bootstrap::{self, ImportSummary};
use lib::{AppConfig, Classifier, ClinicStorage, SledClinicStorage};
use models::medical::{NewUser, UserView};

use crate::cli::commands::{CliArgs, ClinicCommands};

/// Parses the process arguments and runs the chosen command.
pub async fn start_cli() -> Result<()> {
    let args = CliArgs::parse();
    let mut config = AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(dir) = args.data_directory {
        config.storage.data_directory = dir;
    }
    let storage = SledClinicStorage::open(&config.storage.data_directory)
        .with_context(|| format!("Failed to open clinic store at {}", config.storage.data_directory.display()))?;

    let output = run(&config, &storage, args.command).await?;
    storage.flush().await?;
    println!("{}", output);
    Ok(())
}

/// Executes one command against `storage` and returns the text to print.
pub async fn run<S: ClinicStorage + ?Sized>(config: &AppConfig, storage: &S, command: ClinicCommands) -> Result<String> {
    match command {
        ClinicCommands::Init => {
            let created = bootstrap::init(storage, &config.roles()?).await?;
            if created.is_empty() {
                Ok("Database initialized successfully. All roles already present.".to_string())
            } else {
                Ok(format!("Database initialized successfully. Created roles: {}", created.join(", ")))
            }
        }
        ClinicCommands::CreateAdmin { username, email, password, first_name, last_name } => {
            let new_user = NewUser {
                username,
                email,
                password,
                first_name,
                last_name,
                phone: None,
                roles: Vec::new(),
            };
            let admin = bootstrap::create_admin(storage, &config.roles()?, new_user).await?;
            Ok(format!("Admin user {} created successfully.", admin.username))
        }
        ClinicCommands::ImportSurgeryTypes { file } => {
            let json = read_file(&file)?;
            let summary = bootstrap::import_surgery_types(storage, &json).await?;
            Ok(format!("Imported {} surgery types.", summary.imported))
        }
        ClinicCommands::ImportDietPlans { file } => {
            let json = read_file(&file)?;
            let summary = bootstrap::import_diet_plans(storage, &json).await?;
            Ok(describe_diet_import(&summary))
        }
        ClinicCommands::ListUsers => {
            let users = bootstrap::list_users(storage).await?;
            Ok(format_user_table(&users))
        }
        ClinicCommands::ActivateUser { username } => {
            bootstrap::set_user_active(storage, &username, true).await?;
            Ok(format!("User {} has been activated.", username))
        }
        ClinicCommands::DeactivateUser { username } => {
            bootstrap::set_user_active(storage, &username, false).await?;
            Ok(format!("User {} has been deactivated.", username))
        }
        ClinicCommands::ExportConfig { output } => {
            let export = bootstrap::export_config(storage).await?;
            let json = serde_json::to_string_pretty(&export)?;
            fs::write(&output, json).with_context(|| format!("Failed to write {}", output.display()))?;
            info!("Exported configuration to {}", output.display());
            Ok(format!("Configuration exported to {}", output.display()))
        }
        ClinicCommands::Chat { message } => {
            let knowledge_base = storage.load_knowledge_base().await?;
            let classifier = Classifier::new(Arc::new(knowledge_base)).with_match_mode(config.chat.match_mode);
            let response = classifier.classify(&message);
            Ok(serde_json::to_string_pretty(&response)?)
        }
    }
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn describe_diet_import(summary: &ImportSummary) -> String {
    let mut text = format!("Imported {} diet plans.", summary.imported);
    for phase in &summary.skipped {
        text.push_str(&format!("\nSkipped {}: surgery type not found.", phase));
    }
    text
}

pub fn format_user_table(users: &[UserView]) -> String {
    if users.is_empty() {
        return "No users found.".to_string();
    }
    let rule = "-".repeat(100);
    let mut table = format!(
        "User List:\n{}\n{:<36} {:<15} {:<25} {:<20} {:<10}\n{}",
        rule, "ID", "Username", "Email", "Roles", "Status", rule
    );
    for user in users {
        let status = if user.is_active { "Active" } else { "Inactive" };
        table.push_str(&format!(
            "\n{:<36} {:<15} {:<25} {:<20} {:<10}",
            user.id.to_string(),
            user.username,
            user.email,
            user.roles.join(", "),
            status
        ));
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    fn parse(args: &[&str]) -> ClinicCommands {
        CliArgs::try_parse_from(std::iter::once("bariatric-cli").chain(args.iter().copied()))
            .unwrap()
            .command
    }

    #[test]
    fn parses_subcommands() {
        assert_eq!(parse(&["init"]), ClinicCommands::Init);
        assert_eq!(
            parse(&["deactivate-user", "nurse1"]),
            ClinicCommands::DeactivateUser { username: "nurse1".into() }
        );
        assert_eq!(
            parse(&["export-config"]),
            ClinicCommands::ExportConfig { output: "config_export.json".into() }
        );
        assert!(CliArgs::try_parse_from(["bariatric-cli", "create-admin", "--username", "root"]).is_err());
    }

    #[tokio::test]
    async fn admin_lifecycle() {
        let storage = SledClinicStorage::temporary().unwrap();
        let config = AppConfig::default();

        let out = run(&config, &storage, parse(&["init"])).await.unwrap();
        assert!(out.contains("super_admin"));

        let create = parse(&[
            "create-admin",
            "--username",
            "chief",
            "--email",
            "chief@clinic.test",
            "--password",
            "long-enough",
        ]);
        let out = run(&config, &storage, create).await.unwrap();
        assert_eq!(out, "Admin user chief created successfully.");

        run(&config, &storage, parse(&["deactivate-user", "chief"])).await.unwrap();
        let table = run(&config, &storage, parse(&["list-users"])).await.unwrap();
        assert!(table.contains("chief"));
        assert!(table.contains("Inactive"));

        assert!(run(&config, &storage, parse(&["activate-user", "nobody"])).await.is_err());
    }

    #[tokio::test]
    async fn imports_and_exports_files() {
        let storage = SledClinicStorage::temporary().unwrap();
        let config = AppConfig::default();

        let mut surgeries = tempfile::NamedTempFile::new().unwrap();
        write!(
            surgeries,
            r#"[{{"name": "Gastric Band", "description": "Adjustable band.", "cost_range": "$14,000 - $18,000"}}]"#
        )
        .unwrap();
        let path = surgeries.path().to_str().unwrap();
        let out = run(&config, &storage, parse(&["import-surgery-types", path])).await.unwrap();
        assert_eq!(out, "Imported 1 surgery types.");

        let mut plans = tempfile::NamedTempFile::new().unwrap();
        write!(
            plans,
            r#"[{{"surgery_type": "gastric_band", "phase": "Liquids", "duration": "2 weeks"}},
                {{"surgery_type": "unknown", "phase": "Solids", "duration": "later"}}]"#
        )
        .unwrap();
        let path = plans.path().to_str().unwrap();
        let out = run(&config, &storage, parse(&["import-diet-plans", path])).await.unwrap();
        assert!(out.starts_with("Imported 1 diet plans."));
        assert!(out.contains("Skipped Solids"));

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("export.json");
        let target_str = target.to_str().unwrap();
        run(&config, &storage, parse(&["export-config", "--output", target_str])).await.unwrap();
        let exported: serde_json::Value = serde_json::from_str(&fs::read_to_string(&target).unwrap()).unwrap();
        assert_eq!(exported["surgery_types"][0]["id"], "gastric_band");
        assert_eq!(exported["diet_plans"][0]["phase"], "liquids");
    }

    #[tokio::test]
    async fn chat_uses_seeded_knowledge() {
        let storage = SledClinicStorage::temporary().unwrap();
        let out = run(&AppConfig::default(), &storage, parse(&["chat", "What are the risks?"]))
            .await
            .unwrap();
        let response: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(response["intent"], "risks_info");
    }
}
