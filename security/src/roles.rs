// security/src/roles.rs
use std::fs;

use anyhow::{Context, Result};
use models::medical::Role;
use serde::Deserialize;

/// Role that bypasses permission checks.
pub const SUPER_ADMIN_ROLE: &str = "super_admin";
/// Role accepted, alongside the super role, by admin-only routes.
pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RoleSeed {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub permissions: Vec<String>,
}

/// The fixed set of roles created at bootstrap, in creation order.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RolesConfig {
    pub roles: Vec<RoleSeed>,
}

impl RolesConfig {
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read roles file {}", path))?;
        Self::from_yaml_str(&content).with_context(|| format!("Failed to parse roles file {}", path))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: RolesConfig = serde_yaml::from_str(content)?;
        let mut names: Vec<&str> = config.roles.iter().map(|r| r.name.as_str()).collect();
        names.sort_unstable();
        if let Some(pair) = names.windows(2).find(|pair| pair[0] == pair[1]) {
            anyhow::bail!("Role '{}' is declared more than once", pair[0]);
        }
        Ok(config)
    }

    pub fn get(&self, name: &str) -> Option<&RoleSeed> {
        self.roles.iter().find(|r| r.name == name)
    }

    pub fn to_roles(&self) -> Vec<Role> {
        self.roles
            .iter()
            .map(|seed| Role::new(&seed.name, &seed.description, seed.permissions.clone()))
            .collect()
    }
}

impl Default for RolesConfig {
    fn default() -> Self {
        fn seed(name: &str, description: &str, permissions: &[&str]) -> RoleSeed {
            RoleSeed {
                name: name.to_string(),
                description: description.to_string(),
                permissions: permissions.iter().map(|p| p.to_string()).collect(),
            }
        }

        RolesConfig {
            roles: vec![
                seed(SUPER_ADMIN_ROLE, "Super Administrator with full system access", &["all"]),
                seed(
                    ADMIN_ROLE,
                    "Administrator with management access",
                    &[
                        "manage_users",
                        "manage_content",
                        "view_analytics",
                        "manage_appointments",
                        "manage_doctors",
                        "view_audit_logs",
                    ],
                ),
                seed(
                    "doctor",
                    "Medical professional",
                    &[
                        "view_patients",
                        "manage_appointments",
                        "view_medical_records",
                        "update_patient_status",
                    ],
                ),
                seed(
                    "staff",
                    "General staff member",
                    &["view_appointments", "basic_patient_info", "update_appointment_status"],
                ),
                seed(
                    "content_manager",
                    "Manages chatbot content and responses",
                    &["manage_chatbot_content", "view_chat_analytics"],
                ),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_roles_are_seeded_in_order() {
        let names: Vec<_> = RolesConfig::default().roles.into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["super_admin", "admin", "doctor", "staff", "content_manager"]);
    }

    #[test]
    fn should_parse_yaml_roles() {
        let yaml = "roles:\n  - name: nurse\n    permissions: [view_patients]\n";
        let config = RolesConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.get("nurse").unwrap().permissions, vec!["view_patients"]);
        assert_eq!(config.get("nurse").unwrap().description, "");
    }

    #[test]
    fn should_reject_duplicate_role_names() {
        let yaml = "roles:\n  - name: a\n    permissions: []\n  - name: a\n    permissions: []\n";
        assert!(RolesConfig::from_yaml_str(yaml).is_err());
    }
}
