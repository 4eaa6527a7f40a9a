// lib/src/bootstrap.rs
//! Administrative routines shared by the CLI and the REST API: role seeding,
//! account management and knowledge base import/export.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use models::knowledge_base::slugify;
use models::medical::{NewUser, User, UserView};
use models::{CostRange, DietPhase, SurgeryType};
use security::{hash_password, RolesConfig, SUPER_ADMIN_ROLE};

use crate::errors::{ClinicError, Result};
use crate::storage_engine::ClinicStorage;

/// Seeds every configured role that is not stored yet. Returns the names of
/// the roles created; existing roles are left untouched.
pub async fn init<S: ClinicStorage + ?Sized>(storage: &S, roles: &RolesConfig) -> Result<Vec<String>> {
    let mut created = Vec::new();
    for role in roles.to_roles() {
        if storage.get_role(&role.name).await?.is_some() {
            continue;
        }
        storage.upsert_role(&role).await?;
        info!("Created role {}", role.name);
        created.push(role.name);
    }
    Ok(created)
}

/// Validates and stores a new account. Every requested role must exist.
pub async fn register_user<S: ClinicStorage + ?Sized>(storage: &S, new_user: NewUser) -> Result<User> {
    new_user.validate()?;
    if storage.get_user_by_username(&new_user.username).await?.is_some() {
        return Err(ClinicError::AlreadyExists(format!("user {}", new_user.username)));
    }
    let email_taken = storage
        .list_users()
        .await?
        .iter()
        .any(|u| u.email.eq_ignore_ascii_case(&new_user.email));
    if email_taken {
        return Err(ClinicError::AlreadyExists(format!("email {}", new_user.email)));
    }
    for role in &new_user.roles {
        if storage.get_role(role).await?.is_none() {
            return Err(ClinicError::InvalidData(format!("unknown role {}", role)));
        }
    }

    let password_hash = hash_password(&new_user.password)?;
    let user = User::from_new_user(new_user, password_hash);
    storage.add_user(&user).await?;
    info!("Registered user {}", user.username);
    Ok(user)
}

/// Creates a super administrator from explicit credentials, seeding any
/// missing roles first.
pub async fn create_admin<S: ClinicStorage + ?Sized>(
    storage: &S,
    roles: &RolesConfig,
    mut new_user: NewUser,
) -> Result<User> {
    init(storage, roles).await?;
    new_user.roles = vec![SUPER_ADMIN_ROLE.to_string()];
    let mut user = register_user(storage, new_user).await?;
    user.email_verified = true;
    storage.update_user(&user).await?;
    info!("Created administrator {}", user.username);
    Ok(user)
}

/// Replaces a user's role list. Unknown role names are rejected.
pub async fn assign_roles<S: ClinicStorage + ?Sized>(storage: &S, user_id: &Uuid, roles: Vec<String>) -> Result<User> {
    let mut user = storage
        .get_user(user_id)
        .await?
        .ok_or_else(|| ClinicError::NotFound(format!("user {}", user_id)))?;
    for role in &roles {
        if storage.get_role(role).await?.is_none() {
            return Err(ClinicError::InvalidData(format!("unknown role {}", role)));
        }
    }
    user.roles = roles;
    user.updated_at = Utc::now();
    storage.update_user(&user).await?;
    Ok(user)
}

pub async fn set_user_active<S: ClinicStorage + ?Sized>(storage: &S, username: &str, active: bool) -> Result<User> {
    let mut user = storage
        .get_user_by_username(username)
        .await?
        .ok_or_else(|| ClinicError::NotFound(format!("user {}", username)))?;
    user.is_active = active;
    user.updated_at = Utc::now();
    storage.update_user(&user).await?;
    info!("User {} {}", username, if active { "activated" } else { "deactivated" });
    Ok(user)
}

pub async fn list_users<S: ClinicStorage + ?Sized>(storage: &S) -> Result<Vec<UserView>> {
    Ok(storage.list_users().await?.iter().map(UserView::from).collect())
}

/// Outcome of an import run.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: Vec<String>,
}

/// A cost range given either as bounds or as display text such as
/// `"$20,000 - $25,000"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CostRangeInput {
    Bounds(CostRange),
    Text(String),
}

impl CostRangeInput {
    fn resolve(&self) -> Option<CostRange> {
        match self {
            CostRangeInput::Bounds(range) => Some(*range),
            CostRangeInput::Text(text) => parse_cost_range(text),
        }
    }
}

fn parse_cost_range(text: &str) -> Option<CostRange> {
    let mut bounds = text.split('-').map(|part| {
        let digits: String = part.chars().filter(char::is_ascii_digit).collect();
        digits.parse::<u32>().ok()
    });
    let min = bounds.next()??;
    let max = match bounds.next() {
        Some(bound) => bound?,
        None => min,
    };
    if bounds.next().is_some() {
        return None;
    }
    Some(CostRange { min, max })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurgeryTypeEntry {
    /// Storage key; derived from the name when absent.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub risks: Vec<String>,
    pub cost_range: CostRangeInput,
    #[serde(default)]
    pub recovery_time: Option<String>,
    #[serde(default)]
    pub preop_instructions: Vec<String>,
    #[serde(default)]
    pub postop_instructions: Vec<String>,
}

impl SurgeryTypeEntry {
    fn into_surgery_type(self) -> Result<SurgeryType> {
        let id = self.id.unwrap_or_else(|| slugify(&self.name));
        let cost_range = self
            .cost_range
            .resolve()
            .ok_or_else(|| ClinicError::InvalidData(format!("unreadable cost range for {}", id)))?;
        let surgery_type = SurgeryType {
            id,
            name: self.name,
            description: self.description,
            cost_range,
            requirements: self.requirements,
            risks: self.risks,
            recovery_time: self.recovery_time.filter(|r| !r.is_empty()),
            preop_instructions: self.preop_instructions,
            postop_instructions: self.postop_instructions,
        };
        surgery_type.validate()?;
        Ok(surgery_type)
    }
}

impl From<&SurgeryType> for SurgeryTypeEntry {
    fn from(surgery_type: &SurgeryType) -> Self {
        SurgeryTypeEntry {
            id: Some(surgery_type.id.clone()),
            name: surgery_type.name.clone(),
            description: surgery_type.description.clone(),
            requirements: surgery_type.requirements.clone(),
            risks: surgery_type.risks.clone(),
            cost_range: CostRangeInput::Bounds(surgery_type.cost_range),
            recovery_time: surgery_type.recovery_time.clone(),
            preop_instructions: surgery_type.preop_instructions.clone(),
            postop_instructions: surgery_type.postop_instructions.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DietPlanEntry {
    /// Id or display name of the surgery type the plan belongs to.
    #[serde(default)]
    pub surgery_type: Option<String>,
    pub phase: String,
    pub duration: String,
    #[serde(default)]
    pub allowed_foods: Vec<String>,
    #[serde(default)]
    pub restricted_foods: Vec<String>,
    #[serde(default)]
    pub guidelines: Vec<String>,
    #[serde(default)]
    pub supplements: Vec<String>,
}

/// Surgery types and diet plans in the document layout used by import and export.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigExport {
    #[serde(default)]
    pub surgery_types: Vec<SurgeryTypeEntry>,
    #[serde(default)]
    pub diet_plans: Vec<DietPlanEntry>,
}

/// Import documents are either a bare list or an object holding the list
/// under its section name.
#[derive(Deserialize)]
#[serde(untagged)]
enum ImportDocument<T> {
    List(Vec<T>),
    Sections(ConfigExport),
}

fn surgery_entries(json: &str) -> Result<Vec<SurgeryTypeEntry>> {
    Ok(match serde_json::from_str::<ImportDocument<SurgeryTypeEntry>>(json)? {
        ImportDocument::List(entries) => entries,
        ImportDocument::Sections(doc) => doc.surgery_types,
    })
}

fn diet_entries(json: &str) -> Result<Vec<DietPlanEntry>> {
    Ok(match serde_json::from_str::<ImportDocument<DietPlanEntry>>(json)? {
        ImportDocument::List(entries) => entries,
        ImportDocument::Sections(doc) => doc.diet_plans,
    })
}

/// Imports surgery types from a JSON document. Entries with an existing id
/// replace the stored record. The whole document is validated before
/// anything is written.
pub async fn import_surgery_types<S: ClinicStorage + ?Sized>(storage: &S, json: &str) -> Result<ImportSummary> {
    let surgery_types = surgery_entries(json)?
        .into_iter()
        .map(SurgeryTypeEntry::into_surgery_type)
        .collect::<Result<Vec<_>>>()?;

    for surgery_type in &surgery_types {
        storage.upsert_surgery_type(surgery_type).await?;
    }
    info!("Imported {} surgery types", surgery_types.len());
    Ok(ImportSummary { imported: surgery_types.len(), skipped: Vec::new() })
}

/// Imports diet plans from a JSON document. A plan naming a surgery type
/// that is not stored is skipped with a warning. Plan ids are the surgery
/// type id joined with the slug of the phase name.
pub async fn import_diet_plans<S: ClinicStorage + ?Sized>(storage: &S, json: &str) -> Result<ImportSummary> {
    let entries = diet_entries(json)?;
    let surgery_types = storage.list_surgery_types().await?;
    let mut summary = ImportSummary::default();

    for entry in entries {
        let surgery_id = match &entry.surgery_type {
            None => None,
            Some(reference) => {
                let found = surgery_types
                    .iter()
                    .find(|s| s.id == *reference || s.name.eq_ignore_ascii_case(reference));
                match found {
                    Some(surgery_type) => Some(surgery_type.id.clone()),
                    None => {
                        warn!("Surgery type {} not found, skipping diet plan {}", reference, entry.phase);
                        summary.skipped.push(entry.phase);
                        continue;
                    }
                }
            }
        };
        let phase_slug = slugify(&entry.phase);
        let phase = DietPhase {
            id: match &surgery_id {
                Some(surgery_id) => format!("{}_{}", surgery_id, phase_slug),
                None => phase_slug,
            },
            duration: entry.duration,
            allowed_foods: entry.allowed_foods,
            restricted_foods: entry.restricted_foods,
            surgery_type: surgery_id,
            guidelines: entry.guidelines,
            supplements: entry.supplements,
        };
        storage.upsert_diet_phase(&phase).await?;
        summary.imported += 1;
    }
    info!("Imported {} diet plans, skipped {}", summary.imported, summary.skipped.len());
    Ok(summary)
}

/// Exports the stored surgery types and diet plans in a layout that
/// `import_surgery_types` and `import_diet_plans` accept back.
pub async fn export_config<S: ClinicStorage + ?Sized>(storage: &S) -> Result<ConfigExport> {
    let surgery_types = storage.list_surgery_types().await?;
    let diet_plans = storage
        .list_diet_phases()
        .await?
        .into_iter()
        .map(|phase| {
            let phase_name = match &phase.surgery_type {
                Some(surgery) => phase
                    .id
                    .strip_prefix(surgery.as_str())
                    .and_then(|rest| rest.strip_prefix('_'))
                    .unwrap_or(&phase.id)
                    .to_string(),
                None => phase.id.clone(),
            };
            DietPlanEntry {
                surgery_type: phase.surgery_type,
                phase: phase_name,
                duration: phase.duration,
                allowed_foods: phase.allowed_foods,
                restricted_foods: phase.restricted_foods,
                guidelines: phase.guidelines,
                supplements: phase.supplements,
            }
        })
        .collect();

    Ok(ConfigExport {
        surgery_types: surgery_types.iter().map(SurgeryTypeEntry::from).collect(),
        diet_plans,
    })
}
