// lib/src/storage_engine/mod.rs

pub mod sled_storage;

use async_trait::async_trait;
use uuid::Uuid;

use models::medical::{Appointment, AuditLog, ChatHistory, NewAppointment, NewAuditLog, Role, User};
use models::{ChatResponse, DietPhase, KnowledgeBase, SurgeryType};

use crate::errors::Result;

pub use sled_storage::{touch_last_login, SledClinicStorage};

/// Persistence for everything the clinic keeps between requests.
#[async_trait]
pub trait ClinicStorage: Send + Sync + 'static {
    /// Adds a new user. Fails with `AlreadyExists` if the username is taken.
    async fn add_user(&self, user: &User) -> Result<()>;
    /// Replaces a stored user. The username cannot change.
    async fn update_user(&self, user: &User) -> Result<()>;
    async fn get_user(&self, id: &Uuid) -> Result<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    /// All users, oldest first.
    async fn list_users(&self) -> Result<Vec<User>>;

    async fn upsert_role(&self, role: &Role) -> Result<()>;
    async fn get_role(&self, name: &str) -> Result<Option<Role>>;
    async fn list_roles(&self) -> Result<Vec<Role>>;

    async fn add_appointment(&self, appointment: NewAppointment) -> Result<Appointment>;
    async fn update_appointment(&self, appointment: &Appointment) -> Result<()>;
    async fn get_appointment(&self, id: u64) -> Result<Option<Appointment>>;
    /// All appointments ordered by scheduled time.
    async fn list_appointments(&self) -> Result<Vec<Appointment>>;

    async fn add_chat_history(&self, user_id: Uuid, message: &str, response: &ChatResponse) -> Result<ChatHistory>;
    async fn get_chat_history(&self, id: u64) -> Result<Option<ChatHistory>>;
    /// A user's exchanges, newest first.
    async fn list_chat_history(&self, user_id: &Uuid) -> Result<Vec<ChatHistory>>;
    async fn count_chat_history(&self) -> Result<usize>;
    /// Records whether an answer helped. Only the owner of the exchange may rate it.
    async fn set_chat_feedback(&self, id: u64, user_id: &Uuid, helpful: bool) -> Result<ChatHistory>;

    async fn append_audit(&self, entry: NewAuditLog) -> Result<AuditLog>;
    /// Audit entries, newest first.
    async fn list_audit_logs(&self) -> Result<Vec<AuditLog>>;

    /// Inserts or replaces a surgery type, keeping its original position.
    async fn upsert_surgery_type(&self, surgery_type: &SurgeryType) -> Result<()>;
    async fn list_surgery_types(&self) -> Result<Vec<SurgeryType>>;
    async fn upsert_diet_phase(&self, phase: &DietPhase) -> Result<()>;
    async fn list_diet_phases(&self) -> Result<Vec<DietPhase>>;

    /// The stored knowledge base, or the seeded one when nothing was imported.
    async fn load_knowledge_base(&self) -> Result<KnowledgeBase> {
        let surgery_types = self.list_surgery_types().await?;
        let diet_phases = self.list_diet_phases().await?;
        let knowledge_base = KnowledgeBase::new(surgery_types, diet_phases)?;
        if knowledge_base.is_empty() {
            return Ok(KnowledgeBase::seeded());
        }
        Ok(knowledge_base)
    }

    async fn flush(&self) -> Result<()>;
}
