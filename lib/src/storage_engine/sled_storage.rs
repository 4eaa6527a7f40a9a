// lib/src/storage_engine/sled_storage.rs
use std::path::Path;

use async_trait::async_trait;
use bincode::{
    config::{self, BigEndian, Configuration, Fixint},
    serde::{borrow_decode_from_slice, encode_to_vec},
};
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use sled::{Db, IVec, Tree};
use tracing::{debug, info, warn};
use uuid::Uuid;

use models::medical::{Appointment, AuditLog, ChatHistory, NewAppointment, NewAuditLog, Role, User};
use models::{ChatResponse, DietPhase, SurgeryType};
use security::{AuthError, Claims, Principal, PrincipalResolver};

use crate::errors::{ClinicError, Result};
use crate::storage_engine::ClinicStorage;

const USERS: &str = "users";
const USERNAMES: &str = "usernames";
const ROLES: &str = "roles";
const APPOINTMENTS: &str = "appointments";
const CHAT_HISTORY: &str = "chat_history";
const AUDIT_LOGS: &str = "audit_logs";
const SURGERY_TYPES: &str = "surgery_types";
const DIET_PHASES: &str = "diet_phases";

/// Sled-backed implementation of [`ClinicStorage`]. Values are bincode
/// encoded; append-only records are keyed by big-endian generated ids so
/// tree order is insertion order.
pub struct SledClinicStorage {
    db: Db,
    users: Tree,
    usernames: Tree,
    roles: Tree,
    appointments: Tree,
    chat_history: Tree,
    audit_logs: Tree,
    surgery_types: Tree,
    diet_phases: Tree,
    config: Configuration<BigEndian, Fixint>,
}

fn bincode_config() -> Configuration<BigEndian, Fixint> {
    config::standard()
        .with_big_endian()
        .with_fixed_int_encoding()
}

impl SledClinicStorage {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;
        let db = sled::open(path)?;
        info!("Opened clinic store at {}", path.display());
        Self::from_db(db)
    }

    pub fn from_db(db: Db) -> Result<Self> {
        Ok(SledClinicStorage {
            users: db.open_tree(USERS)?,
            usernames: db.open_tree(USERNAMES)?,
            roles: db.open_tree(ROLES)?,
            appointments: db.open_tree(APPOINTMENTS)?,
            chat_history: db.open_tree(CHAT_HISTORY)?,
            audit_logs: db.open_tree(AUDIT_LOGS)?,
            surgery_types: db.open_tree(SURGERY_TYPES)?,
            diet_phases: db.open_tree(DIET_PHASES)?,
            config: bincode_config(),
            db,
        })
    }

    /// A throwaway store removed when dropped.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(encode_to_vec(value, self.config)?)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        let (value, _): (T, usize) = borrow_decode_from_slice(bytes, self.config)?;
        Ok(value)
    }

    fn scan<T: DeserializeOwned>(&self, tree: &Tree) -> Result<Vec<T>> {
        tree.iter()
            .values()
            .map(|value| self.decode(&value?))
            .collect()
    }

    /// Ids start at 1 so they read naturally in URLs.
    fn next_id(&self) -> Result<u64> {
        Ok(self.db.generate_id()? + 1)
    }

    /// Key of the record in an ordered tree whose id field equals `id`.
    fn find_key<T, F>(&self, tree: &Tree, key_of: F, id: &str) -> Result<Option<IVec>>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> &str,
    {
        for item in tree.iter() {
            let (key, value) = item?;
            let record: T = self.decode(&value)?;
            if key_of(&record) == id {
                return Ok(Some(key));
            }
        }
        Ok(None)
    }

    fn upsert_ordered<T, F>(&self, tree: &Tree, record: &T, id: &str, key_of: F) -> Result<()>
    where
        T: Serialize + DeserializeOwned,
        F: Fn(&T) -> &str,
    {
        let bytes = self.encode(record)?;
        match self.find_key(tree, key_of, id)? {
            Some(key) => {
                tree.insert(key, bytes)?;
            }
            None => {
                tree.insert(self.next_id()?.to_be_bytes(), bytes)?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ClinicStorage for SledClinicStorage {
    async fn add_user(&self, user: &User) -> Result<()> {
        let id_bytes = user.id.as_bytes().to_vec();
        let claimed = self
            .usernames
            .compare_and_swap(user.username.as_bytes(), None as Option<&[u8]>, Some(id_bytes.as_slice()))?;
        if claimed.is_err() {
            return Err(ClinicError::AlreadyExists(format!("user {}", user.username)));
        }
        self.users.insert(user.id.as_bytes(), self.encode(user)?)?;
        debug!("Stored user {}", user.username);
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let existing: User = match self.users.get(user.id.as_bytes())? {
            Some(bytes) => self.decode(&bytes)?,
            None => return Err(ClinicError::NotFound(format!("user {}", user.id))),
        };
        if existing.username != user.username {
            return Err(ClinicError::InvalidData("usernames cannot be changed".into()));
        }
        self.users.insert(user.id.as_bytes(), self.encode(user)?)?;
        Ok(())
    }

    async fn get_user(&self, id: &Uuid) -> Result<Option<User>> {
        self.users
            .get(id.as_bytes())?
            .map(|bytes| self.decode(&bytes))
            .transpose()
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let Some(id_bytes) = self.usernames.get(username.as_bytes())? else {
            return Ok(None);
        };
        let id = Uuid::from_slice(&id_bytes)
            .map_err(|e| ClinicError::InvalidData(format!("Corrupt username index for {}: {}", username, e)))?;
        self.get_user(&id).await
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.scan(&self.users)?;
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn upsert_role(&self, role: &Role) -> Result<()> {
        self.roles.insert(role.name.as_bytes(), self.encode(role)?)?;
        Ok(())
    }

    async fn get_role(&self, name: &str) -> Result<Option<Role>> {
        self.roles
            .get(name.as_bytes())?
            .map(|bytes| self.decode(&bytes))
            .transpose()
    }

    async fn list_roles(&self) -> Result<Vec<Role>> {
        self.scan(&self.roles)
    }

    async fn add_appointment(&self, appointment: NewAppointment) -> Result<Appointment> {
        let id = self.next_id()?;
        let appointment = Appointment::from_new(id, appointment);
        self.appointments.insert(id.to_be_bytes(), self.encode(&appointment)?)?;
        Ok(appointment)
    }

    async fn update_appointment(&self, appointment: &Appointment) -> Result<()> {
        let key = appointment.id.to_be_bytes();
        if !self.appointments.contains_key(key)? {
            return Err(ClinicError::NotFound(format!("appointment {}", appointment.id)));
        }
        self.appointments.insert(key, self.encode(appointment)?)?;
        Ok(())
    }

    async fn get_appointment(&self, id: u64) -> Result<Option<Appointment>> {
        self.appointments
            .get(id.to_be_bytes())?
            .map(|bytes| self.decode(&bytes))
            .transpose()
    }

    async fn list_appointments(&self) -> Result<Vec<Appointment>> {
        let mut appointments: Vec<Appointment> = self.scan(&self.appointments)?;
        appointments.sort_by_key(|a| a.scheduled_time);
        Ok(appointments)
    }

    async fn add_chat_history(&self, user_id: Uuid, message: &str, response: &ChatResponse) -> Result<ChatHistory> {
        let id = self.next_id()?;
        let entry = ChatHistory::record(id, user_id, message, response);
        self.chat_history.insert(id.to_be_bytes(), self.encode(&entry)?)?;
        Ok(entry)
    }

    async fn get_chat_history(&self, id: u64) -> Result<Option<ChatHistory>> {
        self.chat_history
            .get(id.to_be_bytes())?
            .map(|bytes| self.decode(&bytes))
            .transpose()
    }

    async fn list_chat_history(&self, user_id: &Uuid) -> Result<Vec<ChatHistory>> {
        let mut entries = Vec::new();
        for value in self.chat_history.iter().values().rev() {
            let entry: ChatHistory = self.decode(&value?)?;
            if entry.user_id == *user_id {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    async fn count_chat_history(&self) -> Result<usize> {
        Ok(self.chat_history.len())
    }

    async fn set_chat_feedback(&self, id: u64, user_id: &Uuid, helpful: bool) -> Result<ChatHistory> {
        let mut entry = match self.get_chat_history(id).await? {
            Some(entry) if entry.user_id == *user_id => entry,
            _ => return Err(ClinicError::NotFound(format!("chat message {}", id))),
        };
        entry.feedback = Some(helpful);
        self.chat_history.insert(id.to_be_bytes(), self.encode(&entry)?)?;
        Ok(entry)
    }

    async fn append_audit(&self, entry: NewAuditLog) -> Result<AuditLog> {
        let id = self.next_id()?;
        let log = AuditLog::from_new(id, entry);
        self.audit_logs.insert(id.to_be_bytes(), self.encode(&log)?)?;
        Ok(log)
    }

    async fn list_audit_logs(&self) -> Result<Vec<AuditLog>> {
        self.audit_logs
            .iter()
            .values()
            .rev()
            .map(|value| self.decode(&value?))
            .collect()
    }

    async fn upsert_surgery_type(&self, surgery_type: &SurgeryType) -> Result<()> {
        surgery_type.validate()?;
        self.upsert_ordered(&self.surgery_types, surgery_type, &surgery_type.id, |s: &SurgeryType| s.id.as_str())
    }

    async fn list_surgery_types(&self) -> Result<Vec<SurgeryType>> {
        self.scan(&self.surgery_types)
    }

    async fn upsert_diet_phase(&self, phase: &DietPhase) -> Result<()> {
        phase.validate()?;
        self.upsert_ordered(&self.diet_phases, phase, &phase.id, |p: &DietPhase| p.id.as_str())
    }

    async fn list_diet_phases(&self) -> Result<Vec<DietPhase>> {
        self.scan(&self.diet_phases)
    }

    async fn flush(&self) -> Result<()> {
        self.db.flush_async().await?;
        Ok(())
    }
}

#[async_trait]
impl PrincipalResolver for SledClinicStorage {
    async fn resolve(&self, claims: &Claims) -> std::result::Result<Option<Principal>, AuthError> {
        let user = self
            .get_user(&claims.uid)
            .await
            .map_err(|e| AuthError::Resolver(e.to_string()))?;
        let Some(user) = user.filter(|u| u.is_active && u.username == claims.sub) else {
            return Ok(None);
        };

        let mut roles = Vec::with_capacity(user.roles.len());
        for name in &user.roles {
            match self.get_role(name).await.map_err(|e| AuthError::Resolver(e.to_string()))? {
                Some(role) => roles.push(role),
                None => warn!("User {} references unknown role {}", user.username, name),
            }
        }
        Ok(Some(Principal::for_user(&user, roles)))
    }
}

/// Stamps `last_login` on a user after a successful sign-in.
pub async fn touch_last_login<S: ClinicStorage + ?Sized>(storage: &S, user: &mut User) -> Result<()> {
    let now = Utc::now();
    user.last_login = Some(now);
    user.updated_at = now;
    storage.update_user(user).await
}
