// models/src/medical/mod.rs

pub mod appointment;
pub mod audit_log;
pub mod chat_history;
pub mod role;
pub mod user;

pub use appointment::{Appointment, AppointmentStatus, AppointmentType, NewAppointment};
pub use audit_log::{AuditLog, NewAuditLog};
pub use chat_history::ChatHistory;
pub use role::Role;
pub use user::{Login, NewUser, User, UserView};
