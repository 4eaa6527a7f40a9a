// lib/src/lib.rs
// Classifier, storage and administrative routines shared by the REST API and
// the CLI.

pub mod appointments;
pub mod audit;
pub mod bootstrap;
pub mod chatbot;
pub mod clinical;
pub mod config;
pub mod errors;
pub mod storage_engine;

pub use crate::audit::record_audit;
pub use crate::chatbot::{Classifier, MatchMode};
pub use crate::config::AppConfig;
pub use crate::errors::{ClinicError, Result};
pub use crate::storage_engine::{ClinicStorage, SledClinicStorage};
