// models/src/lib.rs

pub mod chat;
pub mod errors;
pub mod knowledge_base;
pub mod medical;
pub mod pagination;

pub use chat::{ChatResponse, Intent};
pub use errors::{ModelResult, ValidationError};
pub use knowledge_base::{CostRange, DietPhase, KnowledgeBase, SurgeryType};
pub use pagination::Page;
