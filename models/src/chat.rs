// models/src/chat.rs

use std::fmt;

use serde::{Deserialize, Serialize};

/// The classified purpose of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    SurgeryInfo,
    CostInfo,
    RequirementsInfo,
    DietInfo,
    AppointmentInfo,
    RisksInfo,
    Unknown,
    Error,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Greeting => "greeting",
            Intent::SurgeryInfo => "surgery_info",
            Intent::CostInfo => "cost_info",
            Intent::RequirementsInfo => "requirements_info",
            Intent::DietInfo => "diet_info",
            Intent::AppointmentInfo => "appointment_info",
            Intent::RisksInfo => "risks_info",
            Intent::Unknown => "unknown",
            Intent::Error => "error",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The classifier's answer to a single message. Serialized with the keys
/// `message`, `intent` and `confidence`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: String,
    pub intent: Intent,
    /// Rule-assigned score in `[0, 1]`, not a learned probability.
    pub confidence: f64,
}

impl ChatResponse {
    pub fn new(message: impl Into<String>, intent: Intent, confidence: f64) -> Self {
        ChatResponse {
            message: message.into(),
            intent,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_serialize_with_wire_keys() {
        let response = ChatResponse::new("hi", Intent::CostInfo, 0.9);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["intent"], "cost_info");
        assert_eq!(value["message"], "hi");
        assert_eq!(value["confidence"], 0.9);
    }

    #[test]
    fn should_clamp_confidence() {
        assert_eq!(ChatResponse::new("", Intent::Greeting, 1.5).confidence, 1.0);
    }
}
