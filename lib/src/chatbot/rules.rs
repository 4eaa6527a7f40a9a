// lib/src/chatbot/rules.rs

use models::Intent;
use serde::Deserialize;

/// How a keyword is located inside a normalized message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Plain substring containment, so "eat" also matches inside "heat".
    #[default]
    Substring,
    /// The keyword must be bounded by non-alphanumeric characters or the ends
    /// of the message.
    WholeWord,
}

/// A keyword rule. The first rule with any keyword present in the message wins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntentRule {
    pub intent: Intent,
    pub keywords: &'static [&'static str],
    pub confidence: f64,
}

/// Evaluation order is part of the contract: an ambiguous message resolves to
/// the earliest matching rule.
pub const RULES: [IntentRule; 7] = [
    IntentRule {
        intent: Intent::Greeting,
        keywords: &["hello", "hi", "hey", "good morning", "good afternoon", "good evening", "start"],
        confidence: 1.0,
    },
    IntentRule {
        intent: Intent::SurgeryInfo,
        keywords: &["surgery", "surgeries", "procedure", "types", "options"],
        confidence: 0.9,
    },
    IntentRule {
        intent: Intent::CostInfo,
        keywords: &["cost", "price", "expensive", "payment", "insurance", "afford"],
        confidence: 0.9,
    },
    IntentRule {
        intent: Intent::RequirementsInfo,
        keywords: &["requirement", "qualify", "eligible", "eligibility", "bmi"],
        confidence: 0.9,
    },
    IntentRule {
        intent: Intent::DietInfo,
        keywords: &["diet", "eat", "food", "nutrition", "meal", "eating"],
        confidence: 0.9,
    },
    IntentRule {
        intent: Intent::AppointmentInfo,
        keywords: &["appointment", "schedule", "book", "visit", "consult", "meet"],
        confidence: 0.9,
    },
    IntentRule {
        intent: Intent::RisksInfo,
        keywords: &["risk", "complication", "danger", "safe", "side effect"],
        confidence: 0.9,
    },
];

/// Lower-cases and trims; no further tokenization.
pub fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn contains_word(message: &str, keyword: &str) -> bool {
    message.match_indices(keyword).any(|(start, _)| {
        let end = start + keyword.len();
        let before = message[..start].chars().next_back();
        let after = message[end..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

impl IntentRule {
    pub fn matches(&self, message: &str, mode: MatchMode) -> bool {
        match mode {
            MatchMode::Substring => self.keywords.iter().any(|kw| message.contains(kw)),
            MatchMode::WholeWord => self.keywords.iter().any(|kw| contains_word(message, kw)),
        }
    }
}

/// First rule matching an already normalized message.
pub fn first_match(message: &str, mode: MatchMode) -> Option<&'static IntentRule> {
    RULES.iter().find(|rule| rule.matches(message, mode))
}
