// lib/src/chatbot/mod.rs
//! Rule-based intent classifier for the clinic chat assistant.
//!
//! Classification is a pure function of the message and the knowledge base.
//! It never fails: an unmatched message yields the `unknown` fallback and a
//! renderer fault yields the `error` apology, both with zero confidence.
//! Persisting the exchange is left to the caller.

pub mod render;
pub mod rules;

use std::sync::Arc;

use models::{ChatResponse, Intent, KnowledgeBase};
use tracing::{debug, error};

pub use render::RenderError;
pub use rules::{IntentRule, MatchMode, RULES};

#[derive(Debug, Clone)]
pub struct Classifier {
    knowledge_base: Arc<KnowledgeBase>,
    match_mode: MatchMode,
}

impl Classifier {
    pub fn new(knowledge_base: Arc<KnowledgeBase>) -> Self {
        Classifier {
            knowledge_base,
            match_mode: MatchMode::default(),
        }
    }

    pub fn with_match_mode(mut self, match_mode: MatchMode) -> Self {
        self.match_mode = match_mode;
        self
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.knowledge_base
    }

    pub fn classify(&self, raw_message: &str) -> ChatResponse {
        let message = rules::normalize(raw_message);
        match self.try_classify(&message) {
            Ok(response) => response,
            Err(e) => {
                error!("Error processing message: {}", e);
                ChatResponse::new(render::APOLOGY, Intent::Error, 0.0)
            }
        }
    }

    fn try_classify(&self, message: &str) -> Result<ChatResponse, RenderError> {
        let Some(rule) = rules::first_match(message, self.match_mode) else {
            debug!("No intent rule matched");
            return Ok(ChatResponse::new(render::FALLBACK, Intent::Unknown, 0.0));
        };
        debug!("Matched intent {}", rule.intent);
        let text = render::render(rule.intent, &self.knowledge_base)?;
        Ok(ChatResponse::new(text, rule.intent, rule.confidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::new(Arc::new(KnowledgeBase::seeded()))
    }

    #[test]
    fn cost_question_naming_a_procedure() {
        let response = classifier().classify("What is the cost of gastric bypass?");
        assert_eq!(response.intent, Intent::CostInfo);
        assert_eq!(response.confidence, 0.9);
        assert!(response.message.contains("$20,000 - $25,000"));
    }

    #[test]
    fn greeting_has_full_confidence() {
        let response = classifier().classify("hi there");
        assert_eq!(response.intent, Intent::Greeting);
        assert_eq!(response.confidence, 1.0);
    }

    #[test]
    fn gibberish_falls_back() {
        let response = classifier().classify("asdfqwerty");
        assert_eq!(response.intent, Intent::Unknown);
        assert_eq!(response.confidence, 0.0);
        assert!(response.message.starts_with("I'm not sure I understand"));
    }

    #[test]
    fn blank_messages_fall_back() {
        for message in ["", "   ", "\n\t"] {
            let response = classifier().classify(message);
            assert_eq!(response.intent, Intent::Unknown);
            assert_eq!(response.confidence, 0.0);
        }
    }

    #[test]
    fn classification_ignores_case() {
        assert_eq!(classifier().classify("HELLO"), classifier().classify("hello"));
    }

    #[test]
    fn each_rule_resolves_alone() {
        for rule in rules::RULES.iter() {
            for keyword in rule.keywords {
                for message in [keyword.to_string(), format!("  {}?  ", keyword.to_uppercase())] {
                    let response = classifier().classify(&message);
                    assert_eq!(response.intent, rule.intent, "message: {:?}", message);
                    assert_eq!(response.confidence, rule.confidence, "message: {:?}", message);
                }
            }
        }
    }

    #[test]
    fn substring_quirk_is_reproduced() {
        assert_eq!(classifier().classify("the heat wave").intent, Intent::DietInfo);
        let strict = classifier().with_match_mode(MatchMode::WholeWord);
        assert_eq!(strict.classify("the heat wave").intent, Intent::Unknown);
    }

    #[test]
    fn renderer_fault_becomes_error_response() {
        let kb = KnowledgeBase::new(Vec::new(), Vec::new()).unwrap();
        let response = Classifier::new(Arc::new(kb)).classify("am I eligible?");
        assert_eq!(response.intent, Intent::Error);
        assert_eq!(response.confidence, 0.0);
        assert!(response.message.starts_with("I apologize"));
    }
}
