// lib/src/chatbot/render.rs
//! Canned answers built from the knowledge base, one renderer per intent.

use std::fmt::{self, Write};

use models::{Intent, KnowledgeBase};
use thiserror::Error;

use crate::clinical::format_thousands;

/// Surgery type whose requirement list is quoted as the general one.
pub const REFERENCE_SURGERY_TYPE: &str = "gastric_bypass";

pub const GREETING: &str = "Hello! I'm your bariatric surgery assistant. I can help you with information about:\n\
1. Types of bariatric surgery\n\
2. Cost and requirements\n\
3. Pre and post-operative procedures\n\
4. Diet plans\n\
5. Eligibility check\n\
6. Appointment scheduling\n\
What would you like to know about?";

pub const FALLBACK: &str = "I'm not sure I understand. Could you please rephrase your question? \
You can ask about surgery types, costs, requirements, diet plans, or scheduling appointments.";

pub const APOLOGY: &str = "I apologize, but I encountered an error processing your request. \
Please try again or contact our support team.";

const APPOINTMENT_CHECKLIST: &str = "To schedule an appointment, we'll need the following information:\n\n\
1. Your basic information (name, contact details)\n\
2. Preferred appointment dates and times\n\
3. Type of appointment (initial consultation, follow-up, etc.)\n\
4. Any specific concerns you'd like to discuss\n\n\
Would you like to proceed with scheduling an appointment?";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("knowledge base has no surgery type '{0}'")]
    MissingSurgeryType(String),
    #[error("intent {0} has no renderer")]
    NoRenderer(Intent),
    #[error("failed to format response: {0}")]
    Format(#[from] fmt::Error),
}

pub fn render(intent: Intent, kb: &KnowledgeBase) -> Result<String, RenderError> {
    match intent {
        Intent::Greeting => Ok(GREETING.to_string()),
        Intent::SurgeryInfo => surgery_info(kb),
        Intent::CostInfo => cost_info(kb),
        Intent::RequirementsInfo => requirements_info(kb),
        Intent::DietInfo => diet_info(kb),
        Intent::AppointmentInfo => Ok(APPOINTMENT_CHECKLIST.to_string()),
        Intent::RisksInfo => risks_info(kb),
        Intent::Unknown | Intent::Error => Err(RenderError::NoRenderer(intent)),
    }
}

fn surgery_info(kb: &KnowledgeBase) -> Result<String, RenderError> {
    let mut out = String::from("Here are the main types of bariatric surgery we offer:\n\n");
    for surgery in kb.surgery_types() {
        writeln!(out, "📍 {}:", surgery.name)?;
        writeln!(out, "   {}\n", surgery.description)?;
    }
    out.push_str("Would you like to know more about a specific type of surgery?");
    Ok(out)
}

fn cost_info(kb: &KnowledgeBase) -> Result<String, RenderError> {
    let mut out = String::from("Here are the typical cost ranges for different bariatric procedures:\n\n");
    for surgery in kb.surgery_types() {
        writeln!(out, "📍 {}:", surgery.name)?;
        writeln!(
            out,
            "   ${} - ${}\n",
            format_thousands(u64::from(surgery.cost_range.min)),
            format_thousands(u64::from(surgery.cost_range.max))
        )?;
    }
    out.push_str(
        "Note: Final costs may vary based on your specific case, location, and insurance coverage. \
         Would you like to discuss financing options or insurance coverage?",
    );
    Ok(out)
}

fn requirements_info(kb: &KnowledgeBase) -> Result<String, RenderError> {
    let reference = kb
        .surgery_type(REFERENCE_SURGERY_TYPE)
        .ok_or_else(|| RenderError::MissingSurgeryType(REFERENCE_SURGERY_TYPE.to_string()))?;

    let mut out = String::from("General requirements for bariatric surgery include:\n\n");
    for requirement in &reference.requirements {
        writeln!(out, "✓ {}", requirement)?;
    }
    out.push_str("\nWould you like to schedule an evaluation to check your eligibility?");
    Ok(out)
}

fn diet_info(kb: &KnowledgeBase) -> Result<String, RenderError> {
    let mut out = String::from("Here's an overview of the diet phases:\n\n");
    for phase in kb.diet_phases() {
        writeln!(out, "📍 {} ({}):", title_case(&phase.id.replace('_', " ")), phase.duration)?;
        writeln!(out, "   Allowed foods:")?;
        for food in &phase.allowed_foods {
            writeln!(out, "   ✓ {}", food)?;
        }
        writeln!(out, "   Restricted foods:")?;
        for food in &phase.restricted_foods {
            writeln!(out, "   ⛔ {}", food)?;
        }
        out.push('\n');
    }
    out.push_str("Would you like more specific information about any phase?");
    Ok(out)
}

fn risks_info(kb: &KnowledgeBase) -> Result<String, RenderError> {
    let mut out = String::from("Here are the potential risks and complications for different procedures:\n\n");
    for surgery in kb.surgery_types() {
        writeln!(out, "📍 {}:", surgery.name)?;
        for risk in &surgery.risks {
            writeln!(out, "   ⚠ {}", risk)?;
        }
        out.push('\n');
    }
    out.push_str(
        "Remember that our team takes every precaution to minimize these risks. \
         Would you like to discuss these in detail with a healthcare provider?",
    );
    Ok(out)
}

/// Upper-cases the first letter of every alphabetic run and lower-cases the rest.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_is_letter = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
        } else {
            out.push(c);
        }
        prev_is_letter = c.is_alphabetic();
    }
    out
}
