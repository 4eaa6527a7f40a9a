// lib/src/clinical.rs
//! Patient-facing calculations and display helpers.

use models::KnowledgeBase;
use serde::Serialize;

/// Conditions that block eligibility until a specialist clears the patient.
pub const HIGH_RISK_CONDITIONS: [&str; 3] = ["uncontrolled_diabetes", "severe_heart_disease", "active_cancer"];

pub const MIN_ELIGIBLE_BMI: f64 = 35.0;
pub const MIN_AGE: u32 = 18;
pub const REVIEW_AGE: u32 = 65;

/// BMI from weight in kilograms and height in centimetres, rounded to one
/// decimal. Non-positive inputs yield `None`.
pub fn calculate_bmi(weight_kg: f64, height_cm: f64) -> Option<f64> {
    if weight_kg <= 0.0 || height_cm <= 0.0 {
        return None;
    }
    let height_m = height_cm / 100.0;
    let bmi = weight_kg / (height_m * height_m);
    Some((bmi * 10.0).round() / 10.0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Eligibility {
    pub eligible: bool,
    pub reasons: Vec<String>,
}

pub fn check_eligibility<S: AsRef<str>>(bmi: f64, age: u32, conditions: &[S]) -> Eligibility {
    let mut eligible = true;
    let mut reasons = Vec::new();

    if bmi < MIN_ELIGIBLE_BMI {
        eligible = false;
        reasons.push("BMI must be 35 or higher".to_string());
    }

    if age < MIN_AGE {
        eligible = false;
        reasons.push("Must be 18 or older".to_string());
    } else if age > REVIEW_AGE {
        reasons.push("Age over 65 requires additional evaluation".to_string());
    }

    for condition in conditions {
        let condition = condition.as_ref();
        if HIGH_RISK_CONDITIONS.contains(&condition) {
            eligible = false;
            reasons.push(format!("Medical condition {} requires clearance", condition));
        }
    }

    Eligibility { eligible, reasons }
}

/// Food guidance for one recovery phase of one procedure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DietPlan {
    pub surgery_type: String,
    pub phase: String,
    pub duration: String,
    pub allowed_foods: Vec<String>,
    pub restricted_foods: Vec<String>,
    pub guidelines: Vec<String>,
    pub supplements: Vec<String>,
}

/// Looks up the diet plan for `phase` of `surgery_type`. `None` when either
/// is unknown.
pub fn generate_diet_plan(knowledge_base: &KnowledgeBase, surgery_type: &str, phase: &str) -> Option<DietPlan> {
    let found = knowledge_base.diet_plan(surgery_type, phase)?;
    Some(DietPlan {
        surgery_type: surgery_type.to_string(),
        phase: found.id.clone(),
        duration: found.duration.clone(),
        allowed_foods: found.allowed_foods.clone(),
        restricted_foods: found.restricted_foods.clone(),
        guidelines: found.guidelines.clone(),
        supplements: found.supplements.clone(),
    })
}

/// Formats a ten digit number as `(XXX) XXX-XXXX`; anything else is returned
/// as its digits only.
pub fn format_phone_number(phone: &str) -> Option<String> {
    if phone.trim().is_empty() {
        return None;
    }
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == 10 {
        Some(format!("({}) {}-{}", &digits[..3], &digits[3..6], &digits[6..]))
    } else {
        Some(digits)
    }
}

/// Inserts `,` between groups of three digits.
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `$1,234.50` style amount. Negative amounts read `$-3.00`.
pub fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("${}{}.{:02}", sign, format_thousands(cents / 100), cents % 100)
}
