// models/src/knowledge_base.rs

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::{ModelResult, ValidationError};

/// Typical price band of a procedure, in whole dollars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostRange {
    pub min: u32,
    pub max: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurgeryType {
    pub id: String,
    pub name: String,
    pub description: String,
    pub cost_range: CostRange,
    pub requirements: Vec<String>,
    pub risks: Vec<String>,
    #[serde(default)]
    pub recovery_time: Option<String>,
    #[serde(default)]
    pub preop_instructions: Vec<String>,
    #[serde(default)]
    pub postop_instructions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DietPhase {
    pub id: String,
    pub duration: String,
    pub allowed_foods: Vec<String>,
    pub restricted_foods: Vec<String>,
    /// Surgery type id this phase belongs to, if it is procedure specific.
    #[serde(default)]
    pub surgery_type: Option<String>,
    #[serde(default)]
    pub guidelines: Vec<String>,
    #[serde(default)]
    pub supplements: Vec<String>,
}

/// Derives a storage key from a display name: lower-case ASCII
/// alphanumerics with runs of anything else collapsed to `_`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}

fn validate_key(key: &str) -> ModelResult<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidKey(key.to_string()))
    }
}

impl SurgeryType {
    pub fn validate(&self) -> ModelResult<()> {
        validate_key(&self.id)?;
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyField("name"));
        }
        if self.cost_range.min > self.cost_range.max {
            return Err(ValidationError::InvertedCostRange {
                key: self.id.clone(),
                min: self.cost_range.min,
                max: self.cost_range.max,
            });
        }
        Ok(())
    }
}

impl DietPhase {
    pub fn validate(&self) -> ModelResult<()> {
        validate_key(&self.id)
    }
}

/// Static clinical content the chat assistant answers from. Immutable once
/// built; iteration follows insertion order, which fixes the order of
/// sections in rendered answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    surgery_types: Vec<SurgeryType>,
    diet_phases: Vec<DietPhase>,
}

impl KnowledgeBase {
    /// Builds a knowledge base, rejecting duplicate keys and malformed records.
    pub fn new(surgery_types: Vec<SurgeryType>, diet_phases: Vec<DietPhase>) -> ModelResult<Self> {
        let mut seen = HashSet::new();
        for surgery in &surgery_types {
            surgery.validate()?;
            if !seen.insert(surgery.id.as_str()) {
                return Err(ValidationError::DuplicateKey(surgery.id.clone()));
            }
        }

        let mut seen = HashSet::new();
        for phase in &diet_phases {
            phase.validate()?;
            if !seen.insert(phase.id.as_str()) {
                return Err(ValidationError::DuplicateKey(phase.id.clone()));
            }
        }

        Ok(KnowledgeBase { surgery_types, diet_phases })
    }

    pub fn surgery_types(&self) -> &[SurgeryType] {
        &self.surgery_types
    }

    pub fn diet_phases(&self) -> &[DietPhase] {
        &self.diet_phases
    }

    pub fn surgery_type(&self, id: &str) -> Option<&SurgeryType> {
        self.surgery_types.iter().find(|s| s.id == id)
    }

    pub fn diet_phase(&self, id: &str) -> Option<&DietPhase> {
        self.diet_phases.iter().find(|p| p.id == id)
    }

    /// The diet phase `phase` for a known surgery type. A phase imported for
    /// that procedure wins over a general phase of the same name.
    pub fn diet_plan(&self, surgery_type: &str, phase: &str) -> Option<&DietPhase> {
        let surgery = self.surgery_type(surgery_type)?;
        let phase = slugify(phase);
        let specific = format!("{}_{}", surgery.id, phase);
        self.diet_phases
            .iter()
            .find(|p| p.id == specific && p.surgery_type.as_deref() == Some(surgery.id.as_str()))
            .or_else(|| self.diet_phase(&phase).filter(|p| p.surgery_type.is_none()))
    }

    pub fn is_empty(&self) -> bool {
        self.surgery_types.is_empty() && self.diet_phases.is_empty()
    }

    /// The clinic's built-in content, used when nothing has been imported.
    pub fn seeded() -> Self {
        let surgery_types = vec![
            SurgeryType {
                id: "gastric_bypass".into(),
                name: "Gastric Bypass Surgery".into(),
                description: "A surgical procedure that creates a small pouch from the stomach and connects it directly to the small intestine.".into(),
                cost_range: CostRange { min: 20_000, max: 25_000 },
                requirements: strings(&[
                    "BMI ≥ 40, or BMI ≥ 35 with obesity-related conditions",
                    "Age 18-65",
                    "Previous failed weight loss attempts",
                    "Psychological evaluation",
                    "Medical clearance",
                ]),
                risks: strings(&[
                    "Infection",
                    "Blood clots",
                    "Leaking at surgical connections",
                    "Malnutrition",
                    "Dumping syndrome",
                ]),
                recovery_time: None,
                preop_instructions: Vec::new(),
                postop_instructions: Vec::new(),
            },
            SurgeryType {
                id: "sleeve_gastrectomy".into(),
                name: "Sleeve Gastrectomy".into(),
                description: "A surgical weight-loss procedure that removes about 80% of the stomach.".into(),
                cost_range: CostRange { min: 15_000, max: 20_000 },
                requirements: strings(&[
                    "BMI ≥ 40, or BMI ≥ 35 with obesity-related conditions",
                    "Age 18-65",
                    "Commitment to lifestyle changes",
                    "Psychological evaluation",
                    "Medical clearance",
                ]),
                risks: strings(&[
                    "Infection",
                    "Bleeding",
                    "Blood clots",
                    "Leaking from the cut edge of the stomach",
                    "Acid reflux",
                ]),
                recovery_time: None,
                preop_instructions: Vec::new(),
                postop_instructions: Vec::new(),
            },
        ];

        let diet_phases = vec![
            phase(
                "pre_op",
                "2 weeks before surgery",
                &["Clear liquids", "Sugar-free beverages", "Protein shakes", "Broth"],
                &["Solid foods", "Sugary drinks", "Alcoholic beverages", "Caffeine"],
            ),
            phase(
                "post_op_phase1",
                "1-2 weeks after surgery",
                &["Clear liquids", "Water", "Sugar-free beverages", "Broth"],
                &["All solid foods", "Sugary drinks", "Carbonated beverages"],
            ),
            phase(
                "post_op_phase2",
                "2-4 weeks after surgery",
                &["Protein shakes", "Smooth pureed foods", "Sugar-free yogurt", "Cream soups"],
                &["Solid foods", "Raw vegetables", "Bread", "Rice"],
            ),
        ];

        KnowledgeBase { surgery_types, diet_phases }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn phase(id: &str, duration: &str, allowed: &[&str], restricted: &[&str]) -> DietPhase {
    DietPhase {
        id: id.to_string(),
        duration: duration.to_string(),
        allowed_foods: strings(allowed),
        restricted_foods: strings(restricted),
        surgery_type: None,
        guidelines: Vec::new(),
        supplements: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_base_keeps_insertion_order() {
        let kb = KnowledgeBase::seeded();
        let ids: Vec<_> = kb.surgery_types().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["gastric_bypass", "sleeve_gastrectomy"]);
        let phases: Vec<_> = kb.diet_phases().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(phases, vec!["pre_op", "post_op_phase1", "post_op_phase2"]);
    }

    #[test]
    fn diet_plan_prefers_procedure_specific_phase() {
        let mut phases = KnowledgeBase::seeded().diet_phases().to_vec();
        let mut specific = phases[0].clone();
        specific.id = "sleeve_gastrectomy_pre_op".into();
        specific.surgery_type = Some("sleeve_gastrectomy".into());
        specific.supplements = vec!["Multivitamin".into()];
        phases.push(specific);
        let kb = KnowledgeBase::new(KnowledgeBase::seeded().surgery_types().to_vec(), phases).unwrap();

        let sleeve = kb.diet_plan("sleeve_gastrectomy", "Pre Op").unwrap();
        assert_eq!(sleeve.supplements, vec!["Multivitamin"]);
        let bypass = kb.diet_plan("gastric_bypass", "pre_op").unwrap();
        assert_eq!(bypass.id, "pre_op");
        assert!(kb.diet_plan("gastric_bypass", "post_op_phase9").is_none());
        assert!(kb.diet_plan("lap_band", "pre_op").is_none());
    }

    #[test]
    fn seeded_base_passes_validation() {
        let kb = KnowledgeBase::seeded();
        let rebuilt = KnowledgeBase::new(kb.surgery_types().to_vec(), kb.diet_phases().to_vec());
        assert_eq!(rebuilt, Ok(kb));
    }

    #[test]
    fn should_reject_duplicate_surgery_keys() {
        let kb = KnowledgeBase::seeded();
        let mut surgeries = kb.surgery_types().to_vec();
        surgeries.push(surgeries[0].clone());
        assert_eq!(
            KnowledgeBase::new(surgeries, Vec::new()),
            Err(ValidationError::DuplicateKey("gastric_bypass".into()))
        );
    }

    #[test]
    fn should_reject_inverted_cost_range() {
        let mut surgery = KnowledgeBase::seeded().surgery_types()[1].clone();
        surgery.cost_range = CostRange { min: 30_000, max: 10_000 };
        assert!(matches!(
            KnowledgeBase::new(vec![surgery], Vec::new()),
            Err(ValidationError::InvertedCostRange { min: 30_000, max: 10_000, .. })
        ));
    }

    #[test]
    fn should_slugify_display_names() {
        assert_eq!(slugify("Gastric Bypass Surgery"), "gastric_bypass_surgery");
        assert_eq!(slugify("  Lap-Band (adjustable) "), "lap_band_adjustable");
    }
}
