//! Scoring rules.
//!
//! The content the scorer works from: baseline conditions, keyword-triggered conditions,
//! follow-up question lists and recommended tests. [`ScoringRules::default`] is the built-in
//! rule set; a YAML file with the same shape can replace it at startup.
//!
//! ```yaml
//! baseline:
//!   - name: Common Cold
//!     description: ...
//!     urgency: low
//!     specialist_type: General Practitioner
//!     probability: { low: 0.75, high: 0.85 }
//! triggers:
//!   - tokens: [fever, pain]
//!     condition: { name: Influenza, ... }
//! base_follow_ups: [...]
//! follow_up_extensions:
//!   - { token: headache, questions: [...] }
//! session_follow_ups: [...]
//! recommended_tests: [...]
//! confidence: { base: 0.65, per_symptom: 0.05, per_path_step: 0.02, ceiling: 0.98 }
//! ```

use crate::constants::{
    CONFIDENCE_BASE, CONFIDENCE_CEILING, CONFIDENCE_PER_PATH_STEP, CONFIDENCE_PER_SYMPTOM,
};
use crate::scorer::Urgency;
use crate::{TriageError, TriageResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Inclusive probability range a condition's jittered probability is drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BandWire", into = "BandWire")]
pub struct ProbabilityBand {
    low: f64,
    high: f64,
}

impl ProbabilityBand {
    /// # Errors
    ///
    /// Returns [`TriageError::InvalidRules`] unless `0 <= low <= high <= 1`.
    pub fn new(low: f64, high: f64) -> TriageResult<Self> {
        let in_unit = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
        if !in_unit(low) || !in_unit(high) || low > high {
            return Err(TriageError::InvalidRules(format!(
                "probability band [{low}, {high}] must satisfy 0 <= low <= high <= 1"
            )));
        }
        Ok(Self { low, high })
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    /// Draws a probability from the band.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let jitter: f64 = rng.gen();
        self.low + jitter * (self.high - self.low)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct BandWire {
    low: f64,
    high: f64,
}

impl TryFrom<BandWire> for ProbabilityBand {
    type Error = TriageError;

    fn try_from(wire: BandWire) -> Result<Self, Self::Error> {
        ProbabilityBand::new(wire.low, wire.high)
    }
}

impl From<ProbabilityBand> for BandWire {
    fn from(band: ProbabilityBand) -> Self {
        BandWire {
            low: band.low,
            high: band.high,
        }
    }
}

/// A condition the scorer can propose, before its probability is drawn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConditionTemplate {
    pub name: String,
    pub description: String,
    pub urgency: Urgency,
    pub specialist_type: String,
    pub probability: ProbabilityBand,
}

/// Proposes `condition` when any symptom name contains any of `tokens`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TriggerRule {
    pub tokens: Vec<String>,
    pub condition: ConditionTemplate,
}

/// Extra follow-up questions asked when any symptom name contains `token`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FollowUpExtension {
    pub token: String,
    pub questions: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfidenceWeights {
    pub base: f64,
    pub per_symptom: f64,
    pub per_path_step: f64,
    pub ceiling: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            base: CONFIDENCE_BASE,
            per_symptom: CONFIDENCE_PER_SYMPTOM,
            per_path_step: CONFIDENCE_PER_PATH_STEP,
            ceiling: CONFIDENCE_CEILING,
        }
    }
}

/// Everything the scorer needs besides its inputs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoringRules {
    pub baseline: Vec<ConditionTemplate>,
    pub triggers: Vec<TriggerRule>,
    pub base_follow_ups: Vec<String>,
    #[serde(default)]
    pub follow_up_extensions: Vec<FollowUpExtension>,
    #[serde(default)]
    pub session_follow_ups: Vec<String>,
    pub recommended_tests: Vec<String>,
    #[serde(default)]
    pub confidence: ConfidenceWeights,
}

impl ScoringRules {
    /// Parses and validates rules from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::Translation`] when the YAML does not match the schema (with the
    /// failing path) and [`TriageError::InvalidRules`] when it parses but is unusable.
    pub fn parse_yaml(yaml_text: &str) -> TriageResult<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);

        let rules: ScoringRules = match serde_path_to_error::deserialize(deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() || path == "." {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(TriageError::Translation(format!(
                    "scoring rules schema mismatch at {path}: {source}"
                )));
            }
        };

        rules.validate()?;
        Ok(rules)
    }

    pub fn load(path: &Path) -> TriageResult<Self> {
        let text = std::fs::read_to_string(path).map_err(TriageError::FileRead)?;
        Self::parse_yaml(&text)
    }

    /// Checks the constraints serde cannot express.
    pub fn validate(&self) -> TriageResult<()> {
        if self.baseline.is_empty() {
            return Err(TriageError::InvalidRules(
                "at least one baseline condition is required".into(),
            ));
        }

        let templates = self
            .baseline
            .iter()
            .chain(self.triggers.iter().map(|t| &t.condition));
        for template in templates {
            if template.name.trim().is_empty() || template.specialist_type.trim().is_empty() {
                return Err(TriageError::InvalidRules(
                    "condition name and specialist type must not be blank".into(),
                ));
            }
        }

        for trigger in &self.triggers {
            if trigger.tokens.is_empty() || trigger.tokens.iter().any(|t| t.trim().is_empty()) {
                return Err(TriageError::InvalidRules(format!(
                    "trigger for '{}' needs at least one non-blank token",
                    trigger.condition.name
                )));
            }
        }

        if self
            .follow_up_extensions
            .iter()
            .any(|ext| ext.token.trim().is_empty())
        {
            return Err(TriageError::InvalidRules(
                "follow-up extension tokens must not be blank".into(),
            ));
        }

        let c = &self.confidence;
        let weights = [c.base, c.per_symptom, c.per_path_step, c.ceiling];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) || c.ceiling > 1.0 {
            return Err(TriageError::InvalidRules(
                "confidence weights must be non-negative and the ceiling at most 1".into(),
            ));
        }

        Ok(())
    }
}

impl Default for ScoringRules {
    fn default() -> Self {
        let band = |low: f64, high: f64| ProbabilityBand { low, high };
        let strings = |items: &[&str]| items.iter().map(|s| (*s).to_owned()).collect::<Vec<_>>();

        Self {
            baseline: vec![
                ConditionTemplate {
                    name: "Common Cold".into(),
                    description: "A viral infectious disease of the upper respiratory tract that primarily affects the nose.".into(),
                    urgency: Urgency::Low,
                    specialist_type: "General Practitioner".into(),
                    probability: band(0.75, 0.85),
                },
                ConditionTemplate {
                    name: "Seasonal Allergies".into(),
                    description: "An allergic reaction to pollen from trees, grasses, or weeds."
                        .into(),
                    urgency: Urgency::Low,
                    specialist_type: "Allergist".into(),
                    probability: band(0.65, 0.75),
                },
            ],
            triggers: vec![
                TriggerRule {
                    tokens: strings(&["fever", "pain"]),
                    condition: ConditionTemplate {
                        name: "Influenza".into(),
                        description: "A contagious respiratory illness caused by influenza viruses."
                            .into(),
                        urgency: Urgency::Medium,
                        specialist_type: "Infectious Disease Specialist".into(),
                        probability: band(0.55, 0.75),
                    },
                },
                TriggerRule {
                    tokens: strings(&["breath", "chest"]),
                    condition: ConditionTemplate {
                        name: "Pneumonia".into(),
                        description: "An infection that inflames the air sacs in one or both lungs."
                            .into(),
                        urgency: Urgency::High,
                        specialist_type: "Pulmonologist".into(),
                        probability: band(0.35, 0.55),
                    },
                },
            ],
            base_follow_ups: strings(&[
                "How long have you been experiencing these symptoms?",
                "Have you taken any medications to alleviate these symptoms?",
                "Do symptoms worsen at any particular time of day?",
                "Have you been in contact with anyone who has similar symptoms?",
            ]),
            follow_up_extensions: vec![
                FollowUpExtension {
                    token: "headache".into(),
                    questions: strings(&[
                        "Is your headache localized to a specific area?",
                        "Does light or sound make your headache worse?",
                    ]),
                },
                FollowUpExtension {
                    token: "cough".into(),
                    questions: strings(&[
                        "Is your cough productive (producing phlegm)?",
                        "What color is the phlegm if any?",
                    ]),
                },
                FollowUpExtension {
                    token: "fever".into(),
                    questions: strings(&[
                        "What is your temperature reading?",
                        "Does the fever come and go, or is it persistent?",
                    ]),
                },
            ],
            session_follow_ups: strings(&[
                "Does your pain radiate to other areas?",
                "Do your symptoms worsen with specific activities?",
                "Have you been exposed to anyone with similar symptoms?",
            ]),
            recommended_tests: strings(&["Complete Blood Count", "Chest X-Ray", "Urinalysis"]),
            confidence: ConfidenceWeights::default(),
        }
    }
}
