//! Diagnosis scoring.
//!
//! A pure function from an accumulated symptom set and path metadata to a ranked list of
//! candidate conditions. All jitter comes from a generator seeded by the caller, so the same
//! inputs and seed always give the same result.

use crate::rules::{ConfidenceWeights, ScoringRules};
use crate::symptom::Symptom;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Emergency,
}

/// A candidate explanation for the reported symptoms.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub name: String,
    pub probability: f64,
    pub description: String,
    pub urgency: Urgency,
    pub specialist_type: String,
}

/// Scorer output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisResult {
    conditions: Vec<Condition>,
    confidence_score: f64,
    follow_up_questions: Vec<String>,
    recommended_tests: Vec<String>,
    suggested_specialists: Vec<String>,
}

impl DiagnosisResult {
    /// Conditions, most probable first.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn confidence_score(&self) -> f64 {
        self.confidence_score
    }

    pub fn follow_up_questions(&self) -> &[String] {
        &self.follow_up_questions
    }

    pub fn recommended_tests(&self) -> &[String] {
        &self.recommended_tests
    }

    /// Specialist types of the ranked conditions, without duplicates, first-seen order.
    pub fn suggested_specialists(&self) -> &[String] {
        &self.suggested_specialists
    }

    /// Appends the questionnaire's own follow-ups. Nothing is added to a result without
    /// conditions.
    pub(crate) fn with_session_follow_ups(mut self, questions: &[String]) -> Self {
        if !self.conditions.is_empty() {
            self.follow_up_questions.extend(questions.iter().cloned());
        }
        self
    }
}

static DEFAULT_RULES: OnceLock<ScoringRules> = OnceLock::new();

fn default_rules() -> &'static ScoringRules {
    DEFAULT_RULES.get_or_init(ScoringRules::default)
}

/// Confidence for a symptom set and path length under the built-in weights.
///
/// `min(0.98, 0.65 + 0.05·|S| + 0.02·p + mean(severity)/10)`, with absent severities counted
/// as 5 and the severity term 0 for an empty set.
pub fn confidence(symptoms: &[Symptom], path_length: usize) -> f64 {
    confidence_with(&default_rules().confidence, symptoms, path_length)
}

pub fn confidence_with(
    weights: &ConfidenceWeights,
    symptoms: &[Symptom],
    path_length: usize,
) -> f64 {
    let count = symptoms.len() as f64;
    let severity_term = if symptoms.is_empty() {
        0.0
    } else {
        let total: f64 = symptoms
            .iter()
            .map(|s| f64::from(s.effective_severity().value()))
            .sum();
        total / (count * 10.0)
    };

    let raw = weights.base
        + weights.per_symptom * count
        + weights.per_path_step * path_length as f64
        + severity_term;
    raw.min(weights.ceiling)
}

/// Scores `symptoms` with the built-in rules.
pub fn score(symptoms: &[Symptom], path_length: usize, seed: u64) -> DiagnosisResult {
    score_with(default_rules(), symptoms, path_length, seed)
}

/// Scores `symptoms` with `rules`.
///
/// Never fails: an empty symptom set still yields the baseline conditions.
pub fn score_with(
    rules: &ScoringRules,
    symptoms: &[Symptom],
    path_length: usize,
    seed: u64,
) -> DiagnosisResult {
    let mut rng = StdRng::seed_from_u64(seed);
    let mentions = |token: &str| symptoms.iter().any(|s| s.name_contains(token));

    let mut conditions: Vec<Condition> = rules
        .baseline
        .iter()
        .chain(
            rules
                .triggers
                .iter()
                .filter(|rule| rule.tokens.iter().any(|t| mentions(t)))
                .map(|rule| &rule.condition),
        )
        .map(|template| Condition {
            name: template.name.clone(),
            probability: template.probability.sample(&mut rng),
            description: template.description.clone(),
            urgency: template.urgency,
            specialist_type: template.specialist_type.clone(),
        })
        .collect();

    // Stable: equal probabilities keep rule order.
    conditions.sort_by(|a, b| b.probability.total_cmp(&a.probability));

    let mut follow_up_questions = rules.base_follow_ups.clone();
    let mut emitted = vec![false; rules.follow_up_extensions.len()];
    for symptom in symptoms {
        for (i, extension) in rules.follow_up_extensions.iter().enumerate() {
            if !emitted[i] && symptom.name_contains(&extension.token) {
                emitted[i] = true;
                follow_up_questions.extend(extension.questions.iter().cloned());
            }
        }
    }

    let mut seen = HashSet::new();
    let suggested_specialists = conditions
        .iter()
        .filter(|c| seen.insert(c.specialist_type.as_str()))
        .map(|c| c.specialist_type.clone())
        .collect();

    let result = DiagnosisResult {
        confidence_score: confidence_with(&rules.confidence, symptoms, path_length),
        conditions,
        follow_up_questions,
        recommended_tests: rules.recommended_tests.clone(),
        suggested_specialists,
    };

    tracing::debug!(
        symptoms = symptoms.len(),
        path_length,
        conditions = result.conditions.len(),
        confidence = result.confidence_score,
        "scored symptom set"
    );
    result
}
