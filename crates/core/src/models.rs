//! Analysis models.
//!
//! A session selects one or more named models; after scoring, each selected model reports a
//! confidence and the conditions it agrees with. The breakdown is derived from the scorer's
//! result and a seed, so it is reproducible like the result itself.

use crate::constants::{DEFAULT_SELECTED_MODELS, UNKNOWN_MODEL_CONFIDENCE};
use crate::scorer::DiagnosisResult;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    Transformer,
    Llm,
    Bert,
    DecisionTree,
    GraphNn,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisModel {
    pub id: String,
    pub name: String,
    pub accuracy: f64,
    pub kind: ModelKind,
    pub specialization: String,
}

/// One model's view of a diagnosis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelContribution {
    pub model_id: String,
    pub confidence: f64,
    pub conditions: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisDetails {
    pub model_contributions: Vec<ModelContribution>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ModelCatalog {
    models: Vec<AnalysisModel>,
}

impl ModelCatalog {
    pub fn new(models: Vec<AnalysisModel>) -> Self {
        Self { models }
    }

    /// The six built-in models.
    pub fn standard() -> Self {
        let model = |id: &str, name: &str, accuracy: f64, kind: ModelKind, specialization: &str| {
            AnalysisModel {
                id: id.into(),
                name: name.into(),
                accuracy,
                kind,
                specialization: specialization.into(),
            }
        };

        Self::new(vec![
            model(
                "transformer-med-v1",
                "Medical Transformer",
                0.92,
                ModelKind::Transformer,
                "General medical diagnosis",
            ),
            model(
                "gpt-med-v2",
                "GPT Medical",
                0.89,
                ModelKind::Llm,
                "Rare diseases and complex presentations",
            ),
            model(
                "bert-symptoms-v1",
                "BERT Symptom Analyzer",
                0.87,
                ModelKind::Bert,
                "Symptom pattern recognition",
            ),
            model(
                "med-decision-tree-v1",
                "Medical Decision Tree",
                0.85,
                ModelKind::DecisionTree,
                "Clear clinical pathways",
            ),
            model(
                "biobert-v2",
                "BioBERT Clinical",
                0.91,
                ModelKind::Bert,
                "Biomedical domain expertise",
            ),
            model(
                "symptom-graph-nn",
                "Symptom Graph Neural Network",
                0.88,
                ModelKind::GraphNn,
                "Symptom relationships and clusters",
            ),
        ])
    }

    pub fn models(&self) -> &[AnalysisModel] {
        &self.models
    }

    pub fn get(&self, id: &str) -> Option<&AnalysisModel> {
        self.models.iter().find(|m| m.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Models selected when a session starts.
    pub fn default_selection() -> Vec<String> {
        DEFAULT_SELECTED_MODELS
            .iter()
            .map(|id| (*id).to_owned())
            .collect()
    }

    /// Per-model breakdown of `result` for the `selected` models, in selection order.
    ///
    /// A known model reports `accuracy * 0.9 + jitter * 0.1`; an unknown id reports a fixed
    /// 0.8. Each model agrees with the top one to three ranked conditions.
    pub fn analyse(
        &self,
        selected: &[String],
        result: &DiagnosisResult,
        seed: u64,
    ) -> AnalysisDetails {
        let mut rng = StdRng::seed_from_u64(seed);
        let ranked = result.conditions();

        let model_contributions = selected
            .iter()
            .map(|model_id| {
                let jitter: f64 = rng.gen();
                let confidence = match self.get(model_id) {
                    Some(model) => model.accuracy * 0.9 + jitter * 0.1,
                    None => UNKNOWN_MODEL_CONFIDENCE,
                };
                let take = rng.gen_range(1..=3).min(ranked.len());

                ModelContribution {
                    model_id: model_id.clone(),
                    confidence,
                    conditions: ranked[..take].iter().map(|c| c.name.clone()).collect(),
                }
            })
            .collect();

        AnalysisDetails {
            model_contributions,
        }
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
