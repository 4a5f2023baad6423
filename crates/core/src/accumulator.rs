//! Symptom accumulation.
//!
//! [`SymptomAccumulator`] is the ordered, id-deduplicated set of symptoms gathered during a
//! session. It is fed by answered questions and by free-text keyword matching against a
//! [`SymptomVocabulary`].

use crate::symptom::Symptom;
use crate::TriageResult;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Ordered set of symptoms, unique by id, in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymptomAccumulator {
    symptoms: Vec<Symptom>,
}

impl SymptomAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `symptom` unless one with the same id is already present.
    ///
    /// Returns `true` if the symptom was inserted.
    pub fn add(&mut self, symptom: Symptom) -> bool {
        if self.contains(symptom.id()) {
            return false;
        }
        self.symptoms.push(symptom);
        true
    }

    /// Removes the symptom with this id, returning it if it was present.
    pub fn remove(&mut self, id: &str) -> Option<Symptom> {
        let position = self.symptoms.iter().position(|s| s.id() == id)?;
        Some(self.symptoms.remove(position))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.symptoms.iter().any(|s| s.id() == id)
    }

    pub fn to_list(&self) -> Vec<Symptom> {
        self.symptoms.clone()
    }

    pub fn as_slice(&self) -> &[Symptom] {
        &self.symptoms
    }

    pub fn len(&self) -> usize {
        self.symptoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symptoms.is_empty()
    }

    pub fn clear(&mut self) {
        self.symptoms.clear();
    }

    /// Adds every vocabulary symptom whose name occurs in `text`, ignoring case.
    ///
    /// Symptoms already present are skipped. Returns the symptoms that were added, in
    /// vocabulary order.
    pub fn ingest_text(&mut self, text: &str, vocabulary: &SymptomVocabulary) -> Vec<Symptom> {
        let haystack = text.to_lowercase();
        let mut added = Vec::new();

        for candidate in vocabulary.iter() {
            if !haystack.contains(&candidate.name().to_lowercase()) {
                continue;
            }
            if self.add(candidate.clone()) {
                added.push(candidate.clone());
            }
        }

        tracing::debug!(
            matched = added.len(),
            total = self.symptoms.len(),
            "ingested free-text symptoms"
        );
        added
    }
}

/// The symptoms free text is matched against.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SymptomVocabulary {
    entries: Vec<Symptom>,
}

impl SymptomVocabulary {
    /// Builds a vocabulary, keeping the first entry for each id.
    pub fn new(entries: Vec<Symptom>) -> Self {
        let mut seen = HashSet::new();
        let entries = entries
            .into_iter()
            .filter(|s| seen.insert(s.id().to_owned()))
            .collect();
        Self { entries }
    }

    /// The ten common symptoms used by the free-text checker.
    pub fn common() -> TriageResult<Self> {
        const COMMON: [(&str, &str); 10] = [
            ("s1", "Headache"),
            ("s2", "Fever"),
            ("s3", "Cough"),
            ("s4", "Fatigue"),
            ("s5", "Sore Throat"),
            ("s6", "Shortness of Breath"),
            ("s7", "Nausea"),
            ("s8", "Dizziness"),
            ("s9", "Chest Pain"),
            ("s10", "Rash"),
        ];

        let entries = COMMON
            .iter()
            .map(|(id, name)| Symptom::new(id, name))
            .collect::<TriageResult<Vec<_>>>()?;
        Ok(Self::new(entries))
    }

    pub fn get(&self, id: &str) -> Option<&Symptom> {
        self.entries.iter().find(|s| s.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symptom> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
