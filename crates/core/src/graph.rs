//! The question graph.
//!
//! A static, validated, directed graph of intake questions. Each node carries an ordered list of
//! answer options; an option may link a symptom, carry a weight and name an explicit successor.
//! Options without a successor advance to the next node in declaration order.
//!
//! Graphs are validated once, at construction. A graph that exists is a graph whose every edge
//! resolves, so traversal never discovers a broken link.
//!
//! ## YAML format
//!
//! ```yaml
//! nodes:
//!   - id: q1
//!     prompt: What is your primary concern today?
//!     kind: multiple-choice
//!     model_tag: symptom-graph-nn      # optional
//!     context: Why this question.      # optional
//!     options:
//!       - id: q1_pain
//!         text: Pain or discomfort
//!         value: pain
//!         next: q2                      # optional explicit successor
//!       - id: q1_fever
//!         text: Fever
//!         value: fever
//!         weight: 0.85                  # optional, 0..=1
//!         symptom: { id: s2, name: Fever, severity: 6 }   # optional
//! ```

use crate::accumulator::SymptomVocabulary;
use crate::constants::{DEFAULT_QUESTION_CATALOG, NEGATIVE_ANSWER_VALUES};
use crate::symptom::Symptom;
use crate::{TriageError, TriageResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use triage_types::{NonEmptyText, Weight};

// ============================================================================
// Public domain-level types
// ============================================================================

/// How a question is presented; the engine treats every kind the same way.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    MultipleChoice,
    Boolean,
    Scale,
    Branching,
}

impl QuestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice => "multiple-choice",
            QuestionKind::Boolean => "boolean",
            QuestionKind::Scale => "scale",
            QuestionKind::Branching => "branching",
        }
    }
}

/// One answer option of a question.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOption {
    id: NonEmptyText,
    display_text: NonEmptyText,
    value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    linked_symptom: Option<Symptom>,
    #[serde(skip_serializing_if = "Option::is_none")]
    weight: Option<Weight>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_question_id: Option<NonEmptyText>,
}

impl QuestionOption {
    pub fn new(
        id: impl AsRef<str>,
        display_text: impl AsRef<str>,
        value: impl Into<String>,
    ) -> TriageResult<Self> {
        Ok(Self {
            id: NonEmptyText::new(id)?,
            display_text: NonEmptyText::new(display_text)?,
            value: value.into(),
            linked_symptom: None,
            weight: None,
            next_question_id: None,
        })
    }

    pub fn with_symptom(self, symptom: Symptom) -> Self {
        Self {
            linked_symptom: Some(symptom),
            ..self
        }
    }

    pub fn with_weight(self, weight: f64) -> TriageResult<Self> {
        Ok(Self {
            weight: Some(Weight::new(weight)?),
            ..self
        })
    }

    pub fn with_next(self, next_question_id: impl AsRef<str>) -> TriageResult<Self> {
        Ok(Self {
            next_question_id: Some(NonEmptyText::new(next_question_id)?),
            ..self
        })
    }

    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    pub fn display_text(&self) -> &str {
        self.display_text.as_str()
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn linked_symptom(&self) -> Option<&Symptom> {
        self.linked_symptom.as_ref()
    }

    pub fn weight(&self) -> Option<Weight> {
        self.weight
    }

    pub fn next_question_id(&self) -> Option<&str> {
        self.next_question_id.as_ref().map(NonEmptyText::as_str)
    }

    /// True when the raw value is exactly `no` or `none`. Matching is case-sensitive.
    pub fn is_negative(&self) -> bool {
        NEGATIVE_ANSWER_VALUES.contains(&self.value())
    }

    /// The symptom this answer reports, if any. Negative answers report nothing even when a
    /// symptom is linked.
    pub fn reported_symptom(&self) -> Option<&Symptom> {
        if self.is_negative() {
            return None;
        }
        self.linked_symptom.as_ref()
    }
}

/// A question in the graph.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionNode {
    id: NonEmptyText,
    prompt: NonEmptyText,
    kind: QuestionKind,
    options: Vec<QuestionOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<String>,
}

impl QuestionNode {
    pub fn new(
        id: impl AsRef<str>,
        prompt: impl AsRef<str>,
        kind: QuestionKind,
        options: Vec<QuestionOption>,
    ) -> TriageResult<Self> {
        Ok(Self {
            id: NonEmptyText::new(id)?,
            prompt: NonEmptyText::new(prompt)?,
            kind,
            options,
            model_tag: None,
            context: None,
        })
    }

    pub fn with_model_tag(self, model_tag: impl Into<String>) -> Self {
        Self {
            model_tag: Some(model_tag.into()),
            ..self
        }
    }

    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self {
            context: Some(context.into()),
            ..self
        }
    }

    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    pub fn prompt(&self) -> &str {
        self.prompt.as_str()
    }

    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    pub fn options(&self) -> &[QuestionOption] {
        &self.options
    }

    pub fn option(&self, option_id: &str) -> Option<&QuestionOption> {
        self.options.iter().find(|o| o.id() == option_id)
    }

    pub fn model_tag(&self) -> Option<&str> {
        self.model_tag.as_deref()
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }
}

/// A validated question graph.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuestionGraph {
    nodes: Vec<QuestionNode>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl QuestionGraph {
    /// Builds a graph from nodes in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::GraphIntegrity`] if:
    /// - there are no nodes,
    /// - two nodes share an id,
    /// - a node has no options or two options share an id,
    /// - an option names a successor that is not a node of this graph.
    pub fn new(nodes: Vec<QuestionNode>) -> TriageResult<Self> {
        if nodes.is_empty() {
            return Err(TriageError::GraphIntegrity(
                "graph must contain at least one question".into(),
            ));
        }

        let mut index = HashMap::with_capacity(nodes.len());
        for (position, node) in nodes.iter().enumerate() {
            if index.insert(node.id().to_owned(), position).is_some() {
                return Err(TriageError::GraphIntegrity(format!(
                    "duplicate question id '{}'",
                    node.id()
                )));
            }
        }

        for node in &nodes {
            if node.options.is_empty() {
                return Err(TriageError::GraphIntegrity(format!(
                    "question '{}' has no options",
                    node.id()
                )));
            }

            let mut seen = HashSet::with_capacity(node.options.len());
            for option in &node.options {
                if !seen.insert(option.id()) {
                    return Err(TriageError::GraphIntegrity(format!(
                        "question '{}' has duplicate option id '{}'",
                        node.id(),
                        option.id()
                    )));
                }

                if let Some(next) = option.next_question_id() {
                    if !index.contains_key(next) {
                        return Err(TriageError::GraphIntegrity(format!(
                            "option '{}' of question '{}' points to unknown question '{}'",
                            option.id(),
                            node.id(),
                            next
                        )));
                    }
                }
            }
        }

        Ok(Self { nodes, index })
    }

    /// Parses and validates a graph from YAML text.
    ///
    /// This uses `serde_path_to_error` to surface the path (e.g. `nodes[1].options[0].weight`)
    /// of the failing field when the YAML does not match the schema.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::Translation`] for schema mismatches (unknown keys, wrong types,
    /// out-of-range weights or severities) and [`TriageError::GraphIntegrity`] for structural
    /// problems.
    pub fn parse_yaml(yaml_text: &str) -> TriageResult<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);

        let wire = match serde_path_to_error::deserialize::<_, GraphWire>(deserializer) {
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
                    "question graph schema mismatch at {path}: {source}"
                )));
            }
        };

        wire_to_domain(wire)
    }

    /// Reads and validates a graph from a YAML file.
    pub fn load(path: &Path) -> TriageResult<Self> {
        let text = std::fs::read_to_string(path).map_err(TriageError::FileRead)?;
        Self::parse_yaml(&text)
    }

    /// The built-in eight-question intake.
    pub fn default_catalog() -> TriageResult<Self> {
        Self::parse_yaml(DEFAULT_QUESTION_CATALOG)
    }

    /// # Errors
    ///
    /// Returns [`TriageError::QuestionNotFound`] if no node has this id.
    pub fn node_by_id(&self, id: &str) -> TriageResult<&QuestionNode> {
        self.index
            .get(id)
            .map(|&position| &self.nodes[position])
            .ok_or_else(|| TriageError::QuestionNotFound(id.to_owned()))
    }

    pub fn first_node(&self) -> &QuestionNode {
        // Construction rejects empty graphs.
        &self.nodes[0]
    }

    /// Declaration-order position of a node.
    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// The node declared immediately after `id`, if any.
    pub fn node_after(&self, id: &str) -> Option<&QuestionNode> {
        self.node_index(id)
            .and_then(|position| self.nodes.get(position + 1))
    }

    pub fn nodes(&self) -> &[QuestionNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false for a constructed graph; provided for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every symptom linked by any option, in declaration order, first occurrence per id.
    pub fn symptom_vocabulary(&self) -> SymptomVocabulary {
        SymptomVocabulary::new(
            self.nodes
                .iter()
                .flat_map(|node| node.options.iter())
                .filter_map(|option| option.linked_symptom.clone())
                .collect(),
        )
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GraphWire {
    nodes: Vec<NodeWire>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NodeWire {
    id: NonEmptyText,
    prompt: NonEmptyText,
    kind: QuestionKind,
    options: Vec<OptionWire>,
    #[serde(default)]
    model_tag: Option<String>,
    #[serde(default)]
    context: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OptionWire {
    id: NonEmptyText,
    text: NonEmptyText,
    value: String,
    #[serde(default)]
    symptom: Option<Symptom>,
    #[serde(default)]
    weight: Option<Weight>,
    #[serde(default)]
    next: Option<NonEmptyText>,
}

fn wire_to_domain(wire: GraphWire) -> TriageResult<QuestionGraph> {
    let nodes = wire
        .nodes
        .into_iter()
        .map(|node| QuestionNode {
            id: node.id,
            prompt: node.prompt,
            kind: node.kind,
            options: node
                .options
                .into_iter()
                .map(|option| QuestionOption {
                    id: option.id,
                    display_text: option.text,
                    value: option.value,
                    linked_symptom: option.symptom,
                    weight: option.weight,
                    next_question_id: option.next,
                })
                .collect(),
            model_tag: node.model_tag,
            context: node.context,
        })
        .collect();

    QuestionGraph::new(nodes)
}
