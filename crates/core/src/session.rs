//! The quiz session state machine.
//!
//! A [`QuizSession`] walks a [`QuestionGraph`], recording the path of answers and the symptoms
//! they report. It is either in progress on some question or completed with a
//! [`DiagnosisResult`].
//!
//! Every operation validates before it mutates: a rejected call leaves the path, the
//! accumulated symptoms and the state exactly as they were.
//!
//! ## Background analysis
//!
//! Callers that score off the calling thread use the ticket protocol instead of
//! [`QuizSession::run_analysis`]:
//!
//! 1. [`QuizSession::begin_analysis`] snapshots the inputs into an [`AnalysisTicket`] and marks
//!    the session in flight for as long as the ticket, or the outcome it produces, is alive.
//!    While in flight, `answer`, `back`, symptom edits and further analyses are refused with
//!    [`TriageError::AnalysisInFlight`].
//! 2. [`AnalysisTicket::run`] scores the snapshot. It borrows nothing from the session.
//! 3. [`QuizSession::complete_analysis`] applies the outcome, unless the session was restarted
//!    in the meantime, in which case the outcome is discarded with
//!    [`TriageError::StaleAnalysis`].
//!
//! Dropping the ticket or the outcome without completing it ends the analysis: the session
//! becomes idle again with its path and symptoms intact.

use crate::accumulator::{SymptomAccumulator, SymptomVocabulary};
use crate::graph::{QuestionGraph, QuestionNode};
use crate::models::{AnalysisDetails, ModelCatalog};
use crate::rules::ScoringRules;
use crate::scorer::{score_with, DiagnosisResult};
use crate::symptom::Symptom;
use crate::{TriageError, TriageResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Weak};

/// One answered question.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathEntry {
    question_id: String,
    option_id: String,
    /// Id of the symptom this answer newly added, if any.
    #[serde(skip)]
    added_symptom: Option<String>,
}

impl PathEntry {
    pub fn question_id(&self) -> &str {
        &self.question_id
    }

    pub fn option_id(&self) -> &str {
        &self.option_id
    }
}

impl fmt::Display for PathEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.question_id, self.option_id)
    }
}

/// The answers given so far, oldest first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuizPath {
    entries: Vec<PathEntry>,
}

impl QuizPath {
    pub fn entries(&self) -> &[PathEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&PathEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, entry: PathEntry) {
        self.entries.push(entry);
    }

    fn pop(&mut self) -> Option<PathEntry> {
        self.entries.pop()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    /// Stops crediting any answer with having added `symptom_id`.
    fn forget_symptom(&mut self, symptom_id: &str) {
        for entry in &mut self.entries {
            if entry.added_symptom.as_deref() == Some(symptom_id) {
                entry.added_symptom = None;
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SessionState {
    #[serde(rename_all = "camelCase")]
    InProgress { current_question_id: String },
    Completed { result: Box<DiagnosisResult> },
}

impl SessionState {
    fn at(question_id: &str) -> Self {
        SessionState::InProgress {
            current_question_id: question_id.to_owned(),
        }
    }
}

/// What `back()` does with the symptom reported by the answer it undoes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackPolicy {
    /// The symptom stays in the accumulated set.
    #[default]
    KeepSymptoms,
    /// The symptom is removed, but only if that answer was the one that added it.
    RetractSymptom,
}

impl FromStr for BackPolicy {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" => Ok(BackPolicy::KeepSymptoms),
            "retract" => Ok(BackPolicy::RetractSymptom),
            other => Err(TriageError::InvalidInput(format!(
                "unknown back policy '{other}' (expected 'keep' or 'retract')"
            ))),
        }
    }
}

/// Inputs for one scoring run, detached from the session.
#[derive(Clone, Debug)]
pub struct AnalysisTicket {
    lease: Arc<()>,
    generation: u64,
    symptoms: Vec<Symptom>,
    path_length: usize,
    seed: u64,
    selected_models: Vec<String>,
    rules: Arc<ScoringRules>,
    models: Arc<ModelCatalog>,
}

impl AnalysisTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn run(&self) -> AnalysisOutcome {
        let (result, details) = analyse(
            &self.rules,
            &self.models,
            &self.symptoms,
            self.path_length,
            &self.selected_models,
            self.seed,
        );
        AnalysisOutcome {
            lease: Arc::clone(&self.lease),
            generation: self.generation,
            result,
            details,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisOutcome {
    lease: Arc<()>,
    generation: u64,
    result: DiagnosisResult,
    details: AnalysisDetails,
}

fn analyse(
    rules: &ScoringRules,
    models: &ModelCatalog,
    symptoms: &[Symptom],
    path_length: usize,
    selected_models: &[String],
    seed: u64,
) -> (DiagnosisResult, AnalysisDetails) {
    let result = score_with(rules, symptoms, path_length, seed)
        .with_session_follow_ups(&rules.session_follow_ups);
    let details = models.analyse(selected_models, &result, seed.wrapping_add(1));
    (result, details)
}

/// One run of the intake questionnaire.
#[derive(Clone, Debug)]
pub struct QuizSession {
    graph: Arc<QuestionGraph>,
    rules: Arc<ScoringRules>,
    models: Arc<ModelCatalog>,
    vocabulary: Arc<SymptomVocabulary>,
    back_policy: BackPolicy,
    seed: u64,

    state: SessionState,
    path: QuizPath,
    symptoms: SymptomAccumulator,
    selected_models: Vec<String>,
    analysis_details: Option<AnalysisDetails>,
    generation: u64,
    /// Held strongly by the outstanding ticket and its outcome.
    in_flight: Option<Weak<()>>,
}

impl QuizSession {
    /// Starts on the first question of `graph` with the built-in rules and models, a random
    /// seed and the graph's own symptoms as free-text vocabulary.
    pub fn new(graph: Arc<QuestionGraph>) -> Self {
        let vocabulary = Arc::new(graph.symptom_vocabulary());
        let state = SessionState::at(graph.first_node().id());
        Self {
            graph,
            rules: Arc::new(ScoringRules::default()),
            models: Arc::new(ModelCatalog::standard()),
            vocabulary,
            back_policy: BackPolicy::default(),
            seed: rand::random(),
            state,
            path: QuizPath::default(),
            symptoms: SymptomAccumulator::new(),
            selected_models: ModelCatalog::default_selection(),
            analysis_details: None,
            generation: 0,
            in_flight: None,
        }
    }

    pub fn with_rules(self, rules: Arc<ScoringRules>) -> Self {
        Self { rules, ..self }
    }

    pub fn with_models(self, models: Arc<ModelCatalog>) -> Self {
        Self { models, ..self }
    }

    pub fn with_vocabulary(self, vocabulary: Arc<SymptomVocabulary>) -> Self {
        Self { vocabulary, ..self }
    }

    pub fn with_back_policy(self, back_policy: BackPolicy) -> Self {
        Self {
            back_policy,
            ..self
        }
    }

    /// Fixes the jitter seed, making every analysis of this session reproducible.
    pub fn with_seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The question awaiting an answer; `None` once completed.
    pub fn current_question(&self) -> Option<&QuestionNode> {
        match &self.state {
            SessionState::InProgress {
                current_question_id,
            } => self.graph.node_by_id(current_question_id).ok(),
            SessionState::Completed { .. } => None,
        }
    }

    pub fn path(&self) -> &QuizPath {
        &self.path
    }

    pub fn symptoms(&self) -> &[Symptom] {
        self.symptoms.as_slice()
    }

    pub fn result(&self) -> Option<&DiagnosisResult> {
        match &self.state {
            SessionState::Completed { result } => Some(result),
            SessionState::InProgress { .. } => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.state, SessionState::Completed { .. })
    }

    pub fn is_analysis_in_flight(&self) -> bool {
        self.live_lease().is_some()
    }

    /// Position of the current question in the graph as a percentage; 100 once completed.
    pub fn progress_percentage(&self) -> f64 {
        match &self.state {
            SessionState::Completed { .. } => 100.0,
            SessionState::InProgress {
                current_question_id,
            } => {
                let index = self.graph.node_index(current_question_id).unwrap_or(0);
                index as f64 / self.graph.len() as f64 * 100.0
            }
        }
    }

    pub fn selected_models(&self) -> &[String] {
        &self.selected_models
    }

    pub fn analysis_details(&self) -> Option<&AnalysisDetails> {
        self.analysis_details.as_ref()
    }

    /// The symptoms free text is matched against, and that a user may pick from.
    pub fn vocabulary(&self) -> &SymptomVocabulary {
        &self.vocabulary
    }

    pub fn graph(&self) -> &QuestionGraph {
        &self.graph
    }

    pub fn back_policy(&self) -> BackPolicy {
        self.back_policy
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Answers the current question with `option_id`.
    ///
    /// A non-negative answer with a linked symptom adds that symptom. The session then moves to
    /// the option's explicit successor, or the next question in declaration order, or completes
    /// and scores if there is none.
    ///
    /// # Errors
    ///
    /// - [`TriageError::AnalysisInFlight`] while a background analysis runs.
    /// - [`TriageError::SessionCompleted`] if the questionnaire is finished.
    /// - [`TriageError::InvalidOption`] if the option is not on the current question.
    /// - [`TriageError::NoSymptoms`] if this answer would complete the questionnaire with no
    ///   symptoms reported. The session stays on the final question.
    pub fn answer(&mut self, option_id: &str) -> TriageResult<SessionState> {
        self.ensure_idle()?;
        let question_id = self.current_question_id()?.to_owned();
        let node = self.graph.node_by_id(&question_id)?;

        let Some(option) = node.option(option_id) else {
            tracing::warn!(
                question = %question_id,
                option = option_id,
                "rejected answer: option not on current question"
            );
            return Err(TriageError::InvalidOption {
                question_id,
                option_id: option_id.to_owned(),
            });
        };

        let next = match option.next_question_id() {
            Some(next) => Some(next.to_owned()),
            None => self
                .graph
                .node_after(&question_id)
                .map(|n| n.id().to_owned()),
        };
        let reported = option.reported_symptom().cloned();

        if next.is_none() && self.symptoms.is_empty() && reported.is_none() {
            tracing::warn!(
                question = %question_id,
                "rejected completion: no symptoms reported"
            );
            return Err(TriageError::NoSymptoms);
        }

        let added_symptom = match reported {
            Some(symptom) => {
                let id = symptom.id().to_owned();
                self.symptoms.add(symptom).then_some(id)
            }
            None => None,
        };
        self.path.push(PathEntry {
            question_id: question_id.clone(),
            option_id: option_id.to_owned(),
            added_symptom,
        });

        match next {
            Some(next) => {
                tracing::debug!(from = %question_id, to = %next, option = option_id, "advanced");
                self.state = SessionState::at(&next);
            }
            None => self.complete(),
        }
        Ok(self.state.clone())
    }

    /// Undoes the most recent answer and re-presents its question.
    ///
    /// Under [`BackPolicy::RetractSymptom`] the symptom that answer added is removed as well.
    ///
    /// # Errors
    ///
    /// [`TriageError::AnalysisInFlight`], [`TriageError::SessionCompleted`], or
    /// [`TriageError::NothingToUndo`] when no question has been answered.
    pub fn back(&mut self) -> TriageResult<SessionState> {
        self.ensure_idle()?;
        self.current_question_id()?;

        let Some(entry) = self.path.pop() else {
            return Err(TriageError::NothingToUndo);
        };

        if self.back_policy == BackPolicy::RetractSymptom {
            if let Some(symptom_id) = &entry.added_symptom {
                self.symptoms.remove(symptom_id);
            }
        }

        tracing::debug!(to = %entry.question_id, undone = %entry, "went back");
        self.state = SessionState::at(&entry.question_id);
        Ok(self.state.clone())
    }

    /// Returns to the first question with an empty path and no symptoms.
    ///
    /// Always succeeds. Any analysis still in flight is invalidated. The model selection is
    /// kept.
    pub fn restart(&mut self) -> SessionState {
        self.generation += 1;
        self.in_flight = None;
        self.path.clear();
        self.symptoms.clear();
        self.analysis_details = None;
        self.state = SessionState::at(self.graph.first_node().id());

        tracing::debug!(generation = self.generation, "restarted session");
        self.state.clone()
    }

    /// Scores the symptoms gathered so far and completes the session.
    ///
    /// On a completed session this returns the stored result.
    ///
    /// # Errors
    ///
    /// [`TriageError::AnalysisInFlight`] or [`TriageError::NoSymptoms`].
    pub fn run_analysis(&mut self) -> TriageResult<DiagnosisResult> {
        if let Some(result) = self.result() {
            return Ok(result.clone());
        }
        self.ensure_idle()?;
        if self.symptoms.is_empty() {
            return Err(TriageError::NoSymptoms);
        }

        self.complete();
        self.result().cloned().ok_or(TriageError::SessionCompleted)
    }

    /// Adds every vocabulary symptom named in `text`. Returns the symptoms added.
    ///
    /// # Errors
    ///
    /// [`TriageError::AnalysisInFlight`] or [`TriageError::SessionCompleted`].
    pub fn ingest_text(&mut self, text: &str) -> TriageResult<Vec<Symptom>> {
        self.ensure_idle()?;
        self.current_question_id()?;
        Ok(self.symptoms.ingest_text(text, &self.vocabulary))
    }

    /// Adds a symptom picked directly by the user. Returns `false` if its id was already
    /// reported.
    ///
    /// # Errors
    ///
    /// [`TriageError::AnalysisInFlight`] or [`TriageError::SessionCompleted`].
    pub fn add_symptom(&mut self, symptom: Symptom) -> TriageResult<bool> {
        self.ensure_idle()?;
        self.current_question_id()?;

        let id = symptom.id().to_owned();
        let added = self.symptoms.add(symptom);
        tracing::debug!(symptom = %id, added, "symptom picked");
        Ok(added)
    }

    /// Removes a reported symptom by id, whichever way it was reported. Returns the removed
    /// symptom, or `None` if no symptom has that id.
    ///
    /// A later `back` never re-removes or restores it.
    ///
    /// # Errors
    ///
    /// [`TriageError::AnalysisInFlight`] or [`TriageError::SessionCompleted`].
    pub fn remove_symptom(&mut self, symptom_id: &str) -> TriageResult<Option<Symptom>> {
        self.ensure_idle()?;
        self.current_question_id()?;

        let removed = self.symptoms.remove(symptom_id);
        if removed.is_some() {
            self.path.forget_symptom(symptom_id);
            tracing::debug!(symptom = symptom_id, "symptom removed");
        }
        Ok(removed)
    }

    /// Selects or deselects a catalog model. Returns whether it is now selected.
    ///
    /// # Errors
    ///
    /// [`TriageError::InvalidInput`] if the model is not in the catalog.
    pub fn toggle_model(&mut self, model_id: &str) -> TriageResult<bool> {
        if !self.models.contains(model_id) {
            return Err(TriageError::InvalidInput(format!(
                "unknown model '{model_id}'"
            )));
        }

        if let Some(position) = self.selected_models.iter().position(|m| m == model_id) {
            self.selected_models.remove(position);
            Ok(false)
        } else {
            self.selected_models.push(model_id.to_owned());
            Ok(true)
        }
    }

    // ------------------------------------------------------------------
    // Background analysis
    // ------------------------------------------------------------------

    /// Snapshots the inputs for an analysis and marks the session in flight.
    ///
    /// # Errors
    ///
    /// - [`TriageError::AnalysisInFlight`] if an analysis is already running.
    /// - [`TriageError::SessionCompleted`] if the session already has a result.
    /// - [`TriageError::NoSymptoms`] if nothing has been reported.
    pub fn begin_analysis(&mut self) -> TriageResult<AnalysisTicket> {
        self.ensure_idle()?;
        self.current_question_id()?;
        if self.symptoms.is_empty() {
            return Err(TriageError::NoSymptoms);
        }

        let lease = Arc::new(());
        self.in_flight = Some(Arc::downgrade(&lease));
        tracing::debug!(generation = self.generation, "analysis started");
        Ok(AnalysisTicket {
            lease,
            generation: self.generation,
            symptoms: self.symptoms.to_list(),
            path_length: self.path.len(),
            seed: self.seed,
            selected_models: self.selected_models.clone(),
            rules: Arc::clone(&self.rules),
            models: Arc::clone(&self.models),
        })
    }

    /// Applies a finished analysis and completes the session.
    ///
    /// # Errors
    ///
    /// [`TriageError::StaleAnalysis`] if the session was restarted after the ticket was issued.
    /// The session is left untouched.
    pub fn complete_analysis(
        &mut self,
        outcome: AnalysisOutcome,
    ) -> TriageResult<DiagnosisResult> {
        let current = self
            .live_lease()
            .is_some_and(|lease| Arc::ptr_eq(&lease, &outcome.lease));
        if !current || outcome.generation != self.generation {
            tracing::warn!(
                ticket = outcome.generation,
                current = self.generation,
                "discarded stale analysis"
            );
            return Err(TriageError::StaleAnalysis);
        }

        self.in_flight = None;
        let result = outcome.result.clone();
        self.finish(outcome.result, outcome.details);
        Ok(result)
    }

    /// Clears the in-flight mark of an analysis that will never complete.
    pub fn abandon_analysis(&mut self, generation: u64) {
        if generation == self.generation {
            self.in_flight = None;
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn live_lease(&self) -> Option<Arc<()>> {
        self.in_flight.as_ref().and_then(Weak::upgrade)
    }

    fn ensure_idle(&self) -> TriageResult<()> {
        if self.is_analysis_in_flight() {
            return Err(TriageError::AnalysisInFlight);
        }
        Ok(())
    }

    fn current_question_id(&self) -> TriageResult<&str> {
        match &self.state {
            SessionState::InProgress {
                current_question_id,
            } => Ok(current_question_id),
            SessionState::Completed { .. } => Err(TriageError::SessionCompleted),
        }
    }

    fn complete(&mut self) {
        let (result, details) = analyse(
            &self.rules,
            &self.models,
            self.symptoms.as_slice(),
            self.path.len(),
            &self.selected_models,
            self.seed,
        );
        self.finish(result, details);
    }

    fn finish(&mut self, result: DiagnosisResult, details: AnalysisDetails) {
        tracing::info!(
            symptoms = self.symptoms.len(),
            path_length = self.path.len(),
            conditions = result.conditions().len(),
            confidence = result.confidence_score(),
            "questionnaire completed"
        );
        self.analysis_details = Some(details);
        self.state = SessionState::Completed {
            result: Box::new(result),
        };
    }
}
