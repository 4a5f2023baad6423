//! # Triage Core
//!
//! The symptom-intake decision engine.
//!
//! This crate contains the questionnaire and scoring logic and nothing else:
//! - a validated question graph with branching answers ([`graph`]);
//! - the per-run quiz session state machine ([`session`]);
//! - the deduplicated symptom accumulator and free-text keyword ingestion ([`accumulator`]);
//! - the seeded, deterministic diagnosis scorer and its rules ([`scorer`], [`rules`]);
//! - per-model contribution breakdowns ([`models`]);
//! - immutable, serialisable reports ([`report`]).
//!
//! Data flows one way: graph, session, accumulator, scorer, report.
//!
//! **No API concerns**: HTTP servers and terminal interaction belong in `api-rest` and
//! `triage-cli`.

pub mod accumulator;
pub mod config;
pub mod constants;
pub mod error;
pub mod graph;
pub mod models;
pub mod report;
pub mod rules;
pub mod scorer;
pub mod session;
pub mod symptom;

pub use accumulator::{SymptomAccumulator, SymptomVocabulary};
pub use config::{CoreConfig, SessionLimits};
pub use error::{TriageError, TriageResult};
pub use graph::{QuestionGraph, QuestionKind, QuestionNode, QuestionOption};
pub use models::{AnalysisDetails, AnalysisModel, ModelCatalog, ModelContribution, ModelKind};
pub use report::{build_report, PatientInfo, Report, ReportBuilder};
pub use rules::ScoringRules;
pub use scorer::{confidence, score, score_with, Condition, DiagnosisResult, Urgency};
pub use session::{
    AnalysisOutcome, AnalysisTicket, BackPolicy, PathEntry, QuizPath, QuizSession, SessionState,
};
pub use symptom::Symptom;

/// Starts a questionnaire run with the given configuration.
pub fn start_session(config: &CoreConfig) -> QuizSession {
    config.start_session()
}
