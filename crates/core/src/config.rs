//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into sessions. Environment variables are read by the binaries, never during request
//! handling; the helpers here take the raw values as arguments so they can be tested without
//! touching the process environment.

use crate::accumulator::SymptomVocabulary;
use crate::constants::{DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_IDLE_TTL_SECS};
use crate::graph::QuestionGraph;
use crate::models::ModelCatalog;
use crate::rules::ScoringRules;
use crate::session::{BackPolicy, QuizSession};
use crate::{TriageError, TriageResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// How many sessions a host keeps, and for how long an untouched one survives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionLimits {
    pub max_sessions: usize,
    pub idle_ttl: Duration,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_sessions: DEFAULT_MAX_SESSIONS,
            idle_ttl: Duration::from_secs(DEFAULT_SESSION_IDLE_TTL_SECS),
        }
    }
}

/// Core configuration resolved at startup.
///
/// Cloning is cheap: the graph, rules, models and vocabulary are shared.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    question_graph: Arc<QuestionGraph>,
    scoring_rules: Arc<ScoringRules>,
    models: Arc<ModelCatalog>,
    vocabulary: Arc<SymptomVocabulary>,
    back_policy: BackPolicy,
    seed: Option<u64>,
    session_limits: SessionLimits,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// The free-text vocabulary is the graph's linked symptoms followed by the common symptom
    /// list, first entry per id winning.
    pub fn new(
        question_graph: QuestionGraph,
        scoring_rules: ScoringRules,
        back_policy: BackPolicy,
        seed: Option<u64>,
    ) -> TriageResult<Self> {
        scoring_rules.validate()?;

        let common = SymptomVocabulary::common()?;
        let vocabulary = SymptomVocabulary::new(
            question_graph
                .symptom_vocabulary()
                .iter()
                .chain(common.iter())
                .cloned()
                .collect(),
        );

        Ok(Self {
            question_graph: Arc::new(question_graph),
            scoring_rules: Arc::new(scoring_rules),
            models: Arc::new(ModelCatalog::standard()),
            vocabulary: Arc::new(vocabulary),
            back_policy,
            seed,
            session_limits: SessionLimits::default(),
        })
    }

    /// Replaces the default session hosting limits.
    pub fn with_session_limits(self, session_limits: SessionLimits) -> Self {
        Self {
            session_limits,
            ..self
        }
    }

    /// Built-in graph and rules, default back policy, random seeds.
    pub fn with_defaults() -> TriageResult<Self> {
        Self::new(
            QuestionGraph::default_catalog()?,
            ScoringRules::default(),
            BackPolicy::default(),
            None,
        )
    }

    pub fn question_graph(&self) -> &Arc<QuestionGraph> {
        &self.question_graph
    }

    pub fn scoring_rules(&self) -> &Arc<ScoringRules> {
        &self.scoring_rules
    }

    pub fn models(&self) -> &Arc<ModelCatalog> {
        &self.models
    }

    pub fn vocabulary(&self) -> &Arc<SymptomVocabulary> {
        &self.vocabulary
    }

    pub fn back_policy(&self) -> BackPolicy {
        self.back_policy
    }

    /// Fixed jitter seed for every session, if configured.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn session_limits(&self) -> SessionLimits {
        self.session_limits
    }

    /// A fresh session on the first question.
    pub fn start_session(&self) -> QuizSession {
        let session = QuizSession::new(Arc::clone(&self.question_graph))
            .with_rules(Arc::clone(&self.scoring_rules))
            .with_models(Arc::clone(&self.models))
            .with_vocabulary(Arc::clone(&self.vocabulary))
            .with_back_policy(self.back_policy);

        match self.seed {
            Some(seed) => session.with_seed(seed),
            None => session,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolve the question graph without reading environment variables.
///
/// If `override_path` is provided it must be a readable YAML graph file; otherwise the
/// built-in catalog is used.
pub fn resolve_question_graph(override_path: Option<PathBuf>) -> TriageResult<QuestionGraph> {
    match override_path {
        Some(path) => load_file(&path, "TRIAGE_QUESTION_GRAPH", QuestionGraph::load),
        None => QuestionGraph::default_catalog(),
    }
}

/// Resolve the scoring rules without reading environment variables.
///
/// If `override_path` is provided it must be a readable YAML rules file; otherwise the built-in
/// rules are used.
pub fn resolve_scoring_rules(override_path: Option<PathBuf>) -> TriageResult<ScoringRules> {
    match override_path {
        Some(path) => load_file(&path, "TRIAGE_SCORING_RULES", ScoringRules::load),
        None => Ok(ScoringRules::default()),
    }
}

fn load_file<T>(
    path: &Path,
    setting: &str,
    load: impl FnOnce(&Path) -> TriageResult<T>,
) -> TriageResult<T> {
    if !path.is_file() {
        return Err(TriageError::InvalidInput(format!(
            "{setting} override '{}' is not a file",
            path.display()
        )));
    }
    tracing::info!(path = %path.display(), "loading {setting} override");
    load(path)
}

/// Interpret an optional path value; empty or whitespace means "not set".
pub fn path_from_env_value(value: Option<String>) -> Option<PathBuf> {
    non_blank(value).map(PathBuf::from)
}

/// Parse the back policy from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`BackPolicy::KeepSymptoms`].
pub fn back_policy_from_env_value(value: Option<String>) -> TriageResult<BackPolicy> {
    let parsed = non_blank(value).map(|v| v.parse::<BackPolicy>()).transpose()?;

    Ok(parsed.unwrap_or_default())
}

/// Parse a fixed seed from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns `None` (a random seed per session).
pub fn seed_from_env_value(value: Option<String>) -> TriageResult<Option<u64>> {
    non_blank(value)
        .map(|v| {
            v.parse::<u64>().map_err(|e| {
                TriageError::InvalidInput(format!("TRIAGE_SEED '{v}' is not a u64: {e}"))
            })
        })
        .transpose()
}

/// Parse the hosted-session cap from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_MAX_SESSIONS`]. Zero is rejected.
pub fn max_sessions_from_env_value(value: Option<String>) -> TriageResult<usize> {
    let Some(v) = non_blank(value) else {
        return Ok(DEFAULT_MAX_SESSIONS);
    };
    match v.parse::<usize>() {
        Ok(0) => Err(TriageError::InvalidInput(
            "TRIAGE_MAX_SESSIONS must be at least 1".into(),
        )),
        Ok(max) => Ok(max),
        Err(e) => Err(TriageError::InvalidInput(format!(
            "TRIAGE_MAX_SESSIONS '{v}' is not a count: {e}"
        ))),
    }
}

/// Parse the idle session lifetime, in whole seconds, from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_SESSION_IDLE_TTL_SECS`]. Zero is
/// rejected.
pub fn session_ttl_from_env_value(value: Option<String>) -> TriageResult<Duration> {
    let Some(v) = non_blank(value) else {
        return Ok(Duration::from_secs(DEFAULT_SESSION_IDLE_TTL_SECS));
    };
    match v.parse::<u64>() {
        Ok(0) => Err(TriageError::InvalidInput(
            "TRIAGE_SESSION_TTL_SECS must be at least 1".into(),
        )),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(TriageError::InvalidInput(format!(
            "TRIAGE_SESSION_TTL_SECS '{v}' is not a number of seconds: {e}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_with_defaults() {
        let config = CoreConfig::with_defaults().expect("defaults should be valid");

        assert_eq!(config.question_graph().len(), 8);
        assert_eq!(config.back_policy(), BackPolicy::KeepSymptoms);
        assert!(config.seed().is_none());
        // Graph symptoms plus Rash from the common list.
        assert!(config.vocabulary().iter().any(|s| s.name() == "Rash"));
        assert!(config.vocabulary().iter().any(|s| s.name() == "Blood in Stool"));
    }

    #[test]
    fn test_start_session_applies_configuration() {
        let config = CoreConfig::new(
            QuestionGraph::default_catalog().unwrap(),
            ScoringRules::default(),
            BackPolicy::RetractSymptom,
            Some(11),
        )
        .unwrap();

        let mut session = config.start_session();

        assert_eq!(session.back_policy(), BackPolicy::RetractSymptom);
        assert_eq!(session.seed(), 11);
        let added = session.ingest_text("an itchy rash").unwrap();
        assert_eq!(added.len(), 1);
    }

    #[test]
    fn test_new_rejects_invalid_rules() {
        let mut rules = ScoringRules::default();
        rules.baseline.clear();

        let err = CoreConfig::new(
            QuestionGraph::default_catalog().unwrap(),
            rules,
            BackPolicy::default(),
            None,
        )
        .expect_err("rules without baseline should be rejected");
        assert!(matches!(err, TriageError::InvalidRules(_)));
    }

    #[test]
    fn test_resolve_question_graph_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "nodes:\n  - id: only\n    prompt: Anything else?\n    kind: boolean\n    options:\n      - {{ id: only_yes, text: 'Yes', value: 'yes' }}"
        )
        .unwrap();

        let graph = resolve_question_graph(Some(file.path().to_path_buf()))
            .expect("temp graph should load");

        assert_eq!(graph.len(), 1);
        assert_eq!(graph.first_node().id(), "only");
    }

    #[test]
    fn test_resolve_question_graph_rejects_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_question_graph(Some(dir.path().join("missing.yaml")))
            .expect_err("missing override should fail");

        assert!(matches!(err, TriageError::InvalidInput(ref msg) if msg.contains("TRIAGE_QUESTION_GRAPH")));
    }

    #[test]
    fn test_resolve_scoring_rules_defaults_and_file() {
        assert_eq!(resolve_scoring_rules(None).unwrap(), ScoringRules::default());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        let yaml = serde_yaml::to_string(&ScoringRules::default()).unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let rules = resolve_scoring_rules(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(rules, ScoringRules::default());
    }

    #[test]
    fn test_back_policy_from_env_value() {
        assert_eq!(
            back_policy_from_env_value(None).unwrap(),
            BackPolicy::KeepSymptoms
        );
        assert_eq!(
            back_policy_from_env_value(Some("  ".into())).unwrap(),
            BackPolicy::KeepSymptoms
        );
        assert_eq!(
            back_policy_from_env_value(Some("retract".into())).unwrap(),
            BackPolicy::RetractSymptom
        );
        assert!(back_policy_from_env_value(Some("sometimes".into())).is_err());
    }

    #[test]
    fn test_seed_from_env_value() {
        assert_eq!(seed_from_env_value(None).unwrap(), None);
        assert_eq!(seed_from_env_value(Some(" 42 ".into())).unwrap(), Some(42));
        assert!(matches!(
            seed_from_env_value(Some("forty-two".into())),
            Err(TriageError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_path_from_env_value() {
        assert_eq!(path_from_env_value(Some("".into())), None);
        assert_eq!(
            path_from_env_value(Some("/etc/triage/graph.yaml".into())),
            Some(PathBuf::from("/etc/triage/graph.yaml"))
        );
    }

    #[test]
    fn test_session_limits_default_and_override() {
        let config = CoreConfig::with_defaults().unwrap();
        assert_eq!(config.session_limits(), SessionLimits::default());
        assert_eq!(config.session_limits().max_sessions, DEFAULT_MAX_SESSIONS);

        let limits = SessionLimits {
            max_sessions: 3,
            idle_ttl: Duration::from_secs(30),
        };
        let config = config.with_session_limits(limits);
        assert_eq!(config.session_limits(), limits);
    }

    #[test]
    fn test_max_sessions_from_env_value() {
        assert_eq!(max_sessions_from_env_value(None).unwrap(), DEFAULT_MAX_SESSIONS);
        assert_eq!(max_sessions_from_env_value(Some(" 250 ".into())).unwrap(), 250);
        assert!(matches!(
            max_sessions_from_env_value(Some("0".into())),
            Err(TriageError::InvalidInput(_))
        ));
        assert!(max_sessions_from_env_value(Some("lots".into())).is_err());
    }

    #[test]
    fn test_session_ttl_from_env_value() {
        assert_eq!(
            session_ttl_from_env_value(Some("".into())).unwrap(),
            Duration::from_secs(DEFAULT_SESSION_IDLE_TTL_SECS)
        );
        assert_eq!(
            session_ttl_from_env_value(Some("90".into())).unwrap(),
            Duration::from_secs(90)
        );
        assert!(session_ttl_from_env_value(Some("0".into())).is_err());
        assert!(session_ttl_from_env_value(Some("-5".into())).is_err());
    }
}
