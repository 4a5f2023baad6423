//! Constants used throughout the triage core crate.

/// Raw option values that mean "not present"; an option with one of these values never adds
/// its linked symptom.
pub const NEGATIVE_ANSWER_VALUES: [&str; 2] = ["no", "none"];

/// The built-in intake questionnaire, in the question graph YAML format.
pub const DEFAULT_QUESTION_CATALOG: &str = include_str!("../catalog/questions.yaml");

/// Confidence before any symptom, path or severity contribution.
pub const CONFIDENCE_BASE: f64 = 0.65;

/// Confidence added per accumulated symptom.
pub const CONFIDENCE_PER_SYMPTOM: f64 = 0.05;

/// Confidence added per answered question on the path.
pub const CONFIDENCE_PER_PATH_STEP: f64 = 0.02;

/// Hard ceiling; the engine never reports full certainty.
pub const CONFIDENCE_CEILING: f64 = 0.98;

/// Models selected when a session starts.
pub const DEFAULT_SELECTED_MODELS: [&str; 2] = ["transformer-med-v1", "gpt-med-v2"];

/// Confidence given to a selected model that is not in the catalog.
pub const UNKNOWN_MODEL_CONFIDENCE: f64 = 0.8;

/// Sessions a server hosts at once before refusing new ones.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Seconds a hosted session may sit untouched before it is discarded.
pub const DEFAULT_SESSION_IDLE_TTL_SECS: u64 = 60 * 60;
