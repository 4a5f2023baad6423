#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("question graph integrity error: {0}")]
    GraphIntegrity(String),
    #[error("question not found: {0}")]
    QuestionNotFound(String),
    #[error("option '{option_id}' is not offered by question '{question_id}'")]
    InvalidOption {
        question_id: String,
        option_id: String,
    },
    #[error("nothing to undo: no question has been answered yet")]
    NothingToUndo,
    #[error("the questionnaire is already complete")]
    SessionCompleted,

    #[error("no symptoms have been reported; answer more questions before running analysis")]
    NoSymptoms,
    #[error("an analysis is already in progress for this session")]
    AnalysisInFlight,
    #[error("analysis result discarded: the session was restarted while it was running")]
    StaleAnalysis,
    #[error("invalid scoring rules: {0}")]
    InvalidRules(String),

    #[error("failed to read file: {0}")]
    FileRead(std::io::Error),
    #[error("invalid YAML: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),
    #[error("schema error: {0}")]
    Translation(String),

    #[error("text error: {0}")]
    Text(#[from] triage_types::TextError),
    #[error("value out of range: {0}")]
    Range(#[from] triage_types::RangeError),
    #[error("uuid error: {0}")]
    Uuid(#[from] triage_uuid::UuidError),
}

pub type TriageResult<T> = std::result::Result<T, TriageError>;
