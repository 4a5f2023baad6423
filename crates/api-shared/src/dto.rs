//! Wire types for the triage HTTP API.
//!
//! These mirror the core value types with flat, documented JSON shapes. Conversions from the
//! core types live next to each DTO.

use serde::{Deserialize, Serialize};
use triage_core::{
    AnalysisDetails, Condition, DiagnosisResult, ModelContribution, PathEntry, PatientInfo,
    QuestionNode, QuestionOption, QuizSession, Report, SessionState, Symptom, TriageResult,
    Urgency,
};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SymptomDto {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

impl From<&Symptom> for SymptomDto {
    fn from(symptom: &Symptom) -> Self {
        Self {
            id: symptom.id().to_owned(),
            name: symptom.name().to_owned(),
            description: symptom.description().map(str::to_owned),
            severity: symptom.severity().map(|s| s.value()),
            duration: symptom.duration().map(str::to_owned),
        }
    }
}

impl SymptomDto {
    /// Validates the DTO into an engine symptom; blank ids or names and severities outside
    /// 1..=10 are rejected.
    pub fn into_symptom(self) -> TriageResult<Symptom> {
        let mut symptom = Symptom::new(&self.id, &self.name)?;
        if let Some(severity) = self.severity {
            symptom = symptom.with_severity(severity)?;
        }
        if let Some(description) = self.description {
            symptom = symptom.with_description(description);
        }
        if let Some(duration) = self.duration {
            symptom = symptom.with_duration(duration);
        }
        Ok(symptom)
    }
}

fn symptoms_to_dto(symptoms: &[Symptom]) -> Vec<SymptomDto> {
    symptoms.iter().map(SymptomDto::from).collect()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OptionDto {
    pub id: String,
    pub text: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_question_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symptom: Option<SymptomDto>,
}

impl From<&QuestionOption> for OptionDto {
    fn from(option: &QuestionOption) -> Self {
        Self {
            id: option.id().to_owned(),
            text: option.display_text().to_owned(),
            value: option.value().to_owned(),
            weight: option.weight().map(|w| w.value()),
            next_question_id: option.next_question_id().map(str::to_owned),
            symptom: option.linked_symptom().map(SymptomDto::from),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDto {
    pub id: String,
    pub prompt: String,
    /// `multiple-choice`, `boolean`, `scale` or `branching`.
    pub kind: String,
    pub options: Vec<OptionDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl From<&QuestionNode> for QuestionDto {
    fn from(node: &QuestionNode) -> Self {
        Self {
            id: node.id().to_owned(),
            prompt: node.prompt().to_owned(),
            kind: node.kind().as_str().to_owned(),
            options: node.options().iter().map(OptionDto::from).collect(),
            model_tag: node.model_tag().map(str::to_owned),
            context: node.context().map(str::to_owned),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QuestionsRes {
    pub questions: Vec<QuestionDto>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConditionDto {
    pub name: String,
    pub probability: f64,
    pub description: String,
    /// `low`, `medium`, `high` or `emergency`.
    pub urgency: String,
    pub specialist_type: String,
}

impl From<&Condition> for ConditionDto {
    fn from(condition: &Condition) -> Self {
        let urgency = match condition.urgency {
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
            Urgency::Emergency => "emergency",
        };
        Self {
            name: condition.name.clone(),
            probability: condition.probability,
            description: condition.description.clone(),
            urgency: urgency.to_owned(),
            specialist_type: condition.specialist_type.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisResultDto {
    pub conditions: Vec<ConditionDto>,
    pub confidence_score: f64,
    pub follow_up_questions: Vec<String>,
    pub recommended_tests: Vec<String>,
    pub suggested_specialists: Vec<String>,
}

impl From<&DiagnosisResult> for DiagnosisResultDto {
    fn from(result: &DiagnosisResult) -> Self {
        Self {
            conditions: result.conditions().iter().map(ConditionDto::from).collect(),
            confidence_score: result.confidence_score(),
            follow_up_questions: result.follow_up_questions().to_vec(),
            recommended_tests: result.recommended_tests().to_vec(),
            suggested_specialists: result.suggested_specialists().to_vec(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModelContributionDto {
    pub model_id: String,
    pub confidence: f64,
    pub conditions: Vec<String>,
}

impl From<&ModelContribution> for ModelContributionDto {
    fn from(contribution: &ModelContribution) -> Self {
        Self {
            model_id: contribution.model_id.clone(),
            confidence: contribution.confidence,
            conditions: contribution.conditions.clone(),
        }
    }
}

fn contributions_to_dto(details: Option<&AnalysisDetails>) -> Vec<ModelContributionDto> {
    details
        .map(|d| {
            d.model_contributions
                .iter()
                .map(ModelContributionDto::from)
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PathEntryDto {
    pub question_id: String,
    pub option_id: String,
}

impl From<&PathEntry> for PathEntryDto {
    fn from(entry: &PathEntry) -> Self {
        Self {
            question_id: entry.question_id().to_owned(),
            option_id: entry.option_id().to_owned(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    InProgress,
    Completed,
}

/// Everything a client needs to render a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionRes {
    pub session_id: String,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_question: Option<QuestionDto>,
    pub path: Vec<PathEntryDto>,
    pub symptoms: Vec<SymptomDto>,
    pub progress: f64,
    pub selected_models: Vec<String>,
    pub analysis_in_flight: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<DiagnosisResultDto>,
}

impl SessionRes {
    pub fn from_session(session_id: impl Into<String>, session: &QuizSession) -> Self {
        let status = match session.state() {
            SessionState::InProgress { .. } => SessionStatus::InProgress,
            SessionState::Completed { .. } => SessionStatus::Completed,
        };
        Self {
            session_id: session_id.into(),
            status,
            current_question: session.current_question().map(QuestionDto::from),
            path: session.path().entries().iter().map(PathEntryDto::from).collect(),
            symptoms: symptoms_to_dto(session.symptoms()),
            progress: session.progress_percentage(),
            selected_models: session.selected_models().to_vec(),
            analysis_in_flight: session.is_analysis_in_flight(),
            result: session.result().map(DiagnosisResultDto::from),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerReq {
    pub option_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IngestTextReq {
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IngestTextRes {
    /// Symptoms recognised in the text that were not already reported.
    pub added: Vec<SymptomDto>,
    /// The full accumulated set after ingestion.
    pub symptoms: Vec<SymptomDto>,
}

impl IngestTextRes {
    pub fn new(added: &[Symptom], symptoms: &[Symptom]) -> Self {
        Self {
            added: symptoms_to_dto(added),
            symptoms: symptoms_to_dto(symptoms),
        }
    }
}

/// Outcome of adding or removing one symptom by hand.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SymptomChangeRes {
    /// False when the symptom was already present (add) or absent (remove).
    pub changed: bool,
    pub symptoms: Vec<SymptomDto>,
}

impl SymptomChangeRes {
    pub fn new(changed: bool, symptoms: &[Symptom]) -> Self {
        Self {
            changed,
            symptoms: symptoms_to_dto(symptoms),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ToggleModelRes {
    pub model_id: String,
    pub selected: bool,
    pub selected_models: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRes {
    pub result: DiagnosisResultDto,
    pub model_contributions: Vec<ModelContributionDto>,
}

impl AnalysisRes {
    pub fn new(result: &DiagnosisResult, details: Option<&AnalysisDetails>) -> Self {
        Self {
            result: DiagnosisResultDto::from(result),
            model_contributions: contributions_to_dto(details),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PatientDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

impl From<PatientDto> for PatientInfo {
    fn from(dto: PatientDto) -> Self {
        PatientInfo {
            id: dto.id,
            name: dto.name,
            age: dto.age,
            gender: dto.gender,
        }
    }
}

impl From<&PatientInfo> for PatientDto {
    fn from(info: &PatientInfo) -> Self {
        Self {
            id: info.id.clone(),
            name: info.name.clone(),
            age: info.age,
            gender: info.gender.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReportReq {
    #[serde(default)]
    pub patient: Option<PatientDto>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportRes {
    pub id: String,
    pub created_at: String,
    pub symptoms: Vec<SymptomDto>,
    pub diagnosis_result: DiagnosisResultDto,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient: Option<PatientDto>,
    pub model_contributions: Vec<ModelContributionDto>,
}

impl From<&Report> for ReportRes {
    fn from(report: &Report) -> Self {
        Self {
            id: report.id().to_string(),
            created_at: report.created_at().to_rfc3339(),
            symptoms: symptoms_to_dto(report.symptoms()),
            diagnosis_result: DiagnosisResultDto::from(report.diagnosis_result()),
            patient: report.patient().map(PatientDto::from),
            model_contributions: contributions_to_dto(report.analysis()),
        }
    }
}
