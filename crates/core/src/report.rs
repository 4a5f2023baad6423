//! Diagnosis reports.
//!
//! A [`Report`] is the flat, serialisable record of one analysis: the symptoms it was based
//! on, the scorer's result, when it was made and under which identifier. It holds no
//! references back into the engine, so an exporter can write it anywhere.

use crate::models::AnalysisDetails;
use crate::scorer::DiagnosisResult;
use crate::session::QuizSession;
use crate::symptom::Symptom;
use crate::{TriageError, TriageResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use triage_uuid::{TimestampUuid, TimestampUuidGenerator};

/// Optional patient details printed on a report.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    id: TimestampUuid,
    symptoms: Vec<Symptom>,
    diagnosis_result: DiagnosisResult,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    patient: Option<PatientInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    analysis: Option<AnalysisDetails>,
}

impl Report {
    pub fn id(&self) -> &TimestampUuid {
        &self.id
    }

    pub fn symptoms(&self) -> &[Symptom] {
        &self.symptoms
    }

    pub fn diagnosis_result(&self) -> &DiagnosisResult {
        &self.diagnosis_result
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn patient(&self) -> Option<&PatientInfo> {
        self.patient.as_ref()
    }

    pub fn analysis(&self) -> Option<&AnalysisDetails> {
        self.analysis.as_ref()
    }
}

/// Builds reports whose ids are strictly increasing in time.
#[derive(Clone, Debug, Default)]
pub struct ReportBuilder {
    ids: TimestampUuidGenerator,
    patient: Option<PatientInfo>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `patient` to every report this builder produces.
    pub fn with_patient(self, patient: PatientInfo) -> Self {
        Self {
            patient: Some(patient),
            ..self
        }
    }

    pub fn build(&mut self, symptoms: &[Symptom], result: &DiagnosisResult) -> Report {
        self.assemble(symptoms, result, None, self.patient.clone())
    }

    /// Builds a report from a completed session, including its model contributions.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::InvalidInput`] if the session has no result yet.
    pub fn build_for_session(&mut self, session: &QuizSession) -> TriageResult<Report> {
        let patient = self.patient.clone();
        self.build_for_session_with_patient(session, patient)
    }

    /// Like [`build_for_session`](Self::build_for_session), but `patient` replaces the
    /// builder's own patient for this report only. One builder can then serve many callers
    /// and keep its ids increasing across all of them.
    pub fn build_for_session_with_patient(
        &mut self,
        session: &QuizSession,
        patient: Option<PatientInfo>,
    ) -> TriageResult<Report> {
        let result = session.result().ok_or_else(|| {
            TriageError::InvalidInput("the session has not been analysed yet".into())
        })?;
        Ok(self.assemble(
            session.symptoms(),
            result,
            session.analysis_details().cloned(),
            patient,
        ))
    }

    fn assemble(
        &mut self,
        symptoms: &[Symptom],
        result: &DiagnosisResult,
        analysis: Option<AnalysisDetails>,
        patient: Option<PatientInfo>,
    ) -> Report {
        let id = self.ids.next_id();
        tracing::debug!(report = %id, symptoms = symptoms.len(), "built report");
        Report {
            created_at: id.timestamp(),
            id,
            symptoms: symptoms.to_vec(),
            diagnosis_result: result.clone(),
            patient,
            analysis,
        }
    }
}

/// Packages `symptoms` and `result` into a report with a fresh id.
pub fn build_report(symptoms: &[Symptom], result: &DiagnosisResult) -> Report {
    ReportBuilder::new().build(symptoms, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::QuestionGraph;
    use crate::scorer::score;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn inputs() -> (Vec<Symptom>, DiagnosisResult) {
        let symptoms = vec![
            Symptom::new("s1", "Headache").unwrap().with_severity(4).unwrap(),
            Symptom::new("s2", "Fever").unwrap().with_duration("2 days"),
        ];
        let result = score(&symptoms, 2, 8);
        (symptoms, result)
    }

    #[test]
    fn test_report_fields_equal_inputs() {
        let (symptoms, result) = inputs();

        let report = build_report(&symptoms, &result);

        assert_eq!(report.symptoms(), symptoms.as_slice());
        assert_eq!(report.diagnosis_result(), &result);
        assert_eq!(report.created_at(), report.id().timestamp());
        assert!(report.patient().is_none());
        assert!(report.analysis().is_none());
    }

    #[test]
    fn test_report_ids_are_unique() {
        let (symptoms, result) = inputs();

        let ids: HashSet<String> = (0..100)
            .map(|_| build_report(&symptoms, &result).id().to_string())
            .collect();

        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn test_builder_ids_increase() {
        let (symptoms, result) = inputs();
        let mut builder = ReportBuilder::new();

        let first = builder.build(&symptoms, &result);
        let second = builder.build(&symptoms, &result);

        assert!(second.id() > first.id());
        assert!(second.created_at() > first.created_at());
    }

    #[test]
    fn test_patient_is_attached() {
        let (symptoms, result) = inputs();
        let patient = PatientInfo {
            name: Some("Alex Doe".into()),
            age: Some(34),
            ..PatientInfo::default()
        };

        let report = ReportBuilder::new()
            .with_patient(patient.clone())
            .build(&symptoms, &result);

        assert_eq!(report.patient(), Some(&patient));
    }

    #[test]
    fn test_build_for_session_requires_result_and_carries_analysis() {
        let graph = Arc::new(QuestionGraph::default_catalog().unwrap());
        let mut session = QuizSession::new(graph).with_seed(3);
        let mut builder = ReportBuilder::new();

        assert!(matches!(
            builder.build_for_session(&session),
            Err(TriageError::InvalidInput(_))
        ));

        session.answer("q1_neurological").unwrap();
        session.answer("q8_numbness").unwrap();
        let report = builder.build_for_session(&session).unwrap();

        assert_eq!(report.symptoms(), session.symptoms());
        assert_eq!(Some(report.diagnosis_result()), session.result());
        assert_eq!(report.analysis(), session.analysis_details());
    }

    #[test]
    fn test_shared_builder_ids_increase_across_sessions_and_patients() {
        let graph = Arc::new(QuestionGraph::default_catalog().unwrap());
        let mut builder = ReportBuilder::new();
        let mut first_session = QuizSession::new(graph.clone()).with_seed(1);
        first_session.answer("q1_neurological").unwrap();
        first_session.answer("q8_headache").unwrap();
        let mut second_session = QuizSession::new(graph).with_seed(2);
        second_session.answer("q1_neurological").unwrap();
        second_session.answer("q8_numbness").unwrap();
        let sam = PatientInfo {
            name: Some("Sam".into()),
            ..PatientInfo::default()
        };

        let first = builder
            .build_for_session_with_patient(&first_session, Some(sam.clone()))
            .unwrap();
        let second = builder
            .build_for_session_with_patient(&second_session, None)
            .unwrap();

        assert!(second.id() > first.id());
        assert_eq!(first.patient(), Some(&sam));
        assert!(second.patient().is_none());
    }

    #[test]
    fn test_report_serializes_as_flat_camel_case_record() {
        let (symptoms, result) = inputs();
        let report = build_report(&symptoms, &result);

        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["id"], report.id().to_string());
        assert_eq!(json["symptoms"][1]["duration"], "2 days");
        assert!(json["diagnosisResult"]["conditions"].is_array());
        assert!(json["diagnosisResult"]["suggestedSpecialists"].is_array());
        assert!(json["createdAt"].is_string());
        assert!(json.get("patient").is_none());

        let parsed: Report = serde_json::from_value(json).expect("report JSON should parse back");
        assert_eq!(parsed.id(), report.id());
        assert_eq!(parsed.symptoms(), report.symptoms());
    }
}
