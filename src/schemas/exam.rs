use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::{format_optional, format_primitive};
use crate::db::models::{Exam, ExamAggregate};
use crate::db::types::ExamStatus;
use crate::schemas::question::QuestionResponse;
use crate::services::authoring::{ExamChanges, ExamDraft};
use crate::services::question_import::ImportSummary;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamCreate {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(alias = "academicYear")]
    #[validate(range(min = 2018, max = 2100, message = "academic_year must be between 2018 and 2100"))]
    pub(crate) academic_year: i32,
    #[serde(alias = "durationMinutes")]
    #[validate(range(min = 1, message = "duration_minutes must be positive"))]
    pub(crate) duration_minutes: i32,
    #[serde(default = "default_mark")]
    #[serde(alias = "defaultMark")]
    #[validate(range(exclusive_min = 0.0, message = "default_mark must be positive"))]
    pub(crate) default_mark: f64,
}

impl ExamCreate {
    pub(crate) fn into_draft(self) -> ExamDraft {
        ExamDraft {
            title: self.title,
            description: self.description,
            academic_year: self.academic_year,
            duration_minutes: self.duration_minutes,
            default_mark: self.default_mark,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    #[serde(alias = "academicYear")]
    #[validate(range(min = 2018, max = 2100, message = "academic_year must be between 2018 and 2100"))]
    pub(crate) academic_year: Option<i32>,
    #[serde(default)]
    #[serde(alias = "durationMinutes")]
    #[validate(range(min = 1, message = "duration_minutes must be positive"))]
    pub(crate) duration_minutes: Option<i32>,
    #[serde(default)]
    #[serde(alias = "defaultMark")]
    #[validate(range(exclusive_min = 0.0, message = "default_mark must be positive"))]
    pub(crate) default_mark: Option<f64>,
}

impl ExamUpdate {
    pub(crate) fn into_changes(self) -> ExamChanges {
        ExamChanges {
            title: self.title,
            description: self.description,
            academic_year: self.academic_year,
            duration_minutes: self.duration_minutes,
            default_mark: self.default_mark,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) academic_year: i32,
    pub(crate) duration_minutes: i32,
    pub(crate) default_mark: f64,
    pub(crate) status: ExamStatus,
    pub(crate) access_code: Option<String>,
    pub(crate) created_by: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
    pub(crate) published_at: Option<String>,
}

impl ExamResponse {
    pub(crate) fn from_db(exam: Exam) -> Self {
        Self {
            id: exam.id,
            title: exam.title,
            description: exam.description,
            academic_year: exam.academic_year,
            duration_minutes: exam.duration_minutes,
            default_mark: exam.default_mark,
            status: exam.status,
            access_code: exam.access_code,
            created_by: exam.created_by,
            created_at: format_primitive(exam.created_at),
            updated_at: format_primitive(exam.updated_at),
            published_at: format_optional(exam.published_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamDetailResponse {
    #[serde(flatten)]
    pub(crate) exam: ExamResponse,
    pub(crate) questions: Vec<QuestionResponse>,
}

impl ExamDetailResponse {
    pub(crate) fn from_aggregate(aggregate: ExamAggregate) -> Self {
        Self {
            exam: ExamResponse::from_db(aggregate.exam),
            questions: aggregate.questions.into_iter().map(QuestionResponse::from_aggregate).collect(),
        }
    }
}

/// Exam as listed to students; never carries the access code.
#[derive(Debug, Serialize)]
pub(crate) struct AvailableExamResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) academic_year: i32,
    pub(crate) duration_minutes: i32,
    pub(crate) published_at: Option<String>,
}

impl AvailableExamResponse {
    pub(crate) fn from_db(exam: Exam) -> Self {
        Self {
            id: exam.id,
            title: exam.title,
            description: exam.description,
            academic_year: exam.academic_year,
            duration_minutes: exam.duration_minutes,
            published_at: format_optional(exam.published_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ImportSummaryResponse {
    pub(crate) questions_created: usize,
    pub(crate) choices_created: usize,
    pub(crate) images_uploaded: usize,
}

impl From<ImportSummary> for ImportSummaryResponse {
    fn from(summary: ImportSummary) -> Self {
        Self {
            questions_created: summary.questions_created,
            choices_created: summary.choices_created,
            images_uploaded: summary.images_uploaded,
        }
    }
}

fn default_mark() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exam_create_defaults_mark_and_checks_ranges() {
        let payload: ExamCreate = serde_json::from_value(serde_json::json!({
            "title": "Physics",
            "academicYear": 2024,
            "durationMinutes": 45
        }))
        .expect("payload");
        assert_eq!(payload.default_mark, 1.0);
        assert!(payload.validate().is_ok());

        let bad: ExamCreate = serde_json::from_value(serde_json::json!({
            "title": "",
            "academic_year": 1990,
            "duration_minutes": 0,
            "default_mark": 0.0
        }))
        .expect("payload");
        let errors = bad.validate().expect_err("invalid");
        let fields = errors.field_errors();
        assert_eq!(fields.len(), 4);
    }
}
