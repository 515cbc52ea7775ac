use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::{format_primitive, primitive_now_utc};
use crate::db::models::Student;
use crate::repositories::students::UpdateStudent;
use crate::services::exam_session::BanStatus;
use crate::services::student_provisioning::{
    BulkOutcome, ProvisionedStudent, SkippedRow, StudentDetails,
};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct StudentCreate {
    #[serde(alias = "fullName")]
    #[validate(length(min = 1, max = 200, message = "full_name must be 1-200 characters"))]
    pub(crate) full_name: String,
    #[serde(alias = "idNumber")]
    #[validate(length(min = 1, max = 64, message = "id_number must be 1-64 characters"))]
    pub(crate) id_number: String,
    #[serde(default)]
    pub(crate) gender: Option<String>,
    #[serde(default)]
    #[serde(alias = "academicYear")]
    #[validate(range(min = 2018, max = 2100, message = "academic_year must be between 2018 and 2100"))]
    pub(crate) academic_year: Option<i32>,
    #[serde(default)]
    pub(crate) department: Option<String>,
}

impl StudentCreate {
    pub(crate) fn into_details(self) -> StudentDetails {
        StudentDetails {
            full_name: self.full_name,
            id_number: self.id_number,
            gender: self.gender,
            academic_year: self.academic_year,
            department: self.department,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct StudentUpdate {
    #[serde(default)]
    #[serde(alias = "fullName")]
    #[validate(length(min = 1, max = 200, message = "full_name must be 1-200 characters"))]
    pub(crate) full_name: Option<String>,
    #[serde(default)]
    #[serde(alias = "idNumber")]
    #[validate(length(min = 1, max = 64, message = "id_number must be 1-64 characters"))]
    pub(crate) id_number: Option<String>,
    #[serde(default)]
    pub(crate) gender: Option<String>,
    #[serde(default)]
    #[serde(alias = "academicYear")]
    #[validate(range(min = 2018, max = 2100, message = "academic_year must be between 2018 and 2100"))]
    pub(crate) academic_year: Option<i32>,
    #[serde(default)]
    pub(crate) department: Option<String>,
}

impl StudentUpdate {
    pub(crate) fn into_changes(self) -> UpdateStudent {
        UpdateStudent {
            full_name: self.full_name.map(|name| name.trim().to_string()),
            gender: self.gender,
            id_number: self.id_number.map(|id| id.trim().to_string()),
            academic_year: self.academic_year,
            department: self.department,
            updated_at: primitive_now_utc(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct BanRequest {
    #[serde(default = "default_true")]
    pub(crate) banned: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentResponse {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) full_name: String,
    pub(crate) gender: Option<String>,
    pub(crate) id_number: String,
    pub(crate) academic_year: Option<i32>,
    pub(crate) department: Option<String>,
    pub(crate) created_at: String,
}

impl StudentResponse {
    pub(crate) fn from_db(student: Student) -> Self {
        Self {
            id: student.id,
            user_id: student.user_id,
            full_name: student.full_name,
            gender: student.gender,
            id_number: student.id_number,
            academic_year: student.academic_year,
            department: student.department,
            created_at: format_primitive(student.created_at),
        }
    }
}

/// Returned once at provisioning time; the password is not stored in clear.
#[derive(Debug, Serialize)]
pub(crate) struct ProvisionedStudentResponse {
    pub(crate) student: StudentResponse,
    pub(crate) username: String,
    pub(crate) initial_password: String,
}

impl From<ProvisionedStudent> for ProvisionedStudentResponse {
    fn from(provisioned: ProvisionedStudent) -> Self {
        Self {
            student: StudentResponse::from_db(provisioned.student),
            username: provisioned.username,
            initial_password: provisioned.initial_password,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct BulkStudentResponse {
    pub(crate) created: Vec<ProvisionedStudentResponse>,
    pub(crate) skipped: Vec<SkippedRow>,
}

impl From<BulkOutcome> for BulkStudentResponse {
    fn from(outcome: BulkOutcome) -> Self {
        Self {
            created: outcome.created.into_iter().map(Into::into).collect(),
            skipped: outcome.skipped,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct BanResponse {
    pub(crate) student_id: String,
    pub(crate) exam_id: String,
    pub(crate) banned: bool,
    pub(crate) taken_exam: bool,
}

impl From<BanStatus> for BanResponse {
    fn from(status: BanStatus) -> Self {
        Self {
            student_id: status.student_id,
            exam_id: status.exam_id,
            banned: status.banned,
            taken_exam: status.taken_exam,
        }
    }
}

fn default_true() -> bool {
    true
}
