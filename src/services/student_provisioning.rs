use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use thiserror::Error;
use uuid::Uuid;

use crate::core::time::primitive_now_utc;
use crate::db::models::Student;
use crate::db::types::UserRole;
use crate::repositories;
use crate::services::accounts::{self, AccountError, NewAccount};
use crate::services::tabular::{self, Columns};

const ID_SUFFIX_LEN: usize = 4;
const MAX_PROVISION_ATTEMPTS: u32 = 5;

#[derive(Debug, Error)]
pub(crate) enum StudentError {
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("student not found")]
    NotFound,
    #[error("student has exam attempts or results and cannot be deleted")]
    HasExamActivity,
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub(crate) struct StudentDetails {
    pub(crate) full_name: String,
    pub(crate) id_number: String,
    pub(crate) gender: Option<String>,
    pub(crate) academic_year: Option<i32>,
    pub(crate) department: Option<String>,
}

/// A new student plus the one-time initial credentials.
#[derive(Debug, Clone)]
pub(crate) struct ProvisionedStudent {
    pub(crate) student: Student,
    pub(crate) username: String,
    pub(crate) initial_password: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SkippedRow {
    pub(crate) line: usize,
    pub(crate) reason: String,
}

#[derive(Debug, Clone)]
pub(crate) struct BulkOutcome {
    pub(crate) created: Vec<ProvisionedStudent>,
    pub(crate) skipped: Vec<SkippedRow>,
}

/// Full name without whitespace followed by the last four characters of the id
/// number with `/` removed.
pub(crate) fn base_username(full_name: &str, id_number: &str) -> String {
    let name: String = full_name.chars().filter(|ch| !ch.is_whitespace()).collect();
    let digits: Vec<char> = id_number.chars().filter(|ch| *ch != '/' && !ch.is_whitespace()).collect();
    let suffix: String = if digits.is_empty() {
        "0000".to_string()
    } else {
        digits[digits.len().saturating_sub(ID_SUFFIX_LEN)..].iter().collect()
    };
    format!("{name}{suffix}")
}

pub(crate) fn initial_password(username: &str, suffix: &str) -> String {
    format!("{username}{suffix}")
}

async fn unique_username(conn: &mut PgConnection, base: &str) -> Result<String, sqlx::Error> {
    if !repositories::users::username_exists(&mut *conn, base).await? {
        return Ok(base.to_string());
    }

    let mut counter = 2u32;
    loop {
        let candidate = format!("{base}{counter}");
        if !repositories::users::username_exists(&mut *conn, &candidate).await? {
            return Ok(candidate);
        }
        counter += 1;
    }
}

fn details_problems(details: &StudentDetails) -> Vec<String> {
    let mut problems = Vec::new();
    if details.full_name.trim().is_empty() {
        problems.push("Full name is required".to_string());
    }
    if details.id_number.trim().is_empty() {
        problems.push("Id number is required".to_string());
    }
    problems
}

async fn provision_on(
    conn: &mut PgConnection,
    details: &StudentDetails,
    password_suffix: &str,
) -> Result<ProvisionedStudent, StudentError> {
    let full_name = details.full_name.trim();
    let base = base_username(full_name, details.id_number.trim());
    let username = unique_username(&mut *conn, &base).await?;
    let password = initial_password(&username, password_suffix);

    let user = accounts::create_account(
        &mut *conn,
        NewAccount {
            username: &username,
            password: &password,
            full_name,
            role: UserRole::Student,
            must_change_password: true,
        },
    )
    .await?;

    let student = repositories::students::create(
        &mut *conn,
        repositories::students::CreateStudent {
            id: &Uuid::new_v4().to_string(),
            user_id: &user.id,
            full_name,
            gender: details.gender.as_deref(),
            id_number: details.id_number.trim(),
            academic_year: details.academic_year,
            department: details.department.as_deref(),
            now: primitive_now_utc(),
        },
    )
    .await?;

    Ok(ProvisionedStudent { student, username, initial_password: password })
}

/// A concurrent provisioning committed the username picked for this one.
fn lost_username_race(err: &StudentError) -> bool {
    match err {
        StudentError::Account(AccountError::Database(db)) | StudentError::Database(db) => {
            repositories::is_unique_violation(db)
        }
        _ => false,
    }
}

/// Provisions every row in one transaction, starting over with freshly
/// derived usernames when another request claims one first.
async fn provision_batch(
    pool: &PgPool,
    rows: &[StudentDetails],
    password_suffix: &str,
) -> Result<Vec<ProvisionedStudent>, StudentError> {
    let mut attempt = 1;
    loop {
        let mut tx = pool.begin().await?;
        let mut created = Vec::with_capacity(rows.len());
        let mut failure = None;
        for details in rows {
            match provision_on(&mut *tx, details, password_suffix).await {
                Ok(provisioned) => created.push(provisioned),
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        match failure {
            None => {
                tx.commit().await?;
                return Ok(created);
            }
            Some(err) if lost_username_race(&err) && attempt < MAX_PROVISION_ATTEMPTS => {
                tracing::warn!(attempt, "Username taken concurrently, retrying provisioning");
                attempt += 1;
            }
            Some(err) => return Err(err),
        }
    }
}

/// Creates the identity account and the student row in one transaction.
pub(crate) async fn provision_student(
    pool: &PgPool,
    details: &StudentDetails,
    password_suffix: &str,
) -> Result<ProvisionedStudent, StudentError> {
    let problems = details_problems(details);
    if !problems.is_empty() {
        return Err(StudentError::Validation(problems));
    }

    let mut created =
        provision_batch(pool, std::slice::from_ref(details), password_suffix).await?;
    let provisioned = created.pop().ok_or(sqlx::Error::RowNotFound)?;

    tracing::info!(
        student_id = %provisioned.student.id,
        username = %provisioned.username,
        action = "student_provisioned",
        "Student provisioned"
    );
    Ok(provisioned)
}

/// Roster CSV with `FullName` and `IdNumber` columns. Rows without a name are
/// skipped and reported; the rest are created together or not at all.
pub(crate) async fn provision_roster(
    pool: &PgPool,
    csv_text: &str,
    password_suffix: &str,
) -> Result<BulkOutcome, StudentError> {
    let mut records = tabular::split_records(csv_text)
        .map_err(|err| StudentError::Validation(vec![format!("row {}: unterminated quote", err.line)]))?
        .into_iter();
    let header = records
        .next()
        .ok_or_else(|| StudentError::Validation(vec!["Roster is empty".to_string()]))?;
    let columns = Columns::from_header(&header.fields);
    let (Some(name_col), Some(id_col)) = (columns.get("fullname"), columns.get("idnumber")) else {
        return Err(StudentError::Validation(vec![
            "Roster header must contain FullName and IdNumber".to_string(),
        ]));
    };

    let mut rows = Vec::new();
    let mut skipped = Vec::new();
    for record in records {
        let Some(full_name) = record.field(name_col) else {
            skipped.push(SkippedRow { line: record.line, reason: "FullName is empty".to_string() });
            continue;
        };
        let Some(id_number) = record.field(id_col) else {
            skipped.push(SkippedRow { line: record.line, reason: "IdNumber is empty".to_string() });
            continue;
        };
        rows.push(StudentDetails {
            full_name: full_name.to_string(),
            id_number: id_number.to_string(),
            gender: None,
            academic_year: None,
            department: None,
        });
    }

    let created = provision_batch(pool, &rows, password_suffix).await?;

    tracing::info!(
        created = created.len(),
        skipped = skipped.len(),
        action = "roster_imported",
        "Student roster imported"
    );
    Ok(BulkOutcome { created, skipped })
}

pub(crate) async fn update_student(
    pool: &PgPool,
    student_id: &str,
    changes: repositories::students::UpdateStudent,
) -> Result<Student, StudentError> {
    if changes.full_name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        return Err(StudentError::Validation(vec!["Full name is required".to_string()]));
    }

    let mut tx = pool.begin().await?;
    let now = changes.updated_at;
    let student = repositories::students::update(&mut *tx, student_id, changes)
        .await?
        .ok_or(StudentError::NotFound)?;
    repositories::users::update_full_name(&mut *tx, &student.user_id, &student.full_name, now)
        .await?;
    tx.commit().await?;
    Ok(student)
}

/// Refused once the student has attempted any exam.
pub(crate) async fn delete_student(pool: &PgPool, student_id: &str) -> Result<(), StudentError> {
    let mut tx = pool.begin().await?;
    let student = repositories::students::find_by_id(&mut *tx, student_id)
        .await?
        .ok_or(StudentError::NotFound)?;

    if repositories::students::has_exam_activity(&mut *tx, student_id).await? {
        return Err(StudentError::HasExamActivity);
    }

    repositories::students::delete_by_id(&mut *tx, student_id).await?;
    repositories::users::delete_by_id(&mut *tx, &student.user_id).await?;
    tx.commit().await?;

    tracing::info!(student_id = %student_id, action = "student_deleted", "Student deleted");
    Ok(())
}
