pub(crate) mod attempts;
pub(crate) mod choices;
pub(crate) mod exam_bans;
pub(crate) mod exams;
pub(crate) mod health;
pub(crate) mod questions;
pub(crate) mod student_exams;
pub(crate) mod students;
pub(crate) mod users;

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error().is_some_and(|db_err| db_err.is_unique_violation())
}
