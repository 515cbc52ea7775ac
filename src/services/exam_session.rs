use std::collections::HashMap;

use sqlx::PgPool;
use thiserror::Error;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::core::metrics::{ANSWERS_SUBMITTED_TOTAL, EXAM_FINALIZED_TOTAL};
use crate::core::time::primitive_now_utc;
use crate::db::models::{Exam, ExamAggregate, ExamAttempt, StudentExam};
use crate::db::types::ExamStatus;
use crate::repositories;
use crate::services::access_codes;

#[derive(Debug, Error)]
pub(crate) enum SessionError {
    #[error("exam not found")]
    ExamNotFound,
    #[error("question not found in this exam")]
    QuestionNotFound,
    #[error("student not found")]
    StudentNotFound,
    #[error("exam is not published")]
    ExamNotPublished,
    #[error("invalid access code")]
    InvalidAccessCode,
    #[error("student is banned from this exam")]
    Banned,
    #[error("exam has already been taken")]
    AlreadyTaken,
    #[error("no exam results yet")]
    NoResults,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub(crate) struct ChoiceView {
    pub(crate) id: String,
    pub(crate) text: String,
}

/// One question of a running exam plus what the student needs to navigate.
#[derive(Debug, Clone)]
pub(crate) struct QuestionView {
    pub(crate) exam_id: String,
    pub(crate) exam_title: String,
    pub(crate) question_id: String,
    pub(crate) question_text: String,
    pub(crate) image_path: Option<String>,
    pub(crate) mark_weight: f64,
    pub(crate) choices: Vec<ChoiceView>,
    pub(crate) selected_choice_id: Option<String>,
    pub(crate) flagged: bool,
    pub(crate) index: usize,
    pub(crate) total: usize,
    pub(crate) answered_indices: Vec<usize>,
    pub(crate) flagged_indices: Vec<usize>,
    /// Advisory only, the server never cuts a session off.
    pub(crate) duration_minutes: i32,
}

#[derive(Debug, Clone)]
pub(crate) struct ExamResult {
    pub(crate) exam_id: String,
    pub(crate) exam_title: String,
    pub(crate) score: f64,
    pub(crate) total_questions: i64,
    pub(crate) taken_exam: bool,
    pub(crate) start_time: PrimitiveDateTime,
    pub(crate) end_time: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone)]
pub(crate) enum SessionStep {
    Question(QuestionView),
    /// The exam is complete; show this result instead of a question.
    Result(ExamResult),
}

#[derive(Debug, Clone)]
pub(crate) struct SubmitOutcome {
    pub(crate) next_index: i64,
    pub(crate) is_correct: bool,
}

pub(crate) struct SubmitAnswer<'a> {
    pub(crate) student_id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) choice_id: Option<&'a str>,
    pub(crate) flagged: bool,
    pub(crate) next_index: i64,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Navigation {
    answered: Vec<usize>,
    flagged: Vec<usize>,
}

fn navigation(aggregate: &ExamAggregate, attempts: &[ExamAttempt]) -> Navigation {
    let by_question: HashMap<&str, &ExamAttempt> =
        attempts.iter().map(|attempt| (attempt.question_id.as_str(), attempt)).collect();

    let mut nav = Navigation::default();
    for (index, entry) in aggregate.questions.iter().enumerate() {
        let Some(attempt) = by_question.get(entry.question.id.as_str()) else {
            continue;
        };
        if attempt.choice_id.is_some() {
            nav.answered.push(index);
        }
        if attempt.is_flagged {
            nav.flagged.push(index);
        }
    }
    nav
}

fn published(exam: &Exam) -> Result<(), SessionError> {
    if exam.status == ExamStatus::Published {
        Ok(())
    } else {
        Err(SessionError::ExamNotPublished)
    }
}

fn stored_result(exam: &Exam, row: &StudentExam, total_questions: i64) -> ExamResult {
    ExamResult {
        exam_id: exam.id.clone(),
        exam_title: exam.title.clone(),
        score: row.score,
        total_questions,
        taken_exam: row.taken_exam,
        start_time: row.start_time,
        end_time: row.end_time,
    }
}

/// Question at `index`, or the result once the exam is taken or the cursor
/// leaves `[0, total)`.
pub(crate) async fn fetch_question(
    pool: &PgPool,
    student_id: &str,
    exam_id: &str,
    index: i64,
) -> Result<SessionStep, SessionError> {
    let aggregate = repositories::exams::load_aggregate(pool, exam_id)
        .await?
        .ok_or(SessionError::ExamNotFound)?;
    published(&aggregate.exam)?;

    let total = aggregate.questions.len();
    if let Some(row) = repositories::student_exams::find(pool, student_id, exam_id).await? {
        if row.taken_exam {
            return Ok(SessionStep::Result(stored_result(&aggregate.exam, &row, total as i64)));
        }
    }
    if repositories::exam_bans::is_banned(pool, student_id, exam_id).await? {
        return Err(SessionError::Banned);
    }

    let position = usize::try_from(index).ok().filter(|position| *position < total);
    let Some(position) = position else {
        let result = finalize_result(pool, student_id, exam_id).await?;
        return Ok(SessionStep::Result(result));
    };

    let attempts =
        repositories::attempts::list_for_student_exam(pool, student_id, exam_id).await?;
    let nav = navigation(&aggregate, &attempts);
    let entry = &aggregate.questions[position];
    let current = attempts.iter().find(|attempt| attempt.question_id == entry.question.id);

    Ok(SessionStep::Question(QuestionView {
        exam_id: aggregate.exam.id.clone(),
        exam_title: aggregate.exam.title.clone(),
        question_id: entry.question.id.clone(),
        question_text: entry.question.question_text.clone(),
        image_path: entry.question.image_path.clone(),
        mark_weight: entry.question.mark_weight,
        choices: entry
            .choices
            .iter()
            .map(|choice| ChoiceView { id: choice.id.clone(), text: choice.choice_text.clone() })
            .collect(),
        selected_choice_id: current.and_then(|attempt| attempt.choice_id.clone()),
        flagged: current.is_some_and(|attempt| attempt.is_flagged),
        index: position,
        total,
        answered_indices: nav.answered,
        flagged_indices: nav.flagged,
        duration_minutes: aggregate.exam.duration_minutes,
    }))
}

/// Checks the access code, then behaves like fetching the first question.
pub(crate) async fn enter_exam(
    pool: &PgPool,
    student_id: &str,
    exam_id: &str,
    access_code: &str,
) -> Result<SessionStep, SessionError> {
    let exam = repositories::exams::find_by_id(pool, exam_id)
        .await?
        .ok_or(SessionError::ExamNotFound)?;
    published(&exam)?;

    let code_ok = exam
        .access_code
        .as_deref()
        .is_some_and(|expected| access_codes::code_matches(expected, access_code));
    if !code_ok {
        tracing::warn!(
            student_id = %student_id,
            exam_id = %exam_id,
            action = "exam_enter_rejected",
            "Access code mismatch"
        );
        return Err(SessionError::InvalidAccessCode);
    }

    tracing::info!(student_id = %student_id, exam_id = %exam_id, action = "exam_entered", "Exam entered");
    fetch_question(pool, student_id, exam_id, 0).await
}

/// Upserts the single attempt row for (student, exam, question).
///
/// A missing, `"0"` or unknown choice id is stored as unanswered and scored
/// incorrect. The choice is not checked against the question.
pub(crate) async fn submit_answer(
    pool: &PgPool,
    answer: SubmitAnswer<'_>,
) -> Result<SubmitOutcome, SessionError> {
    let exam = repositories::exams::find_by_id(pool, answer.exam_id)
        .await?
        .ok_or(SessionError::ExamNotFound)?;
    published(&exam)?;

    if let Some(row) =
        repositories::student_exams::find(pool, answer.student_id, answer.exam_id).await?
    {
        if row.taken_exam {
            return Err(SessionError::AlreadyTaken);
        }
    }
    if repositories::exam_bans::is_banned(pool, answer.student_id, answer.exam_id).await? {
        return Err(SessionError::Banned);
    }

    let question = repositories::questions::find_by_id(pool, answer.question_id)
        .await?
        .filter(|question| question.exam_id == answer.exam_id)
        .ok_or(SessionError::QuestionNotFound)?;

    let requested = answer.choice_id.map(str::trim).filter(|id| !id.is_empty() && *id != "0");
    let (choice_id, is_correct) = match requested {
        Some(id) => match repositories::choices::is_answer(pool, id).await? {
            Some(is_answer) => (Some(id), is_answer),
            None => (None, false),
        },
        None => (None, false),
    };

    repositories::attempts::upsert(
        pool,
        repositories::attempts::UpsertAttempt {
            id: &Uuid::new_v4().to_string(),
            student_id: answer.student_id,
            exam_id: answer.exam_id,
            question_id: &question.id,
            choice_id,
            is_correct,
            is_flagged: answer.flagged,
            now: primitive_now_utc(),
        },
    )
    .await?;

    metrics::counter!(ANSWERS_SUBMITTED_TOTAL, "correct" => is_correct.to_string()).increment(1);
    tracing::debug!(
        student_id = %answer.student_id,
        exam_id = %answer.exam_id,
        question_id = %question.id,
        flagged = answer.flagged,
        action = "answer_submitted",
        "Answer recorded"
    );

    Ok(SubmitOutcome { next_index: answer.next_index, is_correct })
}

/// Scores the exam as the number of correct attempts and upserts the
/// StudentExam row. Repeated calls never move `start_time`.
pub(crate) async fn finalize_result(
    pool: &PgPool,
    student_id: &str,
    exam_id: &str,
) -> Result<ExamResult, SessionError> {
    let mut tx = pool.begin().await?;

    let exam = repositories::exams::find_by_id(&mut *tx, exam_id)
        .await?
        .ok_or(SessionError::ExamNotFound)?;
    published(&exam)?;
    if repositories::exam_bans::is_banned(&mut *tx, student_id, exam_id).await? {
        return Err(SessionError::Banned);
    }

    let correct = repositories::attempts::count_correct(&mut *tx, student_id, exam_id).await?;
    let total_questions = repositories::questions::count_by_exam(&mut *tx, exam_id).await?;
    let row = repositories::student_exams::upsert_finalized(
        &mut *tx,
        &Uuid::new_v4().to_string(),
        student_id,
        exam_id,
        correct as f64,
        primitive_now_utc(),
    )
    .await?;
    tx.commit().await?;

    metrics::counter!(EXAM_FINALIZED_TOTAL).increment(1);
    tracing::info!(
        student_id = %student_id,
        exam_id = %exam_id,
        score = row.score,
        total_questions,
        action = "exam_finalized",
        "Exam result finalized"
    );

    Ok(stored_result(&exam, &row, total_questions))
}

/// Completed exams, most recently finished first.
pub(crate) async fn history(pool: &PgPool, student_id: &str) -> Result<Vec<ExamResult>, SessionError> {
    let rows = repositories::student_exams::history(pool, student_id).await?;
    Ok(rows
        .into_iter()
        .map(|row| ExamResult {
            exam_id: row.exam_id,
            exam_title: row.exam_title,
            score: row.score,
            total_questions: row.total_questions,
            taken_exam: true,
            start_time: row.start_time,
            end_time: row.end_time,
        })
        .collect())
}

/// Result for the exam the student touched last: the stored result with the
/// newest start time, else the exam of the newest attempt, finalized now.
pub(crate) async fn latest_result(
    pool: &PgPool,
    student_id: &str,
) -> Result<ExamResult, SessionError> {
    if let Some(row) = repositories::student_exams::latest_by_start(pool, student_id).await? {
        let exam = repositories::exams::find_by_id(pool, &row.exam_id)
            .await?
            .ok_or(SessionError::ExamNotFound)?;
        let total_questions = repositories::questions::count_by_exam(pool, &exam.id).await?;
        return Ok(stored_result(&exam, &row, total_questions));
    }

    let exam_id = repositories::attempts::latest_exam_id(pool, student_id)
        .await?
        .ok_or(SessionError::NoResults)?;
    finalize_result(pool, student_id, &exam_id).await
}

pub(crate) async fn available_exams(
    pool: &PgPool,
    student_id: &str,
) -> Result<Vec<Exam>, SessionError> {
    Ok(repositories::exams::list_available_for_student(pool, student_id).await?)
}

/// Ban state of one student for one exam after a coordinator update.
#[derive(Debug, Clone)]
pub(crate) struct BanStatus {
    pub(crate) student_id: String,
    pub(crate) exam_id: String,
    pub(crate) banned: bool,
    pub(crate) taken_exam: bool,
}

/// Adds or lifts a ban. Results and attempts are left as they are.
pub(crate) async fn set_ban(
    pool: &PgPool,
    student_id: &str,
    exam_id: &str,
    banned: bool,
) -> Result<BanStatus, SessionError> {
    repositories::exams::find_by_id(pool, exam_id).await?.ok_or(SessionError::ExamNotFound)?;
    repositories::students::find_by_id(pool, student_id)
        .await?
        .ok_or(SessionError::StudentNotFound)?;

    if banned {
        repositories::exam_bans::insert(pool, student_id, exam_id, primitive_now_utc()).await?;
    } else {
        repositories::exam_bans::delete(pool, student_id, exam_id).await?;
    }
    let taken_exam = repositories::student_exams::find(pool, student_id, exam_id)
        .await?
        .is_some_and(|row| row.taken_exam);

    tracing::info!(
        student_id = %student_id,
        exam_id = %exam_id,
        banned,
        action = "exam_ban_updated",
        "Exam ban updated"
    );
    Ok(BanStatus {
        student_id: student_id.to_string(),
        exam_id: exam_id.to_string(),
        banned,
        taken_exam,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    fn expect_question(step: SessionStep) -> QuestionView {
        match step {
            SessionStep::Question(view) => view,
            SessionStep::Result(result) => panic!("expected question, got result {result:?}"),
        }
    }

    fn expect_result(step: SessionStep) -> ExamResult {
        match step {
            SessionStep::Result(result) => result,
            SessionStep::Question(view) => panic!("expected result, got question {}", view.index),
        }
    }

    #[tokio::test]
    async fn resubmitting_keeps_one_attempt_with_last_choice() {
        let ctx = test_support::setup_test_context().await;
        let pool = ctx.state.db();
        let coordinator = test_support::insert_coordinator(pool, "coord").await;
        let student = test_support::insert_student(pool, "Abebe Kebede", "UGR/1234/15").await;
        let exam = test_support::insert_exam(pool, &coordinator.id, "Geography").await;
        let question = test_support::insert_question_with_choices(
            pool,
            &exam.id,
            "Capital of France?",
            &[("Paris", true), ("London", false)],
        )
        .await;

        for (choice, flagged) in [(&question.choices[1], true), (&question.choices[0], false)] {
            submit_answer(
                pool,
                SubmitAnswer {
                    student_id: &student.id,
                    exam_id: &exam.id,
                    question_id: &question.question.id,
                    choice_id: Some(&choice.id),
                    flagged,
                    next_index: 1,
                },
            )
            .await
            .expect("submit");
        }

        let attempts = repositories::attempts::list_for_student_exam(pool, &student.id, &exam.id)
            .await
            .expect("attempts");
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].choice_id.as_deref(), Some(question.choices[0].id.as_str()));
        assert!(attempts[0].is_correct);
        assert!(!attempts[0].is_flagged);
    }

    #[tokio::test]
    async fn two_question_example_scores_one() {
        let ctx = test_support::setup_test_context().await;
        let pool = ctx.state.db();
        let coordinator = test_support::insert_coordinator(pool, "coord").await;
        let student = test_support::insert_student(pool, "Abebe Kebede", "UGR/1234/15").await;
        let exam = test_support::insert_exam(pool, &coordinator.id, "Geography").await;
        let first = test_support::insert_question_with_choices(
            pool,
            &exam.id,
            "Capital of France?",
            &[("Paris", true), ("London", false)],
        )
        .await;
        let second = test_support::insert_question_with_choices(
            pool,
            &exam.id,
            "Capital of Kenya?",
            &[("Nairobi", true), ("Mombasa", false)],
        )
        .await;

        let outcome = submit_answer(
            pool,
            SubmitAnswer {
                student_id: &student.id,
                exam_id: &exam.id,
                question_id: &first.question.id,
                choice_id: Some(&first.choices[0].id),
                flagged: false,
                next_index: 1,
            },
        )
        .await
        .expect("first");
        assert!(outcome.is_correct);
        assert_eq!(outcome.next_index, 1);

        submit_answer(
            pool,
            SubmitAnswer {
                student_id: &student.id,
                exam_id: &exam.id,
                question_id: &second.question.id,
                choice_id: None,
                flagged: true,
                next_index: 2,
            },
        )
        .await
        .expect("second");

        let view = expect_question(fetch_question(pool, &student.id, &exam.id, 1).await.expect("q2"));
        assert_eq!(view.answered_indices, vec![0]);
        assert_eq!(view.flagged_indices, vec![1]);
        assert!(view.flagged);
        assert_eq!(view.selected_choice_id, None);
        assert_eq!(view.total, 2);

        let result = finalize_result(pool, &student.id, &exam.id).await.expect("finalize");
        assert_eq!(result.score, 1.0);
        assert_eq!(result.total_questions, 2);
        assert!(result.taken_exam);
    }

    #[tokio::test]
    async fn finalize_is_idempotent_and_keeps_start_time() {
        let ctx = test_support::setup_test_context().await;
        let pool = ctx.state.db();
        let coordinator = test_support::insert_coordinator(pool, "coord").await;
        let student = test_support::insert_student(pool, "Abebe Kebede", "UGR/1234/15").await;
        let exam = test_support::insert_exam(pool, &coordinator.id, "Geography").await;

        let first = finalize_result(pool, &student.id, &exam.id).await.expect("first");
        let second = finalize_result(pool, &student.id, &exam.id).await.expect("second");
        let third = finalize_result(pool, &student.id, &exam.id).await.expect("third");

        assert_eq!(first.start_time, second.start_time);
        assert_eq!(first.start_time, third.start_time);
        assert_eq!(third.score, 0.0);

        let rows: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM student_exams WHERE student_id = $1 AND exam_id = $2",
        )
        .bind(&student.id)
        .bind(&exam.id)
        .fetch_one(pool)
        .await
        .expect("count");
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn empty_exam_finalizes_immediately_and_taken_always_redirects() {
        let ctx = test_support::setup_test_context().await;
        let pool = ctx.state.db();
        let coordinator = test_support::insert_coordinator(pool, "coord").await;
        let student = test_support::insert_student(pool, "Abebe Kebede", "UGR/1234/15").await;
        let exam = test_support::insert_exam(pool, &coordinator.id, "Empty").await;

        let result = expect_result(fetch_question(pool, &student.id, &exam.id, 0).await.expect("fetch"));
        assert_eq!(result.score, 0.0);
        assert!(result.taken_exam);

        test_support::insert_question_with_choices(pool, &exam.id, "Late question", &[("a", true)])
            .await;
        for index in [-1, 0, 1, 42] {
            let step = fetch_question(pool, &student.id, &exam.id, index).await.expect("fetch");
            expect_result(step);
        }

        let err = submit_answer(
            pool,
            SubmitAnswer {
                student_id: &student.id,
                exam_id: &exam.id,
                question_id: "anything",
                choice_id: None,
                flagged: false,
                next_index: 0,
            },
        )
        .await
        .expect_err("taken");
        assert!(matches!(err, SessionError::AlreadyTaken));
    }

    #[tokio::test]
    async fn unknown_or_zero_choice_is_stored_as_unanswered() {
        let ctx = test_support::setup_test_context().await;
        let pool = ctx.state.db();
        let coordinator = test_support::insert_coordinator(pool, "coord").await;
        let student = test_support::insert_student(pool, "Abebe Kebede", "UGR/1234/15").await;
        let exam = test_support::insert_exam(pool, &coordinator.id, "Geography").await;
        let question =
            test_support::insert_question_with_choices(pool, &exam.id, "Q", &[("a", true)]).await;

        for choice in ["0", "missing-choice"] {
            let outcome = submit_answer(
                pool,
                SubmitAnswer {
                    student_id: &student.id,
                    exam_id: &exam.id,
                    question_id: &question.question.id,
                    choice_id: Some(choice),
                    flagged: false,
                    next_index: 1,
                },
            )
            .await
            .expect("submit");
            assert!(!outcome.is_correct);
        }

        let attempts = repositories::attempts::list_for_student_exam(pool, &student.id, &exam.id)
            .await
            .expect("attempts");
        assert_eq!(attempts[0].choice_id, None);
    }

    #[tokio::test]
    async fn enter_checks_code_and_ban_blocks_session() {
        let ctx = test_support::setup_test_context().await;
        let pool = ctx.state.db();
        let coordinator = test_support::insert_coordinator(pool, "coord").await;
        let student = test_support::insert_student(pool, "Abebe Kebede", "UGR/1234/15").await;
        let exam = test_support::insert_exam(pool, &coordinator.id, "Geography").await;
        test_support::insert_question_with_choices(pool, &exam.id, "Q", &[("a", true)]).await;
        let code = exam.access_code.clone().expect("code");

        let err = enter_exam(pool, &student.id, &exam.id, "WRONG-CODE").await.expect_err("bad code");
        assert!(matches!(err, SessionError::InvalidAccessCode));

        let view = expect_question(
            enter_exam(pool, &student.id, &exam.id, &code.to_lowercase()).await.expect("enter"),
        );
        assert_eq!(view.index, 0);

        set_ban(pool, &student.id, &exam.id, true).await.expect("ban");
        let err = fetch_question(pool, &student.id, &exam.id, 0).await.expect_err("banned");
        assert!(matches!(err, SessionError::Banned));
        assert!(matches!(latest_result(pool, &student.id).await, Err(SessionError::NoResults)));
    }

    #[tokio::test]
    async fn history_and_latest_follow_completed_exams() {
        let ctx = test_support::setup_test_context().await;
        let pool = ctx.state.db();
        let coordinator = test_support::insert_coordinator(pool, "coord").await;
        let student = test_support::insert_student(pool, "Abebe Kebede", "UGR/1234/15").await;
        let older = test_support::insert_exam(pool, &coordinator.id, "Older").await;
        let newer = test_support::insert_exam(pool, &coordinator.id, "Newer").await;

        assert!(matches!(latest_result(pool, &student.id).await, Err(SessionError::NoResults)));

        finalize_result(pool, &student.id, &older.id).await.expect("older");
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        finalize_result(pool, &student.id, &newer.id).await.expect("newer");

        let results = history(pool, &student.id).await.expect("history");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].exam_title, "Newer");

        let latest = latest_result(pool, &student.id).await.expect("latest");
        assert_eq!(latest.exam_id, newer.id);

        let available = available_exams(pool, &student.id).await.expect("available");
        assert!(available.is_empty());
    }

    #[tokio::test]
    async fn lifted_ban_leaves_untouched_exam_takeable() {
        let ctx = test_support::setup_test_context().await;
        let pool = ctx.state.db();
        let coordinator = test_support::insert_coordinator(pool, "coord").await;
        let student = test_support::insert_student(pool, "Abebe Kebede", "UGR/1234/15").await;
        let taken = test_support::insert_exam(pool, &coordinator.id, "Taken").await;
        let untouched = test_support::insert_exam(pool, &coordinator.id, "Untouched").await;
        test_support::insert_question_with_choices(pool, &untouched.id, "Q", &[("a", true)]).await;

        finalize_result(pool, &student.id, &taken.id).await.expect("finalize");
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let status = set_ban(pool, &student.id, &untouched.id, true).await.expect("ban");
        assert!(status.banned);
        assert!(!status.taken_exam);
        let status = set_ban(pool, &student.id, &untouched.id, false).await.expect("unban");
        assert!(!status.banned);

        let latest = latest_result(pool, &student.id).await.expect("latest");
        assert_eq!(latest.exam_id, taken.id);

        let row = repositories::student_exams::find(pool, &student.id, &untouched.id)
            .await
            .expect("lookup");
        assert!(row.is_none());
        let view =
            expect_question(fetch_question(pool, &student.id, &untouched.id, 0).await.expect("fetch"));
        assert_eq!(view.index, 0);
    }

    #[tokio::test]
    async fn ban_after_completion_still_shows_result() {
        let ctx = test_support::setup_test_context().await;
        let pool = ctx.state.db();
        let coordinator = test_support::insert_coordinator(pool, "coord").await;
        let student = test_support::insert_student(pool, "Abebe Kebede", "UGR/1234/15").await;
        let exam = test_support::insert_exam(pool, &coordinator.id, "Geography").await;
        test_support::insert_question_with_choices(pool, &exam.id, "Q", &[("a", true)]).await;

        finalize_result(pool, &student.id, &exam.id).await.expect("finalize");
        let status = set_ban(pool, &student.id, &exam.id, true).await.expect("ban");
        assert!(status.taken_exam);

        let result = expect_result(fetch_question(pool, &student.id, &exam.id, 0).await.expect("fetch"));
        assert!(result.taken_exam);
        assert_eq!(result.exam_id, exam.id);
    }

    #[tokio::test]
    async fn unpublished_exam_cannot_be_finalized() {
        let ctx = test_support::setup_test_context().await;
        let pool = ctx.state.db();
        let coordinator = test_support::insert_coordinator(pool, "coord").await;
        let student = test_support::insert_student(pool, "Abebe Kebede", "UGR/1234/15").await;
        let draft = repositories::exams::create(
            pool,
            repositories::exams::CreateExam {
                id: &Uuid::new_v4().to_string(),
                title: "Draft",
                description: None,
                academic_year: 2024,
                duration_minutes: 30,
                default_mark: 1.0,
                created_by: &coordinator.id,
                now: primitive_now_utc(),
            },
        )
        .await
        .expect("draft exam");

        let err = finalize_result(pool, &student.id, &draft.id).await.expect_err("draft");
        assert!(matches!(err, SessionError::ExamNotPublished));
        let row = repositories::student_exams::find(pool, &student.id, &draft.id)
            .await
            .expect("lookup");
        assert!(row.is_none());
    }
}
