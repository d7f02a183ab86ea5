use quiz_core::model::{AnswerSheet, AttemptId, QuizAttempt, QuizId, UserId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{conn, from_json, ser, to_json, u32_from_i64, write_err};
use crate::repository::{AttemptRepository, StorageError};

const SELECT_ATTEMPTS: &str =
    "SELECT id, quiz_id, student_id, answers, score, total_points, submitted_at FROM attempts";

fn attempt_from_row(row: &SqliteRow) -> Result<QuizAttempt, StorageError> {
    let answers: AnswerSheet =
        from_json("answers", &row.try_get::<String, _>("answers").map_err(ser)?)?;
    QuizAttempt::from_persisted(
        AttemptId::new(row.try_get::<String, _>("id").map_err(ser)?),
        QuizId::new(row.try_get::<String, _>("quiz_id").map_err(ser)?),
        UserId::new(row.try_get::<String, _>("student_id").map_err(ser)?),
        answers,
        u32_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?,
        u32_from_i64(
            "total_points",
            row.try_get::<i64, _>("total_points").map_err(ser)?,
        )?,
        row.try_get("submitted_at").map_err(ser)?,
    )
    .map_err(ser)
}

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn list_attempts(&self) -> Result<Vec<QuizAttempt>, StorageError> {
        let rows = sqlx::query(&format!("{SELECT_ATTEMPTS} ORDER BY seq ASC"))
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
        rows.iter().map(attempt_from_row).collect()
    }

    async fn list_attempts_for_student(
        &self,
        student_id: &UserId,
    ) -> Result<Vec<QuizAttempt>, StorageError> {
        let rows = sqlx::query(&format!(
            "{SELECT_ATTEMPTS} WHERE student_id = ?1 ORDER BY seq ASC"
        ))
        .bind(student_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        rows.iter().map(attempt_from_row).collect()
    }

    async fn get_attempt(&self, id: &AttemptId) -> Result<Option<QuizAttempt>, StorageError> {
        let row = sqlx::query(&format!("{SELECT_ATTEMPTS} WHERE id = ?1"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        row.as_ref().map(attempt_from_row).transpose()
    }

    async fn insert_attempt(&self, attempt: &QuizAttempt) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO attempts (id, quiz_id, student_id, answers, score, total_points, submitted_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(attempt.id().as_str())
        .bind(attempt.quiz_id().as_str())
        .bind(attempt.student_id().as_str())
        .bind(to_json(attempt.answers())?)
        .bind(i64::from(attempt.score()))
        .bind(i64::from(attempt.total_points()))
        .bind(attempt.submitted_at())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(())
    }
}
