use quiz_core::model::{CourseId, Difficulty, Question, Quiz, QuizId, UserId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{conn, expect_affected, from_json, ser, to_json, write_err};
use crate::repository::{QuizRepository, StorageError};

const SELECT_QUIZZES: &str =
    "SELECT id, course_id, title, difficulty, created_by, questions, created_at FROM quizzes";

fn quiz_from_row(row: &SqliteRow) -> Result<Quiz, StorageError> {
    let difficulty: Difficulty = row
        .try_get::<String, _>("difficulty")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let questions: Vec<Question> =
        from_json("questions", &row.try_get::<String, _>("questions").map_err(ser)?)?;
    Quiz::new(
        QuizId::new(row.try_get::<String, _>("id").map_err(ser)?),
        CourseId::new(row.try_get::<String, _>("course_id").map_err(ser)?),
        row.try_get::<String, _>("title").map_err(ser)?,
        questions,
        difficulty,
        UserId::new(row.try_get::<String, _>("created_by").map_err(ser)?),
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
    async fn list_quizzes(&self) -> Result<Vec<Quiz>, StorageError> {
        let rows = sqlx::query(&format!("{SELECT_QUIZZES} ORDER BY seq ASC"))
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
        rows.iter().map(quiz_from_row).collect()
    }

    async fn list_quizzes_for_course(
        &self,
        course_id: &CourseId,
    ) -> Result<Vec<Quiz>, StorageError> {
        let rows = sqlx::query(&format!(
            "{SELECT_QUIZZES} WHERE course_id = ?1 ORDER BY seq ASC"
        ))
        .bind(course_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        rows.iter().map(quiz_from_row).collect()
    }

    async fn get_quiz(&self, id: &QuizId) -> Result<Option<Quiz>, StorageError> {
        let row = sqlx::query(&format!("{SELECT_QUIZZES} WHERE id = ?1"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        row.as_ref().map(quiz_from_row).transpose()
    }

    async fn insert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO quizzes (id, course_id, title, difficulty, created_by, questions, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(quiz.id().as_str())
        .bind(quiz.course_id().as_str())
        .bind(quiz.title())
        .bind(quiz.difficulty().as_str())
        .bind(quiz.created_by().as_str())
        .bind(to_json(&quiz.questions())?)
        .bind(quiz.created_at())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(())
    }

    async fn update_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE quizzes
            SET course_id = ?2, title = ?3, difficulty = ?4, created_by = ?5, questions = ?6
            WHERE id = ?1
            ",
        )
        .bind(quiz.id().as_str())
        .bind(quiz.course_id().as_str())
        .bind(quiz.title())
        .bind(quiz.difficulty().as_str())
        .bind(quiz.created_by().as_str())
        .bind(to_json(&quiz.questions())?)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        expect_affected(res.rows_affected())
    }

    async fn delete_quiz(&self, id: &QuizId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM quizzes WHERE id = ?1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        expect_affected(res.rows_affected())
    }
}
