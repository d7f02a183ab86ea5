use quiz_core::model::{Course, CourseId, Difficulty, UserId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{conn, expect_affected, from_json, ser, to_json, write_err};
use crate::repository::{CourseRepository, StorageError};

const SELECT_COURSES: &str =
    "SELECT id, title, description, difficulty, mentor_id, topics, created_at FROM courses";

fn course_from_row(row: &SqliteRow) -> Result<Course, StorageError> {
    let difficulty: Difficulty = row
        .try_get::<String, _>("difficulty")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let topics: Vec<String> = from_json("topics", &row.try_get::<String, _>("topics").map_err(ser)?)?;
    Course::new(
        CourseId::new(row.try_get::<String, _>("id").map_err(ser)?),
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<String, _>("description").map_err(ser)?,
        difficulty,
        UserId::new(row.try_get::<String, _>("mentor_id").map_err(ser)?),
        topics,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

#[async_trait::async_trait]
impl CourseRepository for SqliteRepository {
    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        let rows = sqlx::query(&format!("{SELECT_COURSES} ORDER BY seq ASC"))
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
        rows.iter().map(course_from_row).collect()
    }

    async fn get_course(&self, id: &CourseId) -> Result<Option<Course>, StorageError> {
        let row = sqlx::query(&format!("{SELECT_COURSES} WHERE id = ?1"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        row.as_ref().map(course_from_row).transpose()
    }

    async fn insert_course(&self, course: &Course) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO courses (id, title, description, difficulty, mentor_id, topics, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(course.id().as_str())
        .bind(course.title())
        .bind(course.description())
        .bind(course.difficulty().as_str())
        .bind(course.mentor_id().as_str())
        .bind(to_json(&course.topics())?)
        .bind(course.created_at())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(())
    }

    async fn update_course(&self, course: &Course) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE courses
            SET title = ?2, description = ?3, difficulty = ?4, mentor_id = ?5, topics = ?6
            WHERE id = ?1
            ",
        )
        .bind(course.id().as_str())
        .bind(course.title())
        .bind(course.description())
        .bind(course.difficulty().as_str())
        .bind(course.mentor_id().as_str())
        .bind(to_json(&course.topics())?)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        expect_affected(res.rows_affected())
    }

    async fn delete_course(&self, id: &CourseId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM courses WHERE id = ?1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        expect_affected(res.rows_affected())
    }
}
