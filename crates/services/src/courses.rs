use std::sync::Arc;

use quiz_core::model::{Course, CourseId, Difficulty, UserId, parse_topics};
use storage::repository::CourseRepository;

use crate::Clock;
use crate::error::CourseServiceError;

/// Input for [`CourseService::create_course`]. `topics` is a comma-separated list.
#[derive(Debug, Clone)]
pub struct NewCourse {
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub topics: String,
}

/// Mentor-side course authoring and lookup.
#[derive(Clone)]
pub struct CourseService {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
}

impl CourseService {
    #[must_use]
    pub fn new(clock: Clock, courses: Arc<dyn CourseRepository>) -> Self {
        Self { clock, courses }
    }

    /// Create a course owned by `mentor_id`.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::Course` for a blank title and
    /// `CourseServiceError::Storage` if persistence fails.
    pub async fn create_course(
        &self,
        mentor_id: &UserId,
        input: NewCourse,
    ) -> Result<Course, CourseServiceError> {
        let course = Course::new(
            CourseId::generate(),
            input.title,
            input.description,
            input.difficulty,
            mentor_id.clone(),
            parse_topics(&input.topics),
            self.clock.now(),
        )?;
        self.courses.insert_course(&course).await?;
        tracing::info!(course = %course.id(), mentor = %mentor_id, "course created");
        Ok(course)
    }

    /// # Errors
    ///
    /// Returns `CourseServiceError::Storage` if repository access fails.
    pub async fn list_courses(&self) -> Result<Vec<Course>, CourseServiceError> {
        Ok(self.courses.list_courses().await?)
    }

    /// Courses owned by one mentor, in creation order.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::Storage` if repository access fails.
    pub async fn list_for_mentor(
        &self,
        mentor_id: &UserId,
    ) -> Result<Vec<Course>, CourseServiceError> {
        let mut courses = self.courses.list_courses().await?;
        courses.retain(|c| c.mentor_id() == mentor_id);
        Ok(courses)
    }

    /// # Errors
    ///
    /// Returns `CourseServiceError::NotFound` for an unknown id and
    /// `CourseServiceError::Storage` if repository access fails.
    pub async fn get_course(&self, id: &CourseId) -> Result<Course, CourseServiceError> {
        self.courses
            .get_course(id)
            .await?
            .ok_or_else(|| CourseServiceError::NotFound(id.clone()))
    }
}
