use std::collections::HashMap;
use std::sync::Arc;

use quiz_core::model::{
    CourseId, Difficulty, Question, QuestionDraft, QuestionId, Quiz, QuizId, UserId,
};
use storage::repository::{CourseRepository, QuizRepository};

use crate::Clock;
use crate::error::QuizServiceError;
use crate::generation::QuestionGenerator;

/// Input for [`QuizService::create_quiz`]. Each draft gets a fresh id.
#[derive(Debug, Clone)]
pub struct NewQuiz {
    pub course_id: CourseId,
    pub title: String,
    pub difficulty: Difficulty,
    pub questions: Vec<QuestionDraft>,
}

/// A quiz listed alongside the title of its course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub quiz: Quiz,
    pub course_title: String,
}

/// Student-side catalog filter. An empty search matches everything.
#[derive(Debug, Clone, Default)]
pub struct CatalogFilter {
    pub search: String,
    pub difficulty: Option<Difficulty>,
}

impl CatalogFilter {
    fn matches(&self, entry: &CatalogEntry) -> bool {
        let needle = self.search.trim().to_lowercase();
        let text_ok = needle.is_empty()
            || entry.quiz.title().to_lowercase().contains(&needle)
            || entry.course_title.to_lowercase().contains(&needle);
        let difficulty_ok = self
            .difficulty
            .is_none_or(|wanted| entry.quiz.difficulty() == wanted);
        text_ok && difficulty_ok
    }
}

/// Title given to a generated quiz, e.g. `"Closures Quiz (Intermediate)"`.
#[must_use]
pub fn generated_title(topic: &str, difficulty: Difficulty) -> String {
    format!("{} Quiz ({difficulty})", topic.trim())
}

/// Quiz authoring, lookup and the student catalog.
#[derive(Clone)]
pub struct QuizService {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
    quizzes: Arc<dyn QuizRepository>,
    generator: Arc<dyn QuestionGenerator>,
}

impl QuizService {
    #[must_use]
    pub fn new(
        clock: Clock,
        courses: Arc<dyn CourseRepository>,
        quizzes: Arc<dyn QuizRepository>,
        generator: Arc<dyn QuestionGenerator>,
    ) -> Self {
        Self {
            clock,
            courses,
            quizzes,
            generator,
        }
    }

    async fn persist(
        &self,
        author: &UserId,
        course_id: CourseId,
        title: String,
        difficulty: Difficulty,
        questions: Vec<Question>,
    ) -> Result<Quiz, QuizServiceError> {
        if self.courses.get_course(&course_id).await?.is_none() {
            return Err(QuizServiceError::CourseNotFound(course_id));
        }
        let quiz = Quiz::new(
            QuizId::generate(),
            course_id,
            title,
            questions,
            difficulty,
            author.clone(),
            self.clock.now(),
        )?;
        self.quizzes.insert_quiz(&quiz).await?;
        tracing::info!(
            quiz = %quiz.id(),
            course = %quiz.course_id(),
            questions = quiz.questions().len(),
            "quiz created"
        );
        Ok(quiz)
    }

    /// Validate and store an authored quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Question` or `QuizServiceError::Quiz` for
    /// invalid content, `QuizServiceError::CourseNotFound` for an unknown
    /// course, and `QuizServiceError::Storage` if persistence fails.
    pub async fn create_quiz(
        &self,
        author: &UserId,
        input: NewQuiz,
    ) -> Result<Quiz, QuizServiceError> {
        let questions = input
            .questions
            .into_iter()
            .map(|draft| draft.validate(QuestionId::generate()))
            .collect::<Result<Vec<_>, _>>()?;
        self.persist(
            author,
            input.course_id,
            input.title,
            input.difficulty,
            questions,
        )
        .await
    }

    /// Ask the generator for questions and store them as a new quiz titled
    /// `"{topic} Quiz ({difficulty})"`. Nothing is stored when generation fails.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Generation` when the generator fails or
    /// rejects the input, otherwise as [`QuizService::create_quiz`].
    pub async fn generate_quiz(
        &self,
        author: &UserId,
        course_id: CourseId,
        topic: &str,
        difficulty: Difficulty,
        count: u32,
    ) -> Result<Quiz, QuizServiceError> {
        if self.courses.get_course(&course_id).await?.is_none() {
            return Err(QuizServiceError::CourseNotFound(course_id));
        }
        let questions = self.generator.generate(topic, difficulty, count).await?;
        self.persist(
            author,
            course_id,
            generated_title(topic, difficulty),
            difficulty,
            questions,
        )
        .await
    }

    /// # Errors
    ///
    /// Returns `QuizServiceError::NotFound` for an unknown id and
    /// `QuizServiceError::Storage` if repository access fails.
    pub async fn get_quiz(&self, id: &QuizId) -> Result<Quiz, QuizServiceError> {
        self.quizzes
            .get_quiz(id)
            .await?
            .ok_or_else(|| QuizServiceError::NotFound(id.clone()))
    }

    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` if repository access fails.
    pub async fn list_for_course(&self, course_id: &CourseId) -> Result<Vec<Quiz>, QuizServiceError> {
        Ok(self.quizzes.list_quizzes_for_course(course_id).await?)
    }

    /// Quizzes grouped by course order, each with its course title. Quizzes
    /// whose course no longer exists are left out.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` if repository access fails.
    pub async fn catalog(&self, filter: &CatalogFilter) -> Result<Vec<CatalogEntry>, QuizServiceError> {
        let courses = self.courses.list_courses().await?;
        let quizzes = self.quizzes.list_quizzes().await?;

        let mut by_course: HashMap<CourseId, Vec<Quiz>> = HashMap::new();
        for quiz in quizzes {
            by_course.entry(quiz.course_id().clone()).or_default().push(quiz);
        }

        Ok(courses
            .iter()
            .flat_map(|course| {
                by_course
                    .remove(course.id())
                    .unwrap_or_default()
                    .into_iter()
                    .map(move |quiz| CatalogEntry {
                        quiz,
                        course_title: course.title().to_owned(),
                    })
            })
            .filter(|entry| filter.matches(entry))
            .collect())
    }
}
