//! Read-only summaries over courses, quizzes, attempts and identities.
//!
//! Every summary is computed from whole collections loaded once and joined in
//! memory. Dangling references are tolerated: a missing owner or student is
//! reported as [`UNKNOWN`], a missing quiz title as [`UNTITLED_QUIZ`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use quiz_core::model::{
    AttemptId, Course, CourseId, Identity, Quiz, QuizAttempt, QuizId, Role, UserId,
};
use quiz_core::scoring::round_percent;
use storage::repository::{
    AttemptRepository, CourseRepository, IdentityRepository, QuizRepository,
};

use crate::error::AnalyticsError;

pub const UNKNOWN: &str = "Unknown";
pub const UNTITLED_QUIZ: &str = "Quiz";

const RECENT_ATTEMPTS: usize = 3;
const RECOMMENDED_QUIZZES: usize = 3;
const PROGRESS_WINDOW: usize = 10;

/// Mean of each attempt's percentage, rounded; `None` when there are no
/// attempts.
#[must_use]
pub fn average_percent<'a>(attempts: impl IntoIterator<Item = &'a QuizAttempt>) -> Option<u32> {
    let (sum, count) = attempts
        .into_iter()
        .fold((0.0_f64, 0_u32), |(sum, count), a| (sum + a.percent(), count + 1));
    (count > 0).then(|| round_percent(sum / f64::from(count)))
}

/// Renders an optional average the way the dashboards show it.
#[must_use]
pub fn percent_label(average: Option<u32>) -> String {
    average.map_or_else(|| "N/A".to_owned(), |p| format!("{p}%"))
}

fn names_by_id(identities: &[Identity]) -> HashMap<&UserId, &str> {
    identities.iter().map(|i| (i.id(), i.name())).collect()
}

fn name_or_unknown(names: &HashMap<&UserId, &str>, id: &UserId) -> String {
    match names.get(id) {
        Some(name) => (*name).to_owned(),
        None => {
            tracing::warn!(user = %id, "dangling user reference");
            UNKNOWN.to_owned()
        }
    }
}

//
// ─── COURSES ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseSummary {
    pub course: Course,
    pub owner_name: String,
    pub quiz_count: usize,
    pub attempt_count: usize,
    pub average_score_percent: Option<u32>,
}

/// One row per course, most attempted first; ties keep course order.
#[must_use]
pub fn course_summaries(
    courses: &[Course],
    quizzes: &[Quiz],
    attempts: &[QuizAttempt],
    identities: &[Identity],
) -> Vec<CourseSummary> {
    let names = names_by_id(identities);
    let course_of_quiz: HashMap<&QuizId, &CourseId> =
        quizzes.iter().map(|q| (q.id(), q.course_id())).collect();

    let mut quiz_counts: HashMap<&CourseId, usize> = HashMap::new();
    for quiz in quizzes {
        *quiz_counts.entry(quiz.course_id()).or_default() += 1;
    }
    let mut attempts_by_course: HashMap<&CourseId, Vec<&QuizAttempt>> = HashMap::new();
    for attempt in attempts {
        if let Some(course_id) = course_of_quiz.get(attempt.quiz_id()) {
            attempts_by_course.entry(*course_id).or_default().push(attempt);
        }
    }

    let mut rows: Vec<CourseSummary> = courses
        .iter()
        .map(|course| {
            let course_attempts = attempts_by_course
                .get(course.id())
                .map(Vec::as_slice)
                .unwrap_or_default();
            CourseSummary {
                course: course.clone(),
                owner_name: name_or_unknown(&names, course.mentor_id()),
                quiz_count: quiz_counts.get(course.id()).copied().unwrap_or_default(),
                attempt_count: course_attempts.len(),
                average_score_percent: average_percent(course_attempts.iter().copied()),
            }
        })
        .collect();
    rows.sort_by(|a, b| b.attempt_count.cmp(&a.attempt_count));
    rows
}

//
// ─── MENTOR ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentSummary {
    pub student_id: UserId,
    pub student_name: String,
    pub attempts_count: usize,
    pub average_score_percent: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MentorOverview {
    pub course_count: usize,
    pub quiz_count: usize,
    pub attempt_count: usize,
    pub average_score_percent: Option<u32>,
}

/// Courses, quizzes and attempts that belong to one mentor's courses.
struct MentorScope<'a> {
    courses: Vec<&'a Course>,
    quiz_ids: HashSet<&'a QuizId>,
    attempts: Vec<&'a QuizAttempt>,
}

fn mentor_scope<'a>(
    mentor_id: &UserId,
    courses: &'a [Course],
    quizzes: &'a [Quiz],
    attempts: &'a [QuizAttempt],
) -> MentorScope<'a> {
    let courses: Vec<&Course> = courses
        .iter()
        .filter(|c| c.mentor_id() == mentor_id)
        .collect();
    let course_ids: HashSet<&CourseId> = courses.iter().map(|c| c.id()).collect();
    let quiz_ids: HashSet<&QuizId> = quizzes
        .iter()
        .filter(|q| course_ids.contains(q.course_id()))
        .map(Quiz::id)
        .collect();
    let attempts = attempts
        .iter()
        .filter(|a| quiz_ids.contains(a.quiz_id()))
        .collect();
    MentorScope {
        courses,
        quiz_ids,
        attempts,
    }
}

/// Per-student rows over attempts on the mentor's own quizzes, best average
/// first; ties keep the order students were first seen in.
#[must_use]
pub fn student_summaries(
    mentor_id: &UserId,
    courses: &[Course],
    quizzes: &[Quiz],
    attempts: &[QuizAttempt],
    identities: &[Identity],
) -> Vec<StudentSummary> {
    let scope = mentor_scope(mentor_id, courses, quizzes, attempts);
    let names = names_by_id(identities);

    let mut order: Vec<&UserId> = Vec::new();
    let mut grouped: HashMap<&UserId, Vec<&QuizAttempt>> = HashMap::new();
    for attempt in scope.attempts {
        let entry = grouped.entry(attempt.student_id()).or_default();
        if entry.is_empty() {
            order.push(attempt.student_id());
        }
        entry.push(attempt);
    }

    let mut rows: Vec<StudentSummary> = order
        .into_iter()
        .map(|student_id| {
            let mine = grouped.get(student_id).map(Vec::as_slice).unwrap_or_default();
            StudentSummary {
                student_id: student_id.clone(),
                student_name: name_or_unknown(&names, student_id),
                attempts_count: mine.len(),
                average_score_percent: average_percent(mine.iter().copied()).unwrap_or_default(),
            }
        })
        .collect();
    rows.sort_by(|a, b| b.average_score_percent.cmp(&a.average_score_percent));
    rows
}

#[must_use]
pub fn mentor_overview(
    mentor_id: &UserId,
    courses: &[Course],
    quizzes: &[Quiz],
    attempts: &[QuizAttempt],
) -> MentorOverview {
    let scope = mentor_scope(mentor_id, courses, quizzes, attempts);
    MentorOverview {
        course_count: scope.courses.len(),
        quiz_count: scope.quiz_ids.len(),
        attempt_count: scope.attempts.len(),
        average_score_percent: average_percent(scope.attempts.iter().copied()),
    }
}

//
// ─── ADMIN ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlatformOverview {
    pub users: usize,
    pub students: usize,
    pub mentors: usize,
    pub admins: usize,
    pub courses: usize,
    pub quizzes: usize,
    pub attempts: usize,
}

#[must_use]
pub fn platform_overview(
    identities: &[Identity],
    courses: &[Course],
    quizzes: &[Quiz],
    attempts: &[QuizAttempt],
) -> PlatformOverview {
    let count_role = |role: Role| identities.iter().filter(|i| i.role() == role).count();
    PlatformOverview {
        users: identities.len(),
        students: count_role(Role::Student),
        mentors: count_role(Role::Mentor),
        admins: count_role(Role::Admin),
        courses: courses.len(),
        quizzes: quizzes.len(),
        attempts: attempts.len(),
    }
}

//
// ─── STUDENT ───────────────────────────────────────────────────────────────────
//

/// An attempt joined with its quiz title.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRow {
    pub attempt_id: AttemptId,
    pub quiz_id: QuizId,
    pub quiz_title: String,
    pub score: u32,
    pub total_points: u32,
    pub percent: u32,
    pub submitted_at: DateTime<Utc>,
}

impl AttemptRow {
    fn new(attempt: &QuizAttempt, titles: &HashMap<&QuizId, &str>) -> Self {
        Self {
            attempt_id: attempt.id().clone(),
            quiz_id: attempt.quiz_id().clone(),
            quiz_title: titles
                .get(attempt.quiz_id())
                .map_or(UNTITLED_QUIZ, |t| *t)
                .to_owned(),
            score: attempt.score(),
            total_points: attempt.total_points(),
            percent: round_percent(attempt.percent()),
            submitted_at: attempt.submitted_at(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentDashboard {
    pub completed: usize,
    pub average_score_percent: Option<u32>,
    pub recent: Vec<AttemptRow>,
    pub recommended: Vec<Quiz>,
}

fn titles_by_id(quizzes: &[Quiz]) -> HashMap<&QuizId, &str> {
    quizzes.iter().map(|q| (q.id(), q.title())).collect()
}

/// `attempts` must already be limited to the student.
#[must_use]
pub fn student_dashboard(quizzes: &[Quiz], attempts: &[QuizAttempt]) -> StudentDashboard {
    let titles = titles_by_id(quizzes);

    let mut newest_first: Vec<&QuizAttempt> = attempts.iter().collect();
    newest_first.sort_by(|a, b| b.submitted_at().cmp(&a.submitted_at()));

    let attempted: HashSet<&QuizId> = attempts.iter().map(QuizAttempt::quiz_id).collect();
    StudentDashboard {
        completed: attempts.len(),
        average_score_percent: average_percent(attempts),
        recent: newest_first
            .into_iter()
            .take(RECENT_ATTEMPTS)
            .map(|a| AttemptRow::new(a, &titles))
            .collect(),
        recommended: quizzes
            .iter()
            .filter(|q| !attempted.contains(q.id()))
            .take(RECOMMENDED_QUIZZES)
            .cloned()
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StudentProgress {
    /// Every attempt, oldest first.
    pub history: Vec<AttemptRow>,
}

impl StudentProgress {
    /// The latest attempts shown on the progress chart, oldest first.
    #[must_use]
    pub fn chart(&self) -> &[AttemptRow] {
        let start = self.history.len().saturating_sub(PROGRESS_WINDOW);
        &self.history[start..]
    }
}

/// `attempts` must already be limited to the student.
#[must_use]
pub fn student_progress(quizzes: &[Quiz], attempts: &[QuizAttempt]) -> StudentProgress {
    let titles = titles_by_id(quizzes);
    let mut oldest_first: Vec<&QuizAttempt> = attempts.iter().collect();
    oldest_first.sort_by_key(|a| a.submitted_at());
    StudentProgress {
        history: oldest_first
            .into_iter()
            .map(|a| AttemptRow::new(a, &titles))
            .collect(),
    }
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Loads the collections a summary needs, one read each, and aggregates them.
#[derive(Clone)]
pub struct AnalyticsService {
    identities: Arc<dyn IdentityRepository>,
    courses: Arc<dyn CourseRepository>,
    quizzes: Arc<dyn QuizRepository>,
    attempts: Arc<dyn AttemptRepository>,
}

impl AnalyticsService {
    #[must_use]
    pub fn new(
        identities: Arc<dyn IdentityRepository>,
        courses: Arc<dyn CourseRepository>,
        quizzes: Arc<dyn QuizRepository>,
        attempts: Arc<dyn AttemptRepository>,
    ) -> Self {
        Self {
            identities,
            courses,
            quizzes,
            attempts,
        }
    }

    /// # Errors
    ///
    /// Returns `AnalyticsError::Storage` if any collection cannot be read.
    pub async fn course_summaries(&self) -> Result<Vec<CourseSummary>, AnalyticsError> {
        let courses = self.courses.list_courses().await?;
        let quizzes = self.quizzes.list_quizzes().await?;
        let attempts = self.attempts.list_attempts().await?;
        let identities = self.identities.list_identities().await?;
        Ok(course_summaries(&courses, &quizzes, &attempts, &identities))
    }

    /// # Errors
    ///
    /// Returns `AnalyticsError::Storage` if any collection cannot be read.
    pub async fn student_summaries(
        &self,
        mentor_id: &UserId,
    ) -> Result<Vec<StudentSummary>, AnalyticsError> {
        let courses = self.courses.list_courses().await?;
        let quizzes = self.quizzes.list_quizzes().await?;
        let attempts = self.attempts.list_attempts().await?;
        let identities = self.identities.list_identities().await?;
        Ok(student_summaries(
            mentor_id,
            &courses,
            &quizzes,
            &attempts,
            &identities,
        ))
    }

    /// # Errors
    ///
    /// Returns `AnalyticsError::Storage` if any collection cannot be read.
    pub async fn mentor_overview(
        &self,
        mentor_id: &UserId,
    ) -> Result<MentorOverview, AnalyticsError> {
        let courses = self.courses.list_courses().await?;
        let quizzes = self.quizzes.list_quizzes().await?;
        let attempts = self.attempts.list_attempts().await?;
        Ok(mentor_overview(mentor_id, &courses, &quizzes, &attempts))
    }

    /// # Errors
    ///
    /// Returns `AnalyticsError::Storage` if any collection cannot be read.
    pub async fn platform_overview(&self) -> Result<PlatformOverview, AnalyticsError> {
        let identities = self.identities.list_identities().await?;
        let courses = self.courses.list_courses().await?;
        let quizzes = self.quizzes.list_quizzes().await?;
        let attempts = self.attempts.list_attempts().await?;
        Ok(platform_overview(&identities, &courses, &quizzes, &attempts))
    }

    /// # Errors
    ///
    /// Returns `AnalyticsError::Storage` if any collection cannot be read.
    pub async fn student_dashboard(
        &self,
        student_id: &UserId,
    ) -> Result<StudentDashboard, AnalyticsError> {
        let quizzes = self.quizzes.list_quizzes().await?;
        let attempts = self.attempts.list_attempts_for_student(student_id).await?;
        Ok(student_dashboard(&quizzes, &attempts))
    }

    /// # Errors
    ///
    /// Returns `AnalyticsError::Storage` if any collection cannot be read.
    pub async fn student_progress(
        &self,
        student_id: &UserId,
    ) -> Result<StudentProgress, AnalyticsError> {
        let quizzes = self.quizzes.list_quizzes().await?;
        let attempts = self.attempts.list_attempts_for_student(student_id).await?;
        Ok(student_progress(&quizzes, &attempts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{AnswerSheet, Difficulty, Question, QuestionId};
    use quiz_core::scoring::ScoreCard;
    use quiz_core::time::fixed_now;

    fn user(id: &str, role: Role) -> Identity {
        Identity::new(
            UserId::new(id),
            format!("{id}@skillforge.com"),
            format!("Name {id}"),
            role,
            fixed_now(),
        )
        .unwrap()
    }

    fn course(id: &str, mentor: &str) -> Course {
        Course::new(
            CourseId::new(id),
            format!("Course {id}"),
            "",
            Difficulty::Beginner,
            UserId::new(mentor),
            Vec::new(),
            fixed_now(),
        )
        .unwrap()
    }

    fn quiz(id: &str, course: &str) -> Quiz {
        Quiz::new(
            QuizId::new(id),
            CourseId::new(course),
            format!("Quiz {id}"),
            vec![Question::short_answer(QuestionId::new("q1"), "?", "a", 10).unwrap()],
            Difficulty::Beginner,
            UserId::new("mentor"),
            fixed_now(),
        )
        .unwrap()
    }

    fn attempt(id: &str, quiz: &str, student: &str, score: u32, total: u32, minutes: i64) -> QuizAttempt {
        QuizAttempt::new(
            AttemptId::new(id),
            QuizId::new(quiz),
            UserId::new(student),
            AnswerSheet::new(),
            ScoreCard {
                score,
                total_points: total,
            },
            fixed_now() + Duration::minutes(minutes),
        )
    }

    #[test]
    fn average_is_absent_without_attempts_and_rounds_half_up() {
        assert_eq!(average_percent(std::iter::empty::<&QuizAttempt>()), None);
        let attempts = [
            attempt("a1", "z", "s", 1, 2, 0),
            attempt("a2", "z", "s", 1, 1, 1),
        ];
        assert_eq!(average_percent(&attempts), Some(75));
        let thirds = [attempt("a3", "z", "s", 1, 3, 0), attempt("a4", "z", "s", 1, 3, 0)];
        assert_eq!(average_percent(&thirds), Some(33));
        let half = [attempt("a5", "z", "s", 1, 200, 0)];
        assert_eq!(average_percent(&half), Some(1));
        assert_eq!(percent_label(None), "N/A");
        assert_eq!(percent_label(Some(85)), "85%");
    }

    #[test]
    fn course_without_attempts_reports_none() {
        let rows = course_summaries(
            &[course("c1", "m1")],
            &[quiz("z1", "c1")],
            &[],
            &[user("m1", Role::Mentor)],
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].attempt_count, 0);
        assert_eq!(rows[0].quiz_count, 1);
        assert_eq!(rows[0].average_score_percent, None);
        assert_eq!(rows[0].owner_name, "Name m1");
    }

    #[test]
    fn course_rows_sort_by_attempts_and_tolerate_missing_owner() {
        let rows = course_summaries(
            &[course("c1", "gone"), course("c2", "m1"), course("c3", "m1")],
            &[quiz("z1", "c1"), quiz("z2", "c2"), quiz("z3", "c3")],
            &[
                attempt("a1", "z2", "s1", 10, 10, 0),
                attempt("a2", "z2", "s2", 5, 10, 1),
                attempt("a3", "z-deleted", "s1", 10, 10, 2),
            ],
            &[user("m1", Role::Mentor)],
        );
        let order: Vec<&str> = rows.iter().map(|r| r.course.id().as_str()).collect();
        assert_eq!(order, ["c2", "c1", "c3"]);
        assert_eq!(rows[0].average_score_percent, Some(75));
        assert_eq!(rows[1].owner_name, UNKNOWN);
    }

    #[test]
    fn student_rows_are_scoped_to_mentor_and_stably_sorted() {
        let courses = [course("c1", "m1"), course("c2", "m2")];
        let quizzes = [quiz("z1", "c1"), quiz("z2", "c2")];
        let attempts = [
            attempt("a1", "z1", "s1", 5, 10, 0),
            attempt("a2", "z1", "s2", 10, 10, 1),
            attempt("a3", "z1", "s3", 5, 10, 2),
            attempt("a4", "z2", "s4", 10, 10, 3),
        ];
        let identities = [user("s1", Role::Student), user("s2", Role::Student)];

        let rows = student_summaries(&UserId::new("m1"), &courses, &quizzes, &attempts, &identities);
        let order: Vec<&str> = rows.iter().map(|r| r.student_id.as_str()).collect();
        assert_eq!(order, ["s2", "s1", "s3"]);
        assert_eq!(rows[2].student_name, UNKNOWN);

        let overview = mentor_overview(&UserId::new("m1"), &courses, &quizzes, &attempts);
        assert_eq!(
            overview,
            MentorOverview {
                course_count: 1,
                quiz_count: 1,
                attempt_count: 3,
                average_score_percent: Some(67),
            }
        );
    }

    #[test]
    fn platform_counts_by_role() {
        let overview = platform_overview(
            &[
                user("a", Role::Admin),
                user("m", Role::Mentor),
                user("s1", Role::Student),
                user("s2", Role::Student),
            ],
            &[course("c1", "m")],
            &[],
            &[],
        );
        assert_eq!(overview.users, 4);
        assert_eq!(overview.students, 2);
        assert_eq!(overview.mentors, 1);
        assert_eq!(overview.admins, 1);
        assert_eq!(overview.courses, 1);
    }

    #[test]
    fn dashboard_lists_recent_and_unattempted() {
        let quizzes: Vec<Quiz> = (1..=5).map(|n| quiz(&format!("z{n}"), "c1")).collect();
        let attempts = [
            attempt("a1", "z1", "s", 10, 10, 0),
            attempt("a2", "z2", "s", 0, 10, 5),
            attempt("a3", "z1", "s", 5, 10, 10),
            attempt("a4", "gone", "s", 10, 10, 1),
        ];
        let dashboard = student_dashboard(&quizzes, &attempts);
        assert_eq!(dashboard.completed, 4);
        assert_eq!(dashboard.average_score_percent, Some(63));
        let recent: Vec<&str> = dashboard.recent.iter().map(|r| r.attempt_id.as_str()).collect();
        assert_eq!(recent, ["a3", "a2", "a4"]);
        assert_eq!(dashboard.recent[2].quiz_title, UNTITLED_QUIZ);
        let recommended: Vec<&str> = dashboard.recommended.iter().map(|q| q.id().as_str()).collect();
        assert_eq!(recommended, ["z3", "z4", "z5"]);
    }

    #[test]
    fn progress_is_chronological_and_chart_keeps_last_ten() {
        let quizzes = [quiz("z1", "c1")];
        let attempts: Vec<QuizAttempt> = (0..12)
            .rev()
            .map(|n| attempt(&format!("a{n}"), "z1", "s", 10, 10, n))
            .collect();
        let progress = student_progress(&quizzes, &attempts);
        assert_eq!(progress.history.len(), 12);
        assert_eq!(progress.history[0].attempt_id.as_str(), "a0");
        let chart = progress.chart();
        assert_eq!(chart.len(), 10);
        assert_eq!(chart[0].attempt_id.as_str(), "a2");
        assert_eq!(chart[9].quiz_title, "Quiz z1");
        assert_eq!(chart[9].percent, 100);
    }
}
