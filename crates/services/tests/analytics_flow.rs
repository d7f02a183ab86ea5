use std::sync::Arc;

use quiz_core::model::{QuestionId, QuizId, UserId};
use quiz_core::time::fixed_now;
use services::analytics::percent_label;
use services::{AppServices, Clock, HttpQuestionGenerator};
use storage::repository::Storage;
use storage::seed::{JS_COURSE_ID, JS_QUIZ_ID, MENTOR_ID, REACT_COURSE_ID, STUDENT_ID, seed_demo};

#[tokio::test]
async fn course_rows_reflect_submitted_attempts() {
    let storage = Storage::sqlite("sqlite:file:memdb_analytics_flow?mode=memory&cache=shared")
        .await
        .expect("connect sqlite");
    seed_demo(&storage, fixed_now()).await.expect("seed");
    let services = AppServices::from_storage(
        &storage,
        Clock::fixed(fixed_now()),
        Arc::new(HttpQuestionGenerator::new(None)),
    );
    services
        .session()
        .login("student@skillforge.com", "student123")
        .await
        .unwrap();

    let run = services
        .attempts()
        .start(&QuizId::new(JS_QUIZ_ID))
        .await
        .unwrap();
    run.record_answer(&QuestionId::new("q1"), "const").unwrap();
    run.submit().await.unwrap();

    let rows = services.analytics().course_summaries().await.unwrap();
    assert_eq!(rows.len(), 2);

    let js = &rows[0];
    assert_eq!(js.course.id().as_str(), JS_COURSE_ID);
    assert_eq!((js.quiz_count, js.attempt_count), (1, 1));
    assert_eq!(js.average_score_percent, Some(50));
    assert_eq!(js.owner_name, "Mentor User");

    let react = &rows[1];
    assert_eq!(react.course.id().as_str(), REACT_COURSE_ID);
    assert_eq!(react.attempt_count, 0);
    assert_eq!(react.average_score_percent, None);
    assert_eq!(percent_label(react.average_score_percent), "N/A");

    let students = services
        .analytics()
        .student_summaries(&UserId::new(MENTOR_ID))
        .await
        .unwrap();
    assert_eq!(students.len(), 1);
    assert_eq!(students[0].student_id, UserId::new(STUDENT_ID));
    assert_eq!(students[0].student_name, "Student User");
    assert_eq!(students[0].average_score_percent, 50);

    let dashboard = services
        .analytics()
        .student_dashboard(&UserId::new(STUDENT_ID))
        .await
        .unwrap();
    assert_eq!(dashboard.completed, 1);
    assert_eq!(dashboard.recent[0].quiz_title, "JavaScript Variables Quiz");

    let platform = services.analytics().platform_overview().await.unwrap();
    assert_eq!((platform.users, platform.courses, platform.attempts), (3, 2, 1));
}
