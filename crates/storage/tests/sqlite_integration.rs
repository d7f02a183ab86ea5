use quiz_core::model::{
    AnswerSheet, AttemptId, CourseId, Identity, QuestionId, QuizAttempt, QuizId, Role, UserId,
};
use quiz_core::scoring::ScoreCard;
use quiz_core::time::fixed_now;
use storage::repository::{
    AttemptRepository, CourseRepository, CredentialRepository, IdentityRepository,
    QuizRepository, Storage, StorageError, TokenStore,
};
use storage::seed::{JS_COURSE_ID, JS_QUIZ_ID, STUDENT_ID, demo_quiz, seed_demo};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let repo = SqliteRepository::connect(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_round_trips_quiz_with_questions() {
    let repo = connect("memdb_quiz_roundtrip").await;
    let quiz = demo_quiz(fixed_now()).unwrap();
    repo.insert_quiz(&quiz).await.unwrap();

    let fetched = repo
        .get_quiz(&QuizId::new(JS_QUIZ_ID))
        .await
        .unwrap()
        .expect("quiz present");
    assert_eq!(fetched, quiz);

    let by_course = repo
        .list_quizzes_for_course(&CourseId::new(JS_COURSE_ID))
        .await
        .unwrap();
    assert_eq!(by_course.len(), 1);
    assert_eq!(by_course[0].questions().len(), 2);
}

#[tokio::test]
async fn sqlite_rejects_duplicate_email() {
    let repo = connect("memdb_dup_email").await;
    let a = Identity::new(UserId::new("u1"), "a@x.io", "A", Role::Student, fixed_now()).unwrap();
    let b = Identity::new(UserId::new("u2"), "a@x.io", "B", Role::Mentor, fixed_now()).unwrap();
    repo.insert_identity(&a).await.unwrap();
    let err = repo.insert_identity(&b).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict(_)));
}

#[tokio::test]
async fn sqlite_persists_attempt_answers() {
    let repo = connect("memdb_attempts").await;
    let mut answers = AnswerSheet::new();
    answers.insert(QuestionId::new("q1"), "const".into());
    let attempt = QuizAttempt::new(
        AttemptId::new("attempt-1"),
        QuizId::new(JS_QUIZ_ID),
        UserId::new(STUDENT_ID),
        answers,
        ScoreCard {
            score: 10,
            total_points: 20,
        },
        fixed_now(),
    );
    repo.insert_attempt(&attempt).await.unwrap();

    let mine = repo
        .list_attempts_for_student(&UserId::new(STUDENT_ID))
        .await
        .unwrap();
    assert_eq!(mine, vec![attempt.clone()]);

    let fetched = repo.get_attempt(attempt.id()).await.unwrap();
    assert_eq!(fetched.as_ref(), Some(&attempt));
}

#[tokio::test]
async fn sqlite_token_slot_and_credentials() {
    let repo = connect("memdb_tokens").await;
    assert_eq!(repo.load_token().await.unwrap(), None);
    repo.save_token("first").await.unwrap();
    repo.save_token("second").await.unwrap();
    assert_eq!(repo.load_token().await.unwrap().as_deref(), Some("second"));
    repo.clear_token().await.unwrap();
    assert_eq!(repo.load_token().await.unwrap(), None);

    repo.set_credential("a@x.io", "pw1234").await.unwrap();
    assert!(repo.verify_credential("a@x.io", "pw1234").await.unwrap());
    repo.set_credential("a@x.io", "changed").await.unwrap();
    assert!(!repo.verify_credential("a@x.io", "pw1234").await.unwrap());
}

#[tokio::test]
async fn sqlite_seed_and_delete_course() {
    let storage = Storage::sqlite("sqlite:file:memdb_seed?mode=memory&cache=shared")
        .await
        .unwrap();
    let report = seed_demo(&storage, fixed_now()).await.unwrap();
    assert_eq!(report.users, 3);

    let courses = storage.courses.list_courses().await.unwrap();
    assert_eq!(courses.len(), 2);
    assert_eq!(courses[0].id(), &CourseId::new(JS_COURSE_ID));

    storage
        .courses
        .delete_course(&CourseId::new(JS_COURSE_ID))
        .await
        .unwrap();
    assert!(matches!(
        storage
            .courses
            .delete_course(&CourseId::new(JS_COURSE_ID))
            .await,
        Err(StorageError::NotFound)
    ));
}
