use std::error::Error;
use std::str::FromStr;

use quiz_core::model::{CourseId, Identity, QuestionId, QuizId, Role, UserId};
use services::attempts::NOT_ANSWERED;
use services::{AppServices, NewCourse, NewUser, RunState};

use super::{ArgsError, Options};

fn required<'a>(value: Option<&'a String>, flag: &'static str) -> Result<&'a str, ArgsError> {
    value.map(String::as_str).ok_or(ArgsError::MissingArg { name: flag })
}

fn parse_flag<T: FromStr>(raw: &str, flag: &'static str) -> Result<T, ArgsError> {
    raw.parse().map_err(|_| ArgsError::Invalid {
        flag,
        raw: raw.to_owned(),
    })
}

/// Walk a quiz with pre-supplied answers, submit it, and print the breakdown.
pub(crate) async fn take(
    services: &AppServices,
    quiz_id: &QuizId,
    answers: &[(QuestionId, String)],
) -> Result<(), Box<dyn Error>> {
    let run = services.attempts().start(quiz_id).await?;
    if run.state() == RunState::NotFound {
        println!("Quiz not found: {quiz_id}");
        return Ok(());
    }
    for (question_id, value) in answers {
        run.record_answer(question_id, value.clone())?;
    }

    while let (Some(question), Some(progress)) = (run.current_question(), run.progress()) {
        println!(
            "[{}/{}] {}",
            progress.question_index + 1,
            progress.total_questions,
            question.prompt()
        );
        for option in question.options() {
            println!("    - {option}");
        }
        let answer = run
            .answer_for(question.id())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| NOT_ANSWERED.to_owned());
        println!("    answer: {answer}");
        if progress.question_index + 1 >= progress.total_questions {
            break;
        }
        run.next()?;
    }

    let attempt = run.submit().await?;
    println!();
    println!(
        "Score: {}/{} ({}%)",
        attempt.score(),
        attempt.total_points(),
        run.percent().unwrap_or_default()
    );
    for item in run.review()? {
        let mark = if item.is_correct { "correct" } else { "wrong" };
        println!(
            "  {} [{mark}, {} pts] your answer: {} / correct: {}",
            item.prompt,
            item.points_awarded,
            item.submitted_label(),
            item.correct_answer
        );
    }
    println!("Attempt saved as {}", attempt.id());
    Ok(())
}

pub(crate) async fn create_user(
    services: &AppServices,
    options: &Options,
) -> Result<(), Box<dyn Error>> {
    let role: Role = parse_flag(required(options.role.as_ref(), "--role")?, "--role")?;
    let created = services
        .users()
        .create_user(NewUser {
            name: required(options.name.as_ref(), "--name")?.to_owned(),
            email: required(options.email.as_ref(), "--email")?.to_owned(),
            role,
            password: required(options.password.as_ref(), "--password")?.to_owned(),
        })
        .await?;
    println!("Created {} <{}> as {}", created.name(), created.email(), created.id());
    Ok(())
}

pub(crate) async fn update_user(
    services: &AppServices,
    id: &UserId,
    options: &Options,
) -> Result<(), Box<dyn Error>> {
    let users = services.users();
    let Some(current) = users.get_user(id).await? else {
        println!("User not found: {id}");
        return Ok(());
    };
    let role = match options.role.as_deref() {
        Some(raw) => parse_flag(raw, "--role")?,
        None => current.role(),
    };
    let updated = users
        .update_user(
            id,
            options.email.as_deref().unwrap_or(current.email()),
            options.name.as_deref().unwrap_or(current.name()),
            role,
        )
        .await?;
    print_identity(&updated);
    Ok(())
}

pub(crate) async fn delete_user(services: &AppServices, id: &UserId) -> Result<(), Box<dyn Error>> {
    services.users().delete_user(id).await?;
    println!("Deleted {id}");
    Ok(())
}

pub(crate) async fn reset_password(
    services: &AppServices,
    id: &UserId,
    options: &Options,
) -> Result<(), Box<dyn Error>> {
    let password = required(options.password.as_ref(), "--password")?;
    let confirm = required(options.confirm.as_ref(), "--confirm")?;
    services.users().reset_password(id, password, confirm).await?;
    println!("Password updated for {id}");
    Ok(())
}

pub(crate) async fn create_course(
    services: &AppServices,
    mentor: &Identity,
    options: &Options,
) -> Result<(), Box<dyn Error>> {
    let difficulty = parse_flag(
        required(options.difficulty.as_ref(), "--difficulty")?,
        "--difficulty",
    )?;
    let course = services
        .courses()
        .create_course(
            mentor.id(),
            NewCourse {
                title: required(options.title.as_ref(), "--title")?.to_owned(),
                description: options.description.clone().unwrap_or_default(),
                difficulty,
                topics: options.topics.clone().unwrap_or_default(),
            },
        )
        .await?;
    println!(
        "Created course {} ({}) with topics: {}",
        course.title(),
        course.id(),
        course.topics().join(", ")
    );
    Ok(())
}

pub(crate) async fn generate_quiz(
    services: &AppServices,
    mentor: &Identity,
    course_id: CourseId,
    options: &Options,
) -> Result<(), Box<dyn Error>> {
    let topic = required(options.topic.as_ref(), "--topic")?;
    let difficulty = parse_flag(
        required(options.difficulty.as_ref(), "--difficulty")?,
        "--difficulty",
    )?;
    let count = match options.count.as_deref() {
        Some(raw) => parse_flag(raw, "--count")?,
        None => 5,
    };
    let quiz = services
        .quizzes()
        .generate_quiz(mentor.id(), course_id, topic, difficulty, count)
        .await?;
    println!(
        "Created {} ({}) with {} questions, {} points",
        quiz.title(),
        quiz.id(),
        quiz.questions().len(),
        quiz.total_points()
    );
    Ok(())
}

pub(crate) fn print_identity(identity: &Identity) {
    println!(
        "{:<28} {:<30} {:<8} {}",
        identity.id().as_str(),
        identity.email(),
        identity.role().as_str(),
        identity.name()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::Difficulty;

    #[test]
    fn flags_parse_into_domain_values() {
        let role: Role = parse_flag("Mentor", "--role").unwrap();
        assert_eq!(role, Role::Mentor);
        let level: Difficulty = parse_flag("advanced", "--difficulty").unwrap();
        assert_eq!(level, Difficulty::Advanced);
        assert!(matches!(
            parse_flag::<u32>("many", "--count"),
            Err(ArgsError::Invalid { flag: "--count", .. })
        ));
    }

    #[test]
    fn missing_required_flag_names_it() {
        let options = Options::default();
        assert!(matches!(
            required(options.title.as_ref(), "--title"),
            Err(ArgsError::MissingArg { name: "--title" })
        ));
    }
}
