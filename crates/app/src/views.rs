//! Text rendering of each routed view.

use std::error::Error;

use quiz_core::model::{Difficulty, Identity, Role};
use services::analytics::percent_label;
use services::{AppServices, CatalogFilter, GuardDecision, Route, post_login_destination};

use super::commands::print_identity;
use super::{ArgsError, Options};

/// Resolve `path` through the guard and print the resulting view.
pub(crate) async fn open(
    services: &AppServices,
    path: &str,
    options: &Options,
) -> Result<(), Box<dyn Error>> {
    let session = services.session();
    session.initialize().await?;

    let mut decision = services.guard().decide_path(&session.snapshot(), path);
    // Redirects to a role home are followed once; the home always admits its role.
    if let GuardDecision::RedirectToHome(home) = decision.clone() {
        println!("-> {home}");
        decision = services.guard().decide(&session.snapshot(), &home);
    }

    match decision {
        GuardDecision::Allow(route) => {
            let Some(identity) = session.current_identity() else {
                println!("Sign in with `login <email> <password>`.");
                return Ok(());
            };
            render(services, &route, &identity, options).await
        }
        GuardDecision::RedirectToLogin { return_to } => {
            println!("Sign in to open {return_to}: `login <email> <password>`.");
            Ok(())
        }
        GuardDecision::RedirectToHome(home) => {
            println!("Redirected to {home}");
            Ok(())
        }
        GuardDecision::Suspend => {
            println!("Loading...");
            Ok(())
        }
    }
}

async fn render(
    services: &AppServices,
    route: &Route,
    identity: &Identity,
    options: &Options,
) -> Result<(), Box<dyn Error>> {
    let analytics = services.analytics();
    match route {
        Route::Login | Route::Dashboard => {
            println!("-> {}", post_login_destination(None, identity));
        }
        Route::StudentHome => {
            let dashboard = analytics.student_dashboard(identity.id()).await?;
            println!("Welcome back, {}", identity.name());
            println!(
                "Completed quizzes: {}   Average: {}",
                dashboard.completed,
                percent_label(dashboard.average_score_percent)
            );
            println!("Recent attempts:");
            for row in &dashboard.recent {
                println!(
                    "  {:<32} {}/{} ({}%)",
                    row.quiz_title, row.score, row.total_points, row.percent
                );
            }
            println!("Recommended:");
            for quiz in &dashboard.recommended {
                println!("  {:<32} {} [{}]", quiz.title(), quiz.difficulty(), quiz.id());
            }
        }
        Route::StudentQuizzes => {
            let difficulty: Option<Difficulty> = options
                .difficulty
                .as_deref()
                .map(|raw| {
                    raw.parse().map_err(|_| ArgsError::Invalid {
                        flag: "--difficulty",
                        raw: raw.to_owned(),
                    })
                })
                .transpose()?;
            let filter = CatalogFilter {
                search: options.search.clone().unwrap_or_default(),
                difficulty,
            };
            let entries = services.quizzes().catalog(&filter).await?;
            if entries.is_empty() {
                println!("No quizzes match.");
            }
            for entry in entries {
                println!(
                    "  {:<32} {:<28} {:<12} {} questions [{}]",
                    entry.quiz.title(),
                    entry.course_title,
                    entry.quiz.difficulty(),
                    entry.quiz.questions().len(),
                    entry.quiz.id()
                );
            }
        }
        Route::StudentQuiz { quiz_id } => {
            let quiz = services.quizzes().get_quiz(quiz_id).await?;
            println!("{} ({} points)", quiz.title(), quiz.total_points());
            for (index, question) in quiz.questions().iter().enumerate() {
                println!("  {}. [{}] {}", index + 1, question.id(), question.prompt());
                for option in question.options() {
                    println!("       - {option}");
                }
            }
            println!("Submit with `take {quiz_id} --answer <question-id>=<answer>`.");
        }
        Route::StudentProgress => {
            let progress = analytics.student_progress(identity.id()).await?;
            if progress.history.is_empty() {
                println!("No attempts yet.");
            }
            for row in progress.chart() {
                println!(
                    "  {} {:<32} {:>3}%",
                    row.submitted_at.format("%Y-%m-%d"),
                    row.quiz_title,
                    row.percent
                );
            }
        }
        Route::MentorHome => {
            let overview = analytics.mentor_overview(identity.id()).await?;
            println!(
                "Courses: {}   Quizzes: {}   Attempts: {}   Average: {}",
                overview.course_count,
                overview.quiz_count,
                overview.attempt_count,
                percent_label(overview.average_score_percent)
            );
        }
        Route::MentorCourses => {
            for course in services.courses().list_for_mentor(identity.id()).await? {
                println!(
                    "  {:<32} {:<12} {} [{}]",
                    course.title(),
                    course.difficulty(),
                    course.topics().join(", "),
                    course.id()
                );
            }
        }
        Route::MentorCourseQuizzes { course_id } => {
            let course = services.courses().get_course(course_id).await?;
            println!("{}", course.title());
            for quiz in services.quizzes().list_for_course(course_id).await? {
                println!(
                    "  {:<32} {} questions, {} points [{}]",
                    quiz.title(),
                    quiz.questions().len(),
                    quiz.total_points(),
                    quiz.id()
                );
            }
        }
        Route::MentorAnalytics => {
            for row in analytics.student_summaries(identity.id()).await? {
                println!(
                    "  {:<24} {:>3} attempts {:>4}%",
                    row.student_name, row.attempts_count, row.average_score_percent
                );
            }
        }
        Route::AdminHome => {
            let overview = analytics.platform_overview().await?;
            println!(
                "Users: {} ({} students, {} mentors, {} admins)",
                overview.users, overview.students, overview.mentors, overview.admins
            );
            println!(
                "Courses: {}   Quizzes: {}   Attempts: {}",
                overview.courses, overview.quizzes, overview.attempts
            );
        }
        Route::AdminUsers => {
            for user in services.users().list_users().await? {
                print_identity(&user);
            }
        }
        Route::AdminCreateUser => {
            let roles = [Role::Student, Role::Mentor, Role::Admin].map(Role::as_str);
            println!(
                "Create with `users create --name <n> --email <e> --role <{}> --password <p>`.",
                roles.join("|")
            );
        }
        Route::AdminAnalytics => {
            for row in analytics.course_summaries().await? {
                println!(
                    "  {:<32} {:<20} {:>2} quizzes {:>3} attempts {:>4}",
                    row.course.title(),
                    row.owner_name,
                    row.quiz_count,
                    row.attempt_count,
                    percent_label(row.average_score_percent)
                );
            }
        }
    }
    Ok(())
}
