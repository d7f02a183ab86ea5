use std::error::Error;
use std::fmt;

use chrono::{DateTime, Utc};
use quiz_core::model::{CourseId, Identity, QuestionId, QuizId, UserId};
use services::{AppServices, Clock, GuardDecision, Route};
use storage::repository::Storage;
use storage::seed::seed_demo;

mod commands;
mod views;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArg { name: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
    InvalidAnswer { raw: String },
    Invalid { flag: &'static str, raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArg { name } => write!(f, "missing argument: {name}"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
            ArgsError::InvalidAnswer { raw } => {
                write!(f, "invalid --answer value (expected <question-id>=<answer>): {raw}")
            }
            ArgsError::Invalid { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
        }
    }
}

impl Error for ArgsError {}

/// Raised when the signed-in session may not run a command.
#[derive(Debug)]
enum AccessError {
    SignedOut { return_to: Route },
    Forbidden { home: Route },
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessError::SignedOut { return_to } => {
                write!(f, "not signed in; run `login <email> <password>` to open {return_to}")
            }
            AccessError::Forbidden { home } => {
                write!(f, "not permitted for this role; your home is {home}")
            }
        }
    }
}

impl Error for AccessError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_now(raw: String) -> Result<DateTime<Utc>, ArgsError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| ArgsError::InvalidNow { raw })
}

fn parse_answer(raw: String) -> Result<(QuestionId, String), ArgsError> {
    match raw.split_once('=') {
        Some((id, value)) if !id.trim().is_empty() => {
            Ok((QuestionId::new(id.trim()), value.to_owned()))
        }
        _ => Err(ArgsError::InvalidAnswer { raw }),
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- <command> [args] [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  seed                                 Load the demo dataset");
    eprintln!("  login <email> <password>             Sign in and remember the session");
    eprintln!("  logout                               Sign out");
    eprintln!("  whoami                               Show the signed-in user");
    eprintln!("  open <path>                          Navigate to a view (e.g. /student/quizzes)");
    eprintln!("  take <quiz-id> [--answer q=value]... Answer and submit a quiz");
    eprintln!("  users create --name --email --role --password");
    eprintln!("  users update <user-id> [--name] [--email] [--role]");
    eprintln!("  users delete <user-id>");
    eprintln!("  users reset <user-id> --password <p> --confirm <p>");
    eprintln!("  courses create --title [--description] --difficulty [--topics a,b]");
    eprintln!("  quizzes generate <course-id> --topic --difficulty [--count n]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>    SQLite URL (default: sqlite://dev.sqlite3)");
    eprintln!("  --now <rfc3339>      Fixed current time");
    eprintln!("  --search <text>      Catalog search for /student/quizzes");
    eprintln!("  --difficulty <level> Beginner, Intermediate or Advanced");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_NOW, QUIZ_AI_API_KEY, QUIZ_AI_BASE_URL, QUIZ_AI_MODEL, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Seed,
    Login,
    Logout,
    WhoAmI,
    Open,
    Take,
    Users,
    Courses,
    Quizzes,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "seed" => Some(Self::Seed),
            "login" => Some(Self::Login),
            "logout" => Some(Self::Logout),
            "whoami" => Some(Self::WhoAmI),
            "open" => Some(Self::Open),
            "take" => Some(Self::Take),
            "users" => Some(Self::Users),
            "courses" => Some(Self::Courses),
            "quizzes" => Some(Self::Quizzes),
            _ => None,
        }
    }
}

/// Flags shared by every command. Each command reads the ones it needs.
#[derive(Debug, Default)]
struct Options {
    answers: Vec<(QuestionId, String)>,
    name: Option<String>,
    email: Option<String>,
    role: Option<String>,
    password: Option<String>,
    confirm: Option<String>,
    title: Option<String>,
    description: Option<String>,
    difficulty: Option<String>,
    topics: Option<String>,
    topic: Option<String>,
    count: Option<String>,
    search: Option<String>,
}

struct Args {
    db_url: String,
    now: Option<DateTime<Utc>>,
    command: Command,
    positional: Vec<String>,
    options: Options,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Option<Self>, ArgsError> {
        let mut db_url = std::env::var("QUIZ_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://dev.sqlite3".into(), normalize_sqlite_url);
        let mut now = std::env::var("QUIZ_NOW").ok().map(parse_now).transpose()?;
        let mut command = None;
        let mut positional = Vec::new();
        let mut options = Options::default();

        while let Some(arg) = args.next() {
            let slot = match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                    continue;
                }
                "--now" => {
                    now = Some(parse_now(require_value(&mut args, "--now")?)?);
                    continue;
                }
                "--answer" => {
                    let value = require_value(&mut args, "--answer")?;
                    options.answers.push(parse_answer(value)?);
                    continue;
                }
                "--help" | "-h" => return Ok(None),
                "--name" => (&mut options.name, "--name"),
                "--email" => (&mut options.email, "--email"),
                "--role" => (&mut options.role, "--role"),
                "--password" => (&mut options.password, "--password"),
                "--confirm" => (&mut options.confirm, "--confirm"),
                "--title" => (&mut options.title, "--title"),
                "--description" => (&mut options.description, "--description"),
                "--difficulty" => (&mut options.difficulty, "--difficulty"),
                "--topics" => (&mut options.topics, "--topics"),
                "--topic" => (&mut options.topic, "--topic"),
                "--count" => (&mut options.count, "--count"),
                "--search" => (&mut options.search, "--search"),
                _ if arg.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ if command.is_none() => {
                    command = Some(Command::from_arg(&arg).ok_or(ArgsError::UnknownArg(arg))?);
                    continue;
                }
                _ => {
                    positional.push(arg);
                    continue;
                }
            };
            let (field, flag) = slot;
            *field = Some(require_value(&mut args, flag)?);
        }

        let Some(command) = command else {
            return Ok(None);
        };
        Ok(Some(Self {
            db_url,
            now,
            command,
            positional,
            options,
        }))
    }

    fn positional(&self, index: usize, name: &'static str) -> Result<&str, ArgsError> {
        self.positional
            .get(index)
            .map(String::as_str)
            .ok_or(ArgsError::MissingArg { name })
    }

    fn clock(&self) -> Clock {
        self.now.map_or_else(Clock::default_clock, Clock::fixed)
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Create the database file (and its directory) so `SQLite` can open it.
fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

/// Restore the persisted session and run the guard for `route`.
async fn authorize(services: &AppServices, route: &Route) -> Result<Identity, Box<dyn Error>> {
    let session = services.session();
    session.initialize().await?;
    match services.guard().decide(&session.snapshot(), route) {
        GuardDecision::Allow(_) => session
            .current_identity()
            .ok_or_else(|| AccessError::SignedOut {
                return_to: route.clone(),
            }
            .into()),
        GuardDecision::RedirectToLogin { return_to } => {
            Err(AccessError::SignedOut { return_to }.into())
        }
        GuardDecision::RedirectToHome(home) => Err(AccessError::Forbidden { home }.into()),
        GuardDecision::Suspend => Err(AccessError::SignedOut {
            return_to: route.clone(),
        }
        .into()),
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let parsed = Args::parse(std::env::args().skip(1)).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    let Some(args) = parsed else {
        print_usage();
        return Ok(());
    };

    prepare_sqlite_file(&args.db_url)?;
    let clock = args.clock();
    tracing::debug!(db = %args.db_url, command = ?args.command, "starting");

    if args.command == Command::Seed {
        let storage = Storage::sqlite(&args.db_url).await?;
        let report = seed_demo(&storage, clock.now()).await?;
        if report.is_empty() {
            println!("{} already holds users; nothing seeded", args.db_url);
        } else {
            println!(
                "Seeded {} users, {} courses and {} quizzes",
                report.users, report.courses, report.quizzes
            );
        }
        return Ok(());
    }

    let services = AppServices::new_sqlite(&args.db_url, clock).await?;
    match args.command {
        Command::Seed => Ok(()),
        Command::Login => {
            let email = args.positional(0, "email")?;
            let password = args.positional(1, "password")?;
            services.session().initialize().await?;
            let identity = services.session().login(email, password).await?;
            let home = Route::home_for(identity.role());
            println!("Signed in as {} ({})", identity.name(), identity.role());
            println!("Home: {home}");
            Ok(())
        }
        Command::Logout => {
            services.session().initialize().await?;
            services.session().logout().await?;
            println!("Signed out");
            Ok(())
        }
        Command::WhoAmI => {
            match services.session().initialize().await? {
                Some(identity) => println!(
                    "{} <{}> {} [{}]",
                    identity.name(),
                    identity.email(),
                    identity.role(),
                    identity.id()
                ),
                None => println!("Not signed in"),
            }
            Ok(())
        }
        Command::Open => {
            let path = args.positional(0, "path")?;
            views::open(&services, path, &args.options).await
        }
        Command::Take => {
            let quiz_id: QuizId = args.positional(0, "quiz-id")?.parse()?;
            authorize(
                &services,
                &Route::StudentQuiz {
                    quiz_id: quiz_id.clone(),
                },
            )
            .await?;
            commands::take(&services, &quiz_id, &args.options.answers).await
        }
        Command::Users => {
            let action = args.positional(0, "users action")?;
            match action {
                "create" => {
                    authorize(&services, &Route::AdminCreateUser).await?;
                    commands::create_user(&services, &args.options).await
                }
                "update" | "delete" | "reset" => {
                    authorize(&services, &Route::AdminUsers).await?;
                    let id: UserId = args.positional(1, "user-id")?.parse()?;
                    match action {
                        "update" => commands::update_user(&services, &id, &args.options).await,
                        "delete" => commands::delete_user(&services, &id).await,
                        _ => commands::reset_password(&services, &id, &args.options).await,
                    }
                }
                other => Err(ArgsError::UnknownArg(other.to_owned()).into()),
            }
        }
        Command::Courses => match args.positional(0, "courses action")? {
            "create" => {
                let mentor = authorize(&services, &Route::MentorCourses).await?;
                commands::create_course(&services, &mentor, &args.options).await
            }
            other => Err(ArgsError::UnknownArg(other.to_owned()).into()),
        },
        Command::Quizzes => match args.positional(0, "quizzes action")? {
            "generate" => {
                let course_id: CourseId = args.positional(1, "course-id")?.parse()?;
                let mentor = authorize(
                    &services,
                    &Route::MentorCourseQuizzes {
                        course_id: course_id.clone(),
                    },
                )
                .await?;
                commands::generate_quiz(&services, &mentor, course_id, &args.options).await
            }
            other => Err(ArgsError::UnknownArg(other.to_owned()).into()),
        },
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
