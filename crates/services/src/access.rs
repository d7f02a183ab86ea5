//! Route table and the access guard consulted before every navigation.

use std::fmt;

use quiz_core::model::{CourseId, Identity, QuizId, Role};

use crate::auth::SessionSnapshot;

/// Every view the platform can navigate to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    /// `/`: resolves to the signed-in user's role home.
    Dashboard,
    StudentHome,
    StudentQuizzes,
    StudentQuiz { quiz_id: QuizId },
    StudentProgress,
    MentorHome,
    MentorCourses,
    MentorCourseQuizzes { course_id: CourseId },
    MentorAnalytics,
    AdminHome,
    AdminUsers,
    AdminCreateUser,
    AdminAnalytics,
}

/// Who may open a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    Public,
    Authenticated,
    Roles(&'static [Role]),
}

const STUDENT_ONLY: &[Role] = &[Role::Student];
const MENTOR_ONLY: &[Role] = &[Role::Mentor];
const ADMIN_ONLY: &[Role] = &[Role::Admin];

impl RouteAccess {
    #[must_use]
    pub fn permits(self, role: Role) -> bool {
        match self {
            RouteAccess::Public | RouteAccess::Authenticated => true,
            RouteAccess::Roles(roles) => roles.contains(&role),
        }
    }
}

impl Route {
    /// Landing view for a role.
    #[must_use]
    pub fn home_for(role: Role) -> Route {
        match role {
            Role::Student => Route::StudentHome,
            Role::Mentor => Route::MentorHome,
            Role::Admin => Route::AdminHome,
        }
    }

    #[must_use]
    pub fn access(&self) -> RouteAccess {
        match self {
            Route::Login => RouteAccess::Public,
            Route::Dashboard => RouteAccess::Authenticated,
            Route::StudentHome
            | Route::StudentQuizzes
            | Route::StudentQuiz { .. }
            | Route::StudentProgress => RouteAccess::Roles(STUDENT_ONLY),
            Route::MentorHome
            | Route::MentorCourses
            | Route::MentorCourseQuizzes { .. }
            | Route::MentorAnalytics => RouteAccess::Roles(MENTOR_ONLY),
            Route::AdminHome | Route::AdminUsers | Route::AdminCreateUser | Route::AdminAnalytics => {
                RouteAccess::Roles(ADMIN_ONLY)
            }
        }
    }

    /// Role set declared by the route, `None` when any signed-in user (or
    /// anyone, for the login view) may open it.
    #[must_use]
    pub fn required_roles(&self) -> Option<&'static [Role]> {
        match self.access() {
            RouteAccess::Roles(roles) => Some(roles),
            RouteAccess::Public | RouteAccess::Authenticated => None,
        }
    }

    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".into(),
            Route::Dashboard => "/".into(),
            Route::StudentHome => "/student".into(),
            Route::StudentQuizzes => "/student/quizzes".into(),
            Route::StudentQuiz { quiz_id } => format!("/student/quiz/{quiz_id}"),
            Route::StudentProgress => "/student/progress".into(),
            Route::MentorHome => "/mentor".into(),
            Route::MentorCourses => "/mentor/courses".into(),
            Route::MentorCourseQuizzes { course_id } => {
                format!("/mentor/course/{course_id}/quizzes")
            }
            Route::MentorAnalytics => "/mentor/analytics".into(),
            Route::AdminHome => "/admin".into(),
            Route::AdminUsers => "/admin/users".into(),
            Route::AdminCreateUser => "/admin/users/create".into(),
            Route::AdminAnalytics => "/admin/analytics".into(),
        }
    }

    /// Match a path against the route table. Trailing slashes are ignored.
    #[must_use]
    pub fn parse(path: &str) -> Option<Route> {
        let trimmed = path.trim().trim_end_matches('/');
        let segments: Vec<&str> = trimmed.split('/').skip(1).collect();
        let route = match segments.as_slice() {
            [] => Route::Dashboard,
            ["login"] => Route::Login,
            ["student"] => Route::StudentHome,
            ["student", "quizzes"] => Route::StudentQuizzes,
            ["student", "quiz", id] => Route::StudentQuiz {
                quiz_id: id.parse().ok()?,
            },
            ["student", "progress"] => Route::StudentProgress,
            ["mentor"] => Route::MentorHome,
            ["mentor", "courses"] => Route::MentorCourses,
            ["mentor", "course", id, "quizzes"] => Route::MentorCourseQuizzes {
                course_id: id.parse().ok()?,
            },
            ["mentor", "analytics"] => Route::MentorAnalytics,
            ["admin"] => Route::AdminHome,
            ["admin", "users"] => Route::AdminUsers,
            ["admin", "users", "create"] => Route::AdminCreateUser,
            ["admin", "analytics"] => Route::AdminAnalytics,
            _ => return None,
        };
        if !trimmed.is_empty() && !trimmed.starts_with('/') {
            return None;
        }
        Some(route)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Outcome of a navigation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// The session is still loading; show a placeholder and ask again later.
    Suspend,
    RedirectToLogin { return_to: Route },
    RedirectToHome(Route),
    Allow(Route),
}

/// Stateless decision point. Call it on every navigation; never cache the
/// result across session changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessGuard;

impl AccessGuard {
    #[must_use]
    pub fn decide(&self, session: &SessionSnapshot, requested: &Route) -> GuardDecision {
        let decision = decide(session, requested);
        tracing::debug!(route = %requested, ?decision, "guard decision");
        decision
    }

    /// Resolve a raw path. Unknown paths go to `/` when signed in and to
    /// `/login` otherwise, and are then guarded like any other route.
    #[must_use]
    pub fn decide_path(&self, session: &SessionSnapshot, path: &str) -> GuardDecision {
        let route = Route::parse(path).unwrap_or_else(|| {
            if session.identity.is_some() {
                Route::Dashboard
            } else {
                Route::Login
            }
        });
        self.decide(session, &route)
    }
}

fn decide(session: &SessionSnapshot, requested: &Route) -> GuardDecision {
    if session.loading {
        return GuardDecision::Suspend;
    }
    let access = requested.access();
    let Some(identity) = session.identity.as_ref() else {
        return match access {
            RouteAccess::Public => GuardDecision::Allow(requested.clone()),
            RouteAccess::Authenticated | RouteAccess::Roles(_) => GuardDecision::RedirectToLogin {
                return_to: requested.clone(),
            },
        };
    };
    if let Some(roles) = requested.required_roles() {
        if !roles.contains(&identity.role()) {
            return GuardDecision::RedirectToHome(Route::home_for(identity.role()));
        }
    }
    match requested {
        Route::Dashboard | Route::Login => {
            GuardDecision::RedirectToHome(Route::home_for(identity.role()))
        }
        _ => GuardDecision::Allow(requested.clone()),
    }
}

/// Where to go after a successful login: the remembered destination when the
/// new identity may open it, otherwise the role home.
#[must_use]
pub fn post_login_destination(return_to: Option<&Route>, identity: &Identity) -> Route {
    let home = Route::home_for(identity.role());
    match return_to {
        Some(Route::Login | Route::Dashboard) | None => home,
        Some(route) if route.access().permits(identity.role()) => route.clone(),
        Some(_) => home,
    }
}
