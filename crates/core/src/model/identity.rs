use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::UserId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IdentityError {
    #[error("name cannot be empty")]
    EmptyName,

    #[error("email cannot be empty")]
    EmptyEmail,

    #[error("email is not valid: {0}")]
    InvalidEmail(String),

    #[error("unknown role: {0}")]
    UnknownRole(String),
}

//
// ─── ROLE ──────────────────────────────────────────────────────────────────────
//

/// Role carried by an identity; decides which views and actions are permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Mentor,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Student, Role::Mentor, Role::Admin];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Mentor => "mentor",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "mentor" => Ok(Role::Mentor),
            "admin" => Ok(Role::Admin),
            other => Err(IdentityError::UnknownRole(other.to_owned())),
        }
    }
}

//
// ─── IDENTITY ──────────────────────────────────────────────────────────────────
//

/// An authenticated user record.
///
/// Email is stored trimmed; name must be non-blank. Only an admin edit changes
/// an identity after creation, and that goes through [`Identity::edited`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "IdentityFields")]
pub struct Identity {
    id: UserId,
    email: String,
    name: String,
    role: Role,
    created_at: DateTime<Utc>,
}

impl Identity {
    /// Creates a validated identity.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError` when the name is blank or the email is blank or
    /// missing an `@`.
    pub fn new(
        id: UserId,
        email: impl Into<String>,
        name: impl Into<String>,
        role: Role,
        created_at: DateTime<Utc>,
    ) -> Result<Self, IdentityError> {
        let email = normalize_email(&email.into())?;
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(IdentityError::EmptyName);
        }
        Ok(Self {
            id,
            email,
            name,
            role,
            created_at,
        })
    }

    /// Returns a copy with new profile fields, preserving id and creation time.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError` under the same rules as [`Identity::new`].
    pub fn edited(
        &self,
        email: impl Into<String>,
        name: impl Into<String>,
        role: Role,
    ) -> Result<Self, IdentityError> {
        Self::new(self.id.clone(), email, name, role, self.created_at)
    }

    #[must_use]
    pub fn id(&self) -> &UserId {
        &self.id
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Trims an email and checks its basic shape.
///
/// # Errors
///
/// Returns `IdentityError::EmptyEmail` or `IdentityError::InvalidEmail`.
pub fn normalize_email(raw: &str) -> Result<String, IdentityError> {
    let email = raw.trim();
    if email.is_empty() {
        return Err(IdentityError::EmptyEmail);
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email.to_owned()),
        _ => Err(IdentityError::InvalidEmail(email.to_owned())),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityFields {
    id: UserId,
    email: String,
    name: String,
    role: Role,
    created_at: DateTime<Utc>,
}

impl TryFrom<IdentityFields> for Identity {
    type Error = IdentityError;

    fn try_from(fields: IdentityFields) -> Result<Self, Self::Error> {
        Identity::new(
            fields.id,
            fields.email,
            fields.name,
            fields.role,
            fields.created_at,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn role_round_trips_through_str() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!(matches!(
            "guest".parse::<Role>(),
            Err(IdentityError::UnknownRole(_))
        ));
    }

    #[test]
    fn new_trims_email_and_name() {
        let identity = Identity::new(
            UserId::new("user-1"),
            "  ada@example.com ",
            " Ada ",
            Role::Student,
            fixed_now(),
        )
        .unwrap();
        assert_eq!(identity.email(), "ada@example.com");
        assert_eq!(identity.name(), "Ada");
    }

    #[test]
    fn rejects_email_without_at() {
        let err = Identity::new(
            UserId::new("user-1"),
            "nobody",
            "Nobody",
            Role::Student,
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, IdentityError::InvalidEmail("nobody".into()));
    }

    #[test]
    fn deserialization_validates_fields() {
        let json = r#"{"id":"user-1","email":"","name":"X","role":"admin","createdAt":"2023-11-14T22:13:20Z"}"#;
        assert!(serde_json::from_str::<Identity>(json).is_err());
    }

    #[test]
    fn edited_keeps_id_and_created_at() {
        let identity = Identity::new(
            UserId::new("user-1"),
            "a@b.c",
            "A",
            Role::Student,
            fixed_now(),
        )
        .unwrap();
        let edited = identity.edited("m@b.c", "M", Role::Mentor).unwrap();
        assert_eq!(edited.id(), identity.id());
        assert_eq!(edited.created_at(), identity.created_at());
        assert_eq!(edited.role(), Role::Mentor);
    }
}
