use std::sync::Arc;

use quiz_core::model::{Identity, Role, UserId};
use storage::repository::{CredentialRepository, IdentityRepository, StorageError};

use crate::Clock;
use crate::error::{UserServiceError, ValidationError};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Input for [`UserService::create_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub password: String,
}

fn check_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

fn duplicate_or(err: StorageError, email: &str) -> UserServiceError {
    match err {
        StorageError::Conflict(_) => UserServiceError::DuplicateEmail(email.to_owned()),
        other => other.into(),
    }
}

/// Admin-side user management.
#[derive(Clone)]
pub struct UserService {
    clock: Clock,
    identities: Arc<dyn IdentityRepository>,
    credentials: Arc<dyn CredentialRepository>,
}

impl UserService {
    #[must_use]
    pub fn new(
        clock: Clock,
        identities: Arc<dyn IdentityRepository>,
        credentials: Arc<dyn CredentialRepository>,
    ) -> Self {
        Self {
            clock,
            identities,
            credentials,
        }
    }

    /// All users, newest first.
    ///
    /// # Errors
    ///
    /// Returns `UserServiceError::Storage` if repository access fails.
    pub async fn list_users(&self) -> Result<Vec<Identity>, UserServiceError> {
        let mut users = self.identities.list_identities().await?;
        users.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(users)
    }

    /// # Errors
    ///
    /// Returns `UserServiceError::Storage` if repository access fails.
    pub async fn get_user(&self, id: &UserId) -> Result<Option<Identity>, UserServiceError> {
        Ok(self.identities.get_identity(id).await?)
    }

    /// Create a user and its credential.
    ///
    /// # Errors
    ///
    /// Returns `UserServiceError::Validation` for a short password,
    /// `UserServiceError::Identity` for a blank name or malformed email,
    /// `UserServiceError::DuplicateEmail` if the email is taken, and
    /// `UserServiceError::Storage` on persistence failures.
    pub async fn create_user(&self, input: NewUser) -> Result<Identity, UserServiceError> {
        check_password(&input.password)?;
        let identity = Identity::new(
            UserId::generate(),
            input.email,
            input.name,
            input.role,
            self.clock.now(),
        )?;
        if self
            .identities
            .find_identity_by_email(identity.email())
            .await?
            .is_some()
        {
            return Err(UserServiceError::DuplicateEmail(identity.email().to_owned()));
        }

        self.identities
            .insert_identity(&identity)
            .await
            .map_err(|e| duplicate_or(e, identity.email()))?;
        self.credentials
            .set_credential(identity.email(), &input.password)
            .await?;
        tracing::info!(user = %identity.id(), role = %identity.role(), "user created");
        Ok(identity)
    }

    /// Admin edit of a user's profile. A changed email carries the existing
    /// credential with it.
    ///
    /// # Errors
    ///
    /// Returns `UserServiceError::NotFound` for an unknown id,
    /// `UserServiceError::Identity` for invalid fields,
    /// `UserServiceError::DuplicateEmail` if the new email is taken, and
    /// `UserServiceError::Storage` on persistence failures.
    pub async fn update_user(
        &self,
        id: &UserId,
        email: &str,
        name: &str,
        role: Role,
    ) -> Result<Identity, UserServiceError> {
        let current = self
            .identities
            .get_identity(id)
            .await?
            .ok_or_else(|| UserServiceError::NotFound(id.clone()))?;
        let updated = current.edited(email, name, role)?;

        if updated.email() != current.email() {
            let taken = self
                .identities
                .find_identity_by_email(updated.email())
                .await?
                .is_some_and(|other| other.id() != id);
            if taken {
                return Err(UserServiceError::DuplicateEmail(updated.email().to_owned()));
            }
        }

        let email_changed = updated.email() != current.email();
        if email_changed {
            self.credentials
                .rename_credential(current.email(), updated.email())
                .await
                .map_err(|e| duplicate_or(e, updated.email()))?;
        }

        if let Err(err) = self.identities.update_identity(&updated).await {
            if email_changed {
                if let Err(undo) = self
                    .credentials
                    .rename_credential(updated.email(), current.email())
                    .await
                {
                    tracing::warn!(user = %id, error = %undo, "failed to restore credential");
                }
            }
            return Err(duplicate_or(err, updated.email()));
        }
        Ok(updated)
    }

    /// Remove a user and its credential. Attempts and courses that reference
    /// the user are kept.
    ///
    /// # Errors
    ///
    /// Returns `UserServiceError::NotFound` for an unknown id and
    /// `UserServiceError::Storage` on persistence failures.
    pub async fn delete_user(&self, id: &UserId) -> Result<(), UserServiceError> {
        let identity = self
            .identities
            .get_identity(id)
            .await?
            .ok_or_else(|| UserServiceError::NotFound(id.clone()))?;
        self.identities.delete_identity(id).await?;
        self.credentials.remove_credential(identity.email()).await?;
        tracing::info!(user = %id, "user deleted");
        Ok(())
    }

    /// Replace a user's password after checking length and confirmation.
    ///
    /// # Errors
    ///
    /// Returns `UserServiceError::Validation` for a short or unconfirmed
    /// password, `UserServiceError::NotFound` for an unknown id, and
    /// `UserServiceError::Storage` on persistence failures.
    pub async fn reset_password(
        &self,
        id: &UserId,
        new_password: &str,
        confirmation: &str,
    ) -> Result<(), UserServiceError> {
        check_password(new_password)?;
        if new_password != confirmation {
            return Err(ValidationError::PasswordMismatch.into());
        }
        let identity = self
            .identities
            .get_identity(id)
            .await?
            .ok_or_else(|| UserServiceError::NotFound(id.clone()))?;
        self.credentials
            .set_credential(identity.email(), new_password)
            .await?;
        tracing::info!(user = %id, "password reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::time::fixed_now;
    use storage::repository::Storage;

    fn service(storage: &Storage) -> UserService {
        UserService::new(
            Clock::fixed(fixed_now()),
            Arc::clone(&storage.identities),
            Arc::clone(&storage.credentials),
        )
    }

    fn new_user(email: &str, password: &str) -> NewUser {
        NewUser {
            name: "Jane Doe".into(),
            email: email.into(),
            role: Role::Student,
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn create_stores_identity_and_credential() {
        let storage = Storage::in_memory();
        let users = service(&storage);
        let created = users
            .create_user(new_user(" jane@skillforge.com ", "secret1"))
            .await
            .unwrap();
        assert_eq!(created.email(), "jane@skillforge.com");
        assert!(created.id().as_str().starts_with("user-"));
        assert!(
            storage
                .credentials
                .verify_credential("jane@skillforge.com", "secret1")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn create_rejects_short_password_and_duplicate_email() {
        let storage = Storage::in_memory();
        let users = service(&storage);
        assert!(matches!(
            users.create_user(new_user("jane@skillforge.com", "12345")).await,
            Err(UserServiceError::Validation(ValidationError::PasswordTooShort { min: 6 }))
        ));
        users
            .create_user(new_user("jane@skillforge.com", "123456"))
            .await
            .unwrap();
        assert!(matches!(
            users.create_user(new_user("jane@skillforge.com", "abcdef")).await,
            Err(UserServiceError::DuplicateEmail(_))
        ));
        assert_eq!(users.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_moves_credential_with_email() {
        let storage = Storage::in_memory();
        let users = service(&storage);
        let jane = users
            .create_user(new_user("jane@skillforge.com", "secret1"))
            .await
            .unwrap();
        let updated = users
            .update_user(jane.id(), "jd@skillforge.com", "Jane D", Role::Mentor)
            .await
            .unwrap();
        assert_eq!(updated.role(), Role::Mentor);
        assert_eq!(updated.created_at(), jane.created_at());
        assert!(
            storage
                .credentials
                .verify_credential("jd@skillforge.com", "secret1")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn email_change_onto_existing_credential_changes_nothing() {
        let storage = Storage::in_memory();
        let users = service(&storage);
        let jane = users
            .create_user(new_user("a@x.io", "secret1"))
            .await
            .unwrap();
        storage
            .credentials
            .set_credential("b@x.io", "stale99")
            .await
            .unwrap();

        let err = users
            .update_user(jane.id(), "b@x.io", "Jane Doe", Role::Student)
            .await
            .unwrap_err();
        assert!(matches!(err, UserServiceError::DuplicateEmail(ref email) if email == "b@x.io"));

        let stored = users.get_user(jane.id()).await.unwrap().unwrap();
        assert_eq!(stored.email(), "a@x.io");
        assert!(
            storage
                .credentials
                .verify_credential("a@x.io", "secret1")
                .await
                .unwrap()
        );
        assert!(
            storage
                .credentials
                .verify_credential("b@x.io", "stale99")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn delete_removes_credential_and_reports_missing() {
        let storage = Storage::in_memory();
        let users = service(&storage);
        let jane = users
            .create_user(new_user("jane@skillforge.com", "secret1"))
            .await
            .unwrap();
        users.delete_user(jane.id()).await.unwrap();
        assert!(
            !storage
                .credentials
                .verify_credential("jane@skillforge.com", "secret1")
                .await
                .unwrap()
        );
        assert!(matches!(
            users.delete_user(jane.id()).await,
            Err(UserServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn reset_password_checks_length_then_confirmation() {
        let storage = Storage::in_memory();
        let users = service(&storage);
        let jane = users
            .create_user(new_user("jane@skillforge.com", "secret1"))
            .await
            .unwrap();
        assert!(matches!(
            users.reset_password(jane.id(), "abc", "abc").await,
            Err(UserServiceError::Validation(ValidationError::PasswordTooShort { .. }))
        ));
        assert!(matches!(
            users.reset_password(jane.id(), "newpass1", "newpass2").await,
            Err(UserServiceError::Validation(ValidationError::PasswordMismatch))
        ));
        users
            .reset_password(jane.id(), "newpass1", "newpass1")
            .await
            .unwrap();
        assert!(
            storage
                .credentials
                .verify_credential("jane@skillforge.com", "newpass1")
                .await
                .unwrap()
        );
        assert!(matches!(
            users
                .reset_password(&UserId::new("user-nobody"), "newpass1", "newpass1")
                .await,
            Err(UserServiceError::NotFound(_))
        ));
    }
}
