use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, ser, write_err};
use crate::repository::{CredentialRepository, StorageError, TokenStore};

/// The single slot holding the current session token.
const CURRENT_SLOT: &str = "current";

#[async_trait::async_trait]
impl CredentialRepository for SqliteRepository {
    async fn verify_credential(&self, email: &str, secret: &str) -> Result<bool, StorageError> {
        let row = sqlx::query("SELECT secret FROM credentials WHERE email = ?1")
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        match row {
            Some(row) => {
                let stored: String = row.try_get("secret").map_err(ser)?;
                Ok(stored == secret)
            }
            None => Ok(false),
        }
    }

    async fn set_credential(&self, email: &str, secret: &str) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO credentials (email, secret) VALUES (?1, ?2)
            ON CONFLICT(email) DO UPDATE SET secret = excluded.secret
            ",
        )
        .bind(email.trim())
        .bind(secret)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn rename_credential(&self, from: &str, to: &str) -> Result<(), StorageError> {
        sqlx::query("UPDATE credentials SET email = ?2 WHERE email = ?1")
            .bind(from.trim())
            .bind(to.trim())
            .execute(&self.pool)
            .await
            .map_err(write_err)?;
        Ok(())
    }

    async fn remove_credential(&self, email: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM credentials WHERE email = ?1")
            .bind(email.trim())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl TokenStore for SqliteRepository {
    async fn load_token(&self) -> Result<Option<String>, StorageError> {
        let row = sqlx::query("SELECT token FROM session_tokens WHERE slot = ?1")
            .bind(CURRENT_SLOT)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        row.map(|r| r.try_get::<String, _>("token").map_err(ser))
            .transpose()
    }

    async fn save_token(&self, token: &str) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO session_tokens (slot, token) VALUES (?1, ?2)
            ON CONFLICT(slot) DO UPDATE SET token = excluded.token
            ",
        )
        .bind(CURRENT_SLOT)
        .bind(token)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn clear_token(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM session_tokens WHERE slot = ?1")
            .bind(CURRENT_SLOT)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }
}
