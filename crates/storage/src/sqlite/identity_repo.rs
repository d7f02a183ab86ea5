use quiz_core::model::{Identity, Role, UserId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{conn, expect_affected, ser, write_err};
use crate::repository::{IdentityRepository, StorageError};

const SELECT_USERS: &str = "SELECT id, email, name, role, created_at FROM users";

fn identity_from_row(row: &SqliteRow) -> Result<Identity, StorageError> {
    let role: Role = row
        .try_get::<String, _>("role")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    Identity::new(
        UserId::new(row.try_get::<String, _>("id").map_err(ser)?),
        row.try_get::<String, _>("email").map_err(ser)?,
        row.try_get::<String, _>("name").map_err(ser)?,
        role,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

#[async_trait::async_trait]
impl IdentityRepository for SqliteRepository {
    async fn list_identities(&self) -> Result<Vec<Identity>, StorageError> {
        let rows = sqlx::query(&format!("{SELECT_USERS} ORDER BY seq ASC"))
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
        rows.iter().map(identity_from_row).collect()
    }

    async fn get_identity(&self, id: &UserId) -> Result<Option<Identity>, StorageError> {
        let row = sqlx::query(&format!("{SELECT_USERS} WHERE id = ?1"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        row.as_ref().map(identity_from_row).transpose()
    }

    async fn find_identity_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Identity>, StorageError> {
        let row = sqlx::query(&format!("{SELECT_USERS} WHERE email = ?1"))
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        row.as_ref().map(identity_from_row).transpose()
    }

    async fn insert_identity(&self, identity: &Identity) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO users (id, email, name, role, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(identity.id().as_str())
        .bind(identity.email())
        .bind(identity.name())
        .bind(identity.role().as_str())
        .bind(identity.created_at())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(())
    }

    async fn update_identity(&self, identity: &Identity) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE users SET email = ?2, name = ?3, role = ?4
            WHERE id = ?1
            ",
        )
        .bind(identity.id().as_str())
        .bind(identity.email())
        .bind(identity.name())
        .bind(identity.role().as_str())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        expect_affected(res.rows_affected())
    }

    async fn delete_identity(&self, id: &UserId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        expect_affected(res.rows_affected())
    }
}
