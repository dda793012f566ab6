use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database. The `characters` column is the ordered list
/// of character ids this user owns.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub access_token: String,
    pub characters: Vec<Uuid>,
    pub created_at: OffsetDateTime,
}

impl User {
    /// Find a user by id. A missing row is `None`, never an error.
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, access_token, characters, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Find a user by username.
    pub async fn find_by_username(db: &PgPool, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, access_token, characters, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user with a hashed password and a fresh access token.
    /// Uniqueness of username and email is enforced by the store; violations
    /// surface here as database errors.
    pub async fn create(
        db: &PgPool,
        username: &str,
        email: &str,
        password_hash: &str,
        access_token: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, access_token)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, password_hash, access_token, characters, created_at
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(access_token)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Append a character id to the owner's `characters` list.
    pub async fn link_character(
        db: &PgPool,
        user_id: Uuid,
        character_id: Uuid,
    ) -> anyhow::Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET characters = array_append(characters, $2)
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(character_id)
        .execute(db)
        .await?;
        anyhow::ensure!(result.rows_affected() == 1, "owner {user_id} not found");
        Ok(())
    }

    /// Usernames for a set of user ids, for reference expansion.
    pub async fn usernames_by_ids(
        db: &PgPool,
        ids: &[Uuid],
    ) -> anyhow::Result<Vec<(Uuid, String)>> {
        let rows = sqlx::query_as::<_, (Uuid, String)>(
            r#"
            SELECT id, username
            FROM users
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_never_serialize() {
        let user = User {
            id: Uuid::new_v4(),
            username: "alvis".into(),
            email: "alvis@example.com".into(),
            password_hash: "$argon2id$not-a-real-hash".into(),
            access_token: "token-value".into(),
            characters: vec![],
            created_at: OffsetDateTime::UNIX_EPOCH,
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("access_token"));
        assert!(!json.contains("token-value"));
        assert!(json.contains("alvis"));
    }
}
