use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Party record. `members` is an order-preserving list of character ids; the
/// store does not prevent duplicates.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Party {
    pub id: Uuid,
    pub name: String,
    pub members: Vec<Uuid>,
    pub created_at: OffsetDateTime,
}

pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<Party>> {
    let rows = sqlx::query_as::<_, Party>(
        r#"
        SELECT id, name, members, created_at
        FROM parties
        ORDER BY name ASC, id ASC
        "#,
    )
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Party>> {
    let row = sqlx::query_as::<_, Party>(
        r#"
        SELECT id, name, members, created_at
        FROM parties
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn create(db: &PgPool, name: &str, members: &[Uuid]) -> anyhow::Result<Party> {
    let row = sqlx::query_as::<_, Party>(
        r#"
        INSERT INTO parties (name, members)
        VALUES ($1, $2)
        RETURNING id, name, members, created_at
        "#,
    )
    .bind(name)
    .bind(members)
    .fetch_one(db)
    .await?;
    Ok(row)
}

/// Append a character id to `members`. No dedup, and the character's own
/// `party_id` is not touched; `PUT /characters/:id/party` is the other half.
pub async fn add_member(db: &PgPool, id: Uuid, character_id: Uuid) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE parties
        SET members = array_append(members, $2)
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(character_id)
    .execute(db)
    .await?;
    Ok(result.rows_affected())
}

/// Party names for a set of ids, for reference expansion.
pub async fn names_by_ids(db: &PgPool, ids: &[Uuid]) -> anyhow::Result<Vec<(Uuid, String)>> {
    let rows = sqlx::query_as::<_, (Uuid, String)>(
        r#"
        SELECT id, name
        FROM parties
        WHERE id = ANY($1)
        "#,
    )
    .bind(ids)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
