use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::dto::CreateCharacterRequest;

/// Character record. `user_id` points at the owning user (optional in some
/// creation flows); `party_id` holds the at-most-one party membership.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Character {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub party_id: Option<Uuid>,
    pub name: String,
    pub class_level: Option<String>,
    pub background: Option<String>,
    pub race: Option<String>,
    pub alignment: Option<String>,
    pub experience_points: Option<i64>,
    pub gold: Option<i64>,
    pub spells: Vec<i64>,
    pub portrait: Option<String>,
    pub created_at: OffsetDateTime,
}

/// All characters, name-sorted with an id tiebreak so the order is stable.
pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<Character>> {
    let rows = sqlx::query_as::<_, Character>(
        r#"
        SELECT id, user_id, party_id, name, class_level, background, race, alignment,
               experience_points, gold, spells, portrait, created_at
        FROM characters
        ORDER BY name ASC, id ASC
        "#,
    )
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Character>> {
    let row = sqlx::query_as::<_, Character>(
        r#"
        SELECT id, user_id, party_id, name, class_level, background, race, alignment,
               experience_points, gold, spells, portrait, created_at
        FROM characters
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

/// Batch fetch for reference expansion. Order and duplicates of the input
/// are NOT preserved here; see [`in_reference_order`].
pub async fn by_ids(db: &PgPool, ids: &[Uuid]) -> anyhow::Result<Vec<Character>> {
    let rows = sqlx::query_as::<_, Character>(
        r#"
        SELECT id, user_id, party_id, name, class_level, background, race, alignment,
               experience_points, gold, spells, portrait, created_at
        FROM characters
        WHERE id = ANY($1)
        "#,
    )
    .bind(ids)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn create(db: &PgPool, c: &CreateCharacterRequest) -> anyhow::Result<Character> {
    let row = sqlx::query_as::<_, Character>(
        r#"
        INSERT INTO characters (user_id, party_id, name, class_level, background, race,
                                alignment, experience_points, gold, spells, portrait)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING id, user_id, party_id, name, class_level, background, race, alignment,
                  experience_points, gold, spells, portrait, created_at
        "#,
    )
    .bind(c.user)
    .bind(c.party)
    .bind(&c.name)
    .bind(&c.class_level)
    .bind(&c.background)
    .bind(&c.race)
    .bind(&c.alignment)
    .bind(c.experience_points)
    .bind(c.gold)
    .bind(&c.spells)
    .bind(&c.portrait)
    .fetch_one(db)
    .await?;
    Ok(row)
}

/// Point the character at a party. Does NOT touch the party's member list;
/// `PUT /parties/:id/add` is the other half of that relationship.
pub async fn set_party(db: &PgPool, id: Uuid, party_id: Uuid) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE characters
        SET party_id = $2
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(party_id)
    .execute(db)
    .await?;
    Ok(result.rows_affected())
}

/// Append one spell id. No dedup: casting the same append twice leaves two
/// entries.
pub async fn add_spell(db: &PgPool, id: Uuid, spell: i64) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE characters
        SET spells = array_append(spells, $2)
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(spell)
    .execute(db)
    .await?;
    Ok(result.rows_affected())
}

/// Re-order a batch-fetched set of rows to match a reference list. Duplicate
/// references duplicate the record; dangling references are skipped.
pub fn in_reference_order(order: &[Uuid], rows: Vec<Character>) -> Vec<Character> {
    let by_id: HashMap<Uuid, Character> = rows.into_iter().map(|c| (c.id, c)).collect();
    order
        .iter()
        .filter_map(|id| by_id.get(id).cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn character(name: &str) -> Character {
        Character {
            id: Uuid::new_v4(),
            user_id: None,
            party_id: None,
            name: name.into(),
            class_level: None,
            background: None,
            race: None,
            alignment: None,
            experience_points: None,
            gold: None,
            spells: vec![],
            portrait: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn reference_order_wins_over_fetch_order() {
        let a = character("a");
        let b = character("b");
        let order = vec![b.id, a.id];
        let expanded = in_reference_order(&order, vec![a.clone(), b.clone()]);
        assert_eq!(expanded.len(), 2);
        assert_eq!(expanded[0].id, b.id);
        assert_eq!(expanded[1].id, a.id);
    }

    #[test]
    fn duplicate_references_expand_twice() {
        let a = character("a");
        let order = vec![a.id, a.id];
        let expanded = in_reference_order(&order, vec![a.clone()]);
        assert_eq!(expanded.len(), 2);
        assert_eq!(expanded[0].id, expanded[1].id);
    }

    #[test]
    fn dangling_references_are_skipped() {
        let a = character("a");
        let order = vec![Uuid::new_v4(), a.id];
        let expanded = in_reference_order(&order, vec![a.clone()]);
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].id, a.id);
    }
}
