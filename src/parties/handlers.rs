use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use sqlx::PgPool;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    characters,
    error::{constraint_message, ApiError},
    state::AppState,
};

use super::dto::{
    AddMemberRequest, CreatePartyRequest, ListQuery, MemberSummary, PartyCreated, PartyDetails,
};
use super::repo::{self, Party};

/// The name filter returns at most this many parties.
const MAX_NAME_MATCHES: usize = 5;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/parties", get(list_parties))
        .route("/parties/:id", get(get_party))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/parties", post(create_party))
        .route("/parties/:id/add", put(add_member))
}

#[instrument(skip(state))]
pub async fn list_parties(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<PartyDetails>>, ApiError> {
    let mut parties = repo::list_all(&state.db).await?;
    // The filter runs here, after the fetch, not in the store.
    if let Some(needle) = q.name.as_deref() {
        parties = filter_by_name(parties, needle);
    }
    let details = expand(&state.db, parties).await?;
    Ok(Json(details))
}

#[instrument(skip(state))]
pub async fn get_party(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PartyDetails>, ApiError> {
    let party = repo::find(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("party"))?;
    let mut details = expand(&state.db, vec![party]).await?;
    Ok(Json(details.remove(0)))
}

#[instrument(skip(state, payload))]
pub async fn create_party(
    State(state): State<AppState>,
    Json(payload): Json<CreatePartyRequest>,
) -> Result<(StatusCode, Json<PartyCreated>), ApiError> {
    let name = payload.name.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        warn!("party creation without a name");
        return Err(ApiError::Validation("a party name must be provided".into()));
    }

    match repo::create(&state.db, name, &payload.members).await {
        Ok(party) => {
            info!(party_id = %party.id, name = %party.name, "party created");
            Ok((StatusCode::CREATED, Json(PartyCreated { created: true })))
        }
        Err(e) => match constraint_message(&e) {
            Some(msg) => Err(ApiError::Validation(msg)),
            None => Err(ApiError::Internal(e)),
        },
    }
}

/// Appends to the party's member list only. The character's `party_id` stays
/// as it was; `PUT /characters/:id/party` is the other half.
#[instrument(skip(state, payload))]
pub async fn add_member(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddMemberRequest>,
) -> Result<(StatusCode, Json<PartyCreated>), ApiError> {
    match repo::add_member(&state.db, id, payload.members).await {
        Ok(0) => Err(ApiError::Validation("party not found".into())),
        Ok(_) => {
            info!(party_id = %id, character_id = %payload.members, "member added to party");
            Ok((StatusCode::CREATED, Json(PartyCreated { created: true })))
        }
        Err(e) => match constraint_message(&e) {
            Some(msg) => Err(ApiError::Validation(msg)),
            None => Err(ApiError::Internal(e)),
        },
    }
}

/// Case-insensitive substring match on the party name, capped to the first
/// `MAX_NAME_MATCHES` hits.
fn filter_by_name(parties: Vec<Party>, needle: &str) -> Vec<Party> {
    let needle = needle.to_lowercase();
    parties
        .into_iter()
        .filter(|p| p.name.to_lowercase().contains(&needle))
        .take(MAX_NAME_MATCHES)
        .collect()
}

/// Expand member id lists into summaries with one batch query. Order and
/// duplicates in each member list are preserved; dangling ids are skipped.
async fn expand(db: &PgPool, parties: Vec<Party>) -> anyhow::Result<Vec<PartyDetails>> {
    let member_ids: Vec<Uuid> = parties.iter().flat_map(|p| p.members.iter().copied()).collect();
    let summaries: HashMap<Uuid, MemberSummary> = characters::repo::by_ids(db, &member_ids)
        .await?
        .into_iter()
        .map(|c| {
            (
                c.id,
                MemberSummary {
                    id: c.id,
                    name: c.name,
                    portrait: c.portrait,
                },
            )
        })
        .collect();

    Ok(parties
        .into_iter()
        .map(|p| PartyDetails {
            id: p.id,
            name: p.name,
            members: expand_members(&p.members, &summaries),
        })
        .collect())
}

fn expand_members(
    members: &[Uuid],
    summaries: &HashMap<Uuid, MemberSummary>,
) -> Vec<MemberSummary> {
    members
        .iter()
        .filter_map(|id| summaries.get(id).cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn party(name: &str) -> Party {
        Party {
            id: Uuid::new_v4(),
            name: name.into(),
            members: vec![],
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn name_filter_is_case_insensitive_substring() {
        let parties = vec![party("Dragonslayers"), party("The Wandering Few")];
        let hits = filter_by_name(parties, "drag");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Dragonslayers");
    }

    #[test]
    fn name_filter_caps_at_five_matches() {
        let parties: Vec<Party> = (0..8).map(|i| party(&format!("Dragon {i}"))).collect();
        let hits = filter_by_name(parties, "DRAGON");
        assert_eq!(hits.len(), MAX_NAME_MATCHES);
        assert_eq!(hits[0].name, "Dragon 0");
    }

    #[test]
    fn name_filter_with_no_match_is_empty() {
        let hits = filter_by_name(vec![party("Dragonslayers")], "kobold");
        assert!(hits.is_empty());
    }

    #[test]
    fn member_expansion_keeps_order_and_duplicates() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let summaries = HashMap::from([
            (
                a,
                MemberSummary {
                    id: a,
                    name: "Korag".into(),
                    portrait: None,
                },
            ),
            (
                b,
                MemberSummary {
                    id: b,
                    name: "Lira".into(),
                    portrait: Some("lira.png".into()),
                },
            ),
        ]);

        let members = vec![b, a, b];
        let expanded = expand_members(&members, &summaries);
        assert_eq!(expanded.len(), 3);
        assert_eq!(expanded[0].name, "Lira");
        assert_eq!(expanded[1].name, "Korag");
        assert_eq!(expanded[2].name, "Lira");
    }

    #[test]
    fn member_expansion_skips_dangling_ids() {
        let expanded = expand_members(&[Uuid::new_v4()], &HashMap::new());
        assert!(expanded.is_empty());
    }
}
