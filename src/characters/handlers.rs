use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use sqlx::PgPool;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::repo::User,
    error::{constraint_message, ApiError},
    parties,
    state::AppState,
};

use super::dto::{
    AddSpellRequest, CharacterCreated, CharacterDetails, CreateCharacterRequest, PartyRef,
    SetPartyRequest, UserRef,
};
use super::repo::{self, Character};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/characters", get(list_characters))
        .route("/characters/:id", get(get_character))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/characters", post(create_character))
        .route("/characters/:id/party", put(set_party))
        .route("/characters/:id/spells", put(append_spell))
}

#[instrument(skip(state))]
pub async fn list_characters(
    State(state): State<AppState>,
) -> Result<Json<Vec<CharacterDetails>>, ApiError> {
    let chars = repo::list_all(&state.db).await?;
    let details = expand(&state.db, chars).await?;
    Ok(Json(details))
}

#[instrument(skip(state))]
pub async fn get_character(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CharacterDetails>, ApiError> {
    let character = repo::find(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("character"))?;
    let mut details = expand(&state.db, vec![character]).await?;
    // expand() returns exactly one entry for one row
    Ok(Json(details.remove(0)))
}

/// Two-step, non-transactional create: the character row first, then the
/// owner's back-reference. A failed back-reference is retried once and then
/// surfaced as `{created:true, linked:false}` rather than masked as success.
#[instrument(skip(state, payload))]
pub async fn create_character(
    State(state): State<AppState>,
    Json(payload): Json<CreateCharacterRequest>,
) -> Result<(StatusCode, Json<CharacterCreated>), ApiError> {
    let character = match repo::create(&state.db, &payload).await {
        Ok(c) => c,
        Err(e) => {
            return match constraint_message(&e) {
                Some(msg) => {
                    warn!(name = %payload.name, error = %msg, "character rejected by store");
                    Err(ApiError::CharacterValidation(msg))
                }
                None => Err(ApiError::Internal(e)),
            }
        }
    };

    if let Some(owner) = payload.user {
        if let Err(first) = User::link_character(&state.db, owner, character.id).await {
            warn!(error = %first, %owner, character_id = %character.id, "owner link failed, retrying");
            if let Err(second) = User::link_character(&state.db, owner, character.id).await {
                error!(error = %second, %owner, character_id = %character.id, "character created but not linked");
                return Ok((
                    StatusCode::CREATED,
                    Json(CharacterCreated::unlinked(second.to_string())),
                ));
            }
        }
    }

    info!(character_id = %character.id, name = %character.name, "character created");
    Ok((StatusCode::CREATED, Json(CharacterCreated::ok())))
}

/// Sets only the character's side of the relationship. Callers who want the
/// party's member list to agree must also call `PUT /parties/:id/add`.
#[instrument(skip(state, payload))]
pub async fn set_party(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetPartyRequest>,
) -> Result<(StatusCode, Json<CharacterCreated>), ApiError> {
    match repo::set_party(&state.db, id, payload.party).await {
        Ok(0) => Err(ApiError::CharacterValidation("character not found".into())),
        Ok(_) => {
            info!(character_id = %id, party_id = %payload.party, "character joined party");
            Ok((StatusCode::CREATED, Json(CharacterCreated::ok())))
        }
        Err(e) => match constraint_message(&e) {
            Some(msg) => Err(ApiError::CharacterValidation(msg)),
            None => Err(ApiError::Internal(e)),
        },
    }
}

#[instrument(skip(state, payload))]
pub async fn append_spell(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddSpellRequest>,
) -> Result<(StatusCode, Json<CharacterCreated>), ApiError> {
    match repo::add_spell(&state.db, id, payload.spells).await {
        Ok(0) => Err(ApiError::CharacterValidation("character not found".into())),
        Ok(_) => {
            info!(character_id = %id, spell = payload.spells, "spell appended");
            Ok((StatusCode::CREATED, Json(CharacterCreated::ok())))
        }
        Err(e) => match constraint_message(&e) {
            Some(msg) => Err(ApiError::CharacterValidation(msg)),
            None => Err(ApiError::Internal(e)),
        },
    }
}

/// Resolve party and owner references for a batch of characters with one
/// query per referenced table.
async fn expand(db: &PgPool, chars: Vec<Character>) -> anyhow::Result<Vec<CharacterDetails>> {
    let party_ids: Vec<Uuid> = chars.iter().filter_map(|c| c.party_id).collect();
    let user_ids: Vec<Uuid> = chars.iter().filter_map(|c| c.user_id).collect();

    let party_names: HashMap<Uuid, String> = parties::repo::names_by_ids(db, &party_ids)
        .await?
        .into_iter()
        .collect();
    let usernames: HashMap<Uuid, String> = User::usernames_by_ids(db, &user_ids)
        .await?
        .into_iter()
        .collect();

    Ok(join_refs(chars, &party_names, &usernames))
}

fn join_refs(
    chars: Vec<Character>,
    party_names: &HashMap<Uuid, String>,
    usernames: &HashMap<Uuid, String>,
) -> Vec<CharacterDetails> {
    chars
        .into_iter()
        .map(|c| {
            let party = c.party_id.and_then(|id| {
                party_names.get(&id).map(|name| PartyRef {
                    id,
                    name: name.clone(),
                })
            });
            let user = c.user_id.and_then(|id| {
                usernames.get(&id).map(|username| UserRef {
                    id,
                    username: username.clone(),
                })
            });
            CharacterDetails::from_parts(c, party, user)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn character(name: &str, party_id: Option<Uuid>, user_id: Option<Uuid>) -> Character {
        Character {
            id: Uuid::new_v4(),
            user_id,
            party_id,
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
    fn join_expands_known_references() {
        let party_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let party_names = HashMap::from([(party_id, "Dragonslayers".to_string())]);
        let usernames = HashMap::from([(user_id, "alvis".to_string())]);

        let details = join_refs(
            vec![character("Korag", Some(party_id), Some(user_id))],
            &party_names,
            &usernames,
        );

        assert_eq!(details.len(), 1);
        assert_eq!(details[0].party.as_ref().unwrap().name, "Dragonslayers");
        assert_eq!(details[0].user.as_ref().unwrap().username, "alvis");
    }

    #[test]
    fn join_leaves_dangling_references_unexpanded() {
        let details = join_refs(
            vec![character("Korag", Some(Uuid::new_v4()), None)],
            &HashMap::new(),
            &HashMap::new(),
        );

        assert!(details[0].party.is_none());
        assert!(details[0].user.is_none());
    }
}
