use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo::Character;

/// Full character payload; `user` is the owning user's id, optional in some
/// flows (a character can exist before being claimed).
#[derive(Debug, Deserialize)]
pub struct CreateCharacterRequest {
    pub user: Option<Uuid>,
    pub party: Option<Uuid>,
    pub name: String,
    pub class_level: Option<String>,
    pub background: Option<String>,
    pub race: Option<String>,
    pub alignment: Option<String>,
    pub experience_points: Option<i64>,
    pub gold: Option<i64>,
    #[serde(default)]
    pub spells: Vec<i64>,
    pub portrait: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetPartyRequest {
    pub party: Uuid,
}

/// Body of `PUT /characters/:id/spells`: one spell id per call.
#[derive(Debug, Deserialize)]
pub struct AddSpellRequest {
    pub spells: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartyRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserRef {
    pub id: Uuid,
    pub username: String,
}

/// A character with its references expanded for a response.
#[derive(Debug, Serialize)]
pub struct CharacterDetails {
    pub id: Uuid,
    pub name: String,
    pub class_level: Option<String>,
    pub background: Option<String>,
    pub race: Option<String>,
    pub alignment: Option<String>,
    pub experience_points: Option<i64>,
    pub gold: Option<i64>,
    pub spells: Vec<i64>,
    pub portrait: Option<String>,
    pub party: Option<PartyRef>,
    pub user: Option<UserRef>,
}

impl CharacterDetails {
    pub fn from_parts(c: Character, party: Option<PartyRef>, user: Option<UserRef>) -> Self {
        Self {
            id: c.id,
            name: c.name,
            class_level: c.class_level,
            background: c.background,
            race: c.race,
            alignment: c.alignment,
            experience_points: c.experience_points,
            gold: c.gold,
            spells: c.spells,
            portrait: c.portrait,
            party,
            user,
        }
    }
}

/// Outcome of `POST /characters`. `linked`/`error` only appear when the
/// character was stored but the owner's back-reference could not be written
/// ("created but not linked").
#[derive(Debug, Serialize)]
pub struct CharacterCreated {
    pub created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CharacterCreated {
    pub fn ok() -> Self {
        Self {
            created: true,
            linked: None,
            error: None,
        }
    }

    pub fn unlinked(error: String) -> Self {
        Self {
            created: true,
            linked: Some(false),
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_success_is_just_created_true() {
        let json = serde_json::to_value(CharacterCreated::ok()).unwrap();
        assert_eq!(json, serde_json::json!({ "created": true }));
    }

    #[test]
    fn partial_failure_reports_created_but_not_linked() {
        let json = serde_json::to_value(CharacterCreated::unlinked("owner missing".into())).unwrap();
        assert_eq!(json["created"], true);
        assert_eq!(json["linked"], false);
        assert_eq!(json["error"], "owner missing");
    }
}
