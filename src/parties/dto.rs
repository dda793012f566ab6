use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreatePartyRequest {
    pub name: Option<String>,
    #[serde(default)]
    pub members: Vec<Uuid>,
}

/// Body of `PUT /parties/:id/add`: one character id per call.
#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub members: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub name: Option<String>,
}

/// What a member looks like inside an expanded party.
#[derive(Debug, Clone, Serialize)]
pub struct MemberSummary {
    pub id: Uuid,
    pub name: String,
    pub portrait: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PartyDetails {
    pub id: Uuid,
    pub name: String,
    pub members: Vec<MemberSummary>,
}

#[derive(Debug, Serialize)]
pub struct PartyCreated {
    pub created: bool,
}
