//! Client model and lookup strategies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Client (patient, ward, or external buyer) that invoices are billed to.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub client_id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub linked_user_id: Option<Uuid>,
    pub removed: bool,
    pub created_utc: DateTime<Utc>,
}

/// Input for creating a client.
#[derive(Debug, Clone)]
pub struct CreateClient {
    pub org_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub linked_user_id: Option<Uuid>,
}

/// Which lookup strategy produced a client match.
///
/// The strategies form an explicit priority list so callers can reason about
/// match confidence instead of an implicit fallback cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedBy {
    Id,
    LinkedUser,
    Email,
    NamePattern,
}

impl MatchedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchedBy::Id => "id",
            MatchedBy::LinkedUser => "linked_user",
            MatchedBy::Email => "email",
            MatchedBy::NamePattern => "name_pattern",
        }
    }
}

/// Lookup keys, tried in declaration order (strongest first).
#[derive(Debug, Clone, Default)]
pub struct ClientLookup {
    pub client_id: Option<Uuid>,
    pub linked_user_id: Option<Uuid>,
    pub email: Option<String>,
    pub name: Option<String>,
}
