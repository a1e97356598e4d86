use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::User;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamProjectsResponse {
    pub projects: Vec<TeamProject>,
}

/// A project belonging to a team, as visible to the token owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamProject {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionsResponse {
    pub versions: Vec<Version>,
}

/// A saved version of a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub user: User,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
