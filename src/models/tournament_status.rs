use chrono::NaiveDateTime;
use diesel::{AsChangeset, Associations, Identifiable, Insertable, Queryable};
use serde::{Deserialize, Serialize};

use crate::models::{schema::tournament_statuses, tournament::Tournament};

/// One row per state transition; the latest `updated_at` is the current
/// status of the owning tournament.
#[derive(
    Debug, Clone, PartialEq, Queryable, Identifiable, Associations, Serialize, Deserialize,
)]
#[diesel(table_name = tournament_statuses)]
#[diesel(belongs_to(Tournament))]
pub struct TournamentStatus {
    pub id: i32,
    pub status: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: NaiveDateTime,
    #[serde(rename = "tournamentId")]
    pub tournament_id: i32,
}

#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = tournament_statuses)]
pub struct NewTournamentStatus {
    pub status: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: NaiveDateTime,
    #[serde(rename = "tournamentId")]
    pub tournament_id: i32,
}

#[derive(Debug, Clone, Default, AsChangeset, Serialize, Deserialize)]
#[diesel(table_name = tournament_statuses)]
pub struct TournamentStatusChanges {
    pub status: Option<String>,
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<NaiveDateTime>,
}
