use chrono::NaiveDateTime;
use diesel::{AsChangeset, Associations, Identifiable, Insertable, Queryable};
use serde::{Deserialize, Serialize};

use crate::models::{schema::teams, tournament::Tournament};

#[derive(
    Debug, Clone, PartialEq, Queryable, Identifiable, Associations, Serialize, Deserialize,
)]
#[diesel(table_name = teams)]
#[diesel(belongs_to(Tournament))]
pub struct Team {
    pub id: i32,
    #[serde(rename = "teamName")]
    pub team_name: String,
    #[serde(rename = "createdAt")]
    pub created_at: NaiveDateTime,
    #[serde(rename = "tournamentId")]
    pub tournament_id: i32,
}

#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = teams)]
pub struct NewTeam {
    #[serde(rename = "teamName")]
    pub team_name: String,
    #[serde(rename = "tournamentId")]
    pub tournament_id: i32,
}

#[derive(Debug, Clone, Default, AsChangeset, Serialize, Deserialize)]
#[diesel(table_name = teams)]
pub struct TeamChanges {
    #[serde(rename = "teamName")]
    pub team_name: Option<String>,
    #[serde(rename = "tournamentId")]
    pub tournament_id: Option<i32>,
}
