use chrono::NaiveDateTime;
use diesel::{AsChangeset, Associations, Identifiable, Insertable, Queryable};
use serde::{Deserialize, Serialize};

use crate::models::{schema::matches, tournament::Tournament};

/// `winner_id` is a soft reference: not a foreign key, but constrained to one
/// of the two participating teams (or null while the match is unresolved).
#[derive(
    Debug, Clone, PartialEq, Queryable, Identifiable, Associations, Serialize, Deserialize,
)]
#[diesel(table_name = matches)]
#[diesel(belongs_to(Tournament))]
pub struct Match {
    pub id: i32,
    #[serde(rename = "tournamentId")]
    pub tournament_id: i32,
    #[serde(rename = "team1Id")]
    pub team1_id: i32,
    #[serde(rename = "team2Id")]
    pub team2_id: i32,
    #[serde(rename = "team1Score")]
    pub team1_score: Option<i32>,
    #[serde(rename = "team2Score")]
    pub team2_score: Option<i32>,
    #[serde(rename = "winnerId")]
    pub winner_id: Option<i32>,
    #[serde(rename = "matchDate")]
    pub match_date: NaiveDateTime,
    pub status: String,
    #[serde(rename = "createdAt")]
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = matches)]
pub struct NewMatch {
    #[serde(rename = "tournamentId")]
    pub tournament_id: i32,
    #[serde(rename = "team1Id")]
    pub team1_id: i32,
    #[serde(rename = "team2Id")]
    pub team2_id: i32,
    #[serde(default, rename = "team1Score")]
    pub team1_score: Option<i32>,
    #[serde(default, rename = "team2Score")]
    pub team2_score: Option<i32>,
    #[serde(default, rename = "winnerId")]
    pub winner_id: Option<i32>,
    #[serde(rename = "matchDate")]
    pub match_date: NaiveDateTime,
    pub status: String,
}

#[derive(Debug, Clone, Default, AsChangeset, Serialize, Deserialize)]
#[diesel(table_name = matches)]
pub struct MatchChanges {
    #[serde(rename = "team1Score")]
    pub team1_score: Option<Option<i32>>,
    #[serde(rename = "team2Score")]
    pub team2_score: Option<Option<i32>>,
    #[serde(rename = "winnerId")]
    pub winner_id: Option<Option<i32>>,
    #[serde(rename = "matchDate")]
    pub match_date: Option<NaiveDateTime>,
    pub status: Option<String>,
}
