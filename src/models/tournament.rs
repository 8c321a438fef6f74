use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use diesel::{AsChangeset, Associations, Identifiable, Insertable, Queryable};
use serde::{Deserialize, Serialize};

use crate::models::{game::Game, schema::tournaments, tournament_type::TournamentType};

#[derive(
    Debug, Clone, PartialEq, Queryable, Identifiable, Associations, Serialize, Deserialize,
)]
#[diesel(table_name = tournaments)]
#[diesel(belongs_to(Game))]
#[diesel(belongs_to(TournamentType))]
pub struct Tournament {
    pub id: i32,
    #[serde(rename = "tournamentName")]
    pub tournament_name: String,
    #[serde(rename = "startDate")]
    pub start_date: NaiveDate,
    #[serde(rename = "startTime")]
    pub start_time: NaiveTime,
    pub format: String,
    pub rules: String,
    #[serde(rename = "maxParticipants")]
    pub max_participants: i32,
    #[serde(rename = "minTeams")]
    pub min_teams: i32,
    #[serde(rename = "playersPerTeam")]
    pub players_per_team: i32,
    #[serde(rename = "totalPlayers")]
    pub total_players: i32,
    pub rewards: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: NaiveDateTime,
    #[serde(rename = "updatedAt")]
    pub updated_at: NaiveDateTime,
    #[serde(rename = "gameId")]
    pub game_id: i32,
    #[serde(rename = "tournament_typeId")]
    pub tournament_type_id: i32,
}

/// `updated_at` is caller-supplied on purpose; there is no update trigger.
#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = tournaments)]
pub struct NewTournament {
    #[serde(rename = "tournamentName")]
    pub tournament_name: String,
    #[serde(rename = "startDate")]
    pub start_date: NaiveDate,
    #[serde(rename = "startTime")]
    pub start_time: NaiveTime,
    pub format: String,
    pub rules: String,
    #[serde(rename = "maxParticipants")]
    pub max_participants: i32,
    #[serde(rename = "minTeams")]
    pub min_teams: i32,
    #[serde(rename = "playersPerTeam")]
    pub players_per_team: i32,
    #[serde(rename = "totalPlayers")]
    pub total_players: i32,
    #[serde(default)]
    pub rewards: Option<String>,
    #[serde(rename = "updatedAt")]
    pub updated_at: NaiveDateTime,
    #[serde(rename = "gameId")]
    pub game_id: i32,
    #[serde(rename = "tournament_typeId")]
    pub tournament_type_id: i32,
}

#[derive(Debug, Clone, Default, AsChangeset, Serialize, Deserialize)]
#[diesel(table_name = tournaments)]
pub struct TournamentChanges {
    #[serde(rename = "tournamentName")]
    pub tournament_name: Option<String>,
    #[serde(rename = "startDate")]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "startTime")]
    pub start_time: Option<NaiveTime>,
    pub format: Option<String>,
    pub rules: Option<String>,
    #[serde(rename = "maxParticipants")]
    pub max_participants: Option<i32>,
    #[serde(rename = "minTeams")]
    pub min_teams: Option<i32>,
    #[serde(rename = "playersPerTeam")]
    pub players_per_team: Option<i32>,
    #[serde(rename = "totalPlayers")]
    pub total_players: Option<i32>,
    /// `Some(None)` clears the column.
    pub rewards: Option<Option<String>>,
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<NaiveDateTime>,
    #[serde(rename = "gameId")]
    pub game_id: Option<i32>,
    #[serde(rename = "tournament_typeId")]
    pub tournament_type_id: Option<i32>,
}
