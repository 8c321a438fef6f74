use diesel::{AsChangeset, Identifiable, Insertable, Queryable};
use serde::{Deserialize, Serialize};

use crate::models::schema::tournament_types;

#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = tournament_types)]
pub struct TournamentType {
    pub id: i32,
    #[serde(rename = "type")]
    pub type_: String,
}

#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = tournament_types)]
pub struct NewTournamentType {
    #[serde(rename = "type")]
    pub type_: String,
}

#[derive(Debug, Clone, Default, AsChangeset, Serialize, Deserialize)]
#[diesel(table_name = tournament_types)]
pub struct TournamentTypeChanges {
    #[serde(rename = "type")]
    pub type_: Option<String>,
}
