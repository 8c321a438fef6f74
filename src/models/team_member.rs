use chrono::NaiveDateTime;
use diesel::{AsChangeset, Associations, Identifiable, Insertable, Queryable};
use serde::{Deserialize, Serialize};

use crate::models::{schema::team_members, team::Team, user::User};

/// Join entity between users and teams. `(user_id, team_id)` is unique.
#[derive(
    Debug, Clone, PartialEq, Queryable, Identifiable, Associations, Serialize, Deserialize,
)]
#[diesel(table_name = team_members)]
#[diesel(belongs_to(User))]
#[diesel(belongs_to(Team))]
pub struct TeamMember {
    pub id: i32,
    pub role: String,
    pub joined_at: NaiveDateTime,
    #[serde(rename = "userId")]
    pub user_id: i32,
    #[serde(rename = "teamId")]
    pub team_id: i32,
}

#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = team_members)]
pub struct NewTeamMember {
    pub role: String,
    #[serde(rename = "userId")]
    pub user_id: i32,
    #[serde(rename = "teamId")]
    pub team_id: i32,
}

#[derive(Debug, Clone, Default, AsChangeset, Serialize, Deserialize)]
#[diesel(table_name = team_members)]
pub struct TeamMemberChanges {
    pub role: Option<String>,
}
