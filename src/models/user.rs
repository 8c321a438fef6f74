use chrono::{NaiveDate, NaiveDateTime};
use diesel::{AsChangeset, Identifiable, Insertable, Queryable};
use serde::{Deserialize, Serialize};

use crate::models::schema::users;

#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub pseudo: String,
    pub email: String,
    pub name: String,
    pub last_name: String,
    pub password: String,
    pub sexe: String,
    pub birthday: NaiveDate,
    #[serde(rename = "createdAt")]
    pub created_at: NaiveDateTime,
    pub last_auth: NaiveDateTime,
    pub role: String,
}

/// `created_at` and `role` are filled in by the database when omitted.
#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub pseudo: String,
    pub email: String,
    pub name: String,
    pub last_name: String,
    pub password: String,
    pub sexe: String,
    pub birthday: NaiveDate,
    pub last_auth: NaiveDateTime,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, AsChangeset, Serialize, Deserialize)]
#[diesel(table_name = users)]
pub struct UserChanges {
    pub pseudo: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
    pub sexe: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub last_auth: Option<NaiveDateTime>,
    pub role: Option<String>,
}
