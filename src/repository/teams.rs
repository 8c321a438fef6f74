use std::collections::HashMap;

use chrono::NaiveDateTime;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::models::schema::{team_members, teams, tournaments, users};
use crate::models::team::{NewTeam, Team, TeamChanges};
use crate::models::team_member::TeamMember;
use crate::models::user::User;
use crate::query::filter::{cmp_cond, str_cond};
use crate::query::sort::order_cond;
use crate::query::{
    compile, group, AggregateRow, AggregateSelection, Cmp, DynCond, DynOrder, FieldMeta, Filter,
    GroupQuery, OrderBy, Page, RelationParams, StrFilter,
};
use crate::repository::error::StoreError;
use crate::repository::numeric_aggregates;
use crate::repository::team_members::{
    condition as team_member_cond, query as team_members_query, TeamMemberField,
    TeamMemberPredicate,
};
use crate::repository::tournaments::{condition as tournament_cond, TournamentPredicate};

const ENTITY: &str = "Team";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TeamField {
    Id,
    TeamName,
    CreatedAt,
    TournamentId,
}

impl FieldMeta for TeamField {
    const TABLE: &'static str = "teams";

    fn column(&self) -> &'static str {
        match self {
            TeamField::Id => "id",
            TeamField::TeamName => "team_name",
            TeamField::CreatedAt => "created_at",
            TeamField::TournamentId => "tournament_id",
        }
    }

    fn numeric(&self) -> bool {
        matches!(self, TeamField::Id | TeamField::TournamentId)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TeamPredicate {
    Id(Cmp<i32>),
    TeamName(StrFilter),
    CreatedAt(Cmp<NaiveDateTime>),
    TournamentId(Cmp<i32>),
    /// The owning tournament matches the nested filter.
    Tournament(Box<Filter<TournamentPredicate>>),
    /// At least one member of the team matches the nested filter.
    HasMember(Box<Filter<TeamMemberPredicate>>),
}

pub type TeamFilter = Filter<TeamPredicate>;

pub(crate) fn condition(p: &TeamPredicate) -> Result<DynCond<teams::table>, StoreError> {
    Ok(match p {
        TeamPredicate::Id(c) => cmp_cond!(teams::id, c),
        TeamPredicate::TeamName(f) => str_cond!(teams::team_name, f),
        TeamPredicate::CreatedAt(c) => cmp_cond!(teams::created_at, c),
        TeamPredicate::TournamentId(c) => cmp_cond!(teams::tournament_id, c),
        TeamPredicate::Tournament(inner) => {
            let sub = compile(inner, &tournament_cond)?;
            Box::new(
                teams::tournament_id
                    .eq_any(tournaments::table.filter(sub).select(tournaments::id).into_boxed())
                    .nullable(),
            )
        }
        TeamPredicate::HasMember(inner) => {
            let sub = compile(inner, &team_member_cond)?;
            Box::new(
                teams::id
                    .eq_any(team_members::table.filter(sub).select(team_members::team_id).into_boxed())
                    .nullable(),
            )
        }
    })
}

fn order(o: &OrderBy<TeamField>) -> DynOrder<teams::table> {
    match o.field {
        TeamField::Id => order_cond!(teams::id, o),
        TeamField::TeamName => order_cond!(teams::team_name, o),
        TeamField::CreatedAt => order_cond!(teams::created_at, o),
        TeamField::TournamentId => order_cond!(teams::tournament_id, o),
    }
}

pub(crate) fn query(
    filter: &TeamFilter,
    order_by: &[OrderBy<TeamField>],
    page: Option<Page>,
) -> Result<teams::BoxedQuery<'static, Pg>, StoreError> {
    if let Some(page) = &page {
        page.check(order_by.len())?;
    }
    let mut q = teams::table.into_boxed();
    q = q.filter(compile(filter, &condition)?);
    for o in order_by {
        q = q.then_order_by(order(o));
    }
    match page {
        Some(Page::Offset { skip, take }) => q = q.offset(skip).limit(take),
        Some(Page::Cursor { after, take }) => {
            q = q.filter(teams::id.gt(after)).order(teams::id.asc()).limit(take)
        }
        None => {}
    }
    Ok(q)
}

pub async fn find_by_id(conn: &mut AsyncPgConnection, id: i32) -> Result<Option<Team>, StoreError> {
    teams::table
        .find(id)
        .first::<Team>(conn)
        .await
        .optional()
        .map_err(StoreError::from)
}

pub async fn find_one(
    conn: &mut AsyncPgConnection,
    filter: &TeamFilter,
) -> Result<Option<Team>, StoreError> {
    query(filter, &[], None)?
        .first::<Team>(conn)
        .await
        .optional()
        .map_err(StoreError::from)
}

pub async fn find_many(
    conn: &mut AsyncPgConnection,
    filter: &TeamFilter,
    order_by: &[OrderBy<TeamField>],
    page: Option<Page>,
) -> Result<Vec<Team>, StoreError> {
    query(filter, order_by, page)?
        .load::<Team>(conn)
        .await
        .map_err(StoreError::from)
}

pub async fn create(conn: &mut AsyncPgConnection, team: &NewTeam) -> Result<Team, StoreError> {
    diesel::insert_into(teams::table)
        .values(team)
        .get_result(conn)
        .await
        .map_err(StoreError::from)
}

pub async fn create_many(
    conn: &mut AsyncPgConnection,
    rows: &[NewTeam],
    skip_duplicates: bool,
) -> Result<usize, StoreError> {
    let insert = diesel::insert_into(teams::table).values(rows);
    let inserted = if skip_duplicates {
        insert.on_conflict_do_nothing().execute(conn).await
    } else {
        insert.execute(conn).await
    };
    inserted.map_err(StoreError::from)
}

pub async fn update(
    conn: &mut AsyncPgConnection,
    id: i32,
    changes: &TeamChanges,
) -> Result<Team, StoreError> {
    diesel::update(teams::table.find(id))
        .set(changes)
        .get_result(conn)
        .await
        .map_err(|e| StoreError::on(ENTITY, e))
}

pub async fn update_many(
    conn: &mut AsyncPgConnection,
    filter: &TeamFilter,
    changes: &TeamChanges,
) -> Result<usize, StoreError> {
    let cond = compile(filter, &condition)?;
    diesel::update(teams::table.filter(cond))
        .set(changes)
        .execute(conn)
        .await
        .map_err(StoreError::from)
}

pub async fn delete(conn: &mut AsyncPgConnection, id: i32) -> Result<Team, StoreError> {
    diesel::delete(teams::table.find(id))
        .get_result(conn)
        .await
        .map_err(|e| StoreError::on(ENTITY, e))
}

pub async fn delete_many(
    conn: &mut AsyncPgConnection,
    filter: &TeamFilter,
) -> Result<usize, StoreError> {
    let cond = compile(filter, &condition)?;
    diesel::delete(teams::table.filter(cond))
        .execute(conn)
        .await
        .map_err(StoreError::from)
}

pub async fn count(conn: &mut AsyncPgConnection, filter: &TeamFilter) -> Result<i64, StoreError> {
    let cond = compile(filter, &condition)?;
    teams::table
        .filter(cond)
        .count()
        .get_result(conn)
        .await
        .map_err(StoreError::from)
}

numeric_aggregates!(teams, TeamField, {
    TeamField::Id => teams::id,
    TeamField::TournamentId => teams::tournament_id,
});

pub async fn aggregate(
    conn: &mut AsyncPgConnection,
    filter: &TeamFilter,
    selection: &AggregateSelection<TeamField>,
) -> Result<AggregateRow<TeamField>, StoreError> {
    selection.validate()?;
    let mut out = AggregateRow::default();
    if selection.count {
        out.count = Some(count(conn, filter).await?);
    }
    for field in &selection.avg {
        let value = avg_field(conn, compile(filter, &condition)?, field).await?;
        out.avg.push((*field, value));
    }
    for field in &selection.sum {
        let value = sum_field(conn, compile(filter, &condition)?, field).await?;
        out.sum.push((*field, value));
    }
    for field in &selection.min {
        let value = min_field(conn, compile(filter, &condition)?, field).await?;
        out.min.push((*field, value));
    }
    for field in &selection.max {
        let value = max_field(conn, compile(filter, &condition)?, field).await?;
        out.max.push((*field, value));
    }
    Ok(out)
}

pub async fn group_by(
    conn: &mut AsyncPgConnection,
    query: &GroupQuery<TeamField>,
) -> Result<Vec<serde_json::Value>, StoreError> {
    group::run(conn, query).await
}

/// Loads a team with its member rows and each member's user record.
pub async fn find_with_members(
    conn: &mut AsyncPgConnection,
    id: i32,
    members: Option<RelationParams<TeamMemberPredicate, TeamMemberField>>,
) -> Result<Option<(Team, Vec<(TeamMember, User)>)>, StoreError> {
    let team = match find_by_id(conn, id).await? {
        Some(team) => team,
        None => return Ok(None),
    };

    let params = members.unwrap_or_default();
    let rows: Vec<TeamMember> = team_members_query(&params.filter, &params.order, params.page)?
        .filter(team_members::team_id.eq(id))
        .load(conn)
        .await
        .map_err(StoreError::from)?;

    let user_ids: Vec<i32> = rows.iter().map(|m| m.user_id).collect();
    let mut by_id: HashMap<i32, User> = users::table
        .filter(users::id.eq_any(user_ids))
        .load::<User>(conn)
        .await
        .map_err(StoreError::from)?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    // (user_id, team_id) is unique, so each user appears at most once here.
    let mut joined = Vec::with_capacity(rows.len());
    for member in rows {
        let user = by_id
            .remove(&member.user_id)
            .ok_or(StoreError::NotFound("User"))?;
        joined.push((member, user));
    }
    Ok(Some((team, joined)))
}
