use chrono::NaiveDateTime;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::models::schema::{team_members, teams, users};
use crate::models::team_member::{NewTeamMember, TeamMember, TeamMemberChanges};
use crate::query::filter::{cmp_cond, str_cond};
use crate::query::sort::order_cond;
use crate::query::{
    compile, group, AggregateRow, AggregateSelection, Cmp, DynCond, DynOrder, FieldMeta, Filter,
    GroupQuery, OrderBy, Page, StrFilter,
};
use crate::repository::error::StoreError;
use crate::repository::numeric_aggregates;
use crate::repository::teams::{condition as team_cond, TeamPredicate};
use crate::repository::users::{condition as user_cond, UserPredicate};

const ENTITY: &str = "TeamMember";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TeamMemberField {
    Id,
    Role,
    JoinedAt,
    UserId,
    TeamId,
}

impl FieldMeta for TeamMemberField {
    const TABLE: &'static str = "team_members";

    fn column(&self) -> &'static str {
        match self {
            TeamMemberField::Id => "id",
            TeamMemberField::Role => "role",
            TeamMemberField::JoinedAt => "joined_at",
            TeamMemberField::UserId => "user_id",
            TeamMemberField::TeamId => "team_id",
        }
    }

    fn numeric(&self) -> bool {
        matches!(
            self,
            TeamMemberField::Id | TeamMemberField::UserId | TeamMemberField::TeamId
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TeamMemberPredicate {
    Id(Cmp<i32>),
    Role(StrFilter),
    JoinedAt(Cmp<NaiveDateTime>),
    UserId(Cmp<i32>),
    TeamId(Cmp<i32>),
    /// The owning user matches the nested filter.
    User(Box<Filter<UserPredicate>>),
    /// The owning team matches the nested filter.
    Team(Box<Filter<TeamPredicate>>),
}

pub type TeamMemberFilter = Filter<TeamMemberPredicate>;

pub(crate) fn condition(
    p: &TeamMemberPredicate,
) -> Result<DynCond<team_members::table>, StoreError> {
    Ok(match p {
        TeamMemberPredicate::Id(c) => cmp_cond!(team_members::id, c),
        TeamMemberPredicate::Role(f) => str_cond!(team_members::role, f),
        TeamMemberPredicate::JoinedAt(c) => cmp_cond!(team_members::joined_at, c),
        TeamMemberPredicate::UserId(c) => cmp_cond!(team_members::user_id, c),
        TeamMemberPredicate::TeamId(c) => cmp_cond!(team_members::team_id, c),
        TeamMemberPredicate::User(inner) => {
            let sub = compile(inner, &user_cond)?;
            Box::new(
                team_members::user_id
                    .eq_any(users::table.filter(sub).select(users::id).into_boxed())
                    .nullable(),
            )
        }
        TeamMemberPredicate::Team(inner) => {
            let sub = compile(inner, &team_cond)?;
            Box::new(
                team_members::team_id
                    .eq_any(teams::table.filter(sub).select(teams::id).into_boxed())
                    .nullable(),
            )
        }
    })
}

fn order(o: &OrderBy<TeamMemberField>) -> DynOrder<team_members::table> {
    match o.field {
        TeamMemberField::Id => order_cond!(team_members::id, o),
        TeamMemberField::Role => order_cond!(team_members::role, o),
        TeamMemberField::JoinedAt => order_cond!(team_members::joined_at, o),
        TeamMemberField::UserId => order_cond!(team_members::user_id, o),
        TeamMemberField::TeamId => order_cond!(team_members::team_id, o),
    }
}

pub(crate) fn query(
    filter: &TeamMemberFilter,
    order_by: &[OrderBy<TeamMemberField>],
    page: Option<Page>,
) -> Result<team_members::BoxedQuery<'static, Pg>, StoreError> {
    if let Some(page) = &page {
        page.check(order_by.len())?;
    }
    let mut q = team_members::table.into_boxed();
    q = q.filter(compile(filter, &condition)?);
    for o in order_by {
        q = q.then_order_by(order(o));
    }
    match page {
        Some(Page::Offset { skip, take }) => q = q.offset(skip).limit(take),
        Some(Page::Cursor { after, take }) => {
            q = q
                .filter(team_members::id.gt(after))
                .order(team_members::id.asc())
                .limit(take)
        }
        None => {}
    }
    Ok(q)
}

pub async fn find_by_id(
    conn: &mut AsyncPgConnection,
    id: i32,
) -> Result<Option<TeamMember>, StoreError> {
    team_members::table
        .find(id)
        .first::<TeamMember>(conn)
        .await
        .optional()
        .map_err(StoreError::from)
}

pub async fn find_one(
    conn: &mut AsyncPgConnection,
    filter: &TeamMemberFilter,
) -> Result<Option<TeamMember>, StoreError> {
    query(filter, &[], None)?
        .first::<TeamMember>(conn)
        .await
        .optional()
        .map_err(StoreError::from)
}

pub async fn find_many(
    conn: &mut AsyncPgConnection,
    filter: &TeamMemberFilter,
    order_by: &[OrderBy<TeamMemberField>],
    page: Option<Page>,
) -> Result<Vec<TeamMember>, StoreError> {
    query(filter, order_by, page)?
        .load::<TeamMember>(conn)
        .await
        .map_err(StoreError::from)
}

pub async fn create(
    conn: &mut AsyncPgConnection,
    member: &NewTeamMember,
) -> Result<TeamMember, StoreError> {
    diesel::insert_into(team_members::table)
        .values(member)
        .get_result(conn)
        .await
        .map_err(StoreError::from)
}

pub async fn create_many(
    conn: &mut AsyncPgConnection,
    rows: &[NewTeamMember],
    skip_duplicates: bool,
) -> Result<usize, StoreError> {
    let insert = diesel::insert_into(team_members::table).values(rows);
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
    changes: &TeamMemberChanges,
) -> Result<TeamMember, StoreError> {
    diesel::update(team_members::table.find(id))
        .set(changes)
        .get_result(conn)
        .await
        .map_err(|e| StoreError::on(ENTITY, e))
}

pub async fn update_many(
    conn: &mut AsyncPgConnection,
    filter: &TeamMemberFilter,
    changes: &TeamMemberChanges,
) -> Result<usize, StoreError> {
    let cond = compile(filter, &condition)?;
    diesel::update(team_members::table.filter(cond))
        .set(changes)
        .execute(conn)
        .await
        .map_err(StoreError::from)
}

/// Create-or-update keyed on the unique `(user_id, team_id)` pair.
pub async fn upsert(
    conn: &mut AsyncPgConnection,
    create: &NewTeamMember,
    changes: &TeamMemberChanges,
) -> Result<TeamMember, StoreError> {
    diesel::insert_into(team_members::table)
        .values(create)
        .on_conflict((team_members::user_id, team_members::team_id))
        .do_update()
        .set(changes)
        .get_result(conn)
        .await
        .map_err(StoreError::from)
}

pub async fn delete(conn: &mut AsyncPgConnection, id: i32) -> Result<TeamMember, StoreError> {
    diesel::delete(team_members::table.find(id))
        .get_result(conn)
        .await
        .map_err(|e| StoreError::on(ENTITY, e))
}

pub async fn delete_many(
    conn: &mut AsyncPgConnection,
    filter: &TeamMemberFilter,
) -> Result<usize, StoreError> {
    let cond = compile(filter, &condition)?;
    diesel::delete(team_members::table.filter(cond))
        .execute(conn)
        .await
        .map_err(StoreError::from)
}

pub async fn count(
    conn: &mut AsyncPgConnection,
    filter: &TeamMemberFilter,
) -> Result<i64, StoreError> {
    let cond = compile(filter, &condition)?;
    team_members::table
        .filter(cond)
        .count()
        .get_result(conn)
        .await
        .map_err(StoreError::from)
}

numeric_aggregates!(team_members, TeamMemberField, {
    TeamMemberField::Id => team_members::id,
    TeamMemberField::UserId => team_members::user_id,
    TeamMemberField::TeamId => team_members::team_id,
});

pub async fn aggregate(
    conn: &mut AsyncPgConnection,
    filter: &TeamMemberFilter,
    selection: &AggregateSelection<TeamMemberField>,
) -> Result<AggregateRow<TeamMemberField>, StoreError> {
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
    query: &GroupQuery<TeamMemberField>,
) -> Result<Vec<serde_json::Value>, StoreError> {
    group::run(conn, query).await
}
