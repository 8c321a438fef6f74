use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::models::schema::{team_members, teams, users};
use crate::models::team::Team;
use crate::models::team_member::TeamMember;
use crate::models::user::{NewUser, User, UserChanges};
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

const ENTITY: &str = "User";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserField {
    Id,
    Pseudo,
    Email,
    Name,
    LastName,
    Sexe,
    Birthday,
    CreatedAt,
    LastAuth,
    Role,
}

impl FieldMeta for UserField {
    const TABLE: &'static str = "users";

    fn column(&self) -> &'static str {
        match self {
            UserField::Id => "id",
            UserField::Pseudo => "pseudo",
            UserField::Email => "email",
            UserField::Name => "name",
            UserField::LastName => "last_name",
            UserField::Sexe => "sexe",
            UserField::Birthday => "birthday",
            UserField::CreatedAt => "created_at",
            UserField::LastAuth => "last_auth",
            UserField::Role => "role",
        }
    }

    fn numeric(&self) -> bool {
        matches!(self, UserField::Id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UserPredicate {
    Id(Cmp<i32>),
    Pseudo(StrFilter),
    Email(StrFilter),
    Name(StrFilter),
    LastName(StrFilter),
    Sexe(StrFilter),
    Role(StrFilter),
    Birthday(Cmp<NaiveDate>),
    CreatedAt(Cmp<NaiveDateTime>),
    LastAuth(Cmp<NaiveDateTime>),
    /// The user has at least one team membership matching the nested filter.
    HasMembership(Box<Filter<TeamMemberPredicate>>),
}

pub type UserFilter = Filter<UserPredicate>;

/// Unique constraints an upsert may key on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserKey {
    Pseudo,
    Email,
}

pub(crate) fn condition(p: &UserPredicate) -> Result<DynCond<users::table>, StoreError> {
    Ok(match p {
        UserPredicate::Id(c) => cmp_cond!(users::id, c),
        UserPredicate::Pseudo(f) => str_cond!(users::pseudo, f),
        UserPredicate::Email(f) => str_cond!(users::email, f),
        UserPredicate::Name(f) => str_cond!(users::name, f),
        UserPredicate::LastName(f) => str_cond!(users::last_name, f),
        UserPredicate::Sexe(f) => str_cond!(users::sexe, f),
        UserPredicate::Role(f) => str_cond!(users::role, f),
        UserPredicate::Birthday(c) => cmp_cond!(users::birthday, c),
        UserPredicate::CreatedAt(c) => cmp_cond!(users::created_at, c),
        UserPredicate::LastAuth(c) => cmp_cond!(users::last_auth, c),
        UserPredicate::HasMembership(inner) => {
            let sub = compile(inner, &team_member_cond)?;
            Box::new(
                users::id
                    .eq_any(team_members::table.filter(sub).select(team_members::user_id).into_boxed())
                    .nullable(),
            )
        }
    })
}

fn order(o: &OrderBy<UserField>) -> DynOrder<users::table> {
    match o.field {
        UserField::Id => order_cond!(users::id, o),
        UserField::Pseudo => order_cond!(users::pseudo, o),
        UserField::Email => order_cond!(users::email, o),
        UserField::Name => order_cond!(users::name, o),
        UserField::LastName => order_cond!(users::last_name, o),
        UserField::Sexe => order_cond!(users::sexe, o),
        UserField::Birthday => order_cond!(users::birthday, o),
        UserField::CreatedAt => order_cond!(users::created_at, o),
        UserField::LastAuth => order_cond!(users::last_auth, o),
        UserField::Role => order_cond!(users::role, o),
    }
}

pub(crate) fn query(
    filter: &UserFilter,
    order_by: &[OrderBy<UserField>],
    page: Option<Page>,
) -> Result<users::BoxedQuery<'static, Pg>, StoreError> {
    if let Some(page) = &page {
        page.check(order_by.len())?;
    }
    let mut q = users::table.into_boxed();
    q = q.filter(compile(filter, &condition)?);
    for o in order_by {
        q = q.then_order_by(order(o));
    }
    match page {
        Some(Page::Offset { skip, take }) => q = q.offset(skip).limit(take),
        Some(Page::Cursor { after, take }) => {
            q = q.filter(users::id.gt(after)).order(users::id.asc()).limit(take)
        }
        None => {}
    }
    Ok(q)
}

pub async fn find_by_id(conn: &mut AsyncPgConnection, id: i32) -> Result<Option<User>, StoreError> {
    users::table
        .find(id)
        .first::<User>(conn)
        .await
        .optional()
        .map_err(StoreError::from)
}

pub async fn find_one(
    conn: &mut AsyncPgConnection,
    filter: &UserFilter,
) -> Result<Option<User>, StoreError> {
    query(filter, &[], None)?
        .first::<User>(conn)
        .await
        .optional()
        .map_err(StoreError::from)
}

pub async fn find_many(
    conn: &mut AsyncPgConnection,
    filter: &UserFilter,
    order_by: &[OrderBy<UserField>],
    page: Option<Page>,
) -> Result<Vec<User>, StoreError> {
    query(filter, order_by, page)?
        .load::<User>(conn)
        .await
        .map_err(StoreError::from)
}

pub async fn create(conn: &mut AsyncPgConnection, user: &NewUser) -> Result<User, StoreError> {
    diesel::insert_into(users::table)
        .values(user)
        .get_result(conn)
        .await
        .map_err(StoreError::from)
}

pub async fn create_many(
    conn: &mut AsyncPgConnection,
    rows: &[NewUser],
    skip_duplicates: bool,
) -> Result<usize, StoreError> {
    let insert = diesel::insert_into(users::table).values(rows);
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
    changes: &UserChanges,
) -> Result<User, StoreError> {
    diesel::update(users::table.find(id))
        .set(changes)
        .get_result(conn)
        .await
        .map_err(|e| StoreError::on(ENTITY, e))
}

pub async fn update_many(
    conn: &mut AsyncPgConnection,
    filter: &UserFilter,
    changes: &UserChanges,
) -> Result<usize, StoreError> {
    let cond = compile(filter, &condition)?;
    diesel::update(users::table.filter(cond))
        .set(changes)
        .execute(conn)
        .await
        .map_err(StoreError::from)
}

/// Atomic create-or-update keyed on one of the user's unique constraints.
pub async fn upsert(
    conn: &mut AsyncPgConnection,
    key: UserKey,
    create: &NewUser,
    changes: &UserChanges,
) -> Result<User, StoreError> {
    let result = match key {
        UserKey::Pseudo => {
            diesel::insert_into(users::table)
                .values(create)
                .on_conflict(users::pseudo)
                .do_update()
                .set(changes)
                .get_result(conn)
                .await
        }
        UserKey::Email => {
            diesel::insert_into(users::table)
                .values(create)
                .on_conflict(users::email)
                .do_update()
                .set(changes)
                .get_result(conn)
                .await
        }
    };
    result.map_err(StoreError::from)
}

pub async fn delete(conn: &mut AsyncPgConnection, id: i32) -> Result<User, StoreError> {
    diesel::delete(users::table.find(id))
        .get_result(conn)
        .await
        .map_err(|e| StoreError::on(ENTITY, e))
}

pub async fn delete_many(
    conn: &mut AsyncPgConnection,
    filter: &UserFilter,
) -> Result<usize, StoreError> {
    let cond = compile(filter, &condition)?;
    diesel::delete(users::table.filter(cond))
        .execute(conn)
        .await
        .map_err(StoreError::from)
}

pub async fn count(conn: &mut AsyncPgConnection, filter: &UserFilter) -> Result<i64, StoreError> {
    let cond = compile(filter, &condition)?;
    users::table
        .filter(cond)
        .count()
        .get_result(conn)
        .await
        .map_err(StoreError::from)
}

numeric_aggregates!(users, UserField, {
    UserField::Id => users::id,
});

pub async fn aggregate(
    conn: &mut AsyncPgConnection,
    filter: &UserFilter,
    selection: &AggregateSelection<UserField>,
) -> Result<AggregateRow<UserField>, StoreError> {
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
    query: &GroupQuery<UserField>,
) -> Result<Vec<serde_json::Value>, StoreError> {
    group::run(conn, query).await
}

/// Loads a user together with their team memberships (and each membership's
/// team), with independent controls on the membership collection.
pub async fn find_with_memberships(
    conn: &mut AsyncPgConnection,
    id: i32,
    memberships: Option<RelationParams<TeamMemberPredicate, TeamMemberField>>,
) -> Result<Option<(User, Vec<(TeamMember, Team)>)>, StoreError> {
    let user = match find_by_id(conn, id).await? {
        Some(user) => user,
        None => return Ok(None),
    };

    let params = memberships.unwrap_or_default();
    let members: Vec<TeamMember> = team_members_query(&params.filter, &params.order, params.page)?
        .filter(team_members::user_id.eq(id))
        .load(conn)
        .await
        .map_err(StoreError::from)?;

    let team_ids: Vec<i32> = members.iter().map(|m| m.team_id).collect();
    let mut by_id: HashMap<i32, Team> = teams::table
        .filter(teams::id.eq_any(team_ids))
        .load::<Team>(conn)
        .await
        .map_err(StoreError::from)?
        .into_iter()
        .map(|t| (t.id, t))
        .collect();

    // (user_id, team_id) is unique, so each team is consumed at most once.
    let mut joined = Vec::with_capacity(members.len());
    for member in members {
        let team = by_id
            .remove(&member.team_id)
            .ok_or(StoreError::NotFound("Team"))?;
        joined.push((member, team));
    }
    Ok(Some((user, joined)))
}
