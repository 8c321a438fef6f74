use chrono::NaiveDateTime;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::models::game_match::{Match, MatchChanges, NewMatch};
use crate::models::schema::{matches, teams, tournaments};
use crate::models::team::Team;
use crate::query::filter::{cmp_cond, opt_cmp_cond, str_cond};
use crate::query::sort::order_cond;
use crate::query::{
    compile, group, AggregateRow, AggregateSelection, Cmp, DynCond, DynOrder, FieldMeta, Filter,
    GroupQuery, OptCmp, OrderBy, Page, StrFilter,
};
use crate::repository::error::StoreError;
use crate::repository::numeric_aggregates;
use crate::repository::teams::{condition as team_cond, TeamPredicate};
use crate::repository::tournaments::{condition as tournament_cond, TournamentPredicate};

const ENTITY: &str = "Match";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchField {
    Id,
    TournamentId,
    Team1Id,
    Team2Id,
    Team1Score,
    Team2Score,
    WinnerId,
    MatchDate,
    Status,
    CreatedAt,
}

impl FieldMeta for MatchField {
    const TABLE: &'static str = "matches";

    fn column(&self) -> &'static str {
        match self {
            MatchField::Id => "id",
            MatchField::TournamentId => "tournament_id",
            MatchField::Team1Id => "team1_id",
            MatchField::Team2Id => "team2_id",
            MatchField::Team1Score => "team1_score",
            MatchField::Team2Score => "team2_score",
            MatchField::WinnerId => "winner_id",
            MatchField::MatchDate => "match_date",
            MatchField::Status => "status",
            MatchField::CreatedAt => "created_at",
        }
    }

    fn numeric(&self) -> bool {
        !matches!(
            self,
            MatchField::MatchDate | MatchField::Status | MatchField::CreatedAt
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MatchPredicate {
    Id(Cmp<i32>),
    TournamentId(Cmp<i32>),
    Team1Id(Cmp<i32>),
    Team2Id(Cmp<i32>),
    Team1Score(OptCmp<i32>),
    Team2Score(OptCmp<i32>),
    WinnerId(OptCmp<i32>),
    MatchDate(Cmp<NaiveDateTime>),
    Status(StrFilter),
    CreatedAt(Cmp<NaiveDateTime>),
    /// The owning tournament matches the nested filter.
    Tournament(Box<Filter<TournamentPredicate>>),
    /// Either participating team matches the nested filter.
    Involves(Box<Filter<TeamPredicate>>),
}

pub type MatchFilter = Filter<MatchPredicate>;

pub(crate) fn condition(p: &MatchPredicate) -> Result<DynCond<matches::table>, StoreError> {
    Ok(match p {
        MatchPredicate::Id(c) => cmp_cond!(matches::id, c),
        MatchPredicate::TournamentId(c) => cmp_cond!(matches::tournament_id, c),
        MatchPredicate::Team1Id(c) => cmp_cond!(matches::team1_id, c),
        MatchPredicate::Team2Id(c) => cmp_cond!(matches::team2_id, c),
        MatchPredicate::Team1Score(c) => opt_cmp_cond!(matches::team1_score, c),
        MatchPredicate::Team2Score(c) => opt_cmp_cond!(matches::team2_score, c),
        MatchPredicate::WinnerId(c) => opt_cmp_cond!(matches::winner_id, c),
        MatchPredicate::MatchDate(c) => cmp_cond!(matches::match_date, c),
        MatchPredicate::Status(f) => str_cond!(matches::status, f),
        MatchPredicate::CreatedAt(c) => cmp_cond!(matches::created_at, c),
        MatchPredicate::Tournament(inner) => {
            let sub = compile(inner, &tournament_cond)?;
            Box::new(
                matches::tournament_id
                    .eq_any(tournaments::table.filter(sub).select(tournaments::id).into_boxed())
                    .nullable(),
            )
        }
        MatchPredicate::Involves(inner) => {
            let side1 = compile(inner, &team_cond)?;
            let side2 = compile(inner, &team_cond)?;
            let team1 =
                matches::team1_id.eq_any(teams::table.filter(side1).select(teams::id).into_boxed());
            let team2 =
                matches::team2_id.eq_any(teams::table.filter(side2).select(teams::id).into_boxed());
            Box::new(team1.or(team2).nullable())
        }
    })
}

fn order(o: &OrderBy<MatchField>) -> DynOrder<matches::table> {
    match o.field {
        MatchField::Id => order_cond!(matches::id, o),
        MatchField::TournamentId => order_cond!(matches::tournament_id, o),
        MatchField::Team1Id => order_cond!(matches::team1_id, o),
        MatchField::Team2Id => order_cond!(matches::team2_id, o),
        MatchField::Team1Score => order_cond!(matches::team1_score, o),
        MatchField::Team2Score => order_cond!(matches::team2_score, o),
        MatchField::WinnerId => order_cond!(matches::winner_id, o),
        MatchField::MatchDate => order_cond!(matches::match_date, o),
        MatchField::Status => order_cond!(matches::status, o),
        MatchField::CreatedAt => order_cond!(matches::created_at, o),
    }
}

pub(crate) fn query(
    filter: &MatchFilter,
    order_by: &[OrderBy<MatchField>],
    page: Option<Page>,
) -> Result<matches::BoxedQuery<'static, Pg>, StoreError> {
    if let Some(page) = &page {
        page.check(order_by.len())?;
    }
    let mut q = matches::table.into_boxed();
    q = q.filter(compile(filter, &condition)?);
    for o in order_by {
        q = q.then_order_by(order(o));
    }
    match page {
        Some(Page::Offset { skip, take }) => q = q.offset(skip).limit(take),
        Some(Page::Cursor { after, take }) => {
            q = q
                .filter(matches::id.gt(after))
                .order(matches::id.asc())
                .limit(take)
        }
        None => {}
    }
    Ok(q)
}

pub async fn find_by_id(
    conn: &mut AsyncPgConnection,
    id: i32,
) -> Result<Option<Match>, StoreError> {
    matches::table
        .find(id)
        .first::<Match>(conn)
        .await
        .optional()
        .map_err(StoreError::from)
}

pub async fn find_one(
    conn: &mut AsyncPgConnection,
    filter: &MatchFilter,
) -> Result<Option<Match>, StoreError> {
    query(filter, &[], None)?
        .first::<Match>(conn)
        .await
        .optional()
        .map_err(StoreError::from)
}

pub async fn find_many(
    conn: &mut AsyncPgConnection,
    filter: &MatchFilter,
    order_by: &[OrderBy<MatchField>],
    page: Option<Page>,
) -> Result<Vec<Match>, StoreError> {
    query(filter, order_by, page)?
        .load::<Match>(conn)
        .await
        .map_err(StoreError::from)
}

pub async fn create(conn: &mut AsyncPgConnection, row: &NewMatch) -> Result<Match, StoreError> {
    diesel::insert_into(matches::table)
        .values(row)
        .get_result(conn)
        .await
        .map_err(StoreError::from)
}

pub async fn create_many(
    conn: &mut AsyncPgConnection,
    rows: &[NewMatch],
    skip_duplicates: bool,
) -> Result<usize, StoreError> {
    let insert = diesel::insert_into(matches::table).values(rows);
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
    changes: &MatchChanges,
) -> Result<Match, StoreError> {
    diesel::update(matches::table.find(id))
        .set(changes)
        .get_result(conn)
        .await
        .map_err(|e| StoreError::on(ENTITY, e))
}

pub async fn update_many(
    conn: &mut AsyncPgConnection,
    filter: &MatchFilter,
    changes: &MatchChanges,
) -> Result<usize, StoreError> {
    let cond = compile(filter, &condition)?;
    diesel::update(matches::table.filter(cond))
        .set(changes)
        .execute(conn)
        .await
        .map_err(StoreError::from)
}

pub async fn delete(conn: &mut AsyncPgConnection, id: i32) -> Result<Match, StoreError> {
    diesel::delete(matches::table.find(id))
        .get_result(conn)
        .await
        .map_err(|e| StoreError::on(ENTITY, e))
}

pub async fn delete_many(
    conn: &mut AsyncPgConnection,
    filter: &MatchFilter,
) -> Result<usize, StoreError> {
    let cond = compile(filter, &condition)?;
    diesel::delete(matches::table.filter(cond))
        .execute(conn)
        .await
        .map_err(StoreError::from)
}

pub async fn count(conn: &mut AsyncPgConnection, filter: &MatchFilter) -> Result<i64, StoreError> {
    let cond = compile(filter, &condition)?;
    matches::table
        .filter(cond)
        .count()
        .get_result(conn)
        .await
        .map_err(StoreError::from)
}

numeric_aggregates!(matches, MatchField, {
    MatchField::Id => matches::id,
    MatchField::TournamentId => matches::tournament_id,
    MatchField::Team1Id => matches::team1_id,
    MatchField::Team2Id => matches::team2_id,
    MatchField::Team1Score => matches::team1_score,
    MatchField::Team2Score => matches::team2_score,
    MatchField::WinnerId => matches::winner_id,
});

pub async fn aggregate(
    conn: &mut AsyncPgConnection,
    filter: &MatchFilter,
    selection: &AggregateSelection<MatchField>,
) -> Result<AggregateRow<MatchField>, StoreError> {
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
    query: &GroupQuery<MatchField>,
) -> Result<Vec<serde_json::Value>, StoreError> {
    group::run(conn, query).await
}

/// Loads a match with both participating teams.
pub async fn find_with_teams(
    conn: &mut AsyncPgConnection,
    id: i32,
) -> Result<Option<(Match, Team, Team)>, StoreError> {
    let row = match find_by_id(conn, id).await? {
        Some(row) => row,
        None => return Ok(None),
    };
    let mut sides: Vec<Team> = teams::table
        .filter(teams::id.eq_any([row.team1_id, row.team2_id]))
        .load(conn)
        .await
        .map_err(StoreError::from)?;
    let pos1 = sides
        .iter()
        .position(|t| t.id == row.team1_id)
        .ok_or(StoreError::NotFound("Team"))?;
    let team1 = sides.swap_remove(pos1);
    let pos2 = sides
        .iter()
        .position(|t| t.id == row.team2_id)
        .ok_or(StoreError::NotFound("Team"))?;
    let team2 = sides.swap_remove(pos2);
    Ok(Some((row, team1, team2)))
}
