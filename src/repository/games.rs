use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::models::game::{Game, GameChanges, NewGame};
use crate::models::schema::{games, tournaments};
use crate::query::filter::{cmp_cond, str_cond};
use crate::query::sort::order_cond;
use crate::query::{
    compile, group, AggregateRow, AggregateSelection, Cmp, DynCond, DynOrder, FieldMeta, Filter,
    GroupQuery, OrderBy, Page, StrFilter,
};
use crate::repository::error::StoreError;
use crate::repository::numeric_aggregates;
use crate::repository::tournaments::{condition as tournament_cond, TournamentPredicate};

const ENTITY: &str = "Game";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameField {
    Id,
    Name,
}

impl FieldMeta for GameField {
    const TABLE: &'static str = "games";

    fn column(&self) -> &'static str {
        match self {
            GameField::Id => "id",
            GameField::Name => "name",
        }
    }

    fn numeric(&self) -> bool {
        matches!(self, GameField::Id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GamePredicate {
    Id(Cmp<i32>),
    Name(StrFilter),
    /// At least one tournament of this game matches the nested filter.
    HasTournament(Box<Filter<TournamentPredicate>>),
}

pub type GameFilter = Filter<GamePredicate>;

pub(crate) fn condition(p: &GamePredicate) -> Result<DynCond<games::table>, StoreError> {
    Ok(match p {
        GamePredicate::Id(c) => cmp_cond!(games::id, c),
        GamePredicate::Name(f) => str_cond!(games::name, f),
        GamePredicate::HasTournament(inner) => {
            let sub = compile(inner, &tournament_cond)?;
            Box::new(
                games::id
                    .eq_any(tournaments::table.filter(sub).select(tournaments::game_id).into_boxed())
                    .nullable(),
            )
        }
    })
}

fn order(o: &OrderBy<GameField>) -> DynOrder<games::table> {
    match o.field {
        GameField::Id => order_cond!(games::id, o),
        GameField::Name => order_cond!(games::name, o),
    }
}

pub(crate) fn query(
    filter: &GameFilter,
    order_by: &[OrderBy<GameField>],
    page: Option<Page>,
) -> Result<games::BoxedQuery<'static, Pg>, StoreError> {
    if let Some(page) = &page {
        page.check(order_by.len())?;
    }
    let mut q = games::table.into_boxed();
    q = q.filter(compile(filter, &condition)?);
    for o in order_by {
        q = q.then_order_by(order(o));
    }
    match page {
        Some(Page::Offset { skip, take }) => q = q.offset(skip).limit(take),
        Some(Page::Cursor { after, take }) => {
            q = q.filter(games::id.gt(after)).order(games::id.asc()).limit(take)
        }
        None => {}
    }
    Ok(q)
}

pub async fn find_by_id(conn: &mut AsyncPgConnection, id: i32) -> Result<Option<Game>, StoreError> {
    games::table
        .find(id)
        .first::<Game>(conn)
        .await
        .optional()
        .map_err(StoreError::from)
}

pub async fn find_one(
    conn: &mut AsyncPgConnection,
    filter: &GameFilter,
) -> Result<Option<Game>, StoreError> {
    query(filter, &[], None)?
        .first::<Game>(conn)
        .await
        .optional()
        .map_err(StoreError::from)
}

pub async fn find_many(
    conn: &mut AsyncPgConnection,
    filter: &GameFilter,
    order_by: &[OrderBy<GameField>],
    page: Option<Page>,
) -> Result<Vec<Game>, StoreError> {
    query(filter, order_by, page)?
        .load::<Game>(conn)
        .await
        .map_err(StoreError::from)
}

pub async fn create(conn: &mut AsyncPgConnection, game: &NewGame) -> Result<Game, StoreError> {
    diesel::insert_into(games::table)
        .values(game)
        .get_result(conn)
        .await
        .map_err(StoreError::from)
}

pub async fn create_many(
    conn: &mut AsyncPgConnection,
    rows: &[NewGame],
    skip_duplicates: bool,
) -> Result<usize, StoreError> {
    let insert = diesel::insert_into(games::table).values(rows);
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
    changes: &GameChanges,
) -> Result<Game, StoreError> {
    diesel::update(games::table.find(id))
        .set(changes)
        .get_result(conn)
        .await
        .map_err(|e| StoreError::on(ENTITY, e))
}

pub async fn update_many(
    conn: &mut AsyncPgConnection,
    filter: &GameFilter,
    changes: &GameChanges,
) -> Result<usize, StoreError> {
    let cond = compile(filter, &condition)?;
    diesel::update(games::table.filter(cond))
        .set(changes)
        .execute(conn)
        .await
        .map_err(StoreError::from)
}

/// Create-or-update keyed on the unique game name.
pub async fn upsert(
    conn: &mut AsyncPgConnection,
    create: &NewGame,
    changes: &GameChanges,
) -> Result<Game, StoreError> {
    diesel::insert_into(games::table)
        .values(create)
        .on_conflict(games::name)
        .do_update()
        .set(changes)
        .get_result(conn)
        .await
        .map_err(StoreError::from)
}

pub async fn delete(conn: &mut AsyncPgConnection, id: i32) -> Result<Game, StoreError> {
    diesel::delete(games::table.find(id))
        .get_result(conn)
        .await
        .map_err(|e| StoreError::on(ENTITY, e))
}

pub async fn delete_many(
    conn: &mut AsyncPgConnection,
    filter: &GameFilter,
) -> Result<usize, StoreError> {
    let cond = compile(filter, &condition)?;
    diesel::delete(games::table.filter(cond))
        .execute(conn)
        .await
        .map_err(StoreError::from)
}

pub async fn count(conn: &mut AsyncPgConnection, filter: &GameFilter) -> Result<i64, StoreError> {
    let cond = compile(filter, &condition)?;
    games::table
        .filter(cond)
        .count()
        .get_result(conn)
        .await
        .map_err(StoreError::from)
}

numeric_aggregates!(games, GameField, {
    GameField::Id => games::id,
});

pub async fn aggregate(
    conn: &mut AsyncPgConnection,
    filter: &GameFilter,
    selection: &AggregateSelection<GameField>,
) -> Result<AggregateRow<GameField>, StoreError> {
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
    query: &GroupQuery<GameField>,
) -> Result<Vec<serde_json::Value>, StoreError> {
    group::run(conn, query).await
}
