use chrono::NaiveDateTime;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::models::schema::{tournament_statuses, tournaments};
use crate::models::tournament_status::{
    NewTournamentStatus, TournamentStatus, TournamentStatusChanges,
};
use crate::query::filter::{cmp_cond, str_cond};
use crate::query::sort::order_cond;
use crate::query::{
    compile, group, AggregateRow, AggregateSelection, Cmp, DynCond, DynOrder, FieldMeta, Filter,
    GroupQuery, OrderBy, Page, StrFilter,
};
use crate::repository::error::StoreError;
use crate::repository::numeric_aggregates;
use crate::repository::tournaments::{condition as tournament_cond, TournamentPredicate};

const ENTITY: &str = "TournamentStatus";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TournamentStatusField {
    Id,
    Status,
    UpdatedAt,
    TournamentId,
}

impl FieldMeta for TournamentStatusField {
    const TABLE: &'static str = "tournament_statuses";

    fn column(&self) -> &'static str {
        match self {
            TournamentStatusField::Id => "id",
            TournamentStatusField::Status => "status",
            TournamentStatusField::UpdatedAt => "updated_at",
            TournamentStatusField::TournamentId => "tournament_id",
        }
    }

    fn numeric(&self) -> bool {
        matches!(
            self,
            TournamentStatusField::Id | TournamentStatusField::TournamentId
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TournamentStatusPredicate {
    Id(Cmp<i32>),
    Status(StrFilter),
    UpdatedAt(Cmp<NaiveDateTime>),
    TournamentId(Cmp<i32>),
    Tournament(Box<Filter<TournamentPredicate>>),
}

pub type TournamentStatusFilter = Filter<TournamentStatusPredicate>;

pub(crate) fn condition(
    p: &TournamentStatusPredicate,
) -> Result<DynCond<tournament_statuses::table>, StoreError> {
    Ok(match p {
        TournamentStatusPredicate::Id(c) => cmp_cond!(tournament_statuses::id, c),
        TournamentStatusPredicate::Status(f) => str_cond!(tournament_statuses::status, f),
        TournamentStatusPredicate::UpdatedAt(c) => cmp_cond!(tournament_statuses::updated_at, c),
        TournamentStatusPredicate::TournamentId(c) => {
            cmp_cond!(tournament_statuses::tournament_id, c)
        }
        TournamentStatusPredicate::Tournament(inner) => {
            let sub = compile(inner, &tournament_cond)?;
            Box::new(
                tournament_statuses::tournament_id
                    .eq_any(tournaments::table.filter(sub).select(tournaments::id).into_boxed())
                    .nullable(),
            )
        }
    })
}

pub(crate) fn order(o: &OrderBy<TournamentStatusField>) -> DynOrder<tournament_statuses::table> {
    match o.field {
        TournamentStatusField::Id => order_cond!(tournament_statuses::id, o),
        TournamentStatusField::Status => order_cond!(tournament_statuses::status, o),
        TournamentStatusField::UpdatedAt => order_cond!(tournament_statuses::updated_at, o),
        TournamentStatusField::TournamentId => order_cond!(tournament_statuses::tournament_id, o),
    }
}

pub(crate) fn query(
    filter: &TournamentStatusFilter,
    order_by: &[OrderBy<TournamentStatusField>],
    page: Option<Page>,
) -> Result<tournament_statuses::BoxedQuery<'static, Pg>, StoreError> {
    if let Some(page) = &page {
        page.check(order_by.len())?;
    }
    let mut q = tournament_statuses::table.into_boxed();
    q = q.filter(compile(filter, &condition)?);
    for o in order_by {
        q = q.then_order_by(order(o));
    }
    match page {
        Some(Page::Offset { skip, take }) => q = q.offset(skip).limit(take),
        Some(Page::Cursor { after, take }) => {
            q = q
                .filter(tournament_statuses::id.gt(after))
                .order(tournament_statuses::id.asc())
                .limit(take)
        }
        None => {}
    }
    Ok(q)
}

pub async fn find_by_id(
    conn: &mut AsyncPgConnection,
    id: i32,
) -> Result<Option<TournamentStatus>, StoreError> {
    tournament_statuses::table
        .find(id)
        .first::<TournamentStatus>(conn)
        .await
        .optional()
        .map_err(StoreError::from)
}

pub async fn find_one(
    conn: &mut AsyncPgConnection,
    filter: &TournamentStatusFilter,
) -> Result<Option<TournamentStatus>, StoreError> {
    query(filter, &[], None)?
        .first::<TournamentStatus>(conn)
        .await
        .optional()
        .map_err(StoreError::from)
}

pub async fn find_many(
    conn: &mut AsyncPgConnection,
    filter: &TournamentStatusFilter,
    order_by: &[OrderBy<TournamentStatusField>],
    page: Option<Page>,
) -> Result<Vec<TournamentStatus>, StoreError> {
    query(filter, order_by, page)?
        .load::<TournamentStatus>(conn)
        .await
        .map_err(StoreError::from)
}

/// The latest status row for a tournament, ties on `updated_at` broken by id.
pub async fn current_for(
    conn: &mut AsyncPgConnection,
    tournament_id: i32,
) -> Result<Option<TournamentStatus>, StoreError> {
    tournament_statuses::table
        .filter(tournament_statuses::tournament_id.eq(tournament_id))
        .order((
            tournament_statuses::updated_at.desc(),
            tournament_statuses::id.desc(),
        ))
        .first::<TournamentStatus>(conn)
        .await
        .optional()
        .map_err(StoreError::from)
}

pub async fn create(
    conn: &mut AsyncPgConnection,
    row: &NewTournamentStatus,
) -> Result<TournamentStatus, StoreError> {
    diesel::insert_into(tournament_statuses::table)
        .values(row)
        .get_result(conn)
        .await
        .map_err(StoreError::from)
}

pub async fn create_many(
    conn: &mut AsyncPgConnection,
    rows: &[NewTournamentStatus],
    skip_duplicates: bool,
) -> Result<usize, StoreError> {
    let insert = diesel::insert_into(tournament_statuses::table).values(rows);
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
    changes: &TournamentStatusChanges,
) -> Result<TournamentStatus, StoreError> {
    diesel::update(tournament_statuses::table.find(id))
        .set(changes)
        .get_result(conn)
        .await
        .map_err(|e| StoreError::on(ENTITY, e))
}

pub async fn update_many(
    conn: &mut AsyncPgConnection,
    filter: &TournamentStatusFilter,
    changes: &TournamentStatusChanges,
) -> Result<usize, StoreError> {
    let cond = compile(filter, &condition)?;
    diesel::update(tournament_statuses::table.filter(cond))
        .set(changes)
        .execute(conn)
        .await
        .map_err(StoreError::from)
}

pub async fn delete(conn: &mut AsyncPgConnection, id: i32) -> Result<TournamentStatus, StoreError> {
    diesel::delete(tournament_statuses::table.find(id))
        .get_result(conn)
        .await
        .map_err(|e| StoreError::on(ENTITY, e))
}

pub async fn delete_many(
    conn: &mut AsyncPgConnection,
    filter: &TournamentStatusFilter,
) -> Result<usize, StoreError> {
    let cond = compile(filter, &condition)?;
    diesel::delete(tournament_statuses::table.filter(cond))
        .execute(conn)
        .await
        .map_err(StoreError::from)
}

pub async fn count(
    conn: &mut AsyncPgConnection,
    filter: &TournamentStatusFilter,
) -> Result<i64, StoreError> {
    let cond = compile(filter, &condition)?;
    tournament_statuses::table
        .filter(cond)
        .count()
        .get_result(conn)
        .await
        .map_err(StoreError::from)
}

numeric_aggregates!(tournament_statuses, TournamentStatusField, {
    TournamentStatusField::Id => tournament_statuses::id,
    TournamentStatusField::TournamentId => tournament_statuses::tournament_id,
});

pub async fn aggregate(
    conn: &mut AsyncPgConnection,
    filter: &TournamentStatusFilter,
    selection: &AggregateSelection<TournamentStatusField>,
) -> Result<AggregateRow<TournamentStatusField>, StoreError> {
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
    query: &GroupQuery<TournamentStatusField>,
) -> Result<Vec<serde_json::Value>, StoreError> {
    group::run(conn, query).await
}
