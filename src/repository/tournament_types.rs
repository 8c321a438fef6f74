use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::models::schema::{tournament_types, tournaments};
use crate::models::tournament_type::{NewTournamentType, TournamentType, TournamentTypeChanges};
use crate::query::filter::{cmp_cond, str_cond};
use crate::query::sort::order_cond;
use crate::query::{
    compile, group, AggregateRow, AggregateSelection, Cmp, DynCond, DynOrder, FieldMeta, Filter,
    GroupQuery, OrderBy, Page, StrFilter,
};
use crate::repository::error::StoreError;
use crate::repository::numeric_aggregates;
use crate::repository::tournaments::{condition as tournament_cond, TournamentPredicate};

const ENTITY: &str = "TournamentType";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TournamentTypeField {
    Id,
    Type,
}

impl FieldMeta for TournamentTypeField {
    const TABLE: &'static str = "tournament_types";

    fn column(&self) -> &'static str {
        match self {
            TournamentTypeField::Id => "id",
            TournamentTypeField::Type => "type",
        }
    }

    fn numeric(&self) -> bool {
        matches!(self, TournamentTypeField::Id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TournamentTypePredicate {
    Id(Cmp<i32>),
    Type(StrFilter),
    HasTournament(Box<Filter<TournamentPredicate>>),
}

pub type TournamentTypeFilter = Filter<TournamentTypePredicate>;

pub(crate) fn condition(
    p: &TournamentTypePredicate,
) -> Result<DynCond<tournament_types::table>, StoreError> {
    Ok(match p {
        TournamentTypePredicate::Id(c) => cmp_cond!(tournament_types::id, c),
        TournamentTypePredicate::Type(f) => str_cond!(tournament_types::type_, f),
        TournamentTypePredicate::HasTournament(inner) => {
            let sub = compile(inner, &tournament_cond)?;
            Box::new(
                tournament_types::id
                    .eq_any(
                        tournaments::table
                            .filter(sub)
                            .select(tournaments::tournament_type_id)
                            .into_boxed(),
                    )
                    .nullable(),
            )
        }
    })
}

fn order(o: &OrderBy<TournamentTypeField>) -> DynOrder<tournament_types::table> {
    match o.field {
        TournamentTypeField::Id => order_cond!(tournament_types::id, o),
        TournamentTypeField::Type => order_cond!(tournament_types::type_, o),
    }
}

pub(crate) fn query(
    filter: &TournamentTypeFilter,
    order_by: &[OrderBy<TournamentTypeField>],
    page: Option<Page>,
) -> Result<tournament_types::BoxedQuery<'static, Pg>, StoreError> {
    if let Some(page) = &page {
        page.check(order_by.len())?;
    }
    let mut q = tournament_types::table.into_boxed();
    q = q.filter(compile(filter, &condition)?);
    for o in order_by {
        q = q.then_order_by(order(o));
    }
    match page {
        Some(Page::Offset { skip, take }) => q = q.offset(skip).limit(take),
        Some(Page::Cursor { after, take }) => {
            q = q
                .filter(tournament_types::id.gt(after))
                .order(tournament_types::id.asc())
                .limit(take)
        }
        None => {}
    }
    Ok(q)
}

pub async fn find_by_id(
    conn: &mut AsyncPgConnection,
    id: i32,
) -> Result<Option<TournamentType>, StoreError> {
    tournament_types::table
        .find(id)
        .first::<TournamentType>(conn)
        .await
        .optional()
        .map_err(StoreError::from)
}

pub async fn find_one(
    conn: &mut AsyncPgConnection,
    filter: &TournamentTypeFilter,
) -> Result<Option<TournamentType>, StoreError> {
    query(filter, &[], None)?
        .first::<TournamentType>(conn)
        .await
        .optional()
        .map_err(StoreError::from)
}

pub async fn find_many(
    conn: &mut AsyncPgConnection,
    filter: &TournamentTypeFilter,
    order_by: &[OrderBy<TournamentTypeField>],
    page: Option<Page>,
) -> Result<Vec<TournamentType>, StoreError> {
    query(filter, order_by, page)?
        .load::<TournamentType>(conn)
        .await
        .map_err(StoreError::from)
}

pub async fn create(
    conn: &mut AsyncPgConnection,
    row: &NewTournamentType,
) -> Result<TournamentType, StoreError> {
    diesel::insert_into(tournament_types::table)
        .values(row)
        .get_result(conn)
        .await
        .map_err(StoreError::from)
}

pub async fn create_many(
    conn: &mut AsyncPgConnection,
    rows: &[NewTournamentType],
    skip_duplicates: bool,
) -> Result<usize, StoreError> {
    let insert = diesel::insert_into(tournament_types::table).values(rows);
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
    changes: &TournamentTypeChanges,
) -> Result<TournamentType, StoreError> {
    diesel::update(tournament_types::table.find(id))
        .set(changes)
        .get_result(conn)
        .await
        .map_err(|e| StoreError::on(ENTITY, e))
}

pub async fn update_many(
    conn: &mut AsyncPgConnection,
    filter: &TournamentTypeFilter,
    changes: &TournamentTypeChanges,
) -> Result<usize, StoreError> {
    let cond = compile(filter, &condition)?;
    diesel::update(tournament_types::table.filter(cond))
        .set(changes)
        .execute(conn)
        .await
        .map_err(StoreError::from)
}

/// Create-or-update keyed on the unique type label.
pub async fn upsert(
    conn: &mut AsyncPgConnection,
    create: &NewTournamentType,
    changes: &TournamentTypeChanges,
) -> Result<TournamentType, StoreError> {
    diesel::insert_into(tournament_types::table)
        .values(create)
        .on_conflict(tournament_types::type_)
        .do_update()
        .set(changes)
        .get_result(conn)
        .await
        .map_err(StoreError::from)
}

pub async fn delete(conn: &mut AsyncPgConnection, id: i32) -> Result<TournamentType, StoreError> {
    diesel::delete(tournament_types::table.find(id))
        .get_result(conn)
        .await
        .map_err(|e| StoreError::on(ENTITY, e))
}

pub async fn delete_many(
    conn: &mut AsyncPgConnection,
    filter: &TournamentTypeFilter,
) -> Result<usize, StoreError> {
    let cond = compile(filter, &condition)?;
    diesel::delete(tournament_types::table.filter(cond))
        .execute(conn)
        .await
        .map_err(StoreError::from)
}

pub async fn count(
    conn: &mut AsyncPgConnection,
    filter: &TournamentTypeFilter,
) -> Result<i64, StoreError> {
    let cond = compile(filter, &condition)?;
    tournament_types::table
        .filter(cond)
        .count()
        .get_result(conn)
        .await
        .map_err(StoreError::from)
}

numeric_aggregates!(tournament_types, TournamentTypeField, {
    TournamentTypeField::Id => tournament_types::id,
});

pub async fn aggregate(
    conn: &mut AsyncPgConnection,
    filter: &TournamentTypeFilter,
    selection: &AggregateSelection<TournamentTypeField>,
) -> Result<AggregateRow<TournamentTypeField>, StoreError> {
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
    query: &GroupQuery<TournamentTypeField>,
) -> Result<Vec<serde_json::Value>, StoreError> {
    group::run(conn, query).await
}
