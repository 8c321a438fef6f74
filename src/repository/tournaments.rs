use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::models::game::Game;
use crate::models::game_match::Match;
use crate::models::schema::{
    games, matches, teams, tournament_statuses, tournament_types, tournaments,
};
use crate::models::team::Team;
use crate::models::tournament::{NewTournament, Tournament, TournamentChanges};
use crate::models::tournament_status::TournamentStatus;
use crate::models::tournament_type::TournamentType;
use crate::query::filter::{cmp_cond, opt_str_cond, str_cond};
use crate::query::sort::order_cond;
use crate::query::{
    compile, group, AggregateRow, AggregateSelection, Cmp, DynCond, DynOrder, FieldMeta, Filter,
    GroupQuery, OptStr, OrderBy, Page, RelationParams, StrFilter,
};
use crate::repository::error::StoreError;
use crate::repository::games::{condition as game_cond, GamePredicate};
use crate::repository::matches::{condition as match_cond, MatchField, MatchPredicate};
use crate::repository::numeric_aggregates;
use crate::repository::teams::{condition as team_cond, TeamField, TeamPredicate};
use crate::repository::tournament_statuses::{
    condition as status_cond, TournamentStatusField, TournamentStatusPredicate,
};
use crate::repository::tournament_types::{condition as type_cond, TournamentTypePredicate};
use crate::repository::{
    matches as matches_repo, teams as teams_repo, tournament_statuses as statuses_repo,
};

const ENTITY: &str = "Tournament";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TournamentField {
    Id,
    TournamentName,
    StartDate,
    StartTime,
    Format,
    Rules,
    MaxParticipants,
    MinTeams,
    PlayersPerTeam,
    TotalPlayers,
    Rewards,
    CreatedAt,
    UpdatedAt,
    GameId,
    TournamentTypeId,
}

impl FieldMeta for TournamentField {
    const TABLE: &'static str = "tournaments";

    fn column(&self) -> &'static str {
        match self {
            TournamentField::Id => "id",
            TournamentField::TournamentName => "tournament_name",
            TournamentField::StartDate => "start_date",
            TournamentField::StartTime => "start_time",
            TournamentField::Format => "format",
            TournamentField::Rules => "rules",
            TournamentField::MaxParticipants => "max_participants",
            TournamentField::MinTeams => "min_teams",
            TournamentField::PlayersPerTeam => "players_per_team",
            TournamentField::TotalPlayers => "total_players",
            TournamentField::Rewards => "rewards",
            TournamentField::CreatedAt => "created_at",
            TournamentField::UpdatedAt => "updated_at",
            TournamentField::GameId => "game_id",
            TournamentField::TournamentTypeId => "tournament_type_id",
        }
    }

    fn numeric(&self) -> bool {
        matches!(
            self,
            TournamentField::Id
                | TournamentField::MaxParticipants
                | TournamentField::MinTeams
                | TournamentField::PlayersPerTeam
                | TournamentField::TotalPlayers
                | TournamentField::GameId
                | TournamentField::TournamentTypeId
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TournamentPredicate {
    Id(Cmp<i32>),
    TournamentName(StrFilter),
    StartDate(Cmp<NaiveDate>),
    StartTime(Cmp<NaiveTime>),
    Format(StrFilter),
    Rules(StrFilter),
    MaxParticipants(Cmp<i32>),
    MinTeams(Cmp<i32>),
    PlayersPerTeam(Cmp<i32>),
    TotalPlayers(Cmp<i32>),
    Rewards(OptStr),
    CreatedAt(Cmp<NaiveDateTime>),
    UpdatedAt(Cmp<NaiveDateTime>),
    GameId(Cmp<i32>),
    TournamentTypeId(Cmp<i32>),
    /// The parent game matches the nested filter.
    Game(Box<Filter<GamePredicate>>),
    /// The parent tournament type matches the nested filter.
    Type(Box<Filter<TournamentTypePredicate>>),
    /// At least one enrolled team matches the nested filter.
    HasTeam(Box<Filter<TeamPredicate>>),
    /// At least one scheduled match matches the nested filter.
    HasMatch(Box<Filter<MatchPredicate>>),
    /// At least one status-history row matches the nested filter.
    HasStatus(Box<Filter<TournamentStatusPredicate>>),
}

pub type TournamentFilter = Filter<TournamentPredicate>;

pub(crate) fn condition(
    p: &TournamentPredicate,
) -> Result<DynCond<tournaments::table>, StoreError> {
    Ok(match p {
        TournamentPredicate::Id(c) => cmp_cond!(tournaments::id, c),
        TournamentPredicate::TournamentName(f) => str_cond!(tournaments::tournament_name, f),
        TournamentPredicate::StartDate(c) => cmp_cond!(tournaments::start_date, c),
        TournamentPredicate::StartTime(c) => cmp_cond!(tournaments::start_time, c),
        TournamentPredicate::Format(f) => str_cond!(tournaments::format, f),
        TournamentPredicate::Rules(f) => str_cond!(tournaments::rules, f),
        TournamentPredicate::MaxParticipants(c) => cmp_cond!(tournaments::max_participants, c),
        TournamentPredicate::MinTeams(c) => cmp_cond!(tournaments::min_teams, c),
        TournamentPredicate::PlayersPerTeam(c) => cmp_cond!(tournaments::players_per_team, c),
        TournamentPredicate::TotalPlayers(c) => cmp_cond!(tournaments::total_players, c),
        TournamentPredicate::Rewards(f) => opt_str_cond!(tournaments::rewards, f),
        TournamentPredicate::CreatedAt(c) => cmp_cond!(tournaments::created_at, c),
        TournamentPredicate::UpdatedAt(c) => cmp_cond!(tournaments::updated_at, c),
        TournamentPredicate::GameId(c) => cmp_cond!(tournaments::game_id, c),
        TournamentPredicate::TournamentTypeId(c) => cmp_cond!(tournaments::tournament_type_id, c),
        TournamentPredicate::Game(inner) => {
            let sub = compile(inner, &game_cond)?;
            Box::new(
                tournaments::game_id
                    .eq_any(games::table.filter(sub).select(games::id).into_boxed())
                    .nullable(),
            )
        }
        TournamentPredicate::Type(inner) => {
            let sub = compile(inner, &type_cond)?;
            Box::new(
                tournaments::tournament_type_id
                    .eq_any(tournament_types::table.filter(sub).select(tournament_types::id).into_boxed())
                    .nullable(),
            )
        }
        TournamentPredicate::HasTeam(inner) => {
            let sub = compile(inner, &team_cond)?;
            Box::new(
                tournaments::id
                    .eq_any(teams::table.filter(sub).select(teams::tournament_id).into_boxed())
                    .nullable(),
            )
        }
        TournamentPredicate::HasMatch(inner) => {
            let sub = compile(inner, &match_cond)?;
            Box::new(
                tournaments::id
                    .eq_any(matches::table.filter(sub).select(matches::tournament_id).into_boxed())
                    .nullable(),
            )
        }
        TournamentPredicate::HasStatus(inner) => {
            let sub = compile(inner, &status_cond)?;
            Box::new(
                tournaments::id
                    .eq_any(
                        tournament_statuses::table
                            .filter(sub)
                            .select(tournament_statuses::tournament_id)
                            .into_boxed(),
                    )
                    .nullable(),
            )
        }
    })
}

fn order(o: &OrderBy<TournamentField>) -> DynOrder<tournaments::table> {
    match o.field {
        TournamentField::Id => order_cond!(tournaments::id, o),
        TournamentField::TournamentName => order_cond!(tournaments::tournament_name, o),
        TournamentField::StartDate => order_cond!(tournaments::start_date, o),
        TournamentField::StartTime => order_cond!(tournaments::start_time, o),
        TournamentField::Format => order_cond!(tournaments::format, o),
        TournamentField::Rules => order_cond!(tournaments::rules, o),
        TournamentField::MaxParticipants => order_cond!(tournaments::max_participants, o),
        TournamentField::MinTeams => order_cond!(tournaments::min_teams, o),
        TournamentField::PlayersPerTeam => order_cond!(tournaments::players_per_team, o),
        TournamentField::TotalPlayers => order_cond!(tournaments::total_players, o),
        TournamentField::Rewards => order_cond!(tournaments::rewards, o),
        TournamentField::CreatedAt => order_cond!(tournaments::created_at, o),
        TournamentField::UpdatedAt => order_cond!(tournaments::updated_at, o),
        TournamentField::GameId => order_cond!(tournaments::game_id, o),
        TournamentField::TournamentTypeId => order_cond!(tournaments::tournament_type_id, o),
    }
}

pub(crate) fn query(
    filter: &TournamentFilter,
    order_by: &[OrderBy<TournamentField>],
    page: Option<Page>,
) -> Result<tournaments::BoxedQuery<'static, Pg>, StoreError> {
    if let Some(page) = &page {
        page.check(order_by.len())?;
    }
    let mut q = tournaments::table.into_boxed();
    q = q.filter(compile(filter, &condition)?);
    for o in order_by {
        q = q.then_order_by(order(o));
    }
    match page {
        Some(Page::Offset { skip, take }) => q = q.offset(skip).limit(take),
        Some(Page::Cursor { after, take }) => {
            q = q
                .filter(tournaments::id.gt(after))
                .order(tournaments::id.asc())
                .limit(take)
        }
        None => {}
    }
    Ok(q)
}

pub async fn find_by_id(
    conn: &mut AsyncPgConnection,
    id: i32,
) -> Result<Option<Tournament>, StoreError> {
    tournaments::table
        .find(id)
        .first::<Tournament>(conn)
        .await
        .optional()
        .map_err(StoreError::from)
}

pub async fn find_one(
    conn: &mut AsyncPgConnection,
    filter: &TournamentFilter,
) -> Result<Option<Tournament>, StoreError> {
    query(filter, &[], None)?
        .first::<Tournament>(conn)
        .await
        .optional()
        .map_err(StoreError::from)
}

pub async fn find_many(
    conn: &mut AsyncPgConnection,
    filter: &TournamentFilter,
    order_by: &[OrderBy<TournamentField>],
    page: Option<Page>,
) -> Result<Vec<Tournament>, StoreError> {
    query(filter, order_by, page)?
        .load::<Tournament>(conn)
        .await
        .map_err(StoreError::from)
}

pub async fn create(
    conn: &mut AsyncPgConnection,
    row: &NewTournament,
) -> Result<Tournament, StoreError> {
    diesel::insert_into(tournaments::table)
        .values(row)
        .get_result(conn)
        .await
        .map_err(StoreError::from)
}

pub async fn create_many(
    conn: &mut AsyncPgConnection,
    rows: &[NewTournament],
    skip_duplicates: bool,
) -> Result<usize, StoreError> {
    let insert = diesel::insert_into(tournaments::table).values(rows);
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
    changes: &TournamentChanges,
) -> Result<Tournament, StoreError> {
    diesel::update(tournaments::table.find(id))
        .set(changes)
        .get_result(conn)
        .await
        .map_err(|e| StoreError::on(ENTITY, e))
}

pub async fn update_many(
    conn: &mut AsyncPgConnection,
    filter: &TournamentFilter,
    changes: &TournamentChanges,
) -> Result<usize, StoreError> {
    let cond = compile(filter, &condition)?;
    diesel::update(tournaments::table.filter(cond))
        .set(changes)
        .execute(conn)
        .await
        .map_err(StoreError::from)
}

pub async fn delete(conn: &mut AsyncPgConnection, id: i32) -> Result<Tournament, StoreError> {
    diesel::delete(tournaments::table.find(id))
        .get_result(conn)
        .await
        .map_err(|e| StoreError::on(ENTITY, e))
}

pub async fn delete_many(
    conn: &mut AsyncPgConnection,
    filter: &TournamentFilter,
) -> Result<usize, StoreError> {
    let cond = compile(filter, &condition)?;
    diesel::delete(tournaments::table.filter(cond))
        .execute(conn)
        .await
        .map_err(StoreError::from)
}

pub async fn count(
    conn: &mut AsyncPgConnection,
    filter: &TournamentFilter,
) -> Result<i64, StoreError> {
    let cond = compile(filter, &condition)?;
    tournaments::table
        .filter(cond)
        .count()
        .get_result(conn)
        .await
        .map_err(StoreError::from)
}

numeric_aggregates!(tournaments, TournamentField, {
    TournamentField::Id => tournaments::id,
    TournamentField::MaxParticipants => tournaments::max_participants,
    TournamentField::MinTeams => tournaments::min_teams,
    TournamentField::PlayersPerTeam => tournaments::players_per_team,
    TournamentField::TotalPlayers => tournaments::total_players,
    TournamentField::GameId => tournaments::game_id,
    TournamentField::TournamentTypeId => tournaments::tournament_type_id,
});

pub async fn aggregate(
    conn: &mut AsyncPgConnection,
    filter: &TournamentFilter,
    selection: &AggregateSelection<TournamentField>,
) -> Result<AggregateRow<TournamentField>, StoreError> {
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
    query: &GroupQuery<TournamentField>,
) -> Result<Vec<serde_json::Value>, StoreError> {
    group::run(conn, query).await
}

/// Which relations to load alongside a tournament. Collection relations
/// carry their own filter/order/pagination.
#[derive(Debug, Clone, Default)]
pub struct TournamentInclude {
    pub game: bool,
    pub tournament_type: bool,
    pub teams: Option<RelationParams<TeamPredicate, TeamField>>,
    pub matches: Option<RelationParams<MatchPredicate, MatchField>>,
    pub status_history: Option<RelationParams<TournamentStatusPredicate, TournamentStatusField>>,
}

/// A tournament with the relations requested through [`TournamentInclude`].
/// Unrequested relations are `None`.
#[derive(Debug, Clone, Serialize)]
pub struct TournamentGraph {
    pub tournament: Tournament,
    pub game: Option<Game>,
    #[serde(rename = "tournamentType")]
    pub tournament_type: Option<TournamentType>,
    pub teams: Option<Vec<Team>>,
    pub matches: Option<Vec<Match>>,
    #[serde(rename = "statusHistory")]
    pub status_history: Option<Vec<TournamentStatus>>,
}

pub async fn find_with_related(
    conn: &mut AsyncPgConnection,
    id: i32,
    include: &TournamentInclude,
) -> Result<Option<TournamentGraph>, StoreError> {
    let tournament = match find_by_id(conn, id).await? {
        Some(t) => t,
        None => return Ok(None),
    };
    let mut graphs = attach_related(conn, vec![tournament], include).await?;
    Ok(graphs.pop())
}

pub async fn find_many_with_related(
    conn: &mut AsyncPgConnection,
    filter: &TournamentFilter,
    order_by: &[OrderBy<TournamentField>],
    page: Option<Page>,
    include: &TournamentInclude,
) -> Result<Vec<TournamentGraph>, StoreError> {
    let parents = find_many(conn, filter, order_by, page).await?;
    attach_related(conn, parents, include).await
}

/// Batch-loads the requested relations for a set of parents. Child
/// collections are fetched in one query per relation and split per parent;
/// per-parent pagination is applied in memory after the split.
async fn attach_related(
    conn: &mut AsyncPgConnection,
    parents: Vec<Tournament>,
    include: &TournamentInclude,
) -> Result<Vec<TournamentGraph>, StoreError> {
    let parent_ids: Vec<i32> = parents.iter().map(|t| t.id).collect();

    let mut games_by_id: HashMap<i32, Game> = HashMap::new();
    if include.game {
        let ids: Vec<i32> = parents.iter().map(|t| t.game_id).collect();
        games_by_id = games::table
            .filter(games::id.eq_any(ids))
            .load::<Game>(conn)
            .await
            .map_err(StoreError::from)?
            .into_iter()
            .map(|g| (g.id, g))
            .collect();
    }

    let mut types_by_id: HashMap<i32, TournamentType> = HashMap::new();
    if include.tournament_type {
        let ids: Vec<i32> = parents.iter().map(|t| t.tournament_type_id).collect();
        types_by_id = tournament_types::table
            .filter(tournament_types::id.eq_any(ids))
            .load::<TournamentType>(conn)
            .await
            .map_err(StoreError::from)?
            .into_iter()
            .map(|t| (t.id, t))
            .collect();
    }

    let mut teams_by_parent: HashMap<i32, Vec<Team>> = HashMap::new();
    if let Some(params) = &include.teams {
        let rows: Vec<Team> = teams_repo::query(&params.filter, &params.order, None)?
            .filter(teams::tournament_id.eq_any(parent_ids.clone()))
            .load(conn)
            .await
            .map_err(StoreError::from)?;
        for row in rows {
            teams_by_parent.entry(row.tournament_id).or_default().push(row);
        }
        if let Some(page) = params.page {
            page.check(params.order.len())?;
            for rows in teams_by_parent.values_mut() {
                *rows = page.slice(std::mem::take(rows), |t| t.id);
            }
        }
    }

    let mut matches_by_parent: HashMap<i32, Vec<Match>> = HashMap::new();
    if let Some(params) = &include.matches {
        let rows: Vec<Match> = matches_repo::query(&params.filter, &params.order, None)?
            .filter(matches::tournament_id.eq_any(parent_ids.clone()))
            .load(conn)
            .await
            .map_err(StoreError::from)?;
        for row in rows {
            matches_by_parent
                .entry(row.tournament_id)
                .or_default()
                .push(row);
        }
        if let Some(page) = params.page {
            page.check(params.order.len())?;
            for rows in matches_by_parent.values_mut() {
                *rows = page.slice(std::mem::take(rows), |m| m.id);
            }
        }
    }

    let mut statuses_by_parent: HashMap<i32, Vec<TournamentStatus>> = HashMap::new();
    if let Some(params) = &include.status_history {
        let rows: Vec<TournamentStatus> =
            statuses_repo::query(&params.filter, &params.order, None)?
                .filter(tournament_statuses::tournament_id.eq_any(parent_ids.clone()))
                .load(conn)
                .await
                .map_err(StoreError::from)?;
        for row in rows {
            statuses_by_parent
                .entry(row.tournament_id)
                .or_default()
                .push(row);
        }
        if let Some(page) = params.page {
            page.check(params.order.len())?;
            for rows in statuses_by_parent.values_mut() {
                *rows = page.slice(std::mem::take(rows), |s| s.id);
            }
        }
    }

    let mut graphs = Vec::with_capacity(parents.len());
    for parent in parents {
        let game = include
            .game
            .then(|| games_by_id.get(&parent.game_id).cloned())
            .flatten();
        let tournament_type = include
            .tournament_type
            .then(|| types_by_id.get(&parent.tournament_type_id).cloned())
            .flatten();
        if include.game && game.is_none() {
            return Err(StoreError::NotFound("Game"));
        }
        if include.tournament_type && tournament_type.is_none() {
            return Err(StoreError::NotFound("TournamentType"));
        }
        graphs.push(TournamentGraph {
            teams: include
                .teams
                .is_some()
                .then(|| teams_by_parent.remove(&parent.id).unwrap_or_default()),
            matches: include
                .matches
                .is_some()
                .then(|| matches_by_parent.remove(&parent.id).unwrap_or_default()),
            status_history: include
                .status_history
                .is_some()
                .then(|| statuses_by_parent.remove(&parent.id).unwrap_or_default()),
            tournament: parent,
            game,
            tournament_type,
        });
    }
    Ok(graphs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::team_members::TeamMemberPredicate;
    use crate::repository::users::UserPredicate;

    // Relation predicates nest across entities in both directions; the
    // boxed indirection keeps the enums finite-size and the whole tree
    // compilable into one condition.
    #[test]
    fn mutually_recursive_relation_filters_compile() {
        let filter: TournamentFilter = Filter::And(vec![
            Filter::Where(TournamentPredicate::Game(Box::new(Filter::Where(
                GamePredicate::HasTournament(Box::new(Filter::Where(TournamentPredicate::Id(
                    Cmp::Gt(0),
                )))),
            )))),
            Filter::Where(TournamentPredicate::HasTeam(Box::new(Filter::Where(
                TeamPredicate::HasMember(Box::new(Filter::Where(TeamMemberPredicate::User(
                    Box::new(Filter::Where(UserPredicate::Id(Cmp::Eq(1)))),
                )))),
            )))),
        ]);
        assert!(compile(&filter, &condition).is_ok());
    }
}
