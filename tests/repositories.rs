//! Integration tests against a live Postgres instance.
//!
//! They need `DATABASE_URL` pointing at a scratch database and are ignored by
//! default; run them with `cargo test -- --ignored`. Every fixture row carries
//! a unique tag so tests can run concurrently and repeatedly.

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{NaiveDate, Utc};
use scoped_futures::ScopedFutureExt;

use tourney_store::models::game::NewGame;
use tourney_store::models::game_match::NewMatch;
use tourney_store::models::team::{NewTeam, TeamChanges};
use tourney_store::models::tournament::NewTournament;
use tourney_store::models::tournament_status::NewTournamentStatus;
use tourney_store::models::tournament_type::NewTournamentType;
use tourney_store::models::user::{NewUser, UserChanges};
use tourney_store::query::{
    Aggregate, AggregateSelection, Cmp, CmpOp, Filter, GroupQuery, Having, HavingTarget,
    HavingValue, OrderBy, Page, RelationParams, StrCmp, StrFilter,
};
use tourney_store::repository::tournaments::TournamentInclude;
use tourney_store::repository::{
    games, matches, team_members, teams, tournament_statuses, tournament_types, tournaments, users,
};
use tourney_store::repository::matches::MatchPredicate;
use tourney_store::repository::team_members::TeamMemberPredicate;
use tourney_store::repository::teams::{TeamField, TeamPredicate};
use tourney_store::repository::tournament_statuses::TournamentStatusField;
use tourney_store::repository::tournaments::{TournamentField, TournamentPredicate};
use tourney_store::repository::users::{UserKey, UserPredicate};
use tourney_store::service::enrollment;
use tourney_store::service::results::{self, MatchResult};
use tourney_store::{Config, ConstraintKind, Database, StoreError, TxOptions};

fn init_logging() {
    use log4rs::append::console::ConsoleAppender;
    use log4rs::config::{Appender, Config as LogConfig, Root};

    let stdout = ConsoleAppender::builder().build();
    let config = LogConfig::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(
            Root::builder()
                .appender("stdout")
                .build(log::LevelFilter::Info),
        )
        .unwrap();
    let _ = log4rs::init_config(config);
}

fn setup() -> Database {
    init_logging();
    let config = Config::init();
    Database::run_migrations(&config.database_url).unwrap();
    Database::new(&config)
}

fn tag() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("t{nanos}")
}

fn new_user(tag: &str, n: u32) -> NewUser {
    NewUser {
        pseudo: format!("{tag}-player-{n}"),
        email: format!("{tag}-player-{n}@example.org"),
        name: format!("Player{n}"),
        last_name: "Doe".to_string(),
        password: "hunter2hash".to_string(),
        sexe: "na".to_string(),
        birthday: NaiveDate::from_ymd_opt(1999, 4, 2).unwrap(),
        last_auth: Utc::now().naive_utc(),
        role: None,
    }
}

fn new_tournament(tag: &str, game_id: i32, type_id: i32, players_per_team: i32) -> NewTournament {
    NewTournament {
        tournament_name: format!("{tag} Open"),
        start_date: NaiveDate::from_ymd_opt(2026, 9, 12).unwrap(),
        start_time: chrono::NaiveTime::from_hms_opt(18, 30, 0).unwrap(),
        format: format!("fmt-{tag}"),
        rules: "best of three".to_string(),
        max_participants: 32,
        min_teams: 2,
        players_per_team,
        total_players: 16,
        rewards: None,
        updated_at: Utc::now().naive_utc(),
        game_id,
        tournament_type_id: type_id,
    }
}

struct Fixture {
    game_id: i32,
    type_id: i32,
    tournament_id: i32,
}

async fn tournament_fixture(
    conn: &mut diesel_async::AsyncPgConnection,
    tag: &str,
    players_per_team: i32,
) -> Fixture {
    let game = games::create(
        conn,
        &NewGame {
            name: format!("{tag}-chess"),
        },
    )
    .await
    .unwrap();
    let ttype = tournament_types::create(
        conn,
        &NewTournamentType {
            type_: format!("{tag}-swiss"),
        },
    )
    .await
    .unwrap();
    let tournament = tournaments::create(
        conn,
        &new_tournament(tag, game.id, ttype.id, players_per_team),
    )
    .await
    .unwrap();
    Fixture {
        game_id: game.id,
        type_id: ttype.id,
        tournament_id: tournament.id,
    }
}

#[tokio::test]
#[ignore]
async fn user_round_trip() {
    let db = setup();
    let mut conn = db.conn().await.unwrap();
    let tag = tag();

    let created = users::create(&mut conn, &new_user(&tag, 1)).await.unwrap();
    assert_eq!(created.role, "user");

    let by_id = users::find_by_id(&mut conn, created.id).await.unwrap();
    assert_eq!(by_id.as_ref(), Some(&created));

    let by_pseudo = users::find_one(
        &mut conn,
        &Filter::Where(UserPredicate::Pseudo(StrFilter::new(StrCmp::Eq(
            created.pseudo.clone(),
        )))),
    )
    .await
    .unwrap();
    assert_eq!(by_pseudo, Some(created.clone()));

    let renamed = users::update(
        &mut conn,
        created.id,
        &UserChanges {
            name: Some("Renamed".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(renamed.name, "Renamed");

    users::delete(&mut conn, created.id).await.unwrap();
    assert!(matches!(
        users::delete(&mut conn, created.id).await,
        Err(StoreError::NotFound("User"))
    ));
    assert_eq!(users::find_by_id(&mut conn, created.id).await.unwrap(), None);
}

#[tokio::test]
#[ignore]
async fn create_many_is_atomic_unless_skipping_duplicates() {
    let db = setup();
    let mut conn = db.conn().await.unwrap();
    let tag = tag();

    let mut twin = new_user(&tag, 2);
    twin.pseudo = format!("{tag}-player-1");
    let rows = vec![new_user(&tag, 1), twin];

    let err = users::create_many(&mut conn, &rows, false).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::ConstraintViolation {
            kind: ConstraintKind::Unique,
            ..
        }
    ));

    // Nothing from the failed batch may be visible.
    let filter = Filter::Where(UserPredicate::Pseudo(StrFilter::new(StrCmp::StartsWith(
        tag.clone(),
    ))));
    assert_eq!(users::count(&mut conn, &filter).await.unwrap(), 0);

    let inserted = users::create_many(&mut conn, &rows, true).await.unwrap();
    assert_eq!(inserted, 1);
    assert_eq!(users::count(&mut conn, &filter).await.unwrap(), 1);
}

#[tokio::test]
#[ignore]
async fn foreign_keys_and_restricted_deletes_are_enforced() {
    let db = setup();
    let mut conn = db.conn().await.unwrap();
    let tag = tag();

    let orphan = teams::create(
        &mut conn,
        &NewTeam {
            team_name: format!("{tag}-ghosts"),
            tournament_id: -1,
        },
    )
    .await;
    assert!(matches!(
        orphan,
        Err(StoreError::ConstraintViolation {
            kind: ConstraintKind::ForeignKey,
            ..
        })
    ));

    let fx = tournament_fixture(&mut conn, &tag, 2).await;
    let alpha = teams::create(
        &mut conn,
        &NewTeam {
            team_name: format!("{tag}-alpha"),
            tournament_id: fx.tournament_id,
        },
    )
    .await
    .unwrap();
    let beta = teams::create(
        &mut conn,
        &NewTeam {
            team_name: format!("{tag}-beta"),
            tournament_id: fx.tournament_id,
        },
    )
    .await
    .unwrap();
    matches::create(
        &mut conn,
        &NewMatch {
            tournament_id: fx.tournament_id,
            team1_id: alpha.id,
            team2_id: beta.id,
            team1_score: None,
            team2_score: None,
            winner_id: None,
            match_date: Utc::now().naive_utc(),
            status: "scheduled".to_string(),
        },
    )
    .await
    .unwrap();

    // The match still references the team, so the delete must be blocked.
    assert!(matches!(
        teams::delete(&mut conn, alpha.id).await,
        Err(StoreError::ConstraintViolation {
            kind: ConstraintKind::ForeignKey,
            ..
        })
    ));

    // Deleting the tournament cascades through teams, matches and statuses.
    tournaments::delete(&mut conn, fx.tournament_id).await.unwrap();
    assert_eq!(teams::find_by_id(&mut conn, alpha.id).await.unwrap(), None);
}

#[tokio::test]
#[ignore]
async fn matches_must_pair_distinct_teams() {
    let db = setup();
    let mut conn = db.conn().await.unwrap();
    let tag = tag();

    let fx = tournament_fixture(&mut conn, &tag, 2).await;
    let team = teams::create(
        &mut conn,
        &NewTeam {
            team_name: format!("{tag}-solo"),
            tournament_id: fx.tournament_id,
        },
    )
    .await
    .unwrap();

    let err = matches::create(
        &mut conn,
        &NewMatch {
            tournament_id: fx.tournament_id,
            team1_id: team.id,
            team2_id: team.id,
            team1_score: None,
            team2_score: None,
            winner_id: None,
            match_date: Utc::now().naive_utc(),
            status: "scheduled".to_string(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        StoreError::ConstraintViolation {
            kind: ConstraintKind::Check,
            ..
        }
    ));
}

#[tokio::test]
#[ignore]
async fn cursor_pagination_never_overlaps() {
    let db = setup();
    let mut conn = db.conn().await.unwrap();
    let tag = tag();

    let fx = tournament_fixture(&mut conn, &tag, 4).await;
    for n in 0..5 {
        teams::create(
            &mut conn,
            &NewTeam {
                team_name: format!("{tag}-squad-{n}"),
                tournament_id: fx.tournament_id,
            },
        )
        .await
        .unwrap();
    }

    let filter = Filter::Where(TeamPredicate::TournamentId(Cmp::Eq(fx.tournament_id)));
    let mut seen = Vec::new();
    let mut after = 0;
    loop {
        let page = teams::find_many(
            &mut conn,
            &filter,
            &[],
            Some(Page::Cursor { after, take: 2 }),
        )
        .await
        .unwrap();
        if page.is_empty() {
            break;
        }
        after = page.last().unwrap().id;
        seen.extend(page.into_iter().map(|t| t.id));
    }

    assert_eq!(seen.len(), 5);
    assert!(seen.windows(2).all(|w| w[0] < w[1]));

    // Cursor reads are keyed on id; combining them with orderBy is an error.
    let err = teams::find_many(
        &mut conn,
        &filter,
        &[OrderBy::desc(TeamField::TeamName)],
        Some(Page::Cursor { after: 0, take: 2 }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
}

#[tokio::test]
#[ignore]
async fn count_agrees_with_find_many() {
    let db = setup();
    let mut conn = db.conn().await.unwrap();
    let tag = tag();

    let fx = tournament_fixture(&mut conn, &tag, 4).await;
    for n in 0..4 {
        teams::create(
            &mut conn,
            &NewTeam {
                team_name: format!("{tag}-{}-{n}", if n % 2 == 0 { "red" } else { "blue" }),
                tournament_id: fx.tournament_id,
            },
        )
        .await
        .unwrap();
    }

    let in_tournament = Filter::Where(TeamPredicate::TournamentId(Cmp::Eq(fx.tournament_id)));
    let red = Filter::Where(TeamPredicate::TeamName(StrFilter::new(StrCmp::Contains(
        "red".to_string(),
    ))));
    let shapes: Vec<Filter<TeamPredicate>> = vec![
        in_tournament.clone(),
        Filter::And(vec![in_tournament.clone(), red.clone()]),
        Filter::And(vec![in_tournament.clone(), Filter::not(red.clone())]),
        Filter::Or(vec![]),
        Filter::And(vec![
            in_tournament.clone(),
            Filter::Or(vec![
                red,
                Filter::Where(TeamPredicate::TeamName(StrFilter::insensitive(
                    StrCmp::Contains("BLUE".to_string()),
                ))),
            ]),
        ]),
    ];

    for filter in &shapes {
        let listed = teams::find_many(&mut conn, filter, &[], None).await.unwrap();
        let counted = teams::count(&mut conn, filter).await.unwrap();
        assert_eq!(listed.len() as i64, counted);
    }
}

#[tokio::test]
#[ignore]
async fn eager_loading_assembles_the_requested_graph() {
    let db = setup();
    let mut conn = db.conn().await.unwrap();
    let tag = tag();

    let fx = tournament_fixture(&mut conn, &tag, 4).await;
    for n in 0..3 {
        teams::create(
            &mut conn,
            &NewTeam {
                team_name: format!("{tag}-g-{n}"),
                tournament_id: fx.tournament_id,
            },
        )
        .await
        .unwrap();
    }
    tournament_statuses::create(
        &mut conn,
        &NewTournamentStatus {
            status: "registration".to_string(),
            updated_at: Utc::now().naive_utc(),
            tournament_id: fx.tournament_id,
        },
    )
    .await
    .unwrap();

    let include = TournamentInclude {
        game: true,
        tournament_type: true,
        teams: Some(RelationParams {
            filter: Filter::all(),
            order: vec![OrderBy::desc(TeamField::TeamName)],
            page: Some(Page::Offset { skip: 0, take: 2 }),
        }),
        matches: None,
        status_history: Some(RelationParams {
            filter: Filter::all(),
            order: vec![OrderBy::desc(TournamentStatusField::UpdatedAt)],
            page: None,
        }),
    };
    let graph = tournaments::find_with_related(&mut conn, fx.tournament_id, &include)
        .await
        .unwrap()
        .expect("fixture tournament");

    assert_eq!(graph.game.as_ref().map(|g| g.id), Some(fx.game_id));
    assert_eq!(
        graph.tournament_type.as_ref().map(|t| t.id),
        Some(fx.type_id)
    );
    let loaded_teams = graph.teams.unwrap();
    assert_eq!(loaded_teams.len(), 2);
    assert_eq!(loaded_teams[0].team_name, format!("{tag}-g-2"));
    assert_eq!(graph.status_history.unwrap().len(), 1);
    assert!(graph.matches.is_none());
}

#[tokio::test]
#[ignore]
async fn nested_cursor_pagination_is_idempotent() {
    let db = setup();
    let mut conn = db.conn().await.unwrap();
    let tag = tag();

    let fx = tournament_fixture(&mut conn, &tag, 4).await;
    for n in 0..5 {
        teams::create(
            &mut conn,
            &NewTeam {
                team_name: format!("{tag}-c-{n}"),
                tournament_id: fx.tournament_id,
            },
        )
        .await
        .unwrap();
    }

    let mut seen = Vec::new();
    let mut after = 0;
    loop {
        let include = TournamentInclude {
            teams: Some(RelationParams {
                filter: Filter::all(),
                order: vec![],
                page: Some(Page::Cursor { after, take: 2 }),
            }),
            ..Default::default()
        };
        let graph = tournaments::find_with_related(&mut conn, fx.tournament_id, &include)
            .await
            .unwrap()
            .expect("fixture tournament");
        let page = graph.teams.unwrap();
        if page.is_empty() {
            break;
        }
        after = page.last().unwrap().id;
        seen.extend(page.into_iter().map(|t| t.id));
    }

    // Every team exactly once, in ascending id order, across page boundaries.
    assert_eq!(seen.len(), 5);
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
#[ignore]
async fn relation_filters_reach_across_tables() {
    let db = setup();
    let mut conn = db.conn().await.unwrap();
    let tag = tag();

    let fx = tournament_fixture(&mut conn, &tag, 4).await;
    let team = teams::create(
        &mut conn,
        &NewTeam {
            team_name: format!("{tag}-knights"),
            tournament_id: fx.tournament_id,
        },
    )
    .await
    .unwrap();
    let user = users::create(&mut conn, &new_user(&tag, 7)).await.unwrap();
    team_members::create(
        &mut conn,
        &tourney_store::models::team_member::NewTeamMember {
            role: "captain".to_string(),
            user_id: user.id,
            team_id: team.id,
        },
    )
    .await
    .unwrap();

    // Tournaments that have a team whose members include this user.
    let found = tournaments::find_many(
        &mut conn,
        &Filter::Where(TournamentPredicate::HasTeam(Box::new(Filter::Where(
            TeamPredicate::HasMember(Box::new(Filter::Where(TeamMemberPredicate::UserId(
                Cmp::Eq(user.id),
            )))),
        )))),
        &[],
        None,
    )
    .await
    .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, fx.tournament_id);

    // And none when the nested filter misses.
    let none = tournaments::count(
        &mut conn,
        &Filter::And(vec![
            Filter::Where(TournamentPredicate::Id(Cmp::Eq(fx.tournament_id))),
            Filter::Where(TournamentPredicate::HasMatch(Box::new(Filter::Where(
                MatchPredicate::Status(StrFilter::new(StrCmp::Eq("completed".to_string()))),
            )))),
        ]),
    )
    .await
    .unwrap();
    assert_eq!(none, 0);
}

#[tokio::test]
#[ignore]
async fn upsert_creates_then_updates() {
    let db = setup();
    let mut conn = db.conn().await.unwrap();
    let tag = tag();

    let seed = new_user(&tag, 1);
    let changes = UserChanges {
        name: Some("Upserted".to_string()),
        ..Default::default()
    };

    let first = users::upsert(&mut conn, UserKey::Pseudo, &seed, &changes)
        .await
        .unwrap();
    assert_eq!(first.name, "Player1");

    let second = users::upsert(&mut conn, UserKey::Pseudo, &seed, &changes)
        .await
        .unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.name, "Upserted");
}

#[tokio::test]
#[ignore]
async fn transactions_roll_back_on_error() {
    let db = setup();
    let tag = tag();
    let pseudo = format!("{tag}-player-1");

    let result: Result<(), StoreError> = db
        .transaction(TxOptions::default(), |conn| {
            let user = new_user(&tag, 1);
            async move {
                users::create(conn, &user).await?;
                Err(StoreError::Validation("forced failure".to_string()))
            }
            .scope_boxed()
        })
        .await;
    assert!(matches!(result, Err(StoreError::Validation(_))));

    let mut conn = db.conn().await.unwrap();
    let gone = users::find_one(
        &mut conn,
        &Filter::Where(UserPredicate::Pseudo(StrFilter::new(StrCmp::Eq(pseudo)))),
    )
    .await
    .unwrap();
    assert_eq!(gone, None);
}

#[tokio::test]
#[ignore]
async fn record_match_result_updates_the_whole_graph() {
    let db = setup();
    let tag = tag();
    let (fx, alpha, beta, match_id) = {
        let mut conn = db.conn().await.unwrap();
        let fx = tournament_fixture(&mut conn, &tag, 2).await;
        let alpha = teams::create(
            &mut conn,
            &NewTeam {
                team_name: format!("{tag}-alpha"),
                tournament_id: fx.tournament_id,
            },
        )
        .await
        .unwrap();
        let beta = teams::create(
            &mut conn,
            &NewTeam {
                team_name: format!("{tag}-beta"),
                tournament_id: fx.tournament_id,
            },
        )
        .await
        .unwrap();
        let m = matches::create(
            &mut conn,
            &NewMatch {
                tournament_id: fx.tournament_id,
                team1_id: alpha.id,
                team2_id: beta.id,
                team1_score: None,
                team2_score: None,
                winner_id: None,
                match_date: Utc::now().naive_utc(),
                status: "scheduled".to_string(),
            },
        )
        .await
        .unwrap();
        (fx, alpha.id, beta.id, m.id)
    };

    // A winner that is not one of the two teams is rejected before any write.
    let err = results::record_match_result(
        &db,
        TxOptions::default(),
        match_id,
        MatchResult {
            team1_score: 3,
            team2_score: 1,
            winner_id: Some(beta + 100_000),
        },
        None,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));

    let updated = results::record_match_result(
        &db,
        TxOptions::default(),
        match_id,
        MatchResult {
            team1_score: 3,
            team2_score: 1,
            winner_id: Some(alpha),
        },
        Some("in_progress".to_string()),
    )
    .await
    .unwrap();
    assert_eq!(updated.status, "completed");
    assert_eq!(updated.team1_score, Some(3));
    assert_eq!(updated.team2_score, Some(1));
    assert_eq!(updated.winner_id, Some(alpha));

    let mut conn = db.conn().await.unwrap();
    let current = tournament_statuses::current_for(&mut conn, fx.tournament_id)
        .await
        .unwrap()
        .expect("status row appended");
    assert_eq!(current.status, "in_progress");
}

#[tokio::test]
#[ignore]
async fn join_team_enforces_capacity_and_uniqueness() {
    let db = setup();
    let tag = tag();
    let (team_id, first_user) = {
        let mut conn = db.conn().await.unwrap();
        let fx = tournament_fixture(&mut conn, &tag, 2).await;
        let team = teams::create(
            &mut conn,
            &NewTeam {
                team_name: format!("{tag}-rooks"),
                tournament_id: fx.tournament_id,
            },
        )
        .await
        .unwrap();
        (team.id, users::create(&mut conn, &new_user(&tag, 0)).await.unwrap())
    };

    enrollment::join_team(&db, TxOptions::default(), first_user.id, team_id, "captain".into())
        .await
        .unwrap();

    // Joining the same team twice trips the unique (user, team) pair.
    let dup = enrollment::join_team(&db, TxOptions::default(), first_user.id, team_id, "player".into())
        .await
        .unwrap_err();
    assert!(matches!(
        dup,
        StoreError::ConstraintViolation {
            kind: ConstraintKind::Unique,
            ..
        }
    ));

    let second = {
        let mut conn = db.conn().await.unwrap();
        users::create(&mut conn, &new_user(&tag, 1)).await.unwrap()
    };
    enrollment::join_team(&db, TxOptions::default(), second.id, team_id, "player".into())
        .await
        .unwrap();

    let third = {
        let mut conn = db.conn().await.unwrap();
        users::create(&mut conn, &new_user(&tag, 2)).await.unwrap()
    };
    let full = enrollment::join_team(&db, TxOptions::default(), third.id, team_id, "player".into())
        .await
        .unwrap_err();
    assert!(matches!(
        full,
        StoreError::ConstraintViolation {
            kind: ConstraintKind::Check,
            ..
        }
    ));
}

#[tokio::test]
#[ignore]
async fn aggregate_and_group_by_summarize_tournaments() {
    let db = setup();
    let mut conn = db.conn().await.unwrap();
    let tag = tag();

    let fx = tournament_fixture(&mut conn, &tag, 4).await;
    let mut second = new_tournament(&tag, fx.game_id, fx.type_id, 4);
    second.tournament_name = format!("{tag} Invitational");
    second.total_players = 24;
    tournaments::create(&mut conn, &second).await.unwrap();

    let filter = Filter::Where(TournamentPredicate::GameId(Cmp::Eq(fx.game_id)));
    let row = tournaments::aggregate(
        &mut conn,
        &filter,
        &AggregateSelection {
            count: true,
            avg: vec![TournamentField::TotalPlayers],
            sum: vec![TournamentField::TotalPlayers],
            min: vec![TournamentField::TotalPlayers],
            max: vec![TournamentField::TotalPlayers],
        },
    )
    .await
    .unwrap();
    assert_eq!(row.count, Some(2));
    assert_eq!(row.sum[0].1, Some(40));
    assert_eq!(row.min[0].1, Some(16));
    assert_eq!(row.max[0].1, Some(24));

    // Text fields are rejected before touching the database.
    let invalid = tournaments::aggregate(
        &mut conn,
        &filter,
        &AggregateSelection {
            avg: vec![TournamentField::Format],
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(invalid, StoreError::Validation(_)));

    let groups = tournaments::group_by(
        &mut conn,
        &GroupQuery::new(vec![TournamentField::Format])
            .aggregate(Aggregate::Sum(TournamentField::TotalPlayers))
            .having(Having {
                target: HavingTarget::Aggregate(Aggregate::Count),
                op: CmpOp::Gte,
                value: HavingValue::Int(2),
            }),
    )
    .await
    .unwrap();
    let ours = groups
        .iter()
        .find(|g| g["format"] == format!("fmt-{tag}"))
        .expect("grouped row for the fixture format");
    assert_eq!(ours["count"], 2);
    assert_eq!(ours["sum_total_players"], 40);
}

#[tokio::test]
#[ignore]
async fn update_many_and_delete_many_respect_filters() {
    let db = setup();
    let mut conn = db.conn().await.unwrap();
    let tag = tag();

    let fx = tournament_fixture(&mut conn, &tag, 4).await;
    for n in 0..3 {
        teams::create(
            &mut conn,
            &NewTeam {
                team_name: format!("{tag}-m-{n}"),
                tournament_id: fx.tournament_id,
            },
        )
        .await
        .unwrap();
    }

    let in_tournament = Filter::Where(TeamPredicate::TournamentId(Cmp::Eq(fx.tournament_id)));
    let touched = teams::update_many(
        &mut conn,
        &in_tournament,
        &TeamChanges {
            team_name: Some(format!("{tag}-renamed")),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(touched, 3);

    let removed = teams::delete_many(&mut conn, &in_tournament).await.unwrap();
    assert_eq!(removed, 3);
    assert_eq!(teams::count(&mut conn, &in_tournament).await.unwrap(), 0);
}
