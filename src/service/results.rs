use chrono::Utc;
use log::info;
use scoped_futures::ScopedFutureExt;

use crate::models::game_match::{Match, MatchChanges};
use crate::models::tournament::TournamentChanges;
use crate::models::tournament_status::NewTournamentStatus;
use crate::repository::database::{Database, TxOptions};
use crate::repository::error::StoreError;
use crate::repository::{matches, tournament_statuses, tournaments};

/// Outcome of one match: both scores and the winning team, if any.
#[derive(Debug, Clone, Copy)]
pub struct MatchResult {
    pub team1_score: i32,
    pub team2_score: i32,
    pub winner_id: Option<i32>,
}

/// Records the result of a match atomically: the match row gets its scores,
/// winner and a `completed` status, the owning tournament's `updated_at` is
/// refreshed, and when `tournament_status` is given a new status-history row
/// is appended. A winner outside the two participating teams is rejected
/// before any write.
pub async fn record_match_result(
    db: &Database,
    opts: TxOptions,
    match_id: i32,
    result: MatchResult,
    tournament_status: Option<String>,
) -> Result<Match, StoreError> {
    db.transaction(opts, |conn| {
        async move {
            let row = matches::find_by_id(conn, match_id)
                .await?
                .ok_or(StoreError::NotFound("Match"))?;

            if let Some(winner) = result.winner_id {
                if winner != row.team1_id && winner != row.team2_id {
                    return Err(StoreError::Validation(format!(
                        "winner {winner} is not one of teams {} and {}",
                        row.team1_id, row.team2_id
                    )));
                }
            }

            let now = Utc::now().naive_utc();
            let updated = matches::update(
                conn,
                match_id,
                &MatchChanges {
                    team1_score: Some(Some(result.team1_score)),
                    team2_score: Some(Some(result.team2_score)),
                    winner_id: Some(result.winner_id),
                    match_date: None,
                    status: Some("completed".to_string()),
                },
            )
            .await?;

            tournaments::update(
                conn,
                row.tournament_id,
                &TournamentChanges {
                    updated_at: Some(now),
                    ..Default::default()
                },
            )
            .await?;

            if let Some(status) = tournament_status {
                tournament_statuses::create(
                    conn,
                    &NewTournamentStatus {
                        status,
                        updated_at: now,
                        tournament_id: row.tournament_id,
                    },
                )
                .await?;
            }

            info!(
                "recorded result {}-{} for match {match_id}",
                result.team1_score, result.team2_score
            );
            Ok(updated)
        }
        .scope_boxed()
    })
    .await
}
