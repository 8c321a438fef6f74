use log::info;
use scoped_futures::ScopedFutureExt;

use crate::models::team_member::{NewTeamMember, TeamMember};
use crate::query::{Cmp, Filter};
use crate::repository::database::{Database, TxOptions};
use crate::repository::error::{ConstraintKind, StoreError};
use crate::repository::team_members::{self, TeamMemberPredicate};
use crate::repository::{teams, tournaments};

/// Enrolls a user into a team, enforcing the tournament's team capacity.
/// The capacity check and the insert run in one transaction; a concurrent
/// join past the limit is prevented by running it at `RepeatableRead` or
/// stricter. The unique `(user_id, team_id)` constraint surfaces duplicate
/// joins as a `ConstraintViolation`.
pub async fn join_team(
    db: &Database,
    opts: TxOptions,
    user_id: i32,
    team_id: i32,
    role: String,
) -> Result<TeamMember, StoreError> {
    db.transaction(opts, |conn| {
        async move {
            let team = teams::find_by_id(conn, team_id)
                .await?
                .ok_or(StoreError::NotFound("Team"))?;
            let tournament = tournaments::find_by_id(conn, team.tournament_id)
                .await?
                .ok_or(StoreError::NotFound("Tournament"))?;

            let members = team_members::count(
                conn,
                &Filter::Where(TeamMemberPredicate::TeamId(Cmp::Eq(team_id))),
            )
            .await?;
            if members >= i64::from(tournament.players_per_team) {
                return Err(StoreError::ConstraintViolation {
                    kind: ConstraintKind::Check,
                    message: format!(
                        "team {team_id} is full ({} of {} players)",
                        members, tournament.players_per_team
                    ),
                });
            }

            let member = team_members::create(
                conn,
                &NewTeamMember {
                    role,
                    user_id,
                    team_id,
                },
            )
            .await?;
            info!("user {user_id} joined team {team_id}");
            Ok(member)
        }
        .scope_boxed()
    })
    .await
}
