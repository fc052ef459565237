//! Resolves a CRM lead's `assigned_user_id` onto a `(team, agent)` pair for
//! `Match` attribution. Shared by the
//! Matcher and the Review Resolver so the lookup isn't duplicated.

use leadflow_db::matches::Attribution;
use sqlx::PgPool;
use uuid::Uuid;

/// Looks up the `Agent` mirrored for `assigned_user_id`, if any, and
/// returns its team. `assigned_user_id` being absent, or not matching any
/// known agent, leaves attribution unset rather than failing the match.
pub async fn resolve(
    pool: &PgPool,
    tenant_id: Uuid,
    assigned_user_id: Option<&str>,
) -> sqlx::Result<Attribution> {
    let Some(fub_user_id) = assigned_user_id else {
        return Ok(Attribution::default());
    };

    match leadflow_db::agents_teams::find_by_fub_user_id(pool, tenant_id, fub_user_id).await? {
        Some(agent) => Ok(Attribution {
            team_id: agent.team_id,
            agent_id: Some(agent.id),
        }),
        None => Ok(Attribution::default()),
    }
}
