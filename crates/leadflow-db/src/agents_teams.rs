//! `Agent` and `Team` rows, used to resolve match attribution.

use leadflow_core::model::{Agent, Team};
use sqlx::FromRow;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
struct AgentRow {
    id: Uuid,
    tenant_id: Uuid,
    fub_user_id: String,
    display_name: String,
    email: Option<String>,
    team_id: Option<Uuid>,
}

impl From<AgentRow> for Agent {
    fn from(row: AgentRow) -> Self {
        Agent {
            id: row.id,
            tenant_id: row.tenant_id,
            fub_user_id: row.fub_user_id,
            display_name: row.display_name,
            email: row.email,
            team_id: row.team_id,
        }
    }
}

/// Resolves the CRM's `assigned_user_id` onto our mirrored `Agent` (and,
/// through it, the team) for one tenant. `None` when the CRM user has no
/// corresponding agent row - attribution is then left unset.
pub async fn find_by_fub_user_id(
    pool: &PgPool,
    tenant_id: Uuid,
    fub_user_id: &str,
) -> sqlx::Result<Option<Agent>> {
    let row = sqlx::query_as::<_, AgentRow>(
        "SELECT id, tenant_id, fub_user_id, display_name, email, team_id
         FROM agents WHERE tenant_id = $1 AND fub_user_id = $2",
    )
    .bind(tenant_id)
    .bind(fub_user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Into::into))
}

pub async fn upsert(
    pool: &PgPool,
    tenant_id: Uuid,
    fub_user_id: &str,
    display_name: &str,
    email: Option<&str>,
) -> sqlx::Result<Agent> {
    let row = sqlx::query_as::<_, AgentRow>(
        "INSERT INTO agents (tenant_id, fub_user_id, display_name, email)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (tenant_id, fub_user_id) DO UPDATE SET
             display_name = EXCLUDED.display_name, email = EXCLUDED.email
         RETURNING id, tenant_id, fub_user_id, display_name, email, team_id",
    )
    .bind(tenant_id)
    .bind(fub_user_id)
    .bind(display_name)
    .bind(email)
    .fetch_one(pool)
    .await?;
    Ok(row.into())
}

#[derive(Debug, Clone, FromRow)]
struct TeamRow {
    id: Uuid,
    tenant_id: Uuid,
    name: String,
}

impl From<TeamRow> for Team {
    fn from(row: TeamRow) -> Self {
        Team {
            id: row.id,
            tenant_id: row.tenant_id,
            name: row.name,
        }
    }
}

pub async fn get_team(pool: &PgPool, id: Uuid) -> sqlx::Result<Option<Team>> {
    let row = sqlx::query_as::<_, TeamRow>("SELECT id, tenant_id, name FROM teams WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(Into::into))
}

pub async fn create_team(pool: &PgPool, tenant_id: Uuid, name: &str) -> sqlx::Result<Team> {
    let row = sqlx::query_as::<_, TeamRow>(
        "INSERT INTO teams (tenant_id, name) VALUES ($1, $2)
         ON CONFLICT (tenant_id, name) DO UPDATE SET name = EXCLUDED.name
         RETURNING id, tenant_id, name",
    )
    .bind(tenant_id)
    .bind(name)
    .fetch_one(pool)
    .await?;
    Ok(row.into())
}
