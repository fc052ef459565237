//! Tenant rows. There is no tenant-scoping logic here. Every other
//! repository takes a `tenant_id` and relies on the caller to have
//! authenticated it; this module only creates and looks tenants up.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct TenantRow {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

pub async fn create(pool: &PgPool, name: &str) -> sqlx::Result<TenantRow> {
    sqlx::query_as::<_, TenantRow>(
        "INSERT INTO tenants (name) VALUES ($1) RETURNING id, name, created_at",
    )
    .bind(name)
    .fetch_one(pool)
    .await
}

pub async fn get(pool: &PgPool, id: Uuid) -> sqlx::Result<Option<TenantRow>> {
    sqlx::query_as::<_, TenantRow>("SELECT id, name, created_at FROM tenants WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list(pool: &PgPool) -> sqlx::Result<Vec<TenantRow>> {
    sqlx::query_as::<_, TenantRow>("SELECT id, name, created_at FROM tenants ORDER BY name")
        .fetch_all(pool)
        .await
}
