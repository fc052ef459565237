//! `LeadSource` rows - the CSV recipe for one configured feed.

use leadflow_core::model::{CsvConfig, FieldMapping, LeadSource, ValidationRules};
use sqlx::types::Json;
use sqlx::FromRow;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
struct LeadSourceRow {
    id: Uuid,
    tenant_id: Uuid,
    slug: String,
    display_name: String,
    csv_config: Json<CsvConfig>,
    field_mapping: Json<FieldMapping>,
    validation_rules: Json<ValidationRules>,
}

impl From<LeadSourceRow> for LeadSource {
    fn from(row: LeadSourceRow) -> Self {
        LeadSource {
            id: row.id,
            tenant_id: row.tenant_id,
            slug: row.slug,
            display_name: row.display_name,
            csv_config: row.csv_config.0,
            field_mapping: row.field_mapping.0,
            validation_rules: row.validation_rules.0,
        }
    }
}

const SELECT_COLUMNS: &str =
    "id, tenant_id, slug, display_name, csv_config, field_mapping, validation_rules";

pub async fn create(pool: &PgPool, source: &LeadSource) -> sqlx::Result<LeadSource> {
    let row = sqlx::query_as::<_, LeadSourceRow>(&format!(
        "INSERT INTO lead_sources (id, tenant_id, slug, display_name, csv_config, field_mapping, validation_rules)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING {SELECT_COLUMNS}"
    ))
    .bind(source.id)
    .bind(source.tenant_id)
    .bind(&source.slug)
    .bind(&source.display_name)
    .bind(Json(&source.csv_config))
    .bind(Json(&source.field_mapping))
    .bind(Json(&source.validation_rules))
    .fetch_one(pool)
    .await?;
    Ok(row.into())
}

pub async fn get(pool: &PgPool, id: Uuid) -> sqlx::Result<Option<LeadSource>> {
    let row = sqlx::query_as::<_, LeadSourceRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM lead_sources WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Into::into))
}

pub async fn get_by_slug(pool: &PgPool, tenant_id: Uuid, slug: &str) -> sqlx::Result<Option<LeadSource>> {
    let row = sqlx::query_as::<_, LeadSourceRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM lead_sources WHERE tenant_id = $1 AND slug = $2"
    ))
    .bind(tenant_id)
    .bind(slug)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Into::into))
}

pub async fn list_for_tenant(pool: &PgPool, tenant_id: Uuid) -> sqlx::Result<Vec<LeadSource>> {
    let rows = sqlx::query_as::<_, LeadSourceRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM lead_sources WHERE tenant_id = $1 ORDER BY display_name"
    ))
    .bind(tenant_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}
