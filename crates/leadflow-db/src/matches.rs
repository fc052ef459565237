//! `Match` rows - a committed attribution.

use leadflow_core::model::{Match, MatchRecordStatus, MatchedBy};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
struct MatchRow {
    id: Uuid,
    canonical_lead_id: Uuid,
    crm_lead_id: Uuid,
    match_type: String,
    confidence: f64,
    match_details: Json<Value>,
    matched_by: String,
    matched_by_user_id: Option<Uuid>,
    attributed_team_id: Option<Uuid>,
    attributed_agent_id: Option<Uuid>,
    status: String,
}

impl From<MatchRow> for Match {
    fn from(row: MatchRow) -> Self {
        Match {
            id: row.id,
            canonical_lead_id: row.canonical_lead_id,
            crm_lead_id: row.crm_lead_id,
            match_type: row.match_type,
            confidence: row.confidence,
            match_details: row.match_details.0,
            matched_by: match row.matched_by.as_str() {
                "ai" => MatchedBy::Ai,
                "manual" => MatchedBy::Manual,
                _ => MatchedBy::System,
            },
            matched_by_user_id: row.matched_by_user_id,
            attributed_team_id: row.attributed_team_id,
            attributed_agent_id: row.attributed_agent_id,
            status: match row.status.as_str() {
                "disputed" => MatchRecordStatus::Disputed,
                "invalidated" => MatchRecordStatus::Invalidated,
                _ => MatchRecordStatus::Active,
            },
        }
    }
}

const SELECT_COLUMNS: &str = "id, canonical_lead_id, crm_lead_id, match_type, confidence, \
     match_details, matched_by, matched_by_user_id, attributed_team_id, attributed_agent_id, status";

/// Attribution resolved for a new `Match` from the assigned CRM user.
#[derive(Debug, Clone, Default)]
pub struct Attribution {
    pub team_id: Option<Uuid>,
    pub agent_id: Option<Uuid>,
}

pub struct NewMatch {
    pub canonical_lead_id: Uuid,
    pub crm_lead_id: Uuid,
    pub match_type: String,
    pub confidence: f64,
    pub match_details: Value,
    pub matched_by: MatchedBy,
    pub matched_by_user_id: Option<Uuid>,
    pub attribution: Attribution,
}

/// Inserts a `Match`. Relies on the database's partial unique index
/// (one active match per canonical lead) to reject a caller that
/// races another auto-match or approval for the same lead.
pub async fn create(pool: &PgPool, m: &NewMatch) -> sqlx::Result<Match> {
    let row = sqlx::query_as::<_, MatchRow>(&format!(
        "INSERT INTO matches (
             canonical_lead_id, crm_lead_id, match_type, confidence, match_details,
             matched_by, matched_by_user_id, attributed_team_id, attributed_agent_id
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING {SELECT_COLUMNS}"
    ))
    .bind(m.canonical_lead_id)
    .bind(m.crm_lead_id)
    .bind(&m.match_type)
    .bind(m.confidence)
    .bind(Json(&m.match_details))
    .bind(m.matched_by.to_string())
    .bind(m.matched_by_user_id)
    .bind(m.attribution.team_id)
    .bind(m.attribution.agent_id)
    .fetch_one(pool)
    .await?;
    Ok(row.into())
}

pub async fn active_for_canonical(
    pool: &PgPool,
    canonical_lead_id: Uuid,
) -> sqlx::Result<Option<Match>> {
    let row = sqlx::query_as::<_, MatchRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM matches
         WHERE canonical_lead_id = $1 AND status = 'active'"
    ))
    .bind(canonical_lead_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Into::into))
}
