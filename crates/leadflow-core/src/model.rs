//! Tenant-scoped domain entities shared across the pipeline crates.
//!
//! These mirror the tables in `leadflow-db`'s migrations 1:1. They live here
//! (rather than in `leadflow-db`) so that `leadflow-core`'s pure functions
//! can be expressed directly in terms of them without a dependency on sqlx.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A 1536-dimensional embedding vector.
///
/// Stored as a Postgres `double precision[]` rather than a `vector` column
/// so the schema doesn't hard-depend on the `pgvector` extension being
/// installed; swapping the column type later is a migration-only change.
/// `f64` (not `f32`) because sqlx maps `Vec<f64>` to `double precision[]` -
/// matching the column's actual element type is what lets both directions
/// of the row mapping decode/encode correctly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding(pub Vec<f64>);

impl Embedding {
    pub const DIMENSIONS: usize = 1536;
}

/// CSV dialect and date-parsing configuration for one `LeadSource`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvConfig {
    pub delimiter: char,
    pub has_header: bool,
    pub date_format: String,
    #[serde(default)]
    pub skip_rows: usize,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            has_header: true,
            date_format: "%Y-%m-%d".to_string(),
            skip_rows: 0,
        }
    }
}

/// `target_field -> ordered list of candidate CSV column names`.
pub type FieldMapping = std::collections::BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ValidationRules {
    pub required_fields: Vec<String>,
    pub email_regex: Option<String>,
}

/// A configured CSV feed (Zillow, Realtor.com, OpCity, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadSource {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub slug: String,
    pub display_name: String,
    pub csv_config: CsvConfig,
    pub field_mapping: FieldMapping,
    pub validation_rules: ValidationRules,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    Processing,
    Parsed,
    Transforming,
    Completed,
    Failed,
    Partial,
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Processing => "processing",
            BatchStatus::Parsed => "parsed",
            BatchStatus::Transforming => "transforming",
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
            BatchStatus::Partial => "partial",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for BatchStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "parsed" => Ok(Self::Parsed),
            "transforming" => Ok(Self::Transforming),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "partial" => Ok(Self::Partial),
            other => Err(format!("unknown batch status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchCounters {
    pub total: i64,
    pub parsed: i64,
    pub valid: i64,
    pub duplicate: i64,
    pub error: i64,
}

/// One received CSV and its processing state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub lead_source_id: Uuid,
    pub file_ref: String,
    pub file_hash: String,
    pub received_at: DateTime<Utc>,
    pub status: BatchStatus,
    pub counters: BatchCounters,
    pub log: Vec<Value>,
    pub errors: Vec<Value>,
}

/// One CSV row, as originally received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRow {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub row_number: i64,
    pub raw_data: std::collections::BTreeMap<String, String>,
    pub is_valid: bool,
    pub validation_errors: Vec<String>,
    pub is_duplicate: bool,
    pub duplicate_of: Option<Uuid>,
    pub canonical_lead_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    Matched,
    Unmatched,
    Multiple,
    Review,
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Matched => "matched",
            MatchStatus::Unmatched => "unmatched",
            MatchStatus::Multiple => "multiple",
            MatchStatus::Review => "review",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for MatchStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "matched" => Ok(Self::Matched),
            "unmatched" => Ok(Self::Unmatched),
            "multiple" => Ok(Self::Multiple),
            "review" => Ok(Self::Review),
            other => Err(format!("unknown match status: {other}")),
        }
    }
}

/// A normalized external lead, derived from one `RawRow`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalLead {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub lead_source_id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub email_normalized: Option<String>,
    pub phone: Option<String>,
    pub phone_normalized: Option<String>,
    pub address: Option<String>,
    pub address_normalized: Option<String>,
    pub lead_type: Option<String>,
    pub source_record_id: Option<String>,
    pub source_created_at: Option<DateTime<Utc>>,
    pub match_status: MatchStatus,
    pub match_confidence: Option<f64>,
    pub embedding: Option<Embedding>,
    pub embedded_at: Option<DateTime<Utc>>,
    pub raw_data: std::collections::BTreeMap<String, String>,
}

/// A mirrored CRM person (Follow Up Boss and similar).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmLead {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub crm_connection_id: Uuid,
    pub external_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub email_normalized: Option<String>,
    pub phone: Option<String>,
    pub phone_normalized: Option<String>,
    pub address: Option<String>,
    pub address_normalized: Option<String>,
    pub assigned_user_id: Option<String>,
    pub assigned_user_name: Option<String>,
    pub stage: Option<String>,
    pub source: Option<String>,
    pub tags: Vec<String>,
    pub sync_hash: String,
    pub embedding: Option<Embedding>,
    pub last_synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedBy {
    System,
    Ai,
    Manual,
}

impl std::fmt::Display for MatchedBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MatchedBy::System => "system",
            MatchedBy::Ai => "ai",
            MatchedBy::Manual => "manual",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRecordStatus {
    Active,
    Disputed,
    Invalidated,
}

/// A committed attribution between a canonical lead and a CRM lead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: Uuid,
    pub canonical_lead_id: Uuid,
    pub crm_lead_id: Uuid,
    pub match_type: String,
    pub confidence: f64,
    pub match_details: Value,
    pub matched_by: MatchedBy,
    pub matched_by_user_id: Option<Uuid>,
    pub attributed_team_id: Option<Uuid>,
    pub attributed_agent_id: Option<Uuid>,
    pub status: MatchRecordStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

/// A match awaiting human decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub id: Uuid,
    pub canonical_lead_id: Uuid,
    pub crm_lead_id: Uuid,
    pub confidence_score: f64,
    pub match_reasons: Value,
    pub status: CandidateStatus,
    pub expires_at: DateTime<Utc>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub lead_match_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineageOperation {
    Create,
    Update,
    Merge,
    Split,
    Derive,
}

impl std::fmt::Display for LineageOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LineageOperation::Create => "create",
            LineageOperation::Update => "update",
            LineageOperation::Merge => "merge",
            LineageOperation::Split => "split",
            LineageOperation::Derive => "derive",
        };
        write!(f, "{s}")
    }
}

/// An append-only audit row describing one `(source) -> (target)` transform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineageEntry {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub source_table: String,
    pub source_id: Uuid,
    pub target_table: String,
    pub target_id: Uuid,
    pub operation: LineageOperation,
    pub transformation_type: String,
    pub performed_by: String,
    pub details: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingTaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// A unit of work for the embedding queue worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingTask {
    pub id: Uuid,
    pub table_name: String,
    pub record_id: Uuid,
    pub text_to_embed: String,
    pub status: EmbeddingTaskStatus,
    pub attempts: i32,
    pub last_error: Option<String>,
}

/// An agent mirrored from the CRM, used to resolve match attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub fub_user_id: String,
    pub display_name: String,
    pub email: Option<String>,
    pub team_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
}

/// One configured CRM credential set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmConnection {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub base_url: String,
    pub api_key: String,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_sync_status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncType {
    Full,
    Incremental,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Running,
    Completed,
    CompletedWithErrors,
    Failed,
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SyncStatus::Running => "running",
            SyncStatus::Completed => "completed",
            SyncStatus::CompletedWithErrors => "completed_with_errors",
            SyncStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// One CRM Puller run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncLog {
    pub id: Uuid,
    pub crm_connection_id: Uuid,
    pub sync_type: SyncType,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: SyncStatus,
    pub fetched: i64,
    pub created: i64,
    pub updated: i64,
    pub errors: Vec<Value>,
}

/// Bound applied to `SyncLog::errors` so one run never stores an
/// unbounded error list.
pub const MAX_SYNC_LOG_ERRORS: usize = 100;
