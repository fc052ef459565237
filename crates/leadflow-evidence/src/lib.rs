//! The audit trail: lineage entries describing one transformation
//! step, and CRM sync-log records describing one CRM Puller run.
//!
//! This crate is a thin recorder layer over `leadflow-db`'s `lineage` and
//! `sync_logs` repositories - it exists so pipeline stages call one
//! intention-revealing method (`record_create`, `start_sync`) instead of
//! assembling `NewLineageEntry`/`SyncLog` structs inline at every call
//! site.

use chrono::{DateTime, Utc};
use leadflow_core::model::{LineageEntry, LineageOperation, SyncLog, SyncStatus, SyncType};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

/// Records lineage entries on behalf of a pipeline stage.
#[derive(Debug, Clone)]
pub struct LineageRecorder {
    pool: PgPool,
    performed_by: &'static str,
}

impl LineageRecorder {
    /// `performed_by` identifies the stage writing entries through this
    /// recorder (`"transformer"`, `"matcher"`, ...), not the tenant user.
    pub fn new(pool: PgPool, performed_by: &'static str) -> Self {
        Self { pool, performed_by }
    }

    /// Records a fresh target row created from its source - exactly one of
    /// these per `(source_table, source_id)` is expected downstream, so the
    /// operation is `create`, not `derive`.
    pub async fn record_create(
        &self,
        tenant_id: Uuid,
        source_table: &'static str,
        source_id: Uuid,
        target_table: &'static str,
        target_id: Uuid,
        transformation_type: impl Into<String>,
        details: Value,
    ) -> sqlx::Result<LineageEntry> {
        self.append(
            tenant_id,
            source_table,
            source_id,
            target_table,
            target_id,
            LineageOperation::Create,
            transformation_type,
            details,
        )
        .await
    }

    /// Records a match or review decision mutating an existing row in
    /// place.
    pub async fn record_update(
        &self,
        tenant_id: Uuid,
        source_table: &'static str,
        source_id: Uuid,
        target_table: &'static str,
        target_id: Uuid,
        transformation_type: impl Into<String>,
        details: Value,
    ) -> sqlx::Result<LineageEntry> {
        self.append(
            tenant_id,
            source_table,
            source_id,
            target_table,
            target_id,
            LineageOperation::Update,
            transformation_type,
            details,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn append(
        &self,
        tenant_id: Uuid,
        source_table: &'static str,
        source_id: Uuid,
        target_table: &'static str,
        target_id: Uuid,
        operation: LineageOperation,
        transformation_type: impl Into<String>,
        details: Value,
    ) -> sqlx::Result<LineageEntry> {
        leadflow_db::lineage::append(
            &self.pool,
            &leadflow_db::lineage::NewLineageEntry {
                tenant_id,
                source_table,
                source_id,
                target_table,
                target_id,
                operation,
                transformation_type: transformation_type.into(),
                performed_by: self.performed_by.to_string(),
                details,
            },
        )
        .await
    }

    pub async fn history_for(
        &self,
        target_table: &str,
        target_id: Uuid,
    ) -> sqlx::Result<Vec<LineageEntry>> {
        leadflow_db::lineage::for_target(&self.pool, target_table, target_id).await
    }
}

/// Bound applied to `SyncLog::errors` - re-exported so callers assembling
/// an error list don't need a direct `leadflow_core` dependency just for
/// this constant.
pub const MAX_SYNC_LOG_ERRORS: usize = leadflow_core::model::MAX_SYNC_LOG_ERRORS;

/// A `SyncLog` run in progress, returned by [`SyncLogRecorder::start`] and
/// closed by [`SyncLogRunner::complete`].
pub struct SyncLogRunner {
    pool: PgPool,
    log: SyncLog,
}

impl SyncLogRunner {
    pub fn id(&self) -> Uuid {
        self.log.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.log.started_at
    }

    /// Closes the run, truncating `errors` to
    /// [`MAX_SYNC_LOG_ERRORS`] if the caller collected more than that.
    pub async fn complete(
        self,
        status: SyncStatus,
        fetched: i64,
        created: i64,
        updated: i64,
        mut errors: Vec<Value>,
    ) -> sqlx::Result<SyncLog> {
        if errors.len() > MAX_SYNC_LOG_ERRORS {
            errors.truncate(MAX_SYNC_LOG_ERRORS);
        }
        leadflow_db::sync_logs::complete(
            &self.pool,
            self.log.id,
            status,
            fetched,
            created,
            updated,
            &errors,
        )
        .await
    }
}

/// Opens and queries `SyncLog` rows for one `CrmConnection`.
#[derive(Debug, Clone)]
pub struct SyncLogRecorder {
    pool: PgPool,
}

impl SyncLogRecorder {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a `running` log row. `started_at` is captured
    /// by the caller at the top of the run, not derived here, since it
    /// later becomes the connection's `last_sync_at` cursor on success.
    pub async fn start(
        &self,
        crm_connection_id: Uuid,
        sync_type: SyncType,
        started_at: DateTime<Utc>,
    ) -> sqlx::Result<SyncLogRunner> {
        let log = leadflow_db::sync_logs::start(&self.pool, crm_connection_id, sync_type, started_at)
            .await?;
        Ok(SyncLogRunner {
            pool: self.pool.clone(),
            log,
        })
    }

    pub async fn recent_for(
        &self,
        crm_connection_id: Uuid,
        limit: i64,
    ) -> sqlx::Result<Vec<SyncLog>> {
        leadflow_db::sync_logs::for_connection(&self.pool, crm_connection_id, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::MAX_SYNC_LOG_ERRORS;

    #[test]
    fn error_bound_matches_core_constant() {
        assert_eq!(MAX_SYNC_LOG_ERRORS, 100);
    }
}
