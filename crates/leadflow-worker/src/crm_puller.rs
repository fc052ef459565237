//! The CRM Puller: syncs every active `CrmConnection`'s `people`
//! into `crm_leads`, full or incremental depending on whether the
//! connection has synced before.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use leadflow_connectors::crm_client::PersonPayload;
use leadflow_core::model::{CrmConnection, SyncStatus, SyncType};
use leadflow_db::crm_leads::{CrmLeadUpsert, UpsertOutcome};
use leadflow_evidence::SyncLogRecorder;
use serde_json::json;
use sqlx::PgPool;

use crate::sync_hash::{self, SyncHashInput};

const EMBEDDING_TABLE: &str = "crm_leads";

#[derive(Debug, Default)]
pub struct PullStats {
    pub connections_synced: usize,
    pub fetched: i64,
    pub created: i64,
    pub updated: i64,
}

/// Syncs every active connection in turn.
/// One connection's failure doesn't block the rest - it's recorded on that
/// connection's own `SyncLog` and the loop moves on.
pub async fn run_all(pool: &PgPool, force_full: bool) -> anyhow::Result<PullStats> {
    let connections = leadflow_db::crm_connections::list_active(pool).await?;
    let mut stats = PullStats::default();

    for connection in connections {
        match sync_connection(pool, &connection, force_full).await {
            Ok(result) => {
                stats.connections_synced += 1;
                stats.fetched += result.fetched;
                stats.created += result.created;
                stats.updated += result.updated;
            }
            Err(e) => {
                tracing::error!(
                    crm_connection_id = %connection.id,
                    error = %e,
                    "crm sync failed before a run could even open"
                );
            }
        }
    }

    Ok(stats)
}

/// Runs [`run_all`] on a fixed interval until `shutdown` flips. The puller
/// has no row to claim - a connection either gets synced on this tick or
/// waits for the next one - so it runs as a plain interval loop rather than
/// [`crate::claimer::run_stage_loop`].
pub async fn run_pull_loop(pool: PgPool, interval: Duration, shutdown: Arc<AtomicBool>) {
    tracing::info!("crm pull loop started");
    while !shutdown.load(Ordering::Relaxed) {
        match run_all(&pool, false).await {
            Ok(stats) if stats.connections_synced > 0 => {
                tracing::info!(
                    connections_synced = stats.connections_synced,
                    fetched = stats.fetched,
                    created = stats.created,
                    updated = stats.updated,
                    "crm pull pass complete"
                );
            }
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "crm pull pass failed"),
        }
        tokio::time::sleep(interval).await;
    }
    tracing::info!("crm pull loop stopped");
}

struct SyncResult {
    fetched: i64,
    created: i64,
    updated: i64,
}

/// Runs one connection's sync end to end.
pub async fn sync_connection(
    pool: &PgPool,
    connection: &CrmConnection,
    force_full: bool,
) -> anyhow::Result<SyncResult> {
    let sync_start = Utc::now();
    let sync_type = if force_full || connection.last_sync_at.is_none() {
        SyncType::Full
    } else {
        SyncType::Incremental
    };

    let log_recorder = SyncLogRecorder::new(pool.clone());
    let runner = log_recorder.start(connection.id, sync_type, sync_start).await?;

    let client = leadflow_connectors::CrmClient::new(&connection.base_url, &connection.api_key);

    if !client.verify_credentials().await? {
        let log = runner
            .complete(
                SyncStatus::Failed,
                0,
                0,
                0,
                vec![json!({ "error": "credential verification failed" })],
            )
            .await?;
        leadflow_db::crm_connections::record_sync_result(
            pool,
            connection.id,
            sync_start,
            &log.status.to_string(),
        )
        .await?;
        anyhow::bail!("crm connection {} failed credential verification", connection.id);
    }

    let users = client.list_users().await?;
    let user_names: HashMap<String, String> = users
        .iter()
        .map(|u| (u.id.to_string(), u.name.clone()))
        .collect();

    let updated_after = match sync_type {
        SyncType::Incremental => connection.last_sync_at,
        SyncType::Full => None,
    };
    let people = client.list_people(updated_after).await?;

    let fetched = people.len() as i64;
    let mut created = 0i64;
    let mut updated = 0i64;
    let mut errors: Vec<serde_json::Value> = Vec::new();

    for person in &people {
        match upsert_person(pool, connection, person, &user_names).await {
            Ok(UpsertOutcome::Inserted(lead)) => {
                created += 1;
                enqueue_embedding(pool, lead.id, &lead).await?;
            }
            Ok(UpsertOutcome::Updated(lead)) => {
                updated += 1;
                enqueue_embedding(pool, lead.id, &lead).await?;
            }
            Ok(UpsertOutcome::Unchanged(_)) => {}
            Err(e) => {
                tracing::warn!(crm_connection_id = %connection.id, person_id = person.id, error = %e, "person sync failed");
                if errors.len() < leadflow_evidence::MAX_SYNC_LOG_ERRORS {
                    errors.push(json!({ "person_id": person.id, "error": e.to_string() }));
                }
            }
        }
    }

    let status = if errors.is_empty() {
        SyncStatus::Completed
    } else {
        SyncStatus::CompletedWithErrors
    };

    let log = runner.complete(status, fetched, created, updated, errors).await?;
    leadflow_db::crm_connections::record_sync_result(
        pool,
        connection.id,
        sync_start,
        &log.status.to_string(),
    )
    .await?;

    Ok(SyncResult { fetched, created, updated })
}

async fn upsert_person(
    pool: &PgPool,
    connection: &CrmConnection,
    person: &PersonPayload,
    user_names: &HashMap<String, String>,
) -> anyhow::Result<UpsertOutcome> {
    let email = person.emails.first().map(|e| e.value.clone());
    let email_normalized = email
        .as_deref()
        .and_then(leadflow_core::normalize::normalize_email);
    let phone = person.phones.first().map(|p| p.value.clone());
    let phone_normalized = phone.as_deref().map(leadflow_core::normalize::normalize_phone);
    let address = person.addresses.first().map(joined_address);
    let address_normalized = address
        .as_deref()
        .and_then(leadflow_core::normalize::normalize_address);

    let assigned_user_id = person.assigned_user_id.map(|id| id.to_string());
    let assigned_user_name = assigned_user_id
        .as_ref()
        .and_then(|id| user_names.get(id).cloned());

    let sync_hash = sync_hash::compute(&SyncHashInput {
        email: email.as_deref(),
        phone: phone.as_deref(),
        first_name: person.first_name.as_deref(),
        last_name: person.last_name.as_deref(),
        stage: person.stage.as_deref(),
        assigned_user_id: assigned_user_id.as_deref(),
        updated_at: Some(&person.updated),
    });

    let upsert = CrmLeadUpsert {
        tenant_id: connection.tenant_id,
        crm_connection_id: connection.id,
        external_id: person.id.to_string(),
        first_name: person.first_name.clone(),
        last_name: person.last_name.clone(),
        email,
        email_normalized,
        phone,
        phone_normalized,
        address,
        address_normalized,
        assigned_user_id,
        assigned_user_name,
        stage: person.stage.clone(),
        source: person.source.clone(),
        tags: person.tags.clone(),
        sync_hash,
    };

    Ok(leadflow_db::crm_leads::upsert(pool, &upsert).await?)
}

fn joined_address(addr: &leadflow_connectors::crm_client::AddressEntry) -> String {
    [
        addr.street.as_deref(),
        addr.city.as_deref(),
        addr.state.as_deref(),
        addr.code.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
}

async fn enqueue_embedding(
    pool: &PgPool,
    record_id: uuid::Uuid,
    lead: &leadflow_core::model::CrmLead,
) -> anyhow::Result<()> {
    let text = [
        lead.first_name.as_deref(),
        lead.last_name.as_deref(),
        lead.email.as_deref(),
        lead.phone.as_deref(),
        lead.address.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ");

    leadflow_db::embedding_tasks::enqueue(pool, EMBEDDING_TABLE, record_id, &text).await?;
    Ok(())
}
