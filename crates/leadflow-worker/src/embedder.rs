//! The Embedding worker: claims pending `embedding_tasks`, calls the
//! embedding provider in one batch request, and writes the result back onto
//! whichever table the task names.

use leadflow_connectors::EmbeddingClient;
use leadflow_core::model::EmbeddingTask;
use sqlx::PgPool;

const CANONICAL_LEADS_TABLE: &str = "canonical_leads";
const CRM_LEADS_TABLE: &str = "crm_leads";

#[derive(Debug, Default)]
pub struct EmbedStats {
    pub embedded: usize,
    pub failed: usize,
}

/// Claims up to `limit` pending tasks and embeds them in one request.
/// A whole-batch provider failure reverts every claimed task rather than
/// embedding one text at a time - the provider is paid for in requests,
/// not per-text calls.
pub async fn run_once(
    pool: &PgPool,
    client: &EmbeddingClient,
    limit: i64,
    max_attempts: i32,
) -> anyhow::Result<EmbedStats> {
    let tasks = leadflow_db::embedding_tasks::claim_batch(pool, limit, max_attempts).await?;
    if tasks.is_empty() {
        return Ok(EmbedStats::default());
    }

    let texts: Vec<String> = tasks.iter().map(|t| t.text_to_embed.clone()).collect();
    let mut stats = EmbedStats::default();

    match client.embed_batch(&texts).await {
        Ok(embeddings) => {
            for (task, embedding) in tasks.iter().zip(embeddings.into_iter()) {
                match write_embedding(pool, task, &embedding).await {
                    Ok(()) => {
                        leadflow_db::embedding_tasks::mark_completed(pool, task.id).await?;
                        stats.embedded += 1;
                    }
                    Err(e) => {
                        tracing::warn!(task_id = %task.id, error = %e, "embedding write failed");
                        leadflow_db::embedding_tasks::revert_with_error(
                            pool,
                            task.id,
                            &e.to_string(),
                            max_attempts,
                        )
                        .await?;
                        stats.failed += 1;
                    }
                }
            }
        }
        Err(e) => {
            tracing::error!(error = %e, batch_size = tasks.len(), "embedding provider call failed");
            for task in &tasks {
                leadflow_db::embedding_tasks::revert_with_error(
                    pool,
                    task.id,
                    &e.to_string(),
                    max_attempts,
                )
                .await?;
            }
            stats.failed = tasks.len();
        }
    }

    Ok(stats)
}

async fn write_embedding(pool: &PgPool, task: &EmbeddingTask, embedding: &[f32]) -> anyhow::Result<()> {
    // The provider responds in f32; the column is `double precision[]`, so
    // widen here rather than at the storage layer.
    let embedding: Vec<f64> = embedding.iter().map(|&v| v as f64).collect();
    match task.table_name.as_str() {
        CANONICAL_LEADS_TABLE => {
            leadflow_db::canonical_leads::set_embedding(
                pool,
                task.record_id,
                &embedding,
                &task.text_to_embed,
            )
            .await?;
        }
        CRM_LEADS_TABLE => {
            leadflow_db::crm_leads::set_embedding(pool, task.record_id, &embedding, &task.text_to_embed)
                .await?;
        }
        other => {
            anyhow::bail!("embedding task {} names unknown table {other}", task.id);
        }
    }
    Ok(())
}
