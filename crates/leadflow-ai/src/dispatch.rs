//! Fixed function-dispatch surface for an out-of-scope
//! conversational front-end: a closed set of names, each resolving to one
//! typed reporting query. No arbitrary SQL is ever reachable from here.

use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::views;

const DEFAULT_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
struct TenantArgs {
    tenant_id: Uuid,
    #[serde(default)]
    limit: Option<i64>,
}

/// Resolves `name` against the fixed function list and runs it with
/// `args_json` (expected to at least carry `tenant_id`). An unknown name
/// is an error, never a fallback to raw SQL.
pub async fn dispatch(pool: &PgPool, name: &str, args_json: Value) -> anyhow::Result<Value> {
    let args: TenantArgs = serde_json::from_value(args_json)
        .map_err(|e| anyhow::anyhow!("invalid arguments for '{name}': {e}"))?;
    let limit = args.limit.unwrap_or(DEFAULT_LIMIT);

    let result = match name {
        "source_summary" => serde_json::to_value(views::source_summary(pool, args.tenant_id).await?)?,
        "team_summary" => serde_json::to_value(views::team_summary(pool, args.tenant_id).await?)?,
        "agent_summary" => serde_json::to_value(views::agent_summary(pool, args.tenant_id).await?)?,
        "ingestion_summary" => {
            serde_json::to_value(views::ingestion_summary(pool, args.tenant_id, limit).await?)?
        }
        "review_queue" => serde_json::to_value(views::review_queue(pool, args.tenant_id, limit).await?)?,
        other => anyhow::bail!("unknown function: {other}"),
    };

    Ok(result)
}

/// The fixed set of names [`dispatch`] recognizes, for a front-end to
/// advertise to its LLM as callable tools.
pub const FUNCTION_NAMES: &[&str] = &[
    "source_summary",
    "team_summary",
    "agent_summary",
    "ingestion_summary",
    "review_queue",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_function_name_is_rejected() {
        let pool = PgPool::connect_lazy("postgres://localhost/does-not-matter").unwrap();
        let err = dispatch(&pool, "drop_table", serde_json::json!({ "tenant_id": Uuid::nil() }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown function"));
    }

    #[tokio::test]
    async fn missing_tenant_id_is_rejected_before_any_query_runs() {
        let pool = PgPool::connect_lazy("postgres://localhost/does-not-matter").unwrap();
        let err = dispatch(&pool, "source_summary", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid arguments"));
    }
}
