//! Prometheus metrics for worker observability.

use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use std::sync::Arc;

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct StageLabel(pub String);

impl prometheus_client::encoding::EncodeLabelSet for StageLabel {
    fn encode(
        &self,
        mut encoder: prometheus_client::encoding::LabelSetEncoder,
    ) -> Result<(), std::fmt::Error> {
        use prometheus_client::encoding::EncodeLabel;
        ("stage", self.0.as_str()).encode(encoder.encode_label())?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct WorkerMetrics {
    pub items_claimed: Family<StageLabel, Counter>,
    pub items_failed: Family<StageLabel, Counter>,
    pub active_batches: Gauge,
    pub embedding_tasks_pending: Gauge,
    pub embedding_tasks_failed: Gauge,
    pub reaper_reclaimed: Counter,
    pub reaper_failed: Counter,
    registry: Arc<Registry>,
}

impl WorkerMetrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let items_claimed = Family::<StageLabel, Counter>::default();
        registry.register(
            "leadflow_worker_items_claimed_total",
            "Items claimed by a stage handler",
            items_claimed.clone(),
        );

        let items_failed = Family::<StageLabel, Counter>::default();
        registry.register(
            "leadflow_worker_items_failed_total",
            "Items a stage handler could not process",
            items_failed.clone(),
        );

        let active_batches = Gauge::default();
        registry.register(
            "leadflow_worker_active_batches",
            "Ingestion batches currently mid-pipeline",
            active_batches.clone(),
        );

        let embedding_tasks_pending = Gauge::default();
        registry.register(
            "leadflow_embedding_tasks_pending",
            "Embedding tasks waiting to be claimed",
            embedding_tasks_pending.clone(),
        );

        let embedding_tasks_failed = Gauge::default();
        registry.register(
            "leadflow_embedding_tasks_failed",
            "Embedding tasks that exhausted their attempts",
            embedding_tasks_failed.clone(),
        );

        let reaper_reclaimed = Counter::default();
        registry.register(
            "leadflow_reaper_reclaimed_total",
            "Items reclaimed from a stuck claimed/processing state",
            reaper_reclaimed.clone(),
        );

        let reaper_failed = Counter::default();
        registry.register(
            "leadflow_reaper_failed_total",
            "Items permanently failed by the reaper after exhausting attempts",
            reaper_failed.clone(),
        );

        Self {
            items_claimed,
            items_failed,
            active_batches,
            embedding_tasks_pending,
            embedding_tasks_failed,
            reaper_reclaimed,
            reaper_failed,
            registry: Arc::new(registry),
        }
    }

    pub fn encode(&self) -> String {
        let mut buf = String::new();
        encode(&mut buf, &self.registry).unwrap();
        buf
    }
}

impl Default for WorkerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_creates_all_metrics() {
        let metrics = WorkerMetrics::new();
        let output = metrics.encode();

        assert!(output.contains("leadflow_worker_items_claimed_total"));
        assert!(output.contains("leadflow_worker_active_batches"));
        assert!(output.contains("leadflow_embedding_tasks_pending"));
        assert!(output.contains("leadflow_reaper_reclaimed_total"));
    }

    #[test]
    fn encode_produces_valid_prometheus_text() {
        let metrics = WorkerMetrics::new();
        let output = metrics.encode();

        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
        assert!(output.contains("# TYPE leadflow_worker_active_batches gauge"));
        assert!(output.contains("# TYPE leadflow_reaper_reclaimed_total counter"));
    }

    #[test]
    fn gauge_set_reflected_in_encode() {
        let metrics = WorkerMetrics::new();
        metrics.embedding_tasks_pending.set(12);

        let output = metrics.encode();
        assert!(output.contains("leadflow_embedding_tasks_pending 12"));
    }

    #[test]
    fn family_counter_with_labels() {
        let metrics = WorkerMetrics::new();
        metrics
            .items_claimed
            .get_or_create(&StageLabel("matcher".to_string()))
            .inc();
        metrics
            .items_claimed
            .get_or_create(&StageLabel("embedder".to_string()))
            .inc();
        metrics
            .items_claimed
            .get_or_create(&StageLabel("embedder".to_string()))
            .inc();

        let output = metrics.encode();
        assert!(output.contains("stage=\"matcher\""));
        assert!(output.contains("stage=\"embedder\""));
    }
}
