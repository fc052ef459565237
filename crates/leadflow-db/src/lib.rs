//! Leadflow DB - Postgres pool, migrations, and per-entity repositories.
//!
//! Every table in here is tenant-scoped and every claim-style query goes
//! through [`claim`]. Nothing in this crate knows about HTTP, CSV, or LLMs.

pub mod agents_teams;
pub mod batches;
pub mod canonical_leads;
pub mod claim;
pub mod crm_connections;
pub mod crm_leads;
pub mod embedding_tasks;
pub mod lead_sources;
pub mod lineage;
pub mod match_candidates;
pub mod matches;
pub mod pool;
pub mod raw_rows;
pub mod sync_logs;
pub mod tenants;

pub use pool::{connect_pool, run_migrations};
