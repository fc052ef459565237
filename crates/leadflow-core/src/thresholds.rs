//! Module-level tiering constants. Never per-tenant, never mutated.

/// Confidence at or above this auto-attributes a `Match`.
pub const AUTO: f64 = 0.90;

/// Confidence in `[REVIEW_LOW, AUTO)` opens a `MatchCandidate`.
pub const REVIEW_LOW: f64 = 0.60;

/// Confidence below this is dropped entirely (not even a candidate).
pub const REJECT: f64 = 0.40;

/// Minimum trigram similarity for `address_fuzzy` to be considered a signal.
pub const ADDRESS_FUZZY_MIN: f64 = 0.60;

/// Confidence assigned to an `email_exact` signal.
pub const EMAIL_EXACT_CONFIDENCE: f64 = 1.00;

/// Confidence assigned to a `phone_exact` signal.
pub const PHONE_EXACT_CONFIDENCE: f64 = 0.95;

/// Default cap on candidates returned by the Scorer for one canonical lead.
pub const DEFAULT_MAX_CANDIDATES: usize = 5;

/// Default embedding worker batch size.
pub const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 50;

/// Maximum texts per single embedding provider request.
pub const MAX_EMBEDDING_REQUEST_SIZE: usize = 2048;

/// Default per-item retry budget, applied per item not per batch.
pub const DEFAULT_MAX_ATTEMPTS: i32 = 3;

/// CRM records are paged in batches of this size.
pub const CRM_PAGE_SIZE: u32 = 100;

/// Default lifetime of a freshly-opened `MatchCandidate` before the TTL
/// sweep expires it unreviewed.
pub const DEFAULT_CANDIDATE_TTL_DAYS: i64 = 14;
