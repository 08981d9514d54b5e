//! Database schema.

/// Full schema, applied idempotently at open.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS system_stats (
    id              INTEGER PRIMARY KEY CHECK (id = 1),
    posts_processed INTEGER NOT NULL DEFAULT 0,
    claims_verified INTEGER NOT NULL DEFAULT 0,
    total_score     INTEGER NOT NULL DEFAULT 0,
    average_score   REAL    NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS nostr_events (
    event_id   TEXT PRIMARY KEY,
    pubkey     TEXT NOT NULL,
    content    TEXT NOT NULL,
    kind       INTEGER NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS verification_results (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    event_id            TEXT NOT NULL UNIQUE,
    content             TEXT NOT NULL,
    overall_score       INTEGER NOT NULL,
    claim_count         INTEGER NOT NULL,
    processing_method   TEXT NOT NULL,
    processing_time     INTEGER NOT NULL,
    cache_hits          INTEGER NOT NULL,
    verification_errors INTEGER NOT NULL,
    created_at          INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_results_created_at
    ON verification_results (created_at DESC);

CREATE TABLE IF NOT EXISTS claims (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    result_id     INTEGER NOT NULL REFERENCES verification_results(id),
    text          TEXT NOT NULL,
    credibility   INTEGER NOT NULL,
    confidence    TEXT NOT NULL,
    source_count  INTEGER NOT NULL,
    has_error     INTEGER NOT NULL DEFAULT 0,
    error_message TEXT
);

CREATE INDEX IF NOT EXISTS idx_claims_result ON claims (result_id);

CREATE TABLE IF NOT EXISTS sources (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    claim_id INTEGER NOT NULL REFERENCES claims(id),
    title    TEXT NOT NULL,
    source   TEXT NOT NULL,
    url      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sources_claim ON sources (claim_id);

CREATE TABLE IF NOT EXISTS claim_cache (
    claim_hash   TEXT PRIMARY KEY,
    credibility  INTEGER NOT NULL,
    confidence   TEXT NOT NULL,
    source_count INTEGER NOT NULL,
    last_used    INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_claim_cache_last_used ON claim_cache (last_used);
";
