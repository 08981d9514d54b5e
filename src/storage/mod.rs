//! Durable storage for events, verification results, statistics and the
//! claim cache.
//!
//! Backed by an embedded SQLite database. The store is the persistence half
//! of the aggregation bridge: result writes are idempotent by event id and
//! update the single-row system statistics in the same transaction. Callers
//! on the hot path treat write failures as degradable; only `open` surfaces
//! hard errors.

mod schema;

use crate::error::{Error, Result};
use crate::event::NoteEvent;
use crate::extract::ExtractionMethod;
use crate::verify::scorer::Confidence;
use crate::verify::{ClaimVerification, ResultMetadata, SourceRef, VerificationResult};
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

/// Cumulative processing statistics, single row.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    /// Posts run through the pipeline.
    pub posts_processed: u64,
    /// Claims scored across all posts.
    pub claims_verified: u64,
    /// Sum of all aggregate scores.
    pub total_score: u64,
    /// `total_score / posts_processed`.
    pub average_score: f64,
}

/// A durable claim-cache row.
#[derive(Debug, Clone)]
pub struct CacheRow {
    /// Credibility score.
    pub credibility: u8,
    /// Confidence label.
    pub confidence: Confidence,
    /// Number of sources the cached verification saw.
    pub source_count: u32,
}

/// SQLite-backed store.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (creating if needed) the database at `path` and initialize the
    /// schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the schema cannot be
    /// applied.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(storage_err)?;
        let store = Self::from_connection(conn)?;
        info!("Database ready at {}", path.display());
        Ok(store)
    }

    /// Open an in-memory database. Intended for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be applied.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(storage_err)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(schema::SCHEMA).map_err(storage_err)?;
        conn.execute(
            "INSERT OR IGNORE INTO system_stats
             (id, posts_processed, claims_verified, total_score, average_score)
             VALUES (1, 0, 0, 0, 0)",
            [],
        )
        .map_err(storage_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Upsert an incoming note. Runs for every arrival, before any admission
    /// decision, so replays of the same event id are expected and benign.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    pub fn save_note(&self, note: &NoteEvent) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO nostr_events (event_id, pubkey, content, kind, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(event_id) DO UPDATE SET content = excluded.content",
            params![note.id, note.pubkey, note.content, note.kind, note.created_at],
        )
        .map_err(storage_err)?;
        Ok(())
    }

    /// Author public key of a stored note, if the note is known.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    pub fn note_author(&self, event_id: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT pubkey FROM nostr_events WHERE event_id = ?1",
            params![event_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(storage_err)
    }

    /// Persist a verification result, idempotently by event id.
    ///
    /// A result without an event id is assigned a synthetic `manual_*` id
    /// first. If a row for the id already exists, the existing record is
    /// returned unchanged and statistics are not touched. Otherwise the
    /// result and its claim/source children are inserted and the system
    /// statistics are updated in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    pub fn save_result(&self, result: &VerificationResult) -> Result<VerificationResult> {
        let event_id = result
            .event_id
            .clone()
            .unwrap_or_else(synthetic_manual_id);

        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(storage_err)?;

        if let Some(existing) = read_result(&tx, &event_id)? {
            debug!("Result for {event_id} already persisted, returning existing");
            tx.commit().map_err(storage_err)?;
            return Ok(existing);
        }

        tx.execute(
            "INSERT INTO verification_results
             (event_id, content, overall_score, claim_count, processing_method,
              processing_time, cache_hits, verification_errors, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                event_id,
                result.content,
                result.score,
                result.claims.len(),
                result.metadata.method.as_str(),
                result.metadata.processing_time,
                result.metadata.cache_hits,
                result.metadata.verification_errors,
                result.timestamp.timestamp(),
            ],
        )
        .map_err(storage_err)?;
        let result_id = tx.last_insert_rowid();

        for verification in &result.verification_results {
            tx.execute(
                "INSERT INTO claims
                 (result_id, text, credibility, confidence, source_count, has_error, error_message)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    result_id,
                    verification.claim,
                    verification.credibility,
                    verification.confidence.as_str(),
                    verification.sources.len(),
                    verification.error.is_some(),
                    verification.error,
                ],
            )
            .map_err(storage_err)?;
            let claim_id = tx.last_insert_rowid();

            for source in &verification.sources {
                tx.execute(
                    "INSERT INTO sources (claim_id, title, source, url) VALUES (?1, ?2, ?3, ?4)",
                    params![claim_id, source.title, source.source, source.url],
                )
                .map_err(storage_err)?;
            }
        }

        tx.execute(
            "UPDATE system_stats SET
               posts_processed = posts_processed + 1,
               claims_verified = claims_verified + ?1,
               total_score = total_score + ?2,
               average_score = CAST(total_score + ?2 AS REAL) / (posts_processed + 1)
             WHERE id = 1",
            params![result.claims.len(), result.score],
        )
        .map_err(storage_err)?;

        tx.commit().map_err(storage_err)?;

        let mut persisted = result.clone();
        persisted.event_id = Some(event_id);
        Ok(persisted)
    }

    /// Load one persisted result by event id.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    pub fn get_result(&self, event_id: &str) -> Result<Option<VerificationResult>> {
        let conn = self.conn.lock();
        read_result(&conn, event_id)
    }

    /// Load the most recent results, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    pub fn recent_results(&self, limit: usize) -> Result<Vec<VerificationResult>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT event_id FROM verification_results
                 ORDER BY created_at DESC, id DESC LIMIT ?1",
            )
            .map_err(storage_err)?;

        let ids: Vec<String> = stmt
            .query_map(params![limit], |row| row.get(0))
            .map_err(storage_err)?
            .collect::<std::result::Result<_, _>>()
            .map_err(storage_err)?;

        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(result) = read_result(&conn, &id)? {
                results.push(result);
            }
        }
        Ok(results)
    }

    /// Current system statistics.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    pub fn stats(&self) -> Result<SystemStats> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT posts_processed, claims_verified, total_score, average_score
             FROM system_stats WHERE id = 1",
            [],
            |row| {
                Ok(SystemStats {
                    posts_processed: row.get(0)?,
                    claims_verified: row.get(1)?,
                    total_score: row.get(2)?,
                    average_score: row.get(3)?,
                })
            },
        )
        .map_err(storage_err)
    }

    /// Look up a durable claim-cache row, refreshing its last-used stamp on
    /// hit.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    pub fn cache_get(&self, claim_hash: &str) -> Result<Option<CacheRow>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT credibility, confidence, source_count
                 FROM claim_cache WHERE claim_hash = ?1",
                params![claim_hash],
                |row| {
                    let confidence: String = row.get(1)?;
                    Ok(CacheRow {
                        credibility: row.get(0)?,
                        confidence: Confidence::from_label(&confidence),
                        source_count: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(storage_err)?;

        if row.is_some() {
            conn.execute(
                "UPDATE claim_cache SET last_used = ?1 WHERE claim_hash = ?2",
                params![Utc::now().timestamp(), claim_hash],
            )
            .map_err(storage_err)?;
        }

        Ok(row)
    }

    /// Upsert a durable claim-cache row.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    pub fn cache_put(
        &self,
        claim_hash: &str,
        credibility: u8,
        confidence: Confidence,
        source_count: u32,
    ) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO claim_cache (claim_hash, credibility, confidence, source_count, last_used)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(claim_hash) DO UPDATE SET
               credibility = excluded.credibility,
               confidence = excluded.confidence,
               source_count = excluded.source_count,
               last_used = excluded.last_used",
            params![
                claim_hash,
                credibility,
                confidence.as_str(),
                source_count,
                Utc::now().timestamp(),
            ],
        )
        .map_err(storage_err)?;
        Ok(())
    }

    /// Delete claim-cache rows unused for more than `max_age_days`. Returns
    /// the number of rows removed. Runs out of band, never on the request
    /// path.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    pub fn purge_stale_cache(&self, max_age_days: u32) -> Result<usize> {
        let cutoff = Utc::now().timestamp() - i64::from(max_age_days) * 86_400;
        let conn = self.conn.lock();
        let deleted = conn
            .execute(
                "DELETE FROM claim_cache WHERE last_used < ?1",
                params![cutoff],
            )
            .map_err(storage_err)?;
        Ok(deleted)
    }
}

fn storage_err(e: rusqlite::Error) -> Error {
    Error::Storage(e.to_string())
}

/// Synthetic id for manual submissions, so idempotence always has a key.
fn synthetic_manual_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: [u8; 4] = rand::thread_rng().gen();
    format!("manual_{millis}_{}", hex::encode(suffix))
}

fn read_result(conn: &Connection, event_id: &str) -> Result<Option<VerificationResult>> {
    let header = conn
        .query_row(
            "SELECT id, content, overall_score, processing_method, processing_time,
                    cache_hits, verification_errors, created_at
             FROM verification_results WHERE event_id = ?1",
            params![event_id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, u8>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, u64>(4)?,
                    row.get::<_, u32>(5)?,
                    row.get::<_, u32>(6)?,
                    row.get::<_, i64>(7)?,
                ))
            },
        )
        .optional()
        .map_err(storage_err)?;

    let Some((result_id, content, score, method, processing_time, cache_hits, errors, created_at)) =
        header
    else {
        return Ok(None);
    };

    let mut stmt = conn
        .prepare_cached(
            "SELECT id, text, credibility, confidence, error_message
             FROM claims WHERE result_id = ?1 ORDER BY id",
        )
        .map_err(storage_err)?;

    let claim_rows: Vec<(i64, String, u8, String, Option<String>)> = stmt
        .query_map(params![result_id], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
            ))
        })
        .map_err(storage_err)?
        .collect::<std::result::Result<_, _>>()
        .map_err(storage_err)?;

    let mut claims = Vec::with_capacity(claim_rows.len());
    let mut verifications = Vec::with_capacity(claim_rows.len());
    for (claim_id, text, credibility, confidence, error) in claim_rows {
        let mut source_stmt = conn
            .prepare_cached("SELECT title, source, url FROM sources WHERE claim_id = ?1 ORDER BY id")
            .map_err(storage_err)?;
        let sources: Vec<SourceRef> = source_stmt
            .query_map(params![claim_id], |row| {
                Ok(SourceRef {
                    title: row.get(0)?,
                    source: row.get(1)?,
                    url: row.get(2)?,
                })
            })
            .map_err(storage_err)?
            .collect::<std::result::Result<_, _>>()
            .map_err(storage_err)?;

        claims.push(text.clone());
        verifications.push(ClaimVerification {
            claim: text,
            credibility,
            confidence: Confidence::from_label(&confidence),
            sources,
            error,
        });
    }

    let method = match method.as_str() {
        "ai" => ExtractionMethod::Ai,
        _ => ExtractionMethod::Regex,
    };

    Ok(Some(VerificationResult {
        event_id: Some(event_id.to_string()),
        content,
        claims,
        verification_results: verifications,
        score,
        timestamp: Utc
            .timestamp_opt(created_at, 0)
            .single()
            .unwrap_or_else(Utc::now),
        metadata: ResultMetadata {
            method,
            processing_time,
            cache_hits,
            verification_errors: errors,
            zap: None,
        },
    }))
}
