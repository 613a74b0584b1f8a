//! SQLite-backed hash and directory-index cache.
//!
//! One database file holds three tables:
//!
//! - `image_hashes` — fingerprints keyed by `(path, algorithm, hash_size)`
//! - `directory_index` — member paths of a scanned root with size/mtime
//!   captured at scan time, keyed by `(root, path)`
//! - `directory_meta` — per-root staleness token: the root's own mtime and
//!   the member row count at scan time
//!
//! All mutations run inside a transaction per logical operation, so a crash
//! mid-write can never leave a half-replaced index or a partial upsert
//! visible. The database uses WAL journaling, so readers from another
//! connection never observe an uncommitted transaction.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use super::entry::CachedFingerprint;
use crate::hashing::{Fingerprint, HashAlgorithm};
use crate::scanner::path_utils::cache_key;
use crate::scanner::{mtime_nanos, FileMeta};

/// Maximum number of paths bound into a single `IN (...)` lookup.
///
/// SQLite's default statement parameter limit is 999; staying well under it
/// leaves room for the algorithm and hash-size parameters.
const LOOKUP_CHUNK: usize = 400;

/// Errors from the cache store.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Underlying SQLite failure.
    #[error("Cache database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Filesystem failure while preparing the cache location.
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Persistent cache for fingerprints and directory listings.
///
/// The connection is owned by the search call that opened it and is closed
/// when the value drops; it is never a process-wide singleton.
pub struct HashCache {
    conn: Connection,
}

impl HashCache {
    /// Open or create a cache database at the given path.
    ///
    /// Parent directories are created as needed. The connection is put in
    /// WAL mode with `synchronous=NORMAL`.
    pub fn open(path: &Path) -> CacheResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Self::ensure_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory cache (for testing).
    pub fn open_in_memory() -> CacheResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::ensure_schema(&conn)?;
        Ok(Self { conn })
    }

    fn ensure_schema(conn: &Connection) -> CacheResult<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS image_hashes (
                path TEXT NOT NULL,
                mtime INTEGER NOT NULL,
                size INTEGER NOT NULL,
                algorithm TEXT NOT NULL,
                hash_size INTEGER NOT NULL,
                hash TEXT NOT NULL,
                width INTEGER,
                height INTEGER,
                PRIMARY KEY (path, algorithm, hash_size)
            );
            CREATE INDEX IF NOT EXISTS idx_image_hashes_path ON image_hashes(path);
            CREATE TABLE IF NOT EXISTS directory_index (
                root TEXT NOT NULL,
                path TEXT NOT NULL,
                size INTEGER NOT NULL,
                mtime INTEGER NOT NULL,
                PRIMARY KEY (root, path)
            );
            CREATE TABLE IF NOT EXISTS directory_meta (
                root TEXT NOT NULL,
                dir_mtime INTEGER NOT NULL,
                file_count INTEGER NOT NULL,
                scanned_at INTEGER NOT NULL,
                PRIMARY KEY (root)
            );",
        )?;
        Ok(())
    }

    // ── Hash rows ────────────────────────────────────────────────────

    /// Look up cached fingerprints for the given paths under one algorithm
    /// and hash size.
    ///
    /// Paths are normalized to their canonical key form before querying.
    /// Lookups are chunked to stay under SQLite's statement parameter limit
    /// and merged into a single map keyed by the input path. Rows for other
    /// algorithms or hash sizes are never returned.
    pub fn get_cached(
        &self,
        paths: &[PathBuf],
        algorithm: HashAlgorithm,
        hash_size: u32,
    ) -> CacheResult<HashMap<PathBuf, CachedFingerprint>> {
        let mut cached = HashMap::new();
        if paths.is_empty() {
            return Ok(cached);
        }

        // Map each key back to the caller's path so the result is usable
        // without re-canonicalizing.
        let keyed: Vec<(String, &PathBuf)> = paths.iter().map(|p| (cache_key(p), p)).collect();

        for chunk in keyed.chunks(LOOKUP_CHUNK) {
            let placeholders = (0..chunk.len())
                .map(|i| format!("?{}", i + 3))
                .collect::<Vec<_>>()
                .join(",");
            let sql = format!(
                "SELECT path, mtime, size, algorithm, hash_size, hash, width, height
                 FROM image_hashes
                 WHERE algorithm = ?1 AND hash_size = ?2 AND path IN ({placeholders})"
            );

            let mut stmt = self.conn.prepare(&sql)?;
            let mut bind_values: Vec<rusqlite::types::Value> = Vec::with_capacity(chunk.len() + 2);
            bind_values.push(rusqlite::types::Value::Text(algorithm.as_key().to_string()));
            bind_values.push(rusqlite::types::Value::Integer(i64::from(hash_size)));
            bind_values.extend(
                chunk
                    .iter()
                    .map(|(key, _)| rusqlite::types::Value::Text(key.clone())),
            );

            let rows = stmt.query_map(params_from_iter(bind_values), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, u32>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, Option<u32>>(6)?,
                    row.get::<_, Option<u32>>(7)?,
                ))
            })?;

            let by_key: HashMap<&str, &PathBuf> = chunk
                .iter()
                .map(|(key, path)| (key.as_str(), *path))
                .collect();

            for row in rows {
                let (key, mtime, size, algorithm_key, row_hash_size, hash_base64, width, height) =
                    row?;
                let Some(algorithm) = HashAlgorithm::from_key(&algorithm_key) else {
                    log::warn!("Ignoring cache row with unknown algorithm: {algorithm_key}");
                    continue;
                };
                if let Some(path) = by_key.get(key.as_str()) {
                    cached.insert(
                        (*path).clone(),
                        CachedFingerprint {
                            path: (*path).clone(),
                            mtime_ns: mtime,
                            size: size as u64,
                            algorithm,
                            hash_size: row_hash_size,
                            hash_base64,
                            width,
                            height,
                        },
                    );
                }
            }
        }

        log::debug!(
            "Cache lookup: {} of {} paths have a stored fingerprint",
            cached.len(),
            paths.len()
        );
        Ok(cached)
    }

    /// Write fingerprints into the cache, overwriting any row with the same
    /// `(path, algorithm, hash_size)` key.
    ///
    /// `hash_size` is the run's configured value, not one derived from the
    /// bit vector, so rows stay self-consistent with the configuration that
    /// produced them. All writes happen in one transaction.
    pub fn upsert_many(
        &mut self,
        fingerprints: &[Fingerprint],
        hash_size: u32,
    ) -> CacheResult<usize> {
        if fingerprints.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO image_hashes
                     (path, mtime, size, algorithm, hash_size, hash, width, height)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(path, algorithm, hash_size) DO UPDATE SET
                     mtime = excluded.mtime,
                     size = excluded.size,
                     hash = excluded.hash,
                     width = excluded.width,
                     height = excluded.height",
            )?;
            for fp in fingerprints {
                stmt.execute(params![
                    cache_key(&fp.path),
                    fp.mtime_ns,
                    fp.file_size as i64,
                    fp.algorithm.as_key(),
                    hash_size,
                    fp.hash.to_base64(),
                    Option::<u32>::None,
                    Option::<u32>::None,
                ])?;
            }
        }
        tx.commit()?;

        log::debug!("Cache upsert: {} fingerprints written", fingerprints.len());
        Ok(fingerprints.len())
    }

    // ── Directory index ──────────────────────────────────────────────

    /// Return the cached listing for `root`, or `None` when it cannot be
    /// trusted.
    ///
    /// A miss (never an error) is returned unless all of the following hold:
    /// a metadata row exists for the canonical root, the root stats cleanly
    /// right now, its current mtime equals the stored one, and the persisted
    /// member row count equals the stored file count. The staleness token is
    /// deliberately coarse: a same-count replacement that leaves the root's
    /// own mtime untouched goes undetected.
    #[must_use]
    pub fn get_index(&self, root: &Path) -> Option<Vec<PathBuf>> {
        let root_key = cache_key(root);

        let current_mtime = match std::fs::metadata(root).and_then(|m| m.modified()) {
            Ok(modified) => mtime_nanos(modified),
            Err(e) => {
                log::debug!("Directory index miss, root not statable: {e}");
                return None;
            }
        };

        let meta: Option<(i64, i64)> = self
            .conn
            .query_row(
                "SELECT dir_mtime, file_count FROM directory_meta WHERE root = ?1",
                params![root_key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .ok()
            .flatten();

        let (stored_mtime, stored_count) = meta?;
        if stored_mtime != current_mtime {
            log::debug!(
                "Directory index stale for {}: mtime changed",
                root.display()
            );
            return None;
        }

        let row_count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM directory_index WHERE root = ?1",
                params![root_key],
                |row| row.get(0),
            )
            .ok()?;
        if row_count != stored_count {
            log::debug!(
                "Directory index inconsistent for {}: {} rows vs {} recorded",
                root.display(),
                row_count,
                stored_count
            );
            return None;
        }

        let mut stmt = self
            .conn
            .prepare("SELECT path FROM directory_index WHERE root = ?1 ORDER BY path")
            .ok()?;
        let paths = stmt
            .query_map(params![root_key], |row| {
                Ok(PathBuf::from(row.get::<_, String>(0)?))
            })
            .ok()?
            .collect::<Result<Vec<_>, _>>()
            .ok()?;

        log::debug!(
            "Directory index hit for {}: {} paths",
            root.display(),
            paths.len()
        );
        Some(paths)
    }

    /// Replace the cached listing for `root` with the given member paths.
    ///
    /// Runs as one transaction: prior rows for the root are deleted, one row
    /// per statable member is inserted with its size and mtime, and the
    /// metadata row is rewritten with the root's current mtime, the inserted
    /// row count, and a scan timestamp. Repeated calls for the same root are
    /// last-write-wins; a crash mid-write leaves the previous index intact.
    pub fn replace_index(&mut self, root: &Path, paths: &[PathBuf]) -> CacheResult<usize> {
        let root_key = cache_key(root);
        let dir_mtime = std::fs::metadata(root)
            .and_then(|m| m.modified())
            .map(mtime_nanos)?;
        let scanned_at = mtime_nanos(SystemTime::now()) / 1_000_000_000;

        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM directory_index WHERE root = ?1",
            params![root_key],
        )?;

        let mut inserted = 0usize;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO directory_index (root, path, size, mtime)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for path in paths {
                // One stat per member; unstatable members are left out and
                // the stored count reflects that.
                let meta = match FileMeta::of(path) {
                    Ok(meta) => meta,
                    Err(e) => {
                        log::debug!("Skipping unstatable member {}: {e}", path.display());
                        continue;
                    }
                };
                stmt.execute(params![
                    root_key,
                    path.to_string_lossy(),
                    meta.size as i64,
                    meta.mtime_ns,
                ])?;
                inserted += 1;
            }
        }

        tx.execute(
            "INSERT INTO directory_meta (root, dir_mtime, file_count, scanned_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(root) DO UPDATE SET
                 dir_mtime = excluded.dir_mtime,
                 file_count = excluded.file_count,
                 scanned_at = excluded.scanned_at",
            params![root_key, dir_mtime, inserted as i64, scanned_at],
        )?;
        tx.commit()?;

        log::debug!(
            "Directory index replaced for {}: {} rows",
            root.display(),
            inserted
        );
        Ok(inserted)
    }
}
