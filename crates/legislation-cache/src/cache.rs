//! Directory-per-entry JSON cache with TTL expiry

use crate::clock::{Clock, SystemClock};
use crate::error::{CacheError, Result};
use crate::store::EntryStore;
use crate::types::{CacheMetadata, CacheStats, SweepReport};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Default entry lifetime: 7 days
pub const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

const METADATA_FILE: &str = "metadata.json";
const DETAIL_FILE: &str = "detail.json";
const STAGING_DIR: &str = ".staging";
const TRASH_DIR: &str = ".trash";
/// Staging/trash leftovers younger than this may belong to an in-flight write
const LEFTOVER_GRACE: Duration = Duration::from_secs(60 * 60);
const EXPIRING_SOON_DAYS: i64 = 7;

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

/// A TTL cache storing one directory per `(item_type, item_id)` key
pub struct TtlCache {
    /// Directory holding all entries
    root: PathBuf,
    /// Lifetime applied by `store`
    ttl: Duration,
    clock: Arc<dyn Clock>,
    /// Per-key reader/writer locks, dropped once nobody holds them
    key_locks: Mutex<HashMap<String, Arc<RwLock<()>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl TtlCache {
    /// Create a cache with the default 7 day TTL
    pub fn new(root: PathBuf) -> Self {
        Self::with_ttl(root, DEFAULT_TTL)
    }

    pub fn with_ttl(root: PathBuf, ttl: Duration) -> Self {
        Self::with_clock(root, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(root: PathBuf, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            root,
            ttl,
            clock,
            key_locks: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Initialize the cache by ensuring the root directory exists
    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        info!(cache_dir = ?self.root, ttl_secs = self.ttl.as_secs(), "Cache initialized");
        Ok(())
    }

    /// Directory name for a key: `<item_type>_<item_id>`, percent-encoded.
    ///
    /// `_` and `.` are also encoded in the type part so the first `_` always
    /// separates type from id and no entry name starts with a dot.
    pub fn entry_dir_name(item_type: &str, item_id: &str) -> String {
        let item_type = urlencoding::encode(item_type)
            .replace('_', "%5F")
            .replace('.', "%2E");
        let item_id = urlencoding::encode(item_id);
        format!("{}_{}", item_type, item_id)
    }

    /// Path of the entry directory for a key
    pub fn entry_path(&self, item_type: &str, item_id: &str) -> PathBuf {
        self.root.join(Self::entry_dir_name(item_type, item_id))
    }

    /// Look up an entry. Missing, expired, and unreadable entries are all misses.
    pub async fn load(&self, item_type: &str, item_id: &str) -> Option<Value> {
        let dir_name = Self::entry_dir_name(item_type, item_id);
        let path = self.root.join(&dir_name);

        let lock = self.key_lock(&dir_name).await;
        let found = {
            let _guard = lock.read().await;
            self.read_entry(&path, item_type, item_id).await
        };
        drop(lock);
        self.prune_lock(&dir_name).await;

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(item_type, item_id, "Cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(item_type, item_id, "Cache miss");
        }
        found
    }

    /// Store a payload with the cache's TTL, replacing any previous entry
    pub async fn store(&self, item_type: &str, item_id: &str, payload: &Value) -> Result<()> {
        self.store_with_ttl(item_type, item_id, payload, self.ttl).await
    }

    /// Store a payload with an explicit TTL, replacing any previous entry
    pub async fn store_with_ttl(
        &self,
        item_type: &str,
        item_id: &str,
        payload: &Value,
        ttl: Duration,
    ) -> Result<()> {
        let ttl_delta = TimeDelta::from_std(ttl).map_err(|_| CacheError::InvalidTtl(ttl))?;
        let cached_at = self.clock.now();
        let expires_at = cached_at
            .checked_add_signed(ttl_delta)
            .ok_or(CacheError::InvalidTtl(ttl))?;

        let metadata = CacheMetadata {
            id: item_id.to_string(),
            item_type: item_type.to_string(),
            cached_at,
            expires_at,
        };

        let dir_name = Self::entry_dir_name(item_type, item_id);
        let staging = self.scratch_path(STAGING_DIR, &dir_name);

        if let Err(e) = write_staged(&staging, &metadata, payload).await {
            let _ = fs::remove_dir_all(&staging).await;
            return Err(e);
        }

        let lock = self.key_lock(&dir_name).await;
        let swapped = {
            let _guard = lock.write().await;
            self.swap_into_place(&staging, &dir_name).await
        };
        drop(lock);
        self.prune_lock(&dir_name).await;

        if let Err(e) = swapped {
            let _ = fs::remove_dir_all(&staging).await;
            return Err(e);
        }

        debug!(item_type, item_id, %expires_at, "Cached entry");
        Ok(())
    }

    /// Remove an entry. Absent entries are not an error.
    pub async fn invalidate(&self, item_type: &str, item_id: &str) -> Result<()> {
        let dir_name = Self::entry_dir_name(item_type, item_id);
        let path = self.root.join(&dir_name);

        let lock = self.key_lock(&dir_name).await;
        let removed = {
            let _guard = lock.write().await;
            match fs::remove_dir_all(&path).await {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
                Err(e) => Err(CacheError::from(e)),
            }
        };
        drop(lock);
        self.prune_lock(&dir_name).await;

        if removed? {
            debug!(item_type, item_id, "Invalidated cache entry");
        }
        Ok(())
    }

    /// Remove every expired entry, plus entries without readable metadata
    pub async fn sweep(&self) -> Result<SweepReport> {
        self.sweep_entries(false).await
    }

    /// Report what `sweep` would remove without deleting anything
    pub async fn sweep_dry_run(&self) -> Result<SweepReport> {
        self.sweep_entries(true).await
    }

    /// Get current cache statistics
    pub async fn stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            ..CacheStats::default()
        };

        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    warn!(cache_dir = ?self.root, error = %e, "Failed to read cache directory");
                }
                return stats;
            }
        };

        let now = self.clock.now();
        loop {
            let entry = match dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Failed to list cache directory");
                    break;
                }
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }

            let path = entry.path();
            let metadata = match read_metadata(&path).await {
                Ok(Some(metadata)) => metadata,
                Ok(None) => continue,
                Err(e) => {
                    warn!(entry = %name, error = %e, "Skipping unreadable cache entry");
                    continue;
                }
            };

            let size = dir_size(&path).await;
            stats.entries += 1;
            stats.total_size += size;

            let by_type = stats.by_type.entry(metadata.item_type.clone()).or_default();
            by_type.count += 1;
            by_type.size += size;

            if metadata.is_expired(now) {
                stats.expired += 1;
            } else if (metadata.expires_at - now).num_days() <= EXPIRING_SOON_DAYS {
                stats.expiring_soon += 1;
            }
        }

        stats
    }

    async fn read_entry(&self, path: &Path, item_type: &str, item_id: &str) -> Option<Value> {
        let metadata = match read_metadata(path).await {
            Ok(Some(metadata)) => metadata,
            Ok(None) => return None,
            Err(e) => {
                warn!(
                    item_type,
                    item_id,
                    error = %e,
                    "Unreadable cache metadata, treating as miss"
                );
                return None;
            }
        };

        if metadata.item_type != item_type || metadata.id != item_id {
            warn!(
                item_type,
                item_id,
                stored_type = %metadata.item_type,
                stored_id = %metadata.id,
                "Cache metadata does not match its key, treating as miss"
            );
            return None;
        }

        let now = self.clock.now();
        if metadata.is_expired(now) {
            debug!(item_type, item_id, expires_at = %metadata.expires_at, "Cache entry expired");
            return None;
        }

        let bytes = match fs::read(path.join(DETAIL_FILE)).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(item_type, item_id, error = %e, "Failed to read cached payload");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!(item_type, item_id, error = %e, "Corrupt cached payload, treating as miss");
                None
            }
        }
    }

    /// Move a fully written staging directory to the entry path.
    ///
    /// Must be called with the key's write lock held. Another process may
    /// briefly observe the entry as absent, never half-written.
    async fn swap_into_place(&self, staging: &Path, dir_name: &str) -> Result<()> {
        let target = self.root.join(dir_name);
        let trash = self.scratch_path(TRASH_DIR, dir_name);
        if let Some(parent) = trash.parent() {
            fs::create_dir_all(parent).await?;
        }

        let displaced = match fs::rename(&target, &trash).await {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = fs::rename(staging, &target).await {
            if displaced {
                if let Err(restore) = fs::rename(&trash, &target).await {
                    warn!(
                        entry = %dir_name,
                        error = %restore,
                        "Failed to restore displaced cache entry"
                    );
                }
            }
            return Err(e.into());
        }

        if displaced {
            if let Err(e) = fs::remove_dir_all(&trash).await {
                warn!(entry = %dir_name, error = %e, "Failed to remove displaced cache entry");
            }
        }
        Ok(())
    }

    async fn sweep_entries(&self, dry_run: bool) -> Result<SweepReport> {
        let mut report = SweepReport {
            dry_run,
            ..SweepReport::default()
        };

        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(report),
            Err(e) => return Err(e.into()),
        };

        let now = self.clock.now();
        loop {
            let entry = match dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(
                        cache_dir = ?self.root,
                        error = %e,
                        "Failed to list cache directory, sweep cut short"
                    );
                    break;
                }
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            let path = entry.path();

            match entry.file_type().await {
                Ok(file_type) if file_type.is_dir() => {}
                Ok(_) => continue,
                Err(e) => {
                    warn!(entry = %name, error = %e, "Failed to inspect cache entry, skipping");
                    report.failed.push(name);
                    continue;
                }
            }

            if name == STAGING_DIR || name == TRASH_DIR {
                self.sweep_leftovers(&path, &name, dry_run, &mut report).await;
                continue;
            }
            if name.starts_with('.') {
                continue;
            }

            let observed = match read_metadata(&path).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    debug!(entry = %name, error = %e, "Unreadable metadata during sweep");
                    None
                }
            };

            let observed_expiry = match &observed {
                Some(metadata) if !metadata.is_expired(now) => continue,
                Some(metadata) => Some(metadata.expires_at),
                None => None,
            };

            match self
                .remove_if_unchanged(&name, &path, observed_expiry, now, dry_run)
                .await
            {
                Ok(Some(bytes)) => {
                    report.bytes_freed += bytes;
                    if observed_expiry.is_some() {
                        report.expired.push(name);
                    } else {
                        report.orphaned.push(name);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(entry = %name, error = %e, "Failed to remove cache entry, skipping");
                    report.failed.push(name);
                }
            }
        }

        info!(
            dry_run,
            expired = report.expired.len(),
            orphaned = report.orphaned.len(),
            failed = report.failed.len(),
            bytes_freed = report.bytes_freed,
            "Cache sweep finished"
        );
        Ok(report)
    }

    /// Delete an entry only if it still carries the expiry seen by the scan.
    ///
    /// Returns the bytes freed, or `None` when the entry changed or vanished.
    async fn remove_if_unchanged(
        &self,
        dir_name: &str,
        path: &Path,
        observed_expiry: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        dry_run: bool,
    ) -> Result<Option<u64>> {
        let lock = self.key_lock(dir_name).await;
        let outcome = {
            let _guard = lock.write().await;
            let current_expiry = read_metadata(path).await
                .ok()
                .flatten()
                .map(|metadata| metadata.expires_at);

            let unchanged = match (observed_expiry, current_expiry) {
                (Some(seen), Some(current)) => seen == current && now > current,
                (None, None) => true,
                _ => false,
            };

            if !unchanged {
                debug!(entry = %dir_name, "Entry rewritten during sweep, keeping it");
                Ok(None)
            } else {
                let bytes = dir_size(path).await;
                if dry_run {
                    Ok(Some(bytes))
                } else {
                    match fs::remove_dir_all(path).await {
                        Ok(()) => Ok(Some(bytes)),
                        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                        Err(e) => Err(CacheError::from(e)),
                    }
                }
            }
        };
        drop(lock);
        self.prune_lock(dir_name).await;
        outcome
    }

    /// Remove staging/trash leftovers abandoned by interrupted writes.
    ///
    /// Failures are recorded per leftover and never stop the sweep.
    async fn sweep_leftovers(
        &self,
        dir: &Path,
        dir_label: &str,
        dry_run: bool,
        report: &mut SweepReport,
    ) {
        let mut children = match fs::read_dir(dir).await {
            Ok(children) => children,
            Err(e) => {
                warn!(dir = %dir_label, error = %e, "Failed to list leftovers");
                report.failed.push(dir_label.to_string());
                return;
            }
        };

        loop {
            let child = match children.next_entry().await {
                Ok(Some(child)) => child,
                Ok(None) => break,
                Err(e) => {
                    warn!(dir = %dir_label, error = %e, "Failed to list leftovers");
                    report.failed.push(dir_label.to_string());
                    break;
                }
            };
            let label = format!("{}/{}", dir_label, child.file_name().to_string_lossy());

            let child_meta = match child.metadata().await {
                Ok(meta) => meta,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!(leftover = %label, error = %e, "Failed to inspect leftover, skipping");
                    report.failed.push(label);
                    continue;
                }
            };
            let age = child_meta
                .modified()
                .ok()
                .and_then(|modified| SystemTime::now().duration_since(modified).ok())
                .unwrap_or_default();
            if age < LEFTOVER_GRACE {
                continue;
            }

            let path = child.path();
            let bytes = if child_meta.is_dir() {
                dir_size(&path).await
            } else {
                child_meta.len()
            };
            if !dry_run {
                let removed = if child_meta.is_dir() {
                    fs::remove_dir_all(&path).await
                } else {
                    fs::remove_file(&path).await
                };
                match removed {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => continue,
                    Err(e) => {
                        warn!(leftover = %label, error = %e, "Failed to remove leftover, skipping");
                        report.failed.push(label);
                        continue;
                    }
                }
            }
            report.bytes_freed += bytes;
            report.orphaned.push(label);
        }
    }

    fn scratch_path(&self, scratch_dir: &str, dir_name: &str) -> PathBuf {
        let seq = STAGING_SEQ.fetch_add(1, Ordering::Relaxed);
        self.root
            .join(scratch_dir)
            .join(format!("{}.{}.{}", dir_name, std::process::id(), seq))
    }

    async fn key_lock(&self, dir_name: &str) -> Arc<RwLock<()>> {
        let mut locks = self.key_locks.lock().await;
        locks
            .entry(dir_name.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    /// Drop the lock for a key once only the table holds it
    async fn prune_lock(&self, dir_name: &str) {
        let mut locks = self.key_locks.lock().await;
        if locks
            .get(dir_name)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(dir_name);
        }
    }
}

#[async_trait]
impl EntryStore for TtlCache {
    async fn get(&self, item_type: &str, item_id: &str) -> Option<Value> {
        self.load(item_type, item_id).await
    }

    async fn put(&self, item_type: &str, item_id: &str, payload: &Value) -> Result<()> {
        self.store(item_type, item_id, payload).await
    }

    async fn delete(&self, item_type: &str, item_id: &str) -> Result<()> {
        self.invalidate(item_type, item_id).await
    }

    async fn sweep(&self) -> Result<SweepReport> {
        TtlCache::sweep(self).await
    }
}

async fn write_staged(staging: &Path, metadata: &CacheMetadata, payload: &Value) -> Result<()> {
    fs::create_dir_all(staging).await?;
    fs::write(staging.join(DETAIL_FILE), serde_json::to_vec_pretty(payload)?).await?;
    fs::write(
        staging.join(METADATA_FILE),
        serde_json::to_vec_pretty(metadata)?,
    )
    .await?;
    Ok(())
}

async fn read_metadata(dir: &Path) -> Result<Option<CacheMetadata>> {
    match fs::read(dir.join(METADATA_FILE)).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Total size of the files directly inside `dir`
async fn dir_size(dir: &Path) -> u64 {
    let mut total = 0;
    let Ok(mut entries) = fs::read_dir(dir).await else {
        return 0;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        if let Ok(metadata) = entry.metadata().await {
            if metadata.is_file() {
                total += metadata.len();
            }
        }
    }
    total
}
