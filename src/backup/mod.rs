//! Database backup module.
//!
//! Takes periodic consistent snapshots of the `SQLite` mirror into a local
//! backup directory: `VACUUM INTO` a staging file, compress with zstd, name
//! the result by its content hash, and track everything in `manifest.json`
//! (ISO timestamp → filename) with a bounded retention count.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::db::DATETIME_FORMAT;

const STAGING_NAME: &str = "backup.db";
const MANIFEST_NAME: &str = "manifest.json";

/// A fresh backup is taken when the newest one is at least this old.
const BACKUP_MAX_AGE_DAYS: i64 = 7;

/// Backup manager handles snapshots of the mirror database.
#[derive(Debug, Clone)]
pub struct BackupManager {
    db_path: PathBuf,
    backup_dir: PathBuf,
    retention_count: usize,
}

impl BackupManager {
    /// Create a new backup manager.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            db_path: config.database_path.clone(),
            backup_dir: config.backup_dir.clone(),
            retention_count: config.backup_retention_count,
        }
    }

    /// Run the backup scheduler: check on every tick, back up when due.
    pub async fn run_loop(&self, check_interval: Duration) {
        info!(
            check_interval_hours = check_interval.as_secs() / 3600,
            retention = self.retention_count,
            "Starting backup scheduler"
        );

        loop {
            if let Err(e) = self.run_if_due().await {
                error!("Database backup failed: {e:#}");
            }
            tokio::time::sleep(check_interval).await;
        }
    }

    /// Take a backup if none exists or the newest is past its age limit.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be read or the backup fails.
    pub async fn run_if_due(&self) -> Result<()> {
        let manifest = read_manifest(&self.backup_dir).await?;

        if backup_due(&manifest, Utc::now().naive_utc()) {
            let name = self.run_backup().await?;
            info!(backup = %name, "Database backup completed");
        } else {
            debug!("Backup not due yet");
        }

        Ok(())
    }

    /// Perform a database backup: VACUUM INTO, compress, hash, record.
    ///
    /// # Returns
    ///
    /// Returns the stored backup's filename on success.
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails, including when a staging file from
    /// another (or an interrupted) run is present.
    pub async fn run_backup(&self) -> Result<String> {
        fs::create_dir_all(&self.backup_dir)
            .await
            .context("Failed to create backup directory")?;

        let staging_path = self.backup_dir.join(STAGING_NAME);
        if fs::try_exists(&staging_path).await.unwrap_or(false) {
            // Either another task is mid-backup or a previous run was
            // interrupted. The stale file has to be removed by hand before
            // backups resume.
            anyhow::bail!(
                "staging file {} already exists, aborting this backup",
                staging_path.display()
            );
        }

        info!(db_path = ?self.db_path, "Starting database backup");

        self.vacuum_into(&staging_path)
            .await
            .context("VACUUM INTO failed")?;

        let compressed_path = self.backup_dir.join(format!("{STAGING_NAME}.zst"));
        let hash = compress_and_hash(&staging_path, &compressed_path)
            .await
            .context("Compression failed")?;

        if let Err(e) = fs::remove_file(&staging_path).await {
            warn!(path = ?staging_path, "Failed to remove staging file: {e}");
        }

        let backup_name = format!("{hash}.sqlite.zst");
        fs::rename(&compressed_path, self.backup_dir.join(&backup_name))
            .await
            .context("Failed to move backup into place")?;

        let mut manifest = read_manifest(&self.backup_dir).await?;
        manifest.insert(
            Utc::now().naive_utc().format(DATETIME_FORMAT).to_string(),
            backup_name.clone(),
        );
        self.apply_retention(&mut manifest).await;
        write_manifest(&self.backup_dir, &manifest).await?;

        Ok(backup_name)
    }

    /// Use VACUUM INTO to create a consistent snapshot of the database.
    async fn vacuum_into(&self, output_path: &Path) -> Result<()> {
        let db_path_str = self.db_path.to_string_lossy().to_string();
        let output_path_str = output_path.to_string_lossy().to_string();

        debug!(db = %db_path_str, output = %output_path_str, "Running VACUUM INTO");

        // A separate read-only connection keeps the snapshot from blocking
        // the crawler's writes for longer than necessary.
        let conn = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&format!("sqlite://{db_path_str}?mode=ro"))
            .await
            .context("Failed to open database for backup")?;

        let query = format!("VACUUM INTO '{}'", output_path_str.replace('\'', "''"));
        sqlx::query(&query)
            .execute(&conn)
            .await
            .context("VACUUM INTO query failed")?;

        conn.close().await;

        let metadata = fs::metadata(output_path).await?;
        let size_mb = metadata.len() as f64 / 1_048_576.0;
        info!(size_mb, "VACUUM INTO completed");

        Ok(())
    }

    /// Evict the oldest manifest entries beyond the retention count, deleting
    /// their files unless another entry still references them.
    async fn apply_retention(&self, manifest: &mut BTreeMap<String, String>) {
        if self.retention_count == 0 {
            debug!("Backup retention disabled (count=0)");
            return;
        }

        while manifest.len() > self.retention_count {
            // ISO timestamps order lexicographically, so the first key is the
            // oldest backup.
            let Some((evicted_at, filename)) = manifest.pop_first() else {
                break;
            };
            debug!(evicted_at = %evicted_at, file = %filename, "Evicting old backup");

            let still_referenced = manifest.values().any(|name| *name == filename);
            if !still_referenced {
                if let Err(e) = fs::remove_file(self.backup_dir.join(&filename)).await {
                    warn!(file = %filename, "Failed to delete evicted backup: {e}");
                }
            }
        }
    }
}

/// Whether a new backup is due given the manifest and the current time.
#[must_use]
pub fn backup_due(manifest: &BTreeMap<String, String>, now: NaiveDateTime) -> bool {
    match manifest.keys().next_back() {
        None => true,
        Some(latest) => NaiveDateTime::parse_from_str(latest, DATETIME_FORMAT)
            .map_or(true, |dt| {
                now - dt >= chrono::Duration::days(BACKUP_MAX_AGE_DAYS)
            }),
    }
}

/// Read the backup manifest, tolerating a missing or unreadable file.
///
/// An unreadable manifest is reported and treated as empty: existing backup
/// files are left alone (their creation times are unknown, so they can no
/// longer be recycled) and bookkeeping starts fresh.
///
/// # Errors
///
/// Returns an error only for I/O failures other than the file being absent.
pub async fn read_manifest(backup_dir: &Path) -> Result<BTreeMap<String, String>> {
    let manifest_path = backup_dir.join(MANIFEST_NAME);

    let bytes = match fs::read(&manifest_path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(e).context("Failed to read backup manifest"),
    };

    match serde_json::from_slice(&bytes) {
        Ok(manifest) => Ok(manifest),
        Err(e) => {
            warn!(
                path = ?manifest_path,
                "Backup manifest is unreadable ({e}); existing backup files cannot be recycled"
            );
            Ok(BTreeMap::new())
        }
    }
}

async fn write_manifest(backup_dir: &Path, manifest: &BTreeMap<String, String>) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(manifest).context("Failed to encode backup manifest")?;
    fs::write(backup_dir.join(MANIFEST_NAME), bytes)
        .await
        .context("Failed to write backup manifest")
}

/// Compress `input` to `output` with zstd and return the hex SHA-256 of the
/// compressed bytes.
async fn compress_and_hash(input: &Path, output: &Path) -> Result<String> {
    let input = input.to_path_buf();
    let output = output.to_path_buf();

    // zstd is CPU-bound; keep it off the async threads.
    tokio::task::spawn_blocking(move || {
        use std::fs::File;
        use std::io::{BufReader, BufWriter, Write};

        let input_file = File::open(&input).context("Failed to open staging file")?;
        let output_file = File::create(&output).context("Failed to create compressed file")?;

        // Compression level 3 balances speed and ratio for periodic snapshots.
        let mut encoder = zstd::stream::Encoder::new(BufWriter::new(output_file), 3)
            .context("Failed to create encoder")?;
        std::io::copy(&mut BufReader::new(input_file), &mut encoder)
            .context("Failed to compress data")?;
        encoder.finish()?.flush()?;

        let mut hasher = Sha256::new();
        let mut compressed = BufReader::new(File::open(&output).context("Failed to reopen output")?);
        std::io::copy(&mut compressed, &mut hasher).context("Failed to hash backup")?;

        Ok::<_, anyhow::Error>(hex::encode(hasher.finalize()))
    })
    .await
    .context("Compression task panicked")?
}
