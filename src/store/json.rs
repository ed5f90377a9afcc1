use std::{
    collections::BTreeMap,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{de::DeserializeOwned, Serialize};

use crate::models::{ApyArchiveEntry, ApySnapshot, NetworkSummary, PoolStatsData, TickSnapshot};

pub const SNAPSHOTS_FILE: &str = "snapshots.json";
pub const APY_FILE: &str = "pool_apy.json";
pub const APY_ARCHIVE_FILE: &str = "pool_apy_archive.json";
pub const SUMMARY_FILE: &str = "full.json";
pub const TICKS_DIR: &str = "ticks";

/// Pool history keyed by pool address.
pub type SnapshotDocument = BTreeMap<String, PoolStatsData>;
/// Current weekly APY state keyed by pool address.
pub type ApyDocument = BTreeMap<String, ApySnapshot>;
/// Daily APY history keyed by pool address.
pub type ApyArchiveDocument = BTreeMap<String, Vec<ApyArchiveEntry>>;

/// JSON documents of one network, kept under a single data directory.
///
/// Documents are read once at the start of a job and written once at the
/// end. Writes go to a temp file next to the target and are renamed over
/// it, so readers never see a half-written document.
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // ============================================
    // Pool snapshots
    // ============================================

    /// The snapshot history must exist; a missing document is fatal.
    pub async fn load_snapshots(&self) -> Result<SnapshotDocument> {
        let path = self.dir.join(SNAPSHOTS_FILE);
        read_json(&path)
            .await?
            .with_context(|| format!("Snapshot history {} not found", path.display()))
    }

    pub async fn save_snapshots(&self, doc: &SnapshotDocument) -> Result<()> {
        write_json_atomic(&self.dir.join(SNAPSHOTS_FILE), doc).await
    }

    // ============================================
    // Weekly APY
    // ============================================

    /// Missing document means no pool has APY state yet.
    pub async fn load_apy(&self) -> Result<ApyDocument> {
        Ok(read_json(&self.dir.join(APY_FILE)).await?.unwrap_or_default())
    }

    pub async fn save_apy(&self, doc: &ApyDocument) -> Result<()> {
        write_json_atomic(&self.dir.join(APY_FILE), doc).await
    }

    pub async fn load_apy_archive(&self) -> Result<ApyArchiveDocument> {
        Ok(read_json(&self.dir.join(APY_ARCHIVE_FILE))
            .await?
            .unwrap_or_default())
    }

    pub async fn save_apy_archive(&self, doc: &ApyArchiveDocument) -> Result<()> {
        write_json_atomic(&self.dir.join(APY_ARCHIVE_FILE), doc).await
    }

    // ============================================
    // Tick history
    // ============================================

    fn ticks_path(&self, address: &str) -> PathBuf {
        self.dir.join(TICKS_DIR).join(format!("{}.json", address))
    }

    /// Tick snapshots of a pool, oldest first. Missing history is a cold start.
    pub async fn load_ticks(&self, address: &str) -> Result<Vec<TickSnapshot>> {
        Ok(read_json(&self.ticks_path(address))
            .await?
            .unwrap_or_default())
    }

    pub async fn save_ticks(&self, address: &str, history: &[TickSnapshot]) -> Result<()> {
        write_json_atomic(&self.ticks_path(address), &history).await
    }

    // ============================================
    // Network summary
    // ============================================

    pub async fn load_summary(&self) -> Result<Option<NetworkSummary>> {
        read_json(&self.dir.join(SUMMARY_FILE)).await
    }

    pub async fn save_summary(&self, summary: &NetworkSummary) -> Result<()> {
        write_json_atomic(&self.dir.join(SUMMARY_FILE), summary).await
    }
}

/// Read and parse a JSON document. `Ok(None)` when the file does not exist.
async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("{} not found", path.display());
            return Ok(None);
        },
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", path.display()));
        },
    };

    let value = serde_json::from_slice(&raw)
        .with_context(|| format!("Malformed JSON document {}", path.display()))?;
    Ok(Some(value))
}

async fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let raw = serde_json::to_vec(value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, &raw)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to replace {}", path.display()))?;

    info!("Wrote {} ({} bytes)", path.display(), raw.len());
    Ok(())
}
