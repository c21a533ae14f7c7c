use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::pipeline::CycleReport;

/// Keeps the latest cycle report on disk for dashboards and the `show` command.
pub struct SnapshotWriter {
    snapshot_path: PathBuf,
}

impl SnapshotWriter {
    pub fn new(snapshot_dir: &Path) -> Result<Self> {
        // Ensure the snapshot directory exists
        std::fs::create_dir_all(snapshot_dir)
            .with_context(|| format!("creating snapshot directory {}", snapshot_dir.display()))?;

        Ok(Self {
            snapshot_path: snapshot_dir.join("snapshot.json"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Replaces the previous snapshot. Written to a temporary file first so
    /// readers never observe a partial report.
    pub async fn write(&self, report: &CycleReport) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        let tmp_path = self.snapshot_path.with_extension("json.tmp");

        tokio::fs::write(&tmp_path, json.as_bytes())
            .await
            .with_context(|| format!("writing {}", tmp_path.display()))?;
        tokio::fs::rename(&tmp_path, &self.snapshot_path)
            .await
            .with_context(|| format!("replacing {}", self.snapshot_path.display()))?;

        info!("Snapshot written to {}", self.snapshot_path.display());
        Ok(())
    }

    /// `None` until the first cycle has completed.
    pub async fn read(&self) -> Result<Option<CycleReport>> {
        if !self.snapshot_path.exists() {
            return Ok(None);
        }
        let content = tokio::fs::read_to_string(&self.snapshot_path).await?;
        let report = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", self.snapshot_path.display()))?;
        Ok(Some(report))
    }
}
