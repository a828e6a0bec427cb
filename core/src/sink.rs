//! Durable sinks for the Analysis Table.
//!
//! RULE: a sink either publishes the complete new table or leaves the
//! previously published one untouched. Readers never see a partial table.

use crate::{
    error::{PipelineError, PipelineResult},
    table::AnalysisTable,
};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub trait TableSink {
    /// Replace the published table with `table`.
    fn publish(&mut self, table: &AnalysisTable) -> PipelineResult<()>;

    /// Human-readable destination, for logs.
    fn describe(&self) -> String;
}

/// CSV file published by write-to-temp then rename.
pub struct CsvFileSink {
    path: PathBuf,
}

impl CsvFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling of the target so the final rename stays on one filesystem.
    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "analysis_table.csv".to_string());
        self.path
            .with_file_name(format!(".{name}.{}.tmp", Uuid::new_v4().simple()))
    }

    fn write_and_rename(&self, tmp: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = fs::File::create(tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);
        fs::rename(tmp, &self.path)?;
        sync_parent_dir(&self.path)
    }
}

/// Persist the directory entry written by a rename.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> std::io::Result<()> {
    let dir = match path.parent().filter(|d| !d.as_os_str().is_empty()) {
        Some(d) => d,
        None => Path::new("."),
    };
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

impl TableSink for CsvFileSink {
    fn publish(&mut self, table: &AnalysisTable) -> PipelineResult<()> {
        let bytes = table.to_csv_bytes()?;
        let publish_err = |source| PipelineError::Publish {
            path: self.path.display().to_string(),
            source,
        };

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(publish_err)?;
        }

        let tmp = self.temp_path();
        if let Err(e) = self.write_and_rename(&tmp, &bytes) {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                log::debug!("temp file {} not removed: {cleanup}", tmp.display());
            }
            return Err(publish_err(e));
        }
        log::debug!("published {} bytes to {}", bytes.len(), self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory sink holding the last published encoding. Used by tests and
/// dry runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub published: Option<Vec<u8>>,
    pub publish_count: usize,
}

impl TableSink for MemorySink {
    fn publish(&mut self, table: &AnalysisTable) -> PipelineResult<()> {
        self.published = Some(table.to_csv_bytes()?);
        self.publish_count += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
