/*!
 * JSON artifact persistence for snapshots and changesets
 *
 * The interchange format between processing runs (and with the dashboard
 * consuming the data) is pretty-printed JSON in an output directory. The
 * baseline snapshot is only ever written on an explicit freeze request.
 */

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::data_types::{ChangeSet, EnrollmentSnapshot};
use crate::error::{CpscError, Result};

/// Current snapshot artifact, rewritten every run
pub const CURRENT_FILE: &str = "enrollment-current.json";
/// Frozen baseline snapshot, written only when explicitly requested
pub const BASELINE_FILE: &str = "enrollment-december.json";
/// Changeset artifact, written only when a baseline exists
pub const CHANGES_FILE: &str = "enrollment-changes.json";
/// Standalone copy of the per-contract summaries
pub const CONTRACTS_FILE: &str = "contracts.json";

/// Reads and writes the JSON artifacts in an output directory
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    output_dir: PathBuf,
}

impl SnapshotStore {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write the current snapshot artifact
    pub fn save_current(&self, snapshot: &EnrollmentSnapshot) -> Result<PathBuf> {
        self.write_json(CURRENT_FILE, snapshot)
    }

    /// Freeze this snapshot as the comparison baseline
    pub fn save_baseline(&self, snapshot: &EnrollmentSnapshot) -> Result<PathBuf> {
        self.write_json(BASELINE_FILE, snapshot)
    }

    pub fn has_baseline(&self) -> bool {
        self.output_dir.join(BASELINE_FILE).exists()
    }

    /// Load the frozen baseline, `Ok(None)` when none has been saved yet
    pub fn load_baseline(&self) -> Result<Option<EnrollmentSnapshot>> {
        let path = self.output_dir.join(BASELINE_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let file = File::open(&path)?;
        let snapshot = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            CpscError::Export {
                message: format!("Failed to parse baseline snapshot: {}", e),
                path: Some(path.clone()),
                suggestion: Some(
                    "The baseline file may be corrupt or from an incompatible version; \
                    re-freeze it with --save-baseline."
                        .to_string(),
                ),
            }
        })?;
        Ok(Some(snapshot))
    }

    /// Write the changeset artifact
    pub fn save_changes(&self, changes: &ChangeSet) -> Result<PathBuf> {
        self.write_json(CHANGES_FILE, changes)
    }

    /// Duplicate the snapshot's contracts field as a standalone artifact
    pub fn save_contracts(&self, snapshot: &EnrollmentSnapshot) -> Result<PathBuf> {
        self.write_json(CONTRACTS_FILE, &snapshot.contracts)
    }

    fn write_json<T: Serialize>(&self, filename: &str, value: &T) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(filename);
        let file = File::create(&path)?;
        let writer = BufWriter::new(file);
        // serde_json pretty printing is 2-space indented UTF-8
        serde_json::to_writer_pretty(writer, value).map_err(|e| CpscError::Export {
            message: e.to_string(),
            path: Some(path.clone()),
            suggestion: None,
        })?;
        Ok(path)
    }
}
